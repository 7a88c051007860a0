//! The cache directory: one installed repository per immediate child
//! directory.
//!
//! Nothing is indexed in memory. Every call re-reads the directory, and
//! there is no locking against other processes touching the same cache.

use std::collections::HashSet;
use std::fmt;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::error::{RepoError, Result};
use crate::repo::git::{GitRunner, SystemGit};
use crate::repo::repository::{InstallOptions, Repository};

#[derive(Debug, Clone)]
pub struct RepositoryCache {
    path: PathBuf,
    git: Arc<dyn GitRunner>,
}

/// Outcome of [`RepositoryCache::update`].
#[derive(Debug, Default)]
pub struct UpdateReport {
    pub updated: Vec<String>,
    pub failed: Vec<(String, RepoError)>,
}

impl UpdateReport {
    pub fn is_clean(&self) -> bool {
        self.failed.is_empty()
    }
}

impl RepositoryCache {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self::with_git(path, Arc::new(SystemGit::default()))
    }

    pub fn with_git(path: impl Into<PathBuf>, git: Arc<dyn GitRunner>) -> Self {
        Self {
            path: path.into(),
            git,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn has(&self, name: &str) -> bool {
        validate_name(name).is_ok() && self.path.join(name).is_dir()
    }

    pub fn resolve(&self, name: &str) -> Result<Repository> {
        validate_name(name)?;

        let path = self.path.join(name);
        if !path.is_dir() {
            return Err(RepoError::RepositoryNotFound(format!(
                "repository not found: {name:?}"
            )));
        }

        Repository::find_with(path, self.git.clone())
    }

    /// Lists the installed repositories in name order.
    ///
    /// A missing cache directory is an empty cache. The listing is taken when
    /// this is called; call it again to observe later changes.
    pub fn repositories(&self) -> Result<Repositories> {
        let entries = match fs::read_dir(&self.path) {
            Ok(entries) => entries,
            Err(err) if err.kind() == io::ErrorKind::NotFound => {
                return Ok(Repositories::empty(self.git.clone()));
            }
            Err(err) => return Err(err.into()),
        };

        let mut dirs = Vec::new();
        for entry in entries {
            let entry = entry?;
            // Follows symlinks so a linked checkout counts as a repository.
            if entry.path().is_dir() {
                dirs.push(entry.path());
            }
        }
        dirs.sort_by(|a, b| a.file_name().cmp(&b.file_name()));

        Ok(Repositories {
            dirs: dirs.into_iter(),
            git: self.git.clone(),
        })
    }

    /// Clones `uri` into the cache. Without a `name`, the last segment of the
    /// URI minus any `.git` suffix is used.
    pub fn install(&self, uri: &str, name: Option<&str>) -> Result<Repository> {
        self.install_with(uri, name, &InstallOptions::default())
    }

    pub fn install_with(
        &self,
        uri: &str,
        name: Option<&str>,
        options: &InstallOptions,
    ) -> Result<Repository> {
        let name = match name {
            Some(name) => name.to_string(),
            None => repo_name_from_uri(uri).ok_or_else(|| RepoError::InvalidName(uri.to_string()))?,
        };
        validate_name(&name)?;

        let path = self.path.join(&name);
        if path.exists() {
            return Err(RepoError::AlreadyInstalled(name));
        }

        fs::create_dir_all(&self.path)?;
        tracing::info!("installing {name} from {uri}");

        Repository::install(self.git.clone(), uri, path, options)
    }

    /// Updates every repository in turn.
    ///
    /// A repository whose git command fails is recorded in the report and the
    /// loop moves on. A missing git executable aborts the whole run.
    pub fn update(&self) -> Result<UpdateReport> {
        let mut report = UpdateReport::default();

        for repo in self.repositories()? {
            tracing::info!("updating {repo}");

            match repo.update(None, None) {
                Ok(()) => report.updated.push(repo.name().to_string()),
                Err(err @ RepoError::CommandFailed { .. }) => {
                    tracing::warn!("failed to update {repo}: {err}");
                    report.failed.push((repo.name().to_string(), err));
                }
                Err(err) => return Err(err),
            }
        }

        Ok(report)
    }

    pub fn update_one(&self, name: &str, branch: Option<&str>, tag: Option<&str>) -> Result<()> {
        let repo = self.resolve(name)?;
        tracing::info!("updating {repo}");
        repo.update(branch, tag)
    }

    pub fn remove(&self, name: &str) -> Result<()> {
        let repo = self.resolve(name)?;
        tracing::info!("removing {repo}");
        repo.delete()
    }

    /// Deletes every repository, keeping the cache directory itself.
    pub fn purge(&self) -> Result<Vec<String>> {
        let mut removed = Vec::new();
        for repo in self.repositories()? {
            tracing::info!("removing {repo}");
            repo.delete()?;
            removed.push(repo.name().to_string());
        }
        Ok(removed)
    }

    /// The first repository, in name order, holding `relative` as a file.
    pub fn find_file(&self, relative: impl AsRef<Path>) -> Result<Option<PathBuf>> {
        let relative = relative.as_ref();
        Ok(self
            .repositories()?
            .find_map(|repo| repo.find_file(relative)))
    }

    pub fn glob(&self, pattern: &str) -> Result<Vec<PathBuf>> {
        let mut matches = Vec::new();
        self.glob_each(pattern, |path| matches.push(path.to_path_buf()))?;
        Ok(matches)
    }

    /// Streams matches repository by repository, in name order.
    pub fn glob_each<F>(&self, pattern: &str, mut visit: F) -> Result<()>
    where
        F: FnMut(&Path),
    {
        for repo in self.repositories()? {
            repo.glob_each(pattern, &mut visit)?;
        }
        Ok(())
    }

    /// Relative paths matching `pattern` in any repository. Which repository a
    /// path came from is not kept.
    pub fn list_files(&self, pattern: &str) -> Result<HashSet<String>> {
        let mut files = HashSet::new();
        for repo in self.repositories()? {
            files.extend(repo.list_files(pattern)?);
        }
        Ok(files)
    }
}

impl fmt::Display for RepositoryCache {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.path.display())
    }
}

/// Iterator returned by [`RepositoryCache::repositories`].
///
/// Directories removed after the listing was taken are skipped. Any other
/// failure to open an entry is logged and the entry skipped.
#[derive(Debug)]
pub struct Repositories {
    dirs: std::vec::IntoIter<PathBuf>,
    git: Arc<dyn GitRunner>,
}

impl Repositories {
    fn empty(git: Arc<dyn GitRunner>) -> Self {
        Self {
            dirs: Vec::new().into_iter(),
            git,
        }
    }
}

impl Iterator for Repositories {
    type Item = Repository;

    fn next(&mut self) -> Option<Self::Item> {
        for dir in self.dirs.by_ref() {
            match Repository::find_with(&dir, self.git.clone()) {
                Ok(repo) => return Some(repo),
                Err(err) if err.is_not_found() => {
                    tracing::debug!("{} disappeared from the cache: {err}", dir.display());
                }
                Err(err) => tracing::warn!("skipping {}: {err}", dir.display()),
            }
        }
        None
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (0, Some(self.dirs.len()))
    }
}

/// `https://host/x/foo.git` and `git@host:x/foo.git` both name `foo`.
pub fn repo_name_from_uri(uri: &str) -> Option<String> {
    let trimmed = uri.trim_end_matches('/');
    let segment = trimmed.rsplit(['/', ':', '\\']).next()?;
    let name = segment.strip_suffix(".git").unwrap_or(segment);

    (!name.is_empty()).then(|| name.to_string())
}

fn validate_name(name: &str) -> Result<()> {
    let invalid = name.is_empty()
        || name == "."
        || name == ".."
        || name.contains(['/', '\\'])
        || Path::new(name).is_absolute();

    if invalid {
        return Err(RepoError::InvalidName(name.to_string()));
    }
    Ok(())
}
