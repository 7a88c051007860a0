use std::fmt;
use std::fs;
use std::io;
use std::path::{Component, Path, PathBuf};
use std::sync::Arc;

use crate::error::{RepoError, Result};
use crate::repo::git::{GitRunner, SystemGit, args};
use crate::repo::search::RootedGlob;

pub const DEFAULT_REMOTE: &str = "origin";
pub const DEFAULT_LIST_PATTERN: &str = "**/*.*";

/// Options for [`Repository::install`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct InstallOptions {
    pub branch: Option<String>,
    pub tag: Option<String>,
    /// Shallow-clone depth in commits.
    pub depth: Option<u32>,
}

impl InstallOptions {
    pub fn branch(branch: impl Into<String>) -> Self {
        Self {
            branch: Some(branch.into()),
            ..Self::default()
        }
    }

    pub fn tag(tag: impl Into<String>) -> Self {
        Self {
            tag: Some(tag.into()),
            ..Self::default()
        }
    }

    /// The ref to check out after cloning, if any.
    pub fn reference(&self) -> Result<Option<&str>> {
        checkout_ref(self.branch.as_deref(), self.tag.as_deref())
    }
}

/// A directory on disk managed as a git working copy.
///
/// No git state is cached; every operation asks git again.
#[derive(Debug, Clone)]
pub struct Repository {
    path: PathBuf,
    name: String,
    git: Arc<dyn GitRunner>,
}

impl Repository {
    /// Opens the repository at `path` using the `git` found on `PATH`.
    pub fn find(path: impl AsRef<Path>) -> Result<Self> {
        Self::find_with(path, Arc::new(SystemGit::default()))
    }

    pub fn find_with(path: impl AsRef<Path>, git: Arc<dyn GitRunner>) -> Result<Self> {
        let path = normalize(path.as_ref())?;

        let metadata = match fs::metadata(&path) {
            Ok(metadata) => metadata,
            Err(err) if err.kind() == io::ErrorKind::NotFound => {
                return Err(RepoError::RepositoryNotFound(format!(
                    "repository does not exist: {}",
                    path.display()
                )));
            }
            Err(err) => return Err(err.into()),
        };

        if !metadata.is_dir() {
            return Err(RepoError::RepositoryNotFound(format!(
                "path is not a directory: {}",
                path.display()
            )));
        }

        let name = path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .ok_or_else(|| {
                RepoError::RepositoryNotFound(format!("path has no name: {}", path.display()))
            })?;

        Ok(Self { path, name, git })
    }

    /// Runs `git clone [--depth N] <uri> <path>`.
    pub fn git_clone(
        git: Arc<dyn GitRunner>,
        uri: &str,
        path: impl AsRef<Path>,
        depth: Option<u32>,
    ) -> Result<Self> {
        let path = path.as_ref();
        let mut argv = args(["clone"]);
        if let Some(depth) = depth {
            argv.extend(args(["--depth".to_string(), depth.to_string()]));
        }
        argv.push(uri.into());
        argv.push(path.as_os_str().to_os_string());

        git.run(&argv, None)?;
        Self::find_with(path, git)
    }

    /// Clones `uri` into `path`, then checks out the requested branch or tag.
    pub fn install(
        git: Arc<dyn GitRunner>,
        uri: &str,
        path: impl AsRef<Path>,
        options: &InstallOptions,
    ) -> Result<Self> {
        let reference = options.reference()?;

        let repo = Self::git_clone(git, uri, path, options.depth)?;
        if let Some(reference) = reference {
            repo.checkout(reference)?;
        }

        Ok(repo)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Runs `git pull [--tags] <remote> [<branch>]` inside the repository.
    pub fn pull(&self, remote: &str, branch: Option<&str>, tags: bool) -> Result<()> {
        let mut argv = args(["pull"]);
        if tags {
            argv.extend(args(["--tags"]));
        }
        argv.extend(args([remote]));
        if let Some(branch) = branch {
            argv.extend(args([branch]));
        }

        self.git.run(&argv, Some(&self.path))
    }

    pub fn checkout(&self, reference: &str) -> Result<()> {
        self.git.run(&args(["checkout", reference]), Some(&self.path))
    }

    /// Pulls from `origin` (with tags unless a branch was asked for), then
    /// checks out the branch or tag.
    pub fn update(&self, branch: Option<&str>, tag: Option<&str>) -> Result<()> {
        let reference = checkout_ref(branch, tag)?;

        self.pull(DEFAULT_REMOTE, branch, branch.is_none())?;
        if let Some(reference) = reference {
            self.checkout(reference)?;
        }

        Ok(())
    }

    /// The URL of the `origin` remote, if one is configured.
    pub fn url(&self) -> Result<Option<String>> {
        let argv = args(["config", "--get", "remote.origin.url"]);
        match self.git.capture(&argv, Some(&self.path)) {
            Ok(url) if url.is_empty() => Ok(None),
            Ok(url) => Ok(Some(url)),
            // `git config --get` exits 1 when the key is unset.
            Err(RepoError::CommandFailed { .. }) => Ok(None),
            Err(err) => Err(err),
        }
    }

    /// Removes the working copy. Deleting an already-missing directory is a
    /// no-op.
    pub fn delete(&self) -> Result<()> {
        match fs::remove_dir_all(&self.path) {
            Ok(()) => Ok(()),
            Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(()),
            Err(err) => Err(err.into()),
        }
    }

    /// `relative` must stay inside the repository: absolute paths and `..`
    /// never match.
    pub fn find_file(&self, relative: impl AsRef<Path>) -> Option<PathBuf> {
        let relative = relative.as_ref();
        if !is_plain_relative(relative) {
            return None;
        }

        let path = self.path.join(relative);
        path.is_file().then_some(path)
    }

    pub fn glob(&self, pattern: &str) -> Result<Vec<PathBuf>> {
        let mut matches = Vec::new();
        self.glob_each(pattern, |path| matches.push(path.to_path_buf()))?;
        Ok(matches)
    }

    /// Streams absolute matches of `pattern` to `visit`.
    pub fn glob_each<F>(&self, pattern: &str, mut visit: F) -> Result<()>
    where
        F: FnMut(&Path),
    {
        RootedGlob::new(&self.path, pattern)?.for_each_match(|absolute, _| visit(absolute))
    }

    /// Like [`Repository::glob`] but relative to the repository root.
    pub fn list_files(&self, pattern: &str) -> Result<Vec<String>> {
        let mut files = Vec::new();
        RootedGlob::new(&self.path, pattern)?
            .for_each_match(|_, relative| files.push(relative.to_string_lossy().into_owned()))?;
        Ok(files)
    }
}

impl fmt::Display for Repository {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name)
    }
}

fn checkout_ref<'a>(branch: Option<&'a str>, tag: Option<&'a str>) -> Result<Option<&'a str>> {
    match (branch, tag) {
        (Some(branch), Some(tag)) => Err(RepoError::ConflictingRef {
            branch: branch.to_string(),
            tag: tag.to_string(),
        }),
        (branch, tag) => Ok(branch.or(tag)),
    }
}

/// True when every component is a plain name (or `.`).
pub(crate) fn is_plain_relative(path: &Path) -> bool {
    path.components()
        .all(|component| matches!(component, Component::Normal(_) | Component::CurDir))
}

fn normalize(path: &Path) -> Result<PathBuf> {
    let expanded = crate::model::config::expand_tilde(path);
    Ok(std::path::absolute(expanded)?)
}
