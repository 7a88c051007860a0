use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

use crate::error::{RepoError, Result};
use crate::repo::RepositoryCache;
use crate::repo::repository::is_plain_relative;
use crate::repo::search::RootedGlob;

/// Plugin discovery across a local plugin directory and every installed
/// repository.
///
/// Each repository keeps its plugins under the same relative `repo_dir`, one
/// file per plugin with a fixed extension. A plugin's name is its path under
/// `repo_dir` without the extension, so `plugins/net/dns.wasm` is `net/dns`.
#[derive(Debug, Clone)]
pub struct PluginDir {
    cache: RepositoryCache,
    repo_dir: String,
    extension: String,
    local_dir: Option<PathBuf>,
}

impl PluginDir {
    pub fn new(cache: RepositoryCache, repo_dir: impl AsRef<Path>, extension: &str) -> Result<Self> {
        let repo_dir = validate_repo_dir(repo_dir.as_ref())?;

        let extension = extension.trim();
        if extension.is_empty() || extension.contains(['.', '/', '\\']) {
            return Err(RepoError::InvalidPluginDir(format!(
                "bad plugin extension {extension:?}"
            )));
        }

        Ok(Self {
            cache,
            repo_dir,
            extension: extension.to_string(),
            local_dir: None,
        })
    }

    /// Plugins in `dir` are found before any installed repository's.
    pub fn with_local_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.local_dir = Some(dir.into());
        self
    }

    pub fn list_plugins(&self) -> Result<Vec<String>> {
        let mut names = BTreeSet::new();
        let suffix = format!(".{}", self.extension);

        if let Some(local_dir) = self.local_dir.as_ref().filter(|dir| dir.is_dir()) {
            let glob = RootedGlob::new(local_dir, &format!("**/*{suffix}"))?;
            glob.for_each_match(|_, relative| {
                if let Some(name) = strip_suffix(&slashed(relative), &suffix) {
                    names.insert(name);
                }
            })?;
        }

        let prefix = format!("{}/", self.repo_dir);
        let pattern = format!("{prefix}**/*{suffix}");
        for path in self.cache.list_files(&pattern)? {
            let path = path.replace('\\', "/");
            if let Some(name) = path.strip_prefix(&prefix).and_then(|rest| strip_suffix(rest, &suffix)) {
                names.insert(name);
            }
        }

        Ok(names.into_iter().collect())
    }

    pub fn find_plugin(&self, name: &str) -> Result<Option<PathBuf>> {
        if !is_plain_relative(Path::new(name)) {
            return Ok(None);
        }

        let file_name = format!("{name}.{}", self.extension);

        if let Some(local_dir) = self.local_dir.as_ref() {
            let path = local_dir.join(&file_name);
            if path.is_file() {
                return Ok(Some(path));
            }
        }

        self.cache
            .find_file(Path::new(&self.repo_dir).join(&file_name))
    }
}

fn validate_repo_dir(repo_dir: &Path) -> Result<String> {
    if repo_dir.as_os_str().is_empty() || !is_plain_relative(repo_dir) {
        return Err(RepoError::InvalidPluginDir(format!(
            "{} must be a relative path inside each repository",
            repo_dir.display()
        )));
    }

    Ok(slashed(repo_dir).trim_end_matches('/').to_string())
}

fn slashed(path: &Path) -> String {
    path.to_string_lossy().replace('\\', "/")
}

fn strip_suffix(path: &str, suffix: &str) -> Option<String> {
    path.strip_suffix(suffix)
        .filter(|name| !name.is_empty())
        .map(str::to_string)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    fn touch(path: PathBuf) {
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, "").unwrap();
    }

    #[test]
    fn repo_dir_is_required_and_relative() {
        let cache = RepositoryCache::new("/tmp/unused");

        for bad in ["", "/abs", "../up", "plugins/../../x"] {
            let err = PluginDir::new(cache.clone(), bad, "wasm").unwrap_err();
            assert!(matches!(err, RepoError::InvalidPluginDir(_)), "{bad}");
        }
        assert!(PluginDir::new(cache, "plugins", ".wasm").is_err());
    }

    #[test]
    fn trailing_slash_on_repo_dir_is_ignored() {
        let base = tempfile::tempdir().unwrap();
        touch(base.path().join("repo1/plugins/dns.wasm"));

        let plugins = PluginDir::new(RepositoryCache::new(base.path()), "plugins/", "wasm").unwrap();
        assert_eq!(plugins.list_plugins().unwrap(), vec!["dns"]);
        assert!(plugins.find_plugin("dns").unwrap().is_some());
    }

    #[test]
    fn lists_plugins_from_local_dir_and_every_repository() {
        let base = tempfile::tempdir().unwrap();
        let local = tempfile::tempdir().unwrap();
        touch(base.path().join("repo1/plugins/dns.wasm"));
        touch(base.path().join("repo1/plugins/net/http.wasm"));
        touch(base.path().join("repo2/plugins/dns.wasm"));
        touch(base.path().join("repo2/plugins/readme.md"));
        touch(base.path().join("repo2/other/ignored.wasm"));
        touch(local.path().join("local.wasm"));

        let plugins = PluginDir::new(RepositoryCache::new(base.path()), "plugins", "wasm")
            .unwrap()
            .with_local_dir(local.path());

        assert_eq!(
            plugins.list_plugins().unwrap(),
            vec!["dns", "local", "net/http"]
        );
    }

    #[test]
    fn find_prefers_local_then_first_repository() {
        let base = tempfile::tempdir().unwrap();
        let local = tempfile::tempdir().unwrap();
        touch(base.path().join("repo1/plugins/dns.wasm"));
        touch(base.path().join("repo2/plugins/dns.wasm"));
        touch(base.path().join("repo2/plugins/scan.wasm"));
        touch(local.path().join("scan.wasm"));

        let cache = RepositoryCache::new(base.path());
        let plugins = PluginDir::new(cache, "plugins", "wasm")
            .unwrap()
            .with_local_dir(local.path());

        assert_eq!(
            plugins.find_plugin("dns").unwrap(),
            Some(
                std::path::absolute(base.path().join("repo1"))
                    .unwrap()
                    .join("plugins/dns.wasm")
            )
        );
        assert_eq!(
            plugins.find_plugin("scan").unwrap(),
            Some(local.path().join("scan.wasm"))
        );
        assert_eq!(plugins.find_plugin("missing").unwrap(), None);
        assert_eq!(plugins.find_plugin("../escape").unwrap(), None);
    }
}
