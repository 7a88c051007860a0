use anyhow::{Context, Result};
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::repo::{RepositoryCache, SystemGit};

const APP_NAME: &str = "repocache";

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub cache: CacheConfig,
    pub git: GitConfig,
    pub log: LogConfig,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    pub path: Option<PathBuf>,
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct GitConfig {
    pub program: PathBuf,
    pub depth: Option<u32>,
}

impl Default for GitConfig {
    fn default() -> Self {
        Self {
            program: PathBuf::from("git"),
            depth: None,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct LogConfig {
    pub filter: String,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            filter: format!("{APP_NAME}=info"),
        }
    }
}

impl AppConfig {
    /// Load configuration with layering: defaults → user config.
    pub fn load() -> Result<Self> {
        let defaults = include_str!("../../config/default.toml");
        let mut config = Self::from_toml(defaults).context("built-in defaults")?;

        if let Some(config_path) = user_config_path() {
            if config_path.exists() {
                let user_str = fs::read_to_string(&config_path)
                    .with_context(|| format!("reading {}", config_path.display()))?;
                config = Self::from_toml(&user_str)
                    .with_context(|| format!("parsing {}", config_path.display()))?;
            }
        }

        Ok(config)
    }

    /// Sections and keys missing from `raw` keep their defaults.
    pub fn from_toml(raw: &str) -> Result<Self> {
        Ok(toml::from_str(raw)?)
    }

    /// The configured cache directory, or the per-user default.
    pub fn cache_dir(&self) -> PathBuf {
        match self.cache.path.as_ref() {
            Some(path) => expand_tilde(path),
            None => default_cache_dir(),
        }
    }

    pub fn git(&self) -> SystemGit {
        SystemGit::new(expand_tilde(&self.git.program))
    }

    /// A cache rooted at `override_dir` when given, else at [`Self::cache_dir`].
    pub fn repository_cache(&self, override_dir: Option<&Path>) -> RepositoryCache {
        let path = override_dir.map_or_else(|| self.cache_dir(), expand_tilde);
        RepositoryCache::with_git(path, Arc::new(self.git()))
    }
}

pub fn user_config_path() -> Option<PathBuf> {
    directories::ProjectDirs::from("", "", APP_NAME).map(|d| d.config_dir().join("config.toml"))
}

/// Per-user log directory, e.g. `~/.local/share/repocache` on Linux.
pub fn log_dir() -> Option<PathBuf> {
    directories::ProjectDirs::from("", "", APP_NAME).map(|d| d.data_dir().to_path_buf())
}

pub fn default_cache_dir() -> PathBuf {
    if let Some(project_dirs) = directories::ProjectDirs::from("", "", APP_NAME) {
        return project_dirs.cache_dir().join("repos");
    }

    if let Some(base_dirs) = directories::BaseDirs::new() {
        return base_dirs.home_dir().join(".cache").join(APP_NAME).join("repos");
    }

    PathBuf::from(".repocache").join("repos")
}

pub fn expand_tilde(path: &Path) -> PathBuf {
    let text = path.to_string_lossy();
    if text != "~" && !text.starts_with("~/") {
        return path.to_path_buf();
    }

    if let Some(base_dirs) = directories::BaseDirs::new() {
        let home = base_dirs.home_dir().to_string_lossy();
        return PathBuf::from(text.replacen('~', &home, 1));
    }

    path.to_path_buf()
}
