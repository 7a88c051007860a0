//! A local cache of git-cloned plugin repositories.
//!
//! [`RepositoryCache`] owns a base directory whose immediate subdirectories
//! are the installed repositories. Each one is a [`Repository`], backed by
//! the `git` executable for clone/pull/checkout and by the filesystem for
//! file lookup and glob search. [`PluginDir`] layers plugin discovery on top
//! of the cache.
//!
//! Everything is synchronous: git runs to completion on the calling thread.

pub mod error;
pub mod model;
pub mod plugin;
pub mod repo;

pub use error::{RepoError, Result};
pub use model::config::AppConfig;
pub use plugin::PluginDir;
pub use repo::{
    GitRunner, InstallOptions, Repositories, Repository, RepositoryCache, SystemGit,
    UpdateReport,
};
