pub mod cache;
pub mod git;
pub mod repository;
pub mod search;

pub use cache::{Repositories, RepositoryCache, UpdateReport};
pub use git::{GitRunner, SystemGit};
pub use repository::{DEFAULT_LIST_PATTERN, DEFAULT_REMOTE, InstallOptions, Repository};
