//! Error kinds surfaced by the repository cache.
//!
//! `CommandNotInstalled` is the only kind treated as fatal for a batch
//! operation; see [`RepoError::is_fatal`].

use thiserror::Error;

#[derive(Error, Debug)]
pub enum RepoError {
    #[error("{0}")]
    RepositoryNotFound(String),

    #[error("{0} is not installed")]
    CommandNotInstalled(String),

    #[error("command failed ({status}): {command}")]
    CommandFailed { command: String, status: String },

    #[error("supply at most one of branch ({branch}) or tag ({tag})")]
    ConflictingRef { branch: String, tag: String },

    #[error("repository already installed: {0}")]
    AlreadyInstalled(String),

    #[error("invalid repository name: {0:?}")]
    InvalidName(String),

    #[error("invalid plugin directory: {0}")]
    InvalidPluginDir(String),

    #[error("invalid glob pattern: {0}")]
    Glob(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl RepoError {
    /// True when no further git invocation can succeed either.
    pub fn is_fatal(&self) -> bool {
        matches!(self, RepoError::CommandNotInstalled(_))
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, RepoError::RepositoryNotFound(_))
    }
}

pub type Result<T> = std::result::Result<T, RepoError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_missing_git_is_fatal() {
        assert!(RepoError::CommandNotInstalled("git".into()).is_fatal());
        assert!(
            !RepoError::CommandFailed {
                command: "git pull origin".into(),
                status: "exit status: 1".into(),
            }
            .is_fatal()
        );
        assert!(!RepoError::RepositoryNotFound("x".into()).is_fatal());
    }

    #[test]
    fn command_failed_message_carries_command_line() {
        let err = RepoError::CommandFailed {
            command: "git checkout v1.0".into(),
            status: "exit status: 1".into(),
        };
        assert!(err.to_string().contains("git checkout v1.0"));
    }
}
