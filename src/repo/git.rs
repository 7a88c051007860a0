//! The git subprocess seam.
//!
//! Every version-control action goes through a [`GitRunner`]. The production
//! runner, [`SystemGit`], spawns the `git` executable found on `PATH` (or a
//! configured program) and blocks until it exits. The working directory is
//! passed to the spawned process; the caller's current directory is never
//! changed.

use std::ffi::{OsStr, OsString};
use std::fmt;
use std::io;
use std::path::{Path, PathBuf};
use std::process::{Command, ExitStatus, Stdio};

use crate::error::{RepoError, Result};

pub trait GitRunner: fmt::Debug + Send + Sync {
    /// Runs `git <args>` with stdio inherited from this process.
    fn run(&self, args: &[OsString], cwd: Option<&Path>) -> Result<()>;

    /// Runs `git <args>` and returns its trimmed stdout.
    fn capture(&self, args: &[OsString], cwd: Option<&Path>) -> Result<String>;
}

#[derive(Debug, Clone)]
pub struct SystemGit {
    program: PathBuf,
}

impl Default for SystemGit {
    fn default() -> Self {
        Self::new("git")
    }
}

impl SystemGit {
    pub fn new(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
        }
    }

    fn command(&self, args: &[OsString], cwd: Option<&Path>) -> Result<Command> {
        let mut cmd = Command::new(&self.program);
        cmd.args(args);

        if let Some(dir) = cwd {
            // A missing cwd makes spawn fail with NotFound, which would read
            // as a missing git executable.
            if !dir.is_dir() {
                return Err(RepoError::RepositoryNotFound(format!(
                    "repository does not exist: {}",
                    dir.display()
                )));
            }
            cmd.current_dir(dir);
        }

        cmd.env("GIT_TERMINAL_PROMPT", "0");
        cmd.stdin(Stdio::null());
        Ok(cmd)
    }

    fn spawn_error(&self, err: io::Error) -> RepoError {
        tracing::debug!("failed to spawn {}: {err}", self.program.display());
        RepoError::CommandNotInstalled(self.program.display().to_string())
    }

    fn check_status(&self, args: &[OsString], status: ExitStatus) -> Result<()> {
        if status.success() {
            return Ok(());
        }

        Err(RepoError::CommandFailed {
            command: command_line(&self.program, args),
            status: status.to_string(),
        })
    }
}

impl GitRunner for SystemGit {
    fn run(&self, args: &[OsString], cwd: Option<&Path>) -> Result<()> {
        let mut cmd = self.command(args, cwd)?;
        tracing::debug!("spawning {}", command_line(&self.program, args));

        let status = cmd.status().map_err(|err| self.spawn_error(err))?;
        self.check_status(args, status)
    }

    fn capture(&self, args: &[OsString], cwd: Option<&Path>) -> Result<String> {
        let mut cmd = self.command(args, cwd)?;
        cmd.stdout(Stdio::piped());
        cmd.stderr(Stdio::piped());
        tracing::debug!("spawning {}", command_line(&self.program, args));

        let output = cmd.output().map_err(|err| self.spawn_error(err))?;
        self.check_status(args, output.status)?;

        Ok(String::from_utf8_lossy(&output.stdout).trim().to_string())
    }
}

/// Renders a program and its arguments as a single shell-like line.
pub fn command_line(program: &Path, args: &[OsString]) -> String {
    let mut line = program.display().to_string();
    for arg in args {
        line.push(' ');
        line.push_str(&arg.to_string_lossy());
    }
    line
}

pub(crate) fn args<I, S>(items: I) -> Vec<OsString>
where
    I: IntoIterator<Item = S>,
    S: AsRef<OsStr>,
{
    items
        .into_iter()
        .map(|item| item.as_ref().to_os_string())
        .collect()
}
