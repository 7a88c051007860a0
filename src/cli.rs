use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};

use repocache::repo::DEFAULT_LIST_PATTERN;
use repocache::{AppConfig, InstallOptions, RepositoryCache};

/// Manage a local cache of git-cloned plugin repositories
#[derive(Debug, Parser)]
#[command(name = "repocache", version)]
#[command(about = "Manage a local cache of git-cloned plugin repositories", long_about = None)]
pub struct Cli {
    /// Overrides the configured cache directory
    #[arg(short = 'C', long, value_name = "DIR", global = true)]
    pub cache_dir: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// List all repositories, or check that one is installed
    List {
        #[arg(value_name = "REPO")]
        name: Option<String>,
    },
    /// Print a repository's name, origin URL and files
    Show {
        #[arg(value_name = "REPO")]
        name: String,
    },
    /// Clone a git repository into the cache directory
    Install {
        /// URI of the git repository
        uri: String,
        /// Install under this name instead of the one derived from the URI
        #[arg(long)]
        name: Option<String>,
        /// Branch to check out after cloning
        #[arg(short, long, conflicts_with = "tag")]
        branch: Option<String>,
        /// Tag to check out after cloning
        #[arg(short, long)]
        tag: Option<String>,
        /// Shallow-clone depth in commits
        #[arg(long)]
        depth: Option<u32>,
    },
    /// Update one repository, or all of them
    Update {
        #[arg(value_name = "REPO")]
        name: Option<String>,
        /// Pull and check out this branch
        #[arg(short, long, requires = "name", conflicts_with = "tag")]
        branch: Option<String>,
        /// Check out this tag after pulling
        #[arg(short, long, requires = "name")]
        tag: Option<String>,
    },
    /// Delete a repository from the cache directory
    Remove {
        #[arg(value_name = "REPO")]
        name: String,
    },
    /// Delete every repository from the cache directory
    Purge,
    /// List relative file paths found in any repository
    Files {
        #[arg(default_value = DEFAULT_LIST_PATTERN)]
        pattern: String,
    },
    /// Print the first repository file at a relative path
    Find { path: PathBuf },
}

pub fn run(cli: Cli, config: &AppConfig) -> Result<()> {
    let cache = config.repository_cache(cli.cache_dir.as_deref());
    tracing::debug!("using cache directory {cache}");

    match cli.command {
        Commands::List { name } => list(&cache, name.as_deref()),
        Commands::Show { name } => show(&cache, &name),
        Commands::Install {
            uri,
            name,
            branch,
            tag,
            depth,
        } => {
            let options = InstallOptions {
                branch,
                tag,
                depth: depth.or(config.git.depth),
            };
            println!("Installing repository from {uri} ...");
            let repo = cache.install_with(&uri, name.as_deref(), &options)?;
            println!("Installed {repo} into {}", repo.path().display());
            Ok(())
        }
        Commands::Update { name, branch, tag } => match name {
            Some(name) => {
                println!("Updating repository {name} ...");
                cache.update_one(&name, branch.as_deref(), tag.as_deref())?;
                Ok(())
            }
            None => update_all(&cache),
        },
        Commands::Remove { name } => {
            cache.remove(&name)?;
            println!("Removed {name}");
            Ok(())
        }
        Commands::Purge => {
            for name in cache.purge()? {
                println!("Removed {name}");
            }
            Ok(())
        }
        Commands::Files { pattern } => {
            let mut files: Vec<String> = cache.list_files(&pattern)?.into_iter().collect();
            files.sort();
            for file in files {
                println!("{file}");
            }
            Ok(())
        }
        Commands::Find { path } => {
            if let Some(found) = cache.find_file(&path)? {
                println!("{}", found.display());
            }
            Ok(())
        }
    }
}

fn list(cache: &RepositoryCache, name: Option<&str>) -> Result<()> {
    match name {
        Some(name) => println!("  {}", cache.resolve(name)?),
        None => {
            for repo in cache.repositories()? {
                println!("  {repo}");
            }
        }
    }
    Ok(())
}

fn show(cache: &RepositoryCache, name: &str) -> Result<()> {
    let repo = cache.resolve(name)?;
    let url = repo.url()?;

    println!("[ {repo} ]");
    println!();
    println!("  Name:  {}", repo.name());
    println!("  URI:   {}", url.as_deref().unwrap_or("-"));
    println!("  Path:  {}", repo.path().display());
    println!("  Files:");
    for file in repo.list_files(DEFAULT_LIST_PATTERN)? {
        println!("    {file}");
    }
    Ok(())
}

fn update_all(cache: &RepositoryCache) -> Result<()> {
    let report = cache.update()?;

    for name in &report.updated {
        println!("Updated {name}");
    }
    if report.is_clean() {
        return Ok(());
    }

    for (name, err) in &report.failed {
        eprintln!("✗ failed to update repository {name}: {err}");
    }
    eprintln!(
        "{} of {} repositories failed to update",
        report.failed.len(),
        report.updated.len() + report.failed.len()
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn install_rejects_branch_and_tag_together() {
        let parsed = Cli::try_parse_from([
            "repocache", "install", "https://example.com/foo.git", "-b", "main", "-t", "v1",
        ]);
        assert!(parsed.is_err());
    }

    #[test]
    fn cache_dir_is_global() {
        let cli = Cli::try_parse_from(["repocache", "purge", "-C", "/tmp/cache"]).unwrap();
        assert_eq!(cli.cache_dir, Some(PathBuf::from("/tmp/cache")));
        assert!(matches!(cli.command, Commands::Purge));
    }

    #[test]
    fn update_branch_requires_a_repository() {
        assert!(Cli::try_parse_from(["repocache", "update", "-b", "main"]).is_err());
        let cli = Cli::try_parse_from(["repocache", "update", "repo1", "-b", "main"]).unwrap();
        assert!(matches!(
            cli.command,
            Commands::Update { name: Some(_), branch: Some(_), tag: None }
        ));
    }
}
