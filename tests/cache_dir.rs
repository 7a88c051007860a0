use std::collections::HashSet;
use std::ffi::OsString;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use repocache::{GitRunner, RepoError, Repository, RepositoryCache};
use tempfile::TempDir;

/// Two repositories laid out like a real cache:
///
/// ```text
/// repo1/file1.txt  repo1/dir/file3.txt
/// repo2/file2.txt  repo2/dir/file3.txt  repo2/dir/file4.txt
/// ```
fn fixture_cache() -> (TempDir, PathBuf, RepositoryCache) {
    let dir = tempfile::tempdir().unwrap();
    let base = std::path::absolute(dir.path()).unwrap();

    for file in [
        "repo1/file1.txt",
        "repo1/dir/file3.txt",
        "repo2/file2.txt",
        "repo2/dir/file3.txt",
        "repo2/dir/file4.txt",
    ] {
        let path = base.join(file);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, file).unwrap();
    }

    let cache = RepositoryCache::new(&base);
    (dir, base, cache)
}

#[derive(Debug, Default)]
struct CloneOnlyGit {
    clones: Mutex<Vec<String>>,
}

impl GitRunner for CloneOnlyGit {
    fn run(&self, args: &[OsString], _cwd: Option<&Path>) -> repocache::Result<()> {
        let args: Vec<String> = args
            .iter()
            .map(|arg| arg.to_string_lossy().into_owned())
            .collect();
        if let (Some("clone"), Some(dest)) = (args.first().map(String::as_str), args.last()) {
            fs::create_dir_all(dest)?;
            self.clones.lock().unwrap().push(dest.clone());
        }
        Ok(())
    }

    fn capture(&self, _args: &[OsString], _cwd: Option<&Path>) -> repocache::Result<String> {
        Ok(String::new())
    }
}

#[test]
fn find_file_returns_first_hit_in_name_order() {
    let (_dir, base, cache) = fixture_cache();

    assert_eq!(
        cache.find_file("file2.txt").unwrap(),
        Some(base.join("repo2").join("file2.txt"))
    );
    assert_eq!(
        cache.find_file("dir/file3.txt").unwrap(),
        Some(base.join("repo1").join("dir/file3.txt"))
    );
    assert_eq!(cache.find_file("x.txt").unwrap(), None);
}

#[test]
fn glob_is_repository_major() {
    let (_dir, base, cache) = fixture_cache();

    assert_eq!(
        cache.glob("dir/*.txt").unwrap(),
        vec![
            base.join("repo1/dir/file3.txt"),
            base.join("repo2/dir/file3.txt"),
            base.join("repo2/dir/file4.txt"),
        ]
    );
}

#[test]
fn glob_each_streams_the_same_matches() {
    let (_dir, _base, cache) = fixture_cache();

    let mut streamed = Vec::new();
    cache
        .glob_each("**/*.txt", |path| streamed.push(path.to_path_buf()))
        .unwrap();

    assert_eq!(streamed, cache.glob("**/*.txt").unwrap());
    assert_eq!(streamed.len(), 5);
}

#[test]
fn list_files_unions_relative_paths() {
    let (_dir, _base, cache) = fixture_cache();

    let expected: HashSet<String> = ["dir/file3.txt", "dir/file4.txt"]
        .into_iter()
        .map(|file| Path::new(file).to_string_lossy().into_owned())
        .collect();
    assert_eq!(cache.list_files("dir/*.txt").unwrap(), expected);

    let everything = cache
        .list_files(repocache::repo::DEFAULT_LIST_PATTERN)
        .unwrap();
    assert_eq!(everything.len(), 4);
}

#[test]
fn brace_groups_select_files_across_repositories() {
    let (_dir, base, cache) = fixture_cache();

    assert_eq!(
        cache.glob("{file1,file2}.txt").unwrap(),
        vec![base.join("repo1/file1.txt"), base.join("repo2/file2.txt")]
    );
}

#[test]
fn purge_then_enumerate_is_empty() {
    let (_dir, base, cache) = fixture_cache();

    cache.purge().unwrap();

    assert!(base.is_dir());
    assert_eq!(cache.repositories().unwrap().count(), 0);
    assert!(cache.list_files("**/*").unwrap().is_empty());
}

#[test]
fn remove_then_resolve_is_not_found() {
    let (_dir, base, cache) = fixture_cache();

    cache.remove("repo1").unwrap();

    assert!(matches!(
        cache.resolve("repo1"),
        Err(RepoError::RepositoryNotFound(_))
    ));
    assert!(base.join("repo2").is_dir());
}

#[test]
fn install_then_find_round_trips_name() {
    let dir = tempfile::tempdir().unwrap();
    let base = dir.path().join("repos");
    let git = Arc::new(CloneOnlyGit::default());
    let cache = RepositoryCache::with_git(&base, git.clone());

    let installed = cache.install("https://example.com/x/foo.git", None).unwrap();
    let found = Repository::find(base.join("foo")).unwrap();

    assert_eq!(installed.name(), "foo");
    assert_eq!(found.name(), installed.name());
    assert!(cache.has("foo"));
    assert_eq!(
        git.clones.lock().unwrap().as_slice(),
        [base.join("foo").to_string_lossy().into_owned()]
    );
}
