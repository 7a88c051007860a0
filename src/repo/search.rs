use std::ffi::OsStr;
use std::path::{Path, PathBuf};

use ignore::WalkBuilder;
use ignore::overrides::{Override, OverrideBuilder};

use crate::error::{RepoError, Result};

/// A shell-style glob rooted at one directory.
///
/// `*` stays within a path segment, `**` spans segments and `{a,b}` picks
/// alternatives. Patterns are always relative to the root, so `*.txt` only
/// matches top-level files. As in a shell, wildcards do not match names that
/// start with a dot.
#[derive(Debug, Clone)]
pub struct RootedGlob {
    root: PathBuf,
    matcher: Override,
    dot_prefixes: Vec<String>,
}

impl RootedGlob {
    pub fn new(root: &Path, pattern: &str) -> Result<Self> {
        let relative = pattern.trim_start_matches('/');
        if relative.is_empty() {
            return Err(RepoError::Glob(format!("empty pattern: {pattern:?}")));
        }

        let mut builder = OverrideBuilder::new(root);
        builder
            .add(&format!("/{relative}"))
            .map_err(|err| RepoError::Glob(format!("{pattern:?}: {err}")))?;
        let matcher = builder
            .build()
            .map_err(|err| RepoError::Glob(format!("{pattern:?}: {err}")))?;

        Ok(Self {
            root: root.to_path_buf(),
            matcher,
            dot_prefixes: dot_prefixes(relative),
        })
    }

    pub fn is_match(&self, relative: &Path, is_dir: bool) -> bool {
        self.matcher.matched(relative, is_dir).is_whitelist()
    }

    /// Walks the root depth-first in file-name order and hands every match to
    /// `visit` as `(absolute, relative)`.
    ///
    /// `.git` is never entered. Other dot-entries only match where the pattern
    /// itself names a leading dot, so `*` and `**` pass over them. Entries that
    /// cannot be read are skipped.
    pub fn for_each_match<F>(&self, mut visit: F) -> Result<()>
    where
        F: FnMut(&Path, &Path),
    {
        let walker = WalkBuilder::new(&self.root)
            .standard_filters(false)
            .filter_entry(|entry| entry.file_name() != OsStr::new(".git"))
            .sort_by_file_name(|a, b| a.cmp(b))
            .build();

        for entry in walker {
            let entry = match entry {
                Ok(entry) => entry,
                Err(err) => {
                    tracing::debug!(
                        "skipping unreadable entry under {}: {err}",
                        self.root.display()
                    );
                    continue;
                }
            };
            if entry.depth() == 0 {
                continue;
            }

            let Ok(relative) = entry.path().strip_prefix(&self.root) else {
                continue;
            };
            if !self.admits_hidden(relative) {
                continue;
            }
            let is_dir = entry.file_type().is_some_and(|kind| kind.is_dir());

            if self.is_match(relative, is_dir) {
                visit(entry.path(), relative);
            }
        }

        Ok(())
    }

    /// Every dot-named component of `relative` must be spelled out by a
    /// pattern segment starting with a dot.
    fn admits_hidden(&self, relative: &Path) -> bool {
        relative.components().all(|component| {
            let name = component.as_os_str().to_string_lossy();
            !name.starts_with('.')
                || self
                    .dot_prefixes
                    .iter()
                    .any(|prefix| name.starts_with(prefix.as_str()))
        })
    }
}

/// Literal leading text of each pattern segment that starts with a dot, up
/// to the first glob metacharacter.
fn dot_prefixes(pattern: &str) -> Vec<String> {
    pattern
        .split('/')
        .filter(|segment| segment.starts_with('.'))
        .map(|segment| {
            segment
                .split(['*', '?', '[', '{'])
                .next()
                .unwrap_or(".")
                .to_string()
        })
        .collect()
}
