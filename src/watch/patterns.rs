// src/watch/patterns.rs

use std::fmt;

use globset::{Glob, GlobSet, GlobSetBuilder};

use crate::errors::{ProcwatchError, Result};

/// Compiled glob patterns for a single task.
///
/// Patterns are compiled once at construction and are assumed to be relative
/// to the watched root directory; the watcher passes root-relative paths
/// (e.g. `"src/main.go"`) into [`PathMatcher::matches`].
#[derive(Clone)]
pub struct PathMatcher {
    set: GlobSet,
}

impl fmt::Debug for PathMatcher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PathMatcher")
            .field("patterns", &self.set.len())
            .finish_non_exhaustive()
    }
}

impl PathMatcher {
    /// Compile `patterns` for the named task.
    ///
    /// Any syntactically invalid pattern fails the whole construction, so a
    /// misconfigured task can never start with silently skipped matching.
    pub fn new(task: &str, patterns: &[String]) -> Result<Self> {
        let mut builder = GlobSetBuilder::new();

        for pattern in patterns {
            let glob = Glob::new(pattern).map_err(|err| {
                ProcwatchError::PatternError(format!(
                    "invalid glob pattern '{pattern}' for task '{task}': {err}"
                ))
            })?;
            builder.add(glob);
        }

        let set = builder.build().map_err(|err| {
            ProcwatchError::PatternError(format!(
                "building glob set for task '{task}': {err}"
            ))
        })?;

        Ok(Self { set })
    }

    /// True iff any compiled pattern matches the given root-relative path.
    ///
    /// An empty pattern set never matches: a task without `paths` is never
    /// reloaded by filesystem activity.
    pub fn matches(&self, path: &str) -> bool {
        self.set.is_match(path)
    }

    pub fn is_empty(&self) -> bool {
        self.set.is_empty()
    }
}
