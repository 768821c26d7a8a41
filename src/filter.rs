//! Per-path eligibility decisions.
//!
//! Rules are glob patterns evaluated against paths relative to the tree
//! root, using `/` as the separator. A rule applies to a path when it matches
//! the path itself or any of its ancestor prefixes, so `vendor` covers
//! everything below `vendor/`. Patterns are anchored at the root; use
//! `**/name` to match at any depth. `*` also crosses `/`, so `*.txt` matches
//! text files anywhere.

use globset::{GlobBuilder, GlobSet, GlobSetBuilder};
use serde::Deserialize;
use std::collections::HashSet;
use std::path::{Component, Path, PathBuf};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum FilterError {
    #[error("malformed rule '{pattern}': {reason}")]
    MalformedRule { pattern: String, reason: String },
}

/// Raw rule lists, as written in config or on the command line.
#[derive(Debug, Deserialize, Default, Clone, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct FilterRules {
    /// Paths mirrored unchanged.
    #[serde(default)]
    pub ignore: Vec<String>,
    /// Paths neither rewritten nor mirrored.
    #[serde(default)]
    pub skip: Vec<String>,
    /// When non-empty, only these extensions are rewritten.
    #[serde(default)]
    pub extensions: Vec<String>,
}

impl FilterRules {
    /// Append `other`'s rules to these.
    pub fn extend(&mut self, other: FilterRules) {
        self.ignore.extend(other.ignore);
        self.skip.extend(other.skip);
        self.extensions.extend(other.extensions);
    }
}

/// Why an ineligible file is copied instead of rewritten.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CopyReason {
    /// Matched an ignore rule
    Ignored,
    /// Extension not in the allow-list
    Extension,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FilterDecision {
    Rewrite,
    Copy(CopyReason),
    Skip,
}

#[derive(Debug, Clone, Default)]
pub struct FileFilter {
    ignore: Option<GlobSet>,
    skip: Option<GlobSet>,
    extensions: HashSet<String>,
    /// Exact relative paths always mirrored unchanged
    pinned: HashSet<PathBuf>,
}

impl FileFilter {
    /// Compile rules. Any malformed pattern fails the whole filter.
    pub fn new(rules: &FilterRules) -> Result<Self, FilterError> {
        let extensions = rules
            .extensions
            .iter()
            .map(|ext| normalize_extension(ext))
            .collect::<Result<HashSet<_>, _>>()?;

        Ok(Self {
            ignore: compile_globset(&rules.ignore)?,
            skip: compile_globset(&rules.skip)?,
            extensions,
            pinned: HashSet::new(),
        })
    }

    /// Treat the single file at `relative` as ignored. Unlike a rule, the
    /// path is taken literally.
    pub fn ignore_path(mut self, relative: impl Into<PathBuf>) -> Self {
        self.pinned.insert(relative.into());
        self
    }

    /// A filter that rewrites every file.
    pub fn allow_all() -> Self {
        Self::default()
    }

    /// Decide what happens to the file at `relative` (relative to the root).
    pub fn decide(&self, relative: &Path) -> FilterDecision {
        if matches_any_prefix(self.skip.as_ref(), relative) {
            return FilterDecision::Skip;
        }
        if self.pinned.contains(relative) || matches_any_prefix(self.ignore.as_ref(), relative) {
            return FilterDecision::Copy(CopyReason::Ignored);
        }
        if !self.extensions.is_empty() {
            let extension = relative
                .extension()
                .and_then(|ext| ext.to_str())
                .map(|ext| ext.to_ascii_lowercase());
            match extension {
                Some(ext) if self.extensions.contains(&ext) => {}
                _ => return FilterDecision::Copy(CopyReason::Extension),
            }
        }
        FilterDecision::Rewrite
    }

    pub fn is_eligible(&self, relative: &Path) -> bool {
        self.decide(relative) == FilterDecision::Rewrite
    }

    /// Whether a directory (and everything below it) is left out of the
    /// output tree.
    pub fn is_skipped(&self, relative: &Path) -> bool {
        matches_any_prefix(self.skip.as_ref(), relative)
    }
}

fn matches_any_prefix(set: Option<&GlobSet>, relative: &Path) -> bool {
    let Some(set) = set else {
        return false;
    };

    let mut prefix = String::new();
    for component in relative.components() {
        let Component::Normal(part) = component else {
            continue;
        };
        if !prefix.is_empty() {
            prefix.push('/');
        }
        prefix.push_str(&part.to_string_lossy());
        if set.is_match(&prefix) {
            return true;
        }
    }
    false
}

fn compile_globset(patterns: &[String]) -> Result<Option<GlobSet>, FilterError> {
    let mut builder = GlobSetBuilder::new();
    let mut added = false;

    for raw in patterns {
        let pattern = normalize_pattern(raw)?;
        let glob = GlobBuilder::new(&pattern)
            .literal_separator(false)
            .build()
            .map_err(|err| FilterError::MalformedRule {
                pattern: raw.clone(),
                reason: err.kind().to_string(),
            })?;
        builder.add(glob);
        added = true;
    }

    if !added {
        return Ok(None);
    }

    builder
        .build()
        .map(Some)
        .map_err(|err| FilterError::MalformedRule {
            pattern: patterns.join(", "),
            reason: err.to_string(),
        })
}

fn normalize_pattern(raw: &str) -> Result<String, FilterError> {
    let malformed = |reason: &str| FilterError::MalformedRule {
        pattern: raw.to_string(),
        reason: reason.to_string(),
    };

    let mut pattern = raw.trim().replace('\\', "/");
    while let Some(rest) = pattern.strip_prefix("./") {
        pattern = rest.to_string();
    }
    let pattern = pattern.trim_end_matches('/').to_string();

    if pattern.is_empty() {
        return Err(malformed("pattern is empty"));
    }
    if pattern.starts_with('/') || Path::new(&pattern).has_root() {
        return Err(malformed("pattern must be relative to the tree root"));
    }
    if pattern.split('/').any(|part| part == "..") {
        return Err(malformed("pattern cannot leave the tree root"));
    }
    Ok(pattern)
}

fn normalize_extension(raw: &str) -> Result<String, FilterError> {
    let ext = raw.trim().trim_start_matches('.').to_ascii_lowercase();
    if ext.is_empty() || ext.contains(['/', '\\']) {
        return Err(FilterError::MalformedRule {
            pattern: raw.to_string(),
            reason: "not a file extension".to_string(),
        });
    }
    Ok(ext)
}
