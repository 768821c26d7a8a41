//! Per-file outcomes and the run report.

use crate::filter::CopyReason;
use crate::walk::errors::FileError;
use std::fmt;
use std::path::PathBuf;

/// What happened to one file.
#[derive(Debug)]
#[must_use = "FileOutcome should be checked for failures"]
pub enum FileOutcome {
    /// Target occurrences were replaced
    Rewritten { matches: usize },
    /// Eligible, but nothing matched
    Unchanged,
    /// Ineligible, mirrored verbatim
    Copied(CopyReason),
    /// Read, decode, write or enumeration failure
    Failed(FileError),
}

impl fmt::Display for FileOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FileOutcome::Rewritten { matches } => write!(f, "rewrote {} occurrence(s)", matches),
            FileOutcome::Unchanged => write!(f, "no occurrences"),
            FileOutcome::Copied(CopyReason::Ignored) => write!(f, "copied (ignored)"),
            FileOutcome::Copied(CopyReason::Extension) => write!(f, "copied (extension)"),
            FileOutcome::Failed(err) => write!(f, "failed: {}", err),
        }
    }
}

/// Before/after text of a rewritten file, kept only when requested.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileChange {
    pub original: String,
    pub rewritten: String,
}

#[derive(Debug)]
pub struct FileReport {
    /// Path relative to the input root
    pub path: PathBuf,
    pub outcome: FileOutcome,
    pub change: Option<FileChange>,
}

impl FileReport {
    pub fn new(path: PathBuf, outcome: FileOutcome) -> Self {
        Self {
            path,
            outcome,
            change: None,
        }
    }
}

/// Aggregate result of one run, in traversal order.
#[derive(Debug, Default)]
pub struct RenameReport {
    pub files: Vec<FileReport>,
    /// Directories mirrored (or that would be, on a dry run)
    pub directories: usize,
    pub in_place: bool,
    pub dry_run: bool,
}

impl RenameReport {
    /// Number of files written to the output tree.
    ///
    /// In place, only rewritten files are written; otherwise every file that
    /// did not fail is. A dry run writes nothing.
    pub fn written(&self) -> usize {
        if self.dry_run {
            return 0;
        }
        self.files
            .iter()
            .filter(|file| match file.outcome {
                FileOutcome::Rewritten { .. } => true,
                FileOutcome::Unchanged | FileOutcome::Copied(_) => !self.in_place,
                FileOutcome::Failed(_) => false,
            })
            .count()
    }

    pub fn rewritten(&self) -> impl Iterator<Item = &FileReport> {
        self.files
            .iter()
            .filter(|file| matches!(file.outcome, FileOutcome::Rewritten { .. }))
    }

    pub fn unchanged(&self) -> impl Iterator<Item = &FileReport> {
        self.files
            .iter()
            .filter(|file| matches!(file.outcome, FileOutcome::Unchanged))
    }

    pub fn copied(&self) -> impl Iterator<Item = &FileReport> {
        self.files
            .iter()
            .filter(|file| matches!(file.outcome, FileOutcome::Copied(_)))
    }

    pub fn failed(&self) -> impl Iterator<Item = &FileReport> {
        self.files
            .iter()
            .filter(|file| matches!(file.outcome, FileOutcome::Failed(_)))
    }

    pub fn total_matches(&self) -> usize {
        self.files
            .iter()
            .map(|file| match file.outcome {
                FileOutcome::Rewritten { matches } => matches,
                _ => 0,
            })
            .sum()
    }

    pub fn is_success(&self) -> bool {
        self.failed().next().is_none()
    }
}
