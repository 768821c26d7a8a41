//! Post-run checks on an output tree.
//!
//! Compares an output tree against the input it was produced from: every
//! mirrored path must exist, ineligible files must be byte-identical, and
//! eligible files must hold no remaining occurrence of the target and must
//! equal the rewrite of their input.

use crate::matcher::count_matches;
use crate::walk::{
    collect_entries, resolve_roots, Entry, FileError, RenameConfig, RenameError, Task,
};
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info};
use xxhash_rust::xxh3::xxh3_64;

#[derive(Debug)]
pub enum VerifyIssue {
    /// Output counterpart does not exist
    Missing,
    /// A file mirrored verbatim differs from its input
    IgnoredModified,
    /// The target still occurs in an eligible output file
    Residual { matches: usize },
    /// Output differs from the rewrite of the input
    Diverged,
    /// Either side could not be read
    Unreadable(FileError),
}

impl fmt::Display for VerifyIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            VerifyIssue::Missing => write!(f, "missing from output"),
            VerifyIssue::IgnoredModified => write!(f, "ignored file was modified"),
            VerifyIssue::Residual { matches } => {
                write!(f, "{} occurrence(s) of the target remain", matches)
            }
            VerifyIssue::Diverged => write!(f, "output differs from expected rewrite"),
            VerifyIssue::Unreadable(err) => write!(f, "{}", err),
        }
    }
}

#[derive(Debug, Default)]
pub struct VerifyReport {
    /// Paths checked, directories included
    pub checked: usize,
    pub issues: Vec<(PathBuf, VerifyIssue)>,
}

impl VerifyReport {
    pub fn is_clean(&self) -> bool {
        self.issues.is_empty()
    }
}

/// Check `config.output_root` against `config.input_root`.
///
/// An in-place config checks only that no target occurrences remain in
/// eligible files.
pub fn verify_tree(config: &RenameConfig) -> Result<VerifyReport, RenameError> {
    let roots = resolve_roots(&config.input_root, &config.output_root, false)?;
    if !roots.output.is_dir() {
        return Err(RenameError::Path {
            path: config.output_root.clone(),
            reason: "output tree does not exist".to_string(),
        });
    }

    info!(
        input = %roots.input.display(),
        output = %roots.output.display(),
        "verifying output tree"
    );

    let mut report = VerifyReport::default();
    for entry in collect_entries(&roots, &config.filter) {
        report.checked += 1;
        let issue = match entry {
            Entry::Dir(relative) => {
                let missing = !roots.output.join(&relative).is_dir();
                missing.then_some((relative, VerifyIssue::Missing))
            }
            Entry::File(Task::Failed(relative, err)) => {
                Some((relative, VerifyIssue::Unreadable(err)))
            }
            Entry::File(Task::Copy(relative, _)) => {
                check_copied(&roots.input, &roots.output, &relative).map(|issue| (relative, issue))
            }
            Entry::File(Task::Rewrite(relative)) => {
                check_rewritten(config, &roots.input, &roots.output, roots.in_place, &relative)
                    .map(|issue| (relative, issue))
            }
        };

        if let Some((path, issue)) = issue {
            debug!(path = %path.display(), %issue, "verification issue");
            report.issues.push((path, issue));
        }
    }

    Ok(report)
}

fn check_copied(input: &Path, output: &Path, relative: &Path) -> Option<VerifyIssue> {
    let dest = output.join(relative);
    if !dest.is_file() {
        return Some(VerifyIssue::Missing);
    }
    let original = match read(&input.join(relative)) {
        Ok(bytes) => bytes,
        Err(err) => return Some(VerifyIssue::Unreadable(err)),
    };
    let mirrored = match read(&dest) {
        Ok(bytes) => bytes,
        Err(err) => return Some(VerifyIssue::Unreadable(err)),
    };

    (xxh3_64(&original) != xxh3_64(&mirrored) || original.len() != mirrored.len())
        .then_some(VerifyIssue::IgnoredModified)
}

fn check_rewritten(
    config: &RenameConfig,
    input: &Path,
    output: &Path,
    in_place: bool,
    relative: &Path,
) -> Option<VerifyIssue> {
    let dest = output.join(relative);
    if !dest.is_file() {
        return Some(VerifyIssue::Missing);
    }

    let original = match read(&input.join(relative)) {
        Ok(bytes) => bytes,
        Err(err) => return Some(VerifyIssue::Unreadable(err)),
    };
    // Undecodable inputs are mirrored verbatim by the walker
    let Ok(original) = String::from_utf8(original) else {
        return if in_place {
            None
        } else {
            check_copied(input, output, relative)
        };
    };

    let mirrored = match read_text(&dest) {
        Ok(text) => text,
        Err(err) => return Some(VerifyIssue::Unreadable(err)),
    };
    let residual = count_matches(&mirrored, config.renamer.target());
    if residual > 0 {
        return Some(VerifyIssue::Residual { matches: residual });
    }
    if in_place {
        return None;
    }

    (config.renamer.rewrite(&original).text != mirrored).then_some(VerifyIssue::Diverged)
}

fn read(path: &Path) -> Result<Vec<u8>, FileError> {
    fs::read(path).map_err(|source| FileError::Read {
        path: path.to_path_buf(),
        source,
    })
}

fn read_text(path: &Path) -> Result<String, FileError> {
    String::from_utf8(read(path)?).map_err(|_| FileError::Decode {
        path: path.to_path_buf(),
    })
}
