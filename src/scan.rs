//! Read-only listing of target occurrences across a tree.

use crate::filter::FileFilter;
use crate::ident::QualifiedIdent;
use crate::matcher::{find_matches, locate};
use crate::walk::{collect_entries, resolve_roots, Entry, FileError, RenameError, Task};
use serde::Serialize;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::debug;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Occurrence {
    pub line: usize,
    pub column: usize,
    pub byte_start: usize,
    pub byte_end: usize,
    /// Matched text, interior whitespace and comments included
    pub text: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct ScannedFile {
    pub path: PathBuf,
    pub occurrences: Vec<Occurrence>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ScanFailure {
    pub path: PathBuf,
    pub error: String,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct ScanReport {
    /// Eligible files with at least one occurrence, in traversal order
    pub files: Vec<ScannedFile>,
    pub failures: Vec<ScanFailure>,
    /// Eligible files read
    pub scanned: usize,
}

impl ScanReport {
    pub fn total(&self) -> usize {
        self.files.iter().map(|file| file.occurrences.len()).sum()
    }
}

/// Every occurrence of `target` in `buffer`, with positions.
pub fn occurrences(buffer: &str, target: &QualifiedIdent) -> Vec<Occurrence> {
    find_matches(buffer, target)
        .map(|span| {
            let (line, column) = locate(buffer, span.byte_start);
            Occurrence {
                line,
                column,
                byte_start: span.byte_start,
                byte_end: span.byte_end,
                text: span.text(buffer).to_string(),
            }
        })
        .collect()
}

/// List occurrences in every eligible file under `root`. Nothing is written.
pub fn scan_tree(
    root: &Path,
    target: &QualifiedIdent,
    filter: &FileFilter,
) -> Result<ScanReport, RenameError> {
    let roots = resolve_roots(root, root, false)?;
    let mut report = ScanReport::default();

    for entry in collect_entries(&roots, filter) {
        let relative = match entry {
            Entry::File(Task::Rewrite(relative)) => relative,
            Entry::File(Task::Failed(relative, err)) => {
                report.failures.push(failure(relative, &err));
                continue;
            }
            Entry::Dir(_) | Entry::File(Task::Copy(..)) => continue,
        };

        let path = roots.input.join(&relative);
        let content = match fs::read(&path) {
            Ok(bytes) => match String::from_utf8(bytes) {
                Ok(text) => text,
                Err(_) => {
                    report
                        .failures
                        .push(failure(relative, &FileError::Decode { path }));
                    continue;
                }
            },
            Err(source) => {
                report
                    .failures
                    .push(failure(relative, &FileError::Read { path, source }));
                continue;
            }
        };

        report.scanned += 1;
        let found = occurrences(&content, target);
        debug!(path = %relative.display(), matches = found.len(), "scanned");
        if !found.is_empty() {
            report.files.push(ScannedFile {
                path: relative,
                occurrences: found,
            });
        }
    }

    Ok(report)
}

fn failure(path: PathBuf, err: &FileError) -> ScanFailure {
    ScanFailure {
        path,
        error: err.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::filter::FilterRules;
    use tempfile::TempDir;

    #[test]
    fn test_occurrences_positions() {
        let target = QualifiedIdent::parse("cppmicroservices").unwrap();
        let buffer = "int one = cppmicroservices::a;\nint two = cppmicroservices\n    ::b;\n";
        let found = occurrences(buffer, &target);

        assert_eq!(found.len(), 2);
        assert_eq!((found[0].line, found[0].column), (1, 11));
        assert_eq!((found[1].line, found[1].column), (2, 11));
        assert_eq!(found[1].text, "cppmicroservices");
    }

    #[test]
    fn test_scan_tree_respects_filter() {
        let dir = TempDir::new().unwrap();
        fs::create_dir_all(dir.path().join("src")).unwrap();
        fs::create_dir_all(dir.path().join("vendor")).unwrap();
        fs::write(dir.path().join("src/a.cpp"), "ns::x; ns::y;").unwrap();
        fs::write(dir.path().join("src/b.cpp"), "nothing here").unwrap();
        fs::write(dir.path().join("vendor/c.cpp"), "ns::z;").unwrap();

        let filter = FileFilter::new(&FilterRules {
            ignore: vec!["vendor".to_string()],
            ..FilterRules::default()
        })
        .unwrap();
        let target = QualifiedIdent::parse("ns").unwrap();
        let report = scan_tree(dir.path(), &target, &filter).unwrap();

        assert_eq!(report.scanned, 2);
        assert_eq!(report.total(), 2);
        assert_eq!(report.files.len(), 1);
        assert_eq!(report.files[0].path, PathBuf::from("src/a.cpp"));
        assert!(report.failures.is_empty());
    }

    #[test]
    fn test_scan_serializes() {
        let report = ScanReport {
            files: vec![ScannedFile {
                path: PathBuf::from("a.cpp"),
                occurrences: occurrences("ns", &QualifiedIdent::parse("ns").unwrap()),
            }],
            failures: Vec::new(),
            scanned: 1,
        };
        let json = serde_json::to_value(&report).unwrap();
        assert_eq!(json["files"][0]["occurrences"][0]["line"], 1);
        assert_eq!(json["files"][0]["path"], "a.cpp");
    }
}
