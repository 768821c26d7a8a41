//! Tree walker: mirrors an input tree into an output tree, rewriting
//! eligible files on the way.
//!
//! Entries are enumerated in file-name order. Directories are created as
//! they are reached; files are then visited one at a time, or on the rayon
//! pool when [`WalkOptions::parallel`] is set. Either way the report lists
//! files in traversal order. Per-file failures are recorded and the run
//! continues; only invalid roots abort it.

pub mod errors;
pub mod report;

pub use errors::{FileError, RenameError};
pub use report::{FileChange, FileOutcome, FileReport, RenameReport};

use crate::filter::{CopyReason, FileFilter, FilterDecision};
use crate::ident::QualifiedIdent;
use crate::rewrite::{atomic_write, copy_verbatim, Renamer};
use rayon::prelude::*;
use std::env;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};
use walkdir::WalkDir;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct WalkOptions {
    /// Compute outcomes without touching the filesystem
    pub dry_run: bool,
    /// Visit files on the rayon thread pool
    pub parallel: bool,
    /// Keep before/after text of rewritten files in the report
    pub capture_changes: bool,
}

/// Everything a run needs. Built once, never mutated during the walk.
#[derive(Debug, Clone)]
pub struct RenameConfig {
    pub input_root: PathBuf,
    /// Equal to `input_root` for an in-place run
    pub output_root: PathBuf,
    pub renamer: Renamer,
    pub filter: FileFilter,
    pub options: WalkOptions,
}

impl RenameConfig {
    /// An in-place run over `input_root`.
    pub fn new(
        input_root: impl Into<PathBuf>,
        target: QualifiedIdent,
        replacement: QualifiedIdent,
        filter: FileFilter,
    ) -> Result<Self, RenameError> {
        if target == replacement {
            return Err(RenameError::IdenticalNames {
                name: target.render(),
            });
        }

        let input_root = input_root.into();
        Ok(Self {
            output_root: input_root.clone(),
            input_root,
            renamer: Renamer::new(target, replacement),
            filter,
            options: WalkOptions::default(),
        })
    }

    pub fn with_output(mut self, output_root: impl Into<PathBuf>) -> Self {
        self.output_root = output_root.into();
        self
    }

    pub fn with_options(mut self, options: WalkOptions) -> Self {
        self.options = options;
        self
    }
}

/// Resolved, absolute roots for one run.
#[derive(Debug, Clone)]
pub(crate) struct Roots {
    pub input: PathBuf,
    pub output: PathBuf,
    pub in_place: bool,
    /// Output root nested inside the input root; never descended into.
    pub exclude: Option<PathBuf>,
}

pub(crate) fn resolve_roots(
    input_root: &Path,
    output_root: &Path,
    create_output: bool,
) -> Result<Roots, RenameError> {
    let path_error = |path: &Path, reason: String| RenameError::Path {
        path: path.to_path_buf(),
        reason,
    };

    let input = input_root
        .canonicalize()
        .map_err(|e| path_error(input_root, e.to_string()))?;
    if !input.is_dir() {
        return Err(path_error(input_root, "not a directory".to_string()));
    }

    if output_root.exists() && !output_root.is_dir() {
        return Err(path_error(output_root, "exists and is not a directory".to_string()));
    }
    if create_output && !output_root.exists() {
        fs::create_dir_all(output_root).map_err(|e| path_error(output_root, e.to_string()))?;
    }

    let output = if output_root.exists() {
        output_root
            .canonicalize()
            .map_err(|e| path_error(output_root, e.to_string()))?
    } else if output_root.is_absolute() {
        output_root.to_path_buf()
    } else {
        env::current_dir()
            .map_err(|e| path_error(output_root, e.to_string()))?
            .join(output_root)
    };

    let in_place = output == input;
    let exclude = (!in_place && output.starts_with(&input)).then(|| output.clone());

    Ok(Roots {
        input,
        output,
        in_place,
        exclude,
    })
}

/// A file-level unit of work.
#[derive(Debug)]
pub(crate) enum Task {
    Rewrite(PathBuf),
    Copy(PathBuf, CopyReason),
    Failed(PathBuf, FileError),
}

#[derive(Debug)]
pub(crate) enum Entry {
    Dir(PathBuf),
    File(Task),
}

/// Enumerate the input tree, relative paths only, skip rules applied.
pub(crate) fn collect_entries(roots: &Roots, filter: &FileFilter) -> Vec<Entry> {
    let walker = WalkDir::new(&roots.input)
        .min_depth(1)
        .sort_by_file_name()
        .into_iter()
        .filter_entry(|entry| {
            if roots.exclude.as_deref() == Some(entry.path()) {
                return false;
            }
            match entry.path().strip_prefix(&roots.input) {
                Ok(relative) => !filter.is_skipped(relative),
                Err(_) => true,
            }
        });

    let mut entries = Vec::new();
    for item in walker {
        let entry = match item {
            Ok(entry) => entry,
            Err(err) => {
                let path = err
                    .path()
                    .map(Path::to_path_buf)
                    .unwrap_or_else(|| roots.input.clone());
                let relative = path
                    .strip_prefix(&roots.input)
                    .map(Path::to_path_buf)
                    .unwrap_or_default();
                entries.push(Entry::File(Task::Failed(
                    relative,
                    FileError::Walk { path, source: err },
                )));
                continue;
            }
        };

        let Ok(relative) = entry.path().strip_prefix(&roots.input) else {
            continue;
        };
        let relative = relative.to_path_buf();
        let file_type = entry.file_type();

        if file_type.is_dir() {
            entries.push(Entry::Dir(relative));
        } else if file_type.is_file() {
            match filter.decide(&relative) {
                FilterDecision::Rewrite => entries.push(Entry::File(Task::Rewrite(relative))),
                FilterDecision::Copy(reason) => {
                    entries.push(Entry::File(Task::Copy(relative, reason)))
                }
                FilterDecision::Skip => {}
            }
        } else {
            debug!(path = %relative.display(), "not a regular file, leaving out");
        }
    }

    entries
}

/// Walk `config.input_root` and write the mirrored, renamed tree.
///
/// Fails only when a root is unusable; everything else ends up in the
/// report. `report.written()` is the number of files written.
pub fn process(config: &RenameConfig) -> Result<RenameReport, RenameError> {
    let options = config.options;
    let roots = resolve_roots(&config.input_root, &config.output_root, !options.dry_run)?;

    info!(
        input = %roots.input.display(),
        output = %roots.output.display(),
        target = %config.renamer.target(),
        replacement = %config.renamer.replacement(),
        dry_run = options.dry_run,
        "renaming namespace"
    );

    let mut report = RenameReport {
        in_place: roots.in_place,
        dry_run: options.dry_run,
        ..RenameReport::default()
    };

    let mut tasks = Vec::new();
    for entry in collect_entries(&roots, &config.filter) {
        match entry {
            Entry::Dir(relative) => {
                report.directories += 1;
                if options.dry_run || roots.in_place {
                    continue;
                }
                let dest = roots.output.join(&relative);
                if let Err(source) = fs::create_dir_all(&dest) {
                    tasks.push(Task::Failed(relative, FileError::Write { path: dest, source }));
                }
            }
            Entry::File(task) => tasks.push(task),
        }
    }

    report.files = if options.parallel {
        tasks
            .into_par_iter()
            .map(|task| visit(config, &roots, task))
            .collect()
    } else {
        tasks
            .into_iter()
            .map(|task| visit(config, &roots, task))
            .collect()
    };

    info!(
        files = report.files.len(),
        rewritten = report.rewritten().count(),
        matches = report.total_matches(),
        failed = report.failed().count(),
        "finished"
    );

    Ok(report)
}

fn visit(config: &RenameConfig, roots: &Roots, task: Task) -> FileReport {
    match task {
        Task::Rewrite(relative) => rewrite_file(config, roots, relative),
        Task::Copy(relative, reason) => copy_file(config, roots, relative, reason),
        Task::Failed(relative, err) => failed(relative, err),
    }
}

fn rewrite_file(config: &RenameConfig, roots: &Roots, relative: PathBuf) -> FileReport {
    let options = config.options;
    let source = roots.input.join(&relative);
    let dest = roots.output.join(&relative);

    let bytes = match fs::read(&source) {
        Ok(bytes) => bytes,
        Err(err) => {
            return failed(
                relative,
                FileError::Read {
                    path: source,
                    source: err,
                },
            )
        }
    };
    let Ok(content) = String::from_utf8(bytes) else {
        // Still mirrored, so the output tree stays complete
        if !options.dry_run && !roots.in_place {
            if let Err(err) = copy_verbatim(&source, &dest) {
                return failed(
                    relative,
                    FileError::Copy {
                        path: dest,
                        source: err,
                    },
                );
            }
        }
        return failed(relative, FileError::Decode { path: source });
    };

    let rewrite = config.renamer.rewrite(&content);
    if !rewrite.is_changed() {
        debug!(path = %relative.display(), "no occurrences");
        if !options.dry_run && !roots.in_place {
            if let Err(err) = copy_verbatim(&source, &dest) {
                return failed(
                    relative,
                    FileError::Copy {
                        path: dest,
                        source: err,
                    },
                );
            }
        }
        return FileReport::new(relative, FileOutcome::Unchanged);
    }

    let matches = rewrite.matches;
    if !options.dry_run {
        if let Err(err) = write_rewritten(&source, &dest, rewrite.text.as_bytes()) {
            return failed(
                relative,
                FileError::Write {
                    path: dest,
                    source: err,
                },
            );
        }
    }
    debug!(path = %relative.display(), matches, "rewrote");

    let change = options.capture_changes.then(|| FileChange {
        original: content.clone(),
        rewritten: rewrite.text.into_owned(),
    });

    FileReport {
        path: relative,
        outcome: FileOutcome::Rewritten { matches },
        change,
    }
}

fn copy_file(
    config: &RenameConfig,
    roots: &Roots,
    relative: PathBuf,
    reason: CopyReason,
) -> FileReport {
    if !config.options.dry_run && !roots.in_place {
        let dest = roots.output.join(&relative);
        if let Err(err) = copy_verbatim(&roots.input.join(&relative), &dest) {
            return failed(
                relative,
                FileError::Copy {
                    path: dest,
                    source: err,
                },
            );
        }
    }
    debug!(path = %relative.display(), ?reason, "copied verbatim");
    FileReport::new(relative, FileOutcome::Copied(reason))
}

/// Atomic write that keeps the source file's permissions.
fn write_rewritten(source: &Path, dest: &Path, content: &[u8]) -> io::Result<()> {
    let permissions = fs::metadata(source)?.permissions();
    atomic_write(dest, content)?;
    fs::set_permissions(dest, permissions)
}

fn failed(relative: PathBuf, err: FileError) -> FileReport {
    warn!(path = %err.path().display(), "{}", err);
    FileReport::new(relative, FileOutcome::Failed(err))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::filter::FilterRules;
    use tempfile::TempDir;

    fn ident(s: &str) -> QualifiedIdent {
        QualifiedIdent::parse(s).unwrap()
    }

    fn config(input: &Path, ignore: &[&str]) -> RenameConfig {
        let filter = FileFilter::new(&FilterRules {
            ignore: ignore.iter().map(|s| s.to_string()).collect(),
            ..FilterRules::default()
        })
        .unwrap();
        RenameConfig::new(input, ident("cppmicroservices"), ident("mw_cppms"), filter).unwrap()
    }

    fn setup_tree() -> TempDir {
        let dir = TempDir::new().unwrap();
        let root = dir.path();
        fs::create_dir_all(root.join("inner")).unwrap();
        fs::create_dir_all(root.join("ignore")).unwrap();
        fs::create_dir_all(root.join("empty")).unwrap();
        fs::write(
            root.join("inner/a.cpp"),
            "namespace cppmicroservices { int a=1; }\n",
        )
        .unwrap();
        fs::write(root.join("inner/plain.cpp"), "int main() {}\n").unwrap();
        fs::write(
            root.join("ignore/keep.cpp"),
            "namespace cppmicroservices {}\n",
        )
        .unwrap();
        dir
    }

    #[test]
    fn test_mirror_into_output() {
        let input = setup_tree();
        let output = TempDir::new().unwrap();
        let out_root = output.path().join("mirror");

        let cfg = config(input.path(), &["ignore"]).with_output(&out_root);
        let report = process(&cfg).unwrap();

        assert!(report.is_success());
        assert!(!report.in_place);
        assert_eq!(report.directories, 3);
        assert_eq!(report.written(), 3);
        assert_eq!(report.total_matches(), 1);

        assert_eq!(
            fs::read_to_string(out_root.join("inner/a.cpp")).unwrap(),
            "namespace mw_cppms { int a=1; }\n"
        );
        assert_eq!(
            fs::read_to_string(out_root.join("ignore/keep.cpp")).unwrap(),
            "namespace cppmicroservices {}\n"
        );
        assert!(out_root.join("empty").is_dir());
        // Input untouched
        assert_eq!(
            fs::read_to_string(input.path().join("inner/a.cpp")).unwrap(),
            "namespace cppmicroservices { int a=1; }\n"
        );
    }

    #[test]
    fn test_report_in_traversal_order() {
        let input = setup_tree();
        let report = process(&config(input.path(), &["ignore"]).with_options(WalkOptions {
            dry_run: true,
            ..WalkOptions::default()
        }))
        .unwrap();

        let paths: Vec<_> = report.files.iter().map(|f| f.path.clone()).collect();
        assert_eq!(
            paths,
            vec![
                PathBuf::from("ignore/keep.cpp"),
                PathBuf::from("inner/a.cpp"),
                PathBuf::from("inner/plain.cpp"),
            ]
        );
        assert!(matches!(
            report.files[0].outcome,
            FileOutcome::Copied(CopyReason::Ignored)
        ));
        assert!(matches!(report.files[2].outcome, FileOutcome::Unchanged));
    }

    #[test]
    fn test_in_place() {
        let input = setup_tree();
        let report = process(&config(input.path(), &["ignore"])).unwrap();

        assert!(report.in_place);
        assert_eq!(report.written(), 1);
        assert_eq!(
            fs::read_to_string(input.path().join("inner/a.cpp")).unwrap(),
            "namespace mw_cppms { int a=1; }\n"
        );
        assert_eq!(
            fs::read_to_string(input.path().join("ignore/keep.cpp")).unwrap(),
            "namespace cppmicroservices {}\n"
        );
    }

    #[test]
    fn test_dry_run_writes_nothing() {
        let input = setup_tree();
        let output = TempDir::new().unwrap();
        let out_root = output.path().join("never");

        let cfg = config(input.path(), &[])
            .with_output(&out_root)
            .with_options(WalkOptions {
                dry_run: true,
                capture_changes: true,
                ..WalkOptions::default()
            });
        let report = process(&cfg).unwrap();

        assert!(!out_root.exists());
        assert_eq!(report.written(), 0);
        assert_eq!(report.rewritten().count(), 2);
        let change = report.rewritten().next().unwrap().change.as_ref().unwrap();
        assert_eq!(change.original, "namespace cppmicroservices {}\n");
        assert_eq!(change.rewritten, "namespace mw_cppms {}\n");
    }

    #[test]
    fn test_nested_output_not_walked() {
        let input = setup_tree();
        let out_root = input.path().join("out");

        let report = process(&config(input.path(), &[]).with_output(&out_root)).unwrap();
        assert!(report.is_success());
        assert!(report.files.iter().all(|f| !f.path.starts_with("out")));
        assert!(out_root.join("inner/a.cpp").is_file());
        assert!(!out_root.join("out").exists());
    }

    #[test]
    fn test_parallel_matches_sequential() {
        let input = setup_tree();
        let options = WalkOptions {
            dry_run: true,
            ..WalkOptions::default()
        };
        let seq = process(&config(input.path(), &[]).with_options(options)).unwrap();
        let par = process(&config(input.path(), &[]).with_options(WalkOptions {
            parallel: true,
            ..options
        }))
        .unwrap();

        let summarize = |r: &RenameReport| {
            r.files
                .iter()
                .map(|f| (f.path.clone(), f.outcome.to_string()))
                .collect::<Vec<_>>()
        };
        assert_eq!(summarize(&seq), summarize(&par));
    }

    #[test]
    fn test_decode_failure_is_per_file() {
        let input = setup_tree();
        fs::write(input.path().join("inner/blob.cpp"), [0xffu8, 0xfe, 0x00]).unwrap();
        let output = TempDir::new().unwrap();

        let report =
            process(&config(input.path(), &[]).with_output(output.path().join("o"))).unwrap();

        let failures: Vec<_> = report.failed().collect();
        assert_eq!(failures.len(), 1);
        assert_eq!(failures[0].path, PathBuf::from("inner/blob.cpp"));
        assert!(matches!(
            failures[0].outcome,
            FileOutcome::Failed(FileError::Decode { .. })
        ));
        // The rest of the tree was still processed
        assert_eq!(report.rewritten().count(), 2);
        // and the undecodable file is mirrored as is
        assert_eq!(
            fs::read(output.path().join("o/inner/blob.cpp")).unwrap(),
            vec![0xffu8, 0xfe, 0x00]
        );
    }

    #[test]
    fn test_undecodable_file_dry_run_writes_nothing() {
        let input = setup_tree();
        fs::write(input.path().join("logo.png"), [0x89u8, b'P', b'N', b'G', 0xff, 0x00]).unwrap();
        let output = TempDir::new().unwrap();
        let out_root = output.path().join("o");

        let cfg = config(input.path(), &[])
            .with_output(&out_root)
            .with_options(WalkOptions {
                dry_run: true,
                ..WalkOptions::default()
            });
        let report = process(&cfg).unwrap();

        assert_eq!(report.failed().count(), 1);
        assert!(!out_root.exists());
    }

    #[test]
    fn test_write_failure_is_per_file() {
        let input = setup_tree();
        let output = TempDir::new().unwrap();
        let out_root = output.path().join("o");
        // A directory squatting on the destination blocks the rename
        fs::create_dir_all(out_root.join("inner/a.cpp/occupied")).unwrap();

        let report = process(&config(input.path(), &["ignore"]).with_output(&out_root)).unwrap();

        let failures: Vec<_> = report.failed().collect();
        assert_eq!(failures.len(), 1);
        assert_eq!(failures[0].path, PathBuf::from("inner/a.cpp"));
        assert!(matches!(
            failures[0].outcome,
            FileOutcome::Failed(FileError::Write { .. })
        ));
        assert!(!report.is_success());
        // Siblings were still mirrored
        assert_eq!(
            fs::read_to_string(out_root.join("inner/plain.cpp")).unwrap(),
            "int main() {}\n"
        );
        assert!(out_root.join("ignore/keep.cpp").is_file());
    }

    #[test]
    #[cfg(unix)]
    fn test_read_failure_is_per_file() {
        use std::os::unix::fs::PermissionsExt;

        let input = setup_tree();
        let locked = input.path().join("inner/a.cpp");
        fs::set_permissions(&locked, fs::Permissions::from_mode(0o000)).unwrap();
        if fs::read(&locked).is_ok() {
            // Permission bits do not apply to this user (root)
            fs::set_permissions(&locked, fs::Permissions::from_mode(0o644)).unwrap();
            return;
        }
        let output = TempDir::new().unwrap();
        let out_root = output.path().join("o");

        let report = process(&config(input.path(), &["ignore"]).with_output(&out_root)).unwrap();
        fs::set_permissions(&locked, fs::Permissions::from_mode(0o644)).unwrap();

        let failures: Vec<_> = report.failed().collect();
        assert_eq!(failures.len(), 1);
        assert!(matches!(
            failures[0].outcome,
            FileOutcome::Failed(FileError::Read { .. })
        ));
        assert!(out_root.join("inner/plain.cpp").is_file());
        assert!(out_root.join("ignore/keep.cpp").is_file());
    }

    #[test]
    fn test_missing_root_is_fatal() {
        let dir = TempDir::new().unwrap();
        let result = process(&config(&dir.path().join("missing"), &[]));
        assert!(matches!(result, Err(RenameError::Path { .. })));
    }

    #[test]
    fn test_file_as_output_root_is_fatal() {
        let input = setup_tree();
        let output = TempDir::new().unwrap();
        let file = output.path().join("file");
        fs::write(&file, "x").unwrap();

        let result = process(&config(input.path(), &[]).with_output(&file));
        assert!(matches!(result, Err(RenameError::Path { .. })));
    }

    #[test]
    fn test_identical_names_rejected() {
        let result = RenameConfig::new(
            "somewhere",
            ident("cppmicroservices"),
            ident("cppmicroservices"),
            FileFilter::allow_all(),
        );
        assert!(matches!(result, Err(RenameError::IdenticalNames { .. })));
    }

    #[test]
    fn test_skip_rules_leave_paths_out() {
        let input = setup_tree();
        fs::create_dir_all(input.path().join(".git")).unwrap();
        fs::write(input.path().join(".git/HEAD"), "cppmicroservices").unwrap();
        let output = TempDir::new().unwrap();
        let out_root = output.path().join("o");

        let filter = FileFilter::new(&FilterRules {
            skip: vec![".git".to_string()],
            ..FilterRules::default()
        })
        .unwrap();
        let cfg = RenameConfig::new(input.path(), ident("cppmicroservices"), ident("mw_cppms"), filter)
            .unwrap()
            .with_output(&out_root);
        let report = process(&cfg).unwrap();

        assert!(!out_root.join(".git").exists());
        assert!(report.files.iter().all(|f| !f.path.starts_with(".git")));
    }

    #[test]
    #[cfg(unix)]
    fn test_permissions_preserved() {
        use std::os::unix::fs::PermissionsExt;

        let input = setup_tree();
        let script = input.path().join("inner/a.cpp");
        fs::set_permissions(&script, fs::Permissions::from_mode(0o755)).unwrap();

        process(&config(input.path(), &[])).unwrap();

        let mode = fs::metadata(&script).unwrap().permissions().mode();
        assert_eq!(mode & 0o777, 0o755);
    }
}
