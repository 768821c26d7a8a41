use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use colored::Colorize;
use nsrename::config::{config_path, load_from_path, RenameFile};
use nsrename::{
    process, scan_tree, verify_tree, FileFilter, FileOutcome, FilterRules, QualifiedIdent,
    RenameConfig, RenameReport, WalkOptions,
};
use similar::{ChangeTag, TextDiff};
use std::path::{Path, PathBuf};
use std::time::Instant;
use tracing::{debug, warn, Level};
use tracing_subscriber::EnvFilter;

/// Namespace replaced when neither the command line nor a config names one.
const DEFAULT_PREVIOUS_NAMESPACE: &str = "cppmicroservices";

#[derive(Parser)]
#[command(name = "nsrename")]
#[command(about = "Rename a C++ namespace across a source tree", long_about = None)]
#[command(version)]
struct Cli {
    /// Log every file decision
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Args, Clone, Default)]
struct FilterArgs {
    /// Namespace to replace (default: cppmicroservices)
    #[arg(short = 'p', long, value_name = "NS")]
    previous_namespace: Option<String>,

    /// Mirror matching paths without rewriting them (repeatable)
    #[arg(short, long, value_name = "PAT")]
    ignore: Vec<String>,

    /// Only rewrite files with this extension (repeatable)
    #[arg(short, long = "ext", value_name = "EXT")]
    extensions: Vec<String>,

    /// Leave matching paths out of the output entirely (repeatable)
    #[arg(long, value_name = "PAT")]
    skip: Vec<String>,

    /// Config file (default: <PATH_FROM>/nsrename.toml if present)
    #[arg(short, long, value_name = "FILE")]
    config: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Rename the namespace, in place or into a mirrored tree
    Apply {
        /// New namespace name
        namespace: String,

        /// Directory to read from
        path_from: PathBuf,

        /// Directory to write to (in place if omitted)
        path_to: Option<PathBuf>,

        #[command(flatten)]
        filter: FilterArgs,

        /// Dry run - show what would be changed without writing files
        #[arg(short = 'n', long)]
        dry_run: bool,

        /// Show unified diff of changes
        #[arg(short, long)]
        diff: bool,

        /// Print occurrence counts and runtime
        #[arg(short, long)]
        stats: bool,

        /// Process files on all cores
        #[arg(short = 'j', long)]
        parallel: bool,
    },

    /// List occurrences of the namespace without writing anything
    Scan {
        /// Directory to scan
        path: PathBuf,

        #[command(flatten)]
        filter: FilterArgs,

        /// Emit the listing as JSON
        #[arg(long)]
        json: bool,
    },

    /// Check a renamed tree against its input
    Verify {
        /// New namespace name
        namespace: String,

        /// Directory the rename read from
        path_from: PathBuf,

        /// Directory the rename wrote to
        path_to: PathBuf,

        #[command(flatten)]
        filter: FilterArgs,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    match cli.command {
        Commands::Apply {
            namespace,
            path_from,
            path_to,
            filter,
            dry_run,
            diff,
            stats,
            parallel,
        } => cmd_apply(
            &namespace,
            &path_from,
            path_to.as_deref(),
            &filter,
            ApplyFlags {
                dry_run,
                diff,
                stats,
                parallel,
            },
        ),

        Commands::Scan { path, filter, json } => cmd_scan(&path, &filter, json),

        Commands::Verify {
            namespace,
            path_from,
            path_to,
            filter,
        } => cmd_verify(&namespace, &path_from, &path_to, &filter),
    }
}

fn init_tracing(verbose: bool) {
    let level = if verbose { Level::DEBUG } else { Level::INFO };
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(level.as_str().to_ascii_lowercase()));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

struct ApplyFlags {
    dry_run: bool,
    diff: bool,
    stats: bool,
    parallel: bool,
}

/// Settings for one run after merging the config file with the flags.
struct Settings {
    root: PathBuf,
    target: QualifiedIdent,
    filter: FileFilter,
    file: RenameFile,
}

/// Expand `~` and environment variables, then merge any config file found
/// for `root` with the command line. Flags win for scalars and extend lists.
///
/// The config file itself is never rewritten, so a second run over the same
/// tree reads the same target.
fn load_settings(root: &Path, args: &FilterArgs) -> Result<Settings> {
    let root = expand_path(root)?;
    let explicit = args.config.as_deref().map(expand_path).transpose()?;

    let found = config_path(explicit.as_deref(), &root);
    let mut file = match &found {
        Some(path) => {
            let file = load_from_path(path).context("Failed to load config")?;
            debug!(config = %path.display(), "loaded config");
            file
        }
        None => RenameFile::default(),
    };

    file.filter.extend(FilterRules {
        ignore: args.ignore.clone(),
        extensions: args.extensions.clone(),
        skip: args.skip.clone(),
    });
    let mut filter = FileFilter::new(&file.filter).context("Invalid filter rules")?;
    if let Some(relative) = found.as_deref().and_then(|path| relative_to(&root, path)) {
        filter = filter.ignore_path(relative);
    }

    let target_name = args
        .previous_namespace
        .clone()
        .or_else(|| file.rename.target.clone())
        .unwrap_or_else(|| DEFAULT_PREVIOUS_NAMESPACE.to_string());
    let target = QualifiedIdent::parse(&target_name)
        .with_context(|| format!("Invalid previous namespace '{}'", target_name))?;

    Ok(Settings {
        root,
        target,
        filter,
        file,
    })
}

/// `path` relative to `root`, if it lies inside it.
fn relative_to(root: &Path, path: &Path) -> Option<PathBuf> {
    let root = root.canonicalize().ok()?;
    let path = path.canonicalize().ok()?;
    path.strip_prefix(&root).ok().map(Path::to_path_buf)
}

fn parse_replacement(namespace: &str, file: &RenameFile) -> Result<QualifiedIdent> {
    if let Some(configured) = file.rename.replacement.as_deref() {
        if configured != namespace {
            warn!(
                configured,
                namespace, "config replacement overridden by command line"
            );
        }
    }
    QualifiedIdent::parse(namespace).with_context(|| format!("Invalid namespace '{}'", namespace))
}

/// Expand `~`, `$NAME` and `${NAME}`. An unset variable is an error.
fn expand_path(path: &Path) -> Result<PathBuf> {
    let raw = path.to_string_lossy();
    let expanded =
        shellexpand::full(&raw).with_context(|| format!("Failed to expand path '{}'", raw))?;
    Ok(PathBuf::from(expanded.into_owned()))
}

/// Helper: Show unified diff between original and renamed content
fn display_diff(file: &Path, original: &str, modified: &str) {
    println!(
        "\n{}",
        format!("--- {} (original)", file.display()).dimmed()
    );
    println!("{}", format!("+++ {} (renamed)", file.display()).dimmed());

    let diff = TextDiff::from_lines(original, modified);

    for change in diff.iter_all_changes() {
        let sign = match change.tag() {
            ChangeTag::Delete => format!("-{}", change).red(),
            ChangeTag::Insert => format!("+{}", change).green(),
            ChangeTag::Equal => format!(" {}", change).normal(),
        };
        print!("{}", sign);
    }
}

fn cmd_apply(
    namespace: &str,
    path_from: &Path,
    path_to: Option<&Path>,
    args: &FilterArgs,
    flags: ApplyFlags,
) -> Result<()> {
    let started = Instant::now();
    let settings = load_settings(path_from, args)?;
    let replacement = parse_replacement(namespace, &settings.file)?;
    let output = path_to
        .map(expand_path)
        .transpose()?
        .unwrap_or_else(|| settings.root.clone());

    let options = WalkOptions {
        dry_run: flags.dry_run,
        parallel: flags.parallel || settings.file.options.parallel,
        capture_changes: flags.diff,
    };
    let config = RenameConfig::new(&settings.root, settings.target, replacement, settings.filter)
        .context("Invalid rename")?
        .with_output(&output)
        .with_options(options);

    println!("Input: {}", config.input_root.display());
    println!("Output: {}", config.output_root.display());
    println!(
        "Renaming: {} -> {}",
        config.renamer.target(),
        config.renamer.replacement()
    );
    if flags.dry_run {
        println!("{}", "[DRY RUN - nothing will be written]".cyan());
    }
    println!();

    let report = process(&config).context("Rename failed")?;

    for file in &report.files {
        match &file.outcome {
            FileOutcome::Rewritten { matches } => {
                let verb = if flags.dry_run { "Would rename" } else { "Renamed" };
                println!(
                    "{} {}: {} {} occurrence(s)",
                    "✓".green(),
                    file.path.display(),
                    verb,
                    matches
                );
                if let Some(change) = &file.change {
                    display_diff(&file.path, &change.original, &change.rewritten);
                }
            }
            FileOutcome::Failed(err) => {
                eprintln!("{} {}: Failed - {}", "✗".red(), file.path.display(), err);
            }
            FileOutcome::Unchanged | FileOutcome::Copied(_) => {}
        }
    }

    print_summary(&report);

    if flags.stats {
        println!();
        println!("{}", "Stats:".bold());
        println!("  {} occurrences renamed", report.total_matches());
        println!("  {} directories", report.directories);
        println!("  {:.2?} elapsed", started.elapsed());
    }

    if !report.is_success() {
        std::process::exit(1);
    }

    Ok(())
}

fn print_summary(report: &RenameReport) {
    println!();
    println!("{}", "Summary:".bold());
    println!(
        "  {} rewritten",
        format!("{}", report.rewritten().count()).green()
    );
    println!(
        "  {} unchanged",
        format!("{}", report.unchanged().count()).yellow()
    );
    println!("  {} copied", format!("{}", report.copied().count()).cyan());
    println!("  {} failed", format!("{}", report.failed().count()).red());
    if !report.dry_run {
        println!("  {} files written", report.written());
    }
}

fn cmd_scan(path: &Path, args: &FilterArgs, json: bool) -> Result<()> {
    let settings = load_settings(path, args)?;
    let report = scan_tree(&settings.root, &settings.target, &settings.filter)
        .context("Scan failed")?;

    if json {
        let out = serde_json::to_string_pretty(&report).context("Failed to encode scan")?;
        println!("{}", out);
    } else {
        for file in &report.files {
            for hit in &file.occurrences {
                println!(
                    "{}:{}:{}: {}",
                    file.path.display(),
                    hit.line,
                    hit.column,
                    hit.text.lines().next().unwrap_or_default().cyan()
                );
            }
        }
        for failure in &report.failures {
            eprintln!(
                "{} {}: {}",
                "✗".red(),
                failure.path.display(),
                failure.error
            );
        }
        println!();
        println!(
            "{} occurrence(s) of {} in {} of {} file(s)",
            format!("{}", report.total()).bold(),
            settings.target,
            report.files.len(),
            report.scanned
        );
    }

    if !report.failures.is_empty() {
        std::process::exit(1);
    }

    Ok(())
}

fn cmd_verify(namespace: &str, path_from: &Path, path_to: &Path, args: &FilterArgs) -> Result<()> {
    let settings = load_settings(path_from, args)?;
    let replacement = parse_replacement(namespace, &settings.file)?;
    let config = RenameConfig::new(&settings.root, settings.target, replacement, settings.filter)
        .context("Invalid rename")?
        .with_output(expand_path(path_to)?);

    println!("{}", "Verifying renamed tree...".bold());
    println!("Input: {}", config.input_root.display());
    println!("Output: {}", config.output_root.display());
    println!();

    let report = verify_tree(&config).context("Verification failed")?;

    for (path, issue) in &report.issues {
        eprintln!("{} {}: {}", "✗".red(), path.display(), issue);
    }

    println!();
    println!("{}", "Summary:".bold());
    println!("  {} checked", format!("{}", report.checked).green());
    println!("  {} issues", format!("{}", report.issues.len()).red());

    if !report.is_clean() {
        std::process::exit(1);
    }

    Ok(())
}
