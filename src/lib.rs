//! nsrename: namespace renaming for C++ source trees
//!
//! Rewrites every qualified-name occurrence of one namespace to another
//! across a directory tree, leaving designated subtrees untouched.
//!
//! # Architecture
//!
//! Matching is lexical. [`find_matches`] yields byte spans of whole
//! identifier occurrences of the target, tolerating whitespace and comments
//! between `::` separators. All rewriting compiles down to a single
//! primitive, [`apply`], which splices the replacement into those spans and
//! leaves every other byte alone. The tree walker ([`process`]) decides per
//! file, through a [`FileFilter`], whether content is rewritten or mirrored
//! verbatim.
//!
//! # Safety
//!
//! - Atomic file writes (tempfile + fsync + rename)
//! - UTF-8 validation before any rewrite
//! - Ignored files are copied byte for byte, never decoded
//! - A second run over the output finds nothing left to rename
//!
//! # Example
//!
//! ```no_run
//! use nsrename::{process, FileFilter, QualifiedIdent, RenameConfig};
//!
//! let config = RenameConfig::new(
//!     "src",
//!     QualifiedIdent::parse("cppmicroservices")?,
//!     QualifiedIdent::parse("mw_cppms")?,
//!     FileFilter::allow_all(),
//! )?
//! .with_output("renamed");
//!
//! let report = process(&config)?;
//! println!("{} files written", report.written());
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

pub mod config;
pub mod filter;
pub mod ident;
pub mod matcher;
pub mod rewrite;
pub mod scan;
pub mod verify;
pub mod walk;

// Re-exports
pub use config::{load_from_path, load_from_str, ConfigError, RenameFile};
pub use filter::{CopyReason, FileFilter, FilterDecision, FilterError, FilterRules};
pub use ident::{IdentError, QualifiedIdent};
pub use matcher::{count_matches, find_matches, locate, MatchSpan, Matches};
pub use rewrite::{apply, atomic_write, Renamer, Rewrite, RewriteError};
pub use scan::{scan_tree, Occurrence, ScanReport};
pub use verify::{verify_tree, VerifyIssue, VerifyReport};
pub use walk::{
    process, FileError, FileOutcome, FileReport, RenameConfig, RenameError, RenameReport,
    WalkOptions,
};
