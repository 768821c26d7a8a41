//! Shape and validation of `nsrename.toml`.

use crate::filter::{FileFilter, FilterRules};
use crate::ident::{IdentError, QualifiedIdent};
use serde::Deserialize;
use thiserror::Error;

/// Contents of an `nsrename.toml` file. Every section is optional.
#[derive(Debug, Deserialize, Default, Clone, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct RenameFile {
    #[serde(default)]
    pub rename: RenameSection,
    #[serde(default)]
    pub filter: FilterRules,
    #[serde(default)]
    pub options: OptionsSection,
}

#[derive(Debug, Deserialize, Default, Clone, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct RenameSection {
    /// Namespace to replace
    #[serde(default)]
    pub target: Option<String>,
    /// Namespace to write instead
    #[serde(default)]
    pub replacement: Option<String>,
}

#[derive(Debug, Deserialize, Default, Clone, Copy, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct OptionsSection {
    #[serde(default)]
    pub parallel: bool,
}

impl RenameFile {
    pub fn validate(&self) -> Result<(), ValidationError> {
        let mut issues = Vec::new();

        let target = parse_field("rename.target", self.rename.target.as_deref(), &mut issues);
        let replacement = parse_field(
            "rename.replacement",
            self.rename.replacement.as_deref(),
            &mut issues,
        );
        if let (Some(target), Some(replacement)) = (target, replacement) {
            if target == replacement {
                issues.push(ValidationIssue::IdenticalNames {
                    name: target.render(),
                });
            }
        }

        if let Err(err) = FileFilter::new(&self.filter) {
            issues.push(ValidationIssue::Filter {
                message: err.to_string(),
            });
        }

        if issues.is_empty() {
            Ok(())
        } else {
            Err(ValidationError { issues })
        }
    }
}

fn parse_field(
    field: &'static str,
    value: Option<&str>,
    issues: &mut Vec<ValidationIssue>,
) -> Option<QualifiedIdent> {
    match QualifiedIdent::parse(value?) {
        Ok(ident) => Some(ident),
        Err(source) => {
            issues.push(ValidationIssue::InvalidIdentifier { field, source });
            None
        }
    }
}

/// Every problem found in one config, in field order.
#[derive(Error, Debug, Clone)]
#[error("{}", join_issues(.issues))]
pub struct ValidationError {
    pub issues: Vec<ValidationIssue>,
}

fn join_issues(issues: &[ValidationIssue]) -> String {
    issues
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("\n")
}

#[derive(Error, Debug, Clone)]
pub enum ValidationIssue {
    #[error("'{field}' is invalid: {source}")]
    InvalidIdentifier {
        field: &'static str,
        #[source]
        source: IdentError,
    },

    #[error("target and replacement are both '{name}'")]
    IdenticalNames { name: String },

    #[error("[filter] {message}")]
    Filter { message: String },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_issues_display_one_per_line() {
        let config = RenameFile {
            rename: RenameSection {
                target: Some("a::".to_string()),
                replacement: Some("b".to_string()),
            },
            filter: FilterRules {
                ignore: vec!["/abs".to_string()],
                ..FilterRules::default()
            },
            ..RenameFile::default()
        };

        let err = config.validate().unwrap_err();
        let lines: Vec<String> = err.to_string().lines().map(str::to_string).collect();
        assert_eq!(lines.len(), 2);
        assert!(lines[0].starts_with("'rename.target' is invalid"));
        assert!(lines[1].starts_with("[filter] malformed rule '/abs'"));
    }
}
