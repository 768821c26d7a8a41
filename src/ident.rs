//! Qualified C++ identifiers and their validation.

use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Scope-resolution separator between identifier segments.
pub const SEPARATOR: &str = "::";

/// Reserved words that cannot name a namespace segment.
const CPP_KEYWORDS: &[&str] = &[
    "alignas",
    "alignof",
    "and",
    "and_eq",
    "asm",
    "atomic_cancel",
    "atomic_commit",
    "atomic_noexcept",
    "auto",
    "bitand",
    "bitor",
    "bool",
    "break",
    "case",
    "catch",
    "char",
    "char8_t",
    "char16_t",
    "char32_t",
    "class",
    "compl",
    "concept",
    "const",
    "consteval",
    "constexpr",
    "constinit",
    "const_cast",
    "continue",
    "co_await",
    "co_return",
    "co_yield",
    "decltype",
    "default",
    "delete",
    "do",
    "double",
    "dynamic_cast",
    "else",
    "enum",
    "explicit",
    "export",
    "extern",
    "false",
    "float",
    "for",
    "friend",
    "goto",
    "if",
    "inline",
    "int",
    "long",
    "mutable",
    "namespace",
    "new",
    "noexcept",
    "not",
    "not_eq",
    "nullptr",
    "operator",
    "or",
    "or_eq",
    "private",
    "protected",
    "public",
    "reflexpr",
    "register",
    "reinterpret_cast",
    "requires",
    "return",
    "short",
    "signed",
    "sizeof",
    "static",
    "static_assert",
    "static_cast",
    "struct",
    "switch",
    "synchronized",
    "template",
    "this",
    "thread_local",
    "throw",
    "true",
    "try",
    "typedef",
    "typeid",
    "typename",
    "union",
    "unsigned",
    "using",
    "virtual",
    "void",
    "volatile",
    "wchar_t",
    "while",
    "xor",
    "xor_eq",
];

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum IdentError {
    #[error("identifier is empty")]
    Empty,

    #[error("identifier '{input}' has an empty segment")]
    EmptySegment { input: String },

    #[error("segment '{segment}' of '{input}' is not a valid identifier")]
    InvalidSegment { input: String, segment: String },

    #[error("segment '{segment}' of '{input}' is a reserved keyword")]
    Keyword { input: String, segment: String },
}

/// A qualified identifier such as `cppmicroservices` or `a::b::c`.
///
/// Segments are ASCII identifiers (`[A-Za-z_][A-Za-z0-9_]*`) that are not
/// reserved keywords. Non-English identifiers are not supported.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct QualifiedIdent {
    segments: Vec<String>,
}

impl QualifiedIdent {
    /// Parse and validate a `::`-separated qualified name.
    pub fn parse(input: &str) -> Result<Self, IdentError> {
        if input.is_empty() {
            return Err(IdentError::Empty);
        }

        let mut segments = Vec::new();
        for segment in input.split(SEPARATOR) {
            if segment.is_empty() {
                return Err(IdentError::EmptySegment {
                    input: input.to_string(),
                });
            }
            if !is_valid_segment(segment) {
                return Err(IdentError::InvalidSegment {
                    input: input.to_string(),
                    segment: segment.to_string(),
                });
            }
            if is_keyword(segment) {
                return Err(IdentError::Keyword {
                    input: input.to_string(),
                    segment: segment.to_string(),
                });
            }
            segments.push(segment.to_string());
        }

        Ok(Self { segments })
    }

    pub fn segments(&self) -> &[String] {
        &self.segments
    }

    pub fn first(&self) -> &str {
        // parse() guarantees at least one segment
        &self.segments[0]
    }

    pub fn len(&self) -> usize {
        self.segments.len()
    }

    pub fn is_empty(&self) -> bool {
        self.segments.is_empty()
    }

    /// Render with the standard separator and no interior whitespace.
    pub fn render(&self) -> String {
        self.segments.join(SEPARATOR)
    }
}

impl fmt::Display for QualifiedIdent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.render())
    }
}

impl FromStr for QualifiedIdent {
    type Err = IdentError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

/// Identifier characters: ASCII letters, digits, underscore.
#[inline]
pub fn is_ident_byte(b: u8) -> bool {
    b.is_ascii_alphanumeric() || b == b'_'
}

fn is_valid_segment(segment: &str) -> bool {
    let bytes = segment.as_bytes();
    match bytes.first() {
        Some(b) if b.is_ascii_alphabetic() || *b == b'_' => {}
        _ => return false,
    }
    bytes.iter().all(|b| is_ident_byte(*b))
}

pub fn is_keyword(segment: &str) -> bool {
    CPP_KEYWORDS.contains(&segment)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_single_segment() {
        let ident = QualifiedIdent::parse("mw_cppms").unwrap();
        assert_eq!(ident.segments(), &["mw_cppms".to_string()]);
        assert_eq!(ident.first(), "mw_cppms");
        assert_eq!(ident.render(), "mw_cppms");
    }

    #[test]
    fn test_parse_qualified() {
        let ident: QualifiedIdent = "a::b::c".parse().unwrap();
        assert_eq!(ident.len(), 3);
        assert_eq!(ident.to_string(), "a::b::c");
    }

    #[test]
    fn test_valid_names() {
        for name in ["mw_cppms", "mwcppms", "abcd", "random_xyz_1235", "_private"] {
            assert!(QualifiedIdent::parse(name).is_ok(), "{name}");
        }
    }

    #[test]
    fn test_invalid_names() {
        assert!(matches!(
            QualifiedIdent::parse("1234asd"),
            Err(IdentError::InvalidSegment { .. })
        ));
        assert!(matches!(
            QualifiedIdent::parse("random xyz_1235"),
            Err(IdentError::InvalidSegment { .. })
        ));
        assert!(matches!(
            QualifiedIdent::parse("mw@cppms"),
            Err(IdentError::InvalidSegment { .. })
        ));
        assert!(matches!(
            QualifiedIdent::parse("你好"),
            Err(IdentError::InvalidSegment { .. })
        ));
        assert_eq!(QualifiedIdent::parse(""), Err(IdentError::Empty));
    }

    #[test]
    fn test_separator_placement() {
        for input in ["::a", "a::", "a::::b", "a:::b"] {
            assert!(QualifiedIdent::parse(input).is_err(), "{input}");
        }
    }

    #[test]
    fn test_keywords_rejected() {
        assert!(matches!(
            QualifiedIdent::parse("namespace"),
            Err(IdentError::Keyword { .. })
        ));
        assert!(matches!(
            QualifiedIdent::parse("foo::inline"),
            Err(IdentError::Keyword { .. })
        ));
        assert!(QualifiedIdent::parse("namespaces").is_ok());
    }
}
