use std::path::PathBuf;

use miette::{Diagnostic, NamedSource, SourceSpan};
use thiserror::Error;

/// Result type for unit parsing (boxed to reduce size on stack)
pub type Result<T> = std::result::Result<T, Box<Error>>;

/// Source context for error reporting.
///
/// Keeps the unit source and filename together so error factories don't
/// need both passed around.
#[derive(Debug, Clone)]
pub struct SourceContext {
    src: String,
    filename: String,
}

impl SourceContext {
    /// Create a new source context.
    pub fn new(src: impl Into<String>, filename: impl Into<String>) -> Self {
        Self {
            src: src.into(),
            filename: filename.into(),
        }
    }

    /// Get the source content.
    pub fn src(&self) -> &str {
        &self.src
    }

    /// Create a NamedSource for miette error reporting.
    pub fn named_source(&self) -> NamedSource<String> {
        NamedSource::new(&self.filename, self.src.clone())
    }

    /// Create a parse error from a toml error.
    pub fn parse_error(&self, source: toml::de::Error) -> Box<Error> {
        let span = source.span().map(SourceSpan::from);
        Box::new(Error::Parse {
            src: self.named_source(),
            span,
            source,
        })
    }

    /// Create an invalid identifier error, pointing at the name when it can be found.
    pub fn invalid_identifier_error(
        &self,
        name: impl Into<String>,
        path: impl Into<String>,
        reason: impl Into<String>,
    ) -> Box<Error> {
        let name = name.into();
        Box::new(Error::InvalidIdentifier {
            src: self.named_source(),
            span: find_name_span(&self.src, &name),
            name,
            path: path.into(),
            reason: reason.into(),
        })
    }

    /// Create an invalid unit name error, pointing at `unit = "..."` when present.
    pub fn invalid_unit_name_error(
        &self,
        name: impl Into<String>,
        reason: impl Into<String>,
    ) -> Box<Error> {
        let name = name.into();
        Box::new(Error::InvalidUnitName {
            src: self.named_source(),
            span: find_unit_span(&self.src, &name),
            name,
            reason: reason.into(),
        })
    }
}

#[derive(Debug, Error, Diagnostic)]
pub enum Error {
    #[error("failed to read unit '{path}'")]
    #[diagnostic(code(trellis::io))]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse unit file")]
    #[diagnostic(code(trellis::unit_parse))]
    Parse {
        #[source_code]
        src: NamedSource<String>,
        #[label("parse error here")]
        span: Option<SourceSpan>,
        #[source]
        source: toml::de::Error,
    },

    #[error("invalid name '{name}' at {path}")]
    #[diagnostic(
        code(trellis::invalid_identifier),
        help("{reason}. Use only letters, numbers, and underscores, starting with a letter or underscore.")
    )]
    InvalidIdentifier {
        #[source_code]
        src: NamedSource<String>,
        #[label("invalid identifier")]
        span: Option<SourceSpan>,
        name: String,
        path: String,
        reason: String,
    },

    #[error("invalid unit name '{name}'")]
    #[diagnostic(
        code(trellis::invalid_unit_name),
        help("{reason}. Artifacts are named after the unit, so it must be a plain file name.")
    )]
    InvalidUnitName {
        #[source_code]
        src: NamedSource<String>,
        #[label("invalid unit name")]
        span: Option<SourceSpan>,
        name: String,
        reason: String,
    },
}

fn find_unit_span(src: &str, name: &str) -> Option<SourceSpan> {
    ['"', '\''].into_iter().find_map(|quote| {
        let pattern = format!("unit = {}{}{}", quote, name, quote);
        src.find(&pattern)
            .map(|pos| SourceSpan::from((pos + "unit = ".len() + 1, name.len())))
    })
}

/// Find the span of a name in the unit source.
///
/// Looks for `name = "<name>"` and inline-table forms; returns `None`
/// rather than guessing a wrong location.
pub(crate) fn find_name_span(src: &str, name: &str) -> Option<SourceSpan> {
    for quote in ['"', '\''] {
        for key in ["name", "callee"] {
            let pattern = format!("{} = {}{}{}", key, quote, name, quote);
            if let Some(pos) = src.find(&pattern) {
                let start = pos + key.len() + 4;
                return Some(SourceSpan::from((start, name.len())));
            }
        }
    }
    None
}

/// Validate that a name is a usable identifier.
/// Returns None if valid, Some(reason) if invalid.
pub(crate) fn validate_identifier(name: &str) -> Option<&'static str> {
    let mut chars = name.chars();

    match chars.next() {
        Some(c) if c.is_ascii_alphabetic() || c == '_' => {}
        Some(_) => return Some("name must start with a letter or underscore"),
        None => return Some("name cannot be empty"),
    }

    if chars.all(|c| c.is_ascii_alphanumeric() || c == '_') {
        None
    } else {
        Some("name must contain only letters, numbers, and underscores")
    }
}

/// Validate that a unit name can be used as a file name inside the output
/// directory. Returns None if valid, Some(reason) if invalid.
pub(crate) fn validate_unit_name(name: &str) -> Option<&'static str> {
    if name.trim().is_empty() {
        Some("unit name cannot be empty")
    } else if name.contains(['/', '\\']) {
        Some("unit name cannot contain a path separator")
    } else if name.contains("..") {
        Some("unit name cannot contain '..'")
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_valid_identifiers() {
        assert!(validate_identifier("f").is_none());
        assert!(validate_identifier("get_x").is_none());
        assert!(validate_identifier("_tmp2").is_none());
    }

    #[test]
    fn test_invalid_identifiers() {
        assert_eq!(validate_identifier(""), Some("name cannot be empty"));
        assert_eq!(
            validate_identifier("2fast"),
            Some("name must start with a letter or underscore")
        );
        assert!(validate_identifier("my-fn").is_some());
    }

    #[test]
    fn test_unit_names() {
        assert!(validate_unit_name("main").is_none());
        assert!(validate_unit_name("shapes.v2").is_none());
        assert_eq!(validate_unit_name(""), Some("unit name cannot be empty"));
        assert_eq!(
            validate_unit_name("../escaped"),
            Some("unit name cannot contain a path separator")
        );
        assert!(validate_unit_name("/abs").is_some());
        assert!(validate_unit_name("a\\b").is_some());
        assert_eq!(validate_unit_name(".."), Some("unit name cannot contain '..'"));
    }

    #[test]
    fn test_find_name_span() {
        let src = "[[items]]\nkind = \"function\"\nname = \"bad-name\"\n";
        let span = find_name_span(src, "bad-name").expect("span");
        assert_eq!(&src[span.offset()..span.offset() + span.len()], "bad-name");
    }
}
