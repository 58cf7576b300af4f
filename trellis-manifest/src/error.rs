use std::path::PathBuf;

use miette::{Diagnostic, NamedSource, SourceSpan};
use thiserror::Error;

/// Result type for manifest operations (boxed to reduce size on stack)
pub type Result<T> = std::result::Result<T, Box<Error>>;

/// Source context for error reporting.
///
/// Encapsulates the manifest content and filename so error factories only
/// need the details of the failure itself.
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

    /// Get the filename.
    pub fn filename(&self) -> &str {
        &self.filename
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

    /// Create a validation error, optionally pointing at a span.
    pub fn validation_error(
        &self,
        message: impl Into<String>,
        span: Option<SourceSpan>,
    ) -> Box<Error> {
        Box::new(Error::Validation {
            src: self.named_source(),
            span,
            message: message.into(),
        })
    }

    /// Create a duplicate plugin error.
    pub fn duplicate_plugin_error(&self, id: impl Into<String>) -> Box<Error> {
        let id = id.into();
        let (first_span, second_span) = find_duplicate_spans(&self.src, "id", &id);
        Box::new(Error::DuplicatePlugin {
            src: self.named_source(),
            first_span,
            second_span,
            id,
        })
    }

    /// Create an error for an option value that is not a scalar.
    pub fn unsupported_option_error(
        &self,
        plugin: impl Into<String>,
        option: impl Into<String>,
    ) -> Box<Error> {
        let option = option.into();
        Box::new(Error::UnsupportedOptionValue {
            src: self.named_source(),
            span: find_key_span(&self.src, &option),
            plugin: plugin.into(),
            option,
        })
    }
}

#[derive(Debug, Error, Diagnostic)]
pub enum Error {
    #[error("failed to read '{path}'")]
    #[diagnostic(help("pass the manifest location with --config, or create a trellis.toml"))]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse trellis.toml")]
    #[diagnostic(code(trellis::parse_error))]
    Parse {
        #[source_code]
        src: NamedSource<String>,
        #[label("parse error here")]
        span: Option<SourceSpan>,
        #[source]
        source: toml::de::Error,
    },

    #[error("plugin '{id}' is enabled more than once")]
    #[diagnostic(
        code(trellis::duplicate_plugin),
        help("merge the two [[plugins]] entries for '{id}' into one")
    )]
    DuplicatePlugin {
        #[source_code]
        src: NamedSource<String>,
        #[label("first enabled here")]
        first_span: Option<SourceSpan>,
        #[label("enabled again here")]
        second_span: Option<SourceSpan>,
        id: String,
    },

    #[error("option '{option}' of plugin '{plugin}' must be a string, integer, float or boolean")]
    #[diagnostic(code(trellis::unsupported_option_value))]
    UnsupportedOptionValue {
        #[source_code]
        src: NamedSource<String>,
        #[label("not a scalar")]
        span: Option<SourceSpan>,
        plugin: String,
        option: String,
    },

    #[error("{message}")]
    #[diagnostic(code(trellis::validation_error))]
    Validation {
        #[source_code]
        src: NamedSource<String>,
        #[label("{message}")]
        span: Option<SourceSpan>,
        message: String,
    },
}

/// Find the span of the last double-quoted occurrence of `value`.
pub(crate) fn find_last_quoted_span(src: &str, value: &str) -> Option<SourceSpan> {
    let pattern = format!("\"{}\"", value);
    src.rfind(&pattern)
        .map(|pos| SourceSpan::from((pos + 1, value.len())))
}

/// Find the span of a bare key at the start of a line.
pub(crate) fn find_key_span(src: &str, key: &str) -> Option<SourceSpan> {
    let mut offset = 0;
    for line in src.split_inclusive('\n') {
        let trimmed = line.trim_start();
        let indent = line.len() - trimmed.len();
        if let Some(rest) = trimmed.strip_prefix(key)
            && rest.trim_start().starts_with('=')
        {
            return Some(SourceSpan::from((offset + indent, key.len())));
        }
        offset += line.len();
    }
    None
}

fn find_duplicate_spans(
    src: &str,
    key: &str,
    value: &str,
) -> (Option<SourceSpan>, Option<SourceSpan>) {
    let spans = find_value_spans(src, key, value);
    (spans.first().copied(), spans.get(1).copied())
}

fn find_value_spans(src: &str, key: &str, value: &str) -> Vec<SourceSpan> {
    let mut spans = Vec::new();
    for quote in ['"', '\''] {
        let pattern = format!("{} = {}{}{}", key, quote, value, quote);
        let skip = key.len() + 4;
        spans.extend(
            src.match_indices(&pattern)
                .map(|(pos, _)| SourceSpan::from((pos + skip, value.len()))),
        );
    }
    spans.sort_by_key(|s| s.offset());
    spans
}
