//! Configuration errors and pipeline faults.
//!
//! The two never mix: a [`ConfigError`] aborts the whole run before any unit
//! is analyzed, while a [`PipelineFault`] is an internal failure scoped to
//! one unit and reported next to (never inside) its diagnostics.

use miette::Diagnostic;
use thiserror::Error;
use trellis_ir::IrError;
use trellis_manifest::Target;

use crate::registry::ExtensionPoint;

/// Invalid configuration, detected while the registry and lowering plan are built.
#[derive(Debug, Clone, PartialEq, Eq, Error, Diagnostic)]
pub enum ConfigError {
    #[error("extension '{id}' is already registered for {point}")]
    #[diagnostic(
        code(trellis::duplicate_registration),
        help("each plugin may register an extension name only once per extension point")
    )]
    DuplicateRegistration { id: String, point: ExtensionPoint },

    #[error("extension '{id}' provides {found} and cannot be registered for {point}")]
    #[diagnostic(code(trellis::point_mismatch))]
    PointMismatch {
        id: String,
        point: ExtensionPoint,
        found: ExtensionPoint,
    },

    #[error("unknown plugin '{id}'")]
    #[diagnostic(code(trellis::unknown_plugin), help("available plugins: {available}"))]
    UnknownPlugin { id: String, available: String },

    #[error("plugin '{plugin}' has no option '{option}'")]
    #[diagnostic(code(trellis::unknown_option), help("valid options: {expected}"))]
    UnknownOption {
        plugin: String,
        option: String,
        expected: String,
    },

    #[error("invalid value '{value}' for option '{option}' of plugin '{plugin}'")]
    #[diagnostic(code(trellis::invalid_option), help("{reason}"))]
    InvalidOption {
        plugin: String,
        option: String,
        value: String,
        reason: String,
    },

    #[error("unit name '{unit}' is used by more than one unit")]
    #[diagnostic(
        code(trellis::duplicate_unit),
        help("artifacts are named after their unit; set a distinct `unit` in one of the files")
    )]
    DuplicateUnit { unit: String },

    #[error("lowering pass '{pass}' is placed relative to unknown pass '{anchor}'")]
    #[diagnostic(
        code(trellis::unknown_anchor),
        help("host passes for the {target} target: {available}")
    )]
    UnknownAnchor {
        pass: String,
        anchor: String,
        target: Target,
        available: String,
    },
}

impl ConfigError {
    /// Shorthand used by plugins when converting option strings.
    pub fn invalid_option(
        plugin: impl Into<String>,
        option: impl Into<String>,
        value: impl Into<String>,
        reason: impl Into<String>,
    ) -> Self {
        ConfigError::InvalidOption {
            plugin: plugin.into(),
            option: option.into(),
            value: value.into(),
            reason: reason.into(),
        }
    }
}

/// Internal failure while processing one unit.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PipelineFault {
    #[error("internal invariant violated during {stage}: {message}")]
    Invariant { stage: String, message: String },

    #[error("diagnostic reported after analysis completed: {message}")]
    LateDiagnostic { message: String },

    #[error("extension '{extension}' panicked in {point}: {message}")]
    ExtensionPanicked {
        extension: String,
        point: ExtensionPoint,
        message: String,
    },

    #[error("lowering pass '{pass}' produced malformed IR")]
    MalformedIr {
        pass: String,
        #[source]
        source: IrError,
    },

    #[error("lowering pass '{pass}' aborted: {message}")]
    PassAborted { pass: String, message: String },

    #[error("lowering pass '{pass}' panicked: {message}")]
    PassPanicked { pass: String, message: String },

    #[error("observer '{observer}' failed at {stage}: {message}")]
    Observer {
        observer: String,
        stage: String,
        message: String,
    },

    #[error("{backend} backend failed: {message}")]
    Codegen {
        backend: &'static str,
        message: String,
    },
}

impl PipelineFault {
    pub(crate) fn invariant(stage: &str, message: impl Into<String>) -> Self {
        PipelineFault::Invariant {
            stage: stage.to_string(),
            message: message.into(),
        }
    }

    /// The analysis extension responsible for this fault, if any.
    pub fn extension(&self) -> Option<&str> {
        match self {
            PipelineFault::ExtensionPanicked { extension, .. } => Some(extension),
            _ => None,
        }
    }

    /// The lowering pass responsible for this fault, if any.
    pub fn pass(&self) -> Option<&str> {
        match self {
            PipelineFault::MalformedIr { pass, .. }
            | PipelineFault::PassAborted { pass, .. }
            | PipelineFault::PassPanicked { pass, .. } => Some(pass),
            _ => None,
        }
    }
}
