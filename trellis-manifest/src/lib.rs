//! Project configuration for Trellis.
//!
//! A `trellis.toml` names the project, its compilation target, the unit
//! files to compile (in canonical order) and the plugins to enable, each
//! with an optional order key, lowering placement and scalar options.

// Miette's derive macro generates code that triggers these warnings
#![allow(unused_assignments)]

mod error;
mod manifest;

pub use error::{Error, Result, SourceContext};
pub use manifest::{
    Manifest, Placement, PluginConfig, PluginOptions, ProjectConfig, Target, TrellisToml,
};
