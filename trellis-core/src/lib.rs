//! Core utilities and types for the Trellis compiler pipeline.
//!
//! This crate provides the small set of types shared by every stage:
//! source locations for diagnostics, artifact file writing, and a few
//! string helpers used by configuration handling and lints.

mod file;
mod location;
mod types;
mod utils;

// File operations
pub use file::{FileRules, GeneratedFile, Overwrite, WriteResult};
// Source locations
pub use location::Location;
// Fundamental types
pub use types::BinOp;
// String utilities
pub use utils::{is_pascal_case, is_snake_case, toml_value_to_string};
