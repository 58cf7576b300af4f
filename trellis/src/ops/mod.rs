//! Core operations.
//!
//! This module contains the business logic for trellis commands,
//! separated from CLI argument parsing and output rendering.

pub mod build;
pub mod check;
pub mod explain;

pub use build::{BuildOptions, build};
pub use check::check;
pub use explain::explain;
