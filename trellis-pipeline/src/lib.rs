//! The Trellis compilation pipeline.
//!
//! A run has two phases. Discovery loads every plugin named in the manifest
//! into an [`ExtensionRegistry`], which is frozen before any unit is
//! touched. Processing then takes each unit through four stages:
//!
//! - analysis, where resolvers and checkers participate;
//! - IR building;
//! - lowering, an ordered [`LoweringPlan`] of host and plugin passes;
//! - code generation for the configured target.
//!
//! # Module Organization
//!
//! - [`registry`] - Extension points, extension records and discovery
//! - [`analysis`] - Name resolution, type checking and checker dispatch
//! - [`lowering`] - The lowering plan and the host passes
//! - [`codegen`] - Backends and the [`Artifact`] they produce
//! - [`plugins`] - Plugin modules shipped with Trellis

// Fields read by miette's derive macro trip this lint.
#![allow(unused_assignments)]

pub mod analysis;
pub mod codegen;
mod context;
mod diagnostic;
mod driver;
mod error;
mod host;
mod ir_builder;
pub mod lowering;
mod observer;
pub mod plugins;
pub mod registry;
mod report;
mod stage;

pub use analysis::{Analysis, AnalysisOutcome, CallSite, DeclarationSite, analyze};
pub use codegen::Artifact;
pub use context::UnitContext;
pub use diagnostic::{Diagnostic, DiagnosticSet, DiagnosticSink, Reporter, Severity};
pub use driver::Pipeline;
pub use error::{ConfigError, PipelineFault};
pub use host::BuiltinsResolver;
pub use ir_builder::build_ir;
pub use lowering::LoweringPlan;
pub use observer::{SnapshotObserver, StageObserver, StageSnapshot};
pub use plugins::PluginCatalog;
pub use registry::{
    Extension, ExtensionId, ExtensionPoint, ExtensionRecord, ExtensionRegistry, HOST_PLUGIN,
    RegistryBuilder,
};
pub use report::{RunReport, UnitOutcome, UnitReport};
pub use stage::{ANALYZE, BUILD_IR, CODEGEN, LOWER};
