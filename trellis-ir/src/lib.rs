//! Intermediate representation for Trellis.
//!
//! Two halves live here:
//!
//! - [`DescriptorTable`]: declaration metadata produced by analysis, including
//!   descriptors synthesized by resolver extensions.
//! - [`IrModule`]: an arena of [`IrNode`]s built once per compilation unit,
//!   rewritten in place by lowering passes and handed read-only to codegen.
//!
//! IR nodes point at descriptors through [`DescriptorId`]s; they never own
//! them.

mod descriptor;
mod module;
mod verify;

pub use descriptor::{
    Descriptor, DescriptorId, DescriptorKind, DescriptorTable, Origin, ParamInfo, Ty,
};
pub use module::{Constant, IrKind, IrModule, IrNode, NodeId};
pub use verify::IrError;
