//! Capability traits, one per extension point.
//!
//! Every trait is `Send + Sync`: the registry is shared across the threads
//! that process units in parallel.

use trellis_ir::{Descriptor, DescriptorTable, IrModule};
use trellis_manifest::Placement;

use crate::{
    DiagnosticSink,
    analysis::{CallSite, DeclarationSite},
    lowering::{PassAbort, PassContext},
};

/// The syntactic position a name is referenced from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ReferenceKind {
    /// A bare name used as a value.
    Value,
    /// The callee of a call expression.
    Call,
    /// A type annotation.
    Type,
}

/// A name that ordinary resolution is about to look up.
pub struct ResolveRequest<'a> {
    pub name: &'a str,
    pub kind: ReferenceKind,
    /// Descriptors known so far: every top-level declaration and its
    /// members, plus anything synthesized earlier in this unit.
    pub descriptors: &'a DescriptorTable,
}

/// Contributes synthetic declarations during reference resolution.
pub trait DescriptorResolver: Send + Sync {
    fn name(&self) -> &'static str;

    /// Offer a descriptor for the requested name, or decline with `None`.
    fn resolve(&self, request: &ResolveRequest<'_>) -> Option<Descriptor>;
}

/// Inspects every declaration after resolution.
pub trait DeclarationChecker: Send + Sync {
    fn name(&self) -> &'static str;

    fn check(&self, site: &DeclarationSite<'_>, sink: &mut DiagnosticSink);
}

/// Inspects every resolved call after resolution.
pub trait CallChecker: Send + Sync {
    fn name(&self) -> &'static str;

    fn check(&self, site: &CallSite<'_>, sink: &mut DiagnosticSink);
}

/// A transformation over the IR of one unit.
///
/// Passes get exclusive access to the module for one invocation and have no
/// way to report diagnostics; the only failure channel is
/// [`PassContext::abort`].
pub trait LoweringPass: Send + Sync {
    fn name(&self) -> &'static str;

    fn description(&self) -> &'static str {
        ""
    }

    /// Default position relative to the host passes.
    fn placement(&self) -> Placement {
        Placement::Last
    }

    /// Whether running the pass on its own output is guaranteed to be a no-op.
    fn idempotent(&self) -> bool {
        false
    }

    fn run(&self, module: &mut IrModule, ctx: &PassContext<'_>) -> Result<(), PassAbort>;
}
