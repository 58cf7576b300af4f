//! Semantic analysis of one unit.
//!
//! Analysis runs four sub-passes in a fixed order:
//!
//! 1. declaration collection, which gives every top-level function and
//!    class a descriptor and resolves signatures;
//! 2. body resolution, which resolves every reference and types every
//!    expression, consulting resolver extensions before the global scope;
//! 3. checkers, which run declaration and call checkers over the resolved
//!    tree;
//! 4. the gate: any error-severity diagnostic rejects the unit, otherwise
//!    the bindings are frozen and the diagnostic set is sealed.

mod bindings;
mod check;
mod resolve;
mod scope;

use tracing::debug;
use trellis_ir::DescriptorTable;
use trellis_syntax::SyntaxTree;

pub use bindings::{Binding, BindingFlags, BindingStore, BindingSummary, Bindings};
pub use check::{CallSite, DeclarationSite};
pub use resolve::{E_ARITY, E_DUPLICATE, E_TYPE, E_UNRESOLVED};

use crate::{DiagnosticSet, PipelineFault, registry::ExtensionRegistry};

/// Everything analysis produces for an accepted unit.
#[derive(Debug, Clone)]
pub struct Analysis {
    pub bindings: Bindings,
    pub descriptors: DescriptorTable,
}

#[derive(Debug, Clone)]
pub enum AnalysisOutcome {
    Accepted(Analysis),
    /// At least one error was reported; nothing downstream may run.
    Rejected,
}

/// Analyze `tree`, pushing every diagnostic into `diagnostics`.
///
/// On acceptance the diagnostic set is sealed before returning.
pub fn analyze(
    tree: &SyntaxTree,
    registry: &ExtensionRegistry,
    diagnostics: &mut DiagnosticSet,
) -> Result<AnalysisOutcome, PipelineFault> {
    let mut resolver = resolve::Resolver::new(tree, registry);
    resolver.collect_declarations();
    resolver.resolve_bodies();
    let (store, descriptors, resolved) = resolver.finish()?;

    let checked = check::run_checkers(tree, &store, &descriptors, registry)?;

    for diagnostic in resolved.into_iter().chain(checked) {
        diagnostics.push(diagnostic)?;
    }

    if diagnostics.has_errors() {
        debug!(
            unit = tree.unit(),
            errors = diagnostics.error_count(),
            "analysis rejected unit"
        );
        return Ok(AnalysisOutcome::Rejected);
    }

    let bindings = store.freeze(tree, &descriptors)?;
    diagnostics.seal();

    debug!(
        unit = tree.unit(),
        bindings = bindings.len(),
        descriptors = descriptors.len(),
        "analysis accepted unit"
    );
    Ok(AnalysisOutcome::Accepted(Analysis {
        bindings,
        descriptors,
    }))
}
