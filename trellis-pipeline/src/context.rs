//! Per-unit state carried through the stages.

use trellis_ir::{DescriptorTable, IrModule};
use trellis_syntax::SyntaxTree;

use crate::{
    DiagnosticSet,
    analysis::{Analysis, Bindings},
    codegen::Artifact,
};

/// Everything one unit's run owns.
///
/// Fields are filled in stage order: `analysis` by analyze, `ir` by
/// build-ir (and rewritten by lower), `artifact` by codegen or, for the
/// bundle target, by lower.
#[derive(Debug)]
pub struct UnitContext<'a> {
    pub tree: &'a SyntaxTree,
    pub diagnostics: DiagnosticSet,
    pub analysis: Option<Analysis>,
    pub ir: Option<IrModule>,
    pub artifact: Option<Artifact>,
}

impl<'a> UnitContext<'a> {
    pub fn new(tree: &'a SyntaxTree) -> Self {
        Self {
            tree,
            diagnostics: DiagnosticSet::new(),
            analysis: None,
            ir: None,
            artifact: None,
        }
    }

    pub fn unit(&self) -> &str {
        self.tree.unit()
    }

    pub fn bindings(&self) -> Option<&Bindings> {
        self.analysis.as_ref().map(|a| &a.bindings)
    }

    pub fn descriptors(&self) -> Option<&DescriptorTable> {
        self.analysis.as_ref().map(|a| &a.descriptors)
    }
}
