//! Runs declaration and call checkers over resolved declarations and calls.

use trellis_core::Location;
use trellis_ir::{Descriptor, DescriptorId, DescriptorTable};
use trellis_syntax::{NodeCategory, SyntaxId, SyntaxKind, SyntaxTree};

use super::bindings::BindingStore;
use crate::{Diagnostic, DiagnosticSink, PipelineFault, registry::ExtensionRegistry};

/// A declaration handed to declaration checkers.
#[derive(Debug, Clone, Copy)]
pub struct DeclarationSite<'a> {
    pub node: SyntaxId,
    pub syntax: &'a SyntaxKind,
    /// The descriptor this declaration introduces.
    pub descriptor: &'a Descriptor,
    pub location: &'a Location,
    pub descriptors: &'a DescriptorTable,
}

/// A resolved call handed to call checkers.
#[derive(Debug, Clone, Copy)]
pub struct CallSite<'a> {
    pub node: SyntaxId,
    pub callee: &'a Descriptor,
    pub callee_id: DescriptorId,
    /// Number of arguments at the call site.
    pub arguments: usize,
    pub location: &'a Location,
    pub descriptors: &'a DescriptorTable,
}

/// Invoke every checker, in registration order, on every site in document
/// order. Checkers see only nodes whose resolution succeeded. A panicking
/// checker faults the unit.
pub(crate) fn run_checkers(
    tree: &SyntaxTree,
    store: &BindingStore,
    descriptors: &DescriptorTable,
    registry: &ExtensionRegistry,
) -> Result<Vec<Diagnostic>, PipelineFault> {
    let mut declarations = Vec::new();
    let mut calls = Vec::new();

    for (id, node) in tree.iter() {
        let Some(binding) = store.get(id) else {
            continue;
        };
        if node.kind.category() == NodeCategory::Declaration
            && let Some(descriptor) = binding.declares.and_then(|d| descriptors.get(d))
        {
            declarations.push((id, &node.kind, descriptor, tree.location(id)));
        }
        if let SyntaxKind::Call { args, .. } = &node.kind
            && let Some(callee_id) = binding.target
            && let Some(callee) = descriptors.get(callee_id)
        {
            calls.push((id, callee_id, callee, args.len(), tree.location(id)));
        }
    }

    let mut diagnostics = Vec::new();

    for (record, checker) in registry.declaration_checkers() {
        let mut sink = DiagnosticSink::new(record.reporter());
        for (node, syntax, descriptor, location) in &declarations {
            let site = DeclarationSite {
                node: *node,
                syntax,
                descriptor,
                location,
                descriptors,
            };
            record.invoke(|| checker.check(&site, &mut sink))?;
        }
        diagnostics.extend(sink.into_diagnostics());
    }

    for (record, checker) in registry.call_checkers() {
        let mut sink = DiagnosticSink::new(record.reporter());
        for (node, callee_id, callee, arguments, location) in &calls {
            let site = CallSite {
                node: *node,
                callee,
                callee_id: *callee_id,
                arguments: *arguments,
                location,
                descriptors,
            };
            record.invoke(|| checker.check(&site, &mut sink))?;
        }
        diagnostics.extend(sink.into_diagnostics());
    }

    Ok(diagnostics)
}
