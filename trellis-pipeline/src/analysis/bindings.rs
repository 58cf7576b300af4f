//! The binding store: what every syntax node resolved to.

use bitflags::bitflags;
use serde::Serialize;
use trellis_ir::{DescriptorId, DescriptorTable, Ty};
use trellis_syntax::{NodeCategory, SyntaxId, SyntaxTree};

use crate::PipelineFault;

bitflags! {
    /// Diagnostic flags attached to a binding.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct BindingFlags: u8 {
        /// The reference could not be resolved.
        const UNRESOLVED = 1 << 0;
        /// The node's type disagrees with what its context expects.
        const TYPE_MISMATCH = 1 << 1;
        /// The node resolved to a descriptor synthesized by an extension.
        const SYNTHETIC = 1 << 2;
    }
}

/// Resolution result for one syntax node.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Binding {
    pub ty: Ty,
    /// Declaration a reference node points at.
    pub target: Option<DescriptorId>,
    /// Descriptor a declaration node introduces.
    pub declares: Option<DescriptorId>,
    pub flags: BindingFlags,
}

impl Binding {
    /// Binding for an expression with no declaration involved.
    pub fn typed(ty: Ty) -> Self {
        Self {
            ty,
            target: None,
            declares: None,
            flags: BindingFlags::empty(),
        }
    }

    pub fn reference(ty: Ty, target: DescriptorId) -> Self {
        Self {
            target: Some(target),
            ..Self::typed(ty)
        }
    }

    pub fn declaration(ty: Ty, declares: DescriptorId) -> Self {
        Self {
            declares: Some(declares),
            ..Self::typed(ty)
        }
    }

    pub fn unresolved() -> Self {
        Self {
            flags: BindingFlags::UNRESOLVED,
            ..Self::typed(Ty::Error)
        }
    }

    pub fn with_flags(mut self, flags: BindingFlags) -> Self {
        self.flags |= flags;
        self
    }
}

/// Mutable store, alive only while analysis runs.
#[derive(Debug, Clone)]
pub struct BindingStore {
    bindings: Vec<Option<Binding>>,
}

impl BindingStore {
    /// An empty store sized for `tree`.
    pub fn new(tree: &SyntaxTree) -> Self {
        Self {
            bindings: vec![None; tree.len()],
        }
    }

    pub fn insert(&mut self, id: SyntaxId, binding: Binding) {
        if let Some(slot) = self.bindings.get_mut(id.index()) {
            *slot = Some(binding);
        }
    }

    pub fn get(&self, id: SyntaxId) -> Option<&Binding> {
        self.bindings.get(id.index()).and_then(Option::as_ref)
    }

    /// Add flags to an existing binding.
    pub fn flag(&mut self, id: SyntaxId, flags: BindingFlags) {
        if let Some(Some(binding)) = self.bindings.get_mut(id.index()) {
            binding.flags |= flags;
        }
    }

    /// Check that every declaration and reference node has a binding and
    /// freeze the store.
    pub fn freeze(
        self,
        tree: &SyntaxTree,
        descriptors: &DescriptorTable,
    ) -> Result<Bindings, PipelineFault> {
        for (id, node) in tree.iter() {
            let required = node.kind.category() == NodeCategory::Declaration
                || node.kind.is_reference();
            let Some(binding) = self.get(id) else {
                if required {
                    return Err(PipelineFault::invariant(
                        "analyze",
                        format!("syntax node {} at {} has no binding", id, node.path),
                    ));
                }
                continue;
            };
            for descriptor in binding.target.iter().chain(binding.declares.iter()) {
                if !descriptors.contains(*descriptor) {
                    return Err(PipelineFault::invariant(
                        "analyze",
                        format!(
                            "binding for {} names unknown descriptor {}",
                            node.path, descriptor
                        ),
                    ));
                }
            }
        }

        Ok(Bindings {
            bindings: self.bindings,
        })
    }
}

/// Frozen bindings. Read-only for the rest of the run.
#[derive(Debug, Clone)]
pub struct Bindings {
    bindings: Vec<Option<Binding>>,
}

impl Bindings {
    pub fn get(&self, id: SyntaxId) -> Option<&Binding> {
        self.bindings.get(id.index()).and_then(Option::as_ref)
    }

    /// Number of bound nodes.
    pub fn len(&self) -> usize {
        self.bindings.iter().filter(|b| b.is_some()).count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn iter(&self) -> impl Iterator<Item = (SyntaxId, &Binding)> {
        self.bindings
            .iter()
            .enumerate()
            .filter_map(|(i, b)| b.as_ref().map(|b| (SyntaxId::new(i as u32), b)))
    }

    /// Human-readable view of every binding, for snapshots.
    pub fn summarize(&self, tree: &SyntaxTree, descriptors: &DescriptorTable) -> Vec<BindingSummary> {
        self.iter()
            .map(|(id, binding)| BindingSummary {
                path: tree.node(id).path.clone(),
                ty: descriptors.display_ty(&binding.ty),
                target: binding
                    .target
                    .and_then(|d| descriptors.get(d))
                    .map(|d| d.name.clone()),
                declares: binding
                    .declares
                    .and_then(|d| descriptors.get(d))
                    .map(|d| d.name.clone()),
                flags: binding
                    .flags
                    .iter_names()
                    .map(|(name, _)| name.to_lowercase())
                    .collect(),
            })
            .collect()
    }
}

/// Serializable view of one binding.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BindingSummary {
    pub path: String,
    pub ty: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub target: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub declares: Option<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub flags: Vec<String>,
}

#[cfg(test)]
mod tests {
    use trellis_ir::{Descriptor, DescriptorKind, Origin};

    use super::*;

    const UNIT: &str = r#"
        [[items]]
        kind = "function"
        name = "main"
        body = [{ kind = "expr", value = { kind = "int", value = 1 } }]
    "#;

    #[test]
    fn test_freeze_requires_declaration_bindings() {
        let tree = trellis_syntax::parse_str(UNIT).unwrap();
        let store = BindingStore::new(&tree);

        let err = store.freeze(&tree, &DescriptorTable::new()).unwrap_err();

        assert!(matches!(err, PipelineFault::Invariant { .. }));
    }

    #[test]
    fn test_freeze_accepts_complete_store() {
        let tree = trellis_syntax::parse_str(UNIT).unwrap();
        let mut table = DescriptorTable::new();
        let main = table.insert(Descriptor::new(
            "main",
            DescriptorKind::Function,
            Origin::Source { node: 0 },
        ));
        let mut store = BindingStore::new(&tree);
        store.insert(SyntaxId::new(0), Binding::declaration(Ty::Unit, main));

        let bindings = store.freeze(&tree, &table).unwrap();

        assert_eq!(bindings.len(), 1);
        assert_eq!(bindings.get(SyntaxId::new(0)).and_then(|b| b.declares), Some(main));
    }

    #[test]
    fn test_flags_accumulate() {
        let binding = Binding::unresolved().with_flags(BindingFlags::TYPE_MISMATCH);
        assert!(binding.flags.contains(BindingFlags::UNRESOLVED | BindingFlags::TYPE_MISMATCH));
        assert!(!binding.flags.contains(BindingFlags::SYNTHETIC));
    }
}
