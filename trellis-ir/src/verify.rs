//! Structural verification of IR modules.
//!
//! Run after construction and after every lowering pass. A module that fails
//! verification must never reach codegen.

use thiserror::Error;

use crate::{DescriptorTable, IrKind, IrModule, NodeId};

/// Ways an IR module can be malformed.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum IrError {
    #[error("root node {node} is a {found}, expected module")]
    RootNotModule { node: NodeId, found: &'static str },

    #[error("node {parent} references missing child {child}")]
    DanglingChild { parent: NodeId, child: NodeId },

    #[error("node {node} is owned by more than one parent")]
    SharedNode { node: NodeId },

    #[error("{kind} node {node} has no descriptor")]
    MissingDescriptor { node: NodeId, kind: &'static str },

    #[error("node {node} references unknown descriptor {descriptor}")]
    UnknownDescriptor { node: NodeId, descriptor: String },

    #[error("{kind} node {node} has {found} children, expected {expected}")]
    Arity {
        node: NodeId,
        kind: &'static str,
        expected: &'static str,
        found: usize,
    },

    #[error("{parent} node {node} cannot contain a {child}")]
    BadChild {
        node: NodeId,
        parent: &'static str,
        child: &'static str,
    },
}

impl IrModule {
    /// Check the structural invariants of this module.
    ///
    /// Every reachable node is owned by exactly one parent, declaration and
    /// reference kinds carry a known descriptor, and each kind has the child
    /// shape documented on [`IrKind`].
    pub fn verify(&self, descriptors: &DescriptorTable) -> Result<(), IrError> {
        let root = self.root();
        let Some(root_node) = self.get(root) else {
            return Err(IrError::DanglingChild {
                parent: root,
                child: root,
            });
        };
        if !matches!(root_node.kind(), IrKind::Module { .. }) {
            return Err(IrError::RootNotModule {
                node: root,
                found: root_node.kind().name(),
            });
        }

        let mut seen = vec![false; self.len()];
        seen[root.index()] = true;
        let mut stack = vec![root];

        while let Some(id) = stack.pop() {
            let node = self.node(id);

            for child in node.children() {
                if self.get(*child).is_none() {
                    return Err(IrError::DanglingChild {
                        parent: id,
                        child: *child,
                    });
                }
                // A node seen twice is either shared or part of a cycle.
                if seen[child.index()] {
                    return Err(IrError::SharedNode { node: *child });
                }
                seen[child.index()] = true;
                stack.push(*child);
            }

            let kind = node.kind();
            if kind.is_declaration() || kind.is_reference() {
                match node.descriptor() {
                    None => {
                        return Err(IrError::MissingDescriptor {
                            node: id,
                            kind: kind.name(),
                        });
                    }
                    Some(d) if !descriptors.contains(d) => {
                        return Err(IrError::UnknownDescriptor {
                            node: id,
                            descriptor: d.to_string(),
                        });
                    }
                    Some(_) => {}
                }
            }

            self.check_shape(id)?;
        }

        Ok(())
    }

    fn check_shape(&self, id: NodeId) -> Result<(), IrError> {
        let kind = self.kind(id);
        let children = self.children(id);
        let arity = |expected: &'static str, ok: bool| {
            if ok {
                Ok(())
            } else {
                Err(IrError::Arity {
                    node: id,
                    kind: kind.name(),
                    expected,
                    found: children.len(),
                })
            }
        };

        match kind {
            IrKind::Binary { .. } => arity("2", children.len() == 2)?,
            IrKind::Let { .. } | IrKind::Eval | IrKind::FieldGet => {
                arity("1", children.len() == 1)?
            }
            IrKind::Return => arity("at most 1", children.len() <= 1)?,
            IrKind::Field { .. }
            | IrKind::Param { .. }
            | IrKind::Local
            | IrKind::Constant { .. } => arity("0", children.is_empty())?,
            IrKind::Function { .. } => {
                let ends_in_block = children
                    .last()
                    .is_some_and(|last| matches!(self.kind(*last), IrKind::Block));
                arity("params and a trailing block", ends_in_block)?;
                let params = &children[..children.len() - 1];
                self.expect_children(id, params, |k| matches!(k, IrKind::Param { .. }))?;
            }
            IrKind::Block => self.expect_children(id, children, IrKind::is_statement)?,
            IrKind::Module { .. } => {
                self.expect_children(id, children, |k| matches!(k, IrKind::File { .. }))?
            }
            IrKind::File { .. } => self.expect_children(id, children, |k| {
                matches!(k, IrKind::Class { .. } | IrKind::Function { .. })
            })?,
            IrKind::Class { .. } => {
                self.expect_children(id, children, |k| matches!(k, IrKind::Field { .. }))?
            }
            IrKind::Call => {}
        }

        if matches!(
            kind,
            IrKind::Binary { .. }
                | IrKind::Let { .. }
                | IrKind::Eval
                | IrKind::FieldGet
                | IrKind::Return
                | IrKind::Call
        ) {
            self.expect_children(id, children, is_expression)?;
        }

        Ok(())
    }

    fn expect_children(
        &self,
        parent: NodeId,
        children: &[NodeId],
        allowed: impl Fn(&IrKind) -> bool,
    ) -> Result<(), IrError> {
        for child in children {
            let kind = self.kind(*child);
            if !allowed(kind) {
                return Err(IrError::BadChild {
                    node: parent,
                    parent: self.kind(parent).name(),
                    child: kind.name(),
                });
            }
        }
        Ok(())
    }
}

fn is_expression(kind: &IrKind) -> bool {
    matches!(
        kind,
        IrKind::Call
            | IrKind::FieldGet
            | IrKind::Local
            | IrKind::Constant { .. }
            | IrKind::Binary { .. }
    )
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;
    use trellis_core::BinOp;

    use super::*;
    use crate::{Constant, Descriptor, DescriptorKind, Origin, Ty};

    fn function_module() -> (IrModule, DescriptorTable, NodeId) {
        let mut table = DescriptorTable::new();
        let f = table.insert(
            Descriptor::new("f", DescriptorKind::Function, Origin::Source { node: 0 })
                .with_ty(Ty::Int),
        );

        let mut module = IrModule::new("main");
        let one = module.alloc(
            IrKind::Constant {
                value: Constant::Int(1),
            },
            None,
            Ty::Int,
            vec![],
        );
        let ret = module.alloc(IrKind::Return, None, Ty::Unit, vec![one]);
        let block = module.alloc(IrKind::Block, None, Ty::Unit, vec![ret]);
        let func = module.alloc(
            IrKind::Function { name: "f".into() },
            Some(f),
            Ty::Int,
            vec![block],
        );
        let file = module.alloc(IrKind::File { name: "main".into() }, None, Ty::Unit, vec![func]);
        let root = module.root();
        module.push_child(root, file);
        (module, table, block)
    }

    #[test]
    fn test_well_formed_module_verifies() {
        let (module, table, _) = function_module();
        assert_eq!(module.verify(&table), Ok(()));
    }

    #[test]
    fn test_shared_node_is_rejected() {
        let (mut module, table, block) = function_module();
        let ret = module.children(block)[0];
        module.push_child(block, ret);

        assert!(matches!(
            module.verify(&table),
            Err(IrError::SharedNode { .. })
        ));
    }

    #[test]
    fn test_reference_without_descriptor_is_rejected() {
        let (mut module, table, block) = function_module();
        let call = module.alloc(IrKind::Call, None, Ty::Int, vec![]);
        let eval = module.alloc(IrKind::Eval, None, Ty::Unit, vec![call]);
        module.push_child(block, eval);

        assert_eq!(
            module.verify(&table),
            Err(IrError::MissingDescriptor {
                node: call,
                kind: "call"
            })
        );
    }

    #[test]
    fn test_unknown_descriptor_is_rejected() {
        let (mut module, table, block) = function_module();
        let local = module.alloc(IrKind::Local, Some(crate::DescriptorId::new(9)), Ty::Int, vec![]);
        let eval = module.alloc(IrKind::Eval, None, Ty::Unit, vec![local]);
        module.push_child(block, eval);

        assert!(matches!(
            module.verify(&table),
            Err(IrError::UnknownDescriptor { .. })
        ));
    }

    #[test]
    fn test_binary_arity_is_checked() {
        let (mut module, table, block) = function_module();
        let one = module.alloc(
            IrKind::Constant {
                value: Constant::Int(1),
            },
            None,
            Ty::Int,
            vec![],
        );
        let add = module.alloc(IrKind::Binary { op: BinOp::Add }, None, Ty::Int, vec![one]);
        let eval = module.alloc(IrKind::Eval, None, Ty::Unit, vec![add]);
        module.push_child(block, eval);

        assert!(matches!(
            module.verify(&table),
            Err(IrError::Arity { kind: "binary", .. })
        ));
    }

    #[test]
    fn test_statement_inside_expression_is_rejected() {
        let (mut module, table, block) = function_module();
        let inner = module.alloc(IrKind::Block, None, Ty::Unit, vec![]);
        let eval = module.alloc(IrKind::Eval, None, Ty::Unit, vec![inner]);
        module.push_child(block, eval);

        assert!(matches!(
            module.verify(&table),
            Err(IrError::BadChild { parent: "eval", child: "block", .. })
        ));
    }
}
