//! Construction of the IR from a resolved syntax tree.

use tracing::debug;
use trellis_ir::{Constant, DescriptorId, DescriptorTable, IrKind, IrModule, NodeId, Ty};
use trellis_syntax::{SyntaxId, SyntaxKind, SyntaxTree};

use crate::{
    PipelineFault,
    analysis::{Binding, Bindings},
};

const STAGE: &str = "build-ir";

/// Build the IR for an accepted unit.
///
/// Every declaration and reference takes its descriptor from the frozen
/// bindings; a missing binding is an internal fault, never a diagnostic.
pub fn build_ir(
    tree: &SyntaxTree,
    bindings: &Bindings,
    descriptors: &DescriptorTable,
) -> Result<IrModule, PipelineFault> {
    let mut builder = IrBuilder {
        tree,
        bindings,
        module: IrModule::new(tree.unit()),
    };

    let mut items = Vec::with_capacity(tree.items().len());
    for &item in tree.items() {
        items.push(builder.item(item)?);
    }
    let file = builder.module.alloc(
        IrKind::File {
            name: tree.unit().to_string(),
        },
        None,
        Ty::Unit,
        items,
    );
    let root = builder.module.root();
    builder.module.push_child(root, file);

    let mut module = builder.module;
    module.compact();
    module
        .verify(descriptors)
        .map_err(|e| PipelineFault::invariant(STAGE, e.to_string()))?;

    debug!(unit = tree.unit(), nodes = module.len(), "built IR");
    Ok(module)
}

struct IrBuilder<'a> {
    tree: &'a SyntaxTree,
    bindings: &'a Bindings,
    module: IrModule,
}

impl IrBuilder<'_> {
    fn binding(&self, id: SyntaxId) -> Result<&Binding, PipelineFault> {
        self.bindings.get(id).ok_or_else(|| {
            PipelineFault::invariant(
                STAGE,
                format!("no binding for {}", self.tree.node(id).path),
            )
        })
    }

    fn declares(&self, id: SyntaxId) -> Result<(DescriptorId, Ty), PipelineFault> {
        let binding = self.binding(id)?;
        let declares = binding.declares.ok_or_else(|| {
            PipelineFault::invariant(
                STAGE,
                format!("declaration {} introduces no descriptor", self.tree.node(id).path),
            )
        })?;
        Ok((declares, binding.ty.clone()))
    }

    fn target(&self, id: SyntaxId) -> Result<(DescriptorId, Ty), PipelineFault> {
        let binding = self.binding(id)?;
        let target = binding.target.ok_or_else(|| {
            PipelineFault::invariant(
                STAGE,
                format!("reference {} has no target", self.tree.node(id).path),
            )
        })?;
        Ok((target, binding.ty.clone()))
    }

    fn item(&mut self, id: SyntaxId) -> Result<NodeId, PipelineFault> {
        let tree = self.tree;
        match tree.kind(id) {
            SyntaxKind::Class { name, fields } => {
                let (descriptor, ty) = self.declares(id)?;
                let mut children = Vec::with_capacity(fields.len());
                for &field in fields {
                    let SyntaxKind::Field { name, .. } = tree.kind(field) else {
                        continue;
                    };
                    let (field_descriptor, field_ty) = self.declares(field)?;
                    children.push(self.module.alloc(
                        IrKind::Field { name: name.clone() },
                        Some(field_descriptor),
                        field_ty,
                        Vec::new(),
                    ));
                }
                Ok(self.module.alloc(
                    IrKind::Class { name: name.clone() },
                    Some(descriptor),
                    ty,
                    children,
                ))
            }
            SyntaxKind::Function {
                name, params, body, ..
            } => {
                let (descriptor, ty) = self.declares(id)?;
                let mut children = Vec::with_capacity(params.len() + 1);
                for &param in params {
                    let SyntaxKind::Param { name, .. } = tree.kind(param) else {
                        continue;
                    };
                    let (param_descriptor, param_ty) = self.declares(param)?;
                    children.push(self.module.alloc(
                        IrKind::Param { name: name.clone() },
                        Some(param_descriptor),
                        param_ty,
                        Vec::new(),
                    ));
                }

                let mut stmts = Vec::with_capacity(body.len());
                for &stmt in body {
                    stmts.push(self.stmt(stmt)?);
                }
                children.push(self.module.alloc(IrKind::Block, None, Ty::Unit, stmts));

                Ok(self.module.alloc(
                    IrKind::Function { name: name.clone() },
                    Some(descriptor),
                    ty,
                    children,
                ))
            }
            other => Err(PipelineFault::invariant(
                STAGE,
                format!("unexpected top-level {:?}", other.category()),
            )),
        }
    }

    fn stmt(&mut self, id: SyntaxId) -> Result<NodeId, PipelineFault> {
        let tree = self.tree;
        match tree.kind(id) {
            SyntaxKind::Let { name, value, .. } => {
                let (descriptor, ty) = self.declares(id)?;
                let value = self.expr(*value)?;
                Ok(self.module.alloc(
                    IrKind::Let { name: name.clone() },
                    Some(descriptor),
                    ty,
                    vec![value],
                ))
            }
            SyntaxKind::Return { value } => {
                let children = match value {
                    Some(value) => vec![self.expr(*value)?],
                    None => Vec::new(),
                };
                Ok(self.module.alloc(IrKind::Return, None, Ty::Unit, children))
            }
            SyntaxKind::ExprStmt { expr } => {
                let expr = self.expr(*expr)?;
                let ty = self.module.node(expr).ty().clone();
                Ok(self.module.alloc(IrKind::Eval, None, ty, vec![expr]))
            }
            other => Err(PipelineFault::invariant(
                STAGE,
                format!("expected a statement, found {:?}", other.category()),
            )),
        }
    }

    fn expr(&mut self, id: SyntaxId) -> Result<NodeId, PipelineFault> {
        let constant = |value| IrKind::Constant { value };

        let tree = self.tree;
        let node = match tree.kind(id) {
            SyntaxKind::Int(v) => {
                self.module
                    .alloc(constant(Constant::Int(*v)), None, Ty::Int, Vec::new())
            }
            SyntaxKind::Bool(v) => {
                self.module
                    .alloc(constant(Constant::Bool(*v)), None, Ty::Bool, Vec::new())
            }
            SyntaxKind::Str(v) => {
                self.module
                    .alloc(constant(Constant::Str(v.clone())), None, Ty::Str, Vec::new())
            }
            SyntaxKind::Ref { .. } => {
                let (target, ty) = self.target(id)?;
                self.module.alloc(IrKind::Local, Some(target), ty, Vec::new())
            }
            SyntaxKind::Call { args, .. } => {
                let (target, ty) = self.target(id)?;
                let mut children = Vec::with_capacity(args.len());
                for &arg in args {
                    children.push(self.expr(arg)?);
                }
                self.module.alloc(IrKind::Call, Some(target), ty, children)
            }
            SyntaxKind::Binary { op, lhs, rhs } => {
                let ty = self.binding(id)?.ty.clone();
                let lhs = self.expr(*lhs)?;
                let rhs = self.expr(*rhs)?;
                self.module
                    .alloc(IrKind::Binary { op: *op }, None, ty, vec![lhs, rhs])
            }
            other => {
                return Err(PipelineFault::invariant(
                    STAGE,
                    format!("expected an expression, found {:?}", other.category()),
                ));
            }
        };
        Ok(node)
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;
    use crate::{
        DiagnosticSet, RegistryBuilder,
        analysis::{AnalysisOutcome, analyze},
    };

    const SOURCE: &str = r#"
        [[items]]
        kind = "class"
        name = "Point"
        fields = [{ name = "x", type = "int" }]

        [[items]]
        kind = "function"
        name = "main"
        params = [{ name = "p", type = "Point" }]
        returns = "int"
        body = [
            { kind = "let", name = "y", value = { kind = "binary", op = "*", lhs = { kind = "int", value = 2 }, rhs = { kind = "int", value = 3 } } },
            { kind = "expr", value = { kind = "call", callee = "print", args = [{ kind = "str", value = "hi" }] } },
            { kind = "return", value = { kind = "ref", name = "y" } },
        ]
    "#;

    #[test]
    fn test_builds_verified_preorder_module() {
        let tree = trellis_syntax::parse_str(SOURCE).unwrap();
        let registry = RegistryBuilder::with_host().build();
        let mut diagnostics = DiagnosticSet::new();
        let AnalysisOutcome::Accepted(analysis) =
            analyze(&tree, &registry, &mut diagnostics).unwrap()
        else {
            panic!("unit should be accepted: {:?}", diagnostics.sorted());
        };

        let module = build_ir(&tree, &analysis.bindings, &analysis.descriptors).unwrap();

        let kinds: Vec<_> = module
            .preorder()
            .into_iter()
            .map(|id| module.kind(id).name())
            .collect();
        assert_eq!(
            kinds,
            vec![
                "module", "file", "class", "field", "function", "param", "block", "let",
                "binary", "constant", "constant", "eval", "call", "constant", "return", "local",
            ]
        );
        // Compacted: ids follow pre-order.
        assert_eq!(
            module.preorder(),
            (0..module.len() as u32).map(NodeId::new).collect::<Vec<_>>()
        );
        assert!(module.verify(&analysis.descriptors).is_ok());
    }
}
