//! Assembly of raw unit data into an arena [`SyntaxTree`].

use crate::{
    Result, SyntaxId, SyntaxKind, SyntaxNode, SyntaxTree,
    error::{SourceContext, validate_identifier},
    raw::{RawExpr, RawItem, RawStmt, RawTyped, RawUnit},
};

/// Builds a tree, assigning ids in pre-order.
struct Assembler<'a> {
    source: &'a SourceContext,
    next: u32,
    nodes: Vec<(SyntaxId, SyntaxNode)>,
}

pub(crate) fn assemble(raw: RawUnit, unit: String, source: &SourceContext) -> Result<SyntaxTree> {
    let mut asm = Assembler {
        source,
        next: 0,
        nodes: Vec::new(),
    };

    let mut items = Vec::with_capacity(raw.items.len());
    for (i, item) in raw.items.into_iter().enumerate() {
        items.push(asm.item(item, format!("items[{}]", i))?);
    }

    let mut nodes = asm.nodes;
    nodes.sort_by_key(|(id, _)| *id);
    let nodes = nodes.into_iter().map(|(_, node)| node).collect();

    Ok(SyntaxTree::new(unit, nodes, items))
}

impl Assembler<'_> {
    fn reserve(&mut self) -> SyntaxId {
        let id = SyntaxId::new(self.next);
        self.next += 1;
        id
    }

    fn finish(&mut self, id: SyntaxId, kind: SyntaxKind, path: String) -> SyntaxId {
        self.nodes.push((id, SyntaxNode { kind, path }));
        id
    }

    fn name(&self, name: String, path: &str) -> Result<String> {
        match validate_identifier(&name) {
            None => Ok(name),
            Some(reason) => Err(self.source.invalid_identifier_error(name, path, reason)),
        }
    }

    fn item(&mut self, item: RawItem, path: String) -> Result<SyntaxId> {
        let id = self.reserve();
        let kind = match item {
            RawItem::Function {
                name,
                type_params,
                params,
                returns,
                body,
            } => {
                let name = self.name(name, &path)?;
                let type_params = type_params
                    .into_iter()
                    .map(|tp| self.name(tp, &path))
                    .collect::<Result<Vec<_>>>()?;
                let params = params
                    .into_iter()
                    .enumerate()
                    .map(|(i, p)| self.typed(p, format!("{}.params[{}]", path, i), false))
                    .collect::<Result<Vec<_>>>()?;
                let returns = returns
                    .map(|ty| self.type_ref(ty, format!("{}.returns", path)))
                    .transpose()?;
                let body = body
                    .into_iter()
                    .enumerate()
                    .map(|(i, stmt)| self.stmt(stmt, format!("{}.body[{}]", path, i)))
                    .collect::<Result<Vec<_>>>()?;
                SyntaxKind::Function {
                    name,
                    type_params,
                    params,
                    returns,
                    body,
                }
            }
            RawItem::Class { name, fields } => {
                let name = self.name(name, &path)?;
                let fields = fields
                    .into_iter()
                    .enumerate()
                    .map(|(i, f)| self.typed(f, format!("{}.fields[{}]", path, i), true))
                    .collect::<Result<Vec<_>>>()?;
                SyntaxKind::Class { name, fields }
            }
        };
        Ok(self.finish(id, kind, path))
    }

    fn typed(&mut self, raw: RawTyped, path: String, field: bool) -> Result<SyntaxId> {
        let id = self.reserve();
        let name = self.name(raw.name, &path)?;
        let ty = self.type_ref(raw.ty, format!("{}.type", path))?;
        let kind = if field {
            SyntaxKind::Field { name, ty }
        } else {
            SyntaxKind::Param { name, ty }
        };
        Ok(self.finish(id, kind, path))
    }

    fn type_ref(&mut self, name: String, path: String) -> Result<SyntaxId> {
        let id = self.reserve();
        let name = self.name(name, &path)?;
        Ok(self.finish(id, SyntaxKind::TypeRef { name }, path))
    }

    fn stmt(&mut self, stmt: RawStmt, path: String) -> Result<SyntaxId> {
        let id = self.reserve();
        let kind = match stmt {
            RawStmt::Let { name, ty, value } => {
                let name = self.name(name, &path)?;
                let ty = ty
                    .map(|ty| self.type_ref(ty, format!("{}.type", path)))
                    .transpose()?;
                let value = self.expr(value, format!("{}.value", path))?;
                SyntaxKind::Let { name, ty, value }
            }
            RawStmt::Return { value } => {
                let value = value
                    .map(|v| self.expr(v, format!("{}.value", path)))
                    .transpose()?;
                SyntaxKind::Return { value }
            }
            RawStmt::Expr { value } => {
                let expr = self.expr(value, format!("{}.value", path))?;
                SyntaxKind::ExprStmt { expr }
            }
        };
        Ok(self.finish(id, kind, path))
    }

    fn expr(&mut self, expr: RawExpr, path: String) -> Result<SyntaxId> {
        let id = self.reserve();
        let kind = match expr {
            RawExpr::Int { value } => SyntaxKind::Int(value),
            RawExpr::Bool { value } => SyntaxKind::Bool(value),
            RawExpr::Str { value } => SyntaxKind::Str(value),
            RawExpr::Ref { name } => SyntaxKind::Ref {
                name: self.name(name, &path)?,
            },
            RawExpr::Call { callee, args } => {
                let callee = self.name(callee, &path)?;
                let args = args
                    .into_iter()
                    .enumerate()
                    .map(|(i, arg)| self.expr(arg, format!("{}.args[{}]", path, i)))
                    .collect::<Result<Vec<_>>>()?;
                SyntaxKind::Call { callee, args }
            }
            RawExpr::Binary { op, lhs, rhs } => {
                let lhs = self.expr(*lhs, format!("{}.lhs", path))?;
                let rhs = self.expr(*rhs, format!("{}.rhs", path))?;
                SyntaxKind::Binary { op, lhs, rhs }
            }
        };
        Ok(self.finish(id, kind, path))
    }
}
