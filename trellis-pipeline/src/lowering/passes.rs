//! Host lowering passes.

use std::sync::Arc;

use trellis_core::BinOp;
use trellis_ir::{Constant, IrKind, IrModule, NodeId};
use trellis_manifest::Target;

use super::{PassAbort, PassContext};
use crate::registry::LoweringPass;

/// The host passes run for `target`, in order.
pub fn host_passes(target: Target) -> Vec<Arc<dyn LoweringPass>> {
    match target {
        Target::Native => vec![
            Arc::new(FoldConstants),
            Arc::new(EliminateDeadCode),
            Arc::new(FlattenBlocks),
        ],
        Target::Bundle => vec![Arc::new(FoldConstants)],
    }
}

/// Evaluates binary operations whose operands are both constants.
///
/// Integer overflow and division by zero are left for runtime.
pub struct FoldConstants;

impl LoweringPass for FoldConstants {
    fn name(&self) -> &'static str {
        "fold-constants"
    }

    fn description(&self) -> &'static str {
        "Evaluate binary operations on constant operands"
    }

    fn idempotent(&self) -> bool {
        true
    }

    fn run(&self, module: &mut IrModule, _ctx: &PassContext<'_>) -> Result<(), PassAbort> {
        for id in module.postorder() {
            let IrKind::Binary { op } = module.kind(id) else {
                continue;
            };
            let &[lhs, rhs] = module.children(id) else {
                continue;
            };
            let (IrKind::Constant { value: lhs }, IrKind::Constant { value: rhs }) =
                (module.kind(lhs), module.kind(rhs))
            else {
                continue;
            };

            if let Some(value) = fold(*op, lhs, rhs) {
                module.rewrite(id, IrKind::Constant { value }, Vec::new());
            }
        }
        Ok(())
    }
}

fn fold(op: BinOp, lhs: &Constant, rhs: &Constant) -> Option<Constant> {
    if op == BinOp::Eq {
        return Some(Constant::Bool(lhs == rhs));
    }
    let (Constant::Int(a), Constant::Int(b)) = (lhs, rhs) else {
        return None;
    };
    let value = match op {
        BinOp::Add => Constant::Int(a.checked_add(*b)?),
        BinOp::Sub => Constant::Int(a.checked_sub(*b)?),
        BinOp::Mul => Constant::Int(a.checked_mul(*b)?),
        BinOp::Div => Constant::Int(a.checked_div(*b)?),
        BinOp::Lt => Constant::Bool(a < b),
        BinOp::Eq => Constant::Bool(a == b),
    };
    Some(value)
}

/// Drops statements after a `return` and evaluations with no effect.
pub struct EliminateDeadCode;

impl LoweringPass for EliminateDeadCode {
    fn name(&self) -> &'static str {
        "eliminate-dead-code"
    }

    fn description(&self) -> &'static str {
        "Remove unreachable statements and unused pure evaluations"
    }

    fn idempotent(&self) -> bool {
        true
    }

    fn run(&self, module: &mut IrModule, _ctx: &PassContext<'_>) -> Result<(), PassAbort> {
        for id in module.preorder() {
            if !matches!(module.kind(id), IrKind::Block) {
                continue;
            }

            let mut kept = Vec::new();
            for &stmt in module.children(id) {
                if is_pure_eval(module, stmt) {
                    continue;
                }
                kept.push(stmt);
                if matches!(module.kind(stmt), IrKind::Return) {
                    break;
                }
            }
            *module.children_mut(id) = kept;
        }
        Ok(())
    }
}

fn is_pure_eval(module: &IrModule, stmt: NodeId) -> bool {
    matches!(module.kind(stmt), IrKind::Eval)
        && module
            .children(stmt)
            .first()
            .is_some_and(|e| matches!(module.kind(*e), IrKind::Constant { .. } | IrKind::Local))
}

/// Splices nested blocks into their enclosing block.
pub struct FlattenBlocks;

impl LoweringPass for FlattenBlocks {
    fn name(&self) -> &'static str {
        "flatten-blocks"
    }

    fn description(&self) -> &'static str {
        "Inline nested blocks into their parent block"
    }

    fn idempotent(&self) -> bool {
        true
    }

    fn run(&self, module: &mut IrModule, _ctx: &PassContext<'_>) -> Result<(), PassAbort> {
        // Children first, so a block only ever splices already-flat blocks.
        for id in module.postorder() {
            if !matches!(module.kind(id), IrKind::Block) {
                continue;
            }
            let children = module.children(id);
            if !children.iter().any(|c| matches!(module.kind(*c), IrKind::Block)) {
                continue;
            }

            let mut flat = Vec::with_capacity(children.len());
            for &child in children {
                if matches!(module.kind(child), IrKind::Block) {
                    flat.extend_from_slice(module.children(child));
                } else {
                    flat.push(child);
                }
            }
            *module.children_mut(id) = flat;
        }
        Ok(())
    }
}
