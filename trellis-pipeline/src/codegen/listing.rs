//! Stack-machine listing for the native target.

use trellis_core::BinOp;
use trellis_ir::{Descriptor, DescriptorTable, IrKind, IrModule, NodeId, Ty};

use super::{Artifact, Backend, CodeBuilder};
use crate::PipelineFault;

const BACKEND: &str = "listing";

/// Renders each function as a flat sequence of stack instructions.
pub struct ListingBackend;

impl Backend for ListingBackend {
    fn name(&self) -> &'static str {
        BACKEND
    }

    fn generate(
        &self,
        module: &IrModule,
        descriptors: &DescriptorTable,
    ) -> Result<Artifact, PipelineFault> {
        let emitter = Emitter {
            module,
            descriptors,
        };
        let mut out = CodeBuilder::default().line(&format!("; unit {}", module.name()));

        for &file in module.children(module.root()) {
            for &item in module.children(file) {
                out = emitter.item(out.blank(), item)?;
            }
        }

        Ok(Artifact::Listing {
            unit: module.name().to_string(),
            text: out.build(),
        })
    }
}

struct Emitter<'a> {
    module: &'a IrModule,
    descriptors: &'a DescriptorTable,
}

impl Emitter<'_> {
    fn fault(&self, message: impl Into<String>) -> PipelineFault {
        PipelineFault::Codegen {
            backend: BACKEND,
            message: message.into(),
        }
    }

    fn descriptor(&self, id: NodeId) -> Result<&Descriptor, PipelineFault> {
        self.module
            .node(id)
            .descriptor()
            .and_then(|d| self.descriptors.get(d))
            .ok_or_else(|| {
                self.fault(format!(
                    "{} node {} has no descriptor",
                    self.module.kind(id).name(),
                    id
                ))
            })
    }

    fn ty(&self, ty: &Ty) -> String {
        self.descriptors.display_ty(ty)
    }

    fn item(&self, out: CodeBuilder, id: NodeId) -> Result<CodeBuilder, PipelineFault> {
        match self.module.kind(id) {
            IrKind::Class { name } => {
                let mut fields = Vec::new();
                for &field in self.module.children(id) {
                    let descriptor = self.descriptor(field)?;
                    fields.push(format!("field {}: {}", descriptor.name, self.ty(&descriptor.ty)));
                }
                Ok(out.block(&format!("class {}", name), |b| {
                    b.each(&fields, |b, field| b.line(field))
                }))
            }
            IrKind::Function { name } => self.function(out, id, name),
            other => Err(self.fault(format!("unexpected {} in file", other.name()))),
        }
    }

    fn function(&self, out: CodeBuilder, id: NodeId, name: &str) -> Result<CodeBuilder, PipelineFault> {
        let Some((&body, params)) = self.module.children(id).split_last() else {
            return Err(self.fault(format!("function {} has no body", name)));
        };

        let mut signature = Vec::with_capacity(params.len());
        for &param in params {
            let descriptor = self.descriptor(param)?;
            signature.push(format!("{}: {}", descriptor.name, self.ty(&descriptor.ty)));
        }
        let ret = self.module.node(id).ty();
        let header = match ret {
            Ty::Unit => format!("fn {}({})", name, signature.join(", ")),
            ty => format!("fn {}({}) -> {}", name, signature.join(", "), self.ty(ty)),
        };

        let mut out = self.stmt(out.line(&header).indent(), body)?;
        let returns = self
            .module
            .children(body)
            .last()
            .is_some_and(|s| matches!(self.module.kind(*s), IrKind::Return));
        if !returns {
            out = out.line("ret");
        }
        Ok(out.dedent())
    }

    fn stmt(&self, mut out: CodeBuilder, id: NodeId) -> Result<CodeBuilder, PipelineFault> {
        let children = self.module.children(id);
        match self.module.kind(id) {
            IrKind::Block => {
                for &child in children {
                    out = self.stmt(out, child)?;
                }
                Ok(out)
            }
            IrKind::Let { .. } => {
                let name = self.descriptor(id)?.name.clone();
                let out = self.values(out, children)?;
                Ok(out.line(&format!("store {}", name)))
            }
            IrKind::Return => Ok(self.values(out, children)?.line("ret")),
            IrKind::Eval => {
                let discard = *self.module.node(id).ty() != Ty::Unit;
                Ok(self.values(out, children)?.when(discard, |b| b.line("pop")))
            }
            other => Err(self.fault(format!("expected a statement, found {}", other.name()))),
        }
    }

    fn values(&self, mut out: CodeBuilder, ids: &[NodeId]) -> Result<CodeBuilder, PipelineFault> {
        for &id in ids {
            out = self.expr(out, id)?;
        }
        Ok(out)
    }

    fn expr(&self, out: CodeBuilder, id: NodeId) -> Result<CodeBuilder, PipelineFault> {
        let children = self.module.children(id);
        let line = match self.module.kind(id) {
            IrKind::Constant { value } => format!("push {}", value),
            IrKind::Local => format!("load {}", self.descriptor(id)?.name),
            IrKind::Call => format!("call {}/{}", self.descriptor(id)?.name, children.len()),
            IrKind::FieldGet => {
                let field = self.descriptor(id)?;
                let class = field
                    .container
                    .and_then(|c| self.descriptors.get(c))
                    .map(|c| c.name.as_str())
                    .unwrap_or("?");
                format!("getfield {}.{}", class, field.name)
            }
            IrKind::Binary { op } => op_mnemonic(*op).to_string(),
            other => {
                return Err(self.fault(format!("expected an expression, found {}", other.name())));
            }
        };
        Ok(self.values(out, children)?.line(&line))
    }
}

fn op_mnemonic(op: BinOp) -> &'static str {
    match op {
        BinOp::Add => "add",
        BinOp::Sub => "sub",
        BinOp::Mul => "mul",
        BinOp::Div => "div",
        BinOp::Eq => "eq",
        BinOp::Lt => "lt",
    }
}
