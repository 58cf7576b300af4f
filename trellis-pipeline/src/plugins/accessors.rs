//! Synthesized field accessors.
//!
//! `get_x(p)` resolves to a synthetic function reading field `x` of `p`'s
//! class, and a lowering pass replaces each such call with a direct field
//! read.

use tracing::trace;
use trellis_ir::{
    Descriptor, DescriptorKind, IrKind, IrModule, Origin, ParamInfo, Ty,
};
use trellis_manifest::{Placement, PluginOptions};

use super::{Contribution, OptionSpec, PluginModule};
use crate::{
    ConfigError, Extension,
    lowering::{PassAbort, PassContext},
    registry::{DescriptorResolver, LoweringPass, ReferenceKind, ResolveRequest},
};

const PLUGIN: &str = "accessors";
/// Identity recorded in the origin of every synthesized accessor.
const EXTENSION: &str = "accessors/accessors";
const DEFAULT_PREFIX: &str = "get_";

pub struct AccessorsPlugin;

impl PluginModule for AccessorsPlugin {
    fn id(&self) -> &'static str {
        PLUGIN
    }

    fn description(&self) -> &'static str {
        "Synthesize field accessor functions and lower them to field reads"
    }

    fn options(&self) -> &'static [OptionSpec] {
        &[OptionSpec {
            name: "prefix",
            description: "Prefix that marks a call as an accessor",
            default: Some(DEFAULT_PREFIX),
        }]
    }

    fn contributions(&self, options: &PluginOptions) -> Result<Vec<Contribution>, ConfigError> {
        let prefix = options.get("prefix").unwrap_or(DEFAULT_PREFIX);
        if prefix.is_empty() {
            return Err(ConfigError::invalid_option(
                PLUGIN,
                "prefix",
                prefix,
                "the prefix must not be empty",
            ));
        }

        Ok(vec![
            Contribution::new(Extension::resolver(AccessorResolver::new(prefix))),
            Contribution::new(Extension::lowering(LowerAccessors)),
        ])
    }
}

/// Offers `<prefix><field>(self: Class) -> field type` for calls.
#[derive(Debug, Clone)]
pub struct AccessorResolver {
    prefix: String,
}

impl AccessorResolver {
    pub fn new(prefix: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
        }
    }
}

impl DescriptorResolver for AccessorResolver {
    fn name(&self) -> &'static str {
        "accessors"
    }

    fn resolve(&self, request: &ResolveRequest<'_>) -> Option<Descriptor> {
        if request.kind != ReferenceKind::Call {
            return None;
        }
        let field_name = request.name.strip_prefix(self.prefix.as_str())?;

        let mut fields = request.descriptors.iter().filter(|(_, d)| {
            d.kind == DescriptorKind::Field && d.name == field_name && !d.is_synthetic()
        });
        let (field_id, field) = fields.next()?;
        if fields.next().is_some() {
            trace!(name = request.name, "field name is ambiguous, declining");
            return None;
        }
        let class = field.container?;

        Some(
            Descriptor::new(
                request.name,
                DescriptorKind::Function,
                Origin::Synthetic {
                    extension: EXTENSION.to_string(),
                    subject: Some(field_id),
                },
            )
            .with_params(vec![ParamInfo {
                name: "self".to_string(),
                ty: Ty::Class(class),
            }])
            .with_ty(field.ty.clone())
            .with_container(class),
        )
    }
}

/// Rewrites accessor calls into `FieldGet` nodes.
pub struct LowerAccessors;

impl LoweringPass for LowerAccessors {
    fn name(&self) -> &'static str {
        "lower-accessors"
    }

    fn description(&self) -> &'static str {
        "Replace synthesized accessor calls with field reads"
    }

    fn placement(&self) -> Placement {
        Placement::First
    }

    fn idempotent(&self) -> bool {
        true
    }

    fn run(&self, module: &mut IrModule, ctx: &PassContext<'_>) -> Result<(), PassAbort> {
        for (id, parent) in module.preorder_with_parents() {
            let Some(parent) = parent else {
                continue;
            };
            let node = module.node(id);
            if !matches!(node.kind(), IrKind::Call) {
                continue;
            }
            let Some(Origin::Synthetic {
                extension,
                subject: Some(field),
            }) = node
                .descriptor()
                .and_then(|d| ctx.descriptor(d))
                .map(|d| &d.origin)
            else {
                continue;
            };
            let &[receiver] = node.children() else {
                continue;
            };
            if extension != EXTENSION {
                continue;
            }

            let ty = node.ty().clone();
            let field = *field;
            let read = module.alloc(IrKind::FieldGet, Some(field), ty, vec![receiver]);
            module.replace_child(parent, id, read);
        }
        Ok(())
    }
}
