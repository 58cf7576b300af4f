//! Declarations the host provides to every unit.

use trellis_ir::{Descriptor, DescriptorKind, Origin, ParamInfo, Ty};

use crate::registry::{DescriptorResolver, ReferenceKind, ResolveRequest};

/// Built-in functions, offered through the same resolver channel plugins use.
pub struct BuiltinsResolver;

impl BuiltinsResolver {
    /// Names and signatures of the built-in functions.
    pub const FUNCTIONS: &'static [(&'static str, &'static str, Ty)] = &[
        ("print", "message", Ty::Str),
        ("assert", "condition", Ty::Bool),
    ];
}

impl DescriptorResolver for BuiltinsResolver {
    fn name(&self) -> &'static str {
        "builtins"
    }

    fn resolve(&self, request: &ResolveRequest<'_>) -> Option<Descriptor> {
        if request.kind != ReferenceKind::Call {
            return None;
        }
        let (name, param, ty) = Self::FUNCTIONS
            .iter()
            .find(|(name, _, _)| *name == request.name)?;

        Some(
            Descriptor::new(*name, DescriptorKind::Function, Origin::Builtin)
                .with_params(vec![ParamInfo {
                    name: param.to_string(),
                    ty: ty.clone(),
                }])
                .with_ty(Ty::Unit),
        )
    }
}

#[cfg(test)]
mod tests {
    use trellis_ir::DescriptorTable;

    use super::*;

    #[test]
    fn test_builtins_only_answer_calls() {
        let table = DescriptorTable::new();
        let call = ResolveRequest {
            name: "print",
            kind: ReferenceKind::Call,
            descriptors: &table,
        };
        let value = ResolveRequest {
            name: "print",
            kind: ReferenceKind::Value,
            descriptors: &table,
        };

        let print = BuiltinsResolver.resolve(&call).expect("print is built in");
        assert_eq!(print.params[0].ty, Ty::Str);
        assert_eq!(print.origin, Origin::Builtin);
        assert!(BuiltinsResolver.resolve(&value).is_none());
    }
}
