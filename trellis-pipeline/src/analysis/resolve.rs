//! Declaration collection, reference resolution and direct typing.

use std::collections::{HashMap, HashSet};

use tracing::{debug, trace, warn};
use trellis_ir::{
    Descriptor, DescriptorId, DescriptorKind, DescriptorTable, Origin, ParamInfo, Ty,
};
use trellis_syntax::{BinOp, SyntaxId, SyntaxKind, SyntaxTree};

use super::{
    bindings::{Binding, BindingFlags, BindingStore},
    scope::Scope,
};
use crate::{
    Diagnostic, PipelineFault,
    registry::{ExtensionRegistry, ReferenceKind, ResolveRequest},
};

/// Duplicate declaration.
pub const E_DUPLICATE: &str = "E0001";
/// Reference that resolves to nothing.
pub const E_UNRESOLVED: &str = "E0002";
/// Call with the wrong number of arguments.
pub const E_ARITY: &str = "E0003";
/// Type mismatch.
pub const E_TYPE: &str = "E0004";

/// Resolution state for one unit.
pub(crate) struct Resolver<'a> {
    tree: &'a SyntaxTree,
    registry: &'a ExtensionRegistry,
    descriptors: DescriptorTable,
    store: BindingStore,
    diagnostics: Vec<Diagnostic>,
    /// Top-level source declarations. The first declaration of a name wins.
    globals: HashMap<String, DescriptorId>,
    /// Descriptors offered by resolver extensions, per name and reference kind.
    synthetic: HashMap<(String, ReferenceKind), DescriptorId>,
    /// Lookups the resolver extensions were already asked about.
    consulted: HashSet<(String, ReferenceKind)>,
    /// Set when a resolver extension panicked; no extension is consulted after it.
    fault: Option<PipelineFault>,
    /// Top-level items and the descriptors they declare, in declaration order.
    items: Vec<(SyntaxId, DescriptorId)>,
    /// Parameter descriptors per function item.
    params: HashMap<SyntaxId, Vec<DescriptorId>>,
}

impl<'a> Resolver<'a> {
    pub(crate) fn new(tree: &'a SyntaxTree, registry: &'a ExtensionRegistry) -> Self {
        Self {
            tree,
            registry,
            descriptors: DescriptorTable::new(),
            store: BindingStore::new(tree),
            diagnostics: Vec::new(),
            globals: HashMap::new(),
            synthetic: HashMap::new(),
            consulted: HashSet::new(),
            fault: None,
            items: Vec::new(),
            params: HashMap::new(),
        }
    }

    pub(crate) fn finish(
        self,
    ) -> Result<(BindingStore, DescriptorTable, Vec<Diagnostic>), PipelineFault> {
        match self.fault {
            Some(fault) => Err(fault),
            None => Ok((self.store, self.descriptors, self.diagnostics)),
        }
    }

    fn error(&mut self, code: &str, node: SyntaxId, message: impl Into<String>) {
        self.diagnostics
            .push(Diagnostic::error(code, message, self.tree.location(node)));
    }

    fn ty_name(&self, ty: &Ty) -> String {
        self.descriptors.display_ty(ty)
    }

    /// Give every top-level function and class a descriptor, then resolve
    /// their signatures and class fields.
    pub(crate) fn collect_declarations(&mut self) {
        let tree = self.tree;

        for &item in tree.items() {
            let (name, kind) = match tree.kind(item) {
                SyntaxKind::Function { name, .. } => (name, DescriptorKind::Function),
                SyntaxKind::Class { name, .. } => (name, DescriptorKind::Class),
                _ => continue,
            };
            let id = self.descriptors.insert(Descriptor::new(
                name.as_str(),
                kind,
                Origin::Source { node: item.raw() },
            ));
            if self.globals.contains_key(name) {
                self.error(
                    E_DUPLICATE,
                    item,
                    format!("`{}` is declared more than once", name),
                );
            } else {
                self.globals.insert(name.clone(), id);
            }
            self.items.push((item, id));
        }

        for (item, id) in self.items.clone() {
            match tree.kind(item) {
                SyntaxKind::Class { name, fields } => self.collect_class(item, id, name, fields),
                SyntaxKind::Function {
                    type_params,
                    params,
                    returns,
                    ..
                } => self.collect_signature(item, id, type_params, params, *returns),
                _ => {}
            }
        }

        debug!(
            unit = tree.unit(),
            declarations = self.items.len(),
            "collected declarations"
        );
    }

    fn collect_class(&mut self, item: SyntaxId, id: DescriptorId, name: &str, fields: &[SyntaxId]) {
        let mut seen = HashSet::new();
        let mut members = Vec::with_capacity(fields.len());

        for &field in fields {
            let SyntaxKind::Field { name: field_name, ty } = self.tree.kind(field) else {
                continue;
            };
            if !seen.insert(field_name.as_str()) {
                self.error(
                    E_DUPLICATE,
                    field,
                    format!("field `{}` is declared more than once in `{}`", field_name, name),
                );
            }
            let field_ty = self.resolve_type(*ty, &[]);
            let field_id = self.descriptors.insert(
                Descriptor::new(
                    field_name.as_str(),
                    DescriptorKind::Field,
                    Origin::Source { node: field.raw() },
                )
                .with_ty(field_ty.clone())
                .with_container(id),
            );
            self.store
                .insert(field, Binding::declaration(field_ty.clone(), field_id));
            members.push(ParamInfo {
                name: field_name.clone(),
                ty: field_ty,
            });
        }

        // Calling a class constructs it from its fields.
        if let Some(class) = self.descriptors.get_mut(id) {
            class.params = members;
            class.ty = Ty::Class(id);
        }
        self.store
            .insert(item, Binding::declaration(Ty::Class(id), id));
    }

    fn collect_signature(
        &mut self,
        item: SyntaxId,
        id: DescriptorId,
        type_params: &[String],
        params: &[SyntaxId],
        returns: Option<SyntaxId>,
    ) {
        let mut seen = HashSet::new();
        let mut infos = Vec::with_capacity(params.len());
        let mut ids = Vec::with_capacity(params.len());

        for &param in params {
            let SyntaxKind::Param { name, ty } = self.tree.kind(param) else {
                continue;
            };
            if !seen.insert(name.as_str()) {
                self.error(
                    E_DUPLICATE,
                    param,
                    format!("parameter `{}` is declared more than once", name),
                );
            }
            let param_ty = self.resolve_type(*ty, type_params);
            let param_id = self.descriptors.insert(
                Descriptor::new(
                    name.as_str(),
                    DescriptorKind::Param,
                    Origin::Source { node: param.raw() },
                )
                .with_ty(param_ty.clone())
                .with_container(id),
            );
            self.store
                .insert(param, Binding::declaration(param_ty.clone(), param_id));
            infos.push(ParamInfo {
                name: name.clone(),
                ty: param_ty,
            });
            ids.push(param_id);
        }

        let ret = returns
            .map(|ty| self.resolve_type(ty, type_params))
            .unwrap_or(Ty::Unit);

        if let Some(function) = self.descriptors.get_mut(id) {
            function.params = infos;
            function.type_params = type_params.to_vec();
            function.ty = ret.clone();
        }
        self.store.insert(item, Binding::declaration(ret, id));
        self.params.insert(item, ids);
    }

    /// Resolve and type every function body, in declaration order.
    pub(crate) fn resolve_bodies(&mut self) {
        let tree = self.tree;

        for (item, id) in self.items.clone() {
            let SyntaxKind::Function {
                type_params,
                params,
                body,
                ..
            } = tree.kind(item)
            else {
                continue;
            };

            let mut scope = Scope::for_function(type_params);
            let param_ids = self.params.get(&item).cloned().unwrap_or_default();
            for (&param, param_id) in params.iter().zip(param_ids) {
                if let SyntaxKind::Param { name, .. } = tree.kind(param) {
                    scope.bind(name, param_id);
                }
            }

            let ret = self
                .descriptors
                .get(id)
                .map(|d| d.ty.clone())
                .unwrap_or(Ty::Unit);

            for &stmt in body {
                self.statement(stmt, id, &ret, &mut scope);
            }
            trace!(function = %id, "resolved body");
        }
    }

    fn statement(&mut self, stmt: SyntaxId, function: DescriptorId, ret: &Ty, scope: &mut Scope) {
        match self.tree.kind(stmt) {
            SyntaxKind::Let { name, ty, value } => {
                let value_ty = self.expr(*value, scope);
                let annotated = ty.map(|ty| self.resolve_type(ty, &type_params(scope)));
                let mut flags = BindingFlags::empty();

                if let Some(expected) = &annotated
                    && !expected.accepts(&value_ty)
                {
                    let message = format!(
                        "expected `{}`, found `{}`",
                        self.ty_name(expected),
                        self.ty_name(&value_ty)
                    );
                    self.error(E_TYPE, *value, message);
                    flags |= BindingFlags::TYPE_MISMATCH;
                }

                let local_ty = annotated.unwrap_or(value_ty);
                let local = self.descriptors.insert(
                    Descriptor::new(
                        name.as_str(),
                        DescriptorKind::Local,
                        Origin::Source { node: stmt.raw() },
                    )
                    .with_ty(local_ty.clone())
                    .with_container(function),
                );
                self.store
                    .insert(stmt, Binding::declaration(local_ty, local).with_flags(flags));
                scope.bind(name, local);
            }
            SyntaxKind::Return { value } => {
                let (value_ty, at) = match value {
                    Some(value) => (self.expr(*value, scope), *value),
                    None => (Ty::Unit, stmt),
                };
                if !ret.accepts(&value_ty) {
                    let message = format!(
                        "expected `{}` to be returned, found `{}`",
                        self.ty_name(ret),
                        self.ty_name(&value_ty)
                    );
                    self.error(E_TYPE, at, message);
                    self.store.flag(at, BindingFlags::TYPE_MISMATCH);
                }
            }
            SyntaxKind::ExprStmt { expr } => {
                self.expr(*expr, scope);
            }
            _ => {}
        }
    }

    /// Type an expression bottom-up and record its binding.
    fn expr(&mut self, id: SyntaxId, scope: &Scope) -> Ty {
        let binding = match self.tree.kind(id) {
            SyntaxKind::Int(_) => Binding::typed(Ty::Int),
            SyntaxKind::Bool(_) => Binding::typed(Ty::Bool),
            SyntaxKind::Str(_) => Binding::typed(Ty::Str),
            SyntaxKind::Ref { name } => self.value_ref(id, name, scope),
            SyntaxKind::Call { callee, args } => self.call(id, callee, args, scope),
            SyntaxKind::Binary { op, lhs, rhs } => self.binary(id, *op, *lhs, *rhs, scope),
            _ => Binding::typed(Ty::Error),
        };
        let ty = binding.ty.clone();
        self.store.insert(id, binding);
        ty
    }

    fn value_ref(&mut self, id: SyntaxId, name: &str, scope: &Scope) -> Binding {
        // Resolvers are consulted even for names a local shadows, so every
        // unit sees the same synthesized descriptors whatever its scopes.
        let global = self.lookup_global(name, ReferenceKind::Value);

        let Some(target) = scope.lookup(name).or(global) else {
            self.error(
                E_UNRESOLVED,
                id,
                format!("cannot find value `{}` in this scope", name),
            );
            return Binding::unresolved();
        };

        let Some(descriptor) = self.descriptors.get(target) else {
            return Binding::unresolved();
        };
        let synthetic = synthetic_flag(descriptor);
        if descriptor.is_callable() {
            let kind = descriptor.kind.as_str();
            self.error(
                E_TYPE,
                id,
                format!("`{}` is a {}, not a value", name, kind),
            );
            return Binding::reference(Ty::Error, target)
                .with_flags(BindingFlags::TYPE_MISMATCH | synthetic);
        }
        Binding::reference(descriptor.ty.clone(), target).with_flags(synthetic)
    }

    fn call(&mut self, id: SyntaxId, callee: &str, args: &[SyntaxId], scope: &Scope) -> Binding {
        let arg_tys: Vec<Ty> = args.iter().map(|arg| self.expr(*arg, scope)).collect();

        let Some(target) = self.lookup_global(callee, ReferenceKind::Call) else {
            self.error(
                E_UNRESOLVED,
                id,
                format!("cannot find function `{}` in this scope", callee),
            );
            return Binding::unresolved();
        };
        let Some(descriptor) = self.descriptors.get(target).cloned() else {
            return Binding::unresolved();
        };
        let synthetic = synthetic_flag(&descriptor);

        if !descriptor.is_callable() {
            self.error(
                E_TYPE,
                id,
                format!("`{}` is a {}, not a function", callee, descriptor.kind.as_str()),
            );
            return Binding::reference(Ty::Error, target)
                .with_flags(BindingFlags::TYPE_MISMATCH | synthetic);
        }

        if args.len() != descriptor.params.len() {
            self.error(
                E_ARITY,
                id,
                format!(
                    "`{}` takes {} argument{} but {} {} supplied",
                    callee,
                    descriptor.params.len(),
                    if descriptor.params.len() == 1 { "" } else { "s" },
                    args.len(),
                    if args.len() == 1 { "was" } else { "were" },
                ),
            );
            return Binding::reference(descriptor.ty.clone(), target).with_flags(synthetic);
        }

        let mut substitutions: HashMap<String, Ty> = HashMap::new();
        for ((arg, arg_ty), param) in args.iter().zip(&arg_tys).zip(&descriptor.params) {
            let expected = match &param.ty {
                Ty::Param(tp) => match substitutions.get(tp) {
                    Some(bound) => bound.clone(),
                    None => {
                        substitutions.insert(tp.clone(), arg_ty.clone());
                        continue;
                    }
                },
                ty => ty.clone(),
            };
            if !expected.accepts(arg_ty) {
                let message = format!(
                    "expected `{}` for parameter `{}` of `{}`, found `{}`",
                    self.ty_name(&expected),
                    param.name,
                    callee,
                    self.ty_name(arg_ty)
                );
                self.error(E_TYPE, *arg, message);
                self.store.flag(*arg, BindingFlags::TYPE_MISMATCH);
            }
        }

        let ty = match &descriptor.ty {
            Ty::Param(tp) => substitutions
                .get(tp)
                .cloned()
                .unwrap_or_else(|| descriptor.ty.clone()),
            ty => ty.clone(),
        };
        Binding::reference(ty, target).with_flags(synthetic)
    }

    fn binary(
        &mut self,
        id: SyntaxId,
        op: BinOp,
        lhs: SyntaxId,
        rhs: SyntaxId,
        scope: &Scope,
    ) -> Binding {
        let lhs_ty = self.expr(lhs, scope);
        let rhs_ty = self.expr(rhs, scope);

        let (ok, result) = match op {
            BinOp::Eq => (lhs_ty.accepts(&rhs_ty), Ty::Bool),
            BinOp::Lt => (Ty::Int.accepts(&lhs_ty) && Ty::Int.accepts(&rhs_ty), Ty::Bool),
            BinOp::Add | BinOp::Sub | BinOp::Mul | BinOp::Div => {
                (Ty::Int.accepts(&lhs_ty) && Ty::Int.accepts(&rhs_ty), Ty::Int)
            }
        };

        if ok {
            return Binding::typed(result);
        }

        let message = if op == BinOp::Eq {
            format!(
                "cannot compare `{}` with `{}`",
                self.ty_name(&lhs_ty),
                self.ty_name(&rhs_ty)
            )
        } else {
            format!(
                "operator `{}` expects `int` operands, found `{}` and `{}`",
                op.symbol(),
                self.ty_name(&lhs_ty),
                self.ty_name(&rhs_ty)
            )
        };
        self.error(E_TYPE, id, message);
        Binding::typed(result).with_flags(BindingFlags::TYPE_MISMATCH)
    }

    /// Resolve a type reference and record its binding.
    fn resolve_type(&mut self, id: SyntaxId, type_params: &[String]) -> Ty {
        let SyntaxKind::TypeRef { name } = self.tree.kind(id) else {
            return Ty::Error;
        };

        if let Some(ty) = Ty::builtin(name) {
            self.store.insert(id, Binding::typed(ty.clone()));
            return ty;
        }
        if type_params.iter().any(|tp| tp == name) {
            let ty = Ty::Param(name.clone());
            self.store.insert(id, Binding::typed(ty.clone()));
            return ty;
        }

        let target = self.lookup_global(name, ReferenceKind::Type);
        let class = target.and_then(|t| {
            self.descriptors
                .get(t)
                .filter(|d| d.kind == DescriptorKind::Class)
                .map(|d| (t, synthetic_flag(d)))
        });

        match class {
            Some((target, synthetic)) => {
                let ty = Ty::Class(target);
                self.store
                    .insert(id, Binding::reference(ty.clone(), target).with_flags(synthetic));
                ty
            }
            None => {
                self.error(E_UNRESOLVED, id, format!("cannot find type `{}`", name));
                self.store.insert(id, Binding::unresolved());
                Ty::Error
            }
        }
    }

    /// Global-scope lookup. Resolver extensions get the first look at every
    /// name; a source declaration of the same name still takes precedence.
    fn lookup_global(&mut self, name: &str, kind: ReferenceKind) -> Option<DescriptorId> {
        self.consult_resolvers(name, kind);
        self.globals
            .get(name)
            .or_else(|| self.synthetic.get(&(name.to_string(), kind)))
            .copied()
    }

    fn consult_resolvers(&mut self, name: &str, kind: ReferenceKind) {
        if self.fault.is_some() || !self.consulted.insert((name.to_string(), kind)) {
            return;
        }

        let registry = self.registry;
        for (record, resolver) in registry.resolvers() {
            let request = ResolveRequest {
                name,
                kind,
                descriptors: &self.descriptors,
            };
            let offer = match record.invoke(|| resolver.resolve(&request)) {
                Ok(Some(offer)) => offer,
                Ok(None) => continue,
                Err(fault) => {
                    self.fault = Some(fault);
                    return;
                }
            };

            if offer.name != name {
                warn!(
                    extension = %record.id,
                    requested = name,
                    offered = %offer.name,
                    "resolver offered a descriptor for a different name, ignoring it"
                );
                continue;
            }
            if self.globals.contains_key(name) {
                debug!(
                    extension = %record.id,
                    name,
                    "synthetic descriptor shadowed by source declaration"
                );
                return;
            }

            let id = self.descriptors.insert(offer);
            trace!(extension = %record.id, name, descriptor = %id, "synthesized descriptor");
            self.synthetic.insert((name.to_string(), kind), id);
            return;
        }
    }
}

fn synthetic_flag(descriptor: &Descriptor) -> BindingFlags {
    if descriptor.is_synthetic() {
        BindingFlags::SYNTHETIC
    } else {
        BindingFlags::empty()
    }
}

fn type_params(scope: &Scope) -> Vec<String> {
    scope.type_params().to_vec()
}
