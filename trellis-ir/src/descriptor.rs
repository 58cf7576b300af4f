//! Resolved declaration metadata.
//!
//! Descriptors are produced by analysis (or synthesized by resolver
//! extensions) and referenced, never owned, by IR nodes.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Index of a descriptor in a [`DescriptorTable`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct DescriptorId(u32);

impl DescriptorId {
    #[inline]
    pub const fn new(index: u32) -> Self {
        DescriptorId(index)
    }

    #[inline]
    pub const fn index(self) -> usize {
        self.0 as usize
    }
}

impl fmt::Display for DescriptorId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "d{}", self.0)
    }
}

/// Resolved types.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Ty {
    Int,
    Bool,
    Str,
    Unit,
    /// Instance of a class declaration.
    Class(DescriptorId),
    /// A function type parameter, compatible with anything.
    Param(String),
    /// Type of an expression that failed to resolve.
    Error,
}

impl Ty {
    /// Resolve a builtin type name.
    pub fn builtin(name: &str) -> Option<Ty> {
        match name {
            "int" => Some(Ty::Int),
            "bool" => Some(Ty::Bool),
            "str" => Some(Ty::Str),
            "unit" => Some(Ty::Unit),
            _ => None,
        }
    }

    /// Whether a value of type `other` may be used where `self` is expected.
    ///
    /// Error and type-parameter types are compatible with everything so that
    /// one mistake is reported once.
    pub fn accepts(&self, other: &Ty) -> bool {
        match (self, other) {
            (Ty::Error, _) | (_, Ty::Error) | (Ty::Param(_), _) | (_, Ty::Param(_)) => true,
            (a, b) => a == b,
        }
    }
}

/// What kind of declaration a descriptor stands for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DescriptorKind {
    Function,
    Class,
    Field,
    Param,
    Local,
}

impl DescriptorKind {
    pub fn as_str(self) -> &'static str {
        match self {
            DescriptorKind::Function => "function",
            DescriptorKind::Class => "class",
            DescriptorKind::Field => "field",
            DescriptorKind::Param => "param",
            DescriptorKind::Local => "local",
        }
    }
}

/// Where a descriptor came from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "origin", rename_all = "snake_case")]
pub enum Origin {
    /// Declared in source; `node` is the raw syntax id.
    Source { node: u32 },
    /// Contributed by a resolver extension.
    Synthetic {
        extension: String,
        /// The declaration the synthetic member was derived from, if any.
        subject: Option<DescriptorId>,
    },
    /// Provided by the host itself.
    Builtin,
}

/// A named, typed parameter of a function descriptor.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParamInfo {
    pub name: String,
    pub ty: Ty,
}

/// Declaration-shaped metadata.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Descriptor {
    pub name: String,
    pub kind: DescriptorKind,
    pub params: Vec<ParamInfo>,
    pub type_params: Vec<String>,
    /// Return type for functions, declared type otherwise.
    pub ty: Ty,
    /// Containing declaration (class for fields, function for params and locals).
    pub container: Option<DescriptorId>,
    pub origin: Origin,
}

impl Descriptor {
    pub fn new(name: impl Into<String>, kind: DescriptorKind, origin: Origin) -> Self {
        Self {
            name: name.into(),
            kind,
            params: Vec::new(),
            type_params: Vec::new(),
            ty: Ty::Unit,
            container: None,
            origin,
        }
    }

    pub fn with_params(mut self, params: Vec<ParamInfo>) -> Self {
        self.params = params;
        self
    }

    pub fn with_ty(mut self, ty: Ty) -> Self {
        self.ty = ty;
        self
    }

    pub fn with_container(mut self, container: DescriptorId) -> Self {
        self.container = Some(container);
        self
    }

    pub fn is_synthetic(&self) -> bool {
        matches!(self.origin, Origin::Synthetic { .. })
    }

    /// Returns true for descriptors that can be called.
    pub fn is_callable(&self) -> bool {
        matches!(self.kind, DescriptorKind::Function | DescriptorKind::Class)
    }
}

/// Owning table of descriptors, indexed by [`DescriptorId`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DescriptorTable {
    descriptors: Vec<Descriptor>,
}

impl DescriptorTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a descriptor and return its id.
    pub fn insert(&mut self, descriptor: Descriptor) -> DescriptorId {
        let id = DescriptorId::new(self.descriptors.len() as u32);
        self.descriptors.push(descriptor);
        id
    }

    pub fn get(&self, id: DescriptorId) -> Option<&Descriptor> {
        self.descriptors.get(id.index())
    }

    /// Mutable access, used while analysis fills in signatures.
    pub fn get_mut(&mut self, id: DescriptorId) -> Option<&mut Descriptor> {
        self.descriptors.get_mut(id.index())
    }

    pub fn contains(&self, id: DescriptorId) -> bool {
        id.index() < self.descriptors.len()
    }

    pub fn len(&self) -> usize {
        self.descriptors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.descriptors.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (DescriptorId, &Descriptor)> {
        self.descriptors
            .iter()
            .enumerate()
            .map(|(i, d)| (DescriptorId::new(i as u32), d))
    }

    /// Render a type using declared class names.
    pub fn display_ty(&self, ty: &Ty) -> String {
        match ty {
            Ty::Int => "int".into(),
            Ty::Bool => "bool".into(),
            Ty::Str => "str".into(),
            Ty::Unit => "unit".into(),
            Ty::Class(id) => self
                .get(*id)
                .map(|d| d.name.clone())
                .unwrap_or_else(|| id.to_string()),
            Ty::Param(name) => name.clone(),
            Ty::Error => "{error}".into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_table_assigns_sequential_ids() {
        let mut table = DescriptorTable::new();
        let a = table.insert(Descriptor::new(
            "f",
            DescriptorKind::Function,
            Origin::Source { node: 0 },
        ));
        let b = table.insert(Descriptor::new(
            "Point",
            DescriptorKind::Class,
            Origin::Source { node: 4 },
        ));

        assert_eq!(a, DescriptorId::new(0));
        assert_eq!(b, DescriptorId::new(1));
        assert_eq!(table.get(b).map(|d| d.name.as_str()), Some("Point"));
        assert!(!table.contains(DescriptorId::new(2)));
    }

    #[test]
    fn test_ty_accepts() {
        assert!(Ty::Int.accepts(&Ty::Int));
        assert!(!Ty::Int.accepts(&Ty::Bool));
        assert!(Ty::Int.accepts(&Ty::Error));
        assert!(Ty::Param("T".into()).accepts(&Ty::Str));
    }

    #[test]
    fn test_display_ty_uses_class_name() {
        let mut table = DescriptorTable::new();
        let point = table.insert(Descriptor::new(
            "Point",
            DescriptorKind::Class,
            Origin::Source { node: 0 },
        ));

        assert_eq!(table.display_ty(&Ty::Class(point)), "Point");
        assert_eq!(table.display_ty(&Ty::Int), "int");
    }
}
