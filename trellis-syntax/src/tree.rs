//! The immutable syntax tree handed to analysis.

use std::fmt;

use serde::Serialize;
pub use trellis_core::BinOp;
use trellis_core::Location;

/// Identity of a syntax node within one tree.
///
/// Ids are assigned in pre-order, so comparing two ids compares their
/// position in the source document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct SyntaxId(u32);

impl SyntaxId {
    #[inline]
    pub const fn new(index: u32) -> Self {
        SyntaxId(index)
    }

    #[inline]
    pub const fn index(self) -> usize {
        self.0 as usize
    }

    #[inline]
    pub const fn raw(self) -> u32 {
        self.0
    }
}

impl fmt::Display for SyntaxId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Coarse classification of syntax nodes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeCategory {
    Declaration,
    Statement,
    Expression,
    TypeReference,
}

/// Node payloads. Children are referenced by id and owned by the tree.
#[derive(Debug, Clone, PartialEq)]
pub enum SyntaxKind {
    Function {
        name: String,
        type_params: Vec<String>,
        params: Vec<SyntaxId>,
        returns: Option<SyntaxId>,
        body: Vec<SyntaxId>,
    },
    Class {
        name: String,
        fields: Vec<SyntaxId>,
    },
    Field {
        name: String,
        ty: SyntaxId,
    },
    Param {
        name: String,
        ty: SyntaxId,
    },
    Let {
        name: String,
        ty: Option<SyntaxId>,
        value: SyntaxId,
    },
    Return {
        value: Option<SyntaxId>,
    },
    ExprStmt {
        expr: SyntaxId,
    },
    Int(i64),
    Bool(bool),
    Str(String),
    Ref {
        name: String,
    },
    Call {
        callee: String,
        args: Vec<SyntaxId>,
    },
    Binary {
        op: BinOp,
        lhs: SyntaxId,
        rhs: SyntaxId,
    },
    TypeRef {
        name: String,
    },
}

impl SyntaxKind {
    pub fn category(&self) -> NodeCategory {
        match self {
            SyntaxKind::Function { .. }
            | SyntaxKind::Class { .. }
            | SyntaxKind::Field { .. }
            | SyntaxKind::Param { .. }
            | SyntaxKind::Let { .. } => NodeCategory::Declaration,
            SyntaxKind::Return { .. } | SyntaxKind::ExprStmt { .. } => NodeCategory::Statement,
            SyntaxKind::TypeRef { .. } => NodeCategory::TypeReference,
            _ => NodeCategory::Expression,
        }
    }

    /// Returns true if this node names something that must be resolved.
    pub fn is_reference(&self) -> bool {
        matches!(
            self,
            SyntaxKind::Ref { .. } | SyntaxKind::Call { .. } | SyntaxKind::TypeRef { .. }
        )
    }

    /// The declared name, for declaration nodes.
    pub fn declared_name(&self) -> Option<&str> {
        match self {
            SyntaxKind::Function { name, .. }
            | SyntaxKind::Class { name, .. }
            | SyntaxKind::Field { name, .. }
            | SyntaxKind::Param { name, .. }
            | SyntaxKind::Let { name, .. } => Some(name),
            _ => None,
        }
    }

    /// The referenced name, for reference nodes.
    pub fn referenced_name(&self) -> Option<&str> {
        match self {
            SyntaxKind::Ref { name } | SyntaxKind::TypeRef { name } => Some(name),
            SyntaxKind::Call { callee, .. } => Some(callee),
            _ => None,
        }
    }

    /// Direct children in source order.
    pub fn children(&self) -> Vec<SyntaxId> {
        match self {
            SyntaxKind::Function {
                params,
                returns,
                body,
                ..
            } => params
                .iter()
                .copied()
                .chain(returns.iter().copied())
                .chain(body.iter().copied())
                .collect(),
            SyntaxKind::Class { fields, .. } => fields.clone(),
            SyntaxKind::Field { ty, .. } | SyntaxKind::Param { ty, .. } => vec![*ty],
            SyntaxKind::Let { ty, value, .. } => ty.iter().copied().chain([*value]).collect(),
            SyntaxKind::Return { value } => value.iter().copied().collect(),
            SyntaxKind::ExprStmt { expr } => vec![*expr],
            SyntaxKind::Call { args, .. } => args.clone(),
            SyntaxKind::Binary { lhs, rhs, .. } => vec![*lhs, *rhs],
            SyntaxKind::Int(_)
            | SyntaxKind::Bool(_)
            | SyntaxKind::Str(_)
            | SyntaxKind::Ref { .. }
            | SyntaxKind::TypeRef { .. } => Vec::new(),
        }
    }
}

/// A syntax node and the path that locates it in the unit file.
#[derive(Debug, Clone, PartialEq)]
pub struct SyntaxNode {
    pub kind: SyntaxKind,
    pub path: String,
}

/// Immutable tree for one compilation unit.
///
/// There is no mutable accessor: once assembled, the tree is read-only for
/// the rest of the run.
#[derive(Debug, Clone, PartialEq)]
pub struct SyntaxTree {
    unit: String,
    nodes: Vec<SyntaxNode>,
    items: Vec<SyntaxId>,
}

impl SyntaxTree {
    pub(crate) fn new(unit: String, nodes: Vec<SyntaxNode>, items: Vec<SyntaxId>) -> Self {
        Self { unit, nodes, items }
    }

    /// Name of the compilation unit.
    pub fn unit(&self) -> &str {
        &self.unit
    }

    /// Top-level declarations in declaration order.
    pub fn items(&self) -> &[SyntaxId] {
        &self.items
    }

    pub fn node(&self, id: SyntaxId) -> &SyntaxNode {
        &self.nodes[id.index()]
    }

    pub fn kind(&self, id: SyntaxId) -> &SyntaxKind {
        &self.nodes[id.index()].kind
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// All nodes in document order.
    pub fn iter(&self) -> impl Iterator<Item = (SyntaxId, &SyntaxNode)> {
        self.nodes
            .iter()
            .enumerate()
            .map(|(i, node)| (SyntaxId::new(i as u32), node))
    }

    /// Diagnostic location of a node.
    pub fn location(&self, id: SyntaxId) -> Location {
        Location::new(&self.unit, id.raw(), &self.node(id).path)
    }
}
