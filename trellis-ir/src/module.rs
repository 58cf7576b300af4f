//! Arena-owned IR module.
//!
//! All nodes of a compilation unit live in one `Vec` owned by [`IrModule`];
//! parents own their children through [`NodeId`] lists. Lowering passes get
//! `&mut IrModule` for the duration of one invocation and rewrite it in place.

use std::fmt;

use serde::{Deserialize, Serialize};
use trellis_core::BinOp;

use crate::{DescriptorId, Ty};

/// Index of a node in its module's arena.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct NodeId(u32);

impl NodeId {
    #[inline]
    pub const fn new(index: u32) -> Self {
        NodeId(index)
    }

    #[inline]
    pub const fn index(self) -> usize {
        self.0 as usize
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "n{}", self.0)
    }
}

/// Compile-time constant values.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "snake_case")]
pub enum Constant {
    Int(i64),
    Bool(bool),
    Str(String),
    Unit,
}

impl fmt::Display for Constant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Constant::Int(i) => write!(f, "{}", i),
            Constant::Bool(b) => write!(f, "{}", b),
            Constant::Str(s) => write!(f, "{:?}", s),
            Constant::Unit => write!(f, "()"),
        }
    }
}

/// IR node kinds.
///
/// Expected children per kind:
/// - `Module`: files; `File`: classes and functions; `Class`: fields
/// - `Function`: params followed by exactly one trailing `Block`
/// - `Block`: statements (`Let`, `Return`, `Eval`, nested `Block`)
/// - `Let`, `Eval`, `FieldGet`: one expression; `Return`: zero or one
/// - `Call`: arguments; `Binary`: two operands
/// - `Field`, `Param`, `Local`, `Constant`: none
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum IrKind {
    Module { name: String },
    File { name: String },
    Class { name: String },
    Field { name: String },
    Function { name: String },
    Param { name: String },
    Block,
    Let { name: String },
    Return,
    Eval,
    Call,
    FieldGet,
    Local,
    Constant { value: Constant },
    Binary { op: BinOp },
}

impl IrKind {
    pub fn name(&self) -> &'static str {
        match self {
            IrKind::Module { .. } => "module",
            IrKind::File { .. } => "file",
            IrKind::Class { .. } => "class",
            IrKind::Field { .. } => "field",
            IrKind::Function { .. } => "function",
            IrKind::Param { .. } => "param",
            IrKind::Block => "block",
            IrKind::Let { .. } => "let",
            IrKind::Return => "return",
            IrKind::Eval => "eval",
            IrKind::Call => "call",
            IrKind::FieldGet => "field_get",
            IrKind::Local => "local",
            IrKind::Constant { .. } => "constant",
            IrKind::Binary { .. } => "binary",
        }
    }

    /// Declaration kinds carry the descriptor they were built from.
    pub fn is_declaration(&self) -> bool {
        matches!(
            self,
            IrKind::Class { .. }
                | IrKind::Field { .. }
                | IrKind::Function { .. }
                | IrKind::Param { .. }
                | IrKind::Let { .. }
        )
    }

    /// Reference kinds carry the descriptor they point at.
    pub fn is_reference(&self) -> bool {
        matches!(self, IrKind::Call | IrKind::FieldGet | IrKind::Local)
    }

    pub fn is_statement(&self) -> bool {
        matches!(
            self,
            IrKind::Let { .. } | IrKind::Return | IrKind::Eval | IrKind::Block
        )
    }
}

/// One node in the arena.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IrNode {
    kind: IrKind,
    children: Vec<NodeId>,
    descriptor: Option<DescriptorId>,
    ty: Ty,
}

impl IrNode {
    pub fn kind(&self) -> &IrKind {
        &self.kind
    }

    pub fn children(&self) -> &[NodeId] {
        &self.children
    }

    /// Non-owning back-reference, fixed at allocation.
    pub fn descriptor(&self) -> Option<DescriptorId> {
        self.descriptor
    }

    pub fn ty(&self) -> &Ty {
        &self.ty
    }
}

/// The owning root of all IR for one compilation unit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IrModule {
    nodes: Vec<IrNode>,
    root: NodeId,
}

impl IrModule {
    /// Create a module whose root node is a `Module` node.
    pub fn new(name: impl Into<String>) -> Self {
        let root = IrNode {
            kind: IrKind::Module { name: name.into() },
            children: Vec::new(),
            descriptor: None,
            ty: Ty::Unit,
        };
        Self {
            nodes: vec![root],
            root: NodeId::new(0),
        }
    }

    pub fn root(&self) -> NodeId {
        self.root
    }

    /// Module name.
    pub fn name(&self) -> &str {
        match &self.nodes[self.root.index()].kind {
            IrKind::Module { name } => name,
            _ => "",
        }
    }

    /// Allocate a detached node. The descriptor back-reference cannot be
    /// changed afterwards.
    pub fn alloc(
        &mut self,
        kind: IrKind,
        descriptor: Option<DescriptorId>,
        ty: Ty,
        children: Vec<NodeId>,
    ) -> NodeId {
        let id = NodeId::new(self.nodes.len() as u32);
        self.nodes.push(IrNode {
            kind,
            children,
            descriptor,
            ty,
        });
        id
    }

    pub fn get(&self, id: NodeId) -> Option<&IrNode> {
        self.nodes.get(id.index())
    }

    pub fn node(&self, id: NodeId) -> &IrNode {
        &self.nodes[id.index()]
    }

    pub fn kind(&self, id: NodeId) -> &IrKind {
        &self.nodes[id.index()].kind
    }

    pub fn children(&self, id: NodeId) -> &[NodeId] {
        &self.nodes[id.index()].children
    }

    /// Mutable access to a node's child list.
    pub fn children_mut(&mut self, id: NodeId) -> &mut Vec<NodeId> {
        &mut self.nodes[id.index()].children
    }

    pub fn push_child(&mut self, parent: NodeId, child: NodeId) {
        self.nodes[parent.index()].children.push(child);
    }

    /// Rewrite a node's kind and children in place, keeping its descriptor.
    pub fn rewrite(&mut self, id: NodeId, kind: IrKind, children: Vec<NodeId>) {
        let node = &mut self.nodes[id.index()];
        node.kind = kind;
        node.children = children;
    }

    /// Replace `old` with `new` in `parent`'s children. Returns false if
    /// `old` is not a child of `parent`.
    pub fn replace_child(&mut self, parent: NodeId, old: NodeId, new: NodeId) -> bool {
        let children = &mut self.nodes[parent.index()].children;
        match children.iter().position(|c| *c == old) {
            Some(pos) => {
                children[pos] = new;
                true
            }
            None => false,
        }
    }

    /// Number of allocated nodes, including detached ones.
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Nodes reachable from the root, in pre-order.
    pub fn preorder(&self) -> Vec<NodeId> {
        let mut order = Vec::new();
        let mut stack = vec![self.root];
        while let Some(id) = stack.pop() {
            order.push(id);
            if let Some(node) = self.get(id) {
                stack.extend(node.children.iter().rev().copied());
            }
        }
        order
    }

    /// Nodes reachable from the root, children before parents.
    pub fn postorder(&self) -> Vec<NodeId> {
        let mut order = self.preorder_with_parents();
        order.reverse();
        order.into_iter().map(|(id, _)| id).collect()
    }

    /// Pre-order list of `(node, parent)` pairs.
    pub fn preorder_with_parents(&self) -> Vec<(NodeId, Option<NodeId>)> {
        let mut order = Vec::new();
        let mut stack = vec![(self.root, None)];
        while let Some((id, parent)) = stack.pop() {
            order.push((id, parent));
            if let Some(node) = self.get(id) {
                stack.extend(node.children.iter().rev().map(|c| (*c, Some(id))));
            }
        }
        order
    }

    /// Functions in the module, in file order.
    pub fn functions(&self) -> Vec<NodeId> {
        self.preorder()
            .into_iter()
            .filter(|id| matches!(self.kind(*id), IrKind::Function { .. }))
            .collect()
    }

    /// Drop nodes no longer reachable from the root and renumber the rest
    /// in pre-order. Must only be called on a verified module.
    pub fn compact(&mut self) {
        let order = self.preorder();
        let mut remap = vec![None; self.nodes.len()];
        for (new, old) in order.iter().enumerate() {
            remap[old.index()] = Some(NodeId::new(new as u32));
        }

        let mut nodes = Vec::with_capacity(order.len());
        for old in &order {
            let mut node = self.nodes[old.index()].clone();
            node.children = node
                .children
                .iter()
                .filter_map(|c| remap.get(c.index()).copied().flatten())
                .collect();
            nodes.push(node);
        }

        self.nodes = nodes;
        self.root = NodeId::new(0);
    }
}
