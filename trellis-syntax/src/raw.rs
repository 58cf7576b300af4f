//! Serde mirror of the unit file format.
//!
//! These types exist only to be deserialized and assembled into a
//! [`SyntaxTree`](crate::SyntaxTree); nothing downstream sees them.

use serde::Deserialize;

use crate::BinOp;

#[derive(Debug, Deserialize)]
pub(crate) struct RawUnit {
    /// Unit name; defaults to the file stem.
    #[serde(default)]
    pub unit: Option<String>,
    #[serde(default)]
    pub items: Vec<RawItem>,
}

#[derive(Debug, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub(crate) enum RawItem {
    Function {
        name: String,
        #[serde(default)]
        type_params: Vec<String>,
        #[serde(default)]
        params: Vec<RawTyped>,
        #[serde(default)]
        returns: Option<String>,
        #[serde(default)]
        body: Vec<RawStmt>,
    },
    Class {
        name: String,
        #[serde(default)]
        fields: Vec<RawTyped>,
    },
}

/// A `{ name, type }` pair used by params and fields.
#[derive(Debug, Deserialize)]
pub(crate) struct RawTyped {
    pub name: String,
    #[serde(rename = "type")]
    pub ty: String,
}

#[derive(Debug, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub(crate) enum RawStmt {
    Let {
        name: String,
        #[serde(default, rename = "type")]
        ty: Option<String>,
        value: RawExpr,
    },
    Return {
        #[serde(default)]
        value: Option<RawExpr>,
    },
    Expr {
        value: RawExpr,
    },
}

#[derive(Debug, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub(crate) enum RawExpr {
    Int {
        value: i64,
    },
    Bool {
        value: bool,
    },
    Str {
        value: String,
    },
    Ref {
        name: String,
    },
    Call {
        callee: String,
        #[serde(default)]
        args: Vec<RawExpr>,
    },
    Binary {
        op: BinOp,
        lhs: Box<RawExpr>,
        rhs: Box<RawExpr>,
    },
}
