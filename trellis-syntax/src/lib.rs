//! Syntax trees for Trellis compilation units.
//!
//! Parsing source text is not Trellis' job: units arrive as structured TOML
//! documents (one per compilation unit) and are assembled here into an
//! immutable, arena-backed [`SyntaxTree`]. Every node gets a [`SyntaxId`]
//! assigned in document order, which the analysis stage uses as the key of
//! its binding store.
//!
//! ```text
//! unit.toml → raw items (serde) → SyntaxTree (pre-order ids) → analysis
//! ```

// Miette's derive macro generates code that triggers these warnings
#![allow(unused_assignments)]

mod assemble;
mod error;
mod raw;
mod tree;

use std::path::Path;

pub use error::{Error, Result, SourceContext};
pub use tree::{BinOp, NodeCategory, SyntaxId, SyntaxKind, SyntaxNode, SyntaxTree};

use crate::{error::validate_unit_name, raw::RawUnit};

/// Parse a unit file from the given path.
///
/// The unit name defaults to the file stem unless the document sets `unit`.
pub fn parse_file(path: impl AsRef<Path>) -> Result<SyntaxTree> {
    let path = path.as_ref();
    let content = std::fs::read_to_string(path).map_err(|e| {
        Box::new(Error::Io {
            path: path.to_path_buf(),
            source: e,
        })
    })?;
    let default_unit = path
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "unit".to_string());
    parse_str_with_filename(&content, &path.display().to_string(), &default_unit)
}

/// Parse a unit from a string (unit name defaults to "main").
pub fn parse_str(content: &str) -> Result<SyntaxTree> {
    parse_str_with_filename(content, "main.toml", "main")
}

/// Parse a unit from a string with a custom filename for error reporting.
///
/// The unit name must be usable as a plain file name.
pub fn parse_str_with_filename(
    content: &str,
    filename: &str,
    default_unit: &str,
) -> Result<SyntaxTree> {
    let source = SourceContext::new(content, filename);
    let raw: RawUnit = toml::from_str(content).map_err(|e| source.parse_error(e))?;
    let unit = raw.unit.clone().unwrap_or_else(|| default_unit.to_string());
    if let Some(reason) = validate_unit_name(&unit) {
        return Err(source.invalid_unit_name_error(unit, reason));
    }
    assemble::assemble(raw, unit, &source)
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    const UNIT: &str = r#"
        unit = "demo"

        [[items]]
        kind = "function"
        name = "f"
        params = [{ name = "x", type = "int" }]
        returns = "int"
        body = [
            { kind = "return", value = { kind = "binary", op = "+", lhs = { kind = "ref", name = "x" }, rhs = { kind = "int", value = 1 } } },
        ]

        [[items]]
        kind = "function"
        name = "main"
        body = [
            { kind = "expr", value = { kind = "call", callee = "f", args = [{ kind = "int", value = 2 }] } },
        ]
    "#;

    #[test]
    fn test_parse_unit_name_and_items() {
        let tree = parse_str(UNIT).expect("unit should parse");

        assert_eq!(tree.unit(), "demo");
        assert_eq!(tree.items().len(), 2);
        assert_eq!(tree.kind(tree.items()[0]).declared_name(), Some("f"));
        assert_eq!(tree.kind(tree.items()[1]).declared_name(), Some("main"));
    }

    #[test]
    fn test_ids_follow_document_order() {
        let tree = parse_str(UNIT).expect("unit should parse");

        // f, param x, type int, returns int, return, binary, ref x, int 1
        let kinds: Vec<_> = tree.iter().map(|(_, n)| n.kind.category()).collect();
        assert_eq!(kinds[0], NodeCategory::Declaration);
        assert_eq!(kinds[1], NodeCategory::Declaration);
        assert_eq!(kinds[2], NodeCategory::TypeReference);
        assert_eq!(kinds[3], NodeCategory::TypeReference);
        assert_eq!(kinds[4], NodeCategory::Statement);

        for (id, node) in tree.iter() {
            for child in node.kind.children() {
                assert!(child > id, "child {} must follow parent {}", child, id);
            }
        }
    }

    #[test]
    fn test_node_paths() {
        let tree = parse_str(UNIT).expect("unit should parse");

        let call = tree
            .iter()
            .find(|(_, n)| matches!(n.kind, SyntaxKind::Call { .. }))
            .map(|(id, _)| id)
            .expect("call node");

        assert_eq!(tree.node(call).path, "items[1].body[0].value");
        assert_eq!(tree.location(call).to_string(), "demo:items[1].body[0].value");
    }

    #[test]
    fn test_parse_error_is_reported() {
        let result = parse_str("[[items]]\nkind = \"function\"\n");
        assert!(matches!(result.map_err(|e| *e), Err(Error::Parse { .. })));
    }

    #[test]
    fn test_invalid_identifier_is_rejected() {
        let result = parse_str(
            r#"
            [[items]]
            kind = "function"
            name = "bad-name"
        "#,
        );

        match result.map_err(|e| *e) {
            Err(Error::InvalidIdentifier { name, path, span, .. }) => {
                assert_eq!(name, "bad-name");
                assert_eq!(path, "items[0]");
                assert!(span.is_some());
            }
            other => panic!("expected invalid identifier, got {:?}", other),
        }
    }

    #[test]
    fn test_unit_name_that_escapes_the_output_dir_is_rejected() {
        let source = "unit = \"../escaped\"\n";
        let result = parse_str_with_filename(source, "x.toml", "x");

        match result.map_err(|e| *e) {
            Err(Error::InvalidUnitName { name, span, .. }) => {
                assert_eq!(name, "../escaped");
                let span = span.expect("span");
                assert_eq!(&source[span.offset()..span.offset() + span.len()], "../escaped");
            }
            other => panic!("expected invalid unit name, got {:?}", other),
        }

        for name in ["/abs", "", "a\\b"] {
            let source = format!("unit = '{}'\n", name);
            assert!(matches!(
                parse_str(&source).map_err(|e| *e),
                Err(Error::InvalidUnitName { .. })
            ));
        }
    }

    #[test]
    fn test_default_unit_name() {
        let tree = parse_str_with_filename("", "util.toml", "util").expect("empty unit");
        assert_eq!(tree.unit(), "util");
        assert!(tree.is_empty());
    }
}
