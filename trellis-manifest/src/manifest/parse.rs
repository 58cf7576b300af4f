//! Manifest parsing from files and strings.

use std::{collections::HashSet, path::Path, str::FromStr};

use super::Manifest;
use crate::{
    Error, Result,
    error::{SourceContext, find_last_quoted_span},
};

impl FromStr for Manifest {
    type Err = Box<Error>;

    fn from_str(s: &str) -> Result<Self> {
        parse_manifest(s, "trellis.toml")
    }
}

impl Manifest {
    /// Parse a trellis.toml file from the given path.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|e| {
            Box::new(Error::Io {
                path: path.to_path_buf(),
                source: e,
            })
        })?;
        parse_manifest(&content, &path.display().to_string())
    }

    /// Parse a trellis.toml from a string with a custom filename for error reporting.
    pub fn from_str_with_filename(content: &str, filename: &str) -> Result<Self> {
        parse_manifest(content, filename)
    }
}

/// Parse a manifest from content with the given filename for error reporting.
pub fn parse_manifest(content: &str, filename: &str) -> Result<Manifest> {
    let source_ctx = SourceContext::new(content, filename);
    let manifest: Manifest = toml::from_str(content).map_err(|e| source_ctx.parse_error(e))?;
    validate_manifest(&manifest, &source_ctx)?;
    Ok(manifest)
}

/// Validate the manifest after parsing.
fn validate_manifest(manifest: &Manifest, ctx: &SourceContext) -> Result<()> {
    let name = &manifest.project.name;
    if name.trim().is_empty() {
        return Err(ctx.validation_error("project name cannot be empty", None));
    }

    let mut units = HashSet::new();
    for unit in &manifest.project.units {
        if !units.insert(unit) {
            let unit = unit.display().to_string();
            return Err(ctx.validation_error(
                format!("unit '{}' is listed more than once", unit),
                find_last_quoted_span(ctx.src(), &unit),
            ));
        }
    }

    let mut ids = HashSet::new();
    for plugin in &manifest.plugins {
        if plugin.id.trim().is_empty() {
            return Err(ctx.validation_error("plugin id cannot be empty", None));
        }
        if !ids.insert(plugin.id.as_str()) {
            return Err(ctx.duplicate_plugin_error(&plugin.id));
        }
        if let Some(option) = plugin.non_scalar_options().next() {
            return Err(ctx.unsupported_option_error(&plugin.id, option));
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use std::path::PathBuf;

    use super::*;
    use crate::{Placement, Target};

    const MANIFEST: &str = r#"
        [project]
        name = "demo"
        target = "bundle"
        units = ["src/main.toml", "src/util.toml"]
        out_dir = "out"

        [[plugins]]
        id = "accessors"
        order = 1
        placement = "before:fold-constants"

        [plugins.options]
        prefix = "read_"

        [[plugins]]
        id = "naming"
    "#;

    #[test]
    fn test_parse_full_manifest() {
        let manifest: Manifest = MANIFEST.parse().expect("manifest should parse");

        assert_eq!(manifest.project.name, "demo");
        assert_eq!(manifest.project.target, Target::Bundle);
        assert_eq!(
            manifest.project.units,
            vec![PathBuf::from("src/main.toml"), PathBuf::from("src/util.toml")]
        );
        assert_eq!(manifest.project.out_dir, Some(PathBuf::from("out")));

        let accessors = &manifest.plugins[0];
        assert_eq!(accessors.id, "accessors");
        assert_eq!(accessors.order, Some(1));
        assert_eq!(
            accessors.placement,
            Some(Placement::Before("fold-constants".into()))
        );
        assert_eq!(accessors.options().get("prefix"), Some("read_"));

        let naming = manifest.plugin("naming").expect("naming plugin");
        assert_eq!(naming.order, None);
        assert!(naming.options().is_empty());
    }

    #[test]
    fn test_defaults() {
        let manifest: Manifest = "[project]\nname = \"demo\"\n".parse().unwrap();
        assert_eq!(manifest.project.target, Target::Native);
        assert!(manifest.project.units.is_empty());
        assert!(manifest.plugins.is_empty());
    }

    #[test]
    fn test_invalid_placement_is_a_parse_error() {
        let result: Result<Manifest> = r#"
            [project]
            name = "demo"

            [[plugins]]
            id = "accessors"
            placement = "sideways"
        "#
        .parse();

        assert!(matches!(result.map_err(|e| *e), Err(Error::Parse { .. })));
    }

    #[test]
    fn test_unknown_target_is_a_parse_error() {
        let result: Result<Manifest> = "[project]\nname = \"demo\"\ntarget = \"wasm\"\n".parse();
        assert!(matches!(result.map_err(|e| *e), Err(Error::Parse { .. })));
    }

    #[test]
    fn test_duplicate_plugin_is_rejected() {
        let result: Result<Manifest> = r#"
            [project]
            name = "demo"

            [[plugins]]
            id = "naming"

            [[plugins]]
            id = "naming"
        "#
        .parse();

        match result.map_err(|e| *e) {
            Err(Error::DuplicatePlugin {
                id,
                first_span,
                second_span,
                ..
            }) => {
                assert_eq!(id, "naming");
                assert!(first_span.is_some());
                assert!(second_span.is_some());
            }
            other => panic!("expected duplicate plugin error, got {:?}", other),
        }
    }

    #[test]
    fn test_non_scalar_option_is_rejected() {
        let result: Result<Manifest> = r#"
            [project]
            name = "demo"

            [[plugins]]
            id = "forbid-calls"

            [plugins.options]
            names = ["print"]
        "#
        .parse();

        match result.map_err(|e| *e) {
            Err(Error::UnsupportedOptionValue {
                plugin, option, span, ..
            }) => {
                assert_eq!(plugin, "forbid-calls");
                assert_eq!(option, "names");
                assert!(span.is_some());
            }
            other => panic!("expected unsupported option error, got {:?}", other),
        }
    }

    #[test]
    fn test_duplicate_unit_is_rejected() {
        let result: Result<Manifest> =
            "[project]\nname = \"demo\"\nunits = [\"a.toml\", \"a.toml\"]\n".parse();
        assert!(matches!(
            result.map_err(|e| *e),
            Err(Error::Validation { .. })
        ));
    }

    #[test]
    fn test_unknown_field_is_rejected() {
        let result: Result<Manifest> = "[project]\nname = \"demo\"\nlanguage = \"rust\"\n".parse();
        assert!(result.is_err());
    }
}
