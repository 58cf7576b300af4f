//! Plugin modules and the catalog discovery resolves manifest ids against.
//!
//! A plugin module is a factory: given its stringified options it returns
//! the extensions it contributes, each tagged with the point it belongs to.
//! Converting option strings into typed configuration is the plugin's job.

mod accessors;
mod forbid_calls;
mod naming;

use std::sync::Arc;

pub use accessors::{AccessorResolver, AccessorsPlugin, LowerAccessors};
pub use forbid_calls::{ForbidCalls, ForbidCallsPlugin};
pub use naming::{NamingChecker, NamingPlugin};
use indexmap::IndexMap;
use trellis_manifest::PluginOptions;

use crate::{ConfigError, Extension, ExtensionPoint, Severity};

/// An option a plugin accepts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OptionSpec {
    pub name: &'static str,
    pub description: &'static str,
    /// Shown in `trellis explain`; `None` means the option is required.
    pub default: Option<&'static str>,
}

/// One extension a plugin registers.
#[derive(Debug, Clone)]
pub struct Contribution {
    pub point: ExtensionPoint,
    pub extension: Extension,
}

impl Contribution {
    /// Tag `extension` with the only point it can serve.
    pub fn new(extension: Extension) -> Self {
        Self {
            point: extension.point(),
            extension,
        }
    }
}

pub trait PluginModule: Send + Sync {
    fn id(&self) -> &'static str;

    fn description(&self) -> &'static str;

    fn options(&self) -> &'static [OptionSpec] {
        &[]
    }

    /// The extensions to register, in order.
    fn contributions(&self, options: &PluginOptions) -> Result<Vec<Contribution>, ConfigError>;
}

/// Plugin modules available to discovery, by id.
#[derive(Clone, Default)]
pub struct PluginCatalog {
    modules: IndexMap<&'static str, Arc<dyn PluginModule>>,
}

impl PluginCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// The plugins shipped with Trellis.
    pub fn builtin() -> Self {
        let mut catalog = Self::new();
        catalog.register(AccessorsPlugin);
        catalog.register(NamingPlugin);
        catalog.register(ForbidCallsPlugin);
        catalog
    }

    /// Add a module, replacing any module with the same id.
    pub fn register(&mut self, module: impl PluginModule + 'static) -> &mut Self {
        self.modules.insert(module.id(), Arc::new(module));
        self
    }

    pub fn get(&self, id: &str) -> Option<&dyn PluginModule> {
        self.modules.get(id).map(|m| m.as_ref())
    }

    pub fn ids(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.modules.keys().copied()
    }

    pub fn iter(&self) -> impl Iterator<Item = &dyn PluginModule> {
        self.modules.values().map(|m| m.as_ref())
    }
}

/// Parse a `severity` option, falling back to `default` when unset.
pub(crate) fn severity_option(
    options: &PluginOptions,
    default: Severity,
) -> Result<Severity, ConfigError> {
    match options.get("severity") {
        None => Ok(default),
        Some(value) => Severity::parse(value).ok_or_else(|| {
            ConfigError::invalid_option(
                options.plugin(),
                "severity",
                value,
                "expected one of: error, warning, info",
            )
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builtin_catalog_ids() {
        let catalog = PluginCatalog::builtin();
        assert_eq!(
            catalog.ids().collect::<Vec<_>>(),
            vec!["accessors", "naming", "forbid-calls"]
        );
        assert!(catalog.get("naming").is_some());
        assert!(catalog.get("missing").is_none());
    }

    #[test]
    fn test_severity_option() {
        let options = PluginOptions::new("naming").with("severity", "warn");
        assert_eq!(severity_option(&options, Severity::Error).unwrap(), Severity::Warning);

        let empty = PluginOptions::new("naming");
        assert_eq!(severity_option(&empty, Severity::Error).unwrap(), Severity::Error);

        let bad = PluginOptions::new("naming").with("severity", "loud");
        assert!(matches!(
            severity_option(&bad, Severity::Error),
            Err(ConfigError::InvalidOption { option, .. }) if option == "severity"
        ));
    }
}
