//! The extension registry.
//!
//! Extensions are registered against a closed set of [`ExtensionPoint`]s
//! while a [`RegistryBuilder`] is alive. [`RegistryBuilder::build`] consumes
//! the builder, so the resulting [`ExtensionRegistry`] has no way to add or
//! remove extensions for the rest of the run.
//!
//! Within a point, extensions run in ascending order key (absent key = 0),
//! ties broken by registration sequence.

mod extension;

use std::{
    fmt,
    panic::{self, AssertUnwindSafe},
    sync::Arc,
};

pub use extension::{
    CallChecker, DeclarationChecker, DescriptorResolver, LoweringPass, ReferenceKind,
    ResolveRequest,
};
use indexmap::IndexMap;
use serde::Serialize;
use tracing::debug;
use trellis_manifest::{Manifest, Placement, PluginOptions};

use crate::{
    ConfigError, PipelineFault, Reporter, host::BuiltinsResolver, lowering::panic_message,
    plugins::PluginCatalog,
};

/// Plugin id used for the host's own registrations.
pub const HOST_PLUGIN: &str = "host";

/// Places in the pipeline where extensions can participate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum ExtensionPoint {
    SyntheticDescriptors,
    DeclarationChecker,
    CallChecker,
    IrLowering,
}

impl ExtensionPoint {
    pub const ALL: [ExtensionPoint; 4] = [
        ExtensionPoint::SyntheticDescriptors,
        ExtensionPoint::DeclarationChecker,
        ExtensionPoint::CallChecker,
        ExtensionPoint::IrLowering,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ExtensionPoint::SyntheticDescriptors => "synthetic-descriptors",
            ExtensionPoint::DeclarationChecker => "declaration-checker",
            ExtensionPoint::CallChecker => "call-checker",
            ExtensionPoint::IrLowering => "ir-lowering",
        }
    }

    pub fn description(&self) -> &'static str {
        match self {
            ExtensionPoint::SyntheticDescriptors => {
                "Offer declarations for names ordinary resolution cannot find"
            }
            ExtensionPoint::DeclarationChecker => "Inspect every declaration after resolution",
            ExtensionPoint::CallChecker => "Inspect every resolved call after resolution",
            ExtensionPoint::IrLowering => "Transform the IR between construction and codegen",
        }
    }
}

impl fmt::Display for ExtensionPoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// An extension, tagged by the capability it provides.
#[derive(Clone)]
pub enum Extension {
    Resolver(Arc<dyn DescriptorResolver>),
    DeclarationChecker(Arc<dyn DeclarationChecker>),
    CallChecker(Arc<dyn CallChecker>),
    Lowering(Arc<dyn LoweringPass>),
}

impl Extension {
    pub fn resolver(resolver: impl DescriptorResolver + 'static) -> Self {
        Extension::Resolver(Arc::new(resolver))
    }

    pub fn declaration_checker(checker: impl DeclarationChecker + 'static) -> Self {
        Extension::DeclarationChecker(Arc::new(checker))
    }

    pub fn call_checker(checker: impl CallChecker + 'static) -> Self {
        Extension::CallChecker(Arc::new(checker))
    }

    pub fn lowering(pass: impl LoweringPass + 'static) -> Self {
        Extension::Lowering(Arc::new(pass))
    }

    /// The only point this extension can be registered for.
    pub fn point(&self) -> ExtensionPoint {
        match self {
            Extension::Resolver(_) => ExtensionPoint::SyntheticDescriptors,
            Extension::DeclarationChecker(_) => ExtensionPoint::DeclarationChecker,
            Extension::CallChecker(_) => ExtensionPoint::CallChecker,
            Extension::Lowering(_) => ExtensionPoint::IrLowering,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Extension::Resolver(e) => e.name(),
            Extension::DeclarationChecker(e) => e.name(),
            Extension::CallChecker(e) => e.name(),
            Extension::Lowering(e) => e.name(),
        }
    }
}

impl fmt::Debug for Extension {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Extension")
            .field("point", &self.point())
            .field("name", &self.name())
            .finish()
    }
}

/// Identity of a registered extension: the plugin that contributed it and
/// the extension's own name.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct ExtensionId {
    pub plugin: String,
    pub name: String,
}

impl fmt::Display for ExtensionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.plugin, self.name)
    }
}

/// One registration.
#[derive(Debug, Clone)]
pub struct ExtensionRecord {
    pub id: ExtensionId,
    pub point: ExtensionPoint,
    pub order_key: i64,
    /// Global registration sequence, across all points.
    pub sequence: usize,
    /// Effective placement, for lowering passes only.
    pub placement: Option<Placement>,
    pub extension: Extension,
}

impl ExtensionRecord {
    /// The identity diagnostics from this extension are tagged with.
    pub fn reporter(&self) -> Reporter {
        Reporter::extension(self.id.to_string(), self.sequence)
    }

    /// Call into the extension. A panic becomes a fault naming it.
    pub(crate) fn invoke<T>(&self, f: impl FnOnce() -> T) -> Result<T, PipelineFault> {
        panic::catch_unwind(AssertUnwindSafe(f)).map_err(|payload| {
            PipelineFault::ExtensionPanicked {
                extension: self.id.to_string(),
                point: self.point,
                message: panic_message(payload.as_ref()),
            }
        })
    }
}

/// A plugin enabled during discovery, with the options it received.
#[derive(Debug, Clone)]
pub struct PluginSummary {
    pub id: String,
    pub description: &'static str,
    pub order: Option<i64>,
    pub placement: Option<Placement>,
    pub options: PluginOptions,
}

/// Mutable registration phase of the registry.
#[derive(Debug, Default)]
pub struct RegistryBuilder {
    records: Vec<ExtensionRecord>,
    plugins: Vec<PluginSummary>,
}

impl RegistryBuilder {
    /// An empty builder, without the host's registrations.
    pub fn new() -> Self {
        Self::default()
    }

    /// A builder holding the host's own registrations.
    pub fn with_host() -> Self {
        let mut builder = Self::new();
        builder.push(
            ExtensionId {
                plugin: HOST_PLUGIN.to_string(),
                name: BuiltinsResolver.name().to_string(),
            },
            Extension::resolver(BuiltinsResolver),
            None,
            None,
        );
        builder
    }

    /// Register an extension under `point`.
    ///
    /// Fails if the extension's capability belongs to another point, or if
    /// the same `plugin/name` identity is already registered there.
    pub fn register(
        &mut self,
        plugin: &str,
        point: ExtensionPoint,
        extension: Extension,
        order_key: Option<i64>,
    ) -> Result<&mut Self, ConfigError> {
        self.insert(plugin, point, extension, order_key, None)
    }

    fn insert(
        &mut self,
        plugin: &str,
        point: ExtensionPoint,
        extension: Extension,
        order_key: Option<i64>,
        placement_override: Option<&Placement>,
    ) -> Result<&mut Self, ConfigError> {
        let id = ExtensionId {
            plugin: plugin.to_string(),
            name: extension.name().to_string(),
        };

        if extension.point() != point {
            return Err(ConfigError::PointMismatch {
                id: id.to_string(),
                point,
                found: extension.point(),
            });
        }

        if self.records.iter().any(|r| r.point == point && r.id == id) {
            return Err(ConfigError::DuplicateRegistration {
                id: id.to_string(),
                point,
            });
        }

        self.push(id, extension, order_key, placement_override);
        Ok(self)
    }

    /// Append a record that is already known to be valid.
    fn push(
        &mut self,
        id: ExtensionId,
        extension: Extension,
        order_key: Option<i64>,
        placement_override: Option<&Placement>,
    ) {
        let point = extension.point();
        let placement = match &extension {
            Extension::Lowering(pass) => {
                Some(placement_override.cloned().unwrap_or_else(|| pass.placement()))
            }
            _ => None,
        };

        let sequence = self.records.len();
        debug!(extension = %id, %point, sequence, "registered extension");
        self.records.push(ExtensionRecord {
            id,
            point,
            order_key: order_key.unwrap_or(0),
            sequence,
            placement,
            extension,
        });
    }

    /// Host registrations followed by every plugin enabled in the manifest,
    /// in manifest order.
    ///
    /// Option keys are checked against the plugin's declared options before
    /// the plugin sees them; the plugin converts the values itself.
    pub fn discover(manifest: &Manifest, catalog: &PluginCatalog) -> Result<Self, ConfigError> {
        let mut builder = Self::with_host();

        for config in &manifest.plugins {
            let module = catalog
                .get(&config.id)
                .ok_or_else(|| ConfigError::UnknownPlugin {
                    id: config.id.clone(),
                    available: catalog.ids().collect::<Vec<_>>().join(", "),
                })?;

            let options = config.options();
            let declared = module.options();
            for key in options.keys() {
                if !declared.iter().any(|spec| spec.name == key) {
                    let expected = if declared.is_empty() {
                        "none".to_string()
                    } else {
                        declared
                            .iter()
                            .map(|spec| spec.name)
                            .collect::<Vec<_>>()
                            .join(", ")
                    };
                    return Err(ConfigError::UnknownOption {
                        plugin: config.id.clone(),
                        option: key.to_string(),
                        expected,
                    });
                }
            }

            for contribution in module.contributions(&options)? {
                builder.insert(
                    module.id(),
                    contribution.point,
                    contribution.extension,
                    config.order,
                    config.placement.as_ref(),
                )?;
            }

            builder.plugins.push(PluginSummary {
                id: module.id().to_string(),
                description: module.description(),
                order: config.order,
                placement: config.placement.clone(),
                options,
            });
        }

        Ok(builder)
    }

    /// Freeze the registrations.
    pub fn build(self) -> ExtensionRegistry {
        let mut by_point: IndexMap<ExtensionPoint, Vec<ExtensionRecord>> = ExtensionPoint::ALL
            .iter()
            .map(|point| (*point, Vec::new()))
            .collect();

        for record in self.records {
            by_point.entry(record.point).or_default().push(record);
        }
        for records in by_point.values_mut() {
            records.sort_by_key(|r| (r.order_key, r.sequence));
        }

        ExtensionRegistry {
            by_point,
            plugins: self.plugins,
        }
    }
}

/// Read-only view of every registered extension, shared by all units.
#[derive(Debug)]
pub struct ExtensionRegistry {
    by_point: IndexMap<ExtensionPoint, Vec<ExtensionRecord>>,
    plugins: Vec<PluginSummary>,
}

impl ExtensionRegistry {
    /// Extensions registered for `point`, in invocation order.
    pub fn extensions_for(&self, point: ExtensionPoint) -> &[ExtensionRecord] {
        self.by_point.get(&point).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn resolvers(&self) -> impl Iterator<Item = (&ExtensionRecord, &dyn DescriptorResolver)> {
        self.extensions_for(ExtensionPoint::SyntheticDescriptors)
            .iter()
            .filter_map(|r| match &r.extension {
                Extension::Resolver(e) => Some((r, e.as_ref())),
                _ => None,
            })
    }

    pub fn declaration_checkers(
        &self,
    ) -> impl Iterator<Item = (&ExtensionRecord, &dyn DeclarationChecker)> {
        self.extensions_for(ExtensionPoint::DeclarationChecker)
            .iter()
            .filter_map(|r| match &r.extension {
                Extension::DeclarationChecker(e) => Some((r, e.as_ref())),
                _ => None,
            })
    }

    pub fn call_checkers(&self) -> impl Iterator<Item = (&ExtensionRecord, &dyn CallChecker)> {
        self.extensions_for(ExtensionPoint::CallChecker)
            .iter()
            .filter_map(|r| match &r.extension {
                Extension::CallChecker(e) => Some((r, e.as_ref())),
                _ => None,
            })
    }

    /// Plugin lowering passes with their effective placement.
    pub fn lowering_passes(
        &self,
    ) -> impl Iterator<Item = (&ExtensionRecord, &Arc<dyn LoweringPass>)> {
        self.extensions_for(ExtensionPoint::IrLowering)
            .iter()
            .filter_map(|r| match &r.extension {
                Extension::Lowering(e) => Some((r, e)),
                _ => None,
            })
    }

    /// Plugins enabled during discovery, in manifest order.
    pub fn plugins(&self) -> &[PluginSummary] {
        &self.plugins
    }

    /// Total number of registered extensions.
    pub fn len(&self) -> usize {
        self.by_point.values().map(Vec::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;
    use trellis_ir::Descriptor;
    use trellis_manifest::{PluginConfig, Target};

    use super::*;

    struct Named(&'static str);

    impl DescriptorResolver for Named {
        fn name(&self) -> &'static str {
            self.0
        }

        fn resolve(&self, _request: &ResolveRequest<'_>) -> Option<Descriptor> {
            None
        }
    }

    fn names(registry: &ExtensionRegistry, point: ExtensionPoint) -> Vec<String> {
        registry
            .extensions_for(point)
            .iter()
            .map(|r| r.id.to_string())
            .collect()
    }

    #[test]
    fn test_order_key_then_registration_order() {
        let mut builder = RegistryBuilder::new();
        let point = ExtensionPoint::SyntheticDescriptors;
        builder
            .register("p", point, Extension::resolver(Named("late")), Some(5))
            .unwrap();
        builder
            .register("p", point, Extension::resolver(Named("first-tie")), None)
            .unwrap();
        builder
            .register("p", point, Extension::resolver(Named("early")), Some(-1))
            .unwrap();
        builder
            .register("p", point, Extension::resolver(Named("second-tie")), Some(0))
            .unwrap();

        let registry = builder.build();

        assert_eq!(
            names(&registry, point),
            vec!["p/early", "p/first-tie", "p/second-tie", "p/late"]
        );
    }

    #[test]
    fn test_duplicate_registration_is_rejected() {
        let mut builder = RegistryBuilder::new();
        let point = ExtensionPoint::SyntheticDescriptors;
        builder
            .register("p", point, Extension::resolver(Named("r")), None)
            .unwrap();

        let err = builder
            .register("p", point, Extension::resolver(Named("r")), Some(3))
            .unwrap_err();
        assert_eq!(
            err,
            ConfigError::DuplicateRegistration {
                id: "p/r".into(),
                point
            }
        );

        // Same name from another plugin is a different identity.
        assert!(
            builder
                .register("q", point, Extension::resolver(Named("r")), None)
                .is_ok()
        );
    }

    #[test]
    fn test_host_builtins_are_registered_and_guarded() {
        let mut builder = RegistryBuilder::with_host();
        let point = ExtensionPoint::SyntheticDescriptors;

        let err = builder
            .register(HOST_PLUGIN, point, Extension::resolver(BuiltinsResolver), None)
            .unwrap_err();
        assert!(matches!(err, ConfigError::DuplicateRegistration { .. }));

        let registry = builder.build();
        assert_eq!(names(&registry, point), vec!["host/builtins"]);
        assert_eq!(registry.extensions_for(point)[0].sequence, 0);
    }

    #[test]
    fn test_point_mismatch_is_rejected() {
        let mut builder = RegistryBuilder::new();
        let err = builder
            .register(
                "p",
                ExtensionPoint::CallChecker,
                Extension::resolver(Named("r")),
                None,
            )
            .unwrap_err();

        assert!(matches!(
            err,
            ConfigError::PointMismatch {
                found: ExtensionPoint::SyntheticDescriptors,
                ..
            }
        ));
    }

    #[test]
    fn test_discover_registers_host_then_plugins_in_manifest_order() {
        let manifest = Manifest::new("demo", Target::Native)
            .with_plugin(PluginConfig::new("naming"))
            .with_plugin(PluginConfig::new("accessors"));

        let registry = RegistryBuilder::discover(&manifest, &PluginCatalog::builtin())
            .unwrap()
            .build();

        assert_eq!(
            names(&registry, ExtensionPoint::SyntheticDescriptors),
            vec!["host/builtins", "accessors/accessors"]
        );
        let sequences: Vec<_> = registry
            .extensions_for(ExtensionPoint::SyntheticDescriptors)
            .iter()
            .map(|r| r.sequence)
            .collect();
        assert!(sequences[0] < sequences[1]);
        assert_eq!(
            registry.plugins().iter().map(|p| p.id.as_str()).collect::<Vec<_>>(),
            vec!["naming", "accessors"]
        );
    }

    #[test]
    fn test_discover_rejects_unknown_plugin() {
        let manifest = Manifest::new("demo", Target::Native).with_plugin(PluginConfig::new("nope"));

        let err = RegistryBuilder::discover(&manifest, &PluginCatalog::builtin()).unwrap_err();

        assert!(matches!(err, ConfigError::UnknownPlugin { id, .. } if id == "nope"));
    }

    #[test]
    fn test_discover_rejects_undeclared_option() {
        let manifest = Manifest::new("demo", Target::Native)
            .with_plugin(PluginConfig::new("naming").with_option("colour", "red"));

        let err = RegistryBuilder::discover(&manifest, &PluginCatalog::builtin()).unwrap_err();

        assert!(matches!(
            err,
            ConfigError::UnknownOption { plugin, option, .. } if plugin == "naming" && option == "colour"
        ));
    }

    #[test]
    fn test_manifest_order_key_applies_to_plugin_extensions() {
        let manifest = Manifest::new("demo", Target::Native)
            .with_plugin(PluginConfig::new("accessors").with_order(-1));

        let registry = RegistryBuilder::discover(&manifest, &PluginCatalog::builtin())
            .unwrap()
            .build();

        assert_eq!(
            names(&registry, ExtensionPoint::SyntheticDescriptors),
            vec!["accessors/accessors", "host/builtins"]
        );
    }
}
