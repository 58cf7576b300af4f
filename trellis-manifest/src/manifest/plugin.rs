//! `[[plugins]]` entries.

use indexmap::IndexMap;
use serde::Deserialize;
use trellis_core::toml_value_to_string;

use super::Placement;

/// One enabled plugin, in manifest order.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PluginConfig {
    /// Catalog id of the plugin module.
    pub id: String,

    /// Explicit order key for every extension the plugin registers.
    #[serde(default)]
    pub order: Option<i64>,

    /// Overrides the placement of the plugin's lowering passes.
    #[serde(default)]
    pub placement: Option<Placement>,

    #[serde(default)]
    options: IndexMap<String, toml::Value>,
}

impl PluginConfig {
    /// Create a plugin entry with no options.
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            order: None,
            placement: None,
            options: IndexMap::new(),
        }
    }

    pub fn with_order(mut self, order: i64) -> Self {
        self.order = Some(order);
        self
    }

    pub fn with_placement(mut self, placement: Placement) -> Self {
        self.placement = Some(placement);
        self
    }

    pub fn with_option(mut self, key: impl Into<String>, value: impl Into<toml::Value>) -> Self {
        self.options.insert(key.into(), value.into());
        self
    }

    /// Option keys whose values are arrays, tables or datetimes.
    pub(crate) fn non_scalar_options(&self) -> impl Iterator<Item = &str> {
        self.options
            .iter()
            .filter(|(_, v)| {
                !matches!(
                    v,
                    toml::Value::String(_)
                        | toml::Value::Integer(_)
                        | toml::Value::Float(_)
                        | toml::Value::Boolean(_)
                )
            })
            .map(|(k, _)| k.as_str())
    }

    /// Stringified option values, in declaration order.
    pub fn options(&self) -> PluginOptions {
        PluginOptions {
            plugin: self.id.clone(),
            values: self
                .options
                .iter()
                .map(|(k, v)| (k.clone(), toml_value_to_string(v)))
                .collect(),
        }
    }
}

/// Option values handed to a plugin, already stringified.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PluginOptions {
    plugin: String,
    values: IndexMap<String, String>,
}

impl PluginOptions {
    pub fn new(plugin: impl Into<String>) -> Self {
        Self {
            plugin: plugin.into(),
            values: IndexMap::new(),
        }
    }

    pub fn with(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.values.insert(key.into(), value.into());
        self
    }

    /// Id of the plugin these options belong to.
    pub fn plugin(&self) -> &str {
        &self.plugin
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.values.get(key).map(String::as_str)
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.values.keys().map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.values.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}
