//! Rejects calls to configured functions.

use trellis_manifest::PluginOptions;

use super::{Contribution, OptionSpec, PluginModule, severity_option};
use crate::{
    CallSite, ConfigError, DiagnosticSink, Extension, Severity, registry::CallChecker,
};

const PLUGIN: &str = "forbid-calls";

pub struct ForbidCallsPlugin;

impl PluginModule for ForbidCallsPlugin {
    fn id(&self) -> &'static str {
        PLUGIN
    }

    fn description(&self) -> &'static str {
        "Report calls to functions listed in the `names` option"
    }

    fn options(&self) -> &'static [OptionSpec] {
        &[
            OptionSpec {
                name: "names",
                description: "Comma-separated function names",
                default: None,
            },
            OptionSpec {
                name: "severity",
                description: "Severity of forbidden-call diagnostics",
                default: Some("error"),
            },
        ]
    }

    fn contributions(&self, options: &PluginOptions) -> Result<Vec<Contribution>, ConfigError> {
        let raw = options.get("names").unwrap_or_default();
        let names: Vec<String> = raw
            .split(',')
            .map(str::trim)
            .filter(|n| !n.is_empty())
            .map(String::from)
            .collect();
        if names.is_empty() {
            return Err(ConfigError::invalid_option(
                PLUGIN,
                "names",
                raw,
                "list at least one function name, e.g. names = \"print, debug\"",
            ));
        }

        let severity = severity_option(options, Severity::Error)?;
        Ok(vec![Contribution::new(Extension::call_checker(ForbidCalls {
            names,
            severity,
        }))])
    }
}

pub struct ForbidCalls {
    names: Vec<String>,
    severity: Severity,
}

impl ForbidCalls {
    pub fn new(names: Vec<String>, severity: Severity) -> Self {
        Self { names, severity }
    }
}

impl CallChecker for ForbidCalls {
    fn name(&self) -> &'static str {
        "forbid-calls"
    }

    fn check(&self, site: &CallSite<'_>, sink: &mut DiagnosticSink) {
        if self.names.iter().any(|n| *n == site.callee.name) {
            sink.report(
                self.severity,
                "F0001",
                format!("call to forbidden function `{}`", site.callee.name),
                site.location.clone(),
            );
        }
    }
}
