//! Naming conventions for declarations.

use trellis_core::{is_pascal_case, is_snake_case};
use trellis_ir::DescriptorKind;
use trellis_manifest::PluginOptions;

use super::{Contribution, OptionSpec, PluginModule, severity_option};
use crate::{
    ConfigError, DiagnosticSink, Extension, Severity,
    analysis::DeclarationSite,
    registry::DeclarationChecker,
};

pub struct NamingPlugin;

impl PluginModule for NamingPlugin {
    fn id(&self) -> &'static str {
        "naming"
    }

    fn description(&self) -> &'static str {
        "Check that classes are PascalCase and everything else is snake_case"
    }

    fn options(&self) -> &'static [OptionSpec] {
        &[OptionSpec {
            name: "severity",
            description: "Severity of naming diagnostics",
            default: Some("warning"),
        }]
    }

    fn contributions(&self, options: &PluginOptions) -> Result<Vec<Contribution>, ConfigError> {
        let severity = severity_option(options, Severity::Warning)?;
        Ok(vec![Contribution::new(Extension::declaration_checker(
            NamingChecker { severity },
        ))])
    }
}

pub struct NamingChecker {
    severity: Severity,
}

impl NamingChecker {
    pub fn new(severity: Severity) -> Self {
        Self { severity }
    }
}

impl DeclarationChecker for NamingChecker {
    fn name(&self) -> &'static str {
        "naming"
    }

    fn check(&self, site: &DeclarationSite<'_>, sink: &mut DiagnosticSink) {
        let descriptor = site.descriptor;
        let name = descriptor.name.as_str();

        let (code, expected) = match descriptor.kind {
            DescriptorKind::Class if !is_pascal_case(name) => ("N0002", "PascalCase"),
            DescriptorKind::Class => return,
            _ if !is_snake_case(name) => ("N0001", "snake_case"),
            _ => return,
        };

        sink.report(
            self.severity,
            code,
            format!(
                "{} `{}` should be {}",
                descriptor.kind.as_str(),
                name,
                expected
            ),
            site.location.clone(),
        );
    }
}
