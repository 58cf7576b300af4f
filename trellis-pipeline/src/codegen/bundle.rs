use serde::Serialize;
use trellis_ir::{DescriptorTable, IrModule};

use super::{Artifact, Backend};
use crate::PipelineFault;

/// Serializes the lowered module and its descriptors as JSON.
pub struct BundleBackend;

#[derive(Serialize)]
struct BundleDocument<'a> {
    unit: &'a str,
    descriptors: &'a DescriptorTable,
    ir: &'a IrModule,
}

impl Backend for BundleBackend {
    fn name(&self) -> &'static str {
        "bundle"
    }

    fn generate(
        &self,
        module: &IrModule,
        descriptors: &DescriptorTable,
    ) -> Result<Artifact, PipelineFault> {
        let document = BundleDocument {
            unit: module.name(),
            descriptors,
            ir: module,
        };
        let json = serde_json::to_string_pretty(&document).map_err(|e| PipelineFault::Codegen {
            backend: "bundle",
            message: e.to_string(),
        })?;

        Ok(Artifact::Bundle {
            unit: module.name().to_string(),
            json,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bundle_round_trips_ir() {
        let module = IrModule::new("shapes");

        let artifact = BundleBackend
            .generate(&module, &DescriptorTable::new())
            .unwrap();

        let value: serde_json::Value = serde_json::from_str(artifact.content()).unwrap();
        assert_eq!(value["unit"], "shapes");
        let ir: IrModule = serde_json::from_value(value["ir"].clone()).unwrap();
        assert_eq!(ir, module);
    }
}
