//! Backends that turn a lowered IR module into an artifact.

mod bundle;
mod code_builder;
mod listing;

use std::path::{Path, PathBuf};

pub use bundle::BundleBackend;
pub use code_builder::{CodeBuilder, Indent};
pub use listing::ListingBackend;
use trellis_core::{FileRules, GeneratedFile, Overwrite};
use trellis_ir::{DescriptorTable, IrModule};
use trellis_manifest::Target;

use crate::PipelineFault;

/// Produces the final artifact for one unit.
pub trait Backend: Send + Sync {
    fn name(&self) -> &'static str;

    fn generate(
        &self,
        module: &IrModule,
        descriptors: &DescriptorTable,
    ) -> Result<Artifact, PipelineFault>;
}

/// The backend for `target`.
pub fn backend_for(target: Target) -> Box<dyn Backend> {
    match target {
        Target::Native => Box::new(ListingBackend),
        Target::Bundle => Box::new(BundleBackend),
    }
}

/// Output of a successful compilation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Artifact {
    /// Stack-machine listing.
    Listing { unit: String, text: String },
    /// Serialized IR and descriptors.
    Bundle { unit: String, json: String },
}

impl Artifact {
    pub fn unit(&self) -> &str {
        match self {
            Artifact::Listing { unit, .. } | Artifact::Bundle { unit, .. } => unit,
        }
    }

    pub fn content(&self) -> &str {
        match self {
            Artifact::Listing { text, .. } => text,
            Artifact::Bundle { json, .. } => json,
        }
    }

    pub fn file_name(&self) -> String {
        match self {
            Artifact::Listing { unit, .. } => format!("{}.lst", unit),
            Artifact::Bundle { unit, .. } => format!("{}.bundle.json", unit),
        }
    }
}

impl GeneratedFile for Artifact {
    fn path(&self, base: &Path) -> PathBuf {
        base.join(self.file_name())
    }

    /// Unchanged artifacts keep their mtime.
    fn rules(&self) -> FileRules {
        FileRules {
            overwrite: Overwrite::IfChanged,
        }
    }

    fn render(&self) -> String {
        self.content().to_string()
    }
}
