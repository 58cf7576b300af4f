use std::path::{Path, PathBuf};

use super::Manifest;
use crate::Result;

/// Default artifact directory when `project.out_dir` is not set.
const DEFAULT_OUT_DIR: &str = "build";

/// Represents a trellis.toml file with both raw content and parsed manifest.
///
/// Relative paths in the manifest (units, `out_dir`) are resolved against
/// the directory that contains the file.
pub struct TrellisToml {
    path: PathBuf,
    content: String,
    manifest: Manifest,
}

impl TrellisToml {
    /// Open and parse a trellis.toml file.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let content = std::fs::read_to_string(&path).map_err(|e| {
            Box::new(crate::Error::Io {
                path: path.clone(),
                source: e,
            })
        })?;
        let filename = path.display().to_string();
        let manifest = Manifest::from_str_with_filename(&content, &filename)?;

        Ok(Self {
            path,
            content,
            manifest,
        })
    }

    /// Get the file path.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Get the raw content.
    pub fn content(&self) -> &str {
        &self.content
    }

    /// Get the parsed manifest.
    pub fn manifest(&self) -> &Manifest {
        &self.manifest
    }

    /// Directory containing the manifest.
    pub fn root(&self) -> &Path {
        self.path.parent().unwrap_or_else(|| Path::new("."))
    }

    /// Unit file paths resolved against the manifest directory, in manifest order.
    pub fn unit_paths(&self) -> Vec<PathBuf> {
        self.manifest
            .project
            .units
            .iter()
            .map(|unit| self.root().join(unit))
            .collect()
    }

    /// Artifact directory resolved against the manifest directory.
    pub fn out_dir(&self) -> PathBuf {
        let out_dir = self
            .manifest
            .project
            .out_dir
            .as_deref()
            .unwrap_or_else(|| Path::new(DEFAULT_OUT_DIR));
        self.root().join(out_dir)
    }
}
