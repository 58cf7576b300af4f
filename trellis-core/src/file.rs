use std::{
    fs,
    path::{Path, PathBuf},
};

use eyre::{Context, Result};

/// A compiler output that ends up on disk.
pub trait GeneratedFile {
    /// Where the file goes under `base`.
    fn path(&self, base: &Path) -> PathBuf;

    fn rules(&self) -> FileRules;

    fn render(&self) -> String;

    /// Write the file under `base` according to its rules.
    fn write(&self, base: &Path) -> Result<WriteResult> {
        self.rules().write(&self.path(base), &self.render())
    }
}

/// What a write did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriteResult {
    Written,
    /// The file already held exactly this content.
    Unchanged,
}

/// How to handle a file that already exists.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Overwrite {
    /// Replace it unconditionally.
    Always,
    /// Replace it only when the content differs, keeping its mtime otherwise.
    #[default]
    IfChanged,
}

/// Rules that determine how a file is written.
#[derive(Debug, Clone, Copy, Default)]
pub struct FileRules {
    pub overwrite: Overwrite,
}

impl FileRules {
    pub fn always() -> Self {
        Self {
            overwrite: Overwrite::Always,
        }
    }

    /// Write `content` to `path`, creating parent directories as needed.
    pub fn write(&self, path: &Path, content: &str) -> Result<WriteResult> {
        if self.overwrite == Overwrite::IfChanged && path.exists() {
            let existing = fs::read_to_string(path)
                .wrap_err_with(|| format!("failed to read {}", path.display()))?;
            if existing == content {
                return Ok(WriteResult::Unchanged);
            }
        }

        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)
                .wrap_err_with(|| format!("failed to create {}", parent.display()))?;
        }
        fs::write(path, content).wrap_err_with(|| format!("failed to write {}", path.display()))?;
        Ok(WriteResult::Written)
    }
}

#[cfg(test)]
mod tests {
    use tempfile::TempDir;

    use super::*;

    struct Listing(&'static str);

    impl GeneratedFile for Listing {
        fn path(&self, base: &Path) -> PathBuf {
            base.join("out").join("main.lst")
        }

        fn rules(&self) -> FileRules {
            FileRules::default()
        }

        fn render(&self) -> String {
            self.0.to_string()
        }
    }

    #[test]
    fn test_write_creates_parent_dirs() {
        let temp = TempDir::new().unwrap();

        let result = Listing("fn main\n").write(temp.path()).unwrap();

        assert_eq!(result, WriteResult::Written);
        let written = fs::read_to_string(temp.path().join("out/main.lst")).unwrap();
        assert_eq!(written, "fn main\n");
    }

    #[test]
    fn test_identical_content_is_left_alone() {
        let temp = TempDir::new().unwrap();

        Listing("fn main\n").write(temp.path()).unwrap();
        let second = Listing("fn main\n").write(temp.path()).unwrap();
        let third = Listing("fn other\n").write(temp.path()).unwrap();

        assert_eq!(second, WriteResult::Unchanged);
        assert_eq!(third, WriteResult::Written);
    }

    #[test]
    fn test_always_replaces_identical_content() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("test.txt");
        fs::write(&path, "same").unwrap();

        assert_eq!(
            FileRules::always().write(&path, "same").unwrap(),
            WriteResult::Written
        );
    }
}
