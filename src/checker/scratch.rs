//! Uniquely named scratch source files.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use tracing::debug;
use uuid::Uuid;

/// A source file written under a fresh `gen_<uuid>` name.
///
/// Every call gets its own name, so two attempts can never read each other's
/// code. The file is removed on drop unless it was created with `keep`.
#[derive(Debug)]
pub struct ScratchFile {
    path: PathBuf,
    keep: bool,
}

impl ScratchFile {
    /// Writes `source` to `<dir>/gen_<uuid>.<extension>`, creating `dir` if needed.
    pub fn create(dir: &Path, extension: &str, source: &str, keep: bool) -> io::Result<Self> {
        fs::create_dir_all(dir)?;
        let path = dir.join(format!("gen_{}.{}", Uuid::new_v4().simple(), extension));
        fs::write(&path, source)?;
        debug!("Wrote scratch source to {}", path.display());
        Ok(Self { path, keep })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// File name component, used to locate the file from another mount point.
    pub fn file_name(&self) -> &str {
        self.path
            .file_name()
            .and_then(|name| name.to_str())
            .unwrap_or_default()
    }
}

impl Drop for ScratchFile {
    fn drop(&mut self) {
        if !self.keep {
            let _ = fs::remove_file(&self.path);
        }
    }
}
