pub mod util;

use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::error::Result;

/// Handle to a real file on disk that a diff targets. Holding one does not
/// keep the file alive; `is_valid` re-checks the filesystem.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VirtualFile {
    path: PathBuf,
}

impl VirtualFile {
    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn name(&self) -> String {
        self.path
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_else(|| self.path.display().to_string())
    }

    pub fn is_valid(&self) -> bool {
        self.path.is_file()
    }

    pub fn read_text(&self) -> Result<String> {
        Ok(std::fs::read_to_string(&self.path)?)
    }

    pub fn write_text(&self, text: &str) -> Result<()> {
        std::fs::write(&self.path, text)?;
        Ok(())
    }
}

/// Resolves paths to live file handles and creates new files for the
/// "add file" flow.
pub struct LocalFileSystem;

impl LocalFileSystem {
    /// Resolve a path to a handle, or `None` when no file exists there yet.
    pub fn resolve(path: impl AsRef<Path>) -> Option<VirtualFile> {
        let path = path.as_ref();
        if !path.is_file() {
            return None;
        }
        let path = path.canonicalize().unwrap_or_else(|_| path.to_path_buf());
        Some(VirtualFile { path })
    }

    /// Create a new file (parents included) with the given content. Fails if
    /// a file already exists at the path.
    pub fn create_file(path: impl AsRef<Path>, content: &str) -> Result<VirtualFile> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() && !parent.exists() {
                std::fs::create_dir_all(parent)?;
            }
        }
        let mut options = std::fs::OpenOptions::new();
        options.write(true).create_new(true);
        use std::io::Write;
        let mut file = options.open(path)?;
        file.write_all(content.as_bytes())?;
        drop(file);

        let path = path.canonicalize().unwrap_or_else(|_| path.to_path_buf());
        Ok(VirtualFile { path })
    }
}

/// Callback invoked when the engine wants a file opened/focused in the
/// hosting editor.
pub type OpenFileCallback = Arc<dyn Fn(&VirtualFile) + Send + Sync>;
