//! services/api/src/adapters/fs_document.rs
//!
//! Stores the document as a JSON file. Writes go to a temporary file in the
//! same directory which is then renamed over the target, so readers always
//! see a complete document.

use async_trait::async_trait;
use startpage_core::ports::{DocumentBackend, PortError, PortResult};
use std::io::Write;
use std::path::{Path, PathBuf};

#[derive(Clone, Debug)]
pub struct FsDocumentBackend {
    path: PathBuf,
}

impl FsDocumentBackend {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

fn write_atomically(path: &Path, contents: &[u8]) -> std::io::Result<()> {
    let dir = match path.parent() {
        Some(dir) if !dir.as_os_str().is_empty() => dir,
        _ => Path::new("."),
    };
    std::fs::create_dir_all(dir)?;
    let mut temp = tempfile::NamedTempFile::new_in(dir)?;
    temp.write_all(contents)?;
    temp.as_file().sync_all()?;
    temp.persist(path).map_err(|e| e.error)?;
    Ok(())
}

#[async_trait]
impl DocumentBackend for FsDocumentBackend {
    async fn read(&self) -> PortResult<Option<String>> {
        match tokio::fs::read_to_string(&self.path).await {
            Ok(contents) => Ok(Some(contents)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            // Non-UTF-8 bytes are a corrupt document, not an I/O failure.
            Err(e) if e.kind() == std::io::ErrorKind::InvalidData => Ok(Some(String::new())),
            Err(e) => Err(PortError::Unexpected(format!(
                "failed to read {}: {e}",
                self.path.display()
            ))),
        }
    }

    async fn write(&self, contents: String) -> PortResult<()> {
        let path = self.path.clone();
        tokio::task::spawn_blocking(move || write_atomically(&path, contents.as_bytes()))
            .await
            .map_err(|e| PortError::Unexpected(format!("write task failed: {e}")))?
            .map_err(|e| {
                PortError::Unexpected(format!("failed to write {}: {e}", self.path.display()))
            })
    }
}
