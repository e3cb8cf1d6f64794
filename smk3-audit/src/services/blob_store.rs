//! Filesystem store for uploaded evidence
//!
//! Each blob is one file named by a fresh UUID under `<root>/evidence/`.
//! Metadata lives in the `documents` table; this layer only moves bytes.

use std::io;
use std::path::{Path, PathBuf};
use uuid::Uuid;

#[derive(Debug, Clone)]
pub struct BlobStore {
    dir: PathBuf,
}

impl BlobStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Only ids this store generated are accepted as keys
    fn path_for(&self, blob_ref: &str) -> io::Result<PathBuf> {
        let id = Uuid::parse_str(blob_ref).map_err(|_| {
            io::Error::new(io::ErrorKind::InvalidInput, format!("Invalid blob reference '{}'", blob_ref))
        })?;
        Ok(self.dir.join(id.to_string()))
    }

    /// Store bytes, returning the new blob reference
    pub async fn put(&self, data: &[u8]) -> io::Result<String> {
        tokio::fs::create_dir_all(&self.dir).await?;
        let blob_ref = Uuid::new_v4().to_string();
        tokio::fs::write(self.path_for(&blob_ref)?, data).await?;
        Ok(blob_ref)
    }

    pub async fn get(&self, blob_ref: &str) -> io::Result<Vec<u8>> {
        tokio::fs::read(self.path_for(blob_ref)?).await
    }

    /// Remove a blob; removing a missing blob is not an error
    pub async fn delete(&self, blob_ref: &str) -> io::Result<()> {
        match tokio::fs::remove_file(self.path_for(blob_ref)?).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e),
        }
    }
}
