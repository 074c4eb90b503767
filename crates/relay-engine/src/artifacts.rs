//! Durable storage for generated files.
//!
//! Tools address artifacts by a bare file name. The store decides where the
//! bytes live on disk and under which public path the server exposes them.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tokio::io::AsyncWriteExt;
use tracing::debug;

#[derive(Debug, thiserror::Error)]
pub enum ArtifactError {
    #[error("invalid artifact name: {0:?}")]
    InvalidName(String),
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

#[async_trait]
pub trait ArtifactStore: Send + Sync {
    /// Filesystem location the artifact is (or will be) written to.
    fn local_path(&self, name: &str) -> PathBuf;

    /// Retrieval path clients use to download the artifact.
    fn public_path(&self, name: &str) -> String;

    /// Write `bytes` under `name`. Resolves only after the data is flushed to disk.
    async fn write(&self, name: &str, bytes: &[u8]) -> Result<PathBuf, ArtifactError>;
}

/// Artifact store backed by a local directory.
#[derive(Clone, Debug)]
pub struct FsArtifactStore {
    root: PathBuf,
    public_prefix: String,
}

impl FsArtifactStore {
    pub fn new(root: impl Into<PathBuf>, public_prefix: impl Into<String>) -> Self {
        let public_prefix: String = public_prefix.into();
        Self {
            root: root.into(),
            public_prefix: public_prefix.trim_end_matches('/').to_string(),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }
}

fn validate_name(name: &str) -> Result<(), ArtifactError> {
    let invalid = name.is_empty()
        || name == "."
        || name == ".."
        || name.contains(['/', '\\', '\0']);
    if invalid {
        return Err(ArtifactError::InvalidName(name.to_string()));
    }
    Ok(())
}

#[async_trait]
impl ArtifactStore for FsArtifactStore {
    fn local_path(&self, name: &str) -> PathBuf {
        self.root.join(name)
    }

    fn public_path(&self, name: &str) -> String {
        format!("{}/{name}", self.public_prefix)
    }

    async fn write(&self, name: &str, bytes: &[u8]) -> Result<PathBuf, ArtifactError> {
        validate_name(name)?;
        tokio::fs::create_dir_all(&self.root).await?;

        let path = self.local_path(name);
        let mut file = tokio::fs::File::create(&path).await?;
        file.write_all(bytes).await?;
        file.sync_all().await?;

        debug!(path = %path.display(), bytes = bytes.len(), "artifact written");
        Ok(path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn write_creates_root_and_persists() {
        let dir = tempfile::tempdir().unwrap();
        let store = FsArtifactStore::new(dir.path().join("downloads"), "/downloads");

        let path = store.write("report_1.pdf", b"%PDF-1.4").await.unwrap();

        assert_eq!(path, dir.path().join("downloads").join("report_1.pdf"));
        assert_eq!(std::fs::read(&path).unwrap(), b"%PDF-1.4");
    }

    #[tokio::test]
    async fn rejects_names_with_separators() {
        let dir = tempfile::tempdir().unwrap();
        let store = FsArtifactStore::new(dir.path(), "/downloads");

        for name in ["../escape.pdf", "a/b.pdf", "a\\b.pdf", "", ".."] {
            let err = store.write(name, b"x").await.unwrap_err();
            assert!(matches!(err, ArtifactError::InvalidName(_)), "accepted {name:?}");
        }
    }

    #[test]
    fn public_path_joins_prefix() {
        let store = FsArtifactStore::new("/srv/out", "/downloads/");
        assert_eq!(store.public_path("report_7.pdf"), "/downloads/report_7.pdf");
        assert_eq!(store.local_path("report_7.pdf"), PathBuf::from("/srv/out/report_7.pdf"));
    }
}
