//! Filesystem-backed object buckets.
//!
//! Objects live at `<root>/<bucket>/<key>`. Keys are relative, slash
//! separated, and never overwrite an existing object.

use std::fs::OpenOptions;
use std::io::Write;
use std::path::{Component, Path, PathBuf};
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::core::errors::{AppError, AppResult};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Bucket {
    /// Network and cloud diagram images.
    Diagrams,
    /// Shared files and logos.
    Documents,
}

impl Bucket {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Diagrams => "diagrams",
            Self::Documents => "documents",
        }
    }
}

impl FromStr for Bucket {
    type Err = AppError;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "diagrams" => Ok(Self::Diagrams),
            "documents" => Ok(Self::Documents),
            other => Err(AppError::InvalidInput(format!("unknown bucket {other}"))),
        }
    }
}

#[derive(Debug, Clone)]
pub struct BucketStore {
    root: PathBuf,
}

impl BucketStore {
    pub fn new(root: impl Into<PathBuf>) -> AppResult<Self> {
        let root = root.into();
        std::fs::create_dir_all(&root)
            .map_err(|e| AppError::Storage(format!("cannot create {}: {e}", root.display())))?;
        Ok(Self { root })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn object_path(&self, bucket: Bucket, key: &str) -> AppResult<PathBuf> {
        validate_key(key)?;
        Ok(self.root.join(bucket.as_str()).join(key))
    }

    pub fn upload(&self, bucket: Bucket, key: &str, bytes: &[u8]) -> AppResult<String> {
        let path = self.object_path(bucket, key)?;
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .map_err(|e| AppError::Storage(format!("cannot create {}: {e}", parent.display())))?;
        }
        let mut file = OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&path)
            .map_err(|e| match e.kind() {
                std::io::ErrorKind::AlreadyExists => {
                    AppError::Conflict(format!("object {}/{key}", bucket.as_str()))
                }
                _ => AppError::Storage(format!("cannot create {}: {e}", path.display())),
            })?;
        write_or_discard(&path, &mut file, bytes)?;
        tracing::debug!(bucket = bucket.as_str(), key, size = bytes.len(), "object stored");
        Ok(key.to_string())
    }

    pub fn download(&self, bucket: Bucket, key: &str) -> AppResult<Vec<u8>> {
        let path = self.object_path(bucket, key)?;
        std::fs::read(&path).map_err(|e| match e.kind() {
            std::io::ErrorKind::NotFound => {
                AppError::NotFound(format!("object {}/{key}", bucket.as_str()))
            }
            _ => AppError::Storage(format!("cannot read {}: {e}", path.display())),
        })
    }

    pub fn remove(&self, bucket: Bucket, key: &str) -> AppResult<bool> {
        let path = self.object_path(bucket, key)?;
        match std::fs::remove_file(&path) {
            Ok(()) => Ok(true),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(false),
            Err(e) => Err(AppError::Storage(format!("cannot remove {}: {e}", path.display()))),
        }
    }

    pub fn public_url(&self, bucket: Bucket, key: &str) -> AppResult<String> {
        let path = self.object_path(bucket, key)?;
        Ok(format!("file://{}", path.to_string_lossy().replace('\\', "/")))
    }
}

/// A failed write removes the partial object so the key stays free.
fn write_or_discard(path: &Path, out: &mut impl Write, bytes: &[u8]) -> AppResult<()> {
    match out.write_all(bytes).and_then(|()| out.flush()) {
        Ok(()) => Ok(()),
        Err(e) => {
            if let Err(cleanup) = std::fs::remove_file(path) {
                tracing::warn!(path = %path.display(), error = %cleanup, "could not remove partial object");
            }
            Err(AppError::Storage(format!("cannot write {}: {e}", path.display())))
        }
    }
}

fn validate_key(key: &str) -> AppResult<()> {
    if key.trim().is_empty() {
        return Err(AppError::InvalidInput("object key cannot be empty".to_string()));
    }
    let path = Path::new(key);
    let escapes = path
        .components()
        .any(|c| !matches!(c, Component::Normal(_)));
    if escapes || key.contains('\\') {
        return Err(AppError::InvalidInput(format!("invalid object key {key}")));
    }
    Ok(())
}
