//! Upload storage: a local directory served by the app, or an S3 bucket.

use crate::config::StorageConfig;
use crate::error::AppError;
use async_trait::async_trait;
use aws_sdk_s3::error::DisplayErrorContext;
use aws_sdk_s3::primitives::ByteStream;
use aws_sdk_s3::Client as S3Client;
use chrono::{DateTime, Datelike, Utc};
use std::path::{Component, Path, PathBuf};
use std::sync::Arc;
use uuid::Uuid;

#[async_trait]
pub trait AssetStore: Send + Sync {
    /// Store `bytes` under `key` and return the public URL.
    async fn put(&self, key: &str, bytes: Vec<u8>, content_type: &str) -> Result<String, AppError>;
}

/// Accepted upload types and the extension used for their keys.
pub fn extension_for(content_type: &str) -> Option<&'static str> {
    match content_type {
        "image/png" => Some("png"),
        "image/jpeg" => Some("jpg"),
        "image/webp" => Some("webp"),
        "application/pdf" => Some("pdf"),
        _ => None,
    }
}

/// True when the leading bytes agree with the declared content type.
pub fn magic_matches(content_type: &str, bytes: &[u8]) -> bool {
    match content_type {
        "image/png" => bytes.starts_with(b"\x89PNG\r\n\x1a\n"),
        "image/jpeg" => bytes.starts_with(&[0xFF, 0xD8, 0xFF]),
        "image/webp" => bytes.len() >= 12 && &bytes[0..4] == b"RIFF" && &bytes[8..12] == b"WEBP",
        "application/pdf" => bytes.starts_with(b"%PDF-"),
        _ => false,
    }
}

/// `<yyyy>/<mm>/<uuid>.<ext>`
pub fn object_key(now: DateTime<Utc>, ext: &str) -> String {
    format!("{:04}/{:02}/{}.{}", now.year(), now.month(), Uuid::new_v4(), ext)
}

fn public_url(base: &str, key: &str) -> String {
    format!("{}/{}", base.trim_end_matches('/'), key)
}

pub struct LocalStore {
    root: PathBuf,
    public_base: String,
}

impl LocalStore {
    pub fn new(root: impl Into<PathBuf>, public_base: impl Into<String>) -> Self {
        LocalStore {
            root: root.into(),
            public_base: public_base.into(),
        }
    }

    fn path_for(&self, key: &str) -> Result<PathBuf, AppError> {
        let rel = Path::new(key);
        if rel.components().any(|c| !matches!(c, Component::Normal(_))) {
            return Err(AppError::Storage(format!("refusing key outside upload dir: {}", key)));
        }
        Ok(self.root.join(rel))
    }
}

#[async_trait]
impl AssetStore for LocalStore {
    async fn put(&self, key: &str, bytes: Vec<u8>, _content_type: &str) -> Result<String, AppError> {
        let path = self.path_for(key)?;
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| AppError::Storage(format!("create {}: {}", parent.display(), e)))?;
        }
        tokio::fs::write(&path, &bytes)
            .await
            .map_err(|e| AppError::Storage(format!("write {}: {}", path.display(), e)))?;
        tracing::debug!(path = %path.display(), size = bytes.len(), "stored upload locally");
        Ok(public_url(&self.public_base, key))
    }
}

pub struct S3Store {
    client: S3Client,
    bucket: String,
    public_base: String,
}

impl S3Store {
    pub fn new(client: S3Client, bucket: impl Into<String>, public_base: impl Into<String>) -> Self {
        S3Store {
            client,
            bucket: bucket.into(),
            public_base: public_base.into(),
        }
    }
}

#[async_trait]
impl AssetStore for S3Store {
    async fn put(&self, key: &str, bytes: Vec<u8>, content_type: &str) -> Result<String, AppError> {
        let size = bytes.len();
        self.client
            .put_object()
            .bucket(&self.bucket)
            .key(key)
            .content_type(content_type)
            .body(ByteStream::from(bytes))
            .send()
            .await
            .map_err(|e| AppError::Storage(format!("s3 put {}: {}", key, DisplayErrorContext(&e))))?;
        tracing::debug!(bucket = %self.bucket, key = %key, size, "stored upload in s3");
        Ok(public_url(&self.public_base, key))
    }
}

/// Build the configured store. S3 credentials and region come from the standard AWS environment.
pub async fn from_config(config: &StorageConfig) -> Result<Arc<dyn AssetStore>, AppError> {
    match config {
        StorageConfig::Local { dir, public_base } => {
            tokio::fs::create_dir_all(dir)
                .await
                .map_err(|e| AppError::Storage(format!("create upload dir {}: {}", dir, e)))?;
            tracing::info!(dir = %dir, "using local upload storage");
            Ok(Arc::new(LocalStore::new(dir.clone(), public_base.clone())))
        }
        StorageConfig::S3 { bucket, public_base } => {
            let aws = aws_config::load_defaults(aws_config::BehaviorVersion::latest()).await;
            tracing::info!(bucket = %bucket, "using s3 upload storage");
            Ok(Arc::new(S3Store::new(S3Client::new(&aws), bucket.clone(), public_base.clone())))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn only_known_types_have_extensions() {
        assert_eq!(extension_for("image/jpeg"), Some("jpg"));
        assert_eq!(extension_for("application/pdf"), Some("pdf"));
        assert_eq!(extension_for("image/gif"), None);
        assert_eq!(extension_for("text/html"), None);
    }

    #[test]
    fn keys_are_partitioned_by_month() {
        let at = Utc.with_ymd_and_hms(2024, 3, 9, 12, 0, 0).unwrap();
        let key = object_key(at, "png");
        assert!(key.starts_with("2024/03/"));
        assert!(key.ends_with(".png"));
        let id = key.trim_start_matches("2024/03/").trim_end_matches(".png");
        assert!(Uuid::parse_str(id).is_ok());
    }

    #[test]
    fn magic_bytes_must_agree() {
        assert!(magic_matches("application/pdf", b"%PDF-1.7\n"));
        assert!(!magic_matches("image/png", b"%PDF-1.7\n"));
        assert!(magic_matches("image/webp", b"RIFF\0\0\0\0WEBPVP8 "));
    }

    #[test]
    fn local_store_rejects_traversal() {
        let store = LocalStore::new("/tmp/uploads", "/uploads");
        assert!(store.path_for("../etc/passwd").is_err());
        assert!(store.path_for("/abs").is_err());
        assert_eq!(store.path_for("2024/01/a.png").unwrap(), PathBuf::from("/tmp/uploads/2024/01/a.png"));
    }

    #[tokio::test]
    async fn local_store_writes_and_returns_url() {
        let dir = std::env::temp_dir().join(format!("unihub-store-{}", Uuid::new_v4()));
        let store = LocalStore::new(&dir, "/uploads/");
        let url = store.put("2024/05/x.pdf", b"%PDF-1.4".to_vec(), "application/pdf").await.unwrap();
        assert_eq!(url, "/uploads/2024/05/x.pdf");
        let written = tokio::fs::read(dir.join("2024/05/x.pdf")).await.unwrap();
        assert_eq!(written, b"%PDF-1.4");
        let _ = tokio::fs::remove_dir_all(&dir).await;
    }
}
