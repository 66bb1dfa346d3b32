//! services/api/src/adapters/storage.rs
//!
//! A `FileStorage` adapter that keeps objects on the local filesystem under
//! `<root>/<bucket>/<path>` and hands out opaque, expiring download tokens.
//! The tokens are served back through `GET /files/{token}`.

use async_trait::async_trait;
use bytes::Bytes;
use chrono::{DateTime, Duration, Utc};
use std::collections::HashMap;
use std::path::{Component, Path, PathBuf};
use study_market_core::ports::{FileStorage, PortError, PortResult};
use tokio::io::AsyncWriteExt;
use tokio::sync::RwLock;
use tracing::{debug, info};
use uuid::Uuid;

struct SignedObject {
    location: PathBuf,
    expires_at: DateTime<Utc>,
}

pub struct LocalFileStorage {
    root: PathBuf,
    public_base_url: String,
    signed: RwLock<HashMap<String, SignedObject>>,
}

impl LocalFileStorage {
    pub fn new(root: impl Into<PathBuf>, public_base_url: impl Into<String>) -> Self {
        Self {
            root: root.into(),
            public_base_url: public_base_url.into().trim_end_matches('/').to_string(),
            signed: RwLock::new(HashMap::new()),
        }
    }

    /// Resolves `bucket/path` below the root, refusing anything that could escape it.
    fn locate(&self, bucket: &str, path: &str) -> PortResult<PathBuf> {
        let relative = Path::new(bucket).join(path);
        let is_plain = relative
            .components()
            .all(|c| matches!(c, Component::Normal(_)));
        if bucket.is_empty() || path.is_empty() || !is_plain {
            return Err(PortError::Unexpected(format!(
                "Invalid object path '{}/{}'",
                bucket, path
            )));
        }
        Ok(self.root.join(relative))
    }

    /// Drops every token whose lifetime has passed. Returns how many were removed.
    pub async fn purge_expired(&self, now: DateTime<Utc>) -> usize {
        let mut signed = self.signed.write().await;
        let before = signed.len();
        signed.retain(|_, object| object.expires_at > now);
        let purged = before - signed.len();
        if purged > 0 {
            debug!("Purged {} expired download tokens", purged);
        }
        purged
    }
}

#[async_trait]
impl FileStorage for LocalFileStorage {
    async fn upload(&self, bucket: &str, path: &str, data: Bytes) -> PortResult<()> {
        let location = self.locate(bucket, path)?;
        if let Some(parent) = location.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| PortError::Unexpected(e.to_string()))?;
        }

        // `create_new` fails when the object already exists.
        let mut file = tokio::fs::OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&location)
            .await
            .map_err(|e| match e.kind() {
                std::io::ErrorKind::AlreadyExists => {
                    PortError::Conflict(format!("Object '{}/{}' already exists", bucket, path))
                }
                _ => PortError::Unexpected(e.to_string()),
            })?;
        file.write_all(&data)
            .await
            .map_err(|e| PortError::Unexpected(e.to_string()))?;
        file.flush()
            .await
            .map_err(|e| PortError::Unexpected(e.to_string()))?;

        info!("Stored {} bytes at {}/{}", data.len(), bucket, path);
        Ok(())
    }

    async fn create_signed_url(
        &self,
        bucket: &str,
        path: &str,
        expires_in: Duration,
    ) -> PortResult<String> {
        let location = self.locate(bucket, path)?;
        if !tokio::fs::try_exists(&location).await.unwrap_or(false) {
            return Err(PortError::NotFound(format!(
                "Object '{}/{}' not found",
                bucket, path
            )));
        }

        let token = Uuid::new_v4().simple().to_string();
        self.signed.write().await.insert(
            token.clone(),
            SignedObject {
                location,
                expires_at: Utc::now() + expires_in,
            },
        );
        Ok(format!("{}/files/{}", self.public_base_url, token))
    }

    async fn read_signed(&self, token: &str) -> PortResult<Bytes> {
        let location = {
            let signed = self.signed.read().await;
            match signed.get(token) {
                Some(object) if object.expires_at > Utc::now() => object.location.clone(),
                Some(_) => {
                    return Err(PortError::NotFound("Download link has expired".to_string()))
                }
                None => return Err(PortError::NotFound("Download link not found".to_string())),
            }
        };

        let data = tokio::fs::read(&location)
            .await
            .map_err(|e| PortError::Unexpected(e.to_string()))?;
        Ok(Bytes::from(data))
    }

    async fn remove(&self, bucket: &str, path: &str) -> PortResult<()> {
        let location = self.locate(bucket, path)?;
        tokio::fs::remove_file(&location)
            .await
            .map_err(|e| match e.kind() {
                std::io::ErrorKind::NotFound => {
                    PortError::NotFound(format!("Object '{}/{}' not found", bucket, path))
                }
                _ => PortError::Unexpected(e.to_string()),
            })?;
        info!("Removed {}/{}", bucket, path);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn temp_storage() -> (LocalFileStorage, PathBuf) {
        let root = std::env::temp_dir().join(format!("study-market-{}", Uuid::new_v4()));
        (LocalFileStorage::new(&root, "http://localhost:3000/"), root)
    }

    fn token_of(url: &str) -> &str {
        url.rsplit('/').next().unwrap()
    }

    #[tokio::test]
    async fn uploads_can_be_read_back_through_a_signed_url() {
        let (storage, root) = temp_storage();
        storage
            .upload("notes-files", "seller/main/1.pdf", Bytes::from_static(b"%PDF"))
            .await
            .unwrap();

        let url = storage
            .create_signed_url("notes-files", "seller/main/1.pdf", Duration::hours(1))
            .await
            .unwrap();
        assert!(url.starts_with("http://localhost:3000/files/"));

        let data = storage.read_signed(token_of(&url)).await.unwrap();
        assert_eq!(&data[..], b"%PDF");
        let _ = std::fs::remove_dir_all(root);
    }

    #[tokio::test]
    async fn existing_objects_are_not_overwritten() {
        let (storage, root) = temp_storage();
        storage
            .upload("order-files", "u/o/brief.docx", Bytes::from_static(b"one"))
            .await
            .unwrap();
        let err = storage
            .upload("order-files", "u/o/brief.docx", Bytes::from_static(b"two"))
            .await
            .unwrap_err();
        assert!(matches!(err, PortError::Conflict(_)));
        let _ = std::fs::remove_dir_all(root);
    }

    #[tokio::test]
    async fn removed_objects_free_their_path() {
        let (storage, root) = temp_storage();
        storage
            .upload("notes-files", "s/main/3.pdf", Bytes::from_static(b"old"))
            .await
            .unwrap();
        storage.remove("notes-files", "s/main/3.pdf").await.unwrap();
        assert!(matches!(
            storage.remove("notes-files", "s/main/3.pdf").await,
            Err(PortError::NotFound(_))
        ));
        storage
            .upload("notes-files", "s/main/3.pdf", Bytes::from_static(b"new"))
            .await
            .unwrap();
        let _ = std::fs::remove_dir_all(root);
    }

    #[tokio::test]
    async fn paths_cannot_escape_the_root() {
        let (storage, _root) = temp_storage();
        for path in ["../secret", "/etc/passwd", "a/../../b", ""] {
            assert!(storage
                .upload("notes-files", path, Bytes::from_static(b"x"))
                .await
                .is_err());
        }
    }

    #[tokio::test]
    async fn expired_tokens_are_refused_and_purged() {
        let (storage, root) = temp_storage();
        storage
            .upload("notes-files", "s/main/2.pdf", Bytes::from_static(b"data"))
            .await
            .unwrap();
        let url = storage
            .create_signed_url("notes-files", "s/main/2.pdf", Duration::seconds(-1))
            .await
            .unwrap();

        assert!(matches!(
            storage.read_signed(token_of(&url)).await,
            Err(PortError::NotFound(_))
        ));
        assert_eq!(storage.purge_expired(Utc::now()).await, 1);
        assert!(storage.read_signed("unknown").await.is_err());
        let _ = std::fs::remove_dir_all(root);
    }

    #[tokio::test]
    async fn signing_a_missing_object_fails() {
        let (storage, _root) = temp_storage();
        let err = storage
            .create_signed_url("notes-files", "nobody/main/0.pdf", Duration::hours(1))
            .await
            .unwrap_err();
        assert!(matches!(err, PortError::NotFound(_)));
    }
}
