//! Object storage for product images.
//!
//! An upload takes a key such as `products/1718000000000-chips.jpg` and the
//! raw bytes, and returns a public URL for the stored object.

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use async_trait::async_trait;
use secrecy::{ExposeSecret, SecretString};
use thiserror::Error;
use tokio::sync::Mutex;

/// Errors from an object storage backend.
#[derive(Debug, Error)]
pub enum ObjectStorageError {
    #[error("invalid object key: {0}")]
    InvalidKey(String),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("upload request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("upload rejected with status {0}")]
    Rejected(u16),

    #[error("object storage unavailable: {0}")]
    Unavailable(String),
}

/// Somewhere to put uploaded files.
#[async_trait]
pub trait ObjectStorage: Send + Sync {
    /// Store `bytes` under `key` and return the object's public URL.
    async fn upload(
        &self,
        key: &str,
        content_type: &str,
        bytes: Vec<u8>,
    ) -> Result<String, ObjectStorageError>;
}

/// Storage key for a product image: `products/{millis}-{basename}`.
#[must_use]
pub fn product_image_key(millis: i64, filename: &str) -> String {
    let basename = filename
        .rsplit(['/', '\\'])
        .next()
        .map(str::trim)
        .filter(|name| !name.is_empty() && *name != "." && *name != "..")
        .unwrap_or("image");
    format!("products/{millis}-{basename}")
}

fn validate_key(key: &str) -> Result<(), ObjectStorageError> {
    if key.is_empty()
        || key.starts_with('/')
        || key.split('/').any(|segment| segment.is_empty() || segment == "..")
    {
        return Err(ObjectStorageError::InvalidKey(key.to_owned()));
    }
    Ok(())
}

/// Join a base URL and a key, percent-encoding each key segment.
fn public_url(base: &str, key: &str) -> String {
    let encoded: Vec<_> = key
        .split('/')
        .map(|segment| urlencoding::encode(segment).into_owned())
        .collect();
    format!("{}/{}", base.trim_end_matches('/'), encoded.join("/"))
}

/// Writes objects below a local directory served at `public_base_url`.
#[derive(Debug, Clone)]
pub struct FsObjectStorage {
    root: PathBuf,
    public_base_url: String,
}

impl FsObjectStorage {
    #[must_use]
    pub fn new(root: impl Into<PathBuf>, public_base_url: impl Into<String>) -> Self {
        Self {
            root: root.into(),
            public_base_url: public_base_url.into(),
        }
    }
}

#[async_trait]
impl ObjectStorage for FsObjectStorage {
    async fn upload(
        &self,
        key: &str,
        _content_type: &str,
        bytes: Vec<u8>,
    ) -> Result<String, ObjectStorageError> {
        validate_key(key)?;
        let path = self.root.join(key);
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        tokio::fs::write(&path, bytes).await?;
        tracing::info!(key, path = %path.display(), "stored object on disk");
        Ok(public_url(&self.public_base_url, key))
    }
}

/// Uploads objects with an HTTP `PUT` to an S3-style bucket endpoint.
pub struct HttpObjectStorage {
    client: reqwest::Client,
    endpoint: String,
    token: Option<SecretString>,
    public_base_url: String,
}

impl HttpObjectStorage {
    #[must_use]
    pub fn new(
        client: reqwest::Client,
        endpoint: impl Into<String>,
        token: Option<SecretString>,
        public_base_url: impl Into<String>,
    ) -> Self {
        Self {
            client,
            endpoint: endpoint.into(),
            token,
            public_base_url: public_base_url.into(),
        }
    }
}

impl std::fmt::Debug for HttpObjectStorage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HttpObjectStorage")
            .field("endpoint", &self.endpoint)
            .field("token", &self.token.as_ref().map(|_| "[REDACTED]"))
            .field("public_base_url", &self.public_base_url)
            .finish_non_exhaustive()
    }
}

#[async_trait]
impl ObjectStorage for HttpObjectStorage {
    async fn upload(
        &self,
        key: &str,
        content_type: &str,
        bytes: Vec<u8>,
    ) -> Result<String, ObjectStorageError> {
        validate_key(key)?;
        let mut request = self
            .client
            .put(public_url(&self.endpoint, key))
            .header(reqwest::header::CONTENT_TYPE, content_type)
            .body(bytes);
        if let Some(token) = &self.token {
            request = request.bearer_auth(token.expose_secret());
        }

        let response = request.send().await?;
        let status = response.status();
        if !status.is_success() {
            tracing::warn!(key, status = status.as_u16(), "object upload rejected");
            return Err(ObjectStorageError::Rejected(status.as_u16()));
        }
        Ok(public_url(&self.public_base_url, key))
    }
}

/// A stored object held by [`MemoryObjectStorage`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredObject {
    pub content_type: String,
    pub bytes: Vec<u8>,
}

/// In-process object storage for tests. Clones share state.
#[derive(Debug, Clone)]
pub struct MemoryObjectStorage {
    objects: Arc<Mutex<HashMap<String, StoredObject>>>,
    uploads: Arc<AtomicUsize>,
    fail: Arc<AtomicBool>,
    public_base_url: String,
}

impl Default for MemoryObjectStorage {
    fn default() -> Self {
        Self::new("https://objects.test")
    }
}

impl MemoryObjectStorage {
    #[must_use]
    pub fn new(public_base_url: impl Into<String>) -> Self {
        Self {
            objects: Arc::default(),
            uploads: Arc::default(),
            fail: Arc::default(),
            public_base_url: public_base_url.into(),
        }
    }

    /// Number of successful uploads.
    #[must_use]
    pub fn upload_count(&self) -> usize {
        self.uploads.load(Ordering::SeqCst)
    }

    /// Make subsequent uploads fail.
    pub fn set_fail(&self, fail: bool) {
        self.fail.store(fail, Ordering::SeqCst);
    }

    pub async fn object(&self, key: &str) -> Option<StoredObject> {
        self.objects.lock().await.get(key).cloned()
    }
}

#[async_trait]
impl ObjectStorage for MemoryObjectStorage {
    async fn upload(
        &self,
        key: &str,
        content_type: &str,
        bytes: Vec<u8>,
    ) -> Result<String, ObjectStorageError> {
        validate_key(key)?;
        if self.fail.load(Ordering::SeqCst) {
            return Err(ObjectStorageError::Unavailable("uploads disabled".to_owned()));
        }
        self.objects.lock().await.insert(
            key.to_owned(),
            StoredObject {
                content_type: content_type.to_owned(),
                bytes,
            },
        );
        self.uploads.fetch_add(1, Ordering::SeqCst);
        Ok(public_url(&self.public_base_url, key))
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_product_image_key() {
        assert_eq!(
            product_image_key(1_718_000_000_000, "chips.jpg"),
            "products/1718000000000-chips.jpg"
        );
        assert_eq!(
            product_image_key(5, "C:\\Users\\me\\cola.png"),
            "products/5-cola.png"
        );
        assert_eq!(product_image_key(5, "../"), "products/5-image");
    }

    #[test]
    fn test_validate_key() {
        assert!(validate_key("products/1-a.jpg").is_ok());
        assert!(validate_key("").is_err());
        assert!(validate_key("/etc/passwd").is_err());
        assert!(validate_key("products/../../x").is_err());
        assert!(validate_key("products//x").is_err());
    }

    #[test]
    fn test_public_url_encodes_segments() {
        assert_eq!(
            public_url("https://cdn.test/", "products/1-my chips.jpg"),
            "https://cdn.test/products/1-my%20chips.jpg"
        );
    }

    #[tokio::test]
    async fn test_memory_storage_counts_and_fails() {
        let storage = MemoryObjectStorage::default();
        let url = storage
            .upload("products/1-a.jpg", "image/jpeg", vec![1, 2, 3])
            .await
            .unwrap();
        assert_eq!(url, "https://objects.test/products/1-a.jpg");
        assert_eq!(storage.upload_count(), 1);
        assert_eq!(
            storage.object("products/1-a.jpg").await.unwrap().bytes,
            vec![1, 2, 3]
        );

        storage.set_fail(true);
        assert!(storage.upload("products/2-b.jpg", "image/jpeg", vec![]).await.is_err());
        assert_eq!(storage.upload_count(), 1);
    }

    #[tokio::test]
    async fn test_fs_storage_writes_below_root() {
        let root = std::env::temp_dir().join(format!("pgd-objects-{}", uuid::Uuid::new_v4()));
        let storage = FsObjectStorage::new(&root, "/uploads");
        let url = storage
            .upload("products/1-a.jpg", "image/jpeg", b"jpeg".to_vec())
            .await
            .unwrap();
        assert_eq!(url, "/uploads/products/1-a.jpg");
        let written = tokio::fs::read(root.join("products/1-a.jpg")).await.unwrap();
        assert_eq!(written, b"jpeg");
        tokio::fs::remove_dir_all(&root).await.unwrap();
    }
}
