//! Object storage backed by the `object_store` crate
//!
//! [`StorageClient`] speaks the [`ObjectClient`] protocol over any
//! `object_store` backend (local filesystem for development, in-memory for
//! tests). Objects live at `<prefix>/<container>/<object>`.

use async_trait::async_trait;
use bytes::Bytes;
use object_store::{ObjectStore, local::LocalFileSystem, memory::InMemory, path::Path as StoragePath};
use std::path::Path;
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, info};

use crate::backend::{ClientError, ObjectClient, ObjectHeaders, RetrievalSession, SessionFactory};
use crate::credentials::SessionCredentials;

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Failed to prepare storage root {path}: {source}")]
    Root {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Object store error: {0}")]
    ObjectStoreError(#[from] object_store::Error),
}

/// Storage result type
pub type Result<T> = std::result::Result<T, StorageError>;

/// Metadata returned after upload
#[derive(Debug, Clone)]
pub struct UploadMetadata {
    pub key: String,
    pub etag: Option<String>,
    pub size: usize,
}

/// Storage client wrapping object_store
#[derive(Clone)]
pub struct StorageClient {
    store: Arc<dyn ObjectStore>,
    prefix: String,
}

impl StorageClient {
    /// Create new storage client with any object_store backend
    pub fn new(store: Arc<dyn ObjectStore>, prefix: impl Into<String>) -> Self {
        Self {
            store,
            prefix: prefix.into(),
        }
    }

    /// Create in-memory storage for testing/development
    pub fn in_memory(prefix: impl Into<String>) -> Self {
        Self::new(Arc::new(InMemory::new()), prefix)
    }

    /// Filesystem storage rooted at `root`, created if missing
    pub fn local(root: &Path, prefix: impl Into<String>) -> Result<Self> {
        std::fs::create_dir_all(root).map_err(|source| StorageError::Root {
            path: root.display().to_string(),
            source,
        })?;
        let store = LocalFileSystem::new_with_prefix(root)?;
        Ok(Self::new(Arc::new(store), prefix))
    }

    /// Same underlying store under a different key prefix
    pub fn with_prefix(&self, prefix: impl Into<String>) -> Self {
        Self::new(self.store.clone(), prefix)
    }

    fn key(&self, container: &str, object: &str) -> String {
        if self.prefix.is_empty() {
            format!("{container}/{object}")
        } else {
            format!("{}/{container}/{object}", self.prefix)
        }
    }

    /// Upload bytes to storage
    pub async fn upload(&self, container: &str, object: &str, data: Bytes) -> Result<UploadMetadata> {
        let key = self.key(container, object);
        let path = StoragePath::from(key.as_str());
        let size = data.len();

        let put_result = self.store.put(&path, data.into()).await?;

        info!(key, size, "Uploaded to storage");

        Ok(UploadMetadata {
            key,
            etag: put_result.e_tag.clone(),
            size,
        })
    }

    /// Check if an object exists
    pub async fn exists(&self, container: &str, object: &str) -> Result<bool> {
        let path = StoragePath::from(self.key(container, object).as_str());

        match self.store.head(&path).await {
            Ok(_) => Ok(true),
            Err(object_store::Error::NotFound { .. }) => Ok(false),
            Err(e) => Err(e.into()),
        }
    }
}

fn client_error(container: &str, object: &str, err: object_store::Error) -> ClientError {
    match err {
        object_store::Error::NotFound { .. } => ClientError::NotFound {
            container: container.to_string(),
            object: object.to_string(),
        },
        object_store::Error::PermissionDenied { .. }
        | object_store::Error::Unauthenticated { .. } => ClientError::Unauthorized(err.to_string()),
        other => ClientError::Transport(other.to_string()),
    }
}

fn headers_from_meta(meta: &object_store::ObjectMeta) -> ObjectHeaders {
    let mut headers = ObjectHeaders::with_content_length(meta.size as u64);
    if let Some(etag) = &meta.e_tag {
        headers.insert("etag", etag.clone());
    }
    headers
}

#[async_trait]
impl ObjectClient for StorageClient {
    async fn head_object(
        &self,
        container: &str,
        object: &str,
    ) -> std::result::Result<ObjectHeaders, ClientError> {
        let path = StoragePath::from(self.key(container, object).as_str());
        let meta = self
            .store
            .head(&path)
            .await
            .map_err(|e| client_error(container, object, e))?;

        Ok(headers_from_meta(&meta))
    }

    async fn get_object(
        &self,
        container: &str,
        object: &str,
    ) -> std::result::Result<(ObjectHeaders, Bytes), ClientError> {
        let path = StoragePath::from(self.key(container, object).as_str());
        let result = self
            .store
            .get(&path)
            .await
            .map_err(|e| client_error(container, object, e))?;

        let headers = headers_from_meta(&result.meta);
        let bytes = result
            .bytes()
            .await
            .map_err(|e| client_error(container, object, e))?;

        debug!(container, object, size = bytes.len(), "Downloaded from storage");

        Ok((headers, bytes))
    }
}

/// Opens sessions on a [`StorageClient`]
///
/// The filesystem and in-memory stores have no authentication of their own;
/// the factory only rejects credentials that could never authenticate.
#[derive(Clone)]
pub struct StorageSessionFactory {
    client: StorageClient,
}

impl StorageSessionFactory {
    pub fn new(client: StorageClient) -> Self {
        Self { client }
    }
}

#[async_trait]
impl SessionFactory for StorageSessionFactory {
    async fn open(
        &self,
        credentials: &SessionCredentials,
    ) -> std::result::Result<RetrievalSession, ClientError> {
        match credentials {
            SessionCredentials::Ambient(auth) => {
                debug!(project_id = %auth.project_id, "Opening storage session from context");
            }
            SessionCredentials::Password {
                username, password, ..
            } => {
                if username.is_empty() || password.expose().is_empty() {
                    return Err(ClientError::Unauthorized(
                        "empty username or password".to_string(),
                    ));
                }
                debug!(username = %username, "Opening storage session");
            }
        }

        Ok(Box::new(self.client.clone()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::secrets::SecretString;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_upload_then_head_and_get() {
        let client = StorageClient::in_memory("swift");
        client
            .upload("jobs", "wordcount.jar", Bytes::from_static(b"jar-bytes"))
            .await
            .unwrap();

        let headers = client.head_object("jobs", "wordcount.jar").await.unwrap();
        assert_eq!(headers.content_length().unwrap(), 9);

        let (_, body) = client.get_object("jobs", "wordcount.jar").await.unwrap();
        assert_eq!(&body[..], b"jar-bytes");
        assert!(client.exists("jobs", "wordcount.jar").await.unwrap());
    }

    #[tokio::test]
    async fn test_missing_object_maps_to_not_found() {
        let client = StorageClient::in_memory("swift");

        let err = client.head_object("jobs", "missing.jar").await.unwrap_err();
        assert!(matches!(err, ClientError::NotFound { .. }));
        assert!(!client.exists("jobs", "missing.jar").await.unwrap());
    }

    #[tokio::test]
    async fn test_local_storage_roundtrip() {
        let temp_dir = TempDir::new().unwrap();
        let client = StorageClient::local(&temp_dir.path().join("objects"), "swift").unwrap();

        client
            .upload("jobs", "nested/script.pig", Bytes::from_static(b"A = LOAD"))
            .await
            .unwrap();

        let (_, body) = client.get_object("jobs", "nested/script.pig").await.unwrap();
        assert_eq!(&body[..], b"A = LOAD");
    }

    #[tokio::test]
    async fn test_prefixes_are_isolated() {
        let swift = StorageClient::in_memory("swift");
        let internal = swift.with_prefix("internal");

        swift
            .upload("c", "o", Bytes::from_static(b"x"))
            .await
            .unwrap();

        assert!(!internal.exists("c", "o").await.unwrap());
    }

    #[tokio::test]
    async fn test_session_factory_rejects_empty_password() {
        let factory = StorageSessionFactory::new(StorageClient::in_memory("swift"));
        let creds = SessionCredentials::Password {
            username: "alice".to_string(),
            password: SecretString::new(""),
            trust_id: None,
        };

        let result = factory.open(&creds).await;
        assert!(matches!(result, Err(ClientError::Unauthorized(_))));
    }
}
