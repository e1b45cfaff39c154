//! Backend network client boundary
//!
//! [`ObjectClient`] is the surface the retrieval path speaks to; concrete
//! clients live elsewhere ([`crate::storage`] provides one over `object_store`).
//! [`ClientError`] is backend-specific and is translated into
//! [`crate::binaries::JobBinaryError`] before it reaches callers.

use async_trait::async_trait;
use bytes::Bytes;
use std::collections::BTreeMap;
use thiserror::Error;

use crate::credentials::SessionCredentials;

pub const CONTENT_LENGTH: &str = "content-length";

#[derive(Debug, Error)]
pub enum ClientError {
    #[error("object not found: {container}/{object}")]
    NotFound { container: String, object: String },

    #[error("authentication failed: {0}")]
    Unauthorized(String),

    #[error("transport error: {0}")]
    Transport(String),

    #[error("invalid response: {0}")]
    InvalidResponse(String),
}

/// Response headers of an object, keys lower-cased
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ObjectHeaders(BTreeMap<String, String>);

impl ObjectHeaders {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, name: impl AsRef<str>, value: impl Into<String>) {
        self.0.insert(name.as_ref().to_ascii_lowercase(), value.into());
    }

    pub fn with_content_length(length: u64) -> Self {
        let mut headers = Self::new();
        headers.insert(CONTENT_LENGTH, length.to_string());
        headers
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.0.get(&name.to_ascii_lowercase()).map(String::as_str)
    }

    /// Declared body length; a missing header counts as zero
    pub fn content_length(&self) -> Result<u64, ClientError> {
        match self.get(CONTENT_LENGTH) {
            None => Ok(0),
            Some(raw) => raw.trim().parse().map_err(|_| {
                ClientError::InvalidResponse(format!("bad content-length header: {raw}"))
            }),
        }
    }
}

/// Object-storage client operations needed for retrieval
#[async_trait]
pub trait ObjectClient: Send + Sync {
    /// Lightweight metadata request
    async fn head_object(&self, container: &str, object: &str)
    -> Result<ObjectHeaders, ClientError>;

    /// Full body download
    async fn get_object(
        &self,
        container: &str,
        object: &str,
    ) -> Result<(ObjectHeaders, Bytes), ClientError>;
}

/// Authenticated connection to a backend, owned by a single retrieval.
/// Dropping it releases the connection.
pub type RetrievalSession = Box<dyn ObjectClient>;

/// Opens authenticated sessions against an object-storage backend
#[async_trait]
pub trait SessionFactory: Send + Sync {
    async fn open(&self, credentials: &SessionCredentials)
    -> Result<RetrievalSession, ClientError>;
}
