//! Job binaries uploaded into the subsystem's own store (`internal-db://<uuid>`)

use async_trait::async_trait;
use bytes::Bytes;
use tracing::{debug, info};
use url::Url;
use uuid::Uuid;

use super::error::JobBinaryError;
use super::traits::JobBinaryType;
use super::types::{JobBinaryReference, ObjectCoordinates, RetrievalContext, ValidationContext};
use crate::fetcher::SizeGuardedFetcher;
use crate::storage::StorageClient;

pub const INTERNAL_DB_SCHEME: &str = "internal-db";
pub const INTERNAL_DB_PREFIX: &str = "internal-db://";

const INTERNAL_CONTAINER: &str = "job-binaries";

#[derive(Clone)]
pub struct InternalDbType {
    store: StorageClient,
    fetcher: SizeGuardedFetcher,
}

impl InternalDbType {
    pub fn new(store: StorageClient, fetcher: SizeGuardedFetcher) -> Self {
        Self { store, fetcher }
    }

    fn binary_id(url: &str) -> Result<Uuid, JobBinaryError> {
        if url.is_empty() {
            return Err(JobBinaryError::bad_reference(
                "internal data base url must not be empty",
            ));
        }

        let parsed = Url::parse(url)
            .map_err(|e| JobBinaryError::bad_reference(format!("invalid url '{url}': {e}")))?;

        if parsed.scheme() != INTERNAL_DB_SCHEME {
            return Err(JobBinaryError::bad_reference(format!(
                "url scheme must be '{INTERNAL_DB_SCHEME}'"
            )));
        }

        if !parsed.path().is_empty() && parsed.path() != "/" {
            return Err(JobBinaryError::bad_reference(format!(
                "internal data base url must contain only an id: {url}"
            )));
        }

        parsed
            .host_str()
            .and_then(|host| Uuid::parse_str(host).ok())
            .ok_or_else(|| {
                JobBinaryError::bad_reference(format!(
                    "internal data base url netloc must be a uuid: {url}"
                ))
            })
    }

    fn coordinates(id: Uuid) -> ObjectCoordinates {
        ObjectCoordinates::new(INTERNAL_CONTAINER, id.to_string())
    }

    /// Store a new artifact and return its `internal-db://` URL
    pub async fn upload(&self, data: Bytes) -> Result<String, JobBinaryError> {
        self.fetcher.settings().limit.check(data.len() as u64)?;

        let id = Uuid::new_v4();
        let coords = Self::coordinates(id);
        self.store
            .upload(&coords.container, &coords.object, data)
            .await
            .map_err(|e| JobBinaryError::backend(e.to_string()))?;

        let url = format!("{INTERNAL_DB_PREFIX}{id}");
        info!(url, "Stored internal job binary");
        Ok(url)
    }
}

#[async_trait]
impl JobBinaryType for InternalDbType {
    fn scheme(&self) -> &'static str {
        INTERNAL_DB_SCHEME
    }

    fn validate_url(&self, url: &str) -> bool {
        Self::binary_id(url).is_ok()
    }

    async fn validate(
        &self,
        reference: &JobBinaryReference,
        _ctx: &ValidationContext,
    ) -> Result<(), JobBinaryError> {
        let id = Self::binary_id(&reference.url)?;
        let coords = Self::coordinates(id);

        let exists = self
            .store
            .exists(&coords.container, &coords.object)
            .await
            .map_err(|e| JobBinaryError::backend(e.to_string()))?;

        if !exists {
            return Err(JobBinaryError::bad_reference(format!(
                "internal job binary {id} does not exist"
            )));
        }
        Ok(())
    }

    async fn fetch(
        &self,
        reference: &JobBinaryReference,
        ctx: &RetrievalContext,
    ) -> Result<Bytes, JobBinaryError> {
        let id = Self::binary_id(&reference.url)?;
        debug!(%id, "Fetching internal job binary");

        self.fetcher
            .fetch_with(&self.store, &Self::coordinates(id), &ctx.cancel)
            .await
    }
}
