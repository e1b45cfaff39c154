use async_trait::async_trait;
use bytes::Bytes;

use super::error::JobBinaryError;
use super::types::{JobBinaryReference, RetrievalContext, StageContext, ValidationContext};
use crate::remote;

/// Capabilities every job binary backend provides
///
/// Implementations are stateless apart from injected collaborators and are
/// shared across concurrent retrievals.
#[async_trait]
pub trait JobBinaryType: Send + Sync {
    /// Scheme token this backend owns (`swift`, `internal-db`, ...)
    fn scheme(&self) -> &'static str;

    /// Shallow syntactic check of a job binary URL
    fn validate_url(&self, url: &str) -> bool;

    /// Validate a job binary on creation or update
    async fn validate(
        &self,
        reference: &JobBinaryReference,
        ctx: &ValidationContext,
    ) -> Result<(), JobBinaryError>;

    /// Retrieve the raw artifact bytes
    async fn fetch(
        &self,
        reference: &JobBinaryReference,
        ctx: &RetrievalContext,
    ) -> Result<Bytes, JobBinaryError>;

    /// Place fetched bytes under `destination` on the remote host; returns the final path
    async fn stage(
        &self,
        reference: &JobBinaryReference,
        data: Bytes,
        destination: &str,
        ctx: &StageContext,
    ) -> Result<String, JobBinaryError> {
        remote::stage_bytes(reference, data, destination, ctx).await
    }

    /// Fetch then stage; the destination is derived before any download
    async fn copy_binary_to_cluster(
        &self,
        reference: &JobBinaryReference,
        destination: &str,
        retrieval: &RetrievalContext,
        staging: &StageContext,
    ) -> Result<String, JobBinaryError> {
        let path = remote::destination_path(reference, destination)?;
        let data = self.fetch(reference, retrieval).await?;
        remote::stage_bytes_at(path, data, staging).await
    }
}
