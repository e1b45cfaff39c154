//! Size-guarded retrieval of a single object
//!
//! The object's size is probed with a metadata request and checked against
//! [`SizeLimit`] before the body is requested, so an oversized artifact costs
//! one cheap round trip and nothing more. The downloaded body is checked
//! again, since the declared length may be absent or wrong. Every network
//! call races the caller's cancellation token and the configured timeout.
//! No retries.

use bytes::Bytes;
use std::fmt::Display;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::backend::{ObjectClient, SessionFactory};
use crate::binaries::{
    JobBinaryError, JobBinaryReference, ObjectCoordinates, RetrievalContext, RetrievalStage,
};
use crate::config::JobBinariesConfig;
use crate::credentials::CredentialResolver;
use crate::observability::Metrics;

/// Maximum artifact size, in kilobytes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SizeLimit {
    max_kb: u64,
}

impl SizeLimit {
    pub fn from_kb(max_kb: u64) -> Self {
        Self { max_kb }
    }

    pub fn max_kb(&self) -> u64 {
        self.max_kb
    }

    /// Sizes equal to the limit are accepted
    pub fn check(&self, size_bytes: u64) -> Result<(), JobBinaryError> {
        let total_kb = size_bytes as f64 / 1024.0;
        if total_kb > self.max_kb as f64 {
            return Err(JobBinaryError::ArtifactTooLarge {
                actual_kb: (total_kb * 10.0).round() / 10.0,
                limit_kb: self.max_kb,
            });
        }
        Ok(())
    }
}

/// Settings injected at construction; read-only during a retrieval
#[derive(Debug, Clone, Copy)]
pub struct FetchSettings {
    pub limit: SizeLimit,
    pub timeout: Duration,
}

impl FetchSettings {
    pub fn new(limit: SizeLimit, timeout: Duration) -> Self {
        Self { limit, timeout }
    }
}

impl From<&JobBinariesConfig> for FetchSettings {
    fn from(config: &JobBinariesConfig) -> Self {
        Self {
            limit: SizeLimit::from_kb(config.max_kb),
            timeout: Duration::from_secs(config.fetch_timeout_secs),
        }
    }
}

/// Run one backend call under cancellation and timeout
pub(crate) async fn guarded<T, E, F>(
    cancel: &CancellationToken,
    timeout: Duration,
    stage: RetrievalStage,
    fut: F,
) -> Result<T, JobBinaryError>
where
    E: Display,
    F: Future<Output = Result<T, E>>,
{
    tokio::select! {
        biased;
        _ = cancel.cancelled() => {
            debug!(%stage, "Retrieval cancelled");
            Err(JobBinaryError::Cancelled { stage })
        }
        result = tokio::time::timeout(timeout, fut) => match result {
            Ok(Ok(value)) => Ok(value),
            Ok(Err(e)) => Err(JobBinaryError::backend(e.to_string())),
            Err(_) => {
                warn!(%stage, timeout_secs = timeout.as_secs(), "Backend call timed out");
                Err(JobBinaryError::Cancelled { stage })
            }
        },
    }
}

/// Credentials → session → probe → size check → download
#[derive(Clone)]
pub struct SizeGuardedFetcher {
    settings: FetchSettings,
    credentials: CredentialResolver,
    sessions: Arc<dyn SessionFactory>,
    metrics: Arc<Metrics>,
}

impl SizeGuardedFetcher {
    pub fn new(
        settings: FetchSettings,
        credentials: CredentialResolver,
        sessions: Arc<dyn SessionFactory>,
        metrics: Arc<Metrics>,
    ) -> Self {
        Self {
            settings,
            credentials,
            sessions,
            metrics,
        }
    }

    pub fn settings(&self) -> FetchSettings {
        self.settings
    }

    /// Open a session for `reference` and fetch the object at `coords`.
    /// The session is dropped on every exit path.
    pub async fn fetch(
        &self,
        reference: &JobBinaryReference,
        coords: &ObjectCoordinates,
        ctx: &RetrievalContext,
    ) -> Result<Bytes, JobBinaryError> {
        let result: Result<Bytes, JobBinaryError> = async {
            let credentials = self.credentials.resolve(reference, ctx).await?;
            let session = guarded(
                &ctx.cancel,
                self.settings.timeout,
                RetrievalStage::OpenSession,
                self.sessions.open(&credentials),
            )
            .await?;
            drop(credentials);

            probe_and_download(session.as_ref(), coords, self.settings, &ctx.cancel).await
        }
        .await;

        self.record(&result);
        result
    }

    /// Fetch through an already-open client (no credential resolution)
    pub async fn fetch_with(
        &self,
        client: &dyn ObjectClient,
        coords: &ObjectCoordinates,
        cancel: &CancellationToken,
    ) -> Result<Bytes, JobBinaryError> {
        let result = probe_and_download(client, coords, self.settings, cancel).await;
        self.record(&result);
        result
    }

    fn record(&self, result: &Result<Bytes, JobBinaryError>) {
        match result {
            Ok(_) => self.metrics.fetch_succeeded(),
            Err(JobBinaryError::ArtifactTooLarge { .. }) => self.metrics.fetch_rejected(),
            Err(_) => self.metrics.fetch_failed(),
        }
    }
}

async fn probe_and_download(
    client: &dyn ObjectClient,
    coords: &ObjectCoordinates,
    settings: FetchSettings,
    cancel: &CancellationToken,
) -> Result<Bytes, JobBinaryError> {
    let container = coords.container.as_str();
    let object = coords.object.as_str();

    let headers = guarded(
        cancel,
        settings.timeout,
        RetrievalStage::Probe,
        client.head_object(container, object),
    )
    .await?;
    let size = headers
        .content_length()
        .map_err(|e| JobBinaryError::backend(e.to_string()))?;

    if let Err(e) = settings.limit.check(size) {
        warn!(
            container,
            object,
            size_bytes = size,
            limit_kb = settings.limit.max_kb(),
            "Job binary exceeds size limit"
        );
        return Err(e);
    }

    let (_, body) = guarded(
        cancel,
        settings.timeout,
        RetrievalStage::Download,
        client.get_object(container, object),
    )
    .await?;

    // Headers may be missing or understate the size
    if let Err(e) = settings.limit.check(body.len() as u64) {
        warn!(
            container,
            object,
            declared_bytes = size,
            size_bytes = body.len(),
            limit_kb = settings.limit.max_kb(),
            "Downloaded job binary exceeds size limit"
        );
        return Err(e);
    }

    info!(container, object, size = body.len(), "Fetched job binary");
    Ok(body)
}
