//! Staging fetched job binaries onto an execution host

use async_trait::async_trait;
use bytes::Bytes;
use std::path::{Component, Path, PathBuf};
use thiserror::Error;
use tracing::info;

use crate::binaries::{JobBinaryError, JobBinaryReference, RetrievalStage, StageContext};

#[derive(Debug, Error)]
pub enum RemoteWriteError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("invalid destination: {0}")]
    InvalidDestination(String),

    #[error("remote command failed: {0}")]
    Remote(String),
}

/// Remote-execution file writer for one host
#[async_trait]
pub trait RemoteWriter: Send + Sync {
    async fn write_file(&self, path: &str, data: Bytes) -> Result<(), RemoteWriteError>;
}

/// Writes "remote" files below a local root directory
#[derive(Debug, Clone)]
pub struct LocalRemote {
    root: PathBuf,
}

impl LocalRemote {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    fn resolve(&self, path: &str) -> Result<PathBuf, RemoteWriteError> {
        let relative = Path::new(path.trim_start_matches('/'));
        if relative
            .components()
            .any(|c| !matches!(c, Component::Normal(_)))
        {
            return Err(RemoteWriteError::InvalidDestination(path.to_string()));
        }
        Ok(self.root.join(relative))
    }
}

#[async_trait]
impl RemoteWriter for LocalRemote {
    async fn write_file(&self, path: &str, data: Bytes) -> Result<(), RemoteWriteError> {
        let target = self.resolve(path)?;
        if let Some(parent) = target.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        tokio::fs::write(&target, &data).await?;
        Ok(())
    }
}

fn sanitize(component: &str) -> String {
    let cleaned: String = component
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '-') {
                c
            } else {
                '_'
            }
        })
        .collect();
    cleaned.trim_start_matches('.').to_string()
}

/// Destination file for a job binary: `<dir>/<id>-<name>`
///
/// Built from the binary's identity only; the URL never contributes.
pub fn destination_path(
    reference: &JobBinaryReference,
    destination_dir: &str,
) -> Result<String, JobBinaryError> {
    let id = reference
        .id
        .as_deref()
        .map(sanitize)
        .filter(|id| !id.is_empty())
        .ok_or_else(|| JobBinaryError::bad_reference("job binary has no id to stage under"))?;

    let dir = destination_dir.trim_end_matches('/');
    let name = sanitize(&reference.name);

    if name.is_empty() {
        Ok(format!("{dir}/{id}"))
    } else {
        Ok(format!("{dir}/{id}-{name}"))
    }
}

/// Write fetched bytes to the host behind `ctx.remote`
pub async fn stage_bytes(
    reference: &JobBinaryReference,
    data: Bytes,
    destination_dir: &str,
    ctx: &StageContext,
) -> Result<String, JobBinaryError> {
    let path = destination_path(reference, destination_dir)?;
    stage_bytes_at(path, data, ctx).await
}

/// Write bytes to an already computed destination path
pub async fn stage_bytes_at(
    path: String,
    data: Bytes,
    ctx: &StageContext,
) -> Result<String, JobBinaryError> {
    if ctx.cancel.is_cancelled() {
        return Err(JobBinaryError::Cancelled {
            stage: RetrievalStage::Stage,
        });
    }

    let size = data.len();
    ctx.remote
        .write_file(&path, data)
        .await
        .map_err(|source| JobBinaryError::RemoteWrite {
            path: path.clone(),
            source,
        })?;

    info!(path, size, "Staged job binary");
    Ok(path)
}
