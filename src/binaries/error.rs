use std::fmt;
use thiserror::Error;

use crate::remote::RemoteWriteError;
use crate::secrets::SecretError;

/// Step of a retrieval at which a failure or cancellation happened
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetrievalStage {
    ResolveCredentials,
    OpenSession,
    Probe,
    Download,
    Stage,
}

impl fmt::Display for RetrievalStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            RetrievalStage::ResolveCredentials => "resolve_credentials",
            RetrievalStage::OpenSession => "open_session",
            RetrievalStage::Probe => "probe",
            RetrievalStage::Download => "download",
            RetrievalStage::Stage => "stage",
        };
        f.write_str(name)
    }
}

/// Uniform failure taxonomy for job binary retrieval
#[derive(Debug, Error)]
pub enum JobBinaryError {
    #[error("no job binary type registered for scheme '{scheme}'")]
    UnsupportedScheme { scheme: String },

    #[error("bad job binary: {reason}")]
    BadReference { reason: String },

    #[error("job binary requires 'user' and 'password' in extra unless domain proxy users are enabled")]
    MissingCredentials,

    #[error("size of object ({actual_kb}KB) is greater than maximum ({limit_kb}KB)")]
    ArtifactTooLarge { actual_kb: f64, limit_kb: u64 },

    #[error("backend fetch failed: {message}")]
    BackendFetch { message: String },

    #[error("failed to resolve secret for job binary '{reference}' during {stage}: {source}")]
    SecretResolution {
        reference: String,
        stage: RetrievalStage,
        #[source]
        source: SecretError,
    },

    #[error("failed to write job binary to '{path}': {source}")]
    RemoteWrite {
        path: String,
        #[source]
        source: RemoteWriteError,
    },

    #[error("retrieval cancelled during {stage}")]
    Cancelled { stage: RetrievalStage },
}

impl JobBinaryError {
    pub fn bad_reference(reason: impl Into<String>) -> Self {
        JobBinaryError::BadReference {
            reason: reason.into(),
        }
    }

    pub fn backend(message: impl Into<String>) -> Self {
        JobBinaryError::BackendFetch {
            message: message.into(),
        }
    }

    /// Stable identifier for reporting the error kind to callers
    pub fn code(&self) -> &'static str {
        match self {
            JobBinaryError::UnsupportedScheme { .. } => "UNSUPPORTED_SCHEME",
            JobBinaryError::BadReference { .. } => "BAD_JOB_BINARY",
            JobBinaryError::MissingCredentials => "MISSING_CREDENTIALS",
            JobBinaryError::ArtifactTooLarge { .. } => "DATA_TOO_BIG",
            JobBinaryError::BackendFetch { .. } => "BACKEND_FETCH_FAILED",
            JobBinaryError::SecretResolution { .. } => "SECRET_RESOLUTION_FAILED",
            JobBinaryError::RemoteWrite { .. } => "REMOTE_WRITE_FAILED",
            JobBinaryError::Cancelled { .. } => "CANCELLED",
        }
    }
}
