use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

use crate::remote::RemoteWriter;
use crate::secrets::{SecretRef, SecretString};

/// Logical reference to a job artifact
///
/// Owned by the caller; nothing in this crate mutates it.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct JobBinaryReference {
    /// Absent while a binary is validated before creation
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(default)]
    pub name: String,
    pub url: String,
    #[serde(default)]
    pub extra: JobBinaryExtra,
}

impl JobBinaryReference {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            ..Default::default()
        }
    }

    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = Some(id.into());
        self
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    pub fn with_credentials(mut self, user: impl Into<String>, password: SecretRef) -> Self {
        self.extra.user = Some(user.into());
        self.extra.password = Some(password);
        self
    }

    /// Scheme token preceding `://`, if any
    pub fn scheme(&self) -> Option<&str> {
        scheme_of(&self.url)
    }

    /// Identifier used in diagnostics: the id when known, else the URL
    pub fn label(&self) -> &str {
        self.id.as_deref().unwrap_or(&self.url)
    }
}

pub(crate) fn scheme_of(url: &str) -> Option<&str> {
    url.split_once("://")
        .map(|(scheme, _)| scheme)
        .filter(|scheme| !scheme.is_empty())
}

/// Backend-specific auxiliary fields of a job binary
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct JobBinaryExtra {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub password: Option<SecretRef>,
    #[serde(flatten)]
    pub other: BTreeMap<String, Value>,
}

impl JobBinaryExtra {
    /// Both `user` and `password` are present and non-empty
    pub fn has_credentials(&self) -> bool {
        let user = self.user.as_deref().is_some_and(|u| !u.is_empty());
        let password = self.password.as_ref().is_some_and(|p| !p.is_empty());
        user && password
    }
}

/// Trust delegated to a proxy user for the duration of a job execution
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProxyDelegation {
    pub proxy_username: String,
    pub proxy_password: SecretRef,
    pub proxy_trust_id: String,
}

/// Authenticated context the caller already holds (acting for the owning project)
#[derive(Debug, Clone)]
pub struct AmbientAuth {
    pub project_id: String,
    pub token: SecretString,
}

/// Context for creation/update validation
#[derive(Debug, Clone, Default)]
pub struct ValidationContext {
    /// Set when an existing job binary is being updated
    pub job_binary_id: Option<String>,
}

impl ValidationContext {
    pub fn creating() -> Self {
        Self::default()
    }

    pub fn updating(job_binary_id: impl Into<String>) -> Self {
        Self {
            job_binary_id: Some(job_binary_id.into()),
        }
    }

    pub fn is_update(&self) -> bool {
        self.job_binary_id.as_deref().is_some_and(|id| !id.is_empty())
    }
}

/// Per-call retrieval context
#[derive(Debug, Clone, Default)]
pub struct RetrievalContext {
    /// When set, the session is built from this context instead of stored credentials
    pub ambient: Option<AmbientAuth>,
    pub proxy: Option<ProxyDelegation>,
    pub cancel: CancellationToken,
}

impl RetrievalContext {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_ambient(mut self, auth: AmbientAuth) -> Self {
        self.ambient = Some(auth);
        self
    }

    pub fn with_proxy(mut self, proxy: ProxyDelegation) -> Self {
        self.proxy = Some(proxy);
        self
    }

    pub fn with_cancellation(mut self, cancel: CancellationToken) -> Self {
        self.cancel = cancel;
        self
    }
}

/// Remote-execution handle used when staging
#[derive(Clone)]
pub struct StageContext {
    pub remote: Arc<dyn RemoteWriter>,
    pub cancel: CancellationToken,
}

impl StageContext {
    pub fn new(remote: Arc<dyn RemoteWriter>) -> Self {
        Self {
            remote,
            cancel: CancellationToken::new(),
        }
    }

    pub fn with_cancellation(mut self, cancel: CancellationToken) -> Self {
        self.cancel = cancel;
        self
    }
}

/// Backend-addressable location of a single object
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ObjectCoordinates {
    pub container: String,
    pub object: String,
}

impl ObjectCoordinates {
    pub fn new(container: impl Into<String>, object: impl Into<String>) -> Self {
        Self {
            container: container.into(),
            object: object.into(),
        }
    }
}
