use std::collections::BTreeMap;
use std::sync::Arc;

use super::error::JobBinaryError;
use super::internal_db::InternalDbType;
use super::swift::SwiftType;
use super::traits::JobBinaryType;
use super::types::scheme_of;
use crate::backend::SessionFactory;
use crate::config::Config;
use crate::credentials::CredentialResolver;
use crate::fetcher::{FetchSettings, SizeGuardedFetcher};
use crate::observability::Metrics;
use crate::secrets::SecretResolver;
use crate::storage::StorageClient;

/// Collaborators the built-in job binary types are wired with
#[derive(Clone)]
pub struct Collaborators {
    pub secrets: Arc<dyn SecretResolver>,
    pub sessions: Arc<dyn SessionFactory>,
    pub internal_store: StorageClient,
    pub metrics: Arc<Metrics>,
}

/// Registry mapping URL schemes to job binary types
#[derive(Clone, Default)]
pub struct JobBinaryRegistry {
    types: BTreeMap<String, Arc<dyn JobBinaryType>>,
}

impl JobBinaryRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register under the type's own scheme, replacing any previous entry
    pub fn register(&mut self, job_binary_type: Arc<dyn JobBinaryType>) {
        self.types
            .insert(job_binary_type.scheme().to_string(), job_binary_type);
    }

    pub fn resolve(&self, scheme: &str) -> Result<Arc<dyn JobBinaryType>, JobBinaryError> {
        self.types
            .get(scheme)
            .cloned()
            .ok_or_else(|| JobBinaryError::UnsupportedScheme {
                scheme: scheme.to_string(),
            })
    }

    /// Dispatch on the scheme of a job binary URL
    pub fn resolve_url(&self, url: &str) -> Result<Arc<dyn JobBinaryType>, JobBinaryError> {
        let scheme = scheme_of(url).ok_or_else(|| {
            JobBinaryError::bad_reference(format!("url '{url}' has no scheme"))
        })?;
        self.resolve(scheme)
    }

    pub fn has_type(&self, scheme: &str) -> bool {
        self.types.contains_key(scheme)
    }

    pub fn schemes(&self) -> impl Iterator<Item = &str> {
        self.types.keys().map(String::as_str)
    }

    /// Registry with the built-in `swift` and `internal-db` types
    pub fn from_config(config: &Config, deps: Collaborators) -> Self {
        let fetcher = SizeGuardedFetcher::new(
            FetchSettings::from(&config.job_binaries),
            CredentialResolver::new(deps.secrets),
            deps.sessions,
            deps.metrics,
        );

        let mut registry = Self::new();
        registry.register(Arc::new(SwiftType::new(
            fetcher.clone(),
            config.swift.url_suffix.clone(),
            config.job_binaries.use_domain_for_proxy_users,
        )));
        registry.register(Arc::new(InternalDbType::new(deps.internal_store, fetcher)));
        registry
    }
}
