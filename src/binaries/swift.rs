//! Job binaries stored in the internal object storage (`swift://`)
//!
//! URLs look like `swift://<container>[.sahara]/<object path>`. The optional
//! container suffix marks the internal namespace and is stripped before the
//! container name reaches the backend.

use async_trait::async_trait;
use bytes::Bytes;
use tracing::debug;
use url::Url;

use super::error::JobBinaryError;
use super::traits::JobBinaryType;
use super::types::{JobBinaryReference, ObjectCoordinates, RetrievalContext, ValidationContext};
use crate::credentials::check_creation_credentials;
use crate::fetcher::SizeGuardedFetcher;

pub const SWIFT_SCHEME: &str = "swift";
pub const SWIFT_INTERNAL_PREFIX: &str = "swift://";
pub const DEFAULT_URL_SUFFIX: &str = ".sahara";

#[derive(Clone)]
pub struct SwiftType {
    fetcher: SizeGuardedFetcher,
    url_suffix: String,
    use_domain_for_proxy_users: bool,
}

impl SwiftType {
    pub fn new(
        fetcher: SizeGuardedFetcher,
        url_suffix: impl Into<String>,
        use_domain_for_proxy_users: bool,
    ) -> Self {
        Self {
            fetcher,
            url_suffix: url_suffix.into(),
            use_domain_for_proxy_users,
        }
    }

    /// Split a URL into container and object, stripping the namespace suffix.
    ///
    /// Stricter than [`JobBinaryType::validate_url`]: a URL naming only a
    /// container is rejected.
    pub fn decompose(&self, url: &str) -> Result<ObjectCoordinates, JobBinaryError> {
        let rest = url.strip_prefix(SWIFT_INTERNAL_PREFIX).ok_or_else(|| {
            JobBinaryError::bad_reference(format!(
                "url for binary in internal swift must start with {SWIFT_INTERNAL_PREFIX}"
            ))
        })?;
        let rest = rest
            .split(['?', '#'])
            .next()
            .unwrap_or_default();

        let (container, object) = match rest.split_once('/') {
            Some((container, object)) if !object.is_empty() => (container, object),
            _ => {
                return Err(JobBinaryError::bad_reference(
                    "url for binary in internal swift must specify an object not a container",
                ));
            }
        };

        if container.is_empty() {
            return Err(JobBinaryError::bad_reference(
                "url for binary in internal swift must name a container",
            ));
        }

        let container = container
            .strip_suffix(self.url_suffix.as_str())
            .filter(|stripped| !self.url_suffix.is_empty() && !stripped.is_empty())
            .unwrap_or(container);

        Ok(ObjectCoordinates::new(container, object))
    }
}

#[async_trait]
impl JobBinaryType for SwiftType {
    fn scheme(&self) -> &'static str {
        SWIFT_SCHEME
    }

    fn validate_url(&self, url: &str) -> bool {
        match Url::parse(url) {
            Ok(parsed) => {
                parsed.scheme() == SWIFT_SCHEME
                    && parsed.host_str().is_some_and(|host| !host.is_empty())
            }
            Err(_) => false,
        }
    }

    async fn validate(
        &self,
        reference: &JobBinaryReference,
        ctx: &ValidationContext,
    ) -> Result<(), JobBinaryError> {
        if !self.validate_url(&reference.url) {
            return Err(JobBinaryError::bad_reference(format!(
                "url '{}' is not a valid swift location",
                reference.url
            )));
        }

        check_creation_credentials(reference, ctx, self.use_domain_for_proxy_users)
    }

    async fn fetch(
        &self,
        reference: &JobBinaryReference,
        ctx: &RetrievalContext,
    ) -> Result<Bytes, JobBinaryError> {
        let coords = self.decompose(&reference.url)?;
        debug!(
            container = %coords.container,
            object = %coords.object,
            "Fetching job binary from swift"
        );

        self.fetcher.fetch(reference, &coords, ctx).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::{ClientError, RetrievalSession, SessionFactory};
    use crate::credentials::{CredentialResolver, SessionCredentials};
    use crate::fetcher::{FetchSettings, SizeLimit};
    use crate::observability::Metrics;
    use crate::secrets::StaticSecretStore;
    use std::sync::Arc;
    use std::time::Duration;

    struct NoSessions;

    #[async_trait]
    impl SessionFactory for NoSessions {
        async fn open(&self, _: &SessionCredentials) -> Result<RetrievalSession, ClientError> {
            Err(ClientError::Transport("offline".to_string()))
        }
    }

    fn swift(use_domain: bool) -> SwiftType {
        let fetcher = SizeGuardedFetcher::new(
            FetchSettings::new(SizeLimit::from_kb(1024), Duration::from_secs(5)),
            CredentialResolver::new(Arc::new(StaticSecretStore::new())),
            Arc::new(NoSessions),
            Arc::new(Metrics::new()),
        );
        SwiftType::new(fetcher, DEFAULT_URL_SUFFIX, use_domain)
    }

    #[test]
    fn test_validate_url_requires_scheme() {
        let swift = swift(false);
        for url in [
            "http://container/object",
            "s3://container/object",
            "container/object",
            "swift:container/object",
            "",
            "internal-db://4f1c",
        ] {
            assert!(!swift.validate_url(url), "accepted {url}");
        }
    }

    #[test]
    fn test_validate_url_requires_host() {
        let swift = swift(false);
        assert!(!swift.validate_url("swift:///object"));
        assert!(swift.validate_url("swift://container.sahara/object"));
        assert!(swift.validate_url("swift://container"));
    }

    #[test]
    fn test_decompose_strips_suffix() {
        let coords = swift(false)
            .decompose("swift://jobs.sahara/lib/udf.jar")
            .unwrap();
        assert_eq!(coords, ObjectCoordinates::new("jobs", "lib/udf.jar"));
    }

    #[test]
    fn test_decompose_keeps_unsuffixed_container() {
        let coords = swift(false).decompose("swift://jobs/udf.jar").unwrap();
        assert_eq!(coords.container, "jobs");
    }

    #[test]
    fn test_decompose_rejects_container_only() {
        let swift = swift(false);
        for url in ["swift://jobs.sahara", "swift://jobs.sahara/"] {
            assert!(swift.validate_url(url));
            assert!(matches!(
                swift.decompose(url),
                Err(JobBinaryError::BadReference { .. })
            ));
        }
    }

    #[test]
    fn test_decompose_ignores_query_and_fragment() {
        let swift = swift(false);
        for url in [
            "swift://jobs.sahara/udf.jar#frag",
            "swift://jobs.sahara/udf.jar?temp_url_sig=abc",
            "swift://jobs.sahara/udf.jar?x=1#frag",
        ] {
            assert_eq!(
                swift.decompose(url).unwrap(),
                ObjectCoordinates::new("jobs", "udf.jar")
            );
        }
        assert!(matches!(
            swift.decompose("swift://jobs.sahara/#frag"),
            Err(JobBinaryError::BadReference { .. })
        ));
    }

    #[test]
    fn test_decompose_rejects_wrong_prefix() {
        assert!(matches!(
            swift(false).decompose("http://jobs/udf.jar"),
            Err(JobBinaryError::BadReference { .. })
        ));
    }

    #[tokio::test]
    async fn test_validate_on_create_without_credentials() {
        let reference = JobBinaryReference::new("swift://jobs.sahara/udf.jar");

        let result = swift(false)
            .validate(&reference, &ValidationContext::creating())
            .await;
        assert!(matches!(result, Err(JobBinaryError::MissingCredentials)));

        let result = swift(false)
            .validate(&reference, &ValidationContext::updating("jb-1"))
            .await;
        assert!(result.is_ok());

        let result = swift(true)
            .validate(&reference, &ValidationContext::creating())
            .await;
        assert!(result.is_ok());
    }

    #[tokio::test]
    async fn test_validate_rejects_bad_url() {
        let reference = JobBinaryReference::new("http://jobs/udf.jar").with_id("jb-1");
        let result = swift(true)
            .validate(&reference, &ValidationContext::updating("jb-1"))
            .await;
        assert!(matches!(result, Err(JobBinaryError::BadReference { .. })));
    }

    #[tokio::test]
    async fn test_fetch_container_only_fails_before_session() {
        let reference = JobBinaryReference::new("swift://jobs.sahara");
        let result = swift(false)
            .fetch(&reference, &RetrievalContext::new())
            .await;
        assert!(matches!(result, Err(JobBinaryError::BadReference { .. })));
    }
}
