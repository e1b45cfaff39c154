//! Credential resolution for backend sessions
//!
//! Sources are tried in a fixed priority order:
//!
//! 1. the caller's ambient authenticated context,
//! 2. proxy delegation for the job execution,
//! 3. `user`/`password` stored in the job binary's `extra`.
//!
//! [`select_source`] makes that decision without any I/O; [`CredentialResolver`]
//! then decrypts the chosen secret. Decrypted passwords are handed straight to
//! the session factory and dropped with the [`SessionCredentials`] value.

use std::sync::Arc;
use tracing::debug;

use crate::binaries::{
    AmbientAuth, JobBinaryError, JobBinaryReference, ProxyDelegation, RetrievalContext,
    RetrievalStage, ValidationContext,
};
use crate::secrets::{SecretRef, SecretResolver, SecretString};

/// Where session credentials come from
#[derive(Debug, Clone, Copy)]
pub enum CredentialSource<'a> {
    Ambient(&'a AmbientAuth),
    Proxy(&'a ProxyDelegation),
    Explicit {
        user: Option<&'a str>,
        password: Option<&'a SecretRef>,
    },
}

/// Pick the credential source for a retrieval
pub fn select_source<'a>(
    reference: &'a JobBinaryReference,
    ctx: &'a RetrievalContext,
) -> CredentialSource<'a> {
    if let Some(auth) = &ctx.ambient {
        return CredentialSource::Ambient(auth);
    }

    if let Some(proxy) = &ctx.proxy {
        return CredentialSource::Proxy(proxy);
    }

    CredentialSource::Explicit {
        user: reference.extra.user.as_deref().filter(|u| !u.is_empty()),
        password: reference.extra.password.as_ref().filter(|p| !p.is_empty()),
    }
}

/// Credentials ready to open a session with
#[derive(Debug, Clone)]
pub enum SessionCredentials {
    Ambient(AmbientAuth),
    Password {
        username: String,
        password: SecretString,
        trust_id: Option<String>,
    },
}

impl SessionCredentials {
    pub fn username(&self) -> Option<&str> {
        match self {
            SessionCredentials::Ambient(_) => None,
            SessionCredentials::Password { username, .. } => Some(username),
        }
    }

    pub fn trust_id(&self) -> Option<&str> {
        match self {
            SessionCredentials::Ambient(_) => None,
            SessionCredentials::Password { trust_id, .. } => trust_id.as_deref(),
        }
    }
}

#[derive(Clone)]
pub struct CredentialResolver {
    secrets: Arc<dyn SecretResolver>,
}

impl CredentialResolver {
    pub fn new(secrets: Arc<dyn SecretResolver>) -> Self {
        Self { secrets }
    }

    pub async fn resolve(
        &self,
        reference: &JobBinaryReference,
        ctx: &RetrievalContext,
    ) -> Result<SessionCredentials, JobBinaryError> {
        match select_source(reference, ctx) {
            CredentialSource::Ambient(auth) => {
                debug!(project_id = %auth.project_id, "Using ambient context for session");
                Ok(SessionCredentials::Ambient(auth.clone()))
            }
            CredentialSource::Proxy(proxy) => {
                debug!(username = %proxy.proxy_username, "Using proxy delegation for session");
                let password = self.decrypt(reference, &proxy.proxy_password).await?;
                Ok(SessionCredentials::Password {
                    username: proxy.proxy_username.clone(),
                    password,
                    trust_id: Some(proxy.proxy_trust_id.clone()).filter(|t| !t.is_empty()),
                })
            }
            CredentialSource::Explicit {
                user: Some(user),
                password: Some(password),
            } => {
                debug!(username = %user, "Using job binary credentials for session");
                let password = self.decrypt(reference, password).await?;
                Ok(SessionCredentials::Password {
                    username: user.to_string(),
                    password,
                    trust_id: None,
                })
            }
            CredentialSource::Explicit { .. } => Err(JobBinaryError::backend(
                "cannot open session: job binary has no user/password and no proxy delegation",
            )),
        }
    }

    async fn decrypt(
        &self,
        reference: &JobBinaryReference,
        secret: &SecretRef,
    ) -> Result<SecretString, JobBinaryError> {
        self.secrets
            .resolve_secret(secret)
            .await
            .map_err(|source| JobBinaryError::SecretResolution {
                reference: reference.label().to_string(),
                stage: RetrievalStage::ResolveCredentials,
                source,
            })
    }
}

/// Creation-time rule: a new job binary must carry credentials unless proxy
/// users are provisioned per domain. Updates skip the check.
pub fn check_creation_credentials(
    reference: &JobBinaryReference,
    ctx: &ValidationContext,
    use_domain_for_proxy_users: bool,
) -> Result<(), JobBinaryError> {
    if ctx.is_update() {
        return Ok(());
    }

    if !reference.extra.has_credentials() && !use_domain_for_proxy_users {
        return Err(JobBinaryError::MissingCredentials);
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::secrets::StaticSecretStore;

    fn resolver() -> CredentialResolver {
        let mut store = StaticSecretStore::new();
        store.insert("user-pw", "user-plain");
        store.insert("proxy-pw", "proxy-plain");
        CredentialResolver::new(Arc::new(store))
    }

    fn reference_with_creds() -> JobBinaryReference {
        JobBinaryReference::new("swift://c.sahara/o")
            .with_id("jb-1")
            .with_credentials("alice", SecretRef::new("user-pw"))
    }

    fn proxy() -> ProxyDelegation {
        ProxyDelegation {
            proxy_username: "proxy-user".to_string(),
            proxy_password: SecretRef::new("proxy-pw"),
            proxy_trust_id: "trust-9".to_string(),
        }
    }

    fn ambient() -> AmbientAuth {
        AmbientAuth {
            project_id: "proj".to_string(),
            token: SecretString::new("tok"),
        }
    }

    #[test]
    fn test_ambient_context_wins_over_everything() {
        let reference = reference_with_creds();
        let ctx = RetrievalContext::new()
            .with_proxy(proxy())
            .with_ambient(ambient());

        assert!(matches!(
            select_source(&reference, &ctx),
            CredentialSource::Ambient(_)
        ));
    }

    #[test]
    fn test_proxy_wins_over_extra() {
        let reference = reference_with_creds();
        let ctx = RetrievalContext::new().with_proxy(proxy());

        assert!(matches!(
            select_source(&reference, &ctx),
            CredentialSource::Proxy(p) if p.proxy_username == "proxy-user"
        ));
    }

    #[test]
    fn test_falls_back_to_extra() {
        let reference = reference_with_creds();
        let ctx = RetrievalContext::new();

        assert!(matches!(
            select_source(&reference, &ctx),
            CredentialSource::Explicit { user: Some("alice"), password: Some(_) }
        ));
    }

    #[tokio::test]
    async fn test_resolve_proxy_credentials() {
        let reference = reference_with_creds();
        let ctx = RetrievalContext::new().with_proxy(proxy());

        let creds = resolver().resolve(&reference, &ctx).await.unwrap();
        match creds {
            SessionCredentials::Password {
                username,
                password,
                trust_id,
            } => {
                assert_eq!(username, "proxy-user");
                assert_eq!(password.expose(), "proxy-plain");
                assert_eq!(trust_id.as_deref(), Some("trust-9"));
            }
            other => panic!("unexpected credentials: {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_resolve_extra_credentials() {
        let creds = resolver()
            .resolve(&reference_with_creds(), &RetrievalContext::new())
            .await
            .unwrap();

        assert_eq!(creds.username(), Some("alice"));
        assert!(creds.trust_id().is_none());
        assert!(!format!("{:?}", creds).contains("user-plain"));
    }

    #[tokio::test]
    async fn test_unknown_secret_is_wrapped_with_reference() {
        let reference = JobBinaryReference::new("swift://c.sahara/o")
            .with_id("jb-7")
            .with_credentials("alice", SecretRef::new("missing"));

        let err = resolver()
            .resolve(&reference, &RetrievalContext::new())
            .await
            .unwrap_err();

        assert!(matches!(
            err,
            JobBinaryError::SecretResolution { ref reference, stage: RetrievalStage::ResolveCredentials, .. }
                if reference == "jb-7"
        ));
    }

    #[tokio::test]
    async fn test_no_source_fails_as_backend_error() {
        let reference = JobBinaryReference::new("swift://c.sahara/o");
        let err = resolver()
            .resolve(&reference, &RetrievalContext::new())
            .await
            .unwrap_err();
        assert!(matches!(err, JobBinaryError::BackendFetch { .. }));
    }

    #[test]
    fn test_creation_requires_credentials() {
        let reference = JobBinaryReference::new("swift://c.sahara/o");

        let result = check_creation_credentials(&reference, &ValidationContext::creating(), false);
        assert!(matches!(result, Err(JobBinaryError::MissingCredentials)));
    }

    #[test]
    fn test_update_skips_credential_check() {
        let reference = JobBinaryReference::new("swift://c.sahara/o");
        let ctx = ValidationContext::updating("jb-1");

        assert!(check_creation_credentials(&reference, &ctx, false).is_ok());
    }

    #[test]
    fn test_domain_proxy_mode_allows_missing_credentials() {
        let reference = JobBinaryReference::new("swift://c.sahara/o");
        assert!(
            check_creation_credentials(&reference, &ValidationContext::creating(), true).is_ok()
        );
    }
}
