//! Secret references and the secret-decryption collaborator
//!
//! Job binaries never carry plaintext passwords. `extra.password` and
//! `proxy_password` hold a [`SecretRef`], an opaque key understood by a
//! [`SecretResolver`]. The resolved plaintext is a [`SecretString`] and lives
//! only as long as it takes to open a backend session.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::env;
use std::fmt;
use thiserror::Error;

const REDACTED: &str = "[REDACTED]";
const SECRET_ENV_PREFIX: &str = "JOBBIN_SECRET_";

#[derive(Debug, Error)]
pub enum SecretError {
    #[error("secret not found: {0}")]
    NotFound(String),

    #[error("secret inaccessible: {0}")]
    Inaccessible(String),
}

/// Opaque reference to a stored secret
#[derive(Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SecretRef(String);

impl SecretRef {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Key under which the secret manager stores the value
    pub fn id(&self) -> &str {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Debug for SecretRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("SecretRef").field(&REDACTED).finish()
    }
}

/// Decrypted secret material
#[derive(Clone, PartialEq, Eq)]
pub struct SecretString(String);

impl SecretString {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for SecretString {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(REDACTED)
    }
}

/// Secret-decryption collaborator
#[async_trait]
pub trait SecretResolver: Send + Sync {
    async fn resolve_secret(&self, reference: &SecretRef) -> Result<SecretString, SecretError>;
}

/// In-process secret store, keyed by reference id
#[derive(Clone, Default)]
pub struct StaticSecretStore {
    secrets: HashMap<String, SecretString>,
}

impl StaticSecretStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, id: impl Into<String>, value: impl Into<String>) -> SecretRef {
        let id = id.into();
        self.secrets.insert(id.clone(), SecretString::new(value));
        SecretRef(id)
    }
}

#[async_trait]
impl SecretResolver for StaticSecretStore {
    async fn resolve_secret(&self, reference: &SecretRef) -> Result<SecretString, SecretError> {
        self.secrets
            .get(reference.id())
            .cloned()
            .ok_or_else(|| SecretError::NotFound(reference.id().to_string()))
    }
}

/// Resolves `ref-id` from the `JOBBIN_SECRET_REF_ID` environment variable
#[derive(Debug, Clone, Default)]
pub struct EnvSecretResolver;

impl EnvSecretResolver {
    pub fn new() -> Self {
        Self
    }

    pub fn env_key(reference: &SecretRef) -> String {
        let normalized: String = reference
            .id()
            .chars()
            .map(|c| {
                if c.is_ascii_alphanumeric() {
                    c.to_ascii_uppercase()
                } else {
                    '_'
                }
            })
            .collect();
        format!("{SECRET_ENV_PREFIX}{normalized}")
    }
}

#[async_trait]
impl SecretResolver for EnvSecretResolver {
    async fn resolve_secret(&self, reference: &SecretRef) -> Result<SecretString, SecretError> {
        if reference.is_empty() {
            return Err(SecretError::Inaccessible("empty secret reference".to_string()));
        }

        match env::var(Self::env_key(reference)) {
            Ok(value) => Ok(SecretString::new(value)),
            Err(env::VarError::NotPresent) => {
                Err(SecretError::NotFound(reference.id().to_string()))
            }
            Err(env::VarError::NotUnicode(_)) => Err(SecretError::Inaccessible(format!(
                "{} is not valid unicode",
                Self::env_key(reference)
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_debug_redacts_secret_values() {
        let secret = SecretString::new("hunter2");
        let reference = SecretRef::new("swift-password-7");

        let debug_secret = format!("{:?}", secret);
        let debug_ref = format!("{:?}", reference);

        assert!(debug_secret.contains("[REDACTED]"));
        assert!(!debug_secret.contains("hunter2"));
        assert!(!debug_ref.contains("swift-password-7"));
    }

    #[test]
    fn test_secret_ref_serializes_as_plain_string() {
        let reference: SecretRef = serde_json::from_str("\"abc-123\"").unwrap();
        assert_eq!(reference.id(), "abc-123");
        assert_eq!(serde_json::to_string(&reference).unwrap(), "\"abc-123\"");
    }

    #[tokio::test]
    async fn test_static_store_resolves_and_misses() {
        let mut store = StaticSecretStore::new();
        let reference = store.insert("pw", "s3cret");

        let resolved = store.resolve_secret(&reference).await.unwrap();
        assert_eq!(resolved.expose(), "s3cret");

        let missing = store.resolve_secret(&SecretRef::new("other")).await;
        assert!(matches!(missing, Err(SecretError::NotFound(id)) if id == "other"));
    }

    #[test]
    fn test_env_key_normalization() {
        let key = EnvSecretResolver::env_key(&SecretRef::new("swift/pass-1"));
        assert_eq!(key, "JOBBIN_SECRET_SWIFT_PASS_1");
    }

    #[tokio::test]
    async fn test_env_resolver_rejects_empty_reference() {
        let result = EnvSecretResolver::new()
            .resolve_secret(&SecretRef::new(""))
            .await;
        assert!(matches!(result, Err(SecretError::Inaccessible(_))));
    }
}
