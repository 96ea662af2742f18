//! API key storage. Keys never appear in logs or `Debug` output.

use std::fmt;
use std::future::Future;
use std::pin::Pin;

use serde::Deserialize;

/// A credential whose `Debug` and `Display` print `[REDACTED]`.
#[derive(Clone, Deserialize)]
#[serde(transparent)]
pub struct Secret(String);

impl Secret {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    #[must_use]
    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for Secret {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("[REDACTED]")
    }
}

impl fmt::Display for Secret {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

pub type SecretFuture<'a> =
    Pin<Box<dyn Future<Output = anyhow::Result<Option<Secret>>> + Send + 'a>>;

/// Source of API keys, looked up by name.
pub trait VaultProvider: Send + Sync {
    fn get_secret(&self, key: &str) -> SecretFuture<'_>;
}

/// Return the first of `keys` the vault knows about.
///
/// # Errors
///
/// Propagates the first backend error.
pub async fn first_secret(
    vault: &dyn VaultProvider,
    keys: &[&str],
) -> anyhow::Result<Option<Secret>> {
    for key in keys {
        if let Some(secret) = vault.get_secret(key).await? {
            tracing::debug!(key, "resolved secret");
            return Ok(Some(secret));
        }
    }
    Ok(None)
}

/// Environment-backed vault. Empty variables count as unset.
pub struct EnvVaultProvider;

impl VaultProvider for EnvVaultProvider {
    fn get_secret(&self, key: &str) -> SecretFuture<'_> {
        let value = std::env::var(key)
            .ok()
            .filter(|v| !v.is_empty())
            .map(Secret::new);
        Box::pin(async move { Ok(value) })
    }
}

#[cfg(test)]
#[derive(Default)]
pub struct MockVaultProvider {
    secrets: std::collections::HashMap<String, String>,
}

#[cfg(test)]
impl MockVaultProvider {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_secret(mut self, key: &str, value: &str) -> Self {
        self.secrets.insert(key.to_owned(), value.to_owned());
        self
    }
}

#[cfg(test)]
impl VaultProvider for MockVaultProvider {
    fn get_secret(&self, key: &str) -> SecretFuture<'_> {
        let value = self.secrets.get(key).map(Secret::new);
        Box::pin(async move { Ok(value) })
    }
}
