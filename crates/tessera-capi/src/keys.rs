//! SSH SSO public key lookup
//!
//! The key is the base64-encoded CA public key nodes trust for SSH logins.
//! It can come from the environment or from configuration.

use tessera_common::{Error, Result};

/// Environment variable holding the SSH SSO public key
pub const SSH_SSO_PUBLIC_KEY_ENV: &str = "SSH_SSO_PUBLIC_KEY";

/// Source of the SSH SSO public key
#[cfg_attr(test, mockall::automock)]
pub trait KeySource: Send + Sync {
    /// The key, or `None` if this source has none
    fn sso_public_key(&self) -> Option<String>;
}

/// Reads the key from `SSH_SSO_PUBLIC_KEY`
#[derive(Clone, Debug, Default)]
pub struct EnvKeySource;

impl KeySource for EnvKeySource {
    fn sso_public_key(&self) -> Option<String> {
        std::env::var(SSH_SSO_PUBLIC_KEY_ENV).ok()
    }
}

/// A key fixed at construction, typically from the config file
#[derive(Clone, Debug, Default)]
pub struct StaticKeySource {
    key: Option<String>,
}

impl StaticKeySource {
    pub fn new(key: Option<String>) -> Self {
        Self { key }
    }
}

impl KeySource for StaticKeySource {
    fn sso_public_key(&self) -> Option<String> {
        self.key.clone()
    }
}

/// Asks each source in turn and takes the first non-empty key
pub struct ChainedKeySource {
    sources: Vec<Box<dyn KeySource>>,
}

impl ChainedKeySource {
    pub fn new(sources: Vec<Box<dyn KeySource>>) -> Self {
        Self { sources }
    }
}

impl KeySource for ChainedKeySource {
    fn sso_public_key(&self) -> Option<String> {
        self.sources
            .iter()
            .filter_map(|source| source.sso_public_key())
            .find(|key| !key.trim().is_empty())
    }
}

/// The key from `source`, or `MissingCredential` if it has none
pub fn require_sso_public_key(source: &dyn KeySource) -> Result<String> {
    source
        .sso_public_key()
        .map(|key| key.trim().to_string())
        .filter(|key| !key.is_empty())
        .ok_or_else(|| Error::missing_credential(SSH_SSO_PUBLIC_KEY_ENV))
}
