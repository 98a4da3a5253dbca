//! Namespaced wrapper over the platform secret vault.

use std::sync::Arc;

use tracing::info;

use crate::platform::{PlatformError, SecretVault};

const TARGET_PREFIX: &str = "BrowserAI:";

#[derive(Clone)]
pub struct CredentialStore {
    vault: Arc<dyn SecretVault>,
}

impl CredentialStore {
    pub fn new(vault: Arc<dyn SecretVault>) -> Self {
        Self { vault }
    }

    fn target(provider: &str) -> String {
        format!("{TARGET_PREFIX}{provider}")
    }

    pub fn store(&self, provider: &str, api_key: &str) -> Result<(), PlatformError> {
        self.vault.store(&Self::target(provider), api_key)?;
        info!(provider, "stored API key");
        Ok(())
    }

    /// Empty string when no key is stored.
    pub fn load(&self, provider: &str) -> String {
        self.vault.load(&Self::target(provider)).unwrap_or_default()
    }

    /// Deleting an entry that never existed still reports success.
    pub fn delete(&self, provider: &str) -> bool {
        self.vault.delete(&Self::target(provider))
    }

    pub fn has(&self, provider: &str) -> bool {
        self.vault.has(&Self::target(provider))
    }
}
