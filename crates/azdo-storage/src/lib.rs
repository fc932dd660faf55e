//! Secure storage for Azure DevOps personal access tokens.
//!
//! Tokens live in the operating system's native keychain/credential manager:
//!
//! - **macOS**: Keychain Services
//! - **Windows**: Credential Manager
//! - **Linux**: Secret Service (GNOME Keyring / KWallet)
//!
//! One token is kept per organization under the key `{organization}/token`.
//! `AZURE_DEVOPS_PAT` always wins over a stored token; see
//! `azdo_core::Config::resolve`.
//!
//! # Example
//!
//! ```ignore
//! use azdo_storage::{KeychainStore, save_token, load_token};
//!
//! let store = KeychainStore::new();
//! save_token(&store, "contoso", "pat-xxx")?;
//! assert_eq!(load_token(&store, "contoso")?, Some("pat-xxx".to_string()));
//! ```

use azdo_core::{Error, Result};
use keyring::Entry;
use tracing::{debug, warn};

/// Service name used in OS keychain.
const SERVICE_NAME: &str = "azdo-tools";

/// Credential storage trait.
///
/// Implementations can use OS keychain, in-memory storage (for testing),
/// or other backends.
pub trait CredentialStore: Send + Sync {
    /// Store a credential securely.
    fn store(&self, key: &str, value: &str) -> Result<()>;

    /// Retrieve a stored credential.
    ///
    /// Returns `Ok(None)` if the credential doesn't exist.
    fn get(&self, key: &str) -> Result<Option<String>>;

    /// Delete a stored credential.
    ///
    /// Returns `Ok(())` even if the credential didn't exist.
    fn delete(&self, key: &str) -> Result<()>;

    /// Check if a credential exists.
    fn exists(&self, key: &str) -> bool {
        matches!(self.get(key), Ok(Some(_)))
    }
}

// =============================================================================
// KeychainStore - OS Keychain implementation
// =============================================================================

/// Credential store using the OS keychain.
#[derive(Debug)]
pub struct KeychainStore {
    service_name: String,
}

impl KeychainStore {
    /// Create a new keychain store with the default service name.
    pub fn new() -> Self {
        Self {
            service_name: SERVICE_NAME.to_string(),
        }
    }

    /// Create a keychain store with a custom service name.
    pub fn with_service_name(service_name: impl Into<String>) -> Self {
        Self {
            service_name: service_name.into(),
        }
    }

    fn entry(&self, key: &str) -> Result<Entry> {
        Entry::new(&self.service_name, key).map_err(|e| {
            Error::Storage(format!(
                "Failed to create keychain entry for '{}': {}",
                key, e
            ))
        })
    }
}

impl Default for KeychainStore {
    fn default() -> Self {
        Self::new()
    }
}

impl CredentialStore for KeychainStore {
    fn store(&self, key: &str, value: &str) -> Result<()> {
        debug!(key = key, "Storing credential in keychain");

        self.entry(key)?
            .set_password(value)
            .map_err(|e| Error::Storage(format!("Failed to store credential '{}': {}", key, e)))
    }

    fn get(&self, key: &str) -> Result<Option<String>> {
        debug!(key = key, "Retrieving credential from keychain");

        match self.entry(key)?.get_password() {
            Ok(password) => Ok(Some(password)),
            Err(keyring::Error::NoEntry) => {
                debug!(key = key, "Credential not found");
                Ok(None)
            }
            Err(e) => {
                warn!(key = key, error = %e, "Failed to retrieve credential");
                Err(Error::Storage(format!(
                    "Failed to retrieve credential '{}': {}",
                    key, e
                )))
            }
        }
    }

    fn delete(&self, key: &str) -> Result<()> {
        debug!(key = key, "Deleting credential from keychain");

        match self.entry(key)?.delete_credential() {
            Ok(()) | Err(keyring::Error::NoEntry) => Ok(()),
            Err(e) => Err(Error::Storage(format!(
                "Failed to delete credential '{}': {}",
                key, e
            ))),
        }
    }
}

// =============================================================================
// MemoryStore - In-memory implementation for testing
// =============================================================================

/// In-memory credential store for testing.
#[derive(Debug, Default)]
pub struct MemoryStore {
    credentials: std::sync::RwLock<std::collections::HashMap<String, String>>,
}

impl MemoryStore {
    /// Create a new in-memory store.
    pub fn new() -> Self {
        Self::default()
    }
}

impl CredentialStore for MemoryStore {
    fn store(&self, key: &str, value: &str) -> Result<()> {
        let mut creds = self
            .credentials
            .write()
            .map_err(|e| Error::Storage(format!("Lock poisoned: {}", e)))?;
        creds.insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn get(&self, key: &str) -> Result<Option<String>> {
        let creds = self
            .credentials
            .read()
            .map_err(|e| Error::Storage(format!("Lock poisoned: {}", e)))?;
        Ok(creds.get(key).cloned())
    }

    fn delete(&self, key: &str) -> Result<()> {
        let mut creds = self
            .credentials
            .write()
            .map_err(|e| Error::Storage(format!("Lock poisoned: {}", e)))?;
        creds.remove(key);
        Ok(())
    }
}

// =============================================================================
// Token helpers
// =============================================================================

/// Credential key for an organization's personal access token.
pub fn token_key(organization: &str) -> String {
    format!("{}/token", organization.to_lowercase())
}

/// Store an organization's token. Blank tokens are rejected.
pub fn save_token(store: &dyn CredentialStore, organization: &str, token: &str) -> Result<()> {
    let token = token.trim();
    if token.is_empty() {
        return Err(Error::Validation("token must not be empty".to_string()));
    }
    store.store(&token_key(organization), token)
}

/// Load an organization's token, treating a blank entry as absent.
pub fn load_token(store: &dyn CredentialStore, organization: &str) -> Result<Option<String>> {
    Ok(store
        .get(&token_key(organization))?
        .map(|t| t.trim().to_string())
        .filter(|t| !t.is_empty()))
}

/// Remove an organization's token.
pub fn delete_token(store: &dyn CredentialStore, organization: &str) -> Result<()> {
    store.delete(&token_key(organization))
}
