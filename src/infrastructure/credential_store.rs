use crate::domain::models::Credential;
use crate::infrastructure::error::InfraError;
use crate::infrastructure::storage::KeyValueStore;
use std::sync::Arc;

pub const TOKEN_KEY: &str = "token";

pub trait CredentialStore: Send + Sync {
    fn save_token(&self, token: &Credential) -> Result<(), InfraError>;
    fn load_token(&self) -> Result<Option<Credential>, InfraError>;
    fn delete_token(&self) -> Result<(), InfraError>;
}

/// Keeps the bearer token under `token` in the key/value store.
#[derive(Clone)]
pub struct KeyValueCredentialStore {
    store: Arc<dyn KeyValueStore>,
}

impl KeyValueCredentialStore {
    pub fn new(store: Arc<dyn KeyValueStore>) -> Self {
        Self { store }
    }
}

impl CredentialStore for KeyValueCredentialStore {
    fn save_token(&self, token: &Credential) -> Result<(), InfraError> {
        self.store.set(TOKEN_KEY, token.as_str())
    }

    fn load_token(&self) -> Result<Option<Credential>, InfraError> {
        Ok(self
            .store
            .get(TOKEN_KEY)?
            .map(Credential::new)
            .filter(|token| !token.is_empty()))
    }

    fn delete_token(&self) -> Result<(), InfraError> {
        self.store.remove(TOKEN_KEY)
    }
}

/// OS keychain backed store.
#[derive(Debug, Clone)]
pub struct KeyringCredentialStore {
    service_name: String,
    account_name: String,
}

impl KeyringCredentialStore {
    pub fn new(service_name: impl Into<String>, account_name: impl Into<String>) -> Self {
        Self {
            service_name: service_name.into(),
            account_name: account_name.into(),
        }
    }

    fn entry(&self) -> Result<keyring::Entry, InfraError> {
        keyring::Entry::new(&self.service_name, &self.account_name)
            .map_err(|error| InfraError::Credential(error.to_string()))
    }
}

impl Default for KeyringCredentialStore {
    fn default() -> Self {
        Self::new("tracksync.api.token", "default")
    }
}

impl CredentialStore for KeyringCredentialStore {
    fn save_token(&self, token: &Credential) -> Result<(), InfraError> {
        self.entry()?
            .set_password(token.as_str())
            .map_err(|error| InfraError::Credential(error.to_string()))
    }

    fn load_token(&self) -> Result<Option<Credential>, InfraError> {
        match self.entry()?.get_password() {
            Ok(value) => Ok(Some(Credential::new(value)).filter(|token| !token.is_empty())),
            Err(keyring::Error::NoEntry) => Ok(None),
            Err(error) => Err(InfraError::Credential(error.to_string())),
        }
    }

    fn delete_token(&self) -> Result<(), InfraError> {
        match self.entry()?.delete_credential() {
            Ok(()) => Ok(()),
            Err(keyring::Error::NoEntry) => Ok(()),
            Err(error) => Err(InfraError::Credential(error.to_string())),
        }
    }
}
