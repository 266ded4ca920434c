use crate::domain::models::Credential;
use crate::infrastructure::credential_store::CredentialStore;
use crate::infrastructure::error::InfraError;
use crate::infrastructure::sign_in_client::{SignInClient, SignInRequest};
use std::sync::{Arc, Mutex};

/// Owns the process-wide bearer token.
///
/// A stored token is trusted until a protected endpoint rejects it; callers
/// then `invalidate` and `acquire` again. The manager itself never retries.
pub struct TokenManager<C>
where
    C: SignInClient,
{
    client_credentials: SignInRequest,
    credential_store: Arc<dyn CredentialStore>,
    sign_in_client: Arc<C>,
    current: Mutex<Credential>,
}

impl<C> TokenManager<C>
where
    C: SignInClient,
{
    pub fn new(
        client_credentials: SignInRequest,
        credential_store: Arc<dyn CredentialStore>,
        sign_in_client: Arc<C>,
    ) -> Self {
        Self {
            client_credentials,
            credential_store,
            sign_in_client,
            current: Mutex::new(Credential::empty()),
        }
    }

    pub async fn acquire(&self) -> Result<Credential, InfraError> {
        let current = self.current_token();
        if !current.is_empty() {
            return Ok(current);
        }

        if let Some(stored) = self.credential_store.load_token()? {
            tracing::debug!("using persisted bearer token");
            self.set_current(stored.clone())?;
            return Ok(stored);
        }

        tracing::info!("signing in for a new bearer token");
        let token = self
            .sign_in_client
            .sign_in(self.client_credentials.clone())
            .await
            .inspect_err(|error| tracing::warn!(error = %error, "sign-in failed"))?;

        let credential = Credential::new(token);
        self.credential_store.save_token(&credential)?;
        self.set_current(credential.clone())?;
        Ok(credential)
    }

    pub fn invalidate(&self) -> Result<(), InfraError> {
        tracing::info!("invalidating bearer token");
        self.set_current(Credential::empty())?;
        self.credential_store.delete_token()
    }

    /// The in-memory token; empty when unauthenticated.
    pub fn current_token(&self) -> Credential {
        self.current
            .lock()
            .map(|guard| guard.clone())
            .unwrap_or_default()
    }

    fn set_current(&self, credential: Credential) -> Result<(), InfraError> {
        let mut guard = self
            .current
            .lock()
            .map_err(|error| InfraError::Credential(format!("token lock poisoned: {error}")))?;
        *guard = credential;
        Ok(())
    }
}
