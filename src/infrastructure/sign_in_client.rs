use crate::infrastructure::error::InfraError;
use crate::infrastructure::tracking_client::api_endpoint;
use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use std::time::Duration;
use url::Url;

const SIGN_IN_PATH: [&str; 4] = ["api", "v4", "developer", "sign-in"];

#[derive(Clone, PartialEq, Eq)]
pub struct SignInRequest {
    pub api_key: String,
    pub api_secret: String,
}

impl std::fmt::Debug for SignInRequest {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SignInRequest")
            .field("api_key", &self.api_key)
            .field("api_secret", &"<redacted>")
            .finish()
    }
}

#[async_trait]
pub trait SignInClient: Send + Sync {
    /// Exchanges client credentials for a bearer token. Every failure is
    /// reported as `InfraError::AuthFailure`.
    async fn sign_in(&self, request: SignInRequest) -> Result<String, InfraError>;
}

#[derive(Debug, Clone)]
pub struct ReqwestSignInClient {
    client: Client,
    base_url: Url,
}

#[derive(Debug, serde::Serialize)]
#[serde(rename_all = "camelCase")]
struct SignInPayload<'a> {
    api_key: &'a str,
    api_secret: &'a str,
}

#[derive(Debug, serde::Deserialize)]
struct SignInResponsePayload {
    token: Option<String>,
}

impl ReqwestSignInClient {
    pub fn new(base_url: Url, timeout: Duration) -> Result<Self, InfraError> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|error| InfraError::InvalidConfig(format!("failed to build http client: {error}")))?;
        Ok(Self { client, base_url })
    }

    fn endpoint(&self) -> Result<Url, InfraError> {
        api_endpoint(&self.base_url, &SIGN_IN_PATH)
    }
}

#[async_trait]
impl SignInClient for ReqwestSignInClient {
    async fn sign_in(&self, request: SignInRequest) -> Result<String, InfraError> {
        let response = self
            .client
            .post(self.endpoint()?)
            .json(&SignInPayload {
                api_key: &request.api_key,
                api_secret: &request.api_secret,
            })
            .send()
            .await
            .map_err(|error| InfraError::AuthFailure(format!("network error during sign-in: {error}")))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|error| InfraError::AuthFailure(format!("failed reading sign-in response: {error}")))?;

        if status != StatusCode::OK {
            return Err(InfraError::AuthFailure(format!(
                "sign-in rejected: http {}",
                status.as_u16()
            )));
        }

        let parsed: SignInResponsePayload = serde_json::from_str(&body)
            .map_err(|error| InfraError::AuthFailure(format!("invalid sign-in payload: {error}")))?;

        parsed
            .token
            .map(|token| token.trim().to_string())
            .filter(|token| !token.is_empty())
            .ok_or_else(|| InfraError::AuthFailure("sign-in response did not include token".to_string()))
    }
}
