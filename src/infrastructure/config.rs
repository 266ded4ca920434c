use crate::domain::time_format::LocalZone;
use crate::infrastructure::error::InfraError;
use crate::infrastructure::sign_in_client::SignInRequest;
use chrono::Duration;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use url::Url;

const APP_JSON: &str = "app.json";
const DEFAULT_API_BASE_URL: &str = "https://api.timeular.com";
const API_KEY_VAR: &str = "API_KEY";
const API_SECRET_VAR: &str = "API_SECRET";

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum CredentialBackend {
    Store,
    Keyring,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct AppConfig {
    pub schema: u8,
    pub api_base_url: String,
    #[serde(default)]
    pub timezone: Option<String>,
    pub request_timeout_seconds: u64,
    pub cache_window_minutes: i64,
    pub credential_backend: CredentialBackend,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            schema: 1,
            api_base_url: DEFAULT_API_BASE_URL.to_string(),
            timezone: None,
            request_timeout_seconds: 30,
            cache_window_minutes: 60,
            credential_backend: CredentialBackend::Store,
        }
    }
}

impl AppConfig {
    pub fn validate(&self) -> Result<(), InfraError> {
        if self.schema != 1 {
            return Err(InfraError::InvalidConfig(format!(
                "unsupported schema {}",
                self.schema
            )));
        }
        if self.request_timeout_seconds == 0 {
            return Err(InfraError::InvalidConfig(
                "requestTimeoutSeconds must be > 0".to_string(),
            ));
        }
        if self.cache_window_minutes <= 0 {
            return Err(InfraError::InvalidConfig(
                "cacheWindowMinutes must be > 0".to_string(),
            ));
        }
        self.base_url()?;
        self.local_zone()?;
        Ok(())
    }

    pub fn base_url(&self) -> Result<Url, InfraError> {
        Url::parse(self.api_base_url.trim())
            .map_err(|error| InfraError::InvalidConfig(format!("invalid apiBaseUrl: {error}")))
    }

    pub fn local_zone(&self) -> Result<LocalZone, InfraError> {
        LocalZone::parse(self.timezone.as_deref()).map_err(InfraError::InvalidConfig)
    }

    pub fn request_timeout(&self) -> std::time::Duration {
        std::time::Duration::from_secs(self.request_timeout_seconds)
    }

    pub fn cache_window(&self) -> Duration {
        Duration::minutes(self.cache_window_minutes)
    }
}

pub fn ensure_default_config(config_dir: &Path) -> Result<(), InfraError> {
    let path = config_dir.join(APP_JSON);
    if !path.exists() {
        let formatted = serde_json::to_string_pretty(&AppConfig::default())?;
        fs::write(path, format!("{formatted}\n"))?;
    }
    Ok(())
}

pub fn load_config(config_dir: &Path) -> Result<AppConfig, InfraError> {
    let path = config_dir.join(APP_JSON);
    let raw = fs::read_to_string(&path)?;
    let parsed: serde_json::Value = serde_json::from_str(&raw)?;
    let schema = parsed
        .get("schema")
        .and_then(serde_json::Value::as_u64)
        .ok_or_else(|| InfraError::InvalidConfig(format!("missing schema in {}", path.display())))?;
    if schema != 1 {
        return Err(InfraError::InvalidConfig(format!(
            "unsupported schema {} in {}",
            schema,
            path.display()
        )));
    }
    let config: AppConfig = serde_json::from_value(parsed)?;
    config.validate()?;
    Ok(config)
}

/// Reads the client credentials used for sign-in, loading `.env` first when
/// present.
pub fn load_client_credentials() -> Result<SignInRequest, InfraError> {
    dotenvy::dotenv().ok();
    client_credentials_from(|name| std::env::var(name).ok())
}

fn client_credentials_from<F>(lookup: F) -> Result<SignInRequest, InfraError>
where
    F: Fn(&str) -> Option<String>,
{
    let read = |name: &str| {
        lookup(name)
            .map(|value| value.trim().to_string())
            .filter(|value| !value.is_empty())
            .ok_or_else(|| InfraError::InvalidConfig(format!("{name} is not set")))
    };
    Ok(SignInRequest {
        api_key: read(API_KEY_VAR)?,
        api_secret: read(API_SECRET_VAR)?,
    })
}
