use thiserror::Error;

#[derive(Debug, Error)]
pub enum InfraError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),
    #[error("Invalid config: {0}")]
    InvalidConfig(String),
    #[error("Credential store error: {0}")]
    Credential(String),
    #[error("Storage error: {0}")]
    Storage(String),
    #[error("Invalid time entry: {0}")]
    InvalidEntry(String),
    #[error("Sign-in failed: {0}")]
    AuthFailure(String),
    #[error("Bearer token was rejected by the service")]
    AuthRejected,
    #[error("Transport error: {0}")]
    Transport(String),
    #[error("Decode error: {0}")]
    Decode(String),
}

impl InfraError {
    pub fn is_auth_rejected(&self) -> bool {
        matches!(self, InfraError::AuthRejected)
    }
}
