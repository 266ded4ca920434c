use crate::domain::models::{Activity, Credential, TimeEntry, TrackedEntry};
use crate::domain::time_format::{DayWindow, format_api_timestamp, parse_api_timestamp};
use crate::infrastructure::error::InfraError;
use async_trait::async_trait;
use reqwest::{Client, Response, StatusCode};
use std::time::Duration;
use url::Url;

#[async_trait]
pub trait TimeTrackingClient: Send + Sync {
    async fn list_activities(&self, credential: &Credential) -> Result<Vec<Activity>, InfraError>;

    /// Succeeds only on `201 Created`.
    async fn create_time_entry(
        &self,
        credential: &Credential,
        entry: &TimeEntry,
    ) -> Result<(), InfraError>;

    /// Entries with missing or unreadable fields are dropped.
    async fn list_time_entries(
        &self,
        credential: &Credential,
        window: &DayWindow,
    ) -> Result<Vec<TrackedEntry>, InfraError>;
}

/// Appends path segments to the API base URL, keeping any base path prefix.
pub fn api_endpoint(base_url: &Url, segments: &[&str]) -> Result<Url, InfraError> {
    let mut url = base_url.clone();
    {
        let mut path = url
            .path_segments_mut()
            .map_err(|_| InfraError::InvalidConfig("api base URL cannot be a base".to_string()))?;
        path.pop_if_empty();
        path.extend(segments);
    }
    Ok(url)
}

#[derive(Debug, Clone)]
pub struct ReqwestTimeTrackingClient {
    client: Client,
    base_url: Url,
}

#[derive(Debug, serde::Deserialize)]
struct ActivitiesResponse {
    activities: Vec<Activity>,
}

#[derive(Debug, serde::Serialize)]
#[serde(rename_all = "camelCase")]
struct CreateTimeEntryPayload<'a> {
    activity_id: &'a str,
    started_at: String,
    stopped_at: String,
    note: NotePayload<'a>,
}

#[derive(Debug, serde::Serialize)]
struct NotePayload<'a> {
    text: &'a str,
}

#[derive(Debug, serde::Deserialize)]
#[serde(rename_all = "camelCase")]
struct TimeEntriesResponse {
    #[serde(default)]
    time_entries: Vec<RemoteTimeEntry>,
}

#[derive(Debug, serde::Deserialize)]
struct RemoteTimeEntry {
    duration: Option<RemoteDuration>,
    activity: Option<RemoteActivity>,
}

#[derive(Debug, serde::Deserialize)]
#[serde(rename_all = "camelCase")]
struct RemoteDuration {
    started_at: Option<String>,
    stopped_at: Option<String>,
}

#[derive(Debug, serde::Deserialize)]
struct RemoteActivity {
    name: Option<String>,
    color: Option<String>,
}

impl RemoteTimeEntry {
    fn into_tracked(self) -> Option<TrackedEntry> {
        let duration = self.duration?;
        let activity = self.activity?;
        let started_at = parse_api_timestamp(duration.started_at.as_deref()?)?;
        let stopped_at = parse_api_timestamp(duration.stopped_at.as_deref()?)?;
        let activity_name = activity.name.filter(|name| !name.trim().is_empty())?;
        Some(TrackedEntry {
            activity_name,
            color: activity.color?,
            started_at,
            stopped_at,
        })
    }
}

impl ReqwestTimeTrackingClient {
    pub fn new(base_url: Url, timeout: Duration) -> Result<Self, InfraError> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|error| InfraError::InvalidConfig(format!("failed to build http client: {error}")))?;
        Ok(Self { client, base_url })
    }

    fn endpoint(&self, segments: &[&str]) -> Result<Url, InfraError> {
        api_endpoint(&self.base_url, segments)
    }

    fn ensure_credential(credential: &Credential) -> Result<(), InfraError> {
        if credential.is_empty() {
            return Err(InfraError::AuthRejected);
        }
        Ok(())
    }

    async fn read_body(response: Response, context: &str) -> Result<(StatusCode, String), InfraError> {
        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|error| InfraError::Transport(format!("failed reading {context} response: {error}")))?;
        Ok((status, body))
    }

    fn http_error(status: StatusCode, context: &str) -> InfraError {
        if status == StatusCode::UNAUTHORIZED {
            return InfraError::AuthRejected;
        }
        InfraError::Transport(format!("{context}: unexpected http {}", status.as_u16()))
    }
}

#[async_trait]
impl TimeTrackingClient for ReqwestTimeTrackingClient {
    async fn list_activities(&self, credential: &Credential) -> Result<Vec<Activity>, InfraError> {
        Self::ensure_credential(credential)?;

        let response = self
            .client
            .get(self.endpoint(&["api", "v3", "activities"])?)
            .bearer_auth(credential.as_str())
            .send()
            .await
            .map_err(|error| InfraError::Transport(format!("network error while listing activities: {error}")))?;

        let (status, body) = Self::read_body(response, "activities").await?;
        if status != StatusCode::OK {
            return Err(Self::http_error(status, "list activities"));
        }

        let parsed: ActivitiesResponse = serde_json::from_str(&body)
            .map_err(|error| InfraError::Decode(format!("invalid activities payload: {error}")))?;
        Ok(parsed.activities)
    }

    async fn create_time_entry(
        &self,
        credential: &Credential,
        entry: &TimeEntry,
    ) -> Result<(), InfraError> {
        Self::ensure_credential(credential)?;

        let payload = CreateTimeEntryPayload {
            activity_id: &entry.activity_id,
            started_at: format_api_timestamp(entry.started_at),
            stopped_at: format_api_timestamp(entry.stopped_at),
            note: NotePayload { text: &entry.note },
        };

        let response = self
            .client
            .post(self.endpoint(&["api", "v4", "time-entries"])?)
            .bearer_auth(credential.as_str())
            .json(&payload)
            .send()
            .await
            .map_err(|error| InfraError::Transport(format!("network error while creating time entry: {error}")))?;

        let (status, _) = Self::read_body(response, "time entry create").await?;
        if status != StatusCode::CREATED {
            return Err(Self::http_error(status, "create time entry"));
        }
        Ok(())
    }

    async fn list_time_entries(
        &self,
        credential: &Credential,
        window: &DayWindow,
    ) -> Result<Vec<TrackedEntry>, InfraError> {
        Self::ensure_credential(credential)?;

        let start = window.start_param();
        let end = window.end_param();
        let response = self
            .client
            .get(self.endpoint(&["api", "v4", "time-entries", &start, &end])?)
            .bearer_auth(credential.as_str())
            .send()
            .await
            .map_err(|error| InfraError::Transport(format!("network error while listing time entries: {error}")))?;

        let (status, body) = Self::read_body(response, "time entries").await?;
        if status != StatusCode::OK {
            return Err(Self::http_error(status, "list time entries"));
        }

        let parsed: TimeEntriesResponse = serde_json::from_str(&body)
            .map_err(|error| InfraError::Decode(format!("invalid time entries payload: {error}")))?;
        Ok(parsed
            .time_entries
            .into_iter()
            .filter_map(RemoteTimeEntry::into_tracked)
            .collect())
    }
}
