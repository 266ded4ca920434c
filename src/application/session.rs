use crate::application::activity_catalog::{
    ACTIVITIES_FETCHED_AT_KEY, ActivityCatalogService, CACHED_ACTIVITIES_KEY,
};
use crate::application::auth::TokenManager;
use crate::application::backlog::OfflineBacklog;
use crate::application::bootstrap::bootstrap_workspace;
use crate::application::time_entries::{
    ACTIVITY_TIMES_FETCHED_AT_KEY, CACHED_ACTIVITY_TIMES_KEY, TimeEntryService,
};
use crate::domain::models::{Activity, FailedTimeEntry, TimeEntry, TodayAggregate};
use crate::infrastructure::backlog_repository::{BacklogRepository, KeyValueBacklogRepository};
use crate::infrastructure::config::{CredentialBackend, load_client_credentials};
use crate::infrastructure::credential_store::{
    CredentialStore, KeyValueCredentialStore, KeyringCredentialStore,
};
use crate::infrastructure::error::InfraError;
use crate::infrastructure::sign_in_client::{ReqwestSignInClient, SignInClient};
use crate::infrastructure::storage::{
    APP_NAMESPACE, KeyValueStore, SHARED_NAMESPACE, SqliteKeyValueStore,
};
use crate::infrastructure::summary_bridge::{NoopWidgetReloader, TimeSummaryBridge};
use crate::infrastructure::timed_cache::TimedCache;
use crate::infrastructure::tracking_client::{ReqwestTimeTrackingClient, TimeTrackingClient};
use chrono::{DateTime, Utc};
use std::path::Path;
use std::sync::Arc;
use tokio::sync::Mutex;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecordOutcome {
    Submitted,
    /// Kept in the offline backlog for a later drain.
    Queued,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DrainOutcome {
    /// Nothing was queued.
    Idle,
    /// Another drain holds the gate.
    Busy,
    Drained { delivered: usize, remaining: usize },
    /// The token was rejected part-way; it has been invalidated and the rest
    /// stays queued.
    Rejected { delivered: usize, remaining: usize },
}

pub type DefaultSyncSession = SyncSession<ReqwestSignInClient, ReqwestTimeTrackingClient>;

/// The call sequence the app's screens and background refresh run against
/// the core: token first, invalidate on rejection, queue what cannot be
/// delivered.
pub struct SyncSession<S, C>
where
    S: SignInClient,
    C: TimeTrackingClient,
{
    token_manager: TokenManager<S>,
    activity_catalog: ActivityCatalogService<C>,
    time_entries: Arc<TimeEntryService<C>>,
    backlog: OfflineBacklog<TimeEntryService<C>>,
    drain_gate: Mutex<()>,
}

impl DefaultSyncSession {
    /// Bootstraps `workspace_root` and wires the HTTP clients and SQLite
    /// stores described by its `config/app.json`.
    pub fn open(workspace_root: &Path) -> Result<Self, InfraError> {
        let bootstrap = bootstrap_workspace(workspace_root)?;
        let config = bootstrap.config;
        let base_url = config.base_url()?;
        let timeout = config.request_timeout();

        let app_store: Arc<dyn KeyValueStore> =
            Arc::new(SqliteKeyValueStore::new(&bootstrap.database_path, APP_NAMESPACE));
        let shared_store: Arc<dyn KeyValueStore> =
            Arc::new(SqliteKeyValueStore::new(&bootstrap.database_path, SHARED_NAMESPACE));
        let credential_store: Arc<dyn CredentialStore> = match config.credential_backend {
            CredentialBackend::Store => Arc::new(KeyValueCredentialStore::new(Arc::clone(&app_store))),
            CredentialBackend::Keyring => Arc::new(KeyringCredentialStore::default()),
        };

        let sign_in_client = Arc::new(ReqwestSignInClient::new(base_url.clone(), timeout)?);
        let tracking_client = Arc::new(ReqwestTimeTrackingClient::new(base_url, timeout)?);

        let token_manager =
            TokenManager::new(load_client_credentials()?, credential_store, sign_in_client);
        let activity_catalog = ActivityCatalogService::new(
            Arc::clone(&tracking_client),
            TimedCache::new(Arc::clone(&app_store), CACHED_ACTIVITIES_KEY, ACTIVITIES_FETCHED_AT_KEY)
                .with_window(config.cache_window()),
        );
        let time_entries = TimeEntryService::new(
            tracking_client,
            TimedCache::new(
                Arc::clone(&app_store),
                CACHED_ACTIVITY_TIMES_KEY,
                ACTIVITY_TIMES_FETCHED_AT_KEY,
            )
            .with_window(config.cache_window()),
            TimeSummaryBridge::new(shared_store),
            Arc::new(NoopWidgetReloader),
        )
        .with_zone(config.local_zone()?);

        tracing::info!(
            workspace_root = %bootstrap.workspace_root.display(),
            credential_backend = ?config.credential_backend,
            "sync session opened"
        );

        Ok(Self::new(
            token_manager,
            activity_catalog,
            Arc::new(time_entries),
            Arc::new(KeyValueBacklogRepository::new(app_store)),
        ))
    }
}

impl<S, C> SyncSession<S, C>
where
    S: SignInClient,
    C: TimeTrackingClient,
{
    pub fn new(
        token_manager: TokenManager<S>,
        activity_catalog: ActivityCatalogService<C>,
        time_entries: Arc<TimeEntryService<C>>,
        backlog_repository: Arc<dyn BacklogRepository>,
    ) -> Self {
        let backlog = OfflineBacklog::new(backlog_repository, Arc::clone(&time_entries));
        Self {
            token_manager,
            activity_catalog,
            time_entries,
            backlog,
            drain_gate: Mutex::new(()),
        }
    }

    pub async fn load_activities(&self) -> Result<Vec<Activity>, InfraError> {
        let credential = self.token_manager.acquire().await?;
        self.activity_catalog
            .fetch_activities(&credential)
            .await
            .inspect_err(|error| self.invalidate_if_rejected(error))
    }

    /// Submits a finished timer. Anything short of a confirmed creation ends
    /// up in the backlog.
    pub async fn record_entry(
        &self,
        activity_id: &str,
        started_at: DateTime<Utc>,
        stopped_at: DateTime<Utc>,
        note: &str,
    ) -> Result<RecordOutcome, InfraError> {
        let entry = TimeEntry::new(activity_id, started_at, stopped_at, note);
        entry.validate().map_err(InfraError::InvalidEntry)?;

        let credential = match self.token_manager.acquire().await {
            Ok(credential) => credential,
            Err(error) => {
                tracing::warn!(error = %error, "no token; queueing time entry");
                self.backlog.enqueue(FailedTimeEntry::from(entry))?;
                return Ok(RecordOutcome::Queued);
            }
        };

        if let Err(error) = self.time_entries.try_submit(&entry, &credential).await {
            self.invalidate_if_rejected(&error);
            self.backlog.enqueue(FailedTimeEntry::from(entry))?;
            return Ok(RecordOutcome::Queued);
        }

        if let Err(error) = self.time_entries.refresh_today_aggregate(&credential).await {
            self.invalidate_if_rejected(&error);
            tracing::warn!(error = %error, "aggregate refresh after submit failed");
        }
        Ok(RecordOutcome::Submitted)
    }

    /// Background refresh: replay the backlog, then bring today's total up
    /// to date.
    pub async fn refresh_summary(&self) -> Result<TodayAggregate, InfraError> {
        let delivered = match self.drain_backlog().await {
            Ok(DrainOutcome::Drained { delivered, .. } | DrainOutcome::Rejected { delivered, .. }) => {
                delivered
            }
            Ok(_) => 0,
            Err(error) => {
                tracing::warn!(error = %error, "backlog drain skipped");
                0
            }
        };

        let credential = self.token_manager.acquire().await?;
        let result = if delivered > 0 {
            self.time_entries.refresh_today_aggregate(&credential).await
        } else {
            self.time_entries.fetch_today_aggregate(&credential).await
        };
        result.inspect_err(|error| self.invalidate_if_rejected(error))
    }

    /// At most one drain runs per session; an overlapping call returns
    /// `DrainOutcome::Busy` without touching the queue.
    pub async fn drain_backlog(&self) -> Result<DrainOutcome, InfraError> {
        let Ok(_gate) = self.drain_gate.try_lock() else {
            tracing::debug!("backlog drain already in progress");
            return Ok(DrainOutcome::Busy);
        };

        if self.backlog.pending()?.is_empty() {
            return Ok(DrainOutcome::Idle);
        }

        let credential = self.token_manager.acquire().await?;
        let report = self.backlog.drain(&credential).await?;
        let (delivered, remaining) = (report.delivered, report.remaining.len());
        if report.auth_rejected {
            self.invalidate_if_rejected(&InfraError::AuthRejected);
            return Ok(DrainOutcome::Rejected {
                delivered,
                remaining,
            });
        }
        Ok(DrainOutcome::Drained {
            delivered,
            remaining,
        })
    }

    pub fn pending_entries(&self) -> Result<Vec<FailedTimeEntry>, InfraError> {
        self.backlog.pending()
    }

    pub fn summary(&self) -> String {
        self.time_entries.summary()
    }

    fn invalidate_if_rejected(&self, error: &InfraError) {
        if !error.is_auth_rejected() {
            return;
        }
        if let Err(invalidate_error) = self.token_manager.invalidate() {
            tracing::error!(error = %invalidate_error, "failed to clear rejected token");
        }
    }
}
