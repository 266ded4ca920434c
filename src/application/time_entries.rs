use crate::domain::models::{Credential, TimeEntry, TodayAggregate, aggregate_entries, total_seconds};
use crate::domain::time_format::{DayWindow, LocalZone, format_tracked_duration};
use crate::infrastructure::error::InfraError;
use crate::infrastructure::summary_bridge::{TimeSummaryBridge, WidgetReloader};
use crate::infrastructure::timed_cache::{NowProvider, TimedCache};
use crate::infrastructure::tracking_client::TimeTrackingClient;
use async_trait::async_trait;
use chrono::Utc;
use std::sync::Arc;

pub const CACHED_ACTIVITY_TIMES_KEY: &str = "cachedActivityTimes";
pub const ACTIVITY_TIMES_FETCHED_AT_KEY: &str = "lastFetchTimeActivityTimes";

/// Delivers one time entry; `Ok` only when the service created it.
#[async_trait]
pub trait TimeEntrySubmitter: Send + Sync {
    async fn try_submit(&self, entry: &TimeEntry, credential: &Credential) -> Result<(), InfraError>;
}

pub struct TimeEntryService<C>
where
    C: TimeTrackingClient,
{
    client: Arc<C>,
    cache: TimedCache<TodayAggregate>,
    summary_bridge: TimeSummaryBridge,
    widget_reloader: Arc<dyn WidgetReloader>,
    zone: LocalZone,
    now_provider: NowProvider,
}

impl<C> TimeEntryService<C>
where
    C: TimeTrackingClient,
{
    pub fn new(
        client: Arc<C>,
        cache: TimedCache<TodayAggregate>,
        summary_bridge: TimeSummaryBridge,
        widget_reloader: Arc<dyn WidgetReloader>,
    ) -> Self {
        Self {
            client,
            cache,
            summary_bridge,
            widget_reloader,
            zone: LocalZone::System,
            now_provider: Arc::new(Utc::now),
        }
    }

    pub fn with_zone(mut self, zone: LocalZone) -> Self {
        self.zone = zone;
        self
    }

    pub fn with_now_provider(mut self, now_provider: NowProvider) -> Self {
        self.now_provider = now_provider;
        self
    }

    /// No retry here; a `false` result is for the caller to queue.
    pub async fn submit(&self, entry: &TimeEntry, credential: &Credential) -> bool {
        self.try_submit(entry, credential).await.is_ok()
    }

    /// Like `submit`, but keeps the failure so callers can react to a
    /// rejected token.
    pub async fn try_submit(&self, entry: &TimeEntry, credential: &Credential) -> Result<(), InfraError> {
        if let Err(message) = entry.validate() {
            tracing::warn!(activity_id = %entry.activity_id, %message, "refusing invalid time entry");
            return Err(InfraError::InvalidEntry(message));
        }

        self.client
            .create_time_entry(credential, entry)
            .await
            .inspect_err(|error| {
                tracing::warn!(activity_id = %entry.activity_id, error = %error, "time entry submission failed")
            })?;
        tracing::info!(
            activity_id = %entry.activity_id,
            seconds = entry.duration_seconds(),
            "time entry created"
        );
        Ok(())
    }

    /// Today's per-activity totals, served from the cache while fresh. A
    /// cache hit has no side effects.
    pub async fn fetch_today_aggregate(&self, credential: &Credential) -> Result<TodayAggregate, InfraError> {
        if let Some(cached) = self.cache.get()? {
            tracing::debug!(activities = cached.len(), "today aggregate served from cache");
            return Ok(cached);
        }
        self.refresh_today_aggregate(credential).await
    }

    /// Bypasses the cache: fetches today's entries, replaces the cache and
    /// publishes the new total to the widget.
    pub async fn refresh_today_aggregate(&self, credential: &Credential) -> Result<TodayAggregate, InfraError> {
        let window = DayWindow::containing((self.now_provider)(), self.zone);
        let entries = self
            .client
            .list_time_entries(credential, &window)
            .await
            .inspect_err(|error| tracing::warn!(error = %error, "today aggregate fetch failed"))?;

        let aggregate = aggregate_entries(&entries);
        self.cache.put(&aggregate)?;

        let summary = format_tracked_duration(total_seconds(&aggregate));
        self.summary_bridge.publish(&summary)?;
        self.widget_reloader.reload_timelines();

        tracing::info!(
            entries = entries.len(),
            activities = aggregate.len(),
            %summary,
            "today aggregate refreshed"
        );
        Ok(aggregate)
    }

    pub fn summary(&self) -> String {
        self.summary_bridge.read()
    }
}

#[async_trait]
impl<C> TimeEntrySubmitter for TimeEntryService<C>
where
    C: TimeTrackingClient,
{
    async fn try_submit(&self, entry: &TimeEntry, credential: &Credential) -> Result<(), InfraError> {
        TimeEntryService::try_submit(self, entry, credential).await
    }
}
