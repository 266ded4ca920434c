use crate::infrastructure::error::InfraError;
use crate::infrastructure::storage::KeyValueStore;
use std::sync::Arc;

pub const TOTAL_TRACKED_TIME_KEY: &str = "totalTrackedTime";
pub const DEFAULT_SUMMARY: &str = "0m";

/// "Total time today" string shared with the widget process.
#[derive(Clone)]
pub struct TimeSummaryBridge {
    shared_store: Arc<dyn KeyValueStore>,
}

impl TimeSummaryBridge {
    pub fn new(shared_store: Arc<dyn KeyValueStore>) -> Self {
        Self { shared_store }
    }

    pub fn publish(&self, summary: &str) -> Result<(), InfraError> {
        self.shared_store.set(TOTAL_TRACKED_TIME_KEY, summary)
    }

    /// Falls back to `"0m"` when nothing was published or the store is
    /// unreadable.
    pub fn read(&self) -> String {
        match self.shared_store.get(TOTAL_TRACKED_TIME_KEY) {
            Ok(Some(summary)) => summary,
            Ok(None) => DEFAULT_SUMMARY.to_string(),
            Err(error) => {
                tracing::warn!(error = %error, "failed to read shared time summary");
                DEFAULT_SUMMARY.to_string()
            }
        }
    }
}

/// Hook invoked after a new summary is published so the widget host can
/// reload its timelines.
pub trait WidgetReloader: Send + Sync {
    fn reload_timelines(&self);
}

#[derive(Debug, Default, Clone, Copy)]
pub struct NoopWidgetReloader;

impl WidgetReloader for NoopWidgetReloader {
    fn reload_timelines(&self) {}
}
