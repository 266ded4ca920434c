use crate::domain::models::FailedTimeEntry;
use crate::infrastructure::error::InfraError;
use crate::infrastructure::storage::{KeyValueStore, load_json, save_json};
use std::sync::Arc;

pub const BACKLOG_QUEUE_KEY: &str = "backlogQueue";
/// Where an undecodable queue is moved so new entries can still be stored.
pub const CORRUPT_BACKLOG_QUEUE_KEY: &str = "backlogQueue.corrupt";

pub trait BacklogRepository: Send + Sync {
    /// Entries in insertion order.
    fn load(&self) -> Result<Vec<FailedTimeEntry>, InfraError>;
    /// Replaces the whole persisted queue.
    fn save(&self, entries: &[FailedTimeEntry]) -> Result<(), InfraError>;
}

#[derive(Clone)]
pub struct KeyValueBacklogRepository {
    store: Arc<dyn KeyValueStore>,
}

impl KeyValueBacklogRepository {
    pub fn new(store: Arc<dyn KeyValueStore>) -> Self {
        Self { store }
    }
}

impl BacklogRepository for KeyValueBacklogRepository {
    fn load(&self) -> Result<Vec<FailedTimeEntry>, InfraError> {
        match load_json(self.store.as_ref(), BACKLOG_QUEUE_KEY) {
            Ok(entries) => Ok(entries.unwrap_or_default()),
            Err(InfraError::Json(error)) => {
                tracing::error!(
                    error = %error,
                    moved_to = CORRUPT_BACKLOG_QUEUE_KEY,
                    "backlog queue unreadable; starting a fresh queue"
                );
                if let Some(raw) = self.store.get(BACKLOG_QUEUE_KEY)? {
                    self.store.set(CORRUPT_BACKLOG_QUEUE_KEY, &raw)?;
                }
                self.store.remove(BACKLOG_QUEUE_KEY)?;
                Ok(Vec::new())
            }
            Err(error) => Err(error),
        }
    }

    fn save(&self, entries: &[FailedTimeEntry]) -> Result<(), InfraError> {
        save_json(self.store.as_ref(), BACKLOG_QUEUE_KEY, entries)
    }
}
