use crate::application::time_entries::TimeEntrySubmitter;
use crate::domain::models::{Credential, FailedTimeEntry};
use crate::infrastructure::backlog_repository::BacklogRepository;
use crate::infrastructure::error::InfraError;
use std::sync::Arc;

/// Durable queue of time entries that could not be delivered, plus the
/// replay that drains it.
///
/// Drains must be serialized by the caller; see `SyncSession::drain_backlog`.
pub struct OfflineBacklog<E>
where
    E: TimeEntrySubmitter,
{
    repository: Arc<dyn BacklogRepository>,
    submitter: Arc<E>,
}

impl<E> OfflineBacklog<E>
where
    E: TimeEntrySubmitter,
{
    pub fn new(repository: Arc<dyn BacklogRepository>, submitter: Arc<E>) -> Self {
        Self {
            repository,
            submitter,
        }
    }

    pub fn enqueue(&self, entry: FailedTimeEntry) -> Result<(), InfraError> {
        let mut queue = self.repository.load()?;
        tracing::info!(
            activity_id = %entry.activity_id,
            started_at = %entry.started_at,
            queued = queue.len() + 1,
            "time entry queued for later delivery"
        );
        queue.push(entry);
        self.repository.save(&queue)
    }

    pub fn pending(&self) -> Result<Vec<FailedTimeEntry>, InfraError> {
        self.repository.load()
    }

    /// Resubmits queued entries in insertion order. A failed entry stays
    /// queued and the drain moves on, except on a rejected token: then the
    /// drain stops and the report says so.
    ///
    /// The queue is re-read before the single write at the end, so entries
    /// enqueued while the drain was in flight are kept.
    pub async fn drain(&self, credential: &Credential) -> Result<DrainReport, InfraError> {
        let snapshot = self.repository.load()?;
        if snapshot.is_empty() {
            return Ok(DrainReport::default());
        }

        let mut delivered: Vec<FailedTimeEntry> = Vec::new();
        let mut auth_rejected = false;
        for entry in &snapshot {
            match self.submitter.try_submit(&entry.to_time_entry(), credential).await {
                Ok(()) => delivered.push(entry.clone()),
                Err(InfraError::AuthRejected) => {
                    tracing::warn!(activity_id = %entry.activity_id, "token rejected; stopping backlog drain");
                    auth_rejected = true;
                    break;
                }
                Err(error) => {
                    tracing::debug!(activity_id = %entry.activity_id, error = %error, "backlog entry still undeliverable");
                }
            }
        }

        if delivered.is_empty() {
            tracing::warn!(pending = snapshot.len(), "backlog drain delivered nothing");
            return Ok(DrainReport {
                delivered: 0,
                remaining: snapshot,
                auth_rejected,
            });
        }

        let mut remaining = self.repository.load()?;
        remaining.retain(|queued| !delivered.iter().any(|done| done.same_submission(queued)));
        self.repository.save(&remaining)?;

        tracing::info!(
            delivered = delivered.len(),
            remaining = remaining.len(),
            auth_rejected,
            "backlog drained"
        );
        Ok(DrainReport {
            delivered: delivered.len(),
            remaining,
            auth_rejected,
        })
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DrainReport {
    /// Entries confirmed by the service during this drain.
    pub delivered: usize,
    /// The queue as persisted after the drain.
    pub remaining: Vec<FailedTimeEntry>,
    pub auth_rejected: bool,
}
