use crate::infrastructure::error::InfraError;
use crate::infrastructure::storage::{KeyValueStore, load_json, save_json};
use chrono::{DateTime, Duration, Utc};
use serde::Serialize;
use serde::de::DeserializeOwned;
use std::marker::PhantomData;
use std::sync::Arc;

pub type NowProvider = Arc<dyn Fn() -> DateTime<Utc> + Send + Sync>;

pub const DEFAULT_CACHE_WINDOW_MINUTES: i64 = 60;

/// Expiring cache over one value key and one timestamp key.
///
/// A stale value stays in the store until the next `put` replaces it; it is
/// never served.
pub struct TimedCache<T> {
    store: Arc<dyn KeyValueStore>,
    value_key: String,
    fetched_at_key: String,
    window: Duration,
    now_provider: NowProvider,
    _value: PhantomData<fn() -> T>,
}

impl<T> TimedCache<T>
where
    T: Serialize + DeserializeOwned,
{
    pub fn new(
        store: Arc<dyn KeyValueStore>,
        value_key: impl Into<String>,
        fetched_at_key: impl Into<String>,
    ) -> Self {
        Self {
            store,
            value_key: value_key.into(),
            fetched_at_key: fetched_at_key.into(),
            window: Duration::minutes(DEFAULT_CACHE_WINDOW_MINUTES),
            now_provider: Arc::new(Utc::now),
            _value: PhantomData,
        }
    }

    pub fn with_window(mut self, window: Duration) -> Self {
        self.window = window;
        self
    }

    pub fn with_now_provider(mut self, now_provider: NowProvider) -> Self {
        self.now_provider = now_provider;
        self
    }

    /// A stamp from the future (clock moved backwards) or a payload that no
    /// longer decodes reads as stale.
    pub fn get(&self) -> Result<Option<T>, InfraError> {
        let Some(fetched_at) = self.fetched_at()? else {
            return Ok(None);
        };
        let age = (self.now_provider)() - fetched_at;
        if age < Duration::zero() || age >= self.window {
            return Ok(None);
        }
        match load_json(self.store.as_ref(), &self.value_key) {
            Err(InfraError::Json(error)) => {
                tracing::warn!(key = %self.value_key, error = %error, "cached value unreadable; treating as stale");
                Ok(None)
            }
            other => other,
        }
    }

    pub fn put(&self, value: &T) -> Result<(), InfraError> {
        save_json(self.store.as_ref(), &self.value_key, value)?;
        self.store
            .set(&self.fetched_at_key, &(self.now_provider)().to_rfc3339())
    }

    fn fetched_at(&self) -> Result<Option<DateTime<Utc>>, InfraError> {
        let Some(raw) = self.store.get(&self.fetched_at_key)? else {
            return Ok(None);
        };
        // An unreadable stamp makes the entry stale rather than failing reads.
        Ok(DateTime::parse_from_rfc3339(&raw)
            .ok()
            .map(|parsed| parsed.with_timezone(&Utc)))
    }
}
