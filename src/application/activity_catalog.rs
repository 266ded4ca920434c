use crate::domain::models::{Activity, Credential};
use crate::infrastructure::error::InfraError;
use crate::infrastructure::timed_cache::TimedCache;
use crate::infrastructure::tracking_client::TimeTrackingClient;
use std::sync::Arc;

pub const CACHED_ACTIVITIES_KEY: &str = "cachedActivities";
pub const ACTIVITIES_FETCHED_AT_KEY: &str = "lastFetchTime";

pub struct ActivityCatalogService<C>
where
    C: TimeTrackingClient,
{
    client: Arc<C>,
    cache: TimedCache<Vec<Activity>>,
}

impl<C> ActivityCatalogService<C>
where
    C: TimeTrackingClient,
{
    pub fn new(client: Arc<C>, cache: TimedCache<Vec<Activity>>) -> Self {
        Self { client, cache }
    }

    /// Serves the cached catalog while fresh; otherwise fetches and replaces
    /// it wholesale. Failed fetches leave the cache as it was.
    pub async fn fetch_activities(&self, credential: &Credential) -> Result<Vec<Activity>, InfraError> {
        if let Some(cached) = self.cache.get()? {
            tracing::debug!(count = cached.len(), "activity catalog served from cache");
            return Ok(cached);
        }

        let activities = self
            .client
            .list_activities(credential)
            .await
            .inspect_err(|error| tracing::warn!(error = %error, "activity catalog fetch failed"))?;

        self.cache.put(&activities)?;
        tracing::info!(count = activities.len(), "activity catalog refreshed");
        Ok(activities)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::models::{TimeEntry, TrackedEntry};
    use crate::domain::time_format::DayWindow;
    use crate::infrastructure::storage::{InMemoryKeyValueStore, KeyValueStore};
    use async_trait::async_trait;
    use std::collections::VecDeque;
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[derive(Debug)]
    enum FakeListResponse {
        Success(Vec<Activity>),
        Unauthorized,
        Malformed,
        NetworkError,
    }

    #[derive(Debug)]
    struct FakeTrackingClient {
        responses: Mutex<VecDeque<FakeListResponse>>,
        calls: AtomicUsize,
    }

    impl FakeTrackingClient {
        fn with_responses(responses: Vec<FakeListResponse>) -> Self {
            Self {
                responses: Mutex::new(responses.into()),
                calls: AtomicUsize::new(0),
            }
        }
    }

    #[async_trait]
    impl TimeTrackingClient for FakeTrackingClient {
        async fn list_activities(&self, _credential: &Credential) -> Result<Vec<Activity>, InfraError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            let response = self
                .responses
                .lock()
                .expect("responses lock poisoned")
                .pop_front()
                .unwrap_or(FakeListResponse::NetworkError);
            match response {
                FakeListResponse::Success(activities) => Ok(activities),
                FakeListResponse::Unauthorized => Err(InfraError::AuthRejected),
                FakeListResponse::Malformed => Err(InfraError::Decode("bad body".to_string())),
                FakeListResponse::NetworkError => Err(InfraError::Transport("offline".to_string())),
            }
        }

        async fn create_time_entry(
            &self,
            _credential: &Credential,
            _entry: &TimeEntry,
        ) -> Result<(), InfraError> {
            Ok(())
        }

        async fn list_time_entries(
            &self,
            _credential: &Credential,
            _window: &DayWindow,
        ) -> Result<Vec<TrackedEntry>, InfraError> {
            Ok(Vec::new())
        }
    }

    fn activity(id: &str, name: &str) -> Activity {
        Activity {
            id: id.to_string(),
            name: name.to_string(),
            color: "#a1b2c3".to_string(),
        }
    }

    fn service(
        client: &Arc<FakeTrackingClient>,
        store: &Arc<InMemoryKeyValueStore>,
    ) -> ActivityCatalogService<FakeTrackingClient> {
        let store: Arc<dyn KeyValueStore> = store.clone();
        let cache = TimedCache::new(store, CACHED_ACTIVITIES_KEY, ACTIVITIES_FETCHED_AT_KEY);
        ActivityCatalogService::new(Arc::clone(client), cache)
    }

    fn credential() -> Credential {
        Credential::new("tok-1")
    }

    #[tokio::test]
    async fn fresh_cache_skips_network() {
        let client = Arc::new(FakeTrackingClient::with_responses(vec![FakeListResponse::Success(
            vec![activity("1", "Coding")],
        )]));
        let store = Arc::new(InMemoryKeyValueStore::default());
        let service = service(&client, &store);

        let first = service.fetch_activities(&credential()).await.expect("first fetch");
        let second = service.fetch_activities(&credential()).await.expect("second fetch");

        assert_eq!(first, second);
        assert_eq!(client.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn successful_fetch_replaces_catalog_wholesale() {
        let client = Arc::new(FakeTrackingClient::with_responses(vec![FakeListResponse::Success(
            vec![activity("2", "Reading")],
        )]));
        let store = Arc::new(InMemoryKeyValueStore::default());
        let stale: Arc<dyn KeyValueStore> = store.clone();
        TimedCache::<Vec<Activity>>::new(stale, CACHED_ACTIVITIES_KEY, ACTIVITIES_FETCHED_AT_KEY)
            .with_now_provider(Arc::new(|| chrono::Utc::now() - chrono::Duration::hours(3)))
            .put(&vec![activity("1", "Coding"), activity("3", "Gym")])
            .expect("seed stale cache");

        let service = service(&client, &store);
        let activities = service.fetch_activities(&credential()).await.expect("fetch");

        assert_eq!(activities, vec![activity("2", "Reading")]);
        assert_eq!(client.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn auth_rejection_leaves_cache_untouched() {
        let client = Arc::new(FakeTrackingClient::with_responses(vec![FakeListResponse::Unauthorized]));
        let store = Arc::new(InMemoryKeyValueStore::default());
        let stale: Arc<dyn KeyValueStore> = store.clone();
        TimedCache::<Vec<Activity>>::new(stale, CACHED_ACTIVITIES_KEY, ACTIVITIES_FETCHED_AT_KEY)
            .with_now_provider(Arc::new(|| chrono::Utc::now() - chrono::Duration::hours(2)))
            .put(&vec![activity("1", "Coding")])
            .expect("seed stale cache");
        let before = (
            store.get(CACHED_ACTIVITIES_KEY).expect("get"),
            store.get(ACTIVITIES_FETCHED_AT_KEY).expect("get"),
        );

        let result = service(&client, &store).fetch_activities(&credential()).await;

        assert!(matches!(result, Err(InfraError::AuthRejected)));
        let after = (
            store.get(CACHED_ACTIVITIES_KEY).expect("get"),
            store.get(ACTIVITIES_FETCHED_AT_KEY).expect("get"),
        );
        assert_eq!(before, after);
    }

    #[tokio::test]
    async fn decode_and_transport_failures_keep_stale_catalog() {
        let client = Arc::new(FakeTrackingClient::with_responses(vec![
            FakeListResponse::Malformed,
            FakeListResponse::NetworkError,
        ]));
        let store = Arc::new(InMemoryKeyValueStore::default());
        let stale: Arc<dyn KeyValueStore> = store.clone();
        TimedCache::<Vec<Activity>>::new(stale, CACHED_ACTIVITIES_KEY, ACTIVITIES_FETCHED_AT_KEY)
            .with_now_provider(Arc::new(|| chrono::Utc::now() - chrono::Duration::hours(3)))
            .put(&vec![activity("1", "Coding")])
            .expect("seed stale cache");
        let stale_payload = store.get(CACHED_ACTIVITIES_KEY).expect("get");

        let service = service(&client, &store);
        let decode = service.fetch_activities(&credential()).await;
        let transport = service.fetch_activities(&credential()).await;

        assert!(matches!(decode, Err(InfraError::Decode(_))));
        assert!(matches!(transport, Err(InfraError::Transport(_))));
        assert_eq!(store.get(CACHED_ACTIVITIES_KEY).expect("get"), stale_payload);
    }

    #[tokio::test]
    async fn undecodable_cached_catalog_is_refetched_and_replaced() {
        let client = Arc::new(FakeTrackingClient::with_responses(vec![
            FakeListResponse::Success(vec![activity("1", "Coding")]),
            FakeListResponse::Success(vec![activity("2", "Reading")]),
        ]));
        let store = Arc::new(InMemoryKeyValueStore::default());
        let service = service(&client, &store);
        service.fetch_activities(&credential()).await.expect("warm cache");
        store
            .set(CACHED_ACTIVITIES_KEY, r#"{"old":"schema"}"#)
            .expect("corrupt payload");

        let refetched = service.fetch_activities(&credential()).await.expect("refetch");
        let cached = service.fetch_activities(&credential()).await.expect("cached");

        assert_eq!(refetched, vec![activity("2", "Reading")]);
        assert_eq!(cached, refetched);
        assert_eq!(client.calls.load(Ordering::SeqCst), 2);
    }
}
