use chrono::{Duration, Utc};
use std::sync::Arc;
use tracksync::application::activity_catalog::{
    ACTIVITIES_FETCHED_AT_KEY, ActivityCatalogService, CACHED_ACTIVITIES_KEY,
};
use tracksync::application::auth::TokenManager;
use tracksync::application::time_entries::{
    ACTIVITY_TIMES_FETCHED_AT_KEY, CACHED_ACTIVITY_TIMES_KEY, TimeEntryService,
};
use tracksync::domain::time_format::LocalZone;
use tracksync::infrastructure::backlog_repository::KeyValueBacklogRepository;
use tracksync::infrastructure::credential_store::KeyValueCredentialStore;
use tracksync::infrastructure::sign_in_client::{ReqwestSignInClient, SignInRequest};
use tracksync::infrastructure::storage::{InMemoryKeyValueStore, KeyValueStore};
use tracksync::infrastructure::summary_bridge::{NoopWidgetReloader, TimeSummaryBridge};
use tracksync::infrastructure::timed_cache::TimedCache;
use tracksync::infrastructure::tracking_client::ReqwestTimeTrackingClient;
use tracksync::{DefaultSyncSession, RecordOutcome};
use url::Url;
use wiremock::matchers::{header, method, path, path_regex};
use wiremock::{Mock, MockServer, ResponseTemplate};

struct Fixture {
    app_store: Arc<dyn KeyValueStore>,
    shared_store: Arc<dyn KeyValueStore>,
    session: DefaultSyncSession,
}

fn fixture(server: &MockServer) -> Fixture {
    let base_url = Url::parse(&server.uri()).expect("server url");
    let timeout = std::time::Duration::from_secs(5);
    let app_store: Arc<dyn KeyValueStore> = Arc::new(InMemoryKeyValueStore::default());
    let shared_store: Arc<dyn KeyValueStore> = Arc::new(InMemoryKeyValueStore::default());

    let sign_in = Arc::new(ReqwestSignInClient::new(base_url.clone(), timeout).expect("sign-in client"));
    let tracking = Arc::new(ReqwestTimeTrackingClient::new(base_url, timeout).expect("tracking client"));

    let token_manager = TokenManager::new(
        SignInRequest {
            api_key: "key".to_string(),
            api_secret: "secret".to_string(),
        },
        Arc::new(KeyValueCredentialStore::new(Arc::clone(&app_store))),
        sign_in,
    );
    let activity_catalog = ActivityCatalogService::new(
        Arc::clone(&tracking),
        TimedCache::new(Arc::clone(&app_store), CACHED_ACTIVITIES_KEY, ACTIVITIES_FETCHED_AT_KEY),
    );
    let time_entries = TimeEntryService::new(
        tracking,
        TimedCache::new(
            Arc::clone(&app_store),
            CACHED_ACTIVITY_TIMES_KEY,
            ACTIVITY_TIMES_FETCHED_AT_KEY,
        ),
        TimeSummaryBridge::new(Arc::clone(&shared_store)),
        Arc::new(NoopWidgetReloader),
    )
    .with_zone(LocalZone::parse(Some("UTC")).expect("zone"));

    let session = DefaultSyncSession::new(
        token_manager,
        activity_catalog,
        Arc::new(time_entries),
        Arc::new(KeyValueBacklogRepository::new(Arc::clone(&app_store))),
    );
    Fixture {
        app_store,
        shared_store,
        session,
    }
}

async fn mount_sign_in(server: &MockServer, token: &str) {
    Mock::given(method("POST"))
        .and(path("/api/v4/developer/sign-in"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({ "token": token })))
        .mount(server)
        .await;
}

async fn mount_today_entries(server: &MockServer) {
    Mock::given(method("GET"))
        .and(path_regex(r"^/api/v4/time-entries/[^/]+/[^/]+$"))
        .and(header("authorization", "Bearer tok-1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "timeEntries": [
                {
                    "duration": { "startedAt": "2026-03-02T08:00:00.000", "stoppedAt": "2026-03-02T08:10:00.000" },
                    "activity": { "name": "Coding", "color": "#ff0000" }
                },
                {
                    "duration": { "startedAt": "2026-03-02T09:00:00.000", "stoppedAt": "2026-03-02T09:05:00.000" },
                    "activity": { "name": "Coding", "color": "#ff0000" }
                },
                {
                    "duration": { "startedAt": "2026-03-02T10:00:00.000", "stoppedAt": "2026-03-02T10:01:00.000" },
                    "activity": { "name": "Reading", "color": "#00ff00" }
                },
                {
                    "duration": { "startedAt": "2026-03-02T11:00:00.000" },
                    "activity": { "name": "Broken", "color": "#000000" }
                }
            ]
        })))
        .mount(server)
        .await;
}

#[tokio::test]
async fn recorded_entry_is_submitted_and_summary_published() {
    let server = MockServer::start().await;
    mount_sign_in(&server, "tok-1").await;
    Mock::given(method("POST"))
        .and(path("/api/v4/time-entries"))
        .and(header("authorization", "Bearer tok-1"))
        .respond_with(ResponseTemplate::new(201))
        .expect(1)
        .mount(&server)
        .await;
    mount_today_entries(&server).await;
    let fixture = fixture(&server);

    let stop = Utc::now();
    let outcome = fixture
        .session
        .record_entry("act-1", stop - Duration::minutes(10), stop, "standup")
        .await
        .expect("record");

    assert_eq!(outcome, RecordOutcome::Submitted);
    assert_eq!(fixture.session.summary(), "16m");
    assert_eq!(
        fixture.shared_store.get("totalTrackedTime").expect("get"),
        Some("16m".to_string())
    );
    assert_eq!(
        fixture.app_store.get("token").expect("get"),
        Some("tok-1".to_string())
    );
}

#[tokio::test]
async fn entry_rejected_by_server_is_replayed_on_refresh() {
    let server = MockServer::start().await;
    mount_sign_in(&server, "tok-1").await;
    Mock::given(method("POST"))
        .and(path("/api/v4/time-entries"))
        .respond_with(ResponseTemplate::new(503))
        .up_to_n_times(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/api/v4/time-entries"))
        .respond_with(ResponseTemplate::new(201))
        .expect(1)
        .mount(&server)
        .await;
    mount_today_entries(&server).await;
    let fixture = fixture(&server);

    let stop = Utc::now();
    let outcome = fixture
        .session
        .record_entry("act-1", stop - Duration::minutes(3), stop, "")
        .await
        .expect("record");
    assert_eq!(outcome, RecordOutcome::Queued);
    assert_eq!(fixture.session.pending_entries().expect("pending").len(), 1);
    assert_eq!(fixture.session.summary(), "0m");

    let aggregate = fixture.session.refresh_summary().await.expect("refresh");

    assert_eq!(aggregate["Coding"].total_seconds, 900);
    assert_eq!(aggregate["Reading"].total_seconds, 60);
    assert!(!aggregate.contains_key("Broken"));
    assert!(fixture.session.pending_entries().expect("pending").is_empty());
    assert_eq!(fixture.session.summary(), "16m");
}

#[tokio::test]
async fn unauthorized_activities_clear_persisted_token() {
    let server = MockServer::start().await;
    mount_sign_in(&server, "tok-1").await;
    Mock::given(method("GET"))
        .and(path("/api/v3/activities"))
        .respond_with(ResponseTemplate::new(401))
        .mount(&server)
        .await;
    let fixture = fixture(&server);

    let result = fixture.session.load_activities().await;

    assert!(matches!(result, Err(tracksync::InfraError::AuthRejected)));
    assert_eq!(fixture.app_store.get("token").expect("get"), None);
    assert_eq!(fixture.app_store.get(CACHED_ACTIVITIES_KEY).expect("get"), None);
}
