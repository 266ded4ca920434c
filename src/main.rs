use tracing_subscriber::EnvFilter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracksync::domain::models::total_seconds;
use tracksync::domain::time_format::format_tracked_duration;
use tracksync::{DefaultSyncSession, InfraError};

#[tokio::main]
async fn main() -> Result<(), InfraError> {
    init_logging();

    let workspace_root = std::env::current_dir()?;
    let session = DefaultSyncSession::open(&workspace_root)?;

    match session.refresh_summary().await {
        Ok(aggregate) => {
            for (activity, totals) in &aggregate {
                tracing::info!(
                    activity = %activity,
                    tracked = %format_tracked_duration(totals.total_seconds),
                    color = %totals.color,
                    "activity total"
                );
            }
            tracing::info!(
                summary = %session.summary(),
                total_seconds = total_seconds(&aggregate),
                "background refresh finished"
            );
        }
        Err(error) => {
            tracing::warn!(
                error = %error,
                summary = %session.summary(),
                "background refresh failed; keeping last published summary"
            );
        }
    }

    let pending = session.pending_entries()?.len();
    if pending > 0 {
        tracing::info!(pending, "time entries still waiting in the backlog");
    }
    Ok(())
}

fn init_logging() {
    let format = tracing_subscriber::fmt::layer()
        .json()
        .with_target(false)
        .with_current_span(true)
        .flatten_event(true);

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("tracksync=debug,info"));

    tracing_subscriber::registry().with(filter).with(format).init();
}
