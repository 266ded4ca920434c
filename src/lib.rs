pub mod application;
pub mod domain;
pub mod infrastructure;

pub use application::session::{DefaultSyncSession, DrainOutcome, RecordOutcome, SyncSession};
pub use infrastructure::error::InfraError;
