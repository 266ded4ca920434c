pub mod backlog_repository;
pub mod config;
pub mod credential_store;
pub mod error;
pub mod sign_in_client;
pub mod storage;
pub mod summary_bridge;
pub mod timed_cache;
pub mod tracking_client;
