pub mod activity_catalog;
pub mod auth;
pub mod backlog;
pub mod bootstrap;
pub mod session;
pub mod time_entries;
