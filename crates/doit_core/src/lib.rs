//! Core domain logic for doit.
//! This crate is the single source of truth for business invariants.

pub mod ai;
pub mod config;
pub mod db;
pub mod logging;
pub mod model;
pub mod service;
pub mod store;
pub mod view;

pub use ai::{GeminiAssistant, OfflineAssistant, ParsedTask, TaskAssistant};
pub use config::{AppConfig, ConfigError, StorageConfig, WeekStart};
pub use logging::{default_log_level, init_from_config, init_logging, logging_status};
pub use model::catalog::{Label, Project, Section, ViewStyle};
pub use model::defaults::INBOX_PROJECT_ID;
pub use model::task::{DueDate, Priority, Task, TaskId, TaskValidationError};
pub use service::board::{BoardError, NewTask, PendingWrite, SyncNotice, TaskBoard};
pub use service::capture::{CaptureOverrides, PickedDue};
pub use service::forest::{TaskForest, TreeRow};
pub use store::local::LocalStore;
pub use store::outbox::{Outbox, QueuedWrite};
pub use store::remote::RemoteStore;
pub use store::{open_outbox, open_store, Collection, StoreError, StoreResult, TaskStore};

/// Returns the core crate version.
pub fn core_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}

#[cfg(test)]
mod tests {
    use super::core_version;

    #[test]
    fn version_is_not_empty() {
        assert!(!core_version().is_empty());
    }
}
