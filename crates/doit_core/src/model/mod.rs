//! Domain records for tasks and the catalogs they reference.
//!
//! # Responsibility
//! - Define the canonical shapes persisted by every storage backend.
//! - Provide the seeded defaults used when nothing is persisted yet.
//!
//! # Invariants
//! - Every record is identified by an opaque string identifier.
//! - The reserved `inbox` project always exists after a board load.
//! - Persisted field names are camelCase regardless of backend.

pub mod catalog;
pub mod defaults;
pub mod task;
