//! Shared helpers for backend integration tests that need PostgreSQL.
//!
//! Integration tests compile as separate crates under `backend/tests/`, so
//! the embedded cluster plumbing lives here rather than in each suite.

pub mod cluster_skip;
pub mod embedded_postgres;

pub use cluster_skip::handle_cluster_setup_failure;
pub use embedded_postgres::provision_database;
