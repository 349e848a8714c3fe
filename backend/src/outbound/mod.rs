//! Outbound adapters implementing domain ports for external infrastructure.
//!
//! - **persistence**: PostgreSQL study group repository using Diesel
//! - **memory**: in-process study group repository with the same revision
//!   contract, used when no database URL is configured
//! - **presence**: `DashMap`-backed channel presence registry
//!
//! Adapters translate between domain types and infrastructure
//! representations. They contain no business logic.

pub mod memory;
pub mod persistence;
pub mod presence;
