//! PostgreSQL persistence adapter using Diesel ORM.
//!
//! This module implements the study group repository port backed by
//! PostgreSQL via Diesel with async support through `diesel-async` and `bb8`
//! connection pooling.
//!
//! # Architecture
//!
//! - **Thin adapter**: the repository only translates between Diesel rows
//!   and domain types; invariants are re-checked by the aggregate's restore.
//! - **Internal models**: row structs (`models.rs`) and table definitions
//!   (`schema.rs`) never leave this module.
//! - **Whole-aggregate writes**: the group row and its participant set are
//!   written in one transaction guarded by the revision column.
//!
//! # Example
//!
//! ```ignore
//! use groupstudy::outbound::persistence::{DbPool, DieselStudyGroupRepository, PoolConfig};
//!
//! let config = PoolConfig::new("postgres://localhost/groupstudy");
//! let pool = DbPool::new(config).await?;
//! let repo = DieselStudyGroupRepository::new(pool);
//! ```

pub(crate) mod diesel_helpers;
mod diesel_study_group_repository;
mod models;
mod pool;
mod schema;

pub use diesel_study_group_repository::DieselStudyGroupRepository;
pub use pool::{DbPool, PoolConfig, PoolError};
