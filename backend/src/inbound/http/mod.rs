//! HTTP inbound adapter exposing the study group REST endpoints.

pub mod error;
pub mod health;
pub mod schemas;
pub mod session;
pub mod state;
pub mod study_groups;
#[cfg(test)]
pub mod test_utils;
pub(crate) mod validation;

pub use error::ApiResult;
