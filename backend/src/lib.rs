//! Study group coordination backend.
//!
//! Hosts recruit members into time-boxed study groups, approve or reject
//! applications, and run the group through its lifecycle. Approved members
//! share a chat room and a WebRTC signaling relay.

pub mod doc;
pub mod domain;
pub mod inbound;
pub mod middleware;
pub mod outbound;

/// Public OpenAPI surface used by Swagger UI and tooling.
pub use doc::ApiDoc;
pub use middleware::Trace;
