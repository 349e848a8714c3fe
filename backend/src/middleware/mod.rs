//! Actix middleware shared by the REST scope and the channel upgrade route.

pub mod trace;

pub use trace::Trace;
