//! Process-local presence tracking for group channels.

mod dashmap_presence_registry;

pub use dashmap_presence_registry::DashMapPresenceRegistry;
