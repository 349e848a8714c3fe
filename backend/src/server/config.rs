//! HTTP server configuration object and helpers.

use std::net::SocketAddr;

use actix_web::cookie::{Key, SameSite};
use groupstudy::domain::DEFAULT_MAX_ATTEMPTS;
use groupstudy::inbound::ws::AllowedOrigins;
use groupstudy::outbound::persistence::DbPool;

/// Builder-style configuration for creating the HTTP server.
pub struct ServerConfig {
    pub(crate) key: Key,
    pub(crate) cookie_secure: bool,
    pub(crate) same_site: SameSite,
    pub(crate) bind_addr: SocketAddr,
    pub(crate) db_pool: Option<DbPool>,
    pub(crate) allowed_origins: AllowedOrigins,
    pub(crate) max_write_attempts: u32,
}

impl ServerConfig {
    /// Construct a server configuration with in-memory storage and no
    /// WebSocket origins allowed.
    #[must_use]
    pub fn new(key: Key, cookie_secure: bool, same_site: SameSite, bind_addr: SocketAddr) -> Self {
        Self {
            key,
            cookie_secure,
            same_site,
            bind_addr,
            db_pool: None,
            allowed_origins: AllowedOrigins::default(),
            max_write_attempts: DEFAULT_MAX_ATTEMPTS,
        }
    }

    /// Attach a database connection pool so groups persist in PostgreSQL.
    #[must_use]
    pub fn with_db_pool(mut self, pool: DbPool) -> Self {
        self.db_pool = Some(pool);
        self
    }

    #[must_use]
    pub fn with_allowed_origins(mut self, origins: AllowedOrigins) -> Self {
        self.allowed_origins = origins;
        self
    }

    /// Override how many times a command retries after a revision conflict.
    #[must_use]
    pub fn with_max_write_attempts(mut self, attempts: u32) -> Self {
        self.max_write_attempts = attempts;
        self
    }
}
