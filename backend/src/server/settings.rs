//! Application settings loaded via OrthoConfig.
//!
//! Every value can come from a `--flag`, a `GROUPSTUDY_*` environment
//! variable or a configuration file, in that order of precedence.

use std::net::SocketAddr;
use std::path::PathBuf;

use ortho_config::OrthoConfig;
use serde::Deserialize;

const DEFAULT_BIND_ADDR: &str = "0.0.0.0:8080";
const DEFAULT_SESSION_KEY_FILE: &str = "/var/run/secrets/session_key";

/// Runtime settings for the groupstudy server.
#[derive(Debug, Clone, Deserialize, OrthoConfig)]
#[ortho_config(prefix = "GROUPSTUDY")]
pub struct AppSettings {
    /// Socket address to listen on.
    pub bind_addr: Option<String>,
    /// PostgreSQL URL. Without one, groups live in process memory.
    pub database_url: Option<String>,
    /// Upper bound on pooled database connections.
    pub pool_max_size: Option<u32>,
    /// File holding the session cookie signing key.
    pub session_key_file: Option<PathBuf>,
    /// Fall back to a throwaway key when the key file is unreadable.
    #[ortho_config(default = false)]
    pub session_allow_ephemeral: bool,
    /// Mark the session cookie `Secure`. Defaults to on.
    pub session_cookie_secure: Option<bool>,
    /// Comma-separated origins allowed to open group channels.
    pub allowed_origins: Option<String>,
    /// Attempts per command before a revision conflict is reported.
    pub max_write_attempts: Option<u32>,
}

impl AppSettings {
    /// Parse the configured bind address, falling back to the default.
    pub fn bind_addr(&self) -> Result<SocketAddr, std::net::AddrParseError> {
        self.bind_addr
            .as_deref()
            .unwrap_or(DEFAULT_BIND_ADDR)
            .parse()
    }

    pub fn session_key_file(&self) -> PathBuf {
        self.session_key_file
            .clone()
            .unwrap_or_else(|| PathBuf::from(DEFAULT_SESSION_KEY_FILE))
    }

    pub fn cookie_secure(&self) -> bool {
        self.session_cookie_secure.unwrap_or(true)
    }

    /// Configured origins with blanks dropped.
    pub fn allowed_origins(&self) -> Vec<String> {
        self.allowed_origins
            .as_deref()
            .unwrap_or_default()
            .split(',')
            .map(str::trim)
            .filter(|origin| !origin.is_empty())
            .map(str::to_owned)
            .collect()
    }
}
