//! Backend entry-point: loads settings, wires storage, and serves the REST
//! API, group channels and health checks.
#![cfg_attr(not(any(test, doctest)), deny(clippy::unwrap_used))]
#![cfg_attr(not(any(test, doctest)), deny(clippy::expect_used))]

mod server;

use actix_web::cookie::{Key, SameSite};
use actix_web::web;
use color_eyre::eyre::{Result, WrapErr, eyre};
use ortho_config::OrthoConfig;
use tracing::{info, warn};
use tracing_subscriber::{EnvFilter, fmt};

use groupstudy::inbound::http::health::HealthState;
use groupstudy::inbound::ws::AllowedOrigins;
use groupstudy::outbound::persistence::{DbPool, PoolConfig};
use server::{AppSettings, ServerConfig, create_server};

/// `Key::derive_from` panics below this length.
const MIN_KEY_BYTES: usize = 32;

/// Application bootstrap.
#[actix_web::main]
async fn main() -> Result<()> {
    color_eyre::install()?;
    if let Err(e) = fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .json()
        .try_init()
    {
        warn!(error = %e, "tracing init failed");
    }

    let settings = AppSettings::load().wrap_err("load settings")?;
    let config = build_server_config(&settings).await?;

    let health_state = web::Data::new(HealthState::new());
    let server = create_server(health_state, config)?;
    info!("groupstudy listening");
    server.await.wrap_err("server terminated")
}

async fn build_server_config(settings: &AppSettings) -> Result<ServerConfig> {
    let bind_addr = settings.bind_addr().wrap_err("parse bind address")?;
    let key = load_session_key(settings)?;
    let origins = AllowedOrigins::parse(settings.allowed_origins())
        .wrap_err("parse allowed origins")?;
    if origins.is_empty() {
        warn!("no allowed origins configured; group channels will refuse every upgrade");
    }

    let mut config = ServerConfig::new(key, settings.cookie_secure(), SameSite::Lax, bind_addr)
        .with_allowed_origins(origins);
    if let Some(attempts) = settings.max_write_attempts {
        config = config.with_max_write_attempts(attempts);
    }
    if let Some(url) = settings.database_url.as_deref() {
        let mut pool_config = PoolConfig::new(url);
        if let Some(max_size) = settings.pool_max_size {
            pool_config = pool_config.with_max_size(max_size);
        }
        let pool = DbPool::new(pool_config)
            .await
            .wrap_err("create database pool")?;
        config = config.with_db_pool(pool);
    }
    Ok(config)
}

fn load_session_key(settings: &AppSettings) -> Result<Key> {
    let key_path = settings.session_key_file();
    match std::fs::read(&key_path) {
        Ok(bytes) if bytes.len() >= MIN_KEY_BYTES => Ok(Key::derive_from(&bytes)),
        Ok(bytes) => Err(eyre!(
            "session key at {} holds {} bytes; at least {MIN_KEY_BYTES} are required",
            key_path.display(),
            bytes.len()
        )),
        Err(e) if cfg!(debug_assertions) || settings.session_allow_ephemeral => {
            warn!(path = %key_path.display(), error = %e, "using temporary session key (dev only)");
            Ok(Key::generate())
        }
        Err(e) => Err(eyre!(
            "failed to read session key at {}: {e}",
            key_path.display()
        )),
    }
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use rstest::rstest;
    use tempfile::NamedTempFile;

    use super::*;

    fn settings_with_key_file(path: std::path::PathBuf, allow_ephemeral: bool) -> AppSettings {
        AppSettings {
            bind_addr: None,
            database_url: None,
            pool_max_size: None,
            session_key_file: Some(path),
            session_allow_ephemeral: allow_ephemeral,
            session_cookie_secure: None,
            allowed_origins: None,
            max_write_attempts: None,
        }
    }

    fn key_file(bytes: &[u8]) -> NamedTempFile {
        let mut file = NamedTempFile::new().expect("temp file");
        file.write_all(bytes).expect("write key");
        file
    }

    #[rstest]
    fn reads_key_from_file() {
        let file = key_file(&[7; 64]);
        let settings = settings_with_key_file(file.path().to_path_buf(), false);

        let key = load_session_key(&settings).expect("key loads");

        assert_eq!(key.master(), Key::derive_from(&[7; 64]).master());
    }

    #[rstest]
    fn short_keys_are_rejected() {
        let file = key_file(b"too short");
        let settings = settings_with_key_file(file.path().to_path_buf(), true);

        assert!(load_session_key(&settings).is_err());
    }

    #[rstest]
    fn missing_file_falls_back_when_ephemeral_keys_are_allowed() {
        let settings = settings_with_key_file("/nonexistent/groupstudy/key".into(), true);

        assert!(load_session_key(&settings).is_ok());
    }
}
