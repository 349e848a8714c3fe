//! Embedded PostgreSQL databases for repository integration tests.
//!
//! Each test gets its own database on the cluster, migrated with the same
//! Diesel migrations the server applies, so the schema under test cannot
//! drift from `migrations/`.

use diesel::Connection;
use diesel::pg::PgConnection;
use diesel_migrations::{EmbeddedMigrations, MigrationHarness, embed_migrations};
use pg_embedded_setup_unpriv::{TemporaryDatabase, TestCluster};
use uuid::Uuid;

/// Embedded migrations from the backend/migrations directory.
const MIGRATIONS: EmbeddedMigrations = embed_migrations!("migrations");

/// Runs all pending Diesel migrations against the database at `url`.
pub fn migrate_schema(url: &str) -> Result<(), String> {
    let mut conn = PgConnection::establish(url).map_err(|err| format!("connect: {err}"))?;
    conn.run_pending_migrations(MIGRATIONS)
        .map_err(|err| format!("migration: {err:?}"))?;
    Ok(())
}

/// Creates a uniquely named database on `cluster` and migrates it.
pub fn provision_database(cluster: &TestCluster) -> Result<TemporaryDatabase, String> {
    let name = format!("test_{}", Uuid::new_v4().simple());
    let database = cluster
        .temporary_database(name.as_str())
        .map_err(|err| format!("create database {name}: {err:?}"))?;
    migrate_schema(database.url())?;
    Ok(database)
}
