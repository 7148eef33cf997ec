use diesel::{Connection, PgConnection};
use diesel_migrations::{EmbeddedMigrations, MigrationHarness, embed_migrations};

use crate::error::{DbError, DbResult};

pub const MIGRATIONS: EmbeddedMigrations = embed_migrations!("migrations");

/// ## Summary
/// Runs all pending migrations against the given database.
///
/// Migrations need a synchronous connection, so they run on the blocking pool.
///
/// ## Errors
/// Returns an error if the connection cannot be established or a migration fails.
#[tracing::instrument(skip(database_url))]
pub async fn run_migrations(database_url: &str) -> DbResult<()> {
    let url = database_url.to_string();
    let applied = tokio::task::spawn_blocking(move || {
        let mut conn = PgConnection::establish(&url)
            .map_err(|e| DbError::MigrationError(format!("Failed to connect: {e}")))?;
        conn.run_pending_migrations(MIGRATIONS)
            .map(|versions| versions.len())
            .map_err(|e| DbError::MigrationError(format!("Failed to run migrations: {e}")))
    })
    .await
    .map_err(|e| DbError::MigrationError(format!("Migration task failed: {e}")))??;

    tracing::info!(applied, "Database migrations up to date");
    Ok(())
}
