//! Database maintenance commands.

use clap::Subcommand;
use sqlx::SqlitePool;

/// Sub-commands available under `db`.
#[derive(Debug, Subcommand)]
pub enum DbCommands {
    /// Check database connectivity
    Ping,
    /// Apply pending schema migrations
    Migrate,
}

/// Round-trips a trivial query through the pool.
///
/// # Errors
///
/// Returns an error when the database is unreachable.
pub(crate) async fn run_db_ping(pool: &SqlitePool) -> anyhow::Result<()> {
    immodb_db::ping(pool).await?;
    println!("database reachable");
    Ok(())
}

/// Applies any migrations not yet recorded in the database.
///
/// # Errors
///
/// Returns an error when a migration fails to apply.
pub(crate) async fn run_db_migrate(pool: &SqlitePool) -> anyhow::Result<()> {
    let applied = immodb_db::run_migrations(pool).await?;
    if applied == 0 {
        println!("database is up to date");
    } else {
        println!("applied {applied} migrations");
    }
    Ok(())
}
