//! Database migration commands.
//!
//! # Usage
//!
//! ```bash
//! # Document tables and the change-notification trigger
//! pgd-cli migrate documents
//!
//! # Storefront and admin session tables
//! pgd-cli migrate sessions
//!
//! # Everything
//! pgd-cli migrate all
//! ```
//!
//! # Environment Variables
//!
//! - `DATABASE_URL` - `PostgreSQL` connection string shared by both binaries

use pg_delivery_admin::middleware::admin_session_store;
use pg_delivery_docstore::{create_pool, postgres::MIGRATOR};
use secrecy::SecretString;
use sqlx::PgPool;
use thiserror::Error;
use tower_sessions_sqlx_store::PostgresStore;

/// Errors that can occur while migrating.
#[derive(Debug, Error)]
pub enum MigrationError {
    /// Required environment variable is missing.
    #[error("Missing environment variable: {0}")]
    MissingEnvVar(&'static str),

    /// Database connection error.
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// A migration script failed.
    #[error("Migration error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),
}

async fn connect() -> Result<PgPool, MigrationError> {
    dotenvy::dotenv().ok();

    let database_url = std::env::var("DATABASE_URL")
        .map(SecretString::from)
        .map_err(|_| MigrationError::MissingEnvVar("DATABASE_URL"))?;

    tracing::info!("Connecting to database...");
    Ok(create_pool(&database_url).await?)
}

/// Create the document tables and their change-notification trigger.
pub async fn documents() -> Result<(), MigrationError> {
    let pool = connect().await?;

    tracing::info!("Running document store migrations...");
    MIGRATOR.run(&pool).await?;

    tracing::info!("Document store migrations complete!");
    Ok(())
}

/// Create the storefront cart sessions and the admin operator sessions.
pub async fn sessions() -> Result<(), MigrationError> {
    let pool = connect().await?;

    tracing::info!("Creating storefront session table...");
    PostgresStore::new(pool.clone()).migrate().await?;

    tracing::info!("Creating admin session table...");
    admin_session_store(pool).migrate().await?;

    tracing::info!("Session migrations complete!");
    Ok(())
}
