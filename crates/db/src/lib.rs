//! Persona persistence layer: the durable job queue and the avatar
//! record store, backed by PostgreSQL via [`sqlx`].

use sqlx::postgres::PgPoolOptions;

pub mod models;
pub mod repositories;
pub mod store;

pub use repositories::{AvatarRepo, JobQueue};
pub use store::{AvatarStore, PgAvatarStore, StoreError};

pub type DbPool = sqlx::PgPool;

/// Embedded migrations for the pipeline schema.
pub static MIGRATOR: sqlx::migrate::Migrator = sqlx::migrate!("./migrations");

/// Create a connection pool from a database URL.
pub async fn create_pool(database_url: &str) -> Result<DbPool, sqlx::Error> {
    PgPoolOptions::new()
        .max_connections(20)
        .connect(database_url)
        .await
}

/// Verify the database is reachable.
pub async fn health_check(pool: &DbPool) -> Result<(), sqlx::Error> {
    sqlx::query("SELECT 1").execute(pool).await?;
    Ok(())
}
