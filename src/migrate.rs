//! Schema for the persistent vector index.
//!
//! A single logical collection: one row per service id holding the
//! embedding BLOB (little-endian `f32`), the display metadata, and the
//! source text the vector was computed from. Every statement is
//! idempotent, so migrations run on every open.

use anyhow::Result;
use sqlx::SqlitePool;

pub async fn run_migrations(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS service_embeddings (
            id TEXT PRIMARY KEY,
            model TEXT NOT NULL,
            dims INTEGER NOT NULL,
            name TEXT NOT NULL,
            description TEXT NOT NULL,
            document TEXT NOT NULL,
            embedding BLOB NOT NULL,
            created_at INTEGER NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await?;

    Ok(())
}
