//! SQLite-backed [`VectorIndex`] implementation.
//!
//! Vectors are stored as BLOBs in the `service_embeddings` table (see
//! [`crate::migrate`]). Nearest-neighbor queries load every vector and
//! rank by cosine similarity in process, which is fine for a catalog of a
//! few thousand services. Each row records the vector length in `dims`; a
//! query of any other length is rejected.

use std::collections::HashSet;
use std::path::Path;

use anyhow::Result;
use async_trait::async_trait;
use sqlx::{Row, SqlitePool};

use rpp_store_core::embedding::{blob_to_vec, cosine_similarity, vec_to_blob};
use rpp_store_core::index::{check_dims, top_k, VectorIndex};
use rpp_store_core::models::{EmbeddingRecord, IndexHit};

use crate::{db, migrate};

/// Persistent vector index in a single SQLite file.
pub struct SqliteIndex {
    pool: SqlitePool,
    /// Model name recorded alongside every inserted vector.
    model: String,
}

impl SqliteIndex {
    /// Open (or create) the index at `path` and ensure its schema.
    pub async fn open(path: &Path, model: impl Into<String>) -> Result<Self> {
        let pool = db::connect(path).await?;
        migrate::run_migrations(&pool).await?;
        Ok(Self {
            pool,
            model: model.into(),
        })
    }
}

#[async_trait]
impl VectorIndex for SqliteIndex {
    async fn ids(&self) -> Result<HashSet<String>> {
        let ids: Vec<String> = sqlx::query_scalar("SELECT id FROM service_embeddings")
            .fetch_all(&self.pool)
            .await?;
        Ok(ids.into_iter().collect())
    }

    async fn add(&self, records: &[EmbeddingRecord]) -> Result<usize> {
        let now = chrono::Utc::now().timestamp();
        let mut tx = self.pool.begin().await?;
        let mut inserted = 0usize;

        for record in records {
            let result = sqlx::query(
                r#"
                INSERT INTO service_embeddings
                    (id, model, dims, name, description, document, embedding, created_at)
                VALUES (?, ?, ?, ?, ?, ?, ?, ?)
                ON CONFLICT(id) DO NOTHING
                "#,
            )
            .bind(&record.id)
            .bind(&self.model)
            .bind(record.vector.len() as i64)
            .bind(&record.name)
            .bind(&record.description)
            .bind(&record.document)
            .bind(vec_to_blob(&record.vector))
            .bind(now)
            .execute(&mut *tx)
            .await?;
            inserted += result.rows_affected() as usize;
        }

        tx.commit().await?;
        Ok(inserted)
    }

    async fn count(&self) -> Result<usize> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM service_embeddings")
            .fetch_one(&self.pool)
            .await?;
        Ok(count as usize)
    }

    async fn dims(&self) -> Result<Option<usize>> {
        let dims: Option<i64> =
            sqlx::query_scalar("SELECT dims FROM service_embeddings ORDER BY rowid LIMIT 1")
                .fetch_optional(&self.pool)
                .await?;
        Ok(dims.map(|d| d as usize))
    }

    async fn query(&self, vector: &[f32], k: usize) -> Result<Vec<IndexHit>> {
        if k == 0 {
            return Ok(Vec::new());
        }

        let rows =
            sqlx::query("SELECT id, dims, embedding FROM service_embeddings ORDER BY rowid")
                .fetch_all(&self.pool)
                .await?;

        let mut scored = Vec::with_capacity(rows.len());
        for row in &rows {
            let dims: i64 = row.get("dims");
            check_dims(Some(dims as usize), vector.len())?;
            let blob: Vec<u8> = row.get("embedding");
            scored.push(IndexHit {
                id: row.get("id"),
                score: cosine_similarity(vector, &blob_to_vec(&blob)) as f64,
            });
        }

        Ok(top_k(scored, k))
    }

    async fn clear(&self) -> Result<()> {
        sqlx::query("DELETE FROM service_embeddings")
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn close(&self) {
        self.pool.close().await;
    }
}
