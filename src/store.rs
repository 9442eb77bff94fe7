//! SQLite-backed vector store.
//!
//! One store per persistence directory, held in a single `index.sqlite` file
//! whose presence is the "safe to reuse" marker checked by the indexer.
//! Chunk text and metadata live in `chunks`; embedding vectors are stored as
//! little-endian f32 BLOBs in `chunk_vectors`; `index_meta` records how the
//! index was built (model, dims, chunk sizing, build time).
//!
//! Queries are a brute-force cosine scan over all stored vectors — the store
//! deliberately does not implement approximate nearest-neighbor search.

use anyhow::{Context, Result};
use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions};
use sqlx::Row;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use crate::embedding::{blob_to_vec, cosine_similarity, vec_to_blob};
use crate::models::{Chunk, ScoredChunk};

/// Marker file inside the persistence directory.
pub const STORE_FILE: &str = "index.sqlite";

/// Whether a recognizable persisted index exists under `persist_dir`.
pub fn store_exists(persist_dir: &Path) -> bool {
    persist_dir.join(STORE_FILE).exists()
}

pub struct VectorStore {
    pool: SqlitePool,
}

impl VectorStore {
    /// Open (or create) the store under `persist_dir` and ensure the schema.
    pub async fn open(persist_dir: &Path) -> Result<Self> {
        std::fs::create_dir_all(persist_dir).with_context(|| {
            format!(
                "Failed to create persistence directory: {}",
                persist_dir.display()
            )
        })?;

        let db_path = persist_dir.join(STORE_FILE);
        let options = SqliteConnectOptions::from_str(&format!("sqlite:{}", db_path.display()))?
            .create_if_missing(true)
            .journal_mode(sqlx::sqlite::SqliteJournalMode::Wal);

        let pool = SqlitePoolOptions::new()
            .max_connections(5)
            .connect_with(options)
            .await?;

        let store = Self { pool };
        store.ensure_schema().await?;
        Ok(store)
    }

    /// Remove any persisted store under `persist_dir` and open a fresh one.
    /// Rebuilds are all-or-nothing; callers must serialize rebuilds against
    /// the same persistence directory.
    pub async fn recreate(persist_dir: &Path) -> Result<Self> {
        for suffix in ["", "-wal", "-shm"] {
            let path: PathBuf = persist_dir.join(format!("{}{}", STORE_FILE, suffix));
            if path.exists() {
                std::fs::remove_file(&path)
                    .with_context(|| format!("Failed to remove {}", path.display()))?;
            }
        }
        Self::open(persist_dir).await
    }

    async fn ensure_schema(&self) -> Result<()> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS chunks (
                id TEXT PRIMARY KEY,
                source TEXT NOT NULL,
                chunk_index INTEGER NOT NULL,
                text TEXT NOT NULL,
                hash TEXT NOT NULL,
                UNIQUE(source, chunk_index)
            )
            "#,
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS chunk_vectors (
                chunk_id TEXT PRIMARY KEY,
                embedding BLOB NOT NULL,
                FOREIGN KEY (chunk_id) REFERENCES chunks(id)
            )
            "#,
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS index_meta (
                key TEXT PRIMARY KEY,
                value TEXT NOT NULL
            )
            "#,
        )
        .execute(&self.pool)
        .await?;

        sqlx::query("CREATE INDEX IF NOT EXISTS idx_chunks_source ON chunks(source)")
            .execute(&self.pool)
            .await?;

        Ok(())
    }

    /// Insert chunks and their vectors in one transaction.
    pub async fn insert_chunks(&self, chunks: &[Chunk], vectors: &[Vec<f32>]) -> Result<()> {
        anyhow::ensure!(
            chunks.len() == vectors.len(),
            "chunk/vector count mismatch: {} chunks, {} vectors",
            chunks.len(),
            vectors.len()
        );

        let mut tx = self.pool.begin().await?;

        for (chunk, vector) in chunks.iter().zip(vectors.iter()) {
            sqlx::query(
                "INSERT INTO chunks (id, source, chunk_index, text, hash) VALUES (?, ?, ?, ?, ?)",
            )
            .bind(&chunk.id)
            .bind(&chunk.source)
            .bind(chunk.chunk_index)
            .bind(&chunk.text)
            .bind(&chunk.hash)
            .execute(&mut *tx)
            .await?;

            sqlx::query("INSERT INTO chunk_vectors (chunk_id, embedding) VALUES (?, ?)")
                .bind(&chunk.id)
                .bind(vec_to_blob(vector))
                .execute(&mut *tx)
                .await?;
        }

        tx.commit().await?;
        Ok(())
    }

    pub async fn set_meta(&self, key: &str, value: &str) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO index_meta (key, value) VALUES (?, ?)
            ON CONFLICT(key) DO UPDATE SET value = excluded.value
            "#,
        )
        .bind(key)
        .bind(value)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    pub async fn get_meta(&self, key: &str) -> Result<Option<String>> {
        let value: Option<String> =
            sqlx::query_scalar("SELECT value FROM index_meta WHERE key = ?")
                .bind(key)
                .fetch_optional(&self.pool)
                .await?;
        Ok(value)
    }

    pub async fn chunk_count(&self) -> Result<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM chunks")
            .fetch_one(&self.pool)
            .await?;
        Ok(count)
    }

    /// The `k` stored chunks most similar to `query_vec`, descending by
    /// cosine similarity. Empty store yields an empty result.
    pub async fn nearest(&self, query_vec: &[f32], k: usize) -> Result<Vec<ScoredChunk>> {
        let rows = sqlx::query(
            r#"
            SELECT c.id, c.source, c.chunk_index, c.text, c.hash, cv.embedding
            FROM chunk_vectors cv
            JOIN chunks c ON c.id = cv.chunk_id
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        let mut scored: Vec<ScoredChunk> = rows
            .iter()
            .map(|row| {
                let blob: Vec<u8> = row.get("embedding");
                let vector = blob_to_vec(&blob);
                ScoredChunk {
                    chunk: Chunk {
                        id: row.get("id"),
                        source: row.get("source"),
                        chunk_index: row.get("chunk_index"),
                        text: row.get("text"),
                        hash: row.get("hash"),
                    },
                    score: cosine_similarity(query_vec, &vector),
                }
            })
            .collect();

        scored.sort_by(|a, b| {
            b.score
                .partial_cmp(&a.score)
                .unwrap_or(std::cmp::Ordering::Equal)
        });
        scored.truncate(k);

        Ok(scored)
    }

    /// Flush WAL state and close the pool.
    pub async fn close(self) -> Result<()> {
        sqlx::query("PRAGMA wal_checkpoint(TRUNCATE)")
            .execute(&self.pool)
            .await?;
        self.pool.close().await;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn chunk(source: &str, index: i64, text: &str) -> Chunk {
        Chunk::new(source, index, text)
    }

    #[tokio::test]
    async fn test_marker_appears_after_open() {
        let tmp = TempDir::new().unwrap();
        assert!(!store_exists(tmp.path()));

        let store = VectorStore::open(tmp.path()).await.unwrap();
        store.close().await.unwrap();

        assert!(store_exists(tmp.path()));
    }

    #[tokio::test]
    async fn test_insert_and_nearest_ordering() {
        let tmp = TempDir::new().unwrap();
        let store = VectorStore::open(tmp.path()).await.unwrap();

        let chunks = vec![
            chunk("a.py", 0, "division by zero"),
            chunk("b.py", 0, "file not found"),
            chunk("c.py", 0, "index out of range"),
        ];
        let vectors = vec![
            vec![1.0, 0.0, 0.0],
            vec![0.0, 1.0, 0.0],
            vec![0.7, 0.7, 0.0],
        ];
        store.insert_chunks(&chunks, &vectors).await.unwrap();

        let results = store.nearest(&[1.0, 0.0, 0.0], 2).await.unwrap();
        assert_eq!(results.len(), 2);
        assert_eq!(results[0].chunk.source, "a.py");
        assert_eq!(results[1].chunk.source, "c.py");
        assert!(results[0].score >= results[1].score);

        store.close().await.unwrap();
    }

    #[tokio::test]
    async fn test_nearest_on_empty_store() {
        let tmp = TempDir::new().unwrap();
        let store = VectorStore::open(tmp.path()).await.unwrap();

        let results = store.nearest(&[1.0, 0.0], 5).await.unwrap();
        assert!(results.is_empty());

        store.close().await.unwrap();
    }

    #[tokio::test]
    async fn test_recreate_drops_previous_contents() {
        let tmp = TempDir::new().unwrap();

        let store = VectorStore::open(tmp.path()).await.unwrap();
        store
            .insert_chunks(&[chunk("a.py", 0, "x = 1")], &[vec![1.0]])
            .await
            .unwrap();
        assert_eq!(store.chunk_count().await.unwrap(), 1);
        store.close().await.unwrap();

        let fresh = VectorStore::recreate(tmp.path()).await.unwrap();
        assert_eq!(fresh.chunk_count().await.unwrap(), 0);
        fresh.close().await.unwrap();
    }

    #[tokio::test]
    async fn test_meta_roundtrip() {
        let tmp = TempDir::new().unwrap();
        let store = VectorStore::open(tmp.path()).await.unwrap();

        assert_eq!(store.get_meta("model").await.unwrap(), None);
        store.set_meta("model", "test-embed").await.unwrap();
        store.set_meta("model", "test-embed-2").await.unwrap();
        assert_eq!(
            store.get_meta("model").await.unwrap().as_deref(),
            Some("test-embed-2")
        );

        store.close().await.unwrap();
    }

    #[tokio::test]
    async fn test_mismatched_vector_count_rejected() {
        let tmp = TempDir::new().unwrap();
        let store = VectorStore::open(tmp.path()).await.unwrap();

        let result = store
            .insert_chunks(&[chunk("a.py", 0, "x")], &[])
            .await;
        assert!(result.is_err());

        store.close().await.unwrap();
    }
}
