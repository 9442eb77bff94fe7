//! Top-k retrieval over the vector store.
//!
//! [`Retriever`] is the read-only query contract the pipeline depends on;
//! [`VectorRetriever`] is the production implementation (embed the query,
//! cosine-scan the store, return at most `k` chunks in descending similarity
//! order). Tests substitute stub implementations.

use anyhow::Result;
use async_trait::async_trait;
use std::sync::Arc;

use crate::embedding::{embed_query, EmbeddingClient};
use crate::models::ScoredChunk;
use crate::store::VectorStore;

/// Read-only query interface: top-k most similar chunks for a query string.
#[async_trait]
pub trait Retriever: Send + Sync {
    async fn query(&self, text: &str) -> Result<Vec<ScoredChunk>>;
}

/// Retriever bound to a persisted [`VectorStore`] and an embedding client.
pub struct VectorRetriever {
    store: VectorStore,
    embedder: Arc<dyn EmbeddingClient>,
    k: usize,
}

impl VectorRetriever {
    pub fn new(store: VectorStore, embedder: Arc<dyn EmbeddingClient>, k: usize) -> Self {
        Self { store, embedder, k }
    }
}

#[async_trait]
impl Retriever for VectorRetriever {
    async fn query(&self, text: &str) -> Result<Vec<ScoredChunk>> {
        let query_vec = embed_query(self.embedder.as_ref(), text).await?;
        self.store.nearest(&query_vec, self.k).await
    }
}
