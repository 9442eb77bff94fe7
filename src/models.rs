//! Core data models used throughout bugsleuth.
//!
//! These types represent the source documents, chunks, and reports that flow
//! through the indexing and diagnostic pipeline.

use serde::Serialize;
use sha2::{Digest, Sha256};
use uuid::Uuid;

/// Raw text of one source file, discarded after chunking.
#[derive(Debug, Clone)]
pub struct SourceDocument {
    /// Path relative to the indexing root, forward slashes.
    pub source: String,
    pub text: String,
}

/// A bounded substring of a source file, the unit of embedding and retrieval.
#[derive(Debug, Clone, PartialEq)]
pub struct Chunk {
    pub id: String,
    /// Originating file, relative to the indexing root.
    pub source: String,
    pub chunk_index: i64,
    pub text: String,
    /// SHA-256 of `text`, persisted as provenance metadata alongside
    /// `built_at`; not consulted at query time.
    pub hash: String,
}

impl Chunk {
    pub fn new(source: &str, chunk_index: i64, text: &str) -> Self {
        let mut hasher = Sha256::new();
        hasher.update(text.as_bytes());
        let hash = format!("{:x}", hasher.finalize());

        Self {
            id: Uuid::new_v4().to_string(),
            source: source.to_string(),
            chunk_index,
            text: text.to_string(),
            hash,
        }
    }
}

/// A chunk returned from the retriever together with its similarity score.
#[derive(Debug, Clone)]
pub struct ScoredChunk {
    pub chunk: Chunk,
    pub score: f32,
}

/// The structured output of one diagnostic run.
///
/// Field names are part of the external contract; `solutions` preserves the
/// order the designer produced them in.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Report {
    pub error: String,
    pub explanation: String,
    pub solutions: Vec<String>,
    pub raw_solution_text: String,
}
