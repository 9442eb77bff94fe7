//! Source tree indexing.
//!
//! Turns a directory of source files into a persisted vector store: walk the
//! tree, keep files matching the include globs and none of the exclude globs,
//! split each file into overlapping chunks, embed them in batches, and write
//! chunk text + vectors to the store.
//!
//! If a persisted store already exists and `force_rebuild` is false, the
//! store is reused as-is — no source files are read and no embedding calls
//! are made. Reuse performs no staleness check against the current file set;
//! `--rebuild` is the escape hatch when sources have changed.

use anyhow::{bail, Result};
use globset::{Glob, GlobSet, GlobSetBuilder};
use std::path::Path;
use walkdir::WalkDir;

use crate::config::IndexConfig;
use crate::embedding::EmbeddingClient;
use crate::models::{Chunk, SourceDocument};
use crate::splitter::split_document;
use crate::store::{store_exists, VectorStore};

/// Outcome of an index build, for command output.
#[derive(Debug, Clone)]
pub struct IndexSummary {
    /// True when a persisted store was reused without rebuilding.
    pub reused: bool,
    pub documents: usize,
    pub chunks: usize,
}

/// Build or reuse the persisted index for `root` and return the open store.
///
/// Fails immediately if `root` does not exist as a directory; no partial
/// index is ever produced. Individual unreadable files are skipped with a
/// warning. Embedding failures abort the whole build.
pub async fn build_index(
    config: &IndexConfig,
    embedder: &dyn EmbeddingClient,
    root: &Path,
    force_rebuild: bool,
) -> Result<(VectorStore, IndexSummary)> {
    if !root.is_dir() {
        bail!("Codebase path '{}' does not exist.", root.display());
    }

    if !force_rebuild && store_exists(&config.persist_dir) {
        let store = VectorStore::open(&config.persist_dir).await?;
        let chunks = store.chunk_count().await? as usize;
        let summary = IndexSummary {
            reused: true,
            documents: 0,
            chunks,
        };
        return Ok((store, summary));
    }

    let documents = load_documents(config, root)?;

    let mut chunks: Vec<Chunk> = Vec::new();
    for doc in &documents {
        chunks.extend(split_document(doc, config.chunk_size, config.chunk_overlap));
    }

    // Embed before touching the persisted store so an embedding failure
    // leaves any previous index intact.
    let texts: Vec<String> = chunks.iter().map(|c| c.text.clone()).collect();
    let mut vectors: Vec<Vec<f32>> = Vec::with_capacity(texts.len());
    for batch in texts.chunks(embedder.batch_size().max(1)) {
        vectors.extend(embedder.embed(batch).await?);
    }

    let store = VectorStore::recreate(&config.persist_dir).await?;
    store.insert_chunks(&chunks, &vectors).await?;

    store.set_meta("model", embedder.model_name()).await?;
    if let Some(first) = vectors.first() {
        store.set_meta("dims", &first.len().to_string()).await?;
    }
    store
        .set_meta("chunk_size", &config.chunk_size.to_string())
        .await?;
    store
        .set_meta("chunk_overlap", &config.chunk_overlap.to_string())
        .await?;
    store
        .set_meta("built_at", &chrono::Utc::now().to_rfc3339())
        .await?;

    let summary = IndexSummary {
        reused: false,
        documents: documents.len(),
        chunks: chunks.len(),
    };
    Ok((store, summary))
}

/// Load every included source file under `root`. Unreadable files are
/// skipped with a warning; indexing continues with the rest.
fn load_documents(config: &IndexConfig, root: &Path) -> Result<Vec<SourceDocument>> {
    let include_set = build_globset(&config.include_globs)?;
    let exclude_set = build_globset(&config.exclude_globs)?;

    let mut documents = Vec::new();

    for entry in WalkDir::new(root) {
        let entry = match entry {
            Ok(entry) => entry,
            Err(e) => {
                eprintln!("Warning: skipping unreadable directory entry: {}", e);
                continue;
            }
        };
        if !entry.file_type().is_file() {
            continue;
        }

        let path = entry.path();
        let relative = path.strip_prefix(root).unwrap_or(path);
        let rel_str = relative.to_string_lossy().replace('\\', "/");

        if !include_set.is_match(&rel_str) {
            continue;
        }
        // Exclude wins over include.
        if exclude_set.is_match(&rel_str) {
            continue;
        }

        match std::fs::read_to_string(path) {
            Ok(text) => documents.push(SourceDocument {
                source: rel_str,
                text,
            }),
            Err(e) => {
                eprintln!("Warning: skipping {} due to error: {}", path.display(), e);
            }
        }
    }

    // Sort for deterministic chunk ordering across rebuilds.
    documents.sort_by(|a, b| a.source.cmp(&b.source));

    Ok(documents)
}

fn build_globset(patterns: &[String]) -> Result<GlobSet> {
    let mut builder = GlobSetBuilder::new();
    for pattern in patterns {
        builder.add(Glob::new(pattern)?);
    }
    Ok(builder.build()?)
}
