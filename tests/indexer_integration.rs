//! Index build, reuse, and retrieval tests against real files in a tempdir,
//! using a deterministic embedding double.

use anyhow::Result;
use async_trait::async_trait;
use std::fs;
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tempfile::TempDir;

use bugsleuth::config::IndexConfig;
use bugsleuth::embedding::EmbeddingClient;
use bugsleuth::indexer::build_index;
use bugsleuth::retriever::{Retriever, VectorRetriever};

/// Deterministic embedder: letter-frequency vectors, so similar text maps to
/// similar vectors without any network. Counts every embedded text.
struct CountingEmbedder {
    embedded_texts: AtomicUsize,
}

impl CountingEmbedder {
    fn new() -> Arc<Self> {
        Arc::new(Self {
            embedded_texts: AtomicUsize::new(0),
        })
    }

    fn count(&self) -> usize {
        self.embedded_texts.load(Ordering::SeqCst)
    }

    fn vectorize(text: &str) -> Vec<f32> {
        let mut vec = vec![0.0f32; 26];
        for c in text.chars().flat_map(|c| c.to_lowercase()) {
            if c.is_ascii_lowercase() {
                vec[(c as u8 - b'a') as usize] += 1.0;
            }
        }
        vec
    }
}

#[async_trait]
impl EmbeddingClient for CountingEmbedder {
    fn model_name(&self) -> &str {
        "letter-frequency"
    }

    fn batch_size(&self) -> usize {
        4
    }

    async fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        self.embedded_texts.fetch_add(texts.len(), Ordering::SeqCst);
        Ok(texts.iter().map(|t| Self::vectorize(t)).collect())
    }
}

fn write_fixture_tree(root: &Path) {
    fs::create_dir_all(root.join("src")).unwrap();
    fs::create_dir_all(root.join("node_modules/lib")).unwrap();
    fs::write(
        root.join("src/billing.py"),
        "def charge(amount, count):\n    return amount / count\n",
    )
    .unwrap();
    fs::write(
        root.join("src/users.py"),
        "def lookup(users, key):\n    return users[key]\n",
    )
    .unwrap();
    fs::write(root.join("notes.md"), "not a source file").unwrap();
    fs::write(root.join("node_modules/lib/index.js"), "excluded()").unwrap();
}

fn fixture_config(tmp: &TempDir) -> IndexConfig {
    IndexConfig {
        persist_dir: tmp.path().join("store"),
        chunk_size: 200,
        chunk_overlap: 40,
        ..IndexConfig::default()
    }
}

#[tokio::test]
async fn test_build_indexes_only_included_files() {
    let tmp = TempDir::new().unwrap();
    write_fixture_tree(tmp.path());
    let config = fixture_config(&tmp);
    let embedder = CountingEmbedder::new();

    let (store, summary) = build_index(&config, embedder.as_ref(), tmp.path(), false)
        .await
        .unwrap();

    assert!(!summary.reused);
    assert_eq!(summary.documents, 2, "only the two .py files are included");
    assert!(summary.chunks >= 2);
    assert_eq!(embedder.count(), summary.chunks);

    assert_eq!(
        store.get_meta("model").await.unwrap().as_deref(),
        Some("letter-frequency")
    );
    assert_eq!(store.get_meta("dims").await.unwrap().as_deref(), Some("26"));

    store.close().await.unwrap();
}

#[tokio::test]
async fn test_reuse_performs_zero_embedding_calls() {
    let tmp = TempDir::new().unwrap();
    write_fixture_tree(tmp.path());
    let config = fixture_config(&tmp);
    let embedder = CountingEmbedder::new();

    let (store, _) = build_index(&config, embedder.as_ref(), tmp.path(), false)
        .await
        .unwrap();
    store.close().await.unwrap();
    let after_first = embedder.count();

    let (store, summary) = build_index(&config, embedder.as_ref(), tmp.path(), false)
        .await
        .unwrap();

    assert!(summary.reused);
    assert_eq!(
        embedder.count(),
        after_first,
        "reuse must not call the embedding service"
    );

    store.close().await.unwrap();
}

#[tokio::test]
async fn test_reuse_returns_identical_query_results() {
    let tmp = TempDir::new().unwrap();
    write_fixture_tree(tmp.path());
    let config = fixture_config(&tmp);
    let embedder = CountingEmbedder::new();

    let (store, _) = build_index(&config, embedder.as_ref(), tmp.path(), false)
        .await
        .unwrap();
    let retriever = VectorRetriever::new(store, embedder.clone() as Arc<dyn EmbeddingClient>, 4);
    let first: Vec<String> = retriever
        .query("charge amount divided by count")
        .await
        .unwrap()
        .into_iter()
        .map(|sc| sc.chunk.text)
        .collect();
    drop(retriever);

    let (store, summary) = build_index(&config, embedder.as_ref(), tmp.path(), false)
        .await
        .unwrap();
    assert!(summary.reused);
    let retriever = VectorRetriever::new(store, embedder as Arc<dyn EmbeddingClient>, 4);
    let second: Vec<String> = retriever
        .query("charge amount divided by count")
        .await
        .unwrap()
        .into_iter()
        .map(|sc| sc.chunk.text)
        .collect();

    assert_eq!(first, second);
}

#[tokio::test]
async fn test_force_rebuild_reembeds() {
    let tmp = TempDir::new().unwrap();
    write_fixture_tree(tmp.path());
    let config = fixture_config(&tmp);
    let embedder = CountingEmbedder::new();

    let (store, _) = build_index(&config, embedder.as_ref(), tmp.path(), false)
        .await
        .unwrap();
    store.close().await.unwrap();
    let after_first = embedder.count();

    let (store, summary) = build_index(&config, embedder.as_ref(), tmp.path(), true)
        .await
        .unwrap();

    assert!(!summary.reused);
    assert!(embedder.count() > after_first);

    store.close().await.unwrap();
}

#[tokio::test]
async fn test_undecodable_file_skipped_with_rest_indexed() {
    let tmp = TempDir::new().unwrap();
    write_fixture_tree(tmp.path());
    // Matches the include globs but is not valid UTF-8.
    fs::write(tmp.path().join("src/bad.py"), [0xff, 0xfe, 0x01]).unwrap();
    let config = fixture_config(&tmp);
    let embedder = CountingEmbedder::new();

    let (store, summary) = build_index(&config, embedder.as_ref(), tmp.path(), false)
        .await
        .unwrap();

    assert!(!summary.reused);
    assert_eq!(
        summary.documents, 2,
        "undecodable file is skipped, the rest still indexed"
    );

    let results = store.nearest(&CountingEmbedder::vectorize("lookup users"), 10)
        .await
        .unwrap();
    assert!(results.iter().all(|sc| sc.chunk.source != "src/bad.py"));

    store.close().await.unwrap();
}

#[tokio::test]
async fn test_missing_root_fails_before_any_index_work() {
    let tmp = TempDir::new().unwrap();
    let config = fixture_config(&tmp);
    let embedder = CountingEmbedder::new();

    let result = build_index(
        &config,
        embedder.as_ref(),
        &tmp.path().join("no-such-dir"),
        false,
    )
    .await;

    let err = result.err().expect("missing root must fail");
    assert!(err.to_string().contains("does not exist"));
    assert_eq!(embedder.count(), 0);
    assert!(!config.persist_dir.exists(), "no partial index on disk");
}

#[tokio::test]
async fn test_query_ranks_relevant_file_first() {
    let tmp = TempDir::new().unwrap();
    write_fixture_tree(tmp.path());
    let config = fixture_config(&tmp);
    let embedder = CountingEmbedder::new();

    let (store, _) = build_index(&config, embedder.as_ref(), tmp.path(), false)
        .await
        .unwrap();
    let retriever = VectorRetriever::new(store, embedder as Arc<dyn EmbeddingClient>, 2);

    let results = retriever
        .query("lookup users key users users")
        .await
        .unwrap();

    assert!(!results.is_empty());
    assert!(results.len() <= 2);
    assert_eq!(results[0].chunk.source, "src/users.py");
    for pair in results.windows(2) {
        assert!(pair[0].score >= pair[1].score);
    }
}
