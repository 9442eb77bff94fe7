use anyhow::Result;
use std::path::Path;

use crate::config::Config;
use crate::embedding;
use crate::indexer;

pub async fn run_index(config: &Config, root: &Path, rebuild: bool) -> Result<()> {
    let embedder = embedding::create_embedder(&config.embedding)?;

    let (store, summary) = indexer::build_index(&config.index, embedder.as_ref(), root, rebuild).await?;
    store.close().await?;

    println!("index {}", root.display());
    if summary.reused {
        println!(
            "  reused persisted index at {} ({} chunks)",
            config.index.persist_dir.display(),
            summary.chunks
        );
    } else {
        println!("  documents indexed: {}", summary.documents);
        println!("  chunks written: {}", summary.chunks);
        println!("  persisted to: {}", config.index.persist_dir.display());
    }
    println!("ok");

    Ok(())
}
