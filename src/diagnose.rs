//! The `diagnose` command: index (or reuse) the codebase, run the diagnostic
//! pipeline, and print the report.

use anyhow::Result;
use std::path::Path;
use std::sync::Arc;

use crate::agents::{Designer, Explainer};
use crate::chat;
use crate::config::Config;
use crate::embedding::{self, EmbeddingClient};
use crate::indexer;
use crate::models::Report;
use crate::pipeline::{Pipeline, StageUpdate};
use crate::retriever::VectorRetriever;

pub struct DiagnoseOptions {
    pub rebuild: bool,
    pub top_k: Option<usize>,
    pub stream: bool,
    pub json: bool,
}

pub async fn run_diagnose(
    config: &Config,
    root: &Path,
    error_description: &str,
    opts: &DiagnoseOptions,
) -> Result<()> {
    let embedder: Arc<dyn EmbeddingClient> =
        Arc::from(embedding::create_embedder(&config.embedding)?);
    let chat_client = Arc::from(chat::create_chat_client(&config.chat)?);

    println!("Indexing codebase at {}", root.display());
    let (store, summary) =
        indexer::build_index(&config.index, embedder.as_ref(), root, opts.rebuild).await?;
    if summary.reused {
        println!(
            "  reused persisted index ({} chunks)",
            summary.chunks
        );
    } else {
        println!(
            "  indexed {} documents into {} chunks",
            summary.documents, summary.chunks
        );
    }

    let top_k = opts.top_k.unwrap_or(config.index.top_k);
    let retriever = Arc::new(VectorRetriever::new(store, embedder, top_k));

    let pipeline = Pipeline::new(
        retriever,
        Explainer::new(Arc::clone(&chat_client)),
        Designer::new(chat_client),
    );

    let report = if opts.stream {
        pipeline
            .run_streaming(error_description, print_stage_update)
            .await?
    } else {
        pipeline.run(error_description).await?
    };

    if opts.json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        print_report(&report);
    }

    Ok(())
}

fn print_stage_update(update: StageUpdate<'_>) {
    match &update {
        StageUpdate::ContextRetrieved { chunks } => {
            println!("[{}] {} chunks", update.stage().name(), chunks.len());
        }
        StageUpdate::ExplanationGenerated { explanation } => {
            println!("[{}]\n{}", update.stage().name(), explanation);
        }
        StageUpdate::SolutionsDesigned { raw } => {
            println!("[{}]\n{}", update.stage().name(), raw);
        }
        StageUpdate::ReportFinalized { report } => {
            println!(
                "[{}] {} solutions",
                update.stage().name(),
                report.solutions.len()
            );
        }
    }
}

fn print_report(report: &Report) {
    println!();
    println!("=== Debugger Report ===");
    println!("Error:\n{}\n", report.error);
    println!("Explanation:");
    println!("{}", report.explanation);
    println!();
    println!("Candidate Solutions:");
    for (i, solution) in report.solutions.iter().enumerate() {
        println!("{}. {}", i + 1, solution);
    }
}
