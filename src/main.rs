//! # bugsleuth CLI (`sleuth`)
//!
//! Commands for indexing a codebase and running retrieval-augmented failure
//! diagnosis against it.
//!
//! ## Usage
//!
//! ```bash
//! sleuth --config ./sleuth.toml <command>
//! ```
//!
//! | Command | Description |
//! |---------|-------------|
//! | `sleuth index <root>` | Build (or reuse) the persisted chunk index |
//! | `sleuth diagnose <root> --error "<text>"` | Retrieve context, explain the failure, propose fixes |
//!
//! ## Examples
//!
//! ```bash
//! # Build the index once
//! sleuth index ./my-service
//!
//! # Diagnose a failure, reusing the persisted index
//! sleuth diagnose ./my-service --error "ZeroDivisionError in billing.py line 42"
//!
//! # Force a reindex and stream per-stage output
//! sleuth diagnose ./my-service --error "KeyError: 'user_id'" --rebuild --stream
//! ```

use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;

use bugsleuth::config;
use bugsleuth::diagnose::{self, DiagnoseOptions};
use bugsleuth::index_cmd;

/// bugsleuth — retrieval-augmented failure diagnosis over a local source tree.
#[derive(Parser)]
#[command(
    name = "sleuth",
    about = "Retrieval-augmented failure diagnosis over a local source tree",
    version,
    long_about = "bugsleuth indexes a codebase into a persisted vector store, retrieves the \
    code most relevant to a failure description, and uses a chat model to explain the failure \
    and propose distinct remediation strategies."
)]
struct Cli {
    /// Path to configuration file (TOML).
    #[arg(long, global = true, default_value = "./sleuth.toml")]
    config: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Build the persisted chunk index for a codebase.
    ///
    /// Reuses an existing index under the configured persistence directory
    /// unless --rebuild is given. Reuse does not check whether source files
    /// changed since the index was built.
    Index {
        /// Repository or directory to index.
        root: PathBuf,

        /// Force a rebuild even if a persisted index exists.
        #[arg(long)]
        rebuild: bool,
    },

    /// Diagnose a failure against an indexed codebase.
    Diagnose {
        /// Repository or directory to diagnose against.
        root: PathBuf,

        /// Error message, stack trace, or failure description to analyze.
        #[arg(long)]
        error: String,

        /// Force a rebuild of the index before diagnosing.
        #[arg(long)]
        rebuild: bool,

        /// Number of context chunks to retrieve (overrides config).
        #[arg(long)]
        top_k: Option<usize>,

        /// Print each pipeline stage's output as it completes.
        #[arg(long)]
        stream: bool,

        /// Emit the final report as JSON.
        #[arg(long)]
        json: bool,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let config = config::load_config(&cli.config)?;

    match cli.command {
        Commands::Index { root, rebuild } => {
            index_cmd::run_index(&config, &root, rebuild).await?;
        }
        Commands::Diagnose {
            root,
            error,
            rebuild,
            top_k,
            stream,
            json,
        } => {
            let opts = DiagnoseOptions {
                rebuild,
                top_k,
                stream,
                json,
            };
            diagnose::run_diagnose(&config, &root, &error, &opts).await?;
        }
    }

    Ok(())
}
