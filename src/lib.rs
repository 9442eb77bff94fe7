//! # bugsleuth
//!
//! Retrieval-augmented failure diagnosis over a local source tree.
//!
//! Given a free-text error description and a codebase, bugsleuth retrieves
//! the most relevant code fragments from a persisted vector index, asks a
//! chat model to explain the failure, asks it for distinct remediation
//! strategies, and assembles everything into a structured report.
//!
//! ## Architecture
//!
//! ```text
//! ┌───────────┐   ┌───────────────┐   ┌──────────────┐
//! │  Indexer  │──▶│ Split + Embed │──▶│    SQLite    │
//! │ walk+glob │   │  (overlap)    │   │ chunks + vec │
//! └───────────┘   └───────────────┘   └──────┬───────┘
//!                                            │
//!        error text ──▶ Retriever ◀──────────┘
//!                          │
//!                          ▼
//!            Explainer ──▶ Designer ──▶ Report
//! ```
//!
//! ## Modules
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`config`] | TOML configuration parsing and validation |
//! | [`models`] | Core data types |
//! | [`splitter`] | Boundary-aware chunking with overlap |
//! | [`store`] | SQLite vector store |
//! | [`embedding`] | Embedding client abstraction |
//! | [`chat`] | Chat client abstraction |
//! | [`indexer`] | Source discovery and index build/reuse |
//! | [`retriever`] | Top-k similarity query |
//! | [`agents`] | Explainer and Designer prompts |
//! | [`pipeline`] | Four-stage diagnostic state machine |
//! | [`diagnose`] | The `diagnose` command |
//! | [`index_cmd`] | The `index` command |

pub mod agents;
pub mod chat;
pub mod config;
pub mod diagnose;
pub mod embedding;
pub mod index_cmd;
pub mod indexer;
pub mod models;
pub mod pipeline;
pub mod retriever;
pub mod splitter;
pub mod store;
