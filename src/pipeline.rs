//! The diagnostic pipeline: a fixed linear chain of four stages that threads
//! an append-only [`RunState`] from error description to [`Report`].
//!
//! Stage order is `RetrieveContext → GenerateExplanation → DesignSolutions →
//! FinalizeReport`. There is no branching and no retry: each stage appends
//! exactly one field to the run state, and any stage failure aborts the run
//! with no partial report. Independent runs may execute concurrently; a
//! `RunState` is never shared between runs.
//!
//! [`Pipeline::run_streaming`] exposes each completed stage's partial state
//! to an observer before the final report is assembled.

use anyhow::{bail, Result};
use regex::Regex;
use std::sync::{Arc, LazyLock};

use crate::agents::{Designer, Explainer};
use crate::models::{Report, ScoredChunk};
use crate::retriever::Retriever;

/// The four pipeline stages, in execution order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    RetrieveContext,
    GenerateExplanation,
    DesignSolutions,
    FinalizeReport,
}

impl Stage {
    /// Fixed execution order; an explicit list rather than a DAG because the
    /// chain has no branches.
    pub const ORDER: [Stage; 4] = [
        Stage::RetrieveContext,
        Stage::GenerateExplanation,
        Stage::DesignSolutions,
        Stage::FinalizeReport,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            Stage::RetrieveContext => "retrieve_context",
            Stage::GenerateExplanation => "generate_explanation",
            Stage::DesignSolutions => "design_solutions",
            Stage::FinalizeReport => "finalize_report",
        }
    }
}

/// Accumulating record for one diagnostic run. Fields are appended in stage
/// order and never overwritten; accessors fail loudly when a stage reads a
/// field its predecessors have not produced.
#[derive(Debug, Default)]
pub struct RunState {
    error_description: String,
    context: Option<Vec<ScoredChunk>>,
    explanation: Option<String>,
    solution_suggestions: Option<String>,
}

impl RunState {
    fn new(error_description: String) -> Self {
        Self {
            error_description,
            ..Self::default()
        }
    }

    pub fn error_description(&self) -> &str {
        &self.error_description
    }

    pub fn context(&self) -> Result<&[ScoredChunk]> {
        self.context
            .as_deref()
            .ok_or_else(|| anyhow::anyhow!("context not yet retrieved"))
    }

    pub fn explanation(&self) -> Result<&str> {
        self.explanation
            .as_deref()
            .ok_or_else(|| anyhow::anyhow!("explanation not yet generated"))
    }

    pub fn solution_suggestions(&self) -> Result<&str> {
        self.solution_suggestions
            .as_deref()
            .ok_or_else(|| anyhow::anyhow!("solutions not yet designed"))
    }
}

/// Partial state handed to a streaming observer as each stage completes.
#[derive(Debug)]
pub enum StageUpdate<'a> {
    ContextRetrieved { chunks: &'a [ScoredChunk] },
    ExplanationGenerated { explanation: &'a str },
    SolutionsDesigned { raw: &'a str },
    ReportFinalized { report: &'a Report },
}

impl StageUpdate<'_> {
    pub fn stage(&self) -> Stage {
        match self {
            StageUpdate::ContextRetrieved { .. } => Stage::RetrieveContext,
            StageUpdate::ExplanationGenerated { .. } => Stage::GenerateExplanation,
            StageUpdate::SolutionsDesigned { .. } => Stage::DesignSolutions,
            StageUpdate::ReportFinalized { .. } => Stage::FinalizeReport,
        }
    }
}

/// Coordinates retrieval, explanation, and remediation design for one
/// diagnostic run at a time.
pub struct Pipeline {
    retriever: Arc<dyn Retriever>,
    explainer: Explainer,
    designer: Designer,
}

impl Pipeline {
    pub fn new(retriever: Arc<dyn Retriever>, explainer: Explainer, designer: Designer) -> Self {
        Self {
            retriever,
            explainer,
            designer,
        }
    }

    /// Execute the full chain and return the structured report.
    pub async fn run(&self, error_description: &str) -> Result<Report> {
        self.run_streaming(error_description, |_| {}).await
    }

    /// Execute the full chain, invoking `on_update` after each stage
    /// completes and before the next one starts.
    pub async fn run_streaming(
        &self,
        error_description: &str,
        mut on_update: impl FnMut(StageUpdate<'_>),
    ) -> Result<Report> {
        let trimmed = error_description.trim();
        if trimmed.is_empty() {
            bail!("Error description must not be empty.");
        }

        let mut state = RunState::new(trimmed.to_string());
        let mut report: Option<Report> = None;

        for stage in Stage::ORDER {
            match stage {
                Stage::RetrieveContext => {
                    let chunks = self.retriever.query(state.error_description()).await?;
                    state.context = Some(chunks);
                    on_update(StageUpdate::ContextRetrieved {
                        chunks: state.context()?,
                    });
                }
                Stage::GenerateExplanation => {
                    let explanation = self
                        .explainer
                        .explain(state.error_description(), state.context()?)
                        .await?;
                    state.explanation = Some(explanation);
                    on_update(StageUpdate::ExplanationGenerated {
                        explanation: state.explanation()?,
                    });
                }
                Stage::DesignSolutions => {
                    let raw = self
                        .designer
                        .propose(
                            state.error_description(),
                            state.explanation()?,
                            state.context()?,
                        )
                        .await?;
                    state.solution_suggestions = Some(raw);
                    on_update(StageUpdate::SolutionsDesigned {
                        raw: state.solution_suggestions()?,
                    });
                }
                Stage::FinalizeReport => {
                    let raw = state.solution_suggestions()?;
                    let assembled = Report {
                        error: state.error_description().to_string(),
                        explanation: state.explanation()?.to_string(),
                        solutions: parse_numbered_list(raw),
                        raw_solution_text: raw.to_string(),
                    };
                    on_update(StageUpdate::ReportFinalized { report: &assembled });
                    report = Some(assembled);
                }
            }
        }

        report.ok_or_else(|| anyhow::anyhow!("pipeline finished without a report"))
    }
}

static NUMBERED_ITEM: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\s*\d+\.\s+(.*)$").expect("valid numbered-item pattern"));

/// Extract numbered list items (`1. text`) from designer output, in order.
///
/// If no line matches and the trimmed text is non-empty, the entire trimmed
/// text becomes a single-element list: the report never carries zero
/// solutions when the model produced any output at all. Empty input yields
/// an empty list.
pub fn parse_numbered_list(output: &str) -> Vec<String> {
    let mut items: Vec<String> = Vec::new();

    for line in output.lines() {
        if let Some(captures) = NUMBERED_ITEM.captures(line) {
            if let Some(rest) = captures.get(1) {
                items.push(rest.as_str().trim().to_string());
            }
        }
    }

    if items.is_empty() && !output.trim().is_empty() {
        items.push(output.trim().to_string());
    }

    items
}
