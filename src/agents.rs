//! Diagnostic agents: each one is a fixed prompt template composed with a
//! [`ChatClient`].
//!
//! - [`Explainer`] turns an error description plus retrieved context into a
//!   short plain-language explanation.
//! - [`Designer`] proposes multiple distinct remediation strategies as a
//!   numbered list.
//!
//! Prompt wording is a tunable; the input/output contracts are not.

use anyhow::Result;
use std::sync::Arc;

use crate::chat::ChatClient;
use crate::models::ScoredChunk;

/// Marker passed to the agents when retrieval produced nothing.
pub const NO_CONTEXT_MARKER: &str = "No supporting context retrieved.";

/// Format retrieved chunks into a compact, source-labeled prompt block.
///
/// Each chunk is prefixed with its originating path in brackets; blocks are
/// separated by a blank line.
pub fn format_context(chunks: &[ScoredChunk]) -> String {
    if chunks.is_empty() {
        return NO_CONTEXT_MARKER.to_string();
    }

    chunks
        .iter()
        .map(|sc| format!("[{}]\n{}", sc.chunk.source, sc.chunk.text))
        .collect::<Vec<_>>()
        .join("\n\n")
}

const EXPLAINER_SYSTEM: &str = "You are a senior software engineer. \
Explain technical issues to developers of varying experience in concise, plain English. \
Avoid restating the error verbatim unless needed for clarity.";

const DESIGNER_SYSTEM: &str = "You are an expert software engineer helping a teammate fix a bug. \
Suggest at least two concrete, distinct strategies to resolve the issue. \
Each strategy should include a short rationale and point to relevant code when possible.";

/// Crafts an accessible explanation of the observed failure.
pub struct Explainer {
    chat: Arc<dyn ChatClient>,
}

impl Explainer {
    pub fn new(chat: Arc<dyn ChatClient>) -> Self {
        Self { chat }
    }

    pub async fn explain(&self, error_description: &str, chunks: &[ScoredChunk]) -> Result<String> {
        let context = format_context(chunks);
        let user = format!(
            "Error details:\n{}\n\nRelevant code context:\n{}\n\n\
             Provide a brief explanation (3-5 sentences) that describes why this error happens.",
            error_description.trim(),
            context
        );
        self.chat.complete(EXPLAINER_SYSTEM, &user).await
    }
}

/// Generates multiple distinct remediation strategies for the failure.
pub struct Designer {
    chat: Arc<dyn ChatClient>,
}

impl Designer {
    pub fn new(chat: Arc<dyn ChatClient>) -> Self {
        Self { chat }
    }

    pub async fn propose(
        &self,
        error_description: &str,
        explanation: &str,
        chunks: &[ScoredChunk],
    ) -> Result<String> {
        let context = format_context(chunks);
        let user = format!(
            "Error details:\n{}\n\nDiagnostic summary:\n{}\n\nCode context:\n{}\n\n\
             Produce your answer as a numbered list where each item is a candidate solution.",
            error_description.trim(),
            explanation.trim(),
            context
        );
        self.chat.complete(DESIGNER_SYSTEM, &user).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Chunk;

    fn scored(source: &str, text: &str) -> ScoredChunk {
        ScoredChunk {
            chunk: Chunk::new(source, 0, text),
            score: 0.9,
        }
    }

    #[test]
    fn test_format_context_labels_sources() {
        let chunks = vec![scored("app.py", "x = 1/0"), scored("util.py", "def f(): pass")];
        let formatted = format_context(&chunks);
        assert_eq!(formatted, "[app.py]\nx = 1/0\n\n[util.py]\ndef f(): pass");
    }

    #[test]
    fn test_format_context_empty_uses_marker() {
        assert_eq!(format_context(&[]), NO_CONTEXT_MARKER);
    }
}
