use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::config::DEFAULT_ERROR_CONTEXT_LENGTH;
use crate::llm::parse::parse_json;
use crate::llm::{InferenceError, LLM};
use crate::prompts::{build_feasibility_prompt, FEASIBILITY_SYSTEM_PROMPT};
use crate::Question;

/// Whether a question can be forecast through research, and why.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Feasibility {
    pub is_predictable: bool,
    /// Never empty.
    pub reasoning: String,
}

/// Gates the pipeline: one model call per question.
pub struct FeasibilityClassifier {
    llm: Arc<dyn LLM>,
    error_context_length: usize,
}

impl FeasibilityClassifier {
    pub fn new(llm: Arc<dyn LLM>) -> Self {
        Self {
            llm,
            error_context_length: DEFAULT_ERROR_CONTEXT_LENGTH,
        }
    }

    /// Characters of a bad response quoted in parse errors.
    pub fn with_error_context_length(mut self, length: usize) -> Self {
        self.error_context_length = length;
        self
    }

    /// Classifies `question`.
    ///
    /// A failed call or a response that does not carry both a boolean and a
    /// non-empty reasoning is an error; it never falls back to "predictable".
    pub async fn evaluate(&self, question: &Question) -> Result<Feasibility, InferenceError> {
        let prompt = build_feasibility_prompt(question.as_str());
        let response = self
            .llm
            .complete_with_system(FEASIBILITY_SYSTEM_PROMPT, &prompt)
            .await?;

        let parsed: FeasibilityResponse = parse_json(&response, self.error_context_length)?;
        let reasoning = parsed.reasoning.trim();
        if reasoning.is_empty() {
            return Err(InferenceError::Schema("feasibility reasoning is empty".to_string()));
        }

        tracing::info!(is_predictable = parsed.is_predictable, "question evaluated");

        Ok(Feasibility {
            is_predictable: parsed.is_predictable,
            reasoning: reasoning.to_string(),
        })
    }
}

#[derive(Debug, Deserialize)]
struct FeasibilityResponse {
    is_predictable: bool,
    reasoning: String,
}
