use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;
use std::sync::Arc;
use thiserror::Error;

use crate::config::DEFAULT_ERROR_CONTEXT_LENGTH;
use crate::llm::parse::parse_json;
use crate::llm::{InferenceError, LLM};
use crate::prompts::{build_planner_prompt, PLANNER_SYSTEM_PROMPT};
use crate::Question;

/// A narrower search string derived from the question.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SubQuery(String);

impl SubQuery {
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Dedup key: lowercase with runs of whitespace collapsed.
    fn normalized(&self) -> String {
        self.0
            .split_whitespace()
            .collect::<Vec<_>>()
            .join(" ")
            .to_lowercase()
    }
}

impl fmt::Display for SubQuery {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for SubQuery {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// Errors that can occur during query planning.
#[derive(Debug, Error)]
pub enum PlanningError {
    #[error("Planning inference failed: {0}")]
    Inference(#[from] InferenceError),

    #[error("Planner produced no usable sub-queries")]
    NoQueries,
}

/// Decomposes a question into search queries.
///
/// The model is expected to run at temperature 0; the client handed in
/// here is built with the configured temperature.
pub struct QueryPlanner {
    llm: Arc<dyn LLM>,
    error_context_length: usize,
}

impl QueryPlanner {
    pub fn new(llm: Arc<dyn LLM>) -> Self {
        Self {
            llm,
            error_context_length: DEFAULT_ERROR_CONTEXT_LENGTH,
        }
    }

    pub fn with_error_context_length(mut self, length: usize) -> Self {
        self.error_context_length = length;
        self
    }

    /// Returns at most `limit` distinct sub-queries in the order the model
    /// gave them. Fewer than `limit` is fine; none is an error.
    pub async fn plan(&self, question: &Question, limit: usize) -> Result<Vec<SubQuery>, PlanningError> {
        if limit == 0 {
            return Err(PlanningError::NoQueries);
        }

        let prompt = build_planner_prompt(question.as_str(), limit);
        let response = self
            .llm
            .complete_with_system(PLANNER_SYSTEM_PROMPT, &prompt)
            .await
            .map_err(InferenceError::from)?;

        let parsed: PlannerResponse = parse_json(&response, self.error_context_length)?;
        let queries = normalize_queries(parsed.into_queries(), limit);

        if queries.is_empty() {
            return Err(PlanningError::NoQueries);
        }

        tracing::info!(count = queries.len(), limit, "sub-queries planned");
        for (i, query) in queries.iter().enumerate() {
            tracing::debug!(index = i, query = %query, "sub-query");
        }

        Ok(queries)
    }
}

/// Trims, drops empties and case/whitespace duplicates, then truncates.
pub(crate) fn normalize_queries(raw: Vec<String>, limit: usize) -> Vec<SubQuery> {
    let mut seen = HashSet::new();
    raw.into_iter()
        .map(|q| SubQuery(q.trim().to_string()))
        .filter(|q| !q.0.is_empty())
        .filter(|q| seen.insert(q.normalized()))
        .take(limit)
        .collect()
}

/// Either `{"queries": [...]}` or a bare array.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum PlannerResponse {
    Object { queries: Vec<String> },
    List(Vec<String>),
}

impl PlannerResponse {
    fn into_queries(self) -> Vec<String> {
        match self {
            PlannerResponse::Object { queries } => queries,
            PlannerResponse::List(queries) => queries,
        }
    }
}
