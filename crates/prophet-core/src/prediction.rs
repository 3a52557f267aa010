use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::config::DEFAULT_ERROR_CONTEXT_LENGTH;
use crate::llm::parse::parse_json;
use crate::llm::{InferenceError, LLM};
use crate::prompts::{build_prediction_prompt, PREDICTION_SYSTEM_PROMPT};
use crate::Question;

/// A probability forecast for a yes/no question.
///
/// Every value is a finite float in [0, 1]; the constructors refuse
/// anything else, so a `Prediction` in hand is always well formed.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Prediction {
    p_yes: f64,
    confidence: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    info_utility: Option<f64>,
}

impl Prediction {
    pub fn new(p_yes: f64, confidence: f64) -> Option<Self> {
        Self::with_info_utility(p_yes, confidence, None)
    }

    pub fn with_info_utility(p_yes: f64, confidence: f64, info_utility: Option<f64>) -> Option<Self> {
        if !is_unit(p_yes) || !is_unit(confidence) || !info_utility.map_or(true, is_unit) {
            return None;
        }
        Some(Self {
            p_yes,
            confidence,
            info_utility,
        })
    }

    /// Probability the question resolves YES.
    pub fn p_yes(&self) -> f64 {
        self.p_yes
    }

    pub fn p_no(&self) -> f64 {
        1.0 - self.p_yes
    }

    pub fn confidence(&self) -> f64 {
        self.confidence
    }

    /// How useful the report was, when the model reported it.
    pub fn info_utility(&self) -> Option<f64> {
        self.info_utility
    }
}

fn is_unit(value: f64) -> bool {
    value.is_finite() && (0.0..=1.0).contains(&value)
}

/// Turns a question and a research report into a [`Prediction`].
pub struct PredictionEngine {
    llm: Arc<dyn LLM>,
    error_context_length: usize,
}

impl PredictionEngine {
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

    /// One model call. `Ok(None)` means the model answered but gave no
    /// usable forecast: a value was missing or outside [0, 1]. Values are
    /// never clamped into range.
    pub async fn predict(&self, question: &Question, report: &str) -> Result<Option<Prediction>, InferenceError> {
        let prompt = build_prediction_prompt(question.as_str(), report);
        let response = self
            .llm
            .complete_with_system(PREDICTION_SYSTEM_PROMPT, &prompt)
            .await?;

        let parsed: PredictionResponse = parse_json(&response, self.error_context_length)?;
        let prediction = parsed.into_prediction();

        match &prediction {
            Some(p) => tracing::info!(p_yes = p.p_yes, confidence = p.confidence, "prediction made"),
            None => tracing::warn!(?parsed, "model returned no usable prediction"),
        }

        Ok(prediction)
    }
}

/// Raw model output. Fields are optional so that a missing value becomes
/// "no prediction" rather than a parse failure; a value of the wrong type
/// still fails parsing.
#[derive(Debug, Clone, Copy, Deserialize)]
struct PredictionResponse {
    p_yes: Option<f64>,
    confidence: Option<f64>,
    #[serde(default)]
    info_utility: Option<f64>,
}

impl PredictionResponse {
    fn into_prediction(self) -> Option<Prediction> {
        Prediction::with_info_utility(self.p_yes?, self.confidence?, self.info_utility)
    }
}
