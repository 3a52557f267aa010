//! Rubric grading of research reports, independent of prediction.

use futures::future::try_join_all;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use crate::config::{DEFAULT_ERROR_CONTEXT_LENGTH, GRADE_SCALE_MAX};
use crate::llm::parse::parse_json;
use crate::llm::{InferenceError, LLM};
use crate::prompts::{build_grading_prompt, GRADING_SYSTEM_PROMPT};
use crate::Question;

/// The fixed rubric dimensions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Metric {
    Relevance,
    Completeness,
    SourceQuality,
    Recency,
}

impl Metric {
    pub const ALL: [Metric; 4] = [
        Metric::Relevance,
        Metric::Completeness,
        Metric::SourceQuality,
        Metric::Recency,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Metric::Relevance => "relevance",
            Metric::Completeness => "completeness",
            Metric::SourceQuality => "source_quality",
            Metric::Recency => "recency",
        }
    }

    /// What the grader is asked to judge for this dimension.
    pub fn description(&self) -> &'static str {
        match self {
            Metric::Relevance => {
                "How directly the report addresses the question. Penalize material that is off-topic or only loosely related."
            }
            Metric::Completeness => {
                "Whether the report covers the factors needed to forecast the question: base rates, key actors, deadlines and the current state of affairs."
            }
            Metric::SourceQuality => {
                "How reliable and well attributed the cited sources are. Reward primary sources and reputable outlets; penalize unattributed claims."
            }
            Metric::Recency => {
                "How current the evidence is relative to the question. Penalize reports that rely on stale information when newer developments matter."
            }
        }
    }
}

impl fmt::Display for Metric {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One graded dimension.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetricScore {
    /// In [0, 10].
    pub score: f64,
    pub reasoning: String,
}

/// Scores keyed by rubric dimension. Always holds every [`Metric`].
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GradeScore {
    scores: BTreeMap<Metric, MetricScore>,
}

impl GradeScore {
    pub fn get(&self, metric: Metric) -> Option<&MetricScore> {
        self.scores.get(&metric)
    }

    pub fn iter(&self) -> impl Iterator<Item = (Metric, &MetricScore)> {
        self.scores.iter().map(|(m, s)| (*m, s))
    }

    /// Unweighted mean over all dimensions.
    pub fn mean(&self) -> f64 {
        if self.scores.is_empty() {
            return 0.0;
        }
        self.scores.values().map(|s| s.score).sum::<f64>() / self.scores.len() as f64
    }
}

/// Scores a report with one model call per rubric dimension.
pub struct GradingEngine {
    llm: Arc<dyn LLM>,
    error_context_length: usize,
}

impl GradingEngine {
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

    /// Grades `report` on every dimension. Any failed or malformed
    /// dimension fails the whole grade.
    pub async fn grade(&self, question: &Question, report: &str) -> Result<GradeScore, InferenceError> {
        let graded = try_join_all(
            Metric::ALL
                .iter()
                .map(|metric| self.grade_metric(question, report, *metric)),
        )
        .await?;

        let grade = GradeScore {
            scores: graded.into_iter().collect(),
        };
        tracing::info!(mean = grade.mean(), "report graded");
        Ok(grade)
    }

    async fn grade_metric(
        &self,
        question: &Question,
        report: &str,
        metric: Metric,
    ) -> Result<(Metric, MetricScore), InferenceError> {
        let prompt = build_grading_prompt(
            question.as_str(),
            report,
            metric.as_str(),
            metric.description(),
        );
        let response = self
            .llm
            .complete_with_system(GRADING_SYSTEM_PROMPT, &prompt)
            .await?;

        let parsed: MetricScore = parse_json(&response, self.error_context_length)?;
        if !parsed.score.is_finite() || !(0.0..=GRADE_SCALE_MAX).contains(&parsed.score) {
            return Err(InferenceError::Schema(format!(
                "{} score {} outside [0, {}]",
                metric, parsed.score, GRADE_SCALE_MAX
            )));
        }

        tracing::debug!(metric = %metric, score = parsed.score, "dimension graded");
        Ok((metric, parsed))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_metric_names_match_serde() {
        for metric in Metric::ALL {
            let json = serde_json::to_string(&metric).unwrap();
            assert_eq!(json, format!("\"{}\"", metric.as_str()));
        }
    }

    #[test]
    fn test_mean() {
        let grade = GradeScore {
            scores: Metric::ALL
                .iter()
                .zip([4.0, 6.0, 8.0, 10.0])
                .map(|(m, score)| {
                    (
                        *m,
                        MetricScore {
                            score,
                            reasoning: String::new(),
                        },
                    )
                })
                .collect(),
        };
        assert_eq!(grade.mean(), 7.0);
        assert_eq!(grade.get(Metric::Recency).unwrap().score, 10.0);
    }
}
