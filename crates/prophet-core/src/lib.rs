//! Research-and-predict pipeline for yes/no forecasting questions.
//!
//! A question is first checked for feasibility, then researched on the web
//! (planned sub-queries, search, scraping, chunk embedding and retrieval),
//! and finally turned into a probability forecast. Reports can be graded
//! against a fixed rubric independently of prediction.

pub mod config;
pub mod evidence;
pub mod feasibility;
pub mod grading;
pub mod llm;
pub mod pipeline;
pub mod planning;
pub mod prediction;
pub mod prompts;
pub mod question;
pub mod research;
pub mod web;

pub use config::{Config, ConfigError};
pub use evidence::{EmbeddingError, EvidenceChunk, EvidenceStore, ScoredChunk};
pub use feasibility::{Feasibility, FeasibilityClassifier};
pub use grading::{GradeScore, GradingEngine, Metric, MetricScore};
pub use llm::{InferenceError, LLMError, LLM};
pub use pipeline::{
    grader_from_config, predictor_from_config, Pipeline, PipelineError, PipelineOutcome,
};
pub use planning::{PlanningError, QueryPlanner, SubQuery};
pub use prediction::{Prediction, PredictionEngine};
pub use question::{Question, QuestionError};
pub use research::{ReportMode, ResearchError, ResearchProgress, ResearchReport, ResearchRunner};
pub use web::{NetworkError, ScrapedDocument, SearchResult, WebResearchClient};
