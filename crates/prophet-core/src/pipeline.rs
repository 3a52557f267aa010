//! End-to-end forecasting: evaluate, research, predict.

use serde::Serialize;
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::mpsc::UnboundedSender;
use tracing::Instrument;
use uuid::Uuid;

use crate::config::{Config, StageConfig, PLANNER_TEMPERATURE};
use crate::evidence::{embedder_from_config, EmbeddingError};
use crate::feasibility::{Feasibility, FeasibilityClassifier};
use crate::grading::GradingEngine;
use crate::llm::{client_from_config, InferenceError, LLMError, LLM};
use crate::prediction::{Prediction, PredictionEngine};
use crate::research::{ResearchError, ResearchProgress, ResearchReport, ResearchRunner};
use crate::web::{NetworkError, WebResearchClient};
use crate::Question;

/// Errors that stop a pipeline run.
///
/// An unpredictable question is not an error; see [`PipelineOutcome`].
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("Feasibility check failed: {0}")]
    Feasibility(InferenceError),

    #[error("Research failed: {0}")]
    Research(#[from] ResearchError),

    #[error("Prediction failed: {0}")]
    Prediction(InferenceError),

    #[error("The model did not produce a usable prediction")]
    NoPrediction,

    #[error("LLM setup failed: {0}")]
    Llm(#[from] LLMError),

    #[error("Embedder setup failed: {0}")]
    Embedding(#[from] EmbeddingError),

    #[error("Web client setup failed: {0}")]
    Network(#[from] NetworkError),
}

/// What a completed run produced.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum PipelineOutcome {
    /// The classifier judged the question unpredictable; nothing else ran.
    Unpredictable { reasoning: String },
    Predicted {
        feasibility: Feasibility,
        report: ResearchReport,
        prediction: Prediction,
    },
}

/// The three-stage pipeline with its components wired up.
pub struct Pipeline {
    classifier: FeasibilityClassifier,
    runner: ResearchRunner,
    predictor: PredictionEngine,
}

impl Pipeline {
    pub fn new(classifier: FeasibilityClassifier, runner: ResearchRunner, predictor: PredictionEngine) -> Self {
        Self {
            classifier,
            runner,
            predictor,
        }
    }

    /// Builds every component from `config`.
    pub fn from_config(config: &Config) -> Result<Self, PipelineError> {
        let context_len = config.research.error_context_length;
        let llm = client_from_config(&config.llm)?;
        let planner_llm = client_from_config(&config.llm.with_temperature(PLANNER_TEMPERATURE))?;
        let predictor_llm = stage_client(config, &llm, &config.prediction)?;
        let embedder = embedder_from_config(&config.embedding)?;
        let web = Arc::new(WebResearchClient::from_config(&config.search)?);

        let classifier =
            FeasibilityClassifier::new(Arc::clone(&llm)).with_error_context_length(context_len);
        let runner = ResearchRunner::new(llm, web, embedder, config.research.clone())
            .with_planner_llm(planner_llm)
            .with_embedding_batch_size(config.embedding.batch_size);
        let predictor =
            PredictionEngine::new(predictor_llm).with_error_context_length(context_len);

        Ok(Self::new(classifier, runner, predictor))
    }

    /// Sends research progress events to `tx`.
    pub fn with_progress(mut self, tx: UnboundedSender<ResearchProgress>) -> Self {
        self.runner = self.runner.with_progress(tx);
        self
    }

    pub fn runner(&self) -> &ResearchRunner {
        &self.runner
    }

    /// Runs evaluate, research and predict in order.
    ///
    /// An unpredictable question short-circuits before any research.
    pub async fn run(&self, question: &Question) -> Result<PipelineOutcome, PipelineError> {
        let run_id = Uuid::new_v4();
        let span = tracing::info_span!("pipeline", run_id = %run_id);

        async move {
            tracing::info!(question = %question, "pipeline started");

            let feasibility = self
                .classifier
                .evaluate(question)
                .await
                .map_err(PipelineError::Feasibility)?;

            if !feasibility.is_predictable {
                tracing::info!(reasoning = %feasibility.reasoning, "question is not predictable");
                return Ok(PipelineOutcome::Unpredictable {
                    reasoning: feasibility.reasoning,
                });
            }

            let report = self.runner.run(question).await?;

            let prediction = self
                .predictor
                .predict(question, &report.body)
                .await
                .map_err(PipelineError::Prediction)?
                .ok_or(PipelineError::NoPrediction)?;

            tracing::info!("pipeline finished");

            Ok(PipelineOutcome::Predicted {
                feasibility,
                report,
                prediction,
            })
        }
        .instrument(span)
        .await
    }
}

/// Builds the grading engine, honouring `[grading]` overrides.
pub fn grader_from_config(config: &Config) -> Result<GradingEngine, PipelineError> {
    let llm = client_from_config(&config.llm.for_stage(&config.grading))?;
    Ok(GradingEngine::new(llm).with_error_context_length(config.research.error_context_length))
}

/// Builds the prediction engine on its own, honouring `[prediction]` overrides.
pub fn predictor_from_config(config: &Config) -> Result<PredictionEngine, PipelineError> {
    let llm = client_from_config(&config.llm.for_stage(&config.prediction))?;
    Ok(PredictionEngine::new(llm).with_error_context_length(config.research.error_context_length))
}

fn stage_client(
    config: &Config,
    shared: &Arc<dyn LLM>,
    stage: &StageConfig,
) -> Result<Arc<dyn LLM>, LLMError> {
    if stage.overrides_llm() {
        client_from_config(&config.llm.for_stage(stage))
    } else {
        Ok(Arc::clone(shared))
    }
}
