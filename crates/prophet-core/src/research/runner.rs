use futures::stream::{self, StreamExt};
use std::collections::HashSet;
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::mpsc::UnboundedSender;

use crate::config::{ResearchConfig, DEFAULT_EMBEDDING_BATCH_SIZE};
use crate::evidence::{Embedder, EmbeddingError, EvidenceStore, ScoredChunk};
use crate::llm::{InferenceError, LLM};
use crate::planning::{PlanningError, QueryPlanner, SubQuery};
use crate::prompts::{build_synthesis_prompt, SYNTHESIS_SYSTEM_PROMPT};
use crate::research::report::{ReportMode, ResearchReport};
use crate::web::{ScrapedDocument, SearchResult, WebResearchClient};
use crate::Question;

/// Progress events emitted while a research run is in flight.
#[derive(Debug, Clone, PartialEq)]
pub enum ResearchProgress {
    Started,
    Planned { queries: Vec<SubQuery> },
    Searched { query: String, results: usize },
    Scraped { documents: usize, failed: usize },
    Indexed { chunks: usize },
    Retrieved { chunks: usize },
    Synthesizing,
    Complete,
}

/// Errors that can occur during research.
#[derive(Debug, Error)]
pub enum ResearchError {
    #[error("Planning failed: {0}")]
    Planning(#[from] PlanningError),

    #[error("Report synthesis failed: {0}")]
    Inference(#[from] InferenceError),

    #[error("Evidence retrieval failed: {0}")]
    Embedding(#[from] EmbeddingError),

    #[error("No documents could be retrieved for any sub-query")]
    NoDocuments,

    #[error("No evidence survived ingestion")]
    NoEvidence,
}

/// Drives planner, web client and evidence store to produce a report.
pub struct ResearchRunner {
    planner: QueryPlanner,
    web: Arc<WebResearchClient>,
    embedder: Arc<dyn Embedder>,
    llm: Arc<dyn LLM>,
    config: ResearchConfig,
    embedding_batch_size: usize,
    progress: Option<UnboundedSender<ResearchProgress>>,
}

impl ResearchRunner {
    /// Creates a new research runner. The planner shares `llm` unless
    /// [`with_planner_llm`](Self::with_planner_llm) gives it its own client.
    pub fn new(
        llm: Arc<dyn LLM>,
        web: Arc<WebResearchClient>,
        embedder: Arc<dyn Embedder>,
        config: ResearchConfig,
    ) -> Self {
        let planner = QueryPlanner::new(Arc::clone(&llm))
            .with_error_context_length(config.error_context_length);
        Self {
            planner,
            web,
            embedder,
            llm,
            config,
            embedding_batch_size: DEFAULT_EMBEDDING_BATCH_SIZE,
            progress: None,
        }
    }

    /// Sends progress events to `tx` during [`run`](Self::run).
    pub fn with_progress(mut self, tx: UnboundedSender<ResearchProgress>) -> Self {
        self.progress = Some(tx);
        self
    }

    pub fn with_embedding_batch_size(mut self, batch_size: usize) -> Self {
        self.embedding_batch_size = batch_size;
        self
    }

    /// Plans with `llm` instead of the synthesis client.
    pub fn with_planner_llm(mut self, llm: Arc<dyn LLM>) -> Self {
        self.planner =
            QueryPlanner::new(llm).with_error_context_length(self.config.error_context_length);
        self
    }

    /// Runs research for the given question.
    pub async fn run(&self, question: &Question) -> Result<ResearchReport, ResearchError> {
        self.emit(ResearchProgress::Started);

        // 1. Plan
        let sub_queries = self
            .planner
            .plan(question, self.config.subqueries_limit)
            .await?;
        self.emit(ResearchProgress::Planned {
            queries: sub_queries.clone(),
        });

        // 2. Search, then scrape every distinct URL
        let results = self.search_all(&sub_queries).await;
        let documents = self.scrape_all(&results).await;

        let failed = documents.iter().filter(|d| d.is_empty()).count();
        let documents: Vec<ScrapedDocument> =
            documents.into_iter().filter(|d| !d.is_empty()).collect();
        self.emit(ResearchProgress::Scraped {
            documents: documents.len(),
            failed,
        });
        tracing::info!(documents = documents.len(), failed, "scraping finished");

        if documents.is_empty() {
            return Err(ResearchError::NoDocuments);
        }

        // 3. Ingest into a store owned by this run
        let mut store = EvidenceStore::new(Arc::clone(&self.embedder))
            .with_batch_size(self.embedding_batch_size)
            .with_concurrency(self.config.concurrency);
        store.add(&documents, &self.config.splitter()).await;
        self.emit(ResearchProgress::Indexed { chunks: store.len() });

        if store.is_empty() {
            return Err(ResearchError::NoEvidence);
        }

        // 4. Retrieve with the question and every sub-query
        let mut queries: Vec<&str> = vec![question.as_str()];
        queries.extend(sub_queries.iter().map(|q| q.as_str()));
        let evidence = store.query_merged(&queries, self.config.top_k).await;
        self.emit(ResearchProgress::Retrieved {
            chunks: evidence.len(),
        });
        tracing::info!(chunks = evidence.len(), top_k = self.config.top_k, "evidence retrieved");

        if evidence.is_empty() {
            return Err(ResearchError::NoEvidence);
        }

        // 5. Report body
        let labelled = format_evidence(&evidence);
        let (body, mode) = if self.config.use_summaries {
            self.emit(ResearchProgress::Synthesizing);
            (self.synthesize(question, &labelled).await?, ReportMode::Synthesized)
        } else {
            (labelled, ReportMode::RawEvidence)
        };

        self.emit(ResearchProgress::Complete);

        Ok(ResearchReport {
            question: question.to_string(),
            body,
            sources: collect_sources(&evidence),
            sub_queries,
            mode,
            evidence_count: evidence.len(),
        })
    }

    async fn search_all(&self, sub_queries: &[SubQuery]) -> Vec<SearchResult> {
        let per_query = self.config.results_per_query;
        let batches: Vec<Vec<SearchResult>> = stream::iter(sub_queries)
            .map(|query| async move {
                let results = self.web.search(query.as_str(), per_query).await;
                self.emit(ResearchProgress::Searched {
                    query: query.to_string(),
                    results: results.len(),
                });
                results
            })
            .buffered(self.config.concurrency.max(1))
            .collect()
            .await;

        batches.into_iter().flatten().collect()
    }

    /// Scrapes each URL once, in first-seen order.
    async fn scrape_all(&self, results: &[SearchResult]) -> Vec<ScrapedDocument> {
        let mut seen = HashSet::new();
        let urls: Vec<&str> = results
            .iter()
            .map(|r| r.url.as_str())
            .filter(|url| seen.insert(*url))
            .collect();

        tracing::debug!(results = results.len(), unique = urls.len(), "scraping urls");

        stream::iter(urls)
            .map(|url| self.web.scrape(url))
            .buffered(self.config.concurrency.max(1))
            .collect()
            .await
    }

    async fn synthesize(&self, question: &Question, evidence: &str) -> Result<String, InferenceError> {
        let prompt = build_synthesis_prompt(question.as_str(), evidence);
        let response = self
            .llm
            .complete_with_system(SYNTHESIS_SYSTEM_PROMPT, &prompt)
            .await?;

        let body = response.trim();
        if body.is_empty() {
            return Err(InferenceError::Schema("synthesized report is empty".to_string()));
        }
        Ok(body.to_string())
    }

    fn emit(&self, event: ResearchProgress) {
        if let Some(tx) = &self.progress {
            let _ = tx.send(event);
        }
    }
}

/// Chunk text labelled with its rank and source URL.
fn format_evidence(evidence: &[ScoredChunk]) -> String {
    evidence
        .iter()
        .enumerate()
        .map(|(i, hit)| {
            format!(
                "[{}] (source: {})\n{}",
                i + 1,
                hit.chunk.source_url(),
                hit.chunk.text()
            )
        })
        .collect::<Vec<_>>()
        .join("\n\n")
}

fn collect_sources(evidence: &[ScoredChunk]) -> Vec<String> {
    let mut seen = HashSet::new();
    evidence
        .iter()
        .map(|hit| hit.chunk.source_url())
        .filter(|url| seen.insert(*url))
        .map(str::to_string)
        .collect()
}
