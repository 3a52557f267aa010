mod common;

use std::sync::Arc;

use common::{planner_json, web_client, FakeFetcher, FakeSearch, HashEmbedder, ScriptedLLM};
use prophet_core::config::ResearchConfig;
use prophet_core::prompts::{PLANNER_SYSTEM_PROMPT, SYNTHESIS_SYSTEM_PROMPT};
use prophet_core::{
    Question, ReportMode, ResearchError, ResearchProgress, ResearchRunner,
};

const QUERIES: [&str; 3] = ["bridge opening date", "bridge construction delays", "city council bridge vote"];

fn question() -> Question {
    Question::new("Will the new city bridge open before July 2025?").unwrap()
}

fn config(use_summaries: bool) -> ResearchConfig {
    ResearchConfig {
        subqueries_limit: 3,
        results_per_query: 2,
        top_k: 5,
        chunk_size: 200,
        chunk_overlap: 20,
        concurrency: 2,
        use_summaries,
        ..ResearchConfig::default()
    }
}

fn search() -> FakeSearch {
    FakeSearch::new()
        .with(QUERIES[0], &["https://news.example/a1", "https://news.example/a2"])
        .with(QUERIES[1], &["https://news.example/b1", "https://news.example/b2"])
        .with(QUERIES[2], &["https://news.example/c1", "https://news.example/c2"])
}

fn fetcher() -> FakeFetcher {
    FakeFetcher::new()
        .page("https://news.example/a1", "The bridge is scheduled to open in May 2025 according to the transport office.")
        .page("https://news.example/a2", "Officials confirmed the opening ceremony date for the bridge.")
        .page("https://news.example/b1", "Construction delays were reported in the autumn due to steel shortages.")
        .page("https://news.example/b2", "The contractor says the delays have been recovered.")
        .page("https://news.example/c1", "The city council voted to fund the final phase of the bridge.")
        .page("https://news.example/c2", "Council members expect the bridge to carry traffic by early summer.")
}

fn llm() -> ScriptedLLM {
    ScriptedLLM::new()
        .respond(PLANNER_SYSTEM_PROMPT, planner_json(&QUERIES))
        .respond(
            SYNTHESIS_SYSTEM_PROMPT,
            "The bridge is on track to open in May 2025 (source: https://news.example/a1).",
        )
}

fn runner(
    llm: Arc<ScriptedLLM>,
    search: Arc<FakeSearch>,
    fetcher: Arc<FakeFetcher>,
    use_summaries: bool,
) -> ResearchRunner {
    ResearchRunner::new(
        llm,
        Arc::new(web_client(search, fetcher)),
        Arc::new(HashEmbedder::new()),
        config(use_summaries),
    )
}

#[tokio::test]
async fn test_synthesized_report() {
    let llm = Arc::new(llm());
    let fetcher = Arc::new(fetcher());
    let runner = runner(llm.clone(), Arc::new(search()), fetcher.clone(), true);

    let report = runner.run(&question()).await.unwrap();

    assert_eq!(report.mode, ReportMode::Synthesized);
    assert!(report.body.contains("May 2025"));
    assert!(!report.sources.is_empty());
    assert!(report.sources.iter().all(|s| s.starts_with("https://news.example/")));
    assert_eq!(report.sub_queries.len(), 3);
    assert!(report.evidence_count <= 5);
    assert_eq!(fetcher.fetched().len(), 6);
    assert_eq!(llm.calls_to(SYNTHESIS_SYSTEM_PROMPT), 1);

    let synthesis_prompt = &llm.prompts_to(SYNTHESIS_SYSTEM_PROMPT)[0];
    assert!(synthesis_prompt.contains("(source: https://news.example/"));
}

#[tokio::test]
async fn test_raw_evidence_makes_no_synthesis_call() {
    let llm = Arc::new(llm());
    let runner = runner(llm.clone(), Arc::new(search()), Arc::new(fetcher()), false);

    let report = runner.run(&question()).await.unwrap();

    assert_eq!(report.mode, ReportMode::RawEvidence);
    assert!(report.body.contains("(source: https://news.example/"));
    assert_eq!(llm.calls_to(SYNTHESIS_SYSTEM_PROMPT), 0);
}

#[tokio::test]
async fn test_shared_urls_scraped_once() {
    let search = FakeSearch::new()
        .with(QUERIES[0], &["https://news.example/a1", "https://news.example/b1"])
        .with(QUERIES[1], &["https://news.example/b1", "https://news.example/a1"])
        .with(QUERIES[2], &["https://news.example/c1"]);
    let fetcher = Arc::new(fetcher());
    let runner = runner(Arc::new(llm()), Arc::new(search), fetcher.clone(), false);

    runner.run(&question()).await.unwrap();

    let mut fetched = fetcher.fetched();
    fetched.sort();
    assert_eq!(
        fetched,
        vec![
            "https://news.example/a1",
            "https://news.example/b1",
            "https://news.example/c1"
        ]
    );
}

#[tokio::test]
async fn test_no_search_results_is_error() {
    let llm = Arc::new(llm());
    let runner = runner(llm.clone(), Arc::new(FakeSearch::new()), Arc::new(fetcher()), true);

    let result = runner.run(&question()).await;
    assert!(matches!(result, Err(ResearchError::NoDocuments)));
    assert_eq!(llm.calls_to(SYNTHESIS_SYSTEM_PROMPT), 0);
}

#[tokio::test]
async fn test_all_scrapes_failing_is_error() {
    let runner = runner(Arc::new(llm()), Arc::new(search()), Arc::new(FakeFetcher::new()), true);
    let result = runner.run(&question()).await;
    assert!(matches!(result, Err(ResearchError::NoDocuments)));
}

#[tokio::test]
async fn test_partial_scrapes_degrade_gracefully() {
    let fetcher = FakeFetcher::new().page(
        "https://news.example/c1",
        "The city council voted to fund the final phase of the bridge.",
    );
    let runner = runner(Arc::new(llm()), Arc::new(search()), Arc::new(fetcher), false);

    let report = runner.run(&question()).await.unwrap();
    assert_eq!(report.sources, vec!["https://news.example/c1".to_string()]);
}

#[tokio::test]
async fn test_planning_failure_propagates() {
    let llm = Arc::new(ScriptedLLM::new().respond(PLANNER_SYSTEM_PROMPT, "not json"));
    let search = Arc::new(search());
    let runner = runner(llm, search.clone(), Arc::new(fetcher()), true);

    let result = runner.run(&question()).await;
    assert!(matches!(result, Err(ResearchError::Planning(_))));
    assert_eq!(search.calls(), 0);
}

#[tokio::test]
async fn test_synthesis_failure_propagates() {
    let llm = Arc::new(
        ScriptedLLM::new()
            .respond(PLANNER_SYSTEM_PROMPT, planner_json(&QUERIES))
            .fail(SYNTHESIS_SYSTEM_PROMPT),
    );
    let runner = runner(llm, Arc::new(search()), Arc::new(fetcher()), true);

    let result = runner.run(&question()).await;
    assert!(matches!(result, Err(ResearchError::Inference(_))));
}

#[tokio::test]
async fn test_progress_events() {
    let (tx, mut rx) = tokio::sync::mpsc::unbounded_channel();
    let runner = runner(Arc::new(llm()), Arc::new(search()), Arc::new(fetcher()), true)
        .with_progress(tx);

    runner.run(&question()).await.unwrap();
    drop(runner);

    let mut events = Vec::new();
    while let Some(event) = rx.recv().await {
        events.push(event);
    }

    assert_eq!(events.first(), Some(&ResearchProgress::Started));
    assert_eq!(events.last(), Some(&ResearchProgress::Complete));
    assert_eq!(
        events
            .iter()
            .filter(|e| matches!(e, ResearchProgress::Searched { .. }))
            .count(),
        3
    );
    assert!(events.contains(&ResearchProgress::Synthesizing));
}
