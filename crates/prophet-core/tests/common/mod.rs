//! Scripted stand-ins for the model, search, fetch and embedding services.

#![allow(dead_code)]

use async_trait::async_trait;
use std::collections::hash_map::DefaultHasher;
use std::collections::HashMap;
use std::hash::{Hash, Hasher};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;

use prophet_core::evidence::{Embedder, EmbeddingError};
use prophet_core::web::{PageFetcher, SearchProvider};
use prophet_core::{LLMError, NetworkError, SearchResult, WebResearchClient, LLM};

type Responder = Arc<dyn Fn(&str) -> Result<String, LLMError> + Send + Sync>;

/// An LLM that answers by system prompt.
#[derive(Default)]
pub struct ScriptedLLM {
    responders: HashMap<&'static str, Responder>,
    calls: Mutex<Vec<(String, String)>>,
}

impl ScriptedLLM {
    pub fn new() -> Self {
        Self::default()
    }

    /// Always answer `response` to calls made with `system`.
    pub fn respond(self, system: &'static str, response: impl Into<String>) -> Self {
        let response = response.into();
        self.respond_with(system, move |_| Ok(response.clone()))
    }

    /// Answer calls made with `system` by running `f` on the user prompt.
    pub fn respond_with(
        mut self,
        system: &'static str,
        f: impl Fn(&str) -> Result<String, LLMError> + Send + Sync + 'static,
    ) -> Self {
        self.responders.insert(system, Arc::new(f));
        self
    }

    /// Fail every call made with `system`.
    pub fn fail(self, system: &'static str) -> Self {
        self.respond_with(system, |_| {
            Err(LLMError::ApiError {
                status: 500,
                message: "scripted failure".to_string(),
            })
        })
    }

    pub fn calls_to(&self, system: &str) -> usize {
        self.prompts_to(system).len()
    }

    pub fn prompts_to(&self, system: &str) -> Vec<String> {
        self.calls
            .lock()
            .unwrap()
            .iter()
            .filter(|(s, _)| s == system)
            .map(|(_, p)| p.clone())
            .collect()
    }

    pub fn total_calls(&self) -> usize {
        self.calls.lock().unwrap().len()
    }
}

#[async_trait]
impl LLM for ScriptedLLM {
    async fn complete_with_system(&self, system: &str, prompt: &str) -> Result<String, LLMError> {
        self.calls
            .lock()
            .unwrap()
            .push((system.to_string(), prompt.to_string()));

        match self.responders.get(system) {
            Some(responder) => responder(prompt),
            None => Err(LLMError::ApiError {
                status: 404,
                message: "no scripted response".to_string(),
            }),
        }
    }

    fn model(&self) -> &str {
        "scripted"
    }
}

/// Search results keyed by exact query text; unknown queries return nothing.
#[derive(Default)]
pub struct FakeSearch {
    results: HashMap<String, Vec<SearchResult>>,
    delay: Option<Duration>,
    calls: AtomicUsize,
}

impl FakeSearch {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, query: &str, urls: &[&str]) -> Self {
        let results = urls
            .iter()
            .map(|url| SearchResult {
                url: url.to_string(),
                title: format!("Title for {}", url),
                snippet: String::new(),
            })
            .collect();
        self.results.insert(query.to_string(), results);
        self
    }

    /// Sleep before answering.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl SearchProvider for FakeSearch {
    async fn search(&self, query: &str, max_results: usize) -> Result<Vec<SearchResult>, NetworkError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        Ok(self
            .results
            .get(query)
            .map(|r| r.iter().take(max_results).cloned().collect())
            .unwrap_or_default())
    }

    fn name(&self) -> &str {
        "fake"
    }
}

/// Pages keyed by URL; unknown URLs are a 404.
#[derive(Default)]
pub struct FakeFetcher {
    pages: HashMap<String, String>,
    /// URLs that fail with a transient error this many times before succeeding.
    flaky: Mutex<HashMap<String, usize>>,
    fetched: Mutex<Vec<String>>,
}

impl FakeFetcher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn page(mut self, url: &str, text: &str) -> Self {
        self.pages.insert(url.to_string(), text.to_string());
        self
    }

    pub fn flaky(self, url: &str, failures: usize) -> Self {
        self.flaky.lock().unwrap().insert(url.to_string(), failures);
        self
    }

    pub fn fetched(&self) -> Vec<String> {
        self.fetched.lock().unwrap().clone()
    }
}

#[async_trait]
impl PageFetcher for FakeFetcher {
    async fn fetch(&self, url: &str) -> Result<String, NetworkError> {
        self.fetched.lock().unwrap().push(url.to_string());

        if let Some(remaining) = self.flaky.lock().unwrap().get_mut(url) {
            if *remaining > 0 {
                *remaining -= 1;
                return Err(NetworkError::Status {
                    url: url.to_string(),
                    status: 503,
                });
            }
        }

        self.pages.get(url).cloned().ok_or_else(|| NetworkError::Status {
            url: url.to_string(),
            status: 404,
        })
    }
}

pub const EMBEDDING_DIM: usize = 64;

/// Text containing this marker fails to embed.
pub const POISON: &str = "POISON";

/// Bag-of-words embedding: each lowercase word adds one to a hashed bucket.
#[derive(Default)]
pub struct HashEmbedder {
    calls: AtomicUsize,
}

impl HashEmbedder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn vector(text: &str) -> Vec<f32> {
        let mut v = vec![0.0; EMBEDDING_DIM];
        for word in text
            .split(|c: char| !c.is_alphanumeric())
            .filter(|w| !w.is_empty())
        {
            let mut hasher = DefaultHasher::new();
            word.to_lowercase().hash(&mut hasher);
            v[(hasher.finish() as usize) % EMBEDDING_DIM] += 1.0;
        }
        v
    }
}

#[async_trait]
impl Embedder for HashEmbedder {
    async fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, EmbeddingError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if texts.iter().any(|t| t.contains(POISON)) {
            return Err(EmbeddingError::Failed("poisoned input".to_string()));
        }
        Ok(texts.iter().map(|t| Self::vector(t)).collect())
    }

    fn model_name(&self) -> &str {
        "hash-bow"
    }
}

/// A web client over fakes, with short timeouts and no retry backoff.
pub fn web_client(search: Arc<FakeSearch>, fetcher: Arc<FakeFetcher>) -> WebResearchClient {
    WebResearchClient::new(search, fetcher)
        .with_timeout(Duration::from_millis(200))
        .with_retry_backoff(Duration::ZERO)
}

/// Planner JSON for `queries`.
pub fn planner_json(queries: &[&str]) -> String {
    serde_json::json!({ "queries": queries }).to_string()
}

/// A chat completions endpoint on localhost that answers every request with
/// `content` and records the JSON request bodies.
pub struct ChatServer {
    pub base_url: String,
    requests: Arc<Mutex<Vec<serde_json::Value>>>,
}

impl ChatServer {
    pub async fn start(content: &str) -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let base_url = format!("http://{}/v1", listener.local_addr().unwrap());
        let requests = Arc::new(Mutex::new(Vec::new()));
        let reply = serde_json::json!({
            "choices": [{ "message": { "role": "assistant", "content": content } }]
        })
        .to_string();

        let sink = Arc::clone(&requests);
        tokio::spawn(async move {
            while let Ok((mut socket, _)) = listener.accept().await {
                let sink = Arc::clone(&sink);
                let reply = reply.clone();
                tokio::spawn(async move {
                    if let Some(body) = read_body(&mut socket).await {
                        if let Ok(json) = serde_json::from_slice(&body) {
                            sink.lock().unwrap().push(json);
                        }
                    }
                    let response = format!(
                        "HTTP/1.1 200 OK\r\ncontent-type: application/json\r\ncontent-length: {}\r\nconnection: close\r\n\r\n{}",
                        reply.len(),
                        reply
                    );
                    let _ = socket.write_all(response.as_bytes()).await;
                });
            }
        });

        Self { base_url, requests }
    }

    pub fn requests(&self) -> Vec<serde_json::Value> {
        self.requests.lock().unwrap().clone()
    }

    /// Request bodies whose system message is `system`.
    pub fn requests_with_system(&self, system: &str) -> Vec<serde_json::Value> {
        self.requests()
            .into_iter()
            .filter(|r| r["messages"][0]["content"] == system)
            .collect()
    }
}

async fn read_body(socket: &mut tokio::net::TcpStream) -> Option<Vec<u8>> {
    let mut buf = Vec::new();
    let mut chunk = [0u8; 4096];
    loop {
        let n = socket.read(&mut chunk).await.ok()?;
        if n == 0 {
            return None;
        }
        buf.extend_from_slice(&chunk[..n]);

        if let Some(end) = buf.windows(4).position(|w| w == b"\r\n\r\n") {
            let headers = String::from_utf8_lossy(&buf[..end]).to_ascii_lowercase();
            let length = headers
                .lines()
                .find_map(|line| line.strip_prefix("content-length:"))
                .and_then(|v| v.trim().parse::<usize>().ok())
                .unwrap_or(0);
            let start = end + 4;
            if buf.len() >= start + length {
                return Some(buf[start..start + length].to_vec());
            }
        }
    }
}
