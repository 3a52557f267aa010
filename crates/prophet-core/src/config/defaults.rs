//! Default values for Prophet configuration.
//!
//! All hardcoded defaults are centralized here for easy maintenance.

// ============================================================================
// LLM Defaults
// ============================================================================

/// Default LLM provider.
pub const DEFAULT_LLM_PROVIDER: &str = "openai";

/// Default max tokens for LLM responses.
pub const DEFAULT_MAX_TOKENS: u32 = 4096;

/// Default sampling temperature. Zero keeps planning and prediction reproducible.
pub const DEFAULT_TEMPERATURE: f32 = 0.0;

/// Sampling temperature for query planning, regardless of `llm.temperature`.
pub const PLANNER_TEMPERATURE: f32 = 0.0;

/// Default timeout for a single LLM request (seconds).
pub const DEFAULT_LLM_TIMEOUT_SECS: u64 = 120;

// OpenAI defaults
/// Default OpenAI API URL.
pub const DEFAULT_OPENAI_URL: &str = "https://api.openai.com/v1";
/// Default OpenAI model.
pub const DEFAULT_OPENAI_MODEL: &str = "gpt-4o";

// Anthropic defaults
/// Default Anthropic API URL.
pub const DEFAULT_ANTHROPIC_URL: &str = "https://api.anthropic.com/v1/messages";
/// Default Anthropic model.
pub const DEFAULT_ANTHROPIC_MODEL: &str = "claude-sonnet-4-20250514";
/// Default Anthropic API version.
pub const DEFAULT_ANTHROPIC_API_VERSION: &str = "2023-06-01";

// Ollama defaults
/// Default Ollama API URL.
pub const DEFAULT_OLLAMA_URL: &str = "http://localhost:11434/v1";
/// Default Ollama model.
pub const DEFAULT_OLLAMA_MODEL: &str = "llama3";

// OpenRouter defaults
/// Default OpenRouter API URL.
pub const DEFAULT_OPENROUTER_URL: &str = "https://openrouter.ai/api/v1";

// ============================================================================
// Embedding Defaults
// ============================================================================

/// Default embedding provider ("fastembed" runs locally, "openai" calls an API).
pub const DEFAULT_EMBEDDING_PROVIDER: &str = "fastembed";

/// Default OpenAI embedding model.
pub const DEFAULT_OPENAI_EMBEDDING_MODEL: &str = "text-embedding-3-small";

/// Number of chunks sent per embedding request.
pub const DEFAULT_EMBEDDING_BATCH_SIZE: usize = 32;

/// Timeout for a single embedding request (seconds).
pub const DEFAULT_EMBEDDING_TIMEOUT_SECS: u64 = 60;

// ============================================================================
// Search Defaults
// ============================================================================

/// Default search provider.
pub const DEFAULT_SEARCH_PROVIDER: &str = "tavily";

/// Default Tavily API URL.
pub const DEFAULT_TAVILY_URL: &str = "https://api.tavily.com";

/// Default Tavily search depth ("basic" or "advanced").
pub const DEFAULT_SEARCH_DEPTH: &str = "advanced";

/// Timeout for one search or scrape call (seconds).
pub const DEFAULT_WEB_TIMEOUT_SECS: u64 = 20;

/// Pause before the single retry of a transient network failure (milliseconds).
pub const DEFAULT_RETRY_BACKOFF_MS: u64 = 500;

/// Maximum number of characters kept from one scraped page.
pub const DEFAULT_MAX_PAGE_CHARS: usize = 20_000;

/// User agent sent when fetching pages.
pub const DEFAULT_USER_AGENT: &str = "Mozilla/5.0 (compatible; Prophet/0.1; research agent)";

/// Domains whose results are never scraped (video pages carry no readable text).
pub const DEFAULT_EXCLUDED_DOMAINS: &[&str] = &["youtube.com", "youtu.be"];

// ============================================================================
// Research Defaults
// ============================================================================

/// Maximum number of sub-queries planned per question.
pub const DEFAULT_SUBQUERIES_LIMIT: usize = 6;

/// Search results kept (and scraped) per sub-query.
pub const DEFAULT_RESULTS_PER_QUERY: usize = 5;

/// Number of evidence chunks retrieved for the report.
pub const DEFAULT_TOP_K: usize = 15;

/// Target chunk size in characters.
pub const DEFAULT_CHUNK_SIZE: usize = 500;

/// Overlap between neighbouring chunks in characters.
pub const DEFAULT_CHUNK_OVERLAP: usize = 100;

/// Separators tried in order when splitting page text.
pub const DEFAULT_SEPARATORS: &[&str] = &["\n\n", "\n", ". ", " "];

/// Concurrent search, scrape and embedding calls.
pub const DEFAULT_CONCURRENCY: usize = 8;

/// Whether the report is synthesized by the model or built from raw chunks.
pub const DEFAULT_USE_SUMMARIES: bool = true;

/// Default error context length in error messages.
pub const DEFAULT_ERROR_CONTEXT_LENGTH: usize = 500;

// ============================================================================
// Grading Defaults
// ============================================================================

/// Upper bound of a rubric score.
pub const GRADE_SCALE_MAX: f64 = 10.0;
