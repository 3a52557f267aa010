use std::io::Write;

use prophet_core::config::{
    LLMConfig, DEFAULT_ANTHROPIC_MODEL, DEFAULT_CHUNK_OVERLAP, DEFAULT_CHUNK_SIZE,
    DEFAULT_EXCLUDED_DOMAINS, DEFAULT_LLM_PROVIDER, DEFAULT_OLLAMA_MODEL, DEFAULT_OPENAI_MODEL,
    DEFAULT_SUBQUERIES_LIMIT,
};
use prophet_core::{Config, ConfigError};

#[test]
fn test_default_config() {
    let config = Config::default();
    assert_eq!(config.llm.provider, DEFAULT_LLM_PROVIDER);
    assert_eq!(config.research.subqueries_limit, DEFAULT_SUBQUERIES_LIMIT);
    assert_eq!(config.research.chunk_size, DEFAULT_CHUNK_SIZE);
    assert_eq!(config.research.chunk_overlap, DEFAULT_CHUNK_OVERLAP);
    assert!(config.research.use_summaries);
    assert_eq!(config.search.excluded_domains.len(), DEFAULT_EXCLUDED_DOMAINS.len());
}

#[test]
fn test_config_to_toml() {
    let config = Config::default();
    let toml_str = toml::to_string_pretty(&config).unwrap();
    assert!(toml_str.contains("[llm]"));
    assert!(toml_str.contains("[embedding]"));
    assert!(toml_str.contains("[search]"));
    assert!(toml_str.contains("[research]"));
}

#[test]
fn test_config_from_toml() {
    let toml_str = r#"
[llm]
provider = "ollama"
model = "llama3"

[research]
subqueries_limit = 4
top_k = 10
use_summaries = false

[prediction]
model = "gpt-4-turbo"
"#;
    let config: Config = toml::from_str(toml_str).unwrap();
    assert_eq!(config.llm.provider, "ollama");
    assert_eq!(config.llm.model, Some("llama3".to_string()));
    assert_eq!(config.research.subqueries_limit, 4);
    assert_eq!(config.research.top_k, 10);
    assert!(!config.research.use_summaries);
    assert_eq!(config.prediction.model.as_deref(), Some("gpt-4-turbo"));
    // Unset fields keep their defaults
    assert_eq!(config.research.chunk_size, DEFAULT_CHUNK_SIZE);
}

#[test]
fn test_model_or_default() {
    let mut config = LLMConfig {
        provider: "anthropic".to_string(),
        ..Default::default()
    };
    assert_eq!(config.model_or_default(), DEFAULT_ANTHROPIC_MODEL);

    config.provider = "ollama".to_string();
    assert_eq!(config.model_or_default(), DEFAULT_OLLAMA_MODEL);

    config.provider = "openai".to_string();
    assert_eq!(config.model_or_default(), DEFAULT_OPENAI_MODEL);

    config.model = Some("custom-model".to_string());
    assert_eq!(config.model_or_default(), "custom-model");
}

#[test]
fn test_from_file() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    writeln!(
        file,
        r#"
[research]
subqueries_limit = 2
results_per_query = 3

[search]
excluded_domains = ["example.com"]
"#
    )
    .unwrap();

    let config = Config::from_file(file.path()).unwrap();
    assert_eq!(config.research.subqueries_limit, 2);
    assert_eq!(config.research.results_per_query, 3);
    assert_eq!(config.search.excluded_domains, vec!["example.com".to_string()]);
}

#[test]
fn test_from_file_invalid_values() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    writeln!(file, "[research]\ntop_k = 0").unwrap();

    let result = Config::from_file(file.path());
    assert!(matches!(result, Err(ConfigError::Invalid(_))));
}

#[test]
fn test_from_file_malformed_toml() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    writeln!(file, "[research\nsubqueries_limit = ").unwrap();

    let result = Config::from_file(file.path());
    assert!(matches!(result, Err(ConfigError::ParseError(_))));
}

#[test]
fn test_from_file_missing() {
    let result = Config::from_file("/definitely/not/here/prophet.toml");
    assert!(matches!(result, Err(ConfigError::ReadError(_))));
}
