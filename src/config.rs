use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};

#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    #[serde(default)]
    pub index: IndexConfig,
    pub embedding: EmbeddingConfig,
    pub chat: ChatConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct IndexConfig {
    #[serde(default = "default_persist_dir")]
    pub persist_dir: PathBuf,
    #[serde(default = "default_include_globs")]
    pub include_globs: Vec<String>,
    #[serde(default = "default_exclude_globs")]
    pub exclude_globs: Vec<String>,
    #[serde(default = "default_chunk_size")]
    pub chunk_size: usize,
    #[serde(default = "default_chunk_overlap")]
    pub chunk_overlap: usize,
    #[serde(default = "default_top_k")]
    pub top_k: usize,
}

impl Default for IndexConfig {
    fn default() -> Self {
        Self {
            persist_dir: default_persist_dir(),
            include_globs: default_include_globs(),
            exclude_globs: default_exclude_globs(),
            chunk_size: default_chunk_size(),
            chunk_overlap: default_chunk_overlap(),
            top_k: default_top_k(),
        }
    }
}

fn default_persist_dir() -> PathBuf {
    PathBuf::from("./vector_store")
}
fn default_include_globs() -> Vec<String> {
    vec![
        "**/*.py".to_string(),
        "**/*.js".to_string(),
        "**/*.ts".to_string(),
        "**/*.tsx".to_string(),
        "**/*.jsx".to_string(),
        "**/*.rs".to_string(),
    ]
}
fn default_exclude_globs() -> Vec<String> {
    vec![
        "**/__pycache__/**".to_string(),
        "**/node_modules/**".to_string(),
        "**/.git/**".to_string(),
        "**/target/**".to_string(),
    ]
}
fn default_chunk_size() -> usize {
    1000
}
fn default_chunk_overlap() -> usize {
    200
}
fn default_top_k() -> usize {
    6
}

#[derive(Debug, Deserialize, Clone)]
pub struct EmbeddingConfig {
    pub provider: String,
    pub model: String,
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

fn default_batch_size() -> usize {
    64
}
fn default_max_retries() -> u32 {
    5
}
fn default_timeout_secs() -> u64 {
    30
}

#[derive(Debug, Deserialize, Clone)]
pub struct ChatConfig {
    pub provider: String,
    pub model: String,
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default = "default_temperature")]
    pub temperature: f64,
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,
    #[serde(default = "default_chat_timeout_secs")]
    pub timeout_secs: u64,
}

fn default_temperature() -> f64 {
    0.0
}
fn default_chat_timeout_secs() -> u64 {
    60
}

pub fn load_config(path: &Path) -> Result<Config> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;

    let config: Config = toml::from_str(&content).with_context(|| "Failed to parse config file")?;

    validate(&config)?;

    Ok(config)
}

pub fn validate(config: &Config) -> Result<()> {
    if config.index.chunk_size == 0 {
        anyhow::bail!("index.chunk_size must be > 0");
    }

    if config.index.chunk_overlap >= config.index.chunk_size {
        anyhow::bail!(
            "index.chunk_overlap ({}) must be smaller than index.chunk_size ({})",
            config.index.chunk_overlap,
            config.index.chunk_size
        );
    }

    if config.index.top_k < 1 {
        anyhow::bail!("index.top_k must be >= 1");
    }

    if config.index.include_globs.is_empty() {
        anyhow::bail!("index.include_globs must not be empty");
    }

    match config.embedding.provider.as_str() {
        "openai" | "ollama" => {}
        other => anyhow::bail!(
            "Unknown embedding provider: '{}'. Must be openai or ollama.",
            other
        ),
    }

    match config.chat.provider.as_str() {
        "openai" | "ollama" => {}
        other => anyhow::bail!("Unknown chat provider: '{}'. Must be openai or ollama.", other),
    }

    if !(0.0..=2.0).contains(&config.chat.temperature) {
        anyhow::bail!("chat.temperature must be in [0.0, 2.0]");
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn base_config() -> Config {
        Config {
            index: IndexConfig::default(),
            embedding: EmbeddingConfig {
                provider: "openai".to_string(),
                model: "text-embedding-3-large".to_string(),
                url: None,
                batch_size: default_batch_size(),
                max_retries: default_max_retries(),
                timeout_secs: default_timeout_secs(),
            },
            chat: ChatConfig {
                provider: "openai".to_string(),
                model: "gpt-4o-mini".to_string(),
                url: None,
                temperature: 0.0,
                max_retries: default_max_retries(),
                timeout_secs: default_chat_timeout_secs(),
            },
        }
    }

    #[test]
    fn test_defaults_valid() {
        assert!(validate(&base_config()).is_ok());
    }

    #[test]
    fn test_overlap_must_be_smaller_than_chunk_size() {
        let mut config = base_config();
        config.index.chunk_size = 100;
        config.index.chunk_overlap = 100;
        assert!(validate(&config).is_err());

        config.index.chunk_overlap = 99;
        assert!(validate(&config).is_ok());
    }

    #[test]
    fn test_unknown_provider_rejected() {
        let mut config = base_config();
        config.embedding.provider = "magic".to_string();
        assert!(validate(&config).is_err());
    }

    #[test]
    fn test_top_k_lower_bound() {
        let mut config = base_config();
        config.index.top_k = 0;
        assert!(validate(&config).is_err());
    }

    #[test]
    fn test_parse_minimal_toml() {
        let toml_str = r#"
            [embedding]
            provider = "ollama"
            model = "nomic-embed-text"

            [chat]
            provider = "ollama"
            model = "llama3.1"
        "#;
        let config: Config = toml::from_str(toml_str).unwrap();
        assert_eq!(config.index.chunk_size, 1000);
        assert_eq!(config.index.chunk_overlap, 200);
        assert_eq!(config.index.top_k, 6);
        assert!(validate(&config).is_ok());
    }
}
