//! TOML-based configuration for docchat
//!
//! Providers, vector store, chunking and chain settings are read from a TOML
//! file (`docchat.toml`). Every field has a default, so an empty file (or no
//! file at all) yields a working local setup: Ollama for generation and
//! embeddings, and an in-memory store snapshotted under `./data`.
//!
//! Secrets never live in the file. Provider sections name the environment
//! variable holding the key (`api_key_env`), which is read when the provider
//! is built.

use crate::chain::prompt::{self, PromptTemplate};
use crate::chain::{ANSWER_PLACEHOLDERS, REWRITE_PLACEHOLDERS};
use crate::db::VectorStoreProvider;
use crate::llm::Provider;
use crate::rag::chunker::{TextChunker, DEFAULT_CHUNK_OVERLAP, DEFAULT_CHUNK_SIZE};
use crate::rag::embeddings::EmbeddingProvider;
use crate::rag::indexer::DEFAULT_EMBED_BATCH_SIZE;
use crate::rag::retriever::DEFAULT_TOP_K;
use crate::types::AppError;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Root configuration structure loaded from docchat.toml
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DocChatConfig {
    #[serde(default)]
    pub logging: LoggingConfig,

    #[serde(default)]
    pub rag: RagConfig,

    /// Provider used to embed chunks and queries
    #[serde(default = "default_embedding_provider")]
    pub embedding: ProviderConfig,

    /// Provider used for the rewrite and answer prompts
    #[serde(default = "default_generation_provider")]
    pub generation: ProviderConfig,

    #[serde(default)]
    pub vector_store: VectorStoreConfig,

    #[serde(default)]
    pub chain: ChainConfig,
}

impl Default for DocChatConfig {
    fn default() -> Self {
        Self {
            logging: LoggingConfig::default(),
            rag: RagConfig::default(),
            embedding: default_embedding_provider(),
            generation: default_generation_provider(),
            vector_store: VectorStoreConfig::default(),
            chain: ChainConfig::default(),
        }
    }
}

// ============= Logging Configuration =============

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Default filter directive; `RUST_LOG` takes precedence
    #[serde(default = "default_log_level")]
    pub level: String,

    #[serde(default)]
    pub format: LogFormat,
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: LogFormat::default(),
        }
    }
}

// ============= RAG Configuration =============

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RagConfig {
    #[serde(default = "default_chunk_size")]
    pub chunk_size: usize,

    #[serde(default = "default_chunk_overlap")]
    pub chunk_overlap: usize,

    /// Chunks retrieved per question
    #[serde(default = "default_top_k")]
    pub top_k: usize,

    /// Chunks per embedding request during indexing
    #[serde(default = "default_embed_batch_size")]
    pub embed_batch_size: usize,
}

fn default_chunk_size() -> usize {
    DEFAULT_CHUNK_SIZE
}

fn default_chunk_overlap() -> usize {
    DEFAULT_CHUNK_OVERLAP
}

fn default_top_k() -> usize {
    DEFAULT_TOP_K
}

fn default_embed_batch_size() -> usize {
    DEFAULT_EMBED_BATCH_SIZE
}

impl Default for RagConfig {
    fn default() -> Self {
        Self {
            chunk_size: default_chunk_size(),
            chunk_overlap: default_chunk_overlap(),
            top_k: default_top_k(),
            embed_batch_size: default_embed_batch_size(),
        }
    }
}

impl RagConfig {
    pub fn chunker(&self) -> Result<TextChunker, ConfigError> {
        TextChunker::new(self.chunk_size, self.chunk_overlap)
            .map_err(|e| ConfigError::ValidationError(e.to_string()))
    }
}

// ============= Provider Configuration =============

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum ProviderConfig {
    Ollama {
        #[serde(default = "default_ollama_url")]
        base_url: String,
        model: String,
    },
    OpenAI {
        /// Environment variable containing API key
        #[serde(default = "default_openai_key_env")]
        api_key_env: String,
        #[serde(default = "default_openai_base")]
        api_base: String,
        model: String,
    },
}

fn default_ollama_url() -> String {
    "http://localhost:11434".to_string()
}

fn default_openai_key_env() -> String {
    "OPENAI_API_KEY".to_string()
}

fn default_openai_base() -> String {
    "https://api.openai.com/v1".to_string()
}

fn default_embedding_provider() -> ProviderConfig {
    ProviderConfig::Ollama {
        base_url: default_ollama_url(),
        model: "nomic-embed-text".to_string(),
    }
}

fn default_generation_provider() -> ProviderConfig {
    ProviderConfig::Ollama {
        base_url: default_ollama_url(),
        model: "llama3.2".to_string(),
    }
}

impl ProviderConfig {
    pub fn kind(&self) -> &'static str {
        match self {
            ProviderConfig::Ollama { .. } => "ollama",
            ProviderConfig::OpenAI { .. } => "openai",
        }
    }

    pub fn model(&self) -> &str {
        match self {
            ProviderConfig::Ollama { model, .. } | ProviderConfig::OpenAI { model, .. } => model,
        }
    }

    /// Build the generation provider, reading secrets from the environment.
    pub fn generation_provider(&self) -> Result<Provider, ConfigError> {
        Ok(match self {
            ProviderConfig::Ollama { base_url, model } => Provider::Ollama {
                base_url: base_url.clone(),
                model: model.clone(),
            },
            ProviderConfig::OpenAI {
                api_key_env,
                api_base,
                model,
            } => Provider::OpenAI {
                api_key: resolve_env(api_key_env)?,
                api_base: api_base.clone(),
                model: model.clone(),
            },
        })
    }

    /// Build the embedding provider, reading secrets from the environment.
    pub fn embedding_provider(&self) -> Result<EmbeddingProvider, ConfigError> {
        Ok(match self {
            ProviderConfig::Ollama { base_url, model } => EmbeddingProvider::Ollama {
                base_url: base_url.clone(),
                model: model.clone(),
            },
            ProviderConfig::OpenAI {
                api_key_env,
                api_base,
                model,
            } => EmbeddingProvider::OpenAI {
                api_key: resolve_env(api_key_env)?,
                api_base: api_base.clone(),
                model: model.clone(),
            },
        })
    }
}

// ============= Vector Store Configuration =============

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum VectorStoreConfig {
    Memory {
        /// JSON snapshot shared between `index` and later runs
        #[serde(default)]
        path: Option<PathBuf>,
    },
    Supabase {
        url: String,
        /// Environment variable containing the service key
        #[serde(default = "default_supabase_key_env")]
        api_key_env: String,
        #[serde(default = "default_supabase_table")]
        table: String,
        #[serde(default = "default_supabase_query_name")]
        query_name: String,
    },
}

fn default_snapshot_path() -> PathBuf {
    PathBuf::from("./data/vectors.json")
}

fn default_supabase_key_env() -> String {
    "SUPABASE_API_KEY".to_string()
}

fn default_supabase_table() -> String {
    "documents".to_string()
}

fn default_supabase_query_name() -> String {
    "match_documents".to_string()
}

impl Default for VectorStoreConfig {
    fn default() -> Self {
        VectorStoreConfig::Memory {
            path: Some(default_snapshot_path()),
        }
    }
}

impl VectorStoreConfig {
    pub fn kind(&self) -> &'static str {
        match self {
            VectorStoreConfig::Memory { .. } => "memory",
            VectorStoreConfig::Supabase { .. } => "supabase",
        }
    }

    pub fn store_provider(&self) -> Result<VectorStoreProvider, ConfigError> {
        Ok(match self {
            VectorStoreConfig::Memory { path } => VectorStoreProvider::InMemory { path: path.clone() },
            VectorStoreConfig::Supabase {
                url,
                api_key_env,
                table,
                query_name,
            } => VectorStoreProvider::Supabase {
                url: url.clone(),
                api_key: resolve_env(api_key_env)?,
                table: table.clone(),
                query_name: query_name.clone(),
            },
        })
    }
}

// ============= Chain Configuration =============

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChainConfig {
    /// Deadline for each provider call; 0 disables it
    #[serde(default = "default_request_timeout")]
    pub request_timeout_secs: u64,

    /// Address the answer prompt tells users to email when it has no answer
    #[serde(default = "default_contact_email")]
    pub contact_email: String,

    /// Replaces the built-in rewrite prompt; may use `{question}`
    #[serde(default)]
    pub rewrite_template: Option<String>,

    /// Replaces the built-in answer prompt; may use `{context}` and `{question}`
    #[serde(default)]
    pub answer_template: Option<String>,
}

fn default_request_timeout() -> u64 {
    60
}

fn default_contact_email() -> String {
    prompt::DEFAULT_CONTACT_EMAIL.to_string()
}

impl Default for ChainConfig {
    fn default() -> Self {
        Self {
            request_timeout_secs: default_request_timeout(),
            contact_email: default_contact_email(),
            rewrite_template: None,
            answer_template: None,
        }
    }
}

impl ChainConfig {
    pub fn request_timeout(&self) -> Option<Duration> {
        (self.request_timeout_secs > 0).then(|| Duration::from_secs(self.request_timeout_secs))
    }

    pub fn rewrite(&self) -> Result<PromptTemplate, ConfigError> {
        let invalid = |e: AppError| ConfigError::ValidationError(format!("chain.rewrite_template: {}", e));
        let template = match &self.rewrite_template {
            Some(text) => PromptTemplate::new(text.as_str()),
            None => prompt::rewrite_template(),
        }
        .map_err(invalid)?;
        template.ensure_only(REWRITE_PLACEHOLDERS).map_err(invalid)?;
        Ok(template)
    }

    pub fn answer(&self) -> Result<PromptTemplate, ConfigError> {
        let invalid = |e: AppError| ConfigError::ValidationError(format!("chain.answer_template: {}", e));
        let template = match &self.answer_template {
            Some(text) => PromptTemplate::new(text.as_str()),
            None => prompt::answer_template(&self.contact_email),
        }
        .map_err(invalid)?;
        template.ensure_only(ANSWER_PLACEHOLDERS).map_err(invalid)?;
        Ok(template)
    }
}

// ============= Configuration Loading & Validation =============

/// Errors that can occur during configuration loading
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Configuration file not found: {0}")]
    FileNotFound(PathBuf),

    #[error("Failed to read configuration file: {0}")]
    ReadError(#[from] std::io::Error),

    #[error("Failed to parse TOML: {0}")]
    ParseError(#[from] toml::de::Error),

    #[error("Validation error: {0}")]
    ValidationError(String),

    #[error("Environment variable '{0}' referenced in config is not set")]
    MissingEnvVar(String),
}

impl From<ConfigError> for AppError {
    fn from(err: ConfigError) -> Self {
        AppError::Configuration(err.to_string())
    }
}

fn resolve_env(name: &str) -> Result<String, ConfigError> {
    std::env::var(name)
        .ok()
        .filter(|v| !v.trim().is_empty())
        .ok_or_else(|| ConfigError::MissingEnvVar(name.to_string()))
}

impl DocChatConfig {
    /// Load and validate configuration from a TOML file
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let path = path.as_ref();

        if !path.exists() {
            return Err(ConfigError::FileNotFound(path.to_path_buf()));
        }

        let content = fs::read_to_string(path)?;
        let config = Self::from_toml(&content)?;
        tracing::debug!(path = %path.display(), "Loaded configuration");
        Ok(config)
    }

    /// Like [`load`](Self::load), but a missing file yields the defaults.
    pub fn load_or_default<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        match Self::load(&path) {
            Err(ConfigError::FileNotFound(missing)) => {
                tracing::info!(path = %missing.display(), "No configuration file, using defaults");
                let config = Self::default();
                config.validate()?;
                Ok(config)
            }
            other => other,
        }
    }

    pub fn from_toml(content: &str) -> Result<Self, ConfigError> {
        let config: DocChatConfig = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Check internal consistency. Environment variables are checked when
    /// providers are built, not here.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.rag.chunker()?;

        if self.rag.top_k == 0 {
            return Err(ConfigError::ValidationError(
                "rag.top_k must be at least 1".into(),
            ));
        }
        if self.rag.embed_batch_size == 0 {
            return Err(ConfigError::ValidationError(
                "rag.embed_batch_size must be at least 1".into(),
            ));
        }

        for (section, provider) in [("embedding", &self.embedding), ("generation", &self.generation)] {
            if provider.model().trim().is_empty() {
                return Err(ConfigError::ValidationError(format!(
                    "{}.model must not be empty",
                    section
                )));
            }
        }

        if let VectorStoreConfig::Supabase { url, table, .. } = &self.vector_store {
            if url.trim().is_empty() || table.trim().is_empty() {
                return Err(ConfigError::ValidationError(
                    "vector_store.url and vector_store.table must not be empty".into(),
                ));
            }
        }

        if self.chain.contact_email.trim().is_empty() {
            return Err(ConfigError::ValidationError(
                "chain.contact_email must not be empty".into(),
            ));
        }
        self.chain.rewrite()?;
        self.chain.answer()?;

        Ok(())
    }

    /// Effective configuration as TOML, for `docchat config`.
    pub fn to_toml(&self) -> Result<String, ConfigError> {
        toml::to_string_pretty(self)
            .map_err(|e| ConfigError::ValidationError(format!("Failed to render config: {}", e)))
    }
}
