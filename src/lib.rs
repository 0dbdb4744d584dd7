//! # docchat - Documentation Q&A over a fixed corpus
//!
//! docchat answers natural-language questions about a documentation corpus.
//! The corpus is chunked and embedded once; each question is then rewritten
//! into a standalone form, used to retrieve the closest chunks, and answered
//! from those chunks alone.
//!
//! docchat can be used in two ways:
//!
//! 1. **As a command-line tool** - Run the `docchat` binary (`index`, `ask`, `chat`)
//! 2. **As a library** - Build the pipeline pieces in your own Rust project
//!
//! ## Quick Start (Library Usage)
//!
//! ```rust,ignore
//! use docchat::{DocChat, DocChatConfig};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = DocChatConfig::load_or_default("docchat.toml")?;
//!     let app = DocChat::from_config(config).await?;
//!
//!     let corpus = std::fs::read_to_string("scrimba-info.txt")?;
//!     let report = app.index_corpus(&corpus, Some("scrimba-info.txt"), true).await?;
//!     println!("indexed {} chunks", report.chunks_written);
//!
//!     let answer = app.submit_question("What is Scrimba?").await?;
//!     println!("{}", answer);
//!     Ok(())
//! }
//! ```
//!
//! ### Wiring the pipeline by hand
//!
//! ```rust,ignore
//! use docchat::chain::ConversationChain;
//! use docchat::rag::Retriever;
//!
//! let retriever = Retriever::new(embedder.clone(), store.clone(), 4);
//! let chain = ConversationChain::with_default_templates(llm, retriever, "help@scrimba.com")?;
//! let output = chain.invoke("What is it?").await?;
//! println!("{} (asked as: {})", output.answer, output.standalone_question);
//! ```
//!
//! ## Feature Flags
//!
//! | Feature | Description |
//! |---------|-------------|
//! | `ollama` | Ollama chat and embeddings (default) |
//! | `openai` | OpenAI-compatible chat and embeddings (default) |
//! | `supabase` | Supabase pgvector store (default) |
//!
//! ## Modules
//!
//! - [`chain`] - Rewrite, retrieve and answer pipeline plus chat sessions
//! - [`db`] - Vector store abstraction and backends
//! - [`llm`] - Generation providers
//! - [`rag`] - Chunking, embeddings, indexing and retrieval
//! - [`types`] - Common types and error handling
//! - [`utils`] - TOML configuration

#![cfg_attr(docsrs, feature(doc_cfg))]
#![warn(rustdoc::missing_crate_level_docs)]

/// Conversation chain, prompt templates and chat sessions.
pub mod chain;
/// Command-line interface definitions and output helpers.
pub mod cli;
/// Vector stores (in-memory, Supabase).
pub mod db;
/// LLM provider clients and abstractions.
pub mod llm;
/// Retrieval Augmented Generation (RAG) components.
pub mod rag;
/// Core types (chunks, records, errors).
pub mod types;
/// Configuration utilities.
pub mod utils;

// Re-export commonly used types
pub use chain::{ChainOutput, ChatSession, ConversationChain};
pub use db::{VectorStore, VectorStoreProvider};
pub use llm::{LLMClient, Provider};
pub use rag::{Embedder, EmbeddingProvider, Indexer, Retriever, TextChunker};
pub use types::{AppError, IndexReport, Result};
pub use utils::toml_config::DocChatConfig;

use std::sync::Arc;

/// Application state: the providers, store and pipeline built once at
/// startup and shared by every command.
#[derive(Clone)]
pub struct DocChat {
    /// Effective configuration
    pub config: Arc<DocChatConfig>,
    /// Generation provider used by the chain
    pub llm: Arc<dyn LLMClient>,
    /// Embedding provider shared by indexer and retriever
    pub embedder: Arc<dyn Embedder>,
    /// Vector store shared by indexer and retriever
    pub store: Arc<dyn VectorStore>,
    /// Query-time pipeline
    pub chain: Arc<ConversationChain>,
    indexer: Arc<Indexer>,
}

impl DocChat {
    /// Build every provider named by `config`.
    pub async fn from_config(config: DocChatConfig) -> Result<Self> {
        let llm = config.generation.generation_provider()?.create_client().await?;
        let embedder = config.embedding.embedding_provider()?.create_embedder()?;
        let store = config.vector_store.store_provider()?.create_store().await?;

        tracing::info!(
            generation = config.generation.kind(),
            embedding = config.embedding.kind(),
            vector_store = store.provider_name(),
            "Providers ready"
        );

        Self::from_parts(config, llm, embedder, store)
    }

    /// Assemble the pipeline around already-built providers.
    pub fn from_parts(
        config: DocChatConfig,
        llm: Arc<dyn LLMClient>,
        embedder: Arc<dyn Embedder>,
        store: Arc<dyn VectorStore>,
    ) -> Result<Self> {
        config.validate()?;

        let retriever = Retriever::new(embedder.clone(), store.clone(), config.rag.top_k);
        let mut chain = ConversationChain::new(
            llm.clone(),
            retriever,
            config.chain.rewrite()?,
            config.chain.answer()?,
        )?;
        if let Some(timeout) = config.chain.request_timeout() {
            chain = chain.with_request_timeout(timeout);
        }

        let indexer = Indexer::new(
            config.rag.chunker()?,
            embedder.clone(),
            store.clone(),
            config.rag.embed_batch_size,
        );

        Ok(Self {
            config: Arc::new(config),
            llm,
            embedder,
            store,
            chain: Arc::new(chain),
            indexer: Arc::new(indexer),
        })
    }

    /// Answer one question.
    pub async fn submit_question(&self, raw_question: &str) -> Result<String> {
        self.chain.submit_question(raw_question).await
    }

    /// Index a corpus. With `replace`, earlier records are dropped so the
    /// run does not duplicate them.
    pub async fn index_corpus(
        &self,
        corpus: &str,
        source: Option<&str>,
        replace: bool,
    ) -> Result<IndexReport> {
        if replace {
            self.indexer.reindex(corpus, source).await
        } else {
            self.indexer.index(corpus, source).await
        }
    }

    /// Start an empty chat session on this pipeline.
    pub fn session(&self) -> ChatSession {
        ChatSession::new(self.chain.clone())
    }
}
