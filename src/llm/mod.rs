//! LLM Provider Clients
//!
//! Generation and embedding providers behind the [`LLMClient`] and
//! [`crate::rag::embeddings::Embedder`] traits.
//!
//! # Supported Providers
//!
//! Enable providers via Cargo features:
//! - `openai` - OpenAI API and compatible endpoints (reqwest)
//! - `ollama` - Local Ollama server (ollama-rs)
//!
//! # Example
//!
//! ```ignore
//! use docchat::llm::Provider;
//!
//! let client = Provider::Ollama {
//!     base_url: "http://localhost:11434".to_string(),
//!     model: "llama3.2".to_string(),
//! }
//! .create_client()
//! .await?;
//!
//! let response = client.generate("What is 2+2?").await?;
//! ```

/// Core LLM client trait and provider selection.
pub mod client;

#[cfg(feature = "ollama")]
pub mod ollama;

#[cfg(feature = "openai")]
pub mod openai;

pub use client::{LLMClient, Provider};
