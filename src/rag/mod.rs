//! Retrieval Augmented Generation (RAG) Pipeline
//!
//! # Module Structure
//!
//! - [`rag::chunker`](crate::rag::chunker) - Recursive character text splitting
//! - [`rag::embeddings`](crate::rag::embeddings) - Embedding capability and provider selection
//! - [`rag::indexer`](crate::rag::indexer) - All-or-nothing corpus ingestion
//! - [`rag::retriever`](crate::rag::retriever) - Top-k retrieval and context assembly
//!
//! # Pipeline
//!
//! 1. **Ingestion** - The corpus is chunked and every chunk embedded
//! 2. **Storage** - One batch of records is written to the vector store
//! 3. **Retrieval** - The query is embedded and the closest chunks returned
//! 4. **Generation** - The chain answers from the joined chunk texts
//!
//! # Example
//!
//! ```ignore
//! use docchat::rag::{chunker::TextChunker, indexer::Indexer, retriever::Retriever};
//!
//! let indexer = Indexer::new(TextChunker::new(500, 50)?, embedder.clone(), store.clone(), 64);
//! let report = indexer.index(&corpus, Some("scrimba-faq.txt")).await?;
//!
//! let retriever = Retriever::new(embedder, store, 4);
//! let hits = retriever.retrieve("What is Scrimba?").await?;
//! ```

pub mod chunker;
pub mod embeddings;
pub mod indexer;
pub mod retriever;

pub use chunker::TextChunker;
pub use embeddings::{Embedder, EmbeddingProvider};
pub use indexer::Indexer;
pub use retriever::{combine_documents, Retriever};
