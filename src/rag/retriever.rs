use crate::db::VectorStore;
use crate::rag::embeddings::Embedder;
use crate::types::{AppError, Result, ScoredChunk};
use std::sync::Arc;

/// Default number of chunks retrieved per question.
pub const DEFAULT_TOP_K: usize = 4;

/// Separator placed between chunk texts in the assembled context.
pub const CONTEXT_SEPARATOR: &str = "\n\n";

/// Answers "top-k chunks for this text" over a shared vector store.
#[derive(Clone)]
pub struct Retriever {
    embedder: Arc<dyn Embedder>,
    store: Arc<dyn VectorStore>,
    k: usize,
}

impl Retriever {
    pub fn new(embedder: Arc<dyn Embedder>, store: Arc<dyn VectorStore>, k: usize) -> Self {
        Self { embedder, store, k }
    }

    pub fn k(&self) -> usize {
        self.k
    }

    /// Embed `query` and return the closest chunks, best first.
    pub async fn retrieve(&self, query: &str) -> Result<Vec<ScoredChunk>> {
        let embedding = self.embedder.embed_query(query).await?;
        let hits = self.store.similarity_search(&embedding, self.k).await?;
        tracing::debug!(
            k = self.k,
            hits = hits.len(),
            provider = self.store.provider_name(),
            "Retrieved chunks"
        );
        Ok(hits)
    }
}

/// Join chunk texts with a blank line, keeping retrieval order.
pub fn combine_documents(chunks: &[ScoredChunk]) -> String {
    chunks
        .iter()
        .map(|c| c.text.as_str())
        .collect::<Vec<_>>()
        .join(CONTEXT_SEPARATOR)
}

/// Rejects blank questions before any provider is called.
pub fn ensure_question(question: &str) -> Result<&str> {
    if question.trim().is_empty() {
        return Err(AppError::InvalidInput("Question must not be empty".into()));
    }
    Ok(question)
}
