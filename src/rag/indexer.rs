//! Corpus ingestion: chunk, embed, store.

use crate::db::VectorStore;
use crate::rag::chunker::TextChunker;
use crate::rag::embeddings::Embedder;
use crate::types::{AppError, DocumentChunk, IndexReport, NewRecord, Result};
use std::sync::Arc;
use std::time::Instant;

/// Default number of chunks per embedding request.
pub const DEFAULT_EMBED_BATCH_SIZE: usize = 64;

/// Populates a vector store from a corpus.
///
/// A run either stores every chunk of the corpus or none of them: all
/// embeddings are computed before anything is written, and the records are
/// then handed to the store as a single batch. Re-running on the same store
/// without [`VectorStore::clear`] duplicates records.
pub struct Indexer {
    chunker: TextChunker,
    embedder: Arc<dyn Embedder>,
    store: Arc<dyn VectorStore>,
    batch_size: usize,
}

impl Indexer {
    pub fn new(
        chunker: TextChunker,
        embedder: Arc<dyn Embedder>,
        store: Arc<dyn VectorStore>,
        batch_size: usize,
    ) -> Self {
        Self {
            chunker,
            embedder,
            store,
            batch_size: batch_size.max(1),
        }
    }

    pub fn chunker(&self) -> &TextChunker {
        &self.chunker
    }

    /// Index `corpus`, tagging each chunk with `source` when given.
    ///
    /// # Errors
    ///
    /// Any embedding or store failure is returned as `AppError::Indexing`
    /// wrapping the cause. Nothing has been written when an error is returned.
    pub async fn index(&self, corpus: &str, source: Option<&str>) -> Result<IndexReport> {
        self.run(corpus, source, false).await.map_err(|e| {
            tracing::warn!(error.kind = e.kind(), error = %e, "Indexing failed");
            AppError::indexing(e)
        })
    }

    /// Index `corpus` in place of everything the store holds.
    ///
    /// The store is cleared only after every chunk has been embedded, so an
    /// embedding failure leaves the previous corpus untouched. A store failure
    /// after the clear leaves the store empty.
    pub async fn reindex(&self, corpus: &str, source: Option<&str>) -> Result<IndexReport> {
        self.run(corpus, source, true).await.map_err(|e| {
            tracing::warn!(error.kind = e.kind(), error = %e, "Indexing failed");
            AppError::indexing(e)
        })
    }

    async fn run(&self, corpus: &str, source: Option<&str>, replace: bool) -> Result<IndexReport> {
        let started = Instant::now();

        let chunks: Vec<DocumentChunk> = self
            .chunker
            .split(corpus)
            .map(|mut chunk| {
                if let Some(source) = source {
                    chunk
                        .metadata
                        .insert("source".to_string(), source.into());
                }
                chunk
            })
            .collect();

        if chunks.is_empty() {
            if replace {
                self.store.clear().await?;
            }
            tracing::info!("Corpus is empty, nothing to index");
            return Ok(IndexReport { chunks_written: 0 });
        }

        tracing::debug!(
            chunks = chunks.len(),
            chunk_size = self.chunker.chunk_size(),
            chunk_overlap = self.chunker.chunk_overlap(),
            "Split corpus"
        );

        let mut records = Vec::with_capacity(chunks.len());
        for batch in chunks.chunks(self.batch_size) {
            let texts: Vec<String> = batch.iter().map(|c| c.text.clone()).collect();
            let embeddings = self.embedder.embed(&texts).await?;
            if embeddings.len() != batch.len() {
                return Err(AppError::Embedding(format!(
                    "Expected {} embeddings, got {}",
                    batch.len(),
                    embeddings.len()
                )));
            }
            records.extend(batch.iter().zip(embeddings).map(|(chunk, embedding)| NewRecord {
                text: chunk.text.clone(),
                embedding,
                metadata: chunk.metadata.clone(),
            }));
        }

        if replace {
            self.store.clear().await?;
        }
        let chunks_written = self.store.upsert_batch(&records).await?;

        tracing::info!(
            chunks = chunks_written,
            provider = self.store.provider_name(),
            model = self.embedder.model_name(),
            duration_ms = started.elapsed().as_millis() as u64,
            "Indexed corpus"
        );

        Ok(IndexReport { chunks_written })
    }
}
