//! Vector Store Abstraction Layer
//!
//! This module provides a unified interface for the record store the indexer
//! writes to and the retriever reads from.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────┐
//! │               VectorStore Trait              │
//! ├──────────────────────────────────────────────┤
//! │ upsert_batch │ similarity_search │ count │ … │
//! └──────────────────────────────────────────────┘
//!          ▲                        ▲
//!    ┌─────┴──────┐          ┌──────┴─────┐
//!    │  InMemory  │          │  Supabase  │
//!    │ (+snapshot)│          │ (pgvector) │
//!    └────────────┘          └────────────┘
//! ```
//!
//! # Example
//!
//! ```rust,ignore
//! use docchat::db::vectorstore::VectorStoreProvider;
//!
//! let store = VectorStoreProvider::InMemory { path: None }.create_store().await?;
//! store.upsert_batch(&records).await?;
//! let hits = store.similarity_search(&query_embedding, 4).await?;
//! ```

use crate::types::{AppError, NewRecord, Result, ScoredChunk, VectorRecord};
use async_trait::async_trait;
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::Arc;

// ============================================================================
// Vector Store Provider Configuration
// ============================================================================

/// Configuration for vector store providers.
#[derive(Debug, Clone)]
pub enum VectorStoreProvider {
    /// Process-local store. With a `path`, records are snapshotted to a JSON
    /// file after every write and reloaded on open.
    InMemory { path: Option<PathBuf> },

    /// Supabase (PostgREST + pgvector) table with a similarity RPC.
    Supabase {
        /// Project URL, e.g. `https://xyz.supabase.co`.
        url: String,
        /// Service or anon key.
        api_key: String,
        /// Table holding `content`, `metadata` and `embedding` columns.
        table: String,
        /// Name of the similarity search function.
        query_name: String,
    },
}

impl VectorStoreProvider {
    /// Create a vector store instance from this provider configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if a snapshot cannot be loaded, the settings are
    /// invalid, or the provider feature is not enabled.
    pub async fn create_store(&self) -> Result<Arc<dyn VectorStore>> {
        match self {
            VectorStoreProvider::InMemory { path: None } => Ok(Arc::new(InMemoryVectorStore::new())),

            VectorStoreProvider::InMemory { path: Some(path) } => {
                Ok(Arc::new(InMemoryVectorStore::open(path).await?))
            }

            #[cfg(feature = "supabase")]
            VectorStoreProvider::Supabase {
                url,
                api_key,
                table,
                query_name,
            } => Ok(Arc::new(super::supabase::SupabaseVectorStore::new(
                url, api_key, table, query_name,
            )?)),

            #[allow(unreachable_patterns)]
            _ => Err(AppError::Configuration(
                "Vector store provider not enabled. Check feature flags.".into(),
            )),
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            VectorStoreProvider::InMemory { .. } => "in-memory",
            VectorStoreProvider::Supabase { .. } => "supabase",
        }
    }
}

// ============================================================================
// Vector Store Trait
// ============================================================================

/// Abstract trait for vector database operations.
///
/// A store instance holds records of a single dimensionality, fixed by the
/// first write. Implementations are shared across concurrent queries.
///
/// # Implementors
///
/// - `InMemoryVectorStore` - exact cosine search, optional JSON snapshot
/// - `SupabaseVectorStore` - pgvector table behind PostgREST
#[async_trait]
pub trait VectorStore: Send + Sync {
    /// Get the name of this vector store provider.
    fn provider_name(&self) -> &'static str;

    /// Similarity metric used to score search results.
    fn metric(&self) -> &'static str {
        "cosine"
    }

    /// Persist a batch of records. Either every record is stored or none is.
    ///
    /// # Returns
    ///
    /// Number of records written.
    ///
    /// # Errors
    ///
    /// Returns `AppError::StoreWrite` on transport, auth or validation failure.
    async fn upsert_batch(&self, records: &[NewRecord]) -> Result<usize>;

    /// Find the `k` records most similar to `embedding`.
    ///
    /// Results are sorted by descending score. Fewer than `k` results are
    /// returned only when the store holds fewer than `k` records.
    ///
    /// # Errors
    ///
    /// Returns `AppError::StoreQuery` on transport failure or dimension mismatch.
    async fn similarity_search(&self, embedding: &[f32], k: usize) -> Result<Vec<ScoredChunk>>;

    /// Count stored records.
    async fn count(&self) -> Result<usize>;

    /// Remove every record.
    async fn clear(&self) -> Result<()>;
}

/// Rejects empty or non-finite vectors and mixed dimensions within a batch.
///
/// Returns the batch dimensionality, or `None` for an empty batch.
pub fn validate_batch(records: &[NewRecord]) -> Result<Option<usize>> {
    let Some(first) = records.first() else {
        return Ok(None);
    };
    let dimensions = first.embedding.len();
    if dimensions == 0 {
        return Err(AppError::StoreWrite("Record has an empty embedding".into()));
    }
    for record in records {
        if record.embedding.len() != dimensions {
            return Err(AppError::StoreWrite(format!(
                "Dimension mismatch in batch: expected {}, got {}",
                dimensions,
                record.embedding.len()
            )));
        }
        if record.embedding.iter().any(|x| !x.is_finite()) {
            return Err(AppError::StoreWrite(
                "Record embedding contains NaN or infinite values".into(),
            ));
        }
    }
    Ok(Some(dimensions))
}

/// Calculate cosine similarity between two vectors.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() {
        return 0.0;
    }

    let dot_product: f32 = a.iter().zip(b.iter()).map(|(x, y)| x * y).sum();
    let norm_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();

    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }

    dot_product / (norm_a * norm_b)
}

// ============================================================================
// In-Memory Vector Store
// ============================================================================

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
struct Snapshot {
    dimensions: Option<usize>,
    records: Vec<VectorRecord>,
}

/// In-memory vector store with optional JSON snapshot persistence.
///
/// Uses cosine similarity for vector comparisons. Reads take a shared lock;
/// writers are serialized and swap in the new record set only after the
/// snapshot (if any) has been written.
pub struct InMemoryVectorStore {
    state: Arc<RwLock<Snapshot>>,
    path: Option<PathBuf>,
    writer: tokio::sync::Mutex<()>,
}

impl InMemoryVectorStore {
    /// Create an empty, non-persistent store.
    pub fn new() -> Self {
        Self {
            state: Arc::new(RwLock::new(Snapshot::default())),
            path: None,
            writer: tokio::sync::Mutex::new(()),
        }
    }

    /// Open a snapshot-backed store, loading `path` if it exists.
    pub async fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let snapshot = if tokio::fs::try_exists(&path).await? {
            let data = tokio::fs::read_to_string(&path).await?;
            serde_json::from_str(&data).map_err(|e| {
                AppError::Configuration(format!(
                    "Failed to parse vector snapshot {}: {}",
                    path.display(),
                    e
                ))
            })?
        } else {
            Snapshot::default()
        };

        tracing::debug!(
            path = %path.display(),
            records = snapshot.records.len(),
            "Opened vector snapshot"
        );

        Ok(Self {
            state: Arc::new(RwLock::new(snapshot)),
            path: Some(path),
            writer: tokio::sync::Mutex::new(()),
        })
    }

    /// Dimensionality fixed by the first write, if any.
    pub fn dimensions(&self) -> Option<usize> {
        self.state.read().dimensions
    }

    /// Write the snapshot next to its target, then rename over it.
    async fn persist(&self, snapshot: &Snapshot) -> Result<()> {
        let Some(path) = &self.path else {
            return Ok(());
        };
        let data = serde_json::to_string(snapshot)
            .map_err(|e| AppError::StoreWrite(format!("Failed to serialize records: {}", e)))?;

        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent).await.map_err(|e| {
                AppError::StoreWrite(format!("Failed to create data directory: {}", e))
            })?;
        }

        let tmp = path.with_extension("json.tmp");
        tokio::fs::write(&tmp, data)
            .await
            .map_err(|e| AppError::StoreWrite(format!("Failed to write snapshot: {}", e)))?;
        tokio::fs::rename(&tmp, path)
            .await
            .map_err(|e| AppError::StoreWrite(format!("Failed to replace snapshot: {}", e)))?;
        Ok(())
    }
}

impl Default for InMemoryVectorStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl VectorStore for InMemoryVectorStore {
    fn provider_name(&self) -> &'static str {
        "in-memory"
    }

    async fn upsert_batch(&self, records: &[NewRecord]) -> Result<usize> {
        let Some(dimensions) = validate_batch(records)? else {
            return Ok(0);
        };
        let _guard = self.writer.lock().await;

        let mut next = self.state.read().clone();
        if let Some(existing) = next.dimensions {
            if existing != dimensions {
                return Err(AppError::StoreWrite(format!(
                    "Dimension mismatch: store holds {}-d vectors, batch has {}-d",
                    existing, dimensions
                )));
            }
        }
        next.dimensions = Some(dimensions);
        next.records.extend(records.iter().map(|r| VectorRecord {
            id: uuid::Uuid::new_v4().to_string(),
            embedding: r.embedding.clone(),
            text: r.text.clone(),
            metadata: r.metadata.clone(),
        }));

        self.persist(&next).await?;
        *self.state.write() = next;

        Ok(records.len())
    }

    async fn similarity_search(&self, embedding: &[f32], k: usize) -> Result<Vec<ScoredChunk>> {
        let state = self.state.read();
        if k == 0 || state.records.is_empty() {
            return Ok(Vec::new());
        }
        if state.dimensions != Some(embedding.len()) {
            return Err(AppError::StoreQuery(format!(
                "Query has {} dimensions, store holds {:?}",
                embedding.len(),
                state.dimensions
            )));
        }

        let mut results: Vec<ScoredChunk> = state
            .records
            .iter()
            .map(|record| ScoredChunk {
                text: record.text.clone(),
                metadata: record.metadata.clone(),
                score: cosine_similarity(embedding, &record.embedding),
            })
            .collect();

        // Sort by score descending
        results.sort_by(|a, b| b.score.total_cmp(&a.score));
        results.truncate(k);

        Ok(results)
    }

    async fn count(&self) -> Result<usize> {
        Ok(self.state.read().records.len())
    }

    async fn clear(&self) -> Result<()> {
        let _guard = self.writer.lock().await;
        let empty = Snapshot::default();
        self.persist(&empty).await?;
        *self.state.write() = empty;
        Ok(())
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Metadata;

    fn record(text: &str, embedding: Vec<f32>) -> NewRecord {
        NewRecord {
            text: text.to_string(),
            embedding,
            metadata: Metadata::new(),
        }
    }

    #[tokio::test]
    async fn test_inmemory_upsert_and_search() {
        let store = InMemoryVectorStore::new();
        store
            .upsert_batch(&[
                record("Hello world", vec![1.0, 0.0, 0.0]),
                record("Goodbye world", vec![0.0, 1.0, 0.0]),
                record("Hello again", vec![0.9, 0.1, 0.0]),
            ])
            .await
            .unwrap();

        let results = store.similarity_search(&[1.0, 0.0, 0.0], 2).await.unwrap();

        assert_eq!(results.len(), 2);
        assert_eq!(results[0].text, "Hello world");
        assert_eq!(results[1].text, "Hello again");
        assert!(results[0].score >= results[1].score);
    }

    #[tokio::test]
    async fn test_inmemory_k_larger_than_store() {
        let store = InMemoryVectorStore::new();
        store
            .upsert_batch(&[record("a", vec![1.0, 0.0]), record("b", vec![0.0, 1.0])])
            .await
            .unwrap();

        let results = store.similarity_search(&[1.0, 1.0], 10).await.unwrap();
        assert_eq!(results.len(), 2);
        assert!(store.similarity_search(&[1.0, 1.0], 0).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_inmemory_rejects_mixed_dimensions_atomically() {
        let store = InMemoryVectorStore::new();
        store.upsert_batch(&[record("a", vec![1.0, 0.0])]).await.unwrap();

        let err = store
            .upsert_batch(&[record("b", vec![1.0, 0.0]), record("c", vec![1.0, 0.0, 0.0])])
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::StoreWrite(_)));

        let err = store
            .upsert_batch(&[record("d", vec![1.0, 0.0, 0.0])])
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::StoreWrite(_)));

        assert_eq!(store.count().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_inmemory_query_dimension_mismatch() {
        let store = InMemoryVectorStore::new();
        store.upsert_batch(&[record("a", vec![1.0, 0.0])]).await.unwrap();

        let err = store.similarity_search(&[1.0], 1).await.unwrap_err();
        assert!(matches!(err, AppError::StoreQuery(_)));
    }

    #[tokio::test]
    async fn test_inmemory_snapshot_roundtrip_and_clear() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("vectors").join("store.json");

        {
            let store = InMemoryVectorStore::open(&path).await.unwrap();
            store
                .upsert_batch(&[record("persisted", vec![0.5, 0.5])])
                .await
                .unwrap();
        }

        let reopened = InMemoryVectorStore::open(&path).await.unwrap();
        assert_eq!(reopened.count().await.unwrap(), 1);
        assert_eq!(reopened.dimensions(), Some(2));

        reopened.clear().await.unwrap();
        let again = InMemoryVectorStore::open(&path).await.unwrap();
        assert_eq!(again.count().await.unwrap(), 0);
        assert_eq!(again.dimensions(), None);
    }

    #[tokio::test]
    async fn test_failed_snapshot_write_keeps_memory_unchanged() {
        let dir = tempfile::tempdir().unwrap();
        // A directory where the snapshot file should be makes the rename fail.
        let path = dir.path().join("occupied");
        std::fs::create_dir_all(path.join("child")).unwrap();

        let store = InMemoryVectorStore {
            state: Arc::new(RwLock::new(Snapshot::default())),
            path: Some(path),
            writer: tokio::sync::Mutex::new(()),
        };

        let err = store
            .upsert_batch(&[record("lost", vec![1.0])])
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::StoreWrite(_)));
        assert_eq!(store.count().await.unwrap(), 0);
    }

    #[test]
    fn test_cosine_similarity() {
        assert!((cosine_similarity(&[1.0, 0.0], &[1.0, 0.0]) - 1.0).abs() < 0.001);
        assert!(cosine_similarity(&[1.0, 0.0], &[0.0, 1.0]).abs() < 0.001);
        assert!((cosine_similarity(&[1.0, 0.0], &[-1.0, 0.0]) + 1.0).abs() < 0.001);
        assert_eq!(cosine_similarity(&[0.0, 0.0], &[1.0, 0.0]), 0.0);
    }

    #[tokio::test]
    async fn test_provider_creates_in_memory_store() {
        let store = VectorStoreProvider::InMemory { path: None }
            .create_store()
            .await
            .unwrap();
        assert_eq!(store.provider_name(), "in-memory");
        assert_eq!(store.metric(), "cosine");
        assert_eq!(store.count().await.unwrap(), 0);
    }
}
