//! Mock implementations for testing.
//!
//! Hand-written doubles for the generation provider, the embedding provider
//! and the vector store, shared across the integration test files.

#![allow(dead_code)]

use async_trait::async_trait;
use docchat::db::{InMemoryVectorStore, VectorStore};
use docchat::llm::LLMClient;
use docchat::rag::Embedder;
use docchat::types::{AppError, NewRecord, Result, ScoredChunk};
use parking_lot::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

/// Mock LLM client with scripted responses.
///
/// Responses are returned in order; the last one repeats once the script is
/// exhausted. Every prompt is recorded so tests can inspect what the chain
/// actually sent.
///
/// # Examples
///
/// ```ignore
/// // Rewrite returns the first line, synthesis the second
/// let llm = MockLLMClient::new(&["What is Scrimba?", "A coding platform."]);
///
/// // A client that always fails
/// let llm = MockLLMClient::failing();
/// ```
pub struct MockLLMClient {
    responses: Vec<String>,
    should_fail: bool,
    delay: Option<Duration>,
    calls: AtomicUsize,
    prompts: Mutex<Vec<String>>,
}

impl MockLLMClient {
    /// Create a mock client that answers with `responses` in order.
    pub fn new(responses: &[&str]) -> Self {
        Self {
            responses: responses.iter().map(|r| r.to_string()).collect(),
            should_fail: false,
            delay: None,
            calls: AtomicUsize::new(0),
            prompts: Mutex::new(Vec::new()),
        }
    }

    /// Create a mock client that always returns a generation error.
    pub fn failing() -> Self {
        Self {
            should_fail: true,
            ..Self::new(&[])
        }
    }

    /// Sleep for `delay` before every response.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn prompts(&self) -> Vec<String> {
        self.prompts.lock().clone()
    }

    /// The prompt sent on call `index` (0-based).
    pub fn prompt(&self, index: usize) -> String {
        self.prompts
            .lock()
            .get(index)
            .cloned()
            .unwrap_or_else(|| panic!("no prompt recorded for call {}", index))
    }
}

#[async_trait]
impl LLMClient for MockLLMClient {
    async fn generate(&self, prompt: &str) -> Result<String> {
        let call = self.calls.fetch_add(1, Ordering::SeqCst);
        self.prompts.lock().push(prompt.to_string());

        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        if self.should_fail {
            return Err(AppError::Generation("Mock LLM failure".to_string()));
        }

        Ok(self
            .responses
            .get(call)
            .or_else(|| self.responses.last())
            .cloned()
            .unwrap_or_default())
    }

    async fn generate_with_system(&self, _system: &str, prompt: &str) -> Result<String> {
        self.generate(prompt).await
    }

    fn model_name(&self) -> &str {
        "mock-llm"
    }
}

/// Deterministic bag-of-words embedder.
///
/// Each lowercase word is hashed into one of `dims` buckets, so texts that
/// share words have a high cosine similarity.
pub struct MockEmbedder {
    dims: usize,
    fail_on_call: Option<usize>,
    calls: AtomicUsize,
    texts_embedded: AtomicUsize,
}

impl MockEmbedder {
    pub fn new() -> Self {
        Self {
            dims: 256,
            fail_on_call: None,
            calls: AtomicUsize::new(0),
            texts_embedded: AtomicUsize::new(0),
        }
    }

    /// Fail the `call`-th embed request (0-based).
    pub fn failing_on_call(call: usize) -> Self {
        Self {
            fail_on_call: Some(call),
            ..Self::new()
        }
    }

    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn texts_embedded(&self) -> usize {
        self.texts_embedded.load(Ordering::SeqCst)
    }

    pub fn vector(&self, text: &str) -> Vec<f32> {
        let mut vector = vec![0.0; self.dims];
        for word in text
            .split(|c: char| !c.is_alphanumeric())
            .filter(|w| !w.is_empty())
        {
            let bucket = fnv1a(&word.to_lowercase()) as usize % self.dims;
            vector[bucket] += 1.0;
        }
        vector
    }
}

impl Default for MockEmbedder {
    fn default() -> Self {
        Self::new()
    }
}

fn fnv1a(word: &str) -> u64 {
    word.bytes().fold(0xcbf29ce484222325, |hash, byte| {
        (hash ^ byte as u64).wrapping_mul(0x100000001b3)
    })
}

#[async_trait]
impl Embedder for MockEmbedder {
    async fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        let call = self.calls.fetch_add(1, Ordering::SeqCst);
        if self.fail_on_call == Some(call) {
            return Err(AppError::Embedding("Mock embedding failure".to_string()));
        }
        self.texts_embedded.fetch_add(texts.len(), Ordering::SeqCst);
        Ok(texts.iter().map(|t| self.vector(t)).collect())
    }

    fn model_name(&self) -> &str {
        "mock-embedder"
    }
}

/// Vector store wrapper that counts calls and can be told to fail.
pub struct MockVectorStore {
    inner: InMemoryVectorStore,
    fail_writes: bool,
    fail_queries: bool,
    upsert_calls: AtomicUsize,
    search_calls: AtomicUsize,
}

impl MockVectorStore {
    pub fn new() -> Self {
        Self {
            inner: InMemoryVectorStore::new(),
            fail_writes: false,
            fail_queries: false,
            upsert_calls: AtomicUsize::new(0),
            search_calls: AtomicUsize::new(0),
        }
    }

    pub fn failing_writes() -> Self {
        Self {
            fail_writes: true,
            ..Self::new()
        }
    }

    pub fn failing_queries() -> Self {
        Self {
            fail_queries: true,
            ..Self::new()
        }
    }

    pub fn upsert_calls(&self) -> usize {
        self.upsert_calls.load(Ordering::SeqCst)
    }

    pub fn search_calls(&self) -> usize {
        self.search_calls.load(Ordering::SeqCst)
    }
}

impl Default for MockVectorStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl VectorStore for MockVectorStore {
    fn provider_name(&self) -> &'static str {
        "mock"
    }

    async fn upsert_batch(&self, records: &[NewRecord]) -> Result<usize> {
        self.upsert_calls.fetch_add(1, Ordering::SeqCst);
        if self.fail_writes {
            return Err(AppError::StoreWrite("Mock store rejected write".to_string()));
        }
        self.inner.upsert_batch(records).await
    }

    async fn similarity_search(&self, embedding: &[f32], k: usize) -> Result<Vec<ScoredChunk>> {
        self.search_calls.fetch_add(1, Ordering::SeqCst);
        if self.fail_queries {
            return Err(AppError::StoreQuery("Mock store unavailable".to_string()));
        }
        self.inner.similarity_search(embedding, k).await
    }

    async fn count(&self) -> Result<usize> {
        self.inner.count().await
    }

    async fn clear(&self) -> Result<()> {
        self.inner.clear().await
    }
}

/// Store `texts` as records embedded by `embedder`.
pub async fn seed_store(store: &dyn VectorStore, embedder: &MockEmbedder, texts: &[&str]) {
    let records: Vec<NewRecord> = texts
        .iter()
        .map(|text| NewRecord {
            text: text.to_string(),
            embedding: embedder.vector(text),
            metadata: Default::default(),
        })
        .collect();
    store
        .upsert_batch(&records)
        .await
        .expect("seeding the store should succeed");
}

/// Shared handles for a chain built on mocks.
pub struct Harness {
    pub llm: Arc<MockLLMClient>,
    pub embedder: Arc<MockEmbedder>,
    pub store: Arc<MockVectorStore>,
}

impl Harness {
    pub fn new(llm: MockLLMClient) -> Self {
        Self::with_store(llm, MockVectorStore::new())
    }

    pub fn with_store(llm: MockLLMClient, store: MockVectorStore) -> Self {
        Self {
            llm: Arc::new(llm),
            embedder: Arc::new(MockEmbedder::new()),
            store: Arc::new(store),
        }
    }

    pub async fn seed(&self, texts: &[&str]) {
        seed_store(self.store.as_ref(), &self.embedder, texts).await;
    }
}
