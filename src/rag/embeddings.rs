//! Embedding capability.
//!
//! An [`Embedder`] turns texts into fixed-length vectors, one per input and in
//! input order. Every vector from one embedder has the same dimensionality.

use crate::types::{AppError, Result};
use async_trait::async_trait;
use std::sync::Arc;

#[async_trait]
pub trait Embedder: Send + Sync {
    /// Embed a batch of texts. The output has the same length and order as `texts`.
    async fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>>;

    /// Embed a single query text.
    async fn embed_query(&self, text: &str) -> Result<Vec<f32>> {
        self.embed(&[text.to_string()])
            .await?
            .into_iter()
            .next()
            .ok_or_else(|| AppError::Embedding("Provider returned no embedding".into()))
    }

    fn model_name(&self) -> &str;
}

/// Checks the provider kept the one-vector-per-input contract.
pub fn ensure_batch_shape(inputs: usize, embeddings: &[Vec<f32>]) -> Result<()> {
    if embeddings.len() != inputs {
        return Err(AppError::Embedding(format!(
            "Provider returned {} embeddings for {} inputs",
            embeddings.len(),
            inputs
        )));
    }
    if let Some(first) = embeddings.first() {
        if first.is_empty() {
            return Err(AppError::Embedding("Provider returned an empty vector".into()));
        }
        if let Some(bad) = embeddings.iter().find(|e| e.len() != first.len()) {
            return Err(AppError::Embedding(format!(
                "Inconsistent embedding dimensions: {} vs {}",
                first.len(),
                bad.len()
            )));
        }
    }
    Ok(())
}

/// Embedding provider selection, mirroring [`crate::llm::Provider`].
#[derive(Debug, Clone)]
pub enum EmbeddingProvider {
    OpenAI {
        api_key: String,
        api_base: String,
        model: String,
    },
    Ollama {
        base_url: String,
        model: String,
    },
}

impl EmbeddingProvider {
    pub fn create_embedder(&self) -> Result<Arc<dyn Embedder>> {
        match self {
            #[cfg(feature = "openai")]
            EmbeddingProvider::OpenAI {
                api_key,
                api_base,
                model,
            } => Ok(Arc::new(crate::llm::openai::OpenAIEmbedder::new(
                api_key.clone(),
                api_base.clone(),
                model.clone(),
            )?)),

            #[cfg(feature = "ollama")]
            EmbeddingProvider::Ollama { base_url, model } => Ok(Arc::new(
                crate::llm::ollama::OllamaEmbedder::new(base_url, model.clone())?,
            )),

            #[allow(unreachable_patterns)]
            other => Err(AppError::Configuration(format!(
                "{} embeddings not enabled. Check feature flags.",
                other.name()
            ))),
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            EmbeddingProvider::OpenAI { .. } => "OpenAI",
            EmbeddingProvider::Ollama { .. } => "Ollama",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct FixedEmbedder;

    #[async_trait]
    impl Embedder for FixedEmbedder {
        async fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
            Ok(texts.iter().map(|t| vec![t.len() as f32, 1.0]).collect())
        }

        fn model_name(&self) -> &str {
            "fixed"
        }
    }

    #[tokio::test]
    async fn test_embed_query_uses_batch_path() {
        let v = FixedEmbedder.embed_query("abc").await.unwrap();
        assert_eq!(v, vec![3.0, 1.0]);
    }

    #[test]
    fn test_batch_shape_checks() {
        assert!(ensure_batch_shape(2, &[vec![1.0], vec![2.0]]).is_ok());
        assert!(ensure_batch_shape(0, &[]).is_ok());
        assert!(ensure_batch_shape(2, &[vec![1.0]]).is_err());
        assert!(ensure_batch_shape(2, &[vec![1.0], vec![1.0, 2.0]]).is_err());
        assert!(ensure_batch_shape(1, &[vec![]]).is_err());
    }
}
