use serde::{Deserialize, Serialize};

/// Free-form metadata attached to chunks and vector records.
pub type Metadata = serde_json::Map<String, serde_json::Value>;

// ============= Ingestion Types =============

/// A bounded segment of a source text, produced by the chunker.
///
/// `source_offset` is the character offset of the first character of `text`
/// within the source it was cut from.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DocumentChunk {
    pub text: String,
    pub source_offset: usize,
    pub metadata: Metadata,
}

/// A record ready to be written to a vector store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewRecord {
    pub text: String,
    pub embedding: Vec<f32>,
    pub metadata: Metadata,
}

/// A record owned by a vector store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VectorRecord {
    pub id: String,
    pub embedding: Vec<f32>,
    pub text: String,
    pub metadata: Metadata,
}

/// One similarity search hit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoredChunk {
    pub text: String,
    pub metadata: Metadata,
    pub score: f32,
}

/// Outcome of a successful indexing run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct IndexReport {
    pub chunks_written: usize,
}

// ============= Conversation Types =============

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageRole {
    User,
    Assistant,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: MessageRole,
    pub content: String,
}

impl ChatMessage {
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: MessageRole::User,
            content: content.into(),
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: MessageRole::Assistant,
            content: content.into(),
        }
    }
}

// ============= Error Types =============

#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("Chunking error: {0}")]
    Chunking(String),

    #[error("Embedding error: {0}")]
    Embedding(String),

    #[error("Vector store write error: {0}")]
    StoreWrite(String),

    #[error("Vector store query error: {0}")]
    StoreQuery(String),

    #[error("Generation error: {0}")]
    Generation(String),

    #[error("Missing placeholder value: {{{placeholder}}}")]
    MissingPlaceholder { placeholder: String },

    #[error("Indexing failed: {0}")]
    Indexing(#[source] Box<AppError>),

    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Timed out during {stage}")]
    Timeout { stage: &'static str },

    #[error("Request cancelled")]
    Cancelled,

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl AppError {
    /// Short, stable name of the error class, used as a logging field.
    pub fn kind(&self) -> &'static str {
        match self {
            AppError::Chunking(_) => "chunking",
            AppError::Embedding(_) => "embedding",
            AppError::StoreWrite(_) => "store_write",
            AppError::StoreQuery(_) => "store_query",
            AppError::Generation(_) => "generation",
            AppError::MissingPlaceholder { .. } => "missing_placeholder",
            AppError::Indexing(_) => "indexing",
            AppError::Configuration(_) => "configuration",
            AppError::InvalidInput(_) => "invalid_input",
            AppError::Timeout { .. } => "timeout",
            AppError::Cancelled => "cancelled",
            AppError::Io(_) => "io",
        }
    }

    /// Wraps an ingestion-phase failure. Already-wrapped errors are left as they are.
    pub fn indexing(cause: AppError) -> Self {
        match cause {
            AppError::Indexing(_) => cause,
            other => AppError::Indexing(Box::new(other)),
        }
    }
}

pub type Result<T> = std::result::Result<T, AppError>;
