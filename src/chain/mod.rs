//! Conversation Chain
//!
//! Answers one question in three phases:
//!
//! ```text
//!            ┌──────────────┐
//! question ──►  Rewriting   ├── standalone ──► Retrieving ──► context ──┐
//!     │      └──────────────┘                                         ▼
//!     └────────────────────► PassthroughHeld ──► question ──► Synthesizing ──► answer
//! ```
//!
//! Retrieval works on the rewritten question while the original question is
//! held for the answer prompt. Both branches must finish before synthesis
//! starts. Any failure ends the invocation; there is no partial answer.

pub mod prompt;
pub mod session;

use crate::llm::LLMClient;
use crate::rag::retriever::{combine_documents, ensure_question, Retriever};
use crate::types::{AppError, Result, ScoredChunk};
use prompt::PromptTemplate;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;
use std::time::{Duration, Instant};

pub use prompt::{answer_template, rewrite_template, DEFAULT_CONTACT_EMAIL};
pub use session::ChatSession;

/// Placeholders the rewrite template may use.
pub const REWRITE_PLACEHOLDERS: &[&str] = &["question"];

/// Placeholders the answer template may use.
pub const ANSWER_PLACEHOLDERS: &[&str] = &["context", "question"];

/// Position of one invocation in the pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChainState {
    Idle,
    Rewriting,
    Retrieving,
    PassthroughHeld,
    Synthesizing,
    Done,
    Failed,
}

impl ChainState {
    pub fn is_terminal(self) -> bool {
        matches!(self, ChainState::Done | ChainState::Failed)
    }
}

/// States visited by one invocation, in order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChainTrace {
    states: Vec<ChainState>,
}

impl ChainTrace {
    pub fn new() -> Self {
        Self {
            states: vec![ChainState::Idle],
        }
    }

    fn enter(&mut self, state: ChainState) {
        tracing::debug!(?state, "Chain transition");
        self.states.push(state);
    }

    pub fn states(&self) -> &[ChainState] {
        &self.states
    }

    pub fn current(&self) -> ChainState {
        self.states.last().copied().unwrap_or(ChainState::Idle)
    }

    pub fn visited(&self, state: ChainState) -> bool {
        self.states.contains(&state)
    }
}

impl Default for ChainTrace {
    fn default() -> Self {
        Self::new()
    }
}

/// Result of a successful invocation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChainOutput {
    /// The synthesized answer
    pub answer: String,
    /// Phase 1 rewrite of the raw question
    pub standalone_question: String,
    /// Retrieved chunk texts joined by blank lines
    pub context: String,
    /// Retrieved chunks, best first
    pub sources: Vec<ScoredChunk>,
    /// Wall time of the whole invocation in milliseconds
    pub duration_ms: u64,
    pub trace: ChainTrace,
}

/// Rewrite-retrieve-answer pipeline.
///
/// Holds no per-request state; one instance serves concurrent invocations.
pub struct ConversationChain {
    llm: Arc<dyn LLMClient>,
    retriever: Retriever,
    rewrite: PromptTemplate,
    answer: PromptTemplate,
    request_timeout: Option<Duration>,
}

impl ConversationChain {
    /// Build a chain from explicit templates.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Configuration` if a template uses a placeholder the
    /// chain never supplies.
    pub fn new(
        llm: Arc<dyn LLMClient>,
        retriever: Retriever,
        rewrite: PromptTemplate,
        answer: PromptTemplate,
    ) -> Result<Self> {
        rewrite.ensure_only(REWRITE_PLACEHOLDERS)?;
        answer.ensure_only(ANSWER_PLACEHOLDERS)?;
        Ok(Self {
            llm,
            retriever,
            rewrite,
            answer,
            request_timeout: None,
        })
    }

    /// Build a chain with the built-in templates.
    pub fn with_default_templates(
        llm: Arc<dyn LLMClient>,
        retriever: Retriever,
        contact_email: &str,
    ) -> Result<Self> {
        Self::new(
            llm,
            retriever,
            rewrite_template()?,
            answer_template(contact_email)?,
        )
    }

    /// Bound every provider call by `timeout`.
    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = Some(timeout);
        self
    }

    pub fn answer_template(&self) -> &PromptTemplate {
        &self.answer
    }

    /// Answer `raw_question`, returning only the answer text.
    pub async fn submit_question(&self, raw_question: &str) -> Result<String> {
        self.invoke(raw_question).await.map(|output| output.answer)
    }

    /// Answer `raw_question`, returning every intermediate value.
    pub async fn invoke(&self, raw_question: &str) -> Result<ChainOutput> {
        let mut trace = ChainTrace::new();
        self.invoke_traced(raw_question, &mut trace).await
    }

    /// Like [`invoke`](Self::invoke), recording transitions into `trace` so
    /// the caller can inspect where a failed invocation stopped.
    pub async fn invoke_traced(
        &self,
        raw_question: &str,
        trace: &mut ChainTrace,
    ) -> Result<ChainOutput> {
        let started = Instant::now();
        match self.run(raw_question, trace).await {
            Ok((answer, standalone_question, sources)) => {
                trace.enter(ChainState::Done);
                let duration_ms = started.elapsed().as_millis() as u64;
                tracing::info!(
                    model = self.llm.model_name(),
                    sources = sources.len(),
                    duration_ms,
                    "Answered question"
                );
                Ok(ChainOutput {
                    answer,
                    standalone_question,
                    context: combine_documents(&sources),
                    sources,
                    duration_ms,
                    trace: trace.clone(),
                })
            }
            Err(e) => {
                let stage = trace.current();
                trace.enter(ChainState::Failed);
                tracing::warn!(?stage, error.kind = e.kind(), error = %e, "Chain failed");
                Err(e)
            }
        }
    }

    async fn run(
        &self,
        raw_question: &str,
        trace: &mut ChainTrace,
    ) -> Result<(String, String, Vec<ScoredChunk>)> {
        let raw_question = ensure_question(raw_question)?;

        // Phase 1
        trace.enter(ChainState::Rewriting);
        let prompt = self
            .rewrite
            .render(&HashMap::from([("question", raw_question)]))?;
        let standalone = self
            .bounded("rewrite", self.llm.generate(&prompt))
            .await?
            .trim()
            .to_string();
        tracing::debug!(standalone = %standalone, "Rewrote question");

        // Phase 2: both branches join before synthesis.
        trace.enter(ChainState::Retrieving);
        trace.enter(ChainState::PassthroughHeld);
        let retrieval = self.bounded("retrieve", self.retriever.retrieve(&standalone));
        let passthrough = async { Ok::<_, AppError>(raw_question) };
        let (sources, question) = tokio::try_join!(retrieval, passthrough)?;
        let context = combine_documents(&sources);

        // Phase 3
        trace.enter(ChainState::Synthesizing);
        let prompt = self.answer.render(&HashMap::from([
            ("context", context.as_str()),
            ("question", question),
        ]))?;
        let answer = self
            .bounded("synthesize", self.llm.generate(&prompt))
            .await?;

        Ok((answer, standalone, sources))
    }

    async fn bounded<T>(
        &self,
        stage: &'static str,
        call: impl Future<Output = Result<T>>,
    ) -> Result<T> {
        match self.request_timeout {
            Some(limit) => tokio::time::timeout(limit, call)
                .await
                .map_err(|_| AppError::Timeout { stage })?,
            None => call.await,
        }
    }
}
