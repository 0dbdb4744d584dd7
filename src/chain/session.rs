use super::ConversationChain;
use crate::types::{AppError, ChatMessage, Result};
use std::future::Future;
use std::sync::Arc;

/// Ordered transcript of one conversation plus the chain that answers it.
///
/// Each question is answered independently; earlier turns are kept for
/// display only and are never fed back into the chain.
pub struct ChatSession {
    chain: Arc<ConversationChain>,
    transcript: Vec<ChatMessage>,
}

impl ChatSession {
    pub fn new(chain: Arc<ConversationChain>) -> Self {
        Self {
            chain,
            transcript: Vec::new(),
        }
    }

    pub fn transcript(&self) -> &[ChatMessage] {
        &self.transcript
    }

    /// Answer `question`. On success the question and the answer are
    /// appended to the transcript; on failure it is left unchanged.
    pub async fn submit(&mut self, question: &str) -> Result<String> {
        let answer = self.chain.submit_question(question).await?;
        self.record(question, &answer);
        Ok(answer)
    }

    /// Like [`submit`](Self::submit), but gives up as soon as `cancel`
    /// completes. The in-flight provider call is dropped and
    /// `AppError::Cancelled` is returned without touching the transcript.
    pub async fn submit_until<C>(&mut self, question: &str, cancel: C) -> Result<String>
    where
        C: Future<Output = ()>,
    {
        let answer = tokio::select! {
            biased;
            _ = cancel => {
                tracing::debug!("Question cancelled by caller");
                return Err(AppError::Cancelled);
            }
            answer = self.chain.submit_question(question) => answer?,
        };
        self.record(question, &answer);
        Ok(answer)
    }

    fn record(&mut self, question: &str, answer: &str) {
        self.transcript.push(ChatMessage::user(question));
        self.transcript.push(ChatMessage::assistant(answer));
    }
}
