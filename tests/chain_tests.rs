//! Conversation chain tests
//!
//! Drive the rewrite, retrieve and answer pipeline against mock providers and
//! check what reaches the generation provider, in which order, and what
//! happens when a phase fails.

mod common;

use common::mocks::{Harness, MockLLMClient, MockVectorStore};
use docchat::chain::prompt::{fallback_instruction, PromptTemplate, DEFAULT_CONTACT_EMAIL};
use docchat::chain::{ChainState, ChainTrace, ChatSession, ConversationChain};
use docchat::rag::Retriever;
use docchat::types::{AppError, MessageRole};
use std::sync::Arc;
use std::time::Duration;

fn build_chain(harness: &Harness, k: usize) -> ConversationChain {
    let retriever = Retriever::new(harness.embedder.clone(), harness.store.clone(), k);
    ConversationChain::with_default_templates(harness.llm.clone(), retriever, DEFAULT_CONTACT_EMAIL)
        .expect("default templates are valid")
}

// ============= Data Flow =============

#[tokio::test]
async fn test_synthesis_prompt_uses_context_and_original_question() {
    let harness = Harness::new(MockLLMClient::new(&[
        "What is Scrimba?",
        "Scrimba is an interactive coding platform!",
    ]));
    harness.seed(&["Scrimba is a coding platform."]).await;
    let chain = build_chain(&harness, 1);

    let output = chain.invoke("What is it?").await.unwrap();

    assert_eq!(output.answer, "Scrimba is an interactive coding platform!");
    assert_eq!(output.standalone_question, "What is Scrimba?");
    assert_eq!(output.context, "Scrimba is a coding platform.");
    assert_eq!(harness.llm.call_count(), 2);

    let rewrite_prompt = harness.llm.prompt(0);
    assert!(rewrite_prompt.contains("question: What is it?"));

    let synthesis_prompt = harness.llm.prompt(1);
    assert!(synthesis_prompt.contains("context: Scrimba is a coding platform."));
    assert!(synthesis_prompt.contains("question: What is it?"));
    assert!(!synthesis_prompt.contains("What is Scrimba?"));
}

#[tokio::test]
async fn test_synthesis_prompt_carries_fallback_instruction() {
    let harness = Harness::new(MockLLMClient::new(&[
        "What is the capital of France?",
        "I'm sorry, I don't know the answer to that.",
    ]));
    harness.seed(&["Scrimba offers a Pro plan with unlimited courses."]).await;
    let chain = build_chain(&harness, 1);

    chain
        .submit_question("What is the capital of France?")
        .await
        .unwrap();

    let synthesis_prompt = harness.llm.prompt(1);
    assert!(synthesis_prompt.contains(&fallback_instruction(DEFAULT_CONTACT_EMAIL)));
    assert!(synthesis_prompt.contains(DEFAULT_CONTACT_EMAIL));
}

#[tokio::test]
async fn test_context_joins_chunks_with_blank_line_in_rank_order() {
    let harness = Harness::new(MockLLMClient::new(&["scrimba courses", "answer"]));
    harness
        .seed(&[
            "Scrimba courses are interactive.",
            "Pricing starts at zero.",
            "Scrimba courses include javascript.",
        ])
        .await;
    let chain = build_chain(&harness, 2);

    let output = chain.invoke("Tell me about the courses").await.unwrap();

    assert_eq!(output.sources.len(), 2);
    assert!(output.sources[0].score >= output.sources[1].score);
    assert_eq!(
        output.context,
        format!("{}\n\n{}", output.sources[0].text, output.sources[1].text)
    );
    assert!(harness.llm.prompt(1).contains(&output.context));
}

#[tokio::test]
async fn test_rewrite_output_is_trimmed() {
    let harness = Harness::new(MockLLMClient::new(&["  What is Scrimba?\n", "answer"]));
    harness.seed(&["Scrimba is a coding platform."]).await;
    let chain = build_chain(&harness, 1);

    let output = chain.invoke("What is it?").await.unwrap();
    assert_eq!(output.standalone_question, "What is Scrimba?");
}

#[tokio::test]
async fn test_empty_store_still_answers_with_empty_context() {
    let harness = Harness::new(MockLLMClient::new(&["What is Scrimba?", "I'm sorry"]));
    let chain = build_chain(&harness, 4);

    let output = chain.invoke("What is it?").await.unwrap();
    assert!(output.sources.is_empty());
    assert_eq!(output.context, "");
    assert_eq!(harness.llm.call_count(), 2);
}

// ============= State Machine =============

#[tokio::test]
async fn test_successful_trace_visits_every_phase_in_order() {
    let harness = Harness::new(MockLLMClient::new(&["What is Scrimba?", "answer"]));
    harness.seed(&["Scrimba is a coding platform."]).await;
    let chain = build_chain(&harness, 1);

    let output = chain.invoke("What is it?").await.unwrap();

    assert_eq!(
        output.trace.states(),
        &[
            ChainState::Idle,
            ChainState::Rewriting,
            ChainState::Retrieving,
            ChainState::PassthroughHeld,
            ChainState::Synthesizing,
            ChainState::Done,
        ]
    );
}

#[tokio::test]
async fn test_rewrite_failure_stops_before_retrieval() {
    let harness = Harness::new(MockLLMClient::failing());
    harness.seed(&["Scrimba is a coding platform."]).await;
    let chain = build_chain(&harness, 1);
    let embed_calls_after_seed = harness.embedder.call_count();

    let mut trace = ChainTrace::new();
    let err = chain
        .invoke_traced("What is it?", &mut trace)
        .await
        .unwrap_err();

    assert!(matches!(err, AppError::Generation(_)));
    assert_eq!(harness.llm.call_count(), 1);
    assert_eq!(harness.store.search_calls(), 0);
    assert_eq!(harness.embedder.call_count(), embed_calls_after_seed);
    assert_eq!(
        trace.states(),
        &[ChainState::Idle, ChainState::Rewriting, ChainState::Failed]
    );
}

#[tokio::test]
async fn test_retrieval_failure_skips_synthesis() {
    let harness = Harness::with_store(
        MockLLMClient::new(&["What is Scrimba?", "never sent"]),
        MockVectorStore::failing_queries(),
    );
    let chain = build_chain(&harness, 1);

    let mut trace = ChainTrace::new();
    let err = chain
        .invoke_traced("What is it?", &mut trace)
        .await
        .unwrap_err();

    assert!(matches!(err, AppError::StoreQuery(_)));
    assert_eq!(harness.llm.call_count(), 1);
    assert!(trace.visited(ChainState::Retrieving));
    assert!(!trace.visited(ChainState::Synthesizing));
    assert_eq!(trace.current(), ChainState::Failed);
}

#[tokio::test]
async fn test_blank_question_rejected_without_provider_calls() {
    let harness = Harness::new(MockLLMClient::new(&["unused"]));
    let chain = build_chain(&harness, 1);

    let err = chain.submit_question("   ").await.unwrap_err();
    assert!(matches!(err, AppError::InvalidInput(_)));
    assert_eq!(harness.llm.call_count(), 0);
}

#[tokio::test]
async fn test_slow_provider_times_out_at_rewrite() {
    let harness = Harness::new(
        MockLLMClient::new(&["What is Scrimba?"]).with_delay(Duration::from_millis(500)),
    );
    let chain = build_chain(&harness, 1).with_request_timeout(Duration::from_millis(50));

    let err = chain.submit_question("What is it?").await.unwrap_err();
    match err {
        AppError::Timeout { stage } => assert_eq!(stage, "rewrite"),
        other => panic!("Expected timeout, got {:?}", other),
    }
    assert_eq!(harness.store.search_calls(), 0);
}

#[tokio::test]
async fn test_concurrent_invocations_are_independent() {
    let harness = Harness::new(MockLLMClient::new(&["Scrimba platform"]));
    harness.seed(&["Scrimba is a coding platform."]).await;
    let chain = Arc::new(build_chain(&harness, 1));

    let questions = ["What is it?", "Who runs it?", "Is it free?", "Where is it?"];
    let results = futures::future::join_all(questions.iter().map(|q| {
        let chain = chain.clone();
        async move { chain.invoke(q).await }
    }))
    .await;

    assert_eq!(harness.llm.call_count(), questions.len() * 2);
    for (question, result) in questions.iter().zip(results) {
        let output = result.unwrap();
        assert_eq!(output.context, "Scrimba is a coding platform.");
        assert!(harness
            .llm
            .prompts()
            .iter()
            .any(|p| p.contains(&format!("question: {}", question)) && p.contains("context:")));
    }
}

// ============= Templates =============

#[tokio::test]
async fn test_custom_templates_are_used() {
    let harness = Harness::new(MockLLMClient::new(&["standalone", "answer"]));
    harness.seed(&["Scrimba is a coding platform."]).await;
    let retriever = Retriever::new(harness.embedder.clone(), harness.store.clone(), 1);
    let chain = ConversationChain::new(
        harness.llm.clone(),
        retriever,
        PromptTemplate::new("Rephrase: {question}").unwrap(),
        PromptTemplate::new("Docs:\n{context}\nQ: {question}").unwrap(),
    )
    .unwrap();

    chain.submit_question("What is it?").await.unwrap();

    assert_eq!(harness.llm.prompt(0), "Rephrase: What is it?");
    assert_eq!(
        harness.llm.prompt(1),
        "Docs:\nScrimba is a coding platform.\nQ: What is it?"
    );
}

#[test]
fn test_template_with_unknown_placeholder_is_rejected() {
    let harness = Harness::new(MockLLMClient::new(&[]));
    let retriever = Retriever::new(harness.embedder.clone(), harness.store.clone(), 1);
    let result = ConversationChain::new(
        harness.llm.clone(),
        retriever,
        PromptTemplate::new("{question}").unwrap(),
        PromptTemplate::new("{context} {question} {history}").unwrap(),
    );
    assert!(matches!(result, Err(AppError::Configuration(_))));
}

// ============= Chat Session =============

#[tokio::test]
async fn test_session_appends_both_turns_on_success() {
    let harness = Harness::new(MockLLMClient::new(&["What is Scrimba?", "A coding platform."]));
    harness.seed(&["Scrimba is a coding platform."]).await;
    let mut session = ChatSession::new(Arc::new(build_chain(&harness, 1)));

    let answer = session.submit("What is it?").await.unwrap();

    assert_eq!(answer, "A coding platform.");
    let transcript = session.transcript();
    assert_eq!(transcript.len(), 2);
    assert_eq!(transcript[0].role, MessageRole::User);
    assert_eq!(transcript[0].content, "What is it?");
    assert_eq!(transcript[1].role, MessageRole::Assistant);
    assert_eq!(transcript[1].content, "A coding platform.");
}

#[tokio::test]
async fn test_session_failure_leaves_transcript_untouched() {
    let harness = Harness::new(MockLLMClient::failing());
    let mut session = ChatSession::new(Arc::new(build_chain(&harness, 1)));

    assert!(session.submit("What is it?").await.is_err());
    assert!(session.transcript().is_empty());
}

#[tokio::test]
async fn test_session_cancel_before_start() {
    let harness = Harness::new(MockLLMClient::new(&["unused"]));
    let mut session = ChatSession::new(Arc::new(build_chain(&harness, 1)));

    let err = session
        .submit_until("What is it?", async {})
        .await
        .unwrap_err();

    assert!(matches!(err, AppError::Cancelled));
    assert_eq!(harness.llm.call_count(), 0);
    assert!(session.transcript().is_empty());
}

#[tokio::test]
async fn test_session_cancel_in_flight_then_recover() {
    let harness = Harness::new(
        MockLLMClient::new(&["What is Scrimba?", "A coding platform."])
            .with_delay(Duration::from_millis(300)),
    );
    harness.seed(&["Scrimba is a coding platform."]).await;
    let mut session = ChatSession::new(Arc::new(build_chain(&harness, 1)));

    let err = session
        .submit_until(
            "What is it?",
            tokio::time::sleep(Duration::from_millis(20)),
        )
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::Cancelled));
    assert!(session.transcript().is_empty());
    assert_eq!(harness.store.search_calls(), 0);

    let answer = session
        .submit_until("What is it?", std::future::pending::<()>())
        .await
        .unwrap();
    assert_eq!(session.transcript().len(), 2);
    assert!(!answer.is_empty());
}
