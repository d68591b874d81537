#![expect(
    clippy::tests_outside_test_module,
    reason = "integration tests are only compiled in test mode"
)]

//! End-to-end question answering: document on disk, corpus build, the
//! retrieval tool served over an in-memory pipe, and a scripted language model.

use async_trait::async_trait;
use serde_json::json;
use std::collections::VecDeque;
use std::fs;
use std::sync::{Arc, Mutex};
use tax_law_agent::commands::{build_corpus, run_chat};
use tax_law_agent::config::Config;
use tax_law_agent::document::{DocumentSource, PlainTextFile};
use tax_law_agent::embeddings::{Embedder, Embedding, EmbeddingError};
use tax_law_agent::llm::{InferenceError, LanguageModel};
use tax_law_agent::mcp::{AskTaxQuestionHandler, McpClient, McpServer, SERVER_NAME};
use tax_law_agent::orchestrator::Orchestrator;
use tax_law_agent::session::{Session, client_info};
use tempfile::TempDir;

const PARAGRAPHS: [&str; 4] = [
    "Section 83. A penalty applies to every late return filed by a taxpayer.",
    "Section 47. The Commissioner shall refund any overpaid tax with interest.",
    "Section 51. A taxpayer may lodge an appeal against an objection decision.",
    "Section 23. Every person shall keep records for a period of five years.",
];

const KEYWORDS: [&str; 4] = ["penalt", "refund", "appeal", "records"];

/// One dimension per keyword, set when the text mentions it
struct KeywordEmbedder;

impl Embedder for KeywordEmbedder {
    fn embed(&self, texts: &[String]) -> Result<Vec<Embedding>, EmbeddingError> {
        Ok(texts
            .iter()
            .map(|text| {
                let text = text.to_lowercase();
                KEYWORDS
                    .iter()
                    .map(|k| if text.contains(k) { 1.0 } else { 0.0 })
                    .collect()
            })
            .collect())
    }

    fn dimension(&self) -> Option<usize> {
        Some(KEYWORDS.len())
    }
}

/// Replays canned completions and records every prompt it receives
struct ScriptedModel {
    replies: Mutex<VecDeque<String>>,
    prompts: Arc<Mutex<Vec<String>>>,
}

#[async_trait]
impl LanguageModel for ScriptedModel {
    async fn complete(&self, prompt: &str) -> Result<String, InferenceError> {
        self.prompts
            .lock()
            .expect("prompt lock")
            .push(prompt.to_string());
        self.replies
            .lock()
            .expect("reply lock")
            .pop_front()
            .ok_or(InferenceError::EmptyOutput)
    }
}

fn scripted(replies: &[&str]) -> (Orchestrator, Arc<Mutex<Vec<String>>>) {
    let prompts = Arc::new(Mutex::new(Vec::new()));
    let model = ScriptedModel {
        replies: Mutex::new(replies.iter().map(|r| r.to_string()).collect()),
        prompts: Arc::clone(&prompts),
    };
    (Orchestrator::new(Box::new(model)), prompts)
}

fn selection(question: &str) -> String {
    json!({"tool": "ask_tax_question", "arguments": {"question": question}}).to_string()
}

/// Index a document written to a temporary config directory and connect a
/// session to a tool server holding it
async fn connected_session() -> (TempDir, Session) {
    let temp_dir = TempDir::new().expect("Failed to create temp directory");
    fs::write(
        temp_dir.path().join("config.toml"),
        "[document]\npath = \"act.txt\"\n\n[chunking]\nchunk_size = 80\noverlap = 0\n",
    )
    .expect("Failed to write config");
    fs::write(temp_dir.path().join("act.txt"), PARAGRAPHS.join("\n\n"))
        .expect("Failed to write document");

    let config = Config::load(temp_dir.path()).expect("config should load");
    let text = PlainTextFile::new(config.document_path())
        .extract_text()
        .expect("document should be readable");
    let embedder: Arc<dyn Embedder> = Arc::new(KeywordEmbedder);
    let corpus = build_corpus(text, &config, Arc::clone(&embedder))
        .await
        .expect("corpus should build");
    assert_eq!(corpus.len(), PARAGRAPHS.len());

    let server = McpServer::new(SERVER_NAME.to_string(), "test".to_string())
        .expect("server should build");
    server
        .register_tool(
            AskTaxQuestionHandler::tool_definition(),
            AskTaxQuestionHandler::new(Arc::new(corpus), embedder),
        )
        .await
        .expect("tool should register");

    let (client_io, server_io) = tokio::io::duplex(64 * 1024);
    let (server_read, server_write) = tokio::io::split(server_io);
    tokio::spawn(Arc::new(server).serve(server_read, server_write));
    let (client_read, client_write) = tokio::io::split(client_io);
    let client =
        McpClient::new(client_read, client_write, client_info()).expect("client should build");

    let session = Session::connect(client).await.expect("should connect");
    (temp_dir, session)
}

#[tokio::test]
async fn answers_from_retrieved_context() {
    let (_temp_dir, mut session) = connected_session().await;
    let (orchestrator, prompts) = scripted(&[
        selection("When is overpaid tax refunded?").as_str(),
        "  The Commissioner refunds overpaid tax with interest.\n",
    ]);

    let answer = orchestrator
        .process_query(&mut session, "When is overpaid tax refunded?")
        .await
        .expect("query should succeed");
    session.close().await.expect("close should succeed");

    assert_eq!(answer, "The Commissioner refunds overpaid tax with interest.");

    let prompts = prompts.lock().expect("prompt lock");
    assert_eq!(prompts.len(), 2);
    assert!(prompts[0].contains(
        "ask_tax_question: Search Tax Procedures Act PDF for a given question."
    ));

    // The refund paragraph is the nearest chunk, so it leads the context
    let context_start = prompts[1]
        .find(PARAGRAPHS[1])
        .expect("final prompt should carry the refund paragraph");
    for other in [PARAGRAPHS[0], PARAGRAPHS[2], PARAGRAPHS[3]] {
        if let Some(position) = prompts[1].find(other) {
            assert!(position > context_start);
        }
    }
}

#[tokio::test]
async fn unknown_tool_is_answered_with_a_message() {
    let (_temp_dir, mut session) = connected_session().await;
    let (orchestrator, prompts) = scripted(&[
        r#"{"tool": "lookup_weather", "arguments": {"city": "Nairobi"}}"#,
    ]);

    let answer = orchestrator
        .process_query(&mut session, "Will it rain in Nairobi?")
        .await
        .expect("unknown tools are recovered");
    session.close().await.expect("close should succeed");

    assert!(answer.contains("unknown tool"), "{answer}");
    assert_eq!(prompts.lock().expect("prompt lock").len(), 1);
}

#[tokio::test]
async fn chat_loop_answers_until_quit() {
    let (_temp_dir, mut session) = connected_session().await;
    let (orchestrator, prompts) = scripted(&[
        selection("Can I appeal?").as_str(),
        "Yes, against an objection decision.",
        "not json",
    ]);

    let input: &[u8] = b"Can I appeal?\n\n   \nWhat about penalties?\nquit\nNever asked\n";
    let mut output = Vec::new();
    run_chat(&orchestrator, &mut session, input, &mut output)
        .await
        .expect("chat should finish");
    session.close().await.expect("close should succeed");

    let output = String::from_utf8(output).expect("utf-8 output");
    let answers: Vec<&str> = output.split("\n\n").filter(|a| !a.is_empty()).collect();
    assert_eq!(answers.len(), 2);
    assert_eq!(answers[0], "Yes, against an objection decision.");
    assert!(answers[1].starts_with("Error:"), "{}", answers[1]);

    let prompts = prompts.lock().expect("prompt lock");
    assert_eq!(prompts.len(), 3);
    assert!(prompts[1].contains(PARAGRAPHS[2]));
    assert!(!prompts.iter().any(|p| p.contains("Never asked")));
}

#[tokio::test]
async fn closed_session_cannot_answer() {
    let (_temp_dir, mut session) = connected_session().await;
    session.close().await.expect("close should succeed");
    session.close().await.expect("second close is a no-op");

    let (orchestrator, prompts) = scripted(&[selection("penalties").as_str()]);
    let result = orchestrator.process_query(&mut session, "penalties").await;

    assert!(result.is_err());
    assert!(prompts.lock().expect("prompt lock").is_empty());
}
