use super::*;
use serde_json::json;
use wiremock::matchers::{body_partial_json, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn shell(script: &str) -> OllamaCli {
    OllamaCli::with_args("sh", vec!["-c".to_string(), script.to_string()])
}

#[tokio::test]
async fn cli_returns_trimmed_stdout() {
    let model = shell("cat");
    let completion = model
        .complete("  {\"tool\": \"ask_tax_question\"}\n\n")
        .await
        .expect("completion should succeed");
    assert_eq!(completion, "{\"tool\": \"ask_tax_question\"}");
}

#[tokio::test]
async fn cli_handles_large_prompts() {
    let prompt = "Section 37 of the Act. ".repeat(20_000);
    let completion = shell("wc -c")
        .complete(&prompt)
        .await
        .expect("completion should succeed");
    assert_eq!(completion, prompt.len().to_string());
}

#[tokio::test]
async fn cli_failure_carries_exit_code_and_stderr() {
    let error = shell("cat >/dev/null; echo 'model not found' >&2; exit 3")
        .complete("question")
        .await
        .expect_err("non-zero exit should fail");

    match error {
        InferenceError::ExitStatus { code, stderr } => {
            assert_eq!(code, Some(3));
            assert_eq!(stderr, "model not found");
        }
        other => panic!("unexpected error: {other}"),
    }
}

#[tokio::test]
async fn cli_empty_output_is_an_error() {
    let error = shell("cat >/dev/null; printf '  \\n'")
        .complete("question")
        .await
        .expect_err("blank output should fail");
    assert!(matches!(error, InferenceError::EmptyOutput));
}

#[tokio::test]
async fn cli_missing_program_fails_to_spawn() {
    let error = OllamaCli::new("/nonexistent/ollama", "llama3")
        .complete("question")
        .await
        .expect_err("missing binary should fail");
    assert!(matches!(error, InferenceError::Spawn { ref command, .. } if command == "/nonexistent/ollama"));
}

fn generate_client(server: &MockServer) -> OllamaGenerate {
    let base = Url::parse(&server.uri()).expect("mock server uri is a url");
    OllamaGenerate::new(&base, "llama3").expect("client should build")
}

#[tokio::test]
async fn generate_posts_prompt_without_streaming() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/generate"))
        .and(body_partial_json(json!({
            "model": "llama3",
            "prompt": "What is a tax decision?",
            "stream": false
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "model": "llama3",
            "response": "\nA tax decision is an assessment.\n",
            "done": true
        })))
        .expect(1)
        .mount(&server)
        .await;

    let completion = generate_client(&server)
        .complete("What is a tax decision?")
        .await
        .expect("completion should succeed");
    assert_eq!(completion, "A tax decision is an assessment.");
}

#[tokio::test]
async fn generate_reports_http_failure() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/generate"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;

    let error = generate_client(&server)
        .complete("question")
        .await
        .expect_err("server error should fail");
    assert!(matches!(error, InferenceError::Http(_)));
}

#[tokio::test]
async fn generate_rejects_blank_and_malformed_responses() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/generate"))
        .and(body_partial_json(json!({"prompt": "blank"})))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"response": "   "})))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/api/generate"))
        .and(body_partial_json(json!({"prompt": "garbled"})))
        .respond_with(ResponseTemplate::new(200).set_body_string("not json"))
        .mount(&server)
        .await;

    let client = generate_client(&server);
    assert!(matches!(
        client.complete("blank").await,
        Err(InferenceError::EmptyOutput)
    ));
    assert!(matches!(
        client.complete("garbled").await,
        Err(InferenceError::MalformedResponse(_))
    ));
}

#[test]
fn backend_selected_from_config() {
    let mut config = Config::default();
    assert!(from_config(&config).is_ok());

    config.llm.backend = LlmBackend::Http;
    config.llm.command = String::new();
    assert!(from_config(&config).is_ok());

    config.llm.model = " ".to_string();
    assert!(matches!(
        from_config(&config),
        Err(ConfigError::InvalidModel(_))
    ));
}
