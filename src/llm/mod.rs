#[cfg(test)]
mod tests;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::process::Stdio;
use std::time::Duration;
use thiserror::Error;
use tokio::io::AsyncWriteExt;
use tokio::process::Command;
use tracing::{debug, warn};
use url::Url;

use crate::config::{Config, ConfigError, LlmBackend};

/// Generation can take minutes on a CPU-only host
const GENERATE_TIMEOUT_SECONDS: u64 = 600;

#[derive(Debug, Error)]
pub enum InferenceError {
    #[error("failed to start `{command}`: {source}")]
    Spawn {
        command: String,
        source: std::io::Error,
    },

    #[error("model process I/O failed: {0}")]
    Io(#[from] std::io::Error),

    #[error("model process exited with status {code:?}: {stderr}")]
    ExitStatus { code: Option<i32>, stderr: String },

    #[error("model produced no output")]
    EmptyOutput,

    #[error("generate request failed: {0}")]
    Http(String),

    #[error("malformed generate response: {0}")]
    MalformedResponse(String),

    #[error("inference task failed: {0}")]
    Task(String),
}

/// Black-box text completion: one prompt in, one completion out
#[async_trait]
pub trait LanguageModel: Send + Sync {
    async fn complete(&self, prompt: &str) -> Result<String, InferenceError>;
}

/// Runs the model as a child process, prompt on stdin, completion on stdout
#[derive(Debug, Clone)]
pub struct OllamaCli {
    program: String,
    args: Vec<String>,
}

impl OllamaCli {
    /// `<command> run <model>`
    #[inline]
    pub fn new(command: impl Into<String>, model: impl Into<String>) -> Self {
        Self {
            program: command.into(),
            args: vec!["run".to_string(), model.into()],
        }
    }

    /// Run an arbitrary program with `args` in place of `ollama run`
    #[inline]
    pub fn with_args(program: impl Into<String>, args: Vec<String>) -> Self {
        Self {
            program: program.into(),
            args,
        }
    }
}

#[async_trait]
impl LanguageModel for OllamaCli {
    #[inline]
    async fn complete(&self, prompt: &str) -> Result<String, InferenceError> {
        debug!("Running {} {:?}", self.program, self.args);
        let mut child = Command::new(&self.program)
            .args(&self.args)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|source| InferenceError::Spawn {
                command: self.program.clone(),
                source,
            })?;

        // Feed stdin while the output is drained so a large prompt cannot deadlock
        let stdin = child.stdin.take();
        let input = prompt.as_bytes().to_vec();
        let writer = tokio::spawn(async move {
            if let Some(mut stdin) = stdin {
                stdin.write_all(&input).await?;
                stdin.shutdown().await?;
            }
            Ok::<_, std::io::Error>(())
        });

        let output = child.wait_with_output().await?;
        match writer.await {
            Ok(Ok(())) => {}
            // The model may exit before reading everything; its status says more
            Ok(Err(e)) => debug!("Writing prompt to model failed: {}", e),
            Err(e) => return Err(InferenceError::Task(e.to_string())),
        }

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();
            warn!("Model process failed: {}", stderr);
            return Err(InferenceError::ExitStatus {
                code: output.status.code(),
                stderr,
            });
        }

        let completion = String::from_utf8_lossy(&output.stdout).trim().to_string();
        if completion.is_empty() {
            return Err(InferenceError::EmptyOutput);
        }
        debug!("Model returned {} characters", completion.len());
        Ok(completion)
    }
}

#[derive(Debug, Serialize)]
struct GenerateRequest<'a> {
    model: &'a str,
    prompt: &'a str,
    stream: bool,
}

#[derive(Debug, Deserialize)]
struct GenerateResponse {
    response: String,
}

/// Calls `/api/generate` on an Ollama server without streaming
#[derive(Debug, Clone)]
pub struct OllamaGenerate {
    endpoint: Url,
    model: String,
    agent: ureq::Agent,
}

impl OllamaGenerate {
    #[inline]
    pub fn new(base_url: &Url, model: impl Into<String>) -> Result<Self, ConfigError> {
        let endpoint = base_url
            .join("/api/generate")
            .map_err(|e| ConfigError::InvalidUrl(e.to_string()))?;
        let agent = ureq::Agent::config_builder()
            .timeout_global(Some(Duration::from_secs(GENERATE_TIMEOUT_SECONDS)))
            .build()
            .into();

        Ok(Self {
            endpoint,
            model: model.into(),
            agent,
        })
    }

    fn generate(&self, prompt: &str) -> Result<String, InferenceError> {
        let request = GenerateRequest {
            model: &self.model,
            prompt,
            stream: false,
        };
        let body = serde_json::to_string(&request)
            .map_err(|e| InferenceError::MalformedResponse(e.to_string()))?;

        let text = self
            .agent
            .post(self.endpoint.as_str())
            .header("Content-Type", "application/json")
            .send(&body)
            .and_then(|mut resp| resp.body_mut().read_to_string())
            .map_err(|e| InferenceError::Http(e.to_string()))?;

        let response: GenerateResponse = serde_json::from_str(&text)
            .map_err(|e| InferenceError::MalformedResponse(e.to_string()))?;
        Ok(response.response)
    }
}

#[async_trait]
impl LanguageModel for OllamaGenerate {
    #[inline]
    async fn complete(&self, prompt: &str) -> Result<String, InferenceError> {
        let client = self.clone();
        let prompt = prompt.to_string();
        let completion = tokio::task::spawn_blocking(move || client.generate(&prompt))
            .await
            .map_err(|e| InferenceError::Task(e.to_string()))??;

        let completion = completion.trim().to_string();
        if completion.is_empty() {
            return Err(InferenceError::EmptyOutput);
        }
        Ok(completion)
    }
}

/// Build the language model selected by the `[llm]` section
#[inline]
pub fn from_config(config: &Config) -> Result<Box<dyn LanguageModel>, ConfigError> {
    config.llm.validate()?;
    match config.llm.backend {
        LlmBackend::Cli => Ok(Box::new(OllamaCli::new(
            config.llm.command.clone(),
            config.llm.model.clone(),
        ))),
        LlmBackend::Http => Ok(Box::new(OllamaGenerate::new(
            &config.ollama_url()?,
            config.llm.model.clone(),
        )?)),
    }
}
