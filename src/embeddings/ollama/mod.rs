#[cfg(test)]
mod tests;

use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, error, info, warn};
use url::Url;

use super::{Embedder, Embedding, EmbeddingError, check_dimensions};
use crate::config::{ConfigError, OllamaConfig};

/// Dimension of the default `all-minilm` embedding model
pub const DEFAULT_EMBEDDING_DIMENSION: u32 = 384;

const DEFAULT_TIMEOUT_SECONDS: u64 = 30;
const EXPONENTIAL_BACKOFF_BASE: u64 = 2;

#[derive(Debug, Clone)]
pub struct OllamaClient {
    base_url: Url,
    model: String,
    batch_size: u32,
    dimension: Option<usize>,
    agent: ureq::Agent,
    retry_attempts: u32,
}

#[derive(Debug, Serialize)]
struct EmbedRequest<'a> {
    model: &'a str,
    input: &'a [String],
}

#[derive(Debug, Deserialize)]
struct EmbedResponse {
    embeddings: Vec<Vec<f32>>,
}

#[derive(Debug, Deserialize)]
pub struct ModelInfo {
    pub name: String,
    pub size: Option<u64>,
    pub digest: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ModelsResponse {
    models: Vec<ModelInfo>,
}

impl OllamaClient {
    #[inline]
    pub fn new(config: &OllamaConfig) -> Result<Self, ConfigError> {
        let base_url = config.ollama_url()?;

        let agent = ureq::Agent::config_builder()
            .timeout_global(Some(Duration::from_secs(DEFAULT_TIMEOUT_SECONDS)))
            .build()
            .into();

        Ok(Self {
            base_url,
            model: config.embedding_model.clone(),
            batch_size: config.batch_size.max(1),
            dimension: Some(config.embedding_dimension as usize),
            agent,
            retry_attempts: config.retry_attempts.max(1),
        })
    }

    #[inline]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.agent = ureq::Agent::config_builder()
            .timeout_global(Some(timeout))
            .build()
            .into();
        self
    }

    #[inline]
    pub fn with_retry_attempts(mut self, attempts: u32) -> Self {
        self.retry_attempts = attempts.max(1);
        self
    }

    /// Accept whatever dimension the model produces instead of the configured one
    #[inline]
    pub fn with_any_dimension(mut self) -> Self {
        self.dimension = None;
        self
    }

    #[inline]
    pub fn model(&self) -> &str {
        &self.model
    }

    /// Test connection to Ollama server and verify model availability
    #[inline]
    pub fn health_check(&self) -> Result<(), EmbeddingError> {
        debug!("Performing health check for Ollama at {}", self.base_url);

        let models = self.list_models()?;
        if !models.iter().any(|m| self.is_configured_model(&m.name)) {
            let available: Vec<&str> = models.iter().map(|m| m.name.as_str()).collect();
            warn!(
                "Model {} not found. Available models: {:?}",
                self.model, available
            );
            return Err(EmbeddingError::Unavailable(format!(
                "model '{}' is not available. Available models: {:?}",
                self.model, available
            )));
        }

        info!(
            "Health check passed for Ollama server at {} with model {}",
            self.base_url, self.model
        );
        Ok(())
    }

    /// List all available models
    #[inline]
    pub fn list_models(&self) -> Result<Vec<ModelInfo>, EmbeddingError> {
        let url = self.endpoint("/api/tags")?;
        debug!("Fetching available models from {}", url);

        let response_text = self.make_request_with_retry(self.retry_attempts, || {
            self.agent
                .get(url.as_str())
                .call()
                .and_then(|mut resp| resp.body_mut().read_to_string())
        })?;

        let models_response: ModelsResponse = serde_json::from_str(&response_text)
            .map_err(|e| EmbeddingError::MalformedResponse(e.to_string()))?;

        debug!("Found {} models", models_response.models.len());
        Ok(models_response.models)
    }

    fn is_configured_model(&self, name: &str) -> bool {
        name == self.model
            || (!self.model.contains(':') && name.strip_suffix(":latest") == Some(self.model.as_str()))
    }

    fn endpoint(&self, path: &str) -> Result<Url, EmbeddingError> {
        self.base_url
            .join(path)
            .map_err(|e| EmbeddingError::Unavailable(format!("invalid endpoint {path}: {e}")))
    }

    /// Embed texts in batches of `batch_size`
    fn embed_batched(
        &self,
        texts: &[String],
        attempts: u32,
    ) -> Result<Vec<Embedding>, EmbeddingError> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }

        debug!("Generating embeddings for {} texts", texts.len());

        let mut results = Vec::with_capacity(texts.len());
        for batch in texts.chunks(self.batch_size as usize) {
            results.extend(self.embed_single_batch(batch, attempts)?);
        }

        let dimension = check_dimensions(&results, self.dimension)?;
        debug!(
            "Generated {} embeddings with {} dimensions",
            results.len(),
            dimension
        );
        Ok(results)
    }

    fn embed_single_batch(
        &self,
        texts: &[String],
        attempts: u32,
    ) -> Result<Vec<Embedding>, EmbeddingError> {
        let url = self.endpoint("/api/embed")?;
        let request = EmbedRequest {
            model: &self.model,
            input: texts,
        };
        let request_json = serde_json::to_string(&request)
            .map_err(|e| EmbeddingError::MalformedResponse(e.to_string()))?;

        let response_text = self.make_request_with_retry(attempts, || {
            self.agent
                .post(url.as_str())
                .header("Content-Type", "application/json")
                .send(&request_json)
                .and_then(|mut resp| resp.body_mut().read_to_string())
        })?;

        let response: EmbedResponse = serde_json::from_str(&response_text)
            .map_err(|e| EmbeddingError::MalformedResponse(e.to_string()))?;

        if response.embeddings.len() != texts.len() {
            return Err(EmbeddingError::CountMismatch {
                expected: texts.len(),
                actual: response.embeddings.len(),
            });
        }

        Ok(response.embeddings)
    }

    fn make_request_with_retry<F>(
        &self,
        attempts: u32,
        mut request_fn: F,
    ) -> Result<String, EmbeddingError>
    where
        F: FnMut() -> Result<String, ureq::Error>,
    {
        let mut last_error = None;

        for attempt in 1..=attempts {
            debug!("HTTP request attempt {}/{}", attempt, attempts);

            match request_fn() {
                Ok(response_text) => return Ok(response_text),
                Err(ureq::Error::StatusCode(status)) if status < 500 => {
                    warn!("Client error (status {}), not retrying", status);
                    return Err(EmbeddingError::Rejected(format!("HTTP {}", status)));
                }
                Err(
                    error @ (ureq::Error::StatusCode(_)
                    | ureq::Error::ConnectionFailed
                    | ureq::Error::HostNotFound
                    | ureq::Error::Timeout(_)
                    | ureq::Error::Io(_)),
                ) => {
                    warn!(
                        "Request to {} failed: {}, attempt {}/{}",
                        self.base_url, error, attempt, attempts
                    );
                    last_error = Some(EmbeddingError::Unavailable(error.to_string()));

                    if attempt < attempts {
                        let delay =
                            Duration::from_millis(EXPONENTIAL_BACKOFF_BASE.pow(attempt - 1) * 1000);
                        debug!("Waiting {:?} before retry", delay);
                        std::thread::sleep(delay);
                    }
                }
                Err(error) => {
                    warn!("Non-retryable error: {}", error);
                    return Err(EmbeddingError::Unavailable(error.to_string()));
                }
            }
        }

        error!("All retry attempts failed for request to {}", self.base_url);
        Err(last_error
            .unwrap_or_else(|| EmbeddingError::Unavailable("request failed".to_string())))
    }
}

impl Embedder for OllamaClient {
    #[inline]
    fn embed(&self, texts: &[String]) -> Result<Vec<Embedding>, EmbeddingError> {
        self.embed_batched(texts, self.retry_attempts)
    }

    /// Single attempt: a failed query embedding is reported, never papered over
    #[inline]
    fn embed_query(&self, text: &str) -> Result<Embedding, EmbeddingError> {
        let mut embeddings = self.embed_batched(&[text.to_string()], 1)?;
        embeddings
            .pop()
            .ok_or(EmbeddingError::CountMismatch {
                expected: 1,
                actual: 0,
            })
    }

    #[inline]
    fn dimension(&self) -> Option<usize> {
        self.dimension
    }
}
