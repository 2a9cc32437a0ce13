//! Ollama-style inference client.
//!
//! Three operations against the local model server: a readiness probe, a
//! single non-streaming generation, and a model metadata lookup. Each call
//! builds its own HTTP client and drops it before returning, so no
//! connection outlives the call that opened it.

use reqwest::Client as HttpClient;
use tracing::{Instrument, Span};

use super::config::BackendConfig;
use super::errors::GenerationError;
use super::types::{
    GenerateBody, GenerateOptions, GenerateReply, GenerationRequest, GenerationResult, ModelInfo,
    ShowBody, TagsReply,
};

// ─── InferenceClient ─────────────────────────────────────────────────────────

/// Client for the local inference backend.
///
/// Holds only immutable configuration and a logging span, so one instance
/// can be shared (e.g. behind an `Arc`) by any number of concurrent callers.
#[derive(Debug, Clone)]
pub struct InferenceClient {
    config: BackendConfig,
    /// Every operation runs inside this span. Callers pick it via
    /// [`InferenceClient::with_span`].
    span: Span,
}

impl InferenceClient {
    /// Create a client logging under an `inference_client` span that carries
    /// the model name and backend URL.
    pub fn new(config: BackendConfig) -> Self {
        let span = tracing::info_span!(
            "inference_client",
            model = %config.model_name,
            backend = %config.base_url,
        );
        Self::with_span(config, span)
    }

    /// Create a client whose log events are emitted inside `span`.
    pub fn with_span(mut config: BackendConfig, span: Span) -> Self {
        let trimmed_len = config.base_url.trim_end_matches('/').len();
        config.base_url.truncate(trimmed_len);
        Self { config, span }
    }

    pub fn config(&self) -> &BackendConfig {
        &self.config
    }

    /// The model tag this client targets.
    pub fn model_name(&self) -> &str {
        &self.config.model_name
    }

    // ─── Health Check ────────────────────────────────────────────────────

    /// Check that the backend is reachable and has the configured model.
    ///
    /// Never fails: transport errors, timeouts, non-2xx statuses and
    /// malformed bodies are logged and reported as `false`.
    pub async fn check_health(&self) -> bool {
        self.probe_readiness().instrument(self.span.clone()).await
    }

    async fn probe_readiness(&self) -> bool {
        let url = self.config.endpoint("/api/tags");

        match self.fetch_tags(&url).await {
            Ok(tags) => {
                let loaded = tags.contains(&self.config.model_name);
                if !loaded {
                    tracing::warn!(url = %url, "backend is up but the model is not loaded");
                }
                loaded
            }
            Err(reason) => {
                tracing::warn!(url = %url, reason = %reason, "health check failed");
                false
            }
        }
    }

    async fn fetch_tags(&self, url: &str) -> Result<TagsReply, String> {
        let http = HttpClient::builder()
            .timeout(self.config.readiness_timeout())
            .build()
            .map_err(|e| format!("HTTP client error: {e}"))?;

        let response = http
            .get(url)
            .send()
            .await
            .map_err(|e| format!("cannot reach backend: {e}"))?;

        if !response.status().is_success() {
            return Err(format!("backend returned status: {}", response.status()));
        }

        response
            .json::<TagsReply>()
            .await
            .map_err(|e| format!("failed to parse model list: {e}"))
    }

    // ─── Generation ──────────────────────────────────────────────────────

    /// Run one non-streaming generation.
    ///
    /// Exactly one request is made. On 2xx the backend's `response` text is
    /// returned verbatim, or the configured fallback text if the field is
    /// missing.
    pub async fn generate(
        &self,
        request: &GenerationRequest,
    ) -> Result<GenerationResult, GenerationError> {
        async {
            let result = self.send_generate(request).await;
            if let Err(e) = &result {
                tracing::error!(error = %e, "generation failed");
            }
            result
        }
        .instrument(self.span.clone())
        .await
    }

    async fn send_generate(
        &self,
        request: &GenerationRequest,
    ) -> Result<GenerationResult, GenerationError> {
        let url = self.config.endpoint("/api/generate");
        let timeout_ms = self.config.generation_timeout_ms;

        let body = GenerateBody {
            model: &self.config.model_name,
            prompt: &request.prompt,
            stream: false,
            options: GenerateOptions {
                num_predict: request.max_tokens,
                temperature: request.temperature,
            },
        };

        // Prompt text is not logged, only its size.
        tracing::info!(
            url = %url,
            prompt_chars = request.prompt.chars().count(),
            max_tokens = request.max_tokens,
            temperature = request.temperature,
            timeout_ms,
            "=== GENERATE REQUEST ==="
        );

        let http = HttpClient::builder()
            .timeout(self.config.generation_timeout())
            .build()
            .map_err(|e| GenerationError::TransportFailure {
                detail: format!("failed to build HTTP client: {e}"),
            })?;

        let response = http
            .post(&url)
            .json(&body)
            .send()
            .await
            .map_err(|e| GenerationError::from_reqwest(e, timeout_ms))?;

        let status = response.status();
        if !status.is_success() {
            // A stalled error body still counts against the timeout.
            let body_text = response
                .text()
                .await
                .map_err(|e| GenerationError::from_reqwest(e, timeout_ms))?;
            return Err(GenerationError::BackendRejected {
                status: status.as_u16(),
                body: body_text,
            });
        }

        let reply: GenerateReply = response
            .json()
            .await
            .map_err(|e| GenerationError::from_reqwest(e, timeout_ms))?;

        let text = match reply.response {
            Some(text) => text,
            None => {
                tracing::warn!("generate reply has no `response` field, using fallback text");
                self.config.fallback_text.clone()
            }
        };

        tracing::info!(response_chars = text.chars().count(), "=== GENERATE RESPONSE ===");

        Ok(GenerationResult { text })
    }

    // ─── Model Info ──────────────────────────────────────────────────────

    /// Fetch the backend's metadata for the configured model.
    ///
    /// Never fails: any problem is logged and returned as
    /// [`ModelInfo::Unavailable`].
    pub async fn get_model_info(&self) -> ModelInfo {
        async {
            let url = self.config.endpoint("/api/show");
            match self.fetch_show(&url).await {
                Ok(metadata) => ModelInfo::Metadata(metadata),
                Err(reason) => {
                    tracing::error!(url = %url, reason = %reason, "failed to get model info");
                    ModelInfo::unavailable(reason)
                }
            }
        }
        .instrument(self.span.clone())
        .await
    }

    async fn fetch_show(&self, url: &str) -> Result<serde_json::Value, String> {
        // No request timeout here; only the transport defaults apply.
        let http = HttpClient::builder()
            .build()
            .map_err(|e| format!("HTTP client error: {e}"))?;

        let response = http
            .post(url)
            .json(&ShowBody {
                name: &self.config.model_name,
            })
            .send()
            .await
            .map_err(|e| e.to_string())?;

        let status = response.status();
        if !status.is_success() {
            return Err(format!(
                "could not retrieve model info (HTTP {})",
                status.as_u16()
            ));
        }

        response
            .json::<serde_json::Value>()
            .await
            .map_err(|e| format!("failed to parse model info: {e}"))
    }
}

// ─── Tests ───────────────────────────────────────────────────────────────────
