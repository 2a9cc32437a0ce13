//! Request/response types for the Ollama-style backend API.

use serde::{Deserialize, Serialize};

/// Default token limit for a generation call.
pub const DEFAULT_MAX_TOKENS: u32 = 100;

/// Default sampling temperature for a generation call.
pub const DEFAULT_TEMPERATURE: f32 = 0.7;

// ─── Caller-facing types ─────────────────────────────────────────────────────

/// A single non-incremental generation request.
///
/// The prompt is passed through as-is; emptiness is not checked here.
#[derive(Debug, Clone, PartialEq)]
pub struct GenerationRequest {
    pub prompt: String,
    pub max_tokens: u32,
    pub temperature: f32,
}

impl GenerationRequest {
    /// Build a request with the default token limit and temperature.
    pub fn new(prompt: impl Into<String>) -> Self {
        Self {
            prompt: prompt.into(),
            max_tokens: DEFAULT_MAX_TOKENS,
            temperature: DEFAULT_TEMPERATURE,
        }
    }

    pub fn max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = max_tokens;
        self
    }

    pub fn temperature(mut self, temperature: f32) -> Self {
        self.temperature = temperature;
        self
    }
}

/// Text returned by a successful generation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GenerationResult {
    pub text: String,
}

/// Model metadata as reported by the backend, or an error-shaped value.
///
/// Serialises untagged: `Metadata` is emitted exactly as the backend sent it,
/// `Unavailable` becomes `{"error": "..."}`.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum ModelInfo {
    Metadata(serde_json::Value),
    Unavailable { error: String },
}

impl ModelInfo {
    pub fn unavailable(error: impl Into<String>) -> Self {
        ModelInfo::Unavailable {
            error: error.into(),
        }
    }

    pub fn is_available(&self) -> bool {
        matches!(self, ModelInfo::Metadata(_))
    }
}

// ─── Wire types ──────────────────────────────────────────────────────────────

/// Body of `POST /api/generate`.
#[derive(Debug, Clone, Serialize)]
pub(crate) struct GenerateBody<'a> {
    pub model: &'a str,
    pub prompt: &'a str,
    pub stream: bool,
    pub options: GenerateOptions,
}

/// Sampling options nested in a generate body.
#[derive(Debug, Clone, Serialize)]
pub(crate) struct GenerateOptions {
    pub num_predict: u32,
    pub temperature: f32,
}

/// Successful `POST /api/generate` response. Only `response` is read.
#[derive(Debug, Deserialize)]
pub(crate) struct GenerateReply {
    #[serde(default)]
    pub response: Option<String>,
}

/// Body of `POST /api/show`.
#[derive(Debug, Serialize)]
pub(crate) struct ShowBody<'a> {
    pub name: &'a str,
}

/// `GET /api/tags` response shape.
#[derive(Debug, Deserialize)]
pub(crate) struct TagsReply {
    #[serde(default)]
    pub models: Option<Vec<TagModel>>,
}

/// A single entry of the model list. Other fields are ignored.
#[derive(Debug, Deserialize)]
pub(crate) struct TagModel {
    pub name: String,
}

impl TagsReply {
    pub fn contains(&self, model_name: &str) -> bool {
        self.models
            .as_deref()
            .unwrap_or_default()
            .iter()
            .any(|m| m.name == model_name)
    }
}

// ─── Tests ───────────────────────────────────────────────────────────────────
