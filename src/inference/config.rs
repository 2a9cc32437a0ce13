//! Backend connection settings.
//!
//! `BackendConfig` is deserialised from the `backend:` section of the relay
//! config file; every field has a default so the section may be omitted.

use std::time::Duration;

use serde::Deserialize;

/// Default Ollama address.
pub const DEFAULT_BASE_URL: &str = "http://localhost:11434";

/// Default model tag. Deployments override this.
pub const DEFAULT_MODEL_NAME: &str = "qwen3:0.6b";

/// Text relayed when a successful generate reply has no `response` field.
pub const DEFAULT_FALLBACK_TEXT: &str = "No response generated";

/// Immutable settings for talking to the inference backend.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct BackendConfig {
    /// Base URL, e.g. `http://localhost:11434`. A trailing `/` is ignored.
    pub base_url: String,
    /// Model tag that must be loaded for the backend to count as ready.
    pub model_name: String,
    /// Timeout for the readiness probe (`/api/tags`).
    pub readiness_timeout_ms: u64,
    /// Timeout for a single generation call (`/api/generate`).
    pub generation_timeout_ms: u64,
    /// Relayed when the backend replies 2xx without a `response` field.
    /// May be empty.
    pub fallback_text: String,
}

impl Default for BackendConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            model_name: DEFAULT_MODEL_NAME.to_string(),
            readiness_timeout_ms: 5_000,
            generation_timeout_ms: 60_000,
            fallback_text: DEFAULT_FALLBACK_TEXT.to_string(),
        }
    }
}

impl BackendConfig {
    /// Config for `base_url` and `model_name` with default timeouts.
    pub fn new(base_url: impl Into<String>, model_name: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            model_name: model_name.into(),
            ..Self::default()
        }
    }

    pub fn readiness_timeout(&self) -> Duration {
        Duration::from_millis(self.readiness_timeout_ms)
    }

    pub fn generation_timeout(&self) -> Duration {
        Duration::from_millis(self.generation_timeout_ms)
    }

    /// Join an API path (`/api/...`) onto the base URL.
    pub fn endpoint(&self, path: &str) -> String {
        format!("{}{path}", self.base_url.trim_end_matches('/'))
    }

    /// Check the settings, returning a human-readable reason on failure.
    pub fn validate(&self) -> Result<(), String> {
        if !(self.base_url.starts_with("http://") || self.base_url.starts_with("https://")) {
            return Err(format!(
                "backend.base_url must start with http:// or https:// (got '{}')",
                self.base_url
            ));
        }
        if self.model_name.trim().is_empty() {
            return Err("backend.model_name must not be empty".into());
        }
        if self.readiness_timeout_ms == 0 {
            return Err("backend.readiness_timeout_ms must be greater than 0".into());
        }
        if self.generation_timeout_ms == 0 {
            return Err("backend.generation_timeout_ms must be greater than 0".into());
        }
        Ok(())
    }
}
