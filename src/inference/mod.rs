//! Inference client for the local model server (Ollama API).
//!
//! This module owns all backend-specific protocol knowledge:
//! - Readiness probing against `/api/tags`
//! - Single-shot generation against `/api/generate`
//! - Model metadata lookup against `/api/show`
//!
//! Callers only see `GenerationRequest`, `GenerationResult`, `ModelInfo`
//! and `GenerationError`; URL shapes and payload layouts stay in here.

pub mod client;
pub mod config;
pub mod errors;
pub mod types;

// Re-exports for convenience
pub use client::InferenceClient;
pub use config::BackendConfig;
pub use errors::GenerationError;
pub use types::{GenerationRequest, GenerationResult, ModelInfo};
