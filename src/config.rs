//! Relay configuration loading and validation.
//!
//! Reads an optional `llm-relay.yaml`, resolves environment variables inside
//! it, then applies environment overrides. Every field has a default, so a
//! missing or empty file yields a working local setup.

use std::path::{Path, PathBuf};

use serde::Deserialize;
use thiserror::Error;

use crate::inference::BackendConfig;

/// File name searched for when no explicit path is given.
pub const CONFIG_FILE_NAME: &str = "llm-relay.yaml";

/// Env var naming an explicit config file.
pub const CONFIG_PATH_ENV: &str = "LLM_RELAY_CONFIG";

// ─── Errors ──────────────────────────────────────────────────────────────────

/// Errors raised while loading the relay configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read {path}: {reason}")]
    Read { path: String, reason: String },

    #[error("failed to parse config: {reason}")]
    Parse { reason: String },

    #[error("invalid config: {reason}")]
    Invalid { reason: String },
}

// ─── Public Types ────────────────────────────────────────────────────────────

/// Top-level config (mirrors `llm-relay.yaml`).
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct RelayConfig {
    pub server: ServerConfig,
    pub backend: BackendConfig,
    pub logging: LoggingConfig,
}

/// Listen address and CORS policy for the HTTP surface.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    /// Allowed browser origins. `"*"` allows any origin (without credentials).
    pub cors_origins: Vec<String>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8000,
            cors_origins: vec!["http://localhost:3000".to_string()],
        }
    }
}

impl ServerConfig {
    /// `host:port` string suitable for `TcpListener::bind`.
    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

/// Log output format.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LogFormat {
    #[default]
    Text,
    Json,
}

/// Where and how to write logs.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub format: LogFormat,
    /// Log file path. Logs go to stdout when unset.
    pub file: Option<PathBuf>,
    /// Number of rotated log files to keep (`file.1` … `file.N`).
    pub keep_rotated: u32,
    /// `EnvFilter` directive used when `RUST_LOG` is unset.
    pub filter: Option<String>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            format: LogFormat::Text,
            file: None,
            keep_rotated: 3,
            filter: None,
        }
    }
}

// ─── Loading ─────────────────────────────────────────────────────────────────

/// Locate the config file.
///
/// An existing file named by `LLM_RELAY_CONFIG` is used first, then
/// [`search_config_upward`] from `start`. `None` means run on defaults.
pub fn find_config_path(start: &Path) -> Option<PathBuf> {
    if let Ok(path) = std::env::var(CONFIG_PATH_ENV) {
        let candidate = PathBuf::from(path);
        if candidate.is_file() {
            return Some(candidate);
        }
        tracing::warn!(path = %candidate.display(), "{CONFIG_PATH_ENV} does not point at a file");
    }

    search_config_upward(start)
}

/// Nearest `llm-relay.yaml` in `start` or any of its ancestors.
pub fn search_config_upward(start: &Path) -> Option<PathBuf> {
    start
        .ancestors()
        .map(|dir| dir.join(CONFIG_FILE_NAME))
        .find(|candidate| candidate.is_file())
}

/// Read `path`, expand env references, apply env overrides and validate.
pub fn load_config(path: &Path) -> Result<RelayConfig, ConfigError> {
    let raw = std::fs::read_to_string(path).map_err(|e| ConfigError::Read {
        path: path.display().to_string(),
        reason: e.to_string(),
    })?;

    let mut config = parse_config(&raw)?;
    apply_env_overrides(&mut config);
    validate(&config)?;
    Ok(config)
}

/// Defaults plus env overrides, for running without a config file.
pub fn default_config() -> Result<RelayConfig, ConfigError> {
    let mut config = RelayConfig::default();
    apply_env_overrides(&mut config);
    validate(&config)?;
    Ok(config)
}

/// Parse YAML text (after env interpolation). Empty text yields defaults.
pub fn parse_config(raw: &str) -> Result<RelayConfig, ConfigError> {
    let interpolated = interpolate_env_vars(raw);
    if interpolated.trim().is_empty() {
        return Ok(RelayConfig::default());
    }

    serde_yaml::from_str(&interpolated).map_err(|e| ConfigError::Parse {
        reason: e.to_string(),
    })
}

/// Apply `LLM_RELAY_BACKEND_URL`, `LLM_RELAY_MODEL` and `PORT`.
pub fn apply_env_overrides(config: &mut RelayConfig) {
    if let Ok(url) = std::env::var("LLM_RELAY_BACKEND_URL") {
        config.backend.base_url = url;
    }
    if let Ok(model) = std::env::var("LLM_RELAY_MODEL") {
        config.backend.model_name = model;
    }
    if let Ok(port) = std::env::var("PORT") {
        match port.parse() {
            Ok(port) => config.server.port = port,
            Err(_) => tracing::warn!(value = %port, "ignoring non-numeric PORT"),
        }
    }
}

/// Check cross-field constraints.
pub fn validate(config: &RelayConfig) -> Result<(), ConfigError> {
    config
        .backend
        .validate()
        .map_err(|reason| ConfigError::Invalid { reason })?;

    if config.server.host.trim().is_empty() {
        return Err(ConfigError::Invalid {
            reason: "server.host must not be empty".into(),
        });
    }

    Ok(())
}

// ─── Env-var interpolation ───────────────────────────────────────────────────

/// Expand `${VAR}` and `${VAR:-default}` references in config text.
///
/// An unterminated `${` is copied through unchanged.
fn interpolate_env_vars(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    let mut rest = input;

    while let Some(start) = rest.find("${") {
        out.push_str(&rest[..start]);
        let after = &rest[start + 2..];
        match after.find('}') {
            Some(end) => {
                out.push_str(&resolve_var_expr(&after[..end]));
                rest = &after[end + 1..];
            }
            None => {
                out.push_str(&rest[start..]);
                rest = "";
            }
        }
    }

    out.push_str(rest);
    out
}

/// Value of `VAR`, or of `VAR:-default` with the default home-expanded.
fn resolve_var_expr(expr: &str) -> String {
    match expr.split_once(":-") {
        Some((var_name, default)) => {
            std::env::var(var_name).unwrap_or_else(|_| expand_home(default))
        }
        None => std::env::var(expr).unwrap_or_default(),
    }
}

/// `~/logs` → `<home>/logs`. Left untouched when no home dir is known.
fn expand_home(path: &str) -> String {
    match (path.strip_prefix('~'), dirs::home_dir()) {
        (Some(rest), Some(home)) => format!("{}{rest}", home.display()),
        _ => path.to_string(),
    }
}

// ─── Tests ───────────────────────────────────────────────────────────────────
