//! Command-line options for the `llm-relay` binary.
//!
//! Flags take precedence over environment overrides, which take precedence
//! over the config file. Apart from `LLM_RELAY_CONFIG`, env overrides are
//! read by [`config::apply_env_overrides`], not by clap.

use std::path::PathBuf;

use anyhow::Context;
use clap::Parser;

use crate::config::{self, RelayConfig};

/// Thin HTTP proxy in front of a local Ollama inference server.
#[derive(Parser, Debug, Clone)]
#[command(name = "llm-relay", version, about)]
pub struct Cli {
    /// Path to the YAML config file (default: search for llm-relay.yaml)
    #[arg(long, short, env = "LLM_RELAY_CONFIG")]
    pub config: Option<PathBuf>,

    /// Listen host
    #[arg(long)]
    pub host: Option<String>,

    /// Listen port
    #[arg(long)]
    pub port: Option<u16>,

    /// Inference backend base URL, e.g. http://localhost:11434
    #[arg(long)]
    pub backend_url: Option<String>,

    /// Model tag to generate with and to require in health checks
    #[arg(long)]
    pub model: Option<String>,
}

impl Cli {
    /// Resolve the effective config: file (or defaults), env, then flags.
    pub fn load_config(&self) -> anyhow::Result<RelayConfig> {
        let path = match &self.config {
            Some(path) => Some(path.clone()),
            None => {
                let cwd = std::env::current_dir().context("cannot read current directory")?;
                config::find_config_path(&cwd)
            }
        };

        let mut relay = match &path {
            Some(path) => config::load_config(path)
                .with_context(|| format!("loading {}", path.display()))?,
            None => config::default_config()?,
        };

        self.apply(&mut relay);
        config::validate(&relay)?;
        Ok(relay)
    }

    /// Overwrite config fields with any flags that were given.
    pub fn apply(&self, relay: &mut RelayConfig) {
        if let Some(host) = &self.host {
            relay.server.host = host.clone();
        }
        if let Some(port) = self.port {
            relay.server.port = port;
        }
        if let Some(url) = &self.backend_url {
            relay.backend.base_url = url.clone();
        }
        if let Some(model) = &self.model {
            relay.backend.model_name = model.clone();
        }
    }
}
