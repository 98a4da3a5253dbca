//! Host configuration.
//!
//! Everything has a working default; a YAML file can override provider
//! models, endpoints, and timeouts.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use serde::Deserialize;
use tracing::{info, warn};

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct HostConfig {
    pub providers: ProvidersConfig,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct ProvidersConfig {
    pub openai: OpenAiConfig,
    pub anthropic: AnthropicConfig,
    pub ollama: OllamaConfig,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct OpenAiConfig {
    pub model: String,
    pub api_base: String,
    pub timeout_secs: u64,
}

impl Default for OpenAiConfig {
    fn default() -> Self {
        Self {
            model: "gpt-4o".to_string(),
            api_base: "https://api.openai.com/v1".to_string(),
            timeout_secs: 60,
        }
    }
}

impl OpenAiConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct AnthropicConfig {
    pub model: String,
    pub api_base: String,
    pub timeout_secs: u64,
}

impl Default for AnthropicConfig {
    fn default() -> Self {
        Self {
            model: "claude-sonnet-4-20250514".to_string(),
            api_base: "https://api.anthropic.com/v1".to_string(),
            timeout_secs: 60,
        }
    }
}

impl AnthropicConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct OllamaConfig {
    pub model: String,
    pub base_url: String,
    pub generate_timeout_secs: u64,
    pub probe_timeout_secs: u64,
    pub status_timeout_secs: u64,
}

impl Default for OllamaConfig {
    fn default() -> Self {
        Self {
            model: "llava".to_string(),
            base_url: "http://localhost:11434".to_string(),
            generate_timeout_secs: 120,
            probe_timeout_secs: 3,
            status_timeout_secs: 5,
        }
    }
}

impl OllamaConfig {
    pub fn generate_timeout(&self) -> Duration {
        Duration::from_secs(self.generate_timeout_secs)
    }

    pub fn probe_timeout(&self) -> Duration {
        Duration::from_secs(self.probe_timeout_secs)
    }

    pub fn status_timeout(&self) -> Duration {
        Duration::from_secs(self.status_timeout_secs)
    }
}

/// Loads configuration. An explicit path must exist and parse; the default
/// location is optional.
pub fn load(path: Option<&Path>) -> Result<HostConfig> {
    match path {
        Some(path) => {
            let content = fs::read_to_string(path)
                .with_context(|| format!("failed to read config file {}", path.display()))?;
            let config = serde_yaml::from_str(&content)
                .with_context(|| format!("failed to parse config file {}", path.display()))?;
            info!("loaded configuration from {}", path.display());
            Ok(config)
        }
        None => {
            let Some(path) = default_path() else {
                return Ok(HostConfig::default());
            };
            if !path.exists() {
                return Ok(HostConfig::default());
            }
            match fs::read_to_string(&path)
                .map_err(anyhow::Error::from)
                .and_then(|content| serde_yaml::from_str(&content).map_err(Into::into))
            {
                Ok(config) => {
                    info!("loaded configuration from {}", path.display());
                    Ok(config)
                }
                Err(err) => {
                    warn!("ignoring unreadable config {}: {err}", path.display());
                    Ok(HostConfig::default())
                }
            }
        }
    }
}

fn default_path() -> Option<PathBuf> {
    let mut path = dirs::config_dir()?;
    path.push("deskbridge");
    path.push("config.yaml");
    Some(path)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_cover_all_providers() {
        let config = HostConfig::default();
        assert_eq!(config.providers.openai.model, "gpt-4o");
        assert_eq!(config.providers.anthropic.model, "claude-sonnet-4-20250514");
        assert_eq!(config.providers.ollama.base_url, "http://localhost:11434");
        assert_eq!(config.providers.ollama.generate_timeout_secs, 120);
        assert_eq!(config.providers.ollama.probe_timeout_secs, 3);
    }

    #[test]
    fn partial_yaml_keeps_other_defaults() {
        let config: HostConfig = serde_yaml::from_str(
            "providers:\n  ollama:\n    base_url: http://127.0.0.1:9999\n",
        )
        .expect("parse");
        assert_eq!(config.providers.ollama.base_url, "http://127.0.0.1:9999");
        assert_eq!(config.providers.ollama.model, "llava");
        assert_eq!(config.providers.openai.timeout_secs, 60);
    }
}
