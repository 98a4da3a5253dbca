//! Provider routing: prompt + screenshot + UI tree in, validated action
//! plan out.

pub mod anthropic;
pub mod ollama;
pub mod openai;
pub mod parse;
pub mod prompt;

use std::fmt;

use reqwest::blocking::Client;
use serde_json::Value;
use thiserror::Error;
use tracing::info;

use crate::config::ProvidersConfig;
use crate::credentials::CredentialStore;

use self::parse::PlanParseError;

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Provider {
    OpenAi,
    Anthropic,
    Ollama,
}

impl Provider {
    pub fn parse(name: &str) -> Option<Self> {
        match name {
            "openai" => Some(Provider::OpenAi),
            "anthropic" => Some(Provider::Anthropic),
            "ollama" => Some(Provider::Ollama),
            _ => None,
        }
    }

    /// Wire identifier used in params and credential targets.
    pub fn key(self) -> &'static str {
        match self {
            Provider::OpenAi => "openai",
            Provider::Anthropic => "anthropic",
            Provider::Ollama => "ollama",
        }
    }

    /// Cloud providers require a stored API key; Ollama never does.
    pub fn is_cloud(self) -> bool {
        !matches!(self, Provider::Ollama)
    }
}

impl fmt::Display for Provider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Provider::OpenAi => "OpenAI",
            Provider::Anthropic => "Anthropic",
            Provider::Ollama => "Ollama",
        })
    }
}

#[derive(Debug, Error)]
pub enum PlannerError {
    #[error("failed to initialize HTTP client: {0}")]
    Http(String),
    #[error("{provider} API key not configured. Add via Settings.")]
    MissingKey { provider: Provider },
    #[error("Invalid {provider} API key. Update via Settings.")]
    InvalidKey { provider: Provider },
    #[error("{provider} rate limit exceeded. Try again later.")]
    RateLimited { provider: Provider },
    #[error("{provider} API error: {message}")]
    Api { provider: Provider, message: String },
    #[error("Ollama error: {message}. Is Ollama running?")]
    OllamaUnavailable { message: String },
    #[error("Failed to parse {provider} response: {message}")]
    MalformedReply { provider: Provider, message: String },
    /// The provider answered, but the text was not a usable action array.
    /// The original reply rides along for the `raw_response` field.
    #[error("{error}")]
    Plan {
        error: PlanParseError,
        raw: String,
    },
}

/// Live status of the local Ollama install.
#[derive(Debug, Clone, Default)]
pub struct LocalLlmStatus {
    pub available: bool,
    pub models: Vec<String>,
    pub has_vision_model: bool,
    pub error: Option<String>,
}

/// Seam between the executor and the provider HTTP clients.
pub trait ActionPlanner: Send + Sync {
    fn plan(
        &self,
        provider: Provider,
        screenshot_b64: &str,
        ui_tree: &Value,
        user_request: &str,
    ) -> Result<Vec<Value>, PlannerError>;

    /// 3-second probe of the local Ollama install.
    fn probe_local(&self) -> LocalLlmStatus;

    /// Cheap reachability check used by provider status reports.
    fn ollama_reachable(&self) -> bool;
}

/// The production planner: routes to the configured provider endpoint and
/// post-processes the reply into a validated plan.
pub struct ProviderRouter {
    http: Client,
    credentials: CredentialStore,
    config: ProvidersConfig,
}

impl ProviderRouter {
    pub fn new(credentials: CredentialStore, config: ProvidersConfig) -> Result<Self, PlannerError> {
        let http = Client::builder()
            .build()
            .map_err(|err| PlannerError::Http(err.to_string()))?;
        Ok(Self {
            http,
            credentials,
            config,
        })
    }

    fn cloud_key(&self, provider: Provider) -> Result<String, PlannerError> {
        let key = self.credentials.load(provider.key());
        if key.is_empty() {
            return Err(PlannerError::MissingKey { provider });
        }
        Ok(key)
    }
}

impl ActionPlanner for ProviderRouter {
    fn plan(
        &self,
        provider: Provider,
        screenshot_b64: &str,
        ui_tree: &Value,
        user_request: &str,
    ) -> Result<Vec<Value>, PlannerError> {
        info!(provider = provider.key(), "requesting action plan");

        let reply = match provider {
            Provider::OpenAi => {
                let key = self.cloud_key(provider)?;
                openai::request_plan(
                    &self.http,
                    &self.config.openai,
                    &key,
                    screenshot_b64,
                    ui_tree,
                    user_request,
                )?
            }
            Provider::Anthropic => {
                let key = self.cloud_key(provider)?;
                anthropic::request_plan(
                    &self.http,
                    &self.config.anthropic,
                    &key,
                    screenshot_b64,
                    ui_tree,
                    user_request,
                )?
            }
            Provider::Ollama => ollama::request_plan(
                &self.http,
                &self.config.ollama,
                screenshot_b64,
                ui_tree,
                user_request,
            )?,
        };

        let actions = parse::parse_actions(&reply).map_err(|error| PlannerError::Plan {
            error,
            raw: reply.clone(),
        })?;
        info!(
            provider = provider.key(),
            count = actions.len(),
            "action plan validated"
        );
        Ok(actions)
    }

    fn probe_local(&self) -> LocalLlmStatus {
        ollama::probe(&self.http, &self.config.ollama)
    }

    fn ollama_reachable(&self) -> bool {
        ollama::reachable(&self.http, &self.config.ollama)
    }
}

/// Maps a cloud HTTP status to the caller-facing error.
pub(crate) fn cloud_status_error(
    provider: Provider,
    status: reqwest::StatusCode,
    body: &str,
) -> PlannerError {
    match status.as_u16() {
        401 => PlannerError::InvalidKey { provider },
        429 => PlannerError::RateLimited { provider },
        _ => {
            let message = if body.trim().is_empty() {
                format!("HTTP {status}")
            } else {
                format!("HTTP {status}: {}", truncate(body.trim(), 300))
            };
            PlannerError::Api { provider, message }
        }
    }
}

fn truncate(text: &str, max: usize) -> &str {
    match text.char_indices().nth(max) {
        Some((pos, _)) => &text[..pos],
        None => text,
    }
}
