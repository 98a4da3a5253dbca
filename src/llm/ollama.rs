//! Local Ollama client: generate endpoint plus the /api/tags probe.

use reqwest::blocking::Client;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::debug;

use super::{prompt, LocalLlmStatus, PlannerError};
use crate::config::OllamaConfig;

/// Model-name fragments that indicate vision support. Substring matching
/// is intentionally loose ("llava" also catches "bakllava:7b").
const VISION_MODEL_HINTS: [&str; 4] = ["llava", "cogagent", "bakllava", "moondream"];

pub(crate) fn request_plan(
    http: &Client,
    config: &OllamaConfig,
    screenshot_b64: &str,
    ui_tree: &Value,
    user_request: &str,
) -> Result<String, PlannerError> {
    let tree_json = serde_json::to_string_pretty(ui_tree).unwrap_or_default();
    let body = GenerateRequest {
        model: config.model.clone(),
        prompt: prompt::combined_prompt(user_request, &tree_json),
        stream: false,
        images: if screenshot_b64.is_empty() {
            None
        } else {
            Some(vec![screenshot_b64.to_string()])
        },
    };

    let url = format!("{}/api/generate", config.base_url.trim_end_matches('/'));
    let response = http
        .post(url)
        .timeout(config.generate_timeout())
        .json(&body)
        .send()
        .map_err(|err| PlannerError::OllamaUnavailable {
            message: err.to_string(),
        })?;

    let status = response.status();
    if !status.is_success() {
        return Err(PlannerError::OllamaUnavailable {
            message: format!("HTTP {status}"),
        });
    }

    let reply: GenerateResponse =
        response
            .json()
            .map_err(|err| PlannerError::OllamaUnavailable {
                message: format!("invalid response body: {err}"),
            })?;
    Ok(reply.response)
}

/// Queries the local install for its model list.
pub(crate) fn probe(http: &Client, config: &OllamaConfig) -> LocalLlmStatus {
    let url = format!("{}/api/tags", config.base_url.trim_end_matches('/'));
    let response = match http.get(&url).timeout(config.probe_timeout()).send() {
        Ok(response) => response,
        Err(err) => {
            debug!(error = %err, "ollama probe failed");
            return LocalLlmStatus {
                error: Some(format!("Ollama not reachable: {err}")),
                ..Default::default()
            };
        }
    };

    let status = response.status();
    if !status.is_success() {
        return LocalLlmStatus {
            error: Some(format!("Ollama returned HTTP {status}")),
            ..Default::default()
        };
    }

    let tags: TagsResponse = match response.json() {
        Ok(tags) => tags,
        Err(err) => {
            return LocalLlmStatus {
                error: Some(format!("invalid tags response: {err}")),
                ..Default::default()
            };
        }
    };

    let models: Vec<String> = tags.models.into_iter().map(|m| m.name).collect();
    let has_vision_model = models
        .iter()
        .any(|name| VISION_MODEL_HINTS.iter().any(|hint| name.contains(hint)));

    LocalLlmStatus {
        available: true,
        models,
        has_vision_model,
        error: None,
    }
}

/// Status-report reachability check, separate from the short probe.
pub(crate) fn reachable(http: &Client, config: &OllamaConfig) -> bool {
    let url = format!("{}/api/tags", config.base_url.trim_end_matches('/'));
    http.get(url)
        .timeout(config.status_timeout())
        .send()
        .map(|response| response.status().is_success())
        .unwrap_or(false)
}

#[derive(Serialize)]
struct GenerateRequest {
    model: String,
    prompt: String,
    stream: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    images: Option<Vec<String>>,
}

#[derive(Deserialize)]
struct GenerateResponse {
    #[serde(default)]
    response: String,
}

#[derive(Deserialize)]
struct TagsResponse {
    #[serde(default)]
    models: Vec<ModelEntry>,
}

#[derive(Deserialize)]
struct ModelEntry {
    name: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn empty_screenshot_omits_images() {
        let body = GenerateRequest {
            model: "llava".to_string(),
            prompt: "p".to_string(),
            stream: false,
            images: None,
        };
        let value = serde_json::to_value(&body).expect("serialize");
        assert!(value.get("images").is_none());
        assert_eq!(value["stream"], json!(false));
    }

    #[test]
    fn vision_hint_matching_is_loose() {
        let names = ["bakllava:7b", "moondream2", "qwen2.5"];
        let hits: Vec<bool> = names
            .iter()
            .map(|name| VISION_MODEL_HINTS.iter().any(|hint| name.contains(hint)))
            .collect();
        assert_eq!(hits, vec![true, true, false]);
    }
}
