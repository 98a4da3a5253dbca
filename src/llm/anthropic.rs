//! Anthropic messages client.

use reqwest::blocking::Client;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::{cloud_status_error, prompt, PlannerError, Provider};
use crate::config::AnthropicConfig;

const MAX_TOKENS: u32 = 1024;
const API_VERSION: &str = "2023-06-01";

pub(crate) fn request_plan(
    http: &Client,
    config: &AnthropicConfig,
    api_key: &str,
    screenshot_b64: &str,
    ui_tree: &Value,
    user_request: &str,
) -> Result<String, PlannerError> {
    let tree_json = serde_json::to_string(ui_tree).unwrap_or_default();
    let body = MessagesRequest {
        model: config.model.clone(),
        max_tokens: MAX_TOKENS,
        messages: vec![Message {
            role: "user",
            content: vec![
                Block::Image {
                    source: ImageSource {
                        kind: "base64",
                        media_type: "image/png",
                        data: screenshot_b64.to_string(),
                    },
                },
                Block::Text {
                    text: format!(
                        "{}\n\n{}",
                        prompt::SYSTEM_PROMPT,
                        prompt::user_text(user_request, &tree_json)
                    ),
                },
            ],
        }],
    };

    let url = format!("{}/messages", config.api_base.trim_end_matches('/'));
    let response = http
        .post(url)
        .timeout(config.timeout())
        .header("x-api-key", api_key)
        .header("anthropic-version", API_VERSION)
        .json(&body)
        .send()
        .map_err(|err| PlannerError::Api {
            provider: Provider::Anthropic,
            message: err.to_string(),
        })?;

    let status = response.status();
    if !status.is_success() {
        let body = response.text().unwrap_or_default();
        return Err(cloud_status_error(Provider::Anthropic, status, &body));
    }

    let reply: MessagesResponse =
        response.json().map_err(|err| PlannerError::MalformedReply {
            provider: Provider::Anthropic,
            message: err.to_string(),
        })?;

    reply
        .content
        .into_iter()
        .find_map(|block| block.text)
        .ok_or_else(|| PlannerError::MalformedReply {
            provider: Provider::Anthropic,
            message: "response missing text content".to_string(),
        })
}

#[derive(Serialize)]
struct MessagesRequest {
    model: String,
    max_tokens: u32,
    messages: Vec<Message>,
}

#[derive(Serialize)]
struct Message {
    role: &'static str,
    content: Vec<Block>,
}

#[derive(Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum Block {
    Image { source: ImageSource },
    Text { text: String },
}

#[derive(Serialize)]
struct ImageSource {
    #[serde(rename = "type")]
    kind: &'static str,
    media_type: &'static str,
    data: String,
}

#[derive(Deserialize)]
struct MessagesResponse {
    content: Vec<ResponseBlock>,
}

#[derive(Deserialize)]
struct ResponseBlock {
    #[serde(default)]
    text: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn payload_uses_structured_image_block() {
        let body = MessagesRequest {
            model: "claude-sonnet-4-20250514".to_string(),
            max_tokens: MAX_TOKENS,
            messages: vec![Message {
                role: "user",
                content: vec![
                    Block::Image {
                        source: ImageSource {
                            kind: "base64",
                            media_type: "image/png",
                            data: "AAAA".to_string(),
                        },
                    },
                    Block::Text {
                        text: "prompt".to_string(),
                    },
                ],
            }],
        };
        let value = serde_json::to_value(&body).expect("serialize");
        let image = &value["messages"][0]["content"][0];
        assert_eq!(image["type"], json!("image"));
        assert_eq!(image["source"]["type"], json!("base64"));
        assert_eq!(image["source"]["media_type"], json!("image/png"));
        assert_eq!(value["messages"][0]["content"][1]["type"], json!("text"));
    }

    #[test]
    fn first_text_block_wins() {
        let reply: MessagesResponse = serde_json::from_value(json!({
            "content": [
                {"type": "thinking"},
                {"type": "text", "text": "[]"}
            ]
        }))
        .expect("deserialize");
        let text = reply.content.into_iter().find_map(|b| b.text);
        assert_eq!(text.as_deref(), Some("[]"));
    }
}
