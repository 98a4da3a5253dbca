//! OpenAI chat-completions client.

use reqwest::blocking::Client;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::{cloud_status_error, prompt, PlannerError, Provider};
use crate::config::OpenAiConfig;

const MAX_TOKENS: u32 = 1000;

/// Sends one planning request and returns the reply text.
pub(crate) fn request_plan(
    http: &Client,
    config: &OpenAiConfig,
    api_key: &str,
    screenshot_b64: &str,
    ui_tree: &Value,
    user_request: &str,
) -> Result<String, PlannerError> {
    let tree_json = serde_json::to_string_pretty(ui_tree).unwrap_or_default();
    let body = ChatRequest {
        model: config.model.clone(),
        max_tokens: MAX_TOKENS,
        messages: vec![
            Message {
                role: "system",
                content: Content::Text(prompt::SYSTEM_PROMPT.to_string()),
            },
            Message {
                role: "user",
                content: Content::Parts(vec![
                    Part::Text {
                        text: prompt::user_text(user_request, &tree_json),
                    },
                    Part::ImageUrl {
                        image_url: ImageUrl {
                            url: format!("data:image/png;base64,{screenshot_b64}"),
                        },
                    },
                ]),
            },
        ],
    };

    let url = format!("{}/chat/completions", config.api_base.trim_end_matches('/'));
    let response = http
        .post(url)
        .timeout(config.timeout())
        .bearer_auth(api_key)
        .json(&body)
        .send()
        .map_err(|err| PlannerError::Api {
            provider: Provider::OpenAi,
            message: err.to_string(),
        })?;

    let status = response.status();
    if !status.is_success() {
        let body = response.text().unwrap_or_default();
        return Err(cloud_status_error(Provider::OpenAi, status, &body));
    }

    let reply: ChatResponse = response.json().map_err(|err| PlannerError::MalformedReply {
        provider: Provider::OpenAi,
        message: err.to_string(),
    })?;

    reply
        .choices
        .into_iter()
        .next()
        .and_then(|choice| choice.message.content)
        .ok_or_else(|| PlannerError::MalformedReply {
            provider: Provider::OpenAi,
            message: "response missing message content".to_string(),
        })
}

#[derive(Serialize)]
struct ChatRequest {
    model: String,
    max_tokens: u32,
    messages: Vec<Message>,
}

#[derive(Serialize)]
struct Message {
    role: &'static str,
    content: Content,
}

#[derive(Serialize)]
#[serde(untagged)]
enum Content {
    Text(String),
    Parts(Vec<Part>),
}

#[derive(Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum Part {
    Text { text: String },
    ImageUrl { image_url: ImageUrl },
}

#[derive(Serialize)]
struct ImageUrl {
    url: String,
}

#[derive(Deserialize)]
struct ChatResponse {
    choices: Vec<Choice>,
}

#[derive(Deserialize)]
struct Choice {
    message: ChoiceMessage,
}

#[derive(Deserialize)]
struct ChoiceMessage {
    #[serde(default)]
    content: Option<String>,
}
