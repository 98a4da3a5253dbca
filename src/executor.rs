//! Orchestrates the engine: capture, UI tree, planning, and input
//! execution, shaped into wire responses.

use std::sync::Arc;

use serde_json::{json, Value};
use tracing::{info, warn};

use crate::actions::{Action, ActionError};
use crate::credentials::CredentialStore;
use crate::input::InputDispatcher;
use crate::llm::{ActionPlanner, PlannerError, Provider};
use crate::platform::{encode, Desktop, ScreenSource, UiTreeSource};
use crate::requests::AsyncRequestManager;

const MAX_API_KEY_CHARS: usize = 500;
const MAX_USER_REQUEST_CHARS: usize = 5000;

pub struct ActionExecutor {
    screen: Arc<dyn ScreenSource>,
    ui: Arc<dyn UiTreeSource>,
    input: InputDispatcher,
    credentials: CredentialStore,
    planner: Arc<dyn ActionPlanner>,
    requests: AsyncRequestManager,
}

impl ActionExecutor {
    pub fn new(desktop: Desktop, planner: Arc<dyn ActionPlanner>) -> Self {
        let dimensions = desktop.screen.dimensions();
        info!(
            width = dimensions.0,
            height = dimensions.1,
            "action executor initialized"
        );
        Self {
            screen: desktop.screen,
            ui: desktop.ui,
            input: InputDispatcher::new(desktop.input, dimensions),
            credentials: CredentialStore::new(desktop.vault),
            planner,
            requests: AsyncRequestManager::new(),
        }
    }

    pub fn capabilities(&self) -> Value {
        let local = self.planner.probe_local();
        json!({
            "success": true,
            "capabilities": {
                "screen_capture": true,
                "ui_automation": true,
                "input_control": true,
                "local_llm": local.available,
            }
        })
    }

    pub fn capture_screen(&self) -> Value {
        let frame = match self.screen.capture() {
            Ok(frame) => frame,
            Err(err) => return failure(err.to_string()),
        };
        match encode::encode_png_base64(&frame) {
            Ok(screenshot) => json!({
                "success": true,
                "screenshot": screenshot,
                "width": frame.width,
                "height": frame.height,
            }),
            Err(err) => failure(err.to_string()),
        }
    }

    pub fn ui_tree(&self) -> Value {
        match self.ui.ui_tree() {
            Ok(tree) => json!({"success": true, "uiTree": tree}),
            Err(err) => failure(err.to_string()),
        }
    }

    /// Validates one action and drives the input dispatcher. Click bounds
    /// are checked against the cached screen dimensions here, where the
    /// action is about to touch the real pointer.
    pub fn execute_action(&self, action: &Value) -> Value {
        let parsed = match Action::from_value(action) {
            Ok(parsed) => parsed,
            Err(err) => return failure(err.to_string()),
        };

        if let Action::Click { x, y, .. } = parsed {
            let (width, height) = self.input.dimensions();
            if x >= width as i32 || y >= height as i32 {
                return failure(ActionError::OutOfBounds.to_string());
            }
        }

        info!(action = parsed.tag(), "executing action");
        match &parsed {
            Action::Click {
                x,
                y,
                button,
                double,
            } => self.input.click(*x, *y, *button, *double),
            Action::Type { text } => self.input.type_text(text),
            Action::Scroll { delta, x, y } => self.input.scroll(*delta, x.zip(*y)),
            Action::PressKeys { keys } => self.input.press_keys(keys),
            Action::Wait { ms } => self.input.wait(*ms),
        }

        json!({"success": true, "action": parsed.tag()})
    }

    /// Runs a batch strictly in order, halting after the first failure.
    /// The top-level `success` stays true; callers inspect the per-action
    /// results.
    pub fn execute_actions(&self, actions: &Value) -> Value {
        let Some(actions) = actions.as_array() else {
            return failure("Actions must be an array");
        };

        let mut results = Vec::with_capacity(actions.len());
        for action in actions {
            let result = self.execute_action(action);
            let failed = result["success"] != json!(true);
            results.push(result);
            if failed {
                break;
            }
        }

        json!({"success": true, "results": results})
    }

    /// Submits a planning request to the async manager and hands back its
    /// ID. Capture failures inside the request are logged and replaced
    /// with empty artifacts so a broken capture path cannot hide the
    /// provider error surface.
    pub fn request_actions(&self, params: &Value) -> Value {
        let provider_name = params
            .get("provider")
            .and_then(Value::as_str)
            .unwrap_or_default();
        let Some(provider) = Provider::parse(provider_name) else {
            return failure(format!("Unknown provider: {provider_name}"));
        };

        let user_request = params
            .get("user_request")
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string();
        if user_request.is_empty() || user_request.chars().count() > MAX_USER_REQUEST_CHARS {
            return failure("user_request must be 1-5000 characters");
        }

        let screen = Arc::clone(&self.screen);
        let ui = Arc::clone(&self.ui);
        let planner = Arc::clone(&self.planner);

        let request_id = self.requests.submit(Box::new(move || {
            let screenshot = match screen
                .capture()
                .and_then(|frame| encode::encode_png_base64(&frame))
            {
                Ok(screenshot) => screenshot,
                Err(err) => {
                    warn!(error = %err, "screen capture failed; planning without screenshot");
                    String::new()
                }
            };
            let tree = match ui.ui_tree() {
                Ok(tree) => tree,
                Err(err) => {
                    warn!(error = %err, "UI tree enumeration failed; planning without tree");
                    json!({})
                }
            };

            match planner.plan(provider, &screenshot, &tree, &user_request) {
                Ok(actions) => json!({"success": true, "actions": actions}),
                Err(PlannerError::Plan { error, raw }) => json!({
                    "success": false,
                    "error": error.to_string(),
                    "raw_response": raw,
                }),
                Err(err) => failure(err.to_string()),
            }
        }));

        json!({"success": true, "request_id": request_id, "status": "queued"})
    }

    pub fn poll_request(&self, params: &Value) -> Value {
        match request_id(params) {
            Some(id) => self.requests.poll(id),
            None => failure("Missing request_id"),
        }
    }

    pub fn cancel_request(&self, params: &Value) -> Value {
        match request_id(params) {
            Some(id) => self.requests.cancel(id),
            None => failure("Missing request_id"),
        }
    }

    pub fn store_api_key(&self, params: &Value) -> Value {
        let Some(provider) = cloud_provider(params) else {
            return failure("API keys can only be stored for cloud providers");
        };
        let api_key = params
            .get("api_key")
            .and_then(Value::as_str)
            .unwrap_or_default();
        if api_key.is_empty() {
            return failure("Missing api_key parameter");
        }
        if api_key.chars().count() > MAX_API_KEY_CHARS {
            return failure("API key too long (max 500 chars)");
        }

        match self.credentials.store(provider.key(), api_key) {
            Ok(()) => json!({"success": true}),
            Err(err) => failure(err.to_string()),
        }
    }

    pub fn delete_api_key(&self, params: &Value) -> Value {
        let Some(provider) = cloud_provider(params) else {
            return failure("API keys can only be stored for cloud providers");
        };
        json!({"success": self.credentials.delete(provider.key())})
    }

    pub fn provider_status(&self) -> Value {
        json!({
            "success": true,
            "providers": {
                "openai": {
                    "has_key": self.credentials.has(Provider::OpenAi.key()),
                    "type": "cloud",
                },
                "anthropic": {
                    "has_key": self.credentials.has(Provider::Anthropic.key()),
                    "type": "cloud",
                },
                "ollama": {
                    "has_key": false,
                    "type": "local",
                    "available": self.planner.ollama_reachable(),
                },
            }
        })
    }

    pub fn check_local_llm(&self) -> Value {
        let status = self.planner.probe_local();
        let mut response = json!({
            "success": true,
            "available": status.available,
            "models": status.models,
            "has_vision_model": status.has_vision_model,
        });
        if let Some(error) = status.error {
            response["error"] = error.into();
        }
        response
    }

    /// Joins the request worker. Queued planning requests are abandoned.
    pub fn shutdown(&self) {
        self.requests.shutdown();
    }
}

fn request_id(params: &Value) -> Option<&str> {
    params.get("request_id").and_then(Value::as_str)
}

fn cloud_provider(params: &Value) -> Option<Provider> {
    let provider = Provider::parse(params.get("provider").and_then(Value::as_str)?)?;
    provider.is_cloud().then_some(provider)
}

fn failure(error: impl Into<String>) -> Value {
    json!({"success": false, "error": error.into()})
}
