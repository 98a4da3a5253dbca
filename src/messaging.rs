//! Inbound message dispatch.
//!
//! The action vocabulary is fixed at the protocol level, so dispatch is an
//! exhaustive match over a request-kind enum rather than a string-keyed
//! handler table. One inbound frame produces exactly one outbound frame;
//! handler panics are contained and reported in-band.

use std::io::{Read, Write};
use std::panic::{self, AssertUnwindSafe};

use serde_json::{json, Value};
use tracing::{debug, error, info};

use crate::executor::ActionExecutor;
use crate::framing::{self, FrameError};
use crate::util::panic_message;

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum RequestKind {
    Ping,
    GetCapabilities,
    CaptureScreen,
    InspectUi,
    ExecuteAction,
    ExecuteActions,
    CheckLocalLlm,
    GetActions,
    Poll,
    Cancel,
    StoreApiKey,
    DeleteApiKey,
    GetProviderStatus,
}

impl RequestKind {
    pub fn parse(action: &str) -> Option<Self> {
        match action {
            "ping" => Some(Self::Ping),
            "get_capabilities" => Some(Self::GetCapabilities),
            "capture_screen" => Some(Self::CaptureScreen),
            "inspect_ui" => Some(Self::InspectUi),
            "execute_action" => Some(Self::ExecuteAction),
            "execute_actions" => Some(Self::ExecuteActions),
            "check_local_llm" => Some(Self::CheckLocalLlm),
            "get_actions" => Some(Self::GetActions),
            "poll" => Some(Self::Poll),
            "cancel" => Some(Self::Cancel),
            "store_api_key" => Some(Self::StoreApiKey),
            "delete_api_key" => Some(Self::DeleteApiKey),
            "get_provider_status" => Some(Self::GetProviderStatus),
            _ => None,
        }
    }
}

pub struct MessageDispatcher {
    executor: ActionExecutor,
}

impl MessageDispatcher {
    pub fn new(executor: ActionExecutor) -> Self {
        Self { executor }
    }

    /// Maps one inbound message to one response object.
    pub fn dispatch(&self, message: &Value) -> Value {
        let Some(action) = message.get("action").and_then(Value::as_str) else {
            return json!({"success": false, "error": "Missing 'action' field"});
        };
        let Some(kind) = RequestKind::parse(action) else {
            return json!({"success": false, "error": format!("Unknown action: {action}")});
        };

        debug!(action, "dispatching request");
        match panic::catch_unwind(AssertUnwindSafe(|| self.handle(kind, message))) {
            Ok(response) => response,
            Err(payload) => {
                let text = panic_message(payload);
                error!(action, error = %text, "handler panicked");
                json!({"success": false, "error": format!("Handler error: {text}")})
            }
        }
    }

    fn handle(&self, kind: RequestKind, message: &Value) -> Value {
        let params = message.get("params");
        match kind {
            RequestKind::Ping => json!({
                "success": true,
                "message": "pong",
                "version": env!("CARGO_PKG_VERSION"),
            }),
            RequestKind::GetCapabilities => self.executor.capabilities(),
            RequestKind::CaptureScreen => self.executor.capture_screen(),
            RequestKind::InspectUi => self.executor.ui_tree(),
            RequestKind::ExecuteAction => match params {
                Some(action) => self.executor.execute_action(action),
                None => json!({"success": false, "error": "Missing params"}),
            },
            RequestKind::ExecuteActions => match params.and_then(|p| p.get("actions")) {
                Some(actions) => self.executor.execute_actions(actions),
                None => json!({"success": false, "error": "Missing actions array"}),
            },
            RequestKind::CheckLocalLlm => self.executor.check_local_llm(),
            RequestKind::GetActions => self.executor.request_actions(params.unwrap_or(&Value::Null)),
            RequestKind::Poll => self.executor.poll_request(params.unwrap_or(&Value::Null)),
            RequestKind::Cancel => self.executor.cancel_request(params.unwrap_or(&Value::Null)),
            RequestKind::StoreApiKey => {
                self.executor.store_api_key(params.unwrap_or(&Value::Null))
            }
            RequestKind::DeleteApiKey => {
                self.executor.delete_api_key(params.unwrap_or(&Value::Null))
            }
            RequestKind::GetProviderStatus => self.executor.provider_status(),
        }
    }

    /// The frame loop: read one frame, dispatch, write one frame. Returns
    /// cleanly on end of stream; frame errors are fatal to the loop.
    pub fn run<R: Read, W: Write>(&self, reader: &mut R, writer: &mut W) -> Result<(), FrameError> {
        info!("message loop started");
        loop {
            let Some(message) = framing::read_frame(reader)? else {
                info!("stream closed, message loop ending");
                return Ok(());
            };
            let response = self.dispatch(&message);
            framing::write_frame(writer, &response)?;
        }
    }

    /// Stops the executor's background worker.
    pub fn shutdown(&self) {
        self.executor.shutdown();
    }
}
