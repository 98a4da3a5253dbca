//! Shared fixtures: a scripted planner and a dispatcher wired to the
//! simulated desktop.

use std::sync::{Arc, Mutex};
use std::thread;
use std::time::Duration;

use serde_json::Value;

use deskbridge::executor::ActionExecutor;
use deskbridge::llm::{ActionPlanner, LocalLlmStatus, PlannerError, Provider};
use deskbridge::messaging::MessageDispatcher;
use deskbridge::platform::simulated::SimulatedDesktop;
use deskbridge::platform::Desktop;

/// Planner that replies from a script instead of the network.
#[derive(Default)]
pub struct ScriptedPlanner {
    pub actions: Vec<Value>,
    pub delay: Duration,
    pub fail_with: Option<String>,
    pub calls: Mutex<Vec<(Provider, String)>>,
}

impl ScriptedPlanner {
    pub fn returning(actions: Vec<Value>) -> Self {
        Self {
            actions,
            ..Default::default()
        }
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    pub fn failing(message: &str) -> Self {
        Self {
            fail_with: Some(message.to_string()),
            ..Default::default()
        }
    }
}

impl ActionPlanner for ScriptedPlanner {
    fn plan(
        &self,
        provider: Provider,
        _screenshot_b64: &str,
        _ui_tree: &Value,
        user_request: &str,
    ) -> Result<Vec<Value>, PlannerError> {
        self.calls
            .lock()
            .expect("calls lock")
            .push((provider, user_request.to_string()));
        if !self.delay.is_zero() {
            thread::sleep(self.delay);
        }
        match &self.fail_with {
            Some(message) => Err(PlannerError::Api {
                provider,
                message: message.clone(),
            }),
            None => Ok(self.actions.clone()),
        }
    }

    fn probe_local(&self) -> LocalLlmStatus {
        LocalLlmStatus {
            available: false,
            error: Some("Ollama not reachable: connection refused".to_string()),
            ..Default::default()
        }
    }

    fn ollama_reachable(&self) -> bool {
        false
    }
}

pub struct Harness {
    pub desktop: Arc<SimulatedDesktop>,
    pub dispatcher: MessageDispatcher,
}

pub fn harness(planner: impl ActionPlanner + 'static) -> Harness {
    harness_with(Arc::new(planner))
}

/// Variant keeping a handle on the planner so tests can inspect its calls.
pub fn harness_with<P: ActionPlanner + 'static>(planner: Arc<P>) -> Harness {
    let desktop = Arc::new(SimulatedDesktop::new());
    let executor = ActionExecutor::new(Desktop::from_simulated(desktop.clone()), planner);
    Harness {
        desktop,
        dispatcher: MessageDispatcher::new(executor),
    }
}

/// Polls the dispatcher until the request reaches the wanted status.
pub fn poll_until(dispatcher: &MessageDispatcher, request_id: &str, status: &str) -> Value {
    for _ in 0..400 {
        let response = dispatcher.dispatch(&serde_json::json!({
            "action": "poll",
            "params": {"request_id": request_id},
        }));
        if response["status"] == status {
            return response;
        }
        thread::sleep(Duration::from_millis(5));
    }
    panic!("request {request_id} never reached status {status}");
}
