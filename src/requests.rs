//! Async request manager.
//!
//! Long-running planner calls are serialized behind opaque request IDs: a
//! single worker thread drains a FIFO queue, the state table is the sole
//! source of truth, and finished entries age out five minutes after their
//! terminal transition. Cancellation is cooperative: queued entries are
//! dropped before they run, in-flight work finishes but its result is
//! discarded.

use std::collections::{HashMap, VecDeque};
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use parking_lot::{Condvar, Mutex};
use rand::Rng;
use serde_json::{json, Value};
use tracing::{debug, info};

use crate::util::panic_message;

pub const DEFAULT_TTL: Duration = Duration::from_secs(5 * 60);

const ID_LEN: usize = 8;
const ID_CHARS: &[u8] = b"abcdefghijklmnopqrstuvwxyz0123456789";

/// Deferred computation producing a response object (`success` decides the
/// terminal state).
pub type Work = Box<dyn FnOnce() -> Value + Send + 'static>;

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
enum Status {
    Queued,
    Processing,
    Complete,
    Error,
    Cancelled,
}

impl Status {
    fn as_str(self) -> &'static str {
        match self {
            Status::Queued => "queued",
            Status::Processing => "processing",
            Status::Complete => "complete",
            Status::Error => "error",
            Status::Cancelled => "cancelled",
        }
    }

    fn is_terminal(self) -> bool {
        matches!(self, Status::Complete | Status::Error | Status::Cancelled)
    }
}

struct Entry {
    status: Status,
    work: Option<Work>,
    cancel: bool,
    result: Option<Value>,
    completed_at: Option<Instant>,
}

struct State {
    running: bool,
    queue: VecDeque<String>,
    entries: HashMap<String, Entry>,
}

struct Shared {
    state: Mutex<State>,
    ready: Condvar,
    ttl: Duration,
}

pub struct AsyncRequestManager {
    shared: Arc<Shared>,
    worker: Mutex<Option<JoinHandle<()>>>,
}

impl AsyncRequestManager {
    pub fn new() -> Self {
        Self::with_ttl(DEFAULT_TTL)
    }

    pub fn with_ttl(ttl: Duration) -> Self {
        let shared = Arc::new(Shared {
            state: Mutex::new(State {
                running: true,
                queue: VecDeque::new(),
                entries: HashMap::new(),
            }),
            ready: Condvar::new(),
            ttl,
        });

        let worker_shared = Arc::clone(&shared);
        let worker = thread::spawn(move || worker_loop(worker_shared));
        info!(target: "requests", "request worker started");

        Self {
            shared,
            worker: Mutex::new(Some(worker)),
        }
    }

    /// Enqueues work and returns its fresh 8-character ID. Stale terminal
    /// entries are evicted on the way in.
    pub fn submit(&self, work: Work) -> String {
        let mut state = self.shared.state.lock();
        evict_stale(&mut state, self.shared.ttl);

        let id = loop {
            let candidate = generate_id();
            if !state.entries.contains_key(&candidate) {
                break candidate;
            }
        };

        state.entries.insert(
            id.clone(),
            Entry {
                status: Status::Queued,
                work: Some(work),
                cancel: false,
                result: None,
                completed_at: None,
            },
        );
        state.queue.push_back(id.clone());
        self.shared.ready.notify_one();
        debug!(target: "requests", request_id = %id, pending = state.queue.len(), "request queued");
        id
    }

    /// Reports status; terminal `complete`/`error` entries also carry the
    /// result, with `actions` and `error` lifted to the top level.
    pub fn poll(&self, request_id: &str) -> Value {
        let state = self.shared.state.lock();
        let Some(entry) = state.entries.get(request_id) else {
            return json!({"request_id": request_id, "status": "not_found"});
        };

        let mut response = json!({
            "request_id": request_id,
            "status": entry.status.as_str(),
        });
        if matches!(entry.status, Status::Complete | Status::Error) {
            if let Some(result) = &entry.result {
                response["result"] = result.clone();
                if let Some(actions) = result.get("actions") {
                    response["actions"] = actions.clone();
                }
                if let Some(error) = result.get("error") {
                    response["error"] = error.clone();
                }
            }
        }
        response
    }

    /// Queued requests cancel immediately; in-flight requests are flagged
    /// and discarded when their work returns; terminal states are left
    /// untouched.
    pub fn cancel(&self, request_id: &str) -> Value {
        let mut state = self.shared.state.lock();
        let Some(entry) = state.entries.get_mut(request_id) else {
            return json!({"request_id": request_id, "status": "not_found"});
        };

        match entry.status {
            Status::Queued => {
                entry.status = Status::Cancelled;
                entry.completed_at = Some(Instant::now());
                info!(target: "requests", request_id, "cancelled before start");
            }
            Status::Processing => {
                entry.cancel = true;
                info!(target: "requests", request_id, "cancel flagged for in-flight request");
            }
            _ => {}
        }

        json!({"request_id": request_id, "status": entry.status.as_str()})
    }

    /// Stops the worker. Queued entries are abandoned; in-flight work runs
    /// to completion before the thread joins.
    pub fn shutdown(&self) {
        {
            let mut state = self.shared.state.lock();
            if !state.running {
                return;
            }
            state.running = false;
        }
        self.shared.ready.notify_all();
        if let Some(worker) = self.worker.lock().take() {
            let _ = worker.join();
        }
        info!(target: "requests", "request worker stopped");
    }
}

impl Default for AsyncRequestManager {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for AsyncRequestManager {
    fn drop(&mut self) {
        self.shutdown();
    }
}

fn worker_loop(shared: Arc<Shared>) {
    loop {
        let (id, work) = {
            let mut state = shared.state.lock();
            loop {
                if !state.running {
                    return;
                }
                let Some(id) = state.queue.pop_front() else {
                    shared.ready.wait(&mut state);
                    continue;
                };
                // Entries cancelled while queued are skipped, not run.
                match state.entries.get_mut(&id) {
                    Some(entry) if entry.status == Status::Queued => {
                        entry.status = Status::Processing;
                        if let Some(work) = entry.work.take() {
                            break (id, work);
                        }
                    }
                    _ => {}
                }
            }
        };

        debug!(target: "requests", request_id = %id, "request processing");
        let outcome = panic::catch_unwind(AssertUnwindSafe(work));

        let mut state = shared.state.lock();
        let Some(entry) = state.entries.get_mut(&id) else {
            continue;
        };
        match outcome {
            Ok(result) => {
                if entry.cancel {
                    entry.status = Status::Cancelled;
                } else {
                    let succeeded = result
                        .get("success")
                        .and_then(Value::as_bool)
                        .unwrap_or(false);
                    entry.status = if succeeded {
                        Status::Complete
                    } else {
                        Status::Error
                    };
                    entry.result = Some(result);
                }
            }
            Err(payload) => {
                entry.status = Status::Error;
                entry.result = Some(json!({
                    "success": false,
                    "error": panic_message(payload),
                }));
            }
        }
        entry.completed_at = Some(Instant::now());
        debug!(target: "requests", request_id = %id, status = entry.status.as_str(), "request finished");
    }
}

/// Called under the state lock on every submit.
fn evict_stale(state: &mut State, ttl: Duration) {
    let now = Instant::now();
    state.entries.retain(|id, entry| {
        let stale = entry.status.is_terminal()
            && entry
                .completed_at
                .map(|at| now.duration_since(at) > ttl)
                .unwrap_or(true);
        if stale {
            debug!(target: "requests", request_id = %id, "evicting stale request");
        }
        !stale
    });
}

fn generate_id() -> String {
    let mut rng = rand::thread_rng();
    (0..ID_LEN)
        .map(|_| ID_CHARS[rng.gen_range(0..ID_CHARS.len())] as char)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn wait_for_status(manager: &AsyncRequestManager, id: &str, status: &str) -> Value {
        for _ in 0..200 {
            let response = manager.poll(id);
            if response["status"] == status {
                return response;
            }
            thread::sleep(Duration::from_millis(5));
        }
        panic!("request {id} never reached status {status}");
    }

    #[test]
    fn ids_are_eight_lowercase_alphanumerics() {
        let id = generate_id();
        assert_eq!(id.len(), 8);
        assert!(id
            .chars()
            .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit()));
    }

    #[test]
    fn requests_run_fifo_without_overlap() {
        let manager = AsyncRequestManager::new();
        let intervals: Arc<Mutex<Vec<(usize, Instant, Instant)>>> =
            Arc::new(Mutex::new(Vec::new()));

        let mut ids = Vec::new();
        for n in 0..4 {
            let intervals = Arc::clone(&intervals);
            ids.push(manager.submit(Box::new(move || {
                let started = Instant::now();
                thread::sleep(Duration::from_millis(20));
                intervals.lock().push((n, started, Instant::now()));
                json!({"success": true})
            })));
        }
        for id in &ids {
            wait_for_status(&manager, id, "complete");
        }

        let intervals = intervals.lock();
        assert_eq!(
            intervals.iter().map(|(n, _, _)| *n).collect::<Vec<_>>(),
            vec![0, 1, 2, 3],
            "requests must start in submission order"
        );
        for window in intervals.windows(2) {
            assert!(
                window[0].2 <= window[1].1,
                "request intervals must not overlap"
            );
        }
    }

    #[test]
    fn work_outcome_decides_terminal_state() {
        let manager = AsyncRequestManager::new();

        let ok = manager.submit(Box::new(|| json!({"success": true, "actions": [1]})));
        let response = wait_for_status(&manager, &ok, "complete");
        assert_eq!(response["actions"], json!([1]));
        assert_eq!(response["result"]["success"], json!(true));

        let failed = manager.submit(Box::new(|| json!({"success": false, "error": "boom"})));
        let response = wait_for_status(&manager, &failed, "error");
        assert_eq!(response["error"], json!("boom"));
    }

    #[test]
    fn panicking_work_becomes_error_with_message() {
        let manager = AsyncRequestManager::new();
        let id = manager.submit(Box::new(|| panic!("planner exploded")));
        let response = wait_for_status(&manager, &id, "error");
        assert_eq!(response["error"], json!("planner exploded"));
    }

    #[test]
    fn cancel_before_start_never_runs() {
        let manager = AsyncRequestManager::new();
        let ran = Arc::new(AtomicUsize::new(0));

        // Occupy the worker so the next submission stays queued.
        let blocker = manager.submit(Box::new(|| {
            thread::sleep(Duration::from_millis(50));
            json!({"success": true})
        }));

        let ran_in_cancelled = Arc::clone(&ran);
        let cancelled = manager.submit(Box::new(move || {
            ran_in_cancelled.fetch_add(1, Ordering::SeqCst);
            json!({"success": true})
        }));
        let response = manager.cancel(&cancelled);
        assert_eq!(response["status"], json!("cancelled"));

        let ran_in_follower = Arc::clone(&ran);
        let follower = manager.submit(Box::new(move || {
            ran_in_follower.fetch_add(10, Ordering::SeqCst);
            json!({"success": true})
        }));

        wait_for_status(&manager, &blocker, "complete");
        wait_for_status(&manager, &follower, "complete");
        assert_eq!(
            ran.load(Ordering::SeqCst),
            10,
            "cancelled work must never run; later work runs normally"
        );
        assert_eq!(manager.poll(&cancelled)["status"], json!("cancelled"));
    }

    #[test]
    fn cancel_in_flight_discards_result() {
        let manager = AsyncRequestManager::new();
        let id = manager.submit(Box::new(|| {
            thread::sleep(Duration::from_millis(60));
            json!({"success": true, "actions": ["x"]})
        }));

        wait_for_status(&manager, &id, "processing");
        let response = manager.cancel(&id);
        assert_eq!(response["status"], json!("processing"));

        let response = wait_for_status(&manager, &id, "cancelled");
        assert!(response.get("result").is_none());
        assert!(response.get("actions").is_none());
        assert!(response.get("error").is_none());
    }

    #[test]
    fn cancel_on_terminal_state_is_a_noop() {
        let manager = AsyncRequestManager::new();
        let id = manager.submit(Box::new(|| json!({"success": true})));
        wait_for_status(&manager, &id, "complete");
        let response = manager.cancel(&id);
        assert_eq!(response["status"], json!("complete"));
    }

    #[test]
    fn unknown_ids_report_not_found() {
        let manager = AsyncRequestManager::new();
        assert_eq!(manager.poll("zzzzzzzz")["status"], json!("not_found"));
        assert_eq!(manager.cancel("zzzzzzzz")["status"], json!("not_found"));
    }

    #[test]
    fn stale_terminal_entries_evict_on_submit() {
        let manager = AsyncRequestManager::with_ttl(Duration::from_millis(30));
        let id = manager.submit(Box::new(|| json!({"success": true})));
        wait_for_status(&manager, &id, "complete");

        thread::sleep(Duration::from_millis(60));
        // Still visible until the next submit sweeps.
        assert_eq!(manager.poll(&id)["status"], json!("complete"));

        let fresh = manager.submit(Box::new(|| json!({"success": true})));
        assert_eq!(manager.poll(&id)["status"], json!("not_found"));
        wait_for_status(&manager, &fresh, "complete");
    }

    #[test]
    fn shutdown_abandons_queued_work() {
        let manager = AsyncRequestManager::new();
        let blocker = manager.submit(Box::new(|| {
            thread::sleep(Duration::from_millis(40));
            json!({"success": true})
        }));
        let ran = Arc::new(AtomicUsize::new(0));
        let ran_clone = Arc::clone(&ran);
        let queued = manager.submit(Box::new(move || {
            ran_clone.fetch_add(1, Ordering::SeqCst);
            json!({"success": true})
        }));

        wait_for_status(&manager, &blocker, "processing");
        manager.shutdown();

        assert_eq!(ran.load(Ordering::SeqCst), 0);
        // The in-flight blocker ran to completion before the join.
        assert_eq!(manager.poll(&blocker)["status"], json!("complete"));
        assert_eq!(manager.poll(&queued)["status"], json!("queued"));
    }
}
