//! In-process desktop fake.
//!
//! Backs `--backend simulated` and the test suites: a fixed 1920x1080
//! screen, a small scripted accessibility tree, an input event log, and an
//! in-memory secret vault.

use std::collections::HashMap;

use parking_lot::Mutex;
use serde_json::{json, Value};

use super::{
    InputSink, Key, MouseButton, PlatformError, RawFrame, ScreenSource, SecretVault, UiTreeSource,
};

pub const SIMULATED_WIDTH: u32 = 1920;
pub const SIMULATED_HEIGHT: u32 = 1080;

/// Everything the injector was asked to do, in order.
#[derive(Clone, Debug, PartialEq)]
pub enum InputEvent {
    MouseMove { x: i32, y: i32 },
    MouseButton { button: MouseButton, down: bool, x: i32, y: i32 },
    Wheel { ticks: i32 },
    Key { key: Key, down: bool },
    Char(char),
}

#[derive(Default)]
pub struct SimulatedDesktop {
    events: Mutex<Vec<InputEvent>>,
    secrets: Mutex<HashMap<String, String>>,
}

impl SimulatedDesktop {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of the injected events so far.
    pub fn events(&self) -> Vec<InputEvent> {
        self.events.lock().clone()
    }

    pub fn clear_events(&self) {
        self.events.lock().clear();
    }

    fn record(&self, event: InputEvent) {
        self.events.lock().push(event);
    }
}

impl ScreenSource for SimulatedDesktop {
    fn dimensions(&self) -> (u32, u32) {
        (SIMULATED_WIDTH, SIMULATED_HEIGHT)
    }

    fn capture(&self) -> Result<RawFrame, PlatformError> {
        // Horizontal gradient so the encoded PNG is not a degenerate image.
        let (width, height) = self.dimensions();
        let mut bgra = Vec::with_capacity((width * height * 4) as usize);
        for _row in 0..height {
            for col in 0..width {
                let shade = (col * 255 / width) as u8;
                bgra.extend_from_slice(&[shade, shade, shade, 0xff]);
            }
        }
        Ok(RawFrame { bgra, width, height })
    }
}

impl UiTreeSource for SimulatedDesktop {
    fn ui_tree(&self) -> Result<Value, PlatformError> {
        Ok(json!({
            "name": "Desktop",
            "type": "Pane",
            "className": "SimulatedDesktop",
            "bounds": {"x": 0, "y": 0, "width": SIMULATED_WIDTH, "height": SIMULATED_HEIGHT},
            "enabled": true,
            "children": [
                {
                    "name": "Demo Window",
                    "type": "Window",
                    "className": "DemoWindow",
                    "bounds": {"x": 200, "y": 120, "width": 800, "height": 600},
                    "enabled": true,
                    "children": [
                        {
                            "name": "OK",
                            "type": "Button",
                            "className": "Button",
                            "bounds": {"x": 520, "y": 640, "width": 96, "height": 32},
                            "enabled": true
                        },
                        {
                            "name": "Search",
                            "type": "Edit",
                            "className": "Edit",
                            "bounds": {"x": 240, "y": 180, "width": 400, "height": 28},
                            "enabled": true
                        }
                    ]
                },
                {
                    "name": "Taskbar",
                    "type": "Pane",
                    "className": "Shell_TrayWnd",
                    "bounds": {"x": 0, "y": 1040, "width": SIMULATED_WIDTH, "height": 40},
                    "enabled": true
                }
            ]
        }))
    }
}

impl InputSink for SimulatedDesktop {
    fn mouse_move(&self, x: i32, y: i32) {
        self.record(InputEvent::MouseMove { x, y });
    }

    fn mouse_button(&self, button: MouseButton, down: bool, x: i32, y: i32) {
        self.record(InputEvent::MouseButton { button, down, x, y });
    }

    fn scroll_wheel(&self, ticks: i32) {
        self.record(InputEvent::Wheel { ticks });
    }

    fn key(&self, key: Key, down: bool) {
        if key == Key::Unidentified {
            return;
        }
        self.record(InputEvent::Key { key, down });
    }

    fn text_char(&self, ch: char) {
        self.record(InputEvent::Char(ch));
    }
}

impl SecretVault for SimulatedDesktop {
    fn store(&self, target: &str, secret: &str) -> Result<(), PlatformError> {
        self.secrets
            .lock()
            .insert(target.to_string(), secret.to_string());
        Ok(())
    }

    fn load(&self, target: &str) -> Option<String> {
        self.secrets.lock().get(target).cloned()
    }

    fn delete(&self, target: &str) -> bool {
        self.secrets.lock().remove(target);
        true
    }

    fn has(&self, target: &str) -> bool {
        self.secrets.lock().contains_key(target)
    }
}
