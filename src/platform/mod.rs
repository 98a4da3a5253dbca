//! Seams to the operating system.
//!
//! Screen capture, accessibility-tree enumeration, input injection, and
//! secret storage are owned by the embedding platform. The engine only
//! depends on the port traits below; backends attach at startup.

pub mod encode;
pub mod simulated;

use std::sync::Arc;

use serde_json::Value;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum PlatformError {
    #[error("screen capture failed: {0}")]
    Capture(String),
    #[error("UI tree enumeration failed: {0}")]
    UiTree(String),
    #[error("credential vault failure: {0}")]
    Vault(String),
    #[error("image encoding failed: {0}")]
    Encode(String),
    #[error("{0}")]
    Unsupported(String),
}

/// One captured desktop frame: tightly packed BGRA rows.
#[derive(Debug, Clone)]
pub struct RawFrame {
    pub bgra: Vec<u8>,
    pub width: u32,
    pub height: u32,
}

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum MouseButton {
    Left,
    Right,
    Middle,
}

/// Abstract key identity handed to the injector.
///
/// `Unidentified` is the zero-scancode case: backends must swallow it
/// without emitting an event.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Key {
    Ctrl,
    Shift,
    Alt,
    Enter,
    Tab,
    Escape,
    Space,
    Delete,
    Backspace,
    LeftWin,
    RightWin,
    Function(u8),
    Left,
    Right,
    Up,
    Down,
    Char(char),
    Unidentified,
}

pub trait ScreenSource: Send + Sync {
    /// Full desktop dimensions in pixels. Stable for the process lifetime.
    fn dimensions(&self) -> (u32, u32);
    fn capture(&self) -> Result<RawFrame, PlatformError>;
}

pub trait UiTreeSource: Send + Sync {
    /// Nested accessibility snapshot: `name`, `type`, `className`,
    /// `bounds {x,y,width,height}`, `enabled`, optional `children`.
    /// Depth is capped at 5 and fan-out at 20 children per node.
    fn ui_tree(&self) -> Result<Value, PlatformError>;
}

/// Synthetic input primitives. All calls block until the event is queued.
/// Wheel ticks are logical notches; backends scale to native wheel units.
pub trait InputSink: Send + Sync {
    fn mouse_move(&self, x: i32, y: i32);
    fn mouse_button(&self, button: MouseButton, down: bool, x: i32, y: i32);
    fn scroll_wheel(&self, ticks: i32);
    fn key(&self, key: Key, down: bool);
    /// One full Unicode keystroke (down and up) for a single character.
    fn text_char(&self, ch: char);
}

pub trait SecretVault: Send + Sync {
    fn store(&self, target: &str, secret: &str) -> Result<(), PlatformError>;
    fn load(&self, target: &str) -> Option<String>;
    /// Deleting an absent entry reports success.
    fn delete(&self, target: &str) -> bool;
    fn has(&self, target: &str) -> bool;
}

/// The bundle of ports the engine runs against.
#[derive(Clone)]
pub struct Desktop {
    pub screen: Arc<dyn ScreenSource>,
    pub ui: Arc<dyn UiTreeSource>,
    pub input: Arc<dyn InputSink>,
    pub vault: Arc<dyn SecretVault>,
}

impl Desktop {
    /// In-process desktop used by `--backend simulated` and the test suites.
    pub fn simulated() -> Self {
        let sim = Arc::new(simulated::SimulatedDesktop::new());
        Self::from_simulated(sim)
    }

    pub fn from_simulated(sim: Arc<simulated::SimulatedDesktop>) -> Self {
        Self {
            screen: sim.clone(),
            ui: sim.clone(),
            input: sim.clone(),
            vault: sim,
        }
    }

    /// Native OS backend. Platform integrations attach through the port
    /// traits; a build without one cannot drive a real desktop.
    pub fn native() -> Result<Self, PlatformError> {
        Err(PlatformError::Unsupported(
            "no native desktop backend is built into this binary".to_string(),
        ))
    }
}
