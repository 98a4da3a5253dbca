//! Translates validated actions into synthetic input events.
//!
//! Timing mirrors the cadence a real desktop needs to register events:
//! moves settle for 10 ms, button edges are 50 ms apart, chords hold for
//! 50 ms before releasing, and typed characters flow at 20 ms intervals.

use std::collections::HashMap;
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use once_cell::sync::Lazy;
use tracing::debug;

use crate::platform::{InputSink, Key, MouseButton};

const MOVE_SETTLE: Duration = Duration::from_millis(10);
const BUTTON_GAP: Duration = Duration::from_millis(50);
const CHORD_HOLD: Duration = Duration::from_millis(50);
const KEY_SETTLE: Duration = Duration::from_millis(10);
const CHAR_GAP: Duration = Duration::from_millis(20);

static KEY_TABLE: Lazy<HashMap<&'static str, Key>> = Lazy::new(|| {
    HashMap::from([
        ("ctrl", Key::Ctrl),
        ("shift", Key::Shift),
        ("alt", Key::Alt),
        ("enter", Key::Enter),
        ("tab", Key::Tab),
        ("escape", Key::Escape),
        ("space", Key::Space),
        ("delete", Key::Delete),
        ("backspace", Key::Backspace),
        ("LWin", Key::LeftWin),
        ("lwin", Key::LeftWin),
        ("win", Key::LeftWin),
        ("RWin", Key::RightWin),
        ("rwin", Key::RightWin),
        ("left", Key::Left),
        ("right", Key::Right),
        ("up", Key::Up),
        ("down", Key::Down),
        ("F1", Key::Function(1)),
        ("F2", Key::Function(2)),
        ("F3", Key::Function(3)),
        ("F4", Key::Function(4)),
        ("F5", Key::Function(5)),
        ("F6", Key::Function(6)),
        ("F7", Key::Function(7)),
        ("F8", Key::Function(8)),
        ("F9", Key::Function(9)),
        ("F10", Key::Function(10)),
        ("F11", Key::Function(11)),
        ("F12", Key::Function(12)),
    ])
});

/// Resolves a wire key name. Names outside the table and longer than one
/// character fall through to `Unidentified`, which injects nothing.
pub fn resolve_key(name: &str) -> Key {
    if let Some(key) = KEY_TABLE.get(name) {
        return *key;
    }
    let mut chars = name.chars();
    match (chars.next(), chars.next()) {
        (Some(ch), None) => Key::Char(ch),
        _ => Key::Unidentified,
    }
}

/// Serialized, blocking input injection over a platform sink.
///
/// Screen dimensions are read once at construction; the click bounds check
/// in the executor relies on them staying fixed.
pub struct InputDispatcher {
    sink: Arc<dyn InputSink>,
    width: u32,
    height: u32,
}

impl InputDispatcher {
    pub fn new(sink: Arc<dyn InputSink>, dimensions: (u32, u32)) -> Self {
        Self {
            sink,
            width: dimensions.0,
            height: dimensions.1,
        }
    }

    pub fn dimensions(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    pub fn click(&self, x: i32, y: i32, button: MouseButton, double: bool) {
        self.single_click(x, y, button);
        if double {
            thread::sleep(BUTTON_GAP);
            self.single_click(x, y, button);
        }
    }

    fn single_click(&self, x: i32, y: i32, button: MouseButton) {
        self.sink.mouse_move(x, y);
        thread::sleep(MOVE_SETTLE);
        self.sink.mouse_button(button, true, x, y);
        thread::sleep(BUTTON_GAP);
        self.sink.mouse_button(button, false, x, y);
        thread::sleep(BUTTON_GAP);
    }

    pub fn type_text(&self, text: &str) {
        for ch in text.chars() {
            match ch {
                '\n' | '\r' => self.tap(Key::Enter),
                '\t' => self.tap(Key::Tab),
                _ => self.sink.text_char(ch),
            }
            thread::sleep(CHAR_GAP);
        }
    }

    pub fn scroll(&self, delta: i32, position: Option<(i32, i32)>) {
        if let Some((x, y)) = position {
            self.sink.mouse_move(x, y);
            thread::sleep(MOVE_SETTLE);
        }
        self.sink.scroll_wheel(delta);
        thread::sleep(BUTTON_GAP);
    }

    /// Presses every key in order, holds the chord, then releases in
    /// reverse order.
    pub fn press_keys(&self, names: &[String]) {
        let keys: Vec<Key> = names.iter().map(|n| resolve_key(n)).collect();
        debug!(?keys, "pressing key chord");
        for key in &keys {
            self.sink.key(*key, true);
            thread::sleep(KEY_SETTLE);
        }
        thread::sleep(CHORD_HOLD);
        for key in keys.iter().rev() {
            self.sink.key(*key, false);
            thread::sleep(KEY_SETTLE);
        }
    }

    pub fn wait(&self, ms: u64) {
        thread::sleep(Duration::from_millis(ms));
    }

    fn tap(&self, key: Key) {
        self.sink.key(key, true);
        thread::sleep(KEY_SETTLE);
        self.sink.key(key, false);
        thread::sleep(KEY_SETTLE);
    }
}
