//! The automation action vocabulary and its validator.
//!
//! Wire shape: `{"action": <tag>, "params": {...}, "confidence"?: <n>}`.
//! Validation here is shape-only and total over the tag set; the screen
//! bounds check happens at dispatch time, where the cached dimensions live.

use serde_json::Value;
use thiserror::Error;

use crate::platform::MouseButton;

pub const MAX_COORDINATE: f64 = 10_000.0;
pub const MAX_TEXT_CHARS: usize = 10_000;
pub const MAX_WAIT_MS: f64 = 30_000.0;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ActionError {
    #[error("Missing 'action' field")]
    MissingTag,
    #[error("Unknown action type: {0}")]
    UnknownTag(String),
    #[error("Missing x or y coordinates")]
    MissingCoordinates,
    #[error("Coordinates out of screen bounds")]
    OutOfBounds,
    #[error("Missing text parameter")]
    MissingText,
    #[error("Text must not be empty")]
    EmptyText,
    #[error("Text too long (max 10000 chars)")]
    TextTooLong,
    #[error("Missing delta parameter")]
    MissingDelta,
    #[error("Missing keys parameter")]
    MissingKeys,
    #[error("Missing ms parameter")]
    MissingMs,
    #[error("Wait duration must be 0-30000ms")]
    WaitOutOfRange,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Action {
    Click {
        x: i32,
        y: i32,
        button: MouseButton,
        double: bool,
    },
    Type {
        text: String,
    },
    Scroll {
        delta: i32,
        x: Option<i32>,
        y: Option<i32>,
    },
    PressKeys {
        keys: Vec<String>,
    },
    Wait {
        ms: u64,
    },
}

impl Action {
    /// Parses and validates one action object against the per-tag rules.
    pub fn from_value(value: &Value) -> Result<Self, ActionError> {
        let tag = value
            .get("action")
            .and_then(Value::as_str)
            .ok_or(ActionError::MissingTag)?;
        let empty = Value::Object(Default::default());
        let params = value.get("params").unwrap_or(&empty);

        match tag {
            "click" => {
                let x = number(params, "x").ok_or(ActionError::MissingCoordinates)?;
                let y = number(params, "y").ok_or(ActionError::MissingCoordinates)?;
                if !(0.0..=MAX_COORDINATE).contains(&x) || !(0.0..=MAX_COORDINATE).contains(&y) {
                    return Err(ActionError::OutOfBounds);
                }
                Ok(Action::Click {
                    x: x as i32,
                    y: y as i32,
                    button: parse_button(params.get("button").and_then(Value::as_str)),
                    double: params
                        .get("double")
                        .and_then(Value::as_bool)
                        .unwrap_or(false),
                })
            }
            "type" => {
                let text = params
                    .get("text")
                    .and_then(Value::as_str)
                    .ok_or(ActionError::MissingText)?;
                if text.is_empty() {
                    return Err(ActionError::EmptyText);
                }
                if text.chars().count() > MAX_TEXT_CHARS {
                    return Err(ActionError::TextTooLong);
                }
                Ok(Action::Type {
                    text: text.to_string(),
                })
            }
            "scroll" => {
                let delta = number(params, "delta").ok_or(ActionError::MissingDelta)?;
                Ok(Action::Scroll {
                    delta: delta as i32,
                    x: number(params, "x").map(|v| v as i32),
                    y: number(params, "y").map(|v| v as i32),
                })
            }
            "press_keys" => {
                let keys = params
                    .get("keys")
                    .and_then(Value::as_array)
                    .ok_or(ActionError::MissingKeys)?;
                if keys.is_empty() {
                    return Err(ActionError::MissingKeys);
                }
                let keys = keys
                    .iter()
                    .map(|k| k.as_str().map(str::to_string))
                    .collect::<Option<Vec<_>>>()
                    .ok_or(ActionError::MissingKeys)?;
                Ok(Action::PressKeys { keys })
            }
            "wait" => {
                let ms = number(params, "ms").ok_or(ActionError::MissingMs)?;
                if !(0.0..=MAX_WAIT_MS).contains(&ms) {
                    return Err(ActionError::WaitOutOfRange);
                }
                Ok(Action::Wait { ms: ms as u64 })
            }
            other => Err(ActionError::UnknownTag(other.to_string())),
        }
    }

    pub fn tag(&self) -> &'static str {
        match self {
            Action::Click { .. } => "click",
            Action::Type { .. } => "type",
            Action::Scroll { .. } => "scroll",
            Action::PressKeys { .. } => "press_keys",
            Action::Wait { .. } => "wait",
        }
    }
}

fn number(params: &Value, field: &str) -> Option<f64> {
    params.get(field).and_then(Value::as_f64)
}

fn parse_button(name: Option<&str>) -> MouseButton {
    match name {
        Some("right") => MouseButton::Right,
        Some("middle") => MouseButton::Middle,
        _ => MouseButton::Left,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn click(x: f64, y: f64) -> Value {
        json!({"action": "click", "params": {"x": x, "y": y}})
    }

    #[test]
    fn click_boundaries_accepted() {
        assert!(Action::from_value(&click(0.0, 0.0)).is_ok());
        assert!(Action::from_value(&click(10_000.0, 10_000.0)).is_ok());
    }

    #[test]
    fn click_out_of_range_rejected() {
        assert_eq!(
            Action::from_value(&click(-1.0, 5.0)),
            Err(ActionError::OutOfBounds)
        );
        assert_eq!(
            Action::from_value(&click(10_001.0, 5.0)),
            Err(ActionError::OutOfBounds)
        );
    }

    #[test]
    fn click_requires_numeric_coordinates() {
        let value = json!({"action": "click", "params": {"x": "12", "y": 5}});
        assert_eq!(
            Action::from_value(&value),
            Err(ActionError::MissingCoordinates)
        );
        let value = json!({"action": "click", "params": {"y": 5}});
        assert_eq!(
            Action::from_value(&value),
            Err(ActionError::MissingCoordinates)
        );
    }

    #[test]
    fn click_button_defaults_to_left() {
        let parsed = Action::from_value(&click(10.0, 10.0)).expect("valid");
        assert_eq!(
            parsed,
            Action::Click {
                x: 10,
                y: 10,
                button: MouseButton::Left,
                double: false
            }
        );

        let value = json!({
            "action": "click",
            "params": {"x": 1, "y": 2, "button": "middle", "double": true}
        });
        assert_eq!(
            Action::from_value(&value).expect("valid"),
            Action::Click {
                x: 1,
                y: 2,
                button: MouseButton::Middle,
                double: true
            }
        );
    }

    #[test]
    fn type_boundaries() {
        let one = json!({"action": "type", "params": {"text": "a"}});
        assert!(Action::from_value(&one).is_ok());

        let max = json!({"action": "type", "params": {"text": "x".repeat(MAX_TEXT_CHARS)}});
        assert!(Action::from_value(&max).is_ok());

        let over = json!({"action": "type", "params": {"text": "x".repeat(MAX_TEXT_CHARS + 1)}});
        assert_eq!(Action::from_value(&over), Err(ActionError::TextTooLong));

        let empty = json!({"action": "type", "params": {"text": ""}});
        assert_eq!(Action::from_value(&empty), Err(ActionError::EmptyText));

        let missing = json!({"action": "type", "params": {}});
        assert_eq!(Action::from_value(&missing), Err(ActionError::MissingText));
    }

    #[test]
    fn scroll_requires_delta_only() {
        let bare = json!({"action": "scroll", "params": {"delta": -3}});
        assert_eq!(
            Action::from_value(&bare).expect("valid"),
            Action::Scroll {
                delta: -3,
                x: None,
                y: None
            }
        );

        let positioned = json!({"action": "scroll", "params": {"delta": 2, "x": 500, "y": 400}});
        assert_eq!(
            Action::from_value(&positioned).expect("valid"),
            Action::Scroll {
                delta: 2,
                x: Some(500),
                y: Some(400)
            }
        );

        let missing = json!({"action": "scroll", "params": {}});
        assert_eq!(Action::from_value(&missing), Err(ActionError::MissingDelta));
    }

    #[test]
    fn press_keys_requires_non_empty_strings() {
        let ok = json!({"action": "press_keys", "params": {"keys": ["ctrl", "s"]}});
        assert!(Action::from_value(&ok).is_ok());

        let empty = json!({"action": "press_keys", "params": {"keys": []}});
        assert_eq!(Action::from_value(&empty), Err(ActionError::MissingKeys));

        let mixed = json!({"action": "press_keys", "params": {"keys": ["ctrl", 7]}});
        assert_eq!(Action::from_value(&mixed), Err(ActionError::MissingKeys));
    }

    #[test]
    fn wait_boundaries() {
        let zero = json!({"action": "wait", "params": {"ms": 0}});
        assert!(Action::from_value(&zero).is_ok());

        let max = json!({"action": "wait", "params": {"ms": 30_000}});
        assert!(Action::from_value(&max).is_ok());

        let over = json!({"action": "wait", "params": {"ms": 30_001}});
        assert_eq!(Action::from_value(&over), Err(ActionError::WaitOutOfRange));

        let negative = json!({"action": "wait", "params": {"ms": -1}});
        assert_eq!(
            Action::from_value(&negative),
            Err(ActionError::WaitOutOfRange)
        );
    }

    #[test]
    fn unknown_and_missing_tags() {
        let unknown = json!({"action": "teleport", "params": {}});
        assert_eq!(
            Action::from_value(&unknown),
            Err(ActionError::UnknownTag("teleport".to_string()))
        );

        let missing = json!({"params": {}});
        assert_eq!(Action::from_value(&missing), Err(ActionError::MissingTag));
    }
}
