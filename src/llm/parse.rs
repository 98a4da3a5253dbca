//! Post-processing for provider reply text.
//!
//! Providers are told to answer with a bare JSON array, but replies often
//! arrive wrapped in a Markdown code fence. One fence layer is stripped;
//! anything deeper is the model's problem and fails the parse.

use serde_json::Value;
use thiserror::Error;
use tracing::debug;

use crate::actions::Action;

pub const DEFAULT_CONFIDENCE: f64 = 0.7;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum PlanParseError {
    #[error("AI did not return valid JSON")]
    InvalidJson,
    #[error("AI response is not an array of actions")]
    NotAnArray,
    #[error("AI returned no valid actions")]
    NoValidActions,
}

/// Removes one layer of triple-backtick fencing, language tag included.
pub fn strip_code_fence(text: &str) -> &str {
    let text = text.trim();
    if !text.starts_with("```") {
        return text;
    }
    let body = match text.find('\n') {
        Some(pos) => &text[pos + 1..],
        None => text,
    };
    let body = match body.rfind("```") {
        Some(pos) => &body[..pos],
        None => body,
    };
    body.trim()
}

/// Runs the full reply pipeline: trim, unfence, parse, validate each
/// element, inject the default confidence. Elements that are not objects,
/// carry an unrecognized tag, or fail validation are dropped silently.
pub fn parse_actions(reply: &str) -> Result<Vec<Value>, PlanParseError> {
    let text = strip_code_fence(reply);

    let parsed: Value = serde_json::from_str(text).map_err(|_| PlanParseError::InvalidJson)?;
    let Value::Array(items) = parsed else {
        return Err(PlanParseError::NotAnArray);
    };

    let mut validated = Vec::with_capacity(items.len());
    for mut item in items {
        if let Err(err) = Action::from_value(&item) {
            debug!(error = %err, "dropping invalid planned action");
            continue;
        }
        if let Some(object) = item.as_object_mut() {
            object
                .entry("confidence")
                .or_insert_with(|| DEFAULT_CONFIDENCE.into());
            validated.push(item);
        }
    }

    if validated.is_empty() {
        return Err(PlanParseError::NoValidActions);
    }
    Ok(validated)
}
