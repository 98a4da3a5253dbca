//! Shared planner prompt.

/// Instruction block sent to every provider. The reply contract is a bare
/// JSON array of the five action schemas; the parser enforces it.
pub const SYSTEM_PROMPT: &str = r#"You are a desktop automation assistant. Analyze the screenshot and UI tree, then return a JSON array of actions to accomplish the user's request.

Available actions:
- click: {"action": "click", "params": {"x": 100, "y": 200}, "confidence": 0.9}
- type: {"action": "type", "params": {"text": "hello"}, "confidence": 0.9}
- press_keys: {"action": "press_keys", "params": {"keys": ["ctrl", "s"]}, "confidence": 0.9}
- scroll: {"action": "scroll", "params": {"delta": -3, "x": 500, "y": 400}, "confidence": 0.9}
- wait: {"action": "wait", "params": {"ms": 1000}, "confidence": 0.9}

UI TREE USAGE:
- Search for elements by name/type in the UI tree
- Use element 'bounds' {x, y, width, height} to calculate click coordinates
- Click center of element: x + width/2, y + height/2

Return ONLY a JSON array of actions. No explanations or other text."#;

/// User-turn text shared by the cloud providers.
pub fn user_text(user_request: &str, ui_tree_json: &str) -> String {
    format!("User request: {user_request}\n\nUI Tree: {ui_tree_json}")
}

/// Single combined prompt for Ollama, which has no system/user split in
/// the generate API.
pub fn combined_prompt(user_request: &str, ui_tree_json: &str) -> String {
    format!("{SYSTEM_PROMPT}\n\nUser request: {user_request}\n\nUI Tree:\n{ui_tree_json}")
}
