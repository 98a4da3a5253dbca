//! deskbridge - native messaging host for desktop automation.
//!
//! Bridges a browser extension to the local desktop over a length-prefixed
//! JSON stdio protocol: captures the screen and accessibility tree, asks an
//! LLM provider for an action plan, validates it, and injects the resulting
//! mouse and keyboard events.

pub mod actions;
pub mod config;
pub mod credentials;
pub mod executor;
pub mod framing;
pub mod input;
pub mod llm;
pub mod messaging;
pub mod platform;
pub mod requests;

mod util;
