//! Proxy module
//!
//! Handles request forwarding to the Gemini API.

pub mod gemini;
pub mod headers;
pub mod target;

pub use gemini::GeminiClient;
pub use target::{Action, RouteTarget, UpstreamTarget};
