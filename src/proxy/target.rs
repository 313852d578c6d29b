//! Route target parsing
//!
//! Maps the last path segment of `/v1beta/models/{segment}` onto an upstream
//! model and action.

use std::fmt;

/// Upstream action invoked on a model
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    Generate,
    StreamGenerate,
}

impl Action {
    pub fn from_streaming(streaming: bool) -> Self {
        if streaming {
            Action::StreamGenerate
        } else {
            Action::Generate
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Action::Generate => "generateContent",
            Action::StreamGenerate => "streamGenerateContent",
        }
    }

    pub fn is_streaming(&self) -> bool {
        matches!(self, Action::StreamGenerate)
    }

    fn parse(value: &str) -> Option<Self> {
        match value {
            "generateContent" => Some(Action::Generate),
            "streamGenerateContent" => Some(Action::StreamGenerate),
            _ => None,
        }
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A recognized inbound route: optional model plus action
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RouteTarget {
    pub model: Option<String>,
    pub action: Action,
}

impl RouteTarget {
    /// Parse `generateContent`, `streamGenerateContent`, `{model}:generateContent`
    /// or `{model}:streamGenerateContent`. Anything else is unmatched.
    pub fn parse(segment: &str) -> Option<Self> {
        if let Some(action) = Action::parse(segment) {
            return Some(Self {
                model: None,
                action,
            });
        }

        let (model, action) = segment.rsplit_once(':')?;
        if model.is_empty() || model.contains('/') {
            return None;
        }

        Some(Self {
            model: Some(model.to_string()),
            action: Action::parse(action)?,
        })
    }

    /// Resolve against the configured default model
    pub fn resolve(self, default_model: &str) -> UpstreamTarget {
        UpstreamTarget {
            model: self.model.unwrap_or_else(|| default_model.to_string()),
            action: self.action,
        }
    }
}

/// Fully resolved upstream call target
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UpstreamTarget {
    pub model: String,
    pub action: Action,
}

impl UpstreamTarget {
    /// Endpoint URL without the key, `{base}/{model}:{action}`
    pub fn endpoint(&self, base_url: &str) -> String {
        format!(
            "{}/{}:{}",
            base_url.trim_end_matches('/'),
            self.model,
            self.action
        )
    }
}
