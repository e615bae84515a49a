//! JSON-RPC method classification.
//!
//! The server answers four methods; any other name sent with an id is
//! reported back as not found. Messages without an id are never answered,
//! whatever their method.

use std::fmt;

/// Prefix shared by client notifications (`notifications/initialized`, ...).
const NOTIFICATION_PREFIX: &str = "notifications/";

/// A JSON-RPC method name, classified.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum McpMethod {
    /// `initialize`: protocol handshake.
    Initialize,
    /// `tools/list`
    ListTools,
    /// `tools/call`
    CallTool,
    /// `ping`
    Ping,
    /// A `notifications/*` method. Answered as not found when sent with an id.
    Notification(String),
    /// Anything else, including `resources/*` and `prompts/*`.
    Unknown(String),
}

impl McpMethod {
    /// Returns the method name as sent on the wire.
    #[must_use]
    pub const fn as_str(&self) -> &str {
        match self {
            Self::Initialize => "initialize",
            Self::ListTools => "tools/list",
            Self::CallTool => "tools/call",
            Self::Ping => "ping",
            Self::Notification(name) | Self::Unknown(name) => name.as_str(),
        }
    }

    /// Returns true for the four methods the server answers.
    #[must_use]
    pub const fn is_known(&self) -> bool {
        matches!(
            self,
            Self::Initialize | Self::ListTools | Self::CallTool | Self::Ping
        )
    }

    /// Returns true for `notifications/*` methods.
    #[must_use]
    pub const fn is_notification(&self) -> bool {
        matches!(self, Self::Notification(_))
    }

    /// Label used for the `method` dimension of request metrics.
    ///
    /// Client-chosen names are folded so the label set stays bounded.
    #[must_use]
    pub const fn metrics_label(&self) -> &str {
        match self {
            Self::Notification(_) => "notification",
            Self::Unknown(_) => "unknown",
            known => known.as_str(),
        }
    }
}

impl From<&str> for McpMethod {
    fn from(s: &str) -> Self {
        match s {
            "initialize" => Self::Initialize,
            "tools/list" => Self::ListTools,
            "tools/call" => Self::CallTool,
            "ping" => Self::Ping,
            other if other.starts_with(NOTIFICATION_PREFIX) => Self::Notification(other.to_string()),
            other => Self::Unknown(other.to_string()),
        }
    }
}

impl fmt::Display for McpMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
