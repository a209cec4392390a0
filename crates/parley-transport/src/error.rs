//! Error types for the transport channel surface.

use std::fmt;

use serde::{Deserialize, Serialize};

/// The canonical error payload carried by channel and room errors.
///
/// This is the shape that ultimately reaches API callers: a human-readable
/// message plus a stable numeric `code` and an HTTP-like `statusCode`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorInfo {
    /// Human-readable description of what went wrong.
    pub message: String,
    /// Stable numeric error code.
    pub code: u32,
    /// HTTP-like status code (400 for caller preconditions, 500 for
    /// internal/channel faults).
    #[serde(rename = "statusCode")]
    pub status_code: u16,
}

impl ErrorInfo {
    /// Creates a new error payload.
    pub fn new(message: impl Into<String>, code: u32, status_code: u16) -> Self {
        Self {
            message: message.into(),
            code,
            status_code,
        }
    }
}

impl fmt::Display for ErrorInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} (code {})", self.message, self.code)
    }
}

/// An error returned by a channel `attach` or `detach` call.
///
/// Display prints the bare message so that higher layers can compose their
/// own prefix (for example `"failed to attach room: <channel message>"`)
/// without double-decorating.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{}", info.message)]
pub struct ChannelError {
    /// The underlying error payload reported by the transport.
    pub info: ErrorInfo,
}

impl ChannelError {
    /// Wraps an error payload.
    pub fn new(info: ErrorInfo) -> Self {
        Self { info }
    }
}

impl From<ErrorInfo> for ChannelError {
    fn from(info: ErrorInfo) -> Self {
        Self { info }
    }
}
