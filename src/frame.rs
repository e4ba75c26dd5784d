//! Frame — the universal message type on the classroom socket.
//!
//! ARCHITECTURE
//! ============
//! Every real-time message is a Frame. Clients send request frames over
//! WebSocket, the server dispatches by syscall prefix ("seat:", "class:"),
//! and state changes flow back out as notification frames that every
//! connected observer receives.
//!
//! DESIGN
//! ======
//! - Flat data: payload is always `Map<String, Value>`, never nested.
//! - Inbound frames may omit everything but `syscall`; the missing envelope
//!   fields are filled in on parse.
//! - The WS handler routes on `syscall` prefix and leaves `data` to the
//!   field accessors below.

use std::collections::HashMap;
use std::time::{SystemTime, UNIX_EPOCH};

use serde::{Deserialize, Serialize};
use uuid::Uuid;

// =============================================================================
// FIELD CONSTANTS
// =============================================================================

/// Frame data key for error messages.
pub const FRAME_MESSAGE: &str = "message";

/// Frame data key for grepable error codes.
pub const FRAME_CODE: &str = "code";

// =============================================================================
// TYPES
// =============================================================================

/// Flat key-value payload. Alias to reduce noise in signatures.
pub type Data = HashMap<String, serde_json::Value>;

/// Lifecycle position of a frame.
///
/// Clients only ever send requests. The server answers malformed input with
/// an error frame and announces state changes as requests of its own.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Status {
    #[default]
    Request,
    Error,
}

/// The universal message type.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Frame {
    #[serde(default = "Uuid::new_v4")]
    pub id: Uuid,
    #[serde(default)]
    pub parent_id: Option<Uuid>,
    /// Milliseconds since Unix epoch. Set automatically at construction.
    #[serde(default = "now_ms")]
    pub ts: i64,
    #[serde(default)]
    pub from: Option<String>,
    pub syscall: String,
    #[serde(default)]
    pub status: Status,
    #[serde(default)]
    pub data: Data,
}

// =============================================================================
// ERRORS
// =============================================================================

/// Grepable error code for structured error frames and log fields.
pub trait ErrorCode: std::fmt::Display {
    fn error_code(&self) -> &'static str;
}

/// Problems with the payload of an otherwise well-formed inbound frame.
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum FrameError {
    #[error("missing field: {0}")]
    MissingField(&'static str),
    #[error("invalid field {field}: {reason}")]
    InvalidField { field: &'static str, reason: String },
    #[error("unknown syscall: {0}")]
    UnknownSyscall(String),
}

impl ErrorCode for FrameError {
    fn error_code(&self) -> &'static str {
        match self {
            Self::MissingField(_) => "E_MISSING_FIELD",
            Self::InvalidField { .. } => "E_INVALID_FIELD",
            Self::UnknownSyscall(_) => "E_UNKNOWN_SYSCALL",
        }
    }
}

// =============================================================================
// CONSTRUCTORS
// =============================================================================

/// Current time as milliseconds since Unix epoch.
fn now_ms() -> i64 {
    let Ok(dur) = SystemTime::now().duration_since(UNIX_EPOCH) else {
        return 0;
    };
    i64::try_from(dur.as_millis()).unwrap_or(0)
}

impl Frame {
    /// Create a request frame. Used for inbound commands and outbound
    /// notifications alike.
    pub fn request(syscall: impl Into<String>, data: Data) -> Self {
        Self {
            id: Uuid::new_v4(),
            parent_id: None,
            ts: now_ms(),
            from: None,
            syscall: syscall.into(),
            status: Status::Request,
            data,
        }
    }

    /// Create a structured error response from a typed error.
    #[must_use]
    pub fn error_from(&self, err: &(impl ErrorCode + ?Sized)) -> Self {
        let mut data = Data::new();
        data.insert(FRAME_CODE.into(), serde_json::Value::String(err.error_code().to_string()));
        data.insert(FRAME_MESSAGE.into(), serde_json::Value::String(err.to_string()));
        self.reply(Status::Error, data)
    }

    /// Build a reply frame. Inherits `syscall` and points back at the request.
    fn reply(&self, status: Status, data: Data) -> Self {
        Self {
            id: Uuid::new_v4(),
            parent_id: Some(self.id),
            ts: now_ms(),
            from: None,
            syscall: self.syscall.clone(),
            status,
            data,
        }
    }
}

// =============================================================================
// BUILDERS
// =============================================================================

impl Frame {
    #[must_use]
    pub fn with_data(mut self, key: impl Into<String>, value: impl Into<serde_json::Value>) -> Self {
        self.data.insert(key.into(), value.into());
        self
    }
}

// =============================================================================
// ROUTING
// =============================================================================

impl Frame {
    /// Extract the syscall prefix (everything before the first ':').
    #[must_use]
    pub fn prefix(&self) -> &str {
        let Some((prefix, _)) = self.syscall.split_once(':') else {
            return &self.syscall;
        };
        prefix
    }

    /// Extract the syscall operation (everything after the first ':').
    #[must_use]
    pub fn op(&self) -> &str {
        self.syscall.split_once(':').map_or("", |(_, op)| op)
    }
}

// =============================================================================
// FIELD ACCESS
// =============================================================================

impl Frame {
    /// Read a required unsigned integer field. Accepts JSON numbers and
    /// numeric strings, since browser clients often send ids from the DOM.
    ///
    /// # Errors
    ///
    /// Returns `MissingField` or `InvalidField` when the value is absent or
    /// not a non-negative integer that fits in `u32`.
    pub fn u32_field(&self, field: &'static str) -> Result<u32, FrameError> {
        let value = self.data.get(field).ok_or(FrameError::MissingField(field))?;
        let parsed = match value {
            serde_json::Value::Number(n) => n.as_u64().and_then(|v| u32::try_from(v).ok()),
            serde_json::Value::String(s) => s.trim().parse::<u32>().ok(),
            _ => None,
        };
        parsed.ok_or_else(|| FrameError::InvalidField { field, reason: format!("expected non-negative integer, got {value}") })
    }

    /// Read a required string field.
    ///
    /// # Errors
    ///
    /// Returns `MissingField` or `InvalidField` when the value is absent or
    /// not a string.
    pub fn str_field(&self, field: &'static str) -> Result<&str, FrameError> {
        let value = self.data.get(field).ok_or(FrameError::MissingField(field))?;
        value
            .as_str()
            .ok_or_else(|| FrameError::InvalidField { field, reason: format!("expected string, got {value}") })
    }
}

#[cfg(test)]
#[path = "frame_test.rs"]
mod tests;
