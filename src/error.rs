// Copyright (c) 2026 Bountyy Oy. All rights reserved.
// This software is proprietary and confidential.

//! Error types for the page bridge
//!
//! Three families matter to callers: protocol desynchronization between page
//! and host, malformed response payloads, and requests the host never answered.

use thiserror::Error;

/// Result type alias for pagewire operations
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for pagewire
#[derive(Error, Debug)]
pub enum Error {
    /// Host delivered to a callback id that was never allocated
    #[error("Unknown callback handle: {callback_id}")]
    UnknownHandle { callback_id: u32 },

    /// Host delivered to a slot that has since been reused
    #[error("Stale callback handle {callback_id}: generation {generation}, slot is at {current}")]
    StaleHandle {
        callback_id: u32,
        generation: u32,
        current: u32,
    },

    /// Host delivered twice to the same handle
    #[error("Callback handle {callback_id} already settled")]
    AlreadySettled { callback_id: u32 },

    /// Base64 body could not be decoded
    #[error("Base64 decode error: {0}")]
    Decode(#[from] base64::DecodeError),

    /// Response payload has the wrong shape for its capture path
    #[error("Unexpected response payload: {0}")]
    Payload(String),

    /// Host never answered within the request deadline
    #[error("Request {callback_id} timed out after {duration_ms}ms")]
    Timeout { callback_id: u32, duration_ms: u64 },

    /// Request aborted by page code
    #[error("Request aborted")]
    Aborted,

    /// Operation not allowed in the current request state
    #[error("Invalid state: {0}")]
    InvalidState(String),

    /// Message could not be posted to the host
    #[error("Transport error: {0}")]
    Transport(String),

    /// Bridge dropped a continuation without settling it
    #[error("Host bridge has been closed")]
    BridgeClosed,

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// URL parsing failed
    #[error("Invalid URL: {0}")]
    Url(#[from] url::ParseError),

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Generic error
    #[error("{0}")]
    Other(String),
}

impl Error {
    /// Create a payload shape error
    pub fn payload<S: Into<String>>(msg: S) -> Self {
        Error::Payload(msg.into())
    }

    /// Create an invalid state error
    pub fn invalid_state<S: Into<String>>(msg: S) -> Self {
        Error::InvalidState(msg.into())
    }

    /// Create a transport error
    pub fn transport<S: Into<String>>(msg: S) -> Self {
        Error::Transport(msg.into())
    }

    /// Create a timeout error
    pub fn timeout(callback_id: u32, duration_ms: u64) -> Self {
        Error::Timeout {
            callback_id,
            duration_ms,
        }
    }

    /// Create a generic error
    pub fn other<S: Into<String>>(msg: S) -> Self {
        Error::Other(msg.into())
    }

    /// Check if the host and page disagree about pending handles
    pub fn is_desync(&self) -> bool {
        matches!(
            self,
            Error::UnknownHandle { .. } | Error::StaleHandle { .. } | Error::AlreadySettled { .. }
        )
    }

    /// Check if this is a timeout error
    pub fn is_timeout(&self) -> bool {
        matches!(self, Error::Timeout { .. })
    }

    /// Check if the response body could not be interpreted
    pub fn is_decode(&self) -> bool {
        matches!(self, Error::Decode(_) | Error::Payload(_))
    }

    /// Get the callback id the error refers to, if any
    pub fn callback_id(&self) -> Option<u32> {
        match self {
            Error::UnknownHandle { callback_id }
            | Error::StaleHandle { callback_id, .. }
            | Error::AlreadySettled { callback_id }
            | Error::Timeout { callback_id, .. } => Some(*callback_id),
            _ => None,
        }
    }
}
