// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use serde::{Deserialize, Serialize};
use std::fmt;

/// Errors surfaced by the session core.
///
/// `Clone` so a single renewal outcome can be handed to every caller that
/// awaited the same in-flight refresh.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionError {
    /// Access token is empty or not a `header.payload.signature` credential.
    InvalidToken,
    /// Renewal attempted with no refresh token stored.
    NoRefreshToken,
    /// Refresh exchange failed. Terminal for the current session.
    RefreshFailed(String),
    /// The session a refresh was started for was cleared or replaced before
    /// the exchange finished. Its result was discarded; nothing to terminate.
    Superseded,
    /// Non-success response passed through to the caller.
    Http { status: u16, message: String },
    /// The request never produced a response.
    Transport(String),
    /// Persisting or loading the session failed.
    Storage(String),
    /// A success response whose body did not have the expected shape.
    Decode(String),
}

impl SessionError {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::InvalidToken => "INVALID_TOKEN",
            Self::NoRefreshToken => "NO_REFRESH_TOKEN",
            Self::RefreshFailed(_) => "REFRESH_FAILED",
            Self::Superseded => "SUPERSEDED",
            Self::Http { .. } => "HTTP",
            Self::Transport(_) => "TRANSPORT",
            Self::Storage(_) => "STORAGE",
            Self::Decode(_) => "DECODE",
        }
    }

    /// Status code a caller should treat this error as.
    pub fn http_status(&self) -> u16 {
        match self {
            Self::InvalidToken | Self::NoRefreshToken | Self::RefreshFailed(_) => 401,
            Self::Superseded => 409,
            Self::Http { status, .. } => *status,
            Self::Transport(_) => 502,
            Self::Storage(_) | Self::Decode(_) => 500,
        }
    }

    /// Whether the session can no longer be used and the user must log in again.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::NoRefreshToken | Self::RefreshFailed(_))
    }

    pub fn is_unauthorized(&self) -> bool {
        matches!(self, Self::Http { status: 401, .. })
    }

    /// Build an [`SessionError::Http`] from a response body, preferring the
    /// backend's error envelope message when one is present.
    pub fn from_response(status: u16, body: &[u8]) -> Self {
        let message = match serde_json::from_slice::<ApiErrorResponse>(body) {
            Ok(envelope) => envelope.message,
            Err(_) => String::from_utf8_lossy(body).trim().to_owned(),
        };
        Self::Http { status, message }
    }
}

impl fmt::Display for SessionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidToken => f.write_str("malformed access token"),
            Self::NoRefreshToken => f.write_str("no refresh token available"),
            Self::RefreshFailed(reason) => write!(f, "token refresh failed: {reason}"),
            Self::Superseded => f.write_str("session changed while the refresh was in flight"),
            Self::Http { status, message } if message.is_empty() => write!(f, "http {status}"),
            Self::Http { status, message } => write!(f, "http {status}: {message}"),
            Self::Transport(reason) => write!(f, "transport error: {reason}"),
            Self::Storage(reason) => write!(f, "session storage error: {reason}"),
            Self::Decode(reason) => write!(f, "unexpected response body: {reason}"),
        }
    }
}

impl std::error::Error for SessionError {}

/// Error envelope returned by the backend on failed requests.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiErrorResponse {
    #[serde(default)]
    pub status: u16,
    #[serde(default)]
    pub error: String,
    #[serde(default)]
    pub code: String,
    pub message: String,
    #[serde(default)]
    pub path: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
}

#[cfg(test)]
#[path = "error_tests.rs"]
mod tests;
