// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use std::path::PathBuf;
use std::time::Duration;

use crate::session::SessionSettings;

/// Configuration for the console session.
#[derive(Debug, Clone, clap::Args)]
pub struct SessionConfig {
    /// Base URL of the platform API.
    #[arg(long, default_value = "http://localhost:8080", env = "CONSOLE_API_BASE_URL")]
    pub base_url: String,

    /// Timeout for each API call in milliseconds.
    #[arg(long, default_value_t = 10000, env = "CONSOLE_REQUEST_TIMEOUT_MS")]
    pub request_timeout_ms: u64,

    /// Nominal access-token lifetime in milliseconds.
    #[arg(long, default_value_t = 300_000, env = "CONSOLE_ACCESS_TOKEN_LIFETIME_MS")]
    pub access_token_lifetime_ms: u64,

    /// Renew the access token this many milliseconds before it expires.
    #[arg(long, default_value_t = 60_000, env = "CONSOLE_REFRESH_LEAD_MS")]
    pub refresh_lead_ms: u64,

    /// Where the session is persisted. Defaults to `<state dir>/session.json`.
    #[arg(long, env = "CONSOLE_SESSION_FILE")]
    pub session_file: Option<PathBuf>,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:8080".to_owned(),
            request_timeout_ms: 10_000,
            access_token_lifetime_ms: 300_000,
            refresh_lead_ms: 60_000,
            session_file: None,
        }
    }
}

impl SessionConfig {
    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }

    pub fn access_token_lifetime(&self) -> Duration {
        Duration::from_millis(self.access_token_lifetime_ms)
    }

    pub fn refresh_lead(&self) -> Duration {
        Duration::from_millis(self.refresh_lead_ms)
    }

    pub fn session_file(&self) -> PathBuf {
        self.session_file
            .clone()
            .unwrap_or_else(|| crate::storage::state_dir().join("session.json"))
    }

    pub fn settings(&self) -> SessionSettings {
        SessionSettings {
            access_token_lifetime: self.access_token_lifetime(),
            refresh_lead: self.refresh_lead(),
            request_timeout: self.request_timeout(),
        }
    }
}

#[cfg(test)]
#[path = "config_tests.rs"]
mod tests;
