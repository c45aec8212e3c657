// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Request/response values and the HTTP transport they travel over.
//!
//! Requests are plain values: a retry is a new request built from the old one,
//! never a mutation of something already sent.

use std::future::Future;
use std::pin::Pin;
use std::sync::Once;
use std::time::Duration;

use bytes::Bytes;
use reqwest::{Client, Method};
use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::error::SessionError;

pub const LOGIN_PATH: &str = "/api/auth/login";
pub const REFRESH_PATH: &str = "/api/auth/refresh";
pub const LOGOUT_PATH: &str = "/api/auth/logout";
pub const CURRENT_USER_PATH: &str = "/api/users/me";

/// One outbound API call.
#[derive(Debug, Clone, PartialEq)]
pub struct ApiRequest {
    pub method: Method,
    pub path: String,
    pub query: Vec<(String, String)>,
    pub body: Option<serde_json::Value>,
    /// Bearer credential to present, if any.
    pub bearer: Option<String>,
    /// Set on the single replay after a reactive refresh.
    pub retried: bool,
}

impl ApiRequest {
    pub fn new(method: Method, path: impl Into<String>) -> Self {
        Self { method, path: path.into(), query: Vec::new(), body: None, bearer: None, retried: false }
    }

    pub fn get(path: impl Into<String>) -> Self {
        Self::new(Method::GET, path)
    }

    pub fn post(path: impl Into<String>) -> Self {
        Self::new(Method::POST, path)
    }

    pub fn patch(path: impl Into<String>) -> Self {
        Self::new(Method::PATCH, path)
    }

    pub fn delete(path: impl Into<String>) -> Self {
        Self::new(Method::DELETE, path)
    }

    pub fn json<T: Serialize + ?Sized>(mut self, body: &T) -> Result<Self, SessionError> {
        let value = serde_json::to_value(body).map_err(|e| SessionError::Decode(e.to_string()))?;
        self.body = Some(value);
        Ok(self)
    }

    pub fn query(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.query.push((key.into(), value.into()));
        self
    }

    pub fn with_bearer(mut self, token: impl Into<String>) -> Self {
        self.bearer = Some(token.into());
        self
    }

    /// The one-time replay of this request carrying a renewed credential.
    pub fn into_retry(self, token: impl Into<String>) -> Self {
        Self { retried: true, ..self.with_bearer(token) }
    }

    /// Path without any query string.
    pub fn route(&self) -> &str {
        self.path.split_once('?').map(|(route, _)| route).unwrap_or(&self.path)
    }

    pub fn is_login(&self) -> bool {
        self.route() == LOGIN_PATH
    }

    pub fn is_refresh(&self) -> bool {
        self.route() == REFRESH_PATH
    }

    /// Login and refresh never carry (or renew) an access token.
    pub fn is_credential_exempt(&self) -> bool {
        self.is_login() || self.is_refresh()
    }
}

/// A received response, whatever its status.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApiResponse {
    pub status: u16,
    pub body: Bytes,
}

impl ApiResponse {
    pub fn new(status: u16, body: impl Into<Bytes>) -> Self {
        Self { status, body: body.into() }
    }

    pub fn json_value(status: u16, value: &serde_json::Value) -> Self {
        Self::new(status, value.to_string())
    }

    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    pub fn is_unauthorized(&self) -> bool {
        self.status == 401
    }

    /// Convert a non-success response into [`SessionError::Http`].
    pub fn error_for_status(self) -> Result<Self, SessionError> {
        if self.is_success() {
            Ok(self)
        } else {
            Err(SessionError::from_response(self.status, &self.body))
        }
    }

    /// Decode the body. An empty body decodes as JSON `null`.
    pub fn json<T: DeserializeOwned>(&self) -> Result<T, SessionError> {
        let bytes: &[u8] = if self.body.is_empty() { b"null" } else { &self.body };
        serde_json::from_slice(bytes).map_err(|e| SessionError::Decode(e.to_string()))
    }
}

/// Sends requests. Implementations report a received response of any status
/// as `Ok`; `Err` means no response arrived.
pub trait Transport: Send + Sync {
    fn send(
        &self,
        request: ApiRequest,
    ) -> Pin<Box<dyn Future<Output = Result<ApiResponse, SessionError>> + Send + '_>>;
}

/// HTTP transport over `reqwest`.
pub struct ReqwestTransport {
    base_url: String,
    timeout: Duration,
    client: Client,
}

impl ReqwestTransport {
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Self {
        ensure_crypto();
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .unwrap_or_default();
        let base_url = base_url.into().trim_end_matches('/').to_owned();
        Self { base_url, timeout, client }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    async fn execute(&self, request: ApiRequest) -> Result<ApiResponse, SessionError> {
        let mut url = reqwest::Url::parse(&self.url(&request.path))
            .map_err(|e| SessionError::Transport(format!("invalid url: {e}")))?;
        if !request.query.is_empty() {
            url.query_pairs_mut().extend_pairs(request.query.iter());
        }
        let mut builder = self.client.request(request.method.clone(), url);
        if let Some(ref body) = request.body {
            builder = builder.json(body);
        }
        if let Some(ref token) = request.bearer {
            builder = builder.bearer_auth(token);
        }

        let resp = builder.send().await.map_err(|e| self.transport_error(e))?;
        let status = resp.status().as_u16();
        let body = resp.bytes().await.map_err(|e| self.transport_error(e))?;
        Ok(ApiResponse { status, body })
    }

    fn transport_error(&self, e: reqwest::Error) -> SessionError {
        if e.is_timeout() {
            SessionError::Transport(format!("timed out after {}ms", self.timeout.as_millis()))
        } else {
            SessionError::Transport(e.to_string())
        }
    }
}

impl Transport for ReqwestTransport {
    fn send(
        &self,
        request: ApiRequest,
    ) -> Pin<Box<dyn Future<Output = Result<ApiResponse, SessionError>> + Send + '_>> {
        Box::pin(self.execute(request))
    }
}

static CRYPTO_INIT: Once = Once::new();

/// Install the ring crypto provider for reqwest/rustls.
/// Safe to call multiple times; only the first call has effect.
pub fn ensure_crypto() {
    CRYPTO_INIT.call_once(|| {
        let _ = rustls::crypto::ring::default_provider().install_default();
    });
}

#[cfg(test)]
#[path = "transport_tests.rs"]
mod tests;
