// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! API client with the credential interceptors.
//!
//! Outbound: attach the access token as a bearer credential.
//! Inbound: on 401, renew through the session's refresh executor and replay
//! the request once with the new token.

use std::sync::Arc;

use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::error::SessionError;
use crate::model::{LoginRequest, LoginResponse, LogoutRequest, UserProfile};
use crate::session::Session;
use crate::transport::{
    ApiRequest, ApiResponse, Transport, CURRENT_USER_PATH, LOGIN_PATH, LOGOUT_PATH,
};

pub struct ApiClient {
    session: Session,
    transport: Arc<dyn Transport>,
}

impl ApiClient {
    pub fn new(session: Session, transport: Arc<dyn Transport>) -> Self {
        Self { session, transport }
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    /// Attach the current access token unless the request is login or refresh.
    fn authorize(&self, request: ApiRequest) -> ApiRequest {
        if request.is_credential_exempt() {
            return request;
        }
        match self.session.store().access_token() {
            Some(token) => request.with_bearer(token),
            None => request,
        }
    }

    /// Send a request through both interceptors.
    ///
    /// Non-success statuses come back as [`SessionError::Http`], except a 401
    /// that a refresh could recover from, which the caller never sees.
    pub async fn send(&self, request: ApiRequest) -> Result<ApiResponse, SessionError> {
        let request = self.authorize(request);
        let resp = self.transport.send(request.clone()).await?;
        if !resp.is_unauthorized() {
            return resp.error_for_status();
        }
        self.recover(request, resp).await
    }

    async fn recover(
        &self,
        request: ApiRequest,
        resp: ApiResponse,
    ) -> Result<ApiResponse, SessionError> {
        let unauthorized = SessionError::from_response(resp.status, &resp.body);

        // Bad credentials on login are the caller's business.
        if request.is_login() {
            return Err(unauthorized);
        }
        if request.is_refresh() {
            self.session.terminate(None);
            return Err(unauthorized);
        }
        if request.retried {
            tracing::debug!(path = %request.route(), "replayed request rejected again");
            return Err(unauthorized);
        }
        if self.session.store().refresh_token().is_none() {
            self.session.terminate(None);
            return Err(unauthorized);
        }

        match self.session.refresh_access_token().await {
            Ok(token) => {
                tracing::debug!(path = %request.route(), "replaying request with renewed token");
                self.transport.send(request.into_retry(token)).await?.error_for_status()
            }
            // The session this request was sent under is gone; whatever
            // replaced it is not ours to end.
            Err(SessionError::Superseded) => Err(SessionError::Superseded),
            Err(e) => {
                self.session.terminate(None);
                Err(e)
            }
        }
    }

    pub async fn get_json<T: DeserializeOwned>(&self, path: &str) -> Result<T, SessionError> {
        self.send(ApiRequest::get(path)).await?.json()
    }

    pub async fn post_json<B, T>(&self, path: &str, body: &B) -> Result<T, SessionError>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        self.send(ApiRequest::post(path).json(body)?).await?.json()
    }

    pub async fn patch_json<B, T>(&self, path: &str, body: &B) -> Result<T, SessionError>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        self.send(ApiRequest::patch(path).json(body)?).await?.json()
    }

    pub async fn delete(&self, path: &str) -> Result<(), SessionError> {
        self.send(ApiRequest::delete(path)).await?;
        Ok(())
    }

    /// Log in, store the token pair (arming proactive renewal) and the user.
    ///
    /// The profile comes from the login response, or from `/api/users/me`
    /// when the backend does not include it.
    pub async fn login(&self, username: &str, password: &str) -> Result<UserProfile, SessionError> {
        let request = ApiRequest::post(LOGIN_PATH)
            .json(&LoginRequest { username: username.to_owned(), password: password.to_owned() })?;
        let body: LoginResponse = self.send(request).await?.json()?;

        let store = self.session.store();
        // A previous principal's tokens and profile must not outlive this login.
        if store.is_authenticated() {
            store.clear_auth();
        }
        store.set_tokens(&body.access_token, &body.refresh_token)?;

        let user = match body.user {
            Some(user) => user,
            None => self.get_json::<UserProfile>(CURRENT_USER_PATH).await?,
        };
        store.set_user(user.clone());
        tracing::info!(username = %user.username, "logged in");
        Ok(user)
    }

    /// Fetch the current user's profile and refresh the cached copy.
    pub async fn current_user(&self) -> Result<UserProfile, SessionError> {
        let user: UserProfile = self.get_json(CURRENT_USER_PATH).await?;
        self.session.store().set_user(user.clone());
        Ok(user)
    }

    /// Invalidate the refresh token server-side (best effort), then clear the
    /// local session and return to login.
    pub async fn logout(&self) {
        if let Some(refresh_token) = self.session.store().refresh_token() {
            match ApiRequest::post(LOGOUT_PATH).json(&LogoutRequest { refresh_token }) {
                Ok(request) => {
                    let request = self.authorize(request);
                    if let Err(e) = self.transport.send(request).await {
                        tracing::debug!(err = %e, "logout call failed, clearing locally");
                    }
                }
                Err(e) => tracing::debug!(err = %e, "failed to encode logout request"),
            }
        }
        self.session.terminator().signed_out();
        tracing::info!("logged out");
    }
}

#[cfg(test)]
#[path = "client_tests.rs"]
mod tests;
