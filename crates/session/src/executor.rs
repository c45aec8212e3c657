// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Refresh-token exchange with at most one exchange in flight.
//!
//! Every caller (the proactive timer and any number of requests that hit 401)
//! goes through [`RefreshExecutor::refresh_access_token`]. While an exchange is
//! pending, later callers join it and receive the same outcome.

use std::future::Future;
use std::pin::Pin;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use futures_util::future::{FutureExt, Shared};
use parking_lot::Mutex;

use crate::error::SessionError;
use crate::model::{RefreshRequest, RefreshResponse};
use crate::store::TokenStore;
use crate::transport::{ApiRequest, Transport, REFRESH_PATH};

type RefreshFuture = Pin<Box<dyn Future<Output = Result<String, SessionError>> + Send>>;

/// The in-flight exchange, tagged so only its own completion frees the slot.
struct PendingRefresh {
    id: u64,
    /// Store generation the exchange was started from.
    generation: u64,
    future: Shared<RefreshFuture>,
}

pub struct RefreshExecutor {
    store: Arc<TokenStore>,
    transport: Arc<dyn Transport>,
    timeout: Duration,
    pending: Arc<Mutex<Option<PendingRefresh>>>,
    next_id: AtomicU64,
}

impl RefreshExecutor {
    pub fn new(store: Arc<TokenStore>, transport: Arc<dyn Transport>, timeout: Duration) -> Self {
        Self {
            store,
            transport,
            timeout,
            pending: Arc::new(Mutex::new(None)),
            next_id: AtomicU64::new(0),
        }
    }

    /// Whether an exchange is currently in flight.
    pub fn is_refreshing(&self) -> bool {
        self.pending.lock().is_some()
    }

    /// Exchange the refresh token for a new access token, or join the
    /// exchange already in flight.
    ///
    /// Never retries. A failure is terminal for the session and the caller is
    /// expected to hand off to termination, except for
    /// [`SessionError::Superseded`]: the session the exchange belonged to is
    /// already gone and the current one must be left alone.
    ///
    /// An exchange started for an earlier session is never joined.
    pub async fn refresh_access_token(&self) -> Result<String, SessionError> {
        let (future, stale) = {
            let mut slot = self.pending.lock();
            let (refresh_token, generation) =
                self.store.refresh_token_at().ok_or(SessionError::NoRefreshToken)?;
            match slot.as_ref() {
                Some(pending) if pending.generation == generation => {
                    tracing::debug!("token refresh already in flight, joining");
                    (pending.future.clone(), None)
                }
                _ => {
                    let id = self.next_id.fetch_add(1, Ordering::Relaxed) + 1;
                    let future = exchange(
                        Arc::clone(&self.store),
                        Arc::clone(&self.transport),
                        Arc::clone(&self.pending),
                        self.timeout,
                        id,
                        refresh_token,
                        generation,
                    )
                    .boxed()
                    .shared();
                    // An exchange left over from an earlier session finishes on
                    // its own; its id no longer matches, so it cannot free this slot.
                    let stale =
                        slot.replace(PendingRefresh { id, generation, future: future.clone() });
                    (future, stale)
                }
            }
        };
        drop(stale);
        future.await
    }
}

async fn exchange(
    store: Arc<TokenStore>,
    transport: Arc<dyn Transport>,
    pending: Arc<Mutex<Option<PendingRefresh>>>,
    timeout: Duration,
    id: u64,
    refresh_token: String,
    generation: u64,
) -> Result<String, SessionError> {
    tracing::debug!("refreshing access token");
    let result =
        match tokio::time::timeout(timeout, request_refresh(transport.as_ref(), refresh_token))
            .await
        {
            Ok(Ok(body)) => write_back(&store, generation, body),
            Ok(Err(e)) => Err(e),
            Err(_) => Err(SessionError::RefreshFailed(format!(
                "timed out after {}ms",
                timeout.as_millis()
            ))),
        };

    // Free the slot before handing the result out; drop the stale handle
    // outside the lock.
    let finished = {
        let mut slot = pending.lock();
        if slot.as_ref().is_some_and(|p| p.id == id) {
            slot.take()
        } else {
            None
        }
    };
    drop(finished);

    match &result {
        Ok(_) => tracing::info!("access token refreshed"),
        Err(e) => tracing::warn!(err = %e, "access token refresh failed"),
    }
    result
}

async fn request_refresh(
    transport: &dyn Transport,
    refresh_token: String,
) -> Result<RefreshResponse, SessionError> {
    let request = ApiRequest::post(REFRESH_PATH)
        .json(&RefreshRequest { refresh_token })
        .map_err(|e| SessionError::RefreshFailed(e.to_string()))?;
    let resp =
        transport.send(request).await.map_err(|e| SessionError::RefreshFailed(e.to_string()))?;
    if !resp.is_success() {
        let err = SessionError::from_response(resp.status, &resp.body);
        return Err(SessionError::RefreshFailed(err.to_string()));
    }
    resp.json::<RefreshResponse>().map_err(|e| SessionError::RefreshFailed(e.to_string()))
}

fn write_back(
    store: &TokenStore,
    generation: u64,
    body: RefreshResponse,
) -> Result<String, SessionError> {
    match store.apply_refresh(generation, &body.access_token, body.refresh_token.as_deref()) {
        Ok(true) => Ok(body.access_token),
        Ok(false) => {
            tracing::info!("session changed while refresh was in flight, discarding new token");
            Err(SessionError::Superseded)
        }
        Err(_) => {
            Err(SessionError::RefreshFailed("malformed access token in refresh response".to_owned()))
        }
    }
}

#[cfg(test)]
#[path = "executor_tests.rs"]
mod tests;
