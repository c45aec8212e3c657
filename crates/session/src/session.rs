// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The owned session handle wiring store, scheduler, executor and termination.

use std::future::Future;
use std::pin::Pin;
use std::sync::{Arc, Weak};
use std::time::Duration;

use crate::error::SessionError;
use crate::executor::RefreshExecutor;
use crate::model::UserProfile;
use crate::scheduler::{RefreshScheduler, RenewalTarget, DEFAULT_REFRESH_LEAD};
use crate::storage::SessionStorage;
use crate::store::{TokenStore, DEFAULT_ACCESS_TOKEN_LIFETIME};
use crate::termination::{Navigator, SessionTerminator};
use crate::transport::Transport;

/// Timing knobs for the session lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SessionSettings {
    /// Nominal access-token lifetime.
    pub access_token_lifetime: Duration,
    /// How long before expiry the proactive renewal fires.
    pub refresh_lead: Duration,
    /// Upper bound on a single refresh exchange.
    pub request_timeout: Duration,
}

impl Default for SessionSettings {
    fn default() -> Self {
        Self {
            access_token_lifetime: DEFAULT_ACCESS_TOKEN_LIFETIME,
            refresh_lead: DEFAULT_REFRESH_LEAD,
            request_timeout: Duration::from_secs(10),
        }
    }
}

struct SessionInner {
    store: Arc<TokenStore>,
    executor: RefreshExecutor,
    terminator: SessionTerminator,
}

impl RenewalTarget for SessionInner {
    fn renew(self: Arc<Self>) -> Pin<Box<dyn Future<Output = ()> + Send>> {
        Box::pin(async move {
            match self.executor.refresh_access_token().await {
                Ok(_) => {}
                // A logout (and possibly a new login) raced the timer; the
                // session this renewal was for is already gone.
                Err(SessionError::Superseded) => {
                    tracing::debug!("proactive renewal superseded by a session change");
                }
                Err(e) if self.store.is_authenticated() => {
                    tracing::debug!(err = %e, "proactive renewal failed");
                    self.terminator.terminate(None);
                }
                Err(e) => {
                    tracing::debug!(err = %e, "proactive renewal ended with no session");
                }
            }
        })
    }
}

/// Cheaply cloneable handle to one authenticated session.
#[derive(Clone)]
pub struct Session {
    inner: Arc<SessionInner>,
}

impl Session {
    /// Build a session, restoring any state saved in `storage`.
    pub fn new(
        settings: SessionSettings,
        transport: Arc<dyn Transport>,
        storage: Arc<dyn SessionStorage>,
        navigator: Arc<dyn Navigator>,
    ) -> Self {
        let inner = Arc::new_cyclic(|weak: &Weak<SessionInner>| {
            let scheduler = RefreshScheduler::new(settings.refresh_lead);
            let target: Weak<dyn RenewalTarget> = weak.clone();
            scheduler.bind(target);
            let store =
                Arc::new(TokenStore::new(storage, scheduler, settings.access_token_lifetime));
            let executor =
                RefreshExecutor::new(Arc::clone(&store), transport, settings.request_timeout);
            let terminator = SessionTerminator::new(Arc::clone(&store), navigator);
            SessionInner { store, executor, terminator }
        });
        Self { inner }
    }

    pub fn store(&self) -> &TokenStore {
        &self.inner.store
    }

    pub fn executor(&self) -> &RefreshExecutor {
        &self.inner.executor
    }

    pub fn terminator(&self) -> &SessionTerminator {
        &self.inner.terminator
    }

    pub async fn refresh_access_token(&self) -> Result<String, SessionError> {
        self.inner.executor.refresh_access_token().await
    }

    pub fn terminate(&self, current_path: Option<&str>) {
        self.inner.terminator.terminate(current_path);
    }

    /// Re-arm proactive renewal for a session restored from storage.
    pub fn resume_renewal(&self) -> bool {
        self.inner.store.resume_renewal()
    }

    pub fn is_authenticated(&self) -> bool {
        self.inner.store.is_authenticated()
    }

    pub fn is_admin(&self) -> bool {
        self.inner.store.is_admin()
    }

    pub fn user(&self) -> Option<UserProfile> {
        self.inner.store.user()
    }

    /// Time until the next proactive renewal, if one is armed.
    pub fn next_renewal_in(&self) -> Option<Duration> {
        self.inner.store.scheduler().next_renewal_in()
    }
}

#[cfg(test)]
#[path = "session_tests.rs"]
mod tests;
