// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Token store: the single source of truth for session data.
//!
//! Every token write re-arms the proactive renewal and every clear cancels it,
//! so the timer can never drift from the stored tokens.

use std::sync::Arc;
use std::time::Duration;

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use parking_lot::Mutex;

use crate::error::SessionError;
use crate::model::UserProfile;
use crate::scheduler::RefreshScheduler;
use crate::storage::{PersistedSession, SessionStorage};

/// Nominal access-token lifetime used to arm the proactive renewal.
pub const DEFAULT_ACCESS_TOKEN_LIFETIME: Duration = Duration::from_secs(300);

struct StoreInner {
    session: PersistedSession,
    /// Bumped on every token write and every clear.
    generation: u64,
}

pub struct TokenStore {
    inner: Mutex<StoreInner>,
    storage: Arc<dyn SessionStorage>,
    scheduler: RefreshScheduler,
    access_lifetime: Duration,
}

impl TokenStore {
    /// Create the store, restoring whatever the storage backend last saved.
    ///
    /// No expiry check is made on the restored tokens.
    pub fn new(
        storage: Arc<dyn SessionStorage>,
        scheduler: RefreshScheduler,
        access_lifetime: Duration,
    ) -> Self {
        let session = match storage.load() {
            Ok(Some(session)) => {
                tracing::debug!(
                    authenticated = session.access_token.is_some(),
                    "restored persisted session"
                );
                session
            }
            Ok(None) => PersistedSession::default(),
            Err(e) => {
                tracing::warn!(err = %e, "failed to load persisted session, starting empty");
                PersistedSession::default()
            }
        };
        Self {
            inner: Mutex::new(StoreInner { session, generation: 0 }),
            storage,
            scheduler,
            access_lifetime,
        }
    }

    /// Store a fresh token pair and arm the next proactive renewal.
    pub fn set_tokens(&self, access: &str, refresh: &str) -> Result<(), SessionError> {
        validate_access_token(access)?;
        {
            let mut inner = self.inner.lock();
            inner.session.access_token = Some(access.to_owned());
            inner.session.refresh_token = Some(refresh.to_owned());
            inner.generation += 1;
            self.persist(&inner.session);
        }
        self.scheduler.schedule_renewal(self.access_lifetime);
        Ok(())
    }

    /// Write back the result of a refresh exchange started at `generation`.
    ///
    /// Returns `Ok(false)` without touching anything when the session was
    /// cleared or replaced while the exchange was in flight. The refresh token
    /// is only replaced when the server rotated it.
    pub(crate) fn apply_refresh(
        &self,
        generation: u64,
        access: &str,
        refresh: Option<&str>,
    ) -> Result<bool, SessionError> {
        validate_access_token(access)?;
        {
            let mut inner = self.inner.lock();
            if inner.generation != generation || inner.session.refresh_token.is_none() {
                return Ok(false);
            }
            inner.session.access_token = Some(access.to_owned());
            if let Some(refresh) = refresh {
                inner.session.refresh_token = Some(refresh.to_owned());
            }
            inner.generation += 1;
            self.persist(&inner.session);
        }
        self.scheduler.schedule_renewal(self.access_lifetime);
        Ok(true)
    }

    pub fn set_user(&self, profile: UserProfile) {
        let mut inner = self.inner.lock();
        inner.session.user = Some(profile);
        self.persist(&inner.session);
    }

    /// Null every field and cancel the armed renewal. Safe to repeat.
    pub fn clear_auth(&self) {
        {
            let mut inner = self.inner.lock();
            inner.session = PersistedSession::default();
            inner.generation += 1;
            self.persist(&inner.session);
        }
        self.scheduler.cancel_renewal();
    }

    /// Re-arm the proactive renewal for a restored session.
    ///
    /// Returns false when there is no refresh token to renew with.
    pub fn resume_renewal(&self) -> bool {
        if self.inner.lock().session.refresh_token.is_none() {
            return false;
        }
        self.scheduler.schedule_renewal(self.access_lifetime);
        true
    }

    pub fn is_authenticated(&self) -> bool {
        self.inner.lock().session.access_token.is_some()
    }

    pub fn is_admin(&self) -> bool {
        let inner = self.inner.lock();
        inner.session.access_token.is_some()
            && inner.session.user.as_ref().is_some_and(UserProfile::is_admin)
    }

    pub fn access_token(&self) -> Option<String> {
        self.inner.lock().session.access_token.clone()
    }

    pub fn refresh_token(&self) -> Option<String> {
        self.inner.lock().session.refresh_token.clone()
    }

    pub fn user(&self) -> Option<UserProfile> {
        self.inner.lock().session.user.clone()
    }

    pub fn snapshot(&self) -> PersistedSession {
        self.inner.lock().session.clone()
    }

    /// Refresh token together with the generation it belongs to.
    pub(crate) fn refresh_token_at(&self) -> Option<(String, u64)> {
        let inner = self.inner.lock();
        inner.session.refresh_token.clone().map(|token| (token, inner.generation))
    }

    pub fn generation(&self) -> u64 {
        self.inner.lock().generation
    }

    pub fn scheduler(&self) -> &RefreshScheduler {
        &self.scheduler
    }

    pub fn access_lifetime(&self) -> Duration {
        self.access_lifetime
    }

    fn persist(&self, session: &PersistedSession) {
        if let Err(e) = self.storage.save(session) {
            tracing::warn!(err = %e, "failed to persist session");
        }
    }
}

/// Check the `header.payload.signature` shape of an access token.
pub fn validate_access_token(token: &str) -> Result<(), SessionError> {
    let mut segments = 0;
    for segment in token.split('.') {
        segments += 1;
        if segment.is_empty() || URL_SAFE_NO_PAD.decode(segment).is_err() {
            return Err(SessionError::InvalidToken);
        }
    }
    if segments != 3 {
        return Err(SessionError::InvalidToken);
    }
    Ok(())
}

#[cfg(test)]
#[path = "store_tests.rs"]
mod tests;
