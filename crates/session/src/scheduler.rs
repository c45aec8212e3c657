// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Proactive renewal: a single one-shot timer armed `lead` before the access
//! token expires.

use std::future::Future;
use std::pin::Pin;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, OnceLock, Weak};
use std::time::Duration;

use parking_lot::Mutex;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

/// Default time before expiry at which the proactive renewal fires.
pub const DEFAULT_REFRESH_LEAD: Duration = Duration::from_secs(60);

/// Cap for delays too large to represent as an instant.
const FAR_FUTURE: Duration = Duration::from_secs(86_400 * 365 * 30);

/// Whatever the timer calls when it fires.
pub trait RenewalTarget: Send + Sync {
    fn renew(self: Arc<Self>) -> Pin<Box<dyn Future<Output = ()> + Send>>;
}

/// The one outstanding timer. Replaced or cancelled as a unit.
struct ScheduledRenewal {
    id: u64,
    cancel: CancellationToken,
    fires_at: Instant,
}

pub struct RefreshScheduler {
    lead: Duration,
    target: OnceLock<Weak<dyn RenewalTarget>>,
    slot: Arc<Mutex<Option<ScheduledRenewal>>>,
    next_id: AtomicU64,
}

impl RefreshScheduler {
    pub fn new(lead: Duration) -> Self {
        Self {
            lead,
            target: OnceLock::new(),
            slot: Arc::new(Mutex::new(None)),
            next_id: AtomicU64::new(0),
        }
    }

    /// Attach the renewal target. Only the first call has effect.
    ///
    /// Held weakly: the target usually owns this scheduler.
    pub fn bind(&self, target: Weak<dyn RenewalTarget>) {
        let _ = self.target.set(target);
    }

    pub fn lead(&self) -> Duration {
        self.lead
    }

    /// Delay from now until the renewal for a token of `lifetime` should fire.
    pub fn delay_for(&self, lifetime: Duration) -> Duration {
        if self.lead < lifetime {
            lifetime - self.lead
        } else {
            Duration::ZERO
        }
    }

    /// Replace any armed renewal with a new one for a token of `lifetime`.
    pub fn schedule_renewal(&self, lifetime: Duration) {
        let delay = self.delay_for(lifetime);
        let runtime = match tokio::runtime::Handle::try_current() {
            Ok(handle) => handle,
            Err(_) => {
                tracing::warn!("no async runtime, proactive renewal not armed");
                self.cancel_renewal();
                return;
            }
        };

        let id = self.next_id.fetch_add(1, Ordering::Relaxed) + 1;
        let cancel = CancellationToken::new();
        let now = Instant::now();
        let fires_at = now.checked_add(delay).unwrap_or(now + FAR_FUTURE);
        let previous =
            self.slot.lock().replace(ScheduledRenewal { id, cancel: cancel.clone(), fires_at });
        if let Some(previous) = previous {
            previous.cancel.cancel();
        }

        let slot = Arc::clone(&self.slot);
        let target = self.target.get().cloned();
        runtime.spawn(async move {
            tokio::select! {
                biased;
                _ = cancel.cancelled() => return,
                _ = tokio::time::sleep_until(fires_at) => {}
            }

            // Claim the slot; a replacement that raced the wakeup wins.
            {
                let mut guard = slot.lock();
                match guard.as_ref() {
                    Some(armed) if armed.id == id => {
                        guard.take();
                    }
                    _ => return,
                }
            }

            let Some(target) = target.and_then(|weak| weak.upgrade()) else {
                return;
            };
            tracing::debug!("proactive token renewal firing");
            target.renew().await;
        });

        tracing::info!(
            delay_ms = u64::try_from(delay.as_millis()).unwrap_or(u64::MAX),
            "token renewal scheduled"
        );
    }

    /// Cancel the armed renewal, if any.
    pub fn cancel_renewal(&self) {
        if let Some(armed) = self.slot.lock().take() {
            armed.cancel.cancel();
            tracing::info!("token renewal cancelled");
        }
    }

    pub fn is_armed(&self) -> bool {
        self.slot.lock().is_some()
    }

    /// Time left before the armed renewal fires.
    pub fn next_renewal_in(&self) -> Option<Duration> {
        self.slot.lock().as_ref().map(|armed| armed.fires_at.saturating_duration_since(Instant::now()))
    }
}

impl Drop for RefreshScheduler {
    fn drop(&mut self) {
        if let Some(armed) = self.slot.lock().take() {
            armed.cancel.cancel();
        }
    }
}

#[cfg(test)]
#[path = "scheduler_tests.rs"]
mod tests;
