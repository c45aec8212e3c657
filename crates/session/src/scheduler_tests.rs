// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use std::sync::atomic::AtomicUsize;

use super::*;

#[derive(Default)]
struct CountingTarget {
    fired: AtomicUsize,
}

impl CountingTarget {
    fn fired(&self) -> usize {
        self.fired.load(Ordering::SeqCst)
    }
}

impl RenewalTarget for CountingTarget {
    fn renew(self: Arc<Self>) -> Pin<Box<dyn Future<Output = ()> + Send>> {
        Box::pin(async move {
            self.fired.fetch_add(1, Ordering::SeqCst);
        })
    }
}

fn bound_scheduler(lead: Duration) -> (RefreshScheduler, Arc<CountingTarget>) {
    let target = Arc::new(CountingTarget::default());
    let scheduler = RefreshScheduler::new(lead);
    let as_target: Arc<dyn RenewalTarget> = target.clone();
    scheduler.bind(Arc::downgrade(&as_target));
    (scheduler, target)
}

async fn settle() {
    for _ in 0..16 {
        tokio::task::yield_now().await;
    }
}

#[test]
fn delay_is_lifetime_minus_lead() -> anyhow::Result<()> {
    let scheduler = RefreshScheduler::new(Duration::from_secs(60));
    assert_eq!(scheduler.delay_for(Duration::from_secs(300)), Duration::from_secs(240));
    assert_eq!(scheduler.delay_for(Duration::from_secs(60)), Duration::ZERO);
    assert_eq!(scheduler.delay_for(Duration::from_secs(10)), Duration::ZERO);
    Ok(())
}

#[tokio::test(start_paused = true)]
async fn fires_at_240s_for_five_minute_token() -> anyhow::Result<()> {
    let (scheduler, target) = bound_scheduler(Duration::from_millis(60_000));
    scheduler.schedule_renewal(Duration::from_millis(300_000));
    assert_eq!(scheduler.next_renewal_in(), Some(Duration::from_millis(240_000)));

    tokio::time::advance(Duration::from_millis(239_999)).await;
    settle().await;
    assert_eq!(target.fired(), 0, "renewal fired early");

    tokio::time::advance(Duration::from_millis(1)).await;
    settle().await;
    assert_eq!(target.fired(), 1);
    assert!(!scheduler.is_armed());

    // One-shot: nothing further without a new schedule.
    tokio::time::advance(Duration::from_secs(600)).await;
    settle().await;
    assert_eq!(target.fired(), 1);
    Ok(())
}

#[tokio::test(start_paused = true)]
async fn lead_longer_than_lifetime_fires_immediately() -> anyhow::Result<()> {
    let (scheduler, target) = bound_scheduler(Duration::from_secs(60));
    scheduler.schedule_renewal(Duration::from_secs(30));
    settle().await;
    assert_eq!(target.fired(), 1);
    Ok(())
}

#[tokio::test(start_paused = true)]
async fn reschedule_invalidates_previous_timer() -> anyhow::Result<()> {
    let (scheduler, target) = bound_scheduler(Duration::from_secs(60));
    scheduler.schedule_renewal(Duration::from_secs(300));

    tokio::time::advance(Duration::from_secs(200)).await;
    settle().await;
    scheduler.schedule_renewal(Duration::from_secs(300));

    // The first timer's deadline passes without a fire.
    tokio::time::advance(Duration::from_secs(100)).await;
    settle().await;
    assert_eq!(target.fired(), 0);

    tokio::time::advance(Duration::from_secs(139)).await;
    settle().await;
    assert_eq!(target.fired(), 0);

    tokio::time::advance(Duration::from_secs(1)).await;
    settle().await;
    assert_eq!(target.fired(), 1);
    Ok(())
}

#[tokio::test(start_paused = true)]
async fn cancel_prevents_fire_and_is_idempotent() -> anyhow::Result<()> {
    let (scheduler, target) = bound_scheduler(Duration::from_secs(60));
    scheduler.schedule_renewal(Duration::from_secs(300));
    assert!(scheduler.is_armed());

    scheduler.cancel_renewal();
    scheduler.cancel_renewal();
    assert!(!scheduler.is_armed());
    assert_eq!(scheduler.next_renewal_in(), None);

    tokio::time::advance(Duration::from_secs(600)).await;
    settle().await;
    assert_eq!(target.fired(), 0);
    Ok(())
}

#[tokio::test(start_paused = true)]
async fn dropped_target_is_skipped() -> anyhow::Result<()> {
    let (scheduler, target) = bound_scheduler(Duration::from_secs(60));
    scheduler.schedule_renewal(Duration::from_secs(120));
    drop(target);

    tokio::time::advance(Duration::from_secs(120)).await;
    settle().await;
    assert!(!scheduler.is_armed());
    Ok(())
}

#[test]
fn without_runtime_nothing_is_armed() -> anyhow::Result<()> {
    let (scheduler, _target) = bound_scheduler(Duration::from_secs(60));
    scheduler.schedule_renewal(Duration::from_secs(300));
    assert!(!scheduler.is_armed());
    Ok(())
}

#[tokio::test(start_paused = true)]
async fn unrepresentable_lifetime_stays_armed() -> anyhow::Result<()> {
    let (scheduler, target) = bound_scheduler(Duration::from_secs(60));
    scheduler.schedule_renewal(Duration::MAX);
    assert!(scheduler.is_armed());
    assert!(scheduler.next_renewal_in().is_some_and(|left| left >= FAR_FUTURE - Duration::from_secs(1)));

    tokio::time::advance(Duration::from_secs(86_400)).await;
    settle().await;
    assert_eq!(target.fired(), 0);
    Ok(())
}
