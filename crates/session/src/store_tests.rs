// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use proptest::prelude::*;

use super::*;
use crate::storage::MemoryStorage;
use crate::test_support::{admin_profile, jwt, user_profile};

fn store_with(storage: Arc<MemoryStorage>) -> TokenStore {
    TokenStore::new(
        storage,
        RefreshScheduler::new(Duration::from_secs(60)),
        DEFAULT_ACCESS_TOKEN_LIFETIME,
    )
}

fn empty_store() -> (TokenStore, Arc<MemoryStorage>) {
    let storage = Arc::new(MemoryStorage::new());
    (store_with(Arc::clone(&storage)), storage)
}

#[yare::parameterized(
    opaque = { "A1" },
    two_segments = { "aGVhZGVy.cGF5bG9hZA" },
    four_segments = { "YQ.YQ.YQ.YQ" },
    empty_segment = { "YQ..YQ" },
    empty = { "" },
    padded = { "YQ==.YQ.YQ" },
    not_base64 = { "a!b.YQ.YQ" },
)]
fn rejects_malformed_access_token(token: &str) {
    assert_eq!(validate_access_token(token), Err(SessionError::InvalidToken));
}

#[test]
fn accepts_jwt_shape() -> anyhow::Result<()> {
    validate_access_token(&jwt("A1"))?;
    Ok(())
}

proptest! {
    #[test]
    fn any_three_encoded_segments_validate(
        header in proptest::collection::vec(any::<u8>(), 1..48),
        payload in proptest::collection::vec(any::<u8>(), 1..128),
        signature in proptest::collection::vec(any::<u8>(), 1..64),
    ) {
        let token = format!(
            "{}.{}.{}",
            URL_SAFE_NO_PAD.encode(header),
            URL_SAFE_NO_PAD.encode(payload),
            URL_SAFE_NO_PAD.encode(signature),
        );
        prop_assert_eq!(validate_access_token(&token), Ok(()));
    }

    #[test]
    fn dotless_tokens_never_validate(token in "[A-Za-z0-9_-]{0,64}") {
        prop_assert_eq!(validate_access_token(&token), Err(SessionError::InvalidToken));
    }
}

#[test]
fn set_tokens_writes_both_and_persists() -> anyhow::Result<()> {
    let (store, storage) = empty_store();
    let access = jwt("A1");
    store.set_tokens(&access, "R1")?;

    assert!(store.is_authenticated());
    assert_eq!(store.access_token().as_deref(), Some(access.as_str()));
    assert_eq!(store.refresh_token().as_deref(), Some("R1"));
    let saved = storage.current().ok_or_else(|| anyhow::anyhow!("nothing persisted"))?;
    assert_eq!(saved.access_token.as_deref(), Some(access.as_str()));
    assert_eq!(saved.refresh_token.as_deref(), Some("R1"));
    Ok(())
}

#[test]
fn invalid_token_leaves_store_untouched() -> anyhow::Result<()> {
    let (store, storage) = empty_store();
    assert_eq!(store.set_tokens("A1", "R1"), Err(SessionError::InvalidToken));
    assert!(!store.is_authenticated());
    assert_eq!(store.refresh_token(), None);
    assert_eq!(store.generation(), 0);
    assert_eq!(storage.save_count(), 0);
    Ok(())
}

#[test]
fn clear_auth_is_idempotent() -> anyhow::Result<()> {
    let (store, storage) = empty_store();
    store.set_tokens(&jwt("A1"), "R1")?;
    store.set_user(admin_profile());

    store.clear_auth();
    let after_first = store.snapshot();
    store.clear_auth();

    assert_eq!(after_first, PersistedSession::default());
    assert_eq!(store.snapshot(), after_first);
    assert_eq!(storage.current(), Some(PersistedSession::default()));
    assert!(!store.is_authenticated());
    assert_eq!(store.user(), None);
    Ok(())
}

#[test]
fn admin_requires_token_and_admin_role() -> anyhow::Result<()> {
    let (store, _) = empty_store();
    store.set_user(admin_profile());
    assert!(!store.is_admin(), "profile alone is not a session");

    store.set_tokens(&jwt("A1"), "R1")?;
    assert!(store.is_admin());

    store.set_user(user_profile());
    assert!(store.is_authenticated());
    assert!(!store.is_admin());
    Ok(())
}

#[test]
fn restores_persisted_session() -> anyhow::Result<()> {
    let access = jwt("A1");
    let storage = Arc::new(MemoryStorage::with_session(PersistedSession {
        access_token: Some(access.clone()),
        refresh_token: Some("R1".to_owned()),
        user: Some(admin_profile()),
    }));
    let store = store_with(storage);

    assert!(store.is_authenticated());
    assert!(store.is_admin());
    assert_eq!(store.access_token(), Some(access));
    assert!(!store.scheduler().is_armed(), "restore must not arm a timer");
    Ok(())
}

#[test]
fn apply_refresh_keeps_refresh_token_unless_rotated() -> anyhow::Result<()> {
    let (store, _) = empty_store();
    store.set_tokens(&jwt("A1"), "R1")?;

    let (_, generation) = store.refresh_token_at().ok_or_else(|| anyhow::anyhow!("no token"))?;
    assert!(store.apply_refresh(generation, &jwt("A2"), None)?);
    assert_eq!(store.access_token(), Some(jwt("A2")));
    assert_eq!(store.refresh_token().as_deref(), Some("R1"));

    let (_, generation) = store.refresh_token_at().ok_or_else(|| anyhow::anyhow!("no token"))?;
    assert!(store.apply_refresh(generation, &jwt("A3"), Some("R2"))?);
    assert_eq!(store.access_token(), Some(jwt("A3")));
    assert_eq!(store.refresh_token().as_deref(), Some("R2"));
    Ok(())
}

#[test]
fn apply_refresh_discards_result_after_clear() -> anyhow::Result<()> {
    let (store, _) = empty_store();
    store.set_tokens(&jwt("A1"), "R1")?;
    let (_, generation) = store.refresh_token_at().ok_or_else(|| anyhow::anyhow!("no token"))?;

    store.clear_auth();
    assert!(!store.apply_refresh(generation, &jwt("A2"), Some("R2"))?);
    assert_eq!(store.snapshot(), PersistedSession::default());
    Ok(())
}

#[test]
fn apply_refresh_discards_result_after_relogin() -> anyhow::Result<()> {
    let (store, _) = empty_store();
    store.set_tokens(&jwt("A1"), "R1")?;
    let (_, generation) = store.refresh_token_at().ok_or_else(|| anyhow::anyhow!("no token"))?;

    store.set_tokens(&jwt("B1"), "S1")?;
    assert!(!store.apply_refresh(generation, &jwt("A2"), None)?);
    assert_eq!(store.access_token(), Some(jwt("B1")));
    assert_eq!(store.refresh_token().as_deref(), Some("S1"));
    Ok(())
}

#[tokio::test(start_paused = true)]
async fn set_tokens_arms_renewal_lead_before_expiry() -> anyhow::Result<()> {
    let (store, _) = empty_store();
    store.set_tokens(&jwt("A1"), "R1")?;
    assert_eq!(store.scheduler().next_renewal_in(), Some(Duration::from_secs(240)));

    tokio::time::advance(Duration::from_secs(100)).await;
    store.set_tokens(&jwt("A2"), "R2")?;
    assert_eq!(store.scheduler().next_renewal_in(), Some(Duration::from_secs(240)));
    Ok(())
}

#[tokio::test(start_paused = true)]
async fn clear_auth_cancels_renewal() -> anyhow::Result<()> {
    let (store, _) = empty_store();
    store.set_tokens(&jwt("A1"), "R1")?;
    assert!(store.scheduler().is_armed());

    store.clear_auth();
    assert!(!store.scheduler().is_armed());
    assert_eq!(store.scheduler().next_renewal_in(), None);
    Ok(())
}

#[tokio::test(start_paused = true)]
async fn resume_renewal_needs_refresh_token() -> anyhow::Result<()> {
    let (store, _) = empty_store();
    assert!(!store.resume_renewal());
    assert!(!store.scheduler().is_armed());

    let storage = Arc::new(MemoryStorage::with_session(PersistedSession {
        access_token: Some(jwt("A1")),
        refresh_token: Some("R1".to_owned()),
        user: None,
    }));
    let restored = store_with(storage);
    assert!(restored.resume_renewal());
    assert_eq!(restored.scheduler().next_renewal_in(), Some(Duration::from_secs(240)));
    Ok(())
}
