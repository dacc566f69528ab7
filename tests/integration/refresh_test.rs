//! Refresh lifecycle integration tests
//!
//! Exercises the asynchronous half of the session manager: overlapping
//! refresh calls, rejection, transient network failure, and the race
//! between a refresh in flight and a logout.

mod common;

use std::sync::Arc;
use std::time::Duration;

use bloodbank_api::mock::MockAuthGateway;
use bloodbank_api::{ApiError, RefreshResponse};
use bloodbank_session::store::keys;
use bloodbank_session::{
    MemoryStore, RefreshOutcome, SessionConfig, SessionManager, SessionStore,
};
use chrono::Utc;
use tokio_test::assert_err;

use crate::common::{auth_response, mint_token, SlowGateway, TestSession};

fn near_expiry() -> i64 {
    // inside the 5 minute refresh window
    Utc::now().timestamp() + 120
}

fn slow_fixture(delay_ms: u64) -> (Arc<MemoryStore>, MockAuthGateway, Arc<SessionManager>) {
    let store = Arc::new(MemoryStore::new());
    let inner = MockAuthGateway::new();
    let manager = Arc::new(SessionManager::new(
        store.clone() as Arc<dyn SessionStore>,
        Arc::new(SlowGateway {
            inner: inner.clone(),
            delay: Duration::from_millis(delay_ms),
        }),
        SessionConfig::default(),
    ));
    (store, inner, manager)
}

#[test_log::test(tokio::test)]
async fn test_concurrent_refresh_calls_are_deduplicated() {
    let (_, inner, manager) = slow_fixture(50);
    let old = mint_token(near_expiry(), "USER");
    let new = mint_token(Utc::now().timestamp() + 24 * 3600, "USER");
    manager.establish(&auth_response(&old, "USER")).unwrap();
    inner.push_refresh_outcome(Ok(RefreshResponse {
        token: Some(new.clone()),
    }));

    let (first, second) = tokio::join!(manager.refresh(), manager.refresh());

    // exactly one network call; both callers observe the refreshed session
    assert_eq!(inner.refresh_calls(), 1);
    assert_eq!(first.unwrap(), RefreshOutcome::Refreshed);
    assert_eq!(second.unwrap(), RefreshOutcome::Refreshed);
    assert_eq!(manager.token().as_deref(), Some(new.as_str()));
}

#[tokio::test]
async fn test_clear_during_refresh_is_not_resurrected() {
    let (store, inner, manager) = slow_fixture(100);
    let old = mint_token(near_expiry(), "USER");
    let new = mint_token(Utc::now().timestamp() + 24 * 3600, "USER");
    manager.establish(&auth_response(&old, "USER")).unwrap();
    inner.push_refresh_outcome(Ok(RefreshResponse { token: Some(new) }));

    let refreshing = {
        let manager = manager.clone();
        tokio::spawn(async move { manager.refresh().await })
    };

    // let the refresh reach the gateway, then log out underneath it
    tokio::time::sleep(Duration::from_millis(20)).await;
    manager.clear();

    let outcome = refreshing.await.unwrap().unwrap();
    assert_eq!(outcome, RefreshOutcome::NoSession);
    assert!(!manager.is_authenticated());
    assert!(store.is_empty());
    assert!(store.get(keys::TOKEN).is_none());
}

#[tokio::test]
async fn test_second_refresh_after_completion_is_still_valid() {
    let session = TestSession::new();
    let old = mint_token(near_expiry(), "USER");
    let new = mint_token(Utc::now().timestamp() + 24 * 3600, "USER");
    session.manager.establish(&auth_response(&old, "USER")).unwrap();
    session.gateway.push_refresh_outcome(Ok(RefreshResponse {
        token: Some(new),
    }));

    assert_eq!(
        session.manager.refresh().await.unwrap(),
        RefreshOutcome::Refreshed
    );
    // fresh token is a day out; the second call never reaches the network
    assert_eq!(
        session.manager.refresh().await.unwrap(),
        RefreshOutcome::StillValid
    );
    assert_eq!(session.gateway.refresh_calls(), 1);
}

#[tokio::test]
async fn test_rejected_refresh_logs_the_user_out() {
    let session = TestSession::new();
    let old = mint_token(near_expiry(), "USER");
    session.manager.establish(&auth_response(&old, "USER")).unwrap();
    session
        .gateway
        .push_refresh_outcome(Err(ApiError::Unauthorized("token revoked".to_string())));

    assert_eq!(
        session.manager.refresh().await.unwrap(),
        RefreshOutcome::Rejected
    );
    assert!(!session.manager.is_authenticated());
    assert!(session.store.is_empty());
}

#[tokio::test]
async fn test_transient_failure_then_successful_retry() {
    let session = TestSession::new();
    let old = mint_token(near_expiry(), "USER");
    let new = mint_token(Utc::now().timestamp() + 24 * 3600, "USER");
    session.manager.establish(&auth_response(&old, "USER")).unwrap();
    session
        .gateway
        .push_refresh_outcome(Err(ApiError::Request("connection reset".to_string())));
    session.gateway.push_refresh_outcome(Ok(RefreshResponse {
        token: Some(new.clone()),
    }));

    // first attempt fails but the session is intact, so the caller can retry
    assert_err!(session.manager.refresh().await);
    assert!(session.manager.is_authenticated());
    assert_eq!(session.manager.token().as_deref(), Some(old.as_str()));

    assert_eq!(
        session.manager.refresh().await.unwrap(),
        RefreshOutcome::Refreshed
    );
    assert_eq!(session.manager.token().as_deref(), Some(new.as_str()));
    assert_eq!(session.gateway.refresh_calls(), 2);
}

#[tokio::test]
async fn test_empty_refresh_body_changes_nothing() {
    let session = TestSession::new();
    let old = mint_token(near_expiry(), "USER");
    session.manager.establish(&auth_response(&old, "USER")).unwrap();
    session
        .gateway
        .push_refresh_outcome(Ok(RefreshResponse { token: None }));

    assert_err!(session.manager.refresh().await);
    assert!(session.manager.is_authenticated());
    assert_eq!(session.store.get(keys::TOKEN).as_deref(), Some(old.as_str()));
}
