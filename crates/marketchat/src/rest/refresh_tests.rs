// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use futures_util::future::join_all;

use super::*;

async fn slow(outcome: Result<(), ApiError>) -> Result<(), ApiError> {
    tokio::time::sleep(Duration::from_millis(50)).await;
    outcome
}

#[tokio::test(start_paused = true)]
async fn concurrent_callers_share_one_refresh() {
    let gate = RefreshGate::new();
    let calls = AtomicUsize::new(0);

    let results = join_all((0..8).map(|_| {
        gate.coalesce(|| {
            calls.fetch_add(1, Ordering::SeqCst);
            slow(Ok(()))
        })
    }))
    .await;

    assert_eq!(calls.load(Ordering::SeqCst), 1);
    assert_eq!(gate.refresh_count(), 1);
    assert!(results.iter().all(Result::is_ok));
    assert!(!gate.is_refreshing());
    assert_eq!(gate.pending(), 0);
}

#[tokio::test(start_paused = true)]
async fn failure_rejects_every_waiter_with_the_same_error() {
    let gate = RefreshGate::new();
    let failure = ApiError::from_status(401, "refresh token expired");

    let results =
        join_all((0..5).map(|_| gate.coalesce(|| slow(Err(failure.clone()))))).await;

    assert_eq!(gate.refresh_count(), 1);
    assert_eq!(results.len(), 5);
    for result in results {
        assert_eq!(result, Err(failure.clone()));
    }
}

#[tokio::test(start_paused = true)]
async fn gate_is_reusable_after_settling() {
    let gate = RefreshGate::new();
    assert!(gate.coalesce(|| slow(Ok(()))).await.is_ok());
    assert!(gate.coalesce(|| slow(Ok(()))).await.is_ok());
    assert_eq!(gate.refresh_count(), 2);
}

#[tokio::test]
async fn dropped_leader_releases_waiters() -> anyhow::Result<()> {
    let gate = Arc::new(RefreshGate::new());

    let g = Arc::clone(&gate);
    let leader = tokio::spawn(async move {
        g.coalesce(|| std::future::pending::<Result<(), ApiError>>()).await
    });
    tokio::task::yield_now().await;
    assert!(gate.is_refreshing());

    let g = Arc::clone(&gate);
    let follower = tokio::spawn(async move { g.coalesce(|| slow(Ok(()))).await });
    tokio::task::yield_now().await;
    assert_eq!(gate.pending(), 1);

    leader.abort();
    let result = follower.await?;
    assert_eq!(result.map_err(|e| e.code), Err(ErrorCode::Internal));
    assert!(!gate.is_refreshing());
    Ok(())
}
