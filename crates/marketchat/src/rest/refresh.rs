// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Coalesced session refresh.
//!
//! Any number of requests may hit a 401 at once; only the first runs the
//! refresh call. The rest park on a oneshot and receive the leader's outcome
//! when it settles. At most one refresh is in flight at any time.

use std::future::Future;

use parking_lot::Mutex;
use tokio::sync::oneshot;

use crate::error::{ApiError, ErrorCode};

type Waiter = oneshot::Sender<Result<(), ApiError>>;

#[derive(Default)]
struct GateInner {
    refreshing: bool,
    waiters: Vec<Waiter>,
    refresh_count: u64,
}

#[derive(Default)]
pub struct RefreshGate {
    inner: Mutex<GateInner>,
}

impl RefreshGate {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_refreshing(&self) -> bool {
        self.inner.lock().refreshing
    }

    /// Requests currently parked behind an in-flight refresh.
    pub fn pending(&self) -> usize {
        self.inner.lock().waiters.len()
    }

    /// Refresh calls issued over the gate's lifetime.
    pub fn refresh_count(&self) -> u64 {
        self.inner.lock().refresh_count
    }

    /// Run `refresh` unless one is already in flight, in which case wait for
    /// that one's outcome instead. Every caller sees the same result.
    pub async fn coalesce<F, Fut>(&self, refresh: F) -> Result<(), ApiError>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<(), ApiError>>,
    {
        let parked = {
            let mut inner = self.inner.lock();
            if inner.refreshing {
                let (tx, rx) = oneshot::channel();
                inner.waiters.push(tx);
                Some(rx)
            } else {
                inner.refreshing = true;
                inner.refresh_count += 1;
                None
            }
        };

        if let Some(rx) = parked {
            tracing::debug!("refresh in flight, request queued");
            return rx.await.unwrap_or_else(|_| Err(abandoned()));
        }

        let mut guard = SettleGuard { gate: self, settled: false };
        let result = refresh().await;
        guard.settle(&result);
        result
    }

    fn drain(&self, result: &Result<(), ApiError>) {
        let waiters = {
            let mut inner = self.inner.lock();
            inner.refreshing = false;
            std::mem::take(&mut inner.waiters)
        };
        if !waiters.is_empty() {
            tracing::debug!(waiters = waiters.len(), ok = result.is_ok(), "refresh settled");
        }
        for waiter in waiters {
            let _ = waiter.send(result.clone());
        }
    }
}

fn abandoned() -> ApiError {
    ErrorCode::Internal.to_error("refresh abandoned")
}

/// Releases parked requests even if the leader is dropped mid-refresh.
struct SettleGuard<'a> {
    gate: &'a RefreshGate,
    settled: bool,
}

impl SettleGuard<'_> {
    fn settle(&mut self, result: &Result<(), ApiError>) {
        self.settled = true;
        self.gate.drain(result);
    }
}

impl Drop for SettleGuard<'_> {
    fn drop(&mut self) {
        if !self.settled {
            self.gate.drain(&Err(abandoned()));
        }
    }
}

#[cfg(test)]
#[path = "refresh_tests.rs"]
mod tests;
