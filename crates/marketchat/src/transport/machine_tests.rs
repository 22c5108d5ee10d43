// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use proptest::prelude::*;

use super::*;

fn machine(max_attempts: u32) -> SessionMachine {
    SessionMachine::new(ReconnectPolicy {
        base: Duration::from_millis(100),
        cap: Duration::from_millis(1000),
        max_attempts,
    })
}

// ── connect ───────────────────────────────────────────────────────────

#[test]
fn begin_connect_is_refused_while_active() {
    let mut m = machine(3);
    assert!(m.begin_connect());
    assert_eq!(m.state(), ConnectionState::Connecting);
    assert!(!m.begin_connect());

    m.opened();
    assert_eq!(m.state(), ConnectionState::Connected);
    assert!(!m.begin_connect());
}

#[test]
fn open_resets_attempt_counter() {
    let mut m = machine(5);
    m.begin_connect();
    m.closed();
    m.begin_connect();
    m.closed();
    assert_eq!(m.snapshot().reconnect_attempts, 2);

    m.begin_connect();
    m.opened();
    assert_eq!(m.snapshot().reconnect_attempts, 0);
}

// ── reconnect budget ─────────────────────────────────────────────────

#[test]
fn failures_back_off_then_exhaust_once() {
    let mut m = machine(3);
    let mut outcomes = Vec::new();
    m.begin_connect();
    loop {
        let outcome = m.closed();
        outcomes.push(outcome);
        match outcome {
            CloseOutcome::Reconnect { .. } => {
                m.begin_connect();
            }
            _ => break,
        }
    }

    assert_eq!(
        outcomes,
        vec![
            CloseOutcome::Reconnect { attempt: 1, delay: Duration::from_millis(100) },
            CloseOutcome::Reconnect { attempt: 2, delay: Duration::from_millis(200) },
            CloseOutcome::Reconnect { attempt: 3, delay: Duration::from_millis(400) },
            CloseOutcome::Exhausted,
        ]
    );
    // Exhaustion leaves auto-reconnect armed for a later manual connect.
    assert!(m.reconnect_enabled());
}

#[test]
fn rearm_restores_full_budget_after_exhaustion() {
    let mut m = machine(1);
    m.begin_connect();
    assert!(matches!(m.closed(), CloseOutcome::Reconnect { attempt: 1, .. }));
    m.begin_connect();
    assert_eq!(m.closed(), CloseOutcome::Exhausted);

    m.rearm();
    m.begin_connect();
    assert!(matches!(m.closed(), CloseOutcome::Reconnect { attempt: 1, .. }));
}

// ── disconnect ───────────────────────────────────────────────────────

#[test]
fn permanent_disconnect_suppresses_reconnect() {
    let mut m = machine(10);
    m.begin_connect();
    m.opened();
    m.disconnect(true);
    assert_eq!(m.state(), ConnectionState::Disconnected);
    assert_eq!(m.closed(), CloseOutcome::Idle);
    assert!(!m.reconnect_enabled());
}

#[test]
fn temporary_disconnect_keeps_reconnect_armed() {
    let mut m = machine(10);
    m.begin_connect();
    m.opened();
    m.disconnect(false);
    assert!(m.reconnect_enabled());
    assert!(matches!(m.closed(), CloseOutcome::Reconnect { .. }));
}

proptest! {
    #[test]
    fn no_close_sequence_reconnects_after_permanent_disconnect(
        opens in proptest::collection::vec(any::<bool>(), 0..30),
    ) {
        let mut m = machine(5);
        m.disconnect(true);
        for open in opens {
            m.begin_connect();
            if open {
                m.opened();
            }
            prop_assert_eq!(m.closed(), CloseOutcome::Idle);
        }
    }
}
