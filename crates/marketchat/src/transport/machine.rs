// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Connection lifecycle and reconnect bookkeeping, free of any I/O.

use std::time::Duration;

use serde::Serialize;

use crate::transport::backoff::ReconnectPolicy;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ConnectionState {
    Disconnected,
    Connecting,
    Connected,
}

/// What the transport should do after its socket closed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CloseOutcome {
    /// Schedule reconnect attempt `attempt` after `delay`.
    Reconnect { attempt: u32, delay: Duration },
    /// The attempt budget is spent; stop retrying.
    Exhausted,
    /// Auto-reconnect is disabled.
    Idle,
}

/// Point-in-time view of the transport.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct TransportSnapshot {
    pub state: ConnectionState,
    pub reconnect_attempts: u32,
    pub reconnect_enabled: bool,
}

#[derive(Debug, Clone)]
pub struct SessionMachine {
    state: ConnectionState,
    attempts: u32,
    reconnect_enabled: bool,
    policy: ReconnectPolicy,
}

impl SessionMachine {
    pub fn new(policy: ReconnectPolicy) -> Self {
        Self { state: ConnectionState::Disconnected, attempts: 0, reconnect_enabled: true, policy }
    }

    pub fn state(&self) -> ConnectionState {
        self.state
    }

    pub fn snapshot(&self) -> TransportSnapshot {
        TransportSnapshot {
            state: self.state,
            reconnect_attempts: self.attempts,
            reconnect_enabled: self.reconnect_enabled,
        }
    }

    /// Connecting or connected.
    pub fn is_active(&self) -> bool {
        self.state != ConnectionState::Disconnected
    }

    pub fn reconnect_enabled(&self) -> bool {
        self.reconnect_enabled
    }

    /// An explicit connect request: re-arms auto-reconnect and resets the budget.
    pub fn rearm(&mut self) {
        self.reconnect_enabled = true;
        self.attempts = 0;
    }

    /// Enter `Connecting`. Returns false when already connecting or connected.
    pub fn begin_connect(&mut self) -> bool {
        if self.is_active() {
            return false;
        }
        self.state = ConnectionState::Connecting;
        true
    }

    pub fn opened(&mut self) {
        self.state = ConnectionState::Connected;
        self.attempts = 0;
    }

    /// The socket closed or failed to open.
    pub fn closed(&mut self) -> CloseOutcome {
        self.state = ConnectionState::Disconnected;
        if !self.reconnect_enabled {
            return CloseOutcome::Idle;
        }
        if self.attempts >= self.policy.max_attempts {
            return CloseOutcome::Exhausted;
        }
        self.attempts += 1;
        CloseOutcome::Reconnect { attempt: self.attempts, delay: self.policy.delay(self.attempts) }
    }

    /// A local disconnect request. `permanent` disables auto-reconnect until the
    /// next explicit connect.
    pub fn disconnect(&mut self, permanent: bool) {
        if permanent {
            self.reconnect_enabled = false;
        }
        self.state = ConnectionState::Disconnected;
    }
}

#[cfg(test)]
#[path = "machine_tests.rs"]
mod tests;
