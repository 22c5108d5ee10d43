// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! In-process event bus between the session transport and its consumers.
//!
//! Listeners are keyed by event name and run synchronously, in registration
//! order, on the emitting task. A panicking listener is logged and skipped;
//! the remaining listeners still run.

use std::collections::HashMap;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::Arc;

use parking_lot::Mutex;
use serde_json::Value;

/// A registered callback. Removal compares by `Arc` identity.
pub type Listener = Arc<dyn Fn(&Value) + Send + Sync>;

/// Wrap a closure as a [`Listener`].
pub fn listener(f: impl Fn(&Value) + Send + Sync + 'static) -> Listener {
    Arc::new(f)
}

/// Name-keyed publish/subscribe registry.
#[derive(Default)]
pub struct EventBus {
    listeners: Mutex<HashMap<String, Vec<Listener>>>,
}

impl EventBus {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `callback` for `event`.
    pub fn on(&self, event: &str, callback: Listener) {
        self.listeners.lock().entry(event.to_owned()).or_default().push(callback);
    }

    /// Remove every registration of this exact `callback` for `event`.
    pub fn off(&self, event: &str, callback: &Listener) {
        let mut listeners = self.listeners.lock();
        if let Some(list) = listeners.get_mut(event) {
            list.retain(|cb| !Arc::ptr_eq(cb, callback));
            if list.is_empty() {
                listeners.remove(event);
            }
        }
    }

    /// Clear listeners for one event, or for all events when `event` is `None`.
    pub fn remove_all_listeners(&self, event: Option<&str>) {
        let mut listeners = self.listeners.lock();
        match event {
            Some(name) => {
                listeners.remove(name);
            }
            None => listeners.clear(),
        }
    }

    pub fn listener_count(&self, event: &str) -> usize {
        self.listeners.lock().get(event).map_or(0, Vec::len)
    }

    /// Invoke every listener registered for `event` with `data`.
    ///
    /// The registry lock is released before any callback runs, so listeners
    /// may register or remove listeners themselves.
    pub fn emit(&self, event: &str, data: &Value) {
        let snapshot: Vec<Listener> = match self.listeners.lock().get(event) {
            Some(list) => list.clone(),
            None => return,
        };

        for callback in snapshot {
            if catch_unwind(AssertUnwindSafe(|| callback(data))).is_err() {
                tracing::error!(event, "event listener panicked");
            }
        }
    }
}

#[cfg(test)]
#[path = "events_tests.rs"]
mod tests;
