// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Subscribes a [`ConversationStore`] to the event bus.
//!
//! Bus listeners only enqueue; one task drains the queue and awaits each
//! handler before the next, so events reach the store in emission order.
//! Events emitted before a `clear_state` are dropped rather than applied to
//! the next session.

use std::sync::Arc;

use serde_json::Value;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use crate::events::{listener, EventBus, Listener};
use crate::protocol::ServerEvent;
use crate::store::ConversationStore;

/// An event waiting for dispatch, stamped with the store epoch it was
/// emitted under.
struct Queued {
    name: &'static str,
    data: Value,
    epoch: u64,
}

pub struct StoreBinding {
    listeners: Vec<(&'static str, Listener)>,
    task: JoinHandle<()>,
}

impl StoreBinding {
    /// Register the store's listeners and start its dispatch task.
    pub fn attach(store: Arc<ConversationStore>, bus: &EventBus) -> Self {
        let (tx, mut rx) = mpsc::unbounded_channel::<Queued>();

        let listeners: Vec<(&'static str, Listener)> = ServerEvent::NAMES
            .iter()
            .map(|&name| {
                let tx = tx.clone();
                let stamp = Arc::clone(&store);
                let callback = listener(move |data| {
                    let _ = tx.send(Queued { name, data: data.clone(), epoch: stamp.epoch() });
                });
                bus.on(name, Arc::clone(&callback));
                (name, callback)
            })
            .collect();

        let task = tokio::spawn(async move {
            while let Some(Queued { name, data, epoch }) = rx.recv().await {
                if epoch != store.epoch() {
                    tracing::debug!(event = name, "dropping event from a cleared session");
                    continue;
                }
                match ServerEvent::decode(name, &data) {
                    Some(Ok(event)) => store.dispatch(event).await,
                    Some(Err(e)) => tracing::warn!(event = name, err = %e, "undecodable event"),
                    None => {}
                }
            }
        });

        Self { listeners, task }
    }

    /// Remove the listeners and stop the dispatch task.
    pub fn detach(self, bus: &EventBus) {
        for (name, callback) in &self.listeners {
            bus.off(name, callback);
        }
        self.task.abort();
    }
}
