// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Real-time session: the reconnecting WebSocket and the commands sent over it.

pub mod backoff;
pub mod commands;
pub mod machine;
pub mod session;

pub use backoff::ReconnectPolicy;
pub use commands::{CommandSink, OutboundCommand};
pub use machine::{ConnectionState, TransportSnapshot};
pub use session::{HandshakeCookies, SessionTransport};
