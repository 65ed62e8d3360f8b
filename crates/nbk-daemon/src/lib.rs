// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! Session Router (C7) and Result Bus Consumer (C8): the daemon's
//! outward-facing half. Owns the websocket upgrade/read loop, the
//! kernel-id-to-listener fan-out table, and the bus-consumer task that
//! routes a worker's published result back to its owning websocket.

pub mod bus_consumer;
pub mod http_parse;
pub mod session;
pub mod shutdown;
pub mod user_resolver;
pub mod ws;

pub use bus_consumer::BusConsumer;
pub use session::SessionRouter;
pub use user_resolver::{HeaderUserIdResolver, UserIdResolver};
pub use ws::WsServer;
