// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Connection lifecycle management for a sensor node.
//!
//! A node's connection has two layers: the wireless network join and
//! the broker session running on top of it. [`ConnectionManager`]
//! owns both, together with the retry policy (fixed 5 s backoff,
//! bounded or deliberately unbounded budget), status reporting and
//! self-healing health checks.
//!
//! Failure semantics are asymmetric on purpose: network joins are
//! often slow and flaky, so they are retried patiently; broker connect
//! failures usually mean misconfiguration that needs an operator, so
//! they are reported once per sequence and left to the next periodic
//! check.

mod config;
mod manager;
mod status;

pub use config::ConnectionConfig;
pub use manager::ConnectionManager;
pub use status::{ConnectionState, ConnectionStatus};
