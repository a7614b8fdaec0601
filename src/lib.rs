// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! `SensorLink` Lib - connection and publishing core for MQTT sensor nodes.
//!
//! This library is the reusable heart of a family of small sensor
//! nodes: it joins a wireless network, establishes a broker session on
//! top of it, announces each sensor channel via the hub's discovery
//! protocol and publishes periodic telemetry. Sensor drivers,
//! calibration and LED feedback stay outside; they talk to the core
//! through plain data records and the seams in [`transport`] and
//! [`channel`].
//!
//! # Supported Features
//!
//! - **Connection lifecycle**: two-layer connect (network join, then
//!   broker session) with a bounded or deliberately unbounded retry
//!   budget and fixed 5 s backoff
//! - **Self-healing health checks**: idempotent when healthy,
//!   repairing exactly what is down when degraded
//! - **Discovery publishing**: retained per-channel descriptions the
//!   hub auto-configures dashboards from
//! - **Telemetry publishing**: flat, insertion-ordered reading sets
//!
//! # Quick Start
//!
//! ```no_run
//! use sensorlink_lib::transport::{HostedNetwork, MqttSessionClient};
//! use sensorlink_lib::{ChannelBank, ConnectionManager, ConnectionStatus};
//!
//! #[tokio::main]
//! async fn main() {
//!     let mut manager =
//!         ConnectionManager::new(HostedNetwork::new(), MqttSessionClient::new());
//!     manager.set_network("fieldnet", Some("hunter2"));
//!     manager.set_broker("192.168.1.50", 1883);
//!     manager.set_retry_budget(5).unwrap();
//!
//!     if manager.connect().await != ConnectionStatus::Connected {
//!         // signal the failure and halt; the status code says why
//!         return;
//!     }
//!
//!     // Announce every channel once after connecting.
//!     let bank = ChannelBank::new("GreenA")
//!         .with_expires_after(3600)
//!         .with_moisture_channels(5);
//!     for description in bank.descriptions() {
//!         manager.publish_discovery(&description).await;
//!     }
//!
//!     loop {
//!         manager.poll().await;
//!         manager.check_connection().await;
//!         // every N ticks: gather readings into a TelemetryRecord and
//!         // manager.publish_telemetry(&record, bank.state_topic()).await;
//!     }
//! }
//! ```
//!
//! # Status codes, not errors
//!
//! Connection outcomes are [`ConnectionStatus`] values returned from
//! every operation; nothing propagates as `Err` across the core
//! boundary and the core never terminates the process. The control
//! loop of the device decides which codes are fatal (halt with a
//! visible indicator) and which are transient (retry next tick).

pub mod channel;
pub mod connection;
pub mod discovery;
pub mod error;
pub mod telemetry;
pub mod transport;

pub use channel::{ChannelBank, ReadingSource, SensorChannel};
pub use connection::{ConnectionConfig, ConnectionManager, ConnectionState, ConnectionStatus};
pub use discovery::{DISCOVERY_PREFIX, DeviceDescription};
pub use error::{Error, Result, ValueError};
pub use telemetry::TelemetryRecord;
pub use transport::{NetworkLink, SessionClient};

#[cfg(feature = "mqtt")]
pub use transport::MqttSessionClient;
