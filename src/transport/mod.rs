// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Transport seams between the connection manager and the outside world.
//!
//! The connection manager drives two collaborators it does not
//! implement itself: a [`NetworkLink`] (the wireless-join layer) and a
//! [`SessionClient`] (the publish/subscribe client running on top of
//! it). Both are traits so a node firmware can plug in whatever its
//! platform provides, and so tests can substitute scripted mocks.
//!
//! Two implementations ship with the crate:
//!
//! - [`MqttSessionClient`]: a rumqttc-backed session client (feature
//!   `mqtt`, enabled by default)
//! - [`HostedNetwork`]: a no-op network link for nodes whose interface
//!   is managed by the host operating system

#[cfg(feature = "mqtt")]
mod mqtt;

#[cfg(feature = "mqtt")]
pub use mqtt::MqttSessionClient;

/// The wireless-join layer under the broker session.
///
/// Join attempts report success as a plain `bool`; the connection
/// manager owns all retry and backoff policy, so implementations
/// should make a single attempt per call and return promptly.
#[allow(async_fn_in_trait)]
pub trait NetworkLink {
    /// Attempts to join the named network once.
    ///
    /// A `None` pre-shared key requests open (credential-less) mode.
    async fn join(&mut self, network_name: &str, psk: Option<&str>) -> bool;

    /// Returns whether the link is currently up.
    fn connected(&self) -> bool;

    /// Tears down the link.
    fn disconnect(&mut self);
}

/// A publish/subscribe session client running atop a [`NetworkLink`].
#[allow(async_fn_in_trait)]
pub trait SessionClient {
    /// Attempts to establish a broker session once.
    async fn connect(&mut self, host: &str, port: u16) -> bool;

    /// Returns whether the session is currently established.
    fn connected(&self) -> bool;

    /// Sets the credentials used for subsequent connects.
    fn set_credentials(&mut self, username: &str, password: &str);

    /// Publishes a payload to a topic.
    ///
    /// Retained messages are stored by the broker and redelivered to
    /// late subscribers; discovery descriptions rely on this.
    async fn publish(&mut self, topic: &str, payload: &str, retained: bool) -> bool;

    /// Services inbound protocol traffic (keep-alives).
    ///
    /// Must be called at least once per control-loop tick or the
    /// broker will consider the session dead.
    async fn poll(&mut self);

    /// Closes the session.
    async fn stop(&mut self);

    /// Returns the client's own diagnostic code for the last failure.
    ///
    /// Kept separate from [`ConnectionStatus`](crate::ConnectionStatus):
    /// the status classifies the outcome for the control loop, this
    /// code preserves the transport-specific detail for diagnostics.
    fn last_error(&self) -> i16;
}

/// A [`NetworkLink`] for nodes whose network interface is managed by
/// the host operating system.
///
/// On a hosted target (a Raspberry Pi field node, a test rig) there is
/// no join step to drive: the OS keeps the interface up. Joining
/// always succeeds and tear-down only flips the local flag.
#[derive(Debug, Default)]
pub struct HostedNetwork {
    up: bool,
}

impl HostedNetwork {
    /// Creates a new hosted network link.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

impl NetworkLink for HostedNetwork {
    async fn join(&mut self, network_name: &str, _psk: Option<&str>) -> bool {
        tracing::debug!(network = %network_name, "hosted network link marked up");
        self.up = true;
        true
    }

    fn connected(&self) -> bool {
        self.up
    }

    fn disconnect(&mut self) {
        self.up = false;
    }
}
