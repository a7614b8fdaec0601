// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! rumqttc-backed session client.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicI16, AtomicU64, Ordering};
use std::time::Duration;

use rumqttc::{AsyncClient, EventLoop, MqttOptions, QoS};
use tokio::sync::oneshot;

use crate::transport::SessionClient;

/// Global counter for generating unique client IDs.
static CLIENT_ID_COUNTER: AtomicU64 = AtomicU64::new(0);

/// An MQTT session client backed by rumqttc.
///
/// The client spawns a background task to drive the rumqttc event
/// loop, so [`SessionClient::poll`] is a no-op here: keep-alives are
/// serviced continuously. The connected flag tracks the event loop's
/// view of the session and goes false as soon as the loop errors out.
///
/// # Examples
///
/// ```no_run
/// use sensorlink_lib::transport::{MqttSessionClient, SessionClient};
///
/// # async fn example() {
/// let mut session = MqttSessionClient::new();
/// session.set_credentials("node", "secret");
/// if session.connect("192.168.1.50", 1883).await {
///     session.publish("homeassistant/sensor/greena/state", "{}", false).await;
/// }
/// # }
/// ```
#[derive(Debug, Default)]
pub struct MqttSessionClient {
    client: Option<AsyncClient>,
    connected: Arc<AtomicBool>,
    last_error: Arc<AtomicI16>,
    credentials: Option<(String, String)>,
    event_loop_task: Option<tokio::task::JoinHandle<()>>,
}

impl MqttSessionClient {
    /// No failure recorded.
    pub const ERR_NONE: i16 = 0;
    /// The broker did not acknowledge the connection in time.
    pub const ERR_CONNECT_TIMEOUT: i16 = -1;
    /// The event loop terminated with a transport error.
    pub const ERR_EVENT_LOOP: i16 = -2;
    /// A publish was rejected or the client channel is closed.
    pub const ERR_PUBLISH: i16 = -3;

    /// How long to wait for the broker's ConnAck.
    const CONNACK_TIMEOUT: Duration = Duration::from_secs(10);

    /// Creates a new, unconnected session client.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn abort_event_loop(&mut self) {
        if let Some(task) = self.event_loop_task.take() {
            task.abort();
        }
    }
}

impl SessionClient for MqttSessionClient {
    async fn connect(&mut self, host: &str, port: u16) -> bool {
        // A reconnect replaces any previous session outright.
        self.abort_event_loop();
        self.client = None;
        self.connected.store(false, Ordering::Release);

        let counter = CLIENT_ID_COUNTER.fetch_add(1, Ordering::Relaxed);
        let client_id = format!("sensorlink_{}_{}", std::process::id(), counter);

        let mut mqtt_options = MqttOptions::new(&client_id, host, port);
        mqtt_options.set_keep_alive(Duration::from_secs(30));
        mqtt_options.set_clean_session(true);

        if let Some((username, password)) = &self.credentials {
            mqtt_options.set_credentials(username, password);
        }

        let (client, event_loop) = AsyncClient::new(mqtt_options, 10);

        let (connack_tx, connack_rx) = oneshot::channel();
        let connected = Arc::clone(&self.connected);
        let last_error = Arc::clone(&self.last_error);
        let task = tokio::spawn(async move {
            drive_event_loop(event_loop, connected, last_error, connack_tx).await;
        });
        self.event_loop_task = Some(task);

        match tokio::time::timeout(Self::CONNACK_TIMEOUT, connack_rx).await {
            Ok(Ok(())) => {
                self.connected.store(true, Ordering::Release);
                self.last_error.store(Self::ERR_NONE, Ordering::Release);
                self.client = Some(client);
                tracing::info!(host = %host, port = %port, "connected to MQTT broker");
                true
            }
            Ok(Err(_)) => {
                // Event loop died before ConnAck; it already recorded the code.
                self.abort_event_loop();
                false
            }
            Err(_) => {
                tracing::warn!(host = %host, port = %port, "MQTT ConnAck timed out");
                self.last_error
                    .store(Self::ERR_CONNECT_TIMEOUT, Ordering::Release);
                self.abort_event_loop();
                false
            }
        }
    }

    fn connected(&self) -> bool {
        self.connected.load(Ordering::Acquire)
    }

    fn set_credentials(&mut self, username: &str, password: &str) {
        self.credentials = Some((username.to_string(), password.to_string()));
    }

    async fn publish(&mut self, topic: &str, payload: &str, retained: bool) -> bool {
        let Some(client) = &self.client else {
            self.last_error.store(Self::ERR_PUBLISH, Ordering::Release);
            return false;
        };

        tracing::debug!(topic = %topic, retained, "publishing MQTT message");

        match client
            .publish(topic, QoS::AtLeastOnce, retained, payload)
            .await
        {
            Ok(()) => true,
            Err(e) => {
                tracing::warn!(topic = %topic, error = %e, "MQTT publish failed");
                self.last_error.store(Self::ERR_PUBLISH, Ordering::Release);
                false
            }
        }
    }

    async fn poll(&mut self) {
        // The spawned event loop services keep-alives continuously.
    }

    async fn stop(&mut self) {
        if let Some(client) = self.client.take() {
            if let Err(e) = client.disconnect().await {
                tracing::debug!(error = %e, "MQTT disconnect while stopping");
            }
        }
        self.abort_event_loop();
        self.connected.store(false, Ordering::Release);
    }

    fn last_error(&self) -> i16 {
        self.last_error.load(Ordering::Acquire)
    }
}

/// Drives the rumqttc event loop until the session ends.
async fn drive_event_loop(
    mut event_loop: EventLoop,
    connected: Arc<AtomicBool>,
    last_error: Arc<AtomicI16>,
    connack_tx: oneshot::Sender<()>,
) {
    use rumqttc::{Event, Packet};

    let mut connack_tx = Some(connack_tx);

    loop {
        match event_loop.poll().await {
            Ok(Event::Incoming(Packet::ConnAck(connack))) => {
                tracing::debug!(?connack, "MQTT session established");
                connected.store(true, Ordering::Release);
                if let Some(tx) = connack_tx.take() {
                    let _ = tx.send(());
                }
            }
            Ok(Event::Incoming(Packet::Disconnect)) => {
                tracing::info!("MQTT session closed by broker");
                connected.store(false, Ordering::Release);
                break;
            }
            Ok(_) => {}
            Err(e) => {
                tracing::warn!(error = %e, "MQTT event loop error");
                connected.store(false, Ordering::Release);
                last_error.store(MqttSessionClient::ERR_EVENT_LOOP, Ordering::Release);
                break;
            }
        }
    }
}
