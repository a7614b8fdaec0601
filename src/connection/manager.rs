// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! The connection manager: network join plus broker session lifecycle.

use std::time::Duration;

use crate::connection::{ConnectionConfig, ConnectionState, ConnectionStatus};
use crate::error::ValueError;
use crate::transport::{NetworkLink, SessionClient};

/// Fixed delay between network join attempts.
const RETRY_BACKOFF: Duration = Duration::from_secs(5);

/// Manages the two-layer connection of a sensor node: the wireless
/// network join and the broker session established on top of it.
///
/// The manager owns both collaborators and all connection policy:
/// bounded (or deliberately unbounded) join retries with a fixed 5 s
/// backoff, a single broker attempt per sequence, and idempotent
/// self-healing health checks. Outcomes are reported as
/// [`ConnectionStatus`] values, never as propagating errors — the
/// calling control loop decides what is fatal.
///
/// All operations run to completion on the caller's task; a connect or
/// reconnect sequence cannot be interrupted once started. That is an
/// accepted trade-off for a single-purpose field device with no
/// competing work.
///
/// # Examples
///
/// ```no_run
/// use sensorlink_lib::{ConnectionManager, ConnectionStatus};
/// use sensorlink_lib::transport::{HostedNetwork, MqttSessionClient};
///
/// # async fn example() {
/// let mut manager = ConnectionManager::new(HostedNetwork::new(), MqttSessionClient::new());
/// manager.set_network("fieldnet", Some("hunter2"));
/// manager.set_broker("192.168.1.50", 1883);
/// manager.set_retry_budget(5).unwrap();
///
/// if manager.connect().await != ConnectionStatus::Connected {
///     // surface the failure on the device's status LED and halt
/// }
///
/// loop {
///     manager.poll().await;
///     manager.check_connection().await;
///     // gather readings, publish, sleep until the next tick
/// }
/// # }
/// ```
#[derive(Debug)]
pub struct ConnectionManager<N, S> {
    network: N,
    session: S,
    config: ConnectionConfig,
    state: ConnectionState,
    status: ConnectionStatus,
    broker_error: i16,
    started: bool,
}

impl<N: NetworkLink, S: SessionClient> ConnectionManager<N, S> {
    /// Creates a manager owning both collaborators.
    #[must_use]
    pub fn new(network: N, session: S) -> Self {
        Self {
            network,
            session,
            config: ConnectionConfig::new(),
            state: ConnectionState::Disconnected,
            status: ConnectionStatus::NotStarted,
            broker_error: 0,
            started: false,
        }
    }

    /// Creates a manager with a pre-built configuration.
    #[must_use]
    pub fn with_config(network: N, session: S, config: ConnectionConfig) -> Self {
        let mut manager = Self::new(network, session);
        manager.config = config;
        manager
    }

    // =========================================================================
    // Configuration
    // =========================================================================

    /// Sets the network name and optional pre-shared key.
    ///
    /// An empty key selects open (credential-less) join mode.
    pub fn set_network(&mut self, network_name: impl Into<String>, psk: Option<&str>) {
        self.config.set_network(network_name, psk);
    }

    /// Sets the broker endpoint.
    pub fn set_broker(&mut self, host: impl Into<String>, port: u16) {
        self.config.set_broker(host, port);
    }

    /// Sets the broker credentials and forwards them to the session
    /// client so they apply to the next connect.
    pub fn set_credentials(&mut self, username: &str, password: &str) {
        self.config.set_credentials(username, password);
        self.session.set_credentials(username, password);
    }

    /// Sets the network join retry budget (0 = unlimited).
    ///
    /// # Errors
    ///
    /// Returns `ValueError::RetryBudgetOutOfRange` for values above
    /// 100; the prior budget is retained.
    pub fn set_retry_budget(&mut self, budget: u8) -> Result<(), ValueError> {
        self.config.set_retry_budget(budget)
    }

    /// Returns the current configuration.
    #[must_use]
    pub fn config(&self) -> &ConnectionConfig {
        &self.config
    }

    // =========================================================================
    // Lifecycle
    // =========================================================================

    /// Establishes the full connection: network join, then one broker
    /// session attempt.
    ///
    /// Returns `NoParams` without any I/O when the network name or
    /// broker host is unset. Join failures back off 5 s and retry
    /// until the budget is exhausted (`NetworkTimeout`) or, with a
    /// budget of 0, until they succeed. A broker failure tears the
    /// network join back down and returns `BrokerError` with the
    /// session client's diagnostic code retained. Success returns
    /// `Connected`.
    pub async fn connect(&mut self) -> ConnectionStatus {
        if !self.config.has_required_params() {
            tracing::warn!("connect called without network name or broker host");
            return self.record(ConnectionStatus::NoParams);
        }

        if let Err(status) = self.join_network().await {
            self.state = ConnectionState::Error;
            return self.record(status);
        }

        if let Err(status) = self.connect_session().await {
            self.state = ConnectionState::Error;
            return self.record(status);
        }

        self.started = true;
        self.state = ConnectionState::Connected;
        tracing::info!(
            network = %self.config.network_name(),
            broker = %self.config.broker_host(),
            port = self.config.broker_port(),
            "node connected"
        );
        self.record(ConnectionStatus::Connected)
    }

    /// Checks connection health and repairs what is down.
    ///
    /// Before the first successful [`connect`](Self::connect) this
    /// returns `NotStarted` without any I/O. When both layers are up
    /// it returns `Ok` with no side effects. A lost broker session
    /// gets exactly one reconnect attempt (`BrokerError` on failure);
    /// a lost network triggers the same join sequence as `connect`,
    /// budget and backoff included, followed by one broker attempt.
    ///
    /// Callers are expected to invoke this before every publish.
    pub async fn check_connection(&mut self) -> ConnectionStatus {
        if !self.started {
            return self.record(ConnectionStatus::NotStarted);
        }

        match self.health() {
            ConnectionStatus::NoNetwork => {
                tracing::info!("network link lost, rejoining");
                if let Err(status) = self.join_network().await {
                    self.state = ConnectionState::Error;
                    return self.record(status);
                }
                self.finish_reconnect().await
            }
            ConnectionStatus::NoBroker => {
                tracing::info!("broker session lost, reconnecting");
                self.finish_reconnect().await
            }
            _ => self.record(ConnectionStatus::Ok),
        }
    }

    /// Shuts both layers down if the connection is healthy; no-op
    /// otherwise.
    pub async fn disconnect(&mut self) {
        if self.health() != ConnectionStatus::Ok {
            return;
        }
        self.session.stop().await;
        self.network.disconnect();
        self.started = false;
        self.state = ConnectionState::Disconnected;
        tracing::info!("node disconnected");
    }

    /// Services inbound session traffic (keep-alives).
    ///
    /// Must be called at least once per control-loop tick; otherwise
    /// the broker will drop the session and the next
    /// [`check_connection`](Self::check_connection) will have to
    /// repair it.
    pub async fn poll(&mut self) {
        if self.started {
            self.session.poll().await;
        }
    }

    // =========================================================================
    // Accessors
    // =========================================================================

    /// Returns the status recorded by the last operation.
    #[must_use]
    pub fn status(&self) -> ConnectionStatus {
        self.status
    }

    /// Returns the session client's diagnostic code from the last
    /// broker failure.
    #[must_use]
    pub fn broker_error(&self) -> i16 {
        self.broker_error
    }

    /// Returns the current lifecycle state.
    #[must_use]
    pub fn state(&self) -> ConnectionState {
        self.state
    }

    /// Probes current health without side effects.
    ///
    /// Returns `Ok`, `NoNetwork` or `NoBroker`.
    #[must_use]
    pub fn health(&self) -> ConnectionStatus {
        if !self.network.connected() {
            ConnectionStatus::NoNetwork
        } else if !self.session.connected() {
            ConnectionStatus::NoBroker
        } else {
            ConnectionStatus::Ok
        }
    }

    /// Consumes the manager and returns both collaborators.
    #[must_use]
    pub fn into_parts(self) -> (N, S) {
        (self.network, self.session)
    }

    // =========================================================================
    // Internals
    // =========================================================================

    /// Whether the first connect has succeeded.
    pub(crate) fn is_started(&self) -> bool {
        self.started
    }

    /// Publishes through the owned session client.
    pub(crate) async fn publish_raw(&mut self, topic: &str, payload: &str, retained: bool) -> bool {
        self.session.publish(topic, payload, retained).await
    }

    fn record(&mut self, status: ConnectionStatus) -> ConnectionStatus {
        self.status = status;
        status
    }

    /// Joins the network, retrying with a fixed backoff.
    ///
    /// The retry budget counts join attempts: with a budget of `n > 0`
    /// exactly `n` attempts are made, sleeping only between attempts.
    /// A budget of 0 retries until success.
    async fn join_network(&mut self) -> Result<(), ConnectionStatus> {
        let budget = u32::from(self.config.retry_budget());
        let mut attempts: u32 = 0;

        self.state = ConnectionState::NetworkJoining;
        loop {
            attempts += 1;
            let joined = self
                .network
                .join(self.config.network_name(), self.config.psk())
                .await;
            if joined {
                self.state = ConnectionState::NetworkJoined;
                tracing::debug!(attempts, "network joined");
                return Ok(());
            }

            tracing::debug!(attempt = attempts, "network join failed");
            if budget > 0 && attempts >= budget {
                tracing::warn!(attempts, "network join retry budget exhausted");
                return Err(ConnectionStatus::NetworkTimeout);
            }
            tokio::time::sleep(RETRY_BACKOFF).await;
        }
    }

    /// Makes the single broker session attempt of a sequence.
    ///
    /// On failure the network join is torn back down and the session
    /// client's diagnostic code is retained.
    async fn connect_session(&mut self) -> Result<(), ConnectionStatus> {
        self.state = ConnectionState::BrokerConnecting;
        let connected = self
            .session
            .connect(self.config.broker_host(), self.config.broker_port())
            .await;
        if connected {
            return Ok(());
        }

        self.broker_error = self.session.last_error();
        self.network.disconnect();
        tracing::warn!(
            broker = %self.config.broker_host(),
            code = self.broker_error,
            "broker session connect failed"
        );
        Err(ConnectionStatus::BrokerError)
    }

    /// Completes a repair sequence with the single broker attempt.
    async fn finish_reconnect(&mut self) -> ConnectionStatus {
        match self.connect_session().await {
            Ok(()) => {
                self.state = ConnectionState::Connected;
                self.record(ConnectionStatus::Ok)
            }
            Err(status) => {
                self.state = ConnectionState::Error;
                self.record(status)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Scripted network link counting every call.
    #[derive(Debug)]
    struct MockNetwork {
        /// Number of join attempts that fail before one succeeds.
        fail_joins: u32,
        join_calls: u32,
        disconnects: u32,
        connected: bool,
        /// psk argument observed on the last join.
        last_psk: Option<String>,
    }

    impl MockNetwork {
        fn reliable() -> Self {
            Self::failing_first(0)
        }

        fn failing_first(fail_joins: u32) -> Self {
            Self {
                fail_joins,
                join_calls: 0,
                disconnects: 0,
                connected: false,
                last_psk: None,
            }
        }

        fn always_failing() -> Self {
            Self::failing_first(u32::MAX)
        }
    }

    impl NetworkLink for MockNetwork {
        async fn join(&mut self, _network_name: &str, psk: Option<&str>) -> bool {
            self.join_calls += 1;
            self.last_psk = psk.map(str::to_string);
            if self.join_calls > self.fail_joins {
                self.connected = true;
                true
            } else {
                false
            }
        }

        fn connected(&self) -> bool {
            self.connected
        }

        fn disconnect(&mut self) {
            self.disconnects += 1;
            self.connected = false;
        }
    }

    /// Scripted session client counting every call.
    #[derive(Debug)]
    struct MockSession {
        accept: bool,
        error_code: i16,
        connect_calls: u32,
        connected: bool,
        polls: u32,
        stops: u32,
        credentials: Option<(String, String)>,
        published: Vec<(String, String, bool)>,
    }

    impl MockSession {
        fn accepting() -> Self {
            Self {
                accept: true,
                error_code: 0,
                connect_calls: 0,
                connected: false,
                polls: 0,
                stops: 0,
                credentials: None,
                published: Vec::new(),
            }
        }

        fn refusing(error_code: i16) -> Self {
            Self {
                accept: false,
                error_code,
                ..Self::accepting()
            }
        }
    }

    impl SessionClient for MockSession {
        async fn connect(&mut self, _host: &str, _port: u16) -> bool {
            self.connect_calls += 1;
            self.connected = self.accept;
            self.accept
        }

        fn connected(&self) -> bool {
            self.connected
        }

        fn set_credentials(&mut self, username: &str, password: &str) {
            self.credentials = Some((username.to_string(), password.to_string()));
        }

        async fn publish(&mut self, topic: &str, payload: &str, retained: bool) -> bool {
            self.published
                .push((topic.to_string(), payload.to_string(), retained));
            true
        }

        async fn poll(&mut self) {
            self.polls += 1;
        }

        async fn stop(&mut self) {
            self.stops += 1;
            self.connected = false;
        }

        fn last_error(&self) -> i16 {
            self.error_code
        }
    }

    fn configured_manager(
        network: MockNetwork,
        session: MockSession,
    ) -> ConnectionManager<MockNetwork, MockSession> {
        let mut manager = ConnectionManager::new(network, session);
        manager.set_network("fieldnet", Some("hunter2"));
        manager.set_broker("192.168.1.50", 1883);
        manager
    }

    #[tokio::test]
    async fn connect_without_network_name_is_pure() {
        let mut manager = ConnectionManager::new(MockNetwork::reliable(), MockSession::accepting());
        manager.set_broker("192.168.1.50", 1883);

        assert_eq!(manager.connect().await, ConnectionStatus::NoParams);
        assert_eq!(manager.status(), ConnectionStatus::NoParams);
        assert_eq!(manager.network.join_calls, 0, "no I/O may be attempted");
        assert_eq!(manager.session.connect_calls, 0);
        assert_eq!(manager.state(), ConnectionState::Disconnected);
    }

    #[tokio::test]
    async fn connect_without_broker_host_is_pure() {
        let mut manager = ConnectionManager::new(MockNetwork::reliable(), MockSession::accepting());
        manager.set_network("fieldnet", None);

        assert_eq!(manager.connect().await, ConnectionStatus::NoParams);
        assert_eq!(manager.network.join_calls, 0);
    }

    #[tokio::test]
    async fn connect_success() {
        let mut manager = configured_manager(MockNetwork::reliable(), MockSession::accepting());

        assert_eq!(manager.connect().await, ConnectionStatus::Connected);
        assert_eq!(manager.state(), ConnectionState::Connected);
        assert_eq!(manager.status(), ConnectionStatus::Connected);
        assert_eq!(manager.network.join_calls, 1);
        assert_eq!(manager.session.connect_calls, 1);
    }

    #[tokio::test]
    async fn connect_uses_open_mode_without_psk() {
        let mut manager = configured_manager(MockNetwork::reliable(), MockSession::accepting());
        manager.set_network("fieldnet", None);

        manager.connect().await;
        assert_eq!(manager.network.last_psk, None);
    }

    #[tokio::test]
    async fn connect_uses_authenticated_mode_with_psk() {
        let mut manager = configured_manager(MockNetwork::reliable(), MockSession::accepting());

        manager.connect().await;
        assert_eq!(manager.network.last_psk.as_deref(), Some("hunter2"));
    }

    #[tokio::test(start_paused = true)]
    async fn budget_three_makes_exactly_three_attempts() {
        let mut manager =
            configured_manager(MockNetwork::always_failing(), MockSession::accepting());
        manager.set_retry_budget(3).unwrap();

        assert_eq!(manager.connect().await, ConnectionStatus::NetworkTimeout);
        assert_eq!(manager.network.join_calls, 3);
        assert_eq!(manager.session.connect_calls, 0);
        assert_eq!(manager.state(), ConnectionState::Error);
    }

    #[tokio::test(start_paused = true)]
    async fn budget_one_makes_one_attempt_without_backoff() {
        let mut manager =
            configured_manager(MockNetwork::always_failing(), MockSession::accepting());
        manager.set_retry_budget(1).unwrap();

        let before = tokio::time::Instant::now();
        assert_eq!(manager.connect().await, ConnectionStatus::NetworkTimeout);
        assert_eq!(manager.network.join_calls, 1);
        assert_eq!(before.elapsed(), Duration::ZERO, "no sleep after last attempt");
    }

    #[tokio::test(start_paused = true)]
    async fn zero_budget_retries_until_success() {
        let mut manager =
            configured_manager(MockNetwork::failing_first(7), MockSession::accepting());
        manager.set_retry_budget(0).unwrap();

        assert_eq!(manager.connect().await, ConnectionStatus::Connected);
        assert_eq!(manager.network.join_calls, 8);
    }

    #[tokio::test(start_paused = true)]
    async fn backoff_is_five_seconds_per_failed_attempt() {
        let mut manager =
            configured_manager(MockNetwork::failing_first(2), MockSession::accepting());

        let before = tokio::time::Instant::now();
        manager.connect().await;
        assert_eq!(before.elapsed(), Duration::from_secs(10));
    }

    #[tokio::test]
    async fn broker_failure_tears_down_network_join() {
        let mut manager = configured_manager(MockNetwork::reliable(), MockSession::refusing(-2));

        assert_eq!(manager.connect().await, ConnectionStatus::BrokerError);
        assert_eq!(manager.broker_error(), -2);
        assert_eq!(manager.network.disconnects, 1);
        assert_eq!(manager.state(), ConnectionState::Error);

        // The broker attempt is never retried within the same call.
        assert_eq!(manager.session.connect_calls, 1);
    }

    #[tokio::test]
    async fn check_before_connect_returns_not_started() {
        let mut manager = configured_manager(MockNetwork::reliable(), MockSession::accepting());

        assert_eq!(
            manager.check_connection().await,
            ConnectionStatus::NotStarted
        );
        assert_eq!(manager.network.join_calls, 0, "no I/O may be attempted");
        assert_eq!(manager.session.connect_calls, 0);
    }

    #[tokio::test]
    async fn check_when_healthy_has_no_side_effects() {
        let mut manager = configured_manager(MockNetwork::reliable(), MockSession::accepting());
        manager.connect().await;

        assert_eq!(manager.check_connection().await, ConnectionStatus::Ok);
        assert_eq!(manager.network.join_calls, 1);
        assert_eq!(manager.session.connect_calls, 1);
        assert_eq!(manager.state(), ConnectionState::Connected);
    }

    #[tokio::test]
    async fn check_repairs_lost_session_with_single_attempt() {
        let mut manager = configured_manager(MockNetwork::reliable(), MockSession::accepting());
        manager.connect().await;

        manager.session.connected = false;
        assert_eq!(manager.check_connection().await, ConnectionStatus::Ok);
        assert_eq!(manager.session.connect_calls, 2);
        assert_eq!(manager.network.join_calls, 1, "network join untouched");
    }

    #[tokio::test]
    async fn check_reports_broker_error_when_session_reconnect_fails() {
        let mut manager = configured_manager(MockNetwork::reliable(), MockSession::accepting());
        manager.connect().await;

        manager.session.connected = false;
        manager.session.accept = false;
        manager.session.error_code = 4;

        assert_eq!(
            manager.check_connection().await,
            ConnectionStatus::BrokerError
        );
        assert_eq!(manager.broker_error(), 4);
        assert_eq!(manager.network.disconnects, 1);
    }

    #[tokio::test(start_paused = true)]
    async fn check_rejoins_lost_network_with_budget() {
        let mut manager = configured_manager(MockNetwork::reliable(), MockSession::accepting());
        manager.set_retry_budget(2).unwrap();
        manager.connect().await;

        manager.network.connected = false;
        manager.network.fail_joins = u32::MAX;

        assert_eq!(
            manager.check_connection().await,
            ConnectionStatus::NetworkTimeout
        );
        // 1 from connect, 2 from the bounded rejoin.
        assert_eq!(manager.network.join_calls, 3);
    }

    #[tokio::test]
    async fn check_rejoins_lost_network_and_reconnects_session() {
        let mut manager = configured_manager(MockNetwork::reliable(), MockSession::accepting());
        manager.connect().await;

        manager.network.connected = false;
        manager.network.join_calls = 0;
        manager.network.fail_joins = 0;
        manager.session.connected = false;

        assert_eq!(manager.check_connection().await, ConnectionStatus::Ok);
        assert_eq!(manager.network.join_calls, 1);
        assert_eq!(manager.session.connect_calls, 2);
        assert_eq!(manager.state(), ConnectionState::Connected);
    }

    #[tokio::test]
    async fn disconnect_when_healthy_stops_both_layers() {
        let mut manager = configured_manager(MockNetwork::reliable(), MockSession::accepting());
        manager.connect().await;

        manager.disconnect().await;
        assert_eq!(manager.session.stops, 1);
        assert_eq!(manager.network.disconnects, 1);
        assert_eq!(manager.state(), ConnectionState::Disconnected);

        // A disconnected manager must reconnect from scratch.
        assert_eq!(
            manager.check_connection().await,
            ConnectionStatus::NotStarted
        );
    }

    #[tokio::test]
    async fn disconnect_when_degraded_is_noop() {
        let mut manager = configured_manager(MockNetwork::reliable(), MockSession::accepting());
        manager.connect().await;

        manager.session.connected = false;
        manager.disconnect().await;
        assert_eq!(manager.session.stops, 0);
        assert_eq!(manager.network.disconnects, 0);
    }

    #[tokio::test]
    async fn poll_forwards_only_when_started() {
        let mut manager = configured_manager(MockNetwork::reliable(), MockSession::accepting());

        manager.poll().await;
        assert_eq!(manager.session.polls, 0);

        manager.connect().await;
        manager.poll().await;
        assert_eq!(manager.session.polls, 1);
    }

    #[tokio::test]
    async fn credentials_are_forwarded_to_session() {
        let mut manager = configured_manager(MockNetwork::reliable(), MockSession::accepting());
        manager.set_credentials("node", "secret");

        assert_eq!(
            manager.session.credentials,
            Some(("node".to_string(), "secret".to_string()))
        );
        assert_eq!(manager.config().credentials(), Some(("node", "secret")));
    }

    #[tokio::test]
    async fn health_probe_reports_each_layer() {
        let mut manager = configured_manager(MockNetwork::reliable(), MockSession::accepting());
        assert_eq!(manager.health(), ConnectionStatus::NoNetwork);

        manager.connect().await;
        assert_eq!(manager.health(), ConnectionStatus::Ok);

        manager.session.connected = false;
        assert_eq!(manager.health(), ConnectionStatus::NoBroker);
    }

    #[test]
    fn retry_budget_rejection_leaves_prior_value() {
        let mut manager = ConnectionManager::new(
            MockNetwork::reliable(),
            MockSession::accepting(),
        );
        manager.set_retry_budget(10).unwrap();
        assert!(manager.set_retry_budget(101).is_err());
        assert_eq!(manager.config().retry_budget(), 10);
    }

    #[tokio::test]
    async fn into_parts_returns_collaborators() {
        let mut manager = configured_manager(MockNetwork::reliable(), MockSession::accepting());
        manager.connect().await;

        let (network, session) = manager.into_parts();
        assert!(network.connected());
        assert!(session.connected());
    }
}
