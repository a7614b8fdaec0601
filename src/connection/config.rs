// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Connection configuration for a sensor node.

use crate::error::ValueError;

/// Configuration for the two-layer connection of a node.
///
/// Holds the network identity, broker endpoint, optional broker
/// credentials and the retry budget. All setters are pure (no I/O)
/// and are meant to be called before the first
/// [`connect`](crate::ConnectionManager::connect); the manager does
/// not re-read configuration mid-session.
///
/// # Examples
///
/// ```
/// use sensorlink_lib::ConnectionConfig;
///
/// let mut config = ConnectionConfig::new();
/// config.set_network("fieldnet", Some("hunter2"));
/// config.set_broker("192.168.1.50", 1883);
/// config.set_retry_budget(5).unwrap();
/// ```
#[derive(Debug, Clone)]
pub struct ConnectionConfig {
    network_name: String,
    psk: Option<String>,
    broker_host: String,
    broker_port: u16,
    credentials: Option<(String, String)>,
    retry_budget: u8,
}

impl ConnectionConfig {
    /// Maximum allowed retry budget.
    pub const MAX_RETRY_BUDGET: u8 = 100;

    /// Creates an empty configuration (default broker port 1883,
    /// unlimited retries).
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the network name and optional pre-shared key.
    ///
    /// An empty pre-shared key is treated as absent: the join will use
    /// open (credential-less) mode.
    pub fn set_network(&mut self, network_name: impl Into<String>, psk: Option<&str>) {
        self.network_name = network_name.into();
        self.psk = match psk {
            Some(p) if !p.is_empty() => Some(p.to_string()),
            _ => None,
        };
    }

    /// Sets the broker endpoint.
    pub fn set_broker(&mut self, host: impl Into<String>, port: u16) {
        self.broker_host = host.into();
        self.broker_port = port;
    }

    /// Sets the broker credentials.
    pub fn set_credentials(&mut self, username: impl Into<String>, password: impl Into<String>) {
        self.credentials = Some((username.into(), password.into()));
    }

    /// Sets the network join retry budget.
    ///
    /// The budget is the maximum number of join attempts per connect
    /// or reconnect sequence. Zero retries indefinitely — a deliberate
    /// choice for unattended field devices that have nothing better to
    /// do than keep trying.
    ///
    /// # Errors
    ///
    /// Returns `ValueError::RetryBudgetOutOfRange` for values above
    /// 100; the prior budget is retained.
    pub fn set_retry_budget(&mut self, budget: u8) -> Result<(), ValueError> {
        if budget > Self::MAX_RETRY_BUDGET {
            return Err(ValueError::RetryBudgetOutOfRange {
                max: Self::MAX_RETRY_BUDGET,
                actual: budget,
            });
        }
        self.retry_budget = budget;
        Ok(())
    }

    /// Returns the network name.
    #[must_use]
    pub fn network_name(&self) -> &str {
        &self.network_name
    }

    /// Returns the pre-shared key, if one is configured.
    #[must_use]
    pub fn psk(&self) -> Option<&str> {
        self.psk.as_deref()
    }

    /// Returns the broker host.
    #[must_use]
    pub fn broker_host(&self) -> &str {
        &self.broker_host
    }

    /// Returns the broker port.
    #[must_use]
    pub fn broker_port(&self) -> u16 {
        self.broker_port
    }

    /// Returns the broker credentials, if configured.
    #[must_use]
    pub fn credentials(&self) -> Option<(&str, &str)> {
        self.credentials
            .as_ref()
            .map(|(u, p)| (u.as_str(), p.as_str()))
    }

    /// Returns the retry budget (0 = unlimited).
    #[must_use]
    pub fn retry_budget(&self) -> u8 {
        self.retry_budget
    }

    /// Returns true when both required parameters are present.
    pub(crate) fn has_required_params(&self) -> bool {
        !self.network_name.is_empty() && !self.broker_host.is_empty()
    }
}

impl Default for ConnectionConfig {
    fn default() -> Self {
        Self {
            network_name: String::new(),
            psk: None,
            broker_host: String::new(),
            broker_port: 1883,
            credentials: None,
            retry_budget: 0,
        }
    }
}
