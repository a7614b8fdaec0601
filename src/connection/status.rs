// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Connection lifecycle state and outward-facing status codes.

/// Lifecycle state of the two-layer connection.
///
/// Owned exclusively by the
/// [`ConnectionManager`](crate::ConnectionManager); transitions are
/// driven only by connect-attempt outcomes and health checks.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    /// Neither layer is up.
    Disconnected,
    /// A network join attempt is in progress.
    NetworkJoining,
    /// The network layer is up, no broker session yet.
    NetworkJoined,
    /// A broker session attempt is in progress.
    BrokerConnecting,
    /// Both layers are up.
    Connected,
    /// The last connect or reconnect sequence failed.
    Error,
}

impl ConnectionState {
    /// Returns true if both layers are up.
    #[must_use]
    pub fn is_connected(&self) -> bool {
        matches!(self, Self::Connected)
    }
}

/// Outcome classification returned after every connect and
/// health-check operation.
///
/// Status codes are the library's whole error surface for connection
/// work: nothing here propagates as `Err` and nothing terminates the
/// process. The calling control loop decides which codes are fatal.
/// The broker client's own diagnostic code is retained separately and
/// available via
/// [`ConnectionManager::broker_error`](crate::ConnectionManager::broker_error).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionStatus {
    /// A health check found (or restored) a healthy connection.
    Ok,
    /// A required parameter (network name or broker host) is missing.
    NoParams,
    /// Health probe: the network layer is down.
    NoNetwork,
    /// Health probe: the network is up but the broker session is not.
    NoBroker,
    /// An initial connect completed successfully.
    Connected,
    /// The broker session connect or reconnect failed.
    BrokerError,
    /// The network join retry budget was exhausted.
    NetworkTimeout,
    /// The operation was invoked before the first successful connect.
    NotStarted,
}

impl ConnectionStatus {
    /// Returns true for the two healthy outcomes.
    #[must_use]
    pub fn is_healthy(&self) -> bool {
        matches!(self, Self::Ok | Self::Connected)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn connected_state_check() {
        assert!(ConnectionState::Connected.is_connected());
        assert!(!ConnectionState::Disconnected.is_connected());
        assert!(!ConnectionState::NetworkJoined.is_connected());
        assert!(!ConnectionState::Error.is_connected());
    }

    #[test]
    fn healthy_statuses() {
        assert!(ConnectionStatus::Ok.is_healthy());
        assert!(ConnectionStatus::Connected.is_healthy());
        assert!(!ConnectionStatus::BrokerError.is_healthy());
        assert!(!ConnectionStatus::NetworkTimeout.is_healthy());
        assert!(!ConnectionStatus::NotStarted.is_healthy());
    }
}
