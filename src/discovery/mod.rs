// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! MQTT discovery descriptions for sensor channels.
//!
//! A node announces each of its sensor channels by publishing a
//! retained description payload to a per-channel configuration topic.
//! A home-automation hub subscribed to the discovery prefix picks the
//! payload up and auto-configures a dashboard entity, using the
//! description's value template to extract the channel's field from
//! the node's telemetry payload.
//!
//! The wire schema uses the hub's abbreviated field names; they must
//! not be renamed:
//!
//! ```json
//! {"dev_cla":"moisture","exp_aft":3600,"name":"GreenA Soil Moisture",
//!  "stat_t":"homeassistant/sensor/greena/state","uniq_id":"greenasoil1",
//!  "unit_of_meas":"%","val_tpl":"{{ value_json.smst1 }}"}
//! ```
//!
//! # Examples
//!
//! ```
//! use sensorlink_lib::DeviceDescription;
//!
//! let description = DeviceDescription::new(
//!     "GreenA Soil Moisture",
//!     "homeassistant/sensor/greena/state",
//!     "greenasoil1",
//! )
//! .with_device_class("moisture")
//! .with_unit_of_measurement("%")
//! .with_value_template_for("smst1")
//! .with_expires_after(3600);
//!
//! let payload = description.payload().unwrap();
//! assert!(payload.contains(r#""dev_cla":"moisture""#));
//! ```

use serde::Serialize;

use crate::connection::ConnectionManager;
use crate::error::Error;
use crate::transport::{NetworkLink, SessionClient};

/// Topic prefix the hub watches for sensor discovery payloads.
pub const DISCOVERY_PREFIX: &str = "homeassistant/sensor";

/// Sentinel device class meaning "generic sensor, omit the field".
const DEVICE_CLASS_NONE: &str = "None";

/// Description of one sensor channel for the hub's discovery protocol.
///
/// A description is created transiently per channel at setup time and
/// discarded after publishing. All fields are owned strings: the
/// publish path never sees borrowed data, which rules out the aliased
/// pointer corruption the embedded predecessors of this library had to
/// defend against in their JSON encoder.
///
/// The configuration topic, once published, must stay stable for the
/// life of the device identity — the hub indexes entities by unique id
/// and topic.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeviceDescription {
    /// Semantic category for the hub, `None` for a generic sensor.
    pub device_class: Option<String>,
    /// Seconds after which the hub marks a silent channel unavailable.
    pub expires_after: u16,
    /// Display name.
    pub name: String,
    /// Topic where live values are published.
    pub state_topic: String,
    /// Stable unique id of the channel.
    pub unique_id: String,
    /// Unit of measurement.
    pub unit_of_measurement: String,
    /// Hub-side expression extracting this channel's field from the
    /// telemetry payload.
    pub value_template: String,
    /// Topic this description is published to, retained.
    pub configuration_topic: String,
}

impl DeviceDescription {
    /// Creates a description with the given name, state topic and
    /// unique id.
    ///
    /// The configuration topic defaults to the
    /// `homeassistant/sensor/<unique_id>/config` convention; the rest
    /// starts empty and is filled in with the `with_` methods.
    #[must_use]
    pub fn new(
        name: impl Into<String>,
        state_topic: impl Into<String>,
        unique_id: impl Into<String>,
    ) -> Self {
        let unique_id = unique_id.into();
        let configuration_topic = Self::configuration_topic_for(&unique_id);
        Self {
            device_class: None,
            expires_after: 0,
            name: name.into(),
            state_topic: state_topic.into(),
            unique_id,
            unit_of_measurement: String::new(),
            value_template: String::new(),
            configuration_topic,
        }
    }

    /// Returns the conventional configuration topic for a unique id.
    #[must_use]
    pub fn configuration_topic_for(unique_id: &str) -> String {
        format!("{DISCOVERY_PREFIX}/{unique_id}/config")
    }

    /// Returns the value template extracting `key` from a telemetry
    /// payload.
    #[must_use]
    pub fn value_template_for(key: &str) -> String {
        format!("{{{{ value_json.{key} }}}}")
    }

    /// Sets the device class.
    ///
    /// The `"None"` sentinel (any case) selects a generic sensor: the
    /// serialized payload then carries no `dev_cla` field at all.
    #[must_use]
    pub fn with_device_class(mut self, device_class: impl Into<String>) -> Self {
        let device_class = device_class.into();
        self.device_class = if device_class.eq_ignore_ascii_case(DEVICE_CLASS_NONE) {
            None
        } else {
            Some(device_class)
        };
        self
    }

    /// Sets the expiry timeout in seconds.
    #[must_use]
    pub fn with_expires_after(mut self, seconds: u16) -> Self {
        self.expires_after = seconds;
        self
    }

    /// Sets the unit of measurement.
    #[must_use]
    pub fn with_unit_of_measurement(mut self, unit: impl Into<String>) -> Self {
        self.unit_of_measurement = unit.into();
        self
    }

    /// Sets the value template verbatim.
    #[must_use]
    pub fn with_value_template(mut self, template: impl Into<String>) -> Self {
        self.value_template = template.into();
        self
    }

    /// Sets the value template to extract the given telemetry key.
    #[must_use]
    pub fn with_value_template_for(self, key: &str) -> Self {
        let template = Self::value_template_for(key);
        self.with_value_template(template)
    }

    /// Overrides the configuration topic.
    #[must_use]
    pub fn with_configuration_topic(mut self, topic: impl Into<String>) -> Self {
        self.configuration_topic = topic.into();
        self
    }

    /// Renders the discovery payload.
    ///
    /// Every string field is copied into an independently owned
    /// payload value before serialization; the serializer never sees
    /// data aliased with the description itself.
    ///
    /// # Errors
    ///
    /// Returns `Error::Payload` if JSON rendering fails.
    pub fn payload(&self) -> Result<String, Error> {
        let payload = DiscoveryPayload::from(self);
        Ok(serde_json::to_string(&payload)?)
    }
}

/// Wire form of a [`DeviceDescription`].
///
/// Owns fresh copies of every string field — the copy-before-serialize
/// step — and carries the hub's exact abbreviated field names.
#[derive(Debug, Serialize)]
struct DiscoveryPayload {
    #[serde(rename = "dev_cla", skip_serializing_if = "Option::is_none")]
    device_class: Option<String>,
    #[serde(rename = "exp_aft")]
    expires_after: u16,
    name: String,
    #[serde(rename = "stat_t")]
    state_topic: String,
    #[serde(rename = "uniq_id")]
    unique_id: String,
    #[serde(rename = "unit_of_meas")]
    unit_of_measurement: String,
    #[serde(rename = "val_tpl")]
    value_template: String,
}

impl From<&DeviceDescription> for DiscoveryPayload {
    fn from(description: &DeviceDescription) -> Self {
        Self {
            device_class: description.device_class.clone(),
            expires_after: description.expires_after,
            name: description.name.clone(),
            state_topic: description.state_topic.clone(),
            unique_id: description.unique_id.clone(),
            unit_of_measurement: description.unit_of_measurement.clone(),
            value_template: description.value_template.clone(),
        }
    }
}

impl<N: NetworkLink, S: SessionClient> ConnectionManager<N, S> {
    /// Publishes a channel description as a retained message to its
    /// configuration topic.
    ///
    /// A no-op without any I/O when the node has not connected yet;
    /// the caller is expected to retry after the next successful
    /// [`check_connection`](Self::check_connection).
    pub async fn publish_discovery(&mut self, description: &DeviceDescription) {
        if !self.is_started() {
            tracing::debug!(
                unique_id = %description.unique_id,
                "skipping discovery publish, not connected"
            );
            return;
        }

        let payload = match description.payload() {
            Ok(payload) => payload,
            Err(e) => {
                tracing::error!(
                    unique_id = %description.unique_id,
                    error = %e,
                    "failed to render discovery payload"
                );
                return;
            }
        };

        tracing::info!(
            topic = %description.configuration_topic,
            unique_id = %description.unique_id,
            "publishing discovery description"
        );
        self.publish_raw(&description.configuration_topic, &payload, true)
            .await;
    }
}
