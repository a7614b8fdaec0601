// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Sensor channel definitions for a node.
//!
//! The core never touches hardware: sensor drivers live behind the
//! [`ReadingSource`] seam and hand over finished reading sets. What
//! the core does need is the *identity* of each channel — its
//! telemetry key, display name, unit and device class — to generate
//! discovery descriptions whose value templates reference exactly the
//! keys the driver will later report. [`ChannelBank`] holds those
//! identities as one owned, position-indexed collection built once at
//! startup.

use crate::discovery::{DISCOVERY_PREFIX, DeviceDescription};
use crate::telemetry::TelemetryRecord;

/// Pull-style source of validated sensor readings.
///
/// Implemented by the node's sensor driver layer; the returned record
/// must use the channel keys registered in the [`ChannelBank`].
pub trait ReadingSource {
    /// Returns the latest validated reading set.
    fn latest(&self) -> TelemetryRecord;
}

/// Identity of one sensor channel.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SensorChannel {
    /// Telemetry key, e.g. `smst1` or `temp`.
    pub key: String,
    /// Human-readable name suffix, e.g. `Soil Moisture`.
    pub name: String,
    /// Unit of measurement.
    pub unit: String,
    /// Device class for the hub, `None` for a generic sensor.
    pub device_class: Option<String>,
}

impl SensorChannel {
    /// Creates a channel identity.
    #[must_use]
    pub fn new(key: impl Into<String>, name: impl Into<String>, unit: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            name: name.into(),
            unit: unit.into(),
            device_class: None,
        }
    }

    /// Sets the device class.
    #[must_use]
    pub fn with_device_class(mut self, device_class: impl Into<String>) -> Self {
        self.device_class = Some(device_class.into());
        self
    }
}

/// The owned set of sensor channels of one node.
///
/// Built once at startup from the node's designation (e.g. `GreenA`)
/// and consulted for discovery descriptions and the state topic.
/// Indexed by position; channels are never removed at runtime.
#[derive(Debug, Clone)]
pub struct ChannelBank {
    device_name: String,
    device_slug: String,
    state_topic: String,
    expires_after: u16,
    channels: Vec<SensorChannel>,
}

impl ChannelBank {
    /// Creates an empty bank for a device designation.
    ///
    /// The state topic follows the
    /// `homeassistant/sensor/<slug>/state` convention, where the slug
    /// is the lowercased designation.
    #[must_use]
    pub fn new(device_name: impl Into<String>) -> Self {
        let device_name = device_name.into();
        let device_slug = device_name.to_lowercase();
        let state_topic = format!("{DISCOVERY_PREFIX}/{device_slug}/state");
        Self {
            device_name,
            device_slug,
            state_topic,
            expires_after: 0,
            channels: Vec::new(),
        }
    }

    /// Sets the expiry timeout applied to every channel description.
    #[must_use]
    pub fn with_expires_after(mut self, seconds: u16) -> Self {
        self.expires_after = seconds;
        self
    }

    /// Adds a channel.
    #[must_use]
    pub fn with_channel(mut self, channel: SensorChannel) -> Self {
        self.channels.push(channel);
        self
    }

    /// Adds `count` soil moisture channels keyed `smst1..smstN`.
    ///
    /// Matches the key scheme unattended plant monitors report their
    /// per-pot readings under.
    #[must_use]
    pub fn with_moisture_channels(mut self, count: usize) -> Self {
        for i in 1..=count {
            self.channels.push(
                SensorChannel::new(format!("smst{i}"), "Soil Moisture", "%")
                    .with_device_class("moisture"),
            );
        }
        self
    }

    /// Returns the device designation.
    #[must_use]
    pub fn device_name(&self) -> &str {
        &self.device_name
    }

    /// Returns the state topic all channels publish through.
    #[must_use]
    pub fn state_topic(&self) -> &str {
        &self.state_topic
    }

    /// Returns the channels in registration order.
    #[must_use]
    pub fn channels(&self) -> &[SensorChannel] {
        &self.channels
    }

    /// Builds the discovery description for the channel at `index`.
    ///
    /// The description's value template references exactly the
    /// channel's telemetry key, keeping discovery and telemetry in
    /// lockstep. Returns `None` for an out-of-range index.
    #[must_use]
    pub fn description(&self, index: usize) -> Option<DeviceDescription> {
        let channel = self.channels.get(index)?;
        let unique_id = format!("{}{}", self.device_slug, channel.key);

        let mut description = DeviceDescription::new(
            format!("{} {}", self.device_name, channel.name),
            self.state_topic.clone(),
            unique_id,
        )
        .with_unit_of_measurement(channel.unit.clone())
        .with_value_template_for(&channel.key)
        .with_expires_after(self.expires_after);

        if let Some(device_class) = &channel.device_class {
            description = description.with_device_class(device_class.clone());
        }
        Some(description)
    }

    /// Builds discovery descriptions for every channel.
    #[must_use]
    pub fn descriptions(&self) -> Vec<DeviceDescription> {
        (0..self.channels.len())
            .filter_map(|i| self.description(i))
            .collect()
    }
}
