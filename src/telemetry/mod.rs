// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Telemetry records and their wire payload.
//!
//! A [`TelemetryRecord`] is a flat, insertion-ordered mapping from
//! channel key to numeric value, assembled fresh every publish
//! interval and discarded after serialization. Keys must match the
//! value templates of the channels' discovery descriptions — the hub
//! extracts each channel's field by that key.
//!
//! # Examples
//!
//! ```
//! use sensorlink_lib::TelemetryRecord;
//!
//! let mut record = TelemetryRecord::new();
//! record.insert("smst1", 42.0);
//! record.insert("temp", 21.5);
//!
//! assert_eq!(
//!     serde_json::to_string(&record).unwrap(),
//!     r#"{"smst1":42.0,"temp":21.5}"#
//! );
//! ```

use std::fmt;

use serde::de::{MapAccess, Visitor};
use serde::ser::SerializeMap;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::connection::ConnectionManager;
use crate::transport::{NetworkLink, SessionClient};

/// A flat, insertion-ordered set of channel readings.
///
/// Backed by a `Vec` rather than a map type: the handful of channels a
/// node carries makes linear scans cheap, and insertion order is part
/// of the payload contract. Inserting an existing key replaces the
/// value in place. No range validation happens here — sanity checking
/// readings is the sensor driver's job.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TelemetryRecord {
    entries: Vec<(String, f64)>,
}

impl TelemetryRecord {
    /// Creates an empty record.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts a reading, replacing an existing key in place.
    pub fn insert(&mut self, key: impl Into<String>, value: f64) {
        let key = key.into();
        if let Some(entry) = self.entries.iter_mut().find(|(k, _)| *k == key) {
            entry.1 = value;
        } else {
            self.entries.push((key, value));
        }
    }

    /// Returns the value for a key.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<f64> {
        self.entries
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| *v)
    }

    /// Returns the number of readings.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns true when the record holds no readings.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Iterates the readings in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, f64)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), *v))
    }
}

impl<K: Into<String>> FromIterator<(K, f64)> for TelemetryRecord {
    fn from_iter<I: IntoIterator<Item = (K, f64)>>(iter: I) -> Self {
        let mut record = Self::new();
        for (key, value) in iter {
            record.insert(key, value);
        }
        record
    }
}

impl Serialize for TelemetryRecord {
    fn serialize<T: Serializer>(&self, serializer: T) -> Result<T::Ok, T::Error> {
        let mut map = serializer.serialize_map(Some(self.entries.len()))?;
        for (key, value) in &self.entries {
            map.serialize_entry(key, value)?;
        }
        map.end()
    }
}

impl<'de> Deserialize<'de> for TelemetryRecord {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct RecordVisitor;

        impl<'de> Visitor<'de> for RecordVisitor {
            type Value = TelemetryRecord;

            fn expecting(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
                formatter.write_str("a map of channel keys to numeric values")
            }

            fn visit_map<A: MapAccess<'de>>(self, mut access: A) -> Result<Self::Value, A::Error> {
                let mut record = TelemetryRecord::new();
                while let Some((key, value)) = access.next_entry::<String, f64>()? {
                    record.insert(key, value);
                }
                Ok(record)
            }
        }

        deserializer.deserialize_map(RecordVisitor)
    }
}

impl<N: NetworkLink, S: SessionClient> ConnectionManager<N, S> {
    /// Serializes a reading set and publishes it, non-retained, to the
    /// node's state topic.
    ///
    /// Readings go out in insertion order. Unlike discovery publishes
    /// there is no connected gate here; a dead session simply drops
    /// the message and the next health check repairs the connection.
    pub async fn publish_telemetry(&mut self, record: &TelemetryRecord, topic: &str) {
        let payload = match serde_json::to_string(record) {
            Ok(payload) => payload,
            Err(e) => {
                tracing::error!(error = %e, "failed to render telemetry payload");
                return;
            }
        };

        tracing::debug!(topic = %topic, readings = record.len(), "publishing telemetry");
        self.publish_raw(topic, &payload, false).await;
    }
}
