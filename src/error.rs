// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Error types for the `sensorlink` library.
//!
//! Connection outcomes are deliberately *not* errors: the connection
//! manager reports them as [`ConnectionStatus`](crate::ConnectionStatus)
//! values so a field device's control loop can decide what is fatal and
//! what is transient. The types here cover the remaining failure
//! surfaces: configuration preconditions and payload rendering.

use thiserror::Error;

/// The main error type for this library.
#[derive(Debug, Error)]
pub enum Error {
    /// Error occurred during value validation.
    #[error("value error: {0}")]
    Value(#[from] ValueError),

    /// Error occurred while rendering a JSON payload.
    #[error("payload error: {0}")]
    Payload(#[from] serde_json::Error),
}

/// Errors related to value validation and constraints.
///
/// These errors occur when a configuration setter is given a value
/// outside its allowed range. The prior value is always retained.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ValueError {
    /// The retry budget is outside the allowed range.
    #[error("retry budget {actual} is out of range [0, {max}]")]
    RetryBudgetOutOfRange {
        /// Maximum allowed number of attempts.
        max: u8,
        /// The actual value that was provided.
        actual: u8,
    },
}

/// A specialized Result type for this library.
pub type Result<T> = std::result::Result<T, Error>;
