// SPDX-License-Identifier: Apache-2.0
// Copyright 2025 itsakeyfut
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! Error types for the ATAPI transport
//!
//! All fallible operations in [`crate::core`] return [`Result<T>`], an alias
//! for `Result<T, AtapiError>`. Configuration loading has its own
//! [`ConfigError`] since it never touches the bus.
//!
//! Faults the drive population is known to report without being unusable
//! (a failed self-diagnostic, a slow IDENTIFY) are not errors; they are
//! logged and surfaced in return values instead.

use std::fmt;
use std::time::Duration;

use thiserror::Error;

/// Result alias used throughout the crate
pub type Result<T> = std::result::Result<T, AtapiError>;

/// Condition a status wait is polling for
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WaitCondition {
    /// BSY bit cleared
    BusyClear,
    /// DRQ bit cleared
    DrqClear,
    /// DRQ bit set
    DrqSet,
    /// DRDY bit set
    ReadySet,
    /// Drive left the "logical unit not ready" sense state
    UnitReady,
}

impl fmt::Display for WaitCondition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            WaitCondition::BusyClear => "BSY clear",
            WaitCondition::DrqClear => "DRQ clear",
            WaitCondition::DrqSet => "DRQ set",
            WaitCondition::ReadySet => "DRDY set",
            WaitCondition::UnitReady => "unit ready",
        };
        f.write_str(name)
    }
}

/// Errors raised while talking to the drive
#[derive(Error, Debug)]
pub enum AtapiError {
    /// A two-wire transaction was not acknowledged
    #[error("two-wire bus error at address 0x{address:02X}: {reason}")]
    Bus { address: u8, reason: String },

    /// A status wait exceeded its deadline
    #[error("timed out after {waited:?} waiting for {condition}")]
    Timeout {
        condition: WaitCondition,
        waited: Duration,
    },

    /// The device did not present an ATAPI signature after reset
    #[error("no ATAPI signature (cylinder low 0x{low:02X}, cylinder high 0x{high:02X})")]
    NotAtapi { low: u8, high: u8 },

    /// The data phase ended before a response could be parsed
    #[error("{command} response ended after {words} words")]
    ResponseTruncated { command: &'static str, words: usize },
}

/// Errors raised while loading or saving configuration
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("failed to access config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("failed to serialize config: {0}")]
    Serialize(#[from] toml::ser::Error),
}
