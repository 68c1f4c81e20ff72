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

//! Runtime configuration
//!
//! Expander addresses and every timing constant the drive population needs
//! live here so they can be tuned from a TOML file without rebuilding.
//!
//! ```toml
//! [bus]
//! data_low = 0x20
//! data_high = 0x21
//! register_select = 0x22
//!
//! [timing]
//! packet_settle_ms = 400
//! wait_timeout_ms = 0   # 0 waits forever
//!
//! [player]
//! refresh_interval_ms = 100
//! ```

use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use super::error::ConfigError;

/// Top-level configuration
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub bus: BusConfig,
    pub timing: TimingConfig,
    pub player: PlayerConfig,
}

/// Two-wire addresses of the three I/O expanders
///
/// The defaults are PCF8574 parts strapped A2..A0 = 000, 001 and 010.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BusConfig {
    /// Expander wired to DD0-DD7
    pub data_low: u8,
    /// Expander wired to DD8-DD15
    pub data_high: u8,
    /// Expander wired to DA0-DA2, nCS0, nCS1, nRST, nDIOW, nDIOR
    pub register_select: u8,
}

impl Default for BusConfig {
    fn default() -> Self {
        Self {
            data_low: 0x20,
            data_high: 0x21,
            register_select: 0x22,
        }
    }
}

/// Delays and deadlines, all in milliseconds
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TimingConfig {
    /// nRST low time
    pub reset_pulse_ms: u64,
    /// Delay after releasing nRST
    pub reset_recovery_ms: u64,
    /// Spin-up allowance after reset, before the first status poll
    pub power_up_ms: u64,
    /// Delay before self-diagnostic and before IDENTIFY
    pub diagnostic_delay_ms: u64,
    /// Delay between issuing IDENTIFY and reading its data
    pub identify_delay_ms: u64,
    /// Deadline for reading the IDENTIFY data
    pub identify_timeout_ms: u64,
    /// Delay after the PACKET opcode, before the packet bytes
    pub packet_settle_ms: u64,
    /// Delay between a data-in packet and the DRQ wait
    pub response_delay_ms: u64,
    /// Deadline for every status wait; 0 waits forever
    pub wait_timeout_ms: u64,
}

impl TimingConfig {
    /// Deadline applied to status waits, `None` when unbounded
    pub fn wait_timeout(&self) -> Option<Duration> {
        match self.wait_timeout_ms {
            0 => None,
            ms => Some(Duration::from_millis(ms)),
        }
    }

    /// Deadline for the IDENTIFY data read
    pub fn identify_timeout(&self) -> Duration {
        Duration::from_millis(self.identify_timeout_ms)
    }

    /// Timing with every delay removed
    ///
    /// Deadlines are kept so a misbehaving device still fails.
    pub fn without_delays(self) -> Self {
        Self {
            reset_pulse_ms: 0,
            reset_recovery_ms: 0,
            power_up_ms: 0,
            diagnostic_delay_ms: 0,
            identify_delay_ms: 0,
            packet_settle_ms: 0,
            response_delay_ms: 0,
            ..self
        }
    }
}

impl Default for TimingConfig {
    fn default() -> Self {
        Self {
            reset_pulse_ms: 40,
            reset_recovery_ms: 20,
            power_up_ms: 5000,
            diagnostic_delay_ms: 3000,
            identify_delay_ms: 500,
            identify_timeout_ms: 5000,
            packet_settle_ms: 400,
            response_delay_ms: 10,
            wait_timeout_ms: 10_000,
        }
    }
}

/// Front-panel loop settings
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PlayerConfig {
    /// Interval between sub-channel refreshes
    pub refresh_interval_ms: u64,
}

impl PlayerConfig {
    pub fn refresh_interval(&self) -> Duration {
        Duration::from_millis(self.refresh_interval_ms)
    }
}

impl Default for PlayerConfig {
    fn default() -> Self {
        Self {
            refresh_interval_ms: 100,
        }
    }
}

impl Config {
    /// Parse configuration from TOML text
    pub fn from_toml_str(contents: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(contents)?)
    }

    /// Load configuration from a TOML file
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path)?;
        Self::from_toml_str(&contents)
    }

    /// Save configuration to a TOML file
    pub fn save(&self, path: impl AsRef<Path>) -> Result<(), ConfigError> {
        let contents = toml::to_string_pretty(self)?;
        std::fs::write(path, contents)?;
        Ok(())
    }
}
