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

//! Status register polling
//!
//! The drive signals transfer readiness only through its status register;
//! there is no interrupt line. Each wait polls Command/Status until a
//! condition holds or its deadline passes.
//!
//! # Status Register Format
//!
//! ```text
//! Bit 0: ERR  - error, see Error register
//! Bit 3: DRQ  - data request
//! Bit 4: DSC  - seek complete
//! Bit 5: DF   - device fault
//! Bit 6: DRDY - device ready
//! Bit 7: BSY  - busy, other bits invalid
//! ```

use std::time::Duration;

use bitflags::bitflags;

use super::bridge::{RegisterBridge, TaskRegister};
use super::bus::TwoWire;
use super::clock::Clock;
use super::error::{AtapiError, Result};

pub use super::error::WaitCondition;

bitflags! {
    /// IDE status register bits
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct StatusFlags: u8 {
        const ERR = 1 << 0;
        const IDX = 1 << 1;
        const CORR = 1 << 2;
        const DRQ = 1 << 3;
        const DSC = 1 << 4;
        const DF = 1 << 5;
        const DRDY = 1 << 6;
        const BSY = 1 << 7;
    }
}

impl StatusFlags {
    /// Interpret a raw status byte
    pub fn from_raw(value: u8) -> Self {
        Self::from_bits_retain(value)
    }

    /// Whether `condition` holds for this status
    pub fn satisfies(self, condition: WaitCondition) -> bool {
        match condition {
            WaitCondition::BusyClear => !self.contains(StatusFlags::BSY),
            WaitCondition::DrqClear => !self.contains(StatusFlags::DRQ),
            WaitCondition::DrqSet => self.contains(StatusFlags::DRQ),
            WaitCondition::ReadySet => self.contains(StatusFlags::DRDY),
            WaitCondition::UnitReady => {
                !self.contains(StatusFlags::BSY) && self.contains(StatusFlags::DRDY)
            }
        }
    }

    /// Human-readable list of the bits worth reporting
    pub fn describe(self) -> Vec<&'static str> {
        let mut lines = Vec::new();
        if self.contains(StatusFlags::ERR) {
            lines.push("Error bit set");
        }
        if self.contains(StatusFlags::BSY) {
            lines.push("Busy bit set");
        }
        if self.contains(StatusFlags::DRDY) {
            lines.push("Drive Ready");
        }
        if self.contains(StatusFlags::DRQ) {
            lines.push("Data Request set");
        }
        if self.contains(StatusFlags::DSC) {
            lines.push("Seek complete");
        }
        lines
    }
}

/// Poll the status register until `condition` holds
///
/// # Arguments
///
/// * `timeout` - Deadline for the wait; `None` polls forever
///
/// # Returns
///
/// The first status value satisfying the condition, or
/// [`AtapiError::Timeout`] once the deadline has passed.
pub fn wait_for<B: TwoWire, C: Clock>(
    bridge: &mut RegisterBridge<B>,
    clock: &C,
    condition: WaitCondition,
    timeout: Option<Duration>,
) -> Result<StatusFlags> {
    let start = clock.now();
    loop {
        let status = StatusFlags::from_raw(bridge.read_byte(TaskRegister::CommandStatus)?);
        if status.satisfies(condition) {
            return Ok(status);
        }

        if let Some(limit) = timeout {
            let waited = clock.now().saturating_sub(start);
            if waited >= limit {
                log::warn!(
                    "IDE: timeout waiting for {} (status 0x{:02X})",
                    condition,
                    status.bits()
                );
                return Err(AtapiError::Timeout { condition, waited });
            }
        }
    }
}
