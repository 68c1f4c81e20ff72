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

//! Two-wire bus and I/O expander wiring
//!
//! The drive's task-file interface is reconstructed from three 8-bit
//! quasi-bidirectional I/O expanders on a two-wire bus:
//!
//! | Expander        | Default address | IDE pins                          |
//! |-----------------|-----------------|-----------------------------------|
//! | data low        | 0x20            | DD0-DD7                           |
//! | data high       | 0x21            | DD8-DD15                          |
//! | register select | 0x22            | DA0-DA2, nCS0, nCS1, nRST, nDIOW, nDIOR |
//!
//! # Register Select Byte
//!
//! ```text
//! Bit:   7     6     5    4    3    2   1   0
//! Pin: nDIOR nDIOW nRST nCS1 nCS0 DA2 DA1 DA0
//! ```
//!
//! Writing 0xFF to an expander releases every pin (weak pull-up), which is
//! the idle state of the bus and the only state in which the drive may
//! drive the data lines.

use bitflags::bitflags;

use super::config::BusConfig;
use super::error::Result;

/// Two-wire bus master
///
/// Implementations perform one addressed single-byte transaction per call.
/// A missing acknowledge is reported as [`crate::core::error::AtapiError::Bus`].
pub trait TwoWire {
    /// Write one byte to the device at `address`
    fn write_byte(&mut self, address: u8, value: u8) -> Result<()>;

    /// Read one byte from the device at `address`
    fn read_byte(&mut self, address: u8) -> Result<u8>;
}

impl<T: TwoWire + ?Sized> TwoWire for &mut T {
    fn write_byte(&mut self, address: u8, value: u8) -> Result<()> {
        (**self).write_byte(address, value)
    }

    fn read_byte(&mut self, address: u8) -> Result<u8> {
        (**self).read_byte(address)
    }
}

/// Value that releases every expander pin
pub const BUS_IDLE: u8 = 0xFF;

bitflags! {
    /// Lines driven by the register-select expander
    ///
    /// All IDE control pins are active low; a set bit means de-asserted.
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct ControlLines: u8 {
        const DA0 = 1 << 0;
        const DA1 = 1 << 1;
        const DA2 = 1 << 2;
        const NCS0 = 1 << 3;
        const NCS1 = 1 << 4;
        const NRST = 1 << 5;
        const NDIOW = 1 << 6;
        const NDIOR = 1 << 7;

        /// Register address lines (DA0-DA2, nCS0, nCS1)
        const ADDRESS = 0x1F;
    }
}

impl ControlLines {
    /// nDIOR is driven low
    pub fn read_strobe(self) -> bool {
        !self.contains(ControlLines::NDIOR)
    }

    /// nDIOW is driven low
    pub fn write_strobe(self) -> bool {
        !self.contains(ControlLines::NDIOW)
    }

    /// nRST is driven low
    pub fn reset_asserted(self) -> bool {
        !self.contains(ControlLines::NRST)
    }
}

/// Two-wire addresses of the three expanders
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Expanders {
    pub data_low: u8,
    pub data_high: u8,
    pub register_select: u8,
}

impl From<BusConfig> for Expanders {
    fn from(config: BusConfig) -> Self {
        Self {
            data_low: config.data_low,
            data_high: config.data_high,
            register_select: config.register_select,
        }
    }
}

impl Default for Expanders {
    fn default() -> Self {
        BusConfig::default().into()
    }
}
