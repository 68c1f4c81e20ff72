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

//! IDE task-file register bridge
//!
//! Maps logical task-file register accesses onto expander transactions.
//! A register access is a single word transfer framed by the nDIOR or nDIOW
//! strobe on the register-select expander:
//!
//! ```text
//! read:  select(code & 0x7F)  read high  read low  idle
//! write: select(code | 0x40)  write high  write low  select(code & 0xBF)  idle
//! ```
//!
//! The write strobe falls on the second select, after both data expanders
//! hold the word, so the device latches a stable value. Every operation
//! ends with all three expanders released ([`BUS_IDLE`]); callers must not
//! assume any pin state survives between calls.

use std::time::Duration;

use super::bus::{Expanders, TwoWire, BUS_IDLE};
use super::clock::Clock;
use super::error::Result;

/// IDE task-file registers
///
/// The discriminant is the register-select byte with both strobes and nRST
/// de-asserted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum TaskRegister {
    /// 16-bit data port
    Data = 0xF0,
    /// Error (read) / Features (write)
    ErrorFeature = 0xF1,
    /// Sector Count / Interrupt Reason
    SectorCount = 0xF2,
    /// Sector Number
    SectorNumber = 0xF3,
    /// Cylinder Low / Byte Count Low
    CylinderLow = 0xF4,
    /// Cylinder High / Byte Count High
    CylinderHigh = 0xF5,
    /// Device/Head select
    DeviceHead = 0xF6,
    /// Status (read) / Command (write)
    CommandStatus = 0xF7,
    /// Alternate Status (read) / Device Control (write)
    AltStatusControl = 0xEE,
}

impl TaskRegister {
    /// Every task-file register
    pub const ALL: [TaskRegister; 9] = [
        TaskRegister::Data,
        TaskRegister::ErrorFeature,
        TaskRegister::SectorCount,
        TaskRegister::SectorNumber,
        TaskRegister::CylinderLow,
        TaskRegister::CylinderHigh,
        TaskRegister::DeviceHead,
        TaskRegister::CommandStatus,
        TaskRegister::AltStatusControl,
    ];

    /// Register-select byte with both strobes de-asserted
    pub fn code(self) -> u8 {
        self as u8
    }

    /// Register-select byte with nDIOR asserted
    pub fn read_select(self) -> u8 {
        self.code() & 0b0111_1111
    }

    /// Register-select byte with nDIOW held high before the write strobe
    pub fn write_setup(self) -> u8 {
        self.code() | 0b0100_0000
    }

    /// Register-select byte with nDIOW asserted
    pub fn write_strobe(self) -> u8 {
        self.code() & 0b1011_1111
    }

    /// Decode the address lines (DA0-DA2, nCS0, nCS1) of a select byte
    pub fn from_address_lines(select: u8) -> Option<Self> {
        let lines = select & 0x1F;
        Self::ALL
            .into_iter()
            .find(|reg| reg.code() & 0x1F == lines)
    }
}

/// Register-select byte that pulls nRST low
const RESET_SELECT: u8 = 0b1101_1111;

/// Task-file access over three expanders
pub struct RegisterBridge<B: TwoWire> {
    bus: B,
    expanders: Expanders,
}

impl<B: TwoWire> RegisterBridge<B> {
    /// Create a bridge over `bus` using the given expander addresses
    pub fn new(bus: B, expanders: Expanders) -> Self {
        Self { bus, expanders }
    }

    /// Borrow the underlying bus
    pub fn bus(&self) -> &B {
        &self.bus
    }

    /// Mutably borrow the underlying bus
    pub fn bus_mut(&mut self) -> &mut B {
        &mut self.bus
    }

    /// Release every expander pin
    ///
    /// The register-select expander goes first so both strobes are
    /// de-asserted before the data lines float. All three expanders are
    /// written even if one of them fails; the first error is returned.
    pub fn idle(&mut self) -> Result<()> {
        let select = self.bus.write_byte(self.expanders.register_select, BUS_IDLE);
        let high = self.bus.write_byte(self.expanders.data_high, BUS_IDLE);
        let low = self.bus.write_byte(self.expanders.data_low, BUS_IDLE);
        select.and(high).and(low)
    }

    /// Idle the bus after a strobe sequence, keeping the sequence's error
    fn release<T>(&mut self, result: Result<T>) -> Result<T> {
        let released = self.idle();
        let value = result?;
        released?;
        Ok(value)
    }

    /// Read one word from a task-file register
    ///
    /// # Returns
    ///
    /// `(low, high)`: DD0-DD7 and DD8-DD15. For 8-bit registers only the low
    /// byte is meaningful.
    pub fn read_register(&mut self, reg: TaskRegister) -> Result<(u8, u8)> {
        let strobed = self.strobe_read(reg);
        let (low, high) = self.release(strobed)?;

        log::trace!("IDE: read {:?} = 0x{:02X}{:02X}", reg, high, low);
        Ok((low, high))
    }

    fn strobe_read(&mut self, reg: TaskRegister) -> Result<(u8, u8)> {
        self.bus
            .write_byte(self.expanders.register_select, reg.read_select())?;
        let high = self.bus.read_byte(self.expanders.data_high)?;
        let low = self.bus.read_byte(self.expanders.data_low)?;
        Ok((low, high))
    }

    /// Read the low byte of a task-file register
    pub fn read_byte(&mut self, reg: TaskRegister) -> Result<u8> {
        self.read_register(reg).map(|(low, _)| low)
    }

    /// Write one word to a task-file register
    pub fn write_register(&mut self, reg: TaskRegister, low: u8, high: u8) -> Result<()> {
        log::trace!("IDE: write {:?} = 0x{:02X}{:02X}", reg, high, low);

        let strobed = self.strobe_write(reg, low, high);
        self.release(strobed)
    }

    fn strobe_write(&mut self, reg: TaskRegister, low: u8, high: u8) -> Result<()> {
        self.bus
            .write_byte(self.expanders.register_select, reg.write_setup())?;
        self.bus.write_byte(self.expanders.data_high, high)?;
        self.bus.write_byte(self.expanders.data_low, low)?;
        self.bus
            .write_byte(self.expanders.register_select, reg.write_strobe())
    }

    /// Write an 8-bit register, leaving DD8-DD15 released
    pub fn write_byte(&mut self, reg: TaskRegister, value: u8) -> Result<()> {
        self.write_register(reg, value, BUS_IDLE)
    }

    /// Hardware reset through nRST
    ///
    /// Holds nRST low for `pulse`, releases it and waits `recovery`. A device
    /// that reads back all-ones afterwards is probably absent; that is logged
    /// and reported through the returned status byte, not treated as fatal.
    ///
    /// # Returns
    ///
    /// The alternate status byte read after the reset
    pub fn pulse_reset<C: Clock>(
        &mut self,
        clock: &mut C,
        pulse: Duration,
        recovery: Duration,
    ) -> Result<u8> {
        log::debug!("IDE: asserting nRST");
        let asserted = self
            .bus
            .write_byte(self.expanders.register_select, RESET_SELECT)
            .map(|()| clock.sleep(pulse));
        self.release(asserted)?;
        clock.sleep(recovery);

        let status = self.read_byte(TaskRegister::AltStatusControl)?;
        if status == 0xFF {
            log::warn!("IDE: device not responding after reset");
        }
        Ok(status)
    }
}

#[cfg(test)]
mod tests;
