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

//! Simulated drive on a simulated two-wire bus
//!
//! [`SimulatedDrive`] implements [`TwoWire`] by modeling the three
//! quasi-bidirectional expanders and an [`AtapiDevice`] wired behind them.
//! Register accesses reach the device on the falling edges of nDIOR and
//! nDIOW, exactly as the bridge produces them, so the transport can be
//! exercised end to end without hardware.
//!
//! # Example
//!
//! ```
//! use atapi_cd::core::bus::Expanders;
//! use atapi_cd::core::bridge::{RegisterBridge, TaskRegister};
//! use atapi_cd::core::sim::SimulatedDrive;
//!
//! let drive = SimulatedDrive::new(Expanders::default());
//! let mut bridge = RegisterBridge::new(drive, Expanders::default());
//!
//! bridge.write_register(TaskRegister::SectorNumber, 0x5A, 0xFF).unwrap();
//! assert_eq!(bridge.read_byte(TaskRegister::SectorNumber).unwrap(), 0x5A);
//! assert!(bridge.bus().is_idle());
//! ```

mod device;
mod disc;

pub use device::{asc, audio, AtapiDevice};
pub use disc::{SimDisc, MAX_TRACKS};

use crate::core::bridge::TaskRegister;
use crate::core::bus::{ControlLines, Expanders, TwoWire, BUS_IDLE};
use crate::core::error::{AtapiError, Result};

/// Three expanders and an ATAPI device
#[derive(Debug, Clone)]
pub struct SimulatedDrive {
    expanders: Expanders,
    control: u8,
    data_low: u8,
    data_high: u8,
    /// Word the device drives while nDIOR is low
    driven: Option<u16>,
    device: AtapiDevice,
    present: bool,
    strobe_conflicts: usize,
    failing_address: Option<u8>,
}

impl SimulatedDrive {
    /// A drive with no disc behind the given expanders
    pub fn new(expanders: Expanders) -> Self {
        Self {
            expanders,
            control: BUS_IDLE,
            data_low: BUS_IDLE,
            data_high: BUS_IDLE,
            driven: None,
            device: AtapiDevice::new(),
            present: true,
            strobe_conflicts: 0,
            failing_address: None,
        }
    }

    /// A drive with `disc` loaded and the tray closed
    pub fn with_disc(expanders: Expanders, disc: SimDisc) -> Self {
        let mut drive = Self::new(expanders);
        drive.device.set_disc(Some(disc));
        drive
    }

    pub fn device(&self) -> &AtapiDevice {
        &self.device
    }

    pub fn device_mut(&mut self) -> &mut AtapiDevice {
        &mut self.device
    }

    /// Disconnect the device; the data lines then float high
    pub fn set_present(&mut self, present: bool) {
        self.present = present;
    }

    /// Make every transaction at `address` go unacknowledged
    pub fn fail_address(&mut self, address: Option<u8>) {
        self.failing_address = address;
    }

    /// Output latches as `[register select, data high, data low]`
    pub fn latches(&self) -> [u8; 3] {
        [self.control, self.data_high, self.data_low]
    }

    /// Whether every expander pin is released
    pub fn is_idle(&self) -> bool {
        self.latches() == [BUS_IDLE; 3]
    }

    /// Times nDIOR and nDIOW were driven low together
    pub fn strobe_conflicts(&self) -> usize {
        self.strobe_conflicts
    }

    fn set_control(&mut self, value: u8) {
        let old = ControlLines::from_bits_retain(self.control);
        let new = ControlLines::from_bits_retain(value);
        self.control = value;

        if new.read_strobe() && new.write_strobe() {
            self.strobe_conflicts += 1;
            log::error!("SIM: nDIOR and nDIOW asserted together (0x{:02X})", value);
            return;
        }
        if !self.present {
            return;
        }

        if new.reset_asserted() && !old.reset_asserted() {
            self.device.reset();
        }

        let register = TaskRegister::from_address_lines(value);
        if new.read_strobe() && !old.read_strobe() {
            self.driven = Some(match register {
                Some(reg) => self.device.read(reg),
                None => 0xFFFF,
            });
        } else if !new.read_strobe() {
            self.driven = None;
        }

        if new.write_strobe() && !old.write_strobe() {
            if let Some(reg) = register {
                let word = u16::from_le_bytes([self.data_low, self.data_high]);
                self.device.write(reg, word);
            }
        }
    }

    fn check_ack(&self, address: u8) -> Result<()> {
        if self.failing_address == Some(address) {
            return Err(AtapiError::Bus {
                address,
                reason: "no acknowledge".to_string(),
            });
        }
        Ok(())
    }
}

impl TwoWire for SimulatedDrive {
    fn write_byte(&mut self, address: u8, value: u8) -> Result<()> {
        self.check_ack(address)?;

        if address == self.expanders.register_select {
            self.set_control(value);
        } else if address == self.expanders.data_high {
            self.data_high = value;
        } else if address == self.expanders.data_low {
            self.data_low = value;
        } else {
            return Err(AtapiError::Bus {
                address,
                reason: "no device at address".to_string(),
            });
        }
        Ok(())
    }

    fn read_byte(&mut self, address: u8) -> Result<u8> {
        self.check_ack(address)?;

        let [driven_low, driven_high] = self.driven.unwrap_or(0xFFFF).to_le_bytes();
        if address == self.expanders.register_select {
            Ok(self.control)
        } else if address == self.expanders.data_high {
            Ok(self.data_high & driven_high)
        } else if address == self.expanders.data_low {
            Ok(self.data_low & driven_low)
        } else {
            Err(AtapiError::Bus {
                address,
                reason: "no device at address".to_string(),
            })
        }
    }
}
