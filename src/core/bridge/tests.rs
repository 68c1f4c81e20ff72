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

//! Unit tests for the register bridge

use std::collections::HashMap;
use std::time::Duration;

use proptest::prelude::*;

use super::*;
use crate::core::bus::ControlLines;
use crate::core::clock::ManualClock;
use crate::core::error::AtapiError;
use crate::core::sim::SimulatedDrive;

/// Expanders in front of a register file that reads back what was written
///
/// Records every select byte so tests can check strobe ordering.
#[derive(Default)]
struct LoopbackBus {
    control: u8,
    data_low: u8,
    data_high: u8,
    driven: Option<u16>,
    registers: HashMap<u8, u16>,
    selects: Vec<u8>,
}

impl LoopbackBus {
    fn new() -> Self {
        Self {
            control: BUS_IDLE,
            data_low: BUS_IDLE,
            data_high: BUS_IDLE,
            ..Default::default()
        }
    }

    fn idle(&self) -> bool {
        [self.control, self.data_high, self.data_low] == [BUS_IDLE; 3]
    }
}

impl TwoWire for LoopbackBus {
    fn write_byte(&mut self, address: u8, value: u8) -> Result<()> {
        match address {
            0x22 => {
                let old = ControlLines::from_bits_retain(self.control);
                let new = ControlLines::from_bits_retain(value);
                assert!(
                    !(new.read_strobe() && new.write_strobe()),
                    "both strobes asserted: 0x{:02X}",
                    value
                );
                let key = value & 0x1F;
                if new.read_strobe() && !old.read_strobe() {
                    self.driven = Some(self.registers.get(&key).copied().unwrap_or(0));
                } else if !new.read_strobe() {
                    self.driven = None;
                }
                if new.write_strobe() && !old.write_strobe() {
                    let word = u16::from_le_bytes([self.data_low, self.data_high]);
                    self.registers.insert(key, word);
                }
                self.control = value;
                self.selects.push(value);
            }
            0x21 => self.data_high = value,
            0x20 => self.data_low = value,
            _ => {
                return Err(AtapiError::Bus {
                    address,
                    reason: "no device".to_string(),
                })
            }
        }
        Ok(())
    }

    fn read_byte(&mut self, address: u8) -> Result<u8> {
        let [low, high] = self.driven.unwrap_or(0xFFFF).to_le_bytes();
        match address {
            0x22 => Ok(self.control),
            0x21 => Ok(self.data_high & high),
            0x20 => Ok(self.data_low & low),
            _ => Err(AtapiError::Bus {
                address,
                reason: "no device".to_string(),
            }),
        }
    }
}

fn loopback() -> RegisterBridge<LoopbackBus> {
    RegisterBridge::new(LoopbackBus::new(), Expanders::default())
}

fn any_register() -> impl Strategy<Value = TaskRegister> {
    prop::sample::select(TaskRegister::ALL.to_vec())
}

proptest! {
    #[test]
    fn test_write_then_read_returns_word(reg in any_register(), low: u8, high: u8) {
        let mut bridge = loopback();
        bridge.write_register(reg, low, high).unwrap();
        prop_assert_eq!(bridge.read_register(reg).unwrap(), (low, high));
    }

    #[test]
    fn test_bus_idle_after_every_operation(reg in any_register(), low: u8, high: u8) {
        let mut bridge = loopback();
        bridge.write_register(reg, low, high).unwrap();
        prop_assert!(bridge.bus().idle());
        bridge.read_register(reg).unwrap();
        prop_assert!(bridge.bus().idle());
    }
}

#[test]
fn test_read_asserts_read_strobe_only() {
    let mut bridge = loopback();
    bridge.read_register(TaskRegister::CommandStatus).unwrap();
    assert_eq!(bridge.bus().selects, vec![0x77, 0xFF]);
}

#[test]
fn test_write_strobe_sequence() {
    let mut bridge = loopback();
    bridge
        .write_register(TaskRegister::AltStatusControl, 0x0A, 0xFF)
        .unwrap();
    assert_eq!(bridge.bus().selects, vec![0xEE, 0xAE, 0xFF]);
}

#[test]
fn test_register_codes() {
    assert_eq!(TaskRegister::Data.read_select(), 0x70);
    assert_eq!(TaskRegister::CommandStatus.write_strobe(), 0xB7);
    assert_eq!(
        TaskRegister::from_address_lines(0x6E),
        Some(TaskRegister::AltStatusControl)
    );
    assert_eq!(TaskRegister::from_address_lines(0xDF), None);
}

#[test]
fn test_storage_registers_loop_back_on_device() {
    let mut bridge = RegisterBridge::new(
        SimulatedDrive::new(Expanders::default()),
        Expanders::default(),
    );
    let storage = [
        TaskRegister::SectorCount,
        TaskRegister::SectorNumber,
        TaskRegister::CylinderLow,
        TaskRegister::CylinderHigh,
        TaskRegister::DeviceHead,
    ];

    for (i, reg) in storage.into_iter().enumerate() {
        let value = 0x30 + i as u8;
        bridge.write_byte(reg, value).unwrap();
        assert_eq!(bridge.read_byte(reg).unwrap(), value, "{:?}", reg);
        assert!(bridge.bus().is_idle());
    }
    assert_eq!(bridge.bus().strobe_conflicts(), 0);
}

#[test]
fn test_pulse_reset_restores_signature() {
    let mut bridge = RegisterBridge::new(
        SimulatedDrive::new(Expanders::default()),
        Expanders::default(),
    );
    let mut clock = ManualClock::new(Duration::ZERO);
    bridge.write_byte(TaskRegister::CylinderLow, 0x00).unwrap();

    let status = bridge
        .pulse_reset(&mut clock, Duration::from_millis(40), Duration::from_millis(20))
        .unwrap();

    assert_ne!(status, 0xFF);
    assert_eq!(bridge.read_byte(TaskRegister::CylinderLow).unwrap(), 0x14);
    assert_eq!(clock.elapsed(), Duration::from_millis(60));
    assert!(bridge.bus().is_idle());
}

#[test]
fn test_pulse_reset_with_absent_device_is_not_fatal() {
    let mut drive = SimulatedDrive::new(Expanders::default());
    drive.set_present(false);
    let mut bridge = RegisterBridge::new(drive, Expanders::default());
    let mut clock = ManualClock::new(Duration::ZERO);

    let status = bridge
        .pulse_reset(&mut clock, Duration::from_millis(40), Duration::from_millis(20))
        .unwrap();
    assert_eq!(status, 0xFF);
}

#[test]
fn test_bus_error_propagates() {
    let mut drive = SimulatedDrive::new(Expanders::default());
    drive.fail_address(Some(0x21));
    let mut bridge = RegisterBridge::new(drive, Expanders::default());

    let result = bridge.read_register(TaskRegister::CommandStatus);
    assert!(matches!(result, Err(AtapiError::Bus { address: 0x21, .. })));
}

#[test]
fn test_failed_read_releases_bus() {
    let mut drive = SimulatedDrive::new(Expanders::default());
    drive.fail_address(Some(0x21));
    let mut bridge = RegisterBridge::new(drive, Expanders::default());

    let result = bridge.read_register(TaskRegister::CommandStatus);
    assert!(matches!(result, Err(AtapiError::Bus { address: 0x21, .. })));
    assert!(bridge.bus().is_idle(), "latches {:02X?}", bridge.bus().latches());
}

#[test]
fn test_failed_write_releases_bus() {
    let mut drive = SimulatedDrive::new(Expanders::default());
    drive.fail_address(Some(0x20));
    let mut bridge = RegisterBridge::new(drive, Expanders::default());

    let result = bridge.write_register(TaskRegister::SectorCount, 0x12, 0x34);
    assert!(matches!(result, Err(AtapiError::Bus { address: 0x20, .. })));
    assert!(bridge.bus().is_idle(), "latches {:02X?}", bridge.bus().latches());
    assert_eq!(bridge.bus().strobe_conflicts(), 0);
}

#[test]
fn test_failed_reset_releases_nrst() {
    let mut drive = SimulatedDrive::new(Expanders::default());
    drive.fail_address(Some(0x21));
    let mut bridge = RegisterBridge::new(drive, Expanders::default());
    let mut clock = ManualClock::new(Duration::ZERO);

    let result = bridge.pulse_reset(
        &mut clock,
        Duration::from_millis(40),
        Duration::from_millis(20),
    );
    assert!(matches!(result, Err(AtapiError::Bus { address: 0x21, .. })));
    assert!(bridge.bus().is_idle());
}
