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

//! Drive bring-up
//!
//! 1. Release the bus, pulse nRST, allow the drive to spin up
//! 2. Check the ATAPI signature in the cylinder registers
//! 3. Select device 0 and initialize the task file
//! 4. EXECUTE DEVICE DIAGNOSTIC
//! 5. IDENTIFY PACKET DEVICE: packet length and model string
//! 6. TEST UNIT READY / REQUEST SENSE until the drive stops reporting
//!    "not ready"

use std::time::Duration;

use super::{DeviceIdentity, Transport};
use crate::core::bridge::TaskRegister;
use crate::core::bus::TwoWire;
use crate::core::clock::Clock;
use crate::core::error::{AtapiError, Result, WaitCondition};
use crate::core::packet::PacketLength;
use crate::core::status::StatusFlags;

/// Accepted Cylinder Low signature bytes
const SIGNATURE_LOW: [u8; 2] = [0x14, 0x69];

/// Accepted Cylinder High signature bytes
const SIGNATURE_HIGH: [u8; 2] = [0xEB, 0x96];

/// ATA command: EXECUTE DEVICE DIAGNOSTIC
const CMD_EXECUTE_DIAGNOSTIC: u8 = 0x90;

/// ATA command: IDENTIFY PACKET DEVICE
const CMD_IDENTIFY_PACKET_DEVICE: u8 = 0xA1;

/// Error register value after a passed diagnostic
const DIAGNOSTIC_PASSED: u8 = 0x01;

/// IDENTIFY words holding the model string
const MODEL_WORDS: std::ops::RangeInclusive<usize> = 27..=46;

/// Additional sense code: power on, reset or bus device reset occurred
pub const ASC_RESET: u8 = 0x29;

/// Additional sense code: logical unit not ready
pub const ASC_NOT_READY: u8 = 0x04;

/// Result of EXECUTE DEVICE DIAGNOSTIC
///
/// Many drives report failure and still work, so this is never an error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DiagnosticResult {
    Passed,
    Failed(u8),
}

/// Summary of a completed startup
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StartupReport {
    pub identity: DeviceIdentity,
    pub diagnostic: DiagnosticResult,
    /// Additional sense code once the drive reported ready
    pub asc: u8,
}

impl<B: TwoWire, C: Clock> Transport<B, C> {
    /// Bring the drive up from reset
    ///
    /// Only a missing ATAPI signature (or a bus/timeout failure) aborts
    /// startup. A failed diagnostic or a slow IDENTIFY is logged and
    /// reported in the returned [`StartupReport`].
    pub fn initialize(&mut self) -> Result<StartupReport> {
        self.reset_device()?;
        self.verify_signature()?;

        // Device 0 (master)
        self.sequencer
            .bridge_mut()
            .write_byte(TaskRegister::DeviceHead, 0x00)?;

        self.init_task_file()?;
        let diagnostic = self.self_diagnostic()?;
        let identity = self.identify()?;
        let asc = self.wait_until_ready()?;

        Ok(StartupReport {
            identity,
            diagnostic,
            asc,
        })
    }

    /// Hardware reset followed by the spin-up allowance
    pub fn reset_device(&mut self) -> Result<()> {
        let timing = *self.sequencer.timing();
        self.sequencer.bridge_mut().idle()?;

        let (bridge, clock) = self.sequencer.bridge_and_clock();
        bridge.pulse_reset(
            clock,
            Duration::from_millis(timing.reset_pulse_ms),
            Duration::from_millis(timing.reset_recovery_ms),
        )?;

        self.sequencer.delay_ms(timing.power_up_ms);
        self.sequencer.wait(WaitCondition::BusyClear)?;
        self.sequencer.wait(WaitCondition::ReadySet)?;
        Ok(())
    }

    /// Check the ATAPI signature left in the cylinder registers by reset
    pub fn verify_signature(&mut self) -> Result<()> {
        let bridge = self.sequencer.bridge_mut();
        let low = bridge.read_byte(TaskRegister::CylinderLow)?;
        let high = bridge.read_byte(TaskRegister::CylinderHigh)?;

        if !SIGNATURE_LOW.contains(&low) || !SIGNATURE_HIGH.contains(&high) {
            log::error!(
                "Invalid ATAPI signature 0x{:02X}{:02X}",
                high,
                low
            );
            return Err(AtapiError::NotAtapi { low, high });
        }

        log::info!("Found ATAPI device");
        Ok(())
    }

    /// Features 0 (PIO, no overlap), byte count limit 0x200, nIEN
    pub fn init_task_file(&mut self) -> Result<()> {
        let bridge = self.sequencer.bridge_mut();
        bridge.write_byte(TaskRegister::ErrorFeature, 0x00)?;
        bridge.write_byte(TaskRegister::CylinderHigh, 0x02)?;
        bridge.write_byte(TaskRegister::CylinderLow, 0x00)?;
        bridge.write_byte(TaskRegister::AltStatusControl, 0x02)?;

        self.sequencer.wait(WaitCondition::BusyClear)?;
        self.sequencer.wait(WaitCondition::DrqClear)?;
        Ok(())
    }

    /// Run EXECUTE DEVICE DIAGNOSTIC
    pub fn self_diagnostic(&mut self) -> Result<DiagnosticResult> {
        let delay = self.sequencer.timing().diagnostic_delay_ms;
        self.sequencer.delay_ms(delay);

        self.sequencer
            .bridge_mut()
            .write_byte(TaskRegister::CommandStatus, CMD_EXECUTE_DIAGNOSTIC)?;
        self.sequencer.wait(WaitCondition::BusyClear)?;

        let code = self
            .sequencer
            .bridge_mut()
            .read_byte(TaskRegister::ErrorFeature)?;
        let result = if code == DIAGNOSTIC_PASSED {
            log::info!("Self diagnostic: OK");
            DiagnosticResult::Passed
        } else {
            log::warn!("Self diagnostic: failed (0x{:02X})", code);
            DiagnosticResult::Failed(code)
        };
        Ok(result)
    }

    /// Run IDENTIFY PACKET DEVICE and negotiate the packet length
    ///
    /// The data read is bounded by the identify timeout. Running past it is
    /// logged and flagged in the returned identity; startup carries on.
    pub fn identify(&mut self) -> Result<DeviceIdentity> {
        let timing = *self.sequencer.timing();
        self.sequencer.delay_ms(timing.diagnostic_delay_ms);

        self.sequencer
            .bridge_mut()
            .write_byte(TaskRegister::CommandStatus, CMD_IDENTIFY_PACKET_DEVICE)?;
        self.sequencer.delay_ms(timing.identify_delay_ms);
        self.sequencer.wait(WaitCondition::BusyClear)?;

        let start = self.sequencer.clock().now();
        let limit = timing.identify_timeout();
        let mut packet_length = PacketLength::default();
        let mut model = Vec::with_capacity(40);
        let mut timed_out = false;
        let mut count = 0usize;

        loop {
            let (low, high) = self.sequencer.read_word()?;
            if count == 0 {
                packet_length = PacketLength::from_identify(low);
            }
            if MODEL_WORDS.contains(&count) {
                model.push(high);
                model.push(low);
            }
            count += 1;

            let status = self.sequencer.status()?;
            if self.sequencer.clock().now().saturating_sub(start) > limit {
                timed_out = true;
                break;
            }
            if !status.contains(StatusFlags::DRQ) {
                break;
            }
        }

        if timed_out {
            log::warn!("Identify Device command timeout after {} words", count);
        }

        self.sequencer
            .bridge_mut()
            .read_register(TaskRegister::AltStatusControl)?;
        match self.sequencer.wait(WaitCondition::DrqClear) {
            Err(AtapiError::Timeout { .. }) if timed_out => {
                log::warn!("DRQ still set after identify timeout, continuing");
            }
            other => {
                other?;
            }
        }

        let model = String::from_utf8_lossy(&model).trim().to_string();
        log::info!("ATAPI device: {}", model);
        self.sequencer.set_packet_length(packet_length);

        let identity = DeviceIdentity {
            packet_length,
            model,
            timed_out,
        };
        self.identity = Some(identity.clone());
        Ok(identity)
    }

    /// Probe until the drive leaves the "not ready" state
    ///
    /// A pending reset (ASC 0x29) is reported by the first probe, so the
    /// drive is probed once more. The readiness loop then always probes at
    /// least once and repeats while ASC is 0x04.
    ///
    /// # Returns
    ///
    /// The additional sense code of the last probe
    pub fn wait_until_ready(&mut self) -> Result<u8> {
        if self.probe_ready()? == ASC_RESET {
            self.probe_ready()?;
        }

        let deadline = self.sequencer.deadline();
        let mut asc = self.probe_ready()?;
        while asc == ASC_NOT_READY {
            deadline.check(self.sequencer.clock(), WaitCondition::UnitReady)?;
            asc = self.probe_ready()?;
        }

        log::info!("Drive ready (ASC 0x{:02X})", asc);
        Ok(asc)
    }
}
