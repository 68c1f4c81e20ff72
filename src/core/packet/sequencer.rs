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

//! ATAPI PACKET command protocol
//!
//! Sending a packet:
//! 1. Device Control = 0x0A (nIEN set, no interrupt notification)
//! 2. Command = 0xA0 (PACKET)
//! 3. Settle delay (400 ms by default, needed by the drive population)
//! 4. Packet written one word at a time through the Data register, with
//!    two throwaway Alternate Status reads after each word as a timing pad
//! 5. Wait for BSY to clear
//!
//! The sequencer knows nothing about response layouts. Commands with a
//! data-in phase call [`Sequencer::await_data`] and then pull words with
//! [`Sequencer::read_word`] until [`Sequencer::data_pending`] turns false.

use std::time::Duration;

use super::{Packet, PacketLength};
use crate::core::bridge::{RegisterBridge, TaskRegister};
use crate::core::bus::TwoWire;
use crate::core::clock::Clock;
use crate::core::config::TimingConfig;
use crate::core::error::{AtapiError, Result, WaitCondition};
use crate::core::status::{self, StatusFlags};

/// PACKET command opcode
pub const CMD_PACKET: u8 = 0xA0;

/// Device Control value written before every packet (nIEN)
const DEVICE_CONTROL_PACKET: u8 = 0b0000_1010;

/// Issues command packets and moves response words
pub struct Sequencer<B: TwoWire, C: Clock> {
    bridge: RegisterBridge<B>,
    clock: C,
    timing: TimingConfig,
    packet_length: PacketLength,
}

impl<B: TwoWire, C: Clock> Sequencer<B, C> {
    /// Create a sequencer with 12-byte packets until negotiated otherwise
    pub fn new(bridge: RegisterBridge<B>, clock: C, timing: TimingConfig) -> Self {
        Self {
            bridge,
            clock,
            timing,
            packet_length: PacketLength::default(),
        }
    }

    pub fn bridge(&self) -> &RegisterBridge<B> {
        &self.bridge
    }

    pub fn bridge_mut(&mut self) -> &mut RegisterBridge<B> {
        &mut self.bridge
    }

    pub fn clock(&self) -> &C {
        &self.clock
    }

    pub fn clock_mut(&mut self) -> &mut C {
        &mut self.clock
    }

    /// Borrow the bridge and the clock together, for reset pulses
    pub fn bridge_and_clock(&mut self) -> (&mut RegisterBridge<B>, &mut C) {
        (&mut self.bridge, &mut self.clock)
    }

    pub fn timing(&self) -> &TimingConfig {
        &self.timing
    }

    /// Packet length used for every send
    pub fn packet_length(&self) -> PacketLength {
        self.packet_length
    }

    pub fn set_packet_length(&mut self, length: PacketLength) {
        if length != self.packet_length {
            log::info!("ATAPI: using {}-byte packets", length.bytes());
        }
        self.packet_length = length;
    }

    /// Block for `ms` milliseconds
    pub fn delay_ms(&mut self, ms: u64) {
        self.clock.sleep_ms(ms);
    }

    /// Poll until `condition` holds, bounded by the configured wait timeout
    pub fn wait(&mut self, condition: WaitCondition) -> Result<StatusFlags> {
        status::wait_for(
            &mut self.bridge,
            &self.clock,
            condition,
            self.timing.wait_timeout(),
        )
    }

    /// Read the status register once
    pub fn status(&mut self) -> Result<StatusFlags> {
        self.bridge
            .read_byte(TaskRegister::CommandStatus)
            .map(StatusFlags::from_raw)
    }

    /// Send a command packet and wait for the device to finish accepting it
    pub fn send(&mut self, packet: &Packet) -> Result<()> {
        log::debug!(
            "ATAPI: {} {:02X?}",
            packet.command().name(),
            packet.wire_bytes(self.packet_length)
        );

        self.bridge
            .write_byte(TaskRegister::AltStatusControl, DEVICE_CONTROL_PACKET)?;
        self.bridge.write_byte(TaskRegister::CommandStatus, CMD_PACKET)?;
        self.clock.sleep_ms(self.timing.packet_settle_ms);

        for word in packet.wire_bytes(self.packet_length).chunks(2) {
            self.bridge
                .write_register(TaskRegister::Data, word[0], word[1])?;
            self.bridge.read_register(TaskRegister::AltStatusControl)?;
            self.bridge.read_register(TaskRegister::AltStatusControl)?;
        }

        self.wait(WaitCondition::BusyClear)?;
        Ok(())
    }

    /// Wait for the data-in phase of the last packet
    pub fn await_data(&mut self) -> Result<()> {
        self.clock.sleep_ms(self.timing.response_delay_ms);
        self.wait(WaitCondition::DrqSet)?;
        Ok(())
    }

    /// Read one response word as `(low, high)`
    pub fn read_word(&mut self) -> Result<(u8, u8)> {
        self.bridge.read_register(TaskRegister::Data)
    }

    /// Whether the device still has response data (DRQ set)
    pub fn data_pending(&mut self) -> Result<bool> {
        Ok(self.status()?.contains(StatusFlags::DRQ))
    }

    /// Discard response words until DRQ clears
    ///
    /// # Returns
    ///
    /// Number of words discarded
    pub fn drain(&mut self) -> Result<usize> {
        let deadline = self.deadline();
        let mut words = 0;

        while self.data_pending()? {
            self.read_word()?;
            words += 1;
            deadline.check(&self.clock, WaitCondition::DrqClear)?;
        }

        if words > 0 {
            log::trace!("ATAPI: drained {} response words", words);
        }
        Ok(words)
    }

    /// Deadline helper for response loops that manage their own reads
    pub(crate) fn deadline(&self) -> Deadline {
        Deadline {
            start: self.clock.now(),
            limit: self.timing.wait_timeout(),
        }
    }
}

/// Start time and optional limit of a bounded loop
#[derive(Debug, Clone, Copy)]
pub(crate) struct Deadline {
    start: Duration,
    limit: Option<Duration>,
}

impl Deadline {
    /// Fail with a timeout for `condition` once the limit has passed
    pub(crate) fn check<C: Clock>(&self, clock: &C, condition: WaitCondition) -> Result<()> {
        match self.limit {
            Some(limit) => {
                let waited = clock.now().saturating_sub(self.start);
                if waited >= limit {
                    Err(AtapiError::Timeout { condition, waited })
                } else {
                    Ok(())
                }
            }
            None => Ok(()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::bus::Expanders;
    use crate::core::clock::ManualClock;
    use crate::core::packet::PacketCommand;
    use crate::core::sim::{SimDisc, SimulatedDrive};

    fn sequencer(drive: SimulatedDrive) -> Sequencer<SimulatedDrive, ManualClock> {
        let bridge = RegisterBridge::new(drive, Expanders::default());
        Sequencer::new(
            bridge,
            ManualClock::new(Duration::from_millis(1)),
            TimingConfig::default(),
        )
    }

    fn with_disc() -> Sequencer<SimulatedDrive, ManualClock> {
        sequencer(SimulatedDrive::with_disc(
            Expanders::default(),
            SimDisc::audio(&[120, 150, 90]),
        ))
    }

    #[test]
    fn test_send_sets_nien_and_delivers_packet() {
        let mut seq = with_disc();
        seq.send(&Packet::canned(PacketCommand::StopUnit)).unwrap();

        let device = seq.bridge().bus().device();
        assert_eq!(device.device_control(), 0x0A);
        assert_eq!(device.received_packets().len(), 1);
        assert_eq!(device.received_packets()[0].len(), 12);
        assert_eq!(device.received_opcodes(), vec![0x1B]);
        assert!(seq.bridge().bus().is_idle());
    }

    #[test]
    fn test_settle_delay_is_applied() {
        let mut seq = with_disc();
        let before = seq.clock().elapsed();
        seq.send(&Packet::canned(PacketCommand::Pause)).unwrap();
        assert!(seq.clock().elapsed() - before >= Duration::from_millis(400));
    }

    #[test]
    fn test_sixteen_byte_packets() {
        let mut seq = with_disc();
        seq.bridge_mut()
            .bus_mut()
            .device_mut()
            .set_packet_length(PacketLength::Sixteen);
        seq.set_packet_length(PacketLength::Sixteen);

        seq.send(&Packet::canned(PacketCommand::TestUnitReady)).unwrap();
        assert_eq!(seq.bridge().bus().device().received_packets()[0].len(), 16);
    }

    #[test]
    fn test_drain_consumes_response() {
        let mut seq = with_disc();
        seq.send(&Packet::canned(PacketCommand::ModeSense)).unwrap();
        seq.await_data().unwrap();
        assert!(seq.data_pending().unwrap());

        // 20 bytes of mode data
        assert_eq!(seq.drain().unwrap(), 10);
        assert!(!seq.data_pending().unwrap());
    }

    #[test]
    fn test_wait_times_out_without_device() {
        let mut drive = SimulatedDrive::new(Expanders::default());
        drive.set_present(false);
        let mut seq = sequencer(drive);

        // A floating bus reads 0xFF, so BSY never clears
        let err = seq.wait(WaitCondition::BusyClear).unwrap_err();
        match err {
            AtapiError::Timeout { condition, waited } => {
                assert_eq!(condition, WaitCondition::BusyClear);
                assert!(waited >= Duration::from_secs(10));
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_deadline_without_limit_never_expires() {
        let clock = ManualClock::new(Duration::from_secs(60));
        let deadline = Deadline {
            start: clock.now(),
            limit: None,
        };
        clock.advance(Duration::from_secs(3600));
        assert!(deadline.check(&clock, WaitCondition::BusyClear).is_ok());
    }
}
