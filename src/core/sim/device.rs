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

//! ATAPI CD-ROM device model
//!
//! Implements the task file, the ATA commands used during bring-up
//! (EXECUTE DEVICE DIAGNOSTIC, IDENTIFY PACKET DEVICE, PACKET) and the SCSI
//! commands in the canned packet table. Enough of the drive's behavior is
//! modeled to exercise every status wait: each accepted packet keeps BSY
//! set for a configurable number of status reads.

use std::collections::VecDeque;

use super::disc::SimDisc;
use crate::core::bridge::TaskRegister;
use crate::core::msf::Msf;
use crate::core::packet::{opcodes, PacketLength};
use crate::core::status::StatusFlags;

/// ATA command opcodes understood by the model
mod ata {
    pub const EXECUTE_DIAGNOSTIC: u8 = 0x90;
    pub const PACKET: u8 = 0xA0;
    pub const IDENTIFY_PACKET_DEVICE: u8 = 0xA1;
}

/// Additional sense codes reported by the model
pub mod asc {
    pub const NONE: u8 = 0x00;
    pub const NOT_READY: u8 = 0x04;
    pub const INVALID_COMMAND: u8 = 0x20;
    pub const POWER_ON_RESET: u8 = 0x29;
    pub const MEDIUM_NOT_PRESENT: u8 = 0x3A;
}

/// Sub-channel audio status codes
pub mod audio {
    pub const PLAYING: u8 = 0x11;
    pub const PAUSED: u8 = 0x12;
    pub const COMPLETED: u8 = 0x13;
    pub const NO_STATUS: u8 = 0x15;
}

/// Error register value after a passed diagnostic
const DIAGNOSTIC_PASSED: u8 = 0x01;

/// Error register ABRT bit
const ERROR_ABORTED: u8 = 0x04;

/// Number of words in IDENTIFY PACKET DEVICE data
const IDENTIFY_WORDS: usize = 256;

#[derive(Debug, Clone, PartialEq, Eq)]
enum Phase {
    Idle,
    /// PACKET issued, collecting command bytes
    PacketIn(Vec<u8>),
    /// Response words waiting to be read
    DataIn,
}

/// Simulated ATAPI CD-ROM drive
#[derive(Debug, Clone)]
pub struct AtapiDevice {
    // Task file
    feature: u8,
    error: u8,
    sector_count: u8,
    sector_number: u8,
    cylinder_low: u8,
    cylinder_high: u8,
    device_head: u8,
    device_control: u8,
    check_condition: bool,

    phase: Phase,
    response: VecDeque<u16>,
    busy_polls: u32,
    busy_remaining: u32,

    // Identity
    packet_length: PacketLength,
    model: String,
    signature: (u8, u8),
    diagnostic_passes: bool,
    identify_stalls: bool,
    /// Current response withholds its last word
    stalled: bool,

    // Media and playback
    disc: Option<SimDisc>,
    tray_open: bool,
    audio_status: u8,
    position: Msf,
    play_end: Msf,
    play_step: u32,

    // Sense
    sense_asc: u8,
    reset_pending: bool,
    spin_up_probes: u32,

    // Test hooks
    medium_type_override: Option<u8>,
    audio_status_override: Option<u8>,
    response_limit: Option<usize>,
    packets: Vec<Vec<u8>>,
}

impl AtapiDevice {
    /// A 12-byte-packet drive with no disc, freshly powered on
    pub fn new() -> Self {
        let mut device = Self {
            feature: 0,
            error: 0,
            sector_count: 0,
            sector_number: 0,
            cylinder_low: 0,
            cylinder_high: 0,
            device_head: 0,
            device_control: 0,
            check_condition: false,
            phase: Phase::Idle,
            response: VecDeque::new(),
            busy_polls: 2,
            busy_remaining: 0,
            packet_length: PacketLength::Twelve,
            model: "SIMULATED CD-ROM".to_string(),
            signature: (0x14, 0xEB),
            diagnostic_passes: true,
            identify_stalls: false,
            stalled: false,
            disc: None,
            tray_open: false,
            audio_status: audio::NO_STATUS,
            position: Msf::default(),
            play_end: Msf::default(),
            play_step: 75,
            sense_asc: asc::NONE,
            reset_pending: false,
            spin_up_probes: 0,
            medium_type_override: None,
            audio_status_override: None,
            response_limit: None,
            packets: Vec::new(),
        };
        device.reset();
        device
    }

    // Configuration

    pub fn set_disc(&mut self, disc: Option<SimDisc>) {
        self.disc = disc;
        self.audio_status = audio::NO_STATUS;
    }

    pub fn set_packet_length(&mut self, length: PacketLength) {
        self.packet_length = length;
    }

    pub fn set_model(&mut self, model: &str) {
        self.model = model.to_string();
    }

    pub fn set_signature(&mut self, low: u8, high: u8) {
        self.signature = (low, high);
        self.cylinder_low = low;
        self.cylinder_high = high;
    }

    pub fn set_diagnostic_passes(&mut self, passes: bool) {
        self.diagnostic_passes = passes;
    }

    /// IDENTIFY data never ends (DRQ stays set)
    pub fn set_identify_stalls(&mut self, stalls: bool) {
        self.identify_stalls = stalls;
    }

    /// Status reads that report BSY after each accepted command
    pub fn set_busy_polls(&mut self, polls: u32) {
        self.busy_polls = polls;
    }

    /// TEST UNIT READY probes answered with "not ready" before the drive is ready
    pub fn set_spin_up_probes(&mut self, probes: u32) {
        self.spin_up_probes = probes;
    }

    /// Frames the pickup advances per sub-channel read while playing
    pub fn set_play_step(&mut self, frames: u32) {
        self.play_step = frames;
    }

    pub fn tray_open(&self) -> bool {
        self.tray_open
    }

    /// Report this medium type from MODE SENSE regardless of state
    pub fn set_medium_type_override(&mut self, medium: Option<u8>) {
        self.medium_type_override = medium;
    }

    /// Report this audio status from READ SUB-CHANNEL regardless of state
    pub fn set_audio_status_override(&mut self, status: Option<u8>) {
        self.audio_status_override = status;
    }

    /// End every response after this many words
    pub fn set_response_limit(&mut self, words: Option<usize>) {
        self.response_limit = words;
    }

    /// Last value written to Device Control
    pub fn device_control(&self) -> u8 {
        self.device_control
    }

    /// Last value written to Features
    pub fn feature(&self) -> u8 {
        self.feature
    }

    /// Raw audio status of the playback engine
    pub fn audio_status(&self) -> u8 {
        self.audio_status
    }

    /// Current pickup position
    pub fn position(&self) -> Msf {
        self.position
    }

    /// End position of the current play operation
    pub fn play_end(&self) -> Msf {
        self.play_end
    }

    /// Every command packet received, as sent on the wire
    pub fn received_packets(&self) -> &[Vec<u8>] {
        &self.packets
    }

    /// Opcodes of every command packet received
    pub fn received_opcodes(&self) -> Vec<u8> {
        self.packets.iter().map(|packet| packet[0]).collect()
    }

    // Bus side

    /// Hardware or software reset
    pub fn reset(&mut self) {
        log::debug!("SIM: device reset");
        self.error = DIAGNOSTIC_PASSED;
        self.sector_count = 0x01;
        self.sector_number = 0x01;
        self.cylinder_low = self.signature.0;
        self.cylinder_high = self.signature.1;
        self.device_head = 0;
        self.check_condition = false;
        self.phase = Phase::Idle;
        self.response.clear();
        self.stalled = false;
        self.busy_remaining = 0;
        self.reset_pending = true;
        self.sense_asc = asc::POWER_ON_RESET;
        self.audio_status = audio::NO_STATUS;
    }

    /// Register read on the falling edge of nDIOR
    pub fn read(&mut self, reg: TaskRegister) -> u16 {
        match reg {
            TaskRegister::Data => self.read_data(),
            TaskRegister::ErrorFeature => self.error as u16,
            TaskRegister::SectorCount => self.sector_count as u16,
            TaskRegister::SectorNumber => self.sector_number as u16,
            TaskRegister::CylinderLow => self.cylinder_low as u16,
            TaskRegister::CylinderHigh => self.cylinder_high as u16,
            TaskRegister::DeviceHead => self.device_head as u16,
            TaskRegister::CommandStatus | TaskRegister::AltStatusControl => {
                self.read_status().bits() as u16
            }
        }
    }

    /// Register write on the falling edge of nDIOW
    pub fn write(&mut self, reg: TaskRegister, value: u16) {
        let [low, high] = value.to_le_bytes();
        match reg {
            TaskRegister::Data => self.write_data(low, high),
            TaskRegister::ErrorFeature => self.feature = low,
            TaskRegister::SectorCount => self.sector_count = low,
            TaskRegister::SectorNumber => self.sector_number = low,
            TaskRegister::CylinderLow => self.cylinder_low = low,
            TaskRegister::CylinderHigh => self.cylinder_high = low,
            TaskRegister::DeviceHead => self.device_head = low,
            TaskRegister::CommandStatus => self.execute_ata(low),
            TaskRegister::AltStatusControl => {
                self.device_control = low;
                if low & 0x04 != 0 {
                    self.reset();
                }
            }
        }
    }

    fn read_status(&mut self) -> StatusFlags {
        if self.busy_remaining > 0 {
            self.busy_remaining -= 1;
            return StatusFlags::BSY;
        }

        let mut status = StatusFlags::DRDY | StatusFlags::DSC;
        if self.phase != Phase::Idle {
            status |= StatusFlags::DRQ;
        }
        if self.check_condition {
            status |= StatusFlags::ERR;
        }
        status
    }

    fn read_data(&mut self) -> u16 {
        if self.phase != Phase::DataIn {
            return 0;
        }
        if self.stalled && self.response.len() == 1 {
            return 0;
        }

        let word = self.response.pop_front().unwrap_or(0);
        if self.response.is_empty() {
            self.phase = Phase::Idle;
        }
        word
    }

    fn write_data(&mut self, low: u8, high: u8) {
        let Phase::PacketIn(buffer) = &mut self.phase else {
            log::warn!("SIM: data write outside packet phase");
            return;
        };

        buffer.push(low);
        buffer.push(high);
        if buffer.len() >= self.packet_length.bytes() {
            let packet = std::mem::take(buffer);
            self.phase = Phase::Idle;
            self.execute_packet(packet);
        }
    }

    fn respond(&mut self, bytes: &[u8]) {
        self.response = bytes
            .chunks(2)
            .map(|pair| u16::from_le_bytes([pair[0], pair.get(1).copied().unwrap_or(0)]))
            .collect();
        if let Some(limit) = self.response_limit {
            self.response.truncate(limit);
        }
        self.stalled = false;
        self.phase = if self.response.is_empty() {
            Phase::Idle
        } else {
            Phase::DataIn
        };
    }

    fn execute_ata(&mut self, command: u8) {
        log::debug!("SIM: ATA command 0x{:02X}", command);
        self.busy_remaining = self.busy_polls;
        self.check_condition = false;

        match command {
            ata::EXECUTE_DIAGNOSTIC => {
                self.error = if self.diagnostic_passes {
                    DIAGNOSTIC_PASSED
                } else {
                    0x00
                };
                self.cylinder_low = self.signature.0;
                self.cylinder_high = self.signature.1;
            }
            ata::IDENTIFY_PACKET_DEVICE => {
                let words = self.identify_data();
                let bytes: Vec<u8> = words.iter().flat_map(|w| w.to_le_bytes()).collect();
                self.respond(&bytes);
                self.stalled = self.identify_stalls;
            }
            ata::PACKET => {
                self.error = 0;
                self.sector_count = 0x01;
                self.phase = Phase::PacketIn(Vec::with_capacity(16));
                self.busy_remaining = 0;
            }
            _ => {
                self.error = ERROR_ABORTED;
                self.check_condition = true;
            }
        }
    }

    fn identify_data(&self) -> [u16; IDENTIFY_WORDS] {
        let mut words = [0u16; IDENTIFY_WORDS];
        words[0] = 0x85C0
            | match self.packet_length {
                PacketLength::Twelve => 0x00,
                PacketLength::Sixteen => 0x01,
            };

        let mut model = [b' '; 40];
        for (slot, byte) in model.iter_mut().zip(self.model.bytes()) {
            *slot = byte;
        }
        for (i, pair) in model.chunks(2).enumerate() {
            words[27 + i] = u16::from_be_bytes([pair[0], pair[1]]);
        }
        words
    }

    fn media_ready(&self) -> bool {
        self.disc.is_some() && !self.tray_open
    }

    fn fail(&mut self, code: u8) {
        self.error = ERROR_ABORTED;
        self.sense_asc = code;
        self.check_condition = true;
    }

    fn execute_packet(&mut self, packet: Vec<u8>) {
        log::debug!("SIM: packet {:02X?}", packet);
        self.busy_remaining = self.busy_polls;
        self.check_condition = false;
        let opcode = packet[0];
        self.packets.push(packet.clone());

        match opcode {
            opcodes::TEST_UNIT_READY => self.test_unit_ready(),
            opcodes::REQUEST_SENSE => self.request_sense(),
            opcodes::START_STOP_UNIT => self.start_stop(packet[4]),
            opcodes::PLAY_AUDIO_MSF => {
                if !self.media_ready() {
                    return self.fail(asc::MEDIUM_NOT_PRESENT);
                }
                self.position = Msf::new(packet[3], packet[4], packet[5]);
                self.play_end = Msf::new(packet[6], packet[7], packet[8]);
                self.audio_status = audio::PLAYING;
            }
            opcodes::PAUSE_RESUME => {
                let resume = packet[8] & 0x01 != 0;
                match (resume, self.audio_status) {
                    (true, audio::PAUSED) => self.audio_status = audio::PLAYING,
                    (false, audio::PLAYING) => self.audio_status = audio::PAUSED,
                    _ => {}
                }
            }
            opcodes::STOP_PLAY_SCAN => {
                if self.media_ready() {
                    self.audio_status = audio::NO_STATUS;
                }
            }
            opcodes::READ_TOC => {
                let toc = self
                    .disc
                    .as_ref()
                    .filter(|_| !self.tray_open)
                    .map(SimDisc::toc_response);
                match toc {
                    Some(toc) => self.respond(&toc),
                    None => self.fail(asc::MEDIUM_NOT_PRESENT),
                }
            }
            opcodes::READ_SUB_CHANNEL => self.read_sub_channel(),
            opcodes::MODE_SENSE_10 => self.mode_sense(),
            _ => {
                log::warn!("SIM: unsupported packet opcode 0x{:02X}", opcode);
                self.fail(asc::INVALID_COMMAND);
            }
        }
    }

    fn test_unit_ready(&mut self) {
        let code = if self.reset_pending {
            asc::POWER_ON_RESET
        } else if !self.media_ready() {
            asc::MEDIUM_NOT_PRESENT
        } else if self.spin_up_probes > 0 {
            self.spin_up_probes -= 1;
            asc::NOT_READY
        } else {
            asc::NONE
        };

        if code == asc::NONE {
            self.sense_asc = asc::NONE;
        } else {
            self.fail(code);
        }
    }

    fn request_sense(&mut self) {
        let sense_key = match self.sense_asc {
            asc::NONE => 0x00,
            asc::POWER_ON_RESET => 0x06,
            asc::INVALID_COMMAND => 0x05,
            _ => 0x02,
        };

        let mut sense = [0u8; 18];
        sense[0] = 0x70;
        sense[2] = sense_key;
        sense[7] = 10;
        sense[12] = self.sense_asc;
        self.respond(&sense);

        self.reset_pending = false;
        self.sense_asc = asc::NONE;
    }

    fn start_stop(&mut self, flags: u8) {
        match flags & 0x03 {
            0x02 => {
                self.tray_open = true;
                self.audio_status = audio::NO_STATUS;
            }
            0x03 => self.tray_open = false,
            0x00 => self.audio_status = audio::NO_STATUS,
            _ => {}
        }
    }

    fn read_sub_channel(&mut self) {
        let Some(disc) = self.disc.as_ref().filter(|_| !self.tray_open) else {
            return self.fail(asc::MEDIUM_NOT_PRESENT);
        };

        let status = self.audio_status_override.unwrap_or(self.audio_status);
        let track = disc.track_at(self.position);
        let relative = self.position.to_frames().saturating_sub(
            disc.track_start(track)
                .map(Msf::to_frames)
                .unwrap_or_default(),
        );
        let relative = Msf::from_frames(relative);

        let mut data = vec![0x00, status, 0x00, 12, 0x01, 0x10, track, 0x01];
        data.push(0x00);
        data.extend_from_slice(&self.position.to_bytes());
        data.push(0x00);
        data.extend_from_slice(&relative.to_bytes());
        self.respond(&data);

        self.advance_playback();
    }

    fn advance_playback(&mut self) {
        match self.audio_status {
            audio::PLAYING => {
                self.position = Msf::from_frames(self.position.to_frames() + self.play_step);
                if self.position >= self.play_end {
                    self.position = self.play_end;
                    self.audio_status = audio::COMPLETED;
                }
            }
            audio::COMPLETED => self.audio_status = audio::NO_STATUS,
            _ => {}
        }
    }

    fn mode_sense(&mut self) {
        let medium = self.medium_type_override.unwrap_or(if self.tray_open {
            0x71
        } else if self.disc.is_some() {
            0x02
        } else {
            0x70
        });

        let mut data = vec![0x00, 18, medium, 0x00, 0x00, 0x00, 0x00, 0x00];
        data.extend_from_slice(&[0x01, 0x0A, 0x00, 0x05, 0, 0, 0, 0, 0x05, 0, 0, 0]);
        self.respond(&data);
    }
}

impl Default for AtapiDevice {
    fn default() -> Self {
        Self::new()
    }
}
