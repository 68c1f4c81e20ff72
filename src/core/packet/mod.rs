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

//! ATAPI command packets
//!
//! Every command the transport sends comes from a fixed table of 16-byte
//! templates. Drives that negotiate 12-byte packets receive only the first
//! 12 bytes of each entry.
//!
//! | Offset | Opcode | Command                            |
//! |--------|--------|------------------------------------|
//! | 0      | 0x1B   | START/STOP UNIT (open tray)        |
//! | 16     | 0x1B   | START/STOP UNIT (close tray)       |
//! | 32     | 0x1B   | START/STOP UNIT (stop)             |
//! | 48     | 0x47   | PLAY AUDIO MSF                     |
//! | 64     | 0x4B   | PAUSE/RESUME (pause)               |
//! | 80     | 0x4B   | PAUSE/RESUME (resume)              |
//! | 96     | 0x43   | READ TOC (MSF)                     |
//! | 112    | 0x00   | TEST UNIT READY                    |
//! | 128    | 0x5A   | MODE SENSE (10)                    |
//! | 144    | 0x42   | READ SUB-CHANNEL (current position) |
//! | 160    | 0x03   | REQUEST SENSE                      |
//! | 176    | 0x4E   | STOP PLAY/SCAN                     |
//!
//! The table itself is never modified. Commands with variable fields are
//! produced by [`Packet`] constructors that copy a template and patch the
//! copy.

mod sequencer;

pub use sequencer::Sequencer;

use super::msf::Msf;

/// Size of one table entry
pub const ENTRY_LEN: usize = 16;

/// Canned command templates, one 16-byte entry per [`PacketCommand`]
#[rustfmt::skip]
pub const CANNED_PACKETS: [u8; ENTRY_LEN * 12] = [
    0x1B, 0x00, 0x00, 0x00, 0x02, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00,
    0x1B, 0x00, 0x00, 0x00, 0x03, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00,
    0x1B, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00,
    0x47, 0x00, 0x00, 0x10, 0x28, 0x05, 0x4C, 0x1A, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00,
    0x4B, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00,
    0x4B, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x01, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00,
    0x43, 0x02, 0x00, 0x00, 0x00, 0x00, 0x00, 0xFF, 0xFF, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00,
    0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00,
    0x5A, 0x00, 0x01, 0x00, 0x00, 0x00, 0x00, 0xFF, 0xFF, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00,
    0x42, 0x02, 0x40, 0x01, 0x00, 0x00, 0x00, 0xFF, 0xFF, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00,
    0x03, 0x00, 0x00, 0x00, 0xFF, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00,
    0x4E, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00,
];

/// SCSI operation codes used by the table
pub mod opcodes {
    pub const TEST_UNIT_READY: u8 = 0x00;
    pub const REQUEST_SENSE: u8 = 0x03;
    pub const START_STOP_UNIT: u8 = 0x1B;
    pub const READ_SUB_CHANNEL: u8 = 0x42;
    pub const READ_TOC: u8 = 0x43;
    pub const PLAY_AUDIO_MSF: u8 = 0x47;
    pub const PAUSE_RESUME: u8 = 0x4B;
    pub const STOP_PLAY_SCAN: u8 = 0x4E;
    pub const MODE_SENSE_10: u8 = 0x5A;
}

/// Commands available in the canned table
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PacketCommand {
    OpenTray,
    CloseTray,
    StopUnit,
    PlayAudioMsf,
    Pause,
    Resume,
    ReadToc,
    TestUnitReady,
    ModeSense,
    ReadSubChannel,
    RequestSense,
    StopDisc,
}

impl PacketCommand {
    /// Byte offset of this command's entry in [`CANNED_PACKETS`]
    pub const fn offset(self) -> usize {
        match self {
            PacketCommand::OpenTray => 0,
            PacketCommand::CloseTray => 16,
            PacketCommand::StopUnit => 32,
            PacketCommand::PlayAudioMsf => 48,
            PacketCommand::Pause => 64,
            PacketCommand::Resume => 80,
            PacketCommand::ReadToc => 96,
            PacketCommand::TestUnitReady => 112,
            PacketCommand::ModeSense => 128,
            PacketCommand::ReadSubChannel => 144,
            PacketCommand::RequestSense => 160,
            PacketCommand::StopDisc => 176,
        }
    }

    /// The command's 16-byte template
    pub fn template(self) -> [u8; ENTRY_LEN] {
        let start = self.offset();
        let mut bytes = [0u8; ENTRY_LEN];
        bytes.copy_from_slice(&CANNED_PACKETS[start..start + ENTRY_LEN]);
        bytes
    }

    /// Short name for logs and error messages
    pub const fn name(self) -> &'static str {
        match self {
            PacketCommand::OpenTray => "OPEN TRAY",
            PacketCommand::CloseTray => "CLOSE TRAY",
            PacketCommand::StopUnit => "STOP UNIT",
            PacketCommand::PlayAudioMsf => "PLAY AUDIO MSF",
            PacketCommand::Pause => "PAUSE",
            PacketCommand::Resume => "RESUME",
            PacketCommand::ReadToc => "READ TOC",
            PacketCommand::TestUnitReady => "TEST UNIT READY",
            PacketCommand::ModeSense => "MODE SENSE",
            PacketCommand::ReadSubChannel => "READ SUB-CHANNEL",
            PacketCommand::RequestSense => "REQUEST SENSE",
            PacketCommand::StopDisc => "STOP DISC",
        }
    }
}

/// Command packet length negotiated with the device
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum PacketLength {
    /// 12-byte packets (almost every drive)
    #[default]
    Twelve,
    /// 16-byte packets
    Sixteen,
}

impl PacketLength {
    /// Length in bytes
    pub const fn bytes(self) -> usize {
        match self {
            PacketLength::Twelve => 12,
            PacketLength::Sixteen => 16,
        }
    }

    /// Negotiate from the low byte of IDENTIFY PACKET DEVICE word 0
    ///
    /// Bit 0 set selects 16-byte packets.
    pub fn from_identify(word0_low: u8) -> Self {
        if word0_low & 0x01 != 0 {
            PacketLength::Sixteen
        } else {
            PacketLength::Twelve
        }
    }
}

/// An immutable command packet ready to send
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Packet {
    command: PacketCommand,
    bytes: [u8; ENTRY_LEN],
}

impl Packet {
    /// Packet for a command with no variable fields
    pub fn canned(command: PacketCommand) -> Self {
        Self {
            command,
            bytes: command.template(),
        }
    }

    /// PLAY AUDIO MSF from `start` up to `end`
    ///
    /// Bytes 3-5 carry the starting M/S/F and bytes 6-8 the ending M/S/F.
    pub fn play_audio_msf(start: Msf, end: Msf) -> Self {
        let mut packet = Self::canned(PacketCommand::PlayAudioMsf);
        packet.bytes[3..6].copy_from_slice(&start.to_bytes());
        packet.bytes[6..9].copy_from_slice(&end.to_bytes());
        packet
    }

    /// Command this packet was built from
    pub fn command(&self) -> PacketCommand {
        self.command
    }

    /// All 16 bytes
    pub fn bytes(&self) -> &[u8; ENTRY_LEN] {
        &self.bytes
    }

    /// The bytes sent for a negotiated packet length
    pub fn wire_bytes(&self, length: PacketLength) -> &[u8] {
        &self.bytes[..length.bytes()]
    }
}

impl From<PacketCommand> for Packet {
    fn from(command: PacketCommand) -> Self {
        Packet::canned(command)
    }
}
