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

//! Audio CD transport control
//!
//! [`Transport`] owns the whole stack below it (sequencer, register bridge,
//! bus) together with the transport state the drive reports back: audio
//! status, track range, play position and TOC validity. Every user-facing
//! action maps to one or more canned packets:
//!
//! | Action            | Packets                          | Response parsed       |
//! |-------------------|----------------------------------|-----------------------|
//! | play              | PLAY AUDIO MSF                   | -                     |
//! | pause / resume    | PAUSE/RESUME                     | -                     |
//! | stop_unit         | START/STOP UNIT                  | -                     |
//! | stop_disc         | STOP PLAY/SCAN                   | -                     |
//! | eject / load      | START/STOP UNIT                  | -                     |
//! | read_toc          | READ TOC                         | track range, MSF      |
//! | read_subchannel   | READ SUB-CHANNEL                 | audio status, position|
//! | check_disc        | MODE SENSE                       | medium type           |
//! | probe_ready       | TEST UNIT READY + REQUEST SENSE  | additional sense code |
//!
//! # Audio State Machine
//!
//! The drive owns playback; the transport only observes it through the
//! periodic sub-channel read:
//!
//! ```text
//! Stopped --play--> Playing --pause--> Paused
//!    ^                 |  ^              |
//!    +--stop/stop_disc-+  +----resume----+
//!
//! any state --media removed--> NoDisc
//! ```
//!
//! # Example
//!
//! ```
//! use std::time::Duration;
//! use atapi_cd::core::clock::ManualClock;
//! use atapi_cd::core::config::Config;
//! use atapi_cd::core::sim::{SimDisc, SimulatedDrive};
//! use atapi_cd::core::transport::{AudioStatus, Transport};
//!
//! let config = Config::default();
//! let drive = SimulatedDrive::with_disc(config.bus.into(), SimDisc::audio(&[180, 200]));
//! let mut transport = Transport::new(drive, ManualClock::new(Duration::from_millis(1)), &config);
//!
//! transport.initialize()?;
//! transport.read_toc()?;
//! transport.play()?;
//! assert_eq!(transport.read_subchannel()?, AudioStatus::Playing);
//! # Ok::<(), atapi_cd::core::error::AtapiError>(())
//! ```

mod commands;
mod startup;

pub use commands::{DeviceStatus, Refresh};
pub use startup::{DiagnosticResult, StartupReport};

use super::bridge::RegisterBridge;
use super::bus::TwoWire;
use super::clock::Clock;
use super::config::Config;
use super::msf::Msf;
use super::packet::{PacketLength, Sequencer};

/// Track number of the lead-out descriptor in READ TOC data
pub const LEAD_OUT_TRACK: u8 = 0xAA;

/// Audio status reported by READ SUB-CHANNEL
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
#[repr(u8)]
pub enum AudioStatus {
    /// No disc, tray open, or any status not decoded below
    #[default]
    NoDisc = 0x00,
    Playing = 0x11,
    Paused = 0x12,
    /// No current audio status; also reported after play completes
    Stopped = 0x15,
}

impl AudioStatus {
    /// Normalize a raw sub-channel audio status byte
    ///
    /// "Play operation successfully completed" (0x13) means the drive is
    /// neither playing nor paused, so it is treated as stopped.
    pub fn from_raw(raw: u8) -> Self {
        match raw {
            0x11 => AudioStatus::Playing,
            0x12 => AudioStatus::Paused,
            0x13 | 0x15 => AudioStatus::Stopped,
            _ => AudioStatus::NoDisc,
        }
    }

    /// Status byte as stored internally
    pub fn raw(self) -> u8 {
        self as u8
    }
}

/// Result of the MODE SENSE medium check
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DiscCheck {
    /// A valid audio disc is loaded
    DiscPresent,
    /// Tray closed with no usable disc
    NoDisc,
    /// Tray is open
    TrayOpen,
}

impl DiscCheck {
    /// Medium types accepted as an audio disc
    pub const AUDIO_MEDIUM_TYPES: [u8; 6] = [0x02, 0x06, 0x12, 0x16, 0x22, 0x26];

    /// Medium type reported with the door open
    pub const TRAY_OPEN: u8 = 0x71;

    /// Classify a MODE SENSE medium type byte
    pub fn from_medium_type(medium: u8) -> Self {
        if medium == Self::TRAY_OPEN {
            DiscCheck::TrayOpen
        } else if Self::AUDIO_MEDIUM_TYPES.contains(&medium) {
            DiscCheck::DiscPresent
        } else {
            DiscCheck::NoDisc
        }
    }
}

/// Device details read during startup
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeviceIdentity {
    /// Negotiated command packet length
    pub packet_length: PacketLength,
    /// Model string from IDENTIFY words 27-46
    pub model: String,
    /// The IDENTIFY data read hit its deadline
    pub timed_out: bool,
}

/// Transport state observed from the drive
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransportState {
    /// Last audio status from the sub-channel
    pub audio_status: AudioStatus,
    /// Track being played, or the target of next/prev
    pub current_track: u8,
    /// First track on the disc
    pub start_track: u8,
    /// Last track on the disc
    pub end_track: u8,
    /// Start position used by the next play
    pub play_from: Msf,
    /// Start position of `current_track`, found by the last TOC read
    pub destination: Option<Msf>,
    /// Lead-out position, i.e. total playing time
    pub lead_out: Msf,
    /// Absolute pickup position from the sub-channel
    pub position: Msf,
    /// Track range and lead-out are current
    pub toc_valid: bool,
    /// Additional sense code from the last REQUEST SENSE
    pub asc: u8,
}

impl Default for TransportState {
    fn default() -> Self {
        Self {
            audio_status: AudioStatus::NoDisc,
            current_track: 1,
            start_track: 0,
            end_track: 0,
            play_from: Msf::default(),
            destination: None,
            lead_out: Msf::default(),
            position: Msf::default(),
            toc_valid: false,
            asc: 0,
        }
    }
}

impl TransportState {
    /// Track after the current one, wrapping from the last to the first
    pub fn next_track(&self) -> u8 {
        match self.current_track.checked_add(1) {
            Some(next) if next <= self.end_track => next,
            _ => self.start_track,
        }
    }

    /// Track before the current one, wrapping from the first to the last
    pub fn prev_track(&self) -> u8 {
        match self.current_track.checked_sub(1) {
            Some(prev) if prev >= self.start_track => prev,
            _ => self.end_track,
        }
    }

    /// Total playing time of the disc
    pub fn total_time(&self) -> Msf {
        self.lead_out
    }
}

/// ATAPI audio transport
pub struct Transport<B: TwoWire, C: Clock> {
    sequencer: Sequencer<B, C>,
    state: TransportState,
    identity: Option<DeviceIdentity>,
}

impl<B: TwoWire, C: Clock> Transport<B, C> {
    /// Create a transport over `bus`
    ///
    /// Nothing is sent until [`Transport::initialize`] or a command is
    /// called.
    pub fn new(bus: B, clock: C, config: &Config) -> Self {
        let bridge = RegisterBridge::new(bus, config.bus.into());
        Self {
            sequencer: Sequencer::new(bridge, clock, config.timing),
            state: TransportState::default(),
            identity: None,
        }
    }

    pub fn state(&self) -> &TransportState {
        &self.state
    }

    /// Device identity, once startup has read it
    pub fn identity(&self) -> Option<&DeviceIdentity> {
        self.identity.as_ref()
    }

    pub fn packet_length(&self) -> PacketLength {
        self.sequencer.packet_length()
    }

    pub fn sequencer(&self) -> &Sequencer<B, C> {
        &self.sequencer
    }

    pub fn sequencer_mut(&mut self) -> &mut Sequencer<B, C> {
        &mut self.sequencer
    }

    pub fn bus(&self) -> &B {
        self.sequencer.bridge().bus()
    }

    pub fn bus_mut(&mut self) -> &mut B {
        self.sequencer.bridge_mut().bus_mut()
    }

    pub fn clock(&self) -> &C {
        self.sequencer.clock()
    }

    /// Select the track the next TOC read resolves as destination
    pub fn set_current_track(&mut self, track: u8) {
        self.state.current_track = track;
    }

    /// Mark the table of contents as stale
    pub fn invalidate_toc(&mut self) {
        self.state.toc_valid = false;
    }
}

#[cfg(test)]
mod tests;
