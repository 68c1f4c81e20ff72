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

//! Transport command implementations
//!
//! Fire-and-forget commands send one canned packet. Commands with a
//! response wait for the data-in phase and parse the words they need,
//! draining whatever is left so the next packet starts on an idle device.

use super::{AudioStatus, DiscCheck, Transport, LEAD_OUT_TRACK};
use crate::core::bridge::TaskRegister;
use crate::core::bus::TwoWire;
use crate::core::clock::Clock;
use crate::core::error::{AtapiError, Result, WaitCondition};
use crate::core::msf::Msf;
use crate::core::packet::{Packet, PacketCommand};
use crate::core::status::StatusFlags;

/// Word of the REQUEST SENSE data holding the additional sense code
const SENSE_ASC_WORD: usize = 6;

/// Outcome of a periodic refresh
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Refresh {
    /// Audio status just read
    pub status: AudioStatus,
    /// The TOC was re-read during this refresh
    pub toc_loaded: bool,
}

/// Decoded status register, with the error register when ERR is set
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DeviceStatus {
    pub status: StatusFlags,
    pub error: Option<u8>,
}

impl<B: TwoWire, C: Clock> Transport<B, C> {
    fn send(&mut self, command: PacketCommand) -> Result<()> {
        self.sequencer.send(&Packet::canned(command))
    }

    /// Read the next `N` response words, failing if DRQ drops first
    fn read_words<const N: usize>(
        &mut self,
        command: PacketCommand,
        already: usize,
    ) -> Result<[(u8, u8); N]> {
        let mut words = [(0, 0); N];
        for (i, word) in words.iter_mut().enumerate() {
            if !self.sequencer.data_pending()? {
                return Err(AtapiError::ResponseTruncated {
                    command: command.name(),
                    words: already + i,
                });
            }
            *word = self.sequencer.read_word()?;
        }
        Ok(words)
    }

    /// Start audio playback from the play-from position to the lead-out
    pub fn play(&mut self) -> Result<()> {
        let packet = Packet::play_audio_msf(self.state.play_from, self.state.lead_out);
        log::info!(
            "Play {} -> {}",
            self.state.play_from,
            self.state.lead_out
        );
        self.sequencer.send(&packet)
    }

    /// Pause audio playback
    pub fn pause(&mut self) -> Result<()> {
        self.send(PacketCommand::Pause)
    }

    /// Resume paused playback
    pub fn resume(&mut self) -> Result<()> {
        self.send(PacketCommand::Resume)
    }

    /// Stop the unit (spindle stop)
    pub fn stop_unit(&mut self) -> Result<()> {
        self.send(PacketCommand::StopUnit)
    }

    /// Stop audio play or scan
    pub fn stop_disc(&mut self) -> Result<()> {
        self.send(PacketCommand::StopDisc)
    }

    /// Open the tray
    pub fn eject(&mut self) -> Result<()> {
        self.state.toc_valid = false;
        self.send(PacketCommand::OpenTray)
    }

    /// Close the tray
    pub fn load(&mut self) -> Result<()> {
        self.state.toc_valid = false;
        self.send(PacketCommand::CloseTray)
    }

    /// TEST UNIT READY; the outcome is read back with [`Transport::request_sense`]
    pub fn test_unit_ready(&mut self) -> Result<()> {
        self.send(PacketCommand::TestUnitReady)
    }

    /// REQUEST SENSE
    ///
    /// # Returns
    ///
    /// The additional sense code (byte 12 of the sense data)
    pub fn request_sense(&mut self) -> Result<u8> {
        self.send(PacketCommand::RequestSense)?;
        self.sequencer.await_data()?;

        let deadline = self.sequencer.deadline();
        let mut asc = 0;
        let mut index = 0;
        loop {
            let (low, _) = self.sequencer.read_word()?;
            if index == SENSE_ASC_WORD {
                asc = low;
            }
            index += 1;

            if !self.sequencer.data_pending()? {
                break;
            }
            deadline.check(self.sequencer.clock(), WaitCondition::DrqClear)?;
        }

        log::debug!("Sense: ASC 0x{:02X}", asc);
        self.state.asc = asc;
        Ok(asc)
    }

    /// TEST UNIT READY followed by REQUEST SENSE
    pub fn probe_ready(&mut self) -> Result<u8> {
        self.test_unit_ready()?;
        self.request_sense()
    }

    /// Read the table of contents
    ///
    /// Sets the track range and the lead-out, makes the first track's start
    /// the play-from position, and resolves the current track's start as
    /// the destination.
    pub fn read_toc(&mut self) -> Result<()> {
        self.send(PacketCommand::ReadToc)?;
        self.sequencer.await_data()?;

        // TOC data length, then track range
        let [_, (first, last)] = self.read_words::<2>(PacketCommand::ReadToc, 0)?;
        self.state.start_track = first;
        self.state.end_track = last;
        self.state.destination = None;

        let deadline = self.sequencer.deadline();
        let mut read = 2;
        loop {
            // Reserved and ADR/control lead each descriptor
            let [_, (track, _), (_, minute), (second, frame)] =
                self.read_words::<4>(PacketCommand::ReadToc, read)?;
            read += 4;
            let start = Msf::new(minute, second, frame);

            if track == self.state.start_track {
                self.state.play_from = start;
            }
            if track == self.state.current_track {
                self.state.destination = Some(start);
            }
            if track == LEAD_OUT_TRACK {
                self.state.lead_out = start;
            }

            if !self.sequencer.data_pending()? {
                break;
            }
            deadline.check(self.sequencer.clock(), WaitCondition::DrqClear)?;
        }

        log::info!(
            "TOC: tracks {}-{}, lead-out {}",
            self.state.start_track,
            self.state.end_track,
            self.state.lead_out
        );
        Ok(())
    }

    /// Read the current audio status and pickup position
    ///
    /// A drive that answers without a data phase (no disc, tray open) is
    /// reported as [`AudioStatus::NoDisc`].
    pub fn read_subchannel(&mut self) -> Result<AudioStatus> {
        self.send(PacketCommand::ReadSubChannel)?;

        if !self.sequencer.data_pending()? {
            self.state.audio_status = AudioStatus::NoDisc;
            return Ok(AudioStatus::NoDisc);
        }

        // Data length, format code and ADR/control sit between the audio
        // status and the track number
        let [(_, raw), _, _, (track, _), (_, minute), (second, frame)] =
            self.read_words::<6>(PacketCommand::ReadSubChannel, 0)?;
        self.sequencer.drain()?;

        let status = AudioStatus::from_raw(raw);
        if raw == 0x13 {
            log::debug!("Sub-channel: play completed, treating as stopped");
        }

        self.state.audio_status = status;
        self.state.current_track = track;
        self.state.position = Msf::new(minute, second, frame);
        Ok(status)
    }

    /// Check the loaded medium with MODE SENSE
    pub fn check_disc(&mut self) -> Result<DiscCheck> {
        self.send(PacketCommand::ModeSense)?;
        self.sequencer.await_data()?;

        // Mode data length, then medium type
        let [_, (medium, _)] = self.read_words::<2>(PacketCommand::ModeSense, 0)?;
        self.sequencer.drain()?;

        let check = DiscCheck::from_medium_type(medium);
        log::debug!("Medium type 0x{:02X}: {:?}", medium, check);
        Ok(check)
    }

    /// Skip to the next track, wrapping to the first
    pub fn next_track(&mut self) -> Result<()> {
        let track = self.state.next_track();
        self.seek_track(track)
    }

    /// Skip to the previous track, wrapping to the last
    pub fn prev_track(&mut self) -> Result<()> {
        let track = self.state.prev_track();
        self.seek_track(track)
    }

    /// Start playing `track`, keeping the drive paused if it was not playing
    fn seek_track(&mut self, track: u8) -> Result<()> {
        let was = self.state.audio_status;
        self.state.current_track = track;

        self.read_toc()?;
        if let Some(destination) = self.state.destination {
            self.state.play_from = destination;
        } else {
            log::warn!("Track {} not found in TOC", track);
        }

        self.play()?;
        if matches!(was, AudioStatus::Paused | AudioStatus::Stopped) {
            self.pause()?;
        }
        Ok(())
    }

    /// Periodic status refresh
    ///
    /// Reads the sub-channel and, when the drive is stopped with a stale
    /// TOC, re-reads the TOC.
    pub fn refresh(&mut self) -> Result<Refresh> {
        let status = self.read_subchannel()?;
        let mut toc_loaded = false;

        if status == AudioStatus::Stopped && !self.state.toc_valid {
            self.read_toc()?;
            self.state.toc_valid = true;
            toc_loaded = true;
        }
        Ok(Refresh { status, toc_loaded })
    }

    /// Decode and log the status register
    pub fn check_device_status(&mut self) -> Result<DeviceStatus> {
        let status = self.sequencer.status()?;
        for line in status.describe() {
            log::info!("{}", line);
        }

        let error = if status.contains(StatusFlags::ERR) {
            let error = self
                .sequencer
                .bridge_mut()
                .read_byte(TaskRegister::ErrorFeature)?;
            log::info!("Error register: 0x{:02X}", error);
            Some(error)
        } else {
            None
        };

        Ok(DeviceStatus { status, error })
    }
}
