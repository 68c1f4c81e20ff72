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

//! Audio disc model for the simulated drive

use crate::core::msf::Msf;
use crate::core::transport::LEAD_OUT_TRACK;

/// Highest track number a disc can carry
pub const MAX_TRACKS: usize = 99;

/// An audio CD: track start positions and lead-out
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SimDisc {
    first_track: u8,
    starts: Vec<Msf>,
    lead_out: Msf,
}

impl SimDisc {
    /// Disc with explicit track starts, numbered from `first_track`
    pub fn new(first_track: u8, starts: Vec<Msf>, lead_out: Msf) -> Self {
        Self {
            first_track,
            starts,
            lead_out,
        }
    }

    /// Disc with consecutive tracks of the given lengths in seconds
    ///
    /// The first track starts after the 2-second pregap. Tracks past
    /// [`MAX_TRACKS`] are ignored and minutes are clamped to 99.
    pub fn audio(track_seconds: &[u32]) -> Self {
        let mut frames = Msf::new(0, 2, 0).to_frames();
        let mut starts = Vec::with_capacity(track_seconds.len().min(MAX_TRACKS));
        for seconds in track_seconds.iter().take(MAX_TRACKS) {
            starts.push(Msf::from_frames(frames));
            frames = frames.saturating_add(seconds.saturating_mul(75));
        }
        Self::new(1, starts, Msf::from_frames(frames))
    }

    pub fn first_track(&self) -> u8 {
        self.first_track
    }

    pub fn last_track(&self) -> u8 {
        self.track_number(self.starts.len().saturating_sub(1))
    }

    pub fn lead_out(&self) -> Msf {
        self.lead_out
    }

    /// Start position of a track
    pub fn track_start(&self, track: u8) -> Option<Msf> {
        let index = track.checked_sub(self.first_track)? as usize;
        self.starts.get(index).copied()
    }

    /// Track containing `position`
    pub fn track_at(&self, position: Msf) -> u8 {
        let index = self
            .starts
            .iter()
            .rposition(|start| *start <= position)
            .unwrap_or(0);
        self.track_number(index)
    }

    fn track_number(&self, index: usize) -> u8 {
        let index = u8::try_from(index).unwrap_or(u8::MAX);
        self.first_track.saturating_add(index)
    }

    /// READ TOC response, format 0 with MSF addresses
    ///
    /// ```text
    /// 0-1  TOC data length
    /// 2    first track
    /// 3    last track
    /// then per track and for the lead-out (track 0xAA):
    /// 0    reserved
    /// 1    ADR/control
    /// 2    track number
    /// 3    reserved
    /// 4-7  0, M, S, F
    /// ```
    pub fn toc_response(&self) -> Vec<u8> {
        let descriptors = self.starts.len() + 1;
        let length = (2 + descriptors * 8) as u16;

        let mut data = Vec::with_capacity(4 + descriptors * 8);
        data.extend_from_slice(&length.to_be_bytes());
        data.push(self.first_track);
        data.push(self.last_track());

        let tracks = self
            .starts
            .iter()
            .enumerate()
            .map(|(i, start)| (self.track_number(i), *start))
            .chain(std::iter::once((LEAD_OUT_TRACK, self.lead_out)));

        for (number, start) in tracks {
            data.extend_from_slice(&[0x00, 0x10, number, 0x00]);
            data.push(0x00);
            data.extend_from_slice(&start.to_bytes());
        }
        data
    }
}
