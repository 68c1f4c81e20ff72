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

//! MSF (Minute:Second:Frame) addressing
//!
//! Audio CD positions are expressed in MSF with 75 frames per second.
//! Values are plain binary, as returned by READ TOC and READ SUB-CHANNEL
//! with the MSF bit set (not BCD).

use std::fmt;

/// Frames per second of CD audio
pub const FRAMES_PER_SECOND: u32 = 75;

/// Frames in the 2-second pregap before LBA 0
pub const PREGAP_FRAMES: u32 = 150;

/// A CD position in MSF format
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Msf {
    /// Minute (0-99)
    pub minute: u8,
    /// Second (0-59)
    pub second: u8,
    /// Frame (0-74)
    pub frame: u8,
}

impl Msf {
    /// Create a new position
    pub const fn new(minute: u8, second: u8, frame: u8) -> Self {
        Self {
            minute,
            second,
            frame,
        }
    }

    /// Absolute frame count from 00:00:00
    pub fn to_frames(self) -> u32 {
        (self.minute as u32 * 60 + self.second as u32) * FRAMES_PER_SECOND + self.frame as u32
    }

    /// Position from an absolute frame count
    pub fn from_frames(frames: u32) -> Self {
        let minute = (frames / FRAMES_PER_SECOND / 60).min(99) as u8;
        let second = ((frames / FRAMES_PER_SECOND) % 60) as u8;
        let frame = (frames % FRAMES_PER_SECOND) as u8;
        Self::new(minute, second, frame)
    }

    /// Convert MSF to logical block address
    ///
    /// LBA = (minute * 60 + second) * 75 + frame - 150
    pub fn to_lba(self) -> i32 {
        self.to_frames() as i32 - PREGAP_FRAMES as i32
    }

    /// Convert a logical block address to MSF
    pub fn from_lba(lba: i32) -> Self {
        Self::from_frames((lba + PREGAP_FRAMES as i32).max(0) as u32)
    }

    /// The position as the three bytes used in command packets
    pub fn to_bytes(self) -> [u8; 3] {
        [self.minute, self.second, self.frame]
    }
}

impl fmt::Display for Msf {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:02}:{:02}:{:02}", self.minute, self.second, self.frame)
    }
}
