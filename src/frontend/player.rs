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

//! Front-panel CD player
//!
//! [`Player`] turns button presses into transport commands and, every
//! refresh interval, reads the drive's audio status and reports it on a
//! [`Console`]. It is driven by repeatedly calling [`Player::step`]:
//!
//! ```
//! use std::time::Duration;
//! use atapi_cd::core::clock::ManualClock;
//! use atapi_cd::core::config::Config;
//! use atapi_cd::core::sim::{SimDisc, SimulatedDrive};
//! use atapi_cd::core::transport::Transport;
//! use atapi_cd::frontend::{Button, Player, StatusLine};
//!
//! let config = Config::default();
//! let drive = SimulatedDrive::with_disc(config.bus.into(), SimDisc::audio(&[180, 200]));
//! let transport = Transport::new(drive, ManualClock::new(Duration::from_millis(1)), &config);
//! let mut player = Player::new(transport, config.player);
//! let mut lines: Vec<StatusLine> = Vec::new();
//!
//! player.start()?;
//! player.step(None, &mut lines)?;
//! player.step(Some(Button::Play), &mut lines)?;
//! # Ok::<(), atapi_cd::core::error::AtapiError>(())
//! ```

use std::fmt;
use std::time::Duration;

use super::input::Button;
use crate::core::bus::TwoWire;
use crate::core::clock::Clock;
use crate::core::config::PlayerConfig;
use crate::core::error::Result;
use crate::core::msf::Msf;
use crate::core::transport::{AudioStatus, DiscCheck, StartupReport, Transport};

/// One status report for the display
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusLine {
    /// Tray opening
    Open,
    /// Tray closing
    Load,
    Playing { track: u8, position: Msf },
    Paused { track: u8, position: Msf },
    /// Track range and total time, shown after a fresh TOC read
    DiscInfo { first: u8, last: u8, total: Msf },
    NoDisc,
}

impl fmt::Display for StatusLine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StatusLine::Open => write!(f, "OPEN"),
            StatusLine::Load => write!(f, "LOAD"),
            StatusLine::Playing { track, position } => {
                write!(f, "PLAY   {:>2}  {}:{:02}", track, position.minute, position.second)
            }
            StatusLine::Paused { track, position } => {
                write!(f, "PAUSE  {:>2}  {}:{:02}", track, position.minute, position.second)
            }
            StatusLine::DiscInfo { first, last, total } => write!(
                f,
                "Tracks  {}-{}\nTime   {}:{:02}",
                first, last, total.minute, total.second
            ),
            StatusLine::NoDisc => write!(f, "NO DISC"),
        }
    }
}

/// Sink for status lines
pub trait Console {
    fn show(&mut self, line: StatusLine);
}

/// Collects lines in memory
impl Console for Vec<StatusLine> {
    fn show(&mut self, line: StatusLine) {
        self.push(line);
    }
}

/// Prints each line to stdout
#[derive(Debug, Default)]
pub struct StdoutConsole;

impl Console for StdoutConsole {
    fn show(&mut self, line: StatusLine) {
        println!("{}", line);
    }
}

/// Button handling and periodic status display over a [`Transport`]
pub struct Player<B: TwoWire, C: Clock> {
    transport: Transport<B, C>,
    refresh_interval: Duration,
    last_refresh: Option<Duration>,
}

impl<B: TwoWire, C: Clock> Player<B, C> {
    pub fn new(transport: Transport<B, C>, config: PlayerConfig) -> Self {
        Self {
            transport,
            refresh_interval: config.refresh_interval(),
            last_refresh: None,
        }
    }

    pub fn transport(&self) -> &Transport<B, C> {
        &self.transport
    }

    pub fn transport_mut(&mut self) -> &mut Transport<B, C> {
        &mut self.transport
    }

    /// Bring the drive up
    pub fn start(&mut self) -> Result<StartupReport> {
        let report = self.transport.initialize()?;
        log::info!(
            "Player ready: {} ({}-byte packets)",
            report.identity.model,
            report.identity.packet_length.bytes()
        );
        Ok(report)
    }

    /// Handle at most one button press, then refresh if the interval passed
    pub fn step(&mut self, button: Option<Button>, console: &mut impl Console) -> Result<()> {
        if let Some(button) = button {
            log::debug!("Button: {}", button);
            self.press(button, console)?;
        }

        let now = self.transport.clock().now();
        let due = self
            .last_refresh
            .is_none_or(|last| now.saturating_sub(last) >= self.refresh_interval);
        if due {
            self.refresh(console)?;
            self.last_refresh = Some(self.transport.clock().now());
        }
        Ok(())
    }

    /// Act on one button press
    pub fn press(&mut self, button: Button, console: &mut impl Console) -> Result<()> {
        match button {
            Button::Eject => {
                self.transport.invalidate_toc();
                match self.transport.check_disc()? {
                    DiscCheck::DiscPresent | DiscCheck::NoDisc => {
                        console.show(StatusLine::Open);
                        self.transport.eject()?;
                    }
                    DiscCheck::TrayOpen => {
                        console.show(StatusLine::Load);
                        self.transport.load()?;
                    }
                }
                self.rewind();
            }
            Button::Stop => {
                self.rewind();
                self.transport.stop_disc()?;
                self.transport.stop_unit()?;
                self.transport.invalidate_toc();
            }
            Button::Play => {
                match self.transport.state().audio_status {
                    AudioStatus::Stopped => self.transport.play()?,
                    AudioStatus::Paused => self.transport.resume()?,
                    AudioStatus::Playing => self.transport.pause()?,
                    AudioStatus::NoDisc => {}
                }
                // The disc may be swapped with the drive's own eject button
                self.transport.invalidate_toc();
            }
            Button::Next => self.transport.next_track()?,
            Button::Prev => self.transport.prev_track()?,
        }
        Ok(())
    }

    /// Read the audio status and report it
    pub fn refresh(&mut self, console: &mut impl Console) -> Result<()> {
        let refresh = self.transport.refresh()?;
        let state = self.transport.state();

        match refresh.status {
            AudioStatus::Playing => console.show(StatusLine::Playing {
                track: state.current_track,
                position: state.position,
            }),
            AudioStatus::Paused => console.show(StatusLine::Paused {
                track: state.current_track,
                position: state.position,
            }),
            AudioStatus::Stopped if refresh.toc_loaded => console.show(StatusLine::DiscInfo {
                first: state.start_track,
                last: state.end_track,
                total: state.total_time(),
            }),
            AudioStatus::Stopped => {}
            AudioStatus::NoDisc => console.show(StatusLine::NoDisc),
        }
        Ok(())
    }

    fn rewind(&mut self) {
        let start = self.transport.state().start_track;
        self.transport.set_current_track(start);
    }
}
