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

//! atapi-cd: an ATAPI CD-ROM audio transport over I2C I/O expanders
//!
//! An IDE/ATAPI drive's 16-bit task-file interface is rebuilt from three
//! 8-bit PCF8574-style expanders: one for data bits 0-7, one for data bits
//! 8-15 and one carrying the register select and strobe lines. On top of
//! that this crate runs the ATAPI PACKET protocol and drives the disc as an
//! audio CD player.
//!
//! # Architecture
//!
//! - [`core`]: register bridge, status waits, packet sequencer, transport
//!   control and a simulated drive
//! - [`frontend`]: front-panel buttons and the player loop
//!
//! # Example
//!
//! ```
//! use std::time::Duration;
//! use atapi_cd::core::clock::ManualClock;
//! use atapi_cd::core::config::Config;
//! use atapi_cd::core::sim::{SimDisc, SimulatedDrive};
//! use atapi_cd::core::transport::{DiscCheck, Transport};
//!
//! let config = Config::default();
//! let drive = SimulatedDrive::with_disc(config.bus.into(), SimDisc::audio(&[240]));
//! let mut transport = Transport::new(drive, ManualClock::new(Duration::from_millis(1)), &config);
//!
//! transport.initialize()?;
//! assert_eq!(transport.check_disc()?, DiscCheck::DiscPresent);
//! # Ok::<(), atapi_cd::AtapiError>(())
//! ```
//!
//! # Getting Started
//!
//! 1. Implement [`core::bus::TwoWire`] for the I2C master
//! 2. Create a [`core::transport::Transport`] over it
//! 3. Call [`core::transport::Transport::initialize`], then drive it
//!    directly or through [`frontend::Player`]
//!
//! # Error Handling
//!
//! All fallible operations return [`core::error::Result<T>`] which is an alias for
//! `Result<T, AtapiError>`.

pub mod core;
pub mod frontend;

// Re-export commonly used types
pub use core::error::{AtapiError, Result};
