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

//! Front-panel buttons and their console key mapping
//!
//! The panel has five push buttons. On the console each one is reachable
//! by its full name or a single key, case-insensitive:
//!
//! | Button | Keys        |
//! |--------|-------------|
//! | Next   | `n`, `next` |
//! | Eject  | `e`, `eject`|
//! | Stop   | `s`, `stop` |
//! | Play   | `p`, `play` |
//! | Prev   | `b`, `prev` |

use std::fmt;
use std::str::FromStr;

use thiserror::Error;

/// Front-panel push button
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Button {
    Next,
    Eject,
    Stop,
    /// Play / pause toggle
    Play,
    Prev,
}

impl Button {
    /// Every button, in panel order
    pub const ALL: [Button; 5] = [
        Button::Next,
        Button::Eject,
        Button::Stop,
        Button::Play,
        Button::Prev,
    ];

    /// Single-key shortcut
    pub const fn key(self) -> char {
        match self {
            Button::Next => 'n',
            Button::Eject => 'e',
            Button::Stop => 's',
            Button::Play => 'p',
            Button::Prev => 'b',
        }
    }

    /// Button name for display
    pub const fn name(self) -> &'static str {
        match self {
            Button::Next => "NEXT",
            Button::Eject => "EJECT",
            Button::Stop => "STOP",
            Button::Play => "PLAY",
            Button::Prev => "PREV",
        }
    }
}

impl fmt::Display for Button {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Input that names no button
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown button: {0:?}")]
pub struct UnknownButton(pub String);

impl FromStr for Button {
    type Err = UnknownButton;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let input = s.trim().to_ascii_lowercase();
        Button::ALL
            .into_iter()
            .find(|button| {
                input == button.name().to_ascii_lowercase()
                    || input.chars().eq(std::iter::once(button.key()))
            })
            .ok_or_else(|| UnknownButton(s.trim().to_string()))
    }
}

/// Usage line listing every key
pub fn key_help() -> String {
    Button::ALL
        .iter()
        .map(|button| format!("{}={}", button.key(), button.name().to_ascii_lowercase()))
        .collect::<Vec<_>>()
        .join("  ")
}
