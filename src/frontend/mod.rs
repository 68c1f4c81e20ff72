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

//! Front panel: buttons, status display and the player loop
//!
//! - [`Button`]: the five panel buttons and their console keys
//! - [`Player`]: maps button presses to transport commands and reports
//!   the audio status on a [`Console`]

pub mod input;
pub mod player;

pub use input::{Button, UnknownButton};
pub use player::{Console, Player, StatusLine, StdoutConsole};
