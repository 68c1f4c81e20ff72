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

//! Core driver components
//!
//! Layered bottom-up: [`bus`] (two-wire expanders) → [`bridge`] (task-file
//! registers) → [`status`] (bounded waits) → [`packet`] (command packets
//! and the PACKET protocol) → [`transport`] (audio CD control).
//! [`sim`] provides a drive to run all of it against.

pub mod bridge;
pub mod bus;
pub mod clock;
pub mod config;
pub mod error;
pub mod msf;
pub mod packet;
pub mod sim;
pub mod status;
pub mod transport;
