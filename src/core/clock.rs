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

//! Time source for delays and wait deadlines
//!
//! The drive needs fixed settle delays (reset pulse, packet settle) and
//! every status wait carries a deadline. Both go through the [`Clock`]
//! trait so the whole transport can run against a [`ManualClock`] in tests
//! without sleeping.

use std::cell::Cell;
use std::time::{Duration, Instant};

/// Monotonic time source with blocking delays
pub trait Clock {
    /// Time elapsed since the clock was created
    fn now(&self) -> Duration;

    /// Block for the given duration
    fn sleep(&mut self, duration: Duration);

    /// Block for the given number of milliseconds
    fn sleep_ms(&mut self, ms: u64) {
        if ms > 0 {
            self.sleep(Duration::from_millis(ms));
        }
    }
}

/// Wall-clock time backed by [`Instant`] and [`std::thread::sleep`]
#[derive(Debug, Clone, Copy)]
pub struct SystemClock {
    start: Instant,
}

impl SystemClock {
    pub fn new() -> Self {
        Self {
            start: Instant::now(),
        }
    }
}

impl Default for SystemClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for SystemClock {
    fn now(&self) -> Duration {
        self.start.elapsed()
    }

    fn sleep(&mut self, duration: Duration) {
        std::thread::sleep(duration);
    }
}

/// Simulated clock that never blocks
///
/// `sleep` advances time instantly, and every call to `now` advances it by
/// a fixed step, so a poll loop that reads the clock always makes progress
/// toward its deadline.
///
/// # Example
///
/// ```
/// use std::time::Duration;
/// use atapi_cd::core::clock::{Clock, ManualClock};
///
/// let mut clock = ManualClock::new(Duration::from_millis(1));
/// clock.sleep(Duration::from_secs(5));
/// assert!(clock.now() >= Duration::from_secs(5));
/// ```
#[derive(Debug, Default)]
pub struct ManualClock {
    elapsed: Cell<Duration>,
    step: Duration,
}

impl ManualClock {
    /// Create a clock that advances by `step` on every read
    pub fn new(step: Duration) -> Self {
        Self {
            elapsed: Cell::new(Duration::ZERO),
            step,
        }
    }

    /// Total simulated time, without advancing it
    pub fn elapsed(&self) -> Duration {
        self.elapsed.get()
    }

    /// Advance simulated time
    pub fn advance(&self, duration: Duration) {
        self.elapsed.set(self.elapsed.get() + duration);
    }
}

impl Clock for ManualClock {
    fn now(&self) -> Duration {
        self.advance(self.step);
        self.elapsed.get()
    }

    fn sleep(&mut self, duration: Duration) {
        self.advance(duration);
    }
}
