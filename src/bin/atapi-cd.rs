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

//! atapi-cd entry point
//!
//! Runs the front-panel player against a simulated drive. Buttons are read
//! from stdin, one per line (`n`, `e`, `s`, `p`, `b`); `q` quits.

use std::io::BufRead;
use std::path::PathBuf;
use std::sync::mpsc::{self, Receiver, TryRecvError};
use std::thread;
use std::time::Duration;

use atapi_cd::core::clock::SystemClock;
use atapi_cd::core::config::Config;
use atapi_cd::core::sim::{SimDisc, SimulatedDrive, MAX_TRACKS};
use atapi_cd::core::transport::Transport;
use atapi_cd::frontend::{input, Button, Player, StdoutConsole};
use clap::Parser;

/// Polling period of the control loop when no button is pending
const IDLE_POLL: Duration = Duration::from_millis(10);

#[derive(Parser, Debug)]
#[command(name = "atapi-cd", version, about = "ATAPI CD-ROM audio player over I2C expanders")]
struct Args {
    /// TOML configuration file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Track lengths in seconds of the simulated disc
    #[arg(
        long,
        value_delimiter = ',',
        default_value = "215,187,242,198,263",
        value_parser = clap::value_parser!(u32).range(1..=5999)
    )]
    tracks: Vec<u32>,

    /// Skip the drive's settle and spin-up delays
    #[arg(long)]
    fast: bool,

    /// Write the effective configuration to this path and exit
    #[arg(long, value_name = "PATH")]
    write_config: Option<PathBuf>,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenvy::dotenv().ok();

    // Initialize logging
    env_logger::Builder::from_default_env()
        .filter_level(log::LevelFilter::Info)
        .parse_default_env()
        .init();

    let args = Args::parse();

    let mut config = match &args.config {
        Some(path) => {
            log::info!("Config: {}", path.display());
            Config::load(path)?
        }
        None => Config::default(),
    };
    if args.fast {
        config.timing = config.timing.without_delays();
    }

    if let Some(path) = &args.write_config {
        config.save(path)?;
        log::info!("Wrote configuration to {}", path.display());
        return Ok(());
    }

    if args.tracks.len() > MAX_TRACKS {
        return Err(format!("a disc holds at most {} tracks", MAX_TRACKS).into());
    }

    log::info!("Starting atapi-cd ({} tracks)", args.tracks.len());
    let drive = SimulatedDrive::with_disc(config.bus.into(), SimDisc::audio(&args.tracks));
    let transport = Transport::new(drive, SystemClock::new(), &config);
    let mut player = Player::new(transport, config.player);
    player.start()?;

    println!("{}  q=quit", input::key_help());
    let buttons = spawn_button_reader();
    let mut console = StdoutConsole;

    loop {
        let button = match buttons.try_recv() {
            Ok(button) => Some(button),
            Err(TryRecvError::Empty) => None,
            Err(TryRecvError::Disconnected) => break,
        };

        if let Err(e) = player.step(button, &mut console) {
            log::error!("{}", e);
        }
        if button.is_none() {
            thread::sleep(IDLE_POLL);
        }
    }

    log::info!("Exiting");
    Ok(())
}

/// Read button presses from stdin on a helper thread
///
/// The channel disconnects on `q` or end of input.
fn spawn_button_reader() -> Receiver<Button> {
    let (tx, rx) = mpsc::channel();

    thread::spawn(move || {
        let stdin = std::io::stdin();
        for line in stdin.lock().lines() {
            let Ok(line) = line else { break };
            let line = line.trim();
            if line.eq_ignore_ascii_case("q") {
                break;
            }
            if line.is_empty() {
                continue;
            }
            match line.parse::<Button>() {
                Ok(button) => {
                    if tx.send(button).is_err() {
                        break;
                    }
                }
                Err(e) => eprintln!("{} ({})", e, input::key_help()),
            }
        }
    });

    rx
}
