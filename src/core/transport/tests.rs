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

//! Transport tests against the simulated drive

use std::time::Duration;

use super::*;
use crate::core::bus::Expanders;
use crate::core::clock::ManualClock;
use crate::core::error::{AtapiError, WaitCondition};
use crate::core::sim::{asc, audio, SimDisc, SimulatedDrive};
use crate::core::status::StatusFlags;

type SimTransport = Transport<SimulatedDrive, ManualClock>;

fn five_tracks() -> SimDisc {
    SimDisc::audio(&[200, 180, 240, 150, 210])
}

fn transport_with(drive: SimulatedDrive) -> SimTransport {
    Transport::new(
        drive,
        ManualClock::new(Duration::from_millis(1)),
        &Config::default(),
    )
}

fn transport(disc: Option<SimDisc>) -> SimTransport {
    let mut drive = SimulatedDrive::new(Expanders::default());
    drive.device_mut().set_disc(disc);
    transport_with(drive)
}

/// Initialized transport with a loaded disc
fn ready(disc: SimDisc) -> SimTransport {
    let mut transport = transport(Some(disc));
    transport.initialize().unwrap();
    transport
}

fn device(transport: &SimTransport) -> &crate::core::sim::AtapiDevice {
    transport.bus().device()
}

// Startup

#[test]
fn test_initialize_reports_identity() {
    let mut transport = transport(Some(five_tracks()));
    transport.bus_mut().device_mut().set_model("ACME CDR-42");

    let report = transport.initialize().unwrap();
    assert_eq!(report.diagnostic, DiagnosticResult::Passed);
    assert_eq!(report.identity.model, "ACME CDR-42");
    assert_eq!(report.identity.packet_length, PacketLength::Twelve);
    assert!(!report.identity.timed_out);
    assert_eq!(report.asc, asc::NONE);
    assert_eq!(transport.identity(), Some(&report.identity));
}

#[test]
fn test_initialize_programs_task_file() {
    let transport = ready(five_tracks());
    assert_eq!(device(&transport).feature(), 0x00);
    // Last Device Control write is the nIEN of the final packet
    assert_eq!(device(&transport).device_control(), 0x0A);
}

#[test]
fn test_sixteen_byte_packets_negotiated() {
    let mut transport = transport(Some(five_tracks()));
    transport
        .bus_mut()
        .device_mut()
        .set_packet_length(PacketLength::Sixteen);

    let report = transport.initialize().unwrap();
    assert_eq!(report.identity.packet_length, PacketLength::Sixteen);
    assert_eq!(transport.packet_length(), PacketLength::Sixteen);

    transport.read_toc().unwrap();
    let packets = device(&transport).received_packets();
    assert!(!packets.is_empty());
    assert!(packets.iter().all(|packet| packet.len() == 16));
}

#[test]
fn test_twelve_byte_packets_by_default() {
    let transport = ready(five_tracks());
    assert_eq!(transport.packet_length(), PacketLength::Twelve);
    assert!(device(&transport)
        .received_packets()
        .iter()
        .all(|packet| packet.len() == 12));
}

#[test]
fn test_bad_signature_is_fatal() {
    let mut transport = transport(Some(five_tracks()));
    transport.bus_mut().device_mut().set_signature(0x00, 0x00);

    match transport.initialize() {
        Err(AtapiError::NotAtapi { low, high }) => {
            assert_eq!((low, high), (0x00, 0x00));
        }
        other => panic!("expected NotAtapi, got {other:?}"),
    }
}

#[test]
fn test_alternate_signature_accepted() {
    let mut transport = transport(Some(five_tracks()));
    transport.bus_mut().device_mut().set_signature(0x69, 0x96);
    assert!(transport.initialize().is_ok());
}

#[test]
fn test_diagnostic_failure_is_not_fatal() {
    let mut transport = transport(Some(five_tracks()));
    transport.bus_mut().device_mut().set_diagnostic_passes(false);

    let report = transport.initialize().unwrap();
    assert_eq!(report.diagnostic, DiagnosticResult::Failed(0x00));
}

#[test]
fn test_identify_timeout_is_not_fatal() {
    let mut transport = transport(Some(five_tracks()));
    transport.bus_mut().device_mut().set_identify_stalls(true);

    let report = transport.initialize().unwrap();
    assert!(report.identity.timed_out);
    assert_eq!(report.identity.model, "SIMULATED CD-ROM");
    assert_eq!(report.asc, asc::NONE);
}

#[test]
fn test_ready_loop_waits_for_spin_up() {
    let mut transport = transport(Some(five_tracks()));
    transport.bus_mut().device_mut().set_spin_up_probes(3);

    let report = transport.initialize().unwrap();
    assert_eq!(report.asc, asc::NONE);

    // Reset probe, follow-up probe, then three "not ready" retries
    let probes = device(&transport)
        .received_opcodes()
        .iter()
        .filter(|&&opcode| opcode == 0x00)
        .count();
    assert_eq!(probes, 5);
}

#[test]
fn test_ready_loop_probes_after_reset_check() {
    let mut transport = transport(Some(five_tracks()));

    let report = transport.initialize().unwrap();
    assert_eq!(report.asc, asc::NONE);

    // Reset probe, follow-up probe, then one readiness probe
    let probes = device(&transport)
        .received_opcodes()
        .iter()
        .filter(|&&opcode| opcode == 0x00)
        .count();
    assert_eq!(probes, 3);
}

#[test]
fn test_ready_loop_times_out() {
    let mut transport = transport(Some(five_tracks()));
    transport.bus_mut().device_mut().set_spin_up_probes(u32::MAX);

    match transport.initialize() {
        Err(AtapiError::Timeout { condition, .. }) => {
            assert_eq!(condition, WaitCondition::UnitReady);
        }
        other => panic!("expected timeout, got {other:?}"),
    }
}

#[test]
fn test_ready_without_disc_reports_medium_absent() {
    let mut transport = transport(None);
    let report = transport.initialize().unwrap();
    assert_eq!(report.asc, asc::MEDIUM_NOT_PRESENT);
    assert_eq!(transport.state().asc, asc::MEDIUM_NOT_PRESENT);
}

#[test]
fn test_absent_device_times_out() {
    let mut drive = SimulatedDrive::new(Expanders::default());
    drive.set_present(false);
    let mut transport = transport_with(drive);

    match transport.initialize() {
        Err(AtapiError::Timeout { condition, .. }) => {
            assert_eq!(condition, WaitCondition::BusyClear);
        }
        other => panic!("expected timeout, got {other:?}"),
    }
}

// Table of contents

#[test]
fn test_read_toc_lead_out() {
    let disc = SimDisc::new(
        1,
        vec![Msf::new(0, 2, 0), Msf::new(20, 0, 0), Msf::new(31, 40, 0)],
        Msf::new(45, 12, 0),
    );
    let mut transport = ready(disc);
    transport.read_toc().unwrap();

    let state = transport.state();
    assert_eq!(state.lead_out, Msf::new(45, 12, 0));
    assert_eq!((state.total_time().minute, state.total_time().second), (45, 12));
    assert_eq!((state.start_track, state.end_track), (1, 3));
    assert_eq!(state.play_from, Msf::new(0, 2, 0));
    assert_eq!(state.destination, Some(Msf::new(0, 2, 0)));
}

#[test]
fn test_read_toc_resolves_current_track() {
    let disc = five_tracks();
    let third = disc.track_start(3).unwrap();
    let mut transport = ready(disc);

    transport.set_current_track(3);
    transport.read_toc().unwrap();
    assert_eq!(transport.state().destination, Some(third));
}

#[test]
fn test_read_toc_without_disc_times_out() {
    let mut transport = transport(None);
    transport.initialize().unwrap();

    let err = transport.read_toc().unwrap_err();
    assert!(matches!(
        err,
        AtapiError::Timeout {
            condition: WaitCondition::DrqSet,
            ..
        }
    ));
}

// Playback

#[test]
fn test_play_pause_resume_stop() {
    let mut transport = ready(five_tracks());
    transport.read_toc().unwrap();

    transport.play().unwrap();
    assert_eq!(device(&transport).audio_status(), audio::PLAYING);
    assert_eq!(device(&transport).position(), Msf::new(0, 2, 0));
    assert_eq!(
        device(&transport).play_end(),
        five_tracks().lead_out()
    );

    transport.pause().unwrap();
    assert_eq!(device(&transport).audio_status(), audio::PAUSED);
    assert_eq!(transport.read_subchannel().unwrap(), AudioStatus::Paused);

    transport.resume().unwrap();
    assert_eq!(device(&transport).audio_status(), audio::PLAYING);

    transport.stop_disc().unwrap();
    assert_eq!(transport.read_subchannel().unwrap(), AudioStatus::Stopped);
}

#[test]
fn test_read_subchannel_position() {
    let disc = five_tracks();
    let second = disc.track_start(2).unwrap();
    let mut transport = ready(disc);
    transport.read_toc().unwrap();

    transport.next_track().unwrap();
    assert_eq!(transport.read_subchannel().unwrap(), AudioStatus::Playing);
    assert_eq!(transport.state().current_track, 2);
    assert_eq!(transport.state().position, second);
}

#[test]
fn test_completed_play_reads_as_stopped() {
    let mut transport = ready(SimDisc::audio(&[4]));
    transport.read_toc().unwrap();
    transport.bus_mut().device_mut().set_play_step(75 * 60);
    transport.play().unwrap();

    assert_eq!(transport.read_subchannel().unwrap(), AudioStatus::Playing);
    assert_eq!(device(&transport).audio_status(), audio::COMPLETED);
    assert_eq!(transport.read_subchannel().unwrap(), AudioStatus::Stopped);
    assert_eq!(transport.state().audio_status.raw(), 0x15);
}

#[test]
fn test_subchannel_completed_normalizes_to_stopped() {
    let mut transport = ready(five_tracks());
    transport
        .bus_mut()
        .device_mut()
        .set_audio_status_override(Some(0x13));

    assert_eq!(transport.read_subchannel().unwrap(), AudioStatus::Stopped);
    assert_eq!(transport.state().audio_status.raw(), 0x15);
}

#[test]
fn test_subchannel_unknown_status_is_no_disc() {
    let mut transport = ready(five_tracks());
    transport
        .bus_mut()
        .device_mut()
        .set_audio_status_override(Some(0x14));
    assert_eq!(transport.read_subchannel().unwrap(), AudioStatus::NoDisc);
}

#[test]
fn test_subchannel_with_tray_open_is_no_disc() {
    let mut transport = ready(five_tracks());
    transport.eject().unwrap();
    assert_eq!(transport.read_subchannel().unwrap(), AudioStatus::NoDisc);
    assert_eq!(transport.state().audio_status, AudioStatus::NoDisc);
}

#[test]
fn test_eject_and_load() {
    let mut transport = ready(five_tracks());
    transport.read_toc().unwrap();
    transport.refresh().unwrap();
    assert!(transport.state().toc_valid);

    transport.eject().unwrap();
    assert!(device(&transport).tray_open());
    assert!(!transport.state().toc_valid);
    assert_eq!(transport.check_disc().unwrap(), DiscCheck::TrayOpen);

    transport.load().unwrap();
    assert!(!device(&transport).tray_open());
    assert_eq!(transport.check_disc().unwrap(), DiscCheck::DiscPresent);
}

#[test]
fn test_truncated_subchannel_response() {
    let mut transport = ready(five_tracks());
    transport.bus_mut().device_mut().set_response_limit(Some(3));

    match transport.read_subchannel() {
        Err(AtapiError::ResponseTruncated { command, words }) => {
            assert_eq!(command, "READ SUB-CHANNEL");
            assert_eq!(words, 3);
        }
        other => panic!("expected truncated response, got {other:?}"),
    }
}

#[test]
fn test_check_disc_medium_types() {
    let mut transport = ready(five_tracks());
    let cases = [
        (0x02, DiscCheck::DiscPresent),
        (0x26, DiscCheck::DiscPresent),
        (0x71, DiscCheck::TrayOpen),
        (0x70, DiscCheck::NoDisc),
        (0x01, DiscCheck::NoDisc),
    ];

    for (medium, expected) in cases {
        transport
            .bus_mut()
            .device_mut()
            .set_medium_type_override(Some(medium));
        assert_eq!(transport.check_disc().unwrap(), expected, "medium 0x{medium:02X}");
    }
}

// Track navigation

#[test]
fn test_next_wraps_to_first() {
    let disc = five_tracks();
    let first = disc.track_start(1).unwrap();
    let mut transport = ready(disc);
    transport.read_toc().unwrap();

    transport.set_current_track(5);
    transport.next_track().unwrap();
    assert_eq!(transport.state().current_track, 1);
    assert_eq!(device(&transport).position(), first);
    assert_eq!(device(&transport).audio_status(), audio::PLAYING);
}

#[test]
fn test_prev_wraps_to_last() {
    let disc = five_tracks();
    let last = disc.track_start(5).unwrap();
    let mut transport = ready(disc);
    transport.read_toc().unwrap();

    transport.set_current_track(1);
    transport.prev_track().unwrap();
    assert_eq!(transport.state().current_track, 5);
    assert_eq!(device(&transport).position(), last);
}

#[test]
fn test_skip_while_paused_stays_paused() {
    let disc = five_tracks();
    let second = disc.track_start(2).unwrap();
    let mut transport = ready(disc);
    transport.read_toc().unwrap();
    transport.play().unwrap();
    transport.pause().unwrap();
    assert_eq!(transport.read_subchannel().unwrap(), AudioStatus::Paused);

    transport.next_track().unwrap();
    assert_eq!(device(&transport).position(), second);
    assert_eq!(device(&transport).audio_status(), audio::PAUSED);
}

#[test]
fn test_track_wrap_arithmetic() {
    let mut state = TransportState {
        start_track: 1,
        end_track: 5,
        current_track: 5,
        ..Default::default()
    };
    assert_eq!(state.next_track(), 1);
    state.current_track = 3;
    assert_eq!(state.next_track(), 4);
    assert_eq!(state.prev_track(), 2);
    state.current_track = 1;
    assert_eq!(state.prev_track(), 5);
}

// Refresh and status

#[test]
fn test_refresh_loads_toc_once_when_stopped() {
    let mut transport = ready(five_tracks());

    let first = transport.refresh().unwrap();
    assert_eq!(first.status, AudioStatus::Stopped);
    assert!(first.toc_loaded);
    assert!(transport.state().toc_valid);
    assert_eq!(transport.state().end_track, 5);

    let second = transport.refresh().unwrap();
    assert!(!second.toc_loaded);
}

#[test]
fn test_refresh_while_playing_keeps_toc() {
    let mut transport = ready(five_tracks());
    transport.read_toc().unwrap();
    transport.play().unwrap();

    let refresh = transport.refresh().unwrap();
    assert_eq!(refresh.status, AudioStatus::Playing);
    assert!(!refresh.toc_loaded);
}

#[test]
fn test_check_device_status_reads_error_register() {
    let mut transport = transport(None);
    transport.initialize().unwrap();

    transport.test_unit_ready().unwrap();
    let status = transport.check_device_status().unwrap();
    assert!(status.status.contains(StatusFlags::ERR));
    assert_eq!(status.error, Some(0x04));

    transport.request_sense().unwrap();
    let status = transport.check_device_status().unwrap();
    assert!(!status.status.contains(StatusFlags::ERR));
    assert_eq!(status.error, None);
}

// Bus discipline

#[test]
fn test_bus_idle_after_every_command() {
    let mut transport = ready(five_tracks());
    assert!(transport.bus().is_idle());

    transport.read_toc().unwrap();
    assert!(transport.bus().is_idle());
    transport.play().unwrap();
    assert!(transport.bus().is_idle());
    transport.read_subchannel().unwrap();
    assert!(transport.bus().is_idle());
    transport.check_disc().unwrap();
    assert!(transport.bus().is_idle());
    transport.next_track().unwrap();
    assert!(transport.bus().is_idle());

    assert_eq!(transport.bus().strobe_conflicts(), 0);
}

#[test]
fn test_bus_error_propagates() {
    let mut transport = ready(five_tracks());
    transport.bus_mut().fail_address(Some(0x22));

    match transport.play() {
        Err(AtapiError::Bus { address, .. }) => assert_eq!(address, 0x22),
        other => panic!("expected bus error, got {other:?}"),
    }
}
