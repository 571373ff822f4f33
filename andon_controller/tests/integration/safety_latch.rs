//! Integration test: fault latch lifecycle.
//!
//! Danger distance latches `EStopped`, the latch dominates every later
//! input, and only a host-state update outside the stop bucket clears it.

use andon_common::consts::INVALID_DISTANCE_MM;
use andon_common::state::{HostMachineState, SystemFault, SystemState};
use andon_controller::state::Decision;

use super::Rig;

// ── Helpers ─────────────────────────────────────────────────────────

/// Rig with `EStopped` latched at t=0 by a person at 450 mm.
fn latched_rig() -> Rig {
    let mut rig = Rig::new();
    rig.person(0.9);
    rig.depth(450.0, 0);
    let out = rig.cycle_at(0);
    assert_eq!(out.state, SystemState::Stopped);
    rig
}

// ── Tests ───────────────────────────────────────────────────────────

#[test]
fn person_inside_danger_distance_stops() {
    let mut rig = Rig::new();
    rig.person(0.9);
    rig.depth(450.0, 0);

    let out = rig.cycle_at(0);
    assert_eq!(out.state, SystemState::Stopped);
    assert_eq!(out.decision, Decision::Danger);
    assert_eq!(out.telemetry.fault, SystemFault::EStopped);

    let estimate = out.telemetry.estimates[0];
    assert!(estimate.valid);
    assert_eq!(estimate.distance_mm, 450.0);
    assert_eq!(estimate.track_id, Some(1));
}

#[test]
fn exactly_at_threshold_stops() {
    let mut rig = Rig::new();
    rig.person(0.9);
    rig.depth(500.0, 0);
    assert_eq!(rig.cycle_at(0).decision, Decision::Danger);
}

#[test]
fn invalid_cells_never_fault() {
    let mut rig = Rig::new();
    rig.person(0.9);
    rig.depth_invalid(0);

    let out = rig.cycle_at(0);
    assert_eq!(out.state, SystemState::Warning);
    assert_eq!(out.telemetry.fault, SystemFault::None);

    let estimate = out.telemetry.estimates[0];
    assert!(!estimate.valid);
    assert_eq!(estimate.distance_mm, INVALID_DISTANCE_MM);
}

#[test]
fn latch_dominates_later_inputs() {
    let mut rig = latched_rig();

    rig.nobody();
    let out = rig.cycle_at(10);
    assert_eq!(out.state, SystemState::Stopped);
    assert_eq!(out.decision, Decision::FaultActive);

    rig.person(0.9);
    rig.depth(3000.0, 20);
    let out = rig.cycle_at(20);
    assert_eq!(out.state, SystemState::Stopped);
    assert_eq!(out.decision, Decision::FaultActive);
}

#[test]
fn non_stop_host_state_clears_estop() {
    let mut rig = latched_rig();
    rig.nobody();
    rig.cycle_at(10);

    rig.host_state(HostMachineState::Execute);
    let out = rig.cycle_at(20);
    assert_eq!(out.telemetry.fault, SystemFault::None);
    // Host never sent a heartbeat: host-independent mode.
    assert_eq!(out.state, SystemState::Scanning);
}

#[test]
fn stop_bucket_host_state_keeps_latch() {
    let mut rig = latched_rig();
    rig.nobody();

    for state in [
        HostMachineState::Stopped,
        HostMachineState::Aborted,
        HostMachineState::Clearing,
    ] {
        rig.host_state(state);
    }
    let out = rig.cycle_at(10);
    assert_eq!(out.telemetry.fault, SystemFault::EStopped);
    assert_eq!(out.state, SystemState::Stopped);
}

#[test]
fn unchanged_host_state_still_clears() {
    let mut rig = Rig::new();
    rig.host_state(HostMachineState::Execute);
    rig.cycle_at(0);

    rig.person(0.9);
    rig.depth(300.0, 10);
    assert_eq!(rig.cycle_at(10).telemetry.fault, SystemFault::EStopped);

    rig.nobody();
    rig.host_state(HostMachineState::Execute);
    let out = rig.cycle_at(20);
    assert_eq!(out.telemetry.fault, SystemFault::None);
    assert_eq!(out.state, SystemState::Scanning);
}

#[test]
fn person_still_close_relatches() {
    let mut rig = latched_rig();

    // Acknowledged while the person is still inside the danger distance.
    rig.host_state(HostMachineState::Execute);
    let out = rig.cycle_at(10);
    assert_eq!(out.state, SystemState::Stopped);
    assert_eq!(out.decision, Decision::Danger);
    assert_eq!(out.telemetry.fault, SystemFault::EStopped);
}

#[test]
fn program_error_survives_host_acknowledge() {
    let mut rig = Rig::new();
    rig.cycle_at(0);
    for _ in 0..50 {
        rig.runner.record_timing(20_000_000, 0);
    }
    assert_eq!(rig.runner.controller().fault(), SystemFault::ProgramError);

    rig.host_state(HostMachineState::Execute);
    let out = rig.cycle_at(10);
    assert_eq!(out.state, SystemState::Stopped);
    assert_eq!(out.decision, Decision::FaultActive);
    assert_eq!(out.telemetry.fault, SystemFault::ProgramError);
}

#[test]
fn program_error_outranks_estop() {
    let mut rig = latched_rig();
    for _ in 0..50 {
        rig.runner.record_timing(20_000_000, 0);
    }
    assert_eq!(rig.runner.controller().fault(), SystemFault::ProgramError);

    // A later danger event cannot downgrade the latch.
    let out = rig.cycle_at(10);
    assert_eq!(out.telemetry.fault, SystemFault::ProgramError);
}
