//! Integration test: host-connected and host-independent modes.

use andon_common::state::{ConnectionStatus, HostMachineState, StateBucket, SystemFault, SystemState};
use andon_controller::state::Decision;

use super::Rig;

/// Rig with a heartbeat and `Execute` applied at t=0.
fn connected_rig() -> Rig {
    let mut rig = Rig::new();
    rig.heartbeat();
    rig.host_state(HostMachineState::Execute);
    let out = rig.cycle_at(0);
    assert_eq!(out.state, SystemState::HostActiveState);
    rig
}

#[test]
fn connected_host_running_is_active() {
    let mut rig = connected_rig();
    let out = rig.cycle_at(10);
    assert_eq!(out.state, SystemState::HostActiveState);
    assert_eq!(out.decision, Decision::Clear);
    assert_eq!(out.telemetry.connection, ConnectionStatus::Connected);
    assert_eq!(out.telemetry.host_bucket, Some(StateBucket::Run));
}

#[test]
fn connected_without_host_state_stops() {
    let mut rig = Rig::new();
    rig.heartbeat();

    // Default host state is Undefined, which sits in the stop bucket.
    let out = rig.cycle_at(0);
    assert_eq!(out.state, SystemState::Stopped);
    assert_eq!(out.decision, Decision::HostStop);
    assert_eq!(out.telemetry.fault, SystemFault::EStopped);
}

#[test]
fn host_stop_latches_until_run_state() {
    let mut rig = connected_rig();

    rig.host_state(HostMachineState::Aborting);
    let out = rig.cycle_at(10);
    assert_eq!(out.decision, Decision::HostStop);
    assert_eq!(out.telemetry.fault, SystemFault::EStopped);

    rig.host_state(HostMachineState::Idle);
    let out = rig.cycle_at(20);
    assert_eq!(out.state, SystemState::HostActiveState);
    assert_eq!(out.telemetry.fault, SystemFault::None);
}

#[test]
fn disconnects_one_tick_after_timeout() {
    let mut rig = connected_rig();

    let out = rig.cycle_at(3000);
    assert_eq!(out.state, SystemState::HostActiveState);
    assert_eq!(out.telemetry.connection, ConnectionStatus::Connected);

    let out = rig.cycle_at(3001);
    assert_eq!(out.state, SystemState::Scanning);
    assert_eq!(out.telemetry.connection, ConnectionStatus::Disconnected);
    assert_eq!(out.telemetry.host_bucket, None);
}

#[test]
fn heartbeat_reconnects() {
    let mut rig = connected_rig();
    assert_eq!(rig.cycle_at(5000).state, SystemState::Scanning);

    rig.heartbeat();
    let out = rig.cycle_at(5010);
    assert_eq!(out.state, SystemState::HostActiveState);
    assert_eq!(rig.links.connection.last_heartbeat_ms(), Some(5010));
}

#[test]
fn host_stop_ignored_while_disconnected() {
    let mut rig = Rig::new();
    rig.host_state(HostMachineState::Stopped);

    let out = rig.cycle_at(0);
    assert_eq!(out.state, SystemState::Scanning);
    assert_eq!(out.telemetry.fault, SystemFault::None);
    assert_eq!(out.telemetry.host_state, HostMachineState::Stopped);
}

#[test]
fn danger_checked_in_connected_mode() {
    let mut rig = connected_rig();
    rig.person(0.9);
    rig.depth(450.0, 10);

    let out = rig.cycle_at(10);
    assert_eq!(out.state, SystemState::Stopped);
    assert_eq!(out.decision, Decision::Danger);
}

#[test]
fn person_far_warns_in_connected_mode() {
    let mut rig = connected_rig();
    rig.person(0.9);
    rig.depth(1200.0, 10);

    let out = rig.cycle_at(10);
    assert_eq!(out.state, SystemState::Warning);
    assert_eq!(out.decision, Decision::PersonInView);
}
