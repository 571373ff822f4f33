//! Integration test: cycle runner publishing, overrun accounting and
//! deterministic scenario replay.

use std::sync::atomic::AtomicBool;

use andon_common::channel::SlotReader;
use andon_common::state::{SystemFault, SystemState};
use andon_common::telemetry::CycleFlags;
use andon_controller::config::load_config_from_str;
use andon_controller::sim::{Transition, parse_scenario, replay};

use super::{Rig, config};

const BUDGET_NS: i64 = 10_000_000;

#[test]
fn state_published_on_change_only() {
    let mut rig = Rig::new();
    let mut led = SlotReader::new(rig.links.system_state.clone());

    for t in [0, 10, 20] {
        rig.cycle_at(t);
    }
    assert_eq!(led.try_recv(), Some(SystemState::Scanning));
    assert_eq!(rig.links.system_state.seq(), 1);
    assert_eq!(rig.links.telemetry.seq(), 3);

    rig.person(0.9);
    rig.depth(900.0, 30);
    rig.cycle_at(30);
    assert_eq!(led.try_recv(), Some(SystemState::Warning));
    assert_eq!(led.try_recv(), None);
}

#[test]
fn overrun_reported_on_next_cycle() {
    let mut rig = Rig::new();
    rig.cycle_at(0);

    rig.runner.record_timing(BUDGET_NS + 1, 0);
    let out = rig.cycle_at(10);
    assert!(out.telemetry.flags.contains(CycleFlags::OVERRUN));

    rig.runner.record_timing(BUDGET_NS, 0);
    let out = rig.cycle_at(20);
    assert!(!out.telemetry.flags.contains(CycleFlags::OVERRUN));
    assert_eq!(out.telemetry.fault, SystemFault::None);
}

#[test]
fn overrun_streak_resets_on_good_cycle() {
    let mut rig = Rig::new();
    for _ in 0..49 {
        rig.runner.record_timing(BUDGET_NS * 2, 0);
    }
    rig.runner.record_timing(BUDGET_NS / 2, 0);
    for _ in 0..49 {
        rig.runner.record_timing(BUDGET_NS * 2, 0);
    }

    let stats = rig.runner.stats();
    assert_eq!(stats.overruns, 98);
    assert_eq!(stats.max_consecutive_overruns, 49);
    assert_eq!(stats.cycle_count, 99);
    assert_eq!(rig.runner.controller().fault(), SystemFault::None);
}

#[test]
fn configured_overrun_threshold() {
    let loaded = load_config_from_str(
        "[shared]\nservice_name = \"it\"\n\n[controller]\noverrun_fault_cycles = 3\n",
    )
    .unwrap();
    let mut rig = Rig::with_config(&loaded);
    rig.cycle_at(0);

    for _ in 0..3 {
        rig.runner.record_timing(BUDGET_NS * 2, 0);
    }
    let out = rig.cycle_at(10);
    assert_eq!(out.telemetry.fault, SystemFault::ProgramError);
    assert!(out.telemetry.flags.contains(CycleFlags::FAULT_LATCHED));
}

#[test]
fn run_returns_when_not_running() {
    let mut rig = Rig::new();
    rig.runner.run(&AtomicBool::new(false)).unwrap();
    assert_eq!(rig.runner.stats().cycle_count, 0);
}

#[test]
fn replay_person_approaching() {
    let scenario = parse_scenario(
        r#"
duration_ms = 3000

[heartbeat]
period_ms = 1000

[[steps]]
at_ms = 0
action = "host_state"
state = 5

[[steps]]
at_ms = 1500
action = "person"
bbox = [0.0, 0.0, 0.2, 0.2]
distance_mm = 450.0
"#,
    )
    .unwrap();

    let transitions = replay(&scenario, &config());
    assert_eq!(
        transitions,
        vec![
            Transition {
                at_ms: 0,
                state: SystemState::HostActiveState,
                fault: SystemFault::None,
            },
            Transition {
                at_ms: 1500,
                state: SystemState::Stopped,
                fault: SystemFault::EStopped,
            },
        ]
    );
}

#[test]
fn replay_host_goes_silent() {
    let scenario = parse_scenario(
        r#"
duration_ms = 6000

[heartbeat]
period_ms = 1000
until_ms = 2000

[[steps]]
at_ms = 0
action = "host_state"
state = 5

[[steps]]
at_ms = 1000
action = "person"
bbox = [0.5, 0.5, 1.0, 1.0]
distance_mm = 800.0

[[steps]]
at_ms = 2500
action = "clear"
"#,
    )
    .unwrap();

    let states: Vec<(u64, SystemState)> = replay(&scenario, &config())
        .into_iter()
        .map(|t| (t.at_ms, t.state))
        .collect();
    assert_eq!(
        states,
        vec![
            (0, SystemState::HostActiveState),
            (1000, SystemState::Warning),
            (2500, SystemState::HostActiveState),
            (5010, SystemState::Scanning),
        ]
    );
}

#[test]
fn replay_sensor_silence_ages_out() {
    let scenario = parse_scenario(
        r#"
duration_ms = 2500

[[steps]]
at_ms = 0
action = "person"
bbox = [0.0, 0.0, 1.0, 1.0]

[[steps]]
at_ms = 500
action = "silence"
"#,
    )
    .unwrap();

    let states: Vec<(u64, SystemState)> = replay(&scenario, &config())
        .into_iter()
        .map(|t| (t.at_ms, t.state))
        .collect();
    // Last frame published at t=400, expires after 1000 ms.
    assert_eq!(
        states,
        vec![(0, SystemState::Warning), (1410, SystemState::Scanning)]
    );
}

#[test]
fn shipped_config_loads() {
    let loaded = load_config_from_str(include_str!("../../../config/andon.toml")).unwrap();
    assert_eq!(loaded.andon.shared.service_name, "andon-cell-01");
    assert_eq!(loaded.cycle_time_ns(), BUDGET_NS);
}

#[test]
fn shipped_demos_replay() {
    for demo in [
        include_str!("../../../demos/host_timeout.toml"),
        include_str!("../../../demos/sensor_dropout.toml"),
    ] {
        let scenario = parse_scenario(demo).unwrap();
        assert!(!replay(&scenario, &config()).is_empty());
    }

    let scenario = parse_scenario(include_str!("../../../demos/person_approach.toml")).unwrap();
    let states: Vec<(u64, SystemState)> = replay(&scenario, &config())
        .into_iter()
        .map(|t| (t.at_ms, t.state))
        .collect();
    assert_eq!(
        states,
        vec![
            (0, SystemState::HostActiveState),
            (1500, SystemState::Warning),
            (3000, SystemState::Stopped),
            (5000, SystemState::HostActiveState),
        ]
    );
}
