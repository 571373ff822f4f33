//! Integration test: sensor frame caching and expiry.
//!
//! A frame stays usable for its window (inclusive) and is dropped the tick
//! after. Expired depth turns every estimate invalid; expired detections
//! mean nobody is in view.

use andon_common::state::{SystemFault, SystemState};
use andon_common::telemetry::CycleFlags;
use andon_common::types::{RawDepthFrame, TofResolution};

use super::Rig;

#[test]
fn depth_expires_after_window() {
    let mut rig = Rig::new();
    rig.person(0.9);
    rig.depth(800.0, 0);
    let out = rig.cycle_at(0);
    assert_eq!(out.state, SystemState::Warning);
    assert!(out.telemetry.flags.contains(CycleFlags::DEPTH_FRESH));

    rig.person(0.9);
    let out = rig.cycle_at(1000);
    assert!(out.telemetry.flags.contains(CycleFlags::DEPTH_CACHED));
    assert!(out.telemetry.estimates[0].valid);
    assert_eq!(out.telemetry.estimates[0].distance_mm, 800.0);

    rig.person(0.9);
    let out = rig.cycle_at(1001);
    assert_eq!(out.state, SystemState::Warning);
    assert!(!out.telemetry.flags.intersects(CycleFlags::DEPTH_FRESH | CycleFlags::DEPTH_CACHED));
    assert!(!out.telemetry.estimates[0].valid);
}

#[test]
fn expired_depth_cannot_latch() {
    let mut rig = Rig::new();
    rig.depth(450.0, 0);
    assert_eq!(rig.cycle_at(0).state, SystemState::Scanning);

    // Close reading is older than the window when the person shows up.
    rig.person(0.9);
    let out = rig.cycle_at(1001);
    assert_eq!(out.state, SystemState::Warning);
    assert_eq!(out.telemetry.fault, SystemFault::None);
}

#[test]
fn cached_depth_still_latches() {
    let mut rig = Rig::new();
    rig.depth(450.0, 0);
    rig.cycle_at(0);

    rig.person(0.9);
    let out = rig.cycle_at(1000);
    assert_eq!(out.state, SystemState::Stopped);
    assert_eq!(out.telemetry.fault, SystemFault::EStopped);
}

#[test]
fn detections_expire_after_window() {
    let mut rig = Rig::new();
    rig.person(0.9);
    rig.depth_invalid(0);
    assert_eq!(rig.cycle_at(0).state, SystemState::Warning);

    let out = rig.cycle_at(1000);
    assert_eq!(out.state, SystemState::Warning);
    assert!(out.telemetry.flags.contains(CycleFlags::DETECTION_CACHED));

    let out = rig.cycle_at(1001);
    assert_eq!(out.state, SystemState::Scanning);
    assert_eq!(out.telemetry.detection_count, 0);
}

#[test]
fn empty_frame_replaces_cached_person() {
    let mut rig = Rig::new();
    rig.person(0.9);
    rig.depth(800.0, 0);
    assert_eq!(rig.cycle_at(0).state, SystemState::Warning);

    rig.nobody();
    assert_eq!(rig.cycle_at(10).state, SystemState::Scanning);
}

#[test]
fn low_confidence_person_ignored() {
    let mut rig = Rig::new();
    rig.person(0.3);
    rig.depth(450.0, 0);

    let out = rig.cycle_at(0);
    assert_eq!(out.state, SystemState::Scanning);
    assert_eq!(out.telemetry.detection_count, 0);
    assert_eq!(out.telemetry.fault, SystemFault::None);
}

#[test]
fn mismatched_depth_resolution_is_invalid() {
    let mut rig = Rig::new();
    rig.person(0.9);
    rig.links
        .depth
        .publish(RawDepthFrame::uniform(TofResolution::Grid8x8, 450.0, 0));

    let out = rig.cycle_at(0);
    assert_eq!(out.state, SystemState::Warning);
    assert!(!out.telemetry.estimates[0].valid);
}
