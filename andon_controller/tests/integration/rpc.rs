//! Integration test: host requests through the JSON-RPC dispatcher.

use andon_common::state::{SystemFault, SystemState};
use andon_controller::rpc::HostInterface;
use serde_json::{Value, json};

use super::Rig;

fn call(rpc: &HostInterface, method: &str, params: Value) -> Value {
    let request = json!({ "jsonrpc": "2.0", "id": 1, "method": method, "params": params });
    serde_json::from_str(&rpc.handle_request(&request.to_string())).unwrap()
}

#[test]
fn host_link_drives_active_state() {
    let mut rig = Rig::new();
    let rpc = HostInterface::new(rig.links.clone());

    assert_eq!(call(&rpc, "host_heartbeat", json!({ "connected": true }))["result"]["ack"], true);
    assert_eq!(call(&rpc, "rx_host_state", json!({ "host_state": 3 }))["result"]["bucket"], "Ready");

    assert_eq!(rig.cycle_at(0).state, SystemState::HostActiveState);
}

#[test]
fn logs_follow_each_cycle() {
    let mut rig = Rig::new();
    let rpc = HostInterface::new(rig.links.clone());
    assert_eq!(call(&rpc, "tx_logs_to_host", Value::Null)["error"]["code"], -32000);

    rig.person(0.9);
    rig.depth(450.0, 0);
    rig.cycle_at(0);

    let logs = call(&rpc, "tx_logs_to_host", Value::Null);
    assert_eq!(logs["result"]["system_state"], "Stopped");
    assert_eq!(logs["result"]["fault"], "EStopped");
    assert_eq!(logs["result"]["estimates"][0]["distance_mm"], 450.0);
    assert_eq!(logs["result"]["cycle"], 1);
}

#[test]
fn threshold_change_applies_next_cycle() {
    let mut rig = Rig::new();
    let rpc = HostInterface::new(rig.links.clone());

    let reply = call(&rpc, "set_runtime_config", json!({ "danger_threshold_mm": 400.0 }));
    assert_eq!(reply["result"]["danger_threshold_mm"], 400.0);

    rig.person(0.9);
    rig.depth(450.0, 0);
    assert_eq!(rig.cycle_at(0).state, SystemState::Warning);

    call(&rpc, "set_runtime_config", json!({ "danger_threshold_mm": 500.0 }));
    let out = rig.cycle_at(10);
    assert_eq!(out.state, SystemState::Stopped);
    assert_eq!(out.telemetry.fault, SystemFault::EStopped);
}

#[test]
fn invalid_runtime_config_leaves_old_values() {
    let rig = Rig::new();
    let rpc = HostInterface::new(rig.links.clone());

    let reply = call(&rpc, "set_runtime_config", json!({ "danger_threshold_mm": -5.0 }));
    assert_eq!(reply["error"]["code"], -32002);
    assert_eq!(rig.links.runtime.snapshot().danger_threshold_mm, 500.0);
}

#[test]
fn full_queue_drains_next_cycle() {
    let mut rig = Rig::new();
    let rpc = HostInterface::new(rig.links.clone());

    for _ in 0..3 {
        call(&rpc, "host_heartbeat", json!({ "connected": true }));
    }
    let reply = call(&rpc, "rx_host_state", json!({ "host_state": 5 }));
    assert_eq!(reply["error"]["code"], -32001);

    rig.cycle_at(0);
    let reply = call(&rpc, "rx_host_state", json!({ "host_state": 5 }));
    assert_eq!(reply["result"]["host_state"], "Execute");
    assert_eq!(rig.cycle_at(10).state, SystemState::HostActiveState);
}
