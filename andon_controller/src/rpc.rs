//! Host request dispatcher.
//!
//! Transport-independent handling of the host's requests. A transport (HTTP,
//! serial, ...) hands each request to [`HostInterface::handle`] or, for
//! JSON-RPC 2.0 framed text, [`HostInterface::handle_request`].
//!
//! | Method | Params | Effect |
//! |--------|--------|--------|
//! | `host_heartbeat` | `{connected: true}` | enqueue `HostEvent::Heartbeat` |
//! | `rx_host_state` | `{host_state: n}` | enqueue `HostEvent::HostState` |
//! | `tx_logs_to_host` | none | latest telemetry snapshot |
//! | `get_runtime_config` | none | current runtime parameters |
//! | `set_runtime_config` | partial record | validate-then-swap |
//!
//! Events are queued, never applied directly: the controller owns all
//! safety state. A full queue is reported to the caller.

use andon_common::channel::{ChannelError, HostEvent};
use andon_common::runtime::RuntimeConfigPatch;
use andon_common::state::HostMachineState;
use serde::Deserialize;
use serde_json::{Value, json};
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::cycle::Links;

/// Request failure, with JSON-RPC style codes.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum RpcError {
    #[error("parse error: {0}")]
    Parse(String),

    #[error("method not found: {0}")]
    MethodNotFound(String),

    #[error("invalid params: {0}")]
    InvalidParams(String),

    #[error("no logging data available")]
    NoData,

    #[error(transparent)]
    Channel(#[from] ChannelError),

    /// Runtime parameter update failed validation.
    #[error("rejected: {0}")]
    Rejected(String),

    #[error("internal error: {0}")]
    Internal(String),
}

impl RpcError {
    pub const fn code(&self) -> i32 {
        match self {
            Self::Parse(_) => -32700,
            Self::MethodNotFound(_) => -32601,
            Self::InvalidParams(_) => -32602,
            Self::Internal(_) => -32603,
            Self::NoData => -32000,
            Self::Channel(_) => -32001,
            Self::Rejected(_) => -32002,
        }
    }
}

#[derive(Deserialize)]
#[serde(deny_unknown_fields)]
struct HeartbeatParams {
    connected: bool,
}

#[derive(Deserialize)]
#[serde(deny_unknown_fields)]
struct HostStateParams {
    host_state: u64,
}

#[derive(Deserialize)]
struct Request {
    #[serde(default)]
    id: Value,
    method: String,
    #[serde(default)]
    params: Value,
}

/// Host-facing endpoint over the controller's channels.
#[derive(Clone)]
pub struct HostInterface {
    links: Links,
}

impl HostInterface {
    pub fn new(links: Links) -> Self {
        Self { links }
    }

    /// Dispatch one request.
    pub fn handle(&self, method: &str, params: &Value) -> Result<Value, RpcError> {
        match method {
            "host_heartbeat" => self.host_heartbeat(params),
            "rx_host_state" => self.rx_host_state(params),
            "tx_logs_to_host" => self.tx_logs_to_host(),
            "get_runtime_config" => self.get_runtime_config(),
            "set_runtime_config" => self.set_runtime_config(params),
            other => Err(RpcError::MethodNotFound(other.to_string())),
        }
    }

    /// Dispatch one JSON-RPC 2.0 request text and return the response text.
    pub fn handle_request(&self, request: &str) -> String {
        let (id, result) = match serde_json::from_str::<Request>(request) {
            Ok(req) => {
                let result = self.handle(&req.method, &req.params);
                (req.id, result)
            }
            Err(e) => (Value::Null, Err(RpcError::Parse(e.to_string()))),
        };
        let response = match result {
            Ok(value) => json!({ "jsonrpc": "2.0", "id": id, "result": value }),
            Err(e) => json!({
                "jsonrpc": "2.0",
                "id": id,
                "error": { "code": e.code(), "message": e.to_string() },
            }),
        };
        response.to_string()
    }

    fn host_heartbeat(&self, params: &Value) -> Result<Value, RpcError> {
        let p: HeartbeatParams = parse_params(params)?;
        if !p.connected {
            return Err(RpcError::InvalidParams(
                "connected must be true; disconnect is signalled by heartbeat timeout".into(),
            ));
        }
        self.enqueue(HostEvent::Heartbeat)?;
        Ok(json!({ "ack": true }))
    }

    fn rx_host_state(&self, params: &Value) -> Result<Value, RpcError> {
        let p: HostStateParams = parse_params(params)?;
        let state = u8::try_from(p.host_state)
            .ok()
            .and_then(HostMachineState::from_u8)
            .ok_or_else(|| {
                RpcError::InvalidParams(format!("unknown host_state {}", p.host_state))
            })?;
        self.enqueue(HostEvent::HostState(state))?;
        debug!(?state, "host state queued");
        Ok(json!({ "host_state": state, "bucket": state.bucket() }))
    }

    fn tx_logs_to_host(&self) -> Result<Value, RpcError> {
        let snapshot = self.links.telemetry.latest().ok_or(RpcError::NoData)?;
        serde_json::to_value(snapshot).map_err(|e| RpcError::Internal(e.to_string()))
    }

    fn get_runtime_config(&self) -> Result<Value, RpcError> {
        serde_json::to_value(self.links.runtime.snapshot())
            .map_err(|e| RpcError::Internal(e.to_string()))
    }

    fn set_runtime_config(&self, params: &Value) -> Result<Value, RpcError> {
        let patch: RuntimeConfigPatch = parse_params(params)?;
        let updated = self
            .links
            .runtime
            .apply(&patch)
            .map_err(|e| RpcError::Rejected(e.to_string()))?;
        info!(
            danger_threshold_mm = updated.danger_threshold_mm,
            detection_confidence_min = updated.detection_confidence_min,
            "runtime config changed by host"
        );
        serde_json::to_value(updated).map_err(|e| RpcError::Internal(e.to_string()))
    }

    fn enqueue(&self, event: HostEvent) -> Result<(), RpcError> {
        self.links.host_events.try_send(event).map_err(|e| {
            warn!(?event, "host event dropped: {e}");
            RpcError::from(e)
        })
    }
}

fn parse_params<T: serde::de::DeserializeOwned>(params: &Value) -> Result<T, RpcError> {
    T::deserialize(params).map_err(|e| RpcError::InvalidParams(e.to_string()))
}
