//! Host link trackers.
//!
//! - [`connection`] - Heartbeat liveness with timeout-only disconnect
//! - [`host_state`] - Last reported PackML state, bucket, E-stop acknowledgement

pub mod connection;
pub mod host_state;

pub use connection::ConnectionTracker;
pub use host_state::HostStateTracker;
