//! State enums shared between the controller and its observers.
//!
//! All enums use `#[repr(u8)]` with explicit discriminants so the numeric
//! values seen by the host (telemetry, `rx_host_state`) are stable.

use serde::{Deserialize, Serialize};

// ─── System State ───────────────────────────────────────────────────

/// Authoritative controller output, published to the Andon light and telemetry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[repr(u8)]
pub enum SystemState {
    /// Before the first control cycle.
    #[default]
    Uninitialized = 0,
    /// Bookkeeping marker at the start of every cycle.
    HostReading = 1,
    /// Host-independent mode, no person in view.
    Scanning = 2,
    /// Person in view, not confirmed inside the danger distance.
    Warning = 3,
    /// Machine must stop (fault latched).
    Stopped = 4,
    /// Host connected and not in its stop bucket, no person in view.
    HostActiveState = 5,
    /// Host connected and reporting a stop-bucket state.
    HostStoppedState = 6,
}

impl SystemState {
    #[inline]
    pub const fn from_u8(value: u8) -> Option<Self> {
        match value {
            0 => Some(Self::Uninitialized),
            1 => Some(Self::HostReading),
            2 => Some(Self::Scanning),
            3 => Some(Self::Warning),
            4 => Some(Self::Stopped),
            5 => Some(Self::HostActiveState),
            6 => Some(Self::HostStoppedState),
            _ => None,
        }
    }

    /// True for the states that command the host to stop.
    #[inline]
    pub const fn is_stop(&self) -> bool {
        matches!(self, Self::Stopped | Self::HostStoppedState)
    }
}

// ─── Fault Latch Value ──────────────────────────────────────────────

/// Latched safety fault. A single value, never a set.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[repr(u8)]
pub enum SystemFault {
    #[default]
    None = 0,
    /// Person inside the danger distance or host in its stop bucket.
    /// Cleared by a host-state update outside the stop bucket.
    EStopped = 1,
    /// Controller could not keep its cycle deadline. Persists until restart.
    ProgramError = 2,
}

impl SystemFault {
    #[inline]
    pub const fn is_active(&self) -> bool {
        !matches!(self, Self::None)
    }

    /// Severity rank used when a second fault arrives while one is latched.
    #[inline]
    pub const fn severity(&self) -> u8 {
        match self {
            Self::None => 0,
            Self::EStopped => 1,
            Self::ProgramError => 2,
        }
    }
}

// ─── Host Connection ────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[repr(u8)]
pub enum ConnectionStatus {
    #[default]
    Disconnected = 0,
    Connected = 1,
}

impl From<bool> for ConnectionStatus {
    fn from(connected: bool) -> Self {
        if connected { Self::Connected } else { Self::Disconnected }
    }
}

// ─── Host Machine State (PackML) ────────────────────────────────────

/// Coarse color bucket of a host machine state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(u8)]
pub enum StateBucket {
    Stop = 0,
    Caution = 1,
    Ready = 2,
    Run = 3,
}

/// PackML-style machine state reported by the host.
///
/// Discriminants follow the host protocol ordinal order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[repr(u8)]
pub enum HostMachineState {
    #[default]
    Undefined = 0,
    Stopped = 1,
    Starting = 2,
    Idle = 3,
    Suspended = 4,
    Execute = 5,
    Stopping = 6,
    Aborting = 7,
    Aborted = 8,
    Holding = 9,
    Held = 10,
    Resetting = 11,
    Suspending = 12,
    Unsuspending = 13,
    Clearing = 14,
    Unholding = 15,
    Completing = 16,
    Complete = 17,
}

impl HostMachineState {
    /// Every variant, in discriminant order.
    pub const ALL: [Self; 18] = [
        Self::Undefined,
        Self::Stopped,
        Self::Starting,
        Self::Idle,
        Self::Suspended,
        Self::Execute,
        Self::Stopping,
        Self::Aborting,
        Self::Aborted,
        Self::Holding,
        Self::Held,
        Self::Resetting,
        Self::Suspending,
        Self::Unsuspending,
        Self::Clearing,
        Self::Unholding,
        Self::Completing,
        Self::Complete,
    ];

    #[inline]
    pub const fn from_u8(value: u8) -> Option<Self> {
        if (value as usize) < Self::ALL.len() {
            Some(Self::ALL[value as usize])
        } else {
            None
        }
    }

    /// Fixed, total classification into a color bucket.
    pub const fn bucket(&self) -> StateBucket {
        match self {
            Self::Undefined
            | Self::Stopped
            | Self::Stopping
            | Self::Aborting
            | Self::Aborted
            | Self::Clearing => StateBucket::Stop,
            Self::Suspended
            | Self::Suspending
            | Self::Unsuspending
            | Self::Holding
            | Self::Held
            | Self::Unholding => StateBucket::Caution,
            Self::Idle | Self::Resetting | Self::Completing | Self::Complete => StateBucket::Ready,
            Self::Starting | Self::Execute => StateBucket::Run,
        }
    }
}

// ─── Andon Color ────────────────────────────────────────────────────

/// 24-bit RGB color for the Andon light.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Rgb(pub u32);

impl Rgb {
    #[inline]
    pub const fn red(&self) -> u8 {
        (self.0 >> 16) as u8
    }

    #[inline]
    pub const fn green(&self) -> u8 {
        (self.0 >> 8) as u8
    }

    #[inline]
    pub const fn blue(&self) -> u8 {
        self.0 as u8
    }
}

impl std::fmt::Display for Rgb {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "#{:06X}", self.0)
    }
}

// ─── Tests ──────────────────────────────────────────────────────────
