//! Fixed-period control cycle: drain → read → decide → publish.
//!
//! ## RT Setup
//! 1. `mlockall(MCL_CURRENT | MCL_FUTURE)`: lock all pages.
//! 2. Prefault stack pages.
//! 3. `sched_setaffinity`: pin to one CPU core.
//! 4. `sched_setscheduler(SCHED_FIFO, prio)`.
//!
//! All four are no-ops without the `rt` feature.
//!
//! ## Cycle Loop
//! Absolute-time sleep on `CLOCK_MONOTONIC` (`rt`) or plain sleep
//! otherwise. An overrun is logged and reported in the next telemetry
//! record; `overrun_fault_cycles` consecutive overruns latch
//! `SystemFault::ProgramError`.
//!
//! ## Cycle Body
//! Drain up to 3 host events, non-blocking read of the detection and depth
//! slots, one runtime-config snapshot, one controller step, edge-triggered
//! state publish, unconditional telemetry publish.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use andon_common::channel::{HostEventBatch, HostEventQueue, LatestSlot, SlotReader};
use andon_common::runtime::{RuntimeConfig, SharedRuntimeConfig};
use andon_common::state::SystemState;
use andon_common::telemetry::TelemetrySnapshot;
use andon_common::types::{DetectionFrame, RawDepthFrame};
use tracing::{debug, error, info, warn};

use crate::clock::Clock;
use crate::config::LoadedConfig;
use crate::error::ControllerError;
use crate::output::{EdgePublisher, andon_color};
use crate::state::{CycleInputs, CycleOutcome, SafetyController};
use crate::tracker::ConnectionTracker;

// ─── Cycle Statistics ───────────────────────────────────────────────

/// O(1) per-cycle timing statistics.
#[derive(Debug, Clone)]
pub struct CycleStats {
    /// Total cycles executed.
    pub cycle_count: u64,
    /// Last cycle duration [ns].
    pub last_cycle_ns: i64,
    /// Minimum cycle duration [ns].
    pub min_cycle_ns: i64,
    /// Maximum cycle duration [ns].
    pub max_cycle_ns: i64,
    /// Running sum for average computation.
    pub sum_cycle_ns: i64,
    /// Number of overruns detected.
    pub overruns: u64,
    /// Longest run of back-to-back overruns.
    pub max_consecutive_overruns: u32,
    /// Maximum wake-up latency [ns] (time between expected and actual wake).
    pub max_latency_ns: i64,
}

impl CycleStats {
    pub const fn new() -> Self {
        Self {
            cycle_count: 0,
            last_cycle_ns: 0,
            min_cycle_ns: i64::MAX,
            max_cycle_ns: 0,
            sum_cycle_ns: 0,
            overruns: 0,
            max_consecutive_overruns: 0,
            max_latency_ns: 0,
        }
    }

    /// Record a cycle duration. O(1), no allocation.
    #[inline]
    pub fn record(&mut self, duration_ns: i64, latency_ns: i64) {
        self.cycle_count += 1;
        self.last_cycle_ns = duration_ns;
        self.min_cycle_ns = self.min_cycle_ns.min(duration_ns);
        self.max_cycle_ns = self.max_cycle_ns.max(duration_ns);
        self.sum_cycle_ns = self.sum_cycle_ns.saturating_add(duration_ns);
        self.max_latency_ns = self.max_latency_ns.max(latency_ns);
    }

    /// Average cycle time [ns] (returns 0 if no cycles).
    #[inline]
    pub fn avg_cycle_ns(&self) -> i64 {
        if self.cycle_count == 0 {
            0
        } else {
            self.sum_cycle_ns / self.cycle_count as i64
        }
    }
}

impl Default for CycleStats {
    fn default() -> Self {
        Self::new()
    }
}

// ─── RT Setup ───────────────────────────────────────────────────────

/// Lock all current and future memory pages.
#[cfg(feature = "rt")]
fn rt_mlockall() -> Result<(), ControllerError> {
    use nix::sys::mman::{MlockallFlags, mlockall};
    mlockall(MlockallFlags::MCL_CURRENT | MlockallFlags::MCL_FUTURE)
        .map_err(|e| ControllerError::RtSetup(format!("mlockall failed: {e}")))
}

#[cfg(not(feature = "rt"))]
fn rt_mlockall() -> Result<(), ControllerError> {
    Ok(())
}

/// Touch 256 KiB of stack so the loop does not fault pages in.
#[cfg(feature = "rt")]
fn prefault_stack() {
    let mut buf = [0u8; 256 * 1024];
    for byte in buf.iter_mut() {
        // SAFETY: `byte` is a valid, exclusive reference into `buf`.
        unsafe { core::ptr::write_volatile(byte, 0xFF) };
    }
    core::hint::black_box(&buf);
}

#[cfg(not(feature = "rt"))]
fn prefault_stack() {}

/// Pin the current thread to one CPU core.
#[cfg(feature = "rt")]
fn rt_set_affinity(cpu: usize) -> Result<(), ControllerError> {
    use nix::sched::{CpuSet, sched_setaffinity};
    use nix::unistd::Pid;

    let mut cpuset = CpuSet::new();
    cpuset
        .set(cpu)
        .map_err(|e| ControllerError::RtSetup(format!("CpuSet::set({cpu}) failed: {e}")))?;
    sched_setaffinity(Pid::from_raw(0), &cpuset)
        .map_err(|e| ControllerError::RtSetup(format!("sched_setaffinity failed: {e}")))
}

#[cfg(not(feature = "rt"))]
fn rt_set_affinity(_cpu: usize) -> Result<(), ControllerError> {
    Ok(())
}

/// Set SCHED_FIFO with the given priority.
#[cfg(feature = "rt")]
fn rt_set_scheduler(priority: i32) -> Result<(), ControllerError> {
    let param = libc::sched_param {
        sched_priority: priority,
    };
    // SAFETY: `param` outlives the call; pid 0 is the calling thread.
    let ret = unsafe { libc::sched_setscheduler(0, libc::SCHED_FIFO, &param) };
    if ret != 0 {
        let err = std::io::Error::last_os_error();
        return Err(ControllerError::RtSetup(format!(
            "sched_setscheduler(SCHED_FIFO, {priority}) failed: {err}"
        )));
    }
    Ok(())
}

#[cfg(not(feature = "rt"))]
fn rt_set_scheduler(_priority: i32) -> Result<(), ControllerError> {
    Ok(())
}

/// Full RT setup sequence. Call on the control thread before [`CycleRunner::run`].
pub fn rt_setup(cpu_core: usize, rt_priority: i32) -> Result<(), ControllerError> {
    rt_mlockall()?;
    prefault_stack();
    rt_set_affinity(cpu_core)?;
    rt_set_scheduler(rt_priority)?;
    Ok(())
}

// ─── Channel Endpoints ──────────────────────────────────────────────

/// Every channel between the controller and its collaborators.
///
/// Built once at startup; clones share the same channels.
#[derive(Clone)]
pub struct Links {
    /// Inference → controller.
    pub detections: Arc<LatestSlot<DetectionFrame>>,
    /// ToF poller → controller.
    pub depth: Arc<LatestSlot<RawDepthFrame>>,
    /// Host link → controller (heartbeats, host-state updates).
    pub host_events: Arc<HostEventQueue>,
    /// Runtime parameters, written by the host link.
    pub runtime: SharedRuntimeConfig,
    /// Controller → Andon LED driver (edge-triggered).
    pub system_state: Arc<LatestSlot<SystemState>>,
    /// Controller → host polling (every cycle).
    pub telemetry: Arc<LatestSlot<TelemetrySnapshot>>,
    /// Heartbeat liveness, readable from any context.
    pub connection: Arc<ConnectionTracker>,
}

impl Links {
    pub fn new(runtime: RuntimeConfig, connection_timeout_ms: u64) -> Self {
        Self {
            detections: LatestSlot::shared(),
            depth: LatestSlot::shared(),
            host_events: Arc::new(HostEventQueue::new()),
            runtime: SharedRuntimeConfig::new(runtime),
            system_state: LatestSlot::shared(),
            telemetry: LatestSlot::shared(),
            connection: Arc::new(ConnectionTracker::new(connection_timeout_ms)),
        }
    }

    pub fn from_config(config: &LoadedConfig) -> Self {
        Self::new(
            config.andon.runtime,
            config.andon.controller.connection_timeout_ms,
        )
    }
}

// ─── Cycle Runner ───────────────────────────────────────────────────

/// Owns the controller, the clock and the controller's channel endpoints.
pub struct CycleRunner<C: Clock> {
    controller: SafetyController,
    links: Links,
    detection_rx: SlotReader<DetectionFrame>,
    depth_rx: SlotReader<RawDepthFrame>,
    andon: EdgePublisher<SystemState>,
    clock: C,
    stats: CycleStats,
    /// Configured cycle time [ns].
    cycle_time_ns: i64,
    overrun_fault_cycles: u32,
    consecutive_overruns: u32,
    last_overrun: bool,
}

impl<C: Clock> CycleRunner<C> {
    pub fn new(config: &LoadedConfig, links: Links, clock: C) -> Self {
        let controller = SafetyController::new(config.params.clone(), links.connection.clone());
        Self {
            controller,
            detection_rx: SlotReader::new(links.detections.clone()),
            depth_rx: SlotReader::new(links.depth.clone()),
            andon: EdgePublisher::new(links.system_state.clone()),
            links,
            clock,
            stats: CycleStats::new(),
            cycle_time_ns: config.cycle_time_ns(),
            overrun_fault_cycles: config.andon.controller.overrun_fault_cycles,
            consecutive_overruns: 0,
            last_overrun: false,
        }
    }

    #[inline]
    pub fn controller(&self) -> &SafetyController {
        &self.controller
    }

    #[inline]
    pub fn stats(&self) -> &CycleStats {
        &self.stats
    }

    #[inline]
    pub fn links(&self) -> &Links {
        &self.links
    }

    /// Execute one cycle body. Never blocks, never fails.
    pub fn run_cycle(&mut self) -> CycleOutcome {
        let now_ms = self.clock.now_ms();

        let mut host_events = HostEventBatch::new();
        self.links.host_events.drain_into(&mut host_events);

        let inputs = CycleInputs {
            host_events,
            detection: self.detection_rx.try_recv(),
            depth: self.depth_rx.try_recv(),
            overrun: self.last_overrun,
        };
        let cfg = self.links.runtime.snapshot();

        let outcome = self.controller.step(now_ms, inputs, &cfg);

        if let Some(previous) = self.andon.publish(outcome.state) {
            info!(
                from = ?previous.unwrap_or_default(),
                to = ?outcome.state,
                decision = ?outcome.decision,
                color = %andon_color(outcome.state, &cfg),
                "state transition"
            );
        }
        self.links.telemetry.publish(outcome.telemetry.clone());
        outcome
    }

    /// Account one cycle's duration; latch `ProgramError` after too many
    /// consecutive overruns.
    pub fn record_timing(&mut self, duration_ns: i64, latency_ns: i64) {
        self.stats.record(duration_ns, latency_ns);
        self.last_overrun = duration_ns > self.cycle_time_ns;
        if !self.last_overrun {
            self.consecutive_overruns = 0;
            return;
        }

        self.stats.overruns += 1;
        self.consecutive_overruns += 1;
        self.stats.max_consecutive_overruns = self
            .stats
            .max_consecutive_overruns
            .max(self.consecutive_overruns);

        if self.consecutive_overruns == 1 {
            warn!(
                actual_ns = duration_ns,
                budget_ns = self.cycle_time_ns,
                "cycle overrun"
            );
        } else {
            debug!(consecutive = self.consecutive_overruns, "cycle overrun");
        }

        if self.consecutive_overruns >= self.overrun_fault_cycles
            && self.controller.latch_program_error(self.clock.now_ms())
        {
            error!(
                consecutive = self.consecutive_overruns,
                "cycle deadline lost, ProgramError latched until restart"
            );
        }
    }

    /// Loop at the fixed period until `running` drops.
    pub fn run(&mut self, running: &AtomicBool) -> Result<(), ControllerError> {
        #[cfg(feature = "rt")]
        let result = self.run_rt_loop(running);

        #[cfg(not(feature = "rt"))]
        let result = self.run_sim_loop(running);

        info!(
            cycles = self.stats.cycle_count,
            avg_ns = self.stats.avg_cycle_ns(),
            max_ns = self.stats.max_cycle_ns,
            overruns = self.stats.overruns,
            "cycle loop stopped"
        );
        result
    }

    /// RT cycle loop using `clock_nanosleep(TIMER_ABSTIME)`.
    #[cfg(feature = "rt")]
    fn run_rt_loop(&mut self, running: &AtomicBool) -> Result<(), ControllerError> {
        use nix::time::{ClockId, ClockNanosleepFlags, clock_gettime, clock_nanosleep};

        let clock = ClockId::CLOCK_MONOTONIC;
        let now = || {
            clock_gettime(clock)
                .map_err(|e| ControllerError::RtSetup(format!("clock_gettime: {e}")))
        };
        let mut next_wake = now()?;

        while running.load(Ordering::Relaxed) {
            next_wake = timespec_add_ns(next_wake, self.cycle_time_ns);

            let cycle_start = now()?;
            self.run_cycle();
            let cycle_end = now()?;

            let duration_ns = timespec_diff_ns(&cycle_end, &cycle_start);
            self.record_timing(duration_ns, 0);

            let _ = clock_nanosleep(clock, ClockNanosleepFlags::TIMER_ABSTIME, &next_wake);
            let woke = now()?;
            let latency_ns = timespec_diff_ns(&woke, &next_wake).abs();
            self.stats.max_latency_ns = self.stats.max_latency_ns.max(latency_ns);
        }
        Ok(())
    }

    /// Simulation cycle loop using `std::thread::sleep`.
    #[cfg(not(feature = "rt"))]
    fn run_sim_loop(&mut self, running: &AtomicBool) -> Result<(), ControllerError> {
        use std::time::{Duration, Instant};

        let cycle_duration = Duration::from_nanos(self.cycle_time_ns as u64);

        while running.load(Ordering::Relaxed) {
            let cycle_start = Instant::now();
            self.run_cycle();
            let elapsed = cycle_start.elapsed();
            self.record_timing(elapsed.as_nanos() as i64, 0);

            if let Some(remaining) = cycle_duration.checked_sub(elapsed) {
                std::thread::sleep(remaining);
            }
        }
        Ok(())
    }
}

// ─── Time Helpers ───────────────────────────────────────────────────

#[cfg(feature = "rt")]
fn timespec_add_ns(ts: nix::sys::time::TimeSpec, ns: i64) -> nix::sys::time::TimeSpec {
    use nix::sys::time::TimeSpec;
    let total = ts.tv_nsec() + ns;
    let secs = ts.tv_sec() + total.div_euclid(1_000_000_000);
    let nanos = total.rem_euclid(1_000_000_000);
    TimeSpec::new(secs, nanos)
}

/// `a - b` [ns].
#[cfg(feature = "rt")]
fn timespec_diff_ns(a: &nix::sys::time::TimeSpec, b: &nix::sys::time::TimeSpec) -> i64 {
    (a.tv_sec() - b.tv_sec()) * 1_000_000_000 + (a.tv_nsec() - b.tv_nsec())
}

// ─── Tests ──────────────────────────────────────────────────────────
