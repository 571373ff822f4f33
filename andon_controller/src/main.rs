//! # Andon Safety Controller
//!
//! Fixed-period safety loop for one work cell.
//!
//! Loads `andon.toml`, wires the channels between the controller and its
//! collaborators, starts the Andon light observer and, with `--scenario`,
//! the scenario simulator standing in for the camera, ToF and host. The
//! control loop runs on the main thread after RT setup.

use std::path::PathBuf;
use std::process;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread::JoinHandle;
use std::time::Duration;

use andon_common::channel::SlotReader;
use andon_common::config::LogLevel;
use andon_common::state::SystemState;
use andon_controller::clock::MonotonicClock;
use andon_controller::config::{LoadedConfig, load_config};
use andon_controller::cycle::{CycleRunner, Links, rt_setup};
use andon_controller::error::ControllerError;
use andon_controller::output::andon_color;
use andon_controller::sim::{ScenarioPlayer, load_scenario, run_player};
use clap::Parser;
use tracing::{Level, error, info};
use tracing_subscriber::EnvFilter;

/// Andon safety controller: person distance and host-driven stop latch
#[derive(Parser, Debug)]
#[command(name = "andon_controller")]
#[command(author = "RTS007")]
#[command(version)]
#[command(about = "Fixed-period Andon safety state controller")]
struct Args {
    /// Path to the controller configuration TOML.
    #[arg(default_value = "config/andon.toml")]
    config: PathBuf,

    /// Replay a scenario file instead of waiting for external producers.
    #[arg(long, value_name = "FILE")]
    scenario: Option<PathBuf>,

    /// CPU core to pin the control thread to (default: 1).
    #[arg(long, default_value_t = 1)]
    cpu_core: usize,

    /// SCHED_FIFO priority (default: 80).
    #[arg(long, default_value_t = 80)]
    rt_priority: i32,

    /// Enable verbose logging (DEBUG level).
    #[arg(short, long)]
    verbose: bool,

    /// Output logs in JSON format.
    #[arg(long)]
    json: bool,
}

/// LED observer poll period.
const LED_POLL: Duration = Duration::from_millis(20);
/// Scenario player poll period.
const SCENARIO_POLL: Duration = Duration::from_millis(5);

fn main() {
    let args = Args::parse();
    let loaded = load_config(&args.config);
    setup_tracing(&args, loaded.as_ref().ok().map(|l| l.andon.shared.log_level));

    info!("Andon controller v{} starting...", env!("CARGO_PKG_VERSION"));

    let result = loaded
        .map_err(ControllerError::from)
        .and_then(|loaded| run(&args, loaded));
    if let Err(e) = result {
        error!("FATAL: {e}");
        process::exit(1);
    }

    info!("Andon controller shutdown complete");
}

fn run(args: &Args, loaded: LoadedConfig) -> Result<(), ControllerError> {
    let ctl = &loaded.andon.controller;
    info!(
        service = %loaded.andon.shared.service_name,
        cycle_period_ms = ctl.cycle_period_ms,
        connection_timeout_ms = ctl.connection_timeout_ms,
        resolution = ?loaded.params.geometry.resolution(),
        danger_threshold_mm = loaded.andon.runtime.danger_threshold_mm,
        "Config OK"
    );

    let scenario = args.scenario.as_deref().map(load_scenario).transpose()?;

    let links = Links::from_config(&loaded);
    let clock = MonotonicClock::new();

    let running = Arc::new(AtomicBool::new(true));
    let r = running.clone();
    ctrlc::set_handler(move || {
        info!("Received shutdown signal");
        r.store(false, Ordering::SeqCst);
    })?;

    let mut workers = vec![spawn_led_observer(links.clone(), running.clone())?];
    match scenario {
        Some(scenario) => {
            info!(steps = scenario.steps.len(), duration_ms = scenario.duration_ms, "scenario loaded");
            let player = ScenarioPlayer::new(scenario, &loaded, links.clone());
            let running = running.clone();
            workers.push(spawn("andon-scenario", move || {
                run_player(player, &clock, &running, SCENARIO_POLL)
            })?);
        }
        None => info!("No scenario given, waiting for external producers"),
    }

    rt_setup(args.cpu_core, args.rt_priority)?;
    info!(
        "RT setup complete (cpu_core={}, priority={})",
        args.cpu_core, args.rt_priority
    );

    let mut runner = CycleRunner::new(&loaded, links, clock);
    info!("CycleRunner initialized, entering control loop");
    let result = runner.run(&running);

    running.store(false, Ordering::SeqCst);
    for (name, handle) in workers {
        handle.join().map_err(|_| ControllerError::Thread {
            name,
            reason: "panicked".into(),
        })?;
    }
    result
}

/// Log every light change, as the LED driver would render it.
fn spawn_led_observer(
    links: Links,
    running: Arc<AtomicBool>,
) -> Result<(&'static str, JoinHandle<()>), ControllerError> {
    spawn("andon-led", move || {
        let mut reader = SlotReader::new(links.system_state.clone());
        let initial = SystemState::Uninitialized;
        info!(state = ?initial, color = %andon_color(initial, &links.runtime.snapshot()), "light");
        while running.load(Ordering::Relaxed) {
            if let Some(state) = reader.try_recv() {
                let color = andon_color(state, &links.runtime.snapshot());
                info!(?state, %color, "light");
            }
            std::thread::sleep(LED_POLL);
        }
    })
}

fn spawn<F>(name: &'static str, f: F) -> Result<(&'static str, JoinHandle<()>), ControllerError>
where
    F: FnOnce() + Send + 'static,
{
    std::thread::Builder::new()
        .name(name.into())
        .spawn(f)
        .map(|handle| (name, handle))
        .map_err(|e| ControllerError::Thread {
            name,
            reason: e.to_string(),
        })
}

/// Setup tracing subscriber based on CLI arguments and the file's log level.
fn setup_tracing(args: &Args, file_level: Option<LogLevel>) {
    let level = if args.verbose {
        Level::DEBUG
    } else {
        file_level
            .unwrap_or_default()
            .as_directive()
            .parse()
            .unwrap_or(Level::INFO)
    };

    let filter = EnvFilter::from_default_env().add_directive(level.into());

    if args.json {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .json()
            .init();
    } else {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .compact()
            .init();
    }
}
