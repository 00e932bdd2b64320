//! `joycar-cli` – JoyCar operator binary
//!
//! This binary runs the motion-control core against a simulated bus.  It:
//!
//! 1. Loads `~/.joycar/config.toml`, writing the defaults on first run.
//! 2. Brings up a [`JoyCarRobot`] on the simulated sensor expander and motor
//!    driver, with a wall clock and a terminal display.
//! 3. Runs a scripted drive sequence (forward, reverse, spin, stop) at a
//!    fixed control-cycle period.
//! 4. Intercepts **Ctrl-C** and performs an emergency shutdown before exiting.

mod config;
mod script;
mod terminal;

use colored::Colorize;
use std::process::ExitCode;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;
use tracing::{info, warn};

use joycar_drive::JoyCarRobot;
use joycar_hal::sim::SimBus;
use joycar_hal::SystemClock;
use joycar_types::JoyError;

use crate::script::DEMO_SCRIPT;
use crate::terminal::TerminalDisplay;

fn main() -> ExitCode {
    // ── Structured logging ────────────────────────────────────────────────
    // RUST_LOG selects the level (default "info").  JOYCAR_LOG_FORMAT=json
    // switches to newline-delimited JSON.
    let log_level = std::env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string());
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&log_level));

    if std::env::var("JOYCAR_LOG_FORMAT").as_deref() == Ok("json") {
        tracing_subscriber::fmt()
            .with_env_filter(env_filter)
            .with_target(true)
            .json()
            .init();
    } else {
        tracing_subscriber::fmt()
            .with_env_filter(env_filter)
            .with_target(true)
            .compact()
            .init();
    }

    print_banner();

    // ── Ctrl-C handler ────────────────────────────────────────────────────
    // The handler only raises the flag; the control loop owns the robot and
    // performs the shutdown itself.
    let shutdown = Arc::new(AtomicBool::new(false));
    let shutdown_clone = Arc::clone(&shutdown);

    if let Err(e) = ctrlc::set_handler(move || {
        println!();
        println!("{}", "⚠  Ctrl-C received – stopping the wheels …".yellow().bold());
        shutdown_clone.store(true, Ordering::SeqCst);
    }) {
        warn!(error = %e, "Failed to install Ctrl-C handler; emergency stop on Ctrl-C will not be available");
    }

    // ── Configuration ─────────────────────────────────────────────────────
    let cfg = match config::load() {
        Ok(Some(cfg)) => {
            println!(
                "  Config loaded from {}",
                config::config_path().display().to_string().bold()
            );
            cfg
        }
        Ok(None) => {
            let mut cfg = config::Config::default();
            config::apply_env_overrides(&mut cfg);
            match config::save(&config::Config::default()) {
                Ok(()) => println!(
                    "  {} Default config written to {}",
                    "✓".green().bold(),
                    config::config_path().display().to_string().bold()
                ),
                Err(e) => println!("{}: {}", "Error saving config".red(), e),
            }
            cfg
        }
        Err(e) => {
            println!("{}: {}", "Config error".red(), e);
            println!("  Using default configuration.");
            let mut cfg = config::Config::default();
            config::apply_env_overrides(&mut cfg);
            cfg
        }
    };

    // ── Robot bring-up ────────────────────────────────────────────────────
    let clock = SystemClock::shared();
    let mut robot = match JoyCarRobot::new(
        Box::new(SimBus::new()),
        clock,
        Box::new(TerminalDisplay::new()),
        &cfg.robot,
    ) {
        Ok(robot) => robot,
        Err(e) => {
            println!("{}: {}", "Robot start-up failed".red().bold(), e);
            return ExitCode::FAILURE;
        }
    };

    println!(
        "  Running demo script, {} ms control cycle.  Press {} to stop.\n",
        cfg.cycle_ms,
        "Ctrl-C".bold().cyan()
    );

    // ── Control loop ──────────────────────────────────────────────────────
    if run_script(&mut robot, cfg.cycle_ms, &shutdown) {
        return emergency_stop(&mut robot);
    }

    match robot.stop() {
        Ok(()) => {
            println!("\n  {} Demo finished, wheels stopped.", "✓".green().bold());
            ExitCode::SUCCESS
        }
        Err(e) => {
            println!("{}: {}", "Final stop failed".red().bold(), e);
            emergency_stop(&mut robot)
        }
    }
}

/// Drive through [`DEMO_SCRIPT`].  Returns `true` when interrupted.
fn run_script(robot: &mut JoyCarRobot, cycle_ms: u64, shutdown: &AtomicBool) -> bool {
    let cycle = Duration::from_millis(cycle_ms);
    for step in DEMO_SCRIPT {
        info!(
            step = step.name,
            forward_mps = step.forward_mps,
            angular_rad_s = step.angular_rad_s,
            "drive step"
        );
        if let Err(e) = robot
            .wheels_mut()
            .set_velocity(step.forward_mps, step.angular_rad_s)
        {
            warn!(error = %e, step = step.name, "velocity command failed");
        }
        for _ in 0..step.cycles(cycle_ms) {
            if shutdown.load(Ordering::SeqCst) {
                return true;
            }
            if let Err(e) = robot.update() {
                warn!(error = %e, "control cycle failed");
            }
            std::thread::sleep(cycle);
        }
    }
    shutdown.load(Ordering::SeqCst)
}

fn emergency_stop(robot: &mut JoyCarRobot) -> ExitCode {
    match robot.emergency_shutdown() {
        Ok(()) => {
            println!("{}", "  ✓ All wheels stopped.".green());
            println!("{}", "  ✓ Exiting JoyCar.".green());
            ExitCode::SUCCESS
        }
        Err(JoyError::AggregatedShutdownFailure(failures)) => {
            for failure in &failures {
                println!("  {} {}", "✗".red().bold(), failure);
            }
            ExitCode::FAILURE
        }
        Err(e) => {
            println!("  {} {}", "✗".red().bold(), e);
            ExitCode::FAILURE
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Banner
// ─────────────────────────────────────────────────────────────────────────────

fn print_banner() {
    println!();
    println!("{}", r#"       __            ______          "#.bold().cyan());
    println!("{}", r#"      / /___  __  __/ ____/___ ______"#.bold().cyan());
    println!("{}", r#" __  / / __ \/ / / / /   / __ `/ ___/"#.bold().cyan());
    println!("{}", r#"/ /_/ / /_/ / /_/ / /___/ /_/ / /    "#.bold().cyan());
    println!("{}", r#"\____/\____/\__, /\____/\__,_/_/     "#.bold().cyan());
    println!("{}", r#"           /____/                    "#.bold().cyan());
    println!();
    println!(
        "  {} {}",
        "JoyCar".bold(),
        format!("v{}", env!("CARGO_PKG_VERSION")).dimmed()
    );
    println!("  Differential-drive motion control");
    println!();
}
