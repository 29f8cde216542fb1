//! `tagfuse` – command line front end for the vision fusion stack.
//!
//! ```text
//! tagfuse [--config <path>] config [--init]
//! tagfuse [--config <path>] replay <scenario.json>
//! tagfuse [--config <path>] sim [cycles]
//! ```
//!
//! **Ctrl-C** stops a running `sim` after the current cycle.

mod config;
mod scenario;
mod world;

use colored::Colorize;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::thread;
use std::time::Duration;
use tracing::warn;

use tagfuse_hal::{Drivetrain, LatchHandle, LatchedPoseSource, OffsetClock};
use tagfuse_hal::sim::SimDrivetrain;
use tagfuse_perception::VisionFusionEngine;
use tagfuse_runtime::{ControlLoop, init_tracing};
use tagfuse_types::{EstimateOutcome, Pose2d, TagfuseError};

use crate::config::Config;
use crate::world::{SimCamera, Track};

/// How often a simulated camera publishes a frame.
const CAMERA_FRAME_PERIOD: Duration = Duration::from_millis(30);
/// Cycles between `sim` status lines.
const STATUS_EVERY: u64 = 50;

#[derive(Debug, PartialEq)]
enum Command {
    ShowConfig { init: bool },
    Replay { scenario: PathBuf },
    Sim { cycles: Option<u64> },
    Help,
}

#[derive(Debug, PartialEq)]
struct Invocation {
    config_path: Option<String>,
    command: Command,
}

fn main() {
    let _guard = init_tracing("tagfuse");

    let args: Vec<String> = std::env::args().skip(1).collect();
    let invocation = match parse_args(&args) {
        Ok(inv) => inv,
        Err(msg) => {
            eprintln!("{}: {msg}", "Usage error".red());
            print_usage();
            std::process::exit(2);
        }
    };

    if let Err(e) = run(invocation) {
        eprintln!("{}: {e}", "Error".red().bold());
        std::process::exit(1);
    }
}

fn run(invocation: Invocation) -> Result<(), TagfuseError> {
    let path = config::resolve_path(invocation.config_path.as_deref());
    match invocation.command {
        Command::Help => {
            print_usage();
            Ok(())
        }
        Command::ShowConfig { init } => show_config(&path, init),
        Command::Replay { scenario } => {
            let cfg = config::load_from(&path)?;
            run_replay(&scenario, &cfg)
        }
        Command::Sim { cycles } => {
            let cfg = config::load_from(&path)?;
            print_banner();
            run_sim(&cfg, cycles)
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Argument parsing
// ─────────────────────────────────────────────────────────────────────────────

fn parse_args(args: &[String]) -> Result<Invocation, String> {
    let mut config_path = None;
    let mut positional = Vec::new();
    let mut init = false;

    let mut iter = args.iter();
    while let Some(arg) = iter.next() {
        match arg.as_str() {
            "--config" | "-c" => {
                let value = iter.next().ok_or("--config requires a path")?;
                config_path = Some(value.clone());
            }
            "--init" => init = true,
            "--help" | "-h" => {
                return Ok(Invocation {
                    config_path,
                    command: Command::Help,
                });
            }
            other if other.starts_with('-') => return Err(format!("unknown flag '{other}'")),
            other => positional.push(other),
        }
    }

    let command = match positional.as_slice() {
        [] | ["help"] => Command::Help,
        ["config"] => Command::ShowConfig { init },
        ["replay", file] => Command::Replay {
            scenario: PathBuf::from(file),
        },
        ["replay"] => return Err("replay requires a scenario file".to_string()),
        ["sim"] => Command::Sim { cycles: None },
        ["sim", n] => Command::Sim {
            cycles: Some(
                n.parse()
                    .map_err(|_| format!("'{n}' is not a valid cycle count"))?,
            ),
        },
        [cmd, ..] => return Err(format!("unexpected arguments starting at '{cmd}'")),
    };
    if init && !matches!(command, Command::ShowConfig { .. }) {
        return Err("--init only applies to the config command".to_string());
    }

    Ok(Invocation {
        config_path,
        command,
    })
}

// ─────────────────────────────────────────────────────────────────────────────
// Commands
// ─────────────────────────────────────────────────────────────────────────────

fn show_config(path: &Path, init: bool) -> Result<(), TagfuseError> {
    if init {
        if path.exists() {
            return Err(TagfuseError::Config(format!(
                "{} already exists; refusing to overwrite",
                path.display()
            )));
        }
        config::save_to(&Config::default(), path)?;
        println!("  {} {}", "Wrote".green(), path.display().to_string().bold());
    }

    let source = if path.exists() {
        path.display().to_string()
    } else {
        "built-in defaults".to_string()
    };
    let cfg = config::load_from(path)?;
    let rendered = toml::to_string_pretty(&cfg)
        .map_err(|e| TagfuseError::Config(format!("Failed to serialize config: {e}")))?;
    println!("# effective configuration ({source})");
    print!("{rendered}");
    Ok(())
}

fn run_replay(path: &Path, cfg: &Config) -> Result<(), TagfuseError> {
    let scenario = scenario::Scenario::load(path)?;
    let out = scenario::replay(&scenario, cfg)?;

    for (i, report) in out.reports.iter().enumerate() {
        let mode = scenario.cycles[i].mode;
        println!("{} {:?}", format!("cycle {i:>4}").bold(), mode);
        for o in &report.outcomes {
            let line = match &o.outcome {
                EstimateOutcome::Seeded { pose } => format!("seeded at {pose}").green(),
                EstimateOutcome::Fused { pose, std_devs, .. } => {
                    format!("fused {pose} ({std_devs})").cyan()
                }
                EstimateOutcome::Rejected { reason } => format!("rejected: {reason}").yellow(),
            };
            println!("    {:<20} {line}", o.source_id);
        }
    }

    println!();
    println!(
        "  {} reset(s), {} fusion(s) over {} cycle(s)",
        out.resets,
        out.fusions,
        out.reports.len()
    );
    print_telemetry(&out.telemetry)
}

fn run_sim(cfg: &Config, cycles: Option<u64>) -> Result<(), TagfuseError> {
    let track = Track::for_field(&cfg.fusion.field_bounds);
    let period = Duration::from_millis(cfg.loop_period_ms);

    let mut engine = VisionFusionEngine::new(cfg.fusion.clone())?
        .with_clock(Box::new(OffsetClock::new(cfg.clock_offset_seconds)));
    let mut cameras: Vec<(LatchHandle, SimCamera)> = Vec::with_capacity(cfg.sources.len());
    for (i, id) in cfg.sources.iter().enumerate() {
        let (source, handle) = LatchedPoseSource::new(id.clone());
        engine.add_source(Box::new(source))?;
        cameras.push((handle, SimCamera::for_index(i, &track)));
    }

    // Odometry starts at the origin; vision has to find the robot.
    let mut control = ControlLoop::new(SimDrivetrain::new(Pose2d::default()), engine);

    let shutdown = Arc::new(AtomicBool::new(false));
    let shutdown_ctrlc = shutdown.clone();
    if let Err(e) = ctrlc::set_handler(move || {
        println!();
        println!("{}", "⚠  Ctrl-C received – stopping simulation …".yellow().bold());
        shutdown_ctrlc.store(true, Ordering::SeqCst);
    }) {
        warn!(
            error = %e,
            "Failed to install Ctrl-C handler; the simulation must run to its cycle limit"
        );
    }

    // Simulated time in microseconds, advanced by the control loop.
    let sim_time_us = AtomicU64::new(0);
    let period_s = period.as_secs_f64();
    let mut previous_truth = track.pose_at(0.0);

    println!(
        "  Simulating {} source(s) at {} ms/cycle{}",
        cfg.sources.len(),
        cfg.loop_period_ms,
        cycles.map(|n| format!(" for {n} cycles")).unwrap_or_default()
    );

    let ran = thread::scope(|scope| {
        for (handle, camera) in &cameras {
            let shutdown = shutdown.clone();
            let sim_time_us = &sim_time_us;
            let track = &track;
            scope.spawn(move || {
                while !shutdown.load(Ordering::SeqCst) {
                    let now_us = sim_time_us.load(Ordering::SeqCst) as i64;
                    if let Err(e) = handle.publish_botpose(&camera.frame(track, now_us), now_us) {
                        warn!(error = %e, "Dropped simulated camera frame");
                    }
                    thread::sleep(CAMERA_FRAME_PERIOD);
                }
            });
        }

        let ran = control.run(period, &shutdown, |lp| {
            let cycle = lp.cycles();
            if cycles.is_some_and(|limit| cycle >= limit) {
                return None;
            }
            let now_s = cycle as f64 * period_s;
            let now = track.pose_at(now_s);
            let (dx, dy, dheading) = world::odometry_between(previous_truth, now);
            lp.drivetrain_mut().apply_odometry(dx, dy, dheading);
            previous_truth = now;
            sim_time_us.store((now_s * 1e6) as u64, Ordering::SeqCst);

            if cycle % STATUS_EVERY == 0 {
                let seeded = lp.engine().state().pose_seeded();
                print_status(cycle, now, lp.drivetrain().current_pose(), seeded);
            }
            Some(world::mode_at(cycle))
        });

        // Stops the camera threads before the scope joins them.
        shutdown.store(true, Ordering::SeqCst);
        ran
    });

    println!();
    println!("  Ran {ran} cycle(s).");
    print_telemetry(&control.telemetry())
}

// ─────────────────────────────────────────────────────────────────────────────
// Output
// ─────────────────────────────────────────────────────────────────────────────

fn print_status(cycle: u64, truth: Pose2d, estimate: Pose2d, seeded: bool) {
    let error = truth.translation_distance(&estimate);
    let error_str = format!("{error:.3} m");
    let error_str = if error < 0.1 {
        error_str.green()
    } else if error < 0.5 {
        error_str.yellow()
    } else {
        error_str.red()
    };
    println!(
        "  {} est {}  truth {}  error {}  {}",
        format!("[{cycle:>6}]").dimmed(),
        estimate,
        truth,
        error_str,
        if seeded { "seeded".green() } else { "unseeded".yellow() }
    );
}

fn print_telemetry(telemetry: &tagfuse_perception::FusionTelemetry) -> Result<(), TagfuseError> {
    let json = serde_json::to_string_pretty(telemetry)
        .map_err(|e| TagfuseError::Scenario(format!("Failed to serialize telemetry: {e}")))?;
    println!("{json}");
    Ok(())
}

fn print_banner() {
    println!();
    println!("{}", r#"  _                  __              "#.bold().cyan());
    println!("{}", r#" | |_ __ _  __ _   / _|_   _ ___  ___ "#.bold().cyan());
    println!("{}", r#" | __/ _` |/ _` | | |_| | | / __|/ _ \"#.bold().cyan());
    println!("{}", r#" | || (_| | (_| | |  _| |_| \__ \  __/"#.bold().cyan());
    println!("{}", r#"  \__\__,_|\__, | |_|  \__,_|___/\___|"#.bold().cyan());
    println!("{}", r#"           |___/                      "#.bold().cyan());
    println!();
    println!(
        "  {} {}",
        "tagfuse".bold(),
        format!("v{}", env!("CARGO_PKG_VERSION")).dimmed()
    );
    println!("  AprilTag pose fusion");
    println!();
}

fn print_usage() {
    println!("{}", "Usage:".bold());
    println!("  tagfuse [--config <path>] config [--init]   Print (or create) the configuration");
    println!("  tagfuse [--config <path>] replay <file>     Replay a JSON scenario");
    println!("  tagfuse [--config <path>] sim [cycles]      Run the simulated robot loop");
    println!();
    println!("  Config defaults to ./{}.", config::DEFAULT_CONFIG_FILE);
}
