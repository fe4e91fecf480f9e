//! Headless run harness
//!
//! Drives the simulation with a scripted autopilot (kite away from the
//! nearest enemy, shoot at it, swing when cornered) and prints a JSON
//! summary. Useful for balance passes and for smoke-testing tuning files.

use std::process::ExitCode;

use clap::Parser;
use glam::Vec2;
use serde::Serialize;

use horde_sim::sim::{FrameInput, FrameOutcome, Phase, SimEvent, World, tick};
use horde_sim::{Difficulty, Tuning};

/// Headless survival run
#[derive(Parser, Debug)]
#[command(name = "horde-sim")]
#[command(about = "Run the combat simulation headless and print a JSON summary")]
struct Args {
    /// Random seed (overrides the tuning file)
    #[arg(long)]
    seed: Option<u64>,

    /// Simulated seconds to run
    #[arg(long, default_value_t = 120.0)]
    seconds: f32,

    /// Frames per simulated second
    #[arg(long, default_value_t = 60)]
    fps: u32,

    /// Tuning JSON file
    #[arg(long)]
    tuning: Option<std::path::PathBuf>,

    /// Difficulty preset: easy, normal or hard (overrides the tuning file)
    #[arg(long)]
    difficulty: Option<String>,

    /// Print the final world snapshot instead of the summary
    #[arg(long)]
    snapshot: bool,
}

#[derive(Serialize)]
struct RunSummary {
    seed: u64,
    difficulty: &'static str,
    seconds: f32,
    frames: u64,
    outcome: &'static str,
    level: u32,
    kills: u32,
    hearts: u32,
    enemies_alive: usize,
    upgrades: Vec<&'static str>,
    damage_events: usize,
}

/// Distance at which the autopilot starts backing off
const KITE_DISTANCE: f32 = 8.0;
/// Distance at which it swings instead of shooting
const MELEE_DISTANCE: f32 = 2.0;

fn load_tuning(args: &Args) -> Result<Tuning, String> {
    let mut tuning = match &args.tuning {
        Some(path) => {
            let json = std::fs::read_to_string(path).map_err(|e| format!("reading {}: {}", path.display(), e))?;
            Tuning::from_json(&json).map_err(|e| format!("{}: {}", path.display(), e))?
        }
        None => Tuning::default(),
    };
    if let Some(seed) = args.seed {
        tuning.seed = seed;
    }
    if let Some(name) = &args.difficulty {
        tuning.difficulty = Difficulty::from_str(name).ok_or_else(|| format!("unknown difficulty '{}'", name))?;
    }
    tuning.validate().map_err(|e| e.to_string())?;
    Ok(tuning)
}

/// Pick this frame's input from the current world
fn autopilot(world: &World) -> FrameInput {
    if world.phase == Phase::LevelUp {
        return FrameInput {
            choose_upgrade: Some(0),
            ..Default::default()
        };
    }

    let player = world.player.pos;
    let nearest = world
        .enemies
        .values()
        .map(|e| (e.pos, e.pos.distance(player)))
        .min_by(|a, b| a.1.total_cmp(&b.1));

    let Some((target, distance)) = nearest else {
        // Drift back to the room center while idle
        return FrameInput {
            movement: (-player).clamp_length_max(1.0),
            ..Default::default()
        };
    };

    let aim = (target - player).normalize_or(Vec2::X);
    let movement = if distance < KITE_DISTANCE {
        // Back off, sliding sideways so walls do not pin us
        (-aim + aim.perp() * 0.6).normalize_or_zero()
    } else {
        Vec2::ZERO
    };

    FrameInput {
        movement,
        aim: Some(aim),
        fire: distance >= MELEE_DISTANCE,
        attack: distance < MELEE_DISTANCE,
        reload: world.player.ammo == 0,
        choose_upgrade: None,
    }
}

fn main() -> ExitCode {
    env_logger::init();
    let args = Args::parse();

    let tuning = match load_tuning(&args) {
        Ok(tuning) => tuning,
        Err(e) => {
            eprintln!("Error: {}", e);
            return ExitCode::FAILURE;
        }
    };
    let seed = tuning.seed;
    let difficulty = tuning.difficulty.as_str();

    let dt = 1.0 / args.fps.max(1) as f32;
    let frames = (args.seconds.max(0.0) / dt).round() as u64;
    log::info!("Running {} frames at {} fps (seed {})", frames, args.fps, seed);

    let mut world = World::new(tuning);
    let mut upgrades = Vec::new();
    let mut damage_events = 0;
    let mut outcome = "survived";

    for _ in 0..frames {
        let input = autopilot(&world);
        let result = tick(&mut world, &input, dt);
        for event in world.drain_events() {
            match event {
                SimEvent::UpgradeApplied { upgrade } => upgrades.push(upgrade.name()),
                SimEvent::DamageNumber { .. } => damage_events += 1,
                _ => {}
            }
        }
        if result == FrameOutcome::GameOver {
            outcome = "died";
            break;
        }
    }

    let output = if args.snapshot {
        serde_json::to_string_pretty(&world.snapshot())
    } else {
        serde_json::to_string_pretty(&RunSummary {
            seed,
            difficulty,
            seconds: world.time,
            frames: world.frame,
            outcome,
            level: world.progression.level,
            kills: world.total_kills,
            hearts: world.player.stats.hearts,
            enemies_alive: world.enemies.len(),
            upgrades,
            damage_events,
        })
    };

    match output {
        Ok(json) => {
            println!("{}", json);
            ExitCode::SUCCESS
        }
        Err(e) => {
            eprintln!("Error: {}", e);
            ExitCode::FAILURE
        }
    }
}
