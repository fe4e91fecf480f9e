//! Per-frame simulation driver
//!
//! One call to [`tick`] advances the world by `dt` in a fixed order:
//! player, summon roster, enemies, summons, projectiles, status effects,
//! death bookkeeping, orbs and progression, then the game-over check. A kill
//! anywhere in the frame is therefore visible to the same frame's orb and
//! XP logic.

use glam::Vec2;
use serde::{Deserialize, Serialize};

use super::enemy::{BossKind, separate, spawn_ring, update_enemies};
use super::events::{SimEvent, SoundCue};
use super::hit::{HitOptions, HitResolver};
use super::orbs::{spawn_orbs, update_orbs};
use super::player::swing_melee;
use super::projectile::{spawn_projectile, update_projectiles};
use super::state::{Phase, World};

/// Player intent for one frame, already resolved from devices by the host
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FrameInput {
    /// Movement direction (length ≤ 1 after clamping)
    pub movement: Vec2,
    /// Aim direction; falls back to the player's facing
    pub aim: Option<Vec2>,
    pub fire: bool,
    /// Melee swing
    pub attack: bool,
    pub reload: bool,
    /// Index into the pending upgrade offer
    pub choose_upgrade: Option<usize>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FrameOutcome {
    /// Delta rejected by the sanity gate; nothing moved
    Skipped,
    /// Waiting on an upgrade choice
    Frozen,
    Advanced,
    GameOver,
}

/// Advance the world by one frame
pub fn tick(world: &mut World, input: &FrameInput, dt: f32) -> FrameOutcome {
    if world.phase == Phase::GameOver {
        return FrameOutcome::GameOver;
    }
    if !dt.is_finite() || dt <= 0.0 || dt > world.tuning.max_frame_dt {
        log::debug!("Skipping frame {} (dt = {})", world.frame, dt);
        return FrameOutcome::Skipped;
    }

    if world.phase == Phase::LevelUp {
        apply_upgrade_choice(world, input);
        if world.phase == Phase::LevelUp {
            return FrameOutcome::Frozen;
        }
    }

    world.time += dt;
    world.frame += 1;

    step_player(world, input, dt);
    world.summons.sync_roster(&world.ledger, world.player.pos);
    step_enemies(world, dt);

    {
        let mut hits = HitResolver::new(
            &mut world.player,
            &mut world.ledger,
            &mut world.effects,
            &mut world.events,
            &mut world.kills,
            &mut world.rng,
        );
        world
            .summons
            .update(&mut world.enemies, &mut world.projectiles, &mut hits, dt);
        update_projectiles(&mut world.projectiles, &mut world.enemies, &mut hits, &world.bounds, dt);
    }

    step_status(world, dt);
    reap_kills(world);
    collect_orbs(world, dt);

    if !world.player.is_alive() {
        world.phase = Phase::GameOver;
        world.events.push(SimEvent::GameOver);
        log::info!(
            "Game over at {:.1}s: level {}, {} kills",
            world.time,
            world.progression.level,
            world.total_kills
        );
        return FrameOutcome::GameOver;
    }

    FrameOutcome::Advanced
}

fn apply_upgrade_choice(world: &mut World, input: &FrameInput) {
    let Some(index) = input.choose_upgrade else {
        return;
    };
    if let Some(upgrade) = world
        .progression
        .select(index, &mut world.player.stats, &mut world.ledger)
    {
        world.events.push(SimEvent::UpgradeApplied { upgrade });
        world.phase = Phase::Playing;
    }
}

fn step_player(world: &mut World, input: &FrameInput, dt: f32) {
    let player = &mut world.player;
    player.step_movement(input.movement, &world.bounds, dt);
    player.tick_timers(dt);
    if input.reload {
        player.start_reload();
    }

    if input.fire {
        let aim = input.aim.unwrap_or(player.facing);
        if let Some(spec) = player.try_fire(aim, &mut world.rng) {
            spawn_projectile(&mut world.projectiles, spec);
        }
    }

    if input.attack {
        if let Some(aim) = input.aim.filter(|a| a.length_squared() > 1e-6) {
            world.player.facing = aim.normalize();
        }
        let mut hits = HitResolver::new(
            &mut world.player,
            &mut world.ledger,
            &mut world.effects,
            &mut world.events,
            &mut world.kills,
            &mut world.rng,
        );
        swing_melee(&mut world.enemies, &mut hits);
    }
}

fn step_enemies(world: &mut World, dt: f32) {
    let batch = world.spawner.advance(dt);
    if batch > 0 {
        let scale = world.health_scale();
        spawn_ring(
            &mut world.enemies,
            &mut world.rng,
            world.player.pos,
            &world.bounds,
            batch,
            scale,
        );
        log::debug!("Spawned {} enemies ({} alive)", batch, world.enemies.len());
    }

    if !world.boss_spawned && world.tuning.boss_time.is_some_and(|t| world.time >= t) {
        world.spawn_boss(BossKind::Stag);
    }

    update_enemies(
        &mut world.enemies,
        &mut world.projectiles,
        &mut world.player,
        &mut world.events,
        &world.bounds,
        &mut world.rng,
        dt,
    );
    separate(&mut world.enemies, &world.bounds);
}

/// Status payloads go through the same hit path: no knockback, no new effects
fn step_status(world: &mut World, dt: f32) {
    let due = world.effects.tick(dt, &world.enemies);
    if due.is_empty() {
        return;
    }
    let mut hits = HitResolver::new(
        &mut world.player,
        &mut world.ledger,
        &mut world.effects,
        &mut world.events,
        &mut world.kills,
        &mut world.rng,
    );
    let opts = HitOptions::status_tick();
    for tick in due {
        hits.apply_hit(&mut world.enemies, tick.target, tick.damage, &opts);
    }
}

/// Turn this frame's deaths into XP orbs
fn reap_kills(world: &mut World) {
    if world.kills.is_empty() {
        return;
    }
    world.total_kills += world.kills.len() as u32;
    spawn_orbs(&mut world.orbs, &world.kills, &mut world.rng);
    world.kills.clear();
}

fn collect_orbs(world: &mut World, dt: f32) {
    let xp = update_orbs(
        &mut world.orbs,
        world.player.pos,
        world.player.stats.magnet_radius,
        dt,
    );
    if xp == 0 {
        return;
    }
    world.events.push(SimEvent::XpCollected { amount: xp });

    let leveled = world
        .progression
        .add_xp(xp, &world.player.stats, &world.ledger, &mut world.rng);
    if let Some(level) = leveled {
        world.events.push(SimEvent::LevelUp {
            level,
            choices: world.progression.choices.clone(),
        });
        world.events.sound(SoundCue::Success);
        if world.progression.is_choosing() {
            world.phase = Phase::LevelUp;
        }
    }
}
