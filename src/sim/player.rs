//! The player record
//!
//! The stat block is owned by the host game (UI, save data and the like
//! read it); the core reads it every frame and mutates it only through
//! upgrades, heart loss/regeneration and ammo bookkeeping.

use glam::Vec2;
use rand::Rng;
use serde::{Deserialize, Serialize};

use super::arena::Arena;
use super::combat::{CombatStats, roll_critical, roll_damage, roll_hit};
use super::enemy::Enemy;
use super::events::HitSource;
use super::hit::{HitOptions, HitResolver};
use super::projectile::{ChainLightning, Explosive, ProjectileSpec};
use super::state::WorldBounds;
use crate::consts::*;
use crate::rotate;

/// Player radius for contact checks
pub const PLAYER_RADIUS: f32 = 0.5;

/// Player stat block, mutated by upgrades
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlayerStats {
    pub max_hearts: u32,
    pub hearts: u32,
    /// Movement speed (units/sec)
    pub speed: f32,
    pub base_damage: f32,
    /// Shots per second
    pub fire_rate: f32,
    /// Seconds to refill an empty magazine
    pub reload_time: f32,
    pub ammo_capacity: u32,
    pub projectile_speed: f32,
    pub projectile_range: f32,
    pub pierce: u32,
    pub bounce: u32,
    pub homing: bool,
    pub explosive: Option<Explosive>,
    pub chain_lightning: Option<ChainLightning>,
    /// Per-tick burn damage on player shots (0 = no burn)
    #[serde(default)]
    pub burn_damage: f32,
    /// 0.0 = full spread, 1.0 = perfectly straight
    pub accuracy: f32,
    pub knockback_multiplier: f32,
    /// Health fraction at or below which a hit finishes an enemy (0 = off)
    pub instant_kill_threshold: f32,
    /// Radius within which XP orbs start homing in
    pub magnet_radius: f32,
}

impl Default for PlayerStats {
    fn default() -> Self {
        Self {
            max_hearts: 5,
            hearts: 5,
            speed: 6.0,
            base_damage: 10.0,
            fire_rate: 3.0,
            reload_time: 1.2,
            ammo_capacity: 12,
            projectile_speed: 28.0,
            projectile_range: 30.0,
            pierce: 0,
            bounce: 0,
            homing: false,
            explosive: None,
            chain_lightning: None,
            burn_damage: 0.0,
            accuracy: 0.8,
            knockback_multiplier: 1.0,
            instant_kill_threshold: 0.0,
            magnet_radius: 4.0,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Player {
    pub pos: Vec2,
    /// Unit facing, updated from aim or movement
    pub facing: Vec2,
    pub stats: PlayerStats,
    /// Seconds of invincibility left
    pub invincibility: f32,
    pub fire_cooldown: f32,
    pub ammo: u32,
    /// Seconds until the reload completes (0 = not reloading)
    pub reload_timer: f32,
    pub melee_cooldown: f32,
    pub kill_streak: u32,
    /// Time since the last player kill
    pub streak_timer: f32,
}

impl Player {
    pub fn new(stats: PlayerStats) -> Self {
        let ammo = stats.ammo_capacity;
        Self {
            pos: Vec2::ZERO,
            facing: Vec2::X,
            stats,
            invincibility: 0.0,
            fire_cooldown: 0.0,
            ammo,
            reload_timer: 0.0,
            melee_cooldown: 0.0,
            kill_streak: 0,
            streak_timer: 0.0,
        }
    }

    pub fn is_alive(&self) -> bool {
        self.stats.hearts > 0
    }

    pub fn is_reloading(&self) -> bool {
        self.reload_timer > 0.0
    }

    /// Stat pair for the combat resolver
    pub fn combat_stats(&self) -> CombatStats {
        CombatStats::new(self.stats.base_damage.round() as i32, 0, self.stats.hearts as i32)
    }

    /// Move by the resolved input vector, staying inside the room
    pub fn step_movement(&mut self, movement: Vec2, bounds: &WorldBounds, dt: f32) {
        let dir = movement.clamp_length_max(1.0);
        if dir.length_squared() > 1e-6 {
            self.pos += dir * self.stats.speed * dt;
            self.facing = dir.normalize();
        }
        self.pos = bounds.clamp(self.pos, PLAYER_RADIUS);
    }

    /// Count down every timer; completes reloads and expires kill streaks
    pub fn tick_timers(&mut self, dt: f32) {
        self.invincibility = (self.invincibility - dt).max(0.0);
        self.fire_cooldown = (self.fire_cooldown - dt).max(0.0);
        self.melee_cooldown = (self.melee_cooldown - dt).max(0.0);

        if self.reload_timer > 0.0 {
            self.reload_timer = (self.reload_timer - dt).max(0.0);
            if self.reload_timer == 0.0 {
                self.ammo = self.stats.ammo_capacity;
            }
        }

        self.streak_timer += dt;
        if self.streak_timer > KILL_STREAK_WINDOW {
            self.kill_streak = 0;
        }
    }

    /// Begin a reload (no-op if already reloading or full)
    pub fn start_reload(&mut self) {
        if !self.is_reloading() && self.ammo < self.stats.ammo_capacity {
            self.reload_timer = self.stats.reload_time.max(0.0);
            if self.reload_timer == 0.0 {
                self.ammo = self.stats.ammo_capacity;
            }
        }
    }

    pub fn refill_ammo(&mut self) {
        self.ammo = self.stats.ammo_capacity;
        self.reload_timer = 0.0;
    }

    /// Restore hearts up to the cap, returning the new count
    pub fn heal(&mut self, hearts: u32) -> u32 {
        self.stats.hearts = (self.stats.hearts + hearts).min(self.stats.max_hearts);
        self.stats.hearts
    }

    /// Fire one shot along `aim` if the weapon is ready
    ///
    /// Spends one round, starts the fire cooldown and kicks off a reload when
    /// the magazine runs dry.
    pub fn try_fire(&mut self, aim: Vec2, rng: &mut impl Rng) -> Option<ProjectileSpec> {
        if self.fire_cooldown > 0.0 || self.is_reloading() || self.ammo == 0 {
            return None;
        }
        let aim = aim.normalize_or_zero();
        if aim == Vec2::ZERO {
            return None;
        }
        self.facing = aim;

        let spread = (1.0 - self.stats.accuracy).clamp(0.0, 1.0) * MAX_SPREAD;
        let angle = if spread > 0.0 {
            rng.random_range(-spread..=spread)
        } else {
            0.0
        };
        let dir = rotate(aim, angle);

        self.ammo -= 1;
        self.fire_cooldown = 1.0 / self.stats.fire_rate.max(0.01);
        if self.ammo == 0 {
            self.start_reload();
        }

        Some(ProjectileSpec::player_shot(self, dir))
    }
}

/// Swing at every enemy inside the forward melee cone
///
/// Each target rolls hit chance and damage through the combat resolver and
/// takes the result through the hit path. Returns the number of enemies hit.
pub fn swing_melee(enemies: &mut Arena<Enemy>, hits: &mut HitResolver) -> usize {
    if hits.player.melee_cooldown > 0.0 {
        return 0;
    }
    hits.player.melee_cooldown = MELEE_COOLDOWN_SECS;

    let origin = hits.player.pos;
    let facing = hits.player.facing;
    let attacker = hits.player.combat_stats();

    let mut targets: Vec<_> = enemies
        .iter()
        .filter_map(|(id, e)| {
            let to = e.pos - origin;
            let dist = to.length();
            if dist > MELEE_RANGE + e.radius {
                return None;
            }
            let in_cone = dist < 1e-4 || to.dot(facing) / dist >= MELEE_CONE_COS;
            in_cone.then_some((id, dist, e.combat_stats()))
        })
        .collect();
    targets.sort_by(|a, b| a.1.total_cmp(&b.1).then(a.0.cmp(&b.0)));

    let mut landed = 0;
    for (id, _, defender) in targets {
        if !roll_hit(&attacker, &defender, hits.rng) {
            continue;
        }
        let mut damage = roll_damage(&attacker, &defender, hits.rng) as f32;
        let crit = roll_critical(hits.rng);
        if let Some(mult) = crit {
            damage *= mult;
        }
        let opts = HitOptions {
            knockback: MELEE_KNOCKBACK,
            crit: crit.is_some(),
            ..HitOptions::new(HitSource::Player)
        };
        if hits.apply_hit(enemies, id, damage, &opts).landed {
            landed += 1;
        }
    }
    landed
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand_pcg::Pcg32;

    #[test]
    fn test_fire_spends_ammo_and_reloads() {
        let mut rng = Pcg32::seed_from_u64(3);
        let stats = PlayerStats {
            ammo_capacity: 2,
            fire_rate: 10.0,
            reload_time: 0.5,
            ..Default::default()
        };
        let mut player = Player::new(stats);

        assert!(player.try_fire(Vec2::X, &mut rng).is_some());
        // Cooldown blocks the next shot
        assert!(player.try_fire(Vec2::X, &mut rng).is_none());
        player.tick_timers(0.11);
        assert!(player.try_fire(Vec2::X, &mut rng).is_some());
        assert_eq!(player.ammo, 0);
        assert!(player.is_reloading());

        player.tick_timers(0.2);
        assert!(player.try_fire(Vec2::X, &mut rng).is_none());
        player.tick_timers(0.31);
        assert_eq!(player.ammo, 2);
        assert!(player.try_fire(Vec2::X, &mut rng).is_some());
    }

    #[test]
    fn test_perfect_accuracy_fires_straight() {
        let mut rng = Pcg32::seed_from_u64(11);
        let mut player = Player::new(PlayerStats {
            accuracy: 1.0,
            ..Default::default()
        });
        let spec = player.try_fire(Vec2::new(0.0, 2.0), &mut rng).unwrap();
        assert!(spec.vel.x.abs() < 1e-5);
        assert!((spec.vel.length() - player.stats.projectile_speed).abs() < 1e-3);
    }

    #[test]
    fn test_movement_clamped_to_bounds() {
        let mut player = Player::new(PlayerStats::default());
        let bounds = WorldBounds::new(5.0, 5.0);
        for _ in 0..100 {
            player.step_movement(Vec2::new(1.0, 0.0), &bounds, 0.1);
        }
        assert!(player.pos.x <= 5.0 - PLAYER_RADIUS + 1e-5);
        assert!((player.facing - Vec2::X).length() < 1e-6);
    }

    #[test]
    fn test_heal_caps_at_max() {
        let mut player = Player::new(PlayerStats::default());
        player.stats.hearts = 3;
        assert_eq!(player.heal(10), player.stats.max_hearts);
    }

    #[test]
    fn test_kill_streak_expires() {
        let mut player = Player::new(PlayerStats::default());
        player.kill_streak = 4;
        player.tick_timers(KILL_STREAK_WINDOW + 0.1);
        assert_eq!(player.kill_streak, 0);
    }
}
