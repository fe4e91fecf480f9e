//! Damage and hit-chance arithmetic
//!
//! Pure functions over attacker/defender stat pairs. The only mutation is in
//! [`resolve_damage`], which writes the rolled damage back into a defender's
//! stat block; everything inside the enemy arena goes through
//! [`crate::sim::hit::HitResolver`] instead.

use rand::Rng;
use serde::{Deserialize, Serialize};

/// Lower bound of the damage variance roll
pub const DAMAGE_ROLL_MIN: f32 = 0.8;
/// Upper bound of the damage variance roll
pub const DAMAGE_ROLL_MAX: f32 = 1.2;

pub const BASE_HIT_CHANCE: f32 = 0.85;
pub const HIT_CHANCE_PER_POINT: f32 = 0.01;
pub const MIN_HIT_CHANCE: f32 = 0.10;
pub const MAX_HIT_CHANCE: f32 = 0.95;

pub const CRIT_CHANCE: f32 = 0.10;
pub const CRIT_MULTIPLIER_MIN: f32 = 1.5;
pub const CRIT_MULTIPLIER_MAX: f32 = 2.0;

/// Minimal stat pair used by the resolver
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CombatStats {
    pub attack: i32,
    pub defense: i32,
    pub health: i32,
}

impl CombatStats {
    pub fn new(attack: i32, defense: i32, health: i32) -> Self {
        Self {
            attack,
            defense,
            health,
        }
    }
}

/// Roll damage without touching either side: `floor(attack × U[0.8, 1.2]) − defense`, at least 1
pub fn roll_damage(attacker: &CombatStats, defender: &CombatStats, rng: &mut impl Rng) -> i32 {
    let factor = rng.random_range(DAMAGE_ROLL_MIN..=DAMAGE_ROLL_MAX);
    let raw = (attacker.attack as f32 * factor).floor() as i32;
    (raw - defender.defense).max(1)
}

/// Roll damage and subtract it from the defender's health (clamped at zero)
pub fn resolve_damage(attacker: &CombatStats, defender: &mut CombatStats, rng: &mut impl Rng) -> i32 {
    let damage = roll_damage(attacker, defender, rng);
    defender.health = (defender.health - damage).max(0);
    damage
}

/// Probability that an attack connects
pub fn hit_chance(attacker: &CombatStats, defender: &CombatStats) -> f32 {
    let diff = (attacker.attack - defender.defense) as f32;
    (BASE_HIT_CHANCE + diff * HIT_CHANCE_PER_POINT).clamp(MIN_HIT_CHANCE, MAX_HIT_CHANCE)
}

pub fn roll_hit(attacker: &CombatStats, defender: &CombatStats, rng: &mut impl Rng) -> bool {
    rng.random::<f32>() < hit_chance(attacker, defender)
}

/// Critical roll: `Some(multiplier)` on a crit
pub fn roll_critical(rng: &mut impl Rng) -> Option<f32> {
    if rng.random::<f32>() < CRIT_CHANCE {
        Some(rng.random_range(CRIT_MULTIPLIER_MIN..=CRIT_MULTIPLIER_MAX))
    } else {
        None
    }
}
