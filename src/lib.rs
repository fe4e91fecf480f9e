//! Horde Sim - combat simulation core for a top-down survival shooter
//!
//! Core modules:
//! - `sim`: Frame-driven simulation (enemies, projectiles, summons, damage, progression)
//! - `tuning`: Data-driven game balance
//!
//! Rendering, input capture, audio playback and room generation live outside
//! this crate. They talk to the core through [`sim::FrameInput`],
//! [`sim::World::snapshot`] and the drained [`sim::SimEvent`] queue.

pub mod sim;
pub mod tuning;

pub use tuning::{Difficulty, Tuning, TuningError};

use glam::{Vec2, Vec3};

/// Engine constants that are not exposed through [`Tuning`]
pub mod consts {
    /// Frames with a larger delta (tab stall, debugger) are skipped, not integrated
    pub const MAX_FRAME_DT: f32 = 0.25;

    /// Auto-spawn ring around the player
    pub const SPAWN_DISTANCE_MIN: f32 = 30.0;
    pub const SPAWN_DISTANCE_MAX: f32 = 50.0;

    /// Default symmetric world bound per axis
    pub const WORLD_HALF_EXTENT: f32 = 60.0;

    /// Projectile contact radius (added to the enemy body radius)
    pub const PROJECTILE_HIT_RADIUS: f32 = 0.6;
    /// Homing acquisition radius
    pub const HOMING_RADIUS: f32 = 15.0;
    /// Homing rate: each frame blends `1 - e^(-rate·dt)` of the way to the target
    pub const HOMING_TURN_RATE: f32 = 5.0;
    /// Deterministic slow turn applied to every projectile (radians/sec)
    pub const CURVE_RATE: f32 = 0.12;
    /// Bound on the random per-frame heading jitter (radians/sec)
    pub const CURVE_JITTER: f32 = 0.5;

    /// Trail ring buffer length
    pub const TRAIL_LENGTH: usize = 24;
    /// Minimum spacing between trail samples
    pub const TRAIL_SAMPLE_SPACING: f32 = 0.25;
    /// Cap on interpolated samples appended in one frame
    pub const MAX_TRAIL_SUBSAMPLES: usize = 8;

    /// Damage multiplier applied per chain-lightning hop
    pub const CHAIN_DAMAGE_FALLOFF: f32 = 0.7;

    /// Hit flash duration on enemies
    pub const HIT_FLASH_SECS: f32 = 0.12;
    /// Knockback impulse before the player's multiplier
    pub const BASE_KNOCKBACK: f32 = 6.0;
    /// Exponential decay of enemy knockback velocity (per second)
    pub const KNOCKBACK_DAMPING: f32 = 8.0;

    /// Player invincibility window after losing a heart
    pub const INVINCIBILITY_SECS: f32 = 1.0;

    /// Curse payload = base damage × this × summon curse bonus
    pub const CURSE_DAMAGE_MULTIPLIER: f32 = 3.0;
    /// Delay before a curse detonates
    pub const CURSE_DELAY_SECS: f32 = 2.0;
    /// Burn tick interval
    pub const BURN_TICK_SECS: f32 = 0.25;
    /// Burn duration
    pub const BURN_DURATION_SECS: f32 = 2.0;

    /// Every Nth summon kill restores a heart while soul drain is active
    pub const SOUL_DRAIN_KILLS: u32 = 500;
    /// Seconds without a player kill before the streak resets
    pub const KILL_STREAK_WINDOW: f32 = 3.0;
    /// Every Nth streak kill refills the magazine
    pub const KILL_STREAK_BONUS_EVERY: u32 = 10;

    /// XP orb collection radius
    pub const ORB_COLLECT_RADIUS: f32 = 1.0;
    /// Acceleration of a magnetized orb toward the player
    pub const ORB_PULL_ACCEL: f32 = 45.0;
    pub const ORB_MAX_SPEED: f32 = 20.0;
    /// Drift damping for free orbs (per second)
    pub const ORB_DAMPING: f32 = 4.0;

    /// Lifetimes of the transient overlay records
    pub const DAMAGE_NUMBER_LIFETIME: f32 = 0.8;
    pub const IMPACT_LIFETIME: f32 = 0.25;

    /// Player melee swing
    pub const MELEE_RANGE: f32 = 2.5;
    /// Cosine of the half-angle of the melee cone
    pub const MELEE_CONE_COS: f32 = 0.5;
    pub const MELEE_COOLDOWN_SECS: f32 = 0.45;
    pub const MELEE_KNOCKBACK: f32 = 1.5;

    /// Spread at accuracy 0 (radians, full cone half-width)
    pub const MAX_SPREAD: f32 = 0.35;

    /// Upgrade choices offered per level-up
    pub const UPGRADE_CHOICES: usize = 3;
}

/// Convert polar (r, theta) on the ground plane to cartesian
#[inline]
pub fn polar_to_cartesian(r: f32, theta: f32) -> Vec2 {
    Vec2::new(r * theta.cos(), r * theta.sin())
}

/// Rotate a ground-plane vector by `angle` radians
#[inline]
pub fn rotate(v: Vec2, angle: f32) -> Vec2 {
    Vec2::from_angle(angle).rotate(v)
}

/// Lift a ground-plane position into world space (the vertical axis is fixed at 0)
#[inline]
pub fn ground_to_world(p: Vec2) -> Vec3 {
    Vec3::new(p.x, 0.0, p.y)
}

/// Project a world position onto the ground plane
#[inline]
pub fn world_to_ground(p: Vec3) -> Vec2 {
    Vec2::new(p.x, p.z)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::f32::consts::PI;

    #[test]
    fn test_rotate_quarter_turn() {
        let v = rotate(Vec2::X, PI / 2.0);
        assert!(v.x.abs() < 1e-5);
        assert!((v.y - 1.0).abs() < 1e-5);
    }

    #[test]
    fn test_ground_round_trip() {
        let p = Vec2::new(3.0, -4.0);
        let w = ground_to_world(p);
        assert_eq!(w.y, 0.0);
        assert_eq!(world_to_ground(w), p);
    }
}
