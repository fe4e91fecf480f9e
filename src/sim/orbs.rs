//! XP orbs dropped by dead enemies

use glam::Vec2;
use rand::Rng;
use serde::{Deserialize, Serialize};

use super::arena::{Arena, Id};
use super::hit::KillRecord;
use crate::consts::{ORB_COLLECT_RADIUS, ORB_DAMPING, ORB_MAX_SPEED, ORB_PULL_ACCEL};
use crate::polar_to_cartesian;

pub type OrbId = Id<XpOrb>;

/// Initial scatter speed of a fresh orb
const ORB_POP_SPEED: f32 = 3.0;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct XpOrb {
    pub pos: Vec2,
    pub value: u32,
    pub velocity: Vec2,
    /// Once set, the orb homes on the player for good
    pub magnetized: bool,
}

/// One orb per kill record
pub fn spawn_orbs(orbs: &mut Arena<XpOrb>, kills: &[KillRecord], rng: &mut impl Rng) {
    for kill in kills.iter().filter(|k| k.xp > 0) {
        let angle = rng.random_range(0.0..std::f32::consts::TAU);
        orbs.insert(XpOrb {
            pos: kill.pos,
            value: kill.xp,
            velocity: polar_to_cartesian(ORB_POP_SPEED, angle),
            magnetized: false,
        });
    }
}

/// Drift, magnetize and collect. Returns the XP collected this frame.
pub fn update_orbs(orbs: &mut Arena<XpOrb>, player_pos: Vec2, magnet_radius: f32, dt: f32) -> u32 {
    let damping = (-ORB_DAMPING * dt).exp();
    let mut collected = 0;

    orbs.retain(|_, orb| {
        if !orb.magnetized && orb.pos.distance(player_pos) <= magnet_radius {
            orb.magnetized = true;
        }
        if orb.magnetized {
            let pull = (player_pos - orb.pos).normalize_or_zero() * ORB_PULL_ACCEL * dt;
            orb.velocity = (orb.velocity + pull).clamp_length_max(ORB_MAX_SPEED);
        } else {
            orb.velocity *= damping;
        }

        let start = orb.pos;
        orb.pos += orb.velocity * dt;

        // Closest approach along this frame's path, so fast orbs cannot skip past
        if segment_distance(start, orb.pos, player_pos) <= ORB_COLLECT_RADIUS {
            collected += orb.value;
            return false;
        }
        true
    });

    collected
}

fn segment_distance(a: Vec2, b: Vec2, p: Vec2) -> f32 {
    let ab = b - a;
    let len_sq = ab.length_squared();
    if len_sq <= f32::EPSILON {
        return p.distance(a);
    }
    let t = ((p - a).dot(ab) / len_sq).clamp(0.0, 1.0);
    p.distance(a + ab * t)
}
