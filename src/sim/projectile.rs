//! In-flight projectiles
//!
//! Each frame a friendly projectile curves, moves, records its trail, homes,
//! checks range and walls, then resolves enemy contacts nearest first. Hits
//! go through the [`HitResolver`]; explosions and chain lightning cascade
//! from there. Hostile projectiles (boss volleys) only look for the player.

use std::collections::{HashSet, VecDeque};

use glam::Vec2;
use rand::Rng;
use serde::{Deserialize, Serialize};

use super::arena::{Arena, Id};
use super::collision::{circle_contact, reflect_velocity};
use super::enemy::{Enemy, EnemyId, nearest_enemy};
use super::events::{EventLog, HitSource, SimEvent};
use super::hit::{HitOptions, HitResolver, apply_player_damage};
use super::player::{PLAYER_RADIUS, Player};
use super::state::WorldBounds;
use crate::consts::*;
use crate::rotate;

pub type ProjectileId = Id<Projectile>;

/// Range of hostile volley shots
const HOSTILE_RANGE: f32 = 45.0;
/// Muzzle offset from the shooter's center
const MUZZLE_OFFSET: f32 = PLAYER_RADIUS + 0.1;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Explosive {
    pub radius: f32,
    pub damage: f32,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ChainLightning {
    /// Number of hops after the first target
    pub chains: u32,
    /// Max distance between hops
    pub range: f32,
}

/// Launch parameters
#[derive(Debug, Clone, PartialEq)]
pub struct ProjectileSpec {
    pub pos: Vec2,
    pub vel: Vec2,
    pub damage: f32,
    pub range: f32,
    pub pierce: u32,
    pub bounces: u32,
    pub homing: bool,
    pub explosive: Option<Explosive>,
    pub chain: Option<ChainLightning>,
    pub source: HitSource,
    pub hostile: bool,
    pub burn_damage: f32,
    pub curse: bool,
    /// Knockback scale handed to the hit
    pub knockback: f32,
    /// Apply the slow curve and jitter in flight
    pub curve: bool,
}

impl ProjectileSpec {
    /// A shot from the player's weapon, carrying every projectile upgrade
    pub fn player_shot(player: &Player, dir: Vec2) -> Self {
        let stats = &player.stats;
        let dir = dir.normalize_or(Vec2::X);
        Self {
            pos: player.pos + dir * MUZZLE_OFFSET,
            vel: dir * stats.projectile_speed,
            damage: stats.base_damage,
            range: stats.projectile_range,
            pierce: stats.pierce,
            bounces: stats.bounce,
            homing: stats.homing,
            explosive: stats.explosive,
            chain: stats.chain_lightning,
            source: HitSource::Player,
            hostile: false,
            burn_damage: stats.burn_damage,
            curse: false,
            knockback: 1.0,
            curve: true,
        }
    }

    /// A plain shot fired by a summon
    pub fn summon_shot(pos: Vec2, vel: Vec2, damage: f32, range: f32, source: HitSource) -> Self {
        Self {
            pos,
            vel,
            damage,
            range,
            pierce: 0,
            bounces: 0,
            homing: false,
            explosive: None,
            chain: None,
            source,
            hostile: false,
            burn_damage: 0.0,
            curse: false,
            knockback: 0.5,
            curve: true,
        }
    }

    /// A straight shot that only hits the player
    pub fn hostile(pos: Vec2, vel: Vec2, damage: f32, source: HitSource) -> Self {
        Self {
            pos,
            vel,
            damage,
            range: HOSTILE_RANGE,
            pierce: 0,
            bounces: 0,
            homing: false,
            explosive: None,
            chain: None,
            source,
            hostile: true,
            burn_damage: 0.0,
            curse: false,
            knockback: 0.0,
            curve: false,
        }
    }
}

#[derive(Debug, Clone)]
pub struct Projectile {
    pub pos: Vec2,
    pub vel: Vec2,
    pub damage: f32,
    pub range: f32,
    pub traveled: f32,
    /// Recent positions, oldest first
    pub trail: VecDeque<Vec2>,
    pub homing: bool,
    pub pierce: u32,
    /// Bounces left
    pub bounces: u32,
    pub explosive: Option<Explosive>,
    pub chain: Option<ChainLightning>,
    /// Signed turn rate in radians/sec (0 = straight)
    pub curve_rate: f32,
    /// Enemies this projectile already touched. Only grows.
    pub affected: HashSet<EnemyId>,
    pub source: HitSource,
    pub hostile: bool,
    pub burn_damage: f32,
    pub curse: bool,
    pub knockback: f32,
}

impl Projectile {
    pub fn from_spec(spec: ProjectileSpec) -> Self {
        let mut trail = VecDeque::with_capacity(TRAIL_LENGTH);
        trail.push_back(spec.pos);
        Self {
            pos: spec.pos,
            vel: spec.vel,
            damage: spec.damage,
            range: spec.range,
            traveled: 0.0,
            trail,
            homing: spec.homing,
            pierce: spec.pierce,
            bounces: spec.bounces,
            explosive: spec.explosive,
            chain: spec.chain,
            curve_rate: if spec.curve { CURVE_RATE } else { 0.0 },
            affected: HashSet::new(),
            source: spec.source,
            hostile: spec.hostile,
            burn_damage: spec.burn_damage,
            curse: spec.curse,
            knockback: spec.knockback,
        }
    }

    pub fn speed(&self) -> f32 {
        self.vel.length()
    }

    /// Append interpolated samples once the projectile has moved far enough
    /// from the last one
    fn record_trail(&mut self) {
        let Some(&last) = self.trail.back() else {
            self.push_trail(self.pos);
            return;
        };
        let gap = self.pos.distance(last);
        if gap < TRAIL_SAMPLE_SPACING {
            return;
        }
        let samples = ((gap / TRAIL_SAMPLE_SPACING) as usize).clamp(1, MAX_TRAIL_SUBSAMPLES);
        for i in 1..=samples {
            self.push_trail(last.lerp(self.pos, i as f32 / samples as f32));
        }
    }

    fn push_trail(&mut self, point: Vec2) {
        if self.trail.len() >= TRAIL_LENGTH {
            self.trail.pop_front();
        }
        self.trail.push_back(point);
    }

    /// Blend the heading toward `target`, keeping the speed
    ///
    /// The blend is `1 - e^(-rate·dt)`: it stays below a full snap for any
    /// frame the gate lets through.
    pub fn steer_toward(&mut self, target: Vec2, dt: f32) {
        let speed = self.speed();
        let wanted = (target - self.pos).normalize_or_zero();
        if speed <= 0.0 || wanted == Vec2::ZERO {
            return;
        }
        let blend = 1.0 - (-HOMING_TURN_RATE * dt.max(0.0)).exp();
        let heading = self.vel / speed;
        self.vel = heading.lerp(wanted, blend).normalize_or(wanted) * speed;
    }

    fn curve(&mut self, rng: &mut impl Rng, dt: f32) {
        if self.curve_rate == 0.0 {
            return;
        }
        let jitter = rng.random_range(-CURVE_JITTER..=CURVE_JITTER);
        self.vel = rotate(self.vel, (self.curve_rate + jitter) * dt);
    }

    /// Move and accumulate distance
    fn advance(&mut self, dt: f32) {
        let step = self.vel * dt;
        self.pos += step;
        self.traveled += step.length();
    }

    /// Reflect off the walls when bounces remain. Returns false when the
    /// projectile is out of bounds with nothing left to spend.
    fn bounce_off_walls(&mut self, bounds: &WorldBounds) -> bool {
        if bounds.contains(self.pos) {
            return true;
        }
        if self.bounces == 0 {
            return false;
        }
        self.bounces -= 1;
        if self.pos.x.abs() > bounds.half_x {
            self.vel.x = -self.pos.x.signum() * self.vel.x.abs();
        }
        if self.pos.y.abs() > bounds.half_z {
            self.vel.y = -self.pos.y.signum() * self.vel.y.abs();
        }
        self.pos = bounds.clamp(self.pos, 0.0);
        true
    }

    fn hit_options(&self, impact: Vec2) -> HitOptions {
        HitOptions {
            impact_pos: Some(impact),
            knockback: self.knockback,
            burn_damage: self.burn_damage,
            curse: self.curse,
            ..HitOptions::new(self.source)
        }
    }
}

pub fn spawn_projectile(projectiles: &mut Arena<Projectile>, spec: ProjectileSpec) -> ProjectileId {
    let id = projectiles.insert(Projectile::from_spec(spec));
    // Alternate the curve direction so volleys fan out instead of drifting together
    if let Some(p) = projectiles.get_mut(id) {
        if id.index() % 2 == 1 {
            p.curve_rate = -p.curve_rate;
        }
    }
    id
}

/// Advance every projectile and resolve its contacts
pub fn update_projectiles(
    projectiles: &mut Arena<Projectile>,
    enemies: &mut Arena<Enemy>,
    hits: &mut HitResolver,
    bounds: &WorldBounds,
    dt: f32,
) {
    for id in projectiles.ids() {
        let Some(projectile) = projectiles.get_mut(id) else {
            continue;
        };
        let alive = if projectile.hostile {
            step_hostile(projectile, hits.player, hits.events, bounds, dt)
        } else {
            step_friendly(projectile, enemies, hits, bounds, dt)
        };
        if alive {
            continue;
        }
        if let Some(retired) = projectiles.remove(id) {
            if !retired.hostile && retired.trail.len() > 1 {
                hits.events.push(SimEvent::TrailGhost {
                    points: retired.trail.into_iter().collect(),
                });
            }
        }
    }
}

/// Returns false once the projectile should retire
fn step_friendly(
    p: &mut Projectile,
    enemies: &mut Arena<Enemy>,
    hits: &mut HitResolver,
    bounds: &WorldBounds,
    dt: f32,
) -> bool {
    p.curve(hits.rng, dt);
    p.advance(dt);
    p.record_trail();

    if p.homing {
        let affected = &p.affected;
        let target = nearest_enemy(enemies, p.pos, HOMING_RADIUS, |id| affected.contains(&id));
        if let Some((_, target, _)) = target {
            p.steer_toward(target, dt);
        }
    }

    if p.traveled >= p.range {
        return false;
    }
    if !p.bounce_off_walls(bounds) {
        return false;
    }

    let mut contacts: Vec<(EnemyId, Vec2, f32, Vec2)> = enemies
        .iter()
        .filter(|(id, _)| !p.affected.contains(id))
        .filter_map(|(id, e)| {
            let contact = circle_contact(p.pos, PROJECTILE_HIT_RADIUS, e.pos, e.radius);
            contact
                .hit
                .then(|| (id, e.pos, p.pos.distance(e.pos), contact.normal))
        })
        .collect();
    contacts.sort_by(|a, b| a.2.total_cmp(&b.2).then(a.0.cmp(&b.0)));

    for (id, enemy_pos, _, normal) in contacts {
        // An earlier cascade this frame may have killed it
        if !enemies.contains(id) {
            continue;
        }
        let mut opts = p.hit_options(p.pos);

        if p.bounces > 0 {
            // The bounce carries the explosive tag so a killing bounce still detonates
            opts.explosive = p.explosive;
            hits.apply_hit(enemies, id, p.damage, &opts);
            p.affected.insert(id);
            p.bounces -= 1;
            if p.vel.dot(normal) < 0.0 {
                p.vel = reflect_velocity(p.vel, normal);
            }
            // New heading; remaining contacts are re-evaluated next frame
            break;
        }

        hits.apply_hit(enemies, id, p.damage, &opts);
        p.affected.insert(id);
        if let Some(explosive) = p.explosive {
            hits.explode(enemies, enemy_pos, explosive, p.source);
        }
        if let Some(chain) = p.chain {
            hits.chain_lightning(enemies, id, enemy_pos, p.damage, chain, p.source);
        }
        if p.affected.len() > p.pierce as usize {
            return false;
        }
    }

    true
}

fn step_hostile(p: &mut Projectile, player: &mut Player, events: &mut EventLog, bounds: &WorldBounds, dt: f32) -> bool {
    p.advance(dt);
    if p.traveled >= p.range || !bounds.contains(p.pos) {
        return false;
    }
    if circle_contact(p.pos, PROJECTILE_HIT_RADIUS, player.pos, PLAYER_RADIUS).hit {
        apply_player_damage(player, events);
        return false;
    }
    true
}
