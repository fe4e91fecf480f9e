//! Player-controlled allies
//!
//! Summon kinds form a closed set. Each variant of [`SummonBehavior`] carries
//! only the state its behavior needs and is advanced by its own update
//! function; the shared plumbing is position, rotation and slot spacing.

use std::collections::{BTreeMap, HashMap, HashSet, VecDeque};
use std::f32::consts::{FRAC_PI_2, TAU};

use glam::Vec2;
use serde::{Deserialize, Serialize};

use super::arena::{Arena, Id};
use super::enemy::{Enemy, EnemyId, nearest_enemies, nearest_enemy};
use super::events::{HitSource, SimEvent};
use super::hit::{HitOptions, HitResolver};
use super::projectile::{Projectile, ProjectileSpec, spawn_projectile};
use crate::consts::SOUL_DRAIN_KILLS;
use crate::{polar_to_cartesian, rotate};

pub type SummonId = Id<Summon>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum SummonKind {
    Scythe,
    Spear,
    ElectricBug,
    Ghost,
    Dagger,
}

impl SummonKind {
    pub const ALL: [SummonKind; 5] = [
        SummonKind::Scythe,
        SummonKind::Spear,
        SummonKind::ElectricBug,
        SummonKind::Ghost,
        SummonKind::Dagger,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            SummonKind::Scythe => "scythe",
            SummonKind::Spear => "spear",
            SummonKind::ElectricBug => "electric_bug",
            SummonKind::Ghost => "ghost",
            SummonKind::Dagger => "dagger",
        }
    }

    /// Orbit and contact parameters for the revolving kinds
    pub fn orbit(self) -> Option<OrbitParams> {
        match self {
            SummonKind::Scythe => Some(OrbitParams {
                radius: 2.5,
                angular_speed: 3.0,
                hit_radius: 0.9,
                rehit_secs: 1.0,
                damage_scale: 1.0,
            }),
            SummonKind::Spear => Some(OrbitParams {
                radius: 3.5,
                angular_speed: 2.2,
                hit_radius: 0.8,
                rehit_secs: 0.95,
                damage_scale: 1.4,
            }),
            SummonKind::ElectricBug => Some(OrbitParams {
                radius: 1.8,
                angular_speed: 4.0,
                hit_radius: 0.6,
                rehit_secs: 1.0,
                damage_scale: 0.5,
            }),
            SummonKind::Ghost | SummonKind::Dagger => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct OrbitParams {
    pub radius: f32,
    /// Radians per second
    pub angular_speed: f32,
    /// Contact reach (added to the enemy body radius)
    pub hit_radius: f32,
    /// Minimum seconds between hits on the same enemy
    pub rehit_secs: f32,
    /// Fraction of the player's base damage
    pub damage_scale: f32,
}

// Electric bug zap
const ZAP_INTERVAL: f32 = 1.5;
const ZAP_RANGE: f32 = 8.0;
const ZAP_TARGETS: usize = 2;
const ZAP_DAMAGE_SCALE: f32 = 0.8;

// Ghost
const GHOST_ORBIT_RADIUS: f32 = 2.0;
const GHOST_ORBIT_SPEED: f32 = 1.2;
const GHOST_BOB_AMPLITUDE: f32 = 0.3;
const GHOST_BOB_SPEED: f32 = 2.0;
const GHOST_FIRE_INTERVAL: f32 = 1.2;
const GHOST_DETECTION_RADIUS: f32 = 14.0;
const GHOST_SHOTS: u32 = 3;
const GHOST_SPREAD: f32 = 0.3;
const GHOST_SHOT_SPEED: f32 = 18.0;
const GHOST_SHOT_RANGE: f32 = 20.0;
const GHOST_DAMAGE_SCALE: f32 = 0.6;

// Dagger steering
const DAGGER_ACCELERATION: f32 = 6.0;
const DAGGER_MAX_FORCE: f32 = 25.0;
const DAGGER_MAX_SPEED: f32 = 16.0;
const DAGGER_HIT_RADIUS: f32 = 0.7;
const DAGGER_LEASH_RADIUS: f32 = 12.0;
const DAGGER_COOLDOWN_SECS: f32 = 0.4;
const DAGGER_DAMAGE_SCALE: f32 = 1.2;
const DAGGER_RECENT_TARGETS: usize = 2;
/// Close enough to the player to idle
const DAGGER_IDLE_RADIUS: f32 = 1.2;
const DAGGER_IDLE_DAMPING: f32 = 4.0;

/// Upgrade-driven summon bookkeeping shared with the hit path
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SummonLedger {
    /// Summons granted per kind
    pub granted: BTreeMap<SummonKind, u32>,
    /// Kills credited to summons
    pub summon_kills: u32,
    /// Heart regeneration from summon kills
    pub soul_drain: bool,
    /// Ghost shots carry a curse
    pub ghost_curse: bool,
    pub curse_bonus: f32,
    pub damage_multiplier: f32,
}

impl Default for SummonLedger {
    fn default() -> Self {
        Self {
            granted: BTreeMap::new(),
            summon_kills: 0,
            soul_drain: false,
            ghost_curse: false,
            curse_bonus: 1.0,
            damage_multiplier: 1.0,
        }
    }
}

impl SummonLedger {
    pub fn granted(&self, kind: SummonKind) -> u32 {
        self.granted.get(&kind).copied().unwrap_or(0)
    }

    pub fn grant(&mut self, kind: SummonKind, count: u32) {
        *self.granted.entry(kind).or_insert(0) += count;
    }

    /// Count a summon kill; true when soul drain should restore a heart
    pub fn record_kill(&mut self) -> bool {
        self.summon_kills += 1;
        self.soul_drain && self.summon_kills % SOUL_DRAIN_KILLS == 0
    }

    /// Damage a summon deals for a given scale of the player's base damage
    fn damage(&self, base_damage: f32, scale: f32) -> f32 {
        base_damage * scale * self.damage_multiplier
    }
}

#[derive(Debug, Clone)]
pub enum SummonBehavior {
    /// Scythe and spear
    Orbit {
        angle: f32,
        /// Clock time of the last hit per enemy
        last_hit: HashMap<EnemyId, f32>,
    },
    ElectricBug {
        angle: f32,
        last_hit: HashMap<EnemyId, f32>,
        zap_timer: f32,
    },
    Ghost {
        angle: f32,
        bob_phase: f32,
        fire_timer: f32,
    },
    Dagger {
        velocity: Vec2,
        target: Option<EnemyId>,
        /// Last enemies struck, newest at the back
        recent: VecDeque<EnemyId>,
        /// Enemies currently inside the hit radius
        overlapping: HashSet<EnemyId>,
        cooldown: f32,
    },
}

impl SummonBehavior {
    fn new(kind: SummonKind) -> Self {
        match kind {
            SummonKind::Scythe | SummonKind::Spear => SummonBehavior::Orbit {
                angle: 0.0,
                last_hit: HashMap::new(),
            },
            SummonKind::ElectricBug => SummonBehavior::ElectricBug {
                angle: 0.0,
                last_hit: HashMap::new(),
                zap_timer: ZAP_INTERVAL,
            },
            SummonKind::Ghost => SummonBehavior::Ghost {
                angle: 0.0,
                bob_phase: 0.0,
                fire_timer: GHOST_FIRE_INTERVAL,
            },
            SummonKind::Dagger => SummonBehavior::Dagger {
                velocity: Vec2::ZERO,
                target: None,
                recent: VecDeque::with_capacity(DAGGER_RECENT_TARGETS),
                overlapping: HashSet::new(),
                cooldown: 0.0,
            },
        }
    }

    fn angle_mut(&mut self) -> Option<&mut f32> {
        match self {
            SummonBehavior::Orbit { angle, .. }
            | SummonBehavior::ElectricBug { angle, .. }
            | SummonBehavior::Ghost { angle, .. } => Some(angle),
            SummonBehavior::Dagger { .. } => None,
        }
    }
}

#[derive(Debug, Clone)]
pub struct Summon {
    pub kind: SummonKind,
    /// Index among summons of the same kind
    pub slot: u32,
    pub pos: Vec2,
    pub rotation: f32,
    pub behavior: SummonBehavior,
}

/// The summon roster plus the clock used for re-hit gating
#[derive(Debug, Clone, Default)]
pub struct Summons {
    roster: Arena<Summon>,
    clock: f32,
}

impl Summons {
    pub fn len(&self) -> usize {
        self.roster.len()
    }

    pub fn is_empty(&self) -> bool {
        self.roster.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (SummonId, &Summon)> {
        self.roster.iter()
    }

    pub fn get(&self, id: SummonId) -> Option<&Summon> {
        self.roster.get(id)
    }

    pub fn count(&self, kind: SummonKind) -> u32 {
        self.roster.values().filter(|s| s.kind == kind).count() as u32
    }

    /// Add or remove summons until each kind matches its granted count,
    /// then respace the orbit slots evenly
    pub fn sync_roster(&mut self, ledger: &SummonLedger, player_pos: Vec2) {
        for kind in SummonKind::ALL {
            let want = ledger.granted(kind) as usize;
            let mut ids: Vec<SummonId> = self
                .roster
                .iter()
                .filter(|(_, s)| s.kind == kind)
                .map(|(id, _)| id)
                .collect();
            if ids.len() == want {
                continue;
            }

            while ids.len() > want {
                if let Some(id) = ids.pop() {
                    self.roster.remove(id);
                }
            }
            while ids.len() < want {
                let id = self.roster.insert(Summon {
                    kind,
                    slot: ids.len() as u32,
                    pos: player_pos,
                    rotation: 0.0,
                    behavior: SummonBehavior::new(kind),
                });
                ids.push(id);
            }
            log::debug!("Summon roster: {} x{}", kind.as_str(), want);

            // Keep slot 0's lead angle and spread the rest around it
            let lead = ids
                .first()
                .and_then(|&id| self.roster.get_mut(id))
                .and_then(|s| s.behavior.angle_mut().map(|a| *a))
                .unwrap_or(0.0);
            let count = ids.len() as f32;
            for (slot, &id) in ids.iter().enumerate() {
                if let Some(summon) = self.roster.get_mut(id) {
                    summon.slot = slot as u32;
                    if let Some(angle) = summon.behavior.angle_mut() {
                        *angle = lead + TAU * slot as f32 / count;
                    }
                }
            }
        }
    }

    /// Advance every summon: movement, direct hits and ghost fire
    pub fn update(
        &mut self,
        enemies: &mut Arena<Enemy>,
        projectiles: &mut Arena<Projectile>,
        hits: &mut HitResolver,
        dt: f32,
    ) {
        self.clock += dt;
        let clock = self.clock;

        for id in self.roster.ids() {
            let Some(summon) = self.roster.get_mut(id) else {
                continue;
            };
            match summon.kind {
                SummonKind::Scythe | SummonKind::Spear => update_orbiter(summon, enemies, hits, clock, dt),
                SummonKind::ElectricBug => {
                    update_orbiter(summon, enemies, hits, clock, dt);
                    update_zap(summon, enemies, hits, dt);
                }
                SummonKind::Ghost => update_ghost(summon, enemies, projectiles, hits, dt),
                SummonKind::Dagger => update_dagger(summon, enemies, hits, dt),
            }
        }
    }
}

fn summon_hit(summon: &Summon, target_pos: Vec2) -> HitOptions {
    HitOptions {
        source_pos: Some(summon.pos),
        impact_pos: Some(target_pos),
        knockback: 0.5,
        ..HitOptions::new(HitSource::Summon(summon.kind))
    }
}

/// Revolve around the player and strike whatever the blade passes through
fn update_orbiter(summon: &mut Summon, enemies: &mut Arena<Enemy>, hits: &mut HitResolver, clock: f32, dt: f32) {
    let Some(params) = summon.kind.orbit() else {
        return;
    };
    let (angle, last_hit) = match &mut summon.behavior {
        SummonBehavior::Orbit { angle, last_hit } | SummonBehavior::ElectricBug { angle, last_hit, .. } => {
            (angle, last_hit)
        }
        _ => return,
    };

    *angle = (*angle + params.angular_speed * dt) % TAU;
    let pos = hits.player.pos + polar_to_cartesian(params.radius, *angle);
    let angle = *angle;

    last_hit.retain(|id, t| enemies.contains(*id) && clock - *t < params.rehit_secs);

    let mut contacts: Vec<(EnemyId, Vec2, f32)> = enemies
        .iter()
        .filter(|(id, _)| !last_hit.contains_key(id))
        .filter_map(|(id, e)| {
            let d = e.pos.distance(pos);
            (d <= params.hit_radius + e.radius).then_some((id, e.pos, d))
        })
        .collect();
    contacts.sort_by(|a, b| a.2.total_cmp(&b.2).then(a.0.cmp(&b.0)));
    for &(id, _, _) in &contacts {
        last_hit.insert(id, clock);
    }

    summon.pos = pos;
    summon.rotation = angle + FRAC_PI_2;

    let damage = hits.summons.damage(hits.player.stats.base_damage, params.damage_scale);
    for (id, enemy_pos, _) in contacts {
        let opts = summon_hit(summon, enemy_pos);
        hits.apply_hit(enemies, id, damage, &opts);
    }
}

/// Periodic strike on the two nearest enemies, no projectile involved
fn update_zap(summon: &mut Summon, enemies: &mut Arena<Enemy>, hits: &mut HitResolver, dt: f32) {
    let SummonBehavior::ElectricBug { zap_timer, .. } = &mut summon.behavior else {
        return;
    };
    *zap_timer = (*zap_timer - dt).max(0.0);
    if *zap_timer > 0.0 {
        return;
    }

    let targets = nearest_enemies(enemies, summon.pos, ZAP_RANGE, ZAP_TARGETS, |_| false);
    if targets.is_empty() {
        return;
    }
    *zap_timer = ZAP_INTERVAL;

    let damage = hits.summons.damage(hits.player.stats.base_damage, ZAP_DAMAGE_SCALE);
    for (id, to, _) in targets {
        hits.events.push(SimEvent::ChainArc { from: summon.pos, to });
        let opts = HitOptions {
            knockback: 0.0,
            ..summon_hit(summon, to)
        };
        hits.apply_hit(enemies, id, damage, &opts);
    }
}

/// Hover near the player and fire spread volleys at the nearest enemy
fn update_ghost(
    summon: &mut Summon,
    enemies: &Arena<Enemy>,
    projectiles: &mut Arena<Projectile>,
    hits: &mut HitResolver,
    dt: f32,
) {
    let SummonBehavior::Ghost {
        angle,
        bob_phase,
        fire_timer,
    } = &mut summon.behavior
    else {
        return;
    };

    *angle = (*angle + GHOST_ORBIT_SPEED * dt) % TAU;
    *bob_phase = (*bob_phase + GHOST_BOB_SPEED * dt) % TAU;
    let radius = GHOST_ORBIT_RADIUS + GHOST_BOB_AMPLITUDE * bob_phase.sin();
    summon.pos = hits.player.pos + polar_to_cartesian(radius, *angle);

    *fire_timer = (*fire_timer - dt).max(0.0);
    if *fire_timer > 0.0 {
        return;
    }
    let Some((_, target, _)) = nearest_enemy(enemies, summon.pos, GHOST_DETECTION_RADIUS, |_| false) else {
        return;
    };
    *fire_timer = GHOST_FIRE_INTERVAL;

    let aim = (target - summon.pos).normalize_or(Vec2::X);
    summon.rotation = aim.to_angle();
    let damage = hits.summons.damage(hits.player.stats.base_damage, GHOST_DAMAGE_SCALE);
    let curse = hits.summons.ghost_curse;
    for i in 0..GHOST_SHOTS {
        let offset = if GHOST_SHOTS == 1 {
            0.0
        } else {
            -GHOST_SPREAD / 2.0 + GHOST_SPREAD * i as f32 / (GHOST_SHOTS - 1) as f32
        };
        let dir = rotate(aim, offset);
        let spec = ProjectileSpec {
            curse,
            ..ProjectileSpec::summon_shot(
                summon.pos,
                dir * GHOST_SHOT_SPEED,
                damage,
                GHOST_SHOT_RANGE,
                HitSource::Summon(SummonKind::Ghost),
            )
        };
        spawn_projectile(projectiles, spec);
    }
}

/// Steer toward a target, strike on entry, fall back to the player on cooldown
fn update_dagger(summon: &mut Summon, enemies: &mut Arena<Enemy>, hits: &mut HitResolver, dt: f32) {
    let SummonBehavior::Dagger {
        velocity,
        target,
        recent,
        overlapping,
        cooldown,
    } = &mut summon.behavior
    else {
        return;
    };
    let player_pos = hits.player.pos;
    *cooldown = (*cooldown - dt).max(0.0);

    // Drop a target that died, wandered off the leash, or while cooling down
    if let Some(current) = *target {
        let gone = match enemies.get(current) {
            None => {
                overlapping.remove(&current);
                true
            }
            Some(e) => e.pos.distance(player_pos) > DAGGER_LEASH_RADIUS,
        };
        if gone || *cooldown > 0.0 {
            *target = None;
        }
    }
    if target.is_none() && *cooldown <= 0.0 {
        *target = pick_dagger_target(enemies, summon.pos, player_pos, recent);
    }

    let goal = target.and_then(|id| enemies.get(id)).map_or(player_pos, |e| e.pos);
    let to_goal = goal - summon.pos;
    if target.is_none() && to_goal.length() < DAGGER_IDLE_RADIUS {
        *velocity *= (-DAGGER_IDLE_DAMPING * dt).exp();
    } else {
        let desired = to_goal.normalize_or_zero() * DAGGER_MAX_SPEED;
        let steering = (desired - *velocity).clamp_length_max(DAGGER_MAX_FORCE);
        *velocity = (*velocity + steering * DAGGER_ACCELERATION * dt).clamp_length_max(DAGGER_MAX_SPEED);
    }
    summon.pos += *velocity * dt;
    if velocity.length_squared() > 1e-6 {
        summon.rotation = velocity.to_angle();
    }

    // Level-triggered contact: damage only on entering the hit radius
    let mut inside: Vec<(EnemyId, Vec2)> = enemies
        .iter()
        .filter(|(_, e)| e.pos.distance(summon.pos) <= DAGGER_HIT_RADIUS + e.radius)
        .map(|(id, e)| (id, e.pos))
        .collect();
    inside.sort_by_key(|&(id, _)| id);
    let entered: Vec<(EnemyId, Vec2)> = inside
        .iter()
        .copied()
        .filter(|(id, _)| !overlapping.contains(id))
        .collect();
    *overlapping = inside.iter().map(|&(id, _)| id).collect();

    if entered.is_empty() {
        return;
    }
    let damage = hits.summons.damage(hits.player.stats.base_damage, DAGGER_DAMAGE_SCALE);
    let source = HitSource::Summon(SummonKind::Dagger);
    for (id, enemy_pos) in entered {
        let opts = HitOptions {
            source_pos: Some(summon.pos),
            impact_pos: Some(enemy_pos),
            knockback: 0.5,
            ..HitOptions::new(source)
        };
        let outcome = hits.apply_hit(enemies, id, damage, &opts);
        if outcome.killed {
            overlapping.remove(&id);
        }
        if recent.len() >= DAGGER_RECENT_TARGETS {
            recent.pop_front();
        }
        recent.push_back(id);
    }
    *target = None;
    *cooldown = DAGGER_COOLDOWN_SECS;
}

/// Nearest enemy to the dagger inside the leash, skipping recent targets
/// unless nothing else is available
fn pick_dagger_target(
    enemies: &Arena<Enemy>,
    dagger_pos: Vec2,
    player_pos: Vec2,
    recent: &VecDeque<EnemyId>,
) -> Option<EnemyId> {
    let in_leash = |skip_recent: bool| {
        enemies
            .iter()
            .filter(|(id, e)| {
                e.pos.distance(player_pos) <= DAGGER_LEASH_RADIUS && !(skip_recent && recent.contains(id))
            })
            .map(|(id, e)| (id, e.pos.distance(dagger_pos)))
            .min_by(|a, b| a.1.total_cmp(&b.1).then(a.0.cmp(&b.0)))
            .map(|(id, _)| id)
    };
    in_leash(true).or_else(|| in_leash(false))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sim::enemy::{EnemyKind, spawn_enemy};
    use crate::sim::events::EventLog;
    use crate::sim::hit::KillRecord;
    use crate::sim::player::{Player, PlayerStats};
    use crate::sim::status::StatusEffects;
    use rand::SeedableRng;
    use rand_pcg::Pcg32;

    struct Fixture {
        summons: Summons,
        ledger: SummonLedger,
        enemies: Arena<Enemy>,
        projectiles: Arena<Projectile>,
        player: Player,
        effects: StatusEffects,
        events: EventLog,
        kills: Vec<KillRecord>,
        rng: Pcg32,
    }

    impl Fixture {
        fn new() -> Self {
            Self {
                summons: Summons::default(),
                ledger: SummonLedger::default(),
                enemies: Arena::new(),
                projectiles: Arena::new(),
                player: Player::new(PlayerStats::default()),
                effects: StatusEffects::default(),
                events: EventLog::default(),
                kills: Vec::new(),
                rng: Pcg32::seed_from_u64(21),
            }
        }

        fn grant(&mut self, kind: SummonKind, count: u32) {
            self.ledger.grant(kind, count);
            self.summons.sync_roster(&self.ledger, self.player.pos);
        }

        fn enemy(&mut self, pos: Vec2, health: f32) -> EnemyId {
            let id = spawn_enemy(&mut self.enemies, EnemyKind::Grunt, pos, 1.0);
            if let Some(e) = self.enemies.get_mut(id) {
                e.health = health;
                e.max_health = health;
            }
            id
        }

        fn step(&mut self, dt: f32) {
            let mut hits = HitResolver::new(
                &mut self.player,
                &mut self.ledger,
                &mut self.effects,
                &mut self.events,
                &mut self.kills,
                &mut self.rng,
            );
            self.summons.update(&mut self.enemies, &mut self.projectiles, &mut hits, dt);
        }

        /// Pin every orbit angle back to zero
        fn park_blades(&mut self) {
            for (_, summon) in self.summons.roster.iter_mut() {
                if let Some(angle) = summon.behavior.angle_mut() {
                    *angle = 0.0;
                }
            }
        }

        fn damage_taken(&self, id: EnemyId, start: f32) -> f32 {
            self.enemies.get(id).map_or(start, |e| start - e.health)
        }
    }

    #[test]
    fn test_roster_matches_granted_counts() {
        let mut fx = Fixture::new();
        fx.grant(SummonKind::Scythe, 3);
        fx.grant(SummonKind::Dagger, 1);
        assert_eq!(fx.summons.count(SummonKind::Scythe), 3);
        assert_eq!(fx.summons.count(SummonKind::Dagger), 1);

        // Syncing again never duplicates
        fx.summons.sync_roster(&fx.ledger, Vec2::ZERO);
        assert_eq!(fx.summons.len(), 4);

        fx.ledger.granted.insert(SummonKind::Scythe, 1);
        fx.summons.sync_roster(&fx.ledger, Vec2::ZERO);
        assert_eq!(fx.summons.count(SummonKind::Scythe), 1);
    }

    #[test]
    fn test_orbit_slots_evenly_spaced() {
        let mut fx = Fixture::new();
        fx.grant(SummonKind::Spear, 4);
        fx.step(0.0);
        let mut angles: Vec<f32> = fx
            .summons
            .iter()
            .map(|(_, s)| s.pos.to_angle().rem_euclid(TAU))
            .collect();
        angles.sort_by(f32::total_cmp);
        for pair in angles.windows(2) {
            assert!((pair[1] - pair[0] - TAU / 4.0).abs() < 1e-3);
        }
        for (_, s) in fx.summons.iter() {
            assert!((s.pos.length() - 3.5).abs() < 1e-4);
        }
    }

    #[test]
    fn test_orbiter_rehit_gate() {
        let mut fx = Fixture::new();
        fx.grant(SummonKind::Scythe, 1);
        // Sitting on the orbit at angle 0
        let id = fx.enemy(Vec2::new(2.5, 0.0), 1000.0);

        fx.step(0.0);
        let after_first = fx.damage_taken(id, 1000.0);
        assert_eq!(after_first, 10.0);

        // Keep the blade parked on the enemy by pinning its angle
        for _ in 0..5 {
            fx.park_blades();
            fx.step(0.1);
        }
        assert_eq!(fx.damage_taken(id, 1000.0), 10.0);

        // Past the re-hit interval it can strike again
        for _ in 0..6 {
            fx.park_blades();
            fx.step(0.1);
        }
        assert_eq!(fx.damage_taken(id, 1000.0), 20.0);
    }

    #[test]
    fn test_bug_zaps_two_nearest() {
        let mut fx = Fixture::new();
        fx.grant(SummonKind::ElectricBug, 1);
        let a = fx.enemy(Vec2::new(5.0, 0.0), 100.0);
        let b = fx.enemy(Vec2::new(0.0, 5.0), 100.0);
        let far = fx.enemy(Vec2::new(-7.5, 0.0), 100.0);

        fx.step(ZAP_INTERVAL);
        let arcs = fx
            .events
            .iter()
            .filter(|e| matches!(e, SimEvent::ChainArc { .. }))
            .count();
        assert_eq!(arcs, 2);
        assert!(fx.damage_taken(a, 100.0) > 0.0);
        assert!(fx.damage_taken(b, 100.0) > 0.0);
        assert_eq!(fx.damage_taken(far, 100.0), 0.0);
        assert!(fx.projectiles.is_empty());
    }

    #[test]
    fn test_ghost_fires_spread_volley() {
        let mut fx = Fixture::new();
        fx.ledger.ghost_curse = true;
        fx.grant(SummonKind::Ghost, 1);
        fx.enemy(Vec2::new(10.0, 0.0), 100.0);

        fx.step(GHOST_FIRE_INTERVAL);
        assert_eq!(fx.projectiles.len(), GHOST_SHOTS as usize);
        assert!(fx.projectiles.values().all(|p| p.curse && !p.hostile));

        // No second volley until the timer runs out again
        fx.step(0.1);
        assert_eq!(fx.projectiles.len(), GHOST_SHOTS as usize);
    }

    #[test]
    fn test_ghost_holds_fire_without_target() {
        let mut fx = Fixture::new();
        fx.grant(SummonKind::Ghost, 1);
        fx.enemy(Vec2::new(40.0, 0.0), 100.0);
        fx.step(GHOST_FIRE_INTERVAL * 2.0);
        assert!(fx.projectiles.is_empty());
    }

    #[test]
    fn test_dagger_hits_once_per_entry() {
        let mut fx = Fixture::new();
        fx.grant(SummonKind::Dagger, 1);
        let id = fx.enemy(Vec2::new(3.0, 0.0), 1000.0);

        let mut hits_seen = 0;
        let mut last_health = 1000.0;
        for _ in 0..120 {
            fx.step(1.0 / 60.0);
            let health = fx.enemies.get(id).unwrap().health;
            if health < last_health {
                hits_seen += 1;
                last_health = health;
            }
        }
        assert!(hits_seen >= 1);
        // Each hit needs a separate entry, so it never lands every frame
        assert!(hits_seen < 20, "hits = {hits_seen}");
    }

    #[test]
    fn test_dagger_prefers_unrecent_targets() {
        let enemies = {
            let mut arena = Arena::new();
            arena.insert(Enemy::new(EnemyKind::Grunt, Vec2::new(1.0, 0.0), 1.0));
            arena.insert(Enemy::new(EnemyKind::Grunt, Vec2::new(4.0, 0.0), 1.0));
            arena
        };
        let ids = enemies.ids();
        let recent = VecDeque::from([ids[0]]);
        assert_eq!(pick_dagger_target(&enemies, Vec2::ZERO, Vec2::ZERO, &recent), Some(ids[1]));

        // Everything recent: fall back to the nearest
        let recent = VecDeque::from([ids[0], ids[1]]);
        assert_eq!(pick_dagger_target(&enemies, Vec2::ZERO, Vec2::ZERO, &recent), Some(ids[0]));
    }

    #[test]
    fn test_dagger_ignores_enemies_outside_leash() {
        let mut enemies = Arena::new();
        enemies.insert(Enemy::new(EnemyKind::Grunt, Vec2::new(30.0, 0.0), 1.0));
        assert_eq!(pick_dagger_target(&enemies, Vec2::ZERO, Vec2::ZERO, &VecDeque::new()), None);
    }

    #[test]
    fn test_dagger_recent_memory_capped() {
        let mut fx = Fixture::new();
        fx.grant(SummonKind::Dagger, 1);
        for i in 0..4 {
            fx.enemy(Vec2::new(2.0 + i as f32 * 0.5, 0.0), 1.0);
        }
        for _ in 0..300 {
            fx.step(1.0 / 60.0);
        }
        for (_, summon) in fx.summons.iter() {
            if let SummonBehavior::Dagger { recent, .. } = &summon.behavior {
                assert!(recent.len() <= DAGGER_RECENT_TARGETS);
            }
        }
    }

    #[test]
    fn test_summon_kills_recorded() {
        let mut fx = Fixture::new();
        fx.grant(SummonKind::Scythe, 1);
        fx.enemy(Vec2::new(2.5, 0.0), 1.0);
        fx.step(0.0);
        assert_eq!(fx.ledger.summon_kills, 1);
        assert!(matches!(fx.kills[0].source, HitSource::Summon(SummonKind::Scythe)));
    }
}
