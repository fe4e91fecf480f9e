//! Enemy population: stat presets, AI, boss brains and spawn scheduling
//!
//! Regular enemies run a two-state machine (patrol until the player is in
//! detection range, then chase and hit on contact). Bosses layer a named-state
//! brain on top; the transitions live behind [`BossBehavior`] so each boss
//! kind decides its own pattern while the engine only keeps a state name and
//! a handful of timers.

use glam::Vec2;
use rand::Rng;
use serde::{Deserialize, Serialize};

use super::arena::{Arena, Id};
use super::collision::{Shape, Sphere, resolve_collision};
use super::combat::CombatStats;
use super::events::{EventLog, HitSource};
use super::hit::apply_player_damage;
use super::player::{PLAYER_RADIUS, Player};
use super::projectile::{Projectile, ProjectileSpec, spawn_projectile};
use super::state::WorldBounds;
use crate::consts::*;
use crate::{polar_to_cartesian, rotate, world_to_ground};

pub type EnemyId = Id<Enemy>;

/// Chance that an ad-hoc spawn is a grunt (the rest are brutes)
pub const GRUNT_SPAWN_WEIGHT: f32 = 0.7;
/// Patrol points are picked within this distance of the spawn point
pub const PATROL_RADIUS: f32 = 6.0;
/// Patrol pace relative to full speed
pub const PATROL_SPEED_SCALE: f32 = 0.5;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum BossKind {
    /// Charging stag: wind-up, dash, recover, with a volley in between
    Stag,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EnemyKind {
    Grunt,
    Brute,
    Boss(BossKind),
}

/// Base stats per enemy kind
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct EnemyPreset {
    pub health: f32,
    pub attack: i32,
    pub defense: i32,
    pub speed: f32,
    pub detection_range: f32,
    pub attack_range: f32,
    /// Seconds between contact hits
    pub attack_cooldown: f32,
    pub radius: f32,
    pub xp_value: u32,
}

impl EnemyKind {
    pub fn preset(self) -> EnemyPreset {
        match self {
            EnemyKind::Grunt => EnemyPreset {
                health: 25.0,
                attack: 4,
                defense: 0,
                speed: 3.5,
                detection_range: 25.0,
                attack_range: 1.2,
                attack_cooldown: 1.0,
                radius: 0.5,
                xp_value: 5,
            },
            EnemyKind::Brute => EnemyPreset {
                health: 60.0,
                attack: 8,
                defense: 2,
                speed: 2.2,
                detection_range: 20.0,
                attack_range: 1.6,
                attack_cooldown: 1.6,
                radius: 0.9,
                xp_value: 12,
            },
            EnemyKind::Boss(BossKind::Stag) => EnemyPreset {
                health: 1200.0,
                attack: 15,
                defense: 5,
                speed: 3.0,
                detection_range: 80.0,
                attack_range: 2.4,
                attack_cooldown: 1.2,
                radius: 1.8,
                xp_value: 150,
            },
        }
    }

    pub fn is_boss(self) -> bool {
        matches!(self, EnemyKind::Boss(_))
    }
}

/// Weighted pick for ad-hoc spawns
pub fn random_kind(rng: &mut impl Rng) -> EnemyKind {
    if rng.random::<f32>() < GRUNT_SPAWN_WEIGHT {
        EnemyKind::Grunt
    } else {
        EnemyKind::Brute
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AiState {
    Patrolling,
    Chasing,
}

#[derive(Debug, Clone)]
pub struct Enemy {
    pub kind: EnemyKind,
    pub pos: Vec2,
    /// Knockback velocity (AI movement is added on top, not stored here)
    pub velocity: Vec2,
    pub health: f32,
    pub max_health: f32,
    pub attack: i32,
    pub defense: i32,
    pub speed: f32,
    pub detection_range: f32,
    pub attack_range: f32,
    /// Seconds until the next contact hit is allowed
    pub attack_cooldown: f32,
    pub attack_cooldown_max: f32,
    pub ai: AiState,
    /// Spawn point, the center of the patrol area
    pub home: Vec2,
    pub patrol_target: Vec2,
    pub radius: f32,
    pub xp_value: u32,
    pub hit_flash: f32,
    pub boss: Option<BossBrain>,
}

impl Enemy {
    /// Build an enemy from its kind preset, health scaled by difficulty
    pub fn new(kind: EnemyKind, pos: Vec2, health_scale: f32) -> Self {
        let preset = kind.preset();
        let health = (preset.health * health_scale).max(1.0);
        let boss = match kind {
            EnemyKind::Boss(boss_kind) => Some(BossBrain::new(boss_kind)),
            _ => None,
        };
        Self {
            kind,
            pos,
            velocity: Vec2::ZERO,
            health,
            max_health: health,
            attack: preset.attack,
            defense: preset.defense,
            speed: preset.speed,
            detection_range: preset.detection_range,
            attack_range: preset.attack_range,
            attack_cooldown: 0.0,
            attack_cooldown_max: preset.attack_cooldown,
            ai: AiState::Patrolling,
            home: pos,
            patrol_target: pos,
            radius: preset.radius,
            xp_value: preset.xp_value,
            hit_flash: 0.0,
            boss,
        }
    }

    pub fn health_fraction(&self) -> f32 {
        if self.max_health <= 0.0 {
            0.0
        } else {
            (self.health / self.max_health).clamp(0.0, 1.0)
        }
    }

    pub fn combat_stats(&self) -> CombatStats {
        CombatStats::new(self.attack, self.defense, self.health.ceil() as i32)
    }

    pub fn is_boss(&self) -> bool {
        self.boss.is_some()
    }
}

// ---------------------------------------------------------------------------
// Boss brains
// ---------------------------------------------------------------------------

pub const CHASING: &str = "chasing";
pub const WINDING_UP: &str = "winding_up";
pub const DASHING: &str = "dashing";
pub const RECOVERING: &str = "recovering";
pub const PROJECTILE_ATTACK: &str = "projectile_attack";

/// Boss state: a named state plus the timers the behaviors share
#[derive(Debug, Clone)]
pub struct BossBrain {
    pub kind: BossKind,
    pub state: &'static str,
    /// Seconds left in the current state
    pub state_timer: f32,
    pub dash_cooldown: f32,
    pub volley_cooldown: f32,
    /// Locked-in dash heading
    pub dash_dir: Vec2,
    pub enraged: bool,
}

impl BossBrain {
    pub fn new(kind: BossKind) -> Self {
        Self {
            kind,
            state: kind.behavior().initial_state(),
            state_timer: 0.0,
            dash_cooldown: 3.0,
            volley_cooldown: 5.0,
            dash_dir: Vec2::X,
            enraged: false,
        }
    }

    /// Switch to `state` with `timer` seconds on the clock
    pub fn enter(&mut self, state: &'static str, timer: f32) {
        log::debug!("{:?} boss: {} -> {}", self.kind, self.state, state);
        self.state = state;
        self.state_timer = timer.max(0.0);
    }

    fn tick_timers(&mut self, dt: f32) {
        self.state_timer = (self.state_timer - dt).max(0.0);
        self.dash_cooldown = (self.dash_cooldown - dt).max(0.0);
        self.volley_cooldown = (self.volley_cooldown - dt).max(0.0);
    }
}

/// What a boss can see when it thinks
#[derive(Debug, Clone, Copy)]
pub struct BossSense {
    pub to_player: Vec2,
    pub distance: f32,
    pub health_fraction: f32,
}

/// What a boss wants to do this frame
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum BossAction {
    Chase { speed_scale: f32 },
    Hold,
    Dash { dir: Vec2, speed_scale: f32 },
    /// Fan of hostile projectiles aimed at the player
    Volley {
        count: u32,
        spread: f32,
        speed: f32,
        damage: f32,
    },
}

/// Per-kind boss pattern
pub trait BossBehavior {
    fn initial_state(&self) -> &'static str {
        CHASING
    }

    /// Advance the brain and pick an action. Timers are already ticked.
    fn think(&self, brain: &mut BossBrain, sense: &BossSense) -> BossAction;
}

impl BossKind {
    pub fn behavior(self) -> &'static dyn BossBehavior {
        match self {
            BossKind::Stag => &StagBehavior,
        }
    }
}

/// chasing → winding_up → dashing → recovering, with projectile_attack as the ranged branch
pub struct StagBehavior;

impl StagBehavior {
    const DASH_TRIGGER_RANGE: f32 = 18.0;
    const DASH_MIN_RANGE: f32 = 4.0;
    const WIND_UP_SECS: f32 = 0.8;
    const DASH_SECS: f32 = 0.6;
    const DASH_SPEED_SCALE: f32 = 5.0;
    const RECOVER_SECS: f32 = 1.2;
    const DASH_COOLDOWN_SECS: f32 = 4.0;
    const VOLLEY_MIN_RANGE: f32 = 10.0;
    const VOLLEY_SECS: f32 = 0.7;
    const VOLLEY_COOLDOWN_SECS: f32 = 6.0;
    const ENRAGE_AT: f32 = 0.5;
    /// Timer divisor once enraged
    const ENRAGE_PACE: f32 = 1.5;
}

impl BossBehavior for StagBehavior {
    fn think(&self, brain: &mut BossBrain, sense: &BossSense) -> BossAction {
        if !brain.enraged && sense.health_fraction <= Self::ENRAGE_AT {
            brain.enraged = true;
            log::info!("Stag boss enraged");
        }
        let pace = if brain.enraged { Self::ENRAGE_PACE } else { 1.0 };
        let heading = sense.to_player.normalize_or_zero();

        match brain.state {
            CHASING => {
                if brain.dash_cooldown <= 0.0
                    && (Self::DASH_MIN_RANGE..=Self::DASH_TRIGGER_RANGE).contains(&sense.distance)
                {
                    brain.dash_dir = if heading == Vec2::ZERO { brain.dash_dir } else { heading };
                    brain.enter(WINDING_UP, Self::WIND_UP_SECS / pace);
                    return BossAction::Hold;
                }
                if brain.volley_cooldown <= 0.0 && sense.distance >= Self::VOLLEY_MIN_RANGE {
                    brain.enter(PROJECTILE_ATTACK, Self::VOLLEY_SECS);
                    brain.volley_cooldown = Self::VOLLEY_COOLDOWN_SECS / pace;
                    return BossAction::Volley {
                        count: if brain.enraged { 7 } else { 5 },
                        spread: 0.9,
                        speed: 14.0,
                        damage: 1.0,
                    };
                }
                BossAction::Chase {
                    speed_scale: if brain.enraged { 1.3 } else { 1.0 },
                }
            }
            WINDING_UP => {
                // Keep tracking during the telegraph, lock on release
                if heading != Vec2::ZERO {
                    brain.dash_dir = heading;
                }
                if brain.state_timer <= 0.0 {
                    brain.enter(DASHING, Self::DASH_SECS);
                }
                BossAction::Hold
            }
            DASHING => {
                if brain.state_timer <= 0.0 {
                    brain.enter(RECOVERING, Self::RECOVER_SECS / pace);
                    brain.dash_cooldown = Self::DASH_COOLDOWN_SECS / pace;
                    return BossAction::Hold;
                }
                BossAction::Dash {
                    dir: brain.dash_dir,
                    speed_scale: Self::DASH_SPEED_SCALE,
                }
            }
            RECOVERING | PROJECTILE_ATTACK => {
                if brain.state_timer <= 0.0 {
                    brain.enter(CHASING, 0.0);
                }
                BossAction::Hold
            }
            _ => {
                brain.enter(self.initial_state(), 0.0);
                BossAction::Hold
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Spawn scheduling
// ---------------------------------------------------------------------------

/// One auto-spawn tier: from `time` on, spawn `count` every `interval` seconds
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SpawnTier {
    pub time: f32,
    pub interval: f32,
    pub count: u32,
}

impl SpawnTier {
    pub fn new(time: f32, interval: f32, count: u32) -> Self {
        Self {
            time,
            interval,
            count,
        }
    }

    /// A tier that can never produce a spawn batch
    pub fn is_inert(&self) -> bool {
        !(self.interval > 0.0) || self.count == 0
    }
}

/// Ordered list of tiers
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SpawnSchedule {
    tiers: Vec<SpawnTier>,
}

impl SpawnSchedule {
    pub fn new(mut tiers: Vec<SpawnTier>) -> Self {
        tiers.sort_by(|a, b| a.time.total_cmp(&b.time));
        Self { tiers }
    }

    pub fn tiers(&self) -> &[SpawnTier] {
        &self.tiers
    }

    /// Index of the last tier whose start time is ≤ `t`
    pub fn active_index(&self, t: f32) -> Option<usize> {
        self.tiers.iter().rposition(|tier| tier.time <= t)
    }

    pub fn active(&self, t: f32) -> Option<&SpawnTier> {
        self.active_index(t).map(|i| &self.tiers[i])
    }
}

/// Spawn timer driven by the schedule
#[derive(Debug, Clone)]
pub struct Spawner {
    pub schedule: SpawnSchedule,
    /// Time accumulated toward the next batch
    pub timer: f32,
    /// Total time the spawner has run
    pub elapsed: f32,
    active_tier: Option<usize>,
}

impl Spawner {
    pub fn new(schedule: SpawnSchedule) -> Self {
        Self {
            schedule,
            timer: 0.0,
            elapsed: 0.0,
            active_tier: None,
        }
    }

    /// Advance by `dt`; returns how many enemies to spawn this frame
    ///
    /// At most one batch per call. The timer restarts whenever a new tier
    /// takes over, and inert tiers (interval ≤ 0 or count 0) never fire.
    pub fn advance(&mut self, dt: f32) -> u32 {
        self.elapsed += dt;
        let index = self.schedule.active_index(self.elapsed);
        if index != self.active_tier {
            if let Some(i) = index {
                let tier = self.schedule.tiers[i];
                log::info!(
                    "Spawn tier {} active at {:.1}s: {} every {:.1}s",
                    i,
                    self.elapsed,
                    tier.count,
                    tier.interval
                );
            }
            self.active_tier = index;
            self.timer = 0.0;
        }

        let Some(tier) = index.map(|i| self.schedule.tiers[i]) else {
            return 0;
        };
        if tier.is_inert() {
            return 0;
        }

        self.timer += dt;
        if self.timer >= tier.interval {
            self.timer = 0.0;
            tier.count
        } else {
            0
        }
    }
}

// ---------------------------------------------------------------------------
// Population operations
// ---------------------------------------------------------------------------

pub fn spawn_enemy(enemies: &mut Arena<Enemy>, kind: EnemyKind, pos: Vec2, health_scale: f32) -> EnemyId {
    enemies.insert(Enemy::new(kind, pos, health_scale))
}

/// Spawn `count` random-kind enemies on the ring around the player
pub fn spawn_ring(
    enemies: &mut Arena<Enemy>,
    rng: &mut impl Rng,
    center: Vec2,
    bounds: &WorldBounds,
    count: u32,
    health_scale: f32,
) -> Vec<EnemyId> {
    (0..count)
        .map(|_| {
            let angle = rng.random_range(0.0..std::f32::consts::TAU);
            let dist = rng.random_range(SPAWN_DISTANCE_MIN..=SPAWN_DISTANCE_MAX);
            let kind = random_kind(rng);
            let pos = bounds.clamp(center + polar_to_cartesian(dist, angle), kind.preset().radius);
            spawn_enemy(enemies, kind, pos, health_scale)
        })
        .collect()
}

/// Advance every enemy's AI, movement and contact attacks
///
/// Boss volleys are launched into `projectiles` as hostile shots.
pub fn update_enemies(
    enemies: &mut Arena<Enemy>,
    projectiles: &mut Arena<Projectile>,
    player: &mut Player,
    events: &mut EventLog,
    bounds: &WorldBounds,
    rng: &mut impl Rng,
    dt: f32,
) {
    let damping = (-KNOCKBACK_DAMPING * dt).exp();

    for (_, enemy) in enemies.iter_mut() {
        enemy.hit_flash = (enemy.hit_flash - dt).max(0.0);
        enemy.attack_cooldown = (enemy.attack_cooldown - dt).max(0.0);

        let to_player = player.pos - enemy.pos;
        let distance = to_player.length();

        enemy.ai = if distance <= enemy.detection_range {
            AiState::Chasing
        } else {
            AiState::Patrolling
        };

        let desired = match enemy.boss.as_mut() {
            Some(brain) => {
                brain.tick_timers(dt);
                let sense = BossSense {
                    to_player,
                    distance,
                    health_fraction: enemy.health / enemy.max_health.max(1e-6),
                };
                match brain.kind.behavior().think(brain, &sense) {
                    BossAction::Chase { speed_scale } => {
                        to_player.normalize_or_zero() * enemy.speed * speed_scale
                    }
                    BossAction::Hold => Vec2::ZERO,
                    BossAction::Dash { dir, speed_scale } => dir * enemy.speed * speed_scale,
                    BossAction::Volley {
                        count,
                        spread,
                        speed,
                        damage,
                    } => {
                        fire_volley(projectiles, enemy.pos, to_player, count, spread, speed, damage);
                        Vec2::ZERO
                    }
                }
            }
            None => match enemy.ai {
                AiState::Chasing => to_player.normalize_or_zero() * enemy.speed,
                AiState::Patrolling => {
                    if enemy.pos.distance(enemy.patrol_target) < 0.5 {
                        let angle = rng.random_range(0.0..std::f32::consts::TAU);
                        let dist = rng.random_range(0.0..=PATROL_RADIUS);
                        enemy.patrol_target =
                            bounds.clamp(enemy.home + polar_to_cartesian(dist, angle), enemy.radius);
                    }
                    (enemy.patrol_target - enemy.pos).normalize_or_zero()
                        * enemy.speed
                        * PATROL_SPEED_SCALE
                }
            },
        };

        enemy.pos += (desired + enemy.velocity) * dt;
        enemy.velocity *= damping;
        enemy.pos = bounds.clamp(enemy.pos, enemy.radius);

        // Contact attack
        if enemy.ai == AiState::Chasing
            && enemy.attack_cooldown <= 0.0
            && enemy.pos.distance(player.pos) <= enemy.attack_range + PLAYER_RADIUS
        {
            apply_player_damage(player, events);
            enemy.attack_cooldown = enemy.attack_cooldown_max;
        }
    }
}

fn fire_volley(
    projectiles: &mut Arena<Projectile>,
    origin: Vec2,
    to_player: Vec2,
    count: u32,
    spread: f32,
    speed: f32,
    damage: f32,
) {
    let aim = to_player.normalize_or(Vec2::X);
    let count = count.max(1);
    for i in 0..count {
        let offset = if count == 1 {
            0.0
        } else {
            -spread / 2.0 + spread * i as f32 / (count - 1) as f32
        };
        let dir = rotate(aim, offset);
        spawn_projectile(
            projectiles,
            ProjectileSpec::hostile(origin + dir * 1.5, dir * speed, damage, HitSource::Enemy),
        );
    }
}

/// Up to `n` enemies within `within` of `from`, nearest first (ties by id)
pub fn nearest_enemies(
    enemies: &Arena<Enemy>,
    from: Vec2,
    within: f32,
    n: usize,
    skip: impl Fn(EnemyId) -> bool,
) -> Vec<(EnemyId, Vec2, f32)> {
    let mut found: Vec<_> = enemies
        .iter()
        .filter(|(id, _)| !skip(*id))
        .filter_map(|(id, e)| {
            let d = e.pos.distance(from);
            (d <= within).then_some((id, e.pos, d))
        })
        .collect();
    found.sort_by(|a, b| a.2.total_cmp(&b.2).then(a.0.cmp(&b.0)));
    found.truncate(n);
    found
}

/// Nearest enemy within `within` of `from`
pub fn nearest_enemy(
    enemies: &Arena<Enemy>,
    from: Vec2,
    within: f32,
    skip: impl Fn(EnemyId) -> bool,
) -> Option<(EnemyId, Vec2, f32)> {
    nearest_enemies(enemies, from, within, 1, skip).into_iter().next()
}

/// Push overlapping enemies apart (the later one in slot order moves)
pub fn separate(enemies: &mut Arena<Enemy>, bounds: &WorldBounds) {
    let bodies: Vec<(EnemyId, Vec2, f32)> = enemies.iter().map(|(id, e)| (id, e.pos, e.radius)).collect();
    for (i, &(id, _, radius)) in bodies.iter().enumerate() {
        for &(_, other_pos, other_radius) in &bodies[..i] {
            let Some(enemy) = enemies.get_mut(id) else {
                continue;
            };
            let moving = Shape::Sphere(Sphere::ground(enemy.pos, radius));
            let stationary = Shape::Sphere(Sphere::ground(other_pos, other_radius));
            if moving.intersects(&stationary) {
                let resolved = world_to_ground(resolve_collision(&moving, &stationary));
                enemy.pos = bounds.clamp(resolved, radius);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sim::player::PlayerStats;
    use rand::SeedableRng;
    use rand_pcg::Pcg32;

    fn setup() -> (Arena<Enemy>, Arena<Projectile>, Player, EventLog, WorldBounds, Pcg32) {
        (
            Arena::new(),
            Arena::new(),
            Player::new(PlayerStats::default()),
            EventLog::default(),
            WorldBounds::new(100.0, 100.0),
            Pcg32::seed_from_u64(5),
        )
    }

    #[test]
    fn test_schedule_picks_last_started_tier() {
        let schedule = SpawnSchedule::new(vec![SpawnTier::new(10.0, 4.0, 2), SpawnTier::new(0.0, 3.0, 1)]);
        assert_eq!(schedule.active(0.0).map(|t| t.count), Some(1));
        assert_eq!(schedule.active(9.9).map(|t| t.count), Some(1));
        assert_eq!(schedule.active(10.0).map(|t| t.count), Some(2));
        assert!(SpawnSchedule::new(vec![SpawnTier::new(5.0, 1.0, 1)]).active(1.0).is_none());
    }

    #[test]
    fn test_spawner_tier_switch() {
        let mut spawner = Spawner::new(SpawnSchedule::new(vec![
            SpawnTier::new(0.0, 3.0, 1),
            SpawnTier::new(10.0, 4.0, 2),
        ]));
        let dt = 0.1;
        let mut first_tier = 0;
        let mut second_tier = 0;
        for _ in 0..99 {
            first_tier += spawner.advance(dt);
        }
        // 9.9s: three batches from the first tier, none from the second
        assert_eq!(first_tier, 3);
        for _ in 0..2 {
            second_tier += spawner.advance(dt);
        }
        assert_eq!(second_tier, 0);
        // 10.1s → next completed 4s interval lands around 14.1s
        let mut spawned = 0;
        let mut frames = 0;
        while spawned == 0 {
            spawned = spawner.advance(dt);
            frames += 1;
        }
        assert_eq!(spawned, 2);
        assert!((38..=41).contains(&frames), "frames = {frames}");
    }

    #[test]
    fn test_spawner_guards_inert_tiers() {
        let mut spawner = Spawner::new(SpawnSchedule::new(vec![SpawnTier::new(0.0, 0.0, 5)]));
        let total: u32 = (0..100).map(|_| spawner.advance(0.1)).sum();
        assert_eq!(total, 0);

        let mut spawner = Spawner::new(SpawnSchedule::new(vec![SpawnTier::new(0.0, -1.0, 3)]));
        assert_eq!(spawner.advance(10.0), 0);

        // A huge frame still yields a single batch
        let mut spawner = Spawner::new(SpawnSchedule::new(vec![SpawnTier::new(0.0, 0.5, 2)]));
        assert_eq!(spawner.advance(10.0), 2);
    }

    #[test]
    fn test_spawn_ring_distance() {
        let (mut enemies, _, _, _, bounds, mut rng) = setup();
        let ids = spawn_ring(&mut enemies, &mut rng, Vec2::ZERO, &bounds, 20, 1.0);
        assert_eq!(ids.len(), 20);
        for e in enemies.values() {
            let d = e.pos.length();
            assert!((SPAWN_DISTANCE_MIN - 1e-3..=SPAWN_DISTANCE_MAX + 1e-3).contains(&d));
        }
    }

    #[test]
    fn test_random_kind_weights() {
        let mut rng = Pcg32::seed_from_u64(42);
        let grunts = (0..10_000).filter(|_| random_kind(&mut rng) == EnemyKind::Grunt).count();
        assert!((6_500..=7_500).contains(&grunts), "grunts = {grunts}");
    }

    #[test]
    fn test_patrol_to_chase_and_back() {
        let (mut enemies, mut projectiles, mut player, mut events, bounds, mut rng) = setup();
        let id = spawn_enemy(&mut enemies, EnemyKind::Grunt, Vec2::new(40.0, 0.0), 1.0);

        update_enemies(&mut enemies, &mut projectiles, &mut player, &mut events, &bounds, &mut rng, 0.1);
        assert_eq!(enemies.get(id).unwrap().ai, AiState::Patrolling);

        enemies.get_mut(id).unwrap().pos = Vec2::new(10.0, 0.0);
        update_enemies(&mut enemies, &mut projectiles, &mut player, &mut events, &bounds, &mut rng, 0.1);
        let e = enemies.get(id).unwrap();
        assert_eq!(e.ai, AiState::Chasing);
        // Moved toward the player
        assert!(e.pos.x < 10.0);

        enemies.get_mut(id).unwrap().pos = Vec2::new(60.0, 0.0);
        update_enemies(&mut enemies, &mut projectiles, &mut player, &mut events, &bounds, &mut rng, 0.1);
        assert_eq!(enemies.get(id).unwrap().ai, AiState::Patrolling);
    }

    #[test]
    fn test_contact_damage_respects_cooldown() {
        let (mut enemies, mut projectiles, mut player, mut events, bounds, mut rng) = setup();
        let id = spawn_enemy(&mut enemies, EnemyKind::Grunt, Vec2::new(0.5, 0.0), 1.0);
        let hearts = player.stats.hearts;

        update_enemies(&mut enemies, &mut projectiles, &mut player, &mut events, &bounds, &mut rng, 0.016);
        assert_eq!(player.stats.hearts, hearts - 1);
        let cooldown = enemies.get(id).unwrap().attack_cooldown;
        assert!((cooldown - EnemyKind::Grunt.preset().attack_cooldown).abs() < 1e-6);

        // Still in range, invincibility and cooldown both active
        player.invincibility = 0.0;
        update_enemies(&mut enemies, &mut projectiles, &mut player, &mut events, &bounds, &mut rng, 0.016);
        assert_eq!(player.stats.hearts, hearts - 1);
    }

    #[test]
    fn test_stag_dash_cycle() {
        let mut brain = BossBrain::new(BossKind::Stag);
        brain.dash_cooldown = 0.0;
        let behavior = BossKind::Stag.behavior();
        let sense = BossSense {
            to_player: Vec2::new(10.0, 0.0),
            distance: 10.0,
            health_fraction: 1.0,
        };

        assert_eq!(behavior.think(&mut brain, &sense), BossAction::Hold);
        assert_eq!(brain.state, WINDING_UP);

        brain.tick_timers(1.0);
        behavior.think(&mut brain, &sense);
        assert_eq!(brain.state, DASHING);

        match behavior.think(&mut brain, &sense) {
            BossAction::Dash { dir, .. } => assert!((dir - Vec2::X).length() < 1e-6),
            other => panic!("expected dash, got {other:?}"),
        }

        brain.tick_timers(1.0);
        behavior.think(&mut brain, &sense);
        assert_eq!(brain.state, RECOVERING);
        assert!(brain.dash_cooldown > 0.0);

        brain.tick_timers(2.0);
        behavior.think(&mut brain, &sense);
        assert_eq!(brain.state, CHASING);
    }

    #[test]
    fn test_stag_volley_branch_and_enrage() {
        let mut brain = BossBrain::new(BossKind::Stag);
        brain.volley_cooldown = 0.0;
        let sense = BossSense {
            to_player: Vec2::new(0.0, 30.0),
            distance: 30.0,
            health_fraction: 0.4,
        };
        let action = BossKind::Stag.behavior().think(&mut brain, &sense);
        assert!(brain.enraged);
        assert_eq!(brain.state, PROJECTILE_ATTACK);
        assert!(matches!(action, BossAction::Volley { count: 7, .. }));
    }

    #[test]
    fn test_boss_volley_spawns_hostile_projectiles() {
        let (mut enemies, mut projectiles, mut player, mut events, bounds, mut rng) = setup();
        let id = spawn_enemy(&mut enemies, EnemyKind::Boss(BossKind::Stag), Vec2::new(30.0, 0.0), 1.0);
        if let Some(brain) = enemies.get_mut(id).and_then(|e| e.boss.as_mut()) {
            brain.volley_cooldown = 0.0;
        }
        update_enemies(&mut enemies, &mut projectiles, &mut player, &mut events, &bounds, &mut rng, 0.016);
        assert_eq!(projectiles.len(), 5);
        assert!(projectiles.values().all(|p| p.hostile));
    }

    #[test]
    fn test_separation_pushes_apart() {
        let (mut enemies, _, _, _, bounds, _) = setup();
        let a = spawn_enemy(&mut enemies, EnemyKind::Grunt, Vec2::ZERO, 1.0);
        let b = spawn_enemy(&mut enemies, EnemyKind::Grunt, Vec2::new(0.2, 0.0), 1.0);
        separate(&mut enemies, &bounds);
        let pa = enemies.get(a).unwrap().pos;
        let pb = enemies.get(b).unwrap().pos;
        assert!((pa.distance(pb) - 1.0).abs() < 1e-4);
    }

    #[test]
    fn test_knockback_decays() {
        let (mut enemies, mut projectiles, mut player, mut events, bounds, mut rng) = setup();
        let id = spawn_enemy(&mut enemies, EnemyKind::Brute, Vec2::new(50.0, 50.0), 1.0);
        enemies.get_mut(id).unwrap().velocity = Vec2::new(10.0, 0.0);
        for _ in 0..60 {
            update_enemies(&mut enemies, &mut projectiles, &mut player, &mut events, &bounds, &mut rng, 0.016);
        }
        assert!(enemies.get(id).unwrap().velocity.length() < 0.01);
    }
}
