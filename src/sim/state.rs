//! World state and render snapshots
//!
//! Everything the simulation advances lives in [`World`]. The host reads it
//! back through [`World::snapshot`] and [`World::drain_events`].

use glam::Vec2;
use rand::SeedableRng;
use rand_pcg::Pcg32;
use serde::{Deserialize, Serialize};

use super::arena::Arena;
use super::enemy::{AiState, BossKind, Enemy, EnemyId, EnemyKind, Spawner, spawn_enemy};
use super::events::{EventLog, SimEvent};
use super::hit::KillRecord;
use super::orbs::XpOrb;
use super::player::Player;
use super::progression::Progression;
use super::projectile::Projectile;
use super::status::StatusEffects;
use super::summon::{SummonKind, SummonLedger, Summons};
use super::upgrades::Upgrade;
use crate::consts::SPAWN_DISTANCE_MIN;
use crate::tuning::Tuning;

/// Symmetric room extents on the ground plane
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct WorldBounds {
    pub half_x: f32,
    /// Extent along the world z axis (`Vec2::y` on the ground plane)
    pub half_z: f32,
}

impl WorldBounds {
    pub fn new(half_x: f32, half_z: f32) -> Self {
        Self { half_x, half_z }
    }

    pub fn contains(&self, pos: Vec2) -> bool {
        pos.x.abs() <= self.half_x && pos.y.abs() <= self.half_z
    }

    /// Clamp a body of `radius` inside the room
    pub fn clamp(&self, pos: Vec2, radius: f32) -> Vec2 {
        let hx = (self.half_x - radius).max(0.0);
        let hz = (self.half_z - radius).max(0.0);
        Vec2::new(pos.x.clamp(-hx, hx), pos.y.clamp(-hz, hz))
    }
}

/// Current phase of the run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Phase {
    Playing,
    /// Frozen until an upgrade is chosen
    LevelUp,
    GameOver,
}

/// The whole simulation
///
/// Hosts call [`World::drain_events`] after every [`tick`](crate::sim::tick::tick); the
/// event log is not capped and keeps growing until it is drained.
pub struct World {
    pub tuning: Tuning,
    pub bounds: WorldBounds,
    pub phase: Phase,
    /// Simulated seconds (frozen and skipped frames excluded)
    pub time: f32,
    pub frame: u64,
    pub player: Player,
    pub enemies: Arena<Enemy>,
    pub projectiles: Arena<Projectile>,
    pub summons: Summons,
    pub ledger: SummonLedger,
    pub effects: StatusEffects,
    pub orbs: Arena<XpOrb>,
    pub progression: Progression,
    pub spawner: Spawner,
    pub boss_spawned: bool,
    /// Deaths from the current frame, reaped into orbs
    pub kills: Vec<KillRecord>,
    pub total_kills: u32,
    pub events: EventLog,
    pub rng: Pcg32,
}

impl World {
    pub fn new(tuning: Tuning) -> Self {
        let mut ledger = SummonLedger::default();
        for &kind in &tuning.starting_summons {
            ledger.grant(kind, 1);
        }
        let player = Player::new(tuning.player.clone());
        let mut summons = Summons::default();
        summons.sync_roster(&ledger, player.pos);

        log::info!(
            "New run: seed {}, difficulty {}, room {}x{}",
            tuning.seed,
            tuning.difficulty.as_str(),
            tuning.bounds.half_x * 2.0,
            tuning.bounds.half_z * 2.0
        );

        Self {
            bounds: tuning.bounds,
            phase: Phase::Playing,
            time: 0.0,
            frame: 0,
            player,
            enemies: Arena::new(),
            projectiles: Arena::new(),
            summons,
            ledger,
            effects: StatusEffects::default(),
            orbs: Arena::new(),
            progression: Progression::new(),
            spawner: Spawner::new(tuning.scaled_schedule()),
            boss_spawned: false,
            kills: Vec::new(),
            total_kills: 0,
            events: EventLog::default(),
            rng: Pcg32::seed_from_u64(tuning.seed),
            tuning,
        }
    }

    pub fn is_frozen(&self) -> bool {
        self.phase != Phase::Playing
    }

    /// Health multiplier for new enemies
    pub fn health_scale(&self) -> f32 {
        self.tuning.difficulty.health_multiplier()
    }

    /// Drop a boss at the edge of the spawn ring, on the far side from the room center
    pub fn spawn_boss(&mut self, kind: BossKind) -> EnemyId {
        let enemy_kind = EnemyKind::Boss(kind);
        let away = (-self.player.pos).normalize_or(Vec2::X);
        let pos = self
            .bounds
            .clamp(self.player.pos + away * SPAWN_DISTANCE_MIN, enemy_kind.preset().radius);
        let scale = self.health_scale();
        let id = spawn_enemy(&mut self.enemies, enemy_kind, pos, scale);
        self.boss_spawned = true;
        self.events.push(SimEvent::BossSpawned { pos });
        log::info!("Boss {:?} spawned at ({:.1}, {:.1}) t={:.1}s", kind, pos.x, pos.y, self.time);
        id
    }

    /// Hand the accumulated events to the host
    pub fn drain_events(&mut self) -> Vec<SimEvent> {
        self.events.drain()
    }

    pub fn snapshot(&self) -> Snapshot {
        Snapshot {
            time: self.time,
            phase: self.phase,
            player: PlayerView {
                pos: self.player.pos,
                facing: self.player.facing,
                hearts: self.player.stats.hearts,
                max_hearts: self.player.stats.max_hearts,
                ammo: self.player.ammo,
                ammo_capacity: self.player.stats.ammo_capacity,
                reloading: self.player.is_reloading(),
                invincible: self.player.invincibility > 0.0,
            },
            enemies: self
                .enemies
                .iter()
                .map(|(id, e)| EnemyView {
                    id: id.to_bits(),
                    kind: e.kind,
                    pos: e.pos,
                    health_fraction: e.health_fraction(),
                    ai: e.ai,
                    boss_state: e.boss.as_ref().map(|b| b.state),
                    flashing: e.hit_flash > 0.0,
                })
                .collect(),
            projectiles: self
                .projectiles
                .iter()
                .map(|(id, p)| ProjectileView {
                    id: id.to_bits(),
                    pos: p.pos,
                    vel: p.vel,
                    trail: p.trail.iter().copied().collect(),
                    hostile: p.hostile,
                })
                .collect(),
            summons: self
                .summons
                .iter()
                .map(|(id, s)| SummonView {
                    id: id.to_bits(),
                    kind: s.kind,
                    pos: s.pos,
                    rotation: s.rotation,
                })
                .collect(),
            orbs: self
                .orbs
                .values()
                .map(|o| OrbView {
                    pos: o.pos,
                    value: o.value,
                })
                .collect(),
            progression: ProgressionView {
                level: self.progression.level,
                xp: self.progression.xp,
                threshold: self.progression.threshold(),
                choices: self.progression.choices.clone(),
            },
            total_kills: self.total_kills,
        }
    }
}

/// Read-only view of the world for rendering and UI
#[derive(Debug, Clone, Serialize)]
pub struct Snapshot {
    pub time: f32,
    pub phase: Phase,
    pub player: PlayerView,
    pub enemies: Vec<EnemyView>,
    pub projectiles: Vec<ProjectileView>,
    pub summons: Vec<SummonView>,
    pub orbs: Vec<OrbView>,
    pub progression: ProgressionView,
    pub total_kills: u32,
}

#[derive(Debug, Clone, Serialize)]
pub struct PlayerView {
    pub pos: Vec2,
    pub facing: Vec2,
    pub hearts: u32,
    pub max_hearts: u32,
    pub ammo: u32,
    pub ammo_capacity: u32,
    pub reloading: bool,
    pub invincible: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct EnemyView {
    pub id: u64,
    pub kind: EnemyKind,
    pub pos: Vec2,
    pub health_fraction: f32,
    pub ai: AiState,
    pub boss_state: Option<&'static str>,
    pub flashing: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct ProjectileView {
    pub id: u64,
    pub pos: Vec2,
    pub vel: Vec2,
    pub trail: Vec<Vec2>,
    pub hostile: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct SummonView {
    pub id: u64,
    pub kind: SummonKind,
    pub pos: Vec2,
    pub rotation: f32,
}

#[derive(Debug, Clone, Serialize)]
pub struct OrbView {
    pub pos: Vec2,
    pub value: u32,
}

#[derive(Debug, Clone, Serialize)]
pub struct ProgressionView {
    pub level: u32,
    pub xp: u32,
    pub threshold: u32,
    pub choices: Vec<Upgrade>,
}
