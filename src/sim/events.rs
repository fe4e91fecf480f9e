//! Records handed to external collaborators
//!
//! The core never draws or plays anything. It appends [`SimEvent`]s while a
//! frame runs and the host drains them afterwards for overlays and audio.

use glam::Vec2;
use serde::{Deserialize, Serialize};

use super::summon::SummonKind;
use super::upgrades::Upgrade;
use crate::consts::{DAMAGE_NUMBER_LIFETIME, IMPACT_LIFETIME};

/// Audio notifications (fire-and-forget)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SoundCue {
    /// Something took damage
    Hit,
    /// A kill or a level-up
    Success,
}

/// Who dealt a hit
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum HitSource {
    Player,
    Summon(SummonKind),
    /// Burn/curse ticks
    Status,
    /// Hostile fire (boss volleys)
    Enemy,
}

impl HitSource {
    pub fn is_player(self) -> bool {
        self == HitSource::Player
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum SimEvent {
    /// Floating damage number
    DamageNumber {
        pos: Vec2,
        amount: f32,
        crit: bool,
        lifetime: f32,
    },
    /// Impact spark at a contact point
    Impact {
        pos: Vec2,
        magnitude: f32,
        lifetime: f32,
    },
    Explosion {
        pos: Vec2,
        radius: f32,
    },
    /// One chain-lightning (or bug zap) arc
    ChainArc {
        from: Vec2,
        to: Vec2,
    },
    /// Trail of a retired projectile, for a short fade-out
    TrailGhost {
        points: Vec<Vec2>,
    },
    EnemyKilled {
        pos: Vec2,
        xp: u32,
        source: HitSource,
    },
    BossSpawned {
        pos: Vec2,
    },
    PlayerHurt {
        hearts_left: u32,
    },
    PlayerHealed {
        hearts: u32,
    },
    KillStreak {
        count: u32,
    },
    XpCollected {
        amount: u32,
    },
    LevelUp {
        level: u32,
        choices: Vec<Upgrade>,
    },
    UpgradeApplied {
        upgrade: Upgrade,
    },
    GameOver,
    Sound(SoundCue),
}

/// Append-only event sink for one or more frames
///
/// Unbounded: the host is expected to drain it once per frame.
#[derive(Debug, Clone, Default)]
pub struct EventLog {
    events: Vec<SimEvent>,
}

impl EventLog {
    pub fn push(&mut self, event: SimEvent) {
        self.events.push(event);
    }

    pub fn damage_number(&mut self, pos: Vec2, amount: f32, crit: bool) {
        self.push(SimEvent::DamageNumber {
            pos,
            amount,
            crit,
            lifetime: DAMAGE_NUMBER_LIFETIME,
        });
    }

    pub fn impact(&mut self, pos: Vec2, magnitude: f32) {
        self.push(SimEvent::Impact {
            pos,
            magnitude,
            lifetime: IMPACT_LIFETIME,
        });
    }

    pub fn sound(&mut self, cue: SoundCue) {
        self.push(SimEvent::Sound(cue));
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &SimEvent> {
        self.events.iter()
    }

    /// Hand everything accumulated so far to the host
    pub fn drain(&mut self) -> Vec<SimEvent> {
        std::mem::take(&mut self.events)
    }
}
