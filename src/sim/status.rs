//! Timed damage effects bound to enemies
//!
//! The tracker only does the bookkeeping. [`StatusEffects::tick`] returns the
//! payloads that came due this frame and the frame driver pushes each one
//! through the hit resolver, so status damage follows the same path as every
//! other hit.

use serde::{Deserialize, Serialize};

use super::arena::Arena;
use super::enemy::{Enemy, EnemyId};
use crate::consts::{BURN_DURATION_SECS, BURN_TICK_SECS, CURSE_DELAY_SECS};

/// Slack for float accumulation when comparing timers
const DURATION_EPSILON: f32 = 1e-4;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum EffectKind {
    /// Periodic damage every tick interval
    Burn,
    /// One delayed payload when the duration runs out
    Curse,
}

#[derive(Debug, Clone)]
pub struct StatusEffect {
    pub target: EnemyId,
    pub kind: EffectKind,
    /// Damage per tick (burn) or the whole payload (curse)
    pub damage: f32,
    pub duration: f32,
    pub elapsed: f32,
    pub tick_interval: f32,
    pub since_tick: f32,
}

impl StatusEffect {
    pub fn burn(target: EnemyId, damage_per_tick: f32) -> Self {
        Self {
            target,
            kind: EffectKind::Burn,
            damage: damage_per_tick,
            duration: BURN_DURATION_SECS,
            elapsed: 0.0,
            tick_interval: BURN_TICK_SECS,
            since_tick: 0.0,
        }
    }

    pub fn curse(target: EnemyId, damage: f32) -> Self {
        Self {
            target,
            kind: EffectKind::Curse,
            damage,
            duration: CURSE_DELAY_SECS,
            elapsed: 0.0,
            tick_interval: CURSE_DELAY_SECS,
            since_tick: 0.0,
        }
    }

    pub fn is_expired(&self) -> bool {
        self.elapsed >= self.duration
    }
}

/// Damage that came due this frame
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StatusTick {
    pub target: EnemyId,
    pub kind: EffectKind,
    pub damage: f32,
}

#[derive(Debug, Clone, Default)]
pub struct StatusEffects {
    effects: Vec<StatusEffect>,
}

impl StatusEffects {
    pub fn len(&self) -> usize {
        self.effects.len()
    }

    pub fn is_empty(&self) -> bool {
        self.effects.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &StatusEffect> {
        self.effects.iter()
    }

    pub fn on_target(&self, target: EnemyId) -> impl Iterator<Item = &StatusEffect> {
        self.effects.iter().filter(move |e| e.target == target)
    }

    /// Add an effect. A second burn on the same target refreshes the first
    /// (duration restarts, stronger tick damage wins) instead of stacking.
    pub fn add(&mut self, effect: StatusEffect) {
        if effect.kind == EffectKind::Burn {
            if let Some(existing) = self
                .effects
                .iter_mut()
                .find(|e| e.kind == EffectKind::Burn && e.target == effect.target)
            {
                existing.elapsed = 0.0;
                existing.duration = existing.duration.max(effect.duration);
                existing.damage = existing.damage.max(effect.damage);
                return;
            }
        }
        self.effects.push(effect);
    }

    /// Advance every effect by `dt` and collect due damage
    ///
    /// Effects whose target is gone are dropped without firing; expired
    /// effects are pruned after their final payload.
    pub fn tick(&mut self, dt: f32, enemies: &Arena<Enemy>) -> Vec<StatusTick> {
        let mut due = Vec::new();

        self.effects.retain_mut(|effect| {
            if !enemies.contains(effect.target) {
                return false;
            }

            let remaining = (effect.duration - effect.elapsed).max(0.0);
            let step = dt.min(remaining);
            effect.elapsed = (effect.elapsed + step).min(effect.duration);
            if effect.duration - effect.elapsed <= DURATION_EPSILON {
                effect.elapsed = effect.duration;
            }
            effect.since_tick += step;

            match effect.kind {
                EffectKind::Burn => {
                    // Interval is clamped so a bad value cannot spin here
                    let interval = effect.tick_interval.max(1e-3);
                    while effect.since_tick + DURATION_EPSILON >= interval {
                        effect.since_tick -= interval;
                        due.push(StatusTick {
                            target: effect.target,
                            kind: effect.kind,
                            damage: effect.damage,
                        });
                    }
                }
                EffectKind::Curse => {
                    if effect.is_expired() {
                        due.push(StatusTick {
                            target: effect.target,
                            kind: effect.kind,
                            damage: effect.damage,
                        });
                    }
                }
            }

            !effect.is_expired()
        });

        due
    }

    /// Drop every effect on a target (e.g. when it is removed)
    pub fn clear_target(&mut self, target: EnemyId) {
        self.effects.retain(|e| e.target != target);
    }
}
