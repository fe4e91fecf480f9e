//! The single authority for applying damage
//!
//! Every projectile, summon, melee swing and status tick that hurts an enemy
//! goes through [`HitResolver::apply_hit`]. The resolver does not own any
//! state: it is assembled for one phase of a frame from borrowed pieces of
//! the world (player record, summon ledger, status tracker, event and kill
//! logs, RNG) and dropped before the next phase starts.

use std::collections::HashSet;

use glam::Vec2;
use rand_pcg::Pcg32;

use super::arena::Arena;
use super::enemy::{Enemy, EnemyId, EnemyKind, nearest_enemies, nearest_enemy};
use super::events::{EventLog, HitSource, SimEvent, SoundCue};
use super::player::Player;
use super::projectile::{ChainLightning, Explosive};
use super::status::{StatusEffect, StatusEffects};
use super::summon::SummonLedger;
use crate::consts::*;

/// Knockback scale for chain-lightning hops
const CHAIN_KNOCKBACK: f32 = 0.3;

/// How a hit should be applied
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HitOptions {
    pub source: HitSource,
    /// Explicit knockback origin (preferred)
    pub source_pos: Option<Vec2>,
    /// Contact point, used for the impact record and as the last knockback fallback
    pub impact_pos: Option<Vec2>,
    /// Knockback scale relative to [`BASE_KNOCKBACK`] (0 = none)
    pub knockback: f32,
    /// Per-tick burn damage to apply (0 = none)
    pub burn_damage: f32,
    pub curse: bool,
    /// Detonate at the corpse if this hit kills
    pub explosive: Option<Explosive>,
    pub crit: bool,
}

impl HitOptions {
    pub fn new(source: HitSource) -> Self {
        Self {
            source,
            source_pos: None,
            impact_pos: None,
            knockback: 1.0,
            burn_damage: 0.0,
            curse: false,
            explosive: None,
            crit: false,
        }
    }

    /// Plain damage: no knockback, no status
    pub fn status_tick() -> Self {
        Self {
            knockback: 0.0,
            ..Self::new(HitSource::Status)
        }
    }
}

/// What happened to the target
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HitOutcome {
    /// False when the target no longer exists
    pub landed: bool,
    pub damage: f32,
    pub remaining_health: f32,
    pub killed: bool,
}

impl HitOutcome {
    fn missed() -> Self {
        Self {
            landed: false,
            damage: 0.0,
            remaining_health: 0.0,
            killed: false,
        }
    }
}

/// A death from this frame, turned into an XP orb by the population
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct KillRecord {
    pub kind: EnemyKind,
    pub pos: Vec2,
    pub xp: u32,
    pub source: HitSource,
}

/// One chain-lightning hop
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ChainHop {
    pub target: EnemyId,
    pub from: Vec2,
    pub to: Vec2,
    pub damage: f32,
}

/// Linear falloff: full damage at the center, zero at `radius`
pub fn explosion_falloff(damage: f32, radius: f32, distance: f32) -> f32 {
    if radius <= 0.0 || distance >= radius {
        return 0.0;
    }
    damage * (1.0 - distance.max(0.0) / radius)
}

pub struct HitResolver<'a> {
    pub player: &'a mut Player,
    pub summons: &'a mut SummonLedger,
    pub effects: &'a mut StatusEffects,
    pub events: &'a mut EventLog,
    pub kills: &'a mut Vec<KillRecord>,
    pub rng: &'a mut Pcg32,
}

impl<'a> HitResolver<'a> {
    pub fn new(
        player: &'a mut Player,
        summons: &'a mut SummonLedger,
        effects: &'a mut StatusEffects,
        events: &'a mut EventLog,
        kills: &'a mut Vec<KillRecord>,
        rng: &'a mut Pcg32,
    ) -> Self {
        Self {
            player,
            summons,
            effects,
            events,
            kills,
            rng,
        }
    }

    /// Damage an enemy and run every consequence of the hit
    ///
    /// A missing id (already dead, already removed) is a normal outcome and
    /// touches nothing.
    pub fn apply_hit(
        &mut self,
        enemies: &mut Arena<Enemy>,
        id: EnemyId,
        damage: f32,
        opts: &HitOptions,
    ) -> HitOutcome {
        let Some(enemy) = enemies.get_mut(id) else {
            return HitOutcome::missed();
        };

        let damage = damage.max(0.0);
        enemy.health = (enemy.health - damage).max(0.0);
        enemy.hit_flash = HIT_FLASH_SECS;

        let origin = opts
            .source_pos
            .or_else(|| opts.source.is_player().then_some(self.player.pos))
            .or(opts.impact_pos);
        if let Some(origin) = origin {
            let strength = BASE_KNOCKBACK * opts.knockback * self.player.stats.knockback_multiplier;
            if strength > 0.0 {
                enemy.velocity += (enemy.pos - origin).normalize_or_zero() * strength;
            }
        }

        self.events.damage_number(enemy.pos, damage, opts.crit);
        self.events.impact(opts.impact_pos.unwrap_or(enemy.pos), damage);
        self.events.sound(SoundCue::Hit);

        if opts.burn_damage > 0.0 {
            self.effects.add(StatusEffect::burn(id, opts.burn_damage));
        }
        if opts.curse {
            let curse = self.player.stats.base_damage * CURSE_DAMAGE_MULTIPLIER * self.summons.curse_bonus;
            self.effects.add(StatusEffect::curse(id, curse));
        }

        let remaining_health = enemy.health;
        let killed = self.check_death(enemies, id, opts);
        HitOutcome {
            landed: true,
            damage,
            remaining_health: if killed { 0.0 } else { remaining_health },
            killed,
        }
    }

    /// Apply the instant-kill rule, then process a death exactly once
    ///
    /// The corpse leaves the arena here, so any later hit on the same id
    /// this frame is a miss.
    pub fn check_death(&mut self, enemies: &mut Arena<Enemy>, id: EnemyId, opts: &HitOptions) -> bool {
        let Some(enemy) = enemies.get_mut(id) else {
            return false;
        };

        let threshold = self.player.stats.instant_kill_threshold;
        let fraction = enemy.health_fraction();
        if threshold > 0.0 && fraction > 0.0 && fraction <= threshold {
            enemy.health = 0.0;
        }
        if enemy.health > 0.0 {
            return false;
        }

        let Some(corpse) = enemies.remove(id) else {
            return false;
        };
        self.effects.clear_target(id);
        self.kills.push(KillRecord {
            kind: corpse.kind,
            pos: corpse.pos,
            xp: corpse.xp_value,
            source: opts.source,
        });
        self.events.push(SimEvent::EnemyKilled {
            pos: corpse.pos,
            xp: corpse.xp_value,
            source: opts.source,
        });
        self.events.sound(SoundCue::Success);
        if corpse.is_boss() {
            log::info!("Boss {:?} defeated", corpse.kind);
        }

        if let Some(explosive) = opts.explosive {
            self.explode(enemies, corpse.pos, explosive, opts.source);
        }

        match opts.source {
            HitSource::Summon(_) => {
                if self.summons.record_kill() {
                    let hearts = self.player.heal(1);
                    self.events.push(SimEvent::PlayerHealed { hearts });
                }
            }
            HitSource::Player => {
                self.player.kill_streak += 1;
                self.player.streak_timer = 0.0;
                let streak = self.player.kill_streak;
                if streak % KILL_STREAK_BONUS_EVERY == 0 {
                    self.player.refill_ammo();
                    self.events.push(SimEvent::KillStreak { count: streak });
                }
            }
            HitSource::Status | HitSource::Enemy => {}
        }

        true
    }

    /// Area damage with linear falloff and proportional knockback
    pub fn explode(
        &mut self,
        enemies: &mut Arena<Enemy>,
        center: Vec2,
        explosive: Explosive,
        source: HitSource,
    ) -> usize {
        self.events.push(SimEvent::Explosion {
            pos: center,
            radius: explosive.radius,
        });

        let targets = nearest_enemies(enemies, center, explosive.radius, usize::MAX, |_| false);
        let mut hit = 0;
        for (id, _, distance) in targets {
            let damage = explosion_falloff(explosive.damage, explosive.radius, distance);
            if damage <= 0.0 {
                continue;
            }
            let opts = HitOptions {
                source_pos: Some(center),
                knockback: damage / explosive.damage.max(1e-6),
                ..HitOptions::new(source)
            };
            if self.apply_hit(enemies, id, damage, &opts).landed {
                hit += 1;
            }
        }
        hit
    }

    /// Hop from `first` to the nearest unchained enemy, 70% damage per hop
    ///
    /// Runs as a bounded loop over the chain budget.
    pub fn chain_lightning(
        &mut self,
        enemies: &mut Arena<Enemy>,
        first: EnemyId,
        first_pos: Vec2,
        damage: f32,
        chain: ChainLightning,
        source: HitSource,
    ) -> Vec<ChainHop> {
        let mut chained: HashSet<EnemyId> = HashSet::from([first]);
        let mut hops = Vec::new();
        let mut from = first_pos;
        let mut hop_damage = damage;

        for _ in 0..chain.chains {
            hop_damage *= CHAIN_DAMAGE_FALLOFF;
            let Some((target, to, _)) = nearest_enemy(enemies, from, chain.range, |id| chained.contains(&id)) else {
                break;
            };
            self.events.push(SimEvent::ChainArc { from, to });
            let opts = HitOptions {
                source_pos: Some(from),
                impact_pos: Some(to),
                knockback: CHAIN_KNOCKBACK,
                ..HitOptions::new(source)
            };
            self.apply_hit(enemies, target, hop_damage, &opts);
            chained.insert(target);
            hops.push(ChainHop {
                target,
                from,
                to,
                damage: hop_damage,
            });
            from = to;
        }
        hops
    }
}

/// Take one heart from the player unless invincibility is running
///
/// Returns whether a heart was lost. No percentage math, only a fixed
/// decrement.
pub fn apply_player_damage(player: &mut Player, events: &mut EventLog) -> bool {
    if player.invincibility > 0.0 || player.stats.hearts == 0 {
        return false;
    }
    player.stats.hearts -= 1;
    player.invincibility = INVINCIBILITY_SECS;
    events.push(SimEvent::PlayerHurt {
        hearts_left: player.stats.hearts,
    });
    true
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sim::enemy::spawn_enemy;
    use crate::sim::player::PlayerStats;
    use crate::sim::summon::SummonKind;
    use proptest::prelude::*;
    use rand::SeedableRng;

    struct Fixture {
        enemies: Arena<Enemy>,
        player: Player,
        summons: SummonLedger,
        effects: StatusEffects,
        events: EventLog,
        kills: Vec<KillRecord>,
        rng: Pcg32,
    }

    impl Fixture {
        fn new() -> Self {
            Self {
                enemies: Arena::new(),
                player: Player::new(PlayerStats::default()),
                summons: SummonLedger::default(),
                effects: StatusEffects::default(),
                events: EventLog::default(),
                kills: Vec::new(),
                rng: Pcg32::seed_from_u64(17),
            }
        }

        fn spawn(&mut self, pos: Vec2) -> EnemyId {
            spawn_enemy(&mut self.enemies, EnemyKind::Grunt, pos, 1.0)
        }

        /// Split-borrow the resolver and the roster
        fn parts(&mut self) -> (HitResolver<'_>, &mut Arena<Enemy>) {
            (
                HitResolver::new(
                    &mut self.player,
                    &mut self.summons,
                    &mut self.effects,
                    &mut self.events,
                    &mut self.kills,
                    &mut self.rng,
                ),
                &mut self.enemies,
            )
        }
    }

    #[test]
    fn test_three_hits_kill_once() {
        let mut fx = Fixture::new();
        let id = fx.spawn(Vec2::new(5.0, 0.0));
        let opts = HitOptions::new(HitSource::Player);

        let (mut hits, enemies) = fx.parts();
        let healths: Vec<f32> = (0..3)
            .map(|_| hits.apply_hit(enemies, id, 10.0, &opts).remaining_health)
            .collect();
        assert_eq!(healths, vec![15.0, 5.0, 0.0]);

        // A fourth hit on the corpse is a miss, not a second death
        let outcome = hits.apply_hit(enemies, id, 10.0, &opts);
        assert!(!outcome.landed);
        assert_eq!(fx.kills.len(), 1);
        let killed_events = fx
            .events
            .iter()
            .filter(|e| matches!(e, SimEvent::EnemyKilled { .. }))
            .count();
        assert_eq!(killed_events, 1);
        assert!(!fx.enemies.contains(id));
    }

    #[test]
    fn test_knockback_prefers_explicit_source() {
        let mut fx = Fixture::new();
        let id = fx.spawn(Vec2::new(5.0, 0.0));
        let opts = HitOptions {
            source_pos: Some(Vec2::new(5.0, -3.0)),
            ..HitOptions::new(HitSource::Player)
        };
        let (mut hits, enemies) = fx.parts();
        hits.apply_hit(enemies, id, 1.0, &opts);
        let v = fx.enemies.get(id).unwrap().velocity;
        // Pushed away from (5, -3), i.e. along +y
        assert!(v.y > 0.0 && v.x.abs() < 1e-4);
    }

    #[test]
    fn test_knockback_falls_back_to_player_then_impact() {
        let mut fx = Fixture::new();
        let a = fx.spawn(Vec2::new(5.0, 0.0));
        let b = fx.spawn(Vec2::new(0.0, 8.0));
        let (mut hits, enemies) = fx.parts();

        hits.apply_hit(enemies, a, 1.0, &HitOptions::new(HitSource::Player));
        let summon_hit = HitOptions {
            impact_pos: Some(Vec2::new(0.0, 9.0)),
            ..HitOptions::new(HitSource::Summon(SummonKind::Scythe))
        };
        hits.apply_hit(enemies, b, 1.0, &summon_hit);

        // Player at origin pushes `a` along +x
        assert!(fx.enemies.get(a).unwrap().velocity.x > 0.0);
        // Impact above `b` pushes it down
        assert!(fx.enemies.get(b).unwrap().velocity.y < 0.0);
    }

    #[test]
    fn test_knockback_compounds() {
        let mut fx = Fixture::new();
        let id = fx.spawn(Vec2::new(3.0, 0.0));
        let opts = HitOptions::new(HitSource::Player);
        let (mut hits, enemies) = fx.parts();
        hits.apply_hit(enemies, id, 1.0, &opts);
        let once = enemies.get(id).unwrap().velocity.x;
        hits.apply_hit(enemies, id, 1.0, &opts);
        let twice = enemies.get(id).unwrap().velocity.x;
        assert!((twice - 2.0 * once).abs() < 1e-4);
    }

    #[test]
    fn test_instant_kill_threshold() {
        let mut fx = Fixture::new();
        fx.player.stats.instant_kill_threshold = 0.25;
        let id = fx.spawn(Vec2::new(2.0, 0.0));
        let (mut hits, enemies) = fx.parts();
        // 25 → 15 (60%) survives
        assert!(!hits.apply_hit(enemies, id, 10.0, &HitOptions::new(HitSource::Player)).killed);
        // 15 → 6 (24%) is inside (0, 0.25]
        assert!(hits.apply_hit(enemies, id, 9.0, &HitOptions::new(HitSource::Player)).killed);
        assert_eq!(fx.kills.len(), 1);
    }

    #[test]
    fn test_burn_and_curse_applied() {
        let mut fx = Fixture::new();
        fx.summons.curse_bonus = 2.0;
        let id = fx.spawn(Vec2::new(2.0, 0.0));
        let opts = HitOptions {
            burn_damage: 1.5,
            curse: true,
            ..HitOptions::new(HitSource::Summon(SummonKind::Ghost))
        };
        let (mut hits, enemies) = fx.parts();
        hits.apply_hit(enemies, id, 1.0, &opts);

        let curse = fx
            .effects
            .iter()
            .find(|e| e.kind == crate::sim::status::EffectKind::Curse)
            .unwrap();
        assert_eq!(curse.damage, 10.0 * CURSE_DAMAGE_MULTIPLIER * 2.0);
        assert_eq!(fx.effects.len(), 2);
    }

    #[test]
    fn test_soul_drain_heals_on_500th_summon_kill() {
        let mut fx = Fixture::new();
        fx.summons.soul_drain = true;
        fx.summons.summon_kills = SOUL_DRAIN_KILLS - 1;
        fx.player.stats.hearts = 2;
        let id = fx.spawn(Vec2::new(2.0, 0.0));
        let opts = HitOptions::new(HitSource::Summon(SummonKind::Dagger));
        let (mut hits, enemies) = fx.parts();
        hits.apply_hit(enemies, id, 100.0, &opts);
        assert_eq!(fx.player.stats.hearts, 3);
    }

    #[test]
    fn test_kill_streak_refills_ammo() {
        let mut fx = Fixture::new();
        fx.player.ammo = 1;
        fx.player.kill_streak = KILL_STREAK_BONUS_EVERY - 1;
        let id = fx.spawn(Vec2::new(2.0, 0.0));
        let (mut hits, enemies) = fx.parts();
        hits.apply_hit(enemies, id, 100.0, &HitOptions::new(HitSource::Player));
        assert_eq!(fx.player.ammo, fx.player.stats.ammo_capacity);
    }

    #[test]
    fn test_explosion_on_kill_when_tagged() {
        let mut fx = Fixture::new();
        let target = fx.spawn(Vec2::new(10.0, 0.0));
        let bystander = fx.spawn(Vec2::new(11.0, 0.0));
        let opts = HitOptions {
            explosive: Some(Explosive {
                radius: 4.0,
                damage: 8.0,
            }),
            ..HitOptions::new(HitSource::Player)
        };
        let (mut hits, enemies) = fx.parts();
        hits.apply_hit(enemies, target, 100.0, &opts);
        let health = fx.enemies.get(bystander).unwrap().health;
        assert!((health - (25.0 - 6.0)).abs() < 1e-4);
    }

    #[test]
    fn test_explosion_falloff_endpoints() {
        assert_eq!(explosion_falloff(40.0, 5.0, 0.0), 40.0);
        assert_eq!(explosion_falloff(40.0, 5.0, 5.0), 0.0);
        assert!((explosion_falloff(40.0, 5.0, 2.5) - 20.0).abs() < 1e-5);
        assert_eq!(explosion_falloff(40.0, 0.0, 0.0), 0.0);
    }

    #[test]
    fn test_chain_lightning_three_hops_decreasing() {
        let mut fx = Fixture::new();
        let first = fx.spawn(Vec2::new(0.0, 0.0));
        for i in 1..=5 {
            fx.spawn(Vec2::new(i as f32 * 3.0, 0.0));
        }
        let chain = ChainLightning { chains: 3, range: 4.0 };
        let (mut hits, enemies) = fx.parts();
        let hops = hits.chain_lightning(enemies, first, Vec2::ZERO, 10.0, chain, HitSource::Player);

        assert_eq!(hops.len(), 3);
        assert!(hops.iter().all(|h| h.target != first));
        let damages: Vec<f32> = hops.iter().map(|h| h.damage).collect();
        assert!((damages[0] - 7.0).abs() < 1e-4);
        assert!((damages[1] - 4.9).abs() < 1e-4);
        assert!((damages[2] - 3.43).abs() < 1e-4);
    }

    #[test]
    fn test_chain_lightning_stops_when_nobody_in_range() {
        let mut fx = Fixture::new();
        let first = fx.spawn(Vec2::ZERO);
        fx.spawn(Vec2::new(3.0, 0.0));
        fx.spawn(Vec2::new(30.0, 0.0));
        let (mut hits, enemies) = fx.parts();
        let hops = hits.chain_lightning(
            enemies,
            first,
            Vec2::ZERO,
            10.0,
            ChainLightning { chains: 5, range: 4.0 },
            HitSource::Player,
        );
        assert_eq!(hops.len(), 1);
    }

    #[test]
    fn test_player_damage_respects_invincibility() {
        let mut player = Player::new(PlayerStats::default());
        let mut events = EventLog::default();
        let hearts = player.stats.hearts;

        player.invincibility = 0.3;
        assert!(!apply_player_damage(&mut player, &mut events));
        assert_eq!(player.stats.hearts, hearts);

        player.invincibility = 0.0;
        assert!(apply_player_damage(&mut player, &mut events));
        assert_eq!(player.stats.hearts, hearts - 1);
        assert_eq!(player.invincibility, INVINCIBILITY_SECS);

        // Immediately again: blocked
        assert!(!apply_player_damage(&mut player, &mut events));
        assert_eq!(player.stats.hearts, hearts - 1);
    }

    proptest! {
        #[test]
        fn prop_health_never_negative(damages in proptest::collection::vec(0.0f32..40.0, 1..8)) {
            let mut fx = Fixture::new();
            let id = fx.spawn(Vec2::new(1.0, 1.0));
            let opts = HitOptions::new(HitSource::Player);
            let mut expected = 25.0f32;
            for dmg in damages {
                let (mut hits, enemies) = fx.parts();
                let outcome = hits.apply_hit(enemies, id, dmg, &opts);
                if !outcome.landed {
                    break;
                }
                expected = (expected - dmg).max(0.0);
                prop_assert!((outcome.remaining_health - expected).abs() < 1e-3);
                prop_assert!(outcome.remaining_health >= 0.0);
            }
            prop_assert!(fx.kills.len() <= 1);
        }

        #[test]
        fn prop_explosion_falloff_monotonic(d1 in 0.0f32..10.0, d2 in 0.0f32..10.0) {
            let (near, far) = if d1 <= d2 { (d1, d2) } else { (d2, d1) };
            prop_assert!(explosion_falloff(30.0, 10.0, near) >= explosion_falloff(30.0, 10.0, far));
        }
    }
}
