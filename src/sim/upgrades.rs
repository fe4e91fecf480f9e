//! Level-up upgrade catalog
//!
//! Upgrades mutate the player's stat block directly: rates and speeds are
//! multiplied, caps and counts are added to. Summon upgrades write to the
//! [`SummonLedger`] instead and the roster follows on the next sync.

use rand::Rng;
use rand::seq::SliceRandom;
use serde::{Deserialize, Serialize};

use super::player::PlayerStats;
use super::projectile::{ChainLightning, Explosive};
use super::summon::{SummonKind, SummonLedger};
use crate::consts::UPGRADE_CHOICES;

/// Instant-kill threshold cap
const MAX_EXECUTE_THRESHOLD: f32 = 0.3;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Upgrade {
    Damage,
    FireRate,
    MoveSpeed,
    ProjectileSpeed,
    Range,
    QuickReload,
    BiggerMagazine,
    Pierce,
    Bounce,
    Homing,
    Explosive,
    ChainLightning,
    Burn,
    Accuracy,
    Knockback,
    Executioner,
    Magnet,
    ExtraHeart,
    Summon(SummonKind),
    SoulDrain,
    GhostCurse,
    SummonDamage,
}

impl Upgrade {
    /// Every upgrade in presentation order
    pub fn catalog() -> Vec<Upgrade> {
        let mut all = vec![
            Upgrade::Damage,
            Upgrade::FireRate,
            Upgrade::MoveSpeed,
            Upgrade::ProjectileSpeed,
            Upgrade::Range,
            Upgrade::QuickReload,
            Upgrade::BiggerMagazine,
            Upgrade::Pierce,
            Upgrade::Bounce,
            Upgrade::Homing,
            Upgrade::Explosive,
            Upgrade::ChainLightning,
            Upgrade::Burn,
            Upgrade::Accuracy,
            Upgrade::Knockback,
            Upgrade::Executioner,
            Upgrade::Magnet,
            Upgrade::ExtraHeart,
        ];
        all.extend(SummonKind::ALL.into_iter().map(Upgrade::Summon));
        all.extend([Upgrade::SoulDrain, Upgrade::GhostCurse, Upgrade::SummonDamage]);
        all
    }

    pub fn name(self) -> &'static str {
        match self {
            Upgrade::Damage => "Damage Up",
            Upgrade::FireRate => "Rapid Fire",
            Upgrade::MoveSpeed => "Swift Feet",
            Upgrade::ProjectileSpeed => "Velocity",
            Upgrade::Range => "Long Shot",
            Upgrade::QuickReload => "Quick Reload",
            Upgrade::BiggerMagazine => "Bigger Magazine",
            Upgrade::Pierce => "Piercing Rounds",
            Upgrade::Bounce => "Ricochet",
            Upgrade::Homing => "Homing Rounds",
            Upgrade::Explosive => "Explosive Rounds",
            Upgrade::ChainLightning => "Chain Lightning",
            Upgrade::Burn => "Incendiary",
            Upgrade::Accuracy => "Steady Aim",
            Upgrade::Knockback => "Heavy Rounds",
            Upgrade::Executioner => "Executioner",
            Upgrade::Magnet => "Magnet",
            Upgrade::ExtraHeart => "Extra Heart",
            Upgrade::Summon(SummonKind::Scythe) => "Scythe",
            Upgrade::Summon(SummonKind::Spear) => "Spear",
            Upgrade::Summon(SummonKind::ElectricBug) => "Electric Bug",
            Upgrade::Summon(SummonKind::Ghost) => "Ghost",
            Upgrade::Summon(SummonKind::Dagger) => "Dagger",
            Upgrade::SoulDrain => "Soul Drain",
            Upgrade::GhostCurse => "Ghost Curse",
            Upgrade::SummonDamage => "Pack Leader",
        }
    }

    /// Whether offering this upgrade would still change anything
    pub fn is_available(self, stats: &PlayerStats, ledger: &SummonLedger) -> bool {
        match self {
            Upgrade::Homing => !stats.homing,
            Upgrade::Accuracy => stats.accuracy < 1.0,
            Upgrade::Executioner => stats.instant_kill_threshold < MAX_EXECUTE_THRESHOLD,
            Upgrade::SoulDrain => !ledger.soul_drain,
            Upgrade::GhostCurse => ledger.granted(SummonKind::Ghost) > 0,
            _ => true,
        }
    }

    pub fn apply(self, stats: &mut PlayerStats, ledger: &mut SummonLedger) {
        match self {
            Upgrade::Damage => stats.base_damage *= 1.2,
            Upgrade::FireRate => stats.fire_rate *= 1.15,
            Upgrade::MoveSpeed => stats.speed *= 1.1,
            Upgrade::ProjectileSpeed => stats.projectile_speed *= 1.15,
            Upgrade::Range => stats.projectile_range *= 1.2,
            Upgrade::QuickReload => stats.reload_time *= 0.85,
            Upgrade::BiggerMagazine => stats.ammo_capacity += 4,
            Upgrade::Pierce => stats.pierce += 1,
            Upgrade::Bounce => stats.bounce += 1,
            Upgrade::Homing => stats.homing = true,
            Upgrade::Explosive => {
                stats.explosive = Some(match stats.explosive {
                    Some(e) => Explosive {
                        radius: e.radius * 1.2,
                        damage: e.damage * 1.2,
                    },
                    None => Explosive {
                        radius: 2.5,
                        damage: stats.base_damage * 0.8,
                    },
                });
            }
            Upgrade::ChainLightning => {
                stats.chain_lightning = Some(match stats.chain_lightning {
                    Some(c) => ChainLightning {
                        chains: c.chains + 1,
                        range: c.range,
                    },
                    None => ChainLightning { chains: 2, range: 6.0 },
                });
            }
            Upgrade::Burn => stats.burn_damage += 1.5,
            Upgrade::Accuracy => stats.accuracy = (stats.accuracy + 0.1).min(1.0),
            Upgrade::Knockback => stats.knockback_multiplier *= 1.25,
            Upgrade::Executioner => {
                stats.instant_kill_threshold = (stats.instant_kill_threshold + 0.05).min(MAX_EXECUTE_THRESHOLD);
            }
            Upgrade::Magnet => stats.magnet_radius *= 1.3,
            Upgrade::ExtraHeart => {
                stats.max_hearts += 1;
                stats.hearts = (stats.hearts + 1).min(stats.max_hearts);
            }
            Upgrade::Summon(kind) => ledger.grant(kind, 1),
            Upgrade::SoulDrain => ledger.soul_drain = true,
            Upgrade::GhostCurse => {
                if ledger.ghost_curse {
                    ledger.curse_bonus += 0.5;
                } else {
                    ledger.ghost_curse = true;
                }
            }
            Upgrade::SummonDamage => ledger.damage_multiplier *= 1.2,
        }
    }
}

/// Draw distinct choices: shuffle the available catalog and take the first few
pub fn roll_choices(stats: &PlayerStats, ledger: &SummonLedger, rng: &mut impl Rng) -> Vec<Upgrade> {
    let mut pool: Vec<Upgrade> = Upgrade::catalog()
        .into_iter()
        .filter(|u| u.is_available(stats, ledger))
        .collect();
    pool.shuffle(rng);
    pool.truncate(UPGRADE_CHOICES);
    pool
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand_pcg::Pcg32;
    use std::collections::HashSet;

    #[test]
    fn test_choices_are_distinct() {
        let stats = PlayerStats::default();
        let ledger = SummonLedger::default();
        let mut rng = Pcg32::seed_from_u64(1);
        for _ in 0..50 {
            let choices = roll_choices(&stats, &ledger, &mut rng);
            assert_eq!(choices.len(), UPGRADE_CHOICES);
            let unique: HashSet<_> = choices.iter().map(|u| u.name()).collect();
            assert_eq!(unique.len(), UPGRADE_CHOICES);
        }
    }

    #[test]
    fn test_unavailable_upgrades_not_offered() {
        let stats = PlayerStats {
            homing: true,
            ..Default::default()
        };
        let ledger = SummonLedger::default();
        let mut rng = Pcg32::seed_from_u64(2);
        for _ in 0..200 {
            let choices = roll_choices(&stats, &ledger, &mut rng);
            assert!(!choices.contains(&Upgrade::Homing));
            // No ghost yet, so no ghost curse
            assert!(!choices.contains(&Upgrade::GhostCurse));
        }
    }

    #[test]
    fn test_rates_multiply_caps_add() {
        let mut stats = PlayerStats::default();
        let mut ledger = SummonLedger::default();
        let fire_rate = stats.fire_rate;
        let ammo = stats.ammo_capacity;

        Upgrade::FireRate.apply(&mut stats, &mut ledger);
        Upgrade::FireRate.apply(&mut stats, &mut ledger);
        assert!((stats.fire_rate - fire_rate * 1.15 * 1.15).abs() < 1e-4);

        Upgrade::BiggerMagazine.apply(&mut stats, &mut ledger);
        assert_eq!(stats.ammo_capacity, ammo + 4);
    }

    #[test]
    fn test_chain_and_explosive_stack() {
        let mut stats = PlayerStats::default();
        let mut ledger = SummonLedger::default();
        Upgrade::ChainLightning.apply(&mut stats, &mut ledger);
        Upgrade::ChainLightning.apply(&mut stats, &mut ledger);
        assert_eq!(stats.chain_lightning.map(|c| c.chains), Some(3));

        Upgrade::Explosive.apply(&mut stats, &mut ledger);
        let first = stats.explosive.unwrap();
        Upgrade::Explosive.apply(&mut stats, &mut ledger);
        assert!(stats.explosive.unwrap().radius > first.radius);
    }

    #[test]
    fn test_summon_upgrades_write_ledger() {
        let mut stats = PlayerStats::default();
        let mut ledger = SummonLedger::default();
        Upgrade::Summon(SummonKind::Ghost).apply(&mut stats, &mut ledger);
        Upgrade::Summon(SummonKind::Ghost).apply(&mut stats, &mut ledger);
        assert_eq!(ledger.granted(SummonKind::Ghost), 2);

        Upgrade::GhostCurse.apply(&mut stats, &mut ledger);
        assert!(ledger.ghost_curse);
        Upgrade::GhostCurse.apply(&mut stats, &mut ledger);
        assert_eq!(ledger.curse_bonus, 1.5);
    }

    #[test]
    fn test_executioner_capped() {
        let mut stats = PlayerStats::default();
        let mut ledger = SummonLedger::default();
        for _ in 0..20 {
            Upgrade::Executioner.apply(&mut stats, &mut ledger);
        }
        assert!((stats.instant_kill_threshold - MAX_EXECUTE_THRESHOLD).abs() < 1e-6);
        assert!(!Upgrade::Executioner.is_available(&stats, &ledger));
    }
}
