//! Experience and levels

use rand::Rng;
use serde::{Deserialize, Serialize};

use super::player::PlayerStats;
use super::summon::SummonLedger;
use super::upgrades::{Upgrade, roll_choices};

/// XP needed to finish `level`: `floor(10 + 15·level + 5·level^1.5)`
pub fn xp_threshold(level: u32) -> u32 {
    let l = f64::from(level);
    (10.0 + 15.0 * l + 5.0 * l.powf(1.5)).floor() as u32
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Progression {
    pub level: u32,
    pub xp: u32,
    /// Pending upgrade offer. Non-empty means the simulation is frozen.
    pub choices: Vec<Upgrade>,
}

impl Default for Progression {
    fn default() -> Self {
        Self::new()
    }
}

impl Progression {
    pub fn new() -> Self {
        Self {
            level: 1,
            xp: 0,
            choices: Vec::new(),
        }
    }

    pub fn threshold(&self) -> u32 {
        xp_threshold(self.level)
    }

    pub fn is_choosing(&self) -> bool {
        !self.choices.is_empty()
    }

    /// Credit XP. Reaching the threshold levels up right away: XP resets to
    /// zero (the overflow is dropped) and a fresh set of choices is rolled.
    /// While an offer is pending XP still banks, but only up to the current
    /// threshold; the rest is dropped.
    ///
    /// Returns the new level on a level-up.
    pub fn add_xp(
        &mut self,
        amount: u32,
        stats: &PlayerStats,
        ledger: &SummonLedger,
        rng: &mut impl Rng,
    ) -> Option<u32> {
        if amount == 0 {
            return None;
        }
        let total = self.xp.saturating_add(amount);
        if self.is_choosing() {
            self.xp = total.min(self.threshold());
            return None;
        }
        if total < self.threshold() {
            self.xp = total;
            return None;
        }

        self.level += 1;
        self.xp = 0;
        self.choices = roll_choices(stats, ledger, rng);
        log::info!(
            "Level up: {} (next at {} xp), offering {:?}",
            self.level,
            self.threshold(),
            self.choices.iter().map(|u| u.name()).collect::<Vec<_>>()
        );
        Some(self.level)
    }

    /// Apply the chosen upgrade and clear the offer
    ///
    /// An index outside the offer leaves everything untouched.
    pub fn select(&mut self, index: usize, stats: &mut PlayerStats, ledger: &mut SummonLedger) -> Option<Upgrade> {
        let upgrade = *self.choices.get(index)?;
        upgrade.apply(stats, ledger);
        self.choices.clear();
        log::info!("Upgrade chosen: {}", upgrade.name());
        Some(upgrade)
    }
}
