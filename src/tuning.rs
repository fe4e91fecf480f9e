//! Game balance and run configuration
//!
//! Loaded from JSON by the host (or the headless harness). Everything the
//! simulation reads at startup lives here; constants that are not meant to
//! be tuned per run stay in [`crate::consts`].

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::consts::{MAX_FRAME_DT, WORLD_HALF_EXTENT};
use crate::sim::enemy::{SpawnSchedule, SpawnTier};
use crate::sim::player::PlayerStats;
use crate::sim::state::WorldBounds;
use crate::sim::summon::SummonKind;

/// Difficulty preset levels
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum Difficulty {
    Easy,
    #[default]
    Normal,
    Hard,
}

impl Difficulty {
    pub fn as_str(&self) -> &'static str {
        match self {
            Difficulty::Easy => "Easy",
            Difficulty::Normal => "Normal",
            Difficulty::Hard => "Hard",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "easy" => Some(Difficulty::Easy),
            "normal" | "norm" => Some(Difficulty::Normal),
            "hard" => Some(Difficulty::Hard),
            _ => None,
        }
    }

    /// Enemy health multiplier
    pub fn health_multiplier(&self) -> f32 {
        match self {
            Difficulty::Easy => 0.75,
            Difficulty::Normal => 1.0,
            Difficulty::Hard => 1.5,
        }
    }

    /// Spawn batch size multiplier
    pub fn spawn_multiplier(&self) -> f32 {
        match self {
            Difficulty::Easy => 0.75,
            Difficulty::Normal => 1.0,
            Difficulty::Hard => 1.5,
        }
    }
}

#[derive(Debug, Error)]
pub enum TuningError {
    #[error("invalid tuning JSON: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("spawn tier {index} is invalid: {reason}")]
    SpawnTier { index: usize, reason: &'static str },
    #[error("world bounds must be positive and finite (got {half_x} x {half_z})")]
    Bounds { half_x: f32, half_z: f32 },
    #[error("max frame delta must be positive and finite (got {0})")]
    FrameLimit(f32),
}

/// Run configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Tuning {
    /// RNG seed for the run
    pub seed: u64,
    pub difficulty: Difficulty,
    /// Room extents supplied by the layout provider
    pub bounds: WorldBounds,
    pub spawn_schedule: SpawnSchedule,
    /// Seconds into the run at which the boss appears (none = never)
    pub boss_time: Option<f32>,
    /// Starting player stat block
    pub player: PlayerStats,
    /// Summons granted at the start of the run
    pub starting_summons: Vec<SummonKind>,
    /// Frames with a larger delta are skipped
    pub max_frame_dt: f32,
}

impl Default for Tuning {
    fn default() -> Self {
        Self {
            seed: 0,
            difficulty: Difficulty::Normal,
            bounds: WorldBounds::new(WORLD_HALF_EXTENT, WORLD_HALF_EXTENT),
            spawn_schedule: SpawnSchedule::new(vec![
                SpawnTier::new(0.0, 3.0, 2),
                SpawnTier::new(30.0, 2.5, 4),
                SpawnTier::new(60.0, 2.0, 6),
                SpawnTier::new(120.0, 1.5, 9),
            ]),
            boss_time: Some(180.0),
            player: PlayerStats::default(),
            starting_summons: Vec::new(),
            max_frame_dt: MAX_FRAME_DT,
        }
    }
}

impl Tuning {
    /// Defaults with a seed and difficulty applied
    pub fn from_preset(seed: u64, difficulty: Difficulty) -> Self {
        Self {
            seed,
            difficulty,
            ..Self::default()
        }
    }

    /// Parse and validate
    pub fn from_json(json: &str) -> Result<Self, TuningError> {
        let tuning: Tuning = serde_json::from_str(json)?;
        tuning.validate()?;
        Ok(tuning)
    }

    pub fn to_json(&self) -> Result<String, TuningError> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Reject values the simulation cannot run with
    ///
    /// Inert spawn tiers (zero count or zero interval) are allowed and simply
    /// never fire; negative or non-finite numbers are not.
    pub fn validate(&self) -> Result<(), TuningError> {
        let WorldBounds { half_x, half_z } = self.bounds;
        if !(half_x.is_finite() && half_z.is_finite() && half_x > 0.0 && half_z > 0.0) {
            return Err(TuningError::Bounds { half_x, half_z });
        }
        if !(self.max_frame_dt.is_finite() && self.max_frame_dt > 0.0) {
            return Err(TuningError::FrameLimit(self.max_frame_dt));
        }
        for (index, tier) in self.spawn_schedule.tiers().iter().enumerate() {
            if !tier.time.is_finite() || tier.time < 0.0 {
                return Err(TuningError::SpawnTier {
                    index,
                    reason: "start time must be a non-negative number",
                });
            }
            if !tier.interval.is_finite() || tier.interval < 0.0 {
                return Err(TuningError::SpawnTier {
                    index,
                    reason: "interval must be a non-negative number",
                });
            }
        }
        Ok(())
    }

    /// Spawn schedule with batch sizes scaled by difficulty
    pub fn scaled_schedule(&self) -> SpawnSchedule {
        let mult = self.difficulty.spawn_multiplier();
        SpawnSchedule::new(
            self.spawn_schedule
                .tiers()
                .iter()
                .map(|tier| {
                    let count = if tier.count == 0 {
                        0
                    } else {
                        ((tier.count as f32 * mult).round() as u32).max(1)
                    };
                    SpawnTier { count, ..*tier }
                })
                .collect(),
        )
    }
}
