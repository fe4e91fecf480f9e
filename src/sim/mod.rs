//! Combat simulation module
//!
//! All gameplay logic lives here. The module stays free of rendering and
//! platform concerns:
//! - Seeded RNG only (owned by the [`World`])
//! - Stable iteration order (arena slot order, ties broken by id)
//! - Cross-frame references are generation-checked ids
//! - Side effects for the host are queued as [`SimEvent`]s

pub mod arena;
pub mod collision;
pub mod combat;
pub mod enemy;
pub mod events;
pub mod hit;
pub mod orbs;
pub mod player;
pub mod progression;
pub mod projectile;
pub mod state;
pub mod status;
pub mod summon;
pub mod tick;
pub mod upgrades;

pub use arena::{Arena, Id};
pub use enemy::{BossKind, Enemy, EnemyId, EnemyKind, SpawnSchedule, SpawnTier};
pub use events::{EventLog, HitSource, SimEvent, SoundCue};
pub use hit::{HitOptions, HitOutcome, HitResolver, KillRecord, apply_player_damage};
pub use player::{Player, PlayerStats};
pub use progression::{Progression, xp_threshold};
pub use projectile::{ChainLightning, Explosive, Projectile, ProjectileSpec};
pub use state::{Phase, Snapshot, World, WorldBounds};
pub use summon::{SummonKind, SummonLedger, Summons};
pub use tick::{FrameInput, FrameOutcome, tick};
pub use upgrades::Upgrade;
