/// Gameplay tuning for the background world simulation.

use std::time::Duration;

/// The single zone the reference world runs in. Monster, loot and combat
/// lookups all target this zone until multi-zone play lands.
pub const DEFAULT_ZONE: &str = "overworld";

#[derive(Debug, Clone, Copy)]
pub struct SpawnTuning {
    /// Interval between spawner passes.
    pub interval: Duration,

    /// Inclusive monster level range.
    pub min_level: i64,
    pub max_level: i64,

    /// Hard cap on concurrent live monsters in the zone.
    pub zone_cap: usize,

    /// Additional cap of live monsters per online player.
    pub per_player_cap: usize,

    /// Half-extent of the square spawn area around the origin.
    pub spawn_extent: f64,
}

impl Default for SpawnTuning {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(30),
            min_level: 10,
            max_level: 99,
            zone_cap: 20,
            per_player_cap: 3,
            spawn_extent: 100.0,
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct RegenTuning {
    /// Interval between regeneration passes.
    pub interval: Duration,

    /// Health restored per pass, in hundredths of max health.
    pub health_percent: i64,

    /// Aura restored per pass, in hundredths of max aura.
    pub aura_percent: i64,
}

impl Default for RegenTuning {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(5),
            health_percent: 1,
            aura_percent: 2,
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct LootTuning {
    /// Interval between expired-loot sweeps.
    pub sweep_interval: Duration,

    /// Lifetime of a spawned loot instance.
    pub ttl_ms: u64,

    /// Half-extent of the random X/Z scatter around a drop point.
    pub scatter: f64,

    /// Base drop chance before the monster-level bonus.
    pub base_drop_chance: f64,

    /// Drop chance added per monster level.
    pub per_level_bonus: f64,

    /// Ceiling on the computed drop chance.
    pub max_drop_chance: f64,

    /// Meat rolls at this fraction of the bone drop chance.
    pub meat_chance_scale: f64,
}

impl Default for LootTuning {
    fn default() -> Self {
        Self {
            sweep_interval: Duration::from_secs(60),
            ttl_ms: 5 * 60 * 1_000,
            scatter: 5.0,
            base_drop_chance: 0.3,
            per_level_bonus: 0.01,
            max_drop_chance: 0.8,
            meat_chance_scale: 0.6,
        }
    }
}
