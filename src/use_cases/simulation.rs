// Background world simulation: monster spawning, player regeneration and
// the expired-loot sweep. Each process runs on its own timer and survives
// transient storage failures by logging and waiting for the next tick.

use std::sync::Arc;

use rand::Rng;
use tokio::sync::broadcast;
use tracing::{debug, info, warn};

use crate::domain::entities::{Monster, Position};
use crate::domain::ports::{Clock, PlayerUpdate, Repository};
use crate::domain::tuning::{LootTuning, RegenTuning, SpawnTuning, DEFAULT_ZONE};
use crate::use_cases::types::{Audience, BroadcastEvent, WorldEvent};

const MONSTER_NAMES: &[&str] = &[
    "Stone Golem",
    "Mud Crawler",
    "Cliff Stalker",
    "Granite Wolf",
    "Dust Wraith",
];

/// The autonomous world driver. One instance per process, injected with the
/// same repository and event bus the message handlers use.
pub struct WorldSimulator<C> {
    pub repo: Arc<dyn Repository>,
    pub clock: C,
    pub events_tx: broadcast::Sender<BroadcastEvent>,
    pub spawn_tuning: SpawnTuning,
    pub regen_tuning: RegenTuning,
    pub loot_tuning: LootTuning,
}

impl<C> WorldSimulator<C>
where
    C: Clock + 'static,
{
    /// Spawn the three periodic tasks. They run for the life of the
    /// process; a failed tick never stops the schedule.
    pub fn spawn_tasks(self: &Arc<Self>) {
        let sim = Arc::clone(self);
        tokio::spawn(async move {
            let mut interval = tokio::time::interval(sim.spawn_tuning.interval);
            loop {
                interval.tick().await;
                if let Err(e) = sim.spawner_tick().await {
                    warn!(error = %e, "monster spawn tick failed");
                }
            }
        });

        let sim = Arc::clone(self);
        tokio::spawn(async move {
            let mut interval = tokio::time::interval(sim.regen_tuning.interval);
            loop {
                interval.tick().await;
                if let Err(e) = sim.regen_tick().await {
                    warn!(error = %e, "regeneration tick failed");
                }
            }
        });

        let sim = Arc::clone(self);
        tokio::spawn(async move {
            let mut interval = tokio::time::interval(sim.loot_tuning.sweep_interval);
            loop {
                interval.tick().await;
                if let Err(e) = sim.loot_sweep_tick().await {
                    warn!(error = %e, "loot sweep tick failed");
                }
            }
        });
    }

    /// Spawn at most one monster, scaled to the online population.
    /// Returns the new monster, or `None` when the zone is empty of
    /// players or already at its cap.
    pub async fn spawner_tick(&self) -> Result<Option<Monster>, String> {
        let online = self.repo.get_online_players().await?;
        if online.is_empty() {
            return Ok(None);
        }

        let avg_rebirth =
            online.iter().map(|p| p.rebirth_cycle).sum::<i64>() as f64 / online.len() as f64;
        let multiplier = 1.0 + avg_rebirth * 0.5;

        let live = self.repo.get_monsters_in_zone(DEFAULT_ZONE).await?;
        let cap = self
            .spawn_tuning
            .zone_cap
            .min(online.len() * self.spawn_tuning.per_player_cap);
        if live.len() >= cap {
            return Ok(None);
        }

        let rolled = {
            let mut rng = rand::rng();
            roll_monster_spawn(&self.spawn_tuning, multiplier, &mut rng)
        };
        let monster = self.repo.create_monster(rolled).await?;

        info!(
            monster_id = %monster.id,
            name = %monster.name,
            level = monster.level,
            difficulty = multiplier,
            live = live.len() + 1,
            cap,
            "monster spawned"
        );
        let _ = self.events_tx.send(BroadcastEvent {
            audience: Audience::All,
            event: WorldEvent::MonsterSpawned {
                monster: monster.clone(),
            },
        });
        Ok(Some(monster))
    }

    /// Restore a slice of health and aura to every online player.
    /// Returns how many players actually changed (full players are
    /// skipped to avoid redundant writes).
    pub async fn regen_tick(&self) -> Result<u64, String> {
        let online = self.repo.get_online_players().await?;
        let mut updated = 0;

        for player in online {
            let health = (player.health
                + player.max_health * self.regen_tuning.health_percent / 100)
                .min(player.max_health);
            let aura = (player.aura + player.max_aura * self.regen_tuning.aura_percent / 100)
                .min(player.max_aura);

            if health == player.health && aura == player.aura {
                continue;
            }

            self.repo
                .update_player(
                    &player.id,
                    PlayerUpdate {
                        health: Some(health),
                        aura: Some(aura),
                        ..PlayerUpdate::default()
                    },
                )
                .await?;
            updated += 1;
        }

        if updated > 0 {
            debug!(updated, "regeneration applied");
        }
        Ok(updated)
    }

    /// Purge every loot instance whose TTL has passed.
    pub async fn loot_sweep_tick(&self) -> Result<u64, String> {
        let purged = self
            .repo
            .cleanup_expired_loot(self.clock.now_millis())
            .await?;
        if purged > 0 {
            debug!(purged, "expired loot purged");
        }
        Ok(purged)
    }
}

/// Roll level, health and position for a fresh monster.
pub fn roll_monster_spawn(
    tuning: &SpawnTuning,
    multiplier: f64,
    rng: &mut impl Rng,
) -> Monster {
    let level = rng.random_range(tuning.min_level..=tuning.max_level);
    let health = ((level * 100) as f64 * multiplier).floor() as i64;
    let name = MONSTER_NAMES[rng.random_range(0..MONSTER_NAMES.len())];

    Monster {
        id: uuid::Uuid::new_v4().to_string(),
        name: name.to_string(),
        level,
        health,
        max_health: health,
        position: Position::new(
            rng.random_range(-tuning.spawn_extent..=tuning.spawn_extent),
            0.0,
            rng.random_range(-tuning.spawn_extent..=tuning.spawn_extent),
        ),
        zone: DEFAULT_ZONE.to_string(),
        difficulty: multiplier,
        alive: true,
    }
}
