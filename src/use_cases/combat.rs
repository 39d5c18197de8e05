// Ability resolution: validation pipeline, damage application, kill
// handling and loot drops.

use std::sync::Arc;

use rand::Rng;
use tracing::{info, warn};

use crate::domain::abilities::{normalize_name, AbilityCatalog};
use crate::domain::entities::{LootItem, Monster, Position, WorldLoot};
use crate::domain::ports::{Clock, MonsterUpdate, PlayerUpdate, Repository};
use crate::domain::progression::{apply_experience, experience_for_kill};
use crate::domain::tuning::{CombatTuning, LootTuning, DEFAULT_ZONE};
use crate::domain::GameError;
use crate::use_cases::cooldowns::CooldownTracker;

/// Outcome of a single ability use. Game-rule failures are carried here
/// with `success = false`; only storage faults surface as errors.
#[derive(Debug, Clone, PartialEq)]
pub struct AbilityResult {
    pub success: bool,
    /// Damage dealt to a monster, present only when one was hit.
    pub damage: Option<i64>,
    pub ability_used: String,
    pub player_id: String,
    pub target_id: Option<String>,
    pub message: String,
    pub aura_cost: i64,
}

impl AbilityResult {
    fn failure(player_id: &str, ability: &str, aura_cost: i64, message: String) -> Self {
        Self {
            success: false,
            damage: None,
            ability_used: normalize_name(ability),
            player_id: player_id.to_string(),
            target_id: None,
            message,
            aura_cost,
        }
    }
}

/// Ability-use workflow with injected dependencies.
pub struct UseAbilityUseCase<C> {
    pub clock: C,
    pub repo: Arc<dyn Repository>,
    pub catalog: Arc<AbilityCatalog>,
    pub cooldowns: Arc<CooldownTracker>,
    pub combat_tuning: CombatTuning,
    pub loot_tuning: LootTuning,
}

impl<C> UseAbilityUseCase<C>
where
    C: Clock,
{
    pub async fn execute(
        &self,
        player_id: &str,
        ability_name: &str,
        target_id: Option<&str>,
    ) -> Result<AbilityResult, GameError> {
        let mut player = match self
            .repo
            .get_player(player_id)
            .await
            .map_err(|_| GameError::StorageFailure)?
        {
            Some(player) => player,
            None => {
                return Ok(AbilityResult::failure(
                    player_id,
                    ability_name,
                    0,
                    "player not found".to_string(),
                ));
            }
        };

        let Some(ability) = self.catalog.resolve(ability_name) else {
            return Ok(AbilityResult::failure(
                player_id,
                ability_name,
                0,
                format!("unknown ability: {ability_name}"),
            ));
        };

        if player.level < ability.required_level {
            return Ok(AbilityResult::failure(
                player_id,
                ability_name,
                ability.aura_cost,
                format!("requires level {}", ability.required_level),
            ));
        }

        if player.aura < ability.aura_cost {
            return Ok(AbilityResult::failure(
                player_id,
                ability_name,
                ability.aura_cost,
                format!("not enough aura ({}/{})", player.aura, ability.aura_cost),
            ));
        }

        // Check-then-arm is one critical section; a second cast of the same
        // pair cannot slip in between.
        let now_ms = self.clock.now_millis();
        if let Err(remaining) = self.cooldowns.try_consume(
            player_id,
            ability_name,
            ability.cooldown_ms,
            now_ms,
        ) {
            return Ok(AbilityResult::failure(
                player_id,
                ability_name,
                ability.aura_cost,
                format!("on cooldown ({remaining}ms remaining)"),
            ));
        }

        // Server-side damage is the sole source of truth; the wire carries
        // no client-asserted multipliers.
        let damage = ability.damage
            + player.hidden_stats.strength / self.combat_tuning.strength_damage_divisor;

        player.aura -= ability.aura_cost;
        self.repo
            .update_player(
                player_id,
                PlayerUpdate {
                    aura: Some(player.aura),
                    ..PlayerUpdate::default()
                },
            )
            .await
            .map_err(|_| GameError::StorageFailure)?;

        let mut result = AbilityResult {
            success: true,
            damage: None,
            ability_used: normalize_name(ability_name),
            player_id: player_id.to_string(),
            target_id: target_id.map(str::to_string),
            message: format!("{} used", ability.name),
            aura_cost: ability.aura_cost,
        };

        let Some(target_id) = target_id else {
            return Ok(result);
        };

        let target = self
            .repo
            .get_monster(target_id)
            .await
            .map_err(|_| GameError::StorageFailure)?
            .filter(|monster| monster.alive && monster.zone == DEFAULT_ZONE)
            .filter(|monster| {
                player.position.distance_to(&monster.position) <= ability.range
            });

        let Some(monster) = target else {
            result.message = format!("{} found no target in range", ability.name);
            return Ok(result);
        };

        let new_health = (monster.health - damage).max(0);
        result.damage = Some(damage);
        self.repo
            .update_monster(
                &monster.id,
                MonsterUpdate {
                    health: Some(new_health),
                    ..MonsterUpdate::default()
                },
            )
            .await
            .map_err(|_| GameError::StorageFailure)?;

        if new_health > 0 {
            result.message = format!("hit {} for {} damage", monster.name, damage);
            return Ok(result);
        }

        // Kill: soft delete, award experience, roll drops.
        self.repo
            .update_monster(
                &monster.id,
                MonsterUpdate {
                    alive: Some(false),
                    ..MonsterUpdate::default()
                },
            )
            .await
            .map_err(|_| GameError::StorageFailure)?;

        let gained = experience_for_kill(monster.level, player.rebirth_cycle);
        let leveled = apply_experience(&mut player, gained);
        let update = if leveled {
            PlayerUpdate {
                experience: Some(player.experience),
                level: Some(player.level),
                max_health: Some(player.max_health),
                max_aura: Some(player.max_aura),
                health: Some(player.health),
                aura: Some(player.aura),
                ..PlayerUpdate::default()
            }
        } else {
            PlayerUpdate {
                experience: Some(player.experience),
                ..PlayerUpdate::default()
            }
        };
        self.repo
            .update_player(player_id, update)
            .await
            .map_err(|_| GameError::StorageFailure)?;

        info!(
            player_id,
            monster_id = %monster.id,
            monster_level = monster.level,
            gained,
            leveled,
            "monster defeated"
        );

        // Drops are best effort; a storage hiccup here must not fail the
        // ability that already landed.
        if let Err(e) = self.spawn_monster_drops(&monster, player_id, now_ms).await {
            warn!(error = %e, monster_id = %monster.id, "loot drop failed");
        }

        result.message = format!("{} defeated", monster.name);
        Ok(result)
    }

    async fn spawn_monster_drops(
        &self,
        monster: &Monster,
        killer_id: &str,
        now_ms: u64,
    ) -> Result<(), String> {
        let items = self.repo.get_all_loot_items().await?;
        let bone = items.iter().find(|item| item.name.eq_ignore_ascii_case("bone"));
        let meat = items.iter().find(|item| item.name.eq_ignore_ascii_case("meat"));
        let (Some(bone), Some(meat)) = (bone, meat) else {
            warn!(monster_id = %monster.id, "bone/meat missing from loot catalog; skipping drops");
            return Ok(());
        };

        let drops = {
            let mut rng = rand::rng();
            roll_loot_drops(monster, killer_id, bone, meat, now_ms, &self.loot_tuning, &mut rng)
        };

        for drop in drops {
            self.repo.create_world_loot(drop).await?;
        }
        Ok(())
    }
}

/// Roll the drop table for a killed monster. Each dropped stack becomes its
/// own world-loot instance scattered around the death position on X/Z.
pub fn roll_loot_drops(
    monster: &Monster,
    killer_id: &str,
    bone: &LootItem,
    meat: &LootItem,
    now_ms: u64,
    tuning: &LootTuning,
    rng: &mut impl Rng,
) -> Vec<WorldLoot> {
    let chance = (tuning.base_drop_chance + monster.level as f64 * tuning.per_level_bonus)
        .min(tuning.max_drop_chance);

    let mut drops = Vec::new();
    if rng.random::<f64>() < chance {
        let stacks = rng.random_range(1..=3);
        for _ in 0..stacks {
            drops.push(spawn_stack(monster, killer_id, &bone.id, now_ms, tuning, rng));
        }
    }
    if rng.random::<f64>() < chance * tuning.meat_chance_scale {
        let stacks = rng.random_range(1..=2);
        for _ in 0..stacks {
            drops.push(spawn_stack(monster, killer_id, &meat.id, now_ms, tuning, rng));
        }
    }
    drops
}

fn spawn_stack(
    monster: &Monster,
    killer_id: &str,
    item_id: &str,
    now_ms: u64,
    tuning: &LootTuning,
    rng: &mut impl Rng,
) -> WorldLoot {
    let position = Position::new(
        monster.position.x + rng.random_range(-tuning.scatter..=tuning.scatter),
        monster.position.y,
        monster.position.z + rng.random_range(-tuning.scatter..=tuning.scatter),
    );

    WorldLoot {
        id: uuid::Uuid::new_v4().to_string(),
        item_id: item_id.to_string(),
        quantity: 1,
        position,
        zone: monster.zone.clone(),
        dropped_by: killer_id.to_string(),
        spawned_at_ms: now_ms,
        expires_at_ms: now_ms + tuning.ttl_ms,
    }
}
