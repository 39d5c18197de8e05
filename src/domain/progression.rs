// Experience, level and rebirth math shared by the combat resolver and the
// storage adapters.

use crate::domain::entities::Player;

pub const MAX_LEVEL: i64 = 100;
pub const XP_PER_LEVEL: i64 = 100;
pub const BASE_MAX_HEALTH: i64 = 1_000;
pub const BASE_MAX_AURA: i64 = 500;

/// Level implied by a total experience value, capped at [`MAX_LEVEL`].
pub fn level_for_experience(experience: i64) -> i64 {
    (experience / XP_PER_LEVEL + 1).min(MAX_LEVEL)
}

/// Maximum health after a level-up to `level`.
pub fn max_health_for_level(level: i64) -> i64 {
    1_000 + level * 50
}

/// Maximum aura after a level-up to `level`.
pub fn max_aura_for_level(level: i64) -> i64 {
    500 + level * 25
}

/// Experience granted for killing a monster, scaled by the killer's
/// rebirth cycle.
pub fn experience_for_kill(monster_level: i64, rebirth_cycle: i64) -> i64 {
    ((monster_level * 10) as f64 * (1.0 + rebirth_cycle as f64 * 0.1)).floor() as i64
}

/// Hidden-stat gain applied on rebirth, per stat.
pub fn rebirth_stat_gain(old_level: i64) -> i64 {
    old_level * 10
}

/// Add experience and cascade a level-up when the new total crosses a
/// level boundary. A level-up recomputes both maxima and fully restores
/// health and aura. Returns true when the level increased.
pub fn apply_experience(player: &mut Player, gained: i64) -> bool {
    player.experience += gained;
    let new_level = level_for_experience(player.experience);
    if new_level <= player.level {
        return false;
    }

    player.level = new_level;
    player.max_health = max_health_for_level(new_level);
    player.max_aura = max_aura_for_level(new_level);
    player.health = player.max_health;
    player.aura = player.max_aura;
    true
}

/// Reset a player for a new rebirth cycle. Level, experience and resource
/// pools return to their base values; each hidden stat grows by
/// [`rebirth_stat_gain`] of the pre-reset level.
pub fn apply_rebirth(player: &mut Player) {
    let gain = rebirth_stat_gain(player.level);

    player.level = 1;
    player.experience = 0;
    player.rebirth_cycle += 1;
    player.max_health = BASE_MAX_HEALTH;
    player.max_aura = BASE_MAX_AURA;
    player.health = player.max_health;
    player.aura = player.max_aura;

    player.hidden_stats.strength += gain;
    player.hidden_stats.agility += gain;
    player.hidden_stats.intelligence += gain;
    player.hidden_stats.endurance += gain;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::entities::{HiddenStats, Position};

    fn player_at(level: i64, experience: i64) -> Player {
        Player {
            id: "player-1".to_string(),
            username: "digger".to_string(),
            password: "secret".to_string(),
            level,
            experience,
            rebirth_cycle: 0,
            health: 500,
            max_health: max_health_for_level(level),
            aura: 200,
            max_aura: max_aura_for_level(level),
            hidden_stats: HiddenStats::default(),
            position: Position::default(),
            rotation: 0.0,
            zone: "overworld".to_string(),
            zone_locked: false,
            online: true,
        }
    }

    #[test]
    fn when_experience_crosses_a_boundary_then_level_up_restores_both_pools() {
        let mut player = player_at(1, 80);

        let leveled = apply_experience(&mut player, 40);

        assert!(leveled);
        assert_eq!(player.level, 2);
        assert_eq!(player.max_health, 1_100);
        assert_eq!(player.max_aura, 550);
        assert_eq!(player.health, 1_100);
        assert_eq!(player.aura, 550);
    }

    #[test]
    fn when_experience_stays_below_the_boundary_then_pools_are_untouched() {
        let mut player = player_at(1, 10);

        let leveled = apply_experience(&mut player, 50);

        assert!(!leveled);
        assert_eq!(player.level, 1);
        assert_eq!(player.health, 500);
        assert_eq!(player.aura, 200);
    }

    #[test]
    fn when_experience_passes_the_cap_then_level_stays_at_one_hundred() {
        let mut player = player_at(99, 9_850);

        apply_experience(&mut player, 500_000);

        assert_eq!(player.level, MAX_LEVEL);
        assert_eq!(player.max_health, 6_000);
        assert_eq!(player.max_aura, 3_000);
    }

    #[test]
    fn when_kill_experience_is_scaled_by_rebirth_then_result_is_floored() {
        assert_eq!(experience_for_kill(25, 0), 250);
        assert_eq!(experience_for_kill(25, 1), 275);
        assert_eq!(experience_for_kill(33, 3), 429);
    }

    #[test]
    fn when_rebirth_is_applied_then_stats_reset_and_hidden_stats_grow() {
        let mut player = player_at(100, 9_940);
        player.rebirth_cycle = 2;
        player.hidden_stats.strength = 70;

        apply_rebirth(&mut player);

        assert_eq!(player.level, 1);
        assert_eq!(player.experience, 0);
        assert_eq!(player.rebirth_cycle, 3);
        assert_eq!(player.health, BASE_MAX_HEALTH);
        assert_eq!(player.max_health, BASE_MAX_HEALTH);
        assert_eq!(player.aura, BASE_MAX_AURA);
        assert_eq!(player.max_aura, BASE_MAX_AURA);
        assert_eq!(player.hidden_stats.strength, 1_070);
        assert_eq!(player.hidden_stats.agility, 1_000);
        assert_eq!(player.hidden_stats.intelligence, 1_000);
        assert_eq!(player.hidden_stats.endurance, 1_000);
    }
}
