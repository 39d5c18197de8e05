// Static ability catalog: loaded once at startup, pure lookup afterwards.

use std::collections::HashMap;

/// Immutable definition of a castable ability.
#[derive(Debug, Clone, PartialEq)]
pub struct AbilityDefinition {
    /// Display name shown to players (e.g. "Stone Bullet").
    pub name: &'static str,
    pub aura_cost: i64,
    pub damage: i64,
    /// Maximum engagement distance in world units.
    pub range: f64,
    pub cooldown_ms: u64,
    pub required_level: i64,
}

/// Lookup table over ability definitions keyed by normalized name.
#[derive(Debug)]
pub struct AbilityCatalog {
    entries: HashMap<String, AbilityDefinition>,
}

/// Wire identifier form: lowercase with spaces replaced by underscores,
/// so "Stone Bullet" and "stone_bullet" resolve to the same entry.
pub fn normalize_name(name: &str) -> String {
    name.trim().to_lowercase().replace(' ', "_")
}

impl AbilityCatalog {
    /// The built-in earth ability set.
    pub fn builtin() -> Self {
        Self::from_definitions(vec![
            AbilityDefinition {
                name: "Stone Bullet",
                aura_cost: 20,
                damage: 50,
                range: 50.0,
                cooldown_ms: 1_000,
                required_level: 1,
            },
            AbilityDefinition {
                name: "Earth Spike",
                aura_cost: 50,
                damage: 120,
                range: 50.0,
                cooldown_ms: 2_500,
                required_level: 20,
            },
            AbilityDefinition {
                name: "Boulder Toss",
                aura_cost: 75,
                damage: 200,
                range: 50.0,
                cooldown_ms: 4_000,
                required_level: 40,
            },
            AbilityDefinition {
                name: "Ground Dig Up",
                aura_cost: 100,
                damage: 300,
                range: 50.0,
                cooldown_ms: 5_000,
                required_level: 60,
            },
        ])
    }

    pub fn from_definitions(definitions: Vec<AbilityDefinition>) -> Self {
        let entries = definitions
            .into_iter()
            .map(|def| (normalize_name(def.name), def))
            .collect();
        Self { entries }
    }

    /// Resolve by display name or wire identifier. Never faults.
    pub fn resolve(&self, name: &str) -> Option<&AbilityDefinition> {
        self.entries.get(&normalize_name(name))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn when_resolving_display_name_and_wire_identifier_then_both_hit_the_same_entry() {
        let catalog = AbilityCatalog::builtin();

        let by_display = catalog.resolve("Stone Bullet").expect("display name resolves");
        let by_wire = catalog.resolve("stone_bullet").expect("wire identifier resolves");
        assert_eq!(by_display, by_wire);
        assert_eq!(by_display.aura_cost, 20);
    }

    #[test]
    fn when_resolving_unknown_name_then_returns_none() {
        let catalog = AbilityCatalog::builtin();
        assert!(catalog.resolve("fireball").is_none());
    }

    #[test]
    fn when_catalog_is_built_then_it_has_the_four_abilities() {
        let catalog = AbilityCatalog::builtin();

        let dig = catalog.resolve("ground_dig_up").expect("ground_dig_up exists");
        assert_eq!(dig.aura_cost, 100);
        assert_eq!(dig.damage, 300);
        assert_eq!(dig.cooldown_ms, 5_000);
        assert_eq!(dig.required_level, 60);

        assert!(catalog.resolve("earth_spike").is_some());
        assert!(catalog.resolve("boulder_toss").is_some());
    }
}
