// Domain entities for the shared game world.

/// 3D world position. Y is vertical; ground-level entities sit at y = 0.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Position {
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

impl Position {
    pub fn new(x: f64, y: f64, z: f64) -> Self {
        Self { x, y, z }
    }

    /// Euclidean distance in all three axes.
    pub fn distance_to(&self, other: &Position) -> f64 {
        let dx = self.x - other.x;
        let dy = self.y - other.y;
        let dz = self.z - other.z;
        (dx * dx + dy * dy + dz * dz).sqrt()
    }
}

/// Accumulated stats that persist through rebirth and never decrease.
/// These are not exposed on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct HiddenStats {
    pub strength: i64,
    pub agility: i64,
    pub intelligence: i64,
    pub endurance: i64,
}

/// A registered player. Created at registration, never deleted.
///
/// Invariants: `0 <= health <= max_health`, `0 <= aura <= max_aura`,
/// `1 <= level <= 100`.
#[derive(Debug, Clone, PartialEq)]
pub struct Player {
    pub id: String,
    pub username: String,
    // Credential storage only; never serialized to clients.
    pub password: String,
    pub level: i64,
    pub experience: i64,
    pub rebirth_cycle: i64,
    pub health: i64,
    pub max_health: i64,
    pub aura: i64,
    pub max_aura: i64,
    pub hidden_stats: HiddenStats,
    pub position: Position,
    pub rotation: f64,
    pub zone: String,
    pub zone_locked: bool,
    pub online: bool,
}

/// A spawned monster. Death is a soft delete: `alive = false` removes it
/// from zone queries while keeping the row for history.
#[derive(Debug, Clone, PartialEq)]
pub struct Monster {
    pub id: String,
    pub name: String,
    pub level: i64,
    pub health: i64,
    pub max_health: i64,
    pub position: Position,
    pub zone: String,
    pub difficulty: f64,
    pub alive: bool,
}

/// Item categories in the loot catalog.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ItemKind {
    Consumable,
    Equipment,
    Material,
}

impl ItemKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ItemKind::Consumable => "consumable",
            ItemKind::Equipment => "equipment",
            ItemKind::Material => "material",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "consumable" => Some(ItemKind::Consumable),
            "equipment" => Some(ItemKind::Equipment),
            "material" => Some(ItemKind::Material),
            _ => None,
        }
    }
}

/// Restorative payload applied when a consumable is used.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct ItemEffect {
    pub health: i64,
    pub aura: i64,
}

/// Catalog entry describing an item kind, near-static after seeding.
#[derive(Debug, Clone, PartialEq)]
pub struct LootItem {
    pub id: String,
    pub name: String,
    pub kind: ItemKind,
    pub rarity: String,
    pub effect: Option<ItemEffect>,
    pub stackable: bool,
}

/// A spawned loot instance in the world. Unreachable once expired;
/// destroyed on collection or by the expiry sweep.
#[derive(Debug, Clone, PartialEq)]
pub struct WorldLoot {
    pub id: String,
    pub item_id: String,
    pub quantity: i64,
    pub position: Position,
    pub zone: String,
    pub dropped_by: String,
    pub spawned_at_ms: u64,
    pub expires_at_ms: u64,
}

impl WorldLoot {
    pub fn is_expired(&self, now_ms: u64) -> bool {
        now_ms > self.expires_at_ms
    }
}

/// One stack row in a player inventory. Quantity is always positive;
/// a stack reaching zero is deleted, never stored at zero.
#[derive(Debug, Clone, PartialEq)]
pub struct InventoryEntry {
    pub player_id: String,
    pub item_id: String,
    pub quantity: i64,
}

/// Append-only chat log entry.
#[derive(Debug, Clone, PartialEq)]
pub struct ChatMessage {
    pub id: String,
    pub player_id: String,
    pub message: String,
    pub channel: String,
    pub sent_at_ms: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn when_positions_differ_on_every_axis_then_distance_is_euclidean() {
        let a = Position::new(1.0, 2.0, 3.0);
        let b = Position::new(4.0, 6.0, 3.0);
        assert!((a.distance_to(&b) - 5.0).abs() < f64::EPSILON);
    }

    #[test]
    fn when_loot_expiry_has_passed_then_it_reports_expired() {
        let loot = WorldLoot {
            id: "loot-1".to_string(),
            item_id: "bone".to_string(),
            quantity: 1,
            position: Position::default(),
            zone: "overworld".to_string(),
            dropped_by: "player-1".to_string(),
            spawned_at_ms: 1_000,
            expires_at_ms: 2_000,
        };

        assert!(!loot.is_expired(2_000));
        assert!(loot.is_expired(2_001));
    }

    #[test]
    fn when_item_kind_round_trips_through_strings_then_it_is_preserved() {
        for kind in [ItemKind::Consumable, ItemKind::Equipment, ItemKind::Material] {
            assert_eq!(ItemKind::parse(kind.as_str()), Some(kind));
        }
        assert_eq!(ItemKind::parse("weapon"), None);
    }
}
