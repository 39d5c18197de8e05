// Use-case level events flowing from game workflows to the broadcaster.

use crate::domain::entities::{ChatMessage, Monster, Player, Position};
use crate::use_cases::combat::AbilityResult;

/// Which connections should receive a broadcast event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Audience {
    All,
    /// Everyone except the connection that caused the event.
    ExceptConn(u64),
}

impl Audience {
    pub fn includes(&self, conn_id: u64) -> bool {
        match self {
            Audience::All => true,
            Audience::ExceptConn(excluded) => *excluded != conn_id,
        }
    }
}

/// State-change events produced by message handlers, admin handlers and the
/// world simulator. The adapter layer serializes each event once and fans
/// the shared bytes out to every connection in the audience.
#[derive(Debug, Clone)]
pub enum WorldEvent {
    Chat {
        message: ChatMessage,
        username: String,
    },
    PlayerMoved {
        player_id: String,
        position: Position,
        rotation: f64,
    },
    CombatAction {
        result: AbilityResult,
    },
    PlayerRebirth {
        player: Player,
    },
    MonsterSpawned {
        monster: Monster,
    },
}

#[derive(Debug, Clone)]
pub struct BroadcastEvent {
    pub audience: Audience,
    pub event: WorldEvent,
}
