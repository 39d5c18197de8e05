use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};

use tokio::sync::broadcast;

use crate::domain::abilities::AbilityCatalog;
use crate::domain::ports::{Clock, Repository};
use crate::domain::tuning::{CombatTuning, LootTuning};
use crate::interface_adapters::net::OutboundFrame;
use crate::use_cases::cooldowns::CooldownTracker;
use crate::use_cases::types::BroadcastEvent;

/// Shared application state. One authoritative world per process; the
/// repository is injected at startup so tests can substitute a fake.
#[derive(Clone)]
pub struct AppState {
    pub repo: Arc<dyn Repository>,
    pub catalog: Arc<AbilityCatalog>,
    pub cooldowns: Arc<CooldownTracker>,
    // Domain events flowing from handlers and the simulator into the
    // broadcaster.
    pub events_tx: broadcast::Sender<BroadcastEvent>,
    // Serialized frames shared across all connections.
    pub frames_tx: broadcast::Sender<OutboundFrame>,
    pub combat_tuning: CombatTuning,
    pub loot_tuning: LootTuning,
}

/// System clock adapter used outside of tests.
#[derive(Clone)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now_millis(&self) -> u64 {
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap_or_default()
            .as_millis() as u64
    }
}
