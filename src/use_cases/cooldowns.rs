// Ephemeral per-player ability cooldowns. Intentionally not persisted:
// a restart resets every cooldown to ready.

use std::collections::HashMap;
use std::sync::Mutex;

use crate::domain::abilities::normalize_name;

/// Two-level map of player id -> ability key -> absolute expiry millis.
///
/// All operations take the lock for their full duration, so the
/// check-then-arm sequence in [`CooldownTracker::try_consume`] is a single
/// critical section and a player cannot fire the same ability twice inside
/// its own cooldown window. Nothing awaits while holding the lock.
#[derive(Debug, Default)]
pub struct CooldownTracker {
    entries: Mutex<HashMap<String, HashMap<String, u64>>>,
}

impl CooldownTracker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_ready(&self, player_id: &str, ability: &str, now_ms: u64) -> bool {
        self.remaining(player_id, ability, now_ms) == 0
    }

    /// Milliseconds until the ability becomes usable again; 0 when ready.
    /// Unknown pairs are ready (sentinel, never a fault).
    pub fn remaining(&self, player_id: &str, ability: &str, now_ms: u64) -> u64 {
        let entries = self.entries.lock().expect("cooldown map poisoned");
        entries
            .get(player_id)
            .and_then(|abilities| abilities.get(&normalize_name(ability)))
            .map(|expires_at| expires_at.saturating_sub(now_ms))
            .unwrap_or(0)
    }

    /// Set expiry to `now_ms + duration_ms` unconditionally.
    pub fn arm(&self, player_id: &str, ability: &str, duration_ms: u64, now_ms: u64) {
        let mut entries = self.entries.lock().expect("cooldown map poisoned");
        entries
            .entry(player_id.to_string())
            .or_default()
            .insert(normalize_name(ability), now_ms + duration_ms);
    }

    /// Atomic check-then-arm: arms the cooldown and returns `Ok` when the
    /// pair was ready, otherwise returns the remaining millis untouched.
    pub fn try_consume(
        &self,
        player_id: &str,
        ability: &str,
        duration_ms: u64,
        now_ms: u64,
    ) -> Result<(), u64> {
        let mut entries = self.entries.lock().expect("cooldown map poisoned");
        let abilities = entries.entry(player_id.to_string()).or_default();
        let key = normalize_name(ability);

        if let Some(expires_at) = abilities.get(&key) {
            let remaining = expires_at.saturating_sub(now_ms);
            if remaining > 0 {
                return Err(remaining);
            }
        }

        abilities.insert(key, now_ms + duration_ms);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn when_pair_is_unknown_then_it_is_ready() {
        let tracker = CooldownTracker::new();
        assert!(tracker.is_ready("player-1", "stone_bullet", 1_000));
        assert_eq!(tracker.remaining("player-1", "stone_bullet", 1_000), 0);
    }

    #[test]
    fn when_armed_then_remaining_decreases_with_time_until_ready() {
        let tracker = CooldownTracker::new();
        tracker.arm("player-1", "stone_bullet", 5_000, 1_000);

        assert_eq!(tracker.remaining("player-1", "stone_bullet", 1_000), 5_000);
        assert_eq!(tracker.remaining("player-1", "stone_bullet", 3_500), 2_500);
        assert_eq!(tracker.remaining("player-1", "stone_bullet", 6_000), 0);
        assert!(tracker.is_ready("player-1", "stone_bullet", 6_000));
    }

    #[test]
    fn when_consumed_back_to_back_then_only_the_first_attempt_succeeds() {
        let tracker = CooldownTracker::new();

        assert!(tracker.try_consume("player-1", "stone_bullet", 5_000, 1_000).is_ok());
        assert_eq!(
            tracker.try_consume("player-1", "stone_bullet", 5_000, 1_001),
            Err(4_999)
        );
        // A different player is unaffected.
        assert!(tracker.try_consume("player-2", "stone_bullet", 5_000, 1_001).is_ok());
        // After expiry the pair can be consumed again.
        assert!(tracker.try_consume("player-1", "stone_bullet", 5_000, 6_000).is_ok());
    }

    #[test]
    fn when_display_and_wire_names_are_mixed_then_they_share_one_cooldown() {
        let tracker = CooldownTracker::new();
        tracker.arm("player-1", "Stone Bullet", 5_000, 1_000);
        assert!(!tracker.is_ready("player-1", "stone_bullet", 2_000));
    }
}
