// Rebirth: trade a maxed level for a permanent hidden-stat boost.

use std::sync::Arc;

use tracing::info;

use crate::domain::ports::Repository;
use crate::domain::progression::MAX_LEVEL;
use crate::domain::{GameError, Player};

pub struct RebirthUseCase {
    pub repo: Arc<dyn Repository>,
}

impl RebirthUseCase {
    pub async fn execute(&self, player_id: &str) -> Result<Player, GameError> {
        let player = self
            .repo
            .get_player(player_id)
            .await
            .map_err(|_| GameError::StorageFailure)?
            .ok_or(GameError::PlayerNotFound)?;

        if player.level < MAX_LEVEL {
            return Err(GameError::RebirthNotReady);
        }

        let reborn = self
            .repo
            .perform_rebirth(player_id)
            .await
            .map_err(|_| GameError::StorageFailure)?
            .ok_or(GameError::PlayerNotFound)?;

        info!(
            player_id,
            rebirth_cycle = reborn.rebirth_cycle,
            "player reborn"
        );
        Ok(reborn)
    }
}
