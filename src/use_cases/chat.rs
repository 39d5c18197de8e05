// Chat append workflow shared by the realtime dispatcher.

use std::sync::Arc;

use crate::domain::entities::ChatMessage;
use crate::domain::ports::{Clock, Repository};
use crate::domain::GameError;

const MAX_MESSAGE_LEN: usize = 500;
const DEFAULT_CHANNEL: &str = "global";

pub struct SendChatUseCase<C> {
    pub clock: C,
    pub repo: Arc<dyn Repository>,
}

impl<C> SendChatUseCase<C>
where
    C: Clock,
{
    /// Append a chat line for an authenticated player. Returns the stored
    /// message together with the sender's display name for fan-out.
    pub async fn execute(
        &self,
        player_id: &str,
        message: &str,
        channel: Option<&str>,
    ) -> Result<(ChatMessage, String), GameError> {
        let player = self
            .repo
            .get_player(player_id)
            .await
            .map_err(|_| GameError::StorageFailure)?
            .ok_or(GameError::PlayerNotFound)?;

        let trimmed = message.trim();
        if trimmed.is_empty() {
            return Err(GameError::InvalidChatMessage);
        }
        // Oversized lines are cut rather than rejected; chat is lossy by
        // nature and clients resend worse things than truncation.
        let text: String = trimmed.chars().take(MAX_MESSAGE_LEN).collect();

        let channel = channel
            .map(str::trim)
            .filter(|c| !c.is_empty())
            .unwrap_or(DEFAULT_CHANNEL);

        let stored = self
            .repo
            .append_chat_message(ChatMessage {
                id: uuid::Uuid::new_v4().to_string(),
                player_id: player_id.to_string(),
                message: text,
                channel: channel.to_string(),
                sent_at_ms: self.clock.now_millis(),
            })
            .await
            .map_err(|_| GameError::StorageFailure)?;

        Ok((stored, player.username))
    }
}
