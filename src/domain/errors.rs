// Domain-level errors for game workflows.
#[derive(Debug, PartialEq, Eq)]
pub enum GameError {
    PlayerNotFound,
    MonsterNotFound,
    ItemNotFound,
    LootUnavailable,
    ItemNotUsable,
    UsernameTaken,
    InvalidUsername,
    InvalidPassword,
    InvalidCredentials,
    InvalidChatMessage,
    RebirthNotReady,
    StorageFailure,
}
