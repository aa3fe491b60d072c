use thiserror::Error;

/// Error types for the game session server
#[derive(Debug, Error)]
pub enum GameError {
    /// Room and membership errors
    #[error("Room {0} not found")]
    RoomNotFound(String),

    #[error("Failed to allocate a unique room code after {0} attempts")]
    RoomCreateFailed(u32),

    #[error("Display name is required")]
    NameRequired,

    #[error("Connection is not in a room")]
    NotInRoom,

    #[error("Only the host may perform this operation")]
    NotHost,

    /// Phase errors
    #[error("Room is not in the lobby")]
    NotInLobby,

    #[error("Room is not drafting")]
    NotInDraft,

    #[error("Room is not revealing picks")]
    NotInReveal,

    #[error("Room is not voting")]
    NotInVoting,

    /// Game rule errors
    #[error("Invalid game mode: {0}")]
    InvalidMode(String),

    #[error("No matchup for this round")]
    NoMatchup,

    #[error("Pick {0} is not a contender in this round")]
    InvalidPick(String),

    #[error("Choice {0} is not a contender in this round")]
    InvalidChoice(String),

    #[error("Contenders cannot vote on their own matchup")]
    CannotVoteSelfMatchup,

    #[error("Already voted in round {0}")]
    AlreadyVoted(usize),

    /// Transport errors
    #[error("Malformed request: {0}")]
    BadRequest(String),

    #[error("Failed to serialize message: {0}")]
    SerializationFailed(#[from] serde_json::Error),

    /// Configuration errors
    #[error("Invalid configuration: {0}")]
    InvalidConfiguration(String),

    #[error("Failed to read prompts from {path}: {source}")]
    PromptsUnreadable {
        path: String,
        source: std::io::Error,
    },
}

/// Convenience type alias for Results using GameError
pub type Result<T> = std::result::Result<T, GameError>;

impl GameError {
    /// Wire identifier sent back in `{ ok: false, error }` acknowledgements
    pub fn code(&self) -> &'static str {
        match self {
            GameError::RoomNotFound(_) => "ROOM_NOT_FOUND",
            GameError::RoomCreateFailed(_) => "ROOM_CREATE_FAILED",
            GameError::NameRequired => "NAME_REQUIRED",
            GameError::NotInRoom => "NOT_IN_ROOM",
            GameError::NotHost => "NOT_HOST",
            GameError::NotInLobby => "NOT_IN_LOBBY",
            GameError::NotInDraft => "NOT_IN_DRAFT",
            GameError::NotInReveal => "NOT_IN_REVEAL",
            GameError::NotInVoting => "NOT_IN_VOTING",
            GameError::InvalidMode(_) => "INVALID_MODE",
            GameError::NoMatchup => "NO_MATCHUP",
            GameError::InvalidPick(_) => "INVALID_PICK",
            GameError::InvalidChoice(_) => "INVALID_CHOICE",
            GameError::CannotVoteSelfMatchup => "CANNOT_VOTE_SELF_MATCHUP",
            GameError::AlreadyVoted(_) => "ALREADY_VOTED",
            GameError::BadRequest(_) => "BAD_REQUEST",
            GameError::SerializationFailed(_)
            | GameError::InvalidConfiguration(_)
            | GameError::PromptsUnreadable { .. } => "INTERNAL",
        }
    }

    /// Helper to create configuration errors with context
    pub fn config(msg: impl Into<String>) -> Self {
        GameError::InvalidConfiguration(msg.into())
    }
}
