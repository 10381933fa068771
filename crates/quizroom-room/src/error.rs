//! Error types for the room layer.

use quizroom_protocol::RoomCode;

/// Why a room operation was refused.
///
/// Every variant is recoverable: the gateway reports it to the connection
/// that made the request through an `error` event and carries on. The
/// `Display` text is exactly what that event's `message` field contains.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RoomError {
    /// No room is registered under this code.
    #[error("Room {0} not found")]
    RoomNotFound(RoomCode),

    /// The match is running and the name is neither a seated player nor
    /// the player the room was created for.
    #[error("Game already in progress")]
    MatchAlreadyStarted,

    /// Only the host connection may start a match.
    #[error("Only the host can start the game")]
    NotHost,

    /// No question is currently open for answers.
    #[error("No active question")]
    NoActiveQuestion,

    /// This connection already answered the open question.
    #[error("Answer already submitted")]
    DuplicateAnswer,

    /// The connection holds no seat in the room it addressed.
    #[error("You are not in this room")]
    NotInRoom,

    /// The supplied display name is blank.
    #[error("Player name must not be empty")]
    InvalidName,

    /// The question bank has nothing in the room's category.
    #[error("No questions available for category {0}")]
    NoQuestionsAvailable(String),

    /// A caller-supplied room code is already taken.
    #[error("Room {0} already exists")]
    AlreadyExists(RoomCode),

    /// The room's actor has shut down (e.g. it was just cleaned up).
    #[error("Room {0} is no longer available")]
    Unavailable(RoomCode),
}

/// Errors raised while loading a question bank.
#[derive(Debug, thiserror::Error)]
pub enum BankError {
    #[error("failed to read question bank: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to parse question bank: {0}")]
    Parse(#[from] serde_json::Error),

    /// A question that could never be answered correctly.
    #[error("question {id} in category {category:?} is invalid: {reason}")]
    InvalidQuestion {
        category: String,
        id: u32,
        reason: String,
    },
}
