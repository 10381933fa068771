//! Unified error type for the Quizroom server.

use quizroom_protocol::ProtocolError;
use quizroom_room::{BankError, RoomError};
use quizroom_transport::TransportError;

/// Top-level error that wraps all crate-specific errors.
///
/// The `#[from]` attribute on each variant auto-generates `From` impls,
/// so the `?` operator converts sub-crate errors automatically.
#[derive(Debug, thiserror::Error)]
pub enum QuizroomError {
    /// A transport-level error (bind, accept, send, recv).
    #[error(transparent)]
    Transport(#[from] TransportError),

    /// A protocol-level error (encode, decode).
    #[error(transparent)]
    Protocol(#[from] ProtocolError),

    /// A room-level error (not found, not host, duplicate answer...).
    #[error(transparent)]
    Room(#[from] RoomError),

    /// The question bank could not be loaded.
    #[error("question bank: {0}")]
    Bank(#[from] BankError),

    /// The server configuration is unusable.
    #[error("invalid configuration: {0}")]
    Config(String),
}
