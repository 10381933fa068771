//! The two event vocabularies: what clients send and what the server pushes.

use quizroom_transport::ConnectionId;
use serde::{Deserialize, Serialize};

use crate::{PlayerOutcome, PlayerScore, PlayerSummary, QuestionPrompt, RoomCode, RoomListEntry};

// ---------------------------------------------------------------------------
// Client → Server
// ---------------------------------------------------------------------------

/// Everything a client may ask of the server.
///
/// Anything that fails to decode into one of these variants is a protocol
/// violation and is dropped by the gateway without a reply.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(
    tag = "event",
    content = "data",
    rename_all = "camelCase",
    rename_all_fields = "camelCase"
)]
pub enum ClientEvent {
    /// Take (or retake) a seat in a room under a display name.
    JoinRoom {
        room_id: RoomCode,
        player_name: String,
    },

    /// Give up the seat for good. Answered with `leftRoom`.
    LeaveRoom { room_id: RoomCode },

    /// Host only: begin a match.
    StartGame { room_id: RoomCode },

    /// Answer the open question. `time_remaining` is in seconds as the
    /// client's countdown showed it.
    SubmitAnswer {
        room_id: RoomCode,
        answer_index: usize,
        time_remaining: f64,
    },

    /// Re-push a `roomUpdate` to the requester only.
    GetRoomState { room_id: RoomCode },

    /// Allocate a new room. Answered with `roomCreated`.
    CreateRoom {
        #[serde(default)]
        host_name: Option<String>,
    },

    /// Ask whether a room exists and whether `player_name` may enter it.
    /// Answered with `roomStatus`.
    ValidateRoom {
        room_id: RoomCode,
        #[serde(default)]
        player_name: Option<String>,
    },

    /// List rooms that currently hold players. Answered with `roomList`.
    ListRooms,
}

impl ClientEvent {
    /// The room this event addresses, if it addresses one.
    pub fn room_id(&self) -> Option<&RoomCode> {
        match self {
            Self::JoinRoom { room_id, .. }
            | Self::LeaveRoom { room_id }
            | Self::StartGame { room_id }
            | Self::SubmitAnswer { room_id, .. }
            | Self::GetRoomState { room_id }
            | Self::ValidateRoom { room_id, .. } => Some(room_id),
            Self::CreateRoom { .. } | Self::ListRooms => None,
        }
    }
}

// ---------------------------------------------------------------------------
// Server → Client
// ---------------------------------------------------------------------------

/// Everything the server pushes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(
    tag = "event",
    content = "data",
    rename_all = "camelCase",
    rename_all_fields = "camelCase"
)]
pub enum ServerEvent {
    /// Lobby snapshot. Sent to each viewer individually because `is_host`
    /// is relative to the receiving connection.
    RoomUpdate {
        players: Vec<PlayerSummary>,
        host_id: Option<ConnectionId>,
        is_host: bool,
    },

    /// A match began, or the receiver rejoined a match already running.
    GameStarted,

    /// A question opened for answers.
    NewQuestion(QuestionPrompt),

    /// Private acknowledgment of the receiver's own answer.
    AnswerSubmitted { is_correct: bool, answer_index: usize },

    /// A question closed. Carries the correct option.
    QuestionResult {
        correct_answer: usize,
        explanation: Option<String>,
        results: Vec<PlayerOutcome>,
        scores: Vec<PlayerScore>,
    },

    /// The match is over. `final_scores` is ranked best first and `winner`
    /// is its first element (absent only if nobody holds a seat).
    GameEnded {
        final_scores: Vec<PlayerScore>,
        winner: Option<PlayerScore>,
    },

    /// A request from this connection was refused.
    Error { message: String },

    /// Reply to `createRoom`.
    RoomCreated { room_id: RoomCode },

    /// Reply to `validateRoom`.
    RoomStatus {
        room_id: RoomCode,
        exists: bool,
        has_started: bool,
        can_join: bool,
    },

    /// Reply to `listRooms`.
    RoomList { rooms: Vec<RoomListEntry> },

    /// Acknowledgment of `leaveRoom`.
    LeftRoom { room_id: RoomCode },
}

impl ServerEvent {
    /// Shorthand for an `error` event.
    pub fn error(message: impl Into<String>) -> Self {
        Self::Error {
            message: message.into(),
        }
    }
}
