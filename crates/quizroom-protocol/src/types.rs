//! Payload types carried inside [`ClientEvent`](crate::ClientEvent) and
//! [`ServerEvent`](crate::ServerEvent).
//!
//! Field names go out in camelCase because the consumers are browser
//! clients.

use std::fmt;

use quizroom_transport::ConnectionId;
use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// RoomCode
// ---------------------------------------------------------------------------

/// The short code players type to find a room (e.g. `"K3ZQ9A"`).
///
/// Codes are case-insensitive: construction and deserialization both trim
/// surrounding whitespace and upper-case the text, so `" k3zq9a"` and
/// `"K3ZQ9A"` name the same room.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub struct RoomCode(String);

impl RoomCode {
    /// Creates a normalized room code.
    pub fn new(code: impl AsRef<str>) -> Self {
        Self(code.as_ref().trim().to_ascii_uppercase())
    }

    /// Returns the code as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Returns `true` if the code is empty after normalization.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl From<String> for RoomCode {
    fn from(code: String) -> Self {
        Self::new(code)
    }
}

impl From<RoomCode> for String {
    fn from(code: RoomCode) -> Self {
        code.0
    }
}

impl fmt::Display for RoomCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

// ---------------------------------------------------------------------------
// Lobby / scoreboard entries
// ---------------------------------------------------------------------------

/// One seat in a `roomUpdate`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlayerSummary {
    /// The connection currently bound to this seat.
    pub id: ConnectionId,
    /// Display name as the player typed it.
    pub name: String,
    /// Cumulative score in the current match.
    pub score: u32,
    /// Whether the player currently has a live connection.
    pub online: bool,
}

/// One line of a scoreboard (`questionResult.scores`, `gameEnded`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlayerScore {
    pub id: ConnectionId,
    pub name: String,
    pub score: u32,
}

/// How one player did on the question that just closed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlayerOutcome {
    pub id: ConnectionId,
    pub name: String,
    /// `false` both for a wrong answer and for no answer at all.
    pub correct: bool,
    /// Points awarded for this question only.
    pub points: u32,
    /// Whether an answer was submitted before the question closed.
    pub answered: bool,
}

/// A question as shown to players.
///
/// There is deliberately no field for the correct option: clients learn
/// it only from the later `questionResult`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QuestionPrompt {
    pub id: u32,
    pub question: String,
    pub options: Vec<String>,
    /// 1-based position in the match.
    pub question_number: usize,
    pub total_questions: usize,
    /// Seconds the player has to answer.
    pub time_limit: u64,
}

/// A row of `roomList`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RoomListEntry {
    pub room_id: RoomCode,
    /// Seats held, online or not.
    pub player_count: usize,
    pub online_count: usize,
    pub has_started: bool,
}
