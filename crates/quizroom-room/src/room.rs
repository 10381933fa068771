//! The Room entity: seats, the host role, and (while a match runs) the
//! game state.
//!
//! Operations live in two sibling modules that each add an `impl Room`
//! block: [`presence`](crate::presence) (join / leave / disconnect) and
//! [`engine`](crate::engine) (start / answer / alarms). This file holds
//! the data and the read-side helpers both of them share.

use std::collections::HashMap;
use std::sync::Arc;

use quizroom_protocol::{ConnectionId, PlayerScore, PlayerSummary, RoomCode, ServerEvent};

use crate::{Effect, GameConfig, GameState, QuestionBank, Recipient, RoomError};

/// A player's seat, as the room remembers it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlayerRecord {
    /// Display name as supplied on the latest join. Identity is the
    /// lower-cased form of this.
    pub name: String,
    /// Cumulative score in the current match.
    pub score: u32,
    /// Whether the seat's connection is live.
    pub online: bool,
}

/// A seat bound to the connection that currently holds it.
#[derive(Debug, Clone)]
pub(crate) struct Seat {
    pub(crate) conn: ConnectionId,
    pub(crate) record: PlayerRecord,
}

/// One room and everything in it.
///
/// Invariants:
/// - at most one seat per lower-cased name (`by_name` mirrors `seats`);
/// - `host`, if set, is the connection of an existing seat;
/// - `game` is `Some` exactly while a match is running.
pub struct Room {
    pub(crate) code: RoomCode,
    pub(crate) config: GameConfig,
    pub(crate) bank: Arc<QuestionBank>,
    /// Seats in join order. Host migration and score ties use this order.
    pub(crate) seats: Vec<Seat>,
    /// `lower(name)` → connection currently holding that seat.
    pub(crate) by_name: HashMap<String, ConnectionId>,
    pub(crate) host: Option<ConnectionId>,
    /// The name the room was created for; may rejoin a running match even
    /// without a seat.
    pub(crate) original_host: Option<String>,
    pub(crate) game: Option<GameState>,
    /// Bumped on every match phase transition; see [`Alarm`](crate::Alarm).
    pub(crate) generation: u64,
}

impl Room {
    /// Creates an empty room.
    pub fn new(
        code: RoomCode,
        config: GameConfig,
        bank: Arc<QuestionBank>,
        original_host: Option<String>,
    ) -> Self {
        Self {
            code,
            config,
            bank,
            seats: Vec::new(),
            by_name: HashMap::new(),
            host: None,
            original_host: original_host
                .map(|name| name.trim().to_string())
                .filter(|name| !name.is_empty()),
            game: None,
            generation: 0,
        }
    }

    pub fn code(&self) -> &RoomCode {
        &self.code
    }

    pub fn config(&self) -> &GameConfig {
        &self.config
    }

    pub fn host(&self) -> Option<ConnectionId> {
        self.host
    }

    pub fn original_host(&self) -> Option<&str> {
        self.original_host.as_deref()
    }

    /// `true` while a match is running.
    pub fn has_started(&self) -> bool {
        self.game.is_some()
    }

    pub fn game(&self) -> Option<&GameState> {
        self.game.as_ref()
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// The seat held by `conn`, if any.
    pub fn player(&self, conn: ConnectionId) -> Option<&PlayerRecord> {
        self.seat_index(conn).map(|i| &self.seats[i].record)
    }

    /// The connection holding the seat named `name` (case-insensitive).
    pub fn connection_for(&self, name: &str) -> Option<ConnectionId> {
        self.by_name.get(&name_key(name)).copied()
    }

    /// Seats in join order.
    pub fn players(&self) -> impl Iterator<Item = (ConnectionId, &PlayerRecord)> {
        self.seats.iter().map(|seat| (seat.conn, &seat.record))
    }

    pub fn player_count(&self) -> usize {
        self.seats.len()
    }

    pub fn online_count(&self) -> usize {
        self.seats.iter().filter(|seat| seat.record.online).count()
    }

    pub fn is_empty(&self) -> bool {
        self.seats.is_empty()
    }

    pub fn is_online(&self, conn: ConnectionId) -> bool {
        self.player(conn).is_some_and(|record| record.online)
    }

    /// Re-pushes the lobby snapshot to `conn` only.
    pub fn request_state(&self, conn: ConnectionId) -> Result<Vec<Effect>, RoomError> {
        if self.seat_index(conn).is_none() {
            return Err(RoomError::NotInRoom);
        }
        Ok(vec![Effect::send(
            Recipient::Connection(conn),
            self.room_update_for(conn),
        )])
    }

    // -- shared helpers ---------------------------------------------------

    pub(crate) fn seat_index(&self, conn: ConnectionId) -> Option<usize> {
        self.seats.iter().position(|seat| seat.conn == conn)
    }

    pub(crate) fn next_generation(&mut self) -> u64 {
        self.generation += 1;
        self.generation
    }

    /// The `roomUpdate` as `viewer` should see it.
    pub(crate) fn room_update_for(&self, viewer: ConnectionId) -> ServerEvent {
        ServerEvent::RoomUpdate {
            players: self
                .seats
                .iter()
                .map(|seat| PlayerSummary {
                    id: seat.conn,
                    name: seat.record.name.clone(),
                    score: seat.record.score,
                    online: seat.record.online,
                })
                .collect(),
            host_id: self.host,
            is_host: self.host == Some(viewer),
        }
    }

    /// One `roomUpdate` per online seat, each with its own `is_host`.
    /// Offline seats get nothing; they receive fresh state on rejoin.
    pub(crate) fn push_room_updates(&self, effects: &mut Vec<Effect>) {
        for seat in self.seats.iter().filter(|seat| seat.record.online) {
            effects.push(Effect::send(
                Recipient::Connection(seat.conn),
                self.room_update_for(seat.conn),
            ));
        }
    }

    /// Current scores in seat order.
    pub(crate) fn scoreboard(&self) -> Vec<PlayerScore> {
        self.seats
            .iter()
            .map(|seat| PlayerScore {
                id: seat.conn,
                name: seat.record.name.clone(),
                score: seat.record.score,
            })
            .collect()
    }
}

/// The identity key for a display name.
pub(crate) fn name_key(name: &str) -> String {
    name.trim().to_lowercase()
}
