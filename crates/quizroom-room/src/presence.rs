//! Join, leave and disconnect.
//!
//! Identity inside a room is the lower-cased player name; the connection
//! id is only the current binding. A join with a known name on a new
//! connection is a reconnection: the seat keeps its position, score and
//! host role and is re-bound to the new connection.

use quizroom_protocol::{ConnectionId, ServerEvent};
use tracing::{debug, info};

use crate::room::{PlayerRecord, Seat, name_key};
use crate::{Effect, Recipient, Room, RoomError};

impl Room {
    /// Whether a player called `name` may join right now.
    ///
    /// Before a match anyone may. During a match only names already seated
    /// here, or the name the room was created for, are let back in.
    pub fn can_join(&self, name: &str) -> bool {
        if !self.has_started() {
            return true;
        }
        let key = name_key(name);
        self.by_name.contains_key(&key)
            || self
                .original_host
                .as_deref()
                .is_some_and(|host| name_key(host) == key)
    }

    /// Binds `conn` to the seat named `name`, creating it if needed.
    pub fn join(&mut self, conn: ConnectionId, name: &str) -> Result<Vec<Effect>, RoomError> {
        let name = name.trim();
        if name.is_empty() {
            return Err(RoomError::InvalidName);
        }
        if !self.can_join(name) {
            return Err(RoomError::MatchAlreadyStarted);
        }

        let key = name_key(name);
        match self.by_name.get(&key).copied() {
            Some(holder) if holder == conn => {
                let i = self.seat_index(conn).ok_or(RoomError::NotInRoom)?;
                let record = &mut self.seats[i].record;
                record.name = name.to_string();
                record.online = true;
                debug!(room_id = %self.code, %conn, name, "join refreshed");
            }
            Some(stale) => {
                // A connection can hold one seat only.
                self.release_other_seat(conn, &key);
                self.rebind(stale, conn, name);
                info!(room_id = %self.code, %conn, %stale, name, "player reconnected");
            }
            None => {
                if let Some(i) = self.seat_index(conn) {
                    let old_key = name_key(&self.seats[i].record.name);
                    self.by_name.remove(&old_key);
                    self.by_name.insert(key, conn);
                    let record = &mut self.seats[i].record;
                    record.name = name.to_string();
                    record.online = true;
                    info!(room_id = %self.code, %conn, name, "player renamed");
                } else {
                    if self.seats.is_empty() {
                        self.host = Some(conn);
                    }
                    self.seats.push(Seat {
                        conn,
                        record: PlayerRecord {
                            name: name.to_string(),
                            score: 0,
                            online: true,
                        },
                    });
                    self.by_name.insert(key, conn);
                    info!(room_id = %self.code, %conn, name, "player joined");
                }
            }
        }

        let mut effects = vec![Effect::CancelCleanup];
        self.push_room_updates(&mut effects);
        if self.has_started() {
            effects.push(Effect::send(
                Recipient::Connection(conn),
                ServerEvent::GameStarted,
            ));
            if let Some(prompt) = self.open_question_prompt() {
                effects.push(Effect::send(
                    Recipient::Connection(conn),
                    ServerEvent::NewQuestion(prompt),
                ));
            }
        }
        Ok(effects)
    }

    /// Removes `conn`'s seat outright.
    pub fn leave(&mut self, conn: ConnectionId) -> Result<Vec<Effect>, RoomError> {
        let i = self.seat_index(conn).ok_or(RoomError::NotInRoom)?;
        let seat = self.seats.remove(i);
        self.by_name.remove(&name_key(&seat.record.name));
        if self.host == Some(conn) {
            self.host = self.seats.first().map(|next| next.conn);
            debug!(room_id = %self.code, host = ?self.host, "host re-elected");
        }
        info!(room_id = %self.code, %conn, name = %seat.record.name, "player left");

        let mut effects = Vec::new();
        if let Some(game) = self.game.as_mut() {
            game.answers.remove(&conn);
        }
        self.push_room_updates(&mut effects);
        self.close_if_all_answered(&mut effects);
        if self.seats.is_empty() {
            effects.push(Effect::ScheduleCleanup);
        }
        Ok(effects)
    }

    /// Marks `conn`'s seat offline. The seat, its score and the host role
    /// are kept for a later reconnection. A connection without a seat here
    /// (never joined, or already superseded by a reconnection) is a no-op.
    pub fn disconnect(&mut self, conn: ConnectionId) -> Vec<Effect> {
        let Some(i) = self.seat_index(conn) else {
            return Vec::new();
        };
        self.seats[i].record.online = false;
        debug!(room_id = %self.code, %conn, "player offline");

        let mut effects = Vec::new();
        self.push_room_updates(&mut effects);
        self.close_if_all_answered(&mut effects);
        effects
    }

    /// Moves the seat held by `stale` over to `conn`, in place.
    fn rebind(&mut self, stale: ConnectionId, conn: ConnectionId, name: &str) {
        let Some(i) = self.seat_index(stale) else {
            return;
        };
        let seat = &mut self.seats[i];
        seat.conn = conn;
        seat.record.name = name.to_string();
        seat.record.online = true;
        self.by_name.insert(name_key(name), conn);
        if self.host == Some(stale) {
            self.host = Some(conn);
        }
        if let Some(game) = self.game.as_mut() {
            if let Some(answer) = game.answers.remove(&stale) {
                game.answers.insert(conn, answer);
            }
        }
    }

    /// Drops any seat `conn` holds under a name other than `keep`.
    fn release_other_seat(&mut self, conn: ConnectionId, keep: &str) {
        let Some(i) = self.seat_index(conn) else {
            return;
        };
        let old_key = name_key(&self.seats[i].record.name);
        if old_key == keep {
            return;
        }
        self.seats.remove(i);
        self.by_name.remove(&old_key);
        if let Some(game) = self.game.as_mut() {
            game.answers.remove(&conn);
        }
    }
}
