//! Per-connection handler: decode client events and route them to rooms.
//!
//! Each accepted connection gets its own Tokio task running this handler,
//! plus a writer task that drains the connection's event channel onto the
//! socket. Rooms push into that same channel, so a reply and the room
//! updates it causes arrive in the order they were produced.

use std::sync::Arc;

use quizroom_protocol::{ClientEvent, Codec, ConnectionId, RoomCode, RoomListEntry, ServerEvent};
use quizroom_room::{EventSender, RoomError, RoomHandle};
use quizroom_transport::{Connection, WebSocketConnection};
use tokio::sync::mpsc;

use crate::QuizroomError;
use crate::server::ServerState;

/// The connection's view of where it is seated.
///
/// Dropping it marks the player offline in their current room, so the
/// seat is released to a reconnect even if the handler panics. `Drop` is
/// synchronous, so the notification is a fire-and-forget task.
struct Session {
    conn_id: ConnectionId,
    room: Option<RoomHandle>,
}

impl Session {
    fn in_room(&self, code: &RoomCode) -> Option<&RoomHandle> {
        self.room.as_ref().filter(|handle| handle.room_id() == code)
    }
}

impl Drop for Session {
    fn drop(&mut self) {
        if let Some(handle) = self.room.take() {
            let conn_id = self.conn_id;
            tokio::spawn(async move {
                let _ = handle.disconnect(conn_id).await;
            });
        }
    }
}

/// Handles a single connection from accept to close.
pub(crate) async fn handle_connection<C: Codec>(
    conn: WebSocketConnection,
    state: Arc<ServerState<C>>,
) -> Result<(), QuizroomError> {
    let conn = Arc::new(conn);
    let conn_id = conn.id();
    tracing::debug!(%conn_id, "handling new connection");

    let (events, outbox) = mpsc::unbounded_channel();
    let writer = tokio::spawn(write_events(Arc::clone(&conn), Arc::clone(&state), outbox));

    let mut session = Session {
        conn_id,
        room: None,
    };

    loop {
        let received = match state.idle_timeout {
            Some(limit) => match tokio::time::timeout(limit, conn.recv()).await {
                Ok(received) => received,
                Err(_) => {
                    tracing::info!(%conn_id, "connection idle, closing");
                    break;
                }
            },
            None => conn.recv().await,
        };
        let data = match received {
            Ok(Some(data)) => data,
            Ok(None) => {
                tracing::debug!(%conn_id, "connection closed cleanly");
                break;
            }
            Err(e) => {
                tracing::debug!(%conn_id, error = %e, "recv error");
                break;
            }
        };

        let event: ClientEvent = match state.codec.decode(&data) {
            Ok(event) => event,
            Err(e) => {
                tracing::debug!(%conn_id, error = %e, "ignoring undecodable event");
                continue;
            }
        };

        if let Err(e) = dispatch(&state, &mut session, &events, event).await {
            let _ = events.send(ServerEvent::error(e.to_string()));
        }
    }

    // Marks the seat offline before the socket goes away.
    drop(session);
    writer.abort();
    let _ = conn.close().await;
    Ok(())
}

/// Pushes every event from `outbox` to the socket until either side closes.
async fn write_events<C: Codec>(
    conn: Arc<WebSocketConnection>,
    state: Arc<ServerState<C>>,
    mut outbox: mpsc::UnboundedReceiver<ServerEvent>,
) {
    while let Some(event) = outbox.recv().await {
        let text = match state.codec.encode(&event) {
            Ok(text) => text,
            Err(e) => {
                tracing::warn!(conn_id = %conn.id(), error = %e, "failed to encode event");
                continue;
            }
        };
        if let Err(e) = conn.send_text(&text).await {
            tracing::debug!(conn_id = %conn.id(), error = %e, "send failed, writer stopping");
            break;
        }
    }
}

/// Routes one client event. Errors are reported back to this connection
/// only.
async fn dispatch<C: Codec>(
    state: &ServerState<C>,
    session: &mut Session,
    events: &EventSender,
    event: ClientEvent,
) -> Result<(), RoomError> {
    let conn_id = session.conn_id;
    match event {
        ClientEvent::JoinRoom {
            room_id,
            player_name,
        } => {
            let handle = room(state, session, &room_id).await?;
            handle.join(conn_id, player_name, events.clone()).await?;
            // One seat per connection: stepping into another room leaves
            // the previous seat offline, as a disconnect would.
            if let Some(previous) = session.room.replace(handle) {
                if previous.room_id() != &room_id {
                    let _ = previous.disconnect(conn_id).await;
                }
            }
        }

        ClientEvent::LeaveRoom { room_id } => {
            let handle = room(state, session, &room_id).await?;
            handle.leave(conn_id).await?;
            if session.in_room(&room_id).is_some() {
                session.room = None;
            }
            let _ = events.send(ServerEvent::LeftRoom { room_id });
        }

        ClientEvent::StartGame { room_id } => {
            room(state, session, &room_id).await?.start(conn_id).await?;
        }

        ClientEvent::SubmitAnswer {
            room_id,
            answer_index,
            time_remaining,
        } => {
            room(state, session, &room_id)
                .await?
                .submit_answer(conn_id, answer_index, time_remaining)
                .await?;
        }

        ClientEvent::GetRoomState { room_id } => {
            room(state, session, &room_id)
                .await?
                .request_state(conn_id)
                .await?;
        }

        ClientEvent::CreateRoom { host_name } => {
            let handle = state.store.lock().await.create(host_name);
            let _ = events.send(ServerEvent::RoomCreated {
                room_id: handle.room_id().clone(),
            });
        }

        ClientEvent::ValidateRoom {
            room_id,
            player_name,
        } => {
            let status = validate_room(state, &room_id, player_name).await;
            let _ = events.send(status);
        }

        ClientEvent::ListRooms => {
            let rooms = state
                .store
                .lock()
                .await
                .list_non_empty()
                .await
                .into_iter()
                .map(|info| RoomListEntry {
                    room_id: info.room_id,
                    player_count: info.player_count,
                    online_count: info.online_count,
                    has_started: info.has_started,
                })
                .collect();
            let _ = events.send(ServerEvent::RoomList { rooms });
        }
    }
    Ok(())
}

/// The handle for `code`: the session's own room if it matches, otherwise
/// a store lookup.
async fn room<C: Codec>(
    state: &ServerState<C>,
    session: &Session,
    code: &RoomCode,
) -> Result<RoomHandle, RoomError> {
    if let Some(handle) = session.in_room(code) {
        return Ok(handle.clone());
    }
    state.store.lock().await.get(code)
}

/// Builds the `roomStatus` reply. A room that vanished mid-query reports
/// as not existing.
async fn validate_room<C: Codec>(
    state: &ServerState<C>,
    code: &RoomCode,
    player_name: Option<String>,
) -> ServerEvent {
    let missing = ServerEvent::RoomStatus {
        room_id: code.clone(),
        exists: false,
        has_started: false,
        can_join: false,
    };
    let Ok(handle) = state.store.lock().await.get(code) else {
        return missing;
    };
    let Ok(info) = handle.get_info().await else {
        return missing;
    };
    let can_join = match player_name {
        Some(name) => handle.can_join(name).await.unwrap_or(false),
        None => !info.has_started,
    };
    ServerEvent::RoomStatus {
        room_id: info.room_id,
        exists: true,
        has_started: info.has_started,
        can_join,
    }
}
