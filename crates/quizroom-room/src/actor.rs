//! Room actor: an isolated Tokio task that owns one [`Room`].
//!
//! Everything that touches a room goes through its command channel, so
//! the room's operations run one at a time and never interleave. Timers
//! are no exception: an expired [`Alarm`] is just another command.

use std::collections::HashMap;

use quizroom_protocol::{ConnectionId, RoomCode, ServerEvent};
use tokio::sync::{mpsc, oneshot};

use crate::{Alarm, CleanupScheduler, Effect, Recipient, Room, RoomError};

/// Channel a connection's outbound events are pushed into.
pub type EventSender = mpsc::UnboundedSender<ServerEvent>;

type Reply<T> = oneshot::Sender<Result<T, RoomError>>;

/// Commands sent to a room actor through its channel.
pub(crate) enum RoomCommand {
    Join {
        conn: ConnectionId,
        name: String,
        sender: EventSender,
        reply: Reply<()>,
    },
    Leave {
        conn: ConnectionId,
        reply: Reply<()>,
    },
    /// The connection dropped. Fire-and-forget.
    Disconnect {
        conn: ConnectionId,
    },
    Start {
        conn: ConnectionId,
        reply: Reply<()>,
    },
    SubmitAnswer {
        conn: ConnectionId,
        answer_index: usize,
        time_remaining: f64,
        reply: Reply<()>,
    },
    RequestState {
        conn: ConnectionId,
        reply: Reply<()>,
    },
    CanJoin {
        name: String,
        reply: oneshot::Sender<bool>,
    },
    GetInfo {
        reply: oneshot::Sender<RoomInfo>,
    },
    /// A timer armed by the room went off.
    Alarm(Alarm),
    /// Stop if nobody is seated; replies whether the actor stopped.
    ShutdownIfEmpty {
        reply: oneshot::Sender<bool>,
    },
    Shutdown,
}

/// A snapshot of room metadata.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RoomInfo {
    pub room_id: RoomCode,
    /// Seats, online or not.
    pub player_count: usize,
    pub online_count: usize,
    pub has_started: bool,
}

/// Handle to a running room actor.
///
/// Cheap to clone. The [`RoomStore`](crate::RoomStore) holds one per room;
/// once the store lets go of it the actor winds down.
#[derive(Clone)]
pub struct RoomHandle {
    room_id: RoomCode,
    sender: mpsc::Sender<RoomCommand>,
}

impl RoomHandle {
    pub fn room_id(&self) -> &RoomCode {
        &self.room_id
    }

    /// Joins `conn` as `name`. On success `sender` starts receiving this
    /// room's events.
    pub async fn join(
        &self,
        conn: ConnectionId,
        name: impl Into<String>,
        sender: EventSender,
    ) -> Result<(), RoomError> {
        let name = name.into();
        self.request(|reply| RoomCommand::Join {
            conn,
            name,
            sender,
            reply,
        })
        .await?
    }

    pub async fn leave(&self, conn: ConnectionId) -> Result<(), RoomError> {
        self.request(|reply| RoomCommand::Leave { conn, reply }).await?
    }

    /// Marks `conn` offline. Fire-and-forget.
    pub async fn disconnect(&self, conn: ConnectionId) -> Result<(), RoomError> {
        self.send(RoomCommand::Disconnect { conn }).await
    }

    pub async fn start(&self, conn: ConnectionId) -> Result<(), RoomError> {
        self.request(|reply| RoomCommand::Start { conn, reply }).await?
    }

    pub async fn submit_answer(
        &self,
        conn: ConnectionId,
        answer_index: usize,
        time_remaining: f64,
    ) -> Result<(), RoomError> {
        self.request(|reply| RoomCommand::SubmitAnswer {
            conn,
            answer_index,
            time_remaining,
            reply,
        })
        .await?
    }

    /// Re-pushes the lobby snapshot to `conn`.
    pub async fn request_state(&self, conn: ConnectionId) -> Result<(), RoomError> {
        self.request(|reply| RoomCommand::RequestState { conn, reply })
            .await?
    }

    /// Whether `name` would currently be admitted.
    pub async fn can_join(&self, name: impl Into<String>) -> Result<bool, RoomError> {
        let name = name.into();
        self.request(|reply| RoomCommand::CanJoin { name, reply })
            .await
    }

    pub async fn get_info(&self) -> Result<RoomInfo, RoomError> {
        self.request(|reply| RoomCommand::GetInfo { reply }).await
    }

    /// Tells the room to shut down.
    pub async fn shutdown(&self) -> Result<(), RoomError> {
        self.send(RoomCommand::Shutdown).await
    }

    pub(crate) async fn shutdown_if_empty(&self) -> Result<bool, RoomError> {
        self.request(|reply| RoomCommand::ShutdownIfEmpty { reply })
            .await
    }

    async fn send(&self, cmd: RoomCommand) -> Result<(), RoomError> {
        self.sender
            .send(cmd)
            .await
            .map_err(|_| RoomError::Unavailable(self.room_id.clone()))
    }

    /// Sends a command carrying a reply channel and waits for the answer.
    async fn request<T>(
        &self,
        cmd: impl FnOnce(oneshot::Sender<T>) -> RoomCommand,
    ) -> Result<T, RoomError> {
        let (reply_tx, reply_rx) = oneshot::channel();
        self.send(cmd(reply_tx)).await?;
        reply_rx
            .await
            .map_err(|_| RoomError::Unavailable(self.room_id.clone()))
    }
}

/// The internal room actor state. Runs inside a Tokio task.
struct RoomActor {
    room: Room,
    /// Outbound channels of seated, online connections.
    senders: HashMap<ConnectionId, EventSender>,
    cleanup: CleanupScheduler,
    receiver: mpsc::Receiver<RoomCommand>,
    /// Where alarms are delivered. Weak, so pending timers don't keep a
    /// room alive after the store dropped it.
    alarms: mpsc::WeakSender<RoomCommand>,
}

impl RoomActor {
    /// Runs the actor loop, processing commands until shutdown.
    async fn run(mut self) {
        tracing::info!(room_id = %self.room.code(), "room actor started");

        while let Some(cmd) = self.receiver.recv().await {
            match cmd {
                RoomCommand::Join {
                    conn,
                    name,
                    sender,
                    reply,
                } => {
                    let result = self.room.join(conn, &name).map(|effects| {
                        self.senders.insert(conn, sender);
                        effects
                    });
                    let _ = reply.send(self.perform(result));
                }
                RoomCommand::Leave { conn, reply } => {
                    let result = self.room.leave(conn);
                    let result = self.perform(result);
                    let _ = reply.send(result);
                }
                RoomCommand::Disconnect { conn } => {
                    let effects = self.room.disconnect(conn);
                    self.apply(effects);
                }
                RoomCommand::Start { conn, reply } => {
                    let result = self.room.start(conn);
                    let _ = reply.send(self.perform(result));
                }
                RoomCommand::SubmitAnswer {
                    conn,
                    answer_index,
                    time_remaining,
                    reply,
                } => {
                    let result = self.room.submit_answer(conn, answer_index, time_remaining);
                    let _ = reply.send(self.perform(result));
                }
                RoomCommand::RequestState { conn, reply } => {
                    let result = self.room.request_state(conn);
                    let _ = reply.send(self.perform(result));
                }
                RoomCommand::CanJoin { name, reply } => {
                    let _ = reply.send(self.room.can_join(&name));
                }
                RoomCommand::GetInfo { reply } => {
                    let _ = reply.send(self.info());
                }
                RoomCommand::Alarm(alarm) => {
                    let effects = self.room.on_alarm(alarm);
                    self.apply(effects);
                }
                RoomCommand::ShutdownIfEmpty { reply } => {
                    let empty = self.room.is_empty();
                    let _ = reply.send(empty);
                    if empty {
                        break;
                    }
                }
                RoomCommand::Shutdown => {
                    tracing::info!(room_id = %self.room.code(), "room shutting down");
                    break;
                }
            }
        }

        self.cleanup.cancel(self.room.code());
        tracing::info!(room_id = %self.room.code(), "room actor stopped");
    }

    /// Applies the effects of a successful operation; passes errors through.
    fn perform(&mut self, result: Result<Vec<Effect>, RoomError>) -> Result<(), RoomError> {
        match result {
            Ok(effects) => {
                self.apply(effects);
                Ok(())
            }
            Err(err) => {
                tracing::debug!(room_id = %self.room.code(), %err, "room operation rejected");
                Err(err)
            }
        }
    }

    fn apply(&mut self, effects: Vec<Effect>) {
        for effect in effects {
            match effect {
                Effect::Send { to, event } => self.deliver(to, event),
                Effect::Schedule { alarm, after } => {
                    let alarms = self.alarms.clone();
                    tokio::spawn(async move {
                        tokio::time::sleep(after).await;
                        if let Some(tx) = alarms.upgrade() {
                            let _ = tx.send(RoomCommand::Alarm(alarm)).await;
                        }
                    });
                }
                Effect::ScheduleCleanup => self.cleanup.schedule(self.room.code()),
                Effect::CancelCleanup => self.cleanup.cancel(self.room.code()),
            }
        }

        // Offline and superseded connections get nothing further.
        let room = &self.room;
        self.senders.retain(|conn, _| room.is_online(*conn));
    }

    /// Pushes an event. Silently drops it if the receiver is gone.
    fn deliver(&self, to: Recipient, event: ServerEvent) {
        match to {
            Recipient::Online => {
                for (conn, sender) in &self.senders {
                    if self.room.is_online(*conn) {
                        let _ = sender.send(event.clone());
                    }
                }
            }
            Recipient::Connection(conn) => {
                if let Some(sender) = self.senders.get(&conn) {
                    let _ = sender.send(event);
                }
            }
        }
    }

    fn info(&self) -> RoomInfo {
        RoomInfo {
            room_id: self.room.code().clone(),
            player_count: self.room.player_count(),
            online_count: self.room.online_count(),
            has_started: self.room.has_started(),
        }
    }
}

/// Spawns a room actor task and returns a handle to communicate with it.
///
/// `channel_size` bounds the command queue; senders wait when it is full.
pub(crate) fn spawn_room(room: Room, cleanup: CleanupScheduler, channel_size: usize) -> RoomHandle {
    let (tx, rx) = mpsc::channel(channel_size);
    let room_id = room.code().clone();

    let actor = RoomActor {
        room,
        senders: HashMap::new(),
        cleanup,
        receiver: rx,
        alarms: tx.downgrade(),
    };

    tokio::spawn(actor.run());

    RoomHandle { room_id, sender: tx }
}
