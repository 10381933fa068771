//! Room orchestration and the trivia game engine.
//!
//! Each room runs as an isolated Tokio task (actor) that owns a [`Room`].
//! The [`Room`] itself is a plain synchronous state machine: every
//! operation mutates it and returns a list of [`Effect`]s (events to push,
//! timers to arm, cleanup to schedule or cancel). The actor performs those
//! effects. The state machine itself does no I/O.
//!
//! # Key types
//!
//! - [`Room`]: seats, host role, and the match state machine
//! - [`QuestionBank`]: in-memory catalog, draws distinct random questions
//! - [`RoomStore`]: code → [`RoomHandle`] map; create / get / delete
//! - [`RoomHandle`]: send commands to a running room actor
//! - [`CleanupScheduler`]: debounced deletion of rooms that went empty
//! - [`GameConfig`]: question count, time limit, scoring constants
//!
//! # Timers
//!
//! Question and results timers are not cancelled. Each is an [`Alarm`]
//! stamped with the room's generation at the moment it was armed; the room
//! bumps its generation on every phase transition, so an alarm that fires
//! after the room moved on is recognised as stale and dropped.

mod actor;
mod bank;
mod cleanup;
mod config;
mod effect;
mod engine;
mod error;
mod presence;
mod room;
mod store;

pub use actor::{EventSender, RoomHandle, RoomInfo};
pub use bank::{Question, QuestionBank};
pub use cleanup::{CleanupScheduler, run_reaper};
pub use config::GameConfig;
pub use effect::{Alarm, AlarmKind, Effect, Recipient};
pub use engine::{AnswerRecord, GameState, Phase};
pub use error::{BankError, RoomError};
pub use room::{PlayerRecord, Room};
pub use store::{RoomServices, RoomStore, SharedRoomStore};
