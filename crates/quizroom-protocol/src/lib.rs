//! Wire protocol for Quizroom.
//!
//! This crate defines the events that travel between a browser client and
//! the server:
//!
//! - **Events** ([`ClientEvent`], [`ServerEvent`]): what each side may say.
//! - **Payload types** ([`RoomCode`], [`PlayerSummary`], [`QuestionPrompt`],
//!   ...): the structures carried inside those events.
//! - **Codec** ([`Codec`] trait, [`JsonCodec`]): how events become frames.
//! - **Errors** ([`ProtocolError`]).
//!
//! Every event is an adjacently tagged JSON object:
//!
//! ```text
//! { "event": "joinRoom", "data": { "roomId": "K3ZQ9A", "playerName": "Alice" } }
//! ```
//!
//! The protocol layer knows nothing about rooms or timers. It only knows
//! the shapes.

mod codec;
mod error;
mod events;
mod types;

pub use codec::Codec;
#[cfg(feature = "json")]
pub use codec::JsonCodec;
pub use error::ProtocolError;
pub use events::{ClientEvent, ServerEvent};
pub use quizroom_transport::ConnectionId;
pub use types::{
    PlayerOutcome, PlayerScore, PlayerSummary, QuestionPrompt, RoomCode, RoomListEntry,
};
