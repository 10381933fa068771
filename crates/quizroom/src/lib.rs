//! # Quizroom
//!
//! A push-event server for small-group, real-time trivia matches.
//!
//! Players join a room by code and display name, the room's host starts a
//! match, and the server drives it question by question: it pushes each
//! question, collects one answer per player, scores with a time bonus and
//! announces the final ranking. Presence survives disconnects: a player
//! who comes back under the same name gets their seat, score and host role
//! back.
//!
//! The crate is the session gateway. The rules themselves live in
//! `quizroom-room`; the wire vocabulary lives in `quizroom-protocol`.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use quizroom::prelude::*;
//!
//! # async fn run() -> Result<(), QuizroomError> {
//! let server = QuizroomServer::builder()
//!     .config(ServerConfig::load("quizroom.toml"))
//!     .build()
//!     .await?;
//! server.run().await
//! # }
//! ```

mod config;
mod error;
mod handler;
pub mod logging;
mod server;

pub use config::ServerConfig;
pub use error::QuizroomError;
pub use server::{QuizroomServer, QuizroomServerBuilder};

pub use quizroom_protocol as protocol;
pub use quizroom_room as room;

/// The types most applications need.
pub mod prelude {
    pub use crate::{QuizroomError, QuizroomServer, QuizroomServerBuilder, ServerConfig};
    pub use quizroom_protocol::{
        ClientEvent, Codec, ConnectionId, JsonCodec, RoomCode, ServerEvent,
    };
    pub use quizroom_room::{GameConfig, Question, QuestionBank, RoomError};
}
