//! `QuizroomServer` builder and server loop.
//!
//! This is the entry point for running a Quizroom server. It ties
//! together all the layers: transport → protocol → room store.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use quizroom_protocol::{Codec, JsonCodec};
use quizroom_room::{
    CleanupScheduler, QuestionBank, RoomServices, RoomStore, SharedRoomStore, run_reaper,
};
use quizroom_transport::{Transport, WebSocketTransport};
use tokio::task::JoinHandle;

use crate::handler::handle_connection;
use crate::{QuizroomError, ServerConfig};

/// Shared server state passed to each connection handler task.
pub(crate) struct ServerState<C: Codec> {
    pub(crate) store: SharedRoomStore,
    pub(crate) codec: C,
    pub(crate) idle_timeout: Option<Duration>,
}

/// Builder for configuring and starting a Quizroom server.
///
/// # Example
///
/// ```rust,ignore
/// use quizroom::prelude::*;
///
/// let server = QuizroomServer::builder()
///     .config(ServerConfig::load("quizroom.toml"))
///     .build()
///     .await?;
/// server.run().await
/// ```
pub struct QuizroomServerBuilder {
    config: ServerConfig,
    bank: Option<QuestionBank>,
}

impl QuizroomServerBuilder {
    /// Creates a new builder with default settings.
    pub fn new() -> Self {
        Self {
            config: ServerConfig::default(),
            bank: None,
        }
    }

    /// Replaces the whole configuration.
    pub fn config(mut self, config: ServerConfig) -> Self {
        self.config = config;
        self
    }

    /// Sets the address to bind the server to.
    pub fn bind(mut self, addr: &str) -> Self {
        self.config.bind_addr = addr.to_string();
        self
    }

    /// Uses `bank` instead of loading `config.question_bank`.
    pub fn question_bank(mut self, bank: QuestionBank) -> Self {
        self.bank = Some(bank);
        self
    }

    /// Validates the configuration, binds the listener and starts the
    /// cleanup reaper.
    ///
    /// Uses `JsonCodec` and `WebSocketTransport`.
    pub async fn build(self) -> Result<QuizroomServer<JsonCodec>, QuizroomError> {
        self.config.validate()?;
        let bank = match self.bank {
            Some(bank) => bank,
            None => self.config.load_question_bank()?,
        };

        let transport = WebSocketTransport::bind(&self.config.bind_addr).await?;

        let (cleanup, expired) = CleanupScheduler::new(self.config.cleanup_grace());
        let store = RoomStore::new(RoomServices {
            bank: Arc::new(bank),
            config: self.config.game.clone(),
            cleanup,
        })
        .shared();
        let reaper = tokio::spawn(run_reaper(Arc::clone(&store), expired));

        let state = Arc::new(ServerState {
            store,
            codec: JsonCodec,
            idle_timeout: self.config.idle_timeout(),
        });

        Ok(QuizroomServer {
            transport,
            state,
            reaper,
        })
    }
}

impl Default for QuizroomServerBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// A bound Quizroom server.
///
/// Call [`run()`](Self::run) to start accepting connections.
pub struct QuizroomServer<C: Codec> {
    transport: WebSocketTransport,
    state: Arc<ServerState<C>>,
    reaper: JoinHandle<()>,
}

impl QuizroomServer<JsonCodec> {
    /// Creates a new builder.
    pub fn builder() -> QuizroomServerBuilder {
        QuizroomServerBuilder::new()
    }
}

impl<C: Codec> QuizroomServer<C> {
    /// Returns the local address the server is bound to.
    pub fn local_addr(&self) -> std::io::Result<std::net::SocketAddr> {
        self.transport.local_addr()
    }

    /// The room store, e.g. to pre-create rooms.
    pub fn store(&self) -> SharedRoomStore {
        Arc::clone(&self.state.store)
    }

    /// Runs the accept loop until Ctrl-C.
    pub async fn run(self) -> Result<(), QuizroomError> {
        self.run_until(async {
            if let Err(e) = tokio::signal::ctrl_c().await {
                tracing::error!(error = %e, "failed to listen for Ctrl-C");
                std::future::pending::<()>().await;
            }
        })
        .await
    }

    /// Runs the accept loop until `shutdown` completes, then disarms every
    /// cleanup timer and shuts all rooms down.
    pub async fn run_until(mut self, shutdown: impl Future<Output = ()>) -> Result<(), QuizroomError> {
        tracing::info!("quizroom server running");
        tokio::pin!(shutdown);

        loop {
            tokio::select! {
                accepted = self.transport.accept() => match accepted {
                    Ok(conn) => {
                        let state = Arc::clone(&self.state);
                        tokio::spawn(async move {
                            if let Err(e) = handle_connection(conn, state).await {
                                tracing::debug!(error = %e, "connection ended with error");
                            }
                        });
                    }
                    Err(e) => {
                        tracing::error!(error = %e, "accept failed");
                    }
                },
                () = &mut shutdown => break,
            }
        }

        tracing::info!("shutting down");
        self.state.store.lock().await.shutdown_all().await;
        self.reaper.abort();
        Ok(())
    }
}
