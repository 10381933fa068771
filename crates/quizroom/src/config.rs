//! Server configuration, loaded from a TOML file plus environment
//! overrides.

use std::path::{Path, PathBuf};
use std::time::Duration;

use quizroom_room::{GameConfig, QuestionBank};
use serde::{Deserialize, Serialize};

use crate::QuizroomError;

/// Top-level server configuration, usually loaded from `quizroom.toml`.
///
/// ```toml
/// bind_addr = "0.0.0.0:3000"
/// cleanup_grace_secs = 10
/// question_bank = "questions.json"
///
/// [game]
/// questions_per_game = 10
/// time_limit_secs = 20
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub bind_addr: String,
    /// How long an empty room survives before it is deleted.
    pub cleanup_grace_secs: u64,
    /// Close connections that send nothing for this long. 0 disables.
    pub idle_timeout_secs: u64,
    /// JSON question bank to load at startup.
    pub question_bank: Option<PathBuf>,
    pub game: GameConfig,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_addr: "127.0.0.1:3000".to_string(),
            cleanup_grace_secs: 10,
            idle_timeout_secs: 600,
            question_bank: None,
            game: GameConfig::default(),
        }
    }
}

impl ServerConfig {
    /// Loads `path` if it exists, then applies environment overrides.
    ///
    /// A missing or malformed file is logged and replaced by defaults.
    pub fn load(path: impl AsRef<Path>) -> Self {
        let path = path.as_ref();
        let mut config = match std::fs::read_to_string(path) {
            Ok(content) => match Self::from_toml(&content) {
                Ok(config) => {
                    tracing::info!(path = %path.display(), "loaded configuration");
                    config
                }
                Err(e) => {
                    tracing::warn!(path = %path.display(), error = %e, "failed to parse config, using defaults");
                    Self::default()
                }
            },
            Err(_) => {
                tracing::info!(path = %path.display(), "no config file found, using defaults");
                Self::default()
            }
        };
        config.apply_env(|key| std::env::var(key).ok());
        config
    }

    /// Parses a TOML document. Absent fields keep their defaults.
    pub fn from_toml(content: &str) -> Result<Self, QuizroomError> {
        toml::from_str(content).map_err(|e| QuizroomError::Config(e.to_string()))
    }

    /// Applies overrides looked up through `lookup`:
    ///
    /// - `QUIZROOM_BIND_ADDR`: full bind address
    /// - `PORT`: binds `0.0.0.0:$PORT` (ignored if `QUIZROOM_BIND_ADDR` is set)
    /// - `QUIZROOM_CLEANUP_GRACE_SECS`
    /// - `QUIZROOM_QUESTION_BANK`: path to the JSON bank
    ///
    /// Empty or unparsable values are ignored.
    pub fn apply_env(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        let var = |key: &str| lookup(key).filter(|value| !value.is_empty());

        if let Some(addr) = var("QUIZROOM_BIND_ADDR") {
            self.bind_addr = addr;
        } else if let Some(port) = var("PORT").and_then(|p| p.parse::<u16>().ok()) {
            self.bind_addr = format!("0.0.0.0:{port}");
        }
        if let Some(secs) = var("QUIZROOM_CLEANUP_GRACE_SECS").and_then(|s| s.parse().ok()) {
            self.cleanup_grace_secs = secs;
        }
        if let Some(path) = var("QUIZROOM_QUESTION_BANK") {
            self.question_bank = Some(PathBuf::from(path));
        }
    }

    /// Rejects settings a match cannot run with.
    pub fn validate(&self) -> Result<(), QuizroomError> {
        if self.bind_addr.parse::<std::net::SocketAddr>().is_err() {
            return Err(QuizroomError::Config(format!(
                "bind_addr {:?} is not a socket address",
                self.bind_addr
            )));
        }
        if self.game.time_limit_secs == 0 {
            return Err(QuizroomError::Config("game.time_limit_secs must be > 0".into()));
        }
        if self.game.questions_per_game == 0 {
            return Err(QuizroomError::Config("game.questions_per_game must be > 0".into()));
        }
        Ok(())
    }

    pub fn cleanup_grace(&self) -> Duration {
        Duration::from_secs(self.cleanup_grace_secs)
    }

    /// `None` when idle connections are never closed.
    pub fn idle_timeout(&self) -> Option<Duration> {
        (self.idle_timeout_secs > 0).then(|| Duration::from_secs(self.idle_timeout_secs))
    }

    /// Loads the configured question bank, or an empty one if none is set.
    pub fn load_question_bank(&self) -> Result<QuestionBank, QuizroomError> {
        match &self.question_bank {
            Some(path) => {
                let bank = QuestionBank::from_path(path)?;
                tracing::info!(
                    path = %path.display(),
                    categories = ?bank.categories(),
                    "question bank loaded"
                );
                Ok(bank)
            }
            None => {
                tracing::warn!("no question bank configured; matches cannot start");
                Ok(QuestionBank::new())
            }
        }
    }
}
