//! The per-room match state machine.
//!
//! ```text
//! Idle ─start→ Intro ─OpenQuestion→ AwaitingAnswers(i) ─close→ ShowingResults(i)
//!                                          ↑                        │
//!                                          └──── AfterResults ──────┤
//!                                                                   └→ Ended → Idle
//! ```
//!
//! `Idle` and `Ended` are not phases: `Idle` is `Room::game == None`, and
//! `Ended` is the moment the final ranking goes out, just before the
//! room resets to idle.
//!
//! A question closes on whichever comes first: every online player has
//! answered, or its [`AlarmKind::CloseQuestion`] fires. Every transition
//! bumps the room generation so the loser of that race is dropped as stale.

use std::collections::HashMap;
use std::fmt;

use quizroom_protocol::{ConnectionId, PlayerOutcome, PlayerScore, QuestionPrompt, ServerEvent};
use tokio::time::Instant;
use tracing::{debug, info};

use crate::{Alarm, AlarmKind, Effect, Question, Recipient, Room, RoomError};

/// Where a running match is.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    /// `gameStarted` has gone out; the first question opens after the
    /// start delay.
    Intro,
    /// The current question is open for answers.
    AwaitingAnswers,
    /// The current question's results are on screen.
    ShowingResults,
}

impl Phase {
    /// Returns `true` if answers are accepted.
    pub fn is_accepting_answers(&self) -> bool {
        matches!(self, Self::AwaitingAnswers)
    }

    /// The phase an alarm of `kind` expects to find.
    fn expected_by(kind: AlarmKind) -> Self {
        match kind {
            AlarmKind::OpenQuestion => Self::Intro,
            AlarmKind::CloseQuestion => Self::AwaitingAnswers,
            AlarmKind::AfterResults => Self::ShowingResults,
        }
    }
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Intro => write!(f, "Intro"),
            Self::AwaitingAnswers => write!(f, "AwaitingAnswers"),
            Self::ShowingResults => write!(f, "ShowingResults"),
        }
    }
}

/// One player's answer to one question. Correctness is fixed when the
/// answer is recorded.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AnswerRecord {
    pub answer_index: usize,
    pub time_remaining: f64,
    pub correct: bool,
}

/// State of a running match.
#[derive(Debug, Clone)]
pub struct GameState {
    questions: Vec<Question>,
    index: usize,
    phase: Phase,
    /// Answers to the current question only; cleared when the next opens.
    pub(crate) answers: HashMap<ConnectionId, AnswerRecord>,
    opened_at: Option<Instant>,
}

impl GameState {
    pub(crate) fn new(questions: Vec<Question>) -> Self {
        Self {
            questions,
            index: 0,
            phase: Phase::Intro,
            answers: HashMap::new(),
            opened_at: None,
        }
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    /// Zero-based index of the current question.
    pub fn index(&self) -> usize {
        self.index
    }

    pub fn total_questions(&self) -> usize {
        self.questions.len()
    }

    pub fn current_question(&self) -> Option<&Question> {
        self.questions.get(self.index)
    }

    pub fn answer(&self, conn: ConnectionId) -> Option<&AnswerRecord> {
        self.answers.get(&conn)
    }

    fn is_last_question(&self) -> bool {
        self.index + 1 >= self.questions.len()
    }
}

impl Room {
    /// Starts a match. Host only, and only from idle.
    pub fn start(&mut self, conn: ConnectionId) -> Result<Vec<Effect>, RoomError> {
        if self.host != Some(conn) {
            return Err(RoomError::NotHost);
        }
        if self.has_started() {
            return Err(RoomError::MatchAlreadyStarted);
        }
        let questions = self
            .bank
            .draw(self.config.questions_per_game, &self.config.category);
        if questions.is_empty() {
            return Err(RoomError::NoQuestionsAvailable(self.config.category.clone()));
        }

        info!(
            room_id = %self.code,
            questions = questions.len(),
            players = self.seats.len(),
            "game started"
        );
        self.game = Some(GameState::new(questions));
        let generation = self.next_generation();
        Ok(vec![
            Effect::send(Recipient::Online, ServerEvent::GameStarted),
            Effect::Schedule {
                alarm: Alarm {
                    generation,
                    kind: AlarmKind::OpenQuestion,
                },
                after: self.config.start_delay(),
            },
        ])
    }

    /// Records `conn`'s answer to the open question and acknowledges it
    /// privately. Closes the question early once every online player has
    /// answered.
    pub fn submit_answer(
        &mut self,
        conn: ConnectionId,
        answer_index: usize,
        time_remaining: f64,
    ) -> Result<Vec<Effect>, RoomError> {
        if self.seat_index(conn).is_none() {
            return Err(RoomError::NotInRoom);
        }
        let game = self
            .game
            .as_mut()
            .filter(|game| game.phase.is_accepting_answers())
            .ok_or(RoomError::NoActiveQuestion)?;
        if game.answers.contains_key(&conn) {
            return Err(RoomError::DuplicateAnswer);
        }
        let question = game
            .current_question()
            .ok_or(RoomError::NoActiveQuestion)?;

        let correct = question.is_correct(answer_index);
        game.answers.insert(
            conn,
            AnswerRecord {
                answer_index,
                time_remaining,
                correct,
            },
        );
        debug!(room_id = %self.code, %conn, answer_index, correct, "answer recorded");

        let mut effects = vec![Effect::send(
            Recipient::Connection(conn),
            ServerEvent::AnswerSubmitted {
                is_correct: correct,
                answer_index,
            },
        )];
        self.close_if_all_answered(&mut effects);
        Ok(effects)
    }

    /// Handles a timer firing. Alarms from an earlier generation, or that
    /// find the match in a different phase, are dropped.
    pub fn on_alarm(&mut self, alarm: Alarm) -> Vec<Effect> {
        let phase = self.game.as_ref().map(GameState::phase);
        if alarm.generation != self.generation || phase != Some(Phase::expected_by(alarm.kind)) {
            debug!(
                room_id = %self.code,
                ?alarm,
                current = self.generation,
                "stale alarm dropped"
            );
            return Vec::new();
        }

        let mut effects = Vec::new();
        match alarm.kind {
            AlarmKind::OpenQuestion => self.open_question(&mut effects),
            AlarmKind::CloseQuestion => self.close_question(&mut effects),
            AlarmKind::AfterResults => self.after_results(&mut effects),
        }
        effects
    }

    /// The open question as a late joiner should see it, with the time
    /// limit replaced by the whole seconds left.
    pub(crate) fn open_question_prompt(&self) -> Option<QuestionPrompt> {
        let game = self.game.as_ref()?;
        if !game.phase.is_accepting_answers() {
            return None;
        }
        let question = game.current_question()?;
        let elapsed = game
            .opened_at
            .map(|at| at.elapsed().as_secs_f64())
            .unwrap_or_default();
        let remaining = (self.config.time_limit_secs as f64 - elapsed).max(0.0).ceil() as u64;
        Some(question.prompt(game.index + 1, game.total_questions(), remaining))
    }

    /// Closes the open question if every online player has answered it.
    pub(crate) fn close_if_all_answered(&mut self, effects: &mut Vec<Effect>) {
        let Some(game) = self.game.as_ref() else {
            return;
        };
        if !game.phase.is_accepting_answers() {
            return;
        }
        let mut online = self.seats.iter().filter(|seat| seat.record.online).peekable();
        if online.peek().is_none() {
            return;
        }
        if online.all(|seat| game.answers.contains_key(&seat.conn)) {
            debug!(room_id = %self.code, "all online players answered");
            self.close_question(effects);
        }
    }

    fn open_question(&mut self, effects: &mut Vec<Effect>) {
        let time_limit = self.config.time_limit_secs;
        let Some(game) = self.game.as_mut() else {
            return;
        };
        game.phase = Phase::AwaitingAnswers;
        game.answers.clear();
        game.opened_at = Some(Instant::now());
        let Some(question) = game.current_question() else {
            return;
        };
        let prompt = question.prompt(game.index + 1, game.total_questions(), time_limit);
        debug!(room_id = %self.code, question = prompt.question_number, "question opened");

        let generation = self.next_generation();
        effects.push(Effect::send(
            Recipient::Online,
            ServerEvent::NewQuestion(prompt),
        ));
        effects.push(Effect::Schedule {
            alarm: Alarm {
                generation,
                kind: AlarmKind::CloseQuestion,
            },
            after: self.config.time_limit(),
        });
    }

    fn close_question(&mut self, effects: &mut Vec<Effect>) {
        let Some(game) = self.game.as_mut() else {
            return;
        };
        game.phase = Phase::ShowingResults;
        let Some(question) = game.current_question() else {
            return;
        };
        let correct_answer = question.correct_answer;
        let explanation = question.explanation.clone();

        let mut results = Vec::with_capacity(self.seats.len());
        for seat in &mut self.seats {
            let answer = game.answers.get(&seat.conn);
            let correct = answer.is_some_and(|a| a.correct);
            let points = match answer {
                Some(a) if a.correct => self.config.award(a.time_remaining),
                _ => 0,
            };
            seat.record.score = seat.record.score.saturating_add(points);
            results.push(PlayerOutcome {
                id: seat.conn,
                name: seat.record.name.clone(),
                correct,
                points,
                answered: answer.is_some(),
            });
        }
        debug!(
            room_id = %self.code,
            question = game.index + 1,
            answered = game.answers.len(),
            "question closed"
        );

        let generation = self.next_generation();
        effects.push(Effect::send(
            Recipient::Online,
            ServerEvent::QuestionResult {
                correct_answer,
                explanation,
                results,
                scores: self.scoreboard(),
            },
        ));
        effects.push(Effect::Schedule {
            alarm: Alarm {
                generation,
                kind: AlarmKind::AfterResults,
            },
            after: self.config.results_delay(),
        });
    }

    fn after_results(&mut self, effects: &mut Vec<Effect>) {
        let Some(game) = self.game.as_mut() else {
            return;
        };
        if game.is_last_question() {
            self.finish(effects);
        } else {
            game.index += 1;
            self.open_question(effects);
        }
    }

    /// Ranks players, announces the winner, and resets to a fresh lobby.
    fn finish(&mut self, effects: &mut Vec<Effect>) {
        let mut ranked: Vec<PlayerScore> = self.scoreboard();
        // Stable: ties keep seat order.
        ranked.sort_by(|a, b| b.score.cmp(&a.score));
        let winner = ranked.first().cloned();
        info!(
            room_id = %self.code,
            winner = winner.as_ref().map(|w| w.name.as_str()),
            "game ended"
        );

        effects.push(Effect::send(
            Recipient::Online,
            ServerEvent::GameEnded {
                final_scores: ranked,
                winner,
            },
        ));

        self.game = None;
        for seat in &mut self.seats {
            seat.record.score = 0;
        }
        self.next_generation();
        self.push_room_updates(effects);
    }
}
