//! What a [`Room`](crate::Room) asks its actor to do after a state change.

use std::time::Duration;

use quizroom_protocol::{ConnectionId, ServerEvent};

/// Who an outbound event is for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Recipient {
    /// Every player with a live connection in the room.
    Online,
    /// One connection only.
    Connection(ConnectionId),
}

/// A side effect produced by a room operation.
#[derive(Debug, Clone, PartialEq)]
pub enum Effect {
    /// Push an event.
    Send { to: Recipient, event: ServerEvent },

    /// Deliver `alarm` back to the room after `after` has elapsed.
    Schedule { alarm: Alarm, after: Duration },

    /// The room just became empty: arm (or re-arm) its cleanup timer.
    ScheduleCleanup,

    /// Someone is present: disarm any pending cleanup timer.
    CancelCleanup,
}

impl Effect {
    pub(crate) fn send(to: Recipient, event: ServerEvent) -> Self {
        Self::Send { to, event }
    }
}

/// A timer firing, as a message to the room.
///
/// `generation` is the room's generation when the alarm was armed. The
/// room ignores any alarm whose generation is no longer current.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Alarm {
    pub generation: u64,
    pub kind: AlarmKind,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AlarmKind {
    /// The intro (or results) pause is over: open the next question.
    OpenQuestion,
    /// The question's time limit ran out.
    CloseQuestion,
    /// The results pause is over: next question or end of match.
    AfterResults,
}
