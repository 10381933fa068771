//! Debounced deletion of rooms that went empty.
//!
//! A room that loses its last player is not deleted straight away: the
//! scheduler arms a timer for the grace period, and only if the timer
//! survives (nobody joined and cancelled it, nobody re-armed it) is the
//! room code handed to the reaper. The reaper asks the store to remove
//! the room *if it is still empty*, so a join racing the timer wins.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use quizroom_protocol::RoomCode;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use crate::SharedRoomStore;

struct Pending {
    ticket: u64,
    task: JoinHandle<()>,
}

struct Inner {
    grace: Duration,
    pending: Mutex<HashMap<RoomCode, Pending>>,
    next_ticket: AtomicU64,
    expired: mpsc::UnboundedSender<RoomCode>,
}

impl Inner {
    fn pending(&self) -> MutexGuard<'_, HashMap<RoomCode, Pending>> {
        // The map holds no invariant a panicking holder could break.
        self.pending.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

/// One pending timer per room code, at most.
///
/// Cheap to clone; every room actor holds one.
#[derive(Clone)]
pub struct CleanupScheduler {
    inner: Arc<Inner>,
}

impl CleanupScheduler {
    /// Creates a scheduler and the receiving end its expired codes are
    /// delivered on. Pass the receiver to [`run_reaper`].
    pub fn new(grace: Duration) -> (Self, mpsc::UnboundedReceiver<RoomCode>) {
        let (tx, rx) = mpsc::unbounded_channel();
        let scheduler = Self {
            inner: Arc::new(Inner {
                grace,
                pending: Mutex::new(HashMap::new()),
                next_ticket: AtomicU64::new(1),
                expired: tx,
            }),
        };
        (scheduler, rx)
    }

    pub fn grace(&self) -> Duration {
        self.inner.grace
    }

    /// Arms the timer for `code`, replacing any timer already pending.
    ///
    /// Must be called from within a Tokio runtime.
    pub fn schedule(&self, code: &RoomCode) {
        let ticket = self.inner.next_ticket.fetch_add(1, Ordering::Relaxed);
        let inner = Arc::clone(&self.inner);
        let fired = code.clone();

        // Held across the spawn so the task cannot look for its ticket
        // before it is recorded.
        let mut pending = self.inner.pending();
        let task = tokio::spawn(async move {
            tokio::time::sleep(inner.grace).await;
            let mut pending = inner.pending();
            if pending.get(&fired).is_some_and(|p| p.ticket == ticket) {
                pending.remove(&fired);
                drop(pending);
                tracing::debug!(room_id = %fired, "cleanup timer fired");
                let _ = inner.expired.send(fired);
            }
        });
        let previous = pending.insert(code.clone(), Pending { ticket, task });
        drop(pending);

        if let Some(previous) = previous {
            previous.task.abort();
            tracing::debug!(room_id = %code, "cleanup timer re-armed");
        } else {
            tracing::debug!(room_id = %code, grace = ?self.inner.grace, "cleanup timer armed");
        }
    }

    /// Disarms the timer for `code`. No-op if none is pending.
    pub fn cancel(&self, code: &RoomCode) {
        if let Some(previous) = self.inner.pending().remove(code) {
            previous.task.abort();
            tracing::debug!(room_id = %code, "cleanup timer cancelled");
        }
    }

    /// Disarms every pending timer.
    pub fn clear_all(&self) {
        let drained: Vec<Pending> = self.inner.pending().drain().map(|(_, p)| p).collect();
        for pending in &drained {
            pending.task.abort();
        }
        tracing::info!(count = drained.len(), "cleanup timers cleared");
    }

    pub fn is_pending(&self, code: &RoomCode) -> bool {
        self.inner.pending().contains_key(code)
    }

    pub fn pending_count(&self) -> usize {
        self.inner.pending().len()
    }
}

/// Deletes rooms whose cleanup timer expired, if they are still empty.
///
/// Runs until every [`CleanupScheduler`] clone has been dropped; servers
/// usually abort it at shutdown instead.
pub async fn run_reaper(store: SharedRoomStore, mut expired: mpsc::UnboundedReceiver<RoomCode>) {
    while let Some(code) = expired.recv().await {
        let removed = store.lock().await.remove_if_empty(&code).await;
        if removed {
            tracing::info!(room_id = %code, "empty room deleted");
        } else {
            tracing::debug!(room_id = %code, "room no longer empty, kept");
        }
    }
}
