//! Timer registry
//!
//! Every delayed action the engine schedules (settle delay, stop-after-fade,
//! crossfade safety stop, crossfade progress ticks) is a tokio task that sleeps
//! and then posts `EngineMessage::Timer` back to the engine channel. The
//! registry keeps an abort handle per live timer, keyed by the cue it belongs
//! to, so cleanup can cancel everything a session owns before the session is
//! deleted or its handle replaced.
//!
//! A cancelled timer may already have posted its message. `take_fired`
//! filters those: only timers still registered are allowed to run.

use cuebox_common::CueId;
use std::collections::HashMap;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::AbortHandle;
use tracing::trace;

use crate::playback::messages::{EngineMessage, TimerId, TimerKind};

struct ActiveTimer {
    cue_id: CueId,
    kind: TimerKind,
    abort: AbortHandle,
}

/// Which session timers a cancellation applies to
///
/// Restart barriers are never covered; only `cancel_kind` removes them.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimerScope {
    pub intervals: bool,
    pub timers: bool,
}

impl TimerScope {
    pub const ALL: TimerScope = TimerScope {
        intervals: true,
        timers: true,
    };

    fn covers(&self, kind: &TimerKind) -> bool {
        if !kind.is_session_timer() {
            false
        } else if kind.is_interval() {
            self.intervals
        } else {
            self.timers
        }
    }
}

pub(crate) struct TimerRegistry {
    tx: mpsc::UnboundedSender<EngineMessage>,
    next_id: u64,
    active: HashMap<TimerId, ActiveTimer>,
}

impl TimerRegistry {
    pub(crate) fn new(tx: mpsc::UnboundedSender<EngineMessage>) -> Self {
        Self {
            tx,
            next_id: 0,
            active: HashMap::new(),
        }
    }

    /// Post a `Timer` message for `cue_id` after `delay`
    pub(crate) fn schedule(&mut self, cue_id: &CueId, kind: TimerKind, delay: Duration) -> TimerId {
        self.next_id += 1;
        let id = TimerId(self.next_id);
        let tx = self.tx.clone();
        let message_cue = cue_id.clone();
        let message_kind = kind.clone();
        let task = tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            let _ = tx.send(EngineMessage::Timer {
                id,
                cue_id: message_cue,
                kind: message_kind,
            });
        });
        trace!("Scheduled {:?} for {} in {:?} ({:?})", kind, cue_id, delay, id);
        self.active.insert(
            id,
            ActiveTimer {
                cue_id: cue_id.clone(),
                kind,
                abort: task.abort_handle(),
            },
        );
        id
    }

    pub(crate) fn cancel(&mut self, id: TimerId) -> bool {
        match self.active.remove(&id) {
            Some(timer) => {
                timer.abort.abort();
                true
            }
            None => false,
        }
    }

    /// Cancel the cue's timers within `scope`; returns how many were live
    pub(crate) fn cancel_for_cue(&mut self, cue_id: &CueId, scope: TimerScope) -> usize {
        let ids: Vec<TimerId> = self
            .active
            .iter()
            .filter(|(_, t)| &t.cue_id == cue_id && scope.covers(&t.kind))
            .map(|(id, _)| *id)
            .collect();
        for id in &ids {
            self.cancel(*id);
        }
        ids.len()
    }

    /// Cancel the cue's timers of one kind
    pub(crate) fn cancel_kind(&mut self, cue_id: &CueId, kind: &TimerKind) -> usize {
        let ids: Vec<TimerId> = self
            .active
            .iter()
            .filter(|(_, t)| &t.cue_id == cue_id && std::mem::discriminant(&t.kind) == std::mem::discriminant(kind))
            .map(|(id, _)| *id)
            .collect();
        for id in &ids {
            self.cancel(*id);
        }
        ids.len()
    }

    /// Claim a fired timer; false when it was cancelled after posting
    pub(crate) fn take_fired(&mut self, id: TimerId) -> bool {
        self.active.remove(&id).is_some()
    }

    pub(crate) fn count_for(&self, cue_id: &CueId) -> usize {
        self.active.values().filter(|t| &t.cue_id == cue_id).count()
    }

    pub(crate) fn cancel_all(&mut self) {
        for (_, timer) in self.active.drain() {
            timer.abort.abort();
        }
    }
}
