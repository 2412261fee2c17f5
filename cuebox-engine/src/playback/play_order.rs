//! Play order tracking
//!
//! Ordered, duplicate-free list of cue ids, most recently started first. The
//! "current priority cue" is the first entry whose session is still audible or
//! paused with a live handle; merely being tracked is not enough.

use cuebox_common::CueId;

use crate::playback::store::PlaybackStateStore;

#[derive(Debug, Default)]
pub struct PlayOrderTracker {
    order: Vec<CueId>,
    /// Last value reported to the control surface
    reported: Option<CueId>,
}

impl PlayOrderTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Move `cue_id` to the front
    pub fn add(&mut self, cue_id: &CueId) {
        self.order.retain(|id| id != cue_id);
        self.order.insert(0, cue_id.clone());
    }

    pub fn remove(&mut self, cue_id: &CueId) {
        self.order.retain(|id| id != cue_id);
    }

    pub fn contains(&self, cue_id: &CueId) -> bool {
        self.order.contains(cue_id)
    }

    pub fn as_slice(&self) -> &[CueId] {
        &self.order
    }

    /// First tracked cue that is audible or paused
    pub fn priority_cue(&self, store: &PlaybackStateStore) -> Option<CueId> {
        self.order
            .iter()
            .find(|id| store.get(id).is_some_and(|s| s.is_active()))
            .cloned()
    }

    /// Recompute the priority cue
    ///
    /// Returns `Some(new_value)` only when it differs from the last report.
    pub fn refresh(&mut self, store: &PlaybackStateStore) -> Option<Option<CueId>> {
        let current = self.priority_cue(store);
        if current == self.reported {
            return None;
        }
        self.reported = current.clone();
        Some(current)
    }

    pub fn reported(&self) -> Option<&CueId> {
        self.reported.as_ref()
    }
}
