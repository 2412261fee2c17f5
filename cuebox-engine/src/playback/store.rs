//! Playback state store
//!
//! Canonical map of cue id to `PlayingState`. Owned by the engine task; no
//! other component holds a reference to it. Accessors enforce the
//! one-state-per-cue rule: `insert` refuses to overwrite, so replacing a session
//! always means an explicit cleanup followed by a new insert.

use cuebox_common::CueId;
use std::collections::HashMap;

use crate::playback::state::PlayingState;

/// Violation found by `PlaybackStateStore::check_invariants`
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InvariantViolation {
    /// State is paused and producing audio at the same time
    PausedWhilePlaying(CueId),
    /// Playlist index outside the active order
    PlaylistIndexOutOfRange { cue_id: CueId, index: usize, len: usize },
    /// Listener token without a handle, or handle without a token
    DanglingListener(CueId),
    /// Fade direction recorded on a state with no handle
    FadeWithoutSound(CueId),
}

/// Map of tracked sessions
#[derive(Default)]
pub struct PlaybackStateStore {
    states: HashMap<CueId, PlayingState>,
}

impl PlaybackStateStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Track a new session
    ///
    /// Returns the state back as `Err` when the cue is already tracked.
    pub fn insert(&mut self, state: PlayingState) -> Result<&mut PlayingState, Box<PlayingState>> {
        use std::collections::hash_map::Entry;
        match self.states.entry(state.cue_id().clone()) {
            Entry::Occupied(_) => Err(Box::new(state)),
            Entry::Vacant(slot) => Ok(slot.insert(state)),
        }
    }

    pub fn get(&self, cue_id: &CueId) -> Option<&PlayingState> {
        self.states.get(cue_id)
    }

    pub fn get_mut(&mut self, cue_id: &CueId) -> Option<&mut PlayingState> {
        self.states.get_mut(cue_id)
    }

    pub fn remove(&mut self, cue_id: &CueId) -> Option<PlayingState> {
        self.states.remove(cue_id)
    }

    pub fn contains(&self, cue_id: &CueId) -> bool {
        self.states.contains_key(cue_id)
    }

    pub fn len(&self) -> usize {
        self.states.len()
    }

    pub fn is_empty(&self) -> bool {
        self.states.is_empty()
    }

    /// Tracked cue ids in a stable (sorted) order
    pub fn cue_ids(&self) -> Vec<CueId> {
        let mut ids: Vec<CueId> = self.states.keys().cloned().collect();
        ids.sort();
        ids
    }

    pub fn iter(&self) -> impl Iterator<Item = (&CueId, &PlayingState)> {
        self.states.iter()
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = (&CueId, &mut PlayingState)> {
        self.states.iter_mut()
    }

    /// Check every per-state invariant, returning all violations found
    pub fn check_invariants(&self) -> Vec<InvariantViolation> {
        let mut violations = Vec::new();
        for (cue_id, state) in &self.states {
            if state.is_paused && state.sound.as_ref().is_some_and(|s| s.playing()) {
                violations.push(InvariantViolation::PausedWhilePlaying(cue_id.clone()));
            }
            if let Some(playlist) = &state.playlist {
                let len = playlist.active_len();
                if playlist.current_index() >= len && len > 0 {
                    violations.push(InvariantViolation::PlaylistIndexOutOfRange {
                        cue_id: cue_id.clone(),
                        index: playlist.current_index(),
                        len,
                    });
                }
            }
            if state.sound.is_some() != state.listener_token.is_some() {
                violations.push(InvariantViolation::DanglingListener(cue_id.clone()));
            }
            if state.fade.is_some() && state.sound.is_none() && state.crossfade_info.is_none() {
                violations.push(InvariantViolation::FadeWithoutSound(cue_id.clone()));
            }
        }
        violations
    }
}
