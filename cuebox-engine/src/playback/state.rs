//! Per-cue playing state
//!
//! `PlayingState` is the engine's live session record for one tracked cue. It
//! exclusively owns the session's sound handle; every path that replaces or
//! clears the handle goes through `take_sound`/`attach_sound`, which detach
//! listeners first so a superseded handle can never mutate the new session.

use cuebox_common::{Cue, CueId};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tokio::time::Instant;

use crate::audio::{ListenerToken, SoundHandle};
use crate::playback::fade::{FadeDirection, FadeRamp};
use crate::playback::playlist::PlaylistState;

/// Who asked for a stop
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StopSource {
    User,
    Companion,
    Retrigger,
    Crossfade,
}

/// Why a cue was stopped; selects the status reason reported at cleanup
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StopReason {
    UserStop,
    StopAll,
    RetriggerStop,
    Crossfade,
    Restart,
}

impl StopReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            StopReason::UserStop => "user_stop",
            StopReason::StopAll => "stop_all",
            StopReason::RetriggerStop => "retrigger_stop",
            StopReason::Crossfade => "crossfade",
            StopReason::Restart => "restart",
        }
    }
}

impl std::fmt::Display for StopReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Stop bookkeeping carried through to terminal cleanup
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StopMetadata {
    pub stopping_with_fade: bool,
    pub source: Option<StopSource>,
    pub reason: Option<StopReason>,
}

/// Ducking bookkeeping
#[derive(Debug, Clone, PartialEq)]
pub struct DuckState {
    /// Trigger cue holding this duck (weak reference by id)
    pub trigger: CueId,
    /// Handle volume captured just before ducking
    pub volume_before_duck: Option<f32>,
    /// Volume the session was ramped down to
    pub ducked_volume: f32,
}

/// Fade-in request attached to a cue started by a crossfade
///
/// Attached before the handle exists; consumed when the handle is created.
#[derive(Debug, Clone, PartialEq)]
pub struct CrossfadeInfo {
    pub target_volume: f32,
    pub duration: Duration,
    pub started_at: Instant,
}

/// Live session record for one tracked cue
pub struct PlayingState {
    pub(crate) sound: Option<Box<dyn SoundHandle>>,
    pub(crate) listener_token: Option<ListenerToken>,
    pub(crate) cue: Cue,
    pub(crate) is_paused: bool,
    pub(crate) is_cued: bool,
    pub(crate) is_cued_next: bool,
    pub(crate) is_navigating: bool,
    pub(crate) fade: Option<FadeRamp>,
    pub(crate) duck: Option<DuckState>,
    pub(crate) original_volume: f32,
    pub(crate) playlist: Option<PlaylistState>,
    pub(crate) crossfade_info: Option<CrossfadeInfo>,
    pub(crate) stop: StopMetadata,
}

impl PlayingState {
    /// Fresh state for `cue`; playlist cues get an item snapshot
    pub fn new(cue: Cue) -> Self {
        let playlist = cue
            .is_playlist()
            .then(|| PlaylistState::new(cue.playlist_items.clone(), cue.shuffle));
        Self {
            sound: None,
            listener_token: None,
            original_volume: cue.base_volume(),
            cue,
            is_paused: false,
            is_cued: false,
            is_cued_next: false,
            is_navigating: false,
            fade: None,
            duck: None,
            playlist,
            crossfade_info: None,
            stop: StopMetadata::default(),
        }
    }

    pub fn cue_id(&self) -> &CueId {
        &self.cue.id
    }

    pub fn cue(&self) -> &Cue {
        &self.cue
    }

    pub fn is_playlist(&self) -> bool {
        self.playlist.is_some()
    }

    pub fn has_sound(&self) -> bool {
        self.sound.is_some()
    }

    pub fn is_paused(&self) -> bool {
        self.is_paused
    }

    /// Producing audio right now (never true while paused)
    pub fn is_playing(&self) -> bool {
        !self.is_paused && self.sound.as_ref().is_some_and(|s| s.playing())
    }

    /// Audible or paused with a live handle
    pub fn is_active(&self) -> bool {
        self.sound.is_some() && (self.is_paused || self.is_playing())
    }

    pub fn is_fading_in(&self) -> bool {
        self.fade.is_some_and(|f| f.direction == FadeDirection::In)
    }

    pub fn is_fading_out(&self) -> bool {
        self.fade.is_some_and(|f| f.direction == FadeDirection::Out)
    }

    pub fn is_ducked(&self) -> bool {
        self.duck.is_some()
    }

    pub fn ducking_trigger(&self) -> Option<&CueId> {
        self.duck.as_ref().map(|d| &d.trigger)
    }

    /// Current handle volume, or the configured baseline without a handle
    pub fn current_volume(&self) -> f32 {
        self.sound
            .as_ref()
            .map(|s| s.volume())
            .unwrap_or(self.original_volume)
    }

    /// Volume the session should sit at when not ramping
    pub fn resting_volume(&self) -> f32 {
        self.duck
            .as_ref()
            .map(|d| d.ducked_volume)
            .unwrap_or(self.original_volume)
    }

    /// Install a new handle, detaching whatever was there before
    pub(crate) fn attach_sound(&mut self, sound: Box<dyn SoundHandle>, token: ListenerToken) {
        if let Some(mut previous) = self.take_sound() {
            previous.stop();
        }
        self.sound = Some(sound);
        self.listener_token = Some(token);
    }

    /// Remove the handle with its listeners already detached
    pub(crate) fn take_sound(&mut self) -> Option<Box<dyn SoundHandle>> {
        self.listener_token = None;
        self.sound.take().map(|mut sound| {
            sound.detach_listeners();
            sound
        })
    }

    /// Record a ramp; replaces any ramp in the other direction
    pub(crate) fn begin_fade(&mut self, ramp: FadeRamp) {
        self.fade = Some(ramp);
    }

    /// Reset fade, duck, crossfade and stop bookkeeping to neutral
    pub(crate) fn clear_transients(&mut self) {
        self.fade = None;
        self.duck = None;
        self.crossfade_info = None;
        self.stop = StopMetadata::default();
        self.is_navigating = false;
    }

    /// Park the session on a pre-selected item with no handle
    pub(crate) fn mark_cued_next(&mut self) {
        self.is_paused = true;
        self.is_cued_next = true;
        self.is_cued = false;
        self.fade = None;
        self.stop = StopMetadata::default();
    }
}

impl std::fmt::Debug for PlayingState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PlayingState")
            .field("cue_id", &self.cue.id)
            .field("has_sound", &self.sound.is_some())
            .field("is_paused", &self.is_paused)
            .field("is_cued", &self.is_cued)
            .field("is_cued_next", &self.is_cued_next)
            .field("is_navigating", &self.is_navigating)
            .field("fade", &self.fade)
            .field("duck", &self.duck)
            .field(
                "current_index",
                &self.playlist.as_ref().map(|p| p.current_index()),
            )
            .finish()
    }
}
