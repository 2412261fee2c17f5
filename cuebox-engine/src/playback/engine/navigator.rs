//! Playlist navigator
//!
//! **End-of-item transitions** (`playlist_end`):
//! - error: full cleanup with unload, `PlaylistPlaybackError` reported
//! - repeat-one: park on the same item
//! - `stop_and_cue_next`: park on the next item; wrap when looping; delete
//!   the session at the end otherwise
//! - `play_through`: play the next item; wrap when looping; delete the session
//!   at the end otherwise. Skipped while a manual navigation is in flight.
//!
//! A parked ("cued") session keeps its state with no handle, is paused, and
//! resumes from the cued item on the next toggle or resume.

use cuebox_common::{CueId, PlaylistEndMode};
use tokio::time::Instant;
use tracing::{debug, info, warn};

use super::core::PlaybackEngine;
use crate::error::PlaybackError;
use crate::playback::playlist::{step_index, NavDirection};
use crate::playback::state::PlayingState;
use crate::playback::timers::TimerScope;

impl PlaybackEngine {
    /// Start the item at logical `index` of the session's active order
    pub(super) fn play_playlist_item(&mut self, cue_id: &CueId, index: usize) {
        let resolved = match self.store.get_mut(cue_id).and_then(|s| s.playlist.as_mut()) {
            None => {
                warn!("Cue '{}' has no playlist session", cue_id);
                return;
            }
            Some(playlist) if playlist.is_empty() => Err(PlaybackError::EmptyPlaylist),
            Some(playlist) => playlist.set_current_index(index).and_then(|_| {
                playlist
                    .current_item()
                    .cloned()
                    .ok_or(PlaybackError::InvalidPlaylistIndex {
                        index,
                        len: playlist.active_len(),
                    })
            }),
        };

        let item = match resolved {
            Ok(item) => item,
            Err(err) => {
                self.playlist_end(cue_id, Some(err));
                return;
            }
        };
        // Timers of the previous item must not reach the new handle
        self.timers.cancel_for_cue(cue_id, TimerScope::ALL);
        if let Some(state) = self.store.get_mut(cue_id) {
            state.fade = None;
            state.stop = Default::default();
        }
        debug!("Cue '{}' playing item {} ({})", cue_id, index, item.display_name());
        if let Err(err) = self.start_sound(cue_id, Some(&item)) {
            self.playlist_end(cue_id, Some(err));
        }
    }

    /// Item finished (or failed): choose the next transition
    pub(super) fn playlist_end(&mut self, cue_id: &CueId, error: Option<PlaybackError>) {
        if let Some(err) = error {
            self.fail_session(cue_id, err.into_playlist_error());
            return;
        }

        let Some(state) = self.store.get(cue_id) else {
            return;
        };
        let Some(playlist) = state.playlist.as_ref() else {
            return;
        };
        let current = playlist.current_index();
        let has_next = current + 1 < playlist.active_len();
        let wraps = state.cue().loop_playback;
        let repeat_one = state.cue().repeat_one;
        let end_mode = state.cue().playlist_end_mode;
        let is_navigating = state.is_navigating;

        if repeat_one {
            self.cue_item(cue_id, current, false);
            return;
        }

        match end_mode {
            PlaylistEndMode::StopAndCueNext => {
                if has_next {
                    self.cue_item(cue_id, current + 1, false);
                } else if wraps {
                    self.rewind_for_loop(cue_id);
                    self.cue_item(cue_id, 0, false);
                } else {
                    self.finish_session(cue_id, "playlist_ended_fully_no_loop_stop_mode");
                }
            }
            PlaylistEndMode::PlayThrough => {
                if is_navigating {
                    debug!("Ignoring end of item for '{}' during navigation", cue_id);
                    return;
                }
                if has_next {
                    self.play_playlist_item(cue_id, current + 1);
                } else if wraps {
                    self.rewind_for_loop(cue_id);
                    self.play_playlist_item(cue_id, 0);
                } else {
                    self.finish_session(cue_id, "playlist_ended_fully_no_loop");
                }
            }
        }
    }

    /// New shuffle pass that does not open with the item that just played
    fn rewind_for_loop(&mut self, cue_id: &CueId) {
        if let Some(playlist) = self.store.get_mut(cue_id).and_then(|s| s.playlist.as_mut()) {
            if playlist.is_shuffled() {
                let last = playlist.original_index(playlist.current_index());
                playlist.regenerate_shuffle(last);
                debug!("Regenerated shuffle order for '{}'", cue_id);
            }
        }
    }

    /// Park the session on `index` with no handle
    ///
    /// `by_navigation` marks a position chosen by navigate rather than by an
    /// end-of-item transition.
    pub(super) fn cue_item(&mut self, cue_id: &CueId, index: usize, by_navigation: bool) {
        self.timers.cancel_for_cue(cue_id, TimerScope::ALL);
        let Some(state) = self.store.get_mut(cue_id) else {
            return;
        };
        if let Some(mut sound) = state.take_sound() {
            sound.stop();
            sound.unload();
        }
        state.clear_transients();

        let resolved = match state.playlist.as_mut() {
            Some(playlist) => playlist
                .set_current_index(index)
                .map(|_| playlist.current_item().map(|i| i.display_name().to_string())),
            None => return,
        };
        let item_name = match resolved {
            Ok(Some(name)) => name,
            Ok(None) => {
                self.playlist_end(cue_id, Some(PlaybackError::EmptyPlaylist));
                return;
            }
            Err(err) => {
                self.playlist_end(cue_id, Some(err));
                return;
            }
        };

        let Some(state) = self.store.get_mut(cue_id) else {
            return;
        };
        state.mark_cued_next();
        if by_navigation {
            state.is_cued = true;
            state.is_cued_next = false;
        }
        let is_trigger = state.cue().is_ducking_trigger;

        if is_trigger {
            self.revert_ducking(cue_id);
        }
        info!("Cue '{}' cued on item {} ({})", cue_id, index, item_name);
        self.sync_ui(cue_id);
        self.report_cued(cue_id, &item_name);
        self.refresh_current_cue();
    }

    /// Debounced manual navigation; false when refused
    pub(super) fn navigate(&mut self, cue_id: &CueId, direction: NavDirection) -> bool {
        let now = Instant::now();
        if self
            .navigation_cooldown
            .get(cue_id)
            .is_some_and(|until| now < *until)
        {
            debug!("Navigation for '{}' debounced", cue_id);
            return false;
        }
        self.navigation_cooldown
            .insert(cue_id.clone(), now + self.config.navigation_debounce());

        if self.store.contains(cue_id) {
            return self.jump(cue_id, direction);
        }
        self.cue_from_memory(cue_id, direction)
    }

    /// Move a tracked playlist session one step
    ///
    /// A live session switches items; a parked one moves its cued position.
    pub(super) fn jump(&mut self, cue_id: &CueId, direction: NavDirection) -> bool {
        let Some(state) = self.store.get_mut(cue_id) else {
            return false;
        };
        let wraps = state.cue().loop_playback;
        let has_sound = state.has_sound();
        let Some(playlist) = state.playlist.as_mut() else {
            debug!("Cue '{}' is not a playlist; navigation refused", cue_id);
            return false;
        };

        let current = playlist.current_index();
        let Some(mut target) = playlist.step(current, direction, wraps) else {
            debug!("No {} item for '{}'", direction, cue_id);
            return false;
        };
        let wrapped_forward = direction == NavDirection::Next && target <= current;
        if wrapped_forward && playlist.is_shuffled() {
            let last = playlist.original_index(current);
            playlist.regenerate_shuffle(last);
            target = 0;
        }

        if !has_sound {
            self.cue_item(cue_id, target, true);
            return true;
        }

        info!("Navigating '{}' {} to item {}", cue_id, direction, target);
        state.is_navigating = true;
        if let Some(mut sound) = state.take_sound() {
            sound.stop();
            sound.unload();
        }
        state.fade = None;
        state.stop = Default::default();
        self.timers.cancel_for_cue(cue_id, TimerScope::ALL);
        self.play_playlist_item(cue_id, target);
        true
    }

    /// Cue a position for an untracked playlist from its remembered index
    fn cue_from_memory(&mut self, cue_id: &CueId, direction: NavDirection) -> bool {
        let Some(cue) = self.resolve_cue(cue_id) else {
            return false;
        };
        if !cue.is_playlist() || cue.playlist_items.is_empty() {
            debug!("Cue '{}' has no playlist to navigate", cue_id);
            return false;
        }

        let state = PlayingState::new(cue);
        let Some(len) = state.playlist.as_ref().map(|p| p.active_len()) else {
            return false;
        };
        let wraps = state.cue().loop_playback;
        let last = len - 1;
        let target = match self.last_known_index.get(cue_id) {
            Some(&remembered) => {
                let from = remembered.min(last);
                step_index(from, len, direction, wraps).unwrap_or(
                    match direction {
                        NavDirection::Next => last,
                        NavDirection::Previous => 0,
                    },
                )
            }
            None => match direction {
                NavDirection::Next => 0,
                NavDirection::Previous if wraps => last,
                NavDirection::Previous => 0,
            },
        };

        if let Err(rejected) = self.store.insert(state) {
            warn!("Cue '{}' is already tracked", rejected.cue_id());
            return false;
        }
        self.last_known_index.insert(cue_id.clone(), target);
        self.cue_item(cue_id, target, true);
        self.store.contains(cue_id)
    }
}
