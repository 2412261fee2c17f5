//! Resource cleanup and terminal transitions

use cuebox_common::events::{PlaybackStatus, StatusDetails};
use cuebox_common::CueId;
use tracing::{debug, info};

use super::core::PlaybackEngine;
use crate::error::PlaybackError;
use crate::playback::timers::TimerScope;

/// What `cleanup` tears down
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct CleanupOptions {
    /// Release the handle's media after stopping it
    pub force_unload: bool,
    pub clear_intervals: bool,
    pub clear_timers: bool,
    /// Remove the state from the store and the play order
    pub clear_state: bool,
}

impl CleanupOptions {
    /// Everything except unloading
    pub(crate) fn terminal() -> Self {
        Self {
            force_unload: false,
            clear_intervals: true,
            clear_timers: true,
            clear_state: true,
        }
    }

    pub(crate) fn force_unload(mut self) -> Self {
        self.force_unload = true;
        self
    }
}

impl PlaybackEngine {
    /// Cancel timers, release the handle and reset transient flags
    pub(super) fn cleanup(&mut self, cue_id: &CueId, options: CleanupOptions) {
        let cancelled = self.timers.cancel_for_cue(
            cue_id,
            TimerScope {
                intervals: options.clear_intervals,
                timers: options.clear_timers,
            },
        );

        if let Some(state) = self.store.get_mut(cue_id) {
            if let Some(mut sound) = state.take_sound() {
                sound.stop();
                if options.force_unload {
                    sound.unload();
                }
            }
            state.clear_transients();
            state.is_paused = false;
        }

        if options.clear_state {
            if let Some(state) = self.store.remove(cue_id) {
                if let Some(playlist) = &state.playlist {
                    self.last_known_index
                        .insert(cue_id.clone(), playlist.current_index());
                }
            }
            self.play_order.remove(cue_id);
        }

        debug!(
            "Cleaned up cue '{}' ({} timers cancelled, {:?})",
            cue_id, cancelled, options
        );
        self.refresh_current_cue();
    }

    /// Session ended normally: revert ducking, delete, report `Stopped`
    pub(super) fn finish_session(&mut self, cue_id: &CueId, reason: &str) {
        let is_trigger = self
            .store
            .get(cue_id)
            .is_some_and(|s| s.cue().is_ducking_trigger);
        if is_trigger {
            self.revert_ducking(cue_id);
        }
        self.cleanup(cue_id, CleanupOptions::terminal());
        self.sync_ui(cue_id);
        info!("Cue '{}' stopped ({})", cue_id, reason);
        self.report(cue_id, PlaybackStatus::Stopped, StatusDetails::reason(reason));
    }

    /// Session failed: report the error, then the same teardown a stop performs
    pub(super) fn fail_session(&mut self, cue_id: &CueId, err: PlaybackError) {
        let is_trigger = self
            .store
            .get(cue_id)
            .is_some_and(|s| s.cue().is_ducking_trigger);
        if is_trigger {
            self.revert_ducking(cue_id);
        }
        self.cleanup(cue_id, CleanupOptions::terminal().force_unload());
        self.sync_ui(cue_id);
        self.report_error(cue_id, &err);
    }

    /// Stop and release every independent instance of a cue
    pub(super) fn stop_instances(&mut self, cue_id: &CueId) {
        if let Some(instances) = self.instances.remove(cue_id) {
            for mut instance in instances {
                debug!("Stopping instance {} of '{}'", instance.id, cue_id);
                instance.sound.detach_listeners();
                instance.sound.stop();
                instance.sound.unload();
            }
        }
    }
}
