//! Playback controller - play, stop, pause, toggle
//!
//! **Play matrix** (existing state for the cue):
//! - none: fresh initialize
//! - paused with a handle, resume requested: resume in place
//! - paused cued playlist (no handle), resume requested: start the cued item
//! - playing, resume requested: nothing to do
//! - anything else: forced restart (or an independent instance when the cue
//!   allows multiple instances)
//!
//! **Forced restart:** the old handle is detached and stopped and the session
//! is cleaned up synchronously; the fresh session is started by a `Restart`
//! timer after the settle delay. Plays for the cue during that window
//! coalesce into the pending restart.

use cuebox_common::events::{PlaybackStatus, StatusDetails};
use cuebox_common::{Cue, CueId, PlaylistEndMode, PlaylistItem, RetriggerBehavior};
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::path::Path;
use std::time::Duration;
use tracing::{debug, info, warn};

use super::cleanup::CleanupOptions;
use super::core::{IndependentInstance, PlaybackEngine};
use crate::audio::{
    AudioError, InstanceId, SoundHandle, SoundListener, SoundOwner, SoundRequest,
};
use crate::error::PlaybackError;
use crate::playback::fade::FadeRamp;
use crate::playback::messages::{StopAllOptions, StopOptions, TimerKind};
use crate::playback::playlist::NavDirection;
use crate::playback::state::{CrossfadeInfo, DuckState, PlayingState, StopReason, StopSource};

impl PlaybackEngine {
    pub(super) fn play(&mut self, cue: Cue, resume: bool) {
        if cue.id.is_blank() {
            self.report_error(&cue.id, &PlaybackError::InvalidCue("cue has no id".to_string()));
            return;
        }
        let cue = self.cues.get_cue_by_id(&cue.id).unwrap_or(cue);
        let cue_id = cue.id.clone();
        if self.pending_restarts.contains_key(&cue_id) {
            debug!("Play for '{}' coalesced into pending restart", cue_id);
            return;
        }

        let existing = self
            .store
            .get(&cue_id)
            .map(|s| (s.is_paused(), s.has_sound(), s.is_playing()));

        match existing {
            None => self.initialize(cue, None),
            Some((true, true, _)) if resume => self.resume(&cue_id),
            Some((true, false, _)) if resume => self.resume_cued(&cue_id),
            Some((_, _, true)) if resume => {
                debug!("Cue '{}' already playing; nothing to resume", cue_id);
            }
            Some((_, true, _)) if cue.allow_multiple_instances => self.play_new_instance(cue),
            Some(_) => self.force_restart(cue),
        }
    }

    /// Build a session for `cue` and start it
    pub(super) fn initialize(&mut self, cue: Cue, crossfade: Option<CrossfadeInfo>) {
        let cue = self.cues.get_cue_by_id(&cue.id).unwrap_or(cue);
        let cue_id = cue.id.clone();

        if cue.is_playlist() {
            if cue.playlist_items.is_empty() {
                self.report_error(&cue_id, &PlaybackError::EmptyPlaylist);
                return;
            }
        } else if cue.file_path.as_deref().map_or(true, |p| p.trim().is_empty()) {
            self.report_error(&cue_id, &PlaybackError::NoFilePath(cue.display_name().to_string()));
            return;
        }

        let mut state = PlayingState::new(cue);
        state.crossfade_info = crossfade;
        if let Err(rejected) = self.store.insert(state) {
            warn!("Cue '{}' is already tracked; not initializing", rejected.cue_id());
            return;
        }
        self.play_order.add(&cue_id);
        info!("Starting cue '{}'", cue_id);

        let is_playlist = self.store.get(&cue_id).is_some_and(|s| s.is_playlist());
        if is_playlist {
            self.play_playlist_item(&cue_id, 0);
        } else if let Err(err) = self.start_sound(&cue_id, None) {
            self.fail_session(&cue_id, err);
        }
    }

    /// Acquire, configure and start a handle for the session
    ///
    /// `item` is the playlist item to play; singles pass `None`.
    pub(super) fn start_sound(
        &mut self,
        cue_id: &CueId,
        item: Option<&PlaylistItem>,
    ) -> Result<(), PlaybackError> {
        let state = self
            .store
            .get(cue_id)
            .ok_or_else(|| PlaybackError::InvalidCue(cue_id.to_string()))?;
        let cue = state.cue().clone();

        let (file_path, label, duration_hint) = match item {
            Some(item) => (
                item.file_path.clone(),
                item.display_name().to_string(),
                item.known_duration_secs,
            ),
            None => (cue.file_path.clone(), cue.display_name().to_string(), None),
        };
        let file_path = file_path
            .filter(|p| !p.trim().is_empty())
            .ok_or_else(|| PlaybackError::NoFilePath(label.clone()))?;
        if file_path.contains('\0') {
            return Err(PlaybackError::InvalidFilePathFormat(file_path));
        }
        if !self.audio.file_exists(Path::new(&file_path)) {
            return Err(PlaybackError::FileNotFound(file_path));
        }

        // Late starters join an audible trigger's duck
        let duck = if cue.enable_ducking && !cue.is_ducking_trigger {
            self.active_trigger(cue_id).map(|(trigger, level)| DuckState {
                trigger,
                volume_before_duck: Some(state.original_volume),
                ducked_volume: state.original_volume * (1.0 - level / 100.0),
            })
        } else {
            None
        };
        let resting = match (&duck, &state.crossfade_info) {
            (Some(d), _) => d.ducked_volume,
            (None, Some(info)) => info.target_volume,
            (None, None) => state.original_volume,
        };

        let fade_in = match &state.crossfade_info {
            Some(info) => Some(info.duration.saturating_sub(info.started_at.elapsed())),
            None if cue.fade_in_ms > 0 => Some(Duration::from_millis(cue.fade_in_ms)),
            None => None,
        };

        let request = SoundRequest {
            file_path,
            initial_volume: if fade_in.is_some() { 0.0 } else { resting },
            looping: cue.loop_playback && !cue.is_playlist(),
            trim_start_secs: if item.is_none() { cue.trim_start_secs } else { None },
            trim_end_secs: if item.is_none() { cue.trim_end_secs } else { None },
            duration_hint_secs: duration_hint,
            label: label.clone(),
        };

        let token = self.next_token();
        let listener = SoundListener::new(
            SoundOwner::Cue {
                cue_id: cue_id.clone(),
                token,
            },
            self.tx.clone(),
        );
        let mut sound = self.create_handle(&request, listener)?;
        if let Some(start) = request.trim_start_secs.filter(|s| *s > 0.0) {
            sound.seek(start);
        }

        let state = self
            .store
            .get_mut(cue_id)
            .ok_or_else(|| PlaybackError::InvalidCue(cue_id.to_string()))?;
        state.attach_sound(sound, token);
        state.is_paused = false;
        state.is_cued = false;
        state.is_cued_next = false;
        state.duck = duck;
        state.crossfade_info = None;

        if let Some(sound) = state.sound.as_mut() {
            sound.play();
            if let Some(duration) = fade_in {
                sound.fade(0.0, resting, duration);
            }
        }
        if let Some(duration) = fade_in {
            state.begin_fade(FadeRamp::fade_in(0.0, resting, duration));
            self.timers.schedule(cue_id, TimerKind::FadeInComplete, duration);
        }

        info!("Playing '{}': {}", cue_id, label);
        let mut details = StatusDetails::default();
        if item.is_some() {
            details = details.with_item(label);
        }
        self.report(cue_id, PlaybackStatus::Playing, details);
        self.sync_ui(cue_id);
        self.refresh_current_cue();

        if cue.is_ducking_trigger {
            self.apply_ducking(cue_id);
        }
        Ok(())
    }

    /// Ask the backend for a handle, converting panics to setup failures
    fn create_handle(
        &self,
        request: &SoundRequest,
        listener: SoundListener,
    ) -> Result<Box<dyn SoundHandle>, PlaybackError> {
        let audio = &self.audio;
        match catch_unwind(AssertUnwindSafe(|| audio.create_handle(request, listener))) {
            Ok(Ok(sound)) => Ok(sound),
            Ok(Err(AudioError::Unavailable(msg))) => Err(PlaybackError::SoundCreationFailed(msg)),
            Ok(Err(AudioError::Setup(msg))) => Err(PlaybackError::PlaybackSetupException(msg)),
            Err(panic) => {
                let msg = panic
                    .downcast_ref::<&str>()
                    .map(|s| s.to_string())
                    .or_else(|| panic.downcast_ref::<String>().cloned())
                    .unwrap_or_else(|| "audio backend panicked".to_string());
                Err(PlaybackError::PlaybackSetupException(msg))
            }
        }
    }

    /// Resume a paused session that still holds its handle
    fn resume(&mut self, cue_id: &CueId) {
        let Some(state) = self.store.get_mut(cue_id) else {
            return;
        };
        let volume = state.resting_volume();
        if let Some(sound) = state.sound.as_mut() {
            sound.set_volume(volume);
            sound.play();
        }
        state.is_paused = false;
        state.is_cued_next = false;
        let is_trigger = state.cue().is_ducking_trigger;

        info!("Resumed '{}'", cue_id);
        self.report(cue_id, PlaybackStatus::Playing, StatusDetails::reason("resumed"));
        self.play_order.add(cue_id);
        self.sync_ui(cue_id);
        self.refresh_current_cue();
        if is_trigger {
            self.apply_ducking(cue_id);
        }
    }

    /// Start the item a parked playlist session is cued on
    pub(super) fn resume_cued(&mut self, cue_id: &CueId) {
        let Some(state) = self.store.get_mut(cue_id) else {
            return;
        };
        let Some(index) = state.playlist.as_ref().map(|p| p.current_index()) else {
            warn!("Cue '{}' is paused without a handle but is not a playlist", cue_id);
            return;
        };
        state.is_paused = false;
        state.is_cued = false;
        state.is_cued_next = false;
        self.play_order.add(cue_id);
        self.play_playlist_item(cue_id, index);
    }

    /// Tear the session down now, start it again after the settle delay
    pub(super) fn force_restart(&mut self, cue: Cue) {
        let cue_id = cue.id.clone();
        info!("Forced restart of '{}'", cue_id);

        let is_trigger = match self.store.get_mut(&cue_id) {
            Some(state) => {
                if let Some(mut sound) = state.take_sound() {
                    sound.stop();
                    sound.unload();
                }
                state.cue().is_ducking_trigger
            }
            None => false,
        };
        if is_trigger {
            self.revert_ducking(&cue_id);
        }
        self.cleanup(&cue_id, CleanupOptions::terminal());

        self.pending_restarts.insert(cue_id.clone(), cue);
        self.timers
            .schedule(&cue_id, TimerKind::Restart, self.config.restart_settle());
    }

    /// Start an untracked parallel instance of `cue`
    pub(super) fn play_new_instance(&mut self, cue: Cue) {
        let cue = self.cues.get_cue_by_id(&cue.id).unwrap_or(cue);
        let item = if cue.is_playlist() {
            match self.store.get(&cue.id).and_then(|s| s.playlist.as_ref()) {
                Some(playlist) => playlist.current_item().cloned(),
                None => cue.playlist_items.first().cloned(),
            }
        } else {
            None
        };
        let (file_path, label) = match &item {
            Some(item) => (item.file_path.clone(), item.display_name().to_string()),
            None => (cue.file_path.clone(), cue.display_name().to_string()),
        };
        let Some(file_path) = file_path.filter(|p| !p.trim().is_empty()) else {
            self.report_error(&cue.id, &PlaybackError::NoFilePath(label));
            return;
        };

        let instance_id = InstanceId::new();
        let listener = SoundListener::new(
            SoundOwner::Instance {
                cue_id: cue.id.clone(),
                instance_id,
            },
            self.tx.clone(),
        );
        let request = SoundRequest {
            file_path,
            initial_volume: cue.base_volume(),
            looping: false,
            trim_start_secs: item.is_none().then_some(cue.trim_start_secs).flatten(),
            trim_end_secs: item.is_none().then_some(cue.trim_end_secs).flatten(),
            duration_hint_secs: item.as_ref().and_then(|i| i.known_duration_secs),
            label,
        };
        match self.create_handle(&request, listener) {
            Ok(mut sound) => {
                if let Some(start) = request.trim_start_secs.filter(|s| *s > 0.0) {
                    sound.seek(start);
                }
                sound.play();
                info!("Started instance {} of '{}'", instance_id, cue.id);
                self.instances
                    .entry(cue.id.clone())
                    .or_default()
                    .push(IndependentInstance {
                        id: instance_id,
                        sound,
                    });
            }
            Err(err) => self.report_error(&cue.id, &err),
        }
    }

    pub(super) fn stop(&mut self, cue_id: &CueId, options: StopOptions) {
        if self.pending_restarts.remove(cue_id).is_some() {
            self.timers.cancel_kind(cue_id, &TimerKind::Restart);
            info!("Cancelled pending restart of '{}'", cue_id);
            self.sync_ui(cue_id);
            self.report(
                cue_id,
                PlaybackStatus::Stopped,
                StatusDetails::reason(options.reason.as_str()),
            );
        }
        self.stop_instances(cue_id);

        let default_fade_ms = self.config.default_fade_out_ms;
        let stop_all_fade_ms = self.config.stop_all_fade_out_ms;
        let Some(state) = self.store.get_mut(cue_id) else {
            debug!("Stop for untracked cue '{}'", cue_id);
            return;
        };

        state.stop.reason = Some(options.reason);
        state.stop.source = Some(if options.is_retrigger_stop {
            StopSource::Retrigger
        } else if options.from_companion {
            StopSource::Companion
        } else {
            StopSource::User
        });

        if state.has_sound() {
            let fade_ms = if options.reason == StopReason::StopAll {
                stop_all_fade_ms
            } else {
                state.cue().fade_out_ms.unwrap_or(default_fade_ms)
            };
            if options.use_fade && fade_ms > 0 && state.is_playing() {
                if state.is_fading_out() {
                    debug!("Cue '{}' is already fading out", cue_id);
                    return;
                }
                let duration = Duration::from_millis(fade_ms);
                let from = state.current_volume();
                state.stop.stopping_with_fade = true;
                state.begin_fade(FadeRamp::fade_out(from, duration));
                if let Some(sound) = state.sound.as_mut() {
                    sound.fade(from, 0.0, duration);
                }
                info!("Fading out '{}' over {:?}", cue_id, duration);
                self.timers.cancel_kind(cue_id, &TimerKind::FadeInComplete);
                self.timers.cancel_kind(cue_id, &TimerKind::FadeOutComplete);
                self.timers
                    .schedule(cue_id, TimerKind::FadeOutComplete, duration);
            } else if let Some(sound) = state.sound.as_mut() {
                // Terminal cleanup runs on the handle's Stop event
                sound.stop();
            }
            return;
        }

        let keeps_cued_state =
            state.is_playlist() && state.cue().playlist_end_mode == PlaylistEndMode::StopAndCueNext;
        if keeps_cued_state {
            debug!("Keeping cued state of '{}' (stop_and_cue_next)", cue_id);
            return;
        }
        self.finish_session(cue_id, options.reason.as_str());
    }

    /// Pause a playing session; false when there was nothing to pause
    pub(super) fn pause(&mut self, cue_id: &CueId) -> bool {
        let Some(state) = self.store.get_mut(cue_id) else {
            return false;
        };
        if !state.is_playing() {
            debug!("Cue '{}' is not playing; pause ignored", cue_id);
            return false;
        }
        if let Some(sound) = state.sound.as_mut() {
            sound.pause();
        }
        state.is_paused = true;
        let is_trigger = state.cue().is_ducking_trigger;

        if is_trigger {
            self.revert_ducking(cue_id);
        }
        info!("Paused '{}'", cue_id);
        self.report(cue_id, PlaybackStatus::Paused, StatusDetails::default());
        self.sync_ui(cue_id);
        self.refresh_current_cue();
        true
    }

    /// Retrigger entry point
    pub(super) fn toggle(
        &mut self,
        cue_id: &CueId,
        from_companion: bool,
        retrigger_override: Option<RetriggerBehavior>,
    ) {
        let Some(cue) = self.resolve_cue(cue_id) else {
            self.report_error(cue_id, &PlaybackError::InvalidCue(cue_id.to_string()));
            return;
        };
        if self.pending_restarts.contains_key(cue_id) {
            debug!("Toggle for '{}' coalesced into pending restart", cue_id);
            return;
        }

        let Some(state) = self.store.get(cue_id) else {
            if self.crossfade_mode {
                self.crossfade_to(cue);
            } else {
                self.play(cue, false);
            }
            return;
        };

        // A parked playlist always resumes from its cued position
        if state.is_playlist() && !state.has_sound() {
            self.resume_cued(cue_id);
            return;
        }

        let is_paused = state.is_paused();
        let is_playing = state.is_playing();
        let is_playlist = state.is_playlist();
        let behavior = retrigger_override
            .or(cue.retrigger_behavior)
            .unwrap_or(self.config.default_retrigger_behavior);
        debug!("Retrigger '{}' with {}", cue_id, behavior);

        let retrigger_stop = StopOptions {
            use_fade: false,
            from_companion,
            is_retrigger_stop: true,
            reason: StopReason::RetriggerStop,
        };

        match behavior {
            RetriggerBehavior::Restart => self.force_restart(cue),
            RetriggerBehavior::Stop => self.stop(cue_id, retrigger_stop),
            RetriggerBehavior::FadeOutAndStop => self.stop(
                cue_id,
                StopOptions {
                    use_fade: true,
                    ..retrigger_stop
                },
            ),
            RetriggerBehavior::DoNothing => {}
            RetriggerBehavior::PlayNewInstance => self.play_new_instance(cue),
            RetriggerBehavior::ReplayCurrentItem => {
                if is_paused {
                    self.force_restart(cue);
                } else if is_playlist {
                    self.ready_to_replay(cue_id);
                } else {
                    self.stop(cue_id, retrigger_stop);
                }
            }
            RetriggerBehavior::PlayNextItem => {
                if is_playlist {
                    if !self.jump(cue_id, NavDirection::Next) {
                        debug!("No next item for '{}'", cue_id);
                    }
                } else {
                    self.force_restart(cue);
                }
            }
            RetriggerBehavior::TogglePausePlay => {
                if is_paused {
                    self.resume(cue_id);
                } else if is_playing {
                    self.pause(cue_id);
                } else {
                    self.force_restart(cue);
                }
            }
        }
    }

    /// Stop the playing item and park the playlist on it
    fn ready_to_replay(&mut self, cue_id: &CueId) {
        let Some(index) = self
            .store
            .get(cue_id)
            .and_then(|s| s.playlist.as_ref())
            .map(|p| p.current_index())
        else {
            return;
        };
        self.cue_item(cue_id, index, false);
    }

    pub(super) fn stop_all(&mut self, options: StopAllOptions) {
        let mut targets = self.store.cue_ids();
        targets.extend(self.pending_restarts.keys().cloned());
        targets.extend(self.instances.keys().cloned());
        targets.sort();
        targets.dedup();
        targets.retain(|id| Some(id) != options.except_cue_id.as_ref());

        info!("Stopping {} cues", targets.len());
        for cue_id in targets {
            self.stop(
                &cue_id,
                StopOptions {
                    use_fade: options.use_fade,
                    reason: StopReason::StopAll,
                    ..StopOptions::default()
                },
            );
        }
    }

    /// Seek the session's handle; false without a handle
    pub(super) fn seek(&mut self, cue_id: &CueId, position_secs: f64) -> bool {
        let Some(state) = self.store.get_mut(cue_id) else {
            return false;
        };
        let floor = state.cue().trim_start_secs.unwrap_or(0.0).max(0.0);
        let Some(sound) = state.sound.as_mut() else {
            return false;
        };
        let mut target = position_secs.max(floor);
        if let Some(duration) = sound.duration() {
            target = target.min(duration);
        }
        sound.seek(target);
        debug!("Seeked '{}' to {:.2}s", cue_id, target);
        true
    }
}
