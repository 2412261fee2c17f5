//! Sound event and timer transitions
//!
//! Every handle callback reaches the engine as one `EngineMessage::Sound`,
//! and every cue-bound event goes through `on_cue_event`. Events whose
//! listener token no longer matches the cue's current handle are dropped here,
//! before they can touch state.

use cuebox_common::CueId;
use tracing::{debug, trace, warn};

use super::core::PlaybackEngine;
use crate::audio::{InstanceId, ListenerToken, SoundEvent, SoundOwner};
use crate::error::PlaybackError;
use crate::playback::messages::{TimerId, TimerKind};

impl PlaybackEngine {
    pub(super) fn on_sound_event(&mut self, owner: SoundOwner, event: SoundEvent) {
        match owner {
            SoundOwner::Cue { cue_id, token } => self.on_cue_event(&cue_id, token, event),
            SoundOwner::Instance {
                cue_id,
                instance_id,
            } => self.on_instance_event(&cue_id, instance_id, event),
        }
    }

    fn on_cue_event(&mut self, cue_id: &CueId, token: ListenerToken, event: SoundEvent) {
        let Some(state) = self.store.get_mut(cue_id) else {
            debug!("Dropping {:?} for untracked cue '{}'", event, cue_id);
            return;
        };
        if state.listener_token != Some(token) {
            debug!(
                "Dropping stale {:?} for '{}' ({:?}, current {:?})",
                event, cue_id, token, state.listener_token
            );
            return;
        }

        match event {
            SoundEvent::Play => {
                state.is_navigating = false;
                self.sync_ui(cue_id);
            }
            SoundEvent::Pause => {
                trace!("Handle for '{}' paused", cue_id);
            }
            SoundEvent::Stop => {
                let reason = state
                    .stop
                    .reason
                    .map(|r| r.as_str())
                    .unwrap_or("playback_stopped");
                self.finish_session(cue_id, reason);
            }
            SoundEvent::End => {
                // An item running out under a stop or crossfade ramp ends the session
                let stopping = state.stop.stopping_with_fade || state.is_fading_out();
                if state.is_playlist() && !stopping {
                    self.playlist_end(cue_id, None);
                } else if state.cue().loop_playback && !state.is_playlist() {
                    trace!("Looping cue '{}' wrapped", cue_id);
                } else {
                    let reason = state
                        .stop
                        .reason
                        .filter(|_| stopping)
                        .map(|r| r.as_str())
                        .unwrap_or("playback_ended");
                    self.finish_session(cue_id, reason);
                }
            }
            SoundEvent::LoadError(message) => {
                warn!("Load error for '{}': {}", cue_id, message);
                let err = PlaybackError::SoundCreationFailed(message);
                if state.is_playlist() {
                    self.playlist_end(cue_id, Some(err));
                } else {
                    self.fail_session(cue_id, err);
                }
            }
        }
    }

    fn on_instance_event(&mut self, cue_id: &CueId, instance_id: InstanceId, event: SoundEvent) {
        if !matches!(
            event,
            SoundEvent::End | SoundEvent::Stop | SoundEvent::LoadError(_)
        ) {
            return;
        }
        let Some(instances) = self.instances.get_mut(cue_id) else {
            return;
        };
        if let Some(pos) = instances.iter().position(|i| i.id == instance_id) {
            let mut instance = instances.remove(pos);
            instance.sound.detach_listeners();
            instance.sound.unload();
            debug!("Instance {} of '{}' finished ({:?})", instance_id, cue_id, event);
        }
        if instances.is_empty() {
            self.instances.remove(cue_id);
        }
    }

    pub(super) fn on_timer(&mut self, id: TimerId, cue_id: CueId, kind: TimerKind) {
        if !self.timers.take_fired(id) {
            trace!("Ignoring cancelled timer {:?} for '{}'", id, cue_id);
            return;
        }
        trace!("Timer {:?} fired for '{}'", kind, cue_id);

        match kind {
            TimerKind::Restart => {
                if let Some(cue) = self.pending_restarts.remove(&cue_id) {
                    debug!("Settle delay elapsed; restarting '{}'", cue_id);
                    self.initialize(cue, None);
                }
            }
            TimerKind::FadeInComplete => {
                if let Some(state) = self.store.get_mut(&cue_id) {
                    if state.is_fading_in() {
                        state.fade = None;
                    }
                }
            }
            TimerKind::FadeOutComplete | TimerKind::CrossfadeSafetyStop => {
                if let Some(sound) = self.store.get_mut(&cue_id).and_then(|s| s.sound.as_mut()) {
                    // Terminal cleanup follows on the handle's Stop event
                    sound.stop();
                }
            }
            TimerKind::CrossfadeProgress { incoming } => {
                self.crossfade_progress(&cue_id, incoming);
            }
        }
    }
}
