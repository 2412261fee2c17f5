//! Ducking engine
//!
//! A playing trigger cue lowers every other duck-eligible session to
//! `base * (1 - level / 100)`. Only the trigger that ducked a session can
//! revert it; a second trigger neither stacks nor re-targets an already ducked
//! session.

use cuebox_common::CueId;
use std::time::Duration;
use tracing::{debug, info};

use super::core::PlaybackEngine;
use crate::playback::fade::FadeDirection;
use crate::playback::state::DuckState;

impl PlaybackEngine {
    fn ducking_fade(&self) -> Duration {
        Duration::from_millis(self.config.ducking_fade_ms)
    }

    /// Duck every eligible session under `trigger_id`
    pub(super) fn apply_ducking(&mut self, trigger_id: &CueId) {
        let Some(level) = self
            .store
            .get(trigger_id)
            .filter(|s| s.cue().is_ducking_trigger)
            .map(|s| s.cue().ducking_level())
        else {
            return;
        };
        let ramp = self.ducking_fade();

        let mut ducked = 0;
        for (cue_id, state) in self.store.iter_mut() {
            if cue_id == trigger_id
                || state.cue.is_ducking_trigger
                || !state.cue.enable_ducking
                || state.is_ducked()
                || state.is_fading_out()
            {
                continue;
            }
            // A ramp in progress is replaced by the duck; capture where it was headed
            let fading_in_to = state
                .fade
                .filter(|f| f.direction == FadeDirection::In)
                .map(|f| f.to_volume);
            let target = state.original_volume * (1.0 - level / 100.0);
            let Some(sound) = state.sound.as_mut() else {
                continue;
            };
            let current = sound.volume();
            sound.fade(current, target, ramp);

            state.fade = None;
            state.duck = Some(DuckState {
                trigger: trigger_id.clone(),
                volume_before_duck: Some(fading_in_to.unwrap_or(current)),
                ducked_volume: target,
            });
            debug!("Ducked '{}' to {:.2} under '{}'", cue_id, target, trigger_id);
            ducked += 1;
        }
        if ducked > 0 {
            info!("Trigger '{}' ducked {} cues by {}%", trigger_id, ducked, level);
        }
    }

    /// Restore every session ducked by `trigger_id`
    pub(super) fn revert_ducking(&mut self, trigger_id: &CueId) {
        let ramp = self.ducking_fade();
        let mut restored = 0;
        for (cue_id, state) in self.store.iter_mut() {
            if !state.duck.as_ref().is_some_and(|d| &d.trigger == trigger_id) {
                continue;
            }
            let Some(duck) = state.duck.take() else {
                continue;
            };
            let target = duck.volume_before_duck.unwrap_or(state.original_volume);
            let fading_out = state.is_fading_out();
            if let Some(sound) = state.sound.as_mut() {
                if !fading_out {
                    let current = sound.volume();
                    sound.fade(current, target, ramp);
                }
            }
            debug!("Restored '{}' to {:.2}", cue_id, target);
            restored += 1;
        }
        if restored > 0 {
            info!("Trigger '{}' released {} ducked cues", trigger_id, restored);
        }
    }

    /// An audible trigger other than `except`, with its ducking level
    pub(super) fn active_trigger(&self, except: &CueId) -> Option<(CueId, f32)> {
        self.store
            .iter()
            .filter(|(id, s)| *id != except && s.cue().is_ducking_trigger && s.is_playing())
            .map(|(id, s)| (id.clone(), s.cue().ducking_level()))
            .min_by(|a, b| a.0.cmp(&b.0))
    }
}
