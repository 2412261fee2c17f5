//! Crossfade engine
//!
//! Starting a cue in crossfade mode ramps every other session with a handle
//! to zero over the crossfade duration, then force-stops it after the ramp
//! plus a safety buffer. The incoming cue starts through the normal path with
//! `crossfade_info` attached, so its handle fades in from zero over the same
//! duration measured from the crossfade call.

use cuebox_common::events::CueEvent;
use cuebox_common::{Cue, CueId};
use std::time::Duration;
use tokio::time::Instant;
use tracing::{debug, info};

use super::core::PlaybackEngine;
use crate::playback::fade::{FadeDirection, FadeRamp};
use crate::playback::messages::TimerKind;
use crate::playback::state::{CrossfadeInfo, StopMetadata, StopReason, StopSource};

impl PlaybackEngine {
    pub(super) fn crossfade_to(&mut self, cue: Cue) {
        let cue = self.cues.get_cue_by_id(&cue.id).unwrap_or(cue);
        let started_at = Instant::now();
        let duration = self.config.crossfade_duration();
        let safety = duration + Duration::from_millis(self.config.crossfade_safety_buffer_ms);
        let interval = Duration::from_millis(self.config.crossfade_progress_interval_ms);
        let incoming = cue.id.clone();

        let outgoing: Vec<CueId> = self
            .store
            .iter()
            .filter(|(id, s)| **id != incoming && s.has_sound())
            .map(|(id, _)| id.clone())
            .collect();

        info!(
            "Crossfading to '{}' over {:?} ({} outgoing)",
            incoming,
            duration,
            outgoing.len()
        );

        for cue_id in &outgoing {
            let Some(state) = self.store.get_mut(cue_id) else {
                continue;
            };
            let from = state.current_volume();
            state.begin_fade(FadeRamp::fade_out(from, duration));
            state.stop = StopMetadata {
                stopping_with_fade: true,
                source: Some(StopSource::Crossfade),
                reason: Some(StopReason::Crossfade),
            };
            if let Some(sound) = state.sound.as_mut() {
                sound.fade(from, 0.0, duration);
            }
            self.timers.cancel_kind(cue_id, &TimerKind::FadeInComplete);
            self.timers.cancel_kind(cue_id, &TimerKind::FadeOutComplete);
            self.timers
                .schedule(cue_id, TimerKind::CrossfadeSafetyStop, safety);
            self.timers.schedule(
                cue_id,
                TimerKind::CrossfadeProgress {
                    incoming: incoming.clone(),
                },
                interval,
            );
        }

        let info = CrossfadeInfo {
            target_volume: cue.base_volume(),
            duration,
            started_at,
        };
        self.initialize(cue, Some(info));
    }

    /// Report an outgoing cue's ramp and re-arm until it completes
    pub(super) fn crossfade_progress(&mut self, cue_id: &CueId, incoming: CueId) {
        let Some(ramp) = self
            .store
            .get(cue_id)
            .and_then(|s| s.fade)
            .filter(|f| f.direction == FadeDirection::Out)
        else {
            debug!("Crossfade progress for '{}' ended (no ramp)", cue_id);
            return;
        };

        let now = Instant::now();
        let progress = ramp.progress_at(now);
        self.status.send(CueEvent::CrossfadeProgress {
            cue_id: cue_id.clone(),
            incoming_cue_id: incoming.clone(),
            progress,
            remaining_ms: ramp.remaining_at(now).as_millis() as u64,
            timestamp: chrono::Utc::now(),
        });

        if progress < 1.0 {
            let interval = Duration::from_millis(self.config.crossfade_progress_interval_ms);
            self.timers
                .schedule(cue_id, TimerKind::CrossfadeProgress { incoming }, interval);
        }
    }
}
