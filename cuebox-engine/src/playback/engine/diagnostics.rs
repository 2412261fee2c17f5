//! Status accessors
//!
//! Snapshot queries for clients. Each call builds fresh values from the store.

use cuebox_common::CueId;

use super::core::PlaybackEngine;
use crate::playback::queries::{ActiveCue, CurrentlyPlaying, InstanceSummary, PlaybackSnapshot};

impl PlaybackEngine {
    pub(super) fn playback_snapshot(&self, cue_id: &CueId) -> Option<PlaybackSnapshot> {
        self.store
            .get(cue_id)
            .map(|state| PlaybackSnapshot::capture(state, self.timers.count_for(cue_id)))
    }

    pub(super) fn currently_playing(&self) -> CurrentlyPlaying {
        let cues = self
            .store
            .cue_ids()
            .iter()
            .filter_map(|id| self.playback_snapshot(id))
            .map(ActiveCue::from_snapshot)
            .collect();

        let mut independent_instances: Vec<InstanceSummary> = self
            .instances
            .iter()
            .flat_map(|(cue_id, instances)| {
                instances
                    .iter()
                    .map(move |i| InstanceSummary::new(cue_id, &i.id, i.sound.playing()))
            })
            .collect();
        independent_instances.sort_by(|a, b| a.cue_id.cmp(&b.cue_id));

        CurrentlyPlaying {
            priority_cue: self.play_order.priority_cue(&self.store),
            play_order: self.play_order.as_slice().to_vec(),
            cues,
            independent_instances,
        }
    }
}
