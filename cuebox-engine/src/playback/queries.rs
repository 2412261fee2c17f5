//! Read-only views of engine state
//!
//! Every query builds a fresh value; nothing returned here aliases engine
//! state, so callers may hold or serialize snapshots freely.

use cuebox_common::events::PlaybackStatus;
use cuebox_common::CueId;
use serde::Serialize;
use tokio::time::Instant;

use crate::audio::InstanceId;
use crate::playback::fade::FadeDirection;
use crate::playback::playlist::NavDirection;
use crate::playback::state::PlayingState;

/// Point-in-time view of one tracked cue
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PlaybackSnapshot {
    pub cue_id: CueId,
    pub cue_name: String,
    pub status: PlaybackStatus,
    pub is_playing: bool,
    pub is_paused: bool,
    pub is_playlist: bool,
    pub is_cued: bool,
    pub is_cued_next: bool,
    pub has_sound: bool,

    pub is_fading_in: bool,
    pub is_fading_out: bool,
    /// Ramp progress (0.0-1.0) while fading
    pub fade_progress: Option<f32>,
    pub fade_remaining_ms: Option<u64>,

    pub is_ducked: bool,
    pub ducking_trigger: Option<CueId>,

    pub volume: f32,
    pub original_volume: f32,

    pub position_secs: Option<f64>,
    pub duration_secs: Option<f64>,

    pub current_item_index: Option<usize>,
    pub current_item_name: Option<String>,
    pub next_item_name: Option<String>,
    pub playlist_length: Option<usize>,

    /// Timers and intervals still scheduled for this cue
    pub pending_timers: usize,
}

impl PlaybackSnapshot {
    pub(crate) fn capture(state: &PlayingState, pending_timers: usize) -> Self {
        let now = Instant::now();
        let fade = state.fade.as_ref();

        let status = if state.is_cued_next || state.is_cued {
            PlaybackStatus::CuedNext
        } else if state.is_paused {
            PlaybackStatus::Paused
        } else if state.is_playing() {
            PlaybackStatus::Playing
        } else {
            PlaybackStatus::Stopped
        };

        let playlist = state.playlist.as_ref();
        let next_item_name = playlist.and_then(|p| {
            // Cued states play the cued item next; live sessions play the following one
            let next = if state.has_sound() {
                p.step(p.current_index(), NavDirection::Next, state.cue.loop_playback)?
            } else {
                p.current_index()
            };
            p.resolve(next).map(|item| item.display_name().to_string())
        });

        Self {
            cue_id: state.cue_id().clone(),
            cue_name: state.cue.display_name().to_string(),
            status,
            is_playing: state.is_playing(),
            is_paused: state.is_paused,
            is_playlist: state.is_playlist(),
            is_cued: state.is_cued,
            is_cued_next: state.is_cued_next,
            has_sound: state.has_sound(),
            is_fading_in: fade.is_some_and(|f| f.direction == FadeDirection::In),
            is_fading_out: fade.is_some_and(|f| f.direction == FadeDirection::Out),
            fade_progress: fade.map(|f| f.progress_at(now)),
            fade_remaining_ms: fade.map(|f| f.remaining_at(now).as_millis() as u64),
            is_ducked: state.is_ducked(),
            ducking_trigger: state.ducking_trigger().cloned(),
            volume: state.current_volume(),
            original_volume: state.original_volume,
            position_secs: state.sound.as_ref().map(|s| s.position()),
            duration_secs: state.sound.as_ref().and_then(|s| s.duration()),
            current_item_index: playlist.map(|p| p.current_index()),
            current_item_name: playlist
                .and_then(|p| p.current_item())
                .map(|item| item.display_name().to_string()),
            next_item_name,
            playlist_length: playlist.map(|p| p.items().len()),
            pending_timers,
        }
    }
}

/// Brief entry in `CurrentlyPlaying`
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ActiveCue {
    pub cue_id: CueId,
    pub cue_name: String,
    pub status: PlaybackStatus,
    pub current_item_name: Option<String>,
}

/// Running independent instance
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct InstanceSummary {
    pub cue_id: CueId,
    pub instance_id: String,
    pub is_playing: bool,
}

impl InstanceSummary {
    pub(crate) fn new(cue_id: &CueId, instance_id: &InstanceId, is_playing: bool) -> Self {
        Self {
            cue_id: cue_id.clone(),
            instance_id: instance_id.to_string(),
            is_playing,
        }
    }
}

/// Engine-wide view
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct CurrentlyPlaying {
    /// Most recent audible-or-paused cue
    pub priority_cue: Option<CueId>,
    /// Tracked cues, most recently started first
    pub play_order: Vec<CueId>,
    /// Every tracked cue, sorted by id
    pub cues: Vec<ActiveCue>,
    pub independent_instances: Vec<InstanceSummary>,
}

impl ActiveCue {
    pub(crate) fn from_snapshot(snapshot: PlaybackSnapshot) -> Self {
        Self {
            cue_id: snapshot.cue_id,
            cue_name: snapshot.cue_name,
            status: snapshot.status,
            current_item_name: snapshot.current_item_name,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::playback::fade::FadeRamp;
    use cuebox_common::{Cue, PlaylistItem};
    use std::time::Duration;

    #[test]
    fn test_cued_playlist_snapshot() {
        let cue = Cue::playlist(
            "p",
            vec![
                PlaylistItem::new("1", "One", "/1.wav"),
                PlaylistItem::new("2", "Two", "/2.wav"),
            ],
        );
        let mut state = PlayingState::new(cue);
        state.mark_cued_next();
        state.playlist.as_mut().unwrap().set_current_index(1).unwrap();

        let snapshot = PlaybackSnapshot::capture(&state, 0);
        assert_eq!(snapshot.status, PlaybackStatus::CuedNext);
        assert!(snapshot.is_paused);
        assert!(!snapshot.has_sound);
        assert_eq!(snapshot.current_item_index, Some(1));
        assert_eq!(snapshot.current_item_name.as_deref(), Some("Two"));
        assert_eq!(snapshot.next_item_name.as_deref(), Some("Two"));
        assert_eq!(snapshot.playlist_length, Some(2));
    }

    #[tokio::test(start_paused = true)]
    async fn test_fade_fields_follow_ramp() {
        let mut state = PlayingState::new(Cue::single("a", "/a.wav"));
        state.begin_fade(FadeRamp::fade_out(1.0, Duration::from_millis(1000)));
        tokio::time::advance(Duration::from_millis(250)).await;

        let snapshot = PlaybackSnapshot::capture(&state, 1);
        assert!(snapshot.is_fading_out);
        assert!(!snapshot.is_fading_in);
        assert_eq!(snapshot.fade_remaining_ms, Some(750));
        assert!((snapshot.fade_progress.unwrap() - 0.25).abs() < 0.001);
        assert_eq!(snapshot.pending_timers, 1);
    }

    #[test]
    fn test_snapshot_serializes_status_snake_case() {
        let state = PlayingState::new(Cue::single("a", "/a.wav"));
        let json = serde_json::to_value(PlaybackSnapshot::capture(&state, 0)).unwrap();
        assert_eq!(json["status"], "stopped");
        assert_eq!(json["cue_id"], "a");
    }
}
