//! Cue model shared by the engine and its collaborators
//!
//! A cue is the user-authored definition of a playable unit: either a single
//! audio file or an ordered playlist. The engine treats cues as read-only
//! snapshots; the authoritative copy lives in an external cue store.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::Error;

/// Cue identity
///
/// Opaque string key. An empty identity is never valid for playback.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, Default)]
#[serde(transparent)]
pub struct CueId(String);

impl CueId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// True when the identity is empty or whitespace only
    pub fn is_blank(&self) -> bool {
        self.0.trim().is_empty()
    }
}

impl fmt::Display for CueId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for CueId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

impl From<String> for CueId {
    fn from(value: String) -> Self {
        Self(value)
    }
}

impl AsRef<str> for CueId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// Cue kind
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum CueType {
    #[default]
    Single,
    Playlist,
}

/// What a playlist does when an item finishes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum PlaylistEndMode {
    /// Advance to the next item and keep playing
    #[default]
    PlayThrough,
    /// Stop after each item and pre-select the next one
    StopAndCueNext,
}

impl fmt::Display for PlaylistEndMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PlaylistEndMode::PlayThrough => write!(f, "play_through"),
            PlaylistEndMode::StopAndCueNext => write!(f, "stop_and_cue_next"),
        }
    }
}

/// Response when a cue that is already playing or paused is triggered again
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum RetriggerBehavior {
    /// Pause when playing, resume when paused
    #[default]
    TogglePausePlay,
    /// Stop and start again from the top after the settle delay
    Restart,
    /// Stop immediately
    Stop,
    /// Stop with the cue's fade-out
    FadeOutAndStop,
    /// Ignore the trigger
    DoNothing,
    /// Start an untracked parallel instance
    PlayNewInstance,
    /// Replay the current item (playlists) or the file (singles)
    ReplayCurrentItem,
    /// Skip to the next playlist item
    PlayNextItem,
}

impl RetriggerBehavior {
    pub fn as_str(&self) -> &'static str {
        match self {
            RetriggerBehavior::TogglePausePlay => "toggle_pause_play",
            RetriggerBehavior::Restart => "restart",
            RetriggerBehavior::Stop => "stop",
            RetriggerBehavior::FadeOutAndStop => "fade_out_and_stop",
            RetriggerBehavior::DoNothing => "do_nothing",
            RetriggerBehavior::PlayNewInstance => "play_new_instance",
            RetriggerBehavior::ReplayCurrentItem => "replay_current_item",
            RetriggerBehavior::PlayNextItem => "play_next_item",
        }
    }
}

impl fmt::Display for RetriggerBehavior {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for RetriggerBehavior {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "toggle_pause_play" => Ok(RetriggerBehavior::TogglePausePlay),
            "restart" => Ok(RetriggerBehavior::Restart),
            "stop" => Ok(RetriggerBehavior::Stop),
            "fade_out_and_stop" => Ok(RetriggerBehavior::FadeOutAndStop),
            "do_nothing" => Ok(RetriggerBehavior::DoNothing),
            "play_new_instance" => Ok(RetriggerBehavior::PlayNewInstance),
            "replay_current_item" => Ok(RetriggerBehavior::ReplayCurrentItem),
            "play_next_item" => Ok(RetriggerBehavior::PlayNextItem),
            other => Err(Error::InvalidInput(format!(
                "Unknown retrigger behavior: {}",
                other
            ))),
        }
    }
}

/// One entry of a playlist cue
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlaylistItem {
    /// Item identity (used for sidebar highlighting)
    pub id: String,

    /// Display name shown in "Next: <name>" messages
    #[serde(default)]
    pub name: String,

    /// Audio file reference
    #[serde(default)]
    pub file_path: Option<String>,

    /// Known duration in seconds, display only
    #[serde(default)]
    pub known_duration_secs: Option<f64>,
}

impl PlaylistItem {
    pub fn new(id: impl Into<String>, name: impl Into<String>, file_path: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            file_path: Some(file_path.into()),
            known_duration_secs: None,
        }
    }

    /// Name for status messages, falling back to the item id
    pub fn display_name(&self) -> &str {
        if self.name.trim().is_empty() {
            &self.id
        } else {
            &self.name
        }
    }
}

fn default_volume() -> f32 {
    1.0
}

fn default_ducking_level() -> f32 {
    80.0
}

/// User-authored cue definition
///
/// Serialized with snake_case keys so a show file can be written by hand.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Cue {
    pub id: CueId,

    #[serde(default)]
    pub name: String,

    #[serde(default, rename = "type")]
    pub cue_type: CueType,

    /// File reference for single cues
    #[serde(default)]
    pub file_path: Option<String>,

    /// Ordered items for playlist cues
    #[serde(default)]
    pub playlist_items: Vec<PlaylistItem>,

    /// Configured volume (0.0-1.0)
    #[serde(default = "default_volume")]
    pub volume: f32,

    #[serde(default)]
    pub fade_in_ms: u64,

    /// Cue-level fade-out; falls back to the engine default when absent
    #[serde(default)]
    pub fade_out_ms: Option<u64>,

    #[serde(default, rename = "loop")]
    pub loop_playback: bool,

    #[serde(default)]
    pub shuffle: bool,

    #[serde(default)]
    pub repeat_one: bool,

    #[serde(default)]
    pub playlist_end_mode: PlaylistEndMode,

    /// Cue-level retrigger behavior; falls back to the engine default when absent
    #[serde(default)]
    pub retrigger_behavior: Option<RetriggerBehavior>,

    /// Starting this cue ducks other eligible cues
    #[serde(default)]
    pub is_ducking_trigger: bool,

    /// Reduction applied to ducked cues, in percent of their base volume
    #[serde(default = "default_ducking_level")]
    pub ducking_level_percent: f32,

    /// This cue may be ducked by a trigger
    #[serde(default)]
    pub enable_ducking: bool,

    #[serde(default)]
    pub trim_start_secs: Option<f64>,

    #[serde(default)]
    pub trim_end_secs: Option<f64>,

    /// Playing an already-active cue spawns a parallel instance instead of restarting
    #[serde(default)]
    pub allow_multiple_instances: bool,
}

impl Cue {
    /// Single-file cue with default settings
    pub fn single(id: impl Into<CueId>, file_path: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: String::new(),
            cue_type: CueType::Single,
            file_path: Some(file_path.into()),
            playlist_items: Vec::new(),
            volume: default_volume(),
            fade_in_ms: 0,
            fade_out_ms: None,
            loop_playback: false,
            shuffle: false,
            repeat_one: false,
            playlist_end_mode: PlaylistEndMode::default(),
            retrigger_behavior: None,
            is_ducking_trigger: false,
            ducking_level_percent: default_ducking_level(),
            enable_ducking: false,
            trim_start_secs: None,
            trim_end_secs: None,
            allow_multiple_instances: false,
        }
    }

    /// Playlist cue with default settings
    pub fn playlist(id: impl Into<CueId>, items: Vec<PlaylistItem>) -> Self {
        Self {
            cue_type: CueType::Playlist,
            file_path: None,
            playlist_items: items,
            ..Self::single(id, String::new())
        }
    }

    pub fn is_playlist(&self) -> bool {
        self.cue_type == CueType::Playlist
    }

    /// Name for status messages, falling back to the id
    pub fn display_name(&self) -> &str {
        if self.name.trim().is_empty() {
            self.id.as_str()
        } else {
            &self.name
        }
    }

    /// Ducking level clamped to 0-100 percent
    pub fn ducking_level(&self) -> f32 {
        self.ducking_level_percent.clamp(0.0, 100.0)
    }

    /// Volume clamped to 0.0-1.0
    pub fn base_volume(&self) -> f32 {
        self.volume.clamp(0.0, 1.0)
    }
}
