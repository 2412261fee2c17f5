//! Configuration for the cuebox engine
//!
//! Bootstrap configuration is a single TOML file (see
//! `cuebox_common::config` for how it is located):
//!
//! ```toml
//! show_file = "/shows/friday.toml"
//!
//! [logging]
//! level = "debug"
//!
//! [playback]
//! default_fade_out_ms = 1000
//! stop_all_fade_out_ms = 1500
//! crossfade_duration_ms = 2000
//! default_retrigger_behavior = "toggle_pause_play"
//! ```
//!
//! Every playback value has a built-in default and is clamped to a sane range
//! on load. The engine takes a read-only snapshot at construction; there is no
//! live reload.

use cuebox_common::config::{load_toml_or_default, LoggingConfig};
use cuebox_common::RetriggerBehavior;
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::warn;

/// Bootstrap configuration loaded from TOML file
#[derive(Debug, Clone, Deserialize, Default)]
pub struct TomlConfig {
    /// Show file with `[[cues]]` definitions (optional)
    #[serde(default)]
    pub show_file: Option<PathBuf>,

    /// Logging configuration (optional)
    #[serde(default)]
    pub logging: LoggingConfig,

    /// Playback defaults (optional)
    #[serde(default)]
    pub playback: EngineConfig,
}

impl TomlConfig {
    /// Load from `path`, degrading to defaults when absent or invalid
    pub fn load(path: Option<&Path>) -> Self {
        let mut config: TomlConfig = load_toml_or_default(path);
        config.playback = config.playback.validated();
        config
    }
}

/// Playback defaults consumed by the engine
#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(default)]
pub struct EngineConfig {
    /// Fade-out used by `stop` when the cue has no fade-out of its own
    pub default_fade_out_ms: u64,

    /// Fade-out used by `stop_all`
    pub stop_all_fade_out_ms: u64,

    /// Crossfade ramp length
    pub crossfade_duration_ms: u64,

    /// Extra time after a crossfade ramp before the outgoing cue is force-stopped
    pub crossfade_safety_buffer_ms: u64,

    /// Crossfade progress reporting period
    pub crossfade_progress_interval_ms: u64,

    /// Ramp length for ducking and un-ducking
    pub ducking_fade_ms: u64,

    /// Delay between tearing down a session and restarting the same cue
    pub restart_settle_ms: u64,

    /// Cooldown window rejecting repeated playlist navigation
    pub navigation_debounce_ms: u64,

    /// Retrigger behavior for cues that do not configure one
    pub default_retrigger_behavior: RetriggerBehavior,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            default_fade_out_ms: 1000,
            stop_all_fade_out_ms: 1500,
            crossfade_duration_ms: 2000,
            crossfade_safety_buffer_ms: 100,
            crossfade_progress_interval_ms: 100,
            ducking_fade_ms: 500,
            restart_settle_ms: 150,
            navigation_debounce_ms: 100,
            default_retrigger_behavior: RetriggerBehavior::TogglePausePlay,
        }
    }
}

/// Upper bound for any configured fade (10 minutes)
const MAX_FADE_MS: u64 = 600_000;

impl EngineConfig {
    /// Clamp values into supported ranges, logging any adjustment
    pub fn validated(mut self) -> Self {
        clamp_setting("default_fade_out_ms", &mut self.default_fade_out_ms, 0, MAX_FADE_MS);
        clamp_setting("stop_all_fade_out_ms", &mut self.stop_all_fade_out_ms, 0, MAX_FADE_MS);
        clamp_setting("crossfade_duration_ms", &mut self.crossfade_duration_ms, 0, MAX_FADE_MS);
        clamp_setting(
            "crossfade_safety_buffer_ms",
            &mut self.crossfade_safety_buffer_ms,
            0,
            10_000,
        );
        // A zero period would spin the progress timer
        clamp_setting(
            "crossfade_progress_interval_ms",
            &mut self.crossfade_progress_interval_ms,
            10,
            5_000,
        );
        clamp_setting("ducking_fade_ms", &mut self.ducking_fade_ms, 0, MAX_FADE_MS);
        // The restart barrier must always be a real wait
        clamp_setting("restart_settle_ms", &mut self.restart_settle_ms, 1, 5_000);
        clamp_setting("navigation_debounce_ms", &mut self.navigation_debounce_ms, 0, 5_000);
        self
    }

    pub fn crossfade_duration(&self) -> Duration {
        Duration::from_millis(self.crossfade_duration_ms)
    }

    pub fn restart_settle(&self) -> Duration {
        Duration::from_millis(self.restart_settle_ms)
    }

    pub fn navigation_debounce(&self) -> Duration {
        Duration::from_millis(self.navigation_debounce_ms)
    }
}

fn clamp_setting(name: &str, value: &mut u64, min: u64, max: u64) {
    let clamped = (*value).clamp(min, max);
    if clamped != *value {
        warn!("{} = {} out of range, clamped to {}", name, value, clamped);
        *value = clamped;
    }
}
