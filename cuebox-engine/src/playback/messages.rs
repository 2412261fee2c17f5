//! Internal engine messages (not exposed to clients)
//!
//! Everything that can mutate playback state arrives at the engine task on one
//! of two unbounded channels: `EngineCommand`s from `EngineHandle`s, and
//! `EngineMessage`s (sound events from handles, fired timers). The task handles
//! one item at a time, which serializes every mutation of a cue's state.
//! Internal messages are drained before the next command.

use cuebox_common::{Cue, CueId, RetriggerBehavior};
use std::fmt;
use tokio::sync::oneshot;

use crate::audio::{SoundEvent, SoundOwner};
use crate::playback::playlist::NavDirection;
use crate::playback::queries::{CurrentlyPlaying, PlaybackSnapshot};
use crate::playback::state::StopReason;
use crate::playback::store::InvariantViolation;

/// Identity of one scheduled timer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TimerId(pub(crate) u64);

/// What a timer does when it fires
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TimerKind {
    /// Settle delay after a forced restart elapsed; start the pending session
    Restart,
    /// Fade-in ramp finished; clear the ramp record
    FadeInComplete,
    /// Stop fade finished; stop the handle
    FadeOutComplete,
    /// Crossfade ramp plus buffer elapsed; force-stop the outgoing cue
    CrossfadeSafetyStop,
    /// Periodic crossfade progress report for an outgoing cue
    CrossfadeProgress { incoming: CueId },
}

impl TimerKind {
    /// Repeating timers are cleared with intervals, the rest with timers
    pub fn is_interval(&self) -> bool {
        matches!(self, TimerKind::CrossfadeProgress { .. })
    }

    /// Owned by a session (as opposed to the restart barrier, which outlives one)
    pub fn is_session_timer(&self) -> bool {
        !matches!(self, TimerKind::Restart)
    }
}

/// Options for `stop`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StopOptions {
    pub use_fade: bool,
    pub from_companion: bool,
    pub is_retrigger_stop: bool,
    pub reason: StopReason,
}

impl Default for StopOptions {
    fn default() -> Self {
        Self {
            use_fade: false,
            from_companion: false,
            is_retrigger_stop: false,
            reason: StopReason::UserStop,
        }
    }
}

impl StopOptions {
    pub fn immediate() -> Self {
        Self::default()
    }

    pub fn with_fade() -> Self {
        Self {
            use_fade: true,
            ..Self::default()
        }
    }
}

/// Options for `stop_all`
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StopAllOptions {
    pub except_cue_id: Option<CueId>,
    pub use_fade: bool,
}

/// Command from an `EngineHandle`
pub(crate) enum EngineCommand {
    Play {
        cue: Cue,
        resume: bool,
        reply: oneshot::Sender<()>,
    },
    Stop {
        cue_id: CueId,
        options: StopOptions,
        reply: oneshot::Sender<()>,
    },
    Pause {
        cue_id: CueId,
        reply: oneshot::Sender<bool>,
    },
    Toggle {
        cue_id: CueId,
        from_companion: bool,
        retrigger_override: Option<RetriggerBehavior>,
        reply: oneshot::Sender<()>,
    },
    StopAll {
        options: StopAllOptions,
        reply: oneshot::Sender<()>,
    },
    Seek {
        cue_id: CueId,
        position_secs: f64,
        reply: oneshot::Sender<bool>,
    },
    Navigate {
        cue_id: CueId,
        direction: NavDirection,
        reply: oneshot::Sender<bool>,
    },
    SetCrossfadeMode {
        enabled: bool,
        reply: oneshot::Sender<()>,
    },
    GetPlaybackState {
        cue_id: CueId,
        reply: oneshot::Sender<Option<PlaybackSnapshot>>,
    },
    GetCurrentlyPlaying {
        reply: oneshot::Sender<CurrentlyPlaying>,
    },
    CheckInvariants {
        reply: oneshot::Sender<Vec<InvariantViolation>>,
    },
    Shutdown {
        reply: oneshot::Sender<()>,
    },
}

impl fmt::Debug for EngineCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EngineCommand::Play { cue, resume, .. } => {
                write!(f, "Play({}, resume={})", cue.id, resume)
            }
            EngineCommand::Stop { cue_id, options, .. } => {
                write!(f, "Stop({}, {:?})", cue_id, options)
            }
            EngineCommand::Pause { cue_id, .. } => write!(f, "Pause({})", cue_id),
            EngineCommand::Toggle { cue_id, retrigger_override, .. } => {
                write!(f, "Toggle({}, override={:?})", cue_id, retrigger_override)
            }
            EngineCommand::StopAll { options, .. } => write!(f, "StopAll({:?})", options),
            EngineCommand::Seek { cue_id, position_secs, .. } => {
                write!(f, "Seek({}, {:.2}s)", cue_id, position_secs)
            }
            EngineCommand::Navigate { cue_id, direction, .. } => {
                write!(f, "Navigate({}, {})", cue_id, direction)
            }
            EngineCommand::SetCrossfadeMode { enabled, .. } => {
                write!(f, "SetCrossfadeMode({})", enabled)
            }
            EngineCommand::GetPlaybackState { cue_id, .. } => {
                write!(f, "GetPlaybackState({})", cue_id)
            }
            EngineCommand::GetCurrentlyPlaying { .. } => write!(f, "GetCurrentlyPlaying"),
            EngineCommand::CheckInvariants { .. } => write!(f, "CheckInvariants"),
            EngineCommand::Shutdown { .. } => write!(f, "Shutdown"),
        }
    }
}

/// Internal traffic: sound events and fired timers
#[derive(Debug)]
pub(crate) enum EngineMessage {
    Sound {
        owner: SoundOwner,
        event: SoundEvent,
    },
    Timer {
        id: TimerId,
        cue_id: CueId,
        kind: TimerKind,
    },
}
