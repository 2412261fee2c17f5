//! Audio collaborator boundary
//!
//! The engine never touches samples. It drives opaque sound handles created by
//! an `AudioBackend` and learns about their progress through `SoundEvent`s
//! delivered to a `SoundListener`.
//!
//! **Listener tokens:** every handle attached to a tracked cue gets a fresh
//! `ListenerToken`. Events carry the token they were registered with; the
//! engine drops events whose token no longer matches the cue's current one.
//! Detaching listeners is therefore effective even if a backend keeps firing
//! after `detach_listeners()`.

pub mod simulated;

pub use simulated::SimulatedAudioBackend;

use cuebox_common::CueId;
use std::fmt;
use std::path::Path;
use std::time::Duration;
use thiserror::Error;
use tokio::sync::mpsc;
use uuid::Uuid;

use crate::playback::messages::EngineMessage;

/// Completion and state events fired by a sound handle
#[derive(Debug, Clone, PartialEq)]
pub enum SoundEvent {
    /// Handle started or resumed producing audio
    Play,
    /// Handle paused
    Pause,
    /// Handle stopped (explicit stop or end of a fade-to-stop)
    Stop,
    /// Handle reached the end of its media
    End,
    /// Media could not be loaded or decoded
    LoadError(String),
}

/// Generation token tying events to one handle attachment
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ListenerToken(pub(crate) u64);

/// Identity of an independent (untracked) playback instance
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct InstanceId(pub Uuid);

impl InstanceId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for InstanceId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for InstanceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Who a sound handle reports to
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SoundOwner {
    /// Handle attached to the tracked session of a cue
    Cue { cue_id: CueId, token: ListenerToken },
    /// Independent instance, never part of the state store
    Instance { cue_id: CueId, instance_id: InstanceId },
}

impl SoundOwner {
    pub fn cue_id(&self) -> &CueId {
        match self {
            SoundOwner::Cue { cue_id, .. } => cue_id,
            SoundOwner::Instance { cue_id, .. } => cue_id,
        }
    }
}

/// Event sink handed to the backend for one handle
///
/// Cloneable and thread-safe; backends may fire from any thread.
#[derive(Clone)]
pub struct SoundListener {
    owner: SoundOwner,
    tx: mpsc::UnboundedSender<EngineMessage>,
}

impl SoundListener {
    pub(crate) fn new(owner: SoundOwner, tx: mpsc::UnboundedSender<EngineMessage>) -> Self {
        Self { owner, tx }
    }

    pub fn owner(&self) -> &SoundOwner {
        &self.owner
    }

    /// Deliver an event to the engine (ignored once the engine has shut down)
    pub fn emit(&self, event: SoundEvent) {
        let _ = self.tx.send(EngineMessage::Sound {
            owner: self.owner.clone(),
            event,
        });
    }
}

impl fmt::Debug for SoundListener {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SoundListener").field("owner", &self.owner).finish()
    }
}

/// Parameters for creating a sound handle
#[derive(Debug, Clone, PartialEq)]
pub struct SoundRequest {
    /// File reference to load
    pub file_path: String,
    /// Volume the handle should start at (0.0-1.0)
    pub initial_volume: f32,
    /// Loop the media inside the handle (single cues only)
    pub looping: bool,
    /// Start offset in seconds
    pub trim_start_secs: Option<f64>,
    /// End offset in seconds
    pub trim_end_secs: Option<f64>,
    /// Known duration, when the cue store has one
    pub duration_hint_secs: Option<f64>,
    /// Display label (cue or item name) for backend diagnostics
    pub label: String,
}

/// Handle creation failure reported by the backend
#[derive(Error, Debug, Clone, PartialEq)]
pub enum AudioError {
    /// Backend could not produce a handle (no device, unsupported format)
    #[error("sound unavailable: {0}")]
    Unavailable(String),

    /// Backend failed unexpectedly while setting up the handle
    #[error("sound setup failed: {0}")]
    Setup(String),
}

/// Audio engine collaborator
pub trait AudioBackend: Send + Sync {
    /// Create a stopped handle for `request`; events go to `listener`
    fn create_handle(
        &self,
        request: &SoundRequest,
        listener: SoundListener,
    ) -> std::result::Result<Box<dyn SoundHandle>, AudioError>;

    /// Probe whether a file reference exists
    fn file_exists(&self, path: &Path) -> bool;
}

/// Opaque playable sound
///
/// Handles are exclusively owned by one session (or one independent instance).
pub trait SoundHandle: Send {
    fn play(&mut self);
    fn pause(&mut self);
    fn stop(&mut self);
    fn seek(&mut self, position_secs: f64);

    /// Current volume (0.0-1.0), including any in-progress ramp
    fn volume(&self) -> f32;
    fn set_volume(&mut self, volume: f32);

    /// Linear ramp from `from` to `to` over `duration`
    fn fade(&mut self, from: f32, to: f32, duration: Duration);

    /// True while producing audio
    fn playing(&self) -> bool;

    /// Media duration in seconds, once known
    fn duration(&self) -> Option<f64>;

    /// Playback position in seconds
    fn position(&self) -> f64;

    /// Stop delivering events to the listener
    fn detach_listeners(&mut self);

    /// Release the underlying media resource
    fn unload(&mut self);
}
