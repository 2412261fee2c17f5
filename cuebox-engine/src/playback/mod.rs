//! Cue playback state and orchestration

pub(crate) mod engine;
pub mod fade;
pub(crate) mod messages;
pub mod play_order;
pub mod playlist;
pub mod queries;
pub mod state;
pub mod store;
pub(crate) mod timers;

pub use fade::{FadeDirection, FadeRamp};
pub use messages::{StopAllOptions, StopOptions, TimerId, TimerKind};
pub use playlist::{NavDirection, PlaylistState};
pub use queries::{ActiveCue, CurrentlyPlaying, InstanceSummary, PlaybackSnapshot};
pub use state::{StopReason, StopSource};
pub use store::InvariantViolation;
