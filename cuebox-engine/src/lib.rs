//! # Cuebox Playback Engine (cuebox-engine)
//!
//! Orchestrates the lifecycle of concurrently playing cues: start, pause,
//! resume, stop, fade, duck, crossfade and playlist traversal, on top of an
//! abstract audio backend.
//!
//! **Architecture:** one engine task owns all playback state. Client commands,
//! sound-handle events and timers arrive as messages and are applied one at a
//! time, so overlapping completions for a cue never interleave.
//!
//! ```no_run
//! use cuebox_common::events::EventBus;
//! use cuebox_engine::{EngineConfig, EngineService, InMemoryCueStore, SimulatedAudioBackend};
//! use std::sync::Arc;
//!
//! # async fn demo() -> cuebox_engine::Result<()> {
//! let cues = Arc::new(InMemoryCueStore::from_cues([cuebox_common::Cue::single("intro", "/show/intro.wav")]));
//! let bus = Arc::new(EventBus::new(256));
//! let (engine, _task) = EngineService::new(
//!     EngineConfig::default(),
//!     Arc::new(SimulatedAudioBackend::new(30.0)),
//!     cues,
//!     bus,
//! )
//! .spawn();
//!
//! engine.toggle("intro", false, None).await?;
//! # Ok(())
//! # }
//! ```

pub mod audio;
pub mod collaborators;
pub mod config;
pub mod error;
pub mod playback;
pub mod service;
pub mod shell;

pub use audio::{AudioBackend, SimulatedAudioBackend, SoundEvent, SoundHandle, SoundListener};
pub use collaborators::{CueStore, InMemoryCueStore, NoUi, StatusSink, UiSurface};
pub use config::{EngineConfig, TomlConfig};
pub use error::{Error, PlaybackError, Result};
pub use service::{EngineHandle, EngineService};
