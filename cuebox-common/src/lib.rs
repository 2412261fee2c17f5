//! # Cuebox Common Library
//!
//! Shared code for the cuebox workspace including:
//! - Cue model (cues, playlist items, retrigger and end-of-list modes)
//! - Event types (CueEvent enum) and the broadcast EventBus
//! - Configuration file resolution and TOML loading
//! - Common error type

pub mod config;
pub mod cue;
pub mod error;
pub mod events;

pub use cue::{Cue, CueId, CueType, PlaylistEndMode, PlaylistItem, RetriggerBehavior};
pub use error::{Error, Result};
