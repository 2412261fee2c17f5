//! Playback engine
//!
//! **Module Structure:**
//! - `core.rs`: engine struct, message dispatch, status and UI reporting
//! - `controller.rs`: play/stop/pause/toggle/stop_all/seek, handle acquisition
//! - `navigator.rs`: playlist item resolution, end-of-item transitions, navigation
//! - `ducking.rs`: trigger ducking and reversion
//! - `crossfade.rs`: crossfade start and outgoing-cue bookkeeping
//! - `cleanup.rs`: timer/handle teardown and terminal transitions
//! - `events.rs`: sound event and timer transitions
//! - `diagnostics.rs`: snapshot queries and invariant checks
//!
//! All modules extend the same `PlaybackEngine`; it is owned by one task (see
//! `crate::service`) and never shared.

mod cleanup;
mod controller;
mod core;
mod crossfade;
mod diagnostics;
mod ducking;
mod events;
mod navigator;

pub(crate) use self::core::PlaybackEngine;
pub(crate) use cleanup::CleanupOptions;
