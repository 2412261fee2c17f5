//! Core playback engine - state ownership and dispatch
//!
//! **Responsibilities:**
//! - PlaybackEngine struct definition and construction
//! - Dispatch of commands, sound events and timers
//! - Status sink and UI surface reporting helpers
//! - Shutdown

use cuebox_common::events::{CueEvent, PlaybackStatus, StatusDetails};
use cuebox_common::{Cue, CueId};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio::time::Instant;
use tracing::{debug, error, info, warn};

use crate::audio::{AudioBackend, InstanceId, ListenerToken, SoundHandle};
use crate::collaborators::{CueStore, StatusSink, UiSurface};
use crate::config::EngineConfig;
use crate::error::PlaybackError;
use crate::playback::messages::{EngineCommand, EngineMessage};
use crate::playback::play_order::PlayOrderTracker;
use crate::playback::store::PlaybackStateStore;
use crate::playback::timers::TimerRegistry;

/// Untracked parallel playback of a cue
pub(super) struct IndependentInstance {
    pub(super) id: InstanceId,
    pub(super) sound: Box<dyn SoundHandle>,
}

/// Cue playback orchestration engine
///
/// Owns every tracked session, the play order, all timers and all
/// independent instances. Mutated only from the engine task.
pub(crate) struct PlaybackEngine {
    /// Read-only configuration snapshot
    pub(super) config: EngineConfig,

    /// Sound handle factory
    pub(super) audio: Arc<dyn AudioBackend>,

    /// Cue definitions (refreshed on every fresh play)
    pub(super) cues: Arc<dyn CueStore>,

    /// Status/event destination
    pub(super) status: Arc<dyn StatusSink>,

    /// Optional control surface
    pub(super) ui: Option<Arc<dyn UiSurface>>,

    /// Internal channel for listeners and timers
    pub(super) tx: mpsc::UnboundedSender<EngineMessage>,

    /// One state per tracked cue
    pub(super) store: PlaybackStateStore,

    /// Most recently started first
    pub(super) play_order: PlayOrderTracker,

    pub(super) timers: TimerRegistry,

    /// Parallel instances, never part of the store
    pub(super) instances: HashMap<CueId, Vec<IndependentInstance>>,

    /// Cues torn down by a forced restart, waiting out the settle delay
    pub(super) pending_restarts: HashMap<CueId, Cue>,

    /// Navigation rejected until the stored instant
    pub(super) navigation_cooldown: HashMap<CueId, Instant>,

    /// Logical playlist index per cue, remembered after the session ends
    pub(super) last_known_index: HashMap<CueId, usize>,

    /// Toggle of an idle cue crossfades instead of playing
    pub(super) crossfade_mode: bool,

    next_token: u64,
}

impl PlaybackEngine {
    pub(crate) fn new(
        config: EngineConfig,
        audio: Arc<dyn AudioBackend>,
        cues: Arc<dyn CueStore>,
        status: Arc<dyn StatusSink>,
        ui: Option<Arc<dyn UiSurface>>,
        tx: mpsc::UnboundedSender<EngineMessage>,
    ) -> Self {
        Self {
            config,
            audio,
            cues,
            status,
            ui,
            timers: TimerRegistry::new(tx.clone()),
            tx,
            store: PlaybackStateStore::new(),
            play_order: PlayOrderTracker::new(),
            instances: HashMap::new(),
            pending_restarts: HashMap::new(),
            navigation_cooldown: HashMap::new(),
            last_known_index: HashMap::new(),
            crossfade_mode: false,
            next_token: 0,
        }
    }

    /// Handle one command; returns false once the engine should exit
    pub(crate) fn handle_command(&mut self, command: EngineCommand) -> bool {
        debug!("Command: {:?}", command);
        match command {
            EngineCommand::Play { cue, resume, reply } => {
                self.play(cue, resume);
                let _ = reply.send(());
            }
            EngineCommand::Stop { cue_id, options, reply } => {
                self.stop(&cue_id, options);
                let _ = reply.send(());
            }
            EngineCommand::Pause { cue_id, reply } => {
                let _ = reply.send(self.pause(&cue_id));
            }
            EngineCommand::Toggle {
                cue_id,
                from_companion,
                retrigger_override,
                reply,
            } => {
                self.toggle(&cue_id, from_companion, retrigger_override);
                let _ = reply.send(());
            }
            EngineCommand::StopAll { options, reply } => {
                self.stop_all(options);
                let _ = reply.send(());
            }
            EngineCommand::Seek {
                cue_id,
                position_secs,
                reply,
            } => {
                let _ = reply.send(self.seek(&cue_id, position_secs));
            }
            EngineCommand::Navigate {
                cue_id,
                direction,
                reply,
            } => {
                let _ = reply.send(self.navigate(&cue_id, direction));
            }
            EngineCommand::SetCrossfadeMode { enabled, reply } => {
                info!("Crossfade mode {}", if enabled { "on" } else { "off" });
                self.crossfade_mode = enabled;
                let _ = reply.send(());
            }
            EngineCommand::GetPlaybackState { cue_id, reply } => {
                let _ = reply.send(self.playback_snapshot(&cue_id));
            }
            EngineCommand::GetCurrentlyPlaying { reply } => {
                let _ = reply.send(self.currently_playing());
            }
            EngineCommand::CheckInvariants { reply } => {
                let _ = reply.send(self.store.check_invariants());
            }
            EngineCommand::Shutdown { reply } => {
                self.shutdown();
                let _ = reply.send(());
                return false;
            }
        }
        self.warn_on_violations();
        true
    }

    pub(crate) fn handle_message(&mut self, message: EngineMessage) {
        match message {
            EngineMessage::Sound { owner, event } => self.on_sound_event(owner, event),
            EngineMessage::Timer { id, cue_id, kind } => self.on_timer(id, cue_id, kind),
        }
        self.warn_on_violations();
    }

    /// Stop everything and release every handle
    pub(crate) fn shutdown(&mut self) {
        info!(
            "Shutting down playback engine ({} tracked cues)",
            self.store.len()
        );
        self.timers.cancel_all();
        self.pending_restarts.clear();
        for cue_id in self.store.cue_ids() {
            if let Some(mut state) = self.store.remove(&cue_id) {
                if let Some(mut sound) = state.take_sound() {
                    sound.stop();
                    sound.unload();
                }
            }
            self.play_order.remove(&cue_id);
        }
        for cue_id in self.instances.keys().cloned().collect::<Vec<_>>() {
            self.stop_instances(&cue_id);
        }
    }

    pub(super) fn next_token(&mut self) -> ListenerToken {
        self.next_token += 1;
        ListenerToken(self.next_token)
    }

    /// Latest definition from the cue store, else the tracked snapshot
    pub(super) fn resolve_cue(&self, cue_id: &CueId) -> Option<Cue> {
        self.cues
            .get_cue_by_id(cue_id)
            .or_else(|| self.store.get(cue_id).map(|s| s.cue().clone()))
    }

    // ========================================
    // Reporting
    // ========================================

    pub(super) fn report(&self, cue_id: &CueId, status: PlaybackStatus, details: StatusDetails) {
        self.status.send(CueEvent::CueStatus {
            cue_id: cue_id.clone(),
            status,
            details,
            timestamp: chrono::Utc::now(),
        });
    }

    /// Report a playback failure once, with its machine-readable reason
    pub(super) fn report_error(&self, cue_id: &CueId, err: &PlaybackError) {
        error!("Playback error for cue '{}': {}", cue_id, err);
        self.report(
            cue_id,
            PlaybackStatus::Error,
            StatusDetails::reason(err.reason()).with_message(err.to_string()),
        );
        // A live session keeps its own button state
        if let Some(ui) = &self.ui {
            if !cue_id.is_blank() && !self.store.contains(cue_id) {
                ui.update_button_playing_state(cue_id, false, None, false, true);
            }
        }
    }

    /// Report `CuedNext` naming the item the session is parked on
    pub(super) fn report_cued(&self, cue_id: &CueId, item_name: &str) {
        self.report(
            cue_id,
            PlaybackStatus::CuedNext,
            StatusDetails::default()
                .with_message(format!("Next: {}", item_name))
                .with_item(item_name),
        );
    }

    /// Recompute the priority cue and notify on change
    pub(super) fn refresh_current_cue(&mut self) {
        if let Some(current) = self.play_order.refresh(&self.store) {
            debug!("Current cue is now {:?}", current);
            self.status.send(CueEvent::CurrentCueChanged {
                cue_id: current,
                timestamp: chrono::Utc::now(),
            });
        }
    }

    /// Push the cue's button and highlight state to the UI surface
    pub(super) fn sync_ui(&self, cue_id: &CueId) {
        let Some(ui) = &self.ui else {
            return;
        };
        match self.store.get(cue_id) {
            Some(state) => {
                let item = state.playlist.as_ref().and_then(|p| p.current_item());
                let label = item.map(|item| {
                    if state.has_sound() {
                        item.display_name().to_string()
                    } else {
                        format!("Next: {}", item.display_name())
                    }
                });
                ui.update_button_playing_state(
                    cue_id,
                    state.is_playing(),
                    label.as_deref(),
                    state.is_cued || state.is_cued_next,
                    false,
                );
                if state.is_playlist() {
                    ui.highlight_playing_playlist_item(cue_id, item.map(|i| i.id.as_str()));
                }
            }
            None => {
                ui.update_button_playing_state(cue_id, false, None, false, false);
                ui.highlight_playing_playlist_item(cue_id, None);
            }
        }
    }

    fn warn_on_violations(&self) {
        if cfg!(debug_assertions) {
            for violation in self.store.check_invariants() {
                warn!("State invariant violated: {:?}", violation);
            }
        }
    }
}
