//! Engine service
//!
//! `EngineService` wires collaborators into a `PlaybackEngine` and runs it on
//! its own tokio task. Clients talk to it through `EngineHandle`, a cheap
//! cloneable front end; each call sends one command and awaits its reply.
//!
//! The task exits on `shutdown()` or when the last handle is dropped, stopping
//! and releasing every sound on the way out.

use cuebox_common::{Cue, CueId, RetriggerBehavior};
use std::sync::Arc;
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tracing::{debug, info};

use crate::audio::AudioBackend;
use crate::collaborators::{CueStore, StatusSink, UiSurface};
use crate::config::EngineConfig;
use crate::error::{Error, Result};
use crate::playback::engine::PlaybackEngine;
use crate::playback::messages::{EngineCommand, EngineMessage};
use crate::playback::{
    CurrentlyPlaying, InvariantViolation, NavDirection, PlaybackSnapshot, StopAllOptions,
    StopOptions,
};

/// Builder for the engine task
pub struct EngineService {
    config: EngineConfig,
    audio: Arc<dyn AudioBackend>,
    cues: Arc<dyn CueStore>,
    status: Arc<dyn StatusSink>,
    ui: Option<Arc<dyn UiSurface>>,
}

impl EngineService {
    pub fn new(
        config: EngineConfig,
        audio: Arc<dyn AudioBackend>,
        cues: Arc<dyn CueStore>,
        status: Arc<dyn StatusSink>,
    ) -> Self {
        Self {
            config,
            audio,
            cues,
            status,
            ui: None,
        }
    }

    pub fn with_ui(mut self, ui: Arc<dyn UiSurface>) -> Self {
        self.ui = Some(ui);
        self
    }

    /// Spawn the engine task on the current runtime
    pub fn spawn(self) -> (EngineHandle, JoinHandle<()>) {
        let (command_tx, command_rx) = mpsc::unbounded_channel();
        let (message_tx, message_rx) = mpsc::unbounded_channel();
        let engine = PlaybackEngine::new(
            self.config.validated(),
            self.audio,
            self.cues,
            self.status,
            self.ui,
            message_tx,
        );
        let task = tokio::spawn(run(engine, command_rx, message_rx));
        (EngineHandle { tx: command_tx }, task)
    }
}

async fn run(
    mut engine: PlaybackEngine,
    mut commands: mpsc::UnboundedReceiver<EngineCommand>,
    mut messages: mpsc::UnboundedReceiver<EngineMessage>,
) {
    info!("Playback engine started");
    loop {
        tokio::select! {
            // Sound events and timers queued before a command are handled first
            biased;

            Some(message) = messages.recv() => engine.handle_message(message),

            command = commands.recv() => match command {
                Some(command) => {
                    if !engine.handle_command(command) {
                        break;
                    }
                }
                None => {
                    debug!("All engine handles dropped");
                    engine.shutdown();
                    break;
                }
            },
        }
    }
    info!("Playback engine stopped");
}

/// Client handle to a running engine
#[derive(Clone, Debug)]
pub struct EngineHandle {
    tx: mpsc::UnboundedSender<EngineCommand>,
}

impl EngineHandle {
    async fn request<T>(
        &self,
        build: impl FnOnce(oneshot::Sender<T>) -> EngineCommand,
    ) -> Result<T> {
        let (reply, rx) = oneshot::channel();
        self.tx
            .send(build(reply))
            .map_err(|_| Error::EngineUnavailable)?;
        rx.await.map_err(|_| Error::EngineUnavailable)
    }

    /// Start (or restart) a cue; `resume` continues a paused session instead
    pub async fn play(&self, cue: Cue, resume: bool) -> Result<()> {
        self.request(|reply| EngineCommand::Play { cue, resume, reply })
            .await
    }

    pub async fn stop(&self, cue_id: impl Into<CueId>, options: StopOptions) -> Result<()> {
        let cue_id = cue_id.into();
        self.request(|reply| EngineCommand::Stop {
            cue_id,
            options,
            reply,
        })
        .await
    }

    /// Pause a playing cue; `Ok(false)` when it was not playing
    pub async fn pause(&self, cue_id: impl Into<CueId>) -> Result<bool> {
        let cue_id = cue_id.into();
        self.request(|reply| EngineCommand::Pause { cue_id, reply })
            .await
    }

    /// Retrigger a cue (the button press)
    pub async fn toggle(
        &self,
        cue_id: impl Into<CueId>,
        from_companion: bool,
        retrigger_override: Option<RetriggerBehavior>,
    ) -> Result<()> {
        let cue_id = cue_id.into();
        self.request(|reply| EngineCommand::Toggle {
            cue_id,
            from_companion,
            retrigger_override,
            reply,
        })
        .await
    }

    pub async fn stop_all(&self, options: StopAllOptions) -> Result<()> {
        self.request(|reply| EngineCommand::StopAll { options, reply })
            .await
    }

    pub async fn seek(&self, cue_id: impl Into<CueId>, position_secs: f64) -> Result<bool> {
        let cue_id = cue_id.into();
        self.request(|reply| EngineCommand::Seek {
            cue_id,
            position_secs,
            reply,
        })
        .await
    }

    pub async fn navigate_next(&self, cue_id: impl Into<CueId>) -> Result<bool> {
        self.navigate(cue_id.into(), NavDirection::Next).await
    }

    pub async fn navigate_previous(&self, cue_id: impl Into<CueId>) -> Result<bool> {
        self.navigate(cue_id.into(), NavDirection::Previous).await
    }

    async fn navigate(&self, cue_id: CueId, direction: NavDirection) -> Result<bool> {
        self.request(|reply| EngineCommand::Navigate {
            cue_id,
            direction,
            reply,
        })
        .await
    }

    /// Toggle of an idle cue crossfades while enabled
    pub async fn set_crossfade_mode(&self, enabled: bool) -> Result<()> {
        self.request(|reply| EngineCommand::SetCrossfadeMode { enabled, reply })
            .await
    }

    pub async fn get_playback_state(
        &self,
        cue_id: impl Into<CueId>,
    ) -> Result<Option<PlaybackSnapshot>> {
        let cue_id = cue_id.into();
        self.request(|reply| EngineCommand::GetPlaybackState { cue_id, reply })
            .await
    }

    pub async fn get_currently_playing(&self) -> Result<CurrentlyPlaying> {
        self.request(|reply| EngineCommand::GetCurrentlyPlaying { reply })
            .await
    }

    /// Per-state invariant violations (empty when consistent)
    pub async fn check_invariants(&self) -> Result<Vec<InvariantViolation>> {
        self.request(|reply| EngineCommand::CheckInvariants { reply })
            .await
    }

    /// Stop everything and end the engine task
    pub async fn shutdown(&self) -> Result<()> {
        self.request(|reply| EngineCommand::Shutdown { reply })
            .await
    }

    /// True while the engine task is running
    pub fn is_running(&self) -> bool {
        !self.tx.is_closed()
    }
}
