//! Test helpers for cuebox engine integration tests
//!
//! Provides:
//! - MockAudioBackend: records every handle it creates and lets tests finish
//!   or fail sounds on demand
//! - RecordingStatusSink / RecordingUi: capture what the engine reports
//! - TestEngine: a running engine wired to the mocks

#![allow(dead_code)]

use cuebox_common::events::{CueEvent, PlaybackStatus, StatusDetails};
use cuebox_common::{Cue, CueId, PlaylistItem};
use cuebox_engine::audio::{AudioError, SoundRequest};
use cuebox_engine::playback::PlaybackSnapshot;
use cuebox_engine::{
    AudioBackend, EngineConfig, EngineHandle, EngineService, InMemoryCueStore, SoundEvent,
    SoundHandle, SoundListener, StatusSink, UiSurface,
};
use std::collections::HashSet;
use std::path::Path;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::task::JoinHandle;

// ============================================================================
// Mock audio backend
// ============================================================================

/// Everything observable about one mock handle
#[derive(Debug)]
pub struct MockSoundState {
    pub file_path: String,
    pub label: String,
    pub initial_volume: f32,
    pub looping: bool,
    pub volume: f32,
    pub playing: bool,
    pub stopped: bool,
    pub unloaded: bool,
    pub detached: bool,
    pub position: f64,
    /// Every `fade(from, to, duration)` call, in order
    pub fades: Vec<(f32, f32, Duration)>,
    /// `play` stays silent until `MockProbe::report_started`
    pub hold_play: bool,
    listener: SoundListener,
}

impl MockSoundState {
    fn emit(&self, event: SoundEvent) {
        if !self.detached {
            self.listener.emit(event);
        }
    }
}

/// Handle given to the engine; shares its state with a `MockProbe`
struct MockSound {
    state: Arc<Mutex<MockSoundState>>,
}

impl SoundHandle for MockSound {
    fn play(&mut self) {
        let mut state = self.state.lock().unwrap();
        state.playing = true;
        state.stopped = false;
        if !state.hold_play {
            state.emit(SoundEvent::Play);
        }
    }

    fn pause(&mut self) {
        let mut state = self.state.lock().unwrap();
        state.playing = false;
        state.emit(SoundEvent::Pause);
    }

    fn stop(&mut self) {
        let mut state = self.state.lock().unwrap();
        if state.stopped {
            return;
        }
        state.playing = false;
        state.stopped = true;
        state.emit(SoundEvent::Stop);
    }

    fn seek(&mut self, position_secs: f64) {
        self.state.lock().unwrap().position = position_secs;
    }

    fn volume(&self) -> f32 {
        self.state.lock().unwrap().volume
    }

    fn set_volume(&mut self, volume: f32) {
        self.state.lock().unwrap().volume = volume;
    }

    fn fade(&mut self, from: f32, to: f32, duration: Duration) {
        let mut state = self.state.lock().unwrap();
        state.fades.push((from, to, duration));
        // Ramps land instantly; tests assert on the recorded targets
        state.volume = to;
    }

    fn playing(&self) -> bool {
        self.state.lock().unwrap().playing
    }

    fn duration(&self) -> Option<f64> {
        Some(60.0)
    }

    fn position(&self) -> f64 {
        self.state.lock().unwrap().position
    }

    fn detach_listeners(&mut self) {
        self.state.lock().unwrap().detached = true;
    }

    fn unload(&mut self) {
        self.state.lock().unwrap().unloaded = true;
    }
}

/// Test-side view of a created handle
#[derive(Clone)]
pub struct MockProbe {
    state: Arc<Mutex<MockSoundState>>,
}

impl MockProbe {
    pub fn file_path(&self) -> String {
        self.state.lock().unwrap().file_path.clone()
    }

    pub fn is_playing(&self) -> bool {
        self.state.lock().unwrap().playing
    }

    pub fn is_stopped(&self) -> bool {
        self.state.lock().unwrap().stopped
    }

    pub fn is_unloaded(&self) -> bool {
        self.state.lock().unwrap().unloaded
    }

    pub fn is_detached(&self) -> bool {
        self.state.lock().unwrap().detached
    }

    pub fn volume(&self) -> f32 {
        self.state.lock().unwrap().volume
    }

    pub fn initial_volume(&self) -> f32 {
        self.state.lock().unwrap().initial_volume
    }

    pub fn is_looping(&self) -> bool {
        self.state.lock().unwrap().looping
    }

    pub fn position(&self) -> f64 {
        self.state.lock().unwrap().position
    }

    pub fn fades(&self) -> Vec<(f32, f32, Duration)> {
        self.state.lock().unwrap().fades.clone()
    }

    pub fn last_fade(&self) -> Option<(f32, f32, Duration)> {
        self.state.lock().unwrap().fades.last().copied()
    }

    /// Media reached its end
    pub fn finish(&self) {
        let mut state = self.state.lock().unwrap();
        state.playing = false;
        state.emit(SoundEvent::End);
    }

    /// Deliver the `Play` event held back by `MockAudioBackend::mark_slow_start`
    pub fn report_started(&self) {
        let mut state = self.state.lock().unwrap();
        state.hold_play = false;
        state.playing = true;
        state.emit(SoundEvent::Play);
    }

    /// Media failed to load after the handle was created
    pub fn fail(&self, message: &str) {
        let mut state = self.state.lock().unwrap();
        state.playing = false;
        state.emit(SoundEvent::LoadError(message.to_string()));
    }

    /// Fire an event even if the engine detached the listener
    pub fn emit_stale(&self, event: SoundEvent) {
        self.state.lock().unwrap().listener.emit(event);
    }
}

#[derive(Default)]
struct MockBackendInner {
    handles: Vec<Arc<Mutex<MockSoundState>>>,
    missing: HashSet<String>,
    unavailable: HashSet<String>,
    panicking: HashSet<String>,
    slow_start: HashSet<String>,
}

/// Backend recording every handle it creates
#[derive(Default)]
pub struct MockAudioBackend {
    inner: Mutex<MockBackendInner>,
}

impl MockAudioBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// `file_exists` answers false for `path`
    pub fn mark_missing(&self, path: &str) {
        self.inner.lock().unwrap().missing.insert(path.to_string());
    }

    /// `create_handle` fails with `Unavailable` for `path`
    pub fn mark_unavailable(&self, path: &str) {
        self.inner.lock().unwrap().unavailable.insert(path.to_string());
    }

    /// `create_handle` panics for `path`
    pub fn mark_panicking(&self, path: &str) {
        self.inner.lock().unwrap().panicking.insert(path.to_string());
    }

    /// Handles for `path` hold their `Play` event until the test releases it
    pub fn mark_slow_start(&self, path: &str) {
        self.inner.lock().unwrap().slow_start.insert(path.to_string());
    }

    pub fn created(&self) -> usize {
        self.inner.lock().unwrap().handles.len()
    }

    /// Every handle created for `path`, oldest first
    pub fn handles_for(&self, path: &str) -> Vec<MockProbe> {
        self.inner
            .lock()
            .unwrap()
            .handles
            .iter()
            .filter(|h| h.lock().unwrap().file_path == path)
            .map(|h| MockProbe { state: h.clone() })
            .collect()
    }

    /// Newest handle created for `path`
    pub fn latest(&self, path: &str) -> MockProbe {
        self.handles_for(path)
            .pop()
            .unwrap_or_else(|| panic!("no handle created for {}", path))
    }
}

impl AudioBackend for MockAudioBackend {
    fn create_handle(
        &self,
        request: &SoundRequest,
        listener: SoundListener,
    ) -> Result<Box<dyn SoundHandle>, AudioError> {
        let mut inner = self.inner.lock().unwrap();
        if inner.unavailable.contains(&request.file_path) {
            return Err(AudioError::Unavailable(format!(
                "cannot open {}",
                request.file_path
            )));
        }
        if inner.panicking.contains(&request.file_path) {
            drop(inner);
            panic!("decoder exploded on {}", request.file_path);
        }
        let state = Arc::new(Mutex::new(MockSoundState {
            file_path: request.file_path.clone(),
            label: request.label.clone(),
            initial_volume: request.initial_volume,
            looping: request.looping,
            volume: request.initial_volume,
            playing: false,
            stopped: false,
            unloaded: false,
            detached: false,
            position: 0.0,
            fades: Vec::new(),
            hold_play: inner.slow_start.contains(&request.file_path),
            listener,
        }));
        inner.handles.push(state.clone());
        Ok(Box::new(MockSound { state }))
    }

    fn file_exists(&self, path: &Path) -> bool {
        let inner = self.inner.lock().unwrap();
        !inner.missing.contains(path.to_string_lossy().as_ref())
    }
}

// ============================================================================
// Recording collaborators
// ============================================================================

/// Status sink keeping every event
#[derive(Default)]
pub struct RecordingStatusSink {
    events: Mutex<Vec<CueEvent>>,
}

impl RecordingStatusSink {
    pub fn events(&self) -> Vec<CueEvent> {
        self.events.lock().unwrap().clone()
    }

    /// `(status, details)` of every status event for `cue_id`, in order
    pub fn statuses(&self, cue_id: &str) -> Vec<(PlaybackStatus, StatusDetails)> {
        self.events
            .lock()
            .unwrap()
            .iter()
            .filter_map(|event| match event {
                CueEvent::CueStatus {
                    cue_id: id,
                    status,
                    details,
                    ..
                } if id.as_str() == cue_id => Some((*status, details.clone())),
                _ => None,
            })
            .collect()
    }

    pub fn last_status(&self, cue_id: &str) -> Option<(PlaybackStatus, StatusDetails)> {
        self.statuses(cue_id).pop()
    }

    pub fn count(&self, cue_id: &str, status: PlaybackStatus) -> usize {
        self.statuses(cue_id)
            .iter()
            .filter(|(s, _)| *s == status)
            .count()
    }

    /// Values carried by `CurrentCueChanged`, in order
    pub fn current_cue_changes(&self) -> Vec<Option<CueId>> {
        self.events
            .lock()
            .unwrap()
            .iter()
            .filter_map(|event| match event {
                CueEvent::CurrentCueChanged { cue_id, .. } => Some(cue_id.clone()),
                _ => None,
            })
            .collect()
    }

    /// `(progress, remaining_ms)` of crossfade reports for an outgoing cue
    pub fn crossfade_progress(&self, cue_id: &str) -> Vec<(f32, u64)> {
        self.events
            .lock()
            .unwrap()
            .iter()
            .filter_map(|event| match event {
                CueEvent::CrossfadeProgress {
                    cue_id: id,
                    progress,
                    remaining_ms,
                    ..
                } if id.as_str() == cue_id => Some((*progress, *remaining_ms)),
                _ => None,
            })
            .collect()
    }

    pub fn clear(&self) {
        self.events.lock().unwrap().clear();
    }
}

impl StatusSink for RecordingStatusSink {
    fn send(&self, event: CueEvent) {
        self.events.lock().unwrap().push(event);
    }
}

/// One UI call
#[derive(Debug, Clone, PartialEq)]
pub enum UiCall {
    Button {
        cue_id: CueId,
        playing: bool,
        label: Option<String>,
        cued: bool,
        error: bool,
    },
    Highlight {
        cue_id: CueId,
        item_id: Option<String>,
    },
}

#[derive(Default)]
pub struct RecordingUi {
    calls: Mutex<Vec<UiCall>>,
}

impl RecordingUi {
    pub fn calls(&self) -> Vec<UiCall> {
        self.calls.lock().unwrap().clone()
    }

    pub fn last_button(&self, cue_id: &str) -> Option<(bool, Option<String>)> {
        self.calls
            .lock()
            .unwrap()
            .iter()
            .rev()
            .find_map(|call| match call {
                UiCall::Button {
                    cue_id: id,
                    playing,
                    label,
                    ..
                } if id.as_str() == cue_id => Some((*playing, label.clone())),
                _ => None,
            })
    }

    /// `(cued, error)` flags of the last button update for the cue
    pub fn last_button_flags(&self, cue_id: &str) -> Option<(bool, bool)> {
        self.calls
            .lock()
            .unwrap()
            .iter()
            .rev()
            .find_map(|call| match call {
                UiCall::Button {
                    cue_id: id,
                    cued,
                    error,
                    ..
                } if id.as_str() == cue_id => Some((*cued, *error)),
                _ => None,
            })
    }

    pub fn last_highlight(&self, cue_id: &str) -> Option<Option<String>> {
        self.calls
            .lock()
            .unwrap()
            .iter()
            .rev()
            .find_map(|call| match call {
                UiCall::Highlight { cue_id: id, item_id } if id.as_str() == cue_id => {
                    Some(item_id.clone())
                }
                _ => None,
            })
    }
}

impl UiSurface for RecordingUi {
    fn update_button_playing_state(
        &self,
        cue_id: &CueId,
        is_playing: bool,
        label: Option<&str>,
        is_cued: bool,
        is_error: bool,
    ) {
        self.calls.lock().unwrap().push(UiCall::Button {
            cue_id: cue_id.clone(),
            playing: is_playing,
            label: label.map(str::to_string),
            cued: is_cued,
            error: is_error,
        });
    }

    fn highlight_playing_playlist_item(&self, cue_id: &CueId, item_id: Option<&str>) {
        self.calls.lock().unwrap().push(UiCall::Highlight {
            cue_id: cue_id.clone(),
            item_id: item_id.map(str::to_string),
        });
    }
}

// ============================================================================
// Engine harness
// ============================================================================

/// Running engine wired to mock collaborators
pub struct TestEngine {
    pub engine: EngineHandle,
    pub audio: Arc<MockAudioBackend>,
    pub status: Arc<RecordingStatusSink>,
    pub ui: Arc<RecordingUi>,
    pub cues: Arc<InMemoryCueStore>,
    pub task: JoinHandle<()>,
}

impl TestEngine {
    pub fn start(cues: Vec<Cue>) -> Self {
        Self::with_config(cues, EngineConfig::default())
    }

    pub fn with_config(cues: Vec<Cue>, config: EngineConfig) -> Self {
        let audio = Arc::new(MockAudioBackend::new());
        let status = Arc::new(RecordingStatusSink::default());
        let ui = Arc::new(RecordingUi::default());
        let cues = Arc::new(InMemoryCueStore::from_cues(cues));
        let (engine, task) = EngineService::new(config, audio.clone(), cues.clone(), status.clone())
            .with_ui(ui.clone())
            .spawn();
        Self {
            engine,
            audio,
            status,
            ui,
            cues,
            task,
        }
    }

    pub async fn snapshot(&self, cue_id: &str) -> Option<PlaybackSnapshot> {
        self.engine
            .get_playback_state(cue_id)
            .await
            .expect("engine running")
    }

    /// Assert the store is internally consistent
    pub async fn assert_consistent(&self) {
        let violations = self
            .engine
            .check_invariants()
            .await
            .expect("engine running");
        assert!(violations.is_empty(), "invariant violations: {:?}", violations);
    }

    /// Let the engine drain queued sound events
    pub async fn sync(&self) {
        self.engine.get_currently_playing().await.expect("engine running");
    }
}

/// Advance virtual time
pub async fn advance_ms(ms: u64) {
    tokio::time::sleep(Duration::from_millis(ms)).await;
}

pub fn single(id: &str) -> Cue {
    Cue::single(id, format!("/show/{}.wav", id))
}

pub fn playlist(id: &str, count: usize) -> Cue {
    let items = (0..count)
        .map(|i| {
            PlaylistItem::new(
                format!("{}-{}", id, i),
                format!("Track {}", i),
                format!("/show/{}/{}.wav", id, i),
            )
        })
        .collect();
    Cue::playlist(id, items)
}

pub fn item_path(id: &str, index: usize) -> String {
    format!("/show/{}/{}.wav", id, index)
}

pub fn single_path(id: &str) -> String {
    format!("/show/{}.wav", id)
}
