//! Simulated audio backend
//!
//! Timer-driven sound handles that produce no audio. Each handle tracks its
//! position against the tokio clock and fires `End` when the media duration
//! (the cue's known duration, else a backend default) has elapsed. Used by the
//! `cuebox` binary for dry-running a show without an output device.

use std::path::Path;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;
use tokio::time::Instant;
use tracing::debug;

use super::{AudioBackend, AudioError, SoundEvent, SoundHandle, SoundListener, SoundRequest};

/// Backend producing `SimulatedSound` handles
#[derive(Debug, Clone)]
pub struct SimulatedAudioBackend {
    /// Media length used when a request has no duration hint
    default_duration_secs: f64,
    /// Probe the filesystem for file references
    check_files: bool,
}

impl SimulatedAudioBackend {
    pub fn new(default_duration_secs: f64) -> Self {
        Self {
            default_duration_secs: default_duration_secs.max(0.1),
            check_files: false,
        }
    }

    /// Reject file references that do not exist on disk
    pub fn with_file_checks(mut self, check_files: bool) -> Self {
        self.check_files = check_files;
        self
    }
}

impl AudioBackend for SimulatedAudioBackend {
    fn create_handle(
        &self,
        request: &SoundRequest,
        listener: SoundListener,
    ) -> Result<Box<dyn SoundHandle>, AudioError> {
        let media_secs = request
            .duration_hint_secs
            .filter(|d| *d > 0.0)
            .unwrap_or(self.default_duration_secs);
        let start = request.trim_start_secs.unwrap_or(0.0).clamp(0.0, media_secs);
        let end = request
            .trim_end_secs
            .unwrap_or(media_secs)
            .clamp(start, media_secs);

        if end <= start {
            return Err(AudioError::Unavailable(format!(
                "{}: trimmed region is empty",
                request.file_path
            )));
        }

        debug!(
            "Simulated sound for {} ({:.1}s..{:.1}s)",
            request.label, start, end
        );

        Ok(Box::new(SimulatedSound::new(
            listener,
            request.initial_volume,
            request.looping,
            start,
            end,
            media_secs,
        )))
    }

    fn file_exists(&self, path: &Path) -> bool {
        !self.check_files || path.exists()
    }
}

/// Linear volume ramp in progress
#[derive(Debug, Clone, Copy)]
struct Ramp {
    from: f32,
    to: f32,
    started: Instant,
    duration: Duration,
}

impl Ramp {
    fn value_at(&self, now: Instant) -> f32 {
        if self.duration.is_zero() {
            return self.to;
        }
        let t = (now.saturating_duration_since(self.started).as_secs_f32()
            / self.duration.as_secs_f32())
        .clamp(0.0, 1.0);
        self.from + (self.to - self.from) * t
    }
}

struct SimState {
    listener: Option<SoundListener>,
    volume: f32,
    ramp: Option<Ramp>,
    looping: bool,
    region_start: f64,
    region_end: f64,
    media_secs: f64,
    /// Position when the clock was last anchored
    anchor_position: f64,
    /// Set while playing
    anchor_time: Option<Instant>,
    /// Bumped on every play/pause/stop/seek so stale end timers exit
    run_id: u64,
    unloaded: bool,
}

impl SimState {
    fn position(&self) -> f64 {
        match self.anchor_time {
            Some(t) => (self.anchor_position + t.elapsed().as_secs_f64()).min(self.region_end),
            None => self.anchor_position,
        }
    }

    fn emit(&self, event: SoundEvent) {
        if let Some(listener) = &self.listener {
            listener.emit(event);
        }
    }
}

/// Timer-driven stand-in for a real sound
pub struct SimulatedSound {
    inner: Arc<Mutex<SimState>>,
}

impl SimulatedSound {
    fn new(
        listener: SoundListener,
        volume: f32,
        looping: bool,
        region_start: f64,
        region_end: f64,
        media_secs: f64,
    ) -> Self {
        Self {
            inner: Arc::new(Mutex::new(SimState {
                listener: Some(listener),
                volume: volume.clamp(0.0, 1.0),
                ramp: None,
                looping,
                region_start,
                region_end,
                media_secs,
                anchor_position: region_start,
                anchor_time: None,
                run_id: 0,
                unloaded: false,
            })),
        }
    }

    fn state(&self) -> MutexGuard<'_, SimState> {
        self.inner.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Arm the end-of-media timer for the current run
    fn arm_end_timer(&self, run_id: u64, remaining: f64) {
        let inner = Arc::clone(&self.inner);
        tokio::spawn(async move {
            let mut remaining = remaining;
            loop {
                tokio::time::sleep(Duration::from_secs_f64(remaining.max(0.0))).await;
                let mut s = inner.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
                if s.run_id != run_id {
                    return;
                }
                if s.looping {
                    s.anchor_position = s.region_start;
                    s.anchor_time = Some(Instant::now());
                    remaining = s.region_end - s.region_start;
                    continue;
                }
                s.anchor_position = s.region_end;
                s.anchor_time = None;
                s.emit(SoundEvent::End);
                return;
            }
        });
    }
}

impl SoundHandle for SimulatedSound {
    fn play(&mut self) {
        let (run_id, remaining) = {
            let mut s = self.state();
            if s.unloaded || s.anchor_time.is_some() {
                return;
            }
            if s.anchor_position >= s.region_end {
                s.anchor_position = s.region_start;
            }
            s.run_id += 1;
            s.anchor_time = Some(Instant::now());
            s.emit(SoundEvent::Play);
            (s.run_id, s.region_end - s.anchor_position)
        };
        self.arm_end_timer(run_id, remaining);
    }

    fn pause(&mut self) {
        let mut s = self.state();
        if s.anchor_time.is_none() {
            return;
        }
        s.anchor_position = s.position();
        s.anchor_time = None;
        s.run_id += 1;
        s.emit(SoundEvent::Pause);
    }

    fn stop(&mut self) {
        let mut s = self.state();
        if s.unloaded {
            return;
        }
        s.anchor_position = s.region_start;
        s.anchor_time = None;
        s.run_id += 1;
        s.ramp = None;
        s.emit(SoundEvent::Stop);
    }

    fn seek(&mut self, position_secs: f64) {
        let rearm = {
            let mut s = self.state();
            let target = position_secs.clamp(s.region_start, s.region_end);
            s.anchor_position = target;
            s.run_id += 1;
            if s.anchor_time.is_some() {
                s.anchor_time = Some(Instant::now());
                Some((s.run_id, s.region_end - target))
            } else {
                None
            }
        };
        if let Some((run_id, remaining)) = rearm {
            self.arm_end_timer(run_id, remaining);
        }
    }

    fn volume(&self) -> f32 {
        let s = self.state();
        match s.ramp {
            Some(ramp) => ramp.value_at(Instant::now()),
            None => s.volume,
        }
    }

    fn set_volume(&mut self, volume: f32) {
        let mut s = self.state();
        s.ramp = None;
        s.volume = volume.clamp(0.0, 1.0);
    }

    fn fade(&mut self, from: f32, to: f32, duration: Duration) {
        let mut s = self.state();
        let to = to.clamp(0.0, 1.0);
        s.volume = to;
        s.ramp = Some(Ramp {
            from: from.clamp(0.0, 1.0),
            to,
            started: Instant::now(),
            duration,
        });
    }

    fn playing(&self) -> bool {
        self.state().anchor_time.is_some()
    }

    fn duration(&self) -> Option<f64> {
        Some(self.state().media_secs)
    }

    fn position(&self) -> f64 {
        self.state().position()
    }

    fn detach_listeners(&mut self) {
        self.state().listener = None;
    }

    fn unload(&mut self) {
        let mut s = self.state();
        s.unloaded = true;
        s.anchor_time = None;
        s.run_id += 1;
    }
}
