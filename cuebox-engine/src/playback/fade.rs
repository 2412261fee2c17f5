//! Fade bookkeeping
//!
//! A `FadeRamp` is a declarative record of a linear volume ramp the engine
//! asked a sound handle to perform. The handle owns the actual interpolation;
//! the record exists so status queries can report direction, progress and
//! remaining time, and so terminal cleanup has one thing to clear.
//!
//! Ramps are measured against the tokio clock, which keeps them consistent
//! with the engine's timers (and with paused time in tests).

use serde::Serialize;
use std::time::Duration;
use tokio::time::Instant;

/// Ramp direction (mutually exclusive on a session)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FadeDirection {
    In,
    Out,
}

/// Linear volume ramp description
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FadeRamp {
    pub direction: FadeDirection,
    pub started_at: Instant,
    pub duration: Duration,
    pub from_volume: f32,
    pub to_volume: f32,
}

impl FadeRamp {
    pub fn fade_in(from_volume: f32, to_volume: f32, duration: Duration) -> Self {
        Self::starting_now(FadeDirection::In, from_volume, to_volume, duration)
    }

    pub fn fade_out(from_volume: f32, duration: Duration) -> Self {
        Self::starting_now(FadeDirection::Out, from_volume, 0.0, duration)
    }

    fn starting_now(direction: FadeDirection, from: f32, to: f32, duration: Duration) -> Self {
        Self {
            direction,
            started_at: Instant::now(),
            duration,
            from_volume: from.clamp(0.0, 1.0),
            to_volume: to.clamp(0.0, 1.0),
        }
    }

    /// Fraction complete at `now` (0.0-1.0); zero-length ramps are complete
    pub fn progress_at(&self, now: Instant) -> f32 {
        if self.duration.is_zero() {
            return 1.0;
        }
        let elapsed = now.saturating_duration_since(self.started_at);
        (elapsed.as_secs_f32() / self.duration.as_secs_f32()).clamp(0.0, 1.0)
    }

    pub fn remaining_at(&self, now: Instant) -> Duration {
        self.duration
            .saturating_sub(now.saturating_duration_since(self.started_at))
    }

    /// Volume the handle should be at, assuming it follows the ramp
    pub fn volume_at(&self, now: Instant) -> f32 {
        let t = self.progress_at(now);
        self.from_volume + (self.to_volume - self.from_volume) * t
    }

    pub fn is_complete_at(&self, now: Instant) -> bool {
        self.progress_at(now) >= 1.0
    }

    pub fn progress(&self) -> f32 {
        self.progress_at(Instant::now())
    }

    pub fn remaining(&self) -> Duration {
        self.remaining_at(Instant::now())
    }
}
