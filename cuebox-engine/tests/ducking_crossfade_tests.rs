//! Ducking, crossfade and stop-all tests

mod helpers;

use cuebox_common::events::PlaybackStatus;
use cuebox_common::{Cue, CueId};
use cuebox_engine::playback::{StopAllOptions, StopOptions};
use helpers::{advance_ms, single, single_path, TestEngine};
use std::time::Duration;

fn bed(volume: f32) -> Cue {
    let mut cue = single("bed");
    cue.enable_ducking = true;
    cue.volume = volume;
    cue
}

fn trigger(id: &str, level: f32) -> Cue {
    let mut cue = single(id);
    cue.is_ducking_trigger = true;
    cue.ducking_level_percent = level;
    cue
}

fn assert_close(actual: f32, expected: f32) {
    assert!(
        (actual - expected).abs() < 1e-4,
        "expected {expected}, got {actual}"
    );
}

// ============================================================================
// Ducking
// ============================================================================

#[tokio::test(start_paused = true)]
async fn test_ducking_round_trip_restores_volume() {
    let t = TestEngine::start(vec![bed(0.8), trigger("voice", 50.0)]);
    t.engine.play(bed(0.8), false).await.unwrap();

    t.engine.play(trigger("voice", 50.0), false).await.unwrap();

    let snapshot = t.snapshot("bed").await.unwrap();
    assert!(snapshot.is_ducked);
    assert_eq!(snapshot.ducking_trigger, Some(CueId::from("voice")));
    assert_close(snapshot.volume, 0.4);
    let (from, to, ramp) = t.audio.latest(&single_path("bed")).last_fade().unwrap();
    assert_close(from, 0.8);
    assert_close(to, 0.4);
    assert_eq!(ramp, Duration::from_millis(500));

    t.engine.stop("voice", StopOptions::immediate()).await.unwrap();
    t.sync().await;

    let snapshot = t.snapshot("bed").await.unwrap();
    assert!(!snapshot.is_ducked);
    assert_eq!(snapshot.ducking_trigger, None);
    assert_close(snapshot.volume, 0.8);
    t.assert_consistent().await;
}

#[tokio::test(start_paused = true)]
async fn test_ineligible_cues_are_not_ducked() {
    let t = TestEngine::start(vec![single("music"), trigger("voice", 50.0)]);
    t.engine.play(single("music"), false).await.unwrap();

    t.engine.play(trigger("voice", 50.0), false).await.unwrap();

    let snapshot = t.snapshot("music").await.unwrap();
    assert!(!snapshot.is_ducked);
    assert_close(snapshot.volume, 1.0);
    assert!(t.audio.latest(&single_path("music")).fades().is_empty());
}

#[tokio::test(start_paused = true)]
async fn test_late_starter_joins_active_duck() {
    let t = TestEngine::start(vec![bed(1.0), trigger("voice", 75.0)]);
    t.engine.play(trigger("voice", 75.0), false).await.unwrap();

    t.engine.play(bed(1.0), false).await.unwrap();

    let probe = t.audio.latest(&single_path("bed"));
    assert_close(probe.initial_volume(), 0.25);
    let snapshot = t.snapshot("bed").await.unwrap();
    assert!(snapshot.is_ducked);

    t.engine.stop("voice", StopOptions::immediate()).await.unwrap();
    t.sync().await;
    assert_close(t.snapshot("bed").await.unwrap().volume, 1.0);
}

#[tokio::test(start_paused = true)]
async fn test_pausing_trigger_releases_duck_and_resume_reapplies() {
    let t = TestEngine::start(vec![bed(1.0), trigger("voice", 50.0)]);
    t.engine.play(bed(1.0), false).await.unwrap();
    t.engine.play(trigger("voice", 50.0), false).await.unwrap();

    t.engine.pause("voice").await.unwrap();
    let snapshot = t.snapshot("bed").await.unwrap();
    assert!(!snapshot.is_ducked);
    assert_close(snapshot.volume, 1.0);

    t.engine.play(trigger("voice", 50.0), true).await.unwrap();
    let snapshot = t.snapshot("bed").await.unwrap();
    assert!(snapshot.is_ducked);
    assert_close(snapshot.volume, 0.5);
}

#[tokio::test(start_paused = true)]
async fn test_second_trigger_does_not_stack_or_steal_duck() {
    let t = TestEngine::start(vec![
        bed(1.0),
        trigger("voice", 50.0),
        trigger("alarm", 90.0),
    ]);
    t.engine.play(bed(1.0), false).await.unwrap();
    t.engine.play(trigger("voice", 50.0), false).await.unwrap();

    t.engine.play(trigger("alarm", 90.0), false).await.unwrap();
    let snapshot = t.snapshot("bed").await.unwrap();
    assert_eq!(snapshot.ducking_trigger, Some(CueId::from("voice")));
    assert_close(snapshot.volume, 0.5);

    // Only the trigger that ducked the bed may release it
    t.engine.stop("alarm", StopOptions::immediate()).await.unwrap();
    t.sync().await;
    assert!(t.snapshot("bed").await.unwrap().is_ducked);

    t.engine.stop("voice", StopOptions::immediate()).await.unwrap();
    t.sync().await;
    assert!(!t.snapshot("bed").await.unwrap().is_ducked);
}

#[tokio::test(start_paused = true)]
async fn test_duck_replaces_fade_in_and_restores_its_target() {
    let mut music = bed(0.6);
    music.fade_in_ms = 2000;
    let t = TestEngine::start(vec![music.clone(), trigger("voice", 50.0)]);
    t.engine.play(music, false).await.unwrap();

    t.engine.play(trigger("voice", 50.0), false).await.unwrap();
    let snapshot = t.snapshot("bed").await.unwrap();
    assert!(!snapshot.is_fading_in);
    assert!(snapshot.is_ducked);

    t.engine.stop("voice", StopOptions::immediate()).await.unwrap();
    t.sync().await;
    let (_, to, _) = t.audio.latest(&single_path("bed")).last_fade().unwrap();
    assert_close(to, 0.6);
}

// ============================================================================
// Crossfade
// ============================================================================

#[tokio::test(start_paused = true)]
async fn test_crossfade_is_symmetric() {
    let t = TestEngine::start(vec![single("a"), single("b"), single("c")]);
    t.engine.play(single("a"), false).await.unwrap();
    t.engine.play(single("c"), false).await.unwrap();
    t.engine.set_crossfade_mode(true).await.unwrap();

    t.engine.toggle("b", false, None).await.unwrap();

    let ramp = Duration::from_millis(2000);
    for outgoing in ["a", "c"] {
        let probe = t.audio.latest(&single_path(outgoing));
        assert_eq!(probe.last_fade(), Some((1.0, 0.0, ramp)));
        assert!(t.snapshot(outgoing).await.unwrap().is_fading_out);
    }
    let incoming = t.audio.latest(&single_path("b"));
    assert_eq!(incoming.initial_volume(), 0.0);
    assert_eq!(incoming.last_fade(), Some((0.0, 1.0, ramp)));
    assert!(t.snapshot("b").await.unwrap().is_fading_in);

    advance_ms(2050).await;
    assert!(t.snapshot("a").await.is_some(), "safety buffer not yet elapsed");

    advance_ms(100).await;
    t.sync().await;
    for outgoing in ["a", "c"] {
        assert!(t.snapshot(outgoing).await.is_none());
        assert_eq!(
            t.status.last_status(outgoing).unwrap().1.reason.as_deref(),
            Some("crossfade")
        );
    }
    let snapshot = t.snapshot("b").await.unwrap();
    assert!(snapshot.is_playing);
    assert!(!snapshot.is_fading_in);
}

#[tokio::test(start_paused = true)]
async fn test_crossfade_ramps_incoming_to_its_own_volume() {
    let mut quiet = single("b");
    quiet.volume = 0.5;
    let t = TestEngine::start(vec![single("a"), quiet]);
    t.engine.play(single("a"), false).await.unwrap();
    t.engine.set_crossfade_mode(true).await.unwrap();

    t.engine.toggle("b", false, None).await.unwrap();

    let incoming = t.audio.latest(&single_path("b"));
    assert_eq!(incoming.initial_volume(), 0.0);
    let (from, to, _) = incoming.last_fade().unwrap();
    assert_close(from, 0.0);
    assert_close(to, 0.5);
}

#[tokio::test(start_paused = true)]
async fn test_crossfade_reports_progress_until_complete() {
    let t = TestEngine::start(vec![single("a"), single("b")]);
    t.engine.play(single("a"), false).await.unwrap();
    t.engine.set_crossfade_mode(true).await.unwrap();

    t.engine.toggle("b", false, None).await.unwrap();
    advance_ms(2500).await;

    let reports = t.status.crossfade_progress("a");
    assert!(reports.len() >= 10, "got {} reports", reports.len());
    assert!(reports
        .windows(2)
        .all(|pair| pair[0].0 <= pair[1].0 && pair[0].1 >= pair[1].1));
    assert!(reports.iter().all(|(p, _)| (0.0..=1.0).contains(p)));
    assert!(t.status.crossfade_progress("b").is_empty());
}

#[tokio::test(start_paused = true)]
async fn test_toggle_without_crossfade_mode_leaves_others_alone() {
    let t = TestEngine::start(vec![single("a"), single("b")]);
    t.engine.play(single("a"), false).await.unwrap();

    t.engine.toggle("b", false, None).await.unwrap();

    assert!(t.audio.latest(&single_path("a")).fades().is_empty());
    assert!(t.snapshot("a").await.unwrap().is_playing);
    assert!(t.snapshot("b").await.unwrap().is_playing);
}

// ============================================================================
// Stop all
// ============================================================================

#[tokio::test(start_paused = true)]
async fn test_stop_all_respects_exception() {
    let t = TestEngine::start(vec![single("a"), single("b"), single("c")]);
    for id in ["a", "b", "c"] {
        t.engine.play(single(id), false).await.unwrap();
    }

    t.engine
        .stop_all(StopAllOptions {
            except_cue_id: Some(CueId::from("b")),
            use_fade: false,
        })
        .await
        .unwrap();
    t.sync().await;

    for id in ["a", "c"] {
        assert!(t.snapshot(id).await.is_none());
        assert_eq!(
            t.status.last_status(id).unwrap().1.reason.as_deref(),
            Some("stop_all")
        );
    }
    assert!(t.snapshot("b").await.unwrap().is_playing);
}

#[tokio::test(start_paused = true)]
async fn test_stop_all_with_fade_uses_stop_all_duration() {
    let mut a = single("a");
    a.fade_out_ms = Some(100);
    let t = TestEngine::start(vec![a.clone(), single("b")]);
    t.engine.play(a, false).await.unwrap();
    t.engine.play(single("b"), false).await.unwrap();

    t.engine
        .stop_all(StopAllOptions {
            except_cue_id: None,
            use_fade: true,
        })
        .await
        .unwrap();

    for id in ["a", "b"] {
        assert_eq!(
            t.audio.latest(&single_path(id)).last_fade(),
            Some((1.0, 0.0, Duration::from_millis(1500)))
        );
    }

    advance_ms(1600).await;
    t.sync().await;
    let view = t.engine.get_currently_playing().await.unwrap();
    assert!(view.cues.is_empty());
    assert_eq!(view.priority_cue, None);
}

#[tokio::test(start_paused = true)]
async fn test_stop_all_cancels_pending_restarts() {
    let t = TestEngine::start(vec![single("a")]);
    t.engine.play(single("a"), false).await.unwrap();
    t.engine.play(single("a"), false).await.unwrap();

    t.engine.stop_all(StopAllOptions::default()).await.unwrap();
    advance_ms(500).await;

    assert_eq!(t.audio.created(), 1);
    assert_eq!(
        t.status.last_status("a").map(|(s, _)| s),
        Some(PlaybackStatus::Stopped)
    );
}
