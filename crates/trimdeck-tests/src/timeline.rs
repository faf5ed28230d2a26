//! Integration tests for editing and playback.
//!
//! Exercises trimdeck-timeline with the real WAV decoder from
//! trimdeck-media and the commands and renderer from trimdeck-ui.

use crate::fixtures::{editor, loaded, write_wav};
use egui::{Pos2, Rect, Vec2};
use std::time::Duration;
use trimdeck_core::{ManualClock, MediaKind, TrackKind, TrimEdge};
use trimdeck_timeline::TickOutcome;
use trimdeck_ui::{render, EditorCommand, Palette, RecordingCanvas, Theme, TimelineLayout, TimelineScene};

// ── Loading ────────────────────────────────────────────────────

#[test]
fn wav_load_builds_full_range_session() {
    let dir = tempfile::tempdir().unwrap();
    let (ed, _clock) = loaded(&write_wav(dir.path(), "tone.wav", 10, 0.5));
    assert_eq!(ed.kind(), Some(MediaKind::Audio));
    assert_eq!(ed.duration(), 10.0);
    let range = ed.trim_range().unwrap();
    assert_eq!((range.in_point, range.out_point), (0.0, 10.0));
    assert_eq!(ed.active_track(), Some(TrackKind::Audio));
    assert_eq!(ed.volume(), 1.0);
    assert_eq!(ed.export_label(), "Export");
}

#[test]
fn second_load_wins_over_first() {
    let dir = tempfile::tempdir().unwrap();
    let long = write_wav(dir.path(), "long.wav", 10, 0.5);
    let short = write_wav(dir.path(), "short.wav", 4, 0.5);

    let mut ed = editor(ManualClock::new());
    ed.load(&long).unwrap();
    ed.load(&short).unwrap();
    assert!(ed.wait_for_jobs(Duration::from_secs(10)));
    assert_eq!(ed.duration(), 4.0);
    assert_eq!(ed.session().unwrap().path(), short.as_path());
}

#[test]
fn corrupt_wav_reports_decode_failure() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("broken.wav");
    std::fs::write(&path, b"RIFF....WAVEjunk").unwrap();

    let mut ed = editor(ManualClock::new());
    ed.load(&path).unwrap();
    assert!(ed.wait_for_jobs(Duration::from_secs(10)));
    assert!(!ed.has_media());
    assert_eq!(ed.status(), "Audio decode failed");
}

// ── Transport ──────────────────────────────────────────────────

#[test]
fn playback_auto_stops_at_out_point() {
    let dir = tempfile::tempdir().unwrap();
    let (mut ed, clock) = loaded(&write_wav(dir.path(), "tone.wav", 10, 0.5));
    ed.set_in(2.0).unwrap();
    ed.set_out(5.0).unwrap();

    // Cursor at 0 is outside the range, so play snaps to the in point.
    ed.play().unwrap();
    assert_eq!(ed.current_time(), 2.0);

    clock.advance(1.5);
    assert_eq!(ed.tick(), TickOutcome::Advanced(3.5));

    clock.advance(1.6);
    assert_eq!(ed.tick(), TickOutcome::AutoStopped);
    assert!(!ed.is_playing());
    assert_eq!(ed.current_time(), 2.0);
}

#[test]
fn play_twice_keeps_one_producer() {
    let dir = tempfile::tempdir().unwrap();
    let (mut ed, clock) = loaded(&write_wav(dir.path(), "tone.wav", 10, 0.5));
    ed.play().unwrap();
    ed.play().unwrap();
    clock.advance(1.0);
    assert_eq!(ed.tick(), TickOutcome::Advanced(1.0));

    let graph = ed.session().and_then(|s| s.graph()).unwrap();
    let mut out = vec![0.0f32; 10];
    graph.render(&mut out, 1);
    // One source at unity gain; a second producer would double the level.
    assert!(out.iter().all(|s| (s - 0.5).abs() < 1e-3), "{:?}", out);
}

#[test]
fn seek_past_out_point_stops_on_next_tick() {
    let dir = tempfile::tempdir().unwrap();
    let (mut ed, _clock) = loaded(&write_wav(dir.path(), "tone.wav", 10, 0.5));
    ed.set_out(5.0).unwrap();
    ed.play().unwrap();
    ed.seek(7.0).unwrap();
    assert!(ed.is_playing());
    assert_eq!(ed.tick(), TickOutcome::AutoStopped);
    assert_eq!(ed.current_time(), 0.0);
}

#[test]
fn seek_and_step_stay_in_bounds() {
    let dir = tempfile::tempdir().unwrap();
    let (mut ed, _clock) = loaded(&write_wav(dir.path(), "tone.wav", 10, 0.5));
    for t in [-3.0, 4.0, 12.0, f64::INFINITY, -0.5] {
        ed.seek(t).unwrap();
        let now = ed.current_time();
        assert!((0.0..=10.0).contains(&now), "seek({t}) -> {now}");
    }
    ed.seek(9.99).unwrap();
    ed.step(5.0).unwrap();
    assert_eq!(ed.current_time(), 10.0);
}

// ── Tracks ─────────────────────────────────────────────────────

#[test]
fn audio_file_cannot_use_video_track() {
    let dir = tempfile::tempdir().unwrap();
    let (mut ed, _clock) = loaded(&write_wav(dir.path(), "tone.wav", 10, 0.5));
    assert!(!ed.select_track(TrackKind::Video));
    assert!(!ed.toggle_mute(TrackKind::Video).unwrap());
    assert_eq!(ed.active_track(), Some(TrackKind::Audio));

    // Muting the only track disables export but keeps focus.
    assert!(ed.toggle_active_mute().unwrap());
    assert_eq!(ed.active_track(), Some(TrackKind::Audio));
    assert_eq!(ed.export_label(), "Export (disabled)");
}

#[test]
fn drag_edges_never_cross() {
    let dir = tempfile::tempdir().unwrap();
    let (mut ed, _clock) = loaded(&write_wav(dir.path(), "tone.wav", 10, 0.5));
    ed.drag_edge(TrimEdge::Out, 3.0).unwrap();
    let pinned = ed.drag_edge(TrimEdge::In, 8.0).unwrap();
    let range = ed.trim_range().unwrap();
    assert_eq!(range.in_point, pinned);
    assert!(range.in_point < range.out_point);
    assert_eq!(range.out_point, 3.0);
}

// ── Keyboard commands ──────────────────────────────────────────

#[test]
fn keyboard_commands_drive_the_editor() {
    let dir = tempfile::tempdir().unwrap();
    let (mut ed, _clock) = loaded(&write_wav(dir.path(), "tone.wav", 10, 0.5));

    EditorCommand::JumpForward.apply(&mut ed).unwrap();
    assert_eq!(ed.current_time(), 5.0);
    EditorCommand::MarkOut.apply(&mut ed).unwrap();
    assert_eq!(ed.trim_range().unwrap().out_point, 5.0);

    EditorCommand::JumpBack.apply(&mut ed).unwrap();
    EditorCommand::StepForward.apply(&mut ed).unwrap();
    EditorCommand::MarkIn.apply(&mut ed).unwrap();
    assert!((ed.trim_range().unwrap().in_point - 1.0 / 30.0).abs() < 1e-9);

    EditorCommand::TogglePlay.apply(&mut ed).unwrap();
    assert!(ed.is_playing());
    EditorCommand::TogglePlay.apply(&mut ed).unwrap();
    assert!(!ed.is_playing());

    EditorCommand::ToggleMute.apply(&mut ed).unwrap();
    assert_eq!(ed.track_state(TrackKind::Audio).map(|t| t.muted), Some(true));

    EditorCommand::ZoomIn.apply(&mut ed).unwrap();
    assert_eq!(ed.viewport().zoom(), 2.0);
    EditorCommand::ZoomFit.apply(&mut ed).unwrap();
    assert_eq!(ed.viewport().zoom(), 1.0);
}

// ── Rendering ──────────────────────────────────────────────────

#[test]
fn renderer_draws_loaded_session() {
    let dir = tempfile::tempdir().unwrap();
    let (mut ed, _clock) = loaded(&write_wav(dir.path(), "tone.wav", 10, 0.5));
    ed.set_view_width(200.0);
    ed.set_in(2.0).unwrap();
    ed.set_out(8.0).unwrap();

    let layout = TimelineLayout::new(
        Rect::from_min_size(
            Pos2::ZERO,
            Vec2::new(Theme::LABEL_WIDTH + 200.0, TimelineLayout::height(MediaKind::Audio, 80.0)),
        ),
        MediaKind::Audio,
        80.0,
    );
    let scene = TimelineScene::from_editor(&ed).unwrap();
    let palette = Palette::dark();
    let mut canvas = RecordingCanvas::new();
    render(&mut canvas, &layout, &scene, &palette);

    assert_eq!(canvas.lines_with(palette.waveform).len(), 200);
    assert_eq!(canvas.rects_with(palette.dim).len(), 2);
    assert_eq!(canvas.lines_with(palette.volume_line).len(), 1);
    assert!(canvas.texts().contains(&"A"));
    assert!(!canvas.texts().contains(&"V"));
}
