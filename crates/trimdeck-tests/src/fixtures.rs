//! Shared helpers: WAV fixtures and an editor wired for tests.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use trimdeck_audio::{pcm_encode, OutputSlot};
use trimdeck_core::{EditorConfig, ManualClock};
use trimdeck_timeline::Editor;

/// Low rate keeps fixtures tiny and frame counts easy to reason about.
pub const RATE: u32 = 100;

/// Write a mono WAV of constant `level` lasting `seconds`.
pub fn write_wav(dir: &Path, name: &str, seconds: u32, level: f32) -> PathBuf {
    let path = dir.join(name);
    let samples = vec![level; (seconds * RATE) as usize];
    std::fs::write(&path, pcm_encode(&[samples], RATE)).unwrap();
    path
}

/// Editor with the stock decoder and no external encoder.
pub fn editor(clock: Arc<ManualClock>) -> Editor {
    Editor::new(EditorConfig::default(), clock, OutputSlot::new(RATE)).with_encoder(None)
}

/// Editor with `path` loaded and decoded.
pub fn loaded(path: &Path) -> (Editor, Arc<ManualClock>) {
    let clock = ManualClock::new();
    let mut ed = editor(clock.clone());
    ed.load(path).unwrap();
    assert!(ed.wait_for_jobs(Duration::from_secs(10)));
    assert!(ed.has_media(), "fixture failed to load: {}", ed.status());
    (ed, clock)
}
