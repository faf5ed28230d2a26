//! The loaded source and the resources it owns.

use crate::backend::{BufferBackend, MediaElement, PlaybackBackend, VideoBackend};
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::debug;
use trimdeck_audio::{AudioBuffer, AudioGraphContext, OutputSlot};
use trimdeck_core::{MediaKind, Result, SharedClock};

/// Load counter. Async results carry the generation they were started for
/// and are dropped if it no longer matches.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct Generation(u64);

impl Generation {
    pub fn next(self) -> Self {
        Generation(self.0 + 1)
    }

    pub fn value(self) -> u64 {
        self.0
    }
}

impl fmt::Display for Generation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// A loaded media file.
///
/// The audio graph is created on first playback, attached to the output
/// slot, and disposed when the session is dropped.
pub struct MediaSession {
    generation: Generation,
    kind: MediaKind,
    duration: f64,
    path: PathBuf,
    backend: PlaybackBackend,
    graph: Option<AudioGraphContext>,
    clock: SharedClock,
    output: OutputSlot,
}

impl MediaSession {
    /// Session over a decoded audio file.
    pub fn new_audio(
        generation: Generation,
        path: impl Into<PathBuf>,
        buffer: Arc<AudioBuffer>,
        clock: SharedClock,
        output: OutputSlot,
    ) -> Self {
        let duration = buffer.duration();
        Self {
            generation,
            kind: MediaKind::Audio,
            duration,
            path: path.into(),
            backend: PlaybackBackend::Buffer(BufferBackend::new(buffer)),
            graph: None,
            clock,
            output,
        }
    }

    /// Session over a video element.
    pub fn new_video(
        generation: Generation,
        path: impl Into<PathBuf>,
        element: Box<dyn MediaElement>,
        clock: SharedClock,
        output: OutputSlot,
    ) -> Self {
        let duration = element.duration();
        Self {
            generation,
            kind: MediaKind::Video,
            duration,
            path: path.into(),
            backend: PlaybackBackend::Video(VideoBackend::new(element)),
            graph: None,
            clock,
            output,
        }
    }

    pub fn generation(&self) -> Generation {
        self.generation
    }

    pub fn kind(&self) -> MediaKind {
        self.kind
    }

    pub fn duration(&self) -> f64 {
        self.duration
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn backend(&self) -> &PlaybackBackend {
        &self.backend
    }

    pub fn decoded_audio(&self) -> Option<&Arc<AudioBuffer>> {
        self.backend.decoded_audio()
    }

    /// Attach a late-decoded soundtrack to a video session.
    pub fn set_decoded_audio(&mut self, buffer: Arc<AudioBuffer>) {
        if let PlaybackBackend::Video(video) = &mut self.backend {
            video.set_audio(buffer);
        }
    }

    /// The session graph, if playback has created it.
    pub fn graph(&self) -> Option<&AudioGraphContext> {
        self.graph.as_ref()
    }

    fn ensure_graph(&mut self) -> AudioGraphContext {
        match &self.graph {
            Some(graph) => graph.clone(),
            None => {
                let graph = AudioGraphContext::new(self.clock.clone(), self.output.sample_rate());
                self.output.attach(&graph);
                debug!("Session {} attached audio graph", self.generation);
                self.graph = Some(graph.clone());
                graph
            }
        }
    }

    /// Start the backend at `at` for `length` seconds with `gain` applied.
    pub fn start_backend(&mut self, at: f64, length: f64, gain: f32) -> Result<()> {
        let graph = self.ensure_graph();
        graph.set_gain(gain);
        self.backend.start(&graph, at, length)
    }

    pub fn stop_backend(&mut self) {
        self.backend.stop();
    }

    pub fn position(&self) -> f64 {
        self.backend.current_position()
    }

    pub fn has_ended(&self) -> bool {
        self.backend.has_ended()
    }

    pub fn sync(&self) {
        self.backend.sync();
    }

    /// Change the live gain without touching playback.
    pub fn apply_gain(&self, gain: f32) {
        if let Some(graph) = &self.graph {
            graph.set_gain(gain);
        }
    }

    /// Stop playback and release the audio graph.
    pub fn dispose(&mut self) {
        self.backend.stop();
        if let Some(graph) = self.graph.take() {
            self.output.detach_graph(&graph);
            graph.dispose();
            debug!("Session {} disposed", self.generation);
        }
    }
}

impl Drop for MediaSession {
    fn drop(&mut self) {
        self.dispose();
    }
}

impl fmt::Debug for MediaSession {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MediaSession")
            .field("generation", &self.generation)
            .field("kind", &self.kind)
            .field("duration", &self.duration)
            .field("path", &self.path)
            .field("has_graph", &self.graph.is_some())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::ClockedMediaElement;
    use trimdeck_core::ManualClock;

    fn audio_session(output: &OutputSlot) -> (MediaSession, Arc<ManualClock>) {
        let clock = ManualClock::new();
        let buffer = Arc::new(AudioBuffer::new(vec![vec![0.5; 400]], 100).unwrap());
        let session = MediaSession::new_audio(
            Generation::default().next(),
            "a.wav",
            buffer,
            clock.clone(),
            output.clone(),
        );
        (session, clock)
    }

    #[test]
    fn test_graph_created_lazily() {
        let output = OutputSlot::new(100);
        let (mut session, _clock) = audio_session(&output);
        assert_eq!(session.duration(), 4.0);
        assert!(session.graph().is_none());
        assert!(!output.is_attached());

        session.start_backend(0.0, 4.0, 1.0).unwrap();
        assert!(output.is_attached());
        assert_eq!(session.graph().map(|g| g.active_producers()), Some(1));
    }

    #[test]
    fn test_drop_disposes_graph() {
        let output = OutputSlot::new(100);
        let (mut session, _clock) = audio_session(&output);
        session.start_backend(1.0, 2.0, 0.5).unwrap();
        let graph = session.graph().cloned().unwrap();
        drop(session);
        assert!(graph.is_disposed());
        assert_eq!(graph.active_producers(), 0);
        assert!(!output.is_attached());
    }

    #[test]
    fn test_live_gain() {
        let output = OutputSlot::new(100);
        let (mut session, _clock) = audio_session(&output);
        session.start_backend(0.0, 4.0, 1.0).unwrap();
        session.apply_gain(1.8);
        let mut out = [0.0f32; 2];
        output.render(&mut out, 1);
        assert!((out[0] - 0.9).abs() < 1e-6);
    }

    #[test]
    fn test_video_session_takes_late_audio() {
        let clock = ManualClock::new();
        let element = ClockedMediaElement::new(clock.clone(), 6.0);
        let mut session = MediaSession::new_video(
            Generation(3),
            "v.mp4",
            Box::new(element),
            clock,
            OutputSlot::new(100),
        );
        assert_eq!(session.kind(), MediaKind::Video);
        assert!(session.decoded_audio().is_none());
        session.set_decoded_audio(Arc::new(AudioBuffer::silent(2, 600, 100).unwrap()));
        assert!(session.decoded_audio().is_some());
    }

    #[test]
    fn test_late_audio_is_heard_while_playing() {
        let clock = ManualClock::new();
        let output = OutputSlot::new(100);
        let element = ClockedMediaElement::new(clock.clone(), 6.0);
        let mut session = MediaSession::new_video(
            Generation(4),
            "v.mp4",
            Box::new(element),
            clock.clone(),
            output.clone(),
        );
        session.start_backend(0.0, 6.0, 1.0).unwrap();
        session.set_decoded_audio(Arc::new(AudioBuffer::new(vec![vec![0.5; 600]], 100).unwrap()));

        clock.advance(0.5);
        session.sync();
        let mut out = [0.0f32; 8];
        output.render(&mut out, 1);
        assert!(out.iter().all(|s| (s - 0.5).abs() < 1e-6), "{:?}", out);

        session.stop_backend();
        output.render(&mut out, 1);
        assert!(out.iter().all(|&s| s == 0.0));
    }

    #[test]
    fn test_late_audio_waits_for_start_when_stopped() {
        let clock = ManualClock::new();
        let output = OutputSlot::new(100);
        let element = ClockedMediaElement::new(clock.clone(), 6.0);
        let mut session = MediaSession::new_video(
            Generation(5),
            "v.mp4",
            Box::new(element),
            clock,
            output.clone(),
        );
        session.set_decoded_audio(Arc::new(AudioBuffer::new(vec![vec![0.5; 600]], 100).unwrap()));
        assert!(session.graph().is_none());
        let mut out = [0.0f32; 4];
        output.render(&mut out, 1);
        assert!(out.iter().all(|&s| s == 0.0));

        session.start_backend(1.0, 5.0, 1.0).unwrap();
        output.render(&mut out, 1);
        assert!(out.iter().all(|s| (s - 0.5).abs() < 1e-6));
    }
}
