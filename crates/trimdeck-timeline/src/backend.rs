//! Playback backends.
//!
//! Video sessions play through a [`MediaElement`] that owns its own position;
//! its soundtrack is routed through the session graph by an element source.
//! Audio sessions play slices of the decoded buffer through one-shot buffer
//! sources. [`PlaybackBackend`] puts both behind `start`/`stop`/`position`.

use std::sync::Arc;
use tracing::debug;
use trimdeck_audio::{AudioBuffer, AudioGraphContext, BufferSource, ElementSource};
use trimdeck_core::{Result, SharedClock};

/// A playable video element.
pub trait MediaElement: Send {
    fn duration(&self) -> f64;
    fn current_time(&self) -> f64;
    fn set_current_time(&mut self, t: f64);
    fn play(&mut self);
    fn pause(&mut self);
    fn is_paused(&self) -> bool;

    /// The element reached the end of its media.
    fn has_ended(&self) -> bool {
        self.current_time() >= self.duration()
    }
}

/// Element whose position follows a clock while playing.
pub struct ClockedMediaElement {
    clock: SharedClock,
    duration: f64,
    position: f64,
    /// Clock reading when playback (re)started.
    anchor: Option<f64>,
}

impl ClockedMediaElement {
    pub fn new(clock: SharedClock, duration: f64) -> Self {
        Self {
            clock,
            duration: duration.max(0.0),
            position: 0.0,
            anchor: None,
        }
    }
}

impl std::fmt::Debug for ClockedMediaElement {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ClockedMediaElement")
            .field("duration", &self.duration)
            .field("position", &self.position)
            .field("playing", &self.anchor.is_some())
            .finish()
    }
}

impl MediaElement for ClockedMediaElement {
    fn duration(&self) -> f64 {
        self.duration
    }

    fn current_time(&self) -> f64 {
        match self.anchor {
            Some(anchor) => (self.position + self.clock.now() - anchor).clamp(0.0, self.duration),
            None => self.position,
        }
    }

    fn set_current_time(&mut self, t: f64) {
        self.position = t.clamp(0.0, self.duration);
        if self.anchor.is_some() {
            self.anchor = Some(self.clock.now());
        }
    }

    fn play(&mut self) {
        if self.anchor.is_none() {
            self.anchor = Some(self.clock.now());
        }
    }

    fn pause(&mut self) {
        self.position = self.current_time();
        self.anchor = None;
    }

    fn is_paused(&self) -> bool {
        self.anchor.is_none()
    }
}

/// Video element plus the graph route for its audio.
pub struct VideoBackend {
    element: Box<dyn MediaElement>,
    /// Created on first start, never twice.
    source: Option<ElementSource>,
    audio: Option<Arc<AudioBuffer>>,
}

impl VideoBackend {
    pub fn new(element: Box<dyn MediaElement>) -> Self {
        Self {
            element,
            source: None,
            audio: None,
        }
    }

    pub fn element(&self) -> &dyn MediaElement {
        self.element.as_ref()
    }

    pub fn audio(&self) -> Option<&Arc<AudioBuffer>> {
        self.audio.as_ref()
    }

    /// Attach the decoded soundtrack. A source that is already connected
    /// picks it up at the element's position without a restart.
    pub fn set_audio(&mut self, audio: Arc<AudioBuffer>) {
        self.audio = Some(Arc::clone(&audio));
        let Some(source) = self.source.as_ref().filter(|s| s.is_connected()) else {
            return;
        };
        if let Err(e) = source.connect(Some(audio), self.element.current_time()) {
            debug!("Late soundtrack not routed: {}", e);
            return;
        }
        source.set_running(!self.element.is_paused());
    }

    fn start(&mut self, graph: &AudioGraphContext, at: f64) -> Result<()> {
        if self.source.is_none() {
            self.source = Some(graph.create_element_source()?);
        }
        self.element.set_current_time(at);
        if let Some(source) = &self.source {
            source.connect(self.audio.clone(), at)?;
            source.set_running(true);
        }
        self.element.play();
        Ok(())
    }

    fn stop(&mut self) {
        self.element.pause();
        if let Some(source) = &self.source {
            source.set_running(false);
            source.disconnect();
        }
    }

    /// Keep the routed audio aligned with the element after drift.
    pub fn sync(&self) {
        if let Some(source) = &self.source {
            source.sync(self.element.current_time());
        }
    }
}

/// Decoded buffer and the currently scheduled one-shot source.
pub struct BufferBackend {
    buffer: Arc<AudioBuffer>,
    source: Option<BufferSource>,
    offset: f64,
}

impl BufferBackend {
    pub fn new(buffer: Arc<AudioBuffer>) -> Self {
        Self {
            buffer,
            source: None,
            offset: 0.0,
        }
    }

    pub fn buffer(&self) -> &Arc<AudioBuffer> {
        &self.buffer
    }

    fn start(&mut self, graph: &AudioGraphContext, at: f64, length: f64) -> Result<()> {
        self.stop();
        self.offset = at;
        if !(length > 0.0) {
            debug!("Nothing to schedule at {:.3}s", at);
            return Ok(());
        }
        let mut source = graph.create_buffer_source(Arc::clone(&self.buffer))?;
        source.start(at, length)?;
        self.source = Some(source);
        Ok(())
    }

    fn stop(&mut self) {
        if let Some(mut source) = self.source.take() {
            source.stop();
        }
    }

    fn position(&self) -> f64 {
        self.offset + self.source.as_ref().and_then(BufferSource::elapsed).unwrap_or(0.0)
    }

    fn has_ended(&self) -> bool {
        self.source.as_ref().map_or(true, BufferSource::has_ended)
    }
}

/// Whichever backend the session plays through.
pub enum PlaybackBackend {
    Video(VideoBackend),
    Buffer(BufferBackend),
}

impl PlaybackBackend {
    /// Play `length` seconds from `at`. Any previous producer is stopped first.
    pub fn start(&mut self, graph: &AudioGraphContext, at: f64, length: f64) -> Result<()> {
        match self {
            PlaybackBackend::Video(video) => video.start(graph, at),
            PlaybackBackend::Buffer(buffer) => buffer.start(graph, at, length),
        }
    }

    /// Halt output immediately. Safe when already stopped.
    pub fn stop(&mut self) {
        match self {
            PlaybackBackend::Video(video) => video.stop(),
            PlaybackBackend::Buffer(buffer) => buffer.stop(),
        }
    }

    /// Authoritative playback position in seconds.
    pub fn current_position(&self) -> f64 {
        match self {
            PlaybackBackend::Video(video) => video.element.current_time(),
            PlaybackBackend::Buffer(buffer) => buffer.position(),
        }
    }

    /// The backend ran out of material to play.
    pub fn has_ended(&self) -> bool {
        match self {
            PlaybackBackend::Video(video) => video.element.has_ended(),
            PlaybackBackend::Buffer(buffer) => buffer.has_ended(),
        }
    }

    pub fn sync(&self) {
        if let PlaybackBackend::Video(video) = self {
            video.sync();
        }
    }

    pub fn decoded_audio(&self) -> Option<&Arc<AudioBuffer>> {
        match self {
            PlaybackBackend::Video(video) => video.audio(),
            PlaybackBackend::Buffer(buffer) => Some(buffer.buffer()),
        }
    }
}
