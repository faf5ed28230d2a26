//! Audio output graph owned by a media session.
//!
//! The graph has a single gain stage feeding the output and at most one
//! connected producer. A producer is either a one-shot buffer source
//! (scheduled slice of a decoded buffer) or the element source that carries
//! a video element's audio. Connecting a producer always disconnects the
//! previous one, so two sources can never write to the output together.
//!
//! `render` is called from the output device callback (or directly by
//! tests) and pulls samples from whichever producer is connected.

use crate::buffer::AudioBuffer;
use parking_lot::Mutex;
use std::sync::Arc;
use tracing::debug;
use trimdeck_core::{Result, SharedClock, TrimdeckError};

/// Element positions further than this from the rendered position are
/// treated as a seek.
const ELEMENT_RESYNC_SECS: f64 = 0.1;

struct ScheduledBuffer {
    id: u64,
    buffer: Arc<AudioBuffer>,
    /// Fractional read position in buffer frames.
    position: f64,
    end_frame: f64,
}

struct ElementFeed {
    id: u64,
    audio: Option<Arc<AudioBuffer>>,
    position: f64,
    running: bool,
}

enum Producer {
    Buffer(ScheduledBuffer),
    Element(ElementFeed),
}

impl Producer {
    fn id(&self) -> u64 {
        match self {
            Producer::Buffer(b) => b.id,
            Producer::Element(e) => e.id,
        }
    }
}

struct GraphState {
    gain: f32,
    producer: Option<Producer>,
    next_id: u64,
    element_source_created: bool,
    disposed: bool,
}

struct GraphInner {
    clock: SharedClock,
    output_rate: u32,
    state: Mutex<GraphState>,
}

/// Handle to a session's audio graph. Clones share the same graph.
#[derive(Clone)]
pub struct AudioGraphContext {
    inner: Arc<GraphInner>,
}

impl std::fmt::Debug for AudioGraphContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AudioGraphContext")
            .field("output_rate", &self.inner.output_rate)
            .field("active_producers", &self.active_producers())
            .finish()
    }
}

impl AudioGraphContext {
    /// Create a graph rendering at `output_rate` Hz and reading time from `clock`.
    pub fn new(clock: SharedClock, output_rate: u32) -> Self {
        debug!("Creating audio graph at {} Hz", output_rate);
        Self {
            inner: Arc::new(GraphInner {
                clock,
                output_rate: output_rate.max(1),
                state: Mutex::new(GraphState {
                    gain: 1.0,
                    producer: None,
                    next_id: 1,
                    element_source_created: false,
                    disposed: false,
                }),
            }),
        }
    }

    /// Current graph time in seconds.
    pub fn now(&self) -> f64 {
        self.inner.clock.now()
    }

    /// True if both handles refer to the same graph.
    pub fn ptr_eq(&self, other: &AudioGraphContext) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }

    pub fn output_rate(&self) -> u32 {
        self.inner.output_rate
    }

    /// Set the gain stage. Takes effect on the next rendered block.
    pub fn set_gain(&self, gain: f32) {
        self.inner.state.lock().gain = gain.max(0.0);
    }

    pub fn gain(&self) -> f32 {
        self.inner.state.lock().gain
    }

    /// Number of producers currently connected (0 or 1).
    pub fn active_producers(&self) -> usize {
        usize::from(self.inner.state.lock().producer.is_some())
    }

    pub fn is_disposed(&self) -> bool {
        self.inner.state.lock().disposed
    }

    /// Disconnect everything and refuse further use.
    pub fn dispose(&self) {
        let mut state = self.inner.state.lock();
        if !state.disposed {
            debug!("Disposing audio graph");
        }
        state.producer = None;
        state.disposed = true;
    }

    /// Create a one-shot source over `buffer`. Nothing plays until
    /// [`BufferSource::start`].
    pub fn create_buffer_source(&self, buffer: Arc<AudioBuffer>) -> Result<BufferSource> {
        let mut state = self.inner.state.lock();
        if state.disposed {
            return Err(TrimdeckError::AudioGraph("audio graph is disposed".into()));
        }
        let id = state.next_id;
        state.next_id += 1;
        Ok(BufferSource {
            graph: self.clone(),
            id,
            buffer,
            scheduled: None,
        })
    }

    /// Create the source that routes a video element's audio through the
    /// gain stage. Only one may ever be created per graph.
    pub fn create_element_source(&self) -> Result<ElementSource> {
        let mut state = self.inner.state.lock();
        if state.disposed {
            return Err(TrimdeckError::AudioGraph("audio graph is disposed".into()));
        }
        if state.element_source_created {
            return Err(TrimdeckError::AudioGraph(
                "element source already created for this graph".into(),
            ));
        }
        state.element_source_created = true;
        let id = state.next_id;
        state.next_id += 1;
        Ok(ElementSource {
            graph: self.clone(),
            id,
        })
    }

    fn connect(&self, producer: Producer) -> Result<()> {
        let mut state = self.inner.state.lock();
        if state.disposed {
            return Err(TrimdeckError::AudioGraph("audio graph is disposed".into()));
        }
        if let Some(previous) = state.producer.take() {
            debug!("Disconnecting producer {} before connecting {}", previous.id(), producer.id());
        }
        state.producer = Some(producer);
        Ok(())
    }

    fn disconnect(&self, id: u64) {
        let mut state = self.inner.state.lock();
        if state.producer.as_ref().map(Producer::id) == Some(id) {
            state.producer = None;
        }
    }

    fn is_connected(&self, id: u64) -> bool {
        self.inner.state.lock().producer.as_ref().map(Producer::id) == Some(id)
    }

    fn with_element<R>(&self, id: u64, f: impl FnOnce(&mut ElementFeed) -> R) -> Option<R> {
        let mut state = self.inner.state.lock();
        match state.producer.as_mut() {
            Some(Producer::Element(feed)) if feed.id == id => Some(f(feed)),
            _ => None,
        }
    }

    /// Fill `out` (interleaved, `channels` wide) from the connected producer.
    /// Output is silent when nothing is connected.
    pub fn render(&self, out: &mut [f32], channels: usize) {
        out.iter_mut().for_each(|s| *s = 0.0);
        let channels = channels.max(1);
        let mut state = self.inner.state.lock();
        let gain = state.gain;
        let output_rate = self.inner.output_rate as f64;

        let finished = match state.producer.as_mut() {
            Some(Producer::Buffer(src)) => {
                let step = src.buffer.sample_rate() as f64 / output_rate;
                let frames = out.len() / channels;
                for f in 0..frames {
                    if src.position >= src.end_frame {
                        break;
                    }
                    write_frame(&src.buffer, src.position as usize, gain, &mut out[f * channels..(f + 1) * channels]);
                    src.position += step;
                }
                src.position >= src.end_frame
            }
            Some(Producer::Element(feed)) => {
                if let (true, Some(audio)) = (feed.running, feed.audio.as_ref()) {
                    let step = audio.sample_rate() as f64 / output_rate;
                    let end = audio.frames() as f64;
                    let frames = out.len() / channels;
                    for f in 0..frames {
                        if feed.position >= end {
                            break;
                        }
                        write_frame(audio, feed.position as usize, gain, &mut out[f * channels..(f + 1) * channels]);
                        feed.position += step;
                    }
                }
                false
            }
            None => false,
        };

        if finished {
            state.producer = None;
        }
    }
}

fn write_frame(buffer: &AudioBuffer, frame: usize, gain: f32, out: &mut [f32]) {
    let source_channels = buffer.channel_count();
    for (ch, slot) in out.iter_mut().enumerate() {
        let sample = buffer
            .channel(ch % source_channels)
            .and_then(|c| c.get(frame))
            .copied()
            .unwrap_or(0.0);
        *slot = (sample * gain).clamp(-1.0, 1.0);
    }
}

/// A one-shot scheduled playback of part of a decoded buffer.
///
/// A source can be started once. Replaying means creating a new source.
pub struct BufferSource {
    graph: AudioGraphContext,
    id: u64,
    buffer: Arc<AudioBuffer>,
    scheduled: Option<Scheduled>,
}

#[derive(Debug, Clone, Copy)]
struct Scheduled {
    started_at: f64,
    length: f64,
}

impl std::fmt::Debug for BufferSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BufferSource")
            .field("id", &self.id)
            .field("scheduled", &self.scheduled)
            .finish()
    }
}

impl BufferSource {
    /// Start playing `length` seconds from `offset`. Returns the graph time
    /// the source was scheduled at.
    pub fn start(&mut self, offset: f64, length: f64) -> Result<f64> {
        if self.scheduled.is_some() {
            return Err(TrimdeckError::AudioGraph(
                "buffer source can only be started once".into(),
            ));
        }
        let sr = self.buffer.sample_rate() as f64;
        let frames = self.buffer.frames() as f64;
        let offset = offset.clamp(0.0, self.buffer.duration());
        let length = length.max(0.0);
        let position = (offset * sr).min(frames);
        let end_frame = ((offset + length) * sr).min(frames);

        self.graph.connect(Producer::Buffer(ScheduledBuffer {
            id: self.id,
            buffer: Arc::clone(&self.buffer),
            position,
            end_frame,
        }))?;
        let started_at = self.graph.now();
        self.scheduled = Some(Scheduled { started_at, length });
        debug!("Buffer source {} started at offset {:.3}s for {:.3}s", self.id, offset, length);
        Ok(started_at)
    }

    /// Stop and disconnect. Safe to call more than once.
    pub fn stop(&mut self) {
        self.graph.disconnect(self.id);
    }

    pub fn is_started(&self) -> bool {
        self.scheduled.is_some()
    }

    /// Graph time at which the source was started.
    pub fn started_at(&self) -> Option<f64> {
        self.scheduled.map(|s| s.started_at)
    }

    /// Seconds played since `start`, capped at the scheduled length.
    pub fn elapsed(&self) -> Option<f64> {
        self.scheduled
            .map(|s| (self.graph.now() - s.started_at).clamp(0.0, s.length))
    }

    /// True once the source has been disconnected or its scheduled length
    /// has elapsed.
    pub fn has_ended(&self) -> bool {
        match self.scheduled {
            None => false,
            Some(s) => {
                !self.graph.is_connected(self.id) || self.graph.now() - s.started_at >= s.length
            }
        }
    }
}

impl Drop for BufferSource {
    fn drop(&mut self) {
        self.graph.disconnect(self.id);
    }
}

/// Routes a video element's audio through the graph's gain stage.
#[derive(Debug)]
pub struct ElementSource {
    graph: AudioGraphContext,
    id: u64,
}

impl ElementSource {
    /// Connect as the active producer. `audio` is the element's decoded
    /// soundtrack, if any; without it the source is silent.
    pub fn connect(&self, audio: Option<Arc<AudioBuffer>>, position: f64) -> Result<()> {
        let rate = audio.as_ref().map(|a| a.sample_rate() as f64).unwrap_or(0.0);
        self.graph.connect(Producer::Element(ElementFeed {
            id: self.id,
            audio,
            position: position.max(0.0) * rate,
            running: false,
        }))
    }

    pub fn disconnect(&self) {
        self.graph.disconnect(self.id);
    }

    pub fn is_connected(&self) -> bool {
        self.graph.is_connected(self.id)
    }

    /// Mirror the element's play state.
    pub fn set_running(&self, running: bool) {
        self.graph.with_element(self.id, |feed| feed.running = running);
    }

    /// Follow the element's reported position, jumping only on real seeks.
    pub fn sync(&self, element_time: f64) {
        self.graph.with_element(self.id, |feed| {
            if let Some(audio) = feed.audio.as_ref() {
                let rate = audio.sample_rate() as f64;
                let rendered = feed.position / rate;
                if (rendered - element_time).abs() > ELEMENT_RESYNC_SECS {
                    feed.position = element_time.max(0.0) * rate;
                }
            }
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use trimdeck_core::ManualClock;

    fn ramp(frames: usize, rate: u32) -> Arc<AudioBuffer> {
        let data: Vec<f32> = (0..frames).map(|i| i as f32 / frames as f32).collect();
        Arc::new(AudioBuffer::new(vec![data], rate).unwrap())
    }

    fn graph(rate: u32) -> (Arc<ManualClock>, AudioGraphContext) {
        let clock = ManualClock::new();
        let graph = AudioGraphContext::new(clock.clone(), rate);
        (clock, graph)
    }

    #[test]
    fn test_buffer_source_is_one_shot() {
        let (_clock, g) = graph(100);
        let mut src = g.create_buffer_source(ramp(100, 100)).unwrap();
        src.start(0.0, 1.0).unwrap();
        assert!(src.start(0.0, 1.0).is_err());
    }

    #[test]
    fn test_single_active_producer() {
        let (_clock, g) = graph(100);
        let buf = ramp(100, 100);
        let mut a = g.create_buffer_source(Arc::clone(&buf)).unwrap();
        let mut b = g.create_buffer_source(buf).unwrap();
        a.start(0.0, 1.0).unwrap();
        b.start(0.5, 0.5).unwrap();
        assert_eq!(g.active_producers(), 1);
        // a was replaced, stopping it must not disconnect b
        a.stop();
        assert_eq!(g.active_producers(), 1);
        b.stop();
        assert_eq!(g.active_producers(), 0);
    }

    #[test]
    fn test_render_applies_gain_and_offset() {
        let (_clock, g) = graph(100);
        g.set_gain(2.0);
        let mut src = g.create_buffer_source(ramp(100, 100)).unwrap();
        src.start(0.25, 0.5).unwrap();
        let mut out = [0.0f32; 4];
        g.render(&mut out, 2);
        assert!((out[0] - 0.5).abs() < 1e-6);
        assert_eq!(out[0], out[1]);
        assert!((out[2] - 0.52).abs() < 1e-6);
    }

    #[test]
    fn test_render_ends_source() {
        let (_clock, g) = graph(100);
        let mut src = g.create_buffer_source(ramp(100, 100)).unwrap();
        src.start(0.9, 5.0).unwrap();
        let mut out = [0.0f32; 20];
        g.render(&mut out, 1);
        assert_eq!(out[10], 0.0);
        assert_eq!(g.active_producers(), 0);
        assert!(src.has_ended());
    }

    #[test]
    fn test_has_ended_by_clock() {
        let (clock, g) = graph(100);
        let mut src = g.create_buffer_source(ramp(1000, 100)).unwrap();
        src.start(0.0, 2.0).unwrap();
        clock.advance(1.0);
        assert!(!src.has_ended());
        clock.advance(1.0);
        assert!(src.has_ended());
    }

    #[test]
    fn test_element_source_created_once() {
        let (_clock, g) = graph(100);
        let _first = g.create_element_source().unwrap();
        assert!(matches!(
            g.create_element_source(),
            Err(TrimdeckError::AudioGraph(_))
        ));
    }

    #[test]
    fn test_element_replaces_buffer() {
        let (_clock, g) = graph(100);
        let mut src = g.create_buffer_source(ramp(100, 100)).unwrap();
        src.start(0.0, 1.0).unwrap();
        let element = g.create_element_source().unwrap();
        element.connect(Some(ramp(100, 100)), 0.5).unwrap();
        assert_eq!(g.active_producers(), 1);
        assert!(src.has_ended());

        let mut out = [0.0f32; 2];
        g.render(&mut out, 1);
        assert_eq!(out, [0.0, 0.0]);
        element.set_running(true);
        g.render(&mut out, 1);
        assert!((out[0] - 0.5).abs() < 1e-6);

        element.sync(0.1);
        g.render(&mut out, 1);
        assert!((out[0] - 0.1).abs() < 1e-6);
    }

    #[test]
    fn test_dispose_rejects_new_sources() {
        let (_clock, g) = graph(100);
        let mut src = g.create_buffer_source(ramp(100, 100)).unwrap();
        src.start(0.0, 1.0).unwrap();
        g.dispose();
        assert_eq!(g.active_producers(), 0);
        assert!(g.create_buffer_source(ramp(10, 100)).is_err());
        assert!(g.create_element_source().is_err());
    }
}
