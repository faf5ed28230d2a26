//! Output device plumbing.
//!
//! The device callback renders whatever graph is attached to an
//! [`OutputSlot`]. Sessions attach their graph when it is created and the
//! slot is cleared on teardown, so the device itself outlives sessions.

use crate::graph::AudioGraphContext;
use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use parking_lot::Mutex;
use std::sync::Arc;
use tracing::{info, warn};
use trimdeck_core::{Result, TrimdeckError};

/// Preferred output rate when the device supports it.
const TARGET_RATE: u32 = 48_000;

/// Shared attachment point between sessions and the output device.
#[derive(Clone, Default)]
pub struct OutputSlot {
    graph: Arc<Mutex<Option<AudioGraphContext>>>,
    sample_rate: u32,
}

impl OutputSlot {
    /// A detached slot rendering at `sample_rate`.
    pub fn new(sample_rate: u32) -> Self {
        Self {
            graph: Arc::new(Mutex::new(None)),
            sample_rate,
        }
    }

    pub fn sample_rate(&self) -> u32 {
        self.sample_rate.max(1)
    }

    pub fn attach(&self, graph: &AudioGraphContext) {
        *self.graph.lock() = Some(graph.clone());
    }

    pub fn detach(&self) {
        *self.graph.lock() = None;
    }

    /// Detach only if `graph` is the one attached.
    pub fn detach_graph(&self, graph: &AudioGraphContext) {
        let mut slot = self.graph.lock();
        if slot.as_ref().is_some_and(|g| g.ptr_eq(graph)) {
            *slot = None;
        }
    }

    pub fn is_attached(&self) -> bool {
        self.graph.lock().is_some()
    }

    /// Render one device block. Silent when nothing is attached.
    pub fn render(&self, out: &mut [f32], channels: usize) {
        match self.graph.lock().as_ref() {
            Some(graph) => graph.render(out, channels),
            None => out.iter_mut().for_each(|s| *s = 0.0),
        }
    }
}

/// An open cpal output stream pulling from an [`OutputSlot`].
pub struct AudioOutput {
    _stream: cpal::Stream,
    slot: OutputSlot,
    channels: u16,
}

impl AudioOutput {
    /// Open the default output device.
    pub fn open() -> Result<Self> {
        let host = cpal::default_host();
        let device = host
            .default_output_device()
            .ok_or_else(|| TrimdeckError::AudioDevice("No default audio output device found".into()))?;
        let config = select_output_config(&device)?;
        let sample_rate = config.sample_rate.0;
        let channels = config.channels;
        info!(
            "Opening audio output {} at {} Hz, {} channels",
            device.name().unwrap_or_else(|_| "<unknown>".into()),
            sample_rate,
            channels
        );

        let slot = OutputSlot::new(sample_rate);
        let slot_for_cb = slot.clone();
        let channels_for_cb = channels as usize;

        let stream = device
            .build_output_stream(
                &config,
                move |data: &mut [f32], _| slot_for_cb.render(data, channels_for_cb),
                move |err| warn!("Audio output error: {}", err),
                None,
            )
            .map_err(|e| TrimdeckError::AudioDevice(e.to_string()))?;
        stream
            .play()
            .map_err(|e| TrimdeckError::AudioDevice(e.to_string()))?;

        Ok(Self {
            _stream: stream,
            slot,
            channels,
        })
    }

    /// The slot sessions attach their graph to.
    pub fn slot(&self) -> OutputSlot {
        self.slot.clone()
    }

    pub fn sample_rate(&self) -> u32 {
        self.slot.sample_rate()
    }

    pub fn channels(&self) -> u16 {
        self.channels
    }
}

fn select_output_config(device: &cpal::Device) -> Result<cpal::StreamConfig> {
    let configs: Vec<_> = device
        .supported_output_configs()
        .map_err(|e| TrimdeckError::AudioDevice(e.to_string()))?
        .filter(|c| c.sample_format() == cpal::SampleFormat::F32)
        .collect();

    let target = cpal::SampleRate(TARGET_RATE);
    if let Some(config) = configs
        .iter()
        .find(|c| c.min_sample_rate() <= target && c.max_sample_rate() >= target)
    {
        return Ok(config.with_sample_rate(target).config());
    }

    let default_config = device
        .default_output_config()
        .map_err(|e| TrimdeckError::AudioDevice(e.to_string()))?;
    if default_config.sample_format() != cpal::SampleFormat::F32 {
        return Err(TrimdeckError::AudioDevice(
            "Default output device does not support f32 samples".into(),
        ));
    }
    Ok(default_config.config())
}
