//! Trimdeck Audio - decoded audio and playback output
//!
//! Architecture:
//! - `AudioBuffer`: planar f32 samples from the decoder
//! - `Waveform`: min/max peak decimation for the timeline
//! - `wav`: 16-bit PCM WAV encoder used as the local export path
//! - `AudioGraphContext`: per-session graph with one gain stage and a single
//!   connected producer (buffer source or element source)
//! - `AudioOutput`: cpal device pulling from an `OutputSlot`

pub mod buffer;
pub mod graph;
pub mod output;
pub mod waveform;
pub mod wav;

pub use buffer::AudioBuffer;
pub use graph::{AudioGraphContext, BufferSource, ElementSource};
pub use output::{AudioOutput, OutputSlot};
pub use waveform::{compute_peaks, Peak, Waveform};
pub use wav::{pcm_encode, pcm_encode_with_gain, WavHeader};
