//! Decoded PCM sample buffer (planar f32).

use trimdeck_core::{Result, TrimdeckError};

/// Channels × frames of decoded audio at a fixed sample rate.
#[derive(Debug, Clone, PartialEq)]
pub struct AudioBuffer {
    channels: Vec<Vec<f32>>,
    sample_rate: u32,
}

impl AudioBuffer {
    /// Build from planar channel data. Every channel must have the same length.
    pub fn new(channels: Vec<Vec<f32>>, sample_rate: u32) -> Result<Self> {
        if channels.is_empty() {
            return Err(TrimdeckError::DecodeFailure("no audio channels".into()));
        }
        if sample_rate == 0 {
            return Err(TrimdeckError::DecodeFailure("sample rate is zero".into()));
        }
        let frames = channels[0].len();
        if channels.iter().any(|c| c.len() != frames) {
            return Err(TrimdeckError::DecodeFailure(
                "channels have different lengths".into(),
            ));
        }
        Ok(Self {
            channels,
            sample_rate,
        })
    }

    /// Split interleaved samples into planar channels. A trailing partial
    /// frame is dropped.
    pub fn from_interleaved(data: &[f32], channel_count: usize, sample_rate: u32) -> Result<Self> {
        if channel_count == 0 {
            return Err(TrimdeckError::DecodeFailure("no audio channels".into()));
        }
        let frames = data.len() / channel_count;
        let mut channels = vec![Vec::with_capacity(frames); channel_count];
        for frame in data.chunks_exact(channel_count) {
            for (ch, &s) in frame.iter().enumerate() {
                channels[ch].push(s);
            }
        }
        Self::new(channels, sample_rate)
    }

    /// A buffer of silence.
    pub fn silent(channel_count: usize, frames: usize, sample_rate: u32) -> Result<Self> {
        Self::new(vec![vec![0.0; frames]; channel_count.max(1)], sample_rate)
    }

    pub fn channel_count(&self) -> usize {
        self.channels.len()
    }

    /// Samples per channel.
    pub fn frames(&self) -> usize {
        self.channels[0].len()
    }

    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    /// Length in seconds.
    pub fn duration(&self) -> f64 {
        self.frames() as f64 / self.sample_rate as f64
    }

    pub fn channel(&self, index: usize) -> Option<&[f32]> {
        self.channels.get(index).map(|c| c.as_slice())
    }

    pub fn channels(&self) -> &[Vec<f32>] {
        &self.channels
    }

    /// Frame index for a time in seconds, clamped to the buffer.
    pub fn frame_at(&self, t: f64) -> usize {
        if !t.is_finite() || t <= 0.0 {
            return 0;
        }
        ((t * self.sample_rate as f64).floor() as usize).min(self.frames())
    }

    /// Frame range `[start, end)` covering `[t0, t1]` as a fraction of
    /// `duration`, the way trimmed WAV export slices the buffer.
    pub fn frame_range(&self, t0: f64, t1: f64, duration: f64) -> (usize, usize) {
        if duration <= 0.0 {
            return (0, 0);
        }
        let len = self.frames() as f64;
        let start = ((t0 / duration).clamp(0.0, 1.0) * len).floor() as usize;
        let end = ((t1 / duration).clamp(0.0, 1.0) * len).floor() as usize;
        (start, end.max(start))
    }

    /// Copy of `[start, end)` frames of every channel.
    pub fn slice_frames(&self, start: usize, end: usize) -> Vec<Vec<f32>> {
        let end = end.min(self.frames());
        let start = start.min(end);
        self.channels
            .iter()
            .map(|c| c[start..end].to_vec())
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_interleaved() {
        let buf = AudioBuffer::from_interleaved(&[0.1, -0.1, 0.2, -0.2, 0.3], 2, 8000).unwrap();
        assert_eq!(buf.channel_count(), 2);
        assert_eq!(buf.frames(), 2);
        assert_eq!(buf.channel(0).unwrap(), &[0.1, 0.2]);
        assert_eq!(buf.channel(1).unwrap(), &[-0.1, -0.2]);
    }

    #[test]
    fn test_rejects_ragged_channels() {
        assert!(AudioBuffer::new(vec![vec![0.0; 3], vec![0.0; 2]], 44100).is_err());
        assert!(AudioBuffer::new(vec![], 44100).is_err());
        assert!(AudioBuffer::new(vec![vec![0.0]], 0).is_err());
    }

    #[test]
    fn test_duration_and_frame_at() {
        let buf = AudioBuffer::silent(1, 44100, 44100).unwrap();
        assert!((buf.duration() - 1.0).abs() < 1e-12);
        assert_eq!(buf.frame_at(0.5), 22050);
        assert_eq!(buf.frame_at(-1.0), 0);
        assert_eq!(buf.frame_at(10.0), 44100);
    }

    #[test]
    fn test_frame_range() {
        let buf = AudioBuffer::silent(1, 1000, 100).unwrap();
        assert_eq!(buf.frame_range(2.0, 5.0, 10.0), (200, 500));
        assert_eq!(buf.frame_range(5.0, 2.0, 10.0), (500, 500));
        assert_eq!(buf.slice_frames(200, 500)[0].len(), 300);
    }
}
