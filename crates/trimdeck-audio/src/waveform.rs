//! Peak decimation for waveform display.
//!
//! Every display column gets one min/max pair scanned from the samples it
//! covers. Columns never share a sample range narrower than one sample, so
//! the envelope is only ever downsampled.

use crate::buffer::AudioBuffer;
use serde::{Deserialize, Serialize};

/// Source samples per pre-reduced bin in [`Waveform`].
const OVERVIEW_BIN: usize = 256;

/// A min/max pair representing the amplitude range at a pixel column.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Peak {
    pub min: f32,
    pub max: f32,
}

impl Default for Peak {
    fn default() -> Self {
        Self { min: 0.0, max: 0.0 }
    }
}

impl Peak {
    fn empty() -> Self {
        Self {
            min: 1.0,
            max: -1.0,
        }
    }

    fn include(&mut self, min: f32, max: f32) {
        if min < self.min {
            self.min = min;
        }
        if max > self.max {
            self.max = max;
        }
    }

    /// Vertical extent `(top, bottom)` inside a lane of height `h`.
    pub fn to_lane(self, h: f32) -> (f32, f32) {
        let top = (1.0 - self.max.clamp(-1.0, 1.0)) / 2.0 * h;
        let bottom = (1.0 - self.min.clamp(-1.0, 1.0)) / 2.0 * h;
        (top, bottom.max(top + 0.5))
    }
}

/// Sample range of column `i` when `samples` are spread over `columns`.
fn column_range(i: usize, samples: usize, columns: usize) -> (usize, usize) {
    let step = samples.div_ceil(columns).max(1);
    let start = i * samples / columns;
    (start, (start + step).min(samples))
}

/// Decimate `samples` into exactly `columns` min/max pairs.
///
/// Column `i` scans `[floor(i*n/w), min(start + ceil(n/w), n))`.
pub fn compute_peaks(samples: &[f32], columns: usize) -> Vec<Peak> {
    if columns == 0 {
        return Vec::new();
    }
    if samples.is_empty() {
        return vec![Peak::default(); columns];
    }
    (0..columns)
        .map(|i| {
            let (start, end) = column_range(i, samples.len(), columns);
            let mut peak = Peak::empty();
            for &s in &samples[start..end] {
                peak.include(s, s);
            }
            peak
        })
        .collect()
}

/// Waveform source for one channel, with a coarse overview for zoomed-out
/// views of long files.
#[derive(Debug, Clone)]
pub struct Waveform {
    samples: Vec<f32>,
    overview: Vec<Peak>,
    sample_rate: u32,
}

impl Waveform {
    /// Build from the first channel of a decoded buffer.
    pub fn from_buffer(buffer: &AudioBuffer) -> Self {
        Self::from_samples(buffer.channel(0).unwrap_or(&[]).to_vec(), buffer.sample_rate())
    }

    pub fn from_samples(samples: Vec<f32>, sample_rate: u32) -> Self {
        let overview = samples
            .chunks(OVERVIEW_BIN)
            .map(|chunk| {
                let mut peak = Peak::empty();
                for &s in chunk {
                    peak.include(s, s);
                }
                peak
            })
            .collect();
        Self {
            samples,
            overview,
            sample_rate: sample_rate.max(1),
        }
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    /// Duration in seconds.
    pub fn duration_seconds(&self) -> f64 {
        self.samples.len() as f64 / self.sample_rate as f64
    }

    /// Peaks for the whole file across `columns`.
    pub fn peaks(&self, columns: usize) -> Vec<Peak> {
        compute_peaks(&self.samples, columns)
    }

    /// Peaks for the time window `[t0, t1)` across `columns`, used when the
    /// timeline is zoomed and only part of it is visible.
    pub fn peaks_in_range(&self, t0: f64, t1: f64, columns: usize) -> Vec<Peak> {
        if columns == 0 {
            return Vec::new();
        }
        let sr = self.sample_rate as f64;
        let start = ((t0.max(0.0) * sr).floor() as usize).min(self.samples.len());
        let end = ((t1.max(0.0) * sr).ceil() as usize).clamp(start, self.samples.len());
        let span = end - start;
        if span == 0 {
            return vec![Peak::default(); columns];
        }

        // Wide columns read the overview instead of raw samples.
        if span / columns >= OVERVIEW_BIN * 4 {
            let bin_start = start / OVERVIEW_BIN;
            let bin_end = end.div_ceil(OVERVIEW_BIN).min(self.overview.len());
            let bins = &self.overview[bin_start..bin_end];
            return (0..columns)
                .map(|i| {
                    let (a, b) = column_range(i, bins.len(), columns);
                    let mut peak = Peak::empty();
                    for p in &bins[a..b] {
                        peak.include(p.min, p.max);
                    }
                    peak
                })
                .collect();
        }

        compute_peaks(&self.samples[start..end], columns)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_peaks_basic() {
        // 100 samples over 10 columns
        let samples: Vec<f32> = (0..100).map(|i| (i as f32 / 100.0) * 2.0 - 1.0).collect();
        let peaks = compute_peaks(&samples, 10);
        assert_eq!(peaks.len(), 10);
        assert!(peaks[0].min <= -0.99);
        assert!(peaks[0].max < -0.8);
        assert!(peaks[9].min > 0.7);
        assert!(peaks[9].max > 0.9);
    }

    #[test]
    fn test_peaks_never_upsample() {
        // Fewer samples than columns: each column still covers one sample.
        let samples = [0.5f32, -0.5];
        let peaks = compute_peaks(&samples, 4);
        assert_eq!(peaks.len(), 4);
        assert_eq!(peaks[0], Peak { min: 0.5, max: 0.5 });
        assert_eq!(peaks[3], Peak { min: -0.5, max: -0.5 });
    }

    #[test]
    fn test_peaks_uneven_split_covers_all_samples() {
        let mut samples = vec![0.0f32; 101];
        samples[100] = 0.9;
        let peaks = compute_peaks(&samples, 10);
        assert_eq!(peaks[9].max, 0.9);
    }

    #[test]
    fn test_peaks_empty() {
        assert!(compute_peaks(&[], 0).is_empty());
        let peaks = compute_peaks(&[], 3);
        assert_eq!(peaks, vec![Peak::default(); 3]);
    }

    #[test]
    fn test_range_matches_direct_scan() {
        let samples: Vec<f32> = (0..48000).map(|i| ((i as f32) * 0.01).sin()).collect();
        let wf = Waveform::from_samples(samples.clone(), 48000);
        let direct = compute_peaks(&samples[12000..24000], 50);
        let ranged = wf.peaks_in_range(0.25, 0.5, 50);
        assert_eq!(direct, ranged);
    }

    #[test]
    fn test_overview_bounds_envelope() {
        let mut samples = vec![0.0f32; 256 * 4000];
        samples[300_000] = 0.75;
        samples[700_000] = -0.6;
        let wf = Waveform::from_samples(samples, 48000);
        let peaks = wf.peaks_in_range(0.0, wf.duration_seconds(), 100);
        let max = peaks.iter().map(|p| p.max).fold(f32::MIN, f32::max);
        let min = peaks.iter().map(|p| p.min).fold(f32::MAX, f32::min);
        assert_eq!(max, 0.75);
        assert_eq!(min, -0.6);
    }

    #[test]
    fn test_lane_extent() {
        let (top, bottom) = Peak { min: -1.0, max: 1.0 }.to_lane(100.0);
        assert_eq!(top, 0.0);
        assert_eq!(bottom, 100.0);
        let (top, bottom) = Peak::default().to_lane(100.0);
        assert_eq!(top, 50.0);
        assert_eq!(bottom, 50.5);
    }

    #[test]
    fn test_waveform_duration() {
        let wf = Waveform::from_samples(vec![0.0f32; 48000], 48000);
        assert!((wf.duration_seconds() - 1.0).abs() < 0.01);
    }

    proptest! {
        #[test]
        fn prop_one_peak_per_column_within_envelope(
            samples in prop::collection::vec(-1.0f32..=1.0, 1..2000),
            columns in 1usize..400,
        ) {
            let peaks = compute_peaks(&samples, columns);
            prop_assert_eq!(peaks.len(), columns);
            let lo = samples.iter().copied().fold(f32::MAX, f32::min);
            let hi = samples.iter().copied().fold(f32::MIN, f32::max);
            for p in peaks {
                prop_assert!(p.min <= p.max);
                prop_assert!(p.min >= lo && p.max <= hi);
            }
        }
    }
}
