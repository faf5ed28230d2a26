//! Filmstrip thumbnails.
//!
//! Thumbnails are sampled at the centre of equal slices of the duration and
//! captured as RGBA frames. The cache is built once per load and is
//! read-only afterwards.

use crate::probe::MediaProbe;
use crate::tools::ffmpeg_binary;
use std::path::Path;
use std::process::{Command, Stdio};
use tracing::{debug, warn};
use trimdeck_core::{EditorConfig, Result, TrimdeckError};

/// Thumbnail width when the source aspect ratio is unknown.
pub const FALLBACK_WIDTH: u32 = 120;

/// One captured frame.
#[derive(Debug, Clone, PartialEq)]
pub struct Thumbnail {
    pub time: f64,
    pub width: u32,
    pub height: u32,
    /// RGBA8, `width * height * 4` bytes
    pub rgba: Vec<u8>,
}

impl Thumbnail {
    pub fn aspect(&self) -> f64 {
        if self.height == 0 {
            return FALLBACK_WIDTH as f64 / 80.0;
        }
        self.width as f64 / self.height as f64
    }
}

/// Ordered thumbnails across the duration.
#[derive(Debug, Clone, Default)]
pub struct ThumbnailCache {
    frames: Vec<Thumbnail>,
    ready: bool,
}

impl ThumbnailCache {
    /// A populated, ready cache.
    pub fn from_frames(frames: Vec<Thumbnail>) -> Self {
        Self {
            frames,
            ready: true,
        }
    }

    pub fn is_ready(&self) -> bool {
        self.ready && !self.frames.is_empty()
    }

    pub fn len(&self) -> usize {
        self.frames.len()
    }

    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }

    pub fn frames(&self) -> &[Thumbnail] {
        &self.frames
    }

    pub fn get(&self, index: usize) -> Option<&Thumbnail> {
        self.frames.get(index)
    }

    /// Thumbnail nearest to `ratio` (0..1 of the duration).
    pub fn nearest(&self, ratio: f64) -> Option<&Thumbnail> {
        nearest_index(ratio, self.frames.len()).and_then(|i| self.frames.get(i))
    }

    /// Aspect ratio of the first frame.
    pub fn aspect(&self) -> Option<f64> {
        self.frames.first().map(Thumbnail::aspect)
    }
}

/// `floor(ratio * len)`, clamped to a valid index.
pub fn nearest_index(ratio: f64, len: usize) -> Option<usize> {
    if len == 0 {
        return None;
    }
    let ratio = if ratio.is_finite() { ratio } else { 0.0 };
    let idx = (ratio * len as f64).floor();
    Some(idx.clamp(0.0, (len - 1) as f64) as usize)
}

/// Sample times for a clip of `duration` seconds.
pub fn sample_times(duration: f64, min_count: usize, max_count: usize) -> Vec<f64> {
    if !(duration.is_finite() && duration > 0.0) {
        return Vec::new();
    }
    let count = (duration.ceil() as usize).clamp(min_count.max(1), max_count.max(min_count.max(1)));
    (0..count)
        .map(|i| (i as f64 + 0.5) * duration / count as f64)
        .collect()
}

/// Width matching `aspect` at `height`, rounded to an even number of pixels.
pub fn thumbnail_width(aspect: Option<f64>, height: u32) -> u32 {
    match aspect {
        Some(a) if a.is_finite() && a > 0.0 => {
            let w = (height as f64 * a).round() as u32;
            (w + (w & 1)).max(2)
        }
        _ => FALLBACK_WIDTH,
    }
}

/// Grabs a single frame.
pub trait ThumbnailCapturer: Send + Sync {
    fn capture(&self, path: &Path, time: f64, width: u32, height: u32) -> Result<Thumbnail>;
}

/// Frame grabber using an FFmpeg subprocess writing raw RGBA to stdout.
#[derive(Debug, Clone, Default)]
pub struct FfmpegThumbnailer;

impl ThumbnailCapturer for FfmpegThumbnailer {
    fn capture(&self, path: &Path, time: f64, width: u32, height: u32) -> Result<Thumbnail> {
        let output = Command::new(ffmpeg_binary())
            .args(["-nostdin", "-v", "error", "-ss"])
            .arg(format!("{:.3}", time.max(0.0)))
            .arg("-i")
            .arg(path)
            .args(["-frames:v", "1", "-vf"])
            .arg(format!("scale={}:{}", width, height))
            .args(["-f", "rawvideo", "-pix_fmt", "rgba", "pipe:1"])
            .stdin(Stdio::null())
            .output()
            .map_err(|e| TrimdeckError::DecodeFailure(format!("Failed to spawn ffmpeg: {}", e)))?;

        let expected = width as usize * height as usize * 4;
        if !output.status.success() || output.stdout.len() < expected {
            return Err(TrimdeckError::DecodeFailure(format!(
                "no frame at {:.3}s",
                time
            )));
        }

        let mut rgba = output.stdout;
        rgba.truncate(expected);
        Ok(Thumbnail {
            time,
            width,
            height,
            rgba,
        })
    }
}

/// Capture the full filmstrip for `path`. Frames that fail to capture are
/// skipped; the cache is still marked ready.
pub fn build_cache(
    capturer: &dyn ThumbnailCapturer,
    path: &Path,
    duration: f64,
    aspect: Option<f64>,
    config: &EditorConfig,
) -> ThumbnailCache {
    let height = config.thumbnail_height;
    let width = thumbnail_width(aspect, height);
    let times = sample_times(duration, config.thumbnail_min, config.thumbnail_max);
    let mut frames = Vec::with_capacity(times.len());
    for t in times {
        match capturer.capture(path, t, width, height) {
            Ok(frame) => frames.push(frame),
            Err(e) => debug!("Skipping thumbnail at {:.3}s: {}", t, e),
        }
    }
    if frames.is_empty() {
        warn!("No thumbnails captured for {}", path.display());
    }
    ThumbnailCache::from_frames(frames)
}

/// Probe the file for its aspect ratio and capture the filmstrip.
pub fn capture_filmstrip(
    capturer: &dyn ThumbnailCapturer,
    path: &Path,
    duration: f64,
    config: &EditorConfig,
) -> ThumbnailCache {
    let aspect = MediaProbe::probe(path).ok().and_then(|p| p.aspect_ratio());
    build_cache(capturer, path, duration, aspect, config)
}
