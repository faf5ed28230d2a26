//! Media file probing via ffprobe.

use crate::tools::ffprobe_binary;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::process::Command;
use tracing::debug;
use trimdeck_core::{MediaKind, Result, TrimdeckError};

/// Information about a media file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MediaProbe {
    pub path: String,
    /// Duration in seconds
    pub duration: f64,
    pub video_streams: Vec<VideoStreamInfo>,
    pub audio_streams: Vec<AudioStreamInfo>,
    /// Container format name(s) as reported by ffprobe
    pub format: String,
}

/// Information about a video stream.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VideoStreamInfo {
    pub index: usize,
    pub codec: String,
    pub width: u32,
    pub height: u32,
}

/// Information about an audio stream.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AudioStreamInfo {
    pub index: usize,
    pub codec: String,
    pub sample_rate: u32,
    pub channels: u16,
}

#[derive(Deserialize)]
struct RawProbe {
    #[serde(default)]
    streams: Vec<RawStream>,
    format: Option<RawFormat>,
}

#[derive(Deserialize)]
struct RawStream {
    index: usize,
    codec_type: Option<String>,
    codec_name: Option<String>,
    width: Option<u32>,
    height: Option<u32>,
    sample_rate: Option<String>,
    channels: Option<u16>,
    duration: Option<String>,
    #[serde(default)]
    disposition: RawDisposition,
}

#[derive(Deserialize, Default)]
struct RawDisposition {
    #[serde(default)]
    attached_pic: u8,
}

#[derive(Deserialize)]
struct RawFormat {
    format_name: Option<String>,
    duration: Option<String>,
}

impl MediaProbe {
    /// Probe a media file.
    pub fn probe<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(TrimdeckError::DecodeFailure(format!(
                "File not found: {}",
                path.display()
            )));
        }

        let output = Command::new(ffprobe_binary())
            .args(["-v", "error", "-print_format", "json", "-show_format", "-show_streams"])
            .arg(path)
            .output()
            .map_err(|e| TrimdeckError::DecodeFailure(format!("Failed to run ffprobe: {}", e)))?;
        if !output.status.success() {
            return Err(TrimdeckError::DecodeFailure(format!(
                "ffprobe failed: {}",
                String::from_utf8_lossy(&output.stderr).trim()
            )));
        }

        let probe = Self::from_json(&path.to_string_lossy(), &output.stdout)?;
        debug!(
            "Probed {}: {:.3}s, {} video / {} audio streams",
            probe.path,
            probe.duration,
            probe.video_streams.len(),
            probe.audio_streams.len()
        );
        Ok(probe)
    }

    /// Parse ffprobe's JSON output.
    pub fn from_json(path: &str, json: &[u8]) -> Result<Self> {
        let raw: RawProbe = serde_json::from_slice(json)
            .map_err(|e| TrimdeckError::DecodeFailure(format!("Invalid ffprobe output: {}", e)))?;

        let parse_secs = |s: &Option<String>| s.as_deref().and_then(|d| d.parse::<f64>().ok());

        let mut video_streams = Vec::new();
        let mut audio_streams = Vec::new();
        let mut stream_duration: f64 = 0.0;
        for s in &raw.streams {
            if let Some(d) = parse_secs(&s.duration) {
                stream_duration = stream_duration.max(d);
            }
            match s.codec_type.as_deref() {
                // Cover art is reported as a video stream.
                Some("video") if s.disposition.attached_pic == 0 => {
                    video_streams.push(VideoStreamInfo {
                        index: s.index,
                        codec: s.codec_name.clone().unwrap_or_default(),
                        width: s.width.unwrap_or(0),
                        height: s.height.unwrap_or(0),
                    })
                }
                Some("audio") => audio_streams.push(AudioStreamInfo {
                    index: s.index,
                    codec: s.codec_name.clone().unwrap_or_default(),
                    sample_rate: s
                        .sample_rate
                        .as_deref()
                        .and_then(|r| r.parse().ok())
                        .unwrap_or(44_100),
                    channels: s.channels.unwrap_or(2),
                }),
                _ => {}
            }
        }

        let format = raw.format.as_ref();
        let duration = format
            .and_then(|f| parse_secs(&f.duration))
            .unwrap_or(stream_duration);
        if !(duration.is_finite() && duration > 0.0) {
            return Err(TrimdeckError::DecodeFailure(
                "media has no usable duration".into(),
            ));
        }

        Ok(Self {
            path: path.to_string(),
            duration,
            video_streams,
            audio_streams,
            format: format
                .and_then(|f| f.format_name.clone())
                .unwrap_or_default(),
        })
    }

    pub fn has_video(&self) -> bool {
        !self.video_streams.is_empty()
    }

    pub fn has_audio(&self) -> bool {
        !self.audio_streams.is_empty()
    }

    /// Media kind by stream content.
    pub fn kind(&self) -> MediaKind {
        if self.has_video() {
            MediaKind::Video
        } else {
            MediaKind::Audio
        }
    }

    pub fn primary_video(&self) -> Option<&VideoStreamInfo> {
        self.video_streams.first()
    }

    pub fn primary_audio(&self) -> Option<&AudioStreamInfo> {
        self.audio_streams.first()
    }

    /// Width / height of the primary video stream.
    pub fn aspect_ratio(&self) -> Option<f64> {
        self.primary_video()
            .filter(|v| v.width > 0 && v.height > 0)
            .map(|v| v.width as f64 / v.height as f64)
    }
}
