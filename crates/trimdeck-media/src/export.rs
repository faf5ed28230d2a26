//! Export of the trimmed selection.
//!
//! The planner turns track state into an [`ExportRequest`]: which output
//! path applies, the clamped ranges, and the drop flags. The orchestrator
//! then runs the request through an external encoder, or through the local
//! WAV encoder when no encoder is available and the output is audio only.

use serde::{Deserialize, Serialize};
use std::io::{BufRead, BufReader};
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing::{debug, info, warn};
use trimdeck_audio::{pcm_encode_with_gain, AudioBuffer};
use trimdeck_core::{MediaKind, Result, TrimdeckError};

use crate::tools::{ffmpeg_available, ffmpeg_binary};

/// Video and audio ranges closer than this count as identical.
pub const RANGE_MATCH_TOLERANCE: f64 = 0.01;

// ── Decision table ──────────────────────────────────────────────

/// Output path chosen from `(has_video, video_muted, audio_muted)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ExportPath {
    /// Audio source: trimmed audio in its own container.
    AudioContainer,
    /// Video source with both tracks enabled.
    VideoWithAudio,
    /// Video source with the video track muted.
    AudioOnlyExtraction,
    /// Video source with the audio track muted.
    VideoOnly,
    /// Nothing left to export.
    Disabled,
}

impl ExportPath {
    pub fn select(has_video: bool, video_muted: bool, audio_muted: bool) -> Self {
        match (has_video, video_muted, audio_muted) {
            (false, _, false) => Self::AudioContainer,
            (false, _, true) => Self::Disabled,
            (true, false, false) => Self::VideoWithAudio,
            (true, true, false) => Self::AudioOnlyExtraction,
            (true, false, true) => Self::VideoOnly,
            (true, true, true) => Self::Disabled,
        }
    }

    /// Export button label.
    pub fn label(self) -> &'static str {
        match self {
            Self::AudioContainer | Self::VideoWithAudio => "Export",
            Self::AudioOnlyExtraction => "Export audio only",
            Self::VideoOnly => "Export video only",
            Self::Disabled => "Export (disabled)",
        }
    }

    pub fn is_enabled(self) -> bool {
        self != Self::Disabled
    }

    pub fn drop_video(self) -> bool {
        matches!(self, Self::AudioContainer | Self::AudioOnlyExtraction)
    }

    pub fn drop_audio(self) -> bool {
        matches!(self, Self::VideoOnly)
    }

    /// Whether the output has no video and can fall back to a local WAV.
    pub fn is_audio_only(self) -> bool {
        matches!(self, Self::AudioContainer | Self::AudioOnlyExtraction)
    }
}

// ── Request ─────────────────────────────────────────────────────

/// A half-open span of source time in seconds.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ClipRange {
    pub start: f64,
    pub end: f64,
}

impl ClipRange {
    pub fn new(start: f64, end: f64) -> Self {
        Self { start, end }
    }

    pub fn length(&self) -> f64 {
        self.end - self.start
    }

    fn validate(&self, duration: f64) -> Result<()> {
        let ok = self.start.is_finite()
            && self.end.is_finite()
            && 0.0 <= self.start
            && self.start < self.end
            && self.end <= duration;
        if ok {
            Ok(())
        } else {
            Err(TrimdeckError::InvalidTrimState {
                in_point: self.start,
                out_point: self.end,
                duration,
            })
        }
    }

    fn matches(&self, other: &ClipRange) -> bool {
        (self.start - other.start).abs() < RANGE_MATCH_TOLERANCE
            && (self.end - other.end).abs() < RANGE_MATCH_TOLERANCE
    }
}

/// Everything the encoder needs, derived from the current edit state.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExportRequest {
    pub path: ExportPath,
    pub video_range: ClipRange,
    pub audio_range: ClipRange,
    pub drop_video: bool,
    pub drop_audio: bool,
    /// Linear gain for the audio track, 1.0 = unchanged.
    pub volume: f32,
    /// Source file extension without the dot.
    pub source_ext: String,
}

impl ExportRequest {
    /// Plan an export. Returns `ExportDisabled` when both usable tracks are
    /// muted and `InvalidTrimState` if a range escapes `[0, duration]`.
    #[allow(clippy::too_many_arguments)]
    pub fn plan(
        kind: MediaKind,
        duration: f64,
        video_muted: bool,
        audio_muted: bool,
        video_range: ClipRange,
        audio_range: ClipRange,
        volume: f32,
        source_ext: &str,
    ) -> Result<Self> {
        let path = ExportPath::select(kind.has_video(), video_muted, audio_muted);
        if !path.is_enabled() {
            return Err(TrimdeckError::ExportDisabled(
                "all tracks are muted".into(),
            ));
        }
        if !path.drop_video() {
            video_range.validate(duration)?;
        }
        if !path.drop_audio() {
            audio_range.validate(duration)?;
        }

        let source_ext = match source_ext.trim_start_matches('.') {
            "" => match kind {
                MediaKind::Video => "mp4",
                MediaKind::Audio => "m4a",
            },
            ext => ext,
        }
        .to_ascii_lowercase();

        info!(
            "Export planned: {:?}, video {:.3}-{:.3}, audio {:.3}-{:.3}, volume {:.2}",
            path, video_range.start, video_range.end, audio_range.start, audio_range.end, volume
        );

        Ok(Self {
            path,
            video_range,
            audio_range,
            drop_video: path.drop_video(),
            drop_audio: path.drop_audio(),
            volume: volume.clamp(0.0, 2.0),
            source_ext,
        })
    }

    /// Whether both tracks cover the same span (single stream-copy pass).
    pub fn ranges_match(&self) -> bool {
        self.video_range.matches(&self.audio_range)
    }

    fn unity_gain(&self) -> bool {
        (self.volume - 1.0).abs() < 1e-4
    }

    /// Extension of the encoder output.
    pub fn output_ext(&self) -> &str {
        match self.path {
            ExportPath::AudioOnlyExtraction => "m4a",
            _ => &self.source_ext,
        }
    }

    /// File name of the encoder output.
    pub fn output_name(&self) -> String {
        format!("trimmed.{}", self.output_ext())
    }

    /// Length of the exported clip in seconds.
    pub fn output_length(&self) -> f64 {
        match self.path {
            ExportPath::AudioContainer | ExportPath::AudioOnlyExtraction => self.audio_range.length(),
            ExportPath::VideoOnly => self.video_range.length(),
            _ if self.ranges_match() => self.video_range.length(),
            _ => self.video_range.length().min(self.audio_range.length()),
        }
    }

    /// Audio encoder for re-encoded output in the chosen container.
    fn audio_encoder(&self) -> &'static str {
        match self.output_ext() {
            "webm" | "ogg" | "ogv" | "opus" => "libopus",
            _ => "aac",
        }
    }

    fn audio_codec_args(&self, reencode: bool) -> Vec<String> {
        if self.unity_gain() && !reencode {
            return vec!["-c:a".into(), "copy".into()];
        }
        let mut args = vec![
            "-c:a".into(),
            self.audio_encoder().into(),
            "-b:a".into(),
            "192k".into(),
        ];
        if !self.unity_gain() {
            args.push("-filter:a".into());
            args.push(format!("volume={:.3}", self.volume));
        }
        args
    }

    /// FFmpeg invocations that produce `output`. Intermediate files for the
    /// per-track re-mux are written into `workdir`.
    pub fn encoder_passes(&self, input: &Path, workdir: &Path, output: &Path) -> Vec<EncoderPass> {
        let input = input.to_string_lossy().into_owned();
        let output_str = output.to_string_lossy().into_owned();
        let cut = |range: &ClipRange| -> Vec<String> {
            vec![
                "-ss".into(),
                secs(range.start),
                "-i".into(),
                input.clone(),
                "-t".into(),
                secs(range.length()),
            ]
        };

        match self.path {
            ExportPath::Disabled => Vec::new(),
            ExportPath::AudioContainer => {
                let mut args = cut(&self.audio_range);
                args.push("-vn".into());
                if self.unity_gain() {
                    args.extend(["-c:a".into(), "copy".into()]);
                    args.extend(["-avoid_negative_ts".into(), "make_zero".into()]);
                } else {
                    // Default encoder for the source container.
                    args.push("-filter:a".into());
                    args.push(format!("volume={:.3}", self.volume));
                }
                args.push(output_str);
                vec![EncoderPass::new(args, self.audio_range.length())]
            }
            ExportPath::AudioOnlyExtraction => {
                let mut args = cut(&self.audio_range);
                args.push("-vn".into());
                args.extend(self.audio_codec_args(true));
                args.push(output_str);
                vec![EncoderPass::new(args, self.audio_range.length())]
            }
            ExportPath::VideoOnly => {
                let mut args = cut(&self.video_range);
                args.extend(["-an".into(), "-c:v".into(), "copy".into(), output_str]);
                vec![EncoderPass::new(args, self.video_range.length())]
            }
            ExportPath::VideoWithAudio if self.ranges_match() => {
                let mut args = cut(&self.video_range);
                if self.unity_gain() {
                    args.extend(["-c".into(), "copy".into()]);
                } else {
                    args.extend(["-c:v".into(), "copy".into()]);
                    args.extend(self.audio_codec_args(true));
                }
                args.extend(["-avoid_negative_ts".into(), "make_zero".into(), output_str]);
                vec![EncoderPass::new(args, self.video_range.length())]
            }
            ExportPath::VideoWithAudio => {
                let temp_v = workdir
                    .join(format!("temp_v.{}", self.source_ext))
                    .to_string_lossy()
                    .into_owned();
                let temp_a = workdir.join("temp_a.mka").to_string_lossy().into_owned();

                let mut video = cut(&self.video_range);
                video.extend(["-an".into(), "-c:v".into(), "copy".into(), temp_v.clone()]);

                let mut audio = cut(&self.audio_range);
                audio.push("-vn".into());
                audio.extend(self.audio_codec_args(false));
                audio.push(temp_a.clone());

                let mux = vec![
                    "-i".into(),
                    temp_v,
                    "-i".into(),
                    temp_a,
                    "-c".into(),
                    "copy".into(),
                    "-shortest".into(),
                    output_str,
                ];

                vec![
                    EncoderPass::new(video, self.video_range.length()),
                    EncoderPass::new(audio, self.audio_range.length()),
                    EncoderPass::new(mux, self.output_length()),
                ]
            }
        }
    }
}

fn secs(t: f64) -> String {
    format!("{:.3}", t)
}

/// One encoder invocation and the media length it is expected to write.
#[derive(Debug, Clone, PartialEq)]
pub struct EncoderPass {
    pub args: Vec<String>,
    pub length: f64,
}

impl EncoderPass {
    pub fn new(args: Vec<String>, length: f64) -> Self {
        Self { args, length }
    }
}

// ── Progress & cancel ───────────────────────────────────────────

/// Parses FFmpeg `-progress` key=value lines.
#[derive(Debug, Default, Clone)]
pub struct ProgressParser {
    out_time: f64,
    complete: bool,
}

impl ProgressParser {
    /// Feed one line. Returns the output time when it changed.
    pub fn feed(&mut self, line: &str) -> Option<f64> {
        let (key, value) = line.trim().split_once('=')?;
        match key {
            "out_time_us" | "out_time_ms" => {
                // Both keys carry microseconds.
                let us = value.parse::<f64>().ok()?;
                self.out_time = (us / 1_000_000.0).max(0.0);
                Some(self.out_time)
            }
            "progress" => {
                self.complete = value == "end";
                None
            }
            _ => None,
        }
    }

    pub fn out_time(&self) -> f64 {
        self.out_time
    }

    pub fn is_complete(&self) -> bool {
        self.complete
    }
}

/// Status text for a progress fraction.
pub fn progress_status(fraction: f64) -> String {
    format!("Processing: {}%", (fraction.clamp(0.0, 1.0) * 100.0).round() as u32)
}

/// Handle for cancelling an in-progress export.
#[derive(Debug, Clone)]
pub struct ExportCancel(Arc<AtomicBool>);

impl ExportCancel {
    pub fn new() -> Self {
        Self(Arc::new(AtomicBool::new(false)))
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::Relaxed);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::Relaxed)
    }
}

impl Default for ExportCancel {
    fn default() -> Self {
        Self::new()
    }
}

// ── Encoders ────────────────────────────────────────────────────

/// An external encoder able to run FFmpeg-style passes.
pub trait ExternalEncoder: Send + Sync {
    fn name(&self) -> &str;

    /// Run one pass, reporting the output time written so far in seconds.
    fn run_pass(
        &self,
        pass: &EncoderPass,
        on_time: &mut dyn FnMut(f64),
        cancel: &ExportCancel,
    ) -> Result<()>;
}

/// Encoder backed by the FFmpeg binary.
#[derive(Debug, Clone)]
pub struct FfmpegEncoder {
    binary: PathBuf,
}

impl FfmpegEncoder {
    /// Locate FFmpeg. Fails with `EncoderUnavailable` if it cannot run.
    pub fn new() -> Result<Self> {
        if !ffmpeg_available() {
            return Err(TrimdeckError::EncoderUnavailable(
                "ffmpeg is not installed".into(),
            ));
        }
        Ok(Self {
            binary: ffmpeg_binary(),
        })
    }
}

impl ExternalEncoder for FfmpegEncoder {
    fn name(&self) -> &str {
        "ffmpeg"
    }

    fn run_pass(
        &self,
        pass: &EncoderPass,
        on_time: &mut dyn FnMut(f64),
        cancel: &ExportCancel,
    ) -> Result<()> {
        debug!("ffmpeg {}", pass.args.join(" "));
        let mut child = Command::new(&self.binary)
            .args(["-y", "-nostdin", "-v", "error", "-progress", "pipe:1", "-nostats"])
            .args(&pass.args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|e| TrimdeckError::ExportFailure(format!("Failed to spawn ffmpeg: {e}")))?;

        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| TrimdeckError::ExportFailure("Failed to open ffmpeg stdout".into()))?;

        let mut parser = ProgressParser::default();
        for line in BufReader::new(stdout).lines() {
            if cancel.is_cancelled() {
                let _ = child.kill();
                let _ = child.wait();
                return Err(TrimdeckError::ExportFailure("Export cancelled".into()));
            }
            let Ok(line) = line else { break };
            if let Some(t) = parser.feed(&line) {
                on_time(t);
            }
        }

        let output = child
            .wait_with_output()
            .map_err(|e| TrimdeckError::ExportFailure(format!("Failed to wait for ffmpeg: {e}")))?;
        if cancel.is_cancelled() {
            return Err(TrimdeckError::ExportFailure("Export cancelled".into()));
        }
        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            let reason = stderr
                .lines()
                .last()
                .map(str::to_string)
                .unwrap_or_else(|| format!("ffmpeg exited with status: {}", output.status));
            return Err(TrimdeckError::ExportFailure(reason));
        }
        Ok(())
    }
}

/// Encode `[range]` of `buffer` to WAV bytes, scaled by `volume`.
pub fn encode_wav_range(buffer: &AudioBuffer, range: ClipRange, duration: f64, volume: f32) -> Vec<u8> {
    let (start, end) = buffer.frame_range(range.start, range.end, duration);
    let channels = buffer.slice_frames(start, end);
    pcm_encode_with_gain(&channels, buffer.sample_rate(), volume)
}

// ── Orchestrator ────────────────────────────────────────────────

/// The loaded source as the exporter sees it.
#[derive(Debug, Clone)]
pub struct ExportSource {
    pub path: PathBuf,
    pub duration: f64,
    pub decoded_audio: Option<Arc<AudioBuffer>>,
}

/// Where the export landed.
#[derive(Debug, Clone, PartialEq)]
pub struct ExportOutcome {
    pub output: PathBuf,
    /// True when the local WAV encoder produced the file.
    pub local_wav: bool,
}

impl ExportOutcome {
    pub fn status(&self) -> String {
        "Export complete".to_string()
    }
}

/// Run `request` and write the result into `dest_dir`.
///
/// `on_progress` receives the overall completion fraction in `0..=1`.
pub fn run_export(
    request: &ExportRequest,
    source: &ExportSource,
    encoder: Option<&dyn ExternalEncoder>,
    dest_dir: &Path,
    on_progress: &mut dyn FnMut(f64),
    cancel: &ExportCancel,
) -> Result<ExportOutcome> {
    if !request.path.is_enabled() {
        return Err(TrimdeckError::ExportDisabled("all tracks are muted".into()));
    }

    let Some(encoder) = encoder else {
        return export_local_wav(request, source, dest_dir, on_progress);
    };

    let output = dest_dir.join(request.output_name());
    let workdir = tempfile::tempdir()?;
    let passes = request.encoder_passes(&source.path, workdir.path(), &output);
    let total: f64 = passes.iter().map(|p| p.length.max(0.0)).sum::<f64>().max(f64::EPSILON);

    info!(
        "Exporting {} with {} ({} pass{})",
        output.display(),
        encoder.name(),
        passes.len(),
        if passes.len() == 1 { "" } else { "es" }
    );

    on_progress(0.0);
    let mut done = 0.0;
    for pass in &passes {
        let mut report = |t: f64| on_progress(((done + t.min(pass.length)) / total).clamp(0.0, 1.0));
        encoder.run_pass(pass, &mut report, cancel).map_err(|e| {
            warn!("Encoder pass failed: {}", e);
            match e {
                TrimdeckError::ExportFailure(_) => e,
                other => TrimdeckError::ExportFailure(other.to_string()),
            }
        })?;
        done += pass.length.max(0.0);
    }
    on_progress(1.0);

    Ok(ExportOutcome {
        output,
        local_wav: false,
    })
}

fn export_local_wav(
    request: &ExportRequest,
    source: &ExportSource,
    dest_dir: &Path,
    on_progress: &mut dyn FnMut(f64),
) -> Result<ExportOutcome> {
    if !request.path.is_audio_only() {
        return Err(TrimdeckError::EncoderUnavailable(
            "ffmpeg is required to export video".into(),
        ));
    }
    let buffer = source.decoded_audio.as_ref().ok_or_else(|| {
        TrimdeckError::EncoderUnavailable("no decoded audio for local WAV export".into())
    })?;

    info!("Encoder unavailable, writing local WAV");
    on_progress(0.0);
    let bytes = encode_wav_range(buffer, request.audio_range, source.duration, request.volume);
    let output = dest_dir.join("trimmed.wav");
    std::fs::write(&output, bytes)
        .map_err(|e| TrimdeckError::ExportFailure(format!("Failed to write WAV: {e}")))?;
    on_progress(1.0);

    Ok(ExportOutcome {
        output,
        local_wav: true,
    })
}
