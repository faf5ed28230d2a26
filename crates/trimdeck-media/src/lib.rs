//! Trimdeck Media - FFmpeg integration for probing, decoding and export
//!
//! This crate handles:
//! - Media file probing (ffprobe)
//! - Audio decoding to `AudioBuffer`
//! - Filmstrip thumbnail capture
//! - Export planning and encoding

pub mod decoder;
pub mod export;
pub mod probe;
pub mod thumbnail;
pub mod tools;

pub use decoder::{Decoder, FfmpegDecoder};
pub use export::{
    run_export, ClipRange, EncoderPass, ExportCancel, ExportOutcome, ExportPath, ExportRequest,
    ExportSource, ExternalEncoder, FfmpegEncoder,
};
pub use probe::MediaProbe;
pub use thumbnail::{FfmpegThumbnailer, Thumbnail, ThumbnailCache, ThumbnailCapturer};

/// Log which FFmpeg tools are usable (call once at startup).
pub fn init() {
    tracing::info!(
        "Trimdeck media: ffmpeg {}, ffprobe {}",
        if tools::ffmpeg_available() { "found" } else { "missing" },
        if tools::ffprobe_available() { "found" } else { "missing" }
    );
}
