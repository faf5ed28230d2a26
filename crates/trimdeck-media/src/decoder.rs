//! Audio decoding to planar f32 buffers.

use crate::probe::MediaProbe;
use crate::tools::ffmpeg_binary;
use std::path::Path;
use std::process::{Command, Stdio};
use tracing::{debug, info};
use trimdeck_audio::{wav, AudioBuffer};
use trimdeck_core::{Result, TrimdeckError};

/// Something that turns a media file into decoded audio.
pub trait Decoder: Send + Sync {
    fn decode(&self, path: &Path) -> Result<AudioBuffer>;
}

/// Decoder backed by an FFmpeg subprocess.
///
/// WAV files are read natively and never touch FFmpeg.
#[derive(Debug, Clone, Default)]
pub struct FfmpegDecoder;

impl FfmpegDecoder {
    pub fn new() -> Self {
        Self
    }

    fn decode_with_ffmpeg(&self, path: &Path) -> Result<AudioBuffer> {
        let probe = MediaProbe::probe(path)?;
        let stream = probe
            .primary_audio()
            .ok_or_else(|| TrimdeckError::DecodeFailure("no audio stream".into()))?;
        let channels = stream.channels.max(1);
        let sample_rate = stream.sample_rate.max(1);

        info!(
            "Decoding audio from {} ({} Hz, {} ch)",
            path.display(),
            sample_rate,
            channels
        );

        let output = Command::new(ffmpeg_binary())
            .args(["-nostdin", "-v", "error", "-i"])
            .arg(path)
            .args(["-vn", "-ac"])
            .arg(channels.to_string())
            .arg("-ar")
            .arg(sample_rate.to_string())
            .args(["-f", "f32le", "pipe:1"])
            .stdin(Stdio::null())
            .output()
            .map_err(|e| TrimdeckError::DecodeFailure(format!("Failed to spawn ffmpeg: {}", e)))?;

        if !output.status.success() {
            return Err(TrimdeckError::DecodeFailure(format!(
                "ffmpeg could not decode audio: {}",
                String::from_utf8_lossy(&output.stderr).trim()
            )));
        }

        let samples = f32le_samples(&output.stdout);
        if samples.is_empty() {
            return Err(TrimdeckError::DecodeFailure("decoded audio is empty".into()));
        }
        AudioBuffer::from_interleaved(&samples, channels as usize, sample_rate)
    }
}

impl Decoder for FfmpegDecoder {
    fn decode(&self, path: &Path) -> Result<AudioBuffer> {
        let is_wav = path
            .extension()
            .and_then(|e| e.to_str())
            .is_some_and(|e| e.eq_ignore_ascii_case("wav"));
        if is_wav {
            let bytes = std::fs::read(path)
                .map_err(|e| TrimdeckError::DecodeFailure(format!("Failed to read file: {}", e)))?;
            match wav::decode(&bytes) {
                Ok(buffer) => {
                    debug!("Read {} natively", path.display());
                    return Ok(buffer);
                }
                Err(e) => debug!("Native WAV read failed ({}), trying ffmpeg", e),
            }
        }
        self.decode_with_ffmpeg(path)
    }
}

/// Reinterpret little-endian f32 bytes. A trailing partial sample is dropped.
pub fn f32le_samples(bytes: &[u8]) -> Vec<f32> {
    bytes
        .chunks_exact(4)
        .map(|b| f32::from_le_bytes([b[0], b[1], b[2], b[3]]))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_f32le_samples() {
        let mut bytes = Vec::new();
        bytes.extend_from_slice(&0.5f32.to_le_bytes());
        bytes.extend_from_slice(&(-1.0f32).to_le_bytes());
        bytes.push(7);
        assert_eq!(f32le_samples(&bytes), vec![0.5, -1.0]);
    }

    #[test]
    fn test_wav_is_decoded_natively() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("tone.wav");
        std::fs::write(&path, wav::pcm_encode(&[vec![0.0f32; 800]], 8000)).unwrap();
        let buffer = FfmpegDecoder::new().decode(&path).unwrap();
        assert_eq!(buffer.frames(), 800);
        assert!((buffer.duration() - 0.1).abs() < 1e-9);
    }

    #[test]
    fn test_missing_file_is_decode_failure() {
        let err = FfmpegDecoder::new()
            .decode(Path::new("/definitely/not/here.wav"))
            .unwrap_err();
        assert!(matches!(err, TrimdeckError::DecodeFailure(_)));
    }
}
