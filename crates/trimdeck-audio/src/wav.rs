//! Canonical 16-bit PCM WAV encoding.
//!
//! Layout: 44-byte RIFF header followed by interleaved little-endian i16
//! samples. Samples are clipped to [-1, 1] and scaled asymmetrically
//! (negative by 32768, positive by 32767).

use crate::buffer::AudioBuffer;
use std::io::Cursor;
use trimdeck_core::{Result, TrimdeckError};

pub const HEADER_LEN: usize = 44;
const BITS_PER_SAMPLE: u16 = 16;

/// Fields read back from a WAV header.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WavHeader {
    pub channels: u16,
    pub sample_rate: u32,
    pub bits_per_sample: u16,
    pub data_len: u32,
}

impl WavHeader {
    /// Parse the canonical 44-byte header.
    pub fn parse(bytes: &[u8]) -> Result<Self> {
        if bytes.len() < HEADER_LEN {
            return Err(TrimdeckError::DecodeFailure("WAV header truncated".into()));
        }
        if &bytes[0..4] != b"RIFF" || &bytes[8..12] != b"WAVE" {
            return Err(TrimdeckError::DecodeFailure("not a RIFF/WAVE file".into()));
        }
        if &bytes[12..16] != b"fmt " || &bytes[36..40] != b"data" {
            return Err(TrimdeckError::DecodeFailure(
                "unexpected WAV chunk layout".into(),
            ));
        }
        let u16_at = |o: usize| u16::from_le_bytes([bytes[o], bytes[o + 1]]);
        let u32_at =
            |o: usize| u32::from_le_bytes([bytes[o], bytes[o + 1], bytes[o + 2], bytes[o + 3]]);
        if u16_at(20) != 1 {
            return Err(TrimdeckError::DecodeFailure("WAV is not PCM".into()));
        }
        Ok(Self {
            channels: u16_at(22),
            sample_rate: u32_at(24),
            bits_per_sample: u16_at(34),
            data_len: u32_at(40),
        })
    }
}

fn to_i16(s: f32) -> i16 {
    let s = s.clamp(-1.0, 1.0);
    if s < 0.0 {
        (s * 32768.0) as i16
    } else {
        (s * 32767.0) as i16
    }
}

/// Encode planar channels to a WAV file at unity gain.
pub fn pcm_encode<C: AsRef<[f32]>>(channels: &[C], sample_rate: u32) -> Vec<u8> {
    pcm_encode_with_gain(channels, sample_rate, 1.0)
}

/// Encode planar channels, multiplying every sample by `gain` before
/// clipping. Channels shorter than the first are padded with silence.
pub fn pcm_encode_with_gain<C: AsRef<[f32]>>(channels: &[C], sample_rate: u32, gain: f32) -> Vec<u8> {
    let channel_count = channels.len();
    let frames = channels.first().map(|c| c.as_ref().len()).unwrap_or(0);
    let data_len = frames * channel_count * 2;
    let block_align = (channel_count * 2) as u16;

    let mut out = Vec::with_capacity(HEADER_LEN + data_len);
    out.extend_from_slice(b"RIFF");
    out.extend_from_slice(&((36 + data_len) as u32).to_le_bytes());
    out.extend_from_slice(b"WAVE");
    out.extend_from_slice(b"fmt ");
    out.extend_from_slice(&16u32.to_le_bytes());
    out.extend_from_slice(&1u16.to_le_bytes());
    out.extend_from_slice(&(channel_count as u16).to_le_bytes());
    out.extend_from_slice(&sample_rate.to_le_bytes());
    out.extend_from_slice(&(sample_rate * block_align as u32).to_le_bytes());
    out.extend_from_slice(&block_align.to_le_bytes());
    out.extend_from_slice(&BITS_PER_SAMPLE.to_le_bytes());
    out.extend_from_slice(b"data");
    out.extend_from_slice(&(data_len as u32).to_le_bytes());

    for i in 0..frames {
        for ch in channels {
            let s = ch.as_ref().get(i).copied().unwrap_or(0.0) * gain;
            out.extend_from_slice(&to_i16(s).to_le_bytes());
        }
    }
    out
}

/// Decode a PCM or float WAV file into planar f32 channels.
///
/// Integer samples are scaled the same way [`pcm_encode`] writes them, so
/// encoder output reads back exactly.
pub fn decode(bytes: &[u8]) -> Result<AudioBuffer> {
    let reader = hound::WavReader::new(Cursor::new(bytes)).map_err(wav_error)?;
    let spec = reader.spec();
    let samples: Vec<f32> = match spec.sample_format {
        hound::SampleFormat::Float => reader
            .into_samples::<f32>()
            .collect::<std::result::Result<_, _>>()
            .map_err(wav_error)?,
        hound::SampleFormat::Int => {
            let half = (1u64 << (spec.bits_per_sample.clamp(1, 32) - 1)) as f32;
            reader
                .into_samples::<i32>()
                .map(|s| s.map(|v| int_to_f32(v, half)))
                .collect::<std::result::Result<_, _>>()
                .map_err(wav_error)?
        }
    };
    AudioBuffer::from_interleaved(&samples, spec.channels as usize, spec.sample_rate)
}

fn int_to_f32(v: i32, half: f32) -> f32 {
    if v < 0 {
        v as f32 / half
    } else {
        v as f32 / (half - 1.0).max(1.0)
    }
}

fn wav_error(e: hound::Error) -> TrimdeckError {
    TrimdeckError::DecodeFailure(format!("WAV read failed: {}", e))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_one_second_mono_silence() {
        let bytes = pcm_encode(&[vec![0.0f32; 44100]], 44100);
        assert_eq!(bytes.len(), 88244);
        let header = WavHeader::parse(&bytes).unwrap();
        assert_eq!(header.sample_rate, 44100);
        assert_eq!(header.channels, 1);
        assert_eq!(header.bits_per_sample, 16);
        assert_eq!(header.data_len, 88200);
        assert_eq!(&bytes[4..8], &(36u32 + 88200).to_le_bytes());
        assert!(bytes[HEADER_LEN..].iter().all(|&b| b == 0));
    }

    #[test]
    fn test_scaling_and_clipping() {
        let bytes = pcm_encode(&[vec![1.0f32, -1.0, 2.0, -3.0, 0.5]], 8000);
        let samples: Vec<i16> = bytes[HEADER_LEN..]
            .chunks_exact(2)
            .map(|b| i16::from_le_bytes([b[0], b[1]]))
            .collect();
        assert_eq!(samples, vec![32767, -32768, 32767, -32768, 16383]);
    }

    #[test]
    fn test_interleaves_channels() {
        let bytes = pcm_encode(&[vec![0.5f32, 0.5], vec![-0.5f32, -0.5]], 22050);
        let header = WavHeader::parse(&bytes).unwrap();
        assert_eq!(header.channels, 2);
        assert_eq!(u16::from_le_bytes([bytes[32], bytes[33]]), 4);
        assert_eq!(u32::from_le_bytes([bytes[28], bytes[29], bytes[30], bytes[31]]), 22050 * 4);
        let first = i16::from_le_bytes([bytes[44], bytes[45]]);
        let second = i16::from_le_bytes([bytes[46], bytes[47]]);
        assert_eq!(first, 16383);
        assert_eq!(second, -16384);
    }

    #[test]
    fn test_gain_applied_before_clip() {
        let bytes = pcm_encode_with_gain(&[vec![0.25f32, 0.75]], 8000, 2.0);
        let a = i16::from_le_bytes([bytes[44], bytes[45]]);
        let b = i16::from_le_bytes([bytes[46], bytes[47]]);
        assert_eq!(a, 16383);
        assert_eq!(b, 32767);
    }

    #[test]
    fn test_decode_reads_back_samples() {
        let bytes = pcm_encode(&[vec![1.0f32, -1.0, 0.0], vec![0.0f32, 0.0, -1.0]], 16000);
        let buffer = decode(&bytes).unwrap();
        assert_eq!(buffer.channel_count(), 2);
        assert_eq!(buffer.sample_rate(), 16000);
        assert_eq!(buffer.channel(0).unwrap(), &[1.0, -1.0, 0.0]);
        assert_eq!(buffer.channel(1).unwrap(), &[0.0, 0.0, -1.0]);
    }

    #[test]
    fn test_decode_skips_unknown_chunks() {
        let wav = pcm_encode(&[vec![0.5f32; 4]], 8000);
        let mut bytes = wav[..12].to_vec();
        bytes.extend_from_slice(b"LIST");
        bytes.extend_from_slice(&4u32.to_le_bytes());
        bytes.extend_from_slice(&[1, 2, 3, 4]);
        bytes.extend_from_slice(&wav[12..]);
        let riff_len = (bytes.len() - 8) as u32;
        bytes[4..8].copy_from_slice(&riff_len.to_le_bytes());
        let buffer = decode(&bytes).unwrap();
        assert_eq!(buffer.frames(), 4);
    }

    #[test]
    fn test_decode_float_wav() {
        let spec = hound::WavSpec {
            channels: 2,
            sample_rate: 48000,
            bits_per_sample: 32,
            sample_format: hound::SampleFormat::Float,
        };
        let mut bytes = Vec::new();
        {
            let mut writer = hound::WavWriter::new(Cursor::new(&mut bytes), spec).unwrap();
            for s in [0.25f32, -0.25, 0.75, -0.75] {
                writer.write_sample(s).unwrap();
            }
            writer.finalize().unwrap();
        }
        let buffer = decode(&bytes).unwrap();
        assert_eq!(buffer.channel_count(), 2);
        assert_eq!(buffer.sample_rate(), 48000);
        assert_eq!(buffer.channel(0).unwrap(), &[0.25, 0.75]);
        assert_eq!(buffer.channel(1).unwrap(), &[-0.25, -0.75]);
    }

    #[test]
    fn test_decode_24_bit_wav() {
        let spec = hound::WavSpec {
            channels: 1,
            sample_rate: 44100,
            bits_per_sample: 24,
            sample_format: hound::SampleFormat::Int,
        };
        let mut bytes = Vec::new();
        {
            let mut writer = hound::WavWriter::new(Cursor::new(&mut bytes), spec).unwrap();
            for s in [8_388_607i32, -8_388_608, 0] {
                writer.write_sample(s).unwrap();
            }
            writer.finalize().unwrap();
        }
        let buffer = decode(&bytes).unwrap();
        assert_eq!(buffer.channel(0).unwrap(), &[1.0, -1.0, 0.0]);
    }

    #[test]
    fn test_parse_rejects_garbage() {
        assert!(decode(b"not a wav file at all").is_err());
        assert!(WavHeader::parse(b"RIFF").is_err());
        assert!(WavHeader::parse(&[0u8; 44]).is_err());
    }
}
