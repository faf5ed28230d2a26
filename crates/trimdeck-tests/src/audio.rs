//! Integration tests for the audio subsystem.

use trimdeck_audio::wav::{self, HEADER_LEN};
use trimdeck_audio::{compute_peaks, pcm_encode, pcm_encode_with_gain, AudioBuffer, Peak, WavHeader, Waveform};

#[test]
fn one_second_stereo_wav_size() {
    let frames = 22_050;
    let left = vec![0.25f32; frames];
    let right = vec![-0.25f32; frames];
    let bytes = pcm_encode(&[left, right], 22_050);
    assert_eq!(bytes.len(), 88_244);

    let header = WavHeader::parse(&bytes).unwrap();
    assert_eq!(header.channels, 2);
    assert_eq!(header.sample_rate, 22_050);
    assert_eq!(header.bits_per_sample, 16);
    assert_eq!(header.data_len, 88_200);
    assert_eq!(&bytes[0..4], b"RIFF");
    assert_eq!(u32::from_le_bytes([bytes[4], bytes[5], bytes[6], bytes[7]]), 88_236);
}

#[test]
fn samples_are_clipped_and_scaled_asymmetrically() {
    let bytes = pcm_encode(&[vec![2.0f32, -2.0, 1.0, -1.0, 0.0]], 8_000);
    let sample = |i: usize| i16::from_le_bytes([bytes[HEADER_LEN + 2 * i], bytes[HEADER_LEN + 2 * i + 1]]);
    assert_eq!(sample(0), 32_767);
    assert_eq!(sample(1), -32_768);
    assert_eq!(sample(2), 32_767);
    assert_eq!(sample(3), -32_768);
    assert_eq!(sample(4), 0);
}

#[test]
fn gain_applies_before_clipping() {
    let bytes = pcm_encode_with_gain(&[vec![0.75f32, 0.25]], 8_000, 2.0);
    let first = i16::from_le_bytes([bytes[HEADER_LEN], bytes[HEADER_LEN + 1]]);
    let second = i16::from_le_bytes([bytes[HEADER_LEN + 2], bytes[HEADER_LEN + 3]]);
    assert_eq!(first, 32_767);
    assert_eq!(second, (0.5f32 * 32_767.0) as i16);
}

#[test]
fn encoded_wav_reads_back() {
    let left: Vec<f32> = (0..400).map(|i| ((i as f32) * 0.05).sin() * 0.8).collect();
    let right: Vec<f32> = left.iter().map(|s| -s).collect();
    let bytes = pcm_encode(&[left.clone(), right], 16_000);

    let buffer = wav::decode(&bytes).unwrap();
    assert_eq!(buffer.channel_count(), 2);
    assert_eq!(buffer.frames(), 400);
    assert_eq!(buffer.sample_rate(), 16_000);
    let decoded = buffer.channel(0).unwrap();
    for (a, b) in left.iter().zip(decoded) {
        assert!((a - b).abs() < 1e-3);
    }
}

#[test]
fn peaks_cover_every_column() {
    let peaks = compute_peaks(&[0.0, 1.0, -1.0, 0.5], 2);
    assert_eq!(
        peaks,
        vec![Peak { min: 0.0, max: 1.0 }, Peak { min: -1.0, max: 0.5 }]
    );
    // More columns than samples still yields one peak per column.
    assert_eq!(compute_peaks(&[0.3], 5).len(), 5);
}

#[test]
fn waveform_from_decoded_buffer() {
    let buffer = AudioBuffer::new(vec![vec![0.5; 48_000], vec![0.0; 48_000]], 48_000).unwrap();
    let waveform = Waveform::from_buffer(&buffer);
    assert_eq!(waveform.duration_seconds(), 1.0);
    let peaks = waveform.peaks_in_range(0.25, 0.75, 10);
    assert_eq!(peaks.len(), 10);
    assert!(peaks.iter().all(|p| p.max == 0.5 && p.min == 0.5));
}
