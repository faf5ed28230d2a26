//! Benchmarks for peak decimation and WAV encoding.
//!
//! Run with: cargo bench -p trimdeck-audio

use criterion::{black_box, criterion_group, criterion_main, Criterion};
use trimdeck_audio::{compute_peaks, pcm_encode, Waveform};

fn sine(frames: usize) -> Vec<f32> {
    (0..frames).map(|i| (i as f32 * 0.03).sin() * 0.8).collect()
}

fn bench_peaks(c: &mut Criterion) {
    // Ten minutes at 44.1 kHz
    let samples = sine(44_100 * 600);
    c.bench_function("compute_peaks_10min_1200px", |bencher| {
        bencher.iter(|| compute_peaks(black_box(&samples), 1200));
    });

    let waveform = Waveform::from_samples(samples, 44_100);
    c.bench_function("waveform_overview_10min_1200px", |bencher| {
        bencher.iter(|| waveform.peaks_in_range(0.0, black_box(600.0), 1200));
    });
    c.bench_function("waveform_zoomed_20s_1200px", |bencher| {
        bencher.iter(|| waveform.peaks_in_range(black_box(300.0), 320.0, 1200));
    });
}

fn bench_wav(c: &mut Criterion) {
    let left = sine(44_100 * 10);
    let right = sine(44_100 * 10);
    c.bench_function("pcm_encode_10s_stereo", |bencher| {
        bencher.iter(|| pcm_encode(black_box(&[&left[..], &right[..]]), 44_100));
    });
}

criterion_group!(benches, bench_peaks, bench_wav);
criterion_main!(benches);
