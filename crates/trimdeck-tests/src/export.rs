//! Integration tests for export planning and the local WAV path.

use crate::fixtures::{loaded, write_wav, RATE};
use std::path::Path;
use std::time::Duration;
use trimdeck_audio::wav::HEADER_LEN;
use trimdeck_audio::WavHeader;
use trimdeck_core::{MediaKind, TrimdeckError};
use trimdeck_media::{ClipRange, ExportPath, ExportRequest};

#[test]
fn decision_table() {
    let rows = [
        (false, false, false, ExportPath::AudioContainer, "Export", (true, false)),
        (false, false, true, ExportPath::Disabled, "Export (disabled)", (false, false)),
        (true, false, false, ExportPath::VideoWithAudio, "Export", (false, false)),
        (true, true, false, ExportPath::AudioOnlyExtraction, "Export audio only", (true, false)),
        (true, false, true, ExportPath::VideoOnly, "Export video only", (false, true)),
        (true, true, true, ExportPath::Disabled, "Export (disabled)", (false, false)),
    ];
    for (has_video, video_muted, audio_muted, path, label, drops) in rows {
        let selected = ExportPath::select(has_video, video_muted, audio_muted);
        assert_eq!(selected, path, "{has_video} {video_muted} {audio_muted}");
        assert_eq!(selected.label(), label);
        assert_eq!((selected.drop_video(), selected.drop_audio()), drops);
        assert_eq!(selected.is_enabled(), path != ExportPath::Disabled);
    }
}

#[test]
fn matching_ranges_stream_copy_in_one_pass() {
    let range = ClipRange::new(1.0, 4.0);
    let request = ExportRequest::plan(MediaKind::Video, 10.0, false, false, range, range, 1.0, "mp4").unwrap();
    let passes = request.encoder_passes(Path::new("in.mp4"), Path::new("/tmp"), Path::new("out/trimmed.mp4"));
    assert_eq!(passes.len(), 1);
    let args = &passes[0].args;
    let ss = args.iter().position(|a| a == "-ss").unwrap();
    assert_eq!(args[ss + 1], "1.000");
    let t = args.iter().position(|a| a == "-t").unwrap();
    assert_eq!(args[t + 1], "3.000");
    assert!(args.windows(2).any(|w| w == ["-c", "copy"]));
    assert_eq!(request.output_name(), "trimmed.mp4");
}

#[test]
fn volume_reencodes_audio_only() {
    let range = ClipRange::new(0.0, 2.0);
    let request = ExportRequest::plan(MediaKind::Video, 10.0, false, false, range, range, 0.5, "mp4").unwrap();
    let passes = request.encoder_passes(Path::new("in.mp4"), Path::new("/tmp"), Path::new("trimmed.mp4"));
    let args = &passes[0].args;
    assert!(args.windows(2).any(|w| w == ["-c:v", "copy"]));
    assert!(args.iter().any(|a| a == "volume=0.500"));
}

#[test]
fn all_muted_cannot_plan() {
    let range = ClipRange::new(0.0, 2.0);
    let result = ExportRequest::plan(MediaKind::Audio, 10.0, false, true, range, range, 1.0, "mp3");
    assert!(matches!(result, Err(TrimdeckError::ExportDisabled(_))));
}

#[test]
fn editor_writes_trimmed_wav_with_volume() {
    let dir = tempfile::tempdir().unwrap();
    let (mut ed, _clock) = loaded(&write_wav(dir.path(), "tone.wav", 10, 0.5));
    ed.set_in(1.0).unwrap();
    ed.set_out(3.0).unwrap();
    ed.set_volume(0.5).unwrap();

    let out_dir = tempfile::tempdir().unwrap();
    ed.export(out_dir.path()).unwrap();
    assert!(ed.wait_for_jobs(Duration::from_secs(10)));
    assert_eq!(ed.status(), "Export complete");
    assert!(!ed.is_exporting());

    let bytes = std::fs::read(out_dir.path().join("trimmed.wav")).unwrap();
    let header = WavHeader::parse(&bytes).unwrap();
    assert_eq!(header.sample_rate, RATE);
    assert_eq!(header.channels, 1);
    assert_eq!(header.data_len as usize, 2 * RATE as usize * 2);
    assert_eq!(bytes.len(), HEADER_LEN + 400);

    // 0.5 source at half volume.
    let first = i16::from_le_bytes([bytes[HEADER_LEN], bytes[HEADER_LEN + 1]]);
    assert_eq!(first, 8_191);
}

#[test]
fn export_result_after_reset_is_discarded() {
    let dir = tempfile::tempdir().unwrap();
    let (mut ed, _clock) = loaded(&write_wav(dir.path(), "tone.wav", 10, 0.5));
    let out_dir = tempfile::tempdir().unwrap();
    ed.export(out_dir.path()).unwrap();
    ed.reset();
    assert!(ed.wait_for_jobs(Duration::from_secs(10)));
    assert_eq!(ed.status(), "");
    assert!(!ed.is_exporting());
}

#[test]
fn second_export_while_running_is_ignored() {
    let dir = tempfile::tempdir().unwrap();
    let (mut ed, _clock) = loaded(&write_wav(dir.path(), "tone.wav", 10, 0.5));
    let out_dir = tempfile::tempdir().unwrap();
    ed.export(out_dir.path()).unwrap();
    ed.export(out_dir.path()).unwrap();
    assert!(ed.has_pending_jobs());
    assert!(ed.wait_for_jobs(Duration::from_secs(10)));
    assert_eq!(ed.status(), "Export complete");
}
