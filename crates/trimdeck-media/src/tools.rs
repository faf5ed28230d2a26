//! Locating the FFmpeg binaries.

use std::path::PathBuf;
use std::process::{Command, Stdio};

/// Path of the `ffmpeg` binary (sidecar download dir or `PATH`).
pub fn ffmpeg_binary() -> PathBuf {
    ffmpeg_sidecar::paths::ffmpeg_path()
}

/// Path of the `ffprobe` binary, expected next to `ffmpeg`.
pub fn ffprobe_binary() -> PathBuf {
    let ffmpeg = ffmpeg_binary();
    if ffmpeg.parent().map_or(true, |p| p.as_os_str().is_empty()) {
        return PathBuf::from(exe_name("ffprobe"));
    }
    ffmpeg.with_file_name(exe_name("ffprobe"))
}

/// Whether `ffmpeg` can be run.
pub fn ffmpeg_available() -> bool {
    ffmpeg_sidecar::command::ffmpeg_is_installed()
}

/// Whether `ffprobe` can be run.
pub fn ffprobe_available() -> bool {
    Command::new(ffprobe_binary())
        .arg("-version")
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .status()
        .map(|s| s.success())
        .unwrap_or(false)
}

fn exe_name(name: &str) -> String {
    if cfg!(windows) {
        format!("{}.exe", name)
    } else {
        name.to_string()
    }
}
