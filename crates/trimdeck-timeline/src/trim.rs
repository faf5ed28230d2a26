//! Trim, mute and volume state.
//!
//! One trim range is shared by both tracks. Each track carries its own mute
//! flag and the audio track a gain in `[0, 2]`. Every mutation keeps
//! `0 <= in < out <= duration` with at least `epsilon` between the edges.

use serde::{Deserialize, Serialize};
use trimdeck_core::{MediaKind, Result, TrackKind, TrimEdge, TrimdeckError};
use trimdeck_media::ExportPath;

pub const MIN_VOLUME: f32 = 0.0;
pub const MAX_VOLUME: f32 = 2.0;

/// `[in, out]` selection in seconds.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TrimRange {
    pub in_point: f64,
    pub out_point: f64,
}

impl TrimRange {
    /// The whole clip.
    pub fn full(duration: f64) -> Self {
        Self {
            in_point: 0.0,
            out_point: duration,
        }
    }

    pub fn length(&self) -> f64 {
        self.out_point - self.in_point
    }

    /// `in <= t < out`
    pub fn contains(&self, t: f64) -> bool {
        t >= self.in_point && t < self.out_point
    }

    /// Check `0 <= in < out <= duration`.
    pub fn validate(&self, duration: f64) -> Result<()> {
        if 0.0 <= self.in_point && self.in_point < self.out_point && self.out_point <= duration {
            Ok(())
        } else {
            Err(TrimdeckError::InvalidTrimState {
                in_point: self.in_point,
                out_point: self.out_point,
                duration,
            })
        }
    }
}

/// Per-track flags.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TrackState {
    pub muted: bool,
    /// Linear gain, 1.0 = unity. Only the audio track uses it.
    pub volume: f32,
}

impl Default for TrackState {
    fn default() -> Self {
        Self {
            muted: false,
            volume: 1.0,
        }
    }
}

/// The authoritative edit state of the loaded media.
#[derive(Debug, Clone, PartialEq)]
pub struct TrimState {
    kind: MediaKind,
    duration: f64,
    epsilon: f64,
    range: TrimRange,
    video: TrackState,
    audio: TrackState,
    active: TrackKind,
}

impl TrimState {
    /// Fresh state covering the whole clip. `epsilon` is reduced for clips
    /// too short to honour it.
    pub fn new(kind: MediaKind, duration: f64, epsilon: f64) -> Self {
        let duration = if duration.is_finite() && duration > 0.0 {
            duration
        } else {
            f64::EPSILON
        };
        let active = match kind {
            MediaKind::Video => TrackKind::Video,
            MediaKind::Audio => TrackKind::Audio,
        };
        Self {
            kind,
            duration,
            epsilon: epsilon.max(0.0).min(duration / 2.0),
            range: TrimRange::full(duration),
            video: TrackState::default(),
            audio: TrackState::default(),
            active,
        }
    }

    pub fn kind(&self) -> MediaKind {
        self.kind
    }

    pub fn duration(&self) -> f64 {
        self.duration
    }

    pub fn epsilon(&self) -> f64 {
        self.epsilon
    }

    pub fn range(&self) -> TrimRange {
        self.range
    }

    pub fn in_point(&self) -> f64 {
        self.range.in_point
    }

    pub fn out_point(&self) -> f64 {
        self.range.out_point
    }

    /// `in = clamp(t, 0, out - epsilon)`. Returns the applied value.
    pub fn set_in(&mut self, t: f64) -> f64 {
        if t.is_finite() {
            let max = (self.range.out_point - self.epsilon).max(0.0);
            self.range.in_point = t.clamp(0.0, max);
        }
        debug_assert!(self.range.validate(self.duration).is_ok());
        self.range.in_point
    }

    /// `out = clamp(t, in + epsilon, duration)`. Returns the applied value.
    pub fn set_out(&mut self, t: f64) -> f64 {
        if t.is_finite() {
            let min = (self.range.in_point + self.epsilon).min(self.duration);
            self.range.out_point = t.clamp(min, self.duration);
        }
        debug_assert!(self.range.validate(self.duration).is_ok());
        self.range.out_point
    }

    /// Move one edge to the pointer time. Never fails.
    pub fn drag_edge(&mut self, edge: TrimEdge, pointer_time: f64) -> f64 {
        match edge {
            TrimEdge::In => self.set_in(pointer_time),
            TrimEdge::Out => self.set_out(pointer_time),
        }
    }

    /// Put the in point at the playback cursor.
    pub fn mark_in(&mut self, cursor: f64) -> f64 {
        self.set_in(cursor)
    }

    /// Put the out point at the playback cursor.
    pub fn mark_out(&mut self, cursor: f64) -> f64 {
        self.set_out(cursor)
    }

    /// Back to the full clip.
    pub fn reset_range(&mut self) {
        self.range = TrimRange::full(self.duration);
    }

    pub fn track(&self, track: TrackKind) -> &TrackState {
        match track {
            TrackKind::Video => &self.video,
            TrackKind::Audio => &self.audio,
        }
    }

    /// Whether `track` exists for this media. Audio files have no video track.
    pub fn is_usable(&self, track: TrackKind) -> bool {
        match track {
            TrackKind::Video => self.kind == MediaKind::Video,
            TrackKind::Audio => true,
        }
    }

    pub fn is_muted(&self, track: TrackKind) -> bool {
        self.track(track).muted
    }

    /// Flip a track's mute flag. Muting the active track hands focus to the
    /// other track when that one is usable and not muted. Returns the new flag.
    pub fn toggle_mute(&mut self, track: TrackKind) -> bool {
        if !self.is_usable(track) {
            return self.track(track).muted;
        }
        let state = match track {
            TrackKind::Video => &mut self.video,
            TrackKind::Audio => &mut self.audio,
        };
        state.muted = !state.muted;
        let muted = state.muted;

        let other = track.other();
        if muted && self.active == track && self.is_usable(other) && !self.is_muted(other) {
            self.active = other;
        }
        muted
    }

    /// Clamp and set the audio volume. Returns the applied value.
    pub fn set_volume(&mut self, volume: f32) -> f32 {
        if volume.is_finite() {
            self.audio.volume = volume.clamp(MIN_VOLUME, MAX_VOLUME);
        }
        self.audio.volume
    }

    pub fn volume(&self) -> f32 {
        self.audio.volume
    }

    /// Gain the audio graph should apply: 0 when audio is muted.
    pub fn effective_gain(&self) -> f32 {
        if self.audio.muted {
            0.0
        } else {
            self.audio.volume
        }
    }

    pub fn active_track(&self) -> TrackKind {
        self.active
    }

    /// Focus a track. Unusable tracks cannot be selected.
    pub fn select_track(&mut self, track: TrackKind) -> bool {
        if self.is_usable(track) {
            self.active = track;
            true
        } else {
            false
        }
    }

    pub fn export_path(&self) -> ExportPath {
        ExportPath::select(self.kind.has_video(), self.video.muted, self.audio.muted)
    }

    pub fn export_label(&self) -> &'static str {
        self.export_path().label()
    }
}
