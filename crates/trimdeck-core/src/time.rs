//! Time model for the zoomable timeline.
//!
//! Pure conversions between seconds, pixel positions on the timeline
//! content strip, and formatted timecodes. The only state here is the
//! [`TimelineViewport`], which is presentation state and never feeds back
//! into trim points or the playback cursor.

use serde::{Deserialize, Serialize};

/// Format seconds as `MM:SS.mmm`.
///
/// Negative and non-finite input is clamped to zero.
pub fn format_timecode(seconds: f64) -> String {
    let seconds = if seconds.is_finite() && seconds > 0.0 {
        seconds
    } else {
        0.0
    };
    // Whole milliseconds, nudged so 2.3 is not read as 2.2999...
    let total_ms = (seconds * 1000.0 + 1e-6).floor() as u64;
    let minutes = total_ms / 60_000;
    let secs = (total_ms / 1000) % 60;
    let millis = total_ms % 1000;
    format!("{:02}:{:02}.{:03}", minutes, secs, millis)
}

/// Map a time to an x offset on a content strip `content_width` pixels wide.
#[inline]
pub fn time_to_pixel(t: f64, duration: f64, content_width: f64) -> f64 {
    if duration <= 0.0 {
        return 0.0;
    }
    (t / duration) * content_width
}

/// Inverse of [`time_to_pixel`], clamped to `[0, duration]`.
#[inline]
pub fn pixel_to_time(px: f64, duration: f64, content_width: f64) -> f64 {
    if content_width <= 0.0 || duration <= 0.0 {
        return 0.0;
    }
    ((px / content_width) * duration).clamp(0.0, duration)
}

/// Format a zoom factor for display: `×4`, `×1.5`, `×2.25`.
pub fn format_zoom_label(zoom: f64) -> String {
    if zoom.fract() == 0.0 {
        return format!("×{}", zoom as u64);
    }
    let fixed = format!("{:.2}", zoom);
    let trimmed = fixed.trim_end_matches('0').trim_end_matches('.');
    format!("×{trimmed}")
}

// ── Ruler ticks ─────────────────────────────────────────────────

/// Ruler tick granularity, from finest to coarsest.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TickSpacing {
    Tenth,
    Half,
    One,
    Five,
    Ten,
}

impl TickSpacing {
    /// Spacing in seconds.
    pub fn seconds(self) -> f64 {
        match self {
            Self::Tenth => 0.1,
            Self::Half => 0.5,
            Self::One => 1.0,
            Self::Five => 5.0,
            Self::Ten => 10.0,
        }
    }

    /// Pick the spacing for a given pixel density.
    ///
    /// Dense timelines get fine ticks, sparse ones get coarse ticks, so the
    /// gap between labelled ticks stays legible at every zoom.
    pub fn select(px_per_sec: f64) -> Self {
        if px_per_sec > 100.0 {
            Self::Tenth
        } else if px_per_sec > 30.0 {
            Self::Half
        } else if px_per_sec > 10.0 {
            Self::One
        } else if px_per_sec > 3.0 {
            Self::Five
        } else {
            Self::Ten
        }
    }

    /// Whether tick `index` is a labelled major tick.
    pub fn is_major(self, index: u64) -> bool {
        match self {
            Self::Five | Self::Ten => index % 2 == 0,
            Self::One => index % 5 == 0,
            Self::Half => index % 2 == 0,
            Self::Tenth => index % 10 == 0,
        }
    }
}

/// A single ruler tick.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Tick {
    pub index: u64,
    pub time: f64,
    /// X offset on the content strip.
    pub x: f64,
    pub major: bool,
}

/// Ticks for `[0, duration]` whose content x falls inside `[x_min, x_max]`.
pub fn ruler_ticks(duration: f64, content_width: f64, x_min: f64, x_max: f64) -> Vec<Tick> {
    if duration <= 0.0 || content_width <= 0.0 {
        return Vec::new();
    }
    let spacing = TickSpacing::select(content_width / duration);
    let step = spacing.seconds();
    let count = (duration / step + 1e-9).floor() as u64;
    let first = ((pixel_to_time(x_min, duration, content_width) / step).floor() as u64).min(count);

    let mut ticks = Vec::new();
    for index in first..=count {
        let time = index as f64 * step;
        let x = time_to_pixel(time, duration, content_width);
        if x > x_max {
            break;
        }
        if x < x_min {
            continue;
        }
        ticks.push(Tick {
            index,
            time,
            x,
            major: spacing.is_major(index),
        });
    }
    ticks
}

// ── Viewport ────────────────────────────────────────────────────

/// The zoomable, scrollable window onto `[0, duration]`.
///
/// `zoom` multiplies the view width to get the content width; the scroll
/// offset is in content pixels.
#[derive(Debug, Clone, PartialEq)]
pub struct TimelineViewport {
    duration: f64,
    view_width_px: f64,
    zoom: f64,
    scroll_offset: f64,
    zoom_min: f64,
    zoom_max: f64,
}

impl TimelineViewport {
    /// Create a viewport at zoom 1 (fit).
    pub fn new(duration: f64, view_width_px: f64) -> Self {
        Self {
            duration: duration.max(0.0),
            view_width_px: view_width_px.max(1.0),
            zoom: 1.0,
            scroll_offset: 0.0,
            zoom_min: 1.0,
            zoom_max: 32.0,
        }
    }

    /// Override the zoom limits.
    pub fn with_zoom_limits(mut self, zoom_min: f64, zoom_max: f64) -> Self {
        self.zoom_min = zoom_min.max(1.0);
        self.zoom_max = zoom_max.max(self.zoom_min);
        self.zoom = self.zoom.clamp(self.zoom_min, self.zoom_max);
        self
    }

    pub fn duration(&self) -> f64 {
        self.duration
    }

    pub fn zoom(&self) -> f64 {
        self.zoom
    }

    pub fn scroll_offset(&self) -> f64 {
        self.scroll_offset
    }

    pub fn view_width(&self) -> f64 {
        self.view_width_px
    }

    /// Width of the full `[0, duration]` strip in pixels.
    pub fn content_width(&self) -> f64 {
        self.zoom * self.view_width_px
    }

    pub fn px_per_sec(&self) -> f64 {
        if self.duration <= 0.0 {
            return 0.0;
        }
        self.content_width() / self.duration
    }

    /// Replace the media duration (new load) and reset to fit.
    pub fn reset(&mut self, duration: f64) {
        self.duration = duration.max(0.0);
        self.zoom = self.zoom_min;
        self.scroll_offset = 0.0;
    }

    /// Resize the visible area. The scroll offset is re-clamped.
    pub fn set_view_width(&mut self, view_width_px: f64) {
        self.view_width_px = view_width_px.max(1.0);
        self.scroll_offset = self.clamp_scroll(self.scroll_offset);
    }

    /// Set the zoom, keeping `focus_time` centred in the view.
    pub fn set_zoom(&mut self, zoom: f64, focus_time: f64) {
        self.zoom = if zoom.is_finite() {
            zoom.clamp(self.zoom_min, self.zoom_max)
        } else {
            self.zoom_min
        };
        self.center_on(focus_time);
    }

    /// Scroll so that `t` sits in the middle of the view.
    pub fn center_on(&mut self, t: f64) {
        let target = self.time_to_pixel(t) - self.view_width_px / 2.0;
        self.scroll_offset = self.clamp_scroll(target);
    }

    /// Scroll by a pixel delta.
    pub fn scroll_by(&mut self, dx: f64) {
        self.scroll_offset = self.clamp_scroll(self.scroll_offset + dx);
    }

    /// Keep a moving playhead visible. Returns true if the view scrolled.
    pub fn follow(&mut self, t: f64, margin_px: f64) -> bool {
        if self.zoom <= 1.0 {
            return false;
        }
        let x = self.time_to_pixel(t);
        let left = self.scroll_offset;
        let right = left + self.view_width_px;
        if x < left + margin_px || x > right - margin_px {
            let before = self.scroll_offset;
            self.center_on(t);
            return (self.scroll_offset - before).abs() > f64::EPSILON;
        }
        false
    }

    /// Content x for a time.
    pub fn time_to_pixel(&self, t: f64) -> f64 {
        time_to_pixel(t, self.duration, self.content_width())
    }

    /// Time for a content x, clamped to `[0, duration]`.
    pub fn pixel_to_time(&self, px: f64) -> f64 {
        pixel_to_time(px, self.duration, self.content_width())
    }

    /// X relative to the left edge of the visible area.
    pub fn time_to_view_x(&self, t: f64) -> f64 {
        self.time_to_pixel(t) - self.scroll_offset
    }

    /// Time under a view-relative x.
    pub fn view_x_to_time(&self, x: f64) -> f64 {
        self.pixel_to_time(x + self.scroll_offset)
    }

    /// Seconds covered by one pixel of content.
    pub fn seconds_per_pixel(&self) -> f64 {
        let width = self.content_width();
        if width <= 0.0 {
            return 0.0;
        }
        self.duration / width
    }

    /// Time range currently on screen.
    pub fn visible_time_range(&self) -> (f64, f64) {
        (
            self.view_x_to_time(0.0),
            self.view_x_to_time(self.view_width_px),
        )
    }

    /// Ticks that fall inside the visible area.
    pub fn ticks(&self) -> Vec<Tick> {
        ruler_ticks(
            self.duration,
            self.content_width(),
            self.scroll_offset,
            self.scroll_offset + self.view_width_px,
        )
    }

    fn clamp_scroll(&self, offset: f64) -> f64 {
        let max = (self.content_width() - self.view_width_px).max(0.0);
        offset.clamp(0.0, max)
    }
}
