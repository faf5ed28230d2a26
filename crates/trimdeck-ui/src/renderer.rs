//! Timeline drawing: ruler, filmstrip, waveform, trim overlays, playhead.
//!
//! Rendering is a pure function of the scene. Nothing here mutates editor
//! state, so it can run on every frame and on every resize.

use crate::canvas::Canvas;
use crate::theme::{Palette, Theme};
use egui::{Pos2, Rect, Vec2};
use trimdeck_audio::Waveform;
use trimdeck_core::{MediaKind, TimelineViewport, TrackKind};
use trimdeck_media::thumbnail::nearest_index;
use trimdeck_media::ThumbnailCache;
use trimdeck_timeline::{Editor, TrackState, TrimRange};

/// Screen rectangles of the timeline parts.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TimelineLayout {
    pub rect: Rect,
    /// Everything right of the label column.
    pub content: Rect,
    pub ruler: Rect,
    pub video_lane: Option<Rect>,
    pub audio_lane: Rect,
}

impl TimelineLayout {
    /// Total height for a media kind.
    pub fn height(kind: MediaKind, video_lane_height: f32) -> f32 {
        let video = match kind {
            MediaKind::Video => video_lane_height + Theme::LANE_GAP,
            MediaKind::Audio => 0.0,
        };
        Theme::RULER_HEIGHT + video + Theme::AUDIO_LANE_HEIGHT
    }

    pub fn new(rect: Rect, kind: MediaKind, video_lane_height: f32) -> Self {
        let content = Rect::from_min_max(Pos2::new(rect.left() + Theme::LABEL_WIDTH, rect.top()), rect.max);
        let ruler = Rect::from_min_size(content.min, Vec2::new(content.width(), Theme::RULER_HEIGHT));
        let mut y = ruler.bottom();
        let video_lane = match kind {
            MediaKind::Video => {
                let lane = Rect::from_min_size(
                    Pos2::new(content.left(), y),
                    Vec2::new(content.width(), video_lane_height),
                );
                y = lane.bottom() + Theme::LANE_GAP;
                Some(lane)
            }
            MediaKind::Audio => None,
        };
        let audio_lane = Rect::from_min_size(
            Pos2::new(content.left(), y),
            Vec2::new(content.width(), Theme::AUDIO_LANE_HEIGHT),
        );
        Self {
            rect,
            content,
            ruler,
            video_lane,
            audio_lane,
        }
    }

    pub fn lane(&self, track: TrackKind) -> Option<Rect> {
        match track {
            TrackKind::Video => self.video_lane,
            TrackKind::Audio => Some(self.audio_lane),
        }
    }

    /// Label cell left of a lane.
    pub fn label(&self, track: TrackKind) -> Option<Rect> {
        self.lane(track).map(|lane| {
            Rect::from_min_max(Pos2::new(self.rect.left(), lane.top()), Pos2::new(self.content.left(), lane.bottom()))
        })
    }

    /// Top of the first lane to the bottom of the last.
    pub fn lanes(&self) -> Rect {
        let top = self.video_lane.map_or(self.audio_lane.top(), |v| v.top());
        Rect::from_min_max(Pos2::new(self.content.left(), top), self.audio_lane.max)
    }

    /// Track whose lane contains `pos`.
    pub fn track_at(&self, pos: Pos2) -> Option<TrackKind> {
        TrackKind::ALL
            .into_iter()
            .find(|&t| self.lane(t).is_some_and(|lane| lane.contains(pos)))
    }

    /// Track whose label cell contains `pos`.
    pub fn label_at(&self, pos: Pos2) -> Option<TrackKind> {
        TrackKind::ALL
            .into_iter()
            .find(|&t| self.label(t).is_some_and(|cell| cell.contains(pos)))
    }

    /// Screen x for a time.
    pub fn time_to_x(&self, viewport: &TimelineViewport, t: f64) -> f32 {
        self.content.left() + viewport.time_to_view_x(t) as f32
    }

    /// Time under a screen x, clamped to the media.
    pub fn x_to_time(&self, viewport: &TimelineViewport, x: f32) -> f64 {
        viewport.view_x_to_time((x - self.content.left()) as f64)
    }
}

/// Volume line height inside the audio lane. Gain 2 is the top edge.
pub fn volume_to_y(lane: Rect, volume: f32) -> f32 {
    lane.top() + lane.height() * (1.0 - volume.clamp(0.0, 2.0) / 2.0)
}

pub fn y_to_volume(lane: Rect, y: f32) -> f32 {
    if lane.height() <= 0.0 {
        return 1.0;
    }
    (2.0 * (1.0 - (y - lane.top()) / lane.height())).clamp(0.0, 2.0)
}

/// Ruler label: `M:SS` on whole seconds, `M:SS.s` otherwise.
pub fn ruler_label(t: f64) -> String {
    let t = if t.is_finite() { t.max(0.0) } else { 0.0 };
    let minutes = (t / 60.0).floor() as u64;
    let seconds = t - minutes as f64 * 60.0;
    if (seconds - seconds.round()).abs() < 1e-6 {
        format!("{}:{:02}", minutes, seconds.round() as u64)
    } else {
        format!("{}:{:04.1}", minutes, seconds)
    }
}

/// Everything the renderer reads.
#[derive(Debug, Clone, Copy)]
pub struct TimelineScene<'a> {
    pub viewport: &'a TimelineViewport,
    pub kind: MediaKind,
    pub range: TrimRange,
    pub video: TrackState,
    pub audio: TrackState,
    pub active: TrackKind,
    pub current_time: f64,
    pub waveform: Option<&'a Waveform>,
    pub thumbnails: &'a ThumbnailCache,
    pub show_volume_line: bool,
}

impl<'a> TimelineScene<'a> {
    /// Snapshot of the editor. `None` without loaded media.
    pub fn from_editor(editor: &'a Editor) -> Option<Self> {
        let trim = editor.trim()?;
        Some(Self {
            viewport: editor.viewport(),
            kind: trim.kind(),
            range: trim.range(),
            video: *trim.track(TrackKind::Video),
            audio: *trim.track(TrackKind::Audio),
            active: trim.active_track(),
            current_time: editor.current_time(),
            waveform: editor.waveform(),
            thumbnails: editor.thumbnails(),
            show_volume_line: editor.config().volume_line_enabled,
        })
    }

    pub fn track(&self, track: TrackKind) -> &TrackState {
        match track {
            TrackKind::Video => &self.video,
            TrackKind::Audio => &self.audio,
        }
    }
}

/// Draw the whole timeline.
pub fn render(canvas: &mut dyn Canvas, layout: &TimelineLayout, scene: &TimelineScene<'_>, palette: &Palette) {
    canvas.fill_rect(layout.rect, palette.background);
    draw_ruler(canvas, layout, scene, palette);
    draw_labels(canvas, layout, scene, palette);

    if let Some(lane) = layout.video_lane {
        canvas.fill_rect(lane, palette.track);
        if scene.thumbnails.is_ready() {
            draw_filmstrip(canvas, lane, scene);
        }
    }

    canvas.fill_rect(layout.audio_lane, palette.track);
    if let Some(waveform) = scene.waveform {
        draw_waveform(canvas, layout.audio_lane, scene, waveform, palette);
    }
    if scene.show_volume_line {
        let lane = layout.audio_lane;
        let y = volume_to_y(lane, scene.audio.volume);
        canvas.line(Pos2::new(lane.left(), y), Pos2::new(lane.right(), y), 1.5, palette.volume_line);
    }

    for track in TrackKind::ALL {
        let Some(lane) = layout.lane(track) else {
            continue;
        };
        if scene.track(track).muted {
            canvas.fill_rect(lane, palette.muted_overlay);
        }
        draw_trim_dim(canvas, layout, lane, scene, palette);
    }

    draw_handles(canvas, layout, scene, palette);
    draw_playhead(canvas, layout, scene, palette);
}

fn draw_ruler(canvas: &mut dyn Canvas, layout: &TimelineLayout, scene: &TimelineScene<'_>, palette: &Palette) {
    let ruler = layout.ruler;
    canvas.fill_rect(ruler, palette.ruler);
    let scroll = scene.viewport.scroll_offset();
    for tick in scene.viewport.ticks() {
        let x = ruler.left() + (tick.x - scroll) as f32;
        let (height, color) = if tick.major {
            (10.0, palette.tick_major)
        } else {
            (4.0, palette.tick_minor)
        };
        canvas.line(
            Pos2::new(x, ruler.bottom() - height),
            Pos2::new(x, ruler.bottom()),
            1.0,
            color,
        );
        if tick.major {
            canvas.text(
                Pos2::new(x + 2.0, ruler.top() + 2.0),
                &ruler_label(tick.time),
                Theme::FONT_XS,
                palette.text_dim,
            );
        }
    }
}

fn draw_labels(canvas: &mut dyn Canvas, layout: &TimelineLayout, scene: &TimelineScene<'_>, palette: &Palette) {
    for track in TrackKind::ALL {
        let Some(cell) = layout.label(track) else {
            continue;
        };
        let fill = if scene.active == track {
            palette.track_active
        } else {
            palette.panel
        };
        canvas.fill_rect(cell, fill);
        let color = if scene.track(track).muted {
            palette.text_dim
        } else {
            palette.text
        };
        canvas.text(
            Pos2::new(cell.left() + 9.0, cell.center().y - Theme::FONT_XS / 2.0),
            track.badge(),
            Theme::FONT_XS,
            color,
        );
    }
}

/// Tile thumbnails at their own aspect ratio across the content strip.
fn draw_filmstrip(canvas: &mut dyn Canvas, lane: Rect, scene: &TimelineScene<'_>) {
    let cache = scene.thumbnails;
    let aspect = cache.aspect().unwrap_or(16.0 / 9.0) as f32;
    let tile_w = (lane.height() * aspect).max(1.0);
    let content_width = scene.viewport.content_width() as f32;
    if content_width <= 0.0 {
        return;
    }
    let scroll = scene.viewport.scroll_offset() as f32;

    let mut k = (scroll / tile_w).floor().max(0.0) as usize;
    loop {
        let content_x = k as f32 * tile_w;
        if content_x >= content_width {
            break;
        }
        let left = lane.left() + content_x - scroll;
        if left > lane.right() {
            break;
        }
        let tile = Rect::from_min_size(Pos2::new(left, lane.top()), Vec2::new(tile_w, lane.height()));
        let visible = tile.intersect(lane).intersect(Rect::from_min_max(
            lane.min,
            Pos2::new(lane.left() + content_width - scroll, lane.bottom()),
        ));
        if visible.width() > 0.0 {
            let ratio = (content_x + tile_w / 2.0) as f64 / content_width as f64;
            if let Some(index) = nearest_index(ratio, cache.len()) {
                let uv = Rect::from_min_max(
                    Pos2::new((visible.left() - tile.left()) / tile_w, 0.0),
                    Pos2::new((visible.right() - tile.left()) / tile_w, 1.0),
                );
                canvas.thumbnail(visible, index, uv);
            }
        }
        k += 1;
    }
}

/// One min/max bar per pixel column of the visible window.
fn draw_waveform(
    canvas: &mut dyn Canvas,
    lane: Rect,
    scene: &TimelineScene<'_>,
    waveform: &Waveform,
    palette: &Palette,
) {
    let columns = lane.width().floor().max(0.0) as usize;
    if columns == 0 {
        return;
    }
    let (t0, t1) = scene.viewport.visible_time_range();
    let color = if scene.audio.muted {
        palette.waveform_muted
    } else {
        palette.waveform
    };
    for (i, peak) in waveform.peaks_in_range(t0, t1, columns).into_iter().enumerate() {
        let (top, bottom) = peak.to_lane(lane.height());
        let x = lane.left() + i as f32 + 0.5;
        canvas.line(Pos2::new(x, lane.top() + top), Pos2::new(x, lane.top() + bottom), 1.0, color);
    }
}

fn draw_trim_dim(
    canvas: &mut dyn Canvas,
    layout: &TimelineLayout,
    lane: Rect,
    scene: &TimelineScene<'_>,
    palette: &Palette,
) {
    let x_in = layout.time_to_x(scene.viewport, scene.range.in_point).clamp(lane.left(), lane.right());
    let x_out = layout.time_to_x(scene.viewport, scene.range.out_point).clamp(lane.left(), lane.right());
    if x_in > lane.left() {
        canvas.fill_rect(Rect::from_min_max(lane.min, Pos2::new(x_in, lane.bottom())), palette.dim);
    }
    if x_out < lane.right() {
        canvas.fill_rect(Rect::from_min_max(Pos2::new(x_out, lane.top()), lane.max), palette.dim);
    }
}

fn draw_handles(canvas: &mut dyn Canvas, layout: &TimelineLayout, scene: &TimelineScene<'_>, palette: &Palette) {
    let lanes = layout.lanes();
    for t in [scene.range.in_point, scene.range.out_point] {
        let x = layout.time_to_x(scene.viewport, t);
        if x < lanes.left() - Theme::HANDLE_WIDTH || x > lanes.right() + Theme::HANDLE_WIDTH {
            continue;
        }
        let handle = Rect::from_center_size(
            Pos2::new(x, lanes.center().y),
            Vec2::new(Theme::HANDLE_WIDTH, lanes.height()),
        );
        canvas.fill_rect(handle, palette.handle);
    }
}

fn draw_playhead(canvas: &mut dyn Canvas, layout: &TimelineLayout, scene: &TimelineScene<'_>, palette: &Palette) {
    let x = layout.time_to_x(scene.viewport, scene.current_time);
    if x < layout.content.left() || x > layout.content.right() {
        return;
    }
    canvas.line(
        Pos2::new(x, layout.ruler.top()),
        Pos2::new(x, layout.rect.bottom()),
        Theme::PLAYHEAD_WIDTH,
        palette.playhead,
    );
}
