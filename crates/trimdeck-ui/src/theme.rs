//! Colour tokens and egui styling for the dark and light themes.

use egui::{Color32, Rounding, Stroke, Vec2};
use trimdeck_core::ThemeMode;

/// Layout constants shared by the widget and the app.
pub struct Theme;

impl Theme {
    // ── Typography ─────────────────────────────────────────────
    pub const FONT_XS: f32 = 11.0; // ruler labels, badges
    pub const FONT_SM: f32 = 13.0; // body, buttons
    pub const FONT_MD: f32 = 15.0; // timecode

    // ── Spacing ────────────────────────────────────────────────
    pub const SPACE_XS: f32 = 4.0;
    pub const SPACE_SM: f32 = 8.0;
    pub const SPACE_MD: f32 = 16.0;

    pub const RADIUS: f32 = 6.0;
    pub const STROKE_SUBTLE: f32 = 0.5;

    // ── Timeline geometry ──────────────────────────────────────
    pub const RULER_HEIGHT: f32 = 22.0;
    pub const AUDIO_LANE_HEIGHT: f32 = 64.0;
    pub const LABEL_WIDTH: f32 = 28.0;
    pub const LANE_GAP: f32 = 2.0;
    pub const HANDLE_WIDTH: f32 = 4.0;
    pub const PLAYHEAD_WIDTH: f32 = 2.0;

    /// Return a color with replaced alpha.
    pub const fn with_alpha(c: Color32, a: u8) -> Color32 {
        Color32::from_rgba_premultiplied(
            (c.r() as u16 * a as u16 / 255) as u8,
            (c.g() as u16 * a as u16 / 255) as u8,
            (c.b() as u16 * a as u16 / 255) as u8,
            a,
        )
    }

    /// Apply the palette for `mode` to an egui context.
    pub fn apply(ctx: &egui::Context, mode: ThemeMode) {
        let palette = Palette::for_mode(mode);
        let mut style = (*ctx.style()).clone();
        let visuals = &mut style.visuals;
        *visuals = match mode {
            ThemeMode::Dark => egui::Visuals::dark(),
            ThemeMode::Light => egui::Visuals::light(),
        };

        visuals.panel_fill = palette.panel;
        visuals.window_fill = palette.panel;
        visuals.extreme_bg_color = palette.background;

        visuals.widgets.inactive.bg_fill = palette.track;
        visuals.widgets.inactive.fg_stroke = Stroke::new(1.0, palette.text);
        visuals.widgets.inactive.rounding = Rounding::same(Self::RADIUS);

        visuals.widgets.hovered.bg_fill = palette.track_active;
        visuals.widgets.hovered.bg_stroke = Stroke::new(1.0, palette.accent);
        visuals.widgets.hovered.rounding = Rounding::same(Self::RADIUS);

        visuals.widgets.active.bg_fill = palette.track_active;
        visuals.widgets.active.fg_stroke = Stroke::new(1.0, palette.accent);
        visuals.widgets.active.rounding = Rounding::same(Self::RADIUS);

        visuals.selection.bg_fill = Self::with_alpha(palette.accent, 60);
        visuals.selection.stroke = Stroke::new(1.0, palette.accent);

        visuals.window_shadow = egui::epaint::Shadow {
            offset: Vec2::new(0.0, 4.0),
            blur: 16.0,
            spread: 0.0,
            color: Color32::from_rgba_premultiplied(0, 0, 0, 60),
        };
        style.interaction.tooltip_delay = 0.4;

        ctx.set_style(style);
    }
}

/// Colour tokens the timeline renderer draws with.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Palette {
    pub background: Color32,
    pub panel: Color32,
    pub ruler: Color32,
    pub tick_major: Color32,
    pub tick_minor: Color32,
    pub text: Color32,
    pub text_dim: Color32,
    pub track: Color32,
    pub track_active: Color32,
    pub waveform: Color32,
    pub waveform_muted: Color32,
    /// Outside the trim range.
    pub dim: Color32,
    /// Whole lane of a muted track.
    pub muted_overlay: Color32,
    pub handle: Color32,
    pub playhead: Color32,
    pub volume_line: Color32,
    pub accent: Color32,
}

impl Palette {
    pub fn for_mode(mode: ThemeMode) -> Self {
        match mode {
            ThemeMode::Dark => Self::dark(),
            ThemeMode::Light => Self::light(),
        }
    }

    pub fn dark() -> Self {
        Self {
            background: Color32::from_rgb(18, 18, 22),
            panel: Color32::from_rgb(28, 28, 34),
            ruler: Color32::from_rgb(35, 35, 42),
            tick_major: Color32::from_rgb(150, 150, 160),
            tick_minor: Color32::from_rgb(80, 80, 90),
            text: Color32::from_rgb(235, 235, 235),
            text_dim: Color32::from_rgb(140, 140, 150),
            track: Color32::from_rgb(40, 40, 50),
            track_active: Color32::from_rgb(52, 56, 74),
            waveform: Color32::from_rgb(48, 213, 160),
            waveform_muted: Color32::from_rgb(90, 100, 96),
            dim: Color32::from_rgba_premultiplied(0, 0, 0, 150),
            muted_overlay: Color32::from_rgba_premultiplied(0, 0, 0, 90),
            handle: Color32::from_rgb(255, 184, 48),
            playhead: Color32::from_rgb(255, 88, 85),
            volume_line: Color32::from_rgb(34, 211, 238),
            accent: Color32::from_rgb(86, 130, 255),
        }
    }

    pub fn light() -> Self {
        Self {
            background: Color32::from_rgb(246, 246, 248),
            panel: Color32::from_rgb(235, 235, 240),
            ruler: Color32::from_rgb(225, 225, 232),
            tick_major: Color32::from_rgb(90, 90, 100),
            tick_minor: Color32::from_rgb(170, 170, 180),
            text: Color32::from_rgb(30, 30, 34),
            text_dim: Color32::from_rgb(110, 110, 120),
            track: Color32::from_rgb(214, 214, 222),
            track_active: Color32::from_rgb(200, 210, 240),
            waveform: Color32::from_rgb(20, 150, 110),
            waveform_muted: Color32::from_rgb(160, 170, 166),
            dim: Color32::from_rgba_premultiplied(120, 120, 130, 150),
            muted_overlay: Color32::from_rgba_premultiplied(80, 80, 90, 90),
            handle: Color32::from_rgb(220, 140, 0),
            playhead: Color32::from_rgb(220, 50, 50),
            volume_line: Color32::from_rgb(0, 140, 180),
            accent: Color32::from_rgb(50, 100, 230),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_with_alpha_premultiplies() {
        let c = Theme::with_alpha(Color32::from_rgb(255, 0, 100), 51);
        assert_eq!(c.r(), 51);
        assert_eq!(c.g(), 0);
        assert_eq!(c.b(), 20);
        assert_eq!(c.a(), 51);
    }

    #[test]
    fn test_palettes_differ() {
        assert_ne!(Palette::for_mode(ThemeMode::Dark), Palette::for_mode(ThemeMode::Light));
    }
}
