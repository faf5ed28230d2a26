//! The egui timeline widget: ruler, video filmstrip and audio lane.

use crate::canvas::PainterCanvas;
use crate::interaction::{cursor_for, hit_test, DragController, HitRadii, TimelineAction};
use crate::renderer::{render, TimelineLayout, TimelineScene};
use crate::theme::{Palette, Theme};
use egui::{ColorImage, Response, Sense, TextureHandle, TextureOptions, Vec2};
use tracing::{debug, trace};
use trimdeck_core::MediaKind;
use trimdeck_media::ThumbnailCache;
use trimdeck_timeline::{Editor, Generation};

/// Interactive timeline bound to an [`Editor`].
#[derive(Default)]
pub struct TimelineWidget {
    controller: DragController,
    textures: Vec<TextureHandle>,
    /// Load generation and frame count the textures were built from.
    texture_key: Option<(Generation, usize)>,
}

impl TimelineWidget {
    pub fn new(radii: HitRadii) -> Self {
        Self {
            controller: DragController::new(radii),
            ..Self::default()
        }
    }

    pub fn is_dragging(&self) -> bool {
        self.controller.is_dragging()
    }

    /// Uploaded thumbnail `index`, for the viewer.
    pub fn texture(&self, index: usize) -> Option<&TextureHandle> {
        self.textures.get(index)
    }

    pub fn show(&mut self, ui: &mut egui::Ui, editor: &mut Editor, palette: &Palette) -> Response {
        let Some(kind) = editor.kind() else {
            self.textures.clear();
            self.texture_key = None;
            return empty_state(ui, palette);
        };

        let video_h = editor.config().thumbnail_height as f32;
        let size = Vec2::new(ui.available_width(), TimelineLayout::height(kind, video_h));
        let (response, painter) = ui.allocate_painter(size, Sense::click_and_drag());
        let layout = TimelineLayout::new(response.rect, kind, video_h);
        editor.set_view_width(layout.content.width() as f64);

        if kind == MediaKind::Video {
            self.sync_textures(ui.ctx(), editor.generation(), editor.thumbnails());
        }

        self.handle_pointer(ui, &response, &layout, editor);
        handle_wheel(ui, &response, editor);

        if let Some(scene) = TimelineScene::from_editor(editor) {
            let mut canvas = PainterCanvas::new(&painter, &self.textures);
            render(&mut canvas, &layout, &scene, palette);
        }
        response
    }

    fn handle_pointer(&mut self, ui: &egui::Ui, response: &Response, layout: &TimelineLayout, editor: &mut Editor) {
        let (pressed, released, origin, pos) = ui.input(|i| {
            (
                i.pointer.primary_pressed(),
                i.pointer.primary_released(),
                i.pointer.press_origin(),
                i.pointer.interact_pos(),
            )
        });
        let Some(range) = editor.trim_range() else {
            return;
        };
        let volume = editor.config().volume_line_enabled.then(|| editor.volume());

        if pressed && response.is_pointer_button_down_on() {
            if let Some(origin) = origin {
                let actions = self
                    .controller
                    .pointer_down(origin, layout, editor.viewport(), range, volume);
                for action in actions {
                    apply(editor, action);
                }
            }
        } else if self.controller.is_dragging() {
            if let Some(pos) = pos {
                if let Some(action) = self.controller.pointer_move(pos, layout, editor.viewport()) {
                    apply(editor, action);
                }
            }
        }

        if released {
            if let Some(kind) = self.controller.pointer_up() {
                trace!("Released {:?} drag", kind);
            }
        }

        let hover = match self.controller.active() {
            Some(kind) => Some(kind),
            None => response
                .hover_pos()
                .and_then(|p| hit_test(p, layout, editor.viewport(), range, volume, self.controller.radii)),
        };
        if hover.is_some() {
            ui.ctx().set_cursor_icon(cursor_for(hover));
        }
    }

    /// Upload thumbnails once per load.
    fn sync_textures(&mut self, ctx: &egui::Context, generation: Generation, cache: &ThumbnailCache) {
        if !cache.is_ready() {
            if self.texture_key.is_some_and(|(g, _)| g != generation) {
                self.textures.clear();
                self.texture_key = None;
            }
            return;
        }
        let key = (generation, cache.len());
        if self.texture_key == Some(key) {
            return;
        }
        self.textures = cache
            .frames()
            .iter()
            .enumerate()
            .map(|(i, frame)| {
                let image = ColorImage::from_rgba_unmultiplied(
                    [frame.width as usize, frame.height as usize],
                    &frame.rgba,
                );
                ctx.load_texture(format!("thumb-{}-{}", generation.value(), i), image, TextureOptions::LINEAR)
            })
            .collect();
        self.texture_key = Some(key);
        debug!("Uploaded {} thumbnail textures for load {}", self.textures.len(), generation);
    }
}

fn apply(editor: &mut Editor, action: TimelineAction) {
    let result = match action {
        TimelineAction::SelectTrack(track) => {
            editor.select_track(track);
            Ok(())
        }
        TimelineAction::Pause => {
            editor.pause();
            Ok(())
        }
        TimelineAction::DragEdge(edge, t) => editor.drag_edge(edge, t).map(|_| ()),
        TimelineAction::SetVolume(v) => editor.set_volume(v).map(|_| ()),
        TimelineAction::Seek(t) => editor.seek(t),
    };
    if let Err(e) = result {
        debug!("Timeline action {:?} ignored: {}", action, e);
    }
}

/// Vertical wheel zooms around the playhead; shift or horizontal wheel scrolls.
fn handle_wheel(ui: &egui::Ui, response: &Response, editor: &mut Editor) {
    if !response.hovered() {
        return;
    }
    let (delta, shift) = ui.input(|i| (i.raw_scroll_delta, i.modifiers.shift));
    if delta == Vec2::ZERO {
        return;
    }
    if shift || delta.x.abs() > delta.y.abs() {
        let dx = if delta.x != 0.0 { delta.x } else { delta.y };
        editor.scroll_by(-dx as f64);
    } else {
        editor.zoom_wheel(delta.y > 0.0);
    }
}

fn empty_state(ui: &mut egui::Ui, palette: &Palette) -> Response {
    let size = Vec2::new(
        ui.available_width(),
        Theme::RULER_HEIGHT + Theme::AUDIO_LANE_HEIGHT,
    );
    let (response, painter) = ui.allocate_painter(size, Sense::hover());
    painter.rect_filled(response.rect, Theme::RADIUS, palette.track);
    painter.text(
        response.rect.center(),
        egui::Align2::CENTER_CENTER,
        "Open a video or audio file to start trimming",
        egui::FontId::proportional(Theme::FONT_SM),
        palette.text_dim,
    );
    response
}
