//! Drawing surface the timeline renderer targets.
//!
//! The renderer only knows [`Canvas`]; egui's painter is one implementation,
//! [`RecordingCanvas`] is another that keeps the draw list for inspection.

use egui::{Align2, Color32, FontId, Painter, Pos2, Rect, Stroke, TextureHandle};

pub trait Canvas {
    fn fill_rect(&mut self, rect: Rect, color: Color32);
    fn line(&mut self, from: Pos2, to: Pos2, width: f32, color: Color32);
    fn text(&mut self, pos: Pos2, text: &str, size: f32, color: Color32);
    /// Draw cached thumbnail `index` into `rect`, cropped to `uv`.
    fn thumbnail(&mut self, rect: Rect, index: usize, uv: Rect);
}

/// egui painter plus the uploaded thumbnail textures.
pub struct PainterCanvas<'a> {
    painter: &'a Painter,
    textures: &'a [TextureHandle],
}

impl<'a> PainterCanvas<'a> {
    pub fn new(painter: &'a Painter, textures: &'a [TextureHandle]) -> Self {
        Self { painter, textures }
    }
}

impl Canvas for PainterCanvas<'_> {
    fn fill_rect(&mut self, rect: Rect, color: Color32) {
        self.painter.rect_filled(rect, 0.0, color);
    }

    fn line(&mut self, from: Pos2, to: Pos2, width: f32, color: Color32) {
        self.painter.line_segment([from, to], Stroke::new(width, color));
    }

    fn text(&mut self, pos: Pos2, text: &str, size: f32, color: Color32) {
        self.painter
            .text(pos, Align2::LEFT_TOP, text, FontId::monospace(size), color);
    }

    fn thumbnail(&mut self, rect: Rect, index: usize, uv: Rect) {
        if let Some(texture) = self.textures.get(index) {
            self.painter.image(texture.id(), rect, uv, Color32::WHITE);
        }
    }
}

/// One recorded draw call.
#[derive(Debug, Clone, PartialEq)]
pub enum DrawOp {
    Rect { rect: Rect, color: Color32 },
    Line { from: Pos2, to: Pos2, width: f32, color: Color32 },
    Text { pos: Pos2, text: String },
    Thumbnail { rect: Rect, index: usize },
}

/// Canvas that stores every call.
#[derive(Debug, Default)]
pub struct RecordingCanvas {
    pub ops: Vec<DrawOp>,
}

impl RecordingCanvas {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn texts(&self) -> Vec<&str> {
        self.ops
            .iter()
            .filter_map(|op| match op {
                DrawOp::Text { text, .. } => Some(text.as_str()),
                _ => None,
            })
            .collect()
    }

    pub fn lines_with(&self, color: Color32) -> Vec<(Pos2, Pos2)> {
        self.ops
            .iter()
            .filter_map(|op| match op {
                DrawOp::Line { from, to, color: c, .. } if *c == color => Some((*from, *to)),
                _ => None,
            })
            .collect()
    }

    pub fn rects_with(&self, color: Color32) -> Vec<Rect> {
        self.ops
            .iter()
            .filter_map(|op| match op {
                DrawOp::Rect { rect, color: c } if *c == color => Some(*rect),
                _ => None,
            })
            .collect()
    }

    pub fn thumbnails(&self) -> Vec<(Rect, usize)> {
        self.ops
            .iter()
            .filter_map(|op| match op {
                DrawOp::Thumbnail { rect, index } => Some((*rect, *index)),
                _ => None,
            })
            .collect()
    }
}

impl Canvas for RecordingCanvas {
    fn fill_rect(&mut self, rect: Rect, color: Color32) {
        self.ops.push(DrawOp::Rect { rect, color });
    }

    fn line(&mut self, from: Pos2, to: Pos2, width: f32, color: Color32) {
        self.ops.push(DrawOp::Line { from, to, width, color });
    }

    fn text(&mut self, pos: Pos2, text: &str, _size: f32, _color: Color32) {
        self.ops.push(DrawOp::Text {
            pos,
            text: text.to_string(),
        });
    }

    fn thumbnail(&mut self, rect: Rect, index: usize, _uv: Rect) {
        self.ops.push(DrawOp::Thumbnail { rect, index });
    }
}
