//! Trimdeck UI - egui timeline for the media trimmer
//!
//! Provides:
//! - Timeline renderer drawing onto a [`Canvas`](canvas::Canvas)
//! - Pointer interaction (trim handles, volume line, scrubbing)
//! - Keyboard command map
//! - Theme tokens and the egui timeline widget

pub mod canvas;
pub mod commands;
pub mod interaction;
pub mod renderer;
pub mod theme;
pub mod timeline;

pub use canvas::{Canvas, PainterCanvas, RecordingCanvas};
pub use commands::{EditorCommand, KeyMap};
pub use interaction::{DragController, DragKind, HitRadii, TimelineAction};
pub use renderer::{render, TimelineLayout, TimelineScene};
pub use theme::{Palette, Theme};
pub use timeline::TimelineWidget;
