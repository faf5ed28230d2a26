//! Trimdeck Core - Foundation types for the media trimmer
//!
//! This crate provides the types shared by every other Trimdeck crate:
//! - Time model (timecodes, pixel/time mapping, ruler ticks, viewport)
//! - Error taxonomy
//! - Editor configuration
//! - Clocks for the playback transport

pub mod clock;
pub mod config;
pub mod error;
pub mod media;
pub mod time;

pub use clock::{Clock, ManualClock, SharedClock, SystemClock};
pub use config::{EditorConfig, ThemeMode};
pub use error::{Result, TrimdeckError};
pub use media::{MediaKind, TrackKind, TrimEdge};
pub use time::{format_timecode, format_zoom_label, Tick, TickSpacing, TimelineViewport};
