//! Trimdeck Timeline - Editing session for the media trimmer
//!
//! Holds everything that changes while a file is being edited:
//! - Trim range, per-track mute and audio volume
//! - The loaded media session and its audio graph
//! - Playback transport over video-element and decoded-buffer backends
//! - Background decode, thumbnail and export jobs
//! - The `Editor` facade the UI talks to

pub mod backend;
pub mod editor;
pub mod jobs;
pub mod session;
pub mod transport;
pub mod trim;

pub use backend::{ClockedMediaElement, MediaElement, PlaybackBackend};
pub use editor::{Editor, MediaOpener, ProbeOpener};
pub use jobs::{JobMessage, JobQueue};
pub use session::{Generation, MediaSession};
pub use transport::{FrameLoop, LoopId, TickOutcome, Transport, TransportState};
pub use trim::{TrackState, TrimRange, TrimState};
