//! Playback transport state machine.
//!
//! `Stopped` and `Playing`, one cursor, one frame loop. The cursor is read
//! back from the backend on every tick instead of being incremented, so
//! irregular frame callbacks never drift it.

use crate::session::MediaSession;
use crate::trim::TrimState;
use tracing::debug;
use trimdeck_core::Result;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TransportState {
    #[default]
    Stopped,
    Playing,
}

/// Identifies one run of the frame loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct LoopId(u64);

/// Explicit start/cancel lifecycle for the per-frame callback.
#[derive(Debug, Default)]
pub struct FrameLoop {
    next_id: u64,
    active: Option<LoopId>,
}

impl FrameLoop {
    /// Start a new loop, cancelling any running one.
    pub fn start(&mut self) -> LoopId {
        self.next_id += 1;
        let id = LoopId(self.next_id);
        self.active = Some(id);
        id
    }

    pub fn cancel(&mut self) {
        self.active = None;
    }

    pub fn active(&self) -> Option<LoopId> {
        self.active
    }

    pub fn is_active(&self, id: LoopId) -> bool {
        self.active == Some(id)
    }
}

/// Result of one frame callback.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum TickOutcome {
    /// The loop was cancelled or replaced; nothing happened.
    Stale,
    /// Still playing at the given time.
    Advanced(f64),
    /// Hit the out point or ran out of media. The cursor is back at `in`.
    AutoStopped,
}

#[derive(Debug)]
pub struct Transport {
    state: TransportState,
    current_time: f64,
    frame_loop: FrameLoop,
}

impl Transport {
    /// Stopped at `start` (the trim in point).
    pub fn new(start: f64) -> Self {
        Self {
            state: TransportState::Stopped,
            current_time: start.max(0.0),
            frame_loop: FrameLoop::default(),
        }
    }

    pub fn state(&self) -> TransportState {
        self.state
    }

    pub fn is_playing(&self) -> bool {
        self.state == TransportState::Playing
    }

    pub fn current_time(&self) -> f64 {
        self.current_time
    }

    pub fn loop_id(&self) -> Option<LoopId> {
        self.frame_loop.active()
    }

    /// Start playback. A second call while playing does nothing.
    pub fn play(&mut self, session: &mut MediaSession, trim: &TrimState) -> Result<()> {
        if self.is_playing() {
            return Ok(());
        }
        let range = trim.range();
        if !range.contains(self.current_time) {
            self.current_time = range.in_point;
        }
        self.start_backend(session, trim)?;
        self.state = TransportState::Playing;
        self.frame_loop.start();
        debug!("Transport: playing from {:.3}s", self.current_time);
        Ok(())
    }

    /// Halt and keep the cursor where playback was.
    pub fn pause(&mut self, session: &mut MediaSession) {
        if !self.is_playing() {
            return;
        }
        self.current_time = session.position().clamp(0.0, session.duration());
        self.halt(session);
        debug!("Transport: paused at {:.3}s", self.current_time);
    }

    /// Halt and return the cursor to the in point.
    pub fn stop(&mut self, session: &mut MediaSession, trim: &TrimState) {
        if self.is_playing() {
            self.halt(session);
            debug!("Transport: stopped");
        }
        self.current_time = trim.in_point();
    }

    pub fn toggle(&mut self, session: &mut MediaSession, trim: &TrimState) -> Result<()> {
        match self.state {
            TransportState::Stopped => self.play(session, trim),
            TransportState::Playing => {
                self.pause(session);
                Ok(())
            }
        }
    }

    /// Move the cursor to `t` clamped to `[0, duration]`. Playback continues
    /// from the new position.
    pub fn seek(&mut self, t: f64, session: &mut MediaSession, trim: &TrimState) -> Result<()> {
        if t.is_nan() {
            return Ok(());
        }
        self.current_time = t.clamp(0.0, session.duration());
        if self.is_playing() {
            session.stop_backend();
            if let Err(e) = self.start_backend(session, trim) {
                self.halt(session);
                return Err(e);
            }
        }
        Ok(())
    }

    /// Relative seek.
    pub fn step(&mut self, delta: f64, session: &mut MediaSession, trim: &TrimState) -> Result<()> {
        self.seek(self.current_time + delta, session, trim)
    }

    /// Frame callback for loop `id`.
    pub fn tick(&mut self, id: LoopId, session: &mut MediaSession, trim: &TrimState) -> TickOutcome {
        if !self.is_playing() || !self.frame_loop.is_active(id) {
            return TickOutcome::Stale;
        }
        session.sync();
        self.current_time = session.position().clamp(0.0, session.duration());
        if self.current_time >= trim.out_point() || session.has_ended() {
            self.halt(session);
            self.current_time = trim.in_point();
            debug!("Transport: auto-stopped, cursor back to {:.3}s", self.current_time);
            return TickOutcome::AutoStopped;
        }
        TickOutcome::Advanced(self.current_time)
    }

    /// Re-clamp after the trim range or session changed under a stopped
    /// transport.
    pub fn clamp_to(&mut self, duration: f64) {
        self.current_time = self.current_time.clamp(0.0, duration.max(0.0));
    }

    fn start_backend(&mut self, session: &mut MediaSession, trim: &TrimState) -> Result<()> {
        let end = trim.out_point().min(session.duration());
        let length = end - self.current_time;
        session.start_backend(self.current_time, length, trim.effective_gain())
    }

    fn halt(&mut self, session: &mut MediaSession) {
        session.stop_backend();
        self.frame_loop.cancel();
        self.state = TransportState::Stopped;
    }
}
