//! The editing session facade used by the host UI.
//!
//! `Editor` owns the loaded [`MediaSession`], its trim state, the transport
//! and the presentation caches. All mutation happens on the caller's thread;
//! decode, thumbnail and export work runs as background jobs whose results
//! are applied by [`Editor::poll`] only if they belong to the current load.

use crate::backend::{ClockedMediaElement, MediaElement};
use crate::jobs::{JobMessage, JobQueue};
use crate::session::{Generation, MediaSession};
use crate::transport::{TickOutcome, Transport};
use crate::trim::{TrackState, TrimRange, TrimState};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};
use trimdeck_audio::{AudioBuffer, OutputSlot, Waveform};
use trimdeck_core::{
    EditorConfig, MediaKind, Result, SharedClock, TimelineViewport, TrackKind, TrimEdge,
    TrimdeckError,
};
use trimdeck_media::export::progress_status;
use trimdeck_media::thumbnail::capture_filmstrip;
use trimdeck_media::{
    run_export, ClipRange, Decoder, ExportCancel, ExportRequest, ExportSource, ExternalEncoder,
    FfmpegDecoder, FfmpegEncoder, FfmpegThumbnailer, MediaProbe, ThumbnailCache,
    ThumbnailCapturer,
};

/// Opens the playable element for a video file.
pub trait MediaOpener: Send + Sync {
    fn open_video(&self, path: &Path, clock: SharedClock) -> Result<Box<dyn MediaElement>>;
}

/// Probes the file with ffprobe and plays it against the editor clock.
#[derive(Debug, Clone, Default)]
pub struct ProbeOpener;

impl MediaOpener for ProbeOpener {
    fn open_video(&self, path: &Path, clock: SharedClock) -> Result<Box<dyn MediaElement>> {
        let probe = MediaProbe::probe(path)?;
        Ok(Box::new(ClockedMediaElement::new(clock, probe.duration)))
    }
}

/// Session and the edit state that lives and dies with it.
struct Loaded {
    session: MediaSession,
    trim: TrimState,
}

pub struct Editor {
    config: EditorConfig,
    clock: SharedClock,
    output: OutputSlot,
    decoder: Arc<dyn Decoder>,
    thumbnailer: Arc<dyn ThumbnailCapturer>,
    opener: Arc<dyn MediaOpener>,
    encoder: Option<Arc<dyn ExternalEncoder>>,

    generation: Generation,
    /// Path of an audio file whose decode is still running.
    pending_audio: Option<PathBuf>,
    loaded: Option<Loaded>,
    transport: Transport,
    viewport: TimelineViewport,
    waveform: Option<Waveform>,
    thumbnails: ThumbnailCache,
    jobs: JobQueue,
    status: String,
    export: Option<ExportCancel>,
}

impl Editor {
    /// Editor wired to FFmpeg for decoding, thumbnails and export.
    pub fn new(config: EditorConfig, clock: SharedClock, output: OutputSlot) -> Self {
        let encoder: Option<Arc<dyn ExternalEncoder>> = match FfmpegEncoder::new() {
            Ok(encoder) => Some(Arc::new(encoder)),
            Err(e) => {
                warn!("External encoder unavailable: {}", e);
                None
            }
        };
        let config = config.validate();
        let viewport =
            TimelineViewport::new(0.0, 800.0).with_zoom_limits(config.zoom_min, config.zoom_max);
        Self {
            config,
            clock,
            output,
            decoder: Arc::new(FfmpegDecoder::new()),
            thumbnailer: Arc::new(FfmpegThumbnailer),
            opener: Arc::new(ProbeOpener),
            encoder,
            generation: Generation::default(),
            pending_audio: None,
            loaded: None,
            transport: Transport::new(0.0),
            viewport,
            waveform: None,
            thumbnails: ThumbnailCache::default(),
            jobs: JobQueue::new(),
            status: String::new(),
            export: None,
        }
    }

    pub fn with_decoder(mut self, decoder: Arc<dyn Decoder>) -> Self {
        self.decoder = decoder;
        self
    }

    pub fn with_thumbnailer(mut self, thumbnailer: Arc<dyn ThumbnailCapturer>) -> Self {
        self.thumbnailer = thumbnailer;
        self
    }

    pub fn with_opener(mut self, opener: Arc<dyn MediaOpener>) -> Self {
        self.opener = opener;
        self
    }

    /// Replace the external encoder. `None` forces the local WAV path.
    pub fn with_encoder(mut self, encoder: Option<Arc<dyn ExternalEncoder>>) -> Self {
        self.encoder = encoder;
        self
    }

    // ── Loading ─────────────────────────────────────────────────

    /// Load a file, replacing the current session.
    ///
    /// Audio files become a session once decoding succeeds (see
    /// [`Editor::poll`]). Video files are playable immediately; their audio
    /// and thumbnails arrive in the background.
    pub fn load(&mut self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref().to_path_buf();
        self.reset();
        let kind = MediaKind::from_path(&path);
        info!("Loading {} as {:?} (generation {})", path.display(), kind, self.generation);

        match kind {
            MediaKind::Audio => {
                self.status = format!("Loading {}", display_name(&path));
                self.pending_audio = Some(path.clone());
                self.spawn_decode(path)
            }
            MediaKind::Video => {
                let element = match self.opener.open_video(&path, self.clock.clone()) {
                    Ok(element) => element,
                    Err(e) => {
                        warn!("Failed to open {}: {}", path.display(), e);
                        self.status = e.status_text();
                        return Err(e);
                    }
                };
                let session = MediaSession::new_video(
                    self.generation,
                    &path,
                    element,
                    self.clock.clone(),
                    self.output.clone(),
                );
                let duration = session.duration();
                self.install(session);
                self.spawn_decode(path.clone())?;
                self.spawn_thumbnails(path, duration)
            }
        }
    }

    fn install(&mut self, session: MediaSession) {
        let duration = session.duration();
        let trim = TrimState::new(session.kind(), duration, self.config.trim_epsilon);
        self.transport = Transport::new(trim.in_point());
        self.viewport.reset(duration);
        info!("Session {} ready: {:?}, {:.3}s", session.generation(), session.kind(), duration);
        self.loaded = Some(Loaded { session, trim });
    }

    fn spawn_decode(&mut self, path: PathBuf) -> Result<()> {
        let decoder = Arc::clone(&self.decoder);
        let generation = self.generation;
        let failed_path = path.clone();
        self.jobs.spawn(
            "decode",
            move |_| {
                let result = decoder.decode(&path);
                JobMessage::Decoded {
                    generation,
                    path,
                    result,
                }
            },
            move |reason| JobMessage::Decoded {
                generation,
                path: failed_path,
                result: Err(TrimdeckError::DecodeFailure(reason)),
            },
        )
    }

    fn spawn_thumbnails(&mut self, path: PathBuf, duration: f64) -> Result<()> {
        let capturer = Arc::clone(&self.thumbnailer);
        let config = self.config.clone();
        let generation = self.generation;
        self.jobs.spawn(
            "thumbnails",
            move |_| JobMessage::Thumbnails {
                generation,
                cache: capture_filmstrip(capturer.as_ref(), &path, duration, &config),
            },
            move |_| JobMessage::Thumbnails {
                generation,
                cache: ThumbnailCache::default(),
            },
        )
    }

    /// Apply finished background work. Returns true if anything changed.
    pub fn poll(&mut self) -> bool {
        let messages = self.jobs.drain();
        let mut changed = false;
        for message in messages {
            changed |= self.apply(message);
        }
        changed
    }

    /// Block until every background job has reported or `timeout` passes.
    pub fn wait_for_jobs(&mut self, timeout: Duration) -> bool {
        let deadline = Instant::now() + timeout;
        while self.jobs.pending() > 0 {
            let remaining = deadline.saturating_duration_since(Instant::now());
            if remaining.is_zero() {
                return false;
            }
            if let Some(message) = self.jobs.wait(remaining) {
                self.apply(message);
            }
        }
        true
    }

    fn apply(&mut self, message: JobMessage) -> bool {
        if message.generation() != self.generation {
            debug!(
                "Discarding stale job result from generation {} (current {})",
                message.generation(),
                self.generation
            );
            return false;
        }

        match message {
            JobMessage::Decoded { path, result, .. } => self.apply_decoded(path, result),
            JobMessage::Thumbnails { cache, .. } => {
                debug!("{} thumbnails ready", cache.len());
                self.thumbnails = cache;
                true
            }
            JobMessage::ExportProgress { fraction, .. } => {
                self.status = progress_status(fraction);
                true
            }
            JobMessage::ExportDone { result, .. } => {
                self.export = None;
                self.status = match result {
                    Ok(outcome) => {
                        info!("Exported {}", outcome.output.display());
                        outcome.status()
                    }
                    Err(e) => {
                        warn!("Export failed: {}", e);
                        e.status_text()
                    }
                };
                true
            }
        }
    }

    fn apply_decoded(&mut self, path: PathBuf, result: Result<AudioBuffer>) -> bool {
        if self.pending_audio.take().is_some() {
            match result {
                Ok(buffer) => {
                    let buffer = Arc::new(buffer);
                    self.waveform = Some(Waveform::from_buffer(&buffer));
                    let session = MediaSession::new_audio(
                        self.generation,
                        path,
                        buffer,
                        self.clock.clone(),
                        self.output.clone(),
                    );
                    self.install(session);
                    self.status.clear();
                }
                Err(e) => {
                    warn!("Decode failed for {}: {}", path.display(), e);
                    self.status = e.status_text();
                }
            }
            return true;
        }

        let Some(loaded) = self.loaded.as_mut() else {
            return false;
        };
        match result {
            Ok(buffer) => {
                let buffer = Arc::new(buffer);
                self.waveform = Some(Waveform::from_buffer(&buffer));
                loaded.session.set_decoded_audio(buffer);
                true
            }
            Err(e) => {
                debug!("No decodable audio in {}: {}", path.display(), e);
                false
            }
        }
    }

    /// Stop playback and drop the session and everything derived from it.
    pub fn reset(&mut self) {
        if let Some(loaded) = self.loaded.as_mut() {
            self.transport.stop(&mut loaded.session, &loaded.trim);
        }
        if let Some(cancel) = self.export.take() {
            cancel.cancel();
        }
        self.loaded = None;
        self.pending_audio = None;
        self.generation = self.generation.next();
        self.transport = Transport::new(0.0);
        self.viewport.reset(0.0);
        self.waveform = None;
        self.thumbnails = ThumbnailCache::default();
        self.status.clear();
        info!("Editor reset (generation {})", self.generation);
    }

    // ── Transport ───────────────────────────────────────────────

    fn loaded_mut(&mut self) -> Result<&mut Loaded> {
        self.loaded.as_mut().ok_or(TrimdeckError::NoMedia)
    }

    pub fn play(&mut self) -> Result<()> {
        let loaded = self.loaded.as_mut().ok_or(TrimdeckError::NoMedia)?;
        self.transport.play(&mut loaded.session, &loaded.trim)
    }

    pub fn pause(&mut self) {
        if let Some(loaded) = self.loaded.as_mut() {
            self.transport.pause(&mut loaded.session);
        }
    }

    pub fn stop(&mut self) {
        if let Some(loaded) = self.loaded.as_mut() {
            self.transport.stop(&mut loaded.session, &loaded.trim);
        }
    }

    pub fn toggle_play(&mut self) -> Result<()> {
        let loaded = self.loaded.as_mut().ok_or(TrimdeckError::NoMedia)?;
        self.transport.toggle(&mut loaded.session, &loaded.trim)
    }

    pub fn seek(&mut self, t: f64) -> Result<()> {
        let loaded = self.loaded.as_mut().ok_or(TrimdeckError::NoMedia)?;
        self.transport.seek(t, &mut loaded.session, &loaded.trim)
    }

    pub fn step(&mut self, delta: f64) -> Result<()> {
        let loaded = self.loaded.as_mut().ok_or(TrimdeckError::NoMedia)?;
        self.transport.step(delta, &mut loaded.session, &loaded.trim)
    }

    /// Seek to the time under a view-relative x (scrubbing).
    pub fn scrub_to(&mut self, view_x: f64) -> Result<()> {
        let t = self.viewport.view_x_to_time(view_x);
        self.seek(t)
    }

    /// Frame callback. Keeps a zoomed view following the playhead.
    pub fn tick(&mut self) -> TickOutcome {
        let (Some(loaded), Some(id)) = (self.loaded.as_mut(), self.transport.loop_id()) else {
            return TickOutcome::Stale;
        };
        let outcome = self.transport.tick(id, &mut loaded.session, &loaded.trim);
        if let TickOutcome::Advanced(t) = outcome {
            if self.viewport.zoom() > 1.0 {
                self.viewport.follow(t, self.config.follow_margin_px);
            }
        }
        outcome
    }

    // ── Trim, mute, volume ──────────────────────────────────────

    pub fn set_in(&mut self, t: f64) -> Result<f64> {
        Ok(self.loaded_mut()?.trim.set_in(t))
    }

    pub fn set_out(&mut self, t: f64) -> Result<f64> {
        Ok(self.loaded_mut()?.trim.set_out(t))
    }

    pub fn drag_edge(&mut self, edge: TrimEdge, pointer_time: f64) -> Result<f64> {
        Ok(self.loaded_mut()?.trim.drag_edge(edge, pointer_time))
    }

    /// In point at the playback cursor.
    pub fn mark_in(&mut self) -> Result<f64> {
        let cursor = self.transport.current_time();
        Ok(self.loaded_mut()?.trim.mark_in(cursor))
    }

    /// Out point at the playback cursor.
    pub fn mark_out(&mut self) -> Result<f64> {
        let cursor = self.transport.current_time();
        Ok(self.loaded_mut()?.trim.mark_out(cursor))
    }

    /// Flip a track's mute. Audio mute applies to live playback at once.
    pub fn toggle_mute(&mut self, track: TrackKind) -> Result<bool> {
        let loaded = self.loaded_mut()?;
        let muted = loaded.trim.toggle_mute(track);
        loaded.session.apply_gain(loaded.trim.effective_gain());
        debug!("{} track muted: {}", track, muted);
        Ok(muted)
    }

    /// Mute or unmute whichever track has focus.
    pub fn toggle_active_mute(&mut self) -> Result<bool> {
        let track = self.active_track().ok_or(TrimdeckError::NoMedia)?;
        self.toggle_mute(track)
    }

    /// Set the audio gain; playing audio follows without a restart.
    pub fn set_volume(&mut self, volume: f32) -> Result<f32> {
        let loaded = self.loaded_mut()?;
        let applied = loaded.trim.set_volume(volume);
        loaded.session.apply_gain(loaded.trim.effective_gain());
        Ok(applied)
    }

    pub fn select_track(&mut self, track: TrackKind) -> bool {
        self.loaded
            .as_mut()
            .is_some_and(|loaded| loaded.trim.select_track(track))
    }

    // ── Zoom ────────────────────────────────────────────────────

    /// Set the zoom, centring the view on the playhead.
    pub fn set_zoom(&mut self, zoom: f64) {
        let focus = self.transport.current_time();
        self.viewport.set_zoom(zoom, focus);
    }

    pub fn zoom_in(&mut self) {
        self.set_zoom(self.viewport.zoom() * self.config.zoom_button_factor);
    }

    pub fn zoom_out(&mut self) {
        self.set_zoom(self.viewport.zoom() / self.config.zoom_button_factor);
    }

    pub fn zoom_fit(&mut self) {
        self.set_zoom(1.0);
    }

    /// One mouse-wheel notch.
    pub fn zoom_wheel(&mut self, zoom_in: bool) {
        let factor = self.config.zoom_wheel_factor;
        let zoom = if zoom_in {
            self.viewport.zoom() * factor
        } else {
            self.viewport.zoom() / factor
        };
        self.set_zoom(zoom);
    }

    pub fn set_view_width(&mut self, width_px: f64) {
        self.viewport.set_view_width(width_px);
    }

    pub fn scroll_by(&mut self, dx: f64) {
        self.viewport.scroll_by(dx);
    }

    // ── Export ──────────────────────────────────────────────────

    /// Encoder parameters for the current edit state.
    pub fn export_request(&self) -> Result<ExportRequest> {
        let loaded = self.loaded.as_ref().ok_or(TrimdeckError::NoMedia)?;
        let trim = &loaded.trim;
        let range = trim.range();
        let clip = ClipRange::new(range.in_point, range.out_point);
        let ext = loaded
            .session
            .path()
            .extension()
            .and_then(|e| e.to_str())
            .unwrap_or_default();
        ExportRequest::plan(
            trim.kind(),
            trim.duration(),
            trim.is_muted(TrackKind::Video),
            trim.is_muted(TrackKind::Audio),
            clip,
            clip,
            trim.volume(),
            ext,
        )
    }

    /// Export the trimmed clip into `dest_dir` in the background. Progress
    /// and the outcome are reported through [`Editor::status`].
    pub fn export(&mut self, dest_dir: impl Into<PathBuf>) -> Result<()> {
        if self.export.is_some() {
            return Ok(());
        }
        let request = match self.export_request() {
            Ok(request) => request,
            Err(e) => {
                self.status = e.status_text();
                return Err(e);
            }
        };
        let Some(loaded) = self.loaded.as_ref() else {
            return Err(TrimdeckError::NoMedia);
        };
        let source = ExportSource {
            path: loaded.session.path().to_path_buf(),
            duration: loaded.session.duration(),
            decoded_audio: loaded.session.decoded_audio().cloned(),
        };
        let dest_dir = dest_dir.into();
        let encoder = self.encoder.clone();
        let cancel = ExportCancel::new();
        let generation = self.generation;

        let job_cancel = cancel.clone();
        self.jobs.spawn(
            "export",
            move |tx| {
                let mut on_progress = |fraction: f64| {
                    tx.send(JobMessage::ExportProgress {
                        generation,
                        fraction,
                    })
                };
                let result = run_export(
                    &request,
                    &source,
                    encoder.as_deref(),
                    &dest_dir,
                    &mut on_progress,
                    &job_cancel,
                );
                JobMessage::ExportDone { generation, result }
            },
            move |reason| JobMessage::ExportDone {
                generation,
                result: Err(TrimdeckError::ExportFailure(reason)),
            },
        )?;
        self.export = Some(cancel);
        self.status = progress_status(0.0);
        Ok(())
    }

    /// Ask a running export to stop.
    pub fn cancel_export(&mut self) {
        if let Some(cancel) = &self.export {
            info!("Cancelling export");
            cancel.cancel();
        }
    }

    pub fn is_exporting(&self) -> bool {
        self.export.is_some()
    }

    // ── Getters ─────────────────────────────────────────────────

    pub fn config(&self) -> &EditorConfig {
        &self.config
    }

    pub fn generation(&self) -> Generation {
        self.generation
    }

    pub fn has_media(&self) -> bool {
        self.loaded.is_some()
    }

    /// An audio file is still decoding.
    pub fn is_loading(&self) -> bool {
        self.pending_audio.is_some()
    }

    /// Decode, thumbnail or export work still running.
    pub fn has_pending_jobs(&self) -> bool {
        self.jobs.pending() > 0
    }

    pub fn session(&self) -> Option<&MediaSession> {
        self.loaded.as_ref().map(|l| &l.session)
    }

    pub fn trim(&self) -> Option<&TrimState> {
        self.loaded.as_ref().map(|l| &l.trim)
    }

    pub fn kind(&self) -> Option<MediaKind> {
        self.session().map(MediaSession::kind)
    }

    pub fn duration(&self) -> f64 {
        self.session().map_or(0.0, MediaSession::duration)
    }

    pub fn current_time(&self) -> f64 {
        self.transport.current_time()
    }

    pub fn is_playing(&self) -> bool {
        self.transport.is_playing()
    }

    pub fn trim_range(&self) -> Option<TrimRange> {
        self.trim().map(TrimState::range)
    }

    pub fn track_state(&self, track: TrackKind) -> Option<TrackState> {
        self.trim().map(|t| *t.track(track))
    }

    pub fn active_track(&self) -> Option<TrackKind> {
        self.trim().map(TrimState::active_track)
    }

    pub fn volume(&self) -> f32 {
        self.trim().map_or(1.0, TrimState::volume)
    }

    pub fn export_label(&self) -> &'static str {
        self.trim().map_or("Export (disabled)", TrimState::export_label)
    }

    pub fn viewport(&self) -> &TimelineViewport {
        &self.viewport
    }

    pub fn waveform(&self) -> Option<&Waveform> {
        self.waveform.as_ref()
    }

    pub fn thumbnails(&self) -> &ThumbnailCache {
        &self.thumbnails
    }

    pub fn status(&self) -> &str {
        &self.status
    }
}

fn display_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}
