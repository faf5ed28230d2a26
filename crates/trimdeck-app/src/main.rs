//! Trimdeck - trim a video or audio file and export the selection
//!
//! Entry point and main application loop.

use anyhow::Result;
use eframe::egui;
use std::path::PathBuf;
use std::time::Duration;
use tracing::{info, warn};
use tracing_subscriber::{EnvFilter, FmtSubscriber};
use trimdeck_audio::{AudioOutput, OutputSlot};
use trimdeck_core::{format_timecode, format_zoom_label, EditorConfig, MediaKind, SystemClock, TrackKind};
use trimdeck_media::thumbnail::nearest_index;
use trimdeck_media::ExportPath;
use trimdeck_timeline::Editor;
use trimdeck_ui::{EditorCommand, HitRadii, KeyMap, Palette, Theme, TimelineWidget};

const MEDIA_EXTENSIONS: &[&str] = &[
    "mp4", "mov", "mkv", "webm", "avi", "m4v", "mp3", "wav", "m4a", "aac", "ogg", "flac", "opus",
];

fn main() -> Result<()> {
    let subscriber = FmtSubscriber::builder()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    info!("Trimdeck starting...");

    let config = match EditorConfig::load() {
        Ok(config) => config,
        Err(e) => {
            warn!("Ignoring unreadable config: {}", e);
            EditorConfig::default()
        }
    };

    trimdeck_media::init();

    // Optional file to open on launch
    let initial = std::env::args().nth(1).map(PathBuf::from);

    let options = eframe::NativeOptions {
        viewport: egui::ViewportBuilder::default()
            .with_inner_size([1100.0, 640.0])
            .with_drag_and_drop(true)
            .with_title("Trimdeck"),
        renderer: eframe::Renderer::Wgpu,
        ..Default::default()
    };

    eframe::run_native(
        "Trimdeck",
        options,
        Box::new(move |cc| Ok(Box::new(TrimdeckApp::new(cc, config, initial)))),
    )?;

    Ok(())
}

struct TrimdeckApp {
    editor: Editor,
    /// Keeps the cpal stream alive.
    _output: Option<AudioOutput>,
    timeline: TimelineWidget,
    keymap: KeyMap,
    palette: Palette,
}

impl TrimdeckApp {
    fn new(cc: &eframe::CreationContext<'_>, config: EditorConfig, initial: Option<PathBuf>) -> Self {
        Theme::apply(&cc.egui_ctx, config.theme);
        let palette = Palette::for_mode(config.theme);

        let (output, slot) = match AudioOutput::open() {
            Ok(output) => {
                let slot = output.slot();
                (Some(output), slot)
            }
            Err(e) => {
                warn!("Audio output unavailable, playing silently: {}", e);
                (None, OutputSlot::new(48_000))
            }
        };

        let radii = HitRadii::from_config(&config);
        let mut editor = Editor::new(config, SystemClock::shared(), slot);
        if let Some(path) = initial {
            if let Err(e) = editor.load(&path) {
                warn!("Failed to open {}: {}", path.display(), e);
            }
        }

        Self {
            editor,
            _output: output,
            timeline: TimelineWidget::new(radii),
            keymap: KeyMap::new(),
            palette,
        }
    }

    fn open_dialog(&mut self) {
        let picked = rfd::FileDialog::new()
            .add_filter("Video and audio", MEDIA_EXTENSIONS)
            .pick_file();
        if let Some(path) = picked {
            self.open(path);
        }
    }

    fn open(&mut self, path: PathBuf) {
        info!("Opening {}", path.display());
        if let Err(e) = self.editor.load(&path) {
            warn!("Failed to open {}: {}", path.display(), e);
        }
    }

    fn export_dialog(&mut self) {
        if let Some(dir) = rfd::FileDialog::new().pick_folder() {
            if let Err(e) = self.editor.export(dir) {
                warn!("Export not started: {}", e);
            }
        }
    }

    fn run(&mut self, command: EditorCommand) {
        if let Err(e) = command.apply(&mut self.editor) {
            warn!("{} failed: {}", command.name(), e);
        }
    }

    fn handle_keys(&mut self, ctx: &egui::Context) {
        if ctx.wants_keyboard_input() {
            return;
        }
        let commands = ctx.input(|i| self.keymap.collect(i));
        for command in commands {
            self.run(command);
        }
    }

    fn handle_drops(&mut self, ctx: &egui::Context) {
        let dropped = ctx.input(|i| i.raw.dropped_files.first().and_then(|f| f.path.clone()));
        if let Some(path) = dropped {
            self.open(path);
        }
    }

    fn toolbar(&mut self, ui: &mut egui::Ui) {
        ui.horizontal(|ui| {
            if ui.button("Open…").clicked() {
                self.open_dialog();
            }
            let name = self
                .editor
                .session()
                .and_then(|s| s.path().file_name())
                .map(|n| n.to_string_lossy().into_owned());
            match name {
                Some(name) => ui.label(egui::RichText::new(name).strong()),
                None if self.editor.is_loading() => ui.label("Loading…"),
                None => ui.label(egui::RichText::new("No file").color(self.palette.text_dim)),
            };

            ui.with_layout(egui::Layout::right_to_left(egui::Align::Center), |ui| {
                self.export_controls(ui);
            });
        });
    }

    fn export_controls(&mut self, ui: &mut egui::Ui) {
        if self.editor.is_exporting() {
            if ui.button("Cancel").clicked() {
                self.editor.cancel_export();
            }
            ui.spinner();
            return;
        }
        let enabled = self
            .editor
            .trim()
            .is_some_and(|t| t.export_path() != ExportPath::Disabled);
        let label = self.editor.export_label();
        if ui.add_enabled(enabled, egui::Button::new(label)).clicked() {
            self.export_dialog();
        }
    }

    fn transport_bar(&mut self, ui: &mut egui::Ui) {
        let has_media = self.editor.has_media();
        ui.horizontal(|ui| {
            ui.add_enabled_ui(has_media, |ui| {
                let play = if self.editor.is_playing() { "⏸" } else { "▶" };
                if ui
                    .button(play)
                    .on_hover_text(self.keymap.tooltip(EditorCommand::TogglePlay))
                    .clicked()
                {
                    self.run(EditorCommand::TogglePlay);
                }
                if ui.button("⏹").on_hover_text("Stop").clicked() {
                    self.editor.stop();
                }
                if ui
                    .button("⏪")
                    .on_hover_text(self.keymap.tooltip(EditorCommand::JumpBack))
                    .clicked()
                {
                    self.run(EditorCommand::JumpBack);
                }
                if ui
                    .button("⏩")
                    .on_hover_text(self.keymap.tooltip(EditorCommand::JumpForward))
                    .clicked()
                {
                    self.run(EditorCommand::JumpForward);
                }
            });

            ui.label(
                egui::RichText::new(format!(
                    "{} / {}",
                    format_timecode(self.editor.current_time()),
                    format_timecode(self.editor.duration())
                ))
                .monospace()
                .size(Theme::FONT_MD),
            );

            if let Some(range) = self.editor.trim_range() {
                ui.separator();
                ui.label(
                    egui::RichText::new(format!(
                        "In {}  Out {}",
                        format_timecode(range.in_point),
                        format_timecode(range.out_point)
                    ))
                    .monospace()
                    .color(self.palette.text_dim),
                );
                if ui.small_button("[").on_hover_text(self.keymap.tooltip(EditorCommand::MarkIn)).clicked() {
                    self.run(EditorCommand::MarkIn);
                }
                if ui.small_button("]").on_hover_text(self.keymap.tooltip(EditorCommand::MarkOut)).clicked() {
                    self.run(EditorCommand::MarkOut);
                }
            }

            ui.with_layout(egui::Layout::right_to_left(egui::Align::Center), |ui| {
                ui.add_enabled_ui(has_media, |ui| {
                    self.zoom_controls(ui);
                    ui.separator();
                    self.track_controls(ui);
                });
            });
        });
    }

    /// Laid out right to left.
    fn zoom_controls(&mut self, ui: &mut egui::Ui) {
        if ui.small_button("Fit").on_hover_text(self.keymap.tooltip(EditorCommand::ZoomFit)).clicked() {
            self.run(EditorCommand::ZoomFit);
        }
        if ui.small_button("+").on_hover_text(self.keymap.tooltip(EditorCommand::ZoomIn)).clicked() {
            self.run(EditorCommand::ZoomIn);
        }
        ui.label(egui::RichText::new(format_zoom_label(self.editor.viewport().zoom())).monospace());
        if ui.small_button("−").on_hover_text(self.keymap.tooltip(EditorCommand::ZoomOut)).clicked() {
            self.run(EditorCommand::ZoomOut);
        }
    }

    /// Laid out right to left.
    fn track_controls(&mut self, ui: &mut egui::Ui) {
        let mut volume = self.editor.volume();
        let slider = egui::Slider::new(&mut volume, 0.0..=2.0)
            .fixed_decimals(2)
            .text("Vol");
        if ui.add(slider).changed() {
            if let Err(e) = self.editor.set_volume(volume) {
                warn!("Volume not applied: {}", e);
            }
        }

        for track in [TrackKind::Audio, TrackKind::Video] {
            let Some(state) = self.editor.track_state(track) else {
                continue;
            };
            if track == TrackKind::Video && self.editor.kind() != Some(MediaKind::Video) {
                continue;
            }
            let label = format!("{} {}", track.badge(), if state.muted { "muted" } else { "on" });
            if ui
                .selectable_label(!state.muted, label)
                .on_hover_text(format!("Mute {} track", track))
                .clicked()
            {
                if let Err(e) = self.editor.toggle_mute(track) {
                    warn!("Mute not applied: {}", e);
                }
            }
        }
    }

    /// Nearest thumbnail for the cursor; audio files get a placeholder.
    fn viewer(&self, ui: &mut egui::Ui) {
        let rect = ui.available_rect_before_wrap();
        let painter = ui.painter_at(rect);
        painter.rect_filled(rect, 0.0, self.palette.background);

        let duration = self.editor.duration();
        let thumbnails = self.editor.thumbnails();
        let frame = (duration > 0.0 && thumbnails.is_ready())
            .then(|| nearest_index(self.editor.current_time() / duration, thumbnails.len()))
            .flatten()
            .and_then(|i| Some((self.timeline.texture(i)?, thumbnails.get(i)?)));

        match frame {
            Some((texture, thumb)) => {
                let aspect = thumb.aspect() as f32;
                let mut size = egui::vec2(rect.width(), rect.width() / aspect);
                if size.y > rect.height() {
                    size = egui::vec2(rect.height() * aspect, rect.height());
                }
                let target = egui::Rect::from_center_size(rect.center(), size);
                painter.image(
                    texture.id(),
                    target,
                    egui::Rect::from_min_max(egui::pos2(0.0, 0.0), egui::pos2(1.0, 1.0)),
                    egui::Color32::WHITE,
                );
            }
            None => {
                let text = match self.editor.kind() {
                    Some(MediaKind::Audio) => "♪",
                    Some(MediaKind::Video) => "",
                    None if self.editor.is_loading() => "Decoding audio…",
                    None => "Open or drop a video or audio file",
                };
                painter.text(
                    rect.center(),
                    egui::Align2::CENTER_CENTER,
                    text,
                    egui::FontId::proportional(Theme::FONT_MD * 2.0),
                    self.palette.text_dim,
                );
            }
        }
        ui.allocate_rect(rect, egui::Sense::hover());
    }
}

impl eframe::App for TrimdeckApp {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        let changed = self.editor.poll();
        if self.editor.is_playing() {
            self.editor.tick();
        }

        self.handle_drops(ctx);
        self.handle_keys(ctx);

        egui::TopBottomPanel::top("toolbar")
            .frame(egui::Frame::side_top_panel(&ctx.style()).inner_margin(Theme::SPACE_SM))
            .show(ctx, |ui| self.toolbar(ui));

        egui::TopBottomPanel::bottom("status_bar").show(ctx, |ui| {
            let status = self.editor.status();
            let text = if status.is_empty() { " " } else { status };
            ui.label(egui::RichText::new(text).size(Theme::FONT_SM).color(self.palette.text_dim));
        });

        egui::TopBottomPanel::bottom("timeline_panel")
            .resizable(false)
            .frame(egui::Frame::side_top_panel(&ctx.style()).inner_margin(Theme::SPACE_SM))
            .show(ctx, |ui| {
                self.transport_bar(ui);
                ui.add_space(Theme::SPACE_XS);
                self.timeline.show(ui, &mut self.editor, &self.palette);
            });

        egui::CentralPanel::default().show(ctx, |ui| self.viewer(ui));

        if self.editor.is_playing() || self.timeline.is_dragging() || changed {
            ctx.request_repaint();
        } else if self.editor.has_pending_jobs() {
            // Background jobs report through poll().
            ctx.request_repaint_after(Duration::from_millis(100));
        }
    }
}
