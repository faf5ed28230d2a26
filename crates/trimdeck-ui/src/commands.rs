//! Editor commands and the keyboard shortcuts bound to them.
//!
//! Every keyboard action is an [`EditorCommand`]. The [`KeyMap`] resolves
//! pressed keys to commands; [`EditorCommand::apply`] runs one against the
//! editor. Commands are no-ops when nothing is loaded.

use egui::{InputState, Key};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use tracing::debug;
use trimdeck_core::Result;
use trimdeck_timeline::Editor;

/// Something the keyboard can ask the editor to do.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EditorCommand {
    TogglePlay,
    StepBack,
    StepForward,
    JumpBack,
    JumpForward,
    MarkIn,
    MarkOut,
    ToggleMute,
    ZoomIn,
    ZoomOut,
    ZoomFit,
}

impl EditorCommand {
    pub const ALL: [EditorCommand; 11] = [
        EditorCommand::TogglePlay,
        EditorCommand::StepBack,
        EditorCommand::StepForward,
        EditorCommand::JumpBack,
        EditorCommand::JumpForward,
        EditorCommand::MarkIn,
        EditorCommand::MarkOut,
        EditorCommand::ToggleMute,
        EditorCommand::ZoomIn,
        EditorCommand::ZoomOut,
        EditorCommand::ZoomFit,
    ];

    /// Stable id, e.g. `transport.toggle_play`.
    pub fn id(self) -> &'static str {
        match self {
            Self::TogglePlay => "transport.toggle_play",
            Self::StepBack => "transport.step_back",
            Self::StepForward => "transport.step_forward",
            Self::JumpBack => "transport.jump_back",
            Self::JumpForward => "transport.jump_forward",
            Self::MarkIn => "trim.mark_in",
            Self::MarkOut => "trim.mark_out",
            Self::ToggleMute => "track.toggle_mute",
            Self::ZoomIn => "view.zoom_in",
            Self::ZoomOut => "view.zoom_out",
            Self::ZoomFit => "view.zoom_fit",
        }
    }

    /// Display name for tooltips.
    pub fn name(self) -> &'static str {
        match self {
            Self::TogglePlay => "Play/Pause",
            Self::StepBack => "Previous Frame",
            Self::StepForward => "Next Frame",
            Self::JumpBack => "Jump Back",
            Self::JumpForward => "Jump Forward",
            Self::MarkIn => "Set In Point",
            Self::MarkOut => "Set Out Point",
            Self::ToggleMute => "Mute Active Track",
            Self::ZoomIn => "Zoom In",
            Self::ZoomOut => "Zoom Out",
            Self::ZoomFit => "Zoom to Fit",
        }
    }

    /// Run against the editor. Without media this does nothing.
    pub fn apply(self, editor: &mut Editor) -> Result<()> {
        if !editor.has_media() {
            return Ok(());
        }
        debug!("Command {}", self.id());
        let frame = editor.config().frame_step;
        let coarse = editor.config().coarse_step;
        match self {
            Self::TogglePlay => editor.toggle_play()?,
            Self::StepBack => editor.step(-frame)?,
            Self::StepForward => editor.step(frame)?,
            Self::JumpBack => editor.step(-coarse)?,
            Self::JumpForward => editor.step(coarse)?,
            Self::MarkIn => {
                editor.mark_in()?;
            }
            Self::MarkOut => {
                editor.mark_out()?;
            }
            Self::ToggleMute => {
                editor.toggle_active_mute()?;
            }
            Self::ZoomIn => editor.zoom_in(),
            Self::ZoomOut => editor.zoom_out(),
            Self::ZoomFit => editor.zoom_fit(),
        }
        Ok(())
    }
}

/// Key bindings. Several keys may map to the same command.
#[derive(Debug, Clone)]
pub struct KeyMap {
    bindings: HashMap<Key, EditorCommand>,
}

impl KeyMap {
    pub fn new() -> Self {
        use EditorCommand::*;

        let mut map = Self {
            bindings: HashMap::new(),
        };
        map.bind(Key::Space, TogglePlay);
        map.bind(Key::ArrowLeft, StepBack);
        map.bind(Key::ArrowRight, StepForward);
        map.bind(Key::J, JumpBack);
        map.bind(Key::L, JumpForward);
        map.bind(Key::I, MarkIn);
        map.bind(Key::O, MarkOut);
        map.bind(Key::Delete, ToggleMute);
        map.bind(Key::Backspace, ToggleMute);
        map.bind(Key::E, ZoomIn);
        map.bind(Key::Equals, ZoomIn);
        map.bind(Key::Plus, ZoomIn);
        map.bind(Key::Q, ZoomOut);
        map.bind(Key::Minus, ZoomOut);
        map.bind(Key::Num0, ZoomFit);
        map
    }

    pub fn bind(&mut self, key: Key, command: EditorCommand) {
        self.bindings.insert(key, command);
    }

    pub fn command_for(&self, key: Key) -> Option<EditorCommand> {
        self.bindings.get(&key).copied()
    }

    /// Keys bound to `command`, for tooltips.
    pub fn keys_for(&self, command: EditorCommand) -> Vec<Key> {
        let mut keys: Vec<Key> = self
            .bindings
            .iter()
            .filter(|(_, c)| **c == command)
            .map(|(k, _)| *k)
            .collect();
        keys.sort_by_key(|k| k.name());
        keys
    }

    /// `"Play/Pause (Space)"`.
    pub fn tooltip(&self, command: EditorCommand) -> String {
        let keys: Vec<&str> = self.keys_for(command).iter().map(|k| k.name()).collect();
        if keys.is_empty() {
            command.name().to_string()
        } else {
            format!("{} ({})", command.name(), keys.join(", "))
        }
    }

    /// Commands for keys pressed this frame. Ctrl/Cmd chords are left to
    /// the host.
    pub fn collect(&self, input: &InputState) -> Vec<EditorCommand> {
        if input.modifiers.ctrl || input.modifiers.command {
            return Vec::new();
        }
        input
            .events
            .iter()
            .filter_map(|event| match event {
                egui::Event::Key {
                    key,
                    pressed: true,
                    ..
                } => self.command_for(*key),
                _ => None,
            })
            .collect()
    }
}

impl Default for KeyMap {
    fn default() -> Self {
        Self::new()
    }
}
