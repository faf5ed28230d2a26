//! Editor configuration.
//!
//! Tunables live in a versioned JSON file under the user config directory.
//! Edit state (trim points, mutes) is never written here.

use crate::error::{Result, TrimdeckError};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Current config schema version.
pub const CONFIG_VERSION: u32 = 1;

/// Colour scheme.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ThemeMode {
    #[default]
    Dark,
    Light,
}

/// Every tunable constant of the editor.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EditorConfig {
    /// Minimum separation between in and out, seconds.
    pub trim_epsilon: f64,
    /// Frame step for arrow keys, seconds.
    pub frame_step: f64,
    /// Coarse jump for J/L, seconds.
    pub coarse_step: f64,
    pub zoom_min: f64,
    pub zoom_max: f64,
    pub zoom_button_factor: f64,
    pub zoom_wheel_factor: f64,
    /// Trim handle hit radius in pixels.
    pub handle_hit_radius_px: f64,
    /// Volume line hit radius in pixels.
    pub volume_hit_radius_px: f64,
    /// Playhead follow margin while zoomed.
    pub follow_margin_px: f64,
    pub thumbnail_min: usize,
    pub thumbnail_max: usize,
    pub thumbnail_height: u32,
    /// Whether the audio lane shows a draggable volume line.
    pub volume_line_enabled: bool,
    pub theme: ThemeMode,
}

impl Default for EditorConfig {
    fn default() -> Self {
        Self {
            trim_epsilon: 0.001,
            frame_step: 1.0 / 30.0,
            coarse_step: 5.0,
            zoom_min: 1.0,
            zoom_max: 32.0,
            zoom_button_factor: 2.0,
            zoom_wheel_factor: 1.5,
            handle_hit_radius_px: 6.0,
            volume_hit_radius_px: 5.0,
            follow_margin_px: 50.0,
            thumbnail_min: 10,
            thumbnail_max: 40,
            thumbnail_height: 80,
            volume_line_enabled: true,
            theme: ThemeMode::Dark,
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
struct ConfigFile {
    version: u32,
    config: EditorConfig,
}

impl EditorConfig {
    /// Default location: `<config dir>/trimdeck/config.json`.
    pub fn default_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("trimdeck")
            .join("config.json")
    }

    /// Clamp values that would break the editor invariants.
    pub fn validate(mut self) -> Self {
        if !(self.trim_epsilon >= 0.001) {
            self.trim_epsilon = 0.001;
        }
        if !(self.frame_step > 0.0) {
            self.frame_step = 1.0 / 30.0;
        }
        if !(self.coarse_step > 0.0) {
            self.coarse_step = 5.0;
        }
        if !(self.zoom_min >= 1.0) {
            self.zoom_min = 1.0;
        }
        if !(self.zoom_max >= self.zoom_min) {
            self.zoom_max = self.zoom_min;
        }
        if !(self.zoom_button_factor > 1.0) {
            self.zoom_button_factor = 2.0;
        }
        if !(self.zoom_wheel_factor > 1.0) {
            self.zoom_wheel_factor = 1.5;
        }
        self.thumbnail_min = self.thumbnail_min.max(1);
        self.thumbnail_max = self.thumbnail_max.max(self.thumbnail_min);
        self.thumbnail_height = self.thumbnail_height.max(8);
        self
    }

    /// Parse a config file body.
    pub fn from_json(data: &[u8]) -> Result<Self> {
        let raw: serde_json::Value = serde_json::from_slice(data)
            .map_err(|e| TrimdeckError::Config(format!("Invalid JSON: {}", e)))?;

        let version = raw.get("version").and_then(|v| v.as_u64()).unwrap_or(0) as u32;
        if version > CONFIG_VERSION {
            return Err(TrimdeckError::Config(format!(
                "Config version {} is newer than supported version {}",
                version, CONFIG_VERSION
            )));
        }

        // Version 0 files are a bare config object.
        let body = if version == 0 {
            raw
        } else {
            raw.get("config")
                .cloned()
                .ok_or_else(|| TrimdeckError::Config("Missing \"config\" section".into()))?
        };

        let config: EditorConfig = serde_json::from_value(body)
            .map_err(|e| TrimdeckError::Config(format!("Failed to parse config: {}", e)))?;
        Ok(config.validate())
    }

    /// Serialize to versioned JSON.
    pub fn to_json(&self) -> Result<Vec<u8>> {
        let file = ConfigFile {
            version: CONFIG_VERSION,
            config: self.clone(),
        };
        serde_json::to_vec_pretty(&file)
            .map_err(|e| TrimdeckError::Serialization(format!("Failed to serialize config: {}", e)))
    }

    /// Load from `path`. A missing file yields the defaults.
    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            debug!("No config at {}, using defaults", path.display());
            return Ok(Self::default());
        }
        let data = std::fs::read(path)?;
        let config = Self::from_json(&data)?;
        info!("Loaded config from {}", path.display());
        Ok(config)
    }

    /// Load from [`Self::default_path`].
    pub fn load() -> Result<Self> {
        Self::load_from(&Self::default_path())
    }

    /// Write to `path`, creating parent directories.
    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(path, self.to_json()?)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let cfg = EditorConfig::default();
        assert_eq!(cfg.trim_epsilon, 0.001);
        assert_eq!(cfg.zoom_max, 32.0);
        assert_eq!(cfg.thumbnail_height, 80);
    }

    #[test]
    fn test_save_and_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("config.json");
        let cfg = EditorConfig {
            coarse_step: 2.0,
            theme: ThemeMode::Light,
            ..Default::default()
        };
        cfg.save_to(&path).unwrap();
        let loaded = EditorConfig::load_from(&path).unwrap();
        assert_eq!(loaded, cfg);
    }

    #[test]
    fn test_missing_file_is_default() {
        let dir = tempfile::tempdir().unwrap();
        let loaded = EditorConfig::load_from(&dir.path().join("nope.json")).unwrap();
        assert_eq!(loaded, EditorConfig::default());
    }

    #[test]
    fn test_partial_bare_config() {
        let cfg = EditorConfig::from_json(br#"{"coarse_step": 10.0}"#).unwrap();
        assert_eq!(cfg.coarse_step, 10.0);
        assert_eq!(cfg.frame_step, 1.0 / 30.0);
    }

    #[test]
    fn test_rejects_newer_version() {
        let err = EditorConfig::from_json(br#"{"version": 99, "config": {}}"#).unwrap_err();
        assert!(matches!(err, TrimdeckError::Config(_)));
    }

    #[test]
    fn test_malformed_json() {
        assert!(EditorConfig::from_json(b"{not json").is_err());
    }

    #[test]
    fn test_validate_clamps() {
        let cfg = EditorConfig {
            trim_epsilon: 0.0,
            zoom_min: 0.1,
            zoom_max: 0.5,
            ..Default::default()
        }
        .validate();
        assert_eq!(cfg.trim_epsilon, 0.001);
        assert_eq!(cfg.zoom_min, 1.0);
        assert_eq!(cfg.zoom_max, 1.0);
    }
}
