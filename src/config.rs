//! Settings that live outside the document.
//!
//! [`Preferences`] is view state (zoom, theme) and never goes into a saved
//! layout. [`LayoutDefaults`] seeds new documents and pages. Both are stored
//! together in a small JSON file; a missing file means "all defaults".

use std::io::ErrorKind;
use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::ConfigError;
use crate::geometry::{GridSettings, PageSize};

pub const MIN_ZOOM: f64 = 0.25;
pub const MAX_ZOOM: f64 = 4.0;

/// Clamp a zoom factor to `[MIN_ZOOM, MAX_ZOOM]`. Non-finite input resets to 1.
pub fn clamp_zoom(zoom: f64) -> f64 {
    if !zoom.is_finite() {
        return 1.0;
    }
    num_traits::clamp(zoom, MIN_ZOOM, MAX_ZOOM)
}

#[derive(Copy, Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Preferences {
    pub zoom: f64,
    pub dark_mode: bool,
}

impl Default for Preferences {
    fn default() -> Self {
        Self {
            zoom: 1.0,
            dark_mode: false,
        }
    }
}

impl Preferences {
    /// Set the zoom, clamped. Returns the value actually stored.
    pub fn set_zoom(&mut self, zoom: f64) -> f64 {
        self.zoom = clamp_zoom(zoom);
        self.zoom
    }
}

#[derive(Copy, Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct LayoutDefaults {
    pub page_size: PageSize,
    pub grid: GridSettings,
}

#[derive(Copy, Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub defaults: LayoutDefaults,
    pub preferences: Preferences,
}

impl Config {
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let text = match std::fs::read_to_string(path) {
            Ok(text) => text,
            Err(err) if err.kind() == ErrorKind::NotFound => {
                debug!(path = %path.display(), "no config file, using defaults");
                return Ok(Self::default());
            }
            Err(err) => return Err(err.into()),
        };
        let mut config: Config = serde_json::from_str(&text)?;
        config.preferences.zoom = clamp_zoom(config.preferences.zoom);
        Ok(config)
    }

    pub fn save(&self, path: impl AsRef<Path>) -> Result<(), ConfigError> {
        let path = path.as_ref();
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(path, serde_json::to_string_pretty(self)?)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zoom_is_clamped() {
        let mut prefs = Preferences::default();
        assert_eq!(prefs.set_zoom(10.0), MAX_ZOOM);
        assert_eq!(prefs.set_zoom(0.01), MIN_ZOOM);
        assert_eq!(prefs.set_zoom(1.5), 1.5);
        assert_eq!(prefs.set_zoom(f64::NAN), 1.0);
    }

    #[test]
    fn missing_file_gives_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let config = Config::load(dir.path().join("nope.json")).unwrap();
        assert_eq!(config, Config::default());
        assert_eq!(config.defaults.grid, GridSettings::default());
    }

    #[test]
    fn save_then_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested/config.json");
        let mut config = Config::default();
        config.defaults.page_size = PageSize::A3;
        config.defaults.grid = GridSettings::new(3, 4, 2.0, 8.0);
        config.preferences.dark_mode = true;
        config.save(&path).unwrap();
        assert_eq!(Config::load(&path).unwrap(), config);
    }

    #[test]
    fn partial_file_fills_defaults_and_clamps() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        std::fs::write(&path, r#"{"preferences":{"zoom":12}}"#).unwrap();
        let config = Config::load(&path).unwrap();
        assert_eq!(config.preferences.zoom, MAX_ZOOM);
        assert!(!config.preferences.dark_mode);
        assert_eq!(config.defaults, LayoutDefaults::default());
    }

    #[test]
    fn garbage_is_a_parse_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        std::fs::write(&path, "{not json").unwrap();
        assert!(matches!(Config::load(&path), Err(ConfigError::Parse(_))));
    }
}
