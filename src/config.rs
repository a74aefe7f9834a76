//! TOML-based configuration system.
//!
//! Loads settings from a `config.toml` file, falling back to defaults. Every
//! struct implements `Default` so a missing or partial config file behaves
//! like no file at all.
//!
//! ## Config file search order
//!
//! 1. `SURIVR_CONFIG` environment variable (explicit override)
//! 2. Next to the executable (`<exe_dir>/config.toml`)
//! 3. Platform config directory (`%APPDATA%\SuriVR\config.toml` on Windows,
//!    `$XDG_CONFIG_HOME/surivr/config.toml` elsewhere)
//! 4. Current working directory (`./config.toml`)
//! 5. No file found → `Config::default()`
//!
//! Distances named `world_*` are meters; `translation_*` are placement units
//! (see [`crate::placement::WORLD_DPI_RATIO`]).

use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{info, warn};

// ─────────────────────────────────────────────────────────────────────────────
// Config structs
// ─────────────────────────────────────────────────────────────────────────────

/// Top-level configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub general: GeneralConfig,
    pub browser: BrowserConfig,
    pub navigation_bar: NavigationBarConfig,
    pub keyboard: KeyboardConfig,
    pub settings_panel: SettingsPanelConfig,
    pub top_bar: TopBarConfig,
    pub input: InputConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneralConfig {
    pub default_url: String,
    /// First page of a private browsing session.
    pub private_url: String,
    /// Prefix the URL-encoded query is appended to.
    pub search_engine_url: String,
}

/// Browser surface size and position.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BrowserConfig {
    pub world_width: f32,
    pub width_pixels: u32,
    pub height_pixels: u32,
    pub density: f32,
    pub world_y: f32,
    pub world_z: f32,
    /// Aspect ratio kept by resize presets. Unset = `width_pixels / height_pixels`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub aspect_ratio: Option<f32>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct NavigationBarConfig {
    pub width: u32,
    pub height: u32,
    pub translation_y: f32,
}

/// Size and offset of a plain panel, resolved from its config section.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PanelConfig {
    pub width: u32,
    pub height: u32,
    pub world_width: f32,
    pub translation_y: f32,
    pub translation_z: f32,
}

/// Declares a panel section with its own defaults, so that a partial
/// `[keyboard]` table falls back to keyboard values and not another panel's.
macro_rules! panel_section {
    ($(#[$meta:meta])* $name:ident {
        width: $width:expr,
        height: $height:expr,
        world_width: $world_width:expr,
        translation_y: $translation_y:expr,
        translation_z: $translation_z:expr $(,)?
    }) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
        #[serde(default)]
        pub struct $name {
            pub width: u32,
            pub height: u32,
            pub world_width: f32,
            pub translation_y: f32,
            pub translation_z: f32,
        }

        impl Default for $name {
            fn default() -> Self {
                Self {
                    width: $width,
                    height: $height,
                    world_width: $world_width,
                    translation_y: $translation_y,
                    translation_z: $translation_z,
                }
            }
        }

        impl $name {
            pub fn panel(&self) -> PanelConfig {
                PanelConfig {
                    width: self.width,
                    height: self.height,
                    world_width: self.world_width,
                    translation_y: self.translation_y,
                    translation_z: self.translation_z,
                }
            }
        }
    };
}

panel_section!(
    /// On-screen keyboard, under the navigation bar.
    KeyboardConfig {
        width: 1020,
        height: 320,
        world_width: 3.0,
        translation_y: -120.0,
        translation_z: 90.0,
    }
);

panel_section!(
    /// Settings panel, free-standing in front of the browser.
    SettingsPanelConfig {
        width: 720,
        height: 600,
        world_width: 2.0,
        translation_y: 576.0,
        translation_z: -600.0,
    }
);

panel_section!(
    /// Private-mode bar above the browser.
    TopBarConfig {
        width: 180,
        height: 48,
        world_width: 0.6,
        translation_y: 20.0,
        translation_z: 0.0,
    }
);

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct InputConfig {
    /// Window in which a second identical swipe triggers navigation.
    pub swipe_delay_ms: u64,
    /// Delay before re-checking keyboard focus after a press on the browser.
    pub focus_debounce_ms: u64,
}

// ─────────────────────────────────────────────────────────────────────────────
// Default impls
// ─────────────────────────────────────────────────────────────────────────────

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            default_url: "https://example.com".to_string(),
            private_url: "http://www.mozilla.com".to_string(),
            search_engine_url: "https://duckduckgo.com/?q=".to_string(),
        }
    }
}

impl Default for BrowserConfig {
    fn default() -> Self {
        Self {
            world_width: 4.0,
            width_pixels: 1920,
            height_pixels: 1080,
            density: 1.0,
            world_y: 1.6,
            world_z: -2.5,
            aspect_ratio: None,
        }
    }
}

impl BrowserConfig {
    pub fn aspect_ratio(&self) -> f32 {
        match self.aspect_ratio {
            Some(ratio) if ratio > 0.0 => ratio,
            _ if self.height_pixels > 0 => self.width_pixels as f32 / self.height_pixels as f32,
            _ => 1.0,
        }
    }
}

impl Default for NavigationBarConfig {
    fn default() -> Self {
        Self {
            width: 720,
            height: 48,
            translation_y: -20.0,
        }
    }
}

impl Default for InputConfig {
    fn default() -> Self {
        Self {
            swipe_delay_ms: 1000,
            focus_debounce_ms: 150,
        }
    }
}

impl InputConfig {
    pub fn swipe_delay(&self) -> Duration {
        Duration::from_millis(self.swipe_delay_ms)
    }

    pub fn focus_debounce(&self) -> Duration {
        Duration::from_millis(self.focus_debounce_ms)
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Loading and saving
// ─────────────────────────────────────────────────────────────────────────────

const FILE_NAME: &str = "config.toml";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("cannot read {path}: {source}")]
    Read { path: PathBuf, source: io::Error },

    #[error("invalid TOML in {path}: {source}")]
    Parse {
        path: PathBuf,
        source: toml::de::Error,
    },
}

impl Config {
    /// Parses a TOML document. Missing sections and fields keep their defaults.
    pub fn from_toml(content: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(content)
    }

    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_owned(),
            source,
        })?;
        Self::from_toml(&content).map_err(|source| ConfigError::Parse {
            path: path.to_owned(),
            source,
        })
    }

    /// First config file found in the search order, or defaults. A file that
    /// exists but cannot be used is logged and replaced by defaults.
    pub fn load() -> Self {
        let Some(path) = candidate_paths().into_iter().find(|path| path.is_file()) else {
            info!("No config file found, using defaults");
            return Self::default();
        };
        match Self::from_file(&path) {
            Ok(config) => {
                info!(path = %path.display(), "Configuration loaded");
                config
            }
            Err(error) => {
                warn!(%error, "Unusable config file, using defaults");
                Self::default()
            }
        }
    }

    /// Writes pretty TOML to the platform config directory, creating it.
    pub fn save(&self) -> io::Result<()> {
        let path = save_path();
        if let Some(dir) = path.parent() {
            fs::create_dir_all(dir)?;
        }
        let content = toml::to_string_pretty(self).map_err(io::Error::other)?;
        fs::write(&path, content)?;
        info!(path = %path.display(), "Configuration saved");
        Ok(())
    }
}

/// Locations searched for a config file, most specific first.
fn candidate_paths() -> Vec<PathBuf> {
    let mut paths: Vec<PathBuf> = std::env::var_os("SURIVR_CONFIG")
        .map(PathBuf::from)
        .into_iter()
        .collect();
    if let Ok(exe) = std::env::current_exe()
        && let Some(dir) = exe.parent()
    {
        paths.push(dir.join(FILE_NAME));
    }
    paths.extend(platform_config_dir().map(|dir| dir.join(FILE_NAME)));
    paths.push(PathBuf::from(FILE_NAME));
    paths
}

fn save_path() -> PathBuf {
    platform_config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(FILE_NAME)
}

fn platform_config_dir() -> Option<PathBuf> {
    if cfg!(windows) {
        std::env::var_os("APPDATA").map(|appdata| PathBuf::from(appdata).join("SuriVR"))
    } else {
        std::env::var_os("XDG_CONFIG_HOME")
            .map(PathBuf::from)
            .or_else(|| std::env::var_os("HOME").map(|home| PathBuf::from(home).join(".config")))
            .map(|dir| dir.join("surivr"))
    }
}
