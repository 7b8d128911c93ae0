//! Viewer configuration.
//!
//! Loaded from an optional JSON file. Every section and key falls back to its
//! default, so a partial file only overrides what it names.

use serde::{Deserialize, Serialize};
use std::path::Path;

/// Errors from loading or saving configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("invalid value for {key}: {reason}")]
    Invalid { key: &'static str, reason: String },
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ViewerConfig {
    pub grid: GridConfig,
    pub window: WindowConfig,
    pub terrain: TerrainConfig,
    pub motion: MotionConfig,
    pub session: SessionConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GridConfig {
    pub name: String,
    pub login_uri: String,
}

impl Default for GridConfig {
    fn default() -> Self {
        Self {
            name: "Kitely".into(),
            login_uri: "https://grid.kitely.com:8002".into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WindowConfig {
    pub width: u32,
    pub height: u32,
}

impl Default for WindowConfig {
    fn default() -> Self {
        Self {
            width: 1024,
            height: 768,
        }
    }
}

/// Largest accepted terrain resolution. Keeps sample counts and mesh
/// indices well inside `u32`.
pub const MAX_TERRAIN_RESOLUTION: u32 = 1024;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TerrainConfig {
    /// Planar extent of the height field, in world units.
    pub size: f32,
    /// Number of grid segments along each side, `1..=MAX_TERRAIN_RESOLUTION`.
    pub resolution: u32,
    pub max_height: f32,
    /// Noise seed. The same seed always yields the same terrain.
    pub seed: u64,
    pub water_level: f32,
    /// Water opacity in [0, 1].
    pub water_opacity: f32,
}

impl Default for TerrainConfig {
    fn default() -> Self {
        Self {
            size: 256.0,
            resolution: 128,
            max_height: 20.0,
            seed: 0,
            water_level: 2.0,
            water_opacity: 0.6,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MotionConfig {
    /// Units per second.
    pub speed: f32,
    /// Radians per second.
    pub turn_rate: f32,
}

impl Default for MotionConfig {
    fn default() -> Self {
        Self {
            speed: 5.0,
            turn_rate: 1.8,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    pub poll_interval_ms: u64,
    /// Edge length of one region, used for minimap percentages.
    pub region_span: f32,
    /// Maximum chat lines kept on the session view.
    pub chat_history: usize,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            poll_interval_ms: 2000,
            region_span: 256.0,
            chat_history: 100,
        }
    }
}

impl ViewerConfig {
    /// Load from `path`, or return defaults when the file does not exist.
    pub fn load_or_default(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        if !path.exists() {
            tracing::info!(path = %path.display(), "no config file, using defaults");
            return Ok(Self::default());
        }
        let text = std::fs::read_to_string(path)?;
        let config = Self::from_json(&text)?;
        tracing::info!(path = %path.display(), grid = %config.grid.name, "loaded configuration");
        Ok(config)
    }

    pub fn from_json(text: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    pub fn save(&self, path: impl AsRef<Path>) -> Result<(), ConfigError> {
        let text = serde_json::to_string_pretty(self)?;
        std::fs::write(path, text)?;
        Ok(())
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if !(1..=MAX_TERRAIN_RESOLUTION).contains(&self.terrain.resolution) {
            return Err(ConfigError::Invalid {
                key: "terrain.resolution",
                reason: format!("must be between 1 and {MAX_TERRAIN_RESOLUTION}"),
            });
        }
        if self.terrain.size <= 0.0 {
            return Err(ConfigError::Invalid {
                key: "terrain.size",
                reason: "must be positive".into(),
            });
        }
        if self.session.poll_interval_ms == 0 {
            return Err(ConfigError::Invalid {
                key: "session.poll_interval_ms",
                reason: "must be positive".into(),
            });
        }
        if self.session.region_span <= 0.0 {
            return Err(ConfigError::Invalid {
                key: "session.region_span",
                reason: "must be positive".into(),
            });
        }
        Ok(())
    }
}
