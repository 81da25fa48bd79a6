//! Configuration types for the viewer core.

use serde::{Deserialize, Serialize};

use super::{CrossSectionTable, DisplayTransform};
use crate::loader::DatasetRef;

/// Default dataset shown on first load.
fn default_dataset() -> String {
    "drosophila.csv".to_string()
}

/// Top-level viewer configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ViewerConfig {
    /// Playback timing parameters.
    #[serde(default)]
    pub playback: PlaybackConfig,
    /// Point coloring.
    #[serde(default)]
    pub style: PointStyle,
    /// Axis conventions for the cross-section modes.
    #[serde(default)]
    pub cross_sections: CrossSectionTable,
    /// Transform applied to emitted positions.
    #[serde(default)]
    pub transform: DisplayTransform,
    /// Dataset loaded when no location reference names one.
    #[serde(default = "default_dataset")]
    pub default_dataset: String,
}

impl Default for ViewerConfig {
    fn default() -> Self {
        Self {
            playback: PlaybackConfig::default(),
            style: PointStyle::default(),
            cross_sections: CrossSectionTable::default(),
            transform: DisplayTransform::default(),
            default_dataset: default_dataset(),
        }
    }
}

/// Playback rate parameters.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PlaybackConfig {
    /// Base interval between frame advances at speed 1.0, in milliseconds.
    pub frame_interval_ms: f64,
    /// Speed multiplier after construction.
    pub default_speed: f64,
    /// Lower bound of the speed control.
    pub min_speed: f64,
    /// Upper bound of the speed control.
    pub max_speed: f64,
}

impl Default for PlaybackConfig {
    fn default() -> Self {
        Self {
            frame_interval_ms: 100.0,
            default_speed: 1.0,
            min_speed: 0.1,
            max_speed: 5.0,
        }
    }
}

impl PlaybackConfig {
    /// Clamp a requested speed into the configured range.
    pub fn clamp_speed(&self, speed: f64) -> f64 {
        speed.clamp(self.min_speed, self.max_speed)
    }
}

/// Colors used for emitted points, as 0xRRGGBB.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PointStyle {
    /// Per-category palette, indexed by `category % palette.len()`.
    pub palette: Vec<u32>,
    /// Color for every point when category coloring is off.
    pub neutral_color: u32,
}

impl Default for PointStyle {
    fn default() -> Self {
        Self {
            palette: vec![
                0x90EE90, // light green
                0x32CD32, // lime green
                0x228B22, // forest green
                0x006400, // dark green
                0x9ACD32, // yellow green
                0x00FF7F, // spring green
                0x00FA9A, // medium spring green
                0x98FB98, // pale green
                0x00FF00, // bright green
                0x7CFC00, // lawn green
            ],
            neutral_color: 0x888888,
        }
    }
}

impl PointStyle {
    /// Palette color for a category id.
    ///
    /// Callers must have validated that the palette is non-empty.
    #[inline]
    pub fn category_color(&self, category: u32) -> u32 {
        self.palette[category as usize % self.palette.len()]
    }
}

impl ViewerConfig {
    /// Validate configuration parameters.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let p = &self.playback;
        if !(p.frame_interval_ms.is_finite() && p.frame_interval_ms > 0.0) {
            return Err(ConfigError::InvalidFrameInterval(p.frame_interval_ms));
        }
        if !(p.min_speed.is_finite() && p.min_speed > 0.0)
            || !p.max_speed.is_finite()
            || p.min_speed > p.max_speed
        {
            return Err(ConfigError::InvalidSpeedRange {
                min: p.min_speed,
                max: p.max_speed,
            });
        }
        if !(p.min_speed..=p.max_speed).contains(&p.default_speed) {
            return Err(ConfigError::DefaultSpeedOutOfRange(p.default_speed));
        }
        if self.style.palette.is_empty() {
            return Err(ConfigError::EmptyPalette);
        }
        if let Some(&color) = self
            .style
            .palette
            .iter()
            .chain(std::iter::once(&self.style.neutral_color))
            .find(|&&c| c > 0xFF_FFFF)
        {
            return Err(ConfigError::InvalidColor(color));
        }
        if !self.cross_sections.axes_distinct() {
            return Err(ConfigError::SharedCrossSectionAxis);
        }
        if DatasetRef::new(self.default_dataset.as_str()).is_err() {
            return Err(ConfigError::InvalidDatasetName(self.default_dataset.clone()));
        }
        Ok(())
    }
}

/// Configuration validation errors.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ConfigError {
    #[error("Frame interval must be positive, got {0}")]
    InvalidFrameInterval(f64),
    #[error("Speed range [{min}, {max}] is invalid")]
    InvalidSpeedRange { min: f64, max: f64 },
    #[error("Default speed {0} lies outside the speed range")]
    DefaultSpeedOutOfRange(f64),
    #[error("Color palette must not be empty")]
    EmptyPalette,
    #[error("Color {0:#x} is not a 24-bit RGB value")]
    InvalidColor(u32),
    #[error("Horizontal and vertical cross-sections must cut different axes")]
    SharedCrossSectionAxis,
    #[error("Default dataset name {0:?} is not a valid dataset name")]
    InvalidDatasetName(String),
}
