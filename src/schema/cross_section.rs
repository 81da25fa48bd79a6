//! Cross-section modes and the axis conventions behind them.

use serde::{Deserialize, Serialize};

/// Spatial half-space filter applied before display.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CrossSectionMode {
    /// Show every point.
    #[default]
    Full,
    /// Keep one half along the horizontal cut axis.
    Horizontal,
    /// Keep one half along the vertical cut axis.
    Vertical,
}

impl CrossSectionMode {
    /// All modes, in UI order.
    pub const ALL: [CrossSectionMode; 3] = [
        CrossSectionMode::Full,
        CrossSectionMode::Horizontal,
        CrossSectionMode::Vertical,
    ];

    /// Parse a mode from its lowercase name.
    pub fn from_name(name: &str) -> Option<Self> {
        match name.trim().to_ascii_lowercase().as_str() {
            "full" => Some(CrossSectionMode::Full),
            "horizontal" => Some(CrossSectionMode::Horizontal),
            "vertical" => Some(CrossSectionMode::Vertical),
            _ => None,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            CrossSectionMode::Full => "full",
            CrossSectionMode::Horizontal => "horizontal",
            CrossSectionMode::Vertical => "vertical",
        }
    }
}

/// Coordinate axis of a data point.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Axis {
    X,
    Y,
    Z,
}

impl Axis {
    #[inline]
    pub fn index(self) -> usize {
        match self {
            Axis::X => 0,
            Axis::Y => 1,
            Axis::Z => 2,
        }
    }
}

/// Which half of an axis survives the cut. The plane itself (coordinate 0) is kept.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HalfSpace {
    /// Keep `coord >= 0`.
    AtLeastZero,
    /// Keep `coord <= 0`.
    AtMostZero,
}

/// A single cut: axis plus the half that is kept.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CrossSectionRule {
    pub axis: Axis,
    pub keep: HalfSpace,
}

impl CrossSectionRule {
    /// Test whether a point survives this cut.
    #[inline]
    pub fn keeps(&self, position: &[f32; 3]) -> bool {
        let coord = position[self.axis.index()];
        match self.keep {
            HalfSpace::AtLeastZero => coord >= 0.0,
            HalfSpace::AtMostZero => coord <= 0.0,
        }
    }
}

/// Mode -> cut table. `Full` never filters and has no entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CrossSectionTable {
    pub horizontal: CrossSectionRule,
    pub vertical: CrossSectionRule,
}

impl Default for CrossSectionTable {
    fn default() -> Self {
        Self {
            horizontal: CrossSectionRule {
                axis: Axis::X,
                keep: HalfSpace::AtLeastZero,
            },
            vertical: CrossSectionRule {
                axis: Axis::Y,
                keep: HalfSpace::AtLeastZero,
            },
        }
    }
}

impl CrossSectionTable {
    /// Look up the cut for a mode.
    pub fn rule(&self, mode: CrossSectionMode) -> Option<CrossSectionRule> {
        match mode {
            CrossSectionMode::Full => None,
            CrossSectionMode::Horizontal => Some(self.horizontal),
            CrossSectionMode::Vertical => Some(self.vertical),
        }
    }

    /// Check whether a position passes the cut for `mode`.
    #[inline]
    pub fn keeps(&self, mode: CrossSectionMode, position: &[f32; 3]) -> bool {
        self.rule(mode).is_none_or(|rule| rule.keeps(position))
    }

    /// True when the two cuts use different axes.
    pub fn axes_distinct(&self) -> bool {
        self.horizontal.axis != self.vertical.axis
    }
}

/// Transform applied to emitted positions (never to the cut test).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DisplayTransform {
    /// Positions are emitted as stored.
    #[default]
    Identity,
    /// Quarter turn about X used by the browser viewer: (x, y, z) -> (-x, z, y).
    QuarterTurnX,
}

impl DisplayTransform {
    #[inline]
    pub fn apply(self, [x, y, z]: [f32; 3]) -> [f32; 3] {
        match self {
            DisplayTransform::Identity => [x, y, z],
            DisplayTransform::QuarterTurnX => [-x, z, y],
        }
    }
}
