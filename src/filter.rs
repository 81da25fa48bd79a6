//! Visibility filtering: which points of a frame are displayed, and in what color.

use serde::Serialize;

use crate::schema::{CrossSectionMode, CrossSectionTable, DisplayTransform, PointStyle, ViewerConfig};
use crate::timeline::{CategoryId, Frame, VisibilitySet};

/// A point that survived filtering.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct VisiblePoint {
    /// Display position (after the display transform).
    pub position: [f32; 3],
    /// Category driving the color, `None` when category coloring is off.
    pub category: Option<CategoryId>,
    /// 0xRRGGBB color.
    pub color: u32,
}

impl VisiblePoint {
    /// Color as normalized RGB floats.
    pub fn color_rgb(&self) -> [f32; 3] {
        let channel = |shift: u32| ((self.color >> shift) & 0xFF) as f32 / 255.0;
        [channel(16), channel(8), channel(0)]
    }
}

/// Consumer of the per-frame point list (scene graph, GPU buffers, ...).
pub trait RenderAdapter {
    fn render(&mut self, points: &[VisiblePoint]);
}

/// Stateless point filter configured with cut axes, transform and colors.
#[derive(Debug, Clone, PartialEq)]
pub struct VisibilityFilter {
    cross_sections: CrossSectionTable,
    transform: DisplayTransform,
    style: PointStyle,
}

impl VisibilityFilter {
    /// Create a filter. `style.palette` must be non-empty.
    pub fn new(
        cross_sections: CrossSectionTable,
        transform: DisplayTransform,
        style: PointStyle,
    ) -> Self {
        Self {
            cross_sections,
            transform,
            style,
        }
    }

    /// Build from a validated config.
    pub fn from_config(config: &ViewerConfig) -> Self {
        Self::new(config.cross_sections, config.transform, config.style.clone())
    }

    pub fn style(&self) -> &PointStyle {
        &self.style
    }

    /// Category check first, then the cross-section cut.
    #[inline]
    fn passes(
        &self,
        position: &[f32; 3],
        category: CategoryId,
        mode: CrossSectionMode,
        visibility: &VisibilitySet,
    ) -> bool {
        visibility.is_visible(category) && self.cross_sections.keeps(mode, position)
    }

    /// Compute the ordered list of displayed points for a frame.
    ///
    /// Hidden categories and points outside the cross-section are dropped;
    /// survivors keep their original order.
    pub fn compute_visible(
        &self,
        frame: &Frame,
        mode: CrossSectionMode,
        visibility: &VisibilitySet,
        color_by_type: bool,
    ) -> Vec<VisiblePoint> {
        let mut out = Vec::with_capacity(frame.len());
        self.compute_visible_into(frame, mode, visibility, color_by_type, &mut out);
        out
    }

    /// Like [`compute_visible`](Self::compute_visible), reusing `out` (cleared first).
    pub fn compute_visible_into(
        &self,
        frame: &Frame,
        mode: CrossSectionMode,
        visibility: &VisibilitySet,
        color_by_type: bool,
        out: &mut Vec<VisiblePoint>,
    ) {
        out.clear();
        out.extend(
            frame
                .points()
                .filter(|&(position, category)| self.passes(position, category, mode, visibility))
                .map(|(position, category)| {
                    let (category, color) = if color_by_type {
                        (Some(category), self.style.category_color(category))
                    } else {
                        (None, self.style.neutral_color)
                    };
                    VisiblePoint {
                        position: self.transform.apply(*position),
                        category,
                        color,
                    }
                }),
        );
    }

    /// Number of points that would be displayed, without allocating.
    pub fn count_visible(
        &self,
        frame: &Frame,
        mode: CrossSectionMode,
        visibility: &VisibilitySet,
    ) -> usize {
        frame
            .points()
            .filter(|&(position, category)| self.passes(position, category, mode, visibility))
            .count()
    }
}

impl Default for VisibilityFilter {
    fn default() -> Self {
        Self::from_config(&ViewerConfig::default())
    }
}
