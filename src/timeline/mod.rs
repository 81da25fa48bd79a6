//! Frame data model for time-varying point clouds.
//!
//! A dataset is a [`Timeline`] of [`Frame`]s plus a [`CategoryTable`] naming the
//! category ids that occur in it. Datasets are decoded from a compact text
//! encoding by [`parse`] and owned at runtime by a [`FrameStore`].
//!
//! # Text Encoding
//!
//! ```text
//! line 0:   p0,p1,...,p(N-1)            point count per frame, N frames
//! optional: id: name, id: name, ...     explicit category names
//! data:     x,y,z                       category defaults to 0
//!           x,y,z,categoryId
//! ```
//!
//! Data rows are consumed in frame order, `p_i` rows for frame `i`.

mod parser;
mod store;

use std::collections::{BTreeMap, BTreeSet};

pub use parser::{FormatError, parse};
pub use store::{FrameStore, Snapshot, VisibilitySet};

/// Integer label attached to each point (e.g. cell type).
pub type CategoryId = u32;

/// One time step: positions and the category of each point.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Frame {
    positions: Vec<[f32; 3]>,
    categories: Vec<CategoryId>,
}

impl Frame {
    /// Create an empty frame with room for `capacity` points.
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            positions: Vec::with_capacity(capacity),
            categories: Vec::with_capacity(capacity),
        }
    }

    /// Build a frame from (position, category) pairs.
    pub fn from_points<I>(points: I) -> Self
    where
        I: IntoIterator<Item = ([f32; 3], CategoryId)>,
    {
        let (positions, categories) = points.into_iter().unzip();
        Self {
            positions,
            categories,
        }
    }

    /// Append a point.
    #[inline]
    pub fn push(&mut self, position: [f32; 3], category: CategoryId) {
        self.positions.push(position);
        self.categories.push(category);
    }

    #[inline]
    pub fn positions(&self) -> &[[f32; 3]] {
        &self.positions
    }

    #[inline]
    pub fn categories(&self) -> &[CategoryId] {
        &self.categories
    }

    /// Number of points in the frame.
    #[inline]
    pub fn len(&self) -> usize {
        self.positions.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.positions.is_empty()
    }

    /// Iterate over (position, category) pairs in point order.
    pub fn points(&self) -> impl ExactSizeIterator<Item = (&[f32; 3], CategoryId)> + '_ {
        self.positions.iter().zip(self.categories.iter().copied())
    }
}

/// Ordered sequence of frames with derived metadata.
#[derive(Debug, Clone, PartialEq)]
pub struct Timeline {
    frames: Vec<Frame>,
    max_points: usize,
    has_category_data: bool,
}

impl Timeline {
    /// Create a timeline. Fails if `frames` is empty.
    pub fn new(frames: Vec<Frame>, has_category_data: bool) -> Result<Self, FormatError> {
        if frames.is_empty() {
            return Err(FormatError::EmptyHeader);
        }
        let max_points = frames.iter().map(Frame::len).max().unwrap_or(0);
        Ok(Self {
            frames,
            max_points,
            has_category_data,
        })
    }

    /// Number of frames (always at least 1).
    #[inline]
    pub fn total_frames(&self) -> usize {
        self.frames.len()
    }

    /// Largest point count of any frame.
    #[inline]
    pub fn max_points(&self) -> usize {
        self.max_points
    }

    /// Whether the data rows carried a category column.
    #[inline]
    pub fn has_category_data(&self) -> bool {
        self.has_category_data
    }

    /// Get a frame by index.
    pub fn frame(&self, index: usize) -> Result<&Frame, RangeError> {
        self.frames.get(index).ok_or(RangeError::Frame {
            index,
            total: self.frames.len(),
        })
    }

    pub fn frames(&self) -> &[Frame] {
        &self.frames
    }

    /// Total number of points across all frames.
    pub fn total_points(&self) -> usize {
        self.frames.iter().map(Frame::len).sum()
    }

    /// Every category id that occurs in any frame.
    pub fn observed_categories(&self) -> BTreeSet<CategoryId> {
        self.frames
            .iter()
            .flat_map(|f| f.categories().iter().copied())
            .collect()
    }
}

/// Display name for a category that was never declared.
pub fn synthesized_name(id: CategoryId) -> String {
    format!("Cell type {id}")
}

/// Category id -> display name, ordered by id.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CategoryTable {
    names: BTreeMap<CategoryId, String>,
}

impl CategoryTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace a name. Returns the previous name, if any.
    pub fn insert(&mut self, id: CategoryId, name: impl Into<String>) -> Option<String> {
        self.names.insert(id, name.into())
    }

    pub fn name(&self, id: CategoryId) -> Option<&str> {
        self.names.get(&id).map(String::as_str)
    }

    pub fn contains(&self, id: CategoryId) -> bool {
        self.names.contains_key(&id)
    }

    /// Give every id in `ids` without a name a synthesized one.
    pub fn fill_missing<I>(&mut self, ids: I)
    where
        I: IntoIterator<Item = CategoryId>,
    {
        for id in ids {
            self.names.entry(id).or_insert_with(|| synthesized_name(id));
        }
    }

    /// Entries in ascending id order, for legends.
    pub fn entries(&self) -> impl ExactSizeIterator<Item = (CategoryId, &str)> + '_ {
        self.names.iter().map(|(&id, name)| (id, name.as_str()))
    }

    pub fn ids(&self) -> impl Iterator<Item = CategoryId> + '_ {
        self.names.keys().copied()
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }
}

impl<S: Into<String>> FromIterator<(CategoryId, S)> for CategoryTable {
    fn from_iter<T: IntoIterator<Item = (CategoryId, S)>>(iter: T) -> Self {
        Self {
            names: iter.into_iter().map(|(id, n)| (id, n.into())).collect(),
        }
    }
}

/// A fully decoded dataset.
#[derive(Debug, Clone, PartialEq)]
pub struct Dataset {
    pub timeline: Timeline,
    pub categories: CategoryTable,
    /// Ids used anywhere in the data (a subset of the table's ids).
    pub observed_categories: BTreeSet<CategoryId>,
    /// Zero-based line on which data rows start (1, or 2 with a name header).
    pub data_start_line: usize,
}

impl Dataset {
    /// Assemble a dataset, naming every observed id that lacks a name.
    pub fn new(timeline: Timeline, mut categories: CategoryTable, data_start_line: usize) -> Self {
        let observed_categories = timeline.observed_categories();
        categories.fill_missing(observed_categories.iter().copied());
        Self {
            timeline,
            categories,
            observed_categories,
            data_start_line,
        }
    }
}

/// Index or id outside the valid range. Signals API misuse; callers clamp first.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RangeError {
    #[error("Frame index {index} out of range (total frames {total})")]
    Frame { index: usize, total: usize },
    #[error("Unknown category id {0}")]
    Category(CategoryId),
    #[error("No dataset is loaded")]
    NoDataset,
}
