//! Runtime owner of the loaded dataset and category visibility.

use std::collections::{BTreeMap, BTreeSet};

use super::{CategoryId, CategoryTable, Dataset, Frame, RangeError, Timeline};

/// Per-category visibility toggles. Ids without an entry are visible.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct VisibilitySet {
    visible: BTreeMap<CategoryId, bool>,
}

impl VisibilitySet {
    /// Every id in `ids` visible.
    pub fn all_visible<I>(ids: I) -> Self
    where
        I: IntoIterator<Item = CategoryId>,
    {
        ids.into_iter().map(|id| (id, true)).collect()
    }

    #[inline]
    pub fn is_visible(&self, id: CategoryId) -> bool {
        self.visible.get(&id).copied().unwrap_or(true)
    }

    pub fn set(&mut self, id: CategoryId, visible: bool) {
        self.visible.insert(id, visible);
    }

    /// Ids currently hidden, ascending.
    pub fn hidden(&self) -> impl Iterator<Item = CategoryId> + '_ {
        self.visible
            .iter()
            .filter(|&(_, &visible)| !visible)
            .map(|(&id, _)| id)
    }

    /// True when nothing is hidden.
    pub fn all_shown(&self) -> bool {
        self.visible.values().all(|&v| v)
    }
}

impl FromIterator<(CategoryId, bool)> for VisibilitySet {
    fn from_iter<T: IntoIterator<Item = (CategoryId, bool)>>(iter: T) -> Self {
        Self {
            visible: iter.into_iter().collect(),
        }
    }
}

/// Consistent read-only view of one loaded dataset and its visibility.
#[derive(Debug, Clone, Copy)]
pub struct Snapshot<'a> {
    pub timeline: &'a Timeline,
    pub categories: &'a CategoryTable,
    pub visibility: &'a VisibilitySet,
}

/// Owns the current dataset and the visibility set derived from it.
///
/// Dataset and visibility only change together through [`FrameStore::replace`],
/// and readers go through a [`Snapshot`] borrowing both at once.
#[derive(Debug, Clone)]
pub struct FrameStore {
    dataset: Dataset,
    visibility: VisibilitySet,
}

impl FrameStore {
    pub fn new(dataset: Dataset) -> Self {
        let visibility = VisibilitySet::all_visible(dataset.categories.ids());
        Self {
            dataset,
            visibility,
        }
    }

    /// Swap in a new dataset, resetting visibility to all shown.
    ///
    /// Returns the previous dataset.
    pub fn replace(&mut self, dataset: Dataset) -> Dataset {
        let visibility = VisibilitySet::all_visible(dataset.categories.ids());
        self.visibility = visibility;
        std::mem::replace(&mut self.dataset, dataset)
    }

    pub fn snapshot(&self) -> Snapshot<'_> {
        Snapshot {
            timeline: &self.dataset.timeline,
            categories: &self.dataset.categories,
            visibility: &self.visibility,
        }
    }

    pub fn dataset(&self) -> &Dataset {
        &self.dataset
    }

    pub fn timeline(&self) -> &Timeline {
        &self.dataset.timeline
    }

    pub fn categories(&self) -> &CategoryTable {
        &self.dataset.categories
    }

    pub fn visibility(&self) -> &VisibilitySet {
        &self.visibility
    }

    /// Get a frame, failing for indices outside `[0, total_frames)`.
    pub fn frame(&self, index: usize) -> Result<&Frame, RangeError> {
        self.dataset.timeline.frame(index)
    }

    pub fn total_frames(&self) -> usize {
        self.dataset.timeline.total_frames()
    }

    pub fn max_points(&self) -> usize {
        self.dataset.timeline.max_points()
    }

    pub fn has_category_data(&self) -> bool {
        self.dataset.timeline.has_category_data()
    }

    pub fn category_name(&self, id: CategoryId) -> Result<&str, RangeError> {
        self.dataset
            .categories
            .name(id)
            .ok_or(RangeError::Category(id))
    }

    /// Ids used anywhere in the data, not just declared ones.
    pub fn all_category_ids(&self) -> &BTreeSet<CategoryId> {
        &self.dataset.observed_categories
    }

    pub fn is_visible(&self, id: CategoryId) -> bool {
        self.visibility.is_visible(id)
    }

    /// Show or hide a category known to the table.
    pub fn set_visible(&mut self, id: CategoryId, visible: bool) -> Result<(), RangeError> {
        if !self.dataset.categories.contains(id) {
            return Err(RangeError::Category(id));
        }
        self.visibility.set(id, visible);
        Ok(())
    }

    /// Flip a category's visibility; returns the new state.
    pub fn toggle(&mut self, id: CategoryId) -> Result<bool, RangeError> {
        let visible = !self.visibility.is_visible(id);
        self.set_visible(id, visible)?;
        Ok(visible)
    }
}
