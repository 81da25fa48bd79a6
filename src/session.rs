//! Viewer session: the owned state object tying store, filter and playback together.
//!
//! Every host event (dataset load, tick, toggle, seek) goes through a
//! [`ViewerSession`] method taking `&mut self`, so state transitions are
//! serialized and a reader never observes a half-swapped dataset.
//!
//! Dataset loads are split in two so fetching never blocks ticks:
//!
//! ```rust
//! use cell_timeline::{DatasetRef, LoadOutcome, ViewerConfig, ViewerSession};
//!
//! let mut session = ViewerSession::new(ViewerConfig::default()).unwrap();
//! let first = session.begin_load(DatasetRef::new("a.csv").unwrap());
//! let second = session.begin_load(DatasetRef::new("b.csv").unwrap());
//!
//! // The older request completes last and is discarded.
//! let outcome = session.finish_load(&second, Ok("1\n0,0,0\n".to_string())).unwrap();
//! assert!(matches!(outcome, LoadOutcome::Loaded(_)));
//! let outcome = session.finish_load(&first, Ok("2\n0,0,0\n1,1,1\n".to_string())).unwrap();
//! assert_eq!(outcome, LoadOutcome::Stale);
//! assert_eq!(session.current_dataset().unwrap().name(), "b.csv");
//! ```

use serde::Serialize;

use crate::error::{Error, Result};
use crate::filter::{RenderAdapter, VisibilityFilter, VisiblePoint};
use crate::loader::{DatasetRef, DatasetSource, FetchError};
use crate::playback::{PlaybackController, PlaybackError, PlaybackStatus};
use crate::schema::{CrossSectionMode, ViewerConfig};
use crate::timeline::{CategoryId, FrameStore, RangeError, parse};

/// Handle for an outstanding dataset load.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoadTicket {
    pub generation: u64,
    pub dataset: DatasetRef,
}

/// Result of completing a load.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoadOutcome {
    /// The dataset was swapped in.
    Loaded(DatasetSummary),
    /// A newer load was requested meanwhile; the result was dropped.
    Stale,
}

/// Header facts about the loaded dataset.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DatasetSummary {
    pub name: String,
    pub total_frames: usize,
    pub max_points: usize,
    pub total_points: usize,
    pub has_category_data: bool,
    pub categories: usize,
}

/// One row of the category legend.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LegendEntry {
    pub id: CategoryId,
    pub name: String,
    pub visible: bool,
    pub color: u32,
}

/// Everything a UI needs to draw its controls.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ViewState {
    pub frame: usize,
    pub total_frames: usize,
    pub frame_label: String,
    pub status: PlaybackStatus,
    pub speed: f64,
    pub mode: CrossSectionMode,
    pub color_by_type: bool,
    pub can_color_by_type: bool,
    pub dataset: Option<String>,
    pub loading: Option<String>,
    pub error: Option<String>,
}

/// Explicit owned state for one viewer.
#[derive(Debug)]
pub struct ViewerSession {
    config: ViewerConfig,
    filter: VisibilityFilter,
    store: Option<FrameStore>,
    playback: PlaybackController,
    mode: CrossSectionMode,
    color_by_type: bool,
    current: Option<DatasetRef>,
    pending: Option<LoadTicket>,
    next_generation: u64,
    last_error: Option<Error>,
}

impl ViewerSession {
    /// Create an empty session. Fails if the config is invalid.
    pub fn new(config: ViewerConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            filter: VisibilityFilter::from_config(&config),
            playback: PlaybackController::new(&config.playback),
            config,
            store: None,
            mode: CrossSectionMode::default(),
            color_by_type: false,
            current: None,
            pending: None,
            next_generation: 0,
            last_error: None,
        })
    }

    pub fn config(&self) -> &ViewerConfig {
        &self.config
    }

    /// Dataset named by a location query, else the configured default.
    pub fn initial_dataset(&self, query: &str) -> Result<DatasetRef> {
        match DatasetRef::from_query(query) {
            Some(dataset) => Ok(dataset),
            None => Ok(DatasetRef::new(self.config.default_dataset.as_str())?),
        }
    }

    /// Start loading a dataset. Supersedes any load still in flight.
    pub fn begin_load(&mut self, dataset: DatasetRef) -> LoadTicket {
        self.next_generation += 1;
        if let Some(previous) = &self.pending {
            log::debug!(
                "Load of {} superseded by {}",
                previous.dataset,
                dataset
            );
        }
        let ticket = LoadTicket {
            generation: self.next_generation,
            dataset,
        };
        self.pending = Some(ticket.clone());
        ticket
    }

    /// Complete a load with the fetched text (or fetch failure).
    ///
    /// Results for superseded tickets are discarded. On failure the previous
    /// dataset stays active and the error is kept as [`last_error`](Self::last_error).
    pub fn finish_load(
        &mut self,
        ticket: &LoadTicket,
        fetched: std::result::Result<String, FetchError>,
    ) -> Result<LoadOutcome> {
        if self.pending.as_ref().map(|p| p.generation) != Some(ticket.generation) {
            log::warn!("Discarding stale load of {}", ticket.dataset);
            return Ok(LoadOutcome::Stale);
        }
        self.pending = None;

        let parsed = fetched
            .map_err(Error::from)
            .and_then(|text| parse(&text).map_err(Error::from));

        match parsed {
            Ok(dataset) => {
                match &mut self.store {
                    Some(store) => {
                        store.replace(dataset);
                    }
                    None => self.store = Some(FrameStore::new(dataset)),
                }
                self.current = Some(ticket.dataset.clone());
                self.last_error = None;
                self.color_by_type = false;

                let summary = self.summary().ok_or(RangeError::NoDataset)?;
                self.playback.load(summary.total_frames);
                log::info!(
                    "Loaded {}: {} frames, max {} points, category data: {}",
                    summary.name,
                    summary.total_frames,
                    summary.max_points,
                    summary.has_category_data
                );
                Ok(LoadOutcome::Loaded(summary))
            }
            Err(e) => {
                log::warn!("Failed to load {}: {}", ticket.dataset, e);
                self.last_error = Some(e.clone());
                Err(e)
            }
        }
    }

    /// Load synchronously from a source.
    pub fn load_from<S>(&mut self, source: &S, dataset: DatasetRef) -> Result<LoadOutcome>
    where
        S: DatasetSource + ?Sized,
    {
        let ticket = self.begin_load(dataset);
        let fetched = source.fetch(&ticket.dataset);
        self.finish_load(&ticket, fetched)
    }

    /// Load already-fetched text.
    pub fn load_text(&mut self, dataset: DatasetRef, text: &str) -> Result<LoadOutcome> {
        let ticket = self.begin_load(dataset);
        self.finish_load(&ticket, Ok(text.to_string()))
    }

    pub fn pending_load(&self) -> Option<&LoadTicket> {
        self.pending.as_ref()
    }

    /// The in-flight ticket with this generation, if it is still current.
    pub fn pending_ticket(&self, generation: u64) -> Option<LoadTicket> {
        self.pending
            .as_ref()
            .filter(|ticket| ticket.generation == generation)
            .cloned()
    }

    /// Most recent load failure, cleared by the next successful load.
    pub fn last_error(&self) -> Option<&Error> {
        self.last_error.as_ref()
    }

    pub fn clear_error(&mut self) {
        self.last_error = None;
    }

    pub fn current_dataset(&self) -> Option<&DatasetRef> {
        self.current.as_ref()
    }

    /// Shareable location query for the current dataset.
    pub fn location_query(&self) -> Option<String> {
        self.current.as_ref().map(DatasetRef::to_query)
    }

    pub fn store(&self) -> Option<&FrameStore> {
        self.store.as_ref()
    }

    pub fn summary(&self) -> Option<DatasetSummary> {
        let store = self.store.as_ref()?;
        let name = self.current.as_ref()?.name().to_string();
        Some(DatasetSummary {
            name,
            total_frames: store.total_frames(),
            max_points: store.max_points(),
            total_points: store.timeline().total_points(),
            has_category_data: store.has_category_data(),
            categories: store.categories().len(),
        })
    }

    pub fn play(&mut self) {
        self.playback.play();
    }

    pub fn pause(&mut self) {
        self.playback.pause();
    }

    pub fn reset(&mut self) {
        self.playback.reset();
    }

    /// Jump to a frame; fails outside `[0, total_frames)`.
    pub fn seek(&mut self, frame: usize) -> Result<()> {
        Ok(self.playback.seek(frame)?)
    }

    /// Set the speed multiplier, clamped to the configured range.
    ///
    /// Returns the speed actually applied.
    pub fn set_speed(&mut self, speed: f64) -> Result<f64> {
        if !(speed.is_finite() && speed > 0.0) {
            return Err(PlaybackError::InvalidSpeed(speed).into());
        }
        let speed = self.config.playback.clamp_speed(speed);
        self.playback.set_speed(speed)?;
        Ok(speed)
    }

    /// Host tick. Returns true when the displayed frame changed.
    pub fn tick(&mut self, now_ms: f64) -> bool {
        self.playback.tick(now_ms)
    }

    pub fn playback(&self) -> &PlaybackController {
        &self.playback
    }

    pub fn current_frame(&self) -> usize {
        self.playback.current_frame()
    }

    pub fn set_cross_section(&mut self, mode: CrossSectionMode) {
        self.mode = mode;
    }

    pub fn cross_section(&self) -> CrossSectionMode {
        self.mode
    }

    /// Request category coloring. Ignored while the dataset has no category column.
    pub fn set_color_by_type(&mut self, enabled: bool) {
        self.color_by_type = enabled;
    }

    /// Flip category coloring; returns the effective state.
    pub fn toggle_color_by_type(&mut self) -> bool {
        self.color_by_type = !self.color_by_type;
        self.color_by_type()
    }

    /// Whether category coloring is in effect.
    pub fn color_by_type(&self) -> bool {
        self.color_by_type && self.can_color_by_type()
    }

    pub fn can_color_by_type(&self) -> bool {
        self.store.as_ref().is_some_and(FrameStore::has_category_data)
    }

    /// Flip a category's visibility; returns the new state.
    pub fn toggle_category(&mut self, id: CategoryId) -> Result<bool> {
        let store = self.store.as_mut().ok_or(RangeError::NoDataset)?;
        Ok(store.toggle(id)?)
    }

    pub fn set_category_visible(&mut self, id: CategoryId, visible: bool) -> Result<()> {
        let store = self.store.as_mut().ok_or(RangeError::NoDataset)?;
        Ok(store.set_visible(id, visible)?)
    }

    /// Category legend with visibility and palette color.
    pub fn legend(&self) -> Vec<LegendEntry> {
        let Some(store) = &self.store else {
            return Vec::new();
        };
        let snapshot = store.snapshot();
        snapshot
            .categories
            .entries()
            .map(|(id, name)| LegendEntry {
                id,
                name: name.to_string(),
                visible: snapshot.visibility.is_visible(id),
                color: self.filter.style().category_color(id),
            })
            .collect()
    }

    /// Points to display for the current frame; empty before any load.
    pub fn visible_points(&self) -> Vec<VisiblePoint> {
        let mut out = Vec::new();
        self.visible_points_into(&mut out);
        out
    }

    /// Like [`visible_points`](Self::visible_points), reusing a buffer.
    pub fn visible_points_into(&self, out: &mut Vec<VisiblePoint>) {
        out.clear();
        let Some(store) = &self.store else {
            return;
        };
        let snapshot = store.snapshot();
        if let Ok(frame) = snapshot.timeline.frame(self.playback.current_frame()) {
            self.filter.compute_visible_into(
                frame,
                self.mode,
                snapshot.visibility,
                self.color_by_type(),
                out,
            );
        }
    }

    /// Hand the current frame's points to a renderer.
    pub fn render<R>(&self, adapter: &mut R)
    where
        R: RenderAdapter + ?Sized,
    {
        adapter.render(&self.visible_points());
    }

    pub fn view_state(&self) -> ViewState {
        ViewState {
            frame: self.playback.current_frame(),
            total_frames: self.playback.total_frames(),
            frame_label: self.playback.frame_label(),
            status: self.playback.status(),
            speed: self.playback.speed(),
            mode: self.mode,
            color_by_type: self.color_by_type(),
            can_color_by_type: self.can_color_by_type(),
            dataset: self.current.as_ref().map(|d| d.name().to_string()),
            loading: self.pending.as_ref().map(|t| t.dataset.name().to_string()),
            error: self.last_error.as_ref().map(ToString::to_string),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::loader::MemorySource;
    use crate::timeline::FormatError;

    const SAMPLE: &str = "2,1\n0,0,0,1\n1,1,1,2\n5,5,5,1\n";

    fn name(n: &str) -> DatasetRef {
        DatasetRef::new(n).unwrap()
    }

    fn loaded() -> ViewerSession {
        let mut session = ViewerSession::new(ViewerConfig::default()).unwrap();
        session.load_text(name("sample.csv"), SAMPLE).unwrap();
        session
    }

    #[derive(Default)]
    struct Recorder {
        frames: Vec<Vec<VisiblePoint>>,
    }

    impl RenderAdapter for Recorder {
        fn render(&mut self, points: &[VisiblePoint]) {
            self.frames.push(points.to_vec());
        }
    }

    #[test]
    fn test_empty_session() {
        let mut session = ViewerSession::new(ViewerConfig::default()).unwrap();
        assert!(session.visible_points().is_empty());
        assert!(session.legend().is_empty());
        assert!(session.summary().is_none());
        assert!(!session.tick(10_000.0));
        assert_eq!(session.toggle_category(1), Err(RangeError::NoDataset.into()));
        assert!(session.seek(0).is_err());
    }

    #[test]
    fn test_invalid_config() {
        let mut config = ViewerConfig::default();
        config.style.palette.clear();
        assert!(matches!(
            ViewerSession::new(config),
            Err(Error::Config(_))
        ));
    }

    #[test]
    fn test_load_and_filter() {
        let mut session = loaded();
        let summary = session.summary().unwrap();
        assert_eq!(summary.total_frames, 2);
        assert_eq!(summary.max_points, 2);
        assert_eq!(summary.total_points, 3);
        assert_eq!(session.visible_points().len(), 2);

        assert_eq!(session.toggle_category(2), Ok(false));
        let points = session.visible_points();
        assert_eq!(points.len(), 1);
        assert_eq!(points[0].position, [0.0, 0.0, 0.0]);
        assert_eq!(points[0].category, None);
    }

    #[test]
    fn test_visibility_persists_across_frames() {
        let mut session = loaded();
        session.set_category_visible(1, false).unwrap();
        session.seek(1).unwrap();
        assert!(session.visible_points().is_empty());
    }

    #[test]
    fn test_color_by_type_requires_category_data() {
        let mut session = loaded();
        assert!(session.toggle_color_by_type());
        assert_eq!(session.visible_points()[1].color, 0x228B22);

        session.load_text(name("plain.csv"), "1\n0,0,0\n").unwrap();
        assert!(!session.can_color_by_type());
        session.set_color_by_type(true);
        assert!(!session.color_by_type());
        assert_eq!(session.visible_points()[0].color, 0x888888);
    }

    #[test]
    fn test_reload_resets_state() {
        let mut session = loaded();
        session.set_category_visible(1, false).unwrap();
        session.set_color_by_type(true);
        session.set_cross_section(CrossSectionMode::Vertical);
        session.seek(1).unwrap();
        session.play();

        session.load_text(name("again.csv"), SAMPLE).unwrap();
        assert_eq!(session.current_frame(), 0);
        assert!(!session.playback().is_playing());
        assert!(!session.color_by_type());
        assert!(session.legend().iter().all(|e| e.visible));
        assert_eq!(session.cross_section(), CrossSectionMode::Vertical);
    }

    #[test]
    fn test_failed_load_keeps_dataset() {
        let mut session = loaded();
        session.seek(1).unwrap();

        let err = session.load_text(name("broken.csv"), "2,x\n").unwrap_err();
        assert!(matches!(err, Error::Format(FormatError::InvalidPointCount { .. })));
        assert_eq!(session.last_error(), Some(&err));
        assert_eq!(session.current_dataset(), Some(&name("sample.csv")));
        assert_eq!(session.current_frame(), 1);
        assert_eq!(session.visible_points().len(), 1);

        let source = MemorySource::new();
        let err = session.load_from(&source, name("gone.csv")).unwrap_err();
        assert_eq!(err, Error::Fetch(FetchError::NotFound("gone.csv".to_string())));
        assert!(session.view_state().error.is_some());

        session.load_text(name("ok.csv"), "1\n0,0,0\n").unwrap();
        assert!(session.last_error().is_none());
    }

    #[test]
    fn test_stale_load_discarded() {
        let mut session = loaded();
        let older = session.begin_load(name("older.csv"));
        let newer = session.begin_load(name("newer.csv"));
        assert_eq!(session.view_state().loading.as_deref(), Some("newer.csv"));

        // Old result arriving after the newer request is dropped, even on failure.
        assert_eq!(
            session.finish_load(&older, Err(FetchError::NotFound("older.csv".into()))),
            Ok(LoadOutcome::Stale)
        );
        assert!(session.last_error().is_none());
        assert_eq!(session.current_dataset(), Some(&name("sample.csv")));

        let outcome = session.finish_load(&newer, Ok("3\n0,0,0\n1,1,1\n2,2,2\n".into())).unwrap();
        assert!(matches!(outcome, LoadOutcome::Loaded(ref s) if s.total_points == 3));
        assert!(session.pending_load().is_none());

        // Completing the same ticket twice is also stale.
        assert_eq!(
            session.finish_load(&newer, Ok(SAMPLE.into())),
            Ok(LoadOutcome::Stale)
        );
        assert_eq!(session.summary().unwrap().total_frames, 1);
    }

    #[test]
    fn test_pending_ticket_keeps_requested_name() {
        let mut session = loaded();
        let older = session.begin_load(name("older.csv"));
        let newer = session.begin_load(name("newer.csv"));

        assert_eq!(session.pending_ticket(older.generation), None);
        let ticket = session.pending_ticket(newer.generation).unwrap();
        assert_eq!(ticket, newer);

        session.finish_load(&ticket, Ok("1\n0,0,0\n".into())).unwrap();
        assert_eq!(session.current_dataset(), Some(&name("newer.csv")));
        assert_eq!(session.pending_ticket(newer.generation), None);
    }

    #[test]
    fn test_failure_message_not_rewrapped() {
        let mut session = loaded();
        let ticket = session.begin_load(name("remote.csv"));
        let message = "Dataset \"remote.csv\" request failed with status 404";

        let err = session
            .finish_load(&ticket, Err(FetchError::Other(message.to_string())))
            .unwrap_err();
        let expected = format!("Could not fetch dataset: {message}");
        assert_eq!(err.to_string(), expected);
        assert_eq!(session.last_error(), Some(&err));
        assert_eq!(session.current_dataset(), Some(&name("sample.csv")));
    }

    #[test]
    fn test_ticks_continue_while_loading() {
        let mut session = loaded();
        session.play();
        let ticket = session.begin_load(name("next.csv"));
        assert!(session.tick(100.0));
        assert_eq!(session.current_frame(), 1);

        session.finish_load(&ticket, Ok("4\n0,0,0\n0,0,0\n0,0,0\n0,0,0\n".into())).unwrap();
        assert_eq!(session.current_frame(), 0);
        assert!(!session.tick(1_000.0));
    }

    #[test]
    fn test_speed_clamped() {
        let mut session = loaded();
        assert_eq!(session.set_speed(20.0), Ok(5.0));
        assert_eq!(session.set_speed(0.01), Ok(0.1));
        assert_eq!(
            session.set_speed(0.0),
            Err(PlaybackError::InvalidSpeed(0.0).into())
        );
        assert_eq!(session.playback().speed(), 0.1);
    }

    #[test]
    fn test_render_adapter() {
        let mut session = loaded();
        let mut recorder = Recorder::default();
        session.render(&mut recorder);
        session.play();
        if session.tick(100.0) {
            session.render(&mut recorder);
        }
        assert_eq!(recorder.frames.len(), 2);
        assert_eq!(recorder.frames[0].len(), 2);
        assert_eq!(recorder.frames[1].len(), 1);
    }

    #[test]
    fn test_legend_and_location() {
        let mut session = ViewerSession::new(ViewerConfig::default()).unwrap();
        session
            .load_text(name("named.csv"), "1\n1: Neuron, 2: Glia\n0,0,0,1\n")
            .unwrap();
        session.toggle_category(2).unwrap();

        let legend = session.legend();
        assert_eq!(legend.len(), 2);
        assert_eq!(legend[0].name, "Neuron");
        assert!(legend[0].visible);
        assert_eq!(legend[1].name, "Glia");
        assert!(!legend[1].visible);
        assert_eq!(legend[1].color, 0x228B22);

        assert_eq!(session.location_query().as_deref(), Some("dataset=named.csv"));
        assert_eq!(
            session.initial_dataset("?dataset=other.csv").unwrap().name(),
            "other.csv"
        );
        assert_eq!(session.initial_dataset("").unwrap().name(), "drosophila.csv");
    }

    #[test]
    fn test_view_state() {
        let mut session = loaded();
        session.seek(1).unwrap();
        let state = session.view_state();
        assert_eq!(state.frame_label, "2 / 2");
        assert_eq!(state.status, PlaybackStatus::Stopped);
        assert_eq!(state.dataset.as_deref(), Some("sample.csv"));
        assert!(state.can_color_by_type);
        assert!(state.loading.is_none());
    }
}
