//! Cell Timeline - Frame model, filtering and playback for animated 3D point clouds.
//!
//! This crate is the core behind a time-lapse point cloud viewer (e.g. for
//! cell-tracking data). It decodes a compact per-frame text encoding,
//! keeps the decoded frames, and computes for every frame the exact ordered
//! list of points to draw, honoring cross-section cuts and per-category
//! visibility. Scene setup and drawing are left to a [`RenderAdapter`].
//!
//! # Architecture
//!
//! - `timeline`: Frame data model, text decoder and the owning [`FrameStore`]
//! - `filter`: Stateless [`VisibilityFilter`] producing [`VisiblePoint`]s
//! - `playback`: [`PlaybackController`] state machine for frame advancement
//! - `session`: [`ViewerSession`], the explicit state object wiring it all up
//! - `loader`: Dataset sources and shareable dataset references
//! - `schema`: Configuration types
//!
//! # Example
//!
//! ```rust
//! use cell_timeline::{CrossSectionMode, DatasetRef, ViewerConfig, ViewerSession};
//!
//! let mut session = ViewerSession::new(ViewerConfig::default()).unwrap();
//! session
//!     .load_text(DatasetRef::new("cells.csv").unwrap(), "2,1\n0,0,0,1\n1,1,1,2\n5,5,5,1\n")
//!     .unwrap();
//!
//! session.toggle_category(2).unwrap();
//! assert_eq!(session.visible_points().len(), 1);
//!
//! session.set_cross_section(CrossSectionMode::Horizontal);
//! session.play();
//! session.tick(100.0);
//! assert_eq!(session.current_frame(), 1);
//! ```

pub mod error;
pub mod filter;
pub mod loader;
pub mod playback;
pub mod schema;
pub mod session;
pub mod timeline;

// WebAssembly bindings (only for wasm32 target)
#[cfg(target_arch = "wasm32")]
pub mod wasm;

// Re-export commonly used types
pub use error::{Error, Result};
pub use filter::{RenderAdapter, VisibilityFilter, VisiblePoint};
pub use loader::{DatasetRef, DatasetSource, FetchError};
pub use playback::{PlaybackController, PlaybackStatus};
pub use schema::{CrossSectionMode, ViewerConfig};
pub use session::{LoadOutcome, LoadTicket, ViewerSession};
pub use timeline::{CategoryTable, Dataset, Frame, FrameStore, Timeline, parse};
