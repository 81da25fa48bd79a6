//! Crate-level error type.

use thiserror::Error;

use crate::loader::FetchError;
use crate::playback::PlaybackError;
use crate::schema::ConfigError;
use crate::timeline::{FormatError, RangeError};

/// Any failure surfaced by the viewer core.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum Error {
    #[error("Malformed dataset: {0}")]
    Format(#[from] FormatError),

    #[error("Could not fetch dataset: {0}")]
    Fetch(#[from] FetchError),

    #[error(transparent)]
    Range(#[from] RangeError),

    #[error(transparent)]
    Playback(#[from] PlaybackError),

    #[error("Invalid configuration: {0}")]
    Config(#[from] ConfigError),
}

/// Result type alias for viewer operations.
pub type Result<T> = std::result::Result<T, Error>;
