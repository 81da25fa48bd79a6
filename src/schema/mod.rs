//! Schema module - Configuration types for the viewer core.

mod config;
mod cross_section;

pub use config::*;
pub use cross_section::*;
