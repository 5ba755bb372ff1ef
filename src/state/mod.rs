//! The state tree: a single JSON mapping addressed by dot-paths.
//!
//! Paths are compiled once into [`StatePath`] values and the split form is
//! cached, so repeated string access does not re-parse.

mod operations;
mod path;

pub use operations::{lookup, write};
pub use path::{AsStatePath, PathCache, StatePath};
