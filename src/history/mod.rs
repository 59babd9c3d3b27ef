//! Feature history data model.
//!
//! - [`types`]: point versions, major versions, validity windows, reconstructed geometries
//! - [`tags`]: attribute snapshots folded from per-version diffs

pub mod tags;
pub mod types;

pub use tags::{Attributes, TagDiffAccumulator};
pub use types::*;
