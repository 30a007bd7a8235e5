//! Core of `taiga-stats`.
//!
//! Turns tracker state into persisted and derived views:
//! - [`status`]: project-wide status ordering and selection
//! - [`snapshot`]: append-only daily snapshot files, one per tag filter
//! - [`series`]: stacked cumulative series and the ideal pace projection
//! - [`deps`]: dependency graph extraction and DOT output
//! - [`chart`]: SVG rendering of a series
//!
//! Nothing here reads configuration or talks to the network; callers pass
//! plain values in.

#![deny(clippy::print_stdout, clippy::print_stderr)]

pub mod chart;
pub mod deps;
pub mod error;
pub mod item;
pub mod series;
pub mod snapshot;
pub mod status;
pub mod summary;

pub use chart::{ChartAnnotation, ChartOptions, collect_annotations, render_svg};
pub use deps::{AttributeDef, DependencyGraph, GraphOptions, find_attribute};
pub use error::{ErrorCategory, Result, StatsError};
pub use item::{Item, TAG_WILDCARD, TagFilter, select_items};
pub use series::{IdealPace, IdealPaceLine, PaceWarning, SeriesMatrix, compute_ideal_pace};
pub use snapshot::{NO_ANNOTATION, SnapshotRow, SnapshotStore, SnapshotTable, write_atomic};
pub use status::{Status, StatusCatalog, StatusId};

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
