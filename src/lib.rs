//! Multiscale segmentation of street-network crossroads.
//!
//! `crossway` consumes an in-memory street graph (nodes with coordinates
//! and OSM tags, edges with geometry and tags) and derives a hierarchical
//! segmentation of the intersections around a query anchor: elements are
//! classified into semantic regions, elementary rings are detected as
//! candidate crossroads, and adjacent crossroads are iteratively merged
//! into larger ones until no merge passes the configured thresholds.
//!
//! The crate performs no I/O: fetching map data, rendering and
//! persistence are left to the caller. See [`segmentation::segment`] for
//! the pipeline entry point and [`export`] for the in-memory renderers.

pub mod error;
pub mod export;
pub mod loading;
pub mod model;
pub mod prelude;
pub mod segmentation;

pub use error::Error;

/// OSM identifier of a street graph node.
pub type OsmNodeId = i64;

/// Depth of a crossroad in the multiscale hierarchy. Elementary
/// crossroads sit at level 0; every merge adds one level.
pub type ScaleLevel = u8;
