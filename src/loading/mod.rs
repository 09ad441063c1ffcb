//! Builds a classified-ready street graph from raw in-memory input.
//!
//! Fetching and caching of map data is the caller's concern; this
//! module only validates raw elements and assembles the [`StreetGraph`]
//! the segmentation operates on.

mod builder;

pub use builder::{GraphConfig, RawEdge, RawNode, RawStreetGraph, build_street_graph};
