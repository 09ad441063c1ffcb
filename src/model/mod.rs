//! Data model for crossroad segmentation
//!
//! Contains the street graph wrapper and the entities produced by the
//! segmentation: rings, branches, crossroads and the result forest.

pub mod components;
pub mod crossroad;
pub mod network;

pub use components::{ElementKind, StreetEdge, StreetNode, Tags};
pub use crossroad::{
    Branch, Crossroad, CrossroadId, CrossroadState, Ring, RingId, SegmentationResult, Warning,
};
pub use network::{IndexedPoint, StreetGraph};
