// Re-export of the main API surface

pub use crate::error::Error;
pub use crate::export::{ExportScope, to_geojson, to_json, to_text};
pub use crate::loading::{GraphConfig, RawEdge, RawNode, RawStreetGraph, build_street_graph};
pub use crate::model::{
    Branch, Crossroad, CrossroadId, CrossroadState, ElementKind, Ring, RingId, SegmentationResult,
    StreetEdge, StreetGraph, StreetNode, Tags, Warning,
};
pub use crate::segmentation::{
    ClassifierParams, RingSearchParams, SegmentationParams, segment, segment_many,
};

pub use crate::{OsmNodeId, ScaleLevel};
