//! In-memory renderers for downstream consumers
//!
//! Text, JSON and GeoJSON views over a [`SegmentationResult`]. All of
//! them return values instead of writing anywhere; persistence belongs
//! to the caller.

mod to_geojson;
mod to_json;
mod to_text;

pub use to_geojson::to_geojson;
pub use to_json::to_json;
pub use to_text::to_text;

use crate::model::{Crossroad, CrossroadId, SegmentationResult};

/// Which part of the forest to render.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExportScope {
    /// Every root crossroad in the region.
    All,
    /// Only the crossroad nearest the query anchor.
    Main,
}

/// Root crossroads selected by the scope, in id order.
fn scoped_roots<'a>(result: &'a SegmentationResult, scope: ExportScope) -> Vec<&'a Crossroad> {
    match scope {
        ExportScope::All => result.roots().collect(),
        ExportScope::Main => result.main_crossroad().into_iter().collect(),
    }
}

/// The scoped roots plus, with `multiscale`, all their descendants.
fn scoped_crossroads<'a>(
    result: &'a SegmentationResult,
    scope: ExportScope,
    multiscale: bool,
) -> Vec<&'a Crossroad> {
    let mut ids: Vec<CrossroadId> = scoped_roots(result, scope).iter().map(|c| c.id).collect();
    if multiscale {
        for root in scoped_roots(result, scope) {
            ids.extend(result.descendants(root.id));
        }
    }
    ids.sort_unstable();
    ids.dedup();
    ids.into_iter().map(|id| result.crossroad(id)).collect()
}

#[cfg(test)]
mod test_fixtures {
    use crate::loading::{GraphConfig, RawEdge, RawNode, RawStreetGraph, build_street_graph};
    use crate::model::{SegmentationResult, StreetGraph, Tags};
    use crate::segmentation::{SegmentationParams, segment};

    /// Twin 3-way intersections that merge into one scale-1 crossroad
    /// with two children; the shared fixture for exporter tests.
    pub(super) fn twin_tees_result() -> (StreetGraph, SegmentationResult) {
        let node = |id: i64, lng: f64, lat: f64| RawNode {
            id,
            lng,
            lat,
            tags: Tags::new(),
        };
        let edge = |from: i64, to: i64| RawEdge {
            from,
            to,
            geometry: Vec::new(),
            tags: [("highway", "residential"), ("name", "Test St")]
                .into_iter()
                .collect(),
        };
        let raw = RawStreetGraph {
            nodes: vec![
                node(1, 0.0, 0.0),
                node(2, 0.00005, 0.0),
                node(3, -0.0004, 0.0003),
                node(4, -0.0004, -0.0003),
                node(5, 0.00045, 0.0003),
                node(6, 0.00045, -0.0003),
            ],
            edges: vec![edge(1, 2), edge(1, 3), edge(1, 4), edge(2, 5), edge(2, 6)],
        };
        let mut graph = build_street_graph(raw, &GraphConfig::default()).unwrap();
        let result = segment(&mut graph, &SegmentationParams::default()).unwrap();
        (graph, result)
    }
}
