//! JSON document describing a segmentation
//!
//! Every relationship is expressed through the stable crossroad/ring
//! ids, so a consumer can rebuild the hierarchy without re-deriving it.

use serde_json::{Value, json};

use crate::export::{ExportScope, scoped_crossroads};
use crate::model::{Crossroad, SegmentationResult, StreetGraph};

/// Renders the selected crossroads as one JSON document. With
/// `multiscale`, merged descendants are included as flat list entries
/// referencing their parent.
pub fn to_json(
    result: &SegmentationResult,
    graph: &StreetGraph,
    scope: ExportScope,
    multiscale: bool,
) -> Value {
    let crossroads: Vec<Value> = scoped_crossroads(result, scope, multiscale)
        .into_iter()
        .map(|c| crossroad_value(graph, c, multiscale))
        .collect();

    json!({
        "crossroads": crossroads,
        "main": result.main_crossroad().map(|c| c.id),
        "warnings": result.warnings(),
    })
}

fn crossroad_value(graph: &StreetGraph, crossroad: &Crossroad, multiscale: bool) -> Value {
    let nodes: Vec<i64> = crossroad
        .ring
        .nodes()
        .iter()
        .map(|n| graph.node(*n).id)
        .collect();
    let edges: Vec<[i64; 2]> = crossroad
        .ring
        .edges()
        .iter()
        .map(|e| {
            let (a, b) = graph.endpoints(*e);
            [graph.node(a).id, graph.node(b).id]
        })
        .collect();
    let branches: Vec<Value> = crossroad
        .branches
        .iter()
        .map(|branch| {
            json!({
                "bearing": branch.bearing,
                "name": branch.name,
                "nodes": branch
                    .nodes
                    .iter()
                    .map(|n| graph.node(*n).id)
                    .collect::<Vec<i64>>(),
            })
        })
        .collect();

    json!({
        "id": crossroad.id,
        "ring": {
            "id": crossroad.ring.id,
            "nodes": nodes,
            "edges": edges,
            "cycle": crossroad.ring.is_cycle(),
        },
        "scale_level": crossroad.scale_level,
        "coherence": crossroad.coherence,
        "state": crossroad.state,
        "parent": crossroad.parent,
        "children": if multiscale { Some(&crossroad.children) } else { None },
        "branches": branches,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::export::test_fixtures::twin_tees_result;

    #[test]
    fn ids_resolve_within_the_document() {
        let (graph, result) = twin_tees_result();
        let doc = to_json(&result, &graph, ExportScope::All, true);

        let crossroads = doc["crossroads"].as_array().unwrap();
        assert_eq!(crossroads.len(), 3);

        let ids: Vec<u64> = crossroads
            .iter()
            .map(|c| c["id"].as_u64().unwrap())
            .collect();
        for crossroad in crossroads {
            if let Some(parent) = crossroad["parent"].as_u64() {
                assert!(ids.contains(&parent), "dangling parent id {parent}");
            }
            for child in crossroad["children"].as_array().into_iter().flatten() {
                assert!(ids.contains(&child.as_u64().unwrap()));
            }
        }
        assert_eq!(doc["main"], json!(2));
    }

    #[test]
    fn roots_only_without_multiscale() {
        let (graph, result) = twin_tees_result();
        let doc = to_json(&result, &graph, ExportScope::All, false);
        let crossroads = doc["crossroads"].as_array().unwrap();
        assert_eq!(crossroads.len(), 1);
        assert_eq!(crossroads[0]["scale_level"], json!(1));
        assert!(crossroads[0]["children"].is_null());
    }

    #[test]
    fn ring_nodes_are_osm_ids() {
        let (graph, result) = twin_tees_result();
        let doc = to_json(&result, &graph, ExportScope::Main, false);
        let nodes = doc["crossroads"][0]["ring"]["nodes"].as_array().unwrap();
        let ids: Vec<i64> = nodes.iter().map(|n| n.as_i64().unwrap()).collect();
        assert_eq!(ids, vec![1, 2]);
    }
}
