//! GeoJSON rendering of ring and branch geometries

use geo::{Coord, LineString, Point, Polygon};
use geojson::{Feature, FeatureCollection, Geometry, Value as GeoJsonValue};
use serde_json::json;

use crate::Error;
use crate::export::{ExportScope, scoped_roots};
use crate::model::{Branch, Crossroad, SegmentationResult, StreetGraph};

/// Renders the selected root crossroads as a `FeatureCollection`: one
/// feature per ring body and one per branch, carrying the ids and the
/// classification properties.
pub fn to_geojson(
    result: &SegmentationResult,
    graph: &StreetGraph,
    scope: ExportScope,
) -> Result<FeatureCollection, Error> {
    let mut features = Vec::new();
    for crossroad in scoped_roots(result, scope) {
        features.push(ring_feature(graph, crossroad)?);
        for branch in &crossroad.branches {
            features.push(branch_feature(graph, crossroad, branch)?);
        }
    }
    Ok(FeatureCollection {
        features,
        bbox: None,
        foreign_members: None,
    })
}

fn ring_feature(graph: &StreetGraph, crossroad: &Crossroad) -> Result<Feature, Error> {
    let geometry = ring_geometry(graph, crossroad);
    let value = json!({
        "type": "Feature",
        "geometry": geometry,
        "properties": {
            "kind": "crossroad",
            "crossroad_id": crossroad.id,
            "ring_id": crossroad.ring.id,
            "scale_level": crossroad.scale_level,
            "coherence": crossroad.coherence,
            "branches": crossroad.branches.len(),
        }
    });
    serde_json::from_value::<Feature>(value).map_err(|e| Error::GeoJsonError(e.to_string()))
}

fn ring_geometry(graph: &StreetGraph, crossroad: &Crossroad) -> Geometry {
    let ring = &crossroad.ring;
    if ring.is_cycle() {
        let mut coords: Vec<Coord<f64>> = ring
            .nodes()
            .iter()
            .map(|n| graph.node(*n).geometry.into())
            .collect();
        coords.push(coords[0]);
        let polygon = Polygon::new(LineString::new(coords), Vec::new());
        return Geometry::new(GeoJsonValue::from(&polygon));
    }
    if ring.len() == 1 {
        let point: Point<f64> = graph.node(ring.nodes()[0]).geometry;
        return Geometry::new(GeoJsonValue::from(&point));
    }
    // Non-cyclic cluster: render each body edge as its own line.
    let lines: Vec<LineString<f64>> = ring
        .edges()
        .iter()
        .map(|e| {
            let (a, b) = graph.endpoints(*e);
            LineString::new(vec![
                graph.node(a).geometry.into(),
                graph.node(b).geometry.into(),
            ])
        })
        .collect();
    Geometry::new(GeoJsonValue::from(&geo::MultiLineString::new(lines)))
}

fn branch_feature(
    graph: &StreetGraph,
    crossroad: &Crossroad,
    branch: &Branch,
) -> Result<Feature, Error> {
    let coords: Vec<Coord<f64>> = branch
        .nodes
        .iter()
        .map(|n| graph.node(*n).geometry.into())
        .collect();
    let geometry = Geometry::new(GeoJsonValue::from(&LineString::new(coords)));
    let value = json!({
        "type": "Feature",
        "geometry": geometry,
        "properties": {
            "kind": "branch",
            "crossroad_id": crossroad.id,
            "bearing": branch.bearing,
            "name": branch.name,
        }
    });
    serde_json::from_value::<Feature>(value).map_err(|e| Error::GeoJsonError(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::export::test_fixtures::twin_tees_result;

    #[test]
    fn one_feature_per_ring_and_branch() {
        let (graph, result) = twin_tees_result();
        let collection = to_geojson(&result, &graph, ExportScope::All).unwrap();

        let root = result.roots().next().unwrap();
        assert_eq!(collection.features.len(), 1 + root.branches.len());

        let kinds: Vec<&str> = collection
            .features
            .iter()
            .map(|f| {
                f.properties
                    .as_ref()
                    .and_then(|p| p.get("kind"))
                    .and_then(|k| k.as_str())
                    .unwrap()
            })
            .collect();
        assert_eq!(kinds.iter().filter(|k| **k == "crossroad").count(), 1);
        assert_eq!(
            kinds.iter().filter(|k| **k == "branch").count(),
            root.branches.len()
        );
    }

    #[test]
    fn branch_features_carry_geometry() {
        let (graph, result) = twin_tees_result();
        let collection = to_geojson(&result, &graph, ExportScope::Main).unwrap();
        for feature in &collection.features {
            assert!(feature.geometry.is_some());
        }
    }
}
