//! Crossroad segmentation pipeline
//!
//! Classification, ring detection, crossroad construction and the
//! multiscale merge, wired together behind [`segment`]. Each query is
//! single-threaded and deterministic; [`segment_many`] runs independent
//! queries in parallel, one private graph per query.

mod builder;
mod classify;
mod merge;
mod rings;

use geo::{Distance, Haversine, Point};
use log::{info, warn};
use rayon::prelude::*;

pub use builder::{CoherenceWeights, build_crossroads};
pub use classify::{BoundaryDistances, ClassifierParams, ClassifyOutcome, classify};
pub use rings::{RingSearchParams, detect_rings};

use crate::Error;
use crate::model::{Crossroad, CrossroadId, SegmentationResult, StreetGraph, Warning};

/// Parameters of one segmentation query.
#[derive(Debug, Clone)]
pub struct SegmentationParams {
    /// Query anchor (lng, lat); the root crossroad nearest to it is
    /// reported as the main one.
    pub anchor: Point<f64>,
    /// Creation threshold: minimal combined coherence for fusing two
    /// crossroads into a new scale level.
    pub c0: f64,
    /// Merge threshold: minimal branch-overlap score for absorbing a
    /// neighbor along a shared street.
    pub c1: f64,
    /// Absorption threshold: minimal adjacency score for folding a
    /// small crossroad into a larger one.
    pub c2: f64,
    /// Maximal length in meters of a crossing-interior edge linking two
    /// crossroads considered part of one larger crossroad.
    pub link_reach_m: f64,
    pub classifier: ClassifierParams,
    pub ring_search: RingSearchParams,
    pub coherence: CoherenceWeights,
}

impl Default for SegmentationParams {
    fn default() -> Self {
        Self {
            anchor: Point::new(0.0, 0.0),
            c0: 0.5,
            c1: 0.6,
            c2: 0.25,
            link_reach_m: 30.0,
            classifier: ClassifierParams::default(),
            ring_search: RingSearchParams::default(),
            coherence: CoherenceWeights::default(),
        }
    }
}

/// Runs the full segmentation over a street graph.
///
/// Classification state on the graph is overwritten. An empty region is
/// not an error: the result carries [`Warning::EmptyResult`] and an
/// empty forest.
///
/// # Errors
///
/// Only the ring search can fail, with [`Error::RingSearchOverflow`]
/// on pathological inputs.
pub fn segment(
    graph: &mut StreetGraph,
    params: &SegmentationParams,
) -> Result<SegmentationResult, Error> {
    info!(
        "Segmenting street graph: {} nodes, {} edges",
        graph.node_count(),
        graph.edge_count()
    );

    let mut warnings = Vec::new();
    let outcome = classify(graph, &params.classifier);
    if !outcome.converged {
        warn!(
            "classification did not converge within {} iterations",
            params.classifier.max_iterations
        );
        warnings.push(Warning::ClassifierDidNotConverge);
    }

    let rings = detect_rings(graph, &params.ring_search)?;
    if rings.is_empty() {
        warn!("no candidate rings found in the region");
        warnings.push(Warning::EmptyResult);
        return Ok(SegmentationResult::empty(warnings));
    }

    let mut crossroads = build_crossroads(graph, rings, params);
    merge::merge_multiscale(graph, &mut crossroads, params);

    let main = main_crossroad(graph, &crossroads, params.anchor);
    let roots = crossroads.iter().filter(|c| c.parent.is_none()).count();
    info!(
        "Segmentation finished: {} crossroad(s), {roots} root(s)",
        crossroads.len()
    );
    Ok(SegmentationResult::new(crossroads, main, warnings))
}

/// Runs independent queries in parallel. Each job owns its graph, so
/// queries cannot observe each other's classification state.
pub fn segment_many(
    jobs: Vec<(StreetGraph, SegmentationParams)>,
) -> Vec<Result<SegmentationResult, Error>> {
    jobs.into_par_iter()
        .map(|(mut graph, params)| segment(&mut graph, &params))
        .collect()
}

/// The root crossroad whose body lies nearest to the anchor. Prefers
/// the root containing the graph node the anchor snaps to; falls back
/// to the smallest body distance.
fn main_crossroad(
    graph: &StreetGraph,
    crossroads: &[Crossroad],
    anchor: Point<f64>,
) -> Option<CrossroadId> {
    let roots: Vec<&Crossroad> = crossroads.iter().filter(|c| c.parent.is_none()).collect();
    if roots.is_empty() {
        return None;
    }

    if let Some((snapped, _)) = graph.nearest_node(&anchor) {
        if let Some(root) = roots.iter().find(|c| c.ring.contains_node(snapped)) {
            return Some(root.id);
        }
    }

    roots
        .iter()
        .min_by(|a, b| {
            let da = body_distance(graph, a, anchor);
            let db = body_distance(graph, b, anchor);
            da.total_cmp(&db).then(a.id.cmp(&b.id))
        })
        .map(|c| c.id)
}

fn body_distance(graph: &StreetGraph, crossroad: &Crossroad, anchor: Point<f64>) -> f64 {
    crossroad
        .ring
        .nodes()
        .iter()
        .map(|n| Haversine.distance(anchor, graph.node(*n).geometry))
        .fold(f64::INFINITY, f64::min)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::loading::{GraphConfig, RawEdge, RawNode, RawStreetGraph, build_street_graph};
    use crate::model::Tags;
    use crate::model::components::HIGHWAY;

    fn raw_node(id: i64, lng: f64, lat: f64) -> RawNode {
        RawNode {
            id,
            lng,
            lat,
            tags: Tags::new(),
        }
    }

    fn residential_edge(from: i64, to: i64) -> RawEdge {
        RawEdge {
            from,
            to,
            geometry: Vec::new(),
            tags: [(HIGHWAY, "residential")].into_iter().collect(),
        }
    }

    /// Two separate "+" intersections ~100 m apart.
    fn two_plus_graph() -> StreetGraph {
        let mut nodes = Vec::new();
        let mut edges = Vec::new();
        for (base, cx) in [(10, 0.0), (20, 0.0009)] {
            nodes.push(raw_node(base, cx, 0.0));
            for (i, (dx, dy)) in [(0.0003, 0.0), (-0.0003, 0.0), (0.0, 0.0003), (0.0, -0.0003)]
                .into_iter()
                .enumerate()
            {
                nodes.push(raw_node(base + i as i64 + 1, cx + dx, dy));
                edges.push(residential_edge(base, base + i as i64 + 1));
            }
        }
        // Long connecting street between the two centers.
        edges.push(residential_edge(11, 22));
        build_street_graph(RawStreetGraph { nodes, edges }, &GraphConfig::default()).unwrap()
    }

    #[test]
    fn main_crossroad_tracks_the_anchor() {
        let mut graph = two_plus_graph();
        let far_anchor = SegmentationParams {
            anchor: Point::new(0.0009, 0.0),
            ..SegmentationParams::default()
        };
        let result = segment(&mut graph, &far_anchor).unwrap();
        let main = result.main_crossroad().expect("main crossroad");
        let center = main.ring.nodes()[0];
        assert_eq!(graph.node(center).id, 20);
    }

    #[test]
    fn segment_many_matches_sequential_runs() {
        let params = SegmentationParams::default();
        let jobs: Vec<_> = (0..4)
            .map(|_| (two_plus_graph(), params.clone()))
            .collect();
        let parallel = segment_many(jobs);

        let mut graph = two_plus_graph();
        let sequential = segment(&mut graph, &params).unwrap();
        for result in parallel {
            let result = result.unwrap();
            assert_eq!(result.len(), sequential.len());
            assert_eq!(result.roots().count(), sequential.roots().count());
        }
    }
}
