//! Crossroad construction: branch tracing and coherence scoring

use itertools::Itertools;
use petgraph::graph::{EdgeIndex, NodeIndex};

use crate::model::{
    Branch, Crossroad, CrossroadId, CrossroadState, ElementKind, Ring, StreetGraph, components,
};
use crate::segmentation::SegmentationParams;

/// Relative weights of the coherence score terms. They sum to the
/// maximal possible score, so defaults keep it within `[0, 1]`.
#[derive(Debug, Clone)]
pub struct CoherenceWeights {
    /// Favors small ring bodies.
    pub compactness: f64,
    /// Favors evenly spread branch directions.
    pub regularity: f64,
    /// Favors rings whose edges are classified as crossing interior.
    pub homogeneity: f64,
}

impl Default for CoherenceWeights {
    fn default() -> Self {
        Self {
            compactness: 0.4,
            regularity: 0.3,
            homogeneity: 0.3,
        }
    }
}

/// Materializes one crossroad per ring, scale level 0, state Active.
pub fn build_crossroads(
    graph: &StreetGraph,
    rings: Vec<Ring>,
    params: &SegmentationParams,
) -> Vec<Crossroad> {
    rings
        .into_iter()
        .enumerate()
        .map(|(i, ring)| {
            let branches = trace_branches(graph, &ring);
            let coherence = coherence_score(graph, &ring, &branches, params);
            Crossroad {
                id: CrossroadId(i),
                ring,
                branches,
                scale_level: 0,
                coherence,
                state: CrossroadState::Active,
                parent: None,
                children: Vec::new(),
            }
        })
        .collect()
}

/// Traces every street leaving the ring body outward to its first
/// bifurcation or dead end. Deterministic given the ring and the
/// classified graph.
pub(crate) fn trace_branches(graph: &StreetGraph, ring: &Ring) -> Vec<Branch> {
    let mut branches = Vec::new();
    for &attachment in ring.nodes() {
        let mut outgoing: Vec<(NodeIndex, EdgeIndex)> = graph
            .incident_edges(attachment)
            .filter(|e| !ring.contains_edge(*e))
            .filter(|e| graph.edge(*e).kind != ElementKind::Sidewalk)
            .map(|e| (graph.opposite(attachment, e), e))
            .collect();
        outgoing.sort_unstable();

        for (first_hop, first_edge) in outgoing {
            // An edge straight into another body node is a chord, not
            // an approach street.
            if ring.contains_node(first_hop) {
                continue;
            }
            branches.push(trace_one(graph, ring, attachment, first_hop, first_edge));
        }
    }
    branches
}

fn trace_one(
    graph: &StreetGraph,
    ring: &Ring,
    attachment: NodeIndex,
    first_hop: NodeIndex,
    first_edge: EdgeIndex,
) -> Branch {
    let mut nodes = vec![attachment, first_hop];
    let mut edges = vec![first_edge];

    let mut previous = attachment;
    let mut current = first_hop;
    // Follow the polyline while it stays an undivided street.
    while graph.degree(current) == 2 && !ring.contains_node(current) {
        let Some((next, via)) = graph
            .incident_edges(current)
            .map(|e| (graph.opposite(current, e), e))
            .find(|(n, _)| *n != previous)
        else {
            break;
        };
        if nodes.contains(&next) {
            // The street loops back on itself.
            break;
        }
        nodes.push(next);
        edges.push(via);
        previous = current;
        current = next;
    }

    let name = graph
        .edge(first_edge)
        .tags
        .get(components::NAME)
        .map(str::to_owned);
    Branch {
        attachment,
        bearing: graph.bearing(attachment, first_hop),
        nodes,
        edges,
        name,
    }
}

/// Compactness/coherence of a crossroad in `[0, 1]`, the quantity the
/// merger compares against its thresholds.
pub(crate) fn coherence_score(
    graph: &StreetGraph,
    ring: &Ring,
    branches: &[Branch],
    params: &SegmentationParams,
) -> f64 {
    let weights = &params.coherence;
    let bound = params.ring_search.max_cycle_elements.max(1);

    let compactness = 1.0 - (ring.len() - 1) as f64 / bound as f64;
    let compactness = compactness.clamp(0.0, 1.0);

    let regularity = branch_regularity(branches);

    let homogeneity = if ring.edges().is_empty() {
        1.0
    } else {
        let interior = ring
            .edges()
            .iter()
            .filter(|e| graph.edge(**e).kind.is_crossroad_candidate())
            .count();
        interior as f64 / ring.edges().len() as f64
    };

    (weights.compactness * compactness
        + weights.regularity * regularity
        + weights.homogeneity * homogeneity)
        .clamp(0.0, 1.0)
}

/// How evenly the branch bearings cover the circle: 1.0 for a perfectly
/// regular star, approaching 0.0 when all approaches bunch together.
fn branch_regularity(branches: &[Branch]) -> f64 {
    match branches.len() {
        0 => 0.0,
        // A single approach cannot be regular; score it low so that
        // degenerate single-branch crossroads lose merge comparisons.
        1 => 0.25,
        n => {
            let mean_gap = 360.0 / n as f64;
            let deviation: f64 = branches
                .iter()
                .map(|b| b.bearing)
                .sorted_by(f64::total_cmp)
                .circular_tuple_windows()
                .map(|(a, b)| ((b - a).rem_euclid(360.0) - mean_gap).abs())
                .sum();
            let worst = 2.0 * (360.0 - mean_gap);
            (1.0 - deviation / worst).clamp(0.0, 1.0)
        }
    }
}
