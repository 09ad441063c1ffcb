//! Region classifier: a bounded label-propagation pass
//!
//! Assigns an [`ElementKind`] to every node and edge from OSM tags,
//! local geometry and topology. Rules only upgrade `Unknown` elements,
//! so the pass is monotone; the iteration cap is a guard against
//! pathological inputs and is reported through the outcome instead of
//! looping forever.

use std::collections::BTreeMap;

use log::{debug, trace};

use crate::model::{ElementKind, StreetGraph, components};

/// Per-highway-class distance bounds in meters.
///
/// The values mirror how far a crossing body is allowed to extend along
/// a street of the given class; larger roads produce larger crossings.
#[derive(Debug, Clone)]
pub struct BoundaryDistances {
    classes: BTreeMap<String, f64>,
    pub default: f64,
}

impl BoundaryDistances {
    pub fn new(default: f64) -> Self {
        Self {
            classes: BTreeMap::new(),
            default,
        }
    }

    pub fn set(&mut self, class: impl Into<String>, meters: f64) {
        self.classes.insert(class.into(), meters);
    }

    pub fn get(&self, class: Option<&str>) -> f64 {
        class
            .and_then(|c| self.classes.get(c))
            .copied()
            .unwrap_or(self.default)
    }

    /// Upper bound on crossing-body extent per highway class.
    pub fn crossing_max() -> Self {
        let mut distances = Self::new(25.0);
        for (class, meters) in [
            ("motorway", 100.0),
            ("trunk", 100.0),
            ("primary", 80.0),
            ("secondary", 80.0),
            ("tertiary", 50.0),
            ("unclassified", 30.0),
            ("residential", 30.0),
            ("living_street", 25.0),
            ("service", 25.0),
        ] {
            distances.set(class, meters);
        }
        distances
    }

    /// Distance under which an edge between two crossing nodes is
    /// treated as interior to the crossing, per highway class.
    pub fn crossing_min() -> Self {
        let mut distances = Self::new(12.0);
        for (class, meters) in [
            ("motorway", 100.0),
            ("trunk", 100.0),
            ("primary", 50.0),
            ("secondary", 30.0),
            ("tertiary", 25.0),
            ("unclassified", 16.0),
            ("residential", 16.0),
            ("living_street", 16.0),
            ("service", 12.0),
        ] {
            distances.set(class, meters);
        }
        distances
    }
}

/// Tunable classification heuristics.
///
/// The exact cutoffs are calibration material rather than ground truth,
/// so every one of them is a parameter with the defaults below.
#[derive(Debug, Clone)]
pub struct ClassifierParams {
    /// Iteration cap of the propagation loop.
    pub max_iterations: usize,
    /// An edge shorter than this factor of the mean length of its
    /// neighboring edges is a crossing-interior candidate.
    pub short_edge_factor: f64,
    /// Minimal degree for a node to count as an intersection.
    pub min_crossing_degree: usize,
    /// Minimal deviation (degrees) from a straight continuation for a
    /// degree-2 node to count as a corner of a crossing body.
    pub crossing_angle_deg: f64,
    pub max_boundary_distance: BoundaryDistances,
    pub min_boundary_distance: BoundaryDistances,
}

impl Default for ClassifierParams {
    fn default() -> Self {
        Self {
            max_iterations: 16,
            short_edge_factor: 0.5,
            min_crossing_degree: 3,
            crossing_angle_deg: 35.0,
            max_boundary_distance: BoundaryDistances::crossing_max(),
            min_boundary_distance: BoundaryDistances::crossing_min(),
        }
    }
}

/// What the propagation pass did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ClassifyOutcome {
    /// Number of propagation iterations actually run.
    pub iterations: usize,
    /// False when the iteration cap was hit before a fixed point.
    pub converged: bool,
}

/// Classifies every node and edge of the graph in place.
///
/// Never fails; elements no rule applies to stay [`ElementKind::Unknown`].
pub fn classify(graph: &mut StreetGraph, params: &ClassifierParams) -> ClassifyOutcome {
    graph.reset_classification();
    seed_from_tags(graph);

    // Edge lengths never change, so the short-edge reference is fixed.
    let mean_neighbor_length = mean_neighbor_lengths(graph);

    let mut iterations = 0;
    let mut converged = false;
    while iterations < params.max_iterations {
        iterations += 1;
        let changed = propagate_once(graph, params, &mean_neighbor_length);
        if !changed {
            converged = true;
            break;
        }
    }
    label_branches(graph);

    debug!("classification finished after {iterations} iteration(s), converged: {converged}");
    ClassifyOutcome {
        iterations,
        converged,
    }
}

/// Tag-driven seeds, applied once before propagation.
fn seed_from_tags(graph: &mut StreetGraph) {
    for idx in graph.graph.node_indices().collect::<Vec<_>>() {
        let tags = &graph.node(idx).tags;
        let kind = if tags.is(components::CROSSING_ISLAND, "yes")
            || tags.is(components::CROSSING, "island")
        {
            Some(ElementKind::Island)
        } else if matches!(
            tags.highway(),
            Some("crossing" | "traffic_signals" | "mini_roundabout")
        ) {
            Some(ElementKind::Crossing)
        } else {
            None
        };
        if let Some(kind) = kind {
            graph.set_node_kind(idx, kind);
        }
    }

    for idx in graph.graph.edge_indices().collect::<Vec<_>>() {
        let tags = &graph.edge(idx).tags;
        let kind = if tags.contains(components::JUNCTION) {
            // The junction tag is a strong clue for crossing interiors.
            Some(ElementKind::Crossing)
        } else if let Some(highway) = tags.highway() {
            match highway {
                "footway" | "path" | "pedestrian" | "steps" | "corridor" => {
                    if tags.is(components::FOOTWAY, "crossing") {
                        Some(ElementKind::Crossing)
                    } else {
                        Some(ElementKind::Sidewalk)
                    }
                }
                _ => None,
            }
        } else {
            None
        };
        if let Some(kind) = kind {
            graph.set_edge_kind(idx, kind);
        }
    }
}

/// One propagation sweep over all unknown elements. Returns whether any
/// label changed.
fn propagate_once(
    graph: &mut StreetGraph,
    params: &ClassifierParams,
    mean_neighbor_length: &[f64],
) -> bool {
    let mut changed = false;

    for idx in graph.graph.node_indices().collect::<Vec<_>>() {
        if graph.node(idx).kind != ElementKind::Unknown {
            continue;
        }
        let degree = graph.degree(idx);
        let crossing_edges = graph
            .incident_edges(idx)
            .filter(|e| graph.edge(*e).kind == ElementKind::Crossing)
            .count();
        let sidewalk_only = degree > 0
            && graph
                .incident_edges(idx)
                .all(|e| graph.edge(e).kind == ElementKind::Sidewalk);

        // Sidewalk membership wins over the degree rule; a footpath
        // junction is not a crossroad.
        let kind = if sidewalk_only {
            Some(ElementKind::Sidewalk)
        } else if degree >= params.min_crossing_degree || crossing_edges >= 2 {
            Some(ElementKind::Crossing)
        } else if crossing_edges == 1 && degree == 2 && sharp_corner(graph, idx, params) {
            // A sharp bend next to crossing interior is a corner of the
            // crossing body, not a through street.
            Some(ElementKind::Crossing)
        } else {
            None
        };
        if let Some(kind) = kind {
            trace!("node {:?} -> {kind:?}", graph.node(idx).id);
            graph.set_node_kind(idx, kind);
            changed = true;
        }
    }

    for idx in graph.graph.edge_indices().collect::<Vec<_>>() {
        if graph.edge(idx).kind != ElementKind::Unknown {
            continue;
        }
        let (a, b) = graph.endpoints(idx);
        let (kind_a, kind_b) = (graph.node(a).kind, graph.node(b).kind);
        let edge = graph.edge(idx);
        let class = edge.highway_class();
        let length = edge.length;

        let both_in_crossing =
            kind_a.is_crossroad_candidate() && kind_b.is_crossroad_candidate();
        let one_in_crossing =
            kind_a.is_crossroad_candidate() || kind_b.is_crossroad_candidate();
        let short = length <= params.short_edge_factor * mean_neighbor_length[idx.index()];

        let kind = if kind_a == ElementKind::Island && kind_b == ElementKind::Island {
            Some(ElementKind::Island)
        } else if both_in_crossing && length <= params.min_boundary_distance.get(class) {
            Some(ElementKind::Crossing)
        } else if one_in_crossing
            && short
            && length <= params.max_boundary_distance.get(class)
        {
            Some(ElementKind::Crossing)
        } else {
            None
        };
        if let Some(kind) = kind {
            graph.set_edge_kind(idx, kind);
            changed = true;
        }
    }

    changed
}

/// Final pass: unknown edges leaving a crossing body become branches,
/// and the chain nodes along them follow. Runs after the fixed point so
/// that branch labels never compete with crossing labels.
fn label_branches(graph: &mut StreetGraph) {
    for idx in graph.graph.edge_indices().collect::<Vec<_>>() {
        if graph.edge(idx).kind != ElementKind::Unknown {
            continue;
        }
        let (a, b) = graph.endpoints(idx);
        let ends_in_crossing = graph.node(a).kind.is_crossroad_candidate()
            ^ graph.node(b).kind.is_crossroad_candidate();
        if ends_in_crossing {
            graph.set_edge_kind(idx, ElementKind::Branch);
        }
    }
    for idx in graph.graph.node_indices().collect::<Vec<_>>() {
        if graph.node(idx).kind != ElementKind::Unknown || graph.degree(idx) > 2 {
            continue;
        }
        let touches_branch = graph
            .incident_edges(idx)
            .any(|e| graph.edge(e).kind == ElementKind::Branch);
        if touches_branch {
            graph.set_node_kind(idx, ElementKind::Branch);
        }
    }
}

/// Whether the two edges at a degree-2 node deviate from a straight
/// continuation by more than the configured angle.
fn sharp_corner(
    graph: &StreetGraph,
    node: petgraph::graph::NodeIndex,
    params: &ClassifierParams,
) -> bool {
    let neighbors: Vec<_> = graph.neighbors(node).collect();
    let &[a, b] = neighbors.as_slice() else {
        return false;
    };
    let diff = (graph.bearing(node, a) - graph.bearing(node, b)).abs();
    let diff = if diff > 180.0 { 360.0 - diff } else { diff };
    (180.0 - diff).abs() > params.crossing_angle_deg
}

/// Mean length of the edges sharing an endpoint with each edge, indexed
/// by edge index. Edges with no neighbors fall back to their own length.
fn mean_neighbor_lengths(graph: &StreetGraph) -> Vec<f64> {
    let mut means = vec![0.0; graph.edge_count()];
    for idx in graph.graph.edge_indices() {
        let (a, b) = graph.endpoints(idx);
        let mut total = 0.0;
        let mut count = 0usize;
        for endpoint in [a, b] {
            for other in graph.incident_edges(endpoint) {
                if other != idx {
                    total += graph.edge(other).length;
                    count += 1;
                }
            }
        }
        means[idx.index()] = if count == 0 {
            graph.edge(idx).length
        } else {
            total / count as f64
        };
    }
    means
}
