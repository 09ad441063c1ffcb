use std::collections::BTreeMap;

use fixedbitset::FixedBitSet;
use geo::{Coord, Distance, Haversine, LineString, Point};
use hashbrown::{HashMap, HashSet};
use log::{debug, info};
use petgraph::graph::{NodeIndex, UnGraph};
use serde::{Deserialize, Serialize};

use crate::model::{StreetEdge, StreetGraph, StreetNode, Tags, components};
use crate::{Error, OsmNodeId};

/// Raw node handed over by the data source.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RawNode {
    pub id: OsmNodeId,
    pub lng: f64,
    pub lat: f64,
    #[serde(default)]
    pub tags: Tags,
}

/// Raw undirected edge between two nodes. A straight segment is assumed
/// when no detailed geometry is given.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RawEdge {
    pub from: OsmNodeId,
    pub to: OsmNodeId,
    /// Intermediate shape points as `[lng, lat]` pairs, endpoints excluded.
    #[serde(default)]
    pub geometry: Vec<[f64; 2]>,
    #[serde(default)]
    pub tags: Tags,
}

/// Raw street graph handed over by the (external) data source.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RawStreetGraph {
    pub nodes: Vec<RawNode>,
    pub edges: Vec<RawEdge>,
}

/// Configuration of graph construction.
#[derive(Debug, Clone)]
pub struct GraphConfig {
    /// Query anchor (lng, lat).
    pub anchor: Point<f64>,
    /// Search radius in meters around the anchor.
    pub radius_m: f64,
    /// Strip pedestrian-only ways (footway, path, steps, parking aisles)
    /// before segmentation instead of classifying them as sidewalks.
    pub drop_footways: bool,
    /// Keep only the component containing the anchor instead of failing
    /// on a disconnected graph.
    pub retain_main_component: bool,
}

impl Default for GraphConfig {
    fn default() -> Self {
        Self {
            anchor: Point::new(0.0, 0.0),
            radius_m: 150.0,
            drop_footways: false,
            retain_main_component: false,
        }
    }
}

const FOOT_HIGHWAYS: &[&str] = &["footway", "path", "pedestrian", "steps", "corridor"];

/// Validates the raw input and builds the street graph the segmentation
/// operates on.
///
/// Nodes are inserted in ascending OSM id order so that graph indices,
/// and everything derived from them, are reproducible for a given input.
///
/// # Errors
///
/// `Error::InvalidGraph` when the input is empty within the radius,
/// carries edges without a `highway` tag, or is disconnected (unless
/// `retain_main_component` is set); `Error::InvalidData` when an edge
/// references a node that does not exist.
pub fn build_street_graph(raw: RawStreetGraph, config: &GraphConfig) -> Result<StreetGraph, Error> {
    if raw.nodes.is_empty() {
        return Err(Error::InvalidGraph("empty node set".into()));
    }

    // Ascending id order; duplicate ids keep the first occurrence.
    let mut by_id: BTreeMap<OsmNodeId, RawNode> = BTreeMap::new();
    for node in raw.nodes {
        by_id.entry(node.id).or_insert(node);
    }

    let mut graph: UnGraph<StreetNode, StreetEdge> = UnGraph::new_undirected();
    let mut index_of: HashMap<OsmNodeId, NodeIndex> = HashMap::with_capacity(by_id.len());
    let mut dropped_nodes = 0usize;
    for (id, node) in &by_id {
        let point = Point::new(node.lng, node.lat);
        if Haversine.distance(config.anchor, point) > config.radius_m {
            dropped_nodes += 1;
            continue;
        }
        let idx = graph.add_node(StreetNode::new(*id, point, node.tags.clone()));
        index_of.insert(*id, idx);
    }
    if graph.node_count() == 0 {
        return Err(Error::InvalidGraph(format!(
            "no nodes within {:.0} m of the anchor",
            config.radius_m
        )));
    }

    let mut seen_pairs: HashSet<(NodeIndex, NodeIndex)> = HashSet::new();
    for edge in &raw.edges {
        if !by_id.contains_key(&edge.from) || !by_id.contains_key(&edge.to) {
            return Err(Error::InvalidData(format!(
                "edge {} -> {} references an unknown node",
                edge.from, edge.to
            )));
        }
        let (Some(&a), Some(&b)) = (index_of.get(&edge.from), index_of.get(&edge.to)) else {
            // Endpoint outside the query radius.
            continue;
        };
        if a == b {
            debug!("skipping self-loop at node {}", edge.from);
            continue;
        }
        let highway = edge.tags.get(components::HIGHWAY).ok_or_else(|| {
            Error::InvalidGraph(format!(
                "edge {} -> {} carries no highway tag",
                edge.from, edge.to
            ))
        })?;
        if config.drop_footways && is_foot_element(highway, &edge.tags) {
            continue;
        }
        let pair = if a < b { (a, b) } else { (b, a) };
        if !seen_pairs.insert(pair) {
            debug!("skipping parallel edge {} -> {}", edge.from, edge.to);
            continue;
        }
        let geometry = edge_geometry(&graph[a], &graph[b], &edge.geometry);
        let length = polyline_length_m(&geometry);
        graph.add_edge(a, b, StreetEdge::new(geometry, length, edge.tags.clone()));
    }

    let graph = check_connectivity(graph, config)?;

    info!(
        "Built street graph: {} nodes, {} edges ({} nodes outside radius)",
        graph.node_count(),
        graph.edge_count(),
        dropped_nodes
    );
    Ok(StreetGraph::new(graph))
}

fn is_foot_element(highway: &str, tags: &Tags) -> bool {
    FOOT_HIGHWAYS.contains(&highway)
        || (highway == "service" && tags.is("service", "parking_aisle"))
}

fn edge_geometry(from: &StreetNode, to: &StreetNode, shape: &[[f64; 2]]) -> LineString<f64> {
    let mut coords = Vec::with_capacity(shape.len() + 2);
    coords.push(Coord {
        x: from.geometry.x(),
        y: from.geometry.y(),
    });
    coords.extend(shape.iter().map(|[x, y]| Coord { x: *x, y: *y }));
    coords.push(Coord {
        x: to.geometry.x(),
        y: to.geometry.y(),
    });
    LineString::new(coords)
}

fn polyline_length_m(line: &LineString<f64>) -> f64 {
    line.0
        .windows(2)
        .map(|pair| Haversine.distance(Point::from(pair[0]), Point::from(pair[1])))
        .sum()
}

/// Reachability sweep from the node nearest the anchor. Fails on a
/// disconnected graph, or trims it down to the anchor's component when
/// the config asks for that.
fn check_connectivity(
    graph: UnGraph<StreetNode, StreetEdge>,
    config: &GraphConfig,
) -> Result<UnGraph<StreetNode, StreetEdge>, Error> {
    let start = nearest_to_anchor(&graph, config.anchor);
    let mut reached = FixedBitSet::with_capacity(graph.node_count());
    let mut queue = vec![start];
    reached.insert(start.index());
    while let Some(node) = queue.pop() {
        for neighbor in graph.neighbors(node) {
            if !reached.contains(neighbor.index()) {
                reached.insert(neighbor.index());
                queue.push(neighbor);
            }
        }
    }

    let unreachable = graph.node_count() - reached.count_ones(..);
    if unreachable == 0 {
        return Ok(graph);
    }
    if !config.retain_main_component {
        return Err(Error::InvalidGraph(format!(
            "graph is disconnected within the area of interest: {unreachable} of {} nodes \
             unreachable from the anchor",
            graph.node_count()
        )));
    }

    debug!("dropping {unreachable} nodes outside the anchor component");
    let mut trimmed: UnGraph<StreetNode, StreetEdge> = UnGraph::new_undirected();
    let mut remap: HashMap<NodeIndex, NodeIndex> = HashMap::with_capacity(reached.count_ones(..));
    for idx in graph.node_indices() {
        if reached.contains(idx.index()) {
            remap.insert(idx, trimmed.add_node(graph[idx].clone()));
        }
    }
    for edge in graph.edge_indices() {
        let (a, b) = graph.edge_endpoints(edge).expect("edge from this graph");
        if let (Some(&a), Some(&b)) = (remap.get(&a), remap.get(&b)) {
            trimmed.add_edge(a, b, graph[edge].clone());
        }
    }
    Ok(trimmed)
}

fn nearest_to_anchor(graph: &UnGraph<StreetNode, StreetEdge>, anchor: Point<f64>) -> NodeIndex {
    graph
        .node_indices()
        .min_by(|a, b| {
            let da = Haversine.distance(anchor, graph[*a].geometry);
            let db = Haversine.distance(anchor, graph[*b].geometry);
            da.total_cmp(&db)
        })
        .expect("graph checked non-empty")
}
