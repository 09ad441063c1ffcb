//! Street graph wrapper: topology plus a spatial index for snapping

use geo::{Bearing, Distance, Haversine, Point};
use petgraph::graph::{EdgeIndex, NodeIndex, UnGraph};
use petgraph::visit::EdgeRef;
use rstar::RTree;
use rstar::primitives::GeomWithData;

use crate::model::{ElementKind, StreetEdge, StreetNode};

/// Node position indexed for nearest-neighbor queries.
pub type IndexedPoint = GeomWithData<Point<f64>, NodeIndex>;

/// Undirected street graph around the query anchor.
///
/// Wraps the raw topology handed over by the data source and carries
/// the per-element classification state. The segmentation mutates only
/// the classification fields, never the topology.
#[derive(Debug, Clone)]
pub struct StreetGraph {
    pub graph: UnGraph<StreetNode, StreetEdge>,
    rtree: RTree<IndexedPoint>,
}

impl StreetGraph {
    pub(crate) fn new(graph: UnGraph<StreetNode, StreetEdge>) -> Self {
        let rtree = RTree::bulk_load(
            graph
                .node_indices()
                .map(|idx| IndexedPoint::new(graph[idx].geometry, idx))
                .collect(),
        );
        Self { graph, rtree }
    }

    pub fn node_count(&self) -> usize {
        self.graph.node_count()
    }

    pub fn edge_count(&self) -> usize {
        self.graph.edge_count()
    }

    pub fn node(&self, idx: NodeIndex) -> &StreetNode {
        &self.graph[idx]
    }

    pub fn edge(&self, idx: EdgeIndex) -> &StreetEdge {
        &self.graph[idx]
    }

    /// Both endpoints of an edge. Edge indices are never invalidated,
    /// so the lookup cannot fail for indices obtained from this graph.
    pub fn endpoints(&self, edge: EdgeIndex) -> (NodeIndex, NodeIndex) {
        self.graph
            .edge_endpoints(edge)
            .expect("edge index from this graph")
    }

    /// The endpoint of `edge` that is not `node`.
    pub fn opposite(&self, node: NodeIndex, edge: EdgeIndex) -> NodeIndex {
        let (a, b) = self.endpoints(edge);
        if a == node { b } else { a }
    }

    pub fn degree(&self, node: NodeIndex) -> usize {
        self.graph.edges(node).count()
    }

    pub fn neighbors(&self, node: NodeIndex) -> impl Iterator<Item = NodeIndex> + '_ {
        self.graph.neighbors(node)
    }

    pub fn incident_edges(&self, node: NodeIndex) -> impl Iterator<Item = EdgeIndex> + '_ {
        self.graph.edges(node).map(|e| e.id())
    }

    pub fn edge_between(&self, a: NodeIndex, b: NodeIndex) -> Option<EdgeIndex> {
        self.graph.find_edge(a, b)
    }

    /// Nearest graph node to the given point, with the great-circle
    /// distance to it in meters.
    pub fn nearest_node(&self, point: &Point<f64>) -> Option<(NodeIndex, f64)> {
        self.rtree
            .nearest_neighbor(point)
            .map(|indexed| (indexed.data, Haversine.distance(*point, *indexed.geom())))
    }

    /// Great-circle distance between two nodes in meters.
    pub fn distance_m(&self, a: NodeIndex, b: NodeIndex) -> f64 {
        Haversine.distance(self.graph[a].geometry, self.graph[b].geometry)
    }

    /// Compass bearing from one node to another, degrees in `[0, 360)`.
    pub fn bearing(&self, from: NodeIndex, to: NodeIndex) -> f64 {
        let bearing = Haversine.bearing(self.graph[from].geometry, self.graph[to].geometry);
        bearing.rem_euclid(360.0)
    }

    pub(crate) fn set_node_kind(&mut self, idx: NodeIndex, kind: ElementKind) {
        self.graph[idx].kind = kind;
    }

    pub(crate) fn set_edge_kind(&mut self, idx: EdgeIndex, kind: ElementKind) {
        self.graph[idx].kind = kind;
    }

    /// Reset all classification state back to `Unknown`, scale 0.
    pub fn reset_classification(&mut self) {
        for weight in self.graph.node_weights_mut() {
            weight.kind = ElementKind::Unknown;
            weight.scale_level = 0;
        }
        for weight in self.graph.edge_weights_mut() {
            weight.kind = ElementKind::Unknown;
            weight.scale_level = 0;
        }
    }
}

#[cfg(test)]
mod tests {
    use geo::{LineString, Point, line_string};
    use petgraph::graph::UnGraph;

    use super::*;
    use crate::model::Tags;

    fn tiny_graph() -> StreetGraph {
        let mut graph = UnGraph::new_undirected();
        let a = graph.add_node(StreetNode::new(1, Point::new(0.0, 0.0), Tags::new()));
        let b = graph.add_node(StreetNode::new(2, Point::new(0.001, 0.0), Tags::new()));
        let geometry: LineString<f64> = line_string![(x: 0.0, y: 0.0), (x: 0.001, y: 0.0)];
        graph.add_edge(a, b, StreetEdge::new(geometry, 111.0, Tags::new()));
        StreetGraph::new(graph)
    }

    #[test]
    fn nearest_node_snaps_to_closest() {
        let graph = StreetGraph::new(tiny_graph().graph);
        let (idx, dist) = graph
            .nearest_node(&Point::new(0.0009, 0.0))
            .expect("non-empty graph");
        assert_eq!(graph.node(idx).id, 2);
        assert!(dist < 20.0, "snap distance too large: {dist}");
    }

    #[test]
    fn bearing_east_is_ninety_degrees() {
        let graph = tiny_graph();
        let a = graph.graph.node_indices().next().unwrap();
        let b = graph.graph.node_indices().nth(1).unwrap();
        let bearing = graph.bearing(a, b);
        assert!((bearing - 90.0).abs() < 1.0, "bearing {bearing}");
    }

    #[test]
    fn reset_classification_clears_kinds() {
        let mut graph = tiny_graph();
        let a = graph.graph.node_indices().next().unwrap();
        graph.set_node_kind(a, ElementKind::Crossing);
        graph.reset_classification();
        assert_eq!(graph.node(a).kind, ElementKind::Unknown);
    }
}
