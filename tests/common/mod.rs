//! Synthetic street graphs shared by the integration tests.

use crossway::model::Tags;
use crossway::prelude::*;

pub fn raw_node(id: i64, lng: f64, lat: f64) -> RawNode {
    RawNode {
        id,
        lng,
        lat,
        tags: Tags::new(),
    }
}

pub fn street(from: i64, to: i64, name: &str) -> RawEdge {
    RawEdge {
        from,
        to,
        geometry: Vec::new(),
        tags: [("highway", "residential"), ("name", name)]
            .into_iter()
            .collect(),
    }
}

pub fn junction_edge(from: i64, to: i64) -> RawEdge {
    RawEdge {
        from,
        to,
        geometry: Vec::new(),
        tags: [("highway", "residential"), ("junction", "yes")]
            .into_iter()
            .collect(),
    }
}

/// A 4-way "+"-shaped intersection with no nearby neighbors. Arms are
/// two segments long so branch tracing has a chain to follow.
pub fn plus_intersection() -> RawStreetGraph {
    RawStreetGraph {
        nodes: vec![
            raw_node(1, 0.0, 0.0),
            raw_node(2, 0.0004, 0.0),
            raw_node(3, 0.0008, 0.0),
            raw_node(4, -0.0004, 0.0),
            raw_node(5, -0.0008, 0.0),
            raw_node(6, 0.0, 0.0004),
            raw_node(7, 0.0, 0.0008),
            raw_node(8, 0.0, -0.0004),
            raw_node(9, 0.0, -0.0008),
        ],
        edges: vec![
            street(1, 2, "East St"),
            street(2, 3, "East St"),
            street(1, 4, "West St"),
            street(4, 5, "West St"),
            street(1, 6, "North Ave"),
            street(6, 7, "North Ave"),
            street(1, 8, "South Ave"),
            street(8, 9, "South Ave"),
        ],
    }
}

/// Two 3-way intersections ~5.5 m apart sharing a connecting edge.
pub fn twin_tees() -> RawStreetGraph {
    RawStreetGraph {
        nodes: vec![
            raw_node(1, 0.0, 0.0),
            raw_node(2, 0.00005, 0.0),
            raw_node(3, -0.0004, 0.0003),
            raw_node(4, -0.0004, -0.0003),
            raw_node(5, 0.00045, 0.0003),
            raw_node(6, 0.00045, -0.0003),
        ],
        edges: vec![
            street(1, 2, "Main St"),
            street(1, 3, "Main St"),
            street(1, 4, "Side St"),
            street(2, 5, "Main St"),
            street(2, 6, "Side St"),
        ],
    }
}

/// A dead-end street: three nodes in a line, no cycle anywhere.
pub fn dead_end() -> RawStreetGraph {
    RawStreetGraph {
        nodes: vec![
            raw_node(1, 0.0, 0.0),
            raw_node(2, 0.0005, 0.0),
            raw_node(3, 0.001, 0.0),
        ],
        edges: vec![street(1, 2, "Cul de Sac"), street(2, 3, "Cul de Sac")],
    }
}

/// An n-node circular junction body (all edges tagged as junction).
pub fn circular_junction(n: usize) -> RawStreetGraph {
    let d = 0.00008;
    let nodes = (0..n)
        .map(|i| {
            let angle = 2.0 * std::f64::consts::PI * i as f64 / n as f64;
            raw_node(i as i64 + 1, d * angle.cos(), d * angle.sin())
        })
        .collect();
    let edges = (0..n)
        .map(|i| junction_edge(i as i64 + 1, ((i + 1) % n) as i64 + 1))
        .collect();
    RawStreetGraph { nodes, edges }
}

/// A small square crossing body with one external arm per corner.
pub fn square_crossing() -> RawStreetGraph {
    let d = 0.0001;
    RawStreetGraph {
        nodes: vec![
            raw_node(1, 0.0, 0.0),
            raw_node(2, d, 0.0),
            raw_node(3, d, d),
            raw_node(4, 0.0, d),
            raw_node(5, -0.0005, -0.0005),
            raw_node(6, 0.0006, -0.0005),
            raw_node(7, 0.0006, 0.0006),
            raw_node(8, -0.0005, 0.0006),
        ],
        edges: vec![
            junction_edge(1, 2),
            junction_edge(2, 3),
            junction_edge(3, 4),
            junction_edge(4, 1),
            street(1, 5, "SW Rd"),
            street(2, 6, "SE Rd"),
            street(3, 7, "NE Rd"),
            street(4, 8, "NW Rd"),
        ],
    }
}

pub fn build(raw: RawStreetGraph) -> StreetGraph {
    build_street_graph(raw, &GraphConfig::default()).expect("valid test graph")
}
