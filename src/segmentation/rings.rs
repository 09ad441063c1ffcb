//! Bounded elementary-cycle detection over the classified graph
//!
//! Rings are enumerated by a depth-first expansion from each candidate
//! node, restricted to crossroad-candidate edges and pruned at
//! `max_cycle_elements`. Isolated crossing nodes that sit on no cycle
//! are emitted as trivial single-node rings so that plain intersections
//! still produce a crossroad.

use fixedbitset::FixedBitSet;
use hashbrown::HashSet;
use log::debug;
use petgraph::graph::{EdgeIndex, NodeIndex};

use crate::Error;
use crate::model::{Ring, RingId, StreetGraph};

/// Bounds of the ring search.
#[derive(Debug, Clone)]
pub struct RingSearchParams {
    /// Maximal number of nodes in a detected ring.
    pub max_cycle_elements: usize,
    /// Hard cap on expanded search states before giving up with
    /// [`Error::RingSearchOverflow`].
    pub search_node_cap: usize,
    /// Minimal degree for an isolated crossing node to count as a
    /// trivial ring.
    pub min_isolated_degree: usize,
}

impl Default for RingSearchParams {
    fn default() -> Self {
        Self {
            max_cycle_elements: 10,
            search_node_cap: 200_000,
            min_isolated_degree: 3,
        }
    }
}

/// Detects all candidate rings, deterministically ordered by minimal
/// node index, then size.
///
/// # Errors
///
/// `Error::RingSearchOverflow` when the search expands more states than
/// `search_node_cap` allows; the caller should reduce the radius or
/// `max_cycle_elements`.
pub fn detect_rings(graph: &StreetGraph, params: &RingSearchParams) -> Result<Vec<Ring>, Error> {
    let mut search = CycleSearch {
        graph,
        params,
        expanded: 0,
        cycles: Vec::new(),
        seen: HashSet::new(),
    };
    search.run()?;
    let expanded = search.expanded;

    let mut rings = dedupe_overlapping(search.cycles);

    // Crossing nodes on no kept ring become trivial rings.
    let mut covered = FixedBitSet::with_capacity(graph.node_count());
    for ring in &rings {
        for node in ring.nodes() {
            covered.insert(node.index());
        }
    }
    for idx in graph.graph.node_indices() {
        if graph.node(idx).kind.is_crossroad_candidate()
            && !covered.contains(idx.index())
            && graph.degree(idx) >= params.min_isolated_degree
        {
            rings.push(Ring::trivial(RingId(0), idx));
        }
    }

    rings.sort_by(|a, b| {
        a.min_node()
            .cmp(&b.min_node())
            .then(a.len().cmp(&b.len()))
            .then_with(|| a.nodes().cmp(b.nodes()))
    });
    let rings: Vec<Ring> = rings
        .into_iter()
        .enumerate()
        .map(|(i, ring)| reindex(ring, RingId(i)))
        .collect();

    debug!(
        "ring search: {} ring(s) found, {expanded} state(s) expanded",
        rings.len()
    );
    Ok(rings)
}

fn reindex(ring: Ring, id: RingId) -> Ring {
    if ring.is_cycle() {
        Ring::cycle(id, ring.nodes().to_vec(), ring.edges().to_vec())
    } else if ring.len() == 1 {
        Ring::trivial(id, ring.nodes()[0])
    } else {
        Ring::region(id, ring.nodes().to_vec(), ring.edges().to_vec())
    }
}

struct CycleSearch<'a> {
    graph: &'a StreetGraph,
    params: &'a RingSearchParams,
    expanded: usize,
    cycles: Vec<Ring>,
    /// Sorted node sets of cycles already recorded.
    seen: HashSet<Vec<NodeIndex>>,
}

impl CycleSearch<'_> {
    fn run(&mut self) -> Result<(), Error> {
        if self.params.max_cycle_elements < 3 {
            // No proper cycle fits the bound.
            return Ok(());
        }
        for start in self.graph.graph.node_indices() {
            if !self.graph.node(start).kind.is_crossroad_candidate() {
                continue;
            }
            let mut in_path = FixedBitSet::with_capacity(self.graph.node_count());
            in_path.insert(start.index());
            let mut nodes = vec![start];
            let mut edges = Vec::new();
            self.expand(start, &mut nodes, &mut edges, &mut in_path)?;
        }
        Ok(())
    }

    /// Depth-first expansion; only nodes above the start index may join
    /// the path, so each cycle is discovered from its minimal node only.
    fn expand(
        &mut self,
        start: NodeIndex,
        nodes: &mut Vec<NodeIndex>,
        edges: &mut Vec<EdgeIndex>,
        in_path: &mut FixedBitSet,
    ) -> Result<(), Error> {
        let current = *nodes.last().expect("path is never empty");
        let mut steps: Vec<(NodeIndex, EdgeIndex)> = self
            .graph
            .incident_edges(current)
            .filter(|e| self.graph.edge(*e).kind.is_crossroad_candidate())
            .map(|e| (self.graph.opposite(current, e), e))
            .collect();
        steps.sort_unstable();

        for (next, edge) in steps {
            self.expanded += 1;
            if self.expanded > self.params.search_node_cap {
                return Err(Error::RingSearchOverflow {
                    cap: self.params.search_node_cap,
                    visited: self.expanded,
                });
            }
            if next == start && nodes.len() >= 3 {
                self.record(nodes, edges, edge);
                continue;
            }
            if next <= start
                || in_path.contains(next.index())
                || nodes.len() >= self.params.max_cycle_elements
                || !self.graph.node(next).kind.is_crossroad_candidate()
            {
                continue;
            }
            nodes.push(next);
            edges.push(edge);
            in_path.insert(next.index());
            self.expand(start, nodes, edges, in_path)?;
            in_path.set(nodes.pop().expect("pushed above").index(), false);
            edges.pop();
        }
        Ok(())
    }

    fn record(&mut self, nodes: &[NodeIndex], edges: &[EdgeIndex], closing: EdgeIndex) {
        let mut key: Vec<NodeIndex> = nodes.to_vec();
        key.sort_unstable();
        if !self.seen.insert(key) {
            return;
        }
        let mut cycle_edges = edges.to_vec();
        cycle_edges.push(closing);
        self.cycles
            .push(Ring::cycle(RingId(0), nodes.to_vec(), cycle_edges));
    }
}

/// Drops every ring sharing more than half of its edges with smaller
/// rings already kept; the smaller detections are the canonical
/// candidates.
fn dedupe_overlapping(mut cycles: Vec<Ring>) -> Vec<Ring> {
    cycles.sort_by(|a, b| {
        a.len()
            .cmp(&b.len())
            .then(a.min_node().cmp(&b.min_node()))
            .then_with(|| a.nodes().cmp(b.nodes()))
    });
    let mut kept: Vec<Ring> = Vec::with_capacity(cycles.len());
    let mut covered_edges: HashSet<EdgeIndex> = HashSet::new();
    for ring in cycles {
        let overlap = ring
            .edges()
            .iter()
            .filter(|e| covered_edges.contains(*e))
            .count();
        if 2 * overlap > ring.edges().len() {
            debug!("dropping ring overlapping smaller candidates");
        } else {
            covered_edges.extend(ring.edges().iter().copied());
            kept.push(ring);
        }
    }
    kept
}
