//! Segmentation entities: rings, branches, crossroads and the result forest
//!
//! Crossroads are stored in an arena indexed by [`CrossroadId`]; parents
//! own their children through id lists and children hold only an id
//! back-reference, so the multiscale hierarchy needs no shared ownership.

use petgraph::graph::{EdgeIndex, NodeIndex};
use serde::{Deserialize, Serialize};

use crate::ScaleLevel;

/// Stable identifier of a detected ring within one query.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RingId(pub usize);

/// Stable identifier of a crossroad within one query.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CrossroadId(pub usize);

/// Body of a candidate crossroad.
///
/// For elementary detections this is a cyclic sequence of nodes and the
/// edges joining them (`edges[i]` connects `nodes[i]` to `nodes[i + 1]`,
/// wrapping at the end). Two degenerate shapes also occur: a single
/// crossing node with no edges (an isolated intersection), and a
/// non-cyclic element set produced by fusing rings that touch in a
/// single node. Immutable once created.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Ring {
    pub id: RingId,
    nodes: Vec<NodeIndex>,
    edges: Vec<EdgeIndex>,
    cycle: bool,
}

impl Ring {
    /// A proper elementary cycle. The node/edge sequences are rotated
    /// and oriented into canonical form so that any rotation or
    /// reflection of the same cycle produces an identical ring.
    pub fn cycle(id: RingId, nodes: Vec<NodeIndex>, edges: Vec<EdgeIndex>) -> Self {
        debug_assert_eq!(nodes.len(), edges.len());
        let (nodes, edges) = canonical_cycle(nodes, edges);
        Self {
            id,
            nodes,
            edges,
            cycle: true,
        }
    }

    /// A single isolated crossing node.
    pub fn trivial(id: RingId, node: NodeIndex) -> Self {
        Self {
            id,
            nodes: vec![node],
            edges: Vec::new(),
            cycle: false,
        }
    }

    /// A fused body that does not form a single closed walk. Elements
    /// are kept sorted for deterministic identity.
    pub fn region(id: RingId, mut nodes: Vec<NodeIndex>, mut edges: Vec<EdgeIndex>) -> Self {
        nodes.sort_unstable();
        nodes.dedup();
        edges.sort_unstable();
        edges.dedup();
        Self {
            id,
            nodes,
            edges,
            cycle: false,
        }
    }

    pub fn nodes(&self) -> &[NodeIndex] {
        &self.nodes
    }

    pub fn edges(&self) -> &[EdgeIndex] {
        &self.edges
    }

    pub fn is_cycle(&self) -> bool {
        self.cycle
    }

    /// Number of constituent boundary nodes; the quantity bounded by
    /// `max_cycle_elements`.
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn contains_node(&self, node: NodeIndex) -> bool {
        self.nodes.contains(&node)
    }

    pub fn contains_edge(&self, edge: EdgeIndex) -> bool {
        self.edges.contains(&edge)
    }

    pub fn shared_nodes(&self, other: &Ring) -> usize {
        self.nodes
            .iter()
            .filter(|n| other.contains_node(**n))
            .count()
    }

    pub fn shared_edges(&self, other: &Ring) -> usize {
        self.edges
            .iter()
            .filter(|e| other.contains_edge(**e))
            .count()
    }

    /// Minimal node index of the body, used for deterministic ordering.
    pub fn min_node(&self) -> NodeIndex {
        *self.nodes.iter().min().expect("ring is never empty")
    }
}

fn canonical_cycle(
    nodes: Vec<NodeIndex>,
    edges: Vec<EdgeIndex>,
) -> (Vec<NodeIndex>, Vec<EdgeIndex>) {
    let n = nodes.len();
    if n < 2 {
        return (nodes, edges);
    }
    let pivot = nodes
        .iter()
        .enumerate()
        .min_by_key(|(_, node)| **node)
        .map(|(i, _)| i)
        .expect("cycle is non-empty");

    let forward = nodes[(pivot + 1) % n] <= nodes[(pivot + n - 1) % n];
    let mut out_nodes = Vec::with_capacity(n);
    let mut out_edges = Vec::with_capacity(n);
    for step in 0..n {
        if forward {
            out_nodes.push(nodes[(pivot + step) % n]);
            out_edges.push(edges[(pivot + step) % n]);
        } else {
            out_nodes.push(nodes[(pivot + n - step) % n]);
            // edges[i] joins nodes[i] and nodes[i + 1]; walking backwards
            // from the pivot, the first edge is the one entering it.
            out_edges.push(edges[(pivot + n - step - 1) % n]);
        }
    }
    (out_nodes, out_edges)
}

/// An approach street attached to a crossroad.
#[derive(Debug, Clone)]
pub struct Branch {
    /// Ring node the branch leaves from.
    pub attachment: NodeIndex,
    /// Path nodes, attachment first, bifurcation (or dead end) last.
    pub nodes: Vec<NodeIndex>,
    /// Edges along the path, one fewer than nodes.
    pub edges: Vec<EdgeIndex>,
    /// Compass bearing at the attachment point, degrees in `[0, 360)`.
    pub bearing: f64,
    /// Street name, when tagged.
    pub name: Option<String>,
}

impl Branch {
    /// Terminal node of the branch, away from the crossroad.
    pub fn endpoint(&self) -> NodeIndex {
        *self.nodes.last().expect("branch has at least two nodes")
    }

    pub fn shared_edges(&self, other: &Branch) -> usize {
        self.edges
            .iter()
            .filter(|e| other.edges.contains(e))
            .count()
    }
}

/// State of a crossroad in the merge loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CrossroadState {
    /// Eligible for further merging.
    Active,
    /// Became a child of a larger crossroad.
    Merged,
    /// No further merge is possible.
    Terminal,
}

/// A segmented intersection: a ring body plus its approach branches.
#[derive(Debug, Clone)]
pub struct Crossroad {
    pub id: CrossroadId,
    pub ring: Ring,
    pub branches: Vec<Branch>,
    pub scale_level: ScaleLevel,
    /// Compactness/coherence score in `[0, 1]` used by the merger.
    pub coherence: f64,
    pub state: CrossroadState,
    /// Back-reference to the owning parent, if any.
    pub parent: Option<CrossroadId>,
    /// Children merged into this crossroad, in merge order.
    pub children: Vec<CrossroadId>,
}

/// Warnings recorded while computing a segmentation. None of these
/// abort the query.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Warning {
    /// No ring was found within the query region.
    EmptyResult,
    /// The classifier hit its iteration cap before reaching a fixed point.
    ClassifierDidNotConverge,
}

/// Forest of crossroads produced by one segmentation query.
///
/// Immutable after the merge phase; exporters rely on the stable
/// [`CrossroadId`]/[`RingId`] values to serialize relationships.
#[derive(Debug, Clone)]
pub struct SegmentationResult {
    crossroads: Vec<Crossroad>,
    roots: Vec<CrossroadId>,
    main: Option<CrossroadId>,
    warnings: Vec<Warning>,
}

impl SegmentationResult {
    pub(crate) fn new(
        crossroads: Vec<Crossroad>,
        main: Option<CrossroadId>,
        warnings: Vec<Warning>,
    ) -> Self {
        let roots = crossroads
            .iter()
            .filter(|c| c.parent.is_none())
            .map(|c| c.id)
            .collect();
        Self {
            crossroads,
            roots,
            main,
            warnings,
        }
    }

    pub(crate) fn empty(warnings: Vec<Warning>) -> Self {
        Self {
            crossroads: Vec::new(),
            roots: Vec::new(),
            main: None,
            warnings,
        }
    }

    pub fn crossroad(&self, id: CrossroadId) -> &Crossroad {
        &self.crossroads[id.0]
    }

    pub fn get(&self, id: CrossroadId) -> Option<&Crossroad> {
        self.crossroads.get(id.0)
    }

    /// Root crossroads (no parent), in ascending id order.
    pub fn roots(&self) -> impl Iterator<Item = &Crossroad> {
        self.roots.iter().map(|id| self.crossroad(*id))
    }

    /// The crossroad nearest to the query anchor, if any was found.
    pub fn main_crossroad(&self) -> Option<&Crossroad> {
        self.main.map(|id| self.crossroad(id))
    }

    /// Every crossroad in the arena, merged descendants included.
    pub fn iter(&self) -> impl Iterator<Item = &Crossroad> {
        self.crossroads.iter()
    }

    /// All descendants of a crossroad, depth first.
    pub fn descendants(&self, id: CrossroadId) -> Vec<CrossroadId> {
        let mut out = Vec::new();
        let mut stack: Vec<CrossroadId> = self.crossroad(id).children.clone();
        while let Some(next) = stack.pop() {
            out.push(next);
            stack.extend(self.crossroad(next).children.iter().copied());
        }
        out.sort_unstable();
        out
    }

    pub fn warnings(&self) -> &[Warning] {
        &self.warnings
    }

    pub fn len(&self) -> usize {
        self.crossroads.len()
    }

    pub fn is_empty(&self) -> bool {
        self.crossroads.is_empty()
    }
}
