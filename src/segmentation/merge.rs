//! Multiscale merger: iterative fusion of adjacent crossroads
//!
//! A state machine over the set of Active crossroads. Each pass scores
//! every adjacent Active pair, applies the passing transitions in
//! decreasing score order, and repeats until no transition passes its
//! threshold. Crossroads still Active at that point become Terminal;
//! merged ones survive as children of their parent, preserving the full
//! multiscale hierarchy.

use hashbrown::{HashMap, HashSet};
use log::debug;
use petgraph::graph::{EdgeIndex, NodeIndex};

use crate::model::{Crossroad, CrossroadId, CrossroadState, Ring, RingId, StreetGraph};
use crate::segmentation::SegmentationParams;
use crate::segmentation::builder::{coherence_score, trace_branches};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Transition {
    /// Fuse two rings into a new parent at the next scale level (C0).
    Creation,
    /// Absorb a neighbor whose branches overlap ours, extending the
    /// branch set (C1).
    BranchMerge,
    /// Fold a small adjacent crossroad in without creating a new scale
    /// of ring (C2).
    Absorption,
}

#[derive(Debug, Clone)]
struct Candidate {
    a: CrossroadId,
    b: CrossroadId,
    transition: Transition,
    score: f64,
    /// Node count of the fused body, used as the conservative tie-break.
    combined: usize,
    /// Linking edge, when adjacency is through a crossing connector.
    connector: Option<EdgeIndex>,
}

/// Runs the merge loop to convergence, mutating the crossroad arena in
/// place. Never fails on valid classified input.
pub(crate) fn merge_multiscale(
    graph: &StreetGraph,
    crossroads: &mut Vec<Crossroad>,
    params: &SegmentationParams,
) {
    let mut next_ring_id = crossroads
        .iter()
        .map(|c| c.ring.id.0 + 1)
        .max()
        .unwrap_or(0);
    let mut pass = 0usize;

    loop {
        pass += 1;
        let candidates = collect_candidates(graph, crossroads, params);
        if candidates.is_empty() {
            break;
        }

        let mut performed = 0usize;
        for candidate in candidates {
            let (a, b) = (candidate.a, candidate.b);
            if crossroads[a.0].state != CrossroadState::Active
                || crossroads[b.0].state != CrossroadState::Active
            {
                continue;
            }
            match candidate.transition {
                Transition::Creation => {
                    apply_creation(graph, crossroads, params, &candidate, &mut next_ring_id);
                }
                Transition::BranchMerge => apply_absorb(crossroads, params, graph, a, b, true),
                Transition::Absorption => apply_absorb(crossroads, params, graph, a, b, false),
            }
            performed += 1;
        }
        debug!("merge pass {pass}: {performed} transition(s) applied");
        if performed == 0 {
            break;
        }
    }

    for crossroad in crossroads.iter_mut() {
        if crossroad.state == CrossroadState::Active {
            crossroad.state = CrossroadState::Terminal;
        }
    }
}

/// Scores every Active pair. Output is sorted by decreasing score, then
/// smaller fused size, then ids, so the application order is total.
fn collect_candidates(
    graph: &StreetGraph,
    crossroads: &[Crossroad],
    params: &SegmentationParams,
) -> Vec<Candidate> {
    let active: Vec<CrossroadId> = crossroads
        .iter()
        .filter(|c| c.state == CrossroadState::Active)
        .map(|c| c.id)
        .collect();

    let mut candidates = Vec::new();
    for (i, &a) in active.iter().enumerate() {
        for &b in &active[i + 1..] {
            if let Some(candidate) = evaluate_pair(graph, &crossroads[a.0], &crossroads[b.0], params)
            {
                candidates.push(candidate);
            }
        }
    }
    candidates.sort_by(|x, y| {
        y.score
            .total_cmp(&x.score)
            .then(x.combined.cmp(&y.combined))
            .then(x.a.cmp(&y.a))
            .then(x.b.cmp(&y.b))
    });
    candidates
}

fn evaluate_pair(
    graph: &StreetGraph,
    a: &Crossroad,
    b: &Crossroad,
    params: &SegmentationParams,
) -> Option<Candidate> {
    let shared_nodes = a.ring.shared_nodes(&b.ring);
    let shared_edges = a.ring.shared_edges(&b.ring);
    let connector = if shared_nodes == 0 {
        find_connector(graph, &a.ring, &b.ring)
    } else {
        None
    };
    if shared_nodes == 0 && connector.is_none() {
        return None;
    }

    let fused_nodes = {
        let mut union: Vec<_> = a.ring.nodes().to_vec();
        union.extend(b.ring.nodes());
        union.sort_unstable();
        union.dedup();
        union.len()
    };

    // Creation: combined coherence over the C0 threshold, fused body
    // within the ring-size bound.
    let creation_score = 0.5 * (a.coherence + b.coherence);
    if creation_score > params.c0 && fused_nodes <= params.ring_search.max_cycle_elements {
        return Some(Candidate {
            a: a.id,
            b: b.id,
            transition: Transition::Creation,
            score: creation_score,
            combined: fused_nodes,
            connector,
        });
    }

    // Branch merge: two crossroads reaching toward each other along the
    // same street.
    let overlap = branch_overlap(graph, a, b, params);
    if overlap > params.c1 {
        return Some(Candidate {
            a: a.id,
            b: b.id,
            transition: Transition::BranchMerge,
            score: overlap,
            combined: a.ring.len().max(b.ring.len()),
            connector,
        });
    }

    // Absorption: weaker adjacency folds the lesser crossroad in.
    let adjacency = adjacency_score(graph, a, b, shared_nodes, shared_edges, connector, params);
    if adjacency > params.c2 {
        return Some(Candidate {
            a: a.id,
            b: b.id,
            transition: Transition::Absorption,
            score: adjacency,
            combined: a.ring.len().max(b.ring.len()),
            connector,
        });
    }
    None
}

/// A single crossing-interior edge joining the two bodies, preferring
/// the shortest one for determinism.
fn find_connector(graph: &StreetGraph, a: &Ring, b: &Ring) -> Option<EdgeIndex> {
    let mut best: Option<(f64, EdgeIndex)> = None;
    for &node in a.nodes() {
        for edge in graph.incident_edges(node) {
            if !graph.edge(edge).kind.is_crossroad_candidate()
                || a.contains_edge(edge)
                || b.contains_edge(edge)
            {
                continue;
            }
            let other = graph.opposite(node, edge);
            if !b.contains_node(other) {
                continue;
            }
            let length = graph.edge(edge).length;
            let better = match best {
                None => true,
                Some((best_len, best_edge)) => {
                    length < best_len || (length == best_len && edge < best_edge)
                }
            };
            if better {
                best = Some((length, edge));
            }
        }
    }
    best.map(|(_, edge)| edge)
}

/// Largest overlap score over all branch pairs: the fraction of shared
/// edges, discounted by the length of the shared street so that distant
/// intersections joined by a long road do not count as one crossroad.
fn branch_overlap(
    graph: &StreetGraph,
    a: &Crossroad,
    b: &Crossroad,
    params: &SegmentationParams,
) -> f64 {
    let mut best: f64 = 0.0;
    for ba in &a.branches {
        for bb in &b.branches {
            let shared = ba.shared_edges(bb);
            if shared == 0 {
                continue;
            }
            let shared_length: f64 = ba
                .edges
                .iter()
                .filter(|e| bb.edges.contains(e))
                .map(|e| graph.edge(*e).length)
                .sum();
            let proximity = (1.0 - shared_length / params.link_reach_m).clamp(0.0, 1.0);
            let shorter = ba.edges.len().min(bb.edges.len());
            best = best.max(proximity * shared as f64 / shorter as f64);
        }
    }
    best
}

fn adjacency_score(
    graph: &StreetGraph,
    a: &Crossroad,
    b: &Crossroad,
    shared_nodes: usize,
    shared_edges: usize,
    connector: Option<EdgeIndex>,
    params: &SegmentationParams,
) -> f64 {
    if shared_nodes > 0 {
        let smaller = a.ring.len().min(b.ring.len()) as f64;
        ((shared_nodes + shared_edges) as f64 / smaller).clamp(0.0, 1.0)
    } else if let Some(edge) = connector {
        (1.0 - graph.edge(edge).length / params.link_reach_m).clamp(0.0, 1.0)
    } else {
        0.0
    }
}

fn apply_creation(
    graph: &StreetGraph,
    crossroads: &mut Vec<Crossroad>,
    params: &SegmentationParams,
    candidate: &Candidate,
    next_ring_id: &mut usize,
) {
    let (a, b) = (candidate.a, candidate.b);
    let ring = fuse_rings(
        graph,
        &crossroads[a.0].ring,
        &crossroads[b.0].ring,
        candidate.connector,
        RingId(*next_ring_id),
    );
    *next_ring_id += 1;

    let branches = trace_branches(graph, &ring);
    let coherence = coherence_score(graph, &ring, &branches, params);
    let scale_level = crossroads[a.0]
        .scale_level
        .max(crossroads[b.0].scale_level)
        .saturating_add(1);
    let id = CrossroadId(crossroads.len());

    for child in [a, b] {
        crossroads[child.0].state = CrossroadState::Merged;
        crossroads[child.0].parent = Some(id);
    }
    debug!(
        "creation: {:?} + {:?} -> {id:?} at scale {scale_level}",
        a, b
    );
    crossroads.push(Crossroad {
        id,
        ring,
        branches,
        scale_level,
        coherence,
        state: CrossroadState::Active,
        parent: None,
        children: vec![a, b],
    });
}

/// Folds the lesser crossroad of the pair into the other as a child.
/// With `extend`, the absorbed crossroad's branches that do not overlap
/// the parent's are carried over.
fn apply_absorb(
    crossroads: &mut [Crossroad],
    params: &SegmentationParams,
    graph: &StreetGraph,
    a: CrossroadId,
    b: CrossroadId,
    extend: bool,
) {
    // The bigger (then more coherent, then earlier) crossroad absorbs.
    let (parent, child) = {
        let (ca, cb) = (&crossroads[a.0], &crossroads[b.0]);
        let a_dominates = ca.ring.len() > cb.ring.len()
            || (ca.ring.len() == cb.ring.len() && ca.coherence >= cb.coherence);
        if a_dominates { (a, b) } else { (b, a) }
    };

    crossroads[child.0].state = CrossroadState::Merged;
    crossroads[child.0].parent = Some(parent);
    let child_scale = crossroads[child.0].scale_level;
    let child_branches = crossroads[child.0].branches.clone();

    crossroads[parent.0].children.push(child);
    crossroads[parent.0].scale_level = crossroads[parent.0]
        .scale_level
        .max(child_scale.saturating_add(1));

    if extend {
        let existing: HashSet<EdgeIndex> = crossroads[parent.0]
            .branches
            .iter()
            .flat_map(|br| br.edges.iter().copied())
            .collect();
        let extra: Vec<_> = child_branches
            .into_iter()
            .filter(|br| !crossroads[parent.0].ring.contains_node(br.attachment))
            .filter(|br| br.edges.iter().all(|e| !existing.contains(e)))
            .collect();
        crossroads[parent.0].branches.extend(extra);
        let score = {
            let p = &crossroads[parent.0];
            coherence_score(graph, &p.ring, &p.branches, params)
        };
        crossroads[parent.0].coherence = score;
    }
    debug!("absorb: {child:?} folded into {parent:?} (extend: {extend})");
}

/// Fuses two ring bodies. Edge-adjacent cycles fuse into the symmetric
/// difference of their edge sets; bodies touching in a node or joined
/// by a connector fuse into the element union.
fn fuse_rings(
    graph: &StreetGraph,
    a: &Ring,
    b: &Ring,
    connector: Option<EdgeIndex>,
    id: RingId,
) -> Ring {
    if a.shared_edges(b) > 0 {
        let mut edges: Vec<EdgeIndex> = a
            .edges()
            .iter()
            .filter(|e| !b.contains_edge(**e))
            .chain(b.edges().iter().filter(|e| !a.contains_edge(**e)))
            .copied()
            .collect();
        edges.sort_unstable();
        if let Some(ring) = trace_cycle(graph, &edges, id) {
            return ring;
        }
        let nodes = edges
            .iter()
            .flat_map(|e| {
                let (x, y) = graph.endpoints(*e);
                [x, y]
            })
            .collect();
        return Ring::region(id, nodes, edges);
    }

    let mut nodes = a.nodes().to_vec();
    nodes.extend(b.nodes());
    let mut edges = a.edges().to_vec();
    edges.extend(b.edges());
    edges.extend(connector);
    Ring::region(id, nodes, edges)
}

/// Orders an edge set into a single simple cycle, if it is one.
fn trace_cycle(graph: &StreetGraph, edges: &[EdgeIndex], id: RingId) -> Option<Ring> {
    if edges.len() < 3 {
        return None;
    }
    let mut incident: HashMap<NodeIndex, Vec<EdgeIndex>> = HashMap::new();
    for &edge in edges {
        let (x, y) = graph.endpoints(edge);
        incident.entry(x).or_default().push(edge);
        incident.entry(y).or_default().push(edge);
    }
    if incident.values().any(|list| list.len() != 2) {
        return None;
    }

    let start = *incident.keys().min()?;
    let mut nodes = vec![start];
    let mut path = Vec::with_capacity(edges.len());
    let mut current = start;
    let mut via = *incident[&start].iter().min()?;
    loop {
        path.push(via);
        let next = graph.opposite(current, via);
        if next == start {
            break;
        }
        if path.len() > edges.len() {
            return None;
        }
        nodes.push(next);
        via = *incident[&next].iter().find(|e| **e != via)?;
        current = next;
    }
    if path.len() != edges.len() {
        // More than one component.
        return None;
    }
    Some(Ring::cycle(id, nodes, path))
}
