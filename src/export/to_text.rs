//! Human-readable description of a segmentation

use std::fmt::Write;

use crate::export::{ExportScope, scoped_roots};
use crate::model::{Crossroad, SegmentationResult, StreetGraph};

/// Renders the selected crossroads as indented text, one line per
/// crossroad and branch. With `multiscale`, merged children follow
/// their parent at increasing indentation.
pub fn to_text(
    result: &SegmentationResult,
    graph: &StreetGraph,
    scope: ExportScope,
    multiscale: bool,
) -> String {
    let roots = scoped_roots(result, scope);
    if roots.is_empty() {
        return "no crossroads found\n".to_string();
    }

    let mut out = String::new();
    for root in roots {
        describe(&mut out, result, graph, root, multiscale, 0);
    }
    out
}

fn describe(
    out: &mut String,
    result: &SegmentationResult,
    graph: &StreetGraph,
    crossroad: &Crossroad,
    multiscale: bool,
    depth: usize,
) {
    let indent = "  ".repeat(depth);
    let node_ids: Vec<String> = crossroad
        .ring
        .nodes()
        .iter()
        .map(|n| graph.node(*n).id.to_string())
        .collect();
    let shape = if crossroad.ring.is_cycle() {
        "ring"
    } else if crossroad.ring.len() == 1 {
        "node"
    } else {
        "cluster"
    };
    let _ = writeln!(
        out,
        "{indent}crossroad #{} (scale {}): {shape} of {} node(s) [{}], coherence {:.2}",
        crossroad.id.0,
        crossroad.scale_level,
        crossroad.ring.len(),
        node_ids.join(", "),
        crossroad.coherence,
    );

    for branch in &crossroad.branches {
        let name = branch.name.as_deref().unwrap_or("unnamed street");
        let _ = writeln!(
            out,
            "{indent}  branch towards {:.0}°: {name} ({} segment(s))",
            branch.bearing,
            branch.edges.len(),
        );
    }

    if multiscale {
        for &child in &crossroad.children {
            describe(out, result, graph, result.crossroad(child), multiscale, depth + 1);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::export::test_fixtures::twin_tees_result;

    #[test]
    fn text_lists_root_and_branches() {
        let (graph, result) = twin_tees_result();
        let text = to_text(&result, &graph, ExportScope::All, false);
        assert!(text.contains("crossroad #2 (scale 1)"), "text:\n{text}");
        assert!(text.contains("branch towards"), "text:\n{text}");
        // Children are hidden without the multiscale flag.
        assert!(!text.contains("crossroad #0"), "text:\n{text}");
    }

    #[test]
    fn multiscale_includes_merged_children() {
        let (graph, result) = twin_tees_result();
        let text = to_text(&result, &graph, ExportScope::Main, true);
        assert!(text.contains("crossroad #0"), "text:\n{text}");
        assert!(text.contains("crossroad #1"), "text:\n{text}");
    }

    #[test]
    fn empty_result_renders_placeholder() {
        let (graph, _) = twin_tees_result();
        let empty = SegmentationResult::empty(Vec::new());
        let text = to_text(&empty, &graph, ExportScope::All, false);
        assert_eq!(text, "no crossroads found\n");
    }
}
