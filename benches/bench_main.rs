use criterion::{Criterion, black_box, criterion_group, criterion_main};

use crossway::model::Tags;
use crossway::prelude::*;

/// A dense n x n street grid with ~11 m blocks, small enough that the
/// whole mesh classifies as crossing interior.
fn grid(n: i64) -> RawStreetGraph {
    let spacing = 0.0001;
    let mut nodes = Vec::new();
    let mut edges = Vec::new();
    for row in 0..n {
        for col in 0..n {
            let id = row * n + col + 1;
            nodes.push(RawNode {
                id,
                lng: col as f64 * spacing,
                lat: row as f64 * spacing,
                tags: Tags::new(),
            });
            let tags: Tags = [("highway", "residential")].into_iter().collect();
            if col + 1 < n {
                edges.push(RawEdge {
                    from: id,
                    to: id + 1,
                    geometry: Vec::new(),
                    tags: tags.clone(),
                });
            }
            if row + 1 < n {
                edges.push(RawEdge {
                    from: id,
                    to: id + n,
                    geometry: Vec::new(),
                    tags,
                });
            }
        }
    }
    RawStreetGraph { nodes, edges }
}

fn bench_segmentation(c: &mut Criterion) {
    let config = GraphConfig {
        radius_m: 300.0,
        ..GraphConfig::default()
    };

    c.bench_function("segment_grid_6x6", |b| {
        let graph = build_street_graph(grid(6), &config).unwrap();
        let params = SegmentationParams {
            ring_search: RingSearchParams {
                max_cycle_elements: 6,
                ..RingSearchParams::default()
            },
            ..SegmentationParams::default()
        };
        b.iter(|| {
            let mut graph = graph.clone();
            black_box(segment(&mut graph, &params).unwrap())
        });
    });

    c.bench_function("build_street_graph_12x12", |b| {
        b.iter(|| black_box(build_street_graph(grid(12), &config).unwrap()));
    });
}

criterion_group!(benches, bench_segmentation);
criterion_main!(benches);
