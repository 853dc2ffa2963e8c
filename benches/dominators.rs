//! Full-pipeline build cost on synthetic layered graphs.

use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion};

use heapgraph::snapshot::{FieldType, HeapSnapshot, RawMeta, RawSnapshot};

const NF: usize = 6;

/// Layered graph: the root fans out to layer 0; each node links to two
/// nodes of the next layer plus one back edge, giving the dominator pass
/// real join points to intersect.
fn layered_snapshot(layers: usize, width: usize) -> RawSnapshot {
    let node_count = 1 + layers * width;
    let ordinal = |layer: usize, i: usize| 1 + layer * width + i;

    let mut edges_by_src: Vec<Vec<usize>> = vec![Vec::new(); node_count];
    for i in 0..width {
        edges_by_src[0].push(ordinal(0, i));
    }
    for layer in 0..layers - 1 {
        for i in 0..width {
            let src = ordinal(layer, i);
            edges_by_src[src].push(ordinal(layer + 1, i));
            edges_by_src[src].push(ordinal(layer + 1, (i + 1) % width));
            if i == 0 && layer > 0 {
                edges_by_src[src].push(ordinal(layer - 1, width / 2));
            }
        }
    }

    let mut nodes = Vec::with_capacity(node_count * NF);
    for ord in 0..node_count {
        let type_index = if ord == 0 { 2 } else { 1 }; // synthetic root, objects
        nodes.push(type_index);
        nodes.push(0); // name: ""
        nodes.push(2 * ord as u32 + 1);
        nodes.push(if ord == 0 { 0 } else { 16 });
        nodes.push(edges_by_src[ord].len() as u32);
        nodes.push(0);
    }

    let mut edges = Vec::new();
    for targets in &edges_by_src {
        for &to in targets {
            edges.push(0); // property
            edges.push(0); // name: ""
            edges.push((to * NF) as u32);
        }
    }

    RawSnapshot {
        meta: RawMeta {
            node_fields: ["type", "name", "id", "self_size", "edge_count", "trace_node_id"]
                .iter()
                .map(|s| s.to_string())
                .collect(),
            node_types: vec![FieldType::Enum(
                ["hidden", "object", "synthetic"]
                    .iter()
                    .map(|s| s.to_string())
                    .collect(),
            )],
            edge_fields: ["type", "name_or_index", "to_node"]
                .iter()
                .map(|s| s.to_string())
                .collect(),
            edge_types: vec![FieldType::Enum(
                ["property", "internal", "weak", "shortcut"]
                    .iter()
                    .map(|s| s.to_string())
                    .collect(),
            )],
            location_fields: Vec::new(),
            sample_fields: Vec::new(),
        },
        nodes,
        edges,
        strings: vec![String::new()],
        locations: Vec::new(),
        samples: Vec::new(),
        trace_function_infos: Vec::new(),
        trace_tree: Vec::new(),
        root_index: 0,
    }
}

fn bench_build(c: &mut Criterion) {
    let mut group = c.benchmark_group("snapshot_build");
    for &(layers, width) in &[(50usize, 20usize), (100, 100)] {
        let raw = layered_snapshot(layers, width);
        group.bench_with_input(
            BenchmarkId::from_parameter(layers * width),
            &raw,
            |b, raw| {
                b.iter(|| HeapSnapshot::from_raw(raw.clone()).unwrap());
            },
        );
    }
    group.finish();
}

criterion_group!(benches, bench_build);
criterion_main!(benches);
