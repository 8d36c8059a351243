//! Performance benchmarks for page-tree operations
//!
//! Run with: `cargo bench -p pagetree-core`
//!
//! These benchmarks measure critical path performance:
//! - Path codec throughput (encode/decode of sibling segments)
//! - Bulk child creation against the in-memory store
//! - Whole-tree repair (fix_tree) over a wide fixture

use criterion::{black_box, criterion_group, criterion_main, Criterion};
use pagetree_core::models::PageNode;
use pagetree_core::services::{ContentTypeRegistry, TreeMutator};
use pagetree_core::{path, MemoryStore};
use std::sync::Arc;
use tokio::runtime::Runtime;

fn setup_mutator() -> (TreeMutator, Arc<MemoryStore>) {
    let store = Arc::new(MemoryStore::new());
    let mutator = TreeMutator::new(store.clone(), Arc::new(ContentTypeRegistry::new()));
    (mutator, store)
}

/// Seed a three-level tree of `roots * children * children` nodes directly,
/// with stale denormalized columns so fix_tree has real work to do.
fn seed_scrambled_tree(store: &MemoryStore, roots: u32, children: u32) {
    let mut rows = Vec::new();
    for r in 0..roots {
        let root_path = path::encode(r).unwrap();
        let mut root = PageNode::new(format!("Root {}", r));
        root.path = root_path.clone();
        rows.push(root);
        for c in 0..children {
            let child_path = path::child_path(&root_path, c).unwrap();
            let mut child = PageNode::new(format!("Child {} {}", r, c));
            child.path = child_path.clone();
            child.depth = 7; // wrong on purpose
            rows.push(child);
            for g in 0..children {
                let mut leaf = PageNode::new(format!("Leaf {} {} {}", r, c, g));
                leaf.path = path::child_path(&child_path, g).unwrap();
                leaf.url_path = "/stale".to_string();
                rows.push(leaf);
            }
        }
    }
    store.seed(rows);
}

fn bench_path_codec(c: &mut Criterion) {
    c.bench_function("path_encode_decode_999", |b| {
        b.iter(|| {
            for index in 0..path::MAX_CHILDREN {
                let segment = path::encode(black_box(index)).unwrap();
                black_box(path::decode(&segment).unwrap());
            }
        })
    });

    let deep: String = (0..10)
        .map(|i| path::encode(i).unwrap())
        .collect::<Vec<_>>()
        .join("");
    c.bench_function("path_ancestors_depth_10", |b| {
        b.iter(|| black_box(path::ancestor_paths(black_box(&deep)).unwrap()))
    });
}

fn bench_add_children(c: &mut Criterion) {
    let rt = Runtime::new().unwrap();

    c.bench_function("add_100_children", |b| {
        b.iter(|| {
            rt.block_on(async {
                let (mutator, _store) = setup_mutator();
                let root = mutator.add_root(None, PageNode::new("Root")).await.unwrap();
                for i in 0..100 {
                    mutator
                        .add_child(None, root.pk, PageNode::new(format!("Child {}", i)))
                        .await
                        .unwrap();
                }
            })
        })
    });
}

fn bench_fix_tree(c: &mut Criterion) {
    let rt = Runtime::new().unwrap();

    c.bench_function("fix_tree_1k_nodes", |b| {
        b.iter(|| {
            rt.block_on(async {
                let (mutator, store) = setup_mutator();
                seed_scrambled_tree(&store, 4, 15);
                black_box(mutator.fix_tree(None).await.unwrap());
            })
        })
    });
}

criterion_group!(benches, bench_path_codec, bench_add_children, bench_fix_tree);
criterion_main!(benches);
