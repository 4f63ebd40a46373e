//! Proptest strategies for generating well-formed block decompositions.

use indexmap::IndexSet;
use proptest::prelude::*;

use crate::block::{Block, GraphEdge, LocationId};

/// Strategy for an acyclic decomposition rooted at `b0`.
///
/// Generated graphs have:
/// - 1..=`max_blocks` blocks named `b0`, `b1`, ...
/// - a spanning parent link for every non-root block, so everything is reachable
/// - extra forward links (from lower to higher index), giving shared successors
/// - roughly one in five blocks without edges (pass-through blocks)
pub fn arb_block_dag(max_blocks: usize) -> impl Strategy<Value = Vec<Block>> {
    (1..=max_blocks.max(1)).prop_flat_map(|n| {
        let parents: Vec<std::ops::Range<usize>> = (1..n).map(|j| 0..j).collect();
        let extra = proptest::collection::vec((0..n, 0..n), 0..=n);
        let empty = proptest::collection::vec(prop::bool::weighted(0.2), n);
        (Just(n), parents, extra, empty)
            .prop_map(|(n, parents, extra, empty)| build_dag(n, &parents, &extra, &empty))
    })
}

/// Assemble blocks from a parent assignment plus extra links.
///
/// `parents[j - 1]` is the spanning parent of block `j`; block `j` starts at
/// that parent's end location.
pub fn build_dag(
    n: usize,
    parents: &[usize],
    extra: &[(usize, usize)],
    empty: &[bool],
) -> Vec<Block> {
    let mut links: IndexSet<(usize, usize)> = IndexSet::new();
    for (j, parent) in parents.iter().enumerate() {
        links.insert((*parent, j + 1));
    }
    for &(a, b) in extra {
        if a < b {
            links.insert((a, b));
        } else if b < a {
            links.insert((b, a));
        }
    }

    let end_of = |i: usize| -> LocationId { 10 * (i + 1) };
    let start_of = |i: usize| -> LocationId {
        if i == 0 {
            0
        } else {
            end_of(parents[i - 1])
        }
    };

    (0..n)
        .map(|i| {
            let mut block = Block::new(format!("b{i}"), start_of(i), end_of(i));
            if !empty.get(i).copied().unwrap_or(false) {
                let mid = end_of(i) - 5;
                block = block.with_edges([
                    GraphEdge::new(start_of(i), mid, format!("s{i}a")),
                    GraphEdge::new(mid, end_of(i), format!("s{i}b")),
                ]);
            }
            for &(from, to) in &links {
                if from == i {
                    block = block.with_successor(format!("b{to}"));
                }
                if to == i {
                    block = block.with_predecessor(format!("b{from}"));
                }
            }
            block
        })
        .collect()
}
