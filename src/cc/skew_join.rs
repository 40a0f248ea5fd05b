/*
 * SPDX-FileCopyrightText: 2025 Inria
 *
 * SPDX-License-Identifier: Apache-2.0 OR LGPL-2.1-or-later
 */

//! Joins of edge sets with neighbor aggregates that are robust to skewed
//! degree distributions.
//!
//! A plain shuffle join moves every edge to the partition of its source, so
//! all edges of a vertex of very high degree (a *hub*) end up in the same
//! partition. Hubs are thus handled separately: their aggregates are
//! collected in a map which is probed by every edge partition in place, and
//! only the remaining edges are shuffled.

use super::neighbors::{NeighborAggregate, NeighborAggregates};
use super::RunContext;
use crate::dataflow::{hash_node, Partitioned};
use crate::graphs::{Edge, EdgeSet};
use std::collections::HashMap;
use std::num::NonZeroUsize;

/// Joins `edges` with `aggs` on the source of the edges, returning the result
/// of `emit` on each matching pair.
///
/// Vertices whose degree is larger than `broadcast_threshold` are joined by
/// broadcast, the others by shuffle. A threshold of zero disables the
/// broadcast path. The strategy does not affect the multiset of results.
pub fn skew_join<U, F>(
    edges: &EdgeSet,
    aggs: &NeighborAggregates,
    broadcast_threshold: u64,
    ctx: &RunContext,
    emit: F,
) -> Partitioned<U>
where
    U: Send + Sync,
    F: Fn(Edge, &NeighborAggregate) -> U + Sync,
{
    let hubs = if broadcast_threshold == 0 {
        HashMap::new()
    } else {
        aggs.hubs(broadcast_threshold)
    };
    log::debug!(
        "{ctx} {} hub(s) with degree above {broadcast_threshold}",
        hubs.len()
    );

    let shuffled = shuffle_join(edges, aggs, &hubs, &emit);
    if hubs.is_empty() {
        return shuffled;
    }
    broadcast_join(edges, &hubs, &emit).union(shuffled)
}

/// Joins in place the edges whose source is a hub.
fn broadcast_join<U, F>(
    edges: &EdgeSet,
    hubs: &HashMap<usize, NeighborAggregate>,
    emit: &F,
) -> Partitioned<U>
where
    U: Send + Sync,
    F: Fn(Edge, &NeighborAggregate) -> U + Sync,
{
    edges.table().map_partitions(|part| {
        part.iter()
            .filter_map(|&edge| hubs.get(&edge.0).map(|agg| emit(edge, agg)))
            .collect()
    })
}

/// Shuffles the edges whose source is not a hub to the partition of their
/// source and joins them with the co-partitioned aggregates.
fn shuffle_join<U, F>(
    edges: &EdgeSet,
    aggs: &NeighborAggregates,
    hubs: &HashMap<usize, NeighborAggregate>,
    emit: &F,
) -> Partitioned<U>
where
    U: Send + Sync,
    F: Fn(Edge, &NeighborAggregate) -> U + Sync,
{
    let num_partitions =
        NonZeroUsize::new(aggs.table().num_partitions()).unwrap_or(NonZeroUsize::MIN);
    edges
        .table()
        .map_partitions(|part| {
            part.iter()
                .copied()
                .filter(|(src, _)| !hubs.contains_key(src))
                .collect()
        })
        .shuffle(num_partitions, |&(src, _)| hash_node(src))
        .zip_partitions(aggs.table(), |edges, aggs| {
            edges
                .iter()
                .filter_map(|&edge| {
                    aggs.binary_search_by_key(&edge.0, |agg| agg.vertex)
                        .ok()
                        .map(|pos| emit(edge, &aggs[pos]))
                })
                .collect()
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn join(edges: &EdgeSet, threshold: u64) -> Vec<(usize, usize, u64)> {
        let aggs = NeighborAggregates::compute(edges);
        let ctx = RunContext::with_id("test");
        let mut result = skew_join(edges, &aggs, threshold, &ctx, |(src, dst), agg| {
            (src, dst, agg.degree)
        })
        .iter()
        .copied()
        .collect::<Vec<_>>();
        result.sort();
        result
    }

    #[test]
    fn test_strategies_agree() {
        let edges = EdgeSet::from_edges(
            (1..50)
                .map(|leaf| (0, leaf))
                .chain([(1, 2), (3, 4), (3, 5), (60, 61)]),
            NonZeroUsize::new(4).unwrap(),
        );
        let expected = join(&edges, 0);
        assert_eq!(expected.len(), edges.len());
        assert!(expected.contains(&(0, 7, 49)));
        // Vertex 3 is also a leaf of the star
        assert!(expected.contains(&(3, 5, 3)));
        assert!(expected.contains(&(60, 61, 1)));
        for threshold in [1, 2, 10, 49, 1000] {
            assert_eq!(join(&edges, threshold), expected);
        }
    }
}
