/*
 * SPDX-FileCopyrightText: 2025 Inria
 *
 * SPDX-License-Identifier: Apache-2.0 OR LGPL-2.1-or-later
 */

//! Minimum neighbor and degree of each vertex of an edge set.

use crate::dataflow::{hash_node, Partitioned};
use crate::graphs::EdgeSet;
use itertools::Itertools;
use std::collections::HashMap;
use std::num::NonZeroUsize;

/// The minimum neighbor and the number of neighbors of a vertex in the
/// symmetrized edge set.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NeighborAggregate {
    pub vertex: usize,
    pub min_neighbor: usize,
    pub degree: u64,
}

impl NeighborAggregate {
    /// Returns the minimum between the vertex and its minimum neighbor.
    #[inline(always)]
    pub fn min_inclusive(&self) -> usize {
        self.vertex.min(self.min_neighbor)
    }

    #[inline(always)]
    fn merge(self, other: Self) -> Self {
        debug_assert_eq!(self.vertex, other.vertex);
        Self {
            vertex: self.vertex,
            min_neighbor: self.min_neighbor.min(other.min_neighbor),
            degree: self.degree + other.degree,
        }
    }
}

/// Merges consecutive aggregates of the same vertex.
fn coalesce(aggs: impl IntoIterator<Item = NeighborAggregate>) -> Vec<NeighborAggregate> {
    aggs.into_iter()
        .coalesce(|a, b| {
            if a.vertex == b.vertex {
                Ok(a.merge(b))
            } else {
                Err((a, b))
            }
        })
        .collect()
}

/// The neighbor aggregates of an edge set, one per vertex appearing in some
/// edge.
///
/// Aggregates are partitioned by [`hash_node`] of the vertex, with the same
/// number of partitions as the edge set they were computed from, and each
/// partition is sorted by vertex.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NeighborAggregates {
    table: Partitioned<NeighborAggregate>,
}

impl NeighborAggregates {
    /// Computes the aggregates of an edge set.
    ///
    /// Each edge partition is symmetrized and partially aggregated in place;
    /// partial aggregates are then shuffled by vertex and merged.
    pub fn compute(edges: &EdgeSet) -> Self {
        let num_partitions =
            NonZeroUsize::new(edges.num_partitions()).unwrap_or(NonZeroUsize::MIN);
        let partial = edges.table().map_partitions(|part| {
            let mut arcs = part
                .iter()
                .flat_map(|&(src, dst)| [(src, dst), (dst, src)])
                .collect::<Vec<_>>();
            arcs.sort_unstable();
            coalesce(arcs.into_iter().map(|(vertex, neighbor)| NeighborAggregate {
                vertex,
                min_neighbor: neighbor,
                degree: 1,
            }))
        });

        let table = partial
            .shuffle(num_partitions, |agg| hash_node(agg.vertex))
            .into_map_partitions(|mut part| {
                part.sort_unstable_by_key(|agg| agg.vertex);
                coalesce(part)
            });

        Self { table }
    }

    /// Collects the aggregates of vertices with degree larger than
    /// `threshold`.
    pub fn hubs(&self, threshold: u64) -> HashMap<usize, NeighborAggregate> {
        self.table
            .iter()
            .filter(|agg| agg.degree > threshold)
            .map(|agg| (agg.vertex, *agg))
            .collect()
    }

    #[inline(always)]
    pub fn table(&self) -> &Partitioned<NeighborAggregate> {
        &self.table
    }
}
