/*
 * SPDX-FileCopyrightText: 2025 Inria
 *
 * SPDX-License-Identifier: Apache-2.0 OR LGPL-2.1-or-later
 */

use crate::dataflow::{hash_pair, Partitioned};
use std::num::NonZeroUsize;

/// A directed pair of dense vertex identifiers.
pub type Edge = (usize, usize);

/// A partitioned set of edges between dense vertex identifiers.
///
/// Besides the edges, an edge set carries its *lineage*, that is, the number
/// of transformations applied since the edges were last materialized (read
/// from storage or built from a list). Checkpointing resets the lineage to
/// zero.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct EdgeSet {
    table: Partitioned<Edge>,
    lineage: usize,
}

impl EdgeSet {
    /// Creates a materialized edge set from partitioned edges.
    pub fn new(table: Partitioned<Edge>) -> Self {
        Self { table, lineage: 0 }
    }

    /// Creates an edge set derived from `table` by `lineage` transformations.
    pub fn with_lineage(table: Partitioned<Edge>, lineage: usize) -> Self {
        Self { table, lineage }
    }

    /// Creates a materialized edge set by hash-partitioning a list of edges.
    ///
    /// Duplicates are not removed.
    pub fn from_edges(
        edges: impl IntoIterator<Item = Edge>,
        num_partitions: NonZeroUsize,
    ) -> Self {
        Self::new(Partitioned::from_iter_by(edges, num_partitions, |&e| {
            hash_pair(e)
        }))
    }

    /// Removes duplicate edges by shuffling on the whole edge.
    ///
    /// Each resulting partition is sorted.
    pub fn distinct(self) -> Self {
        let num_partitions = NonZeroUsize::new(self.table.num_partitions())
            .unwrap_or(NonZeroUsize::MIN);
        Self {
            table: self
                .table
                .shuffle(num_partitions, |&e| hash_pair(e))
                .sort_dedup(),
            lineage: self.lineage + 1,
        }
    }

    #[inline(always)]
    pub fn table(&self) -> &Partitioned<Edge> {
        &self.table
    }

    /// Returns the number of transformations since the last materialization.
    #[inline(always)]
    pub fn lineage(&self) -> usize {
        self.lineage
    }

    #[inline(always)]
    pub fn num_partitions(&self) -> usize {
        self.table.num_partitions()
    }

    /// Returns the number of edges.
    pub fn len(&self) -> usize {
        self.table.len()
    }

    pub fn is_empty(&self) -> bool {
        self.table.is_empty()
    }

    /// Returns all edges in lexicographical order.
    pub fn to_sorted_vec(&self) -> Vec<Edge> {
        let mut edges = self.table.iter().copied().collect::<Vec<_>>();
        edges.sort_unstable();
        edges
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_distinct() {
        let edges = EdgeSet::from_edges(
            [(1, 2), (0, 3), (1, 2), (0, 3), (2, 4)],
            NonZeroUsize::new(3).unwrap(),
        );
        assert_eq!(edges.len(), 5);
        assert_eq!(edges.lineage(), 0);
        let edges = edges.distinct();
        assert_eq!(edges.lineage(), 1);
        assert!(edges.table().is_sorted());
        assert_eq!(edges.to_sorted_vec(), vec![(0, 3), (1, 2), (2, 4)]);
    }
}
