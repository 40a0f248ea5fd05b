/*
 * SPDX-FileCopyrightText: 2025 Inria
 *
 * SPDX-License-Identifier: Apache-2.0 OR LGPL-2.1-or-later
 */

//! Connected components by a disjoint-set forest.

use crate::graphs::EdgeSet;
use dsi_progress_logger::ProgressLog;

/// A disjoint-set forest in which the root of each tree is its minimum
/// element.
#[derive(Clone, Debug)]
pub struct DisjointSets {
    parent: Box<[usize]>,
}

impl DisjointSets {
    /// Creates `n` singleton sets.
    pub fn new(n: usize) -> Self {
        Self {
            parent: (0..n).collect(),
        }
    }

    /// Returns the root of the set containing `x`, halving the path.
    pub fn find(&mut self, mut x: usize) -> usize {
        while self.parent[x] != x {
            self.parent[x] = self.parent[self.parent[x]];
            x = self.parent[x];
        }
        x
    }

    /// Merges the sets containing `x` and `y`, returning the new root.
    pub fn union(&mut self, x: usize, y: usize) -> usize {
        let (x, y) = (self.find(x), self.find(y));
        let (min, max) = (x.min(y), x.max(y));
        self.parent[max] = min;
        min
    }

    /// Returns the root of the set of each element.
    pub fn into_roots(mut self) -> Box<[usize]> {
        debug_assert!(self.parent.iter().enumerate().all(|(x, &p)| p <= x));
        // Parents are smaller than children
        for x in 0..self.parent.len() {
            self.parent[x] = self.parent[self.parent[x]];
        }
        self.parent
    }
}

/// Returns the minimum dense vertex of the component of each of
/// `num_vertices` dense vertices.
pub fn components(edges: &EdgeSet, num_vertices: usize, pl: &mut impl ProgressLog) -> Box<[usize]> {
    pl.item_name("edge");
    pl.expected_updates(Some(edges.len()));
    pl.start("Merging components...");

    let mut sets = DisjointSets::new(num_vertices);
    for &(src, dst) in edges.table().iter() {
        sets.union(src, dst);
        pl.light_update();
    }

    pl.done();
    sets.into_roots()
}

#[cfg(test)]
mod tests {
    use super::*;
    use dsi_progress_logger::no_logging;
    use std::num::NonZeroUsize;

    #[test]
    fn test_disjoint_sets() {
        let mut sets = DisjointSets::new(6);
        assert_eq!(sets.union(4, 5), 4);
        assert_eq!(sets.union(5, 2), 2);
        assert_eq!(sets.union(1, 3), 1);
        assert_eq!(sets.find(5), 2);
        assert_eq!(&*sets.into_roots(), &[0, 1, 2, 1, 2, 2]);
    }

    #[test]
    fn test_components() {
        let edges = EdgeSet::from_edges([(0, 1), (1, 2), (3, 4)], NonZeroUsize::new(2).unwrap());
        assert_eq!(&*components(&edges, 6, no_logging![]), &[0, 0, 0, 3, 3, 5]);
    }
}
