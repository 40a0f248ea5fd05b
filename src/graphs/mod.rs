/*
 * SPDX-FileCopyrightText: 2025 Inria
 *
 * SPDX-License-Identifier: Apache-2.0 OR LGPL-2.1-or-later
 */

//! Input graphs and the partitioned edge sets the algorithms work on.

use std::collections::HashMap;
use std::hash::Hash;

mod edge_set;
pub use edge_set::*;

/// An undirected graph given as a list of vertices with opaque attributes
/// and a list of edges between vertex identifiers.
///
/// No constraint is imposed on the edges: they may contain self-loops,
/// duplicates, and both orientations of the same edge. Endpoints must
/// however be vertices of the graph.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Graph<A> {
    vertices: Vec<(i64, A)>,
    edges: Vec<(i64, i64)>,
}

impl<A> Graph<A> {
    pub fn new(vertices: Vec<(i64, A)>, edges: Vec<(i64, i64)>) -> Self {
        Self { vertices, edges }
    }

    /// Returns the vertices with their attributes.
    #[inline(always)]
    pub fn vertices(&self) -> &[(i64, A)] {
        &self.vertices
    }

    /// Returns the edges.
    #[inline(always)]
    pub fn edges(&self) -> &[(i64, i64)] {
        &self.edges
    }

    pub fn num_vertices(&self) -> usize {
        self.vertices.len()
    }

    pub fn num_edges(&self) -> usize {
        self.edges.len()
    }
}

impl Graph<()> {
    /// Creates a graph whose vertices are the endpoints of the given arcs.
    ///
    /// ```
    /// # use starcc::graphs::Graph;
    /// let graph = Graph::from_arcs([(3, 1), (1, 2)]);
    /// assert_eq!(graph.num_vertices(), 3);
    /// ```
    pub fn from_arcs(arcs: impl IntoIterator<Item = (i64, i64)>) -> Self {
        let edges = arcs.into_iter().collect::<Vec<_>>();
        let mut ids = edges
            .iter()
            .flat_map(|&(src, dst)| [src, dst])
            .collect::<Vec<_>>();
        ids.sort_unstable();
        ids.dedup();
        Self {
            vertices: ids.into_iter().map(|id| (id, ())).collect(),
            edges,
        }
    }
}

impl<K: Hash + Eq + Clone> Graph<K> {
    /// Creates a graph from arcs between arbitrary labels.
    ///
    /// Identifiers are assigned to labels in order of first appearance,
    /// starting from zero, and each vertex carries its label as attribute.
    pub fn from_labeled_arcs(arcs: impl IntoIterator<Item = (K, K)>) -> Self {
        let mut ids = HashMap::<K, i64>::new();
        let mut vertices = Vec::new();
        let mut id_of = |label: K| -> i64 {
            *ids.entry(label.clone()).or_insert_with(|| {
                vertices.push((vertices.len() as i64, label));
                vertices.len() as i64 - 1
            })
        };
        let edges = arcs
            .into_iter()
            .map(|(src, dst)| (id_of(src), id_of(dst)))
            .collect::<Vec<_>>();
        Self { vertices, edges }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_arcs() {
        let graph = Graph::from_arcs([(5, 2), (2, 2), (7, 5)]);
        assert_eq!(graph.vertices(), &[(2, ()), (5, ()), (7, ())]);
        assert_eq!(graph.num_edges(), 3);
    }

    #[test]
    fn test_from_labeled_arcs() {
        let graph = Graph::from_labeled_arcs([("b", "a"), ("a", "c"), ("d", "d")]);
        assert_eq!(
            graph.vertices(),
            &[(0, "b"), (1, "a"), (2, "c"), (3, "d")]
        );
        assert_eq!(graph.edges(), &[(0, 1), (1, 2), (3, 3)]);
    }
}
