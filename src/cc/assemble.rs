/*
 * SPDX-FileCopyrightText: 2025 Inria
 *
 * SPDX-License-Identifier: Apache-2.0 OR LGPL-2.1-or-later
 */

//! Assembly of component assignments.

use crate::graphs::{EdgeSet, Graph};
use anyhow::{Context, Result};

/// A vertex of the input graph with its component.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ComponentRow<A> {
    /// The original identifier of the vertex.
    pub id: i64,
    /// The original attribute of the vertex.
    pub attr: A,
    /// The minimum original identifier in the component of the vertex.
    pub component: i64,
}

/// Returns the dense component of each of `num_vertices` dense vertices
/// given the final edge set of the iteration.
///
/// A vertex that is the destination of some edge belongs to the component of
/// the source of that edge; any other vertex is the minimum of its component.
pub fn star_centers(edges: &EdgeSet, num_vertices: usize) -> Box<[usize]> {
    let mut components = (0..num_vertices).collect::<Box<[_]>>();
    for &(src, dst) in edges.table().iter() {
        components[dst] = components[dst].min(src);
    }
    components
}

/// Attaches to each vertex of `graph` its component.
///
/// `ids` are the sorted original identifiers of the vertices, and
/// `components` contains the dense component of each dense vertex.
pub fn assemble<A: Clone>(
    graph: &Graph<A>,
    ids: &[i64],
    components: &[usize],
) -> Result<Vec<ComponentRow<A>>> {
    graph
        .vertices()
        .iter()
        .map(|(id, attr)| {
            let dense = ids
                .binary_search(id)
                .ok()
                .with_context(|| format!("Vertex {id} has not been normalized"))?;
            Ok(ComponentRow {
                id: *id,
                attr: attr.clone(),
                component: ids[components[dense]],
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::num::NonZeroUsize;

    #[test]
    fn test_star_centers() {
        let edges = EdgeSet::from_edges([(0, 1), (0, 3), (2, 5)], NonZeroUsize::new(2).unwrap());
        assert_eq!(&*star_centers(&edges, 7), &[0, 0, 2, 0, 4, 2, 6]);
    }

    #[test]
    fn test_assemble() -> Result<()> {
        let graph = Graph::new(
            vec![(30, "c"), (10, "a"), (20, "b"), (40, "d")],
            vec![(30, 10)],
        );
        let rows = assemble(&graph, &[10, 20, 30, 40], &[0, 1, 0, 3])?;
        let components = rows
            .iter()
            .map(|row| (row.id, row.attr, row.component))
            .collect::<Vec<_>>();
        assert_eq!(
            components,
            vec![(30, "c", 10), (10, "a", 10), (20, "b", 20), (40, "d", 40)]
        );
        Ok(())
    }
}
