/*
 * SPDX-FileCopyrightText: 2025 Inria
 *
 * SPDX-License-Identifier: Apache-2.0 OR LGPL-2.1-or-later
 */

//! Graph normalization.

use super::CcError;
use crate::graphs::{EdgeSet, Graph};
use crate::utils::{MemoryUsage, SortPairs};
use anyhow::{Context, Result};
use dsi_progress_logger::ProgressLog;
use itertools::Itertools;
use std::num::NonZeroUsize;

/// A graph renumbered densely, with a canonical edge set.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Normalized {
    /// The original identifiers, sorted and without duplicates: dense vertex
    /// `i` is original vertex `ids[i]`.
    pub ids: Box<[i64]>,
    /// Edges `(src, dst)` between dense vertices with `src < dst`, without
    /// duplicates. Each partition is sorted.
    pub edges: EdgeSet,
}

impl Normalized {
    /// Returns the canonical edges in original identifiers, sorted.
    pub fn original_edges(&self) -> Vec<(i64, i64)> {
        self.edges
            .to_sorted_vec()
            .into_iter()
            .map(|(src, dst)| (self.ids[src], self.ids[dst]))
            .collect()
    }
}

/// Normalizes a graph.
///
/// Vertices are renumbered densely in increasing order of identifier, so the
/// renumbering preserves the order. Self-loops are dropped, and every other
/// edge is oriented from its smaller to its larger endpoint. Edges are then
/// sorted externally using [`SortPairs`] with the given memory usage,
/// deduplicated, and distributed among `num_partitions` partitions.
///
/// An edge with an endpoint that is not a vertex of the graph causes a
/// [`CcError::UnknownVertex`] error.
pub fn normalize<A>(
    graph: &Graph<A>,
    num_partitions: NonZeroUsize,
    memory_usage: MemoryUsage,
    pl: &mut impl ProgressLog,
) -> Result<Normalized> {
    let mut ids = graph
        .vertices()
        .iter()
        .map(|&(id, _)| id)
        .collect::<Vec<_>>();
    ids.sort_unstable();
    ids.dedup();
    let ids = ids.into_boxed_slice();

    let dir = tempfile::tempdir().context("Could not create temporary directory")?;
    let mut sorter = SortPairs::new(memory_usage, dir.path())?;

    pl.item_name("edge");
    pl.expected_updates(Some(graph.num_edges()));
    pl.start("Normalizing edges...");

    for &(src, dst) in graph.edges() {
        let (Ok(x), Ok(y)) = (ids.binary_search(&src), ids.binary_search(&dst)) else {
            return Err(CcError::UnknownVertex { src, dst }.into());
        };
        if x != y {
            sorter.push(x.min(y), x.max(y))?;
        }
        pl.light_update();
    }

    let edges = EdgeSet::from_edges(sorter.iter()?.dedup(), num_partitions);
    pl.done();

    Ok(Normalized { ids, edges })
}
