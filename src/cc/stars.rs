/*
 * SPDX-FileCopyrightText: 2025 Inria
 *
 * SPDX-License-Identifier: Apache-2.0 OR LGPL-2.1-or-later
 */

//! Large-star and small-star supersteps.
//!
//! Both supersteps take an edge set and return a new one with the same
//! connected components. Given the neighbor aggregates of the current edge
//! set, and denoting with *m*(*v*) the minimum between *v* and its
//! neighbors:
//!
//! - *large-star* connects every vertex to *m*(*u*) for each smaller
//!   neighbor *u*; its input must satisfy `src < dst`, and its output
//!   satisfies `src > dst`;
//! - *small-star* connects every vertex *v* to *m*(*v*), and every smaller
//!   neighbor of *v* to the minimum neighbor of *v*; its input must satisfy
//!   `src > dst`, and its output satisfies `src < dst`.
//!
//! Alternating the two supersteps turns each connected component into a star
//! centered at its minimum vertex in a number of supersteps logarithmic in
//! the diameter.

use super::checkpoint::CheckpointManager;
use super::convergence::{Convergence, ConvergenceDetector, ConvergenceSum};
use super::neighbors::NeighborAggregates;
use super::skew_join::skew_join;
use super::RunContext;
use crate::graphs::EdgeSet;
use anyhow::{Context, Result};
use dsi_progress_logger::ProgressLog;

/// Performs a large-star superstep.
pub fn large_star(edges: EdgeSet, broadcast_threshold: u64, ctx: &RunContext) -> EdgeSet {
    let aggs = NeighborAggregates::compute(&edges);
    let joined = skew_join(&edges, &aggs, broadcast_threshold, ctx, |(_, dst), agg| {
        (dst, agg.min_inclusive())
    });
    EdgeSet::with_lineage(joined, edges.lineage() + 1).distinct()
}

/// Performs a small-star superstep.
pub fn small_star(edges: EdgeSet, broadcast_threshold: u64, ctx: &RunContext) -> EdgeSet {
    let aggs = NeighborAggregates::compute(&edges);
    let joined = skew_join(&edges, &aggs, broadcast_threshold, ctx, |(_, dst), agg| {
        (agg.min_neighbor, dst)
    });
    let to_min = aggs
        .table()
        .map_partitions(|part| part.iter().map(|agg| (agg.min_inclusive(), agg.vertex)).collect());
    let union = joined.union(to_min).filter(|&(src, dst)| src != dst);
    EdgeSet::with_lineage(union, edges.lineage() + 1).distinct()
}

/// The final state of the iteration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FixedPoint {
    /// The final edge set: a star for each connected component with at least
    /// two vertices, with edges from the minimum vertex to all others.
    pub edges: EdgeSet,
    /// The number of supersteps performed.
    pub num_supersteps: usize,
    /// The convergence sum observed after each superstep.
    pub convergence_sums: Vec<ConvergenceSum>,
}

/// Alternates large-star and small-star supersteps starting from a
/// normalized edge set until the sum of the sources is stable or the edge set
/// is empty.
///
/// If `checkpoints` is not [`None`], edge sets are checkpointed when due.
/// An empty edge set requires no supersteps.
pub fn iterate(
    mut edges: EdgeSet,
    broadcast_threshold: u64,
    mut checkpoints: Option<&mut CheckpointManager>,
    ctx: &RunContext,
    pl: &mut impl ProgressLog,
) -> Result<FixedPoint> {
    let mut detector = ConvergenceDetector::new();
    if edges.is_empty() {
        log::info!("{ctx} No edges: every vertex is a component");
        return Ok(FixedPoint {
            edges,
            num_supersteps: 0,
            convergence_sums: vec![],
        });
    }

    pl.item_name("superstep");
    pl.expected_updates(None);
    pl.start(format!(
        "{ctx} Contracting {} edges with broadcast threshold {}",
        edges.len(),
        broadcast_threshold
    ));

    let mut superstep = 0;
    loop {
        superstep += 1;
        edges = small_star(large_star(edges, broadcast_threshold, ctx), broadcast_threshold, ctx);
        log::debug!("{ctx} Superstep {superstep} has lineage {}", edges.lineage());

        if let Some(checkpoints) = checkpoints.as_deref_mut() {
            if checkpoints.is_due(superstep) {
                edges = checkpoints
                    .checkpoint(superstep, edges, ctx)
                    .with_context(|| format!("Could not checkpoint superstep {superstep}"))?;
            }
        }

        let convergence = detector.observe(&edges)?;
        pl.update_and_display();
        match convergence {
            Convergence::Running(sum) => {
                log::info!(
                    "{ctx} Superstep {superstep}: sum {} over {} edges",
                    sum.sum,
                    sum.num_edges
                );
            }
            Convergence::Converged(sum) => {
                log::info!(
                    "{ctx} Superstep {superstep}: sum {} over {} edges (stable)",
                    sum.sum,
                    sum.num_edges
                );
                break;
            }
        }
    }

    pl.done();

    Ok(FixedPoint {
        edges,
        num_supersteps: superstep,
        convergence_sums: detector.into_sums(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use dsi_progress_logger::no_logging;
    use std::num::NonZeroUsize;

    fn ctx() -> RunContext {
        RunContext::with_id("test")
    }

    #[test]
    fn test_large_star() {
        let edges = EdgeSet::from_edges([(0, 1), (1, 2), (2, 3)], NonZeroUsize::new(2).unwrap());
        let large = large_star(edges, 0, &ctx());
        assert_eq!(large.to_sorted_vec(), vec![(1, 0), (2, 0), (3, 1)]);
        assert_eq!(large.lineage(), 2);
    }

    #[test]
    fn test_small_star() {
        let edges = EdgeSet::from_edges([(1, 0), (2, 0), (3, 1)], NonZeroUsize::new(2).unwrap());
        let small = small_star(edges, 0, &ctx());
        assert_eq!(small.to_sorted_vec(), vec![(0, 1), (0, 2), (1, 3)]);
    }

    #[test]
    fn test_path() -> Result<()> {
        let edges = EdgeSet::from_edges([(0, 1), (1, 2), (2, 3)], NonZeroUsize::new(3).unwrap());
        let fixed_point = iterate(edges, 0, None, &ctx(), no_logging![])?;
        assert_eq!(fixed_point.edges.to_sorted_vec(), vec![(0, 1), (0, 2), (0, 3)]);
        assert_eq!(fixed_point.num_supersteps, 3);
        let sums = fixed_point
            .convergence_sums
            .iter()
            .map(|s| s.sum)
            .collect::<Vec<_>>();
        assert_eq!(sums, vec![1, 0, 0]);
        Ok(())
    }

    #[test]
    fn test_empty() -> Result<()> {
        let edges = EdgeSet::from_edges([], NonZeroUsize::MIN);
        let fixed_point = iterate(edges, 0, None, &ctx(), no_logging![])?;
        assert_eq!(fixed_point.num_supersteps, 0);
        assert!(fixed_point.convergence_sums.is_empty());
        Ok(())
    }
}
