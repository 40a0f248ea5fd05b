/*
 * SPDX-FileCopyrightText: 2025 Inria
 *
 * SPDX-License-Identifier: Apache-2.0 OR LGPL-2.1-or-later
 */

//! Connected components by alternating large-star and small-star
//! contraction.
//!
//! Every vertex is assigned the minimum identifier of its connected
//! component. The computation starts by [normalizing](normalize) the graph,
//! that is, renumbering vertices densely (preserving order) and turning edges
//! into a duplicate-free set of pairs `(src, dst)` with `src < dst`. Then
//! a [backend](ComponentsBackend) contracts the edge set:
//!
//! - [`StarsBackend`] alternates [large-star](stars::large_star) and
//!   [small-star](stars::small_star) supersteps until the sum of the sources
//!   of the edges is stable; the final edge set is a forest of stars whose
//!   centers are the minimum vertices of the components;
//! - [`UnionFindBackend`] runs a disjoint-set forest over the edges.
//!
//! Finally, the [assembler](assemble) maps the component of each vertex back
//! to original identifiers.
//!
//! ```
//! # use starcc::prelude::*;
//! # use dsi_progress_logger::no_logging;
//! # fn main() -> anyhow::Result<()> {
//! let graph = Graph::from_arcs([(1, 2), (2, 3), (4, 5)]);
//! let output = ConnectedComponents::new()
//!     .checkpoint_interval(0)
//!     .run(&graph, no_logging![])?;
//! let components = output
//!     .rows
//!     .iter()
//!     .map(|row| (row.id, row.component))
//!     .collect::<Vec<_>>();
//! assert_eq!(components, vec![(1, 1), (2, 1), (3, 1), (4, 4), (5, 4)]);
//! # Ok(())
//! # }
//! ```

use crate::graphs::{EdgeSet, Graph};
use crate::utils::{random_id, MemoryUsage};
use anyhow::{Context, Result};
use dsi_progress_logger::ProgressLog;
use std::fmt::Display;
use std::num::NonZeroUsize;
use std::path::{Path, PathBuf};

pub mod assemble;
pub mod checkpoint;
pub mod convergence;
pub mod neighbors;
pub mod normalize;
pub mod skew_join;
pub mod stars;
pub mod union_find;

pub use assemble::ComponentRow;
pub use checkpoint::CheckpointManager;
pub use convergence::ConvergenceSum;
pub use normalize::{normalize, Normalized};

/// The default degree above which a vertex is joined by broadcast.
pub const DEFAULT_BROADCAST_THRESHOLD: u64 = 1_000_000;

/// The default number of supersteps between checkpoints.
pub const DEFAULT_CHECKPOINT_INTERVAL: i32 = 1;

/// The domain errors of a connected-components run.
///
/// They are returned wrapped in an [`anyhow::Error`], from which they can
/// be recovered with [`downcast_ref`](anyhow::Error::downcast_ref).
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum CcError {
    /// Checkpointing is enabled but no directory was given.
    #[error("Checkpointing every {interval} superstep(s) requires a checkpoint directory")]
    MissingCheckpointDir { interval: i32 },
    /// The sum of the sources does not fit the precision budget.
    #[error("The sum of the sources of {num_edges} edges does not fit in {digits} decimal digits")]
    SumOverflow { digits: u32, num_edges: usize },
    /// An edge has an endpoint that is not a vertex.
    #[error("Edge ({src}, {dst}) has an endpoint that is not a vertex of the graph")]
    UnknownVertex { src: i64, dst: i64 },
}

/// The algorithm used to contract the edge set.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Algorithm {
    /// Alternating large-star and small-star supersteps.
    #[default]
    LargeSmallStar,
    /// A sequential disjoint-set forest.
    UnionFind,
}

/// The context of a run, shared by all its phases.
///
/// Its [`Display`] implementation is the prefix of all log lines of the run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunContext {
    run_id: String,
}

impl RunContext {
    /// Creates a context with a fresh random run identifier.
    pub fn new() -> Self {
        Self::with_id(random_id())
    }

    pub fn with_id(run_id: impl Into<String>) -> Self {
        Self {
            run_id: run_id.into(),
        }
    }

    pub fn run_id(&self) -> &str {
        &self.run_id
    }
}

impl Default for RunContext {
    fn default() -> Self {
        Self::new()
    }
}

impl Display for RunContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[CC {}]", self.run_id)
    }
}

/// Component assignment over dense vertices computed by a backend.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Components {
    /// The dense component of each dense vertex.
    pub components: Box<[usize]>,
    /// The number of supersteps performed (zero for non-iterative backends).
    pub num_supersteps: usize,
    /// The convergence sum observed after each superstep.
    pub convergence_sums: Vec<ConvergenceSum>,
}

/// A strategy computing the connected components of a normalized edge set.
pub trait ComponentsBackend {
    /// Computes the component of each of the `num_vertices` dense vertices
    /// given the normalized `edges`.
    fn compute(
        &mut self,
        edges: EdgeSet,
        num_vertices: usize,
        ctx: &RunContext,
        pl: &mut impl ProgressLog,
    ) -> Result<Components>;
}

/// The large-star/small-star backend.
#[derive(Debug)]
pub struct StarsBackend {
    broadcast_threshold: u64,
    checkpoints: Option<CheckpointManager>,
}

impl StarsBackend {
    pub fn new(broadcast_threshold: u64, checkpoints: Option<CheckpointManager>) -> Self {
        Self {
            broadcast_threshold,
            checkpoints,
        }
    }
}

impl ComponentsBackend for StarsBackend {
    fn compute(
        &mut self,
        edges: EdgeSet,
        num_vertices: usize,
        ctx: &RunContext,
        pl: &mut impl ProgressLog,
    ) -> Result<Components> {
        let fixed_point = stars::iterate(
            edges,
            self.broadcast_threshold,
            self.checkpoints.as_mut(),
            ctx,
            pl,
        )?;
        if let Some(checkpoints) = self.checkpoints.as_mut() {
            checkpoints.cleanup()?;
        }
        Ok(Components {
            components: assemble::star_centers(&fixed_point.edges, num_vertices),
            num_supersteps: fixed_point.num_supersteps,
            convergence_sums: fixed_point.convergence_sums,
        })
    }
}

/// The union-find backend.
#[derive(Debug, Default, Clone, Copy)]
pub struct UnionFindBackend;

impl ComponentsBackend for UnionFindBackend {
    fn compute(
        &mut self,
        edges: EdgeSet,
        num_vertices: usize,
        ctx: &RunContext,
        pl: &mut impl ProgressLog,
    ) -> Result<Components> {
        log::debug!("{ctx} Running union-find on {} edges", edges.len());
        Ok(Components {
            components: union_find::components(&edges, num_vertices, pl),
            num_supersteps: 0,
            convergence_sums: vec![],
        })
    }
}

/// The result of a connected-components run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConnectedComponentsOutput<A> {
    /// One row per input vertex, in the order of the input.
    pub rows: Vec<ComponentRow<A>>,
    /// The number of supersteps performed.
    pub num_supersteps: usize,
    /// The convergence sum observed after each superstep.
    pub convergence_sums: Vec<ConvergenceSum>,
    /// The identifier of the run.
    pub run_id: String,
}

/// Builder and entry point of a connected-components computation.
///
/// Checkpointing is enabled by default (every superstep), so a
/// [checkpoint directory](Self::checkpoint_dir) must be given unless
/// checkpointing is disabled by setting a nonpositive
/// [interval](Self::checkpoint_interval).
#[derive(Debug, Clone)]
pub struct ConnectedComponents {
    broadcast_threshold: u64,
    checkpoint_interval: i32,
    checkpoint_dir: Option<PathBuf>,
    algorithm: Algorithm,
    num_partitions: NonZeroUsize,
    memory_usage: MemoryUsage,
}

impl Default for ConnectedComponents {
    fn default() -> Self {
        Self::new()
    }
}

impl ConnectedComponents {
    pub fn new() -> Self {
        Self {
            broadcast_threshold: DEFAULT_BROADCAST_THRESHOLD,
            checkpoint_interval: DEFAULT_CHECKPOINT_INTERVAL,
            checkpoint_dir: None,
            algorithm: Algorithm::default(),
            num_partitions: NonZeroUsize::new(num_cpus::get()).unwrap_or(NonZeroUsize::MIN),
            memory_usage: MemoryUsage::default(),
        }
    }

    /// Sets the degree above which vertices are joined by broadcast.
    ///
    /// Zero disables broadcast joins.
    pub fn broadcast_threshold(mut self, broadcast_threshold: u64) -> Self {
        self.broadcast_threshold = broadcast_threshold;
        self
    }

    /// Sets the number of supersteps between checkpoints.
    ///
    /// A nonpositive value disables checkpointing.
    pub fn checkpoint_interval(mut self, checkpoint_interval: i32) -> Self {
        self.checkpoint_interval = checkpoint_interval;
        self
    }

    /// Sets the base directory for checkpoints.
    ///
    /// Each run writes in its own subdirectory, which is removed at the end
    /// of a successful run.
    pub fn checkpoint_dir(mut self, checkpoint_dir: impl AsRef<Path>) -> Self {
        self.checkpoint_dir = Some(checkpoint_dir.as_ref().to_owned());
        self
    }

    pub fn algorithm(mut self, algorithm: Algorithm) -> Self {
        self.algorithm = algorithm;
        self
    }

    /// Sets the number of partitions of edge sets and aggregates.
    pub fn num_partitions(mut self, num_partitions: NonZeroUsize) -> Self {
        self.num_partitions = num_partitions;
        self
    }

    /// Sets the memory used when sorting edges during normalization.
    pub fn memory_usage(mut self, memory_usage: MemoryUsage) -> Self {
        self.memory_usage = memory_usage;
        self
    }

    /// Returns the checkpoint interval, or [`None`] if checkpointing is
    /// disabled.
    fn interval(&self) -> Option<NonZeroUsize> {
        usize::try_from(self.checkpoint_interval)
            .ok()
            .and_then(NonZeroUsize::new)
    }

    /// Computes the connected components of `graph`.
    ///
    /// The configuration is validated before any work is done. Parallel
    /// phases run on the current [`rayon`] thread pool.
    pub fn run<A: Clone>(
        &self,
        graph: &Graph<A>,
        pl: &mut impl ProgressLog,
    ) -> Result<ConnectedComponentsOutput<A>> {
        self.run_with_context(graph, RunContext::new(), pl)
    }

    /// Like [`run`](Self::run), but using the given context.
    pub fn run_with_context<A: Clone>(
        &self,
        graph: &Graph<A>,
        ctx: RunContext,
        pl: &mut impl ProgressLog,
    ) -> Result<ConnectedComponentsOutput<A>> {
        let checkpointing = match (self.algorithm, self.interval(), &self.checkpoint_dir) {
            (Algorithm::LargeSmallStar, Some(interval), Some(dir)) => Some((dir, interval)),
            (Algorithm::LargeSmallStar, Some(_), None) => {
                return Err(CcError::MissingCheckpointDir {
                    interval: self.checkpoint_interval,
                }
                .into());
            }
            _ => None,
        };

        log::info!(
            "{ctx} Computing connected components of {} vertices and {} edges with {:?}",
            graph.num_vertices(),
            graph.num_edges(),
            self.algorithm
        );

        let Normalized { ids, edges } =
            normalize(graph, self.num_partitions, self.memory_usage, pl)
                .context("Could not normalize the graph")?;
        log::info!("{ctx} {} edges after normalization", edges.len());

        // The run directory is created only after a successful normalization
        let checkpoints = checkpointing
            .map(|(dir, interval)| CheckpointManager::new(dir, interval, &ctx))
            .transpose()?;

        let components = match self.algorithm {
            Algorithm::LargeSmallStar => {
                StarsBackend::new(self.broadcast_threshold, checkpoints).compute(
                    edges,
                    ids.len(),
                    &ctx,
                    pl,
                )?
            }
            Algorithm::UnionFind => UnionFindBackend.compute(edges, ids.len(), &ctx, pl)?,
        };

        log::info!(
            "{ctx} Converged after {} superstep(s)",
            components.num_supersteps
        );

        Ok(ConnectedComponentsOutput {
            rows: assemble::assemble(graph, &ids, &components.components)?,
            num_supersteps: components.num_supersteps,
            convergence_sums: components.convergence_sums,
            run_id: ctx.run_id,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use dsi_progress_logger::no_logging;

    #[test]
    fn test_run_context_prefix() {
        let ctx = RunContext::with_id("0123456789abcdef");
        assert_eq!(ctx.to_string(), "[CC 0123456789abcdef]");
        assert_eq!(RunContext::new().run_id().len(), 16);
    }

    #[test]
    fn test_interval() {
        let cc = ConnectedComponents::new();
        assert_eq!(cc.interval(), NonZeroUsize::new(1));
        assert_eq!(cc.clone().checkpoint_interval(0).interval(), None);
        assert_eq!(cc.checkpoint_interval(-3).interval(), None);
    }

    #[test]
    fn test_missing_checkpoint_dir() {
        let graph = Graph::from_arcs([(1, 2)]);
        let err = ConnectedComponents::new()
            .run(&graph, no_logging![])
            .unwrap_err();
        assert_eq!(
            err.downcast_ref::<CcError>(),
            Some(&CcError::MissingCheckpointDir { interval: 1 })
        );
    }

    #[test]
    fn test_failed_normalization_leaves_no_run_dir() -> Result<()> {
        let base = tempfile::tempdir()?;
        let graph = Graph::new(vec![(1, ())], vec![(1, 2)]);
        let err = ConnectedComponents::new()
            .checkpoint_dir(base.path())
            .run(&graph, no_logging![])
            .unwrap_err();
        assert_eq!(
            err.downcast_ref::<CcError>(),
            Some(&CcError::UnknownVertex { src: 1, dst: 2 })
        );
        assert_eq!(std::fs::read_dir(base.path())?.count(), 0);
        Ok(())
    }
}
