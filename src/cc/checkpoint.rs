/*
 * SPDX-FileCopyrightText: 2025 Inria
 *
 * SPDX-License-Identifier: Apache-2.0 OR LGPL-2.1-or-later
 */

//! Materialization of edge sets to disk.
//!
//! A checkpoint of an edge set with `n` partitions is a directory containing
//! files `part-00000`, …, one per nonempty partition, holding the sorted
//! edges of the partition as γ-coded gaps (the batch format of
//! [`SortPairs`](crate::utils::SortPairs)), and a `checkpoint.properties`
//! file with the superstep, the number of partitions, the number of edges,
//! and the number of edges of each partition.
//!
//! A [`CheckpointManager`] stores the checkpoints of a run in the directory
//! `<base>/connected-components-<run_id>/<superstep>`.

use super::RunContext;
use crate::dataflow::Partitioned;
use crate::graphs::{Edge, EdgeSet};
use crate::utils::sort_pairs::{write_sorted, BatchIterator};
use anyhow::{ensure, Context, Result};
use rayon::prelude::*;
use std::borrow::Cow;
use std::collections::HashMap;
use std::fs::File;
use std::io::BufReader;
use std::num::NonZeroUsize;
use std::path::{Path, PathBuf};

/// The prefix of the name of the directory of a run.
pub const RUN_DIR_PREFIX: &str = "connected-components-";
/// The name of the metadata file of a checkpoint.
pub const PROPERTIES_FILE: &str = "checkpoint.properties";

fn part_name(part: usize) -> String {
    format!("part-{part:05}")
}

fn get_property(map: &HashMap<String, String>, key: &str, path: &Path) -> Result<usize> {
    map.get(key)
        .with_context(|| format!("Missing '{}' property in {}", key, path.display()))?
        .parse::<usize>()
        .with_context(|| format!("Cannot parse '{}' as usize in {}", key, path.display()))
}

/// Writes an edge set in `dir`, which must exist.
pub fn write_edge_set(dir: impl AsRef<Path>, superstep: usize, edges: &EdgeSet) -> Result<()> {
    let dir = dir.as_ref();
    let lens = edges
        .table()
        .parts()
        .par_iter()
        .enumerate()
        .map(|(i, part)| {
            if part.is_empty() {
                return Ok(0);
            }
            let part: Cow<[Edge]> = if part.is_sorted() {
                Cow::Borrowed(part.as_slice())
            } else {
                let mut sorted = part.clone();
                sorted.sort_unstable();
                Cow::Owned(sorted)
            };
            write_sorted(dir.join(part_name(i)), part.iter().copied())
        })
        .collect::<Result<Vec<_>>>()?;

    let mut properties = String::new();
    properties.push_str(&format!("superstep={}\n", superstep));
    properties.push_str(&format!("partitions={}\n", lens.len()));
    properties.push_str(&format!("edges={}\n", lens.iter().sum::<usize>()));
    for (i, len) in lens.iter().enumerate() {
        properties.push_str(&format!("partition.{}.edges={}\n", i, len));
    }
    let properties_path = dir.join(PROPERTIES_FILE);
    std::fs::write(&properties_path, properties)
        .with_context(|| format!("Could not write {}", properties_path.display()))?;
    Ok(())
}

/// Reads an edge set written by [`write_edge_set`].
///
/// The result is materialized: its lineage is zero.
pub fn read_edge_set(dir: impl AsRef<Path>) -> Result<EdgeSet> {
    let dir = dir.as_ref();
    let path = dir.join(PROPERTIES_FILE);
    let f = File::open(&path)
        .with_context(|| format!("Cannot open property file {}", path.display()))?;
    let map = java_properties::read(BufReader::new(f))
        .with_context(|| format!("cannot parse {} as a java properties file", path.display()))?;

    let num_partitions = get_property(&map, "partitions", &path)?;
    let num_edges = get_property(&map, "edges", &path)?;
    let lens = (0..num_partitions)
        .map(|i| get_property(&map, &format!("partition.{i}.edges"), &path))
        .collect::<Result<Vec<_>>>()?;
    ensure!(
        lens.iter().sum::<usize>() == num_edges,
        "The partitions of {} do not add up to {} edges",
        dir.display(),
        num_edges
    );

    let parts = lens
        .into_par_iter()
        .enumerate()
        .map(|(i, len)| {
            if len == 0 {
                Ok(Vec::new())
            } else {
                Ok(BatchIterator::new(dir.join(part_name(i)), len)?.collect())
            }
        })
        .collect::<Result<Vec<_>>>()?;

    Ok(EdgeSet::new(Partitioned::from_parts(parts)))
}

/// Writes periodic checkpoints of the edge sets of a run, deleting older
/// ones.
#[derive(Debug)]
pub struct CheckpointManager {
    run_dir: PathBuf,
    interval: NonZeroUsize,
}

impl CheckpointManager {
    /// Creates a manager checkpointing every `interval` supersteps in the
    /// directory of the run inside `base`.
    pub fn new(base: impl AsRef<Path>, interval: NonZeroUsize, ctx: &RunContext) -> Result<Self> {
        let run_dir = base
            .as_ref()
            .join(format!("{}{}", RUN_DIR_PREFIX, ctx.run_id()));
        std::fs::create_dir_all(&run_dir)
            .with_context(|| format!("Could not create {}", run_dir.display()))?;
        log::debug!("{ctx} Checkpointing in {}", run_dir.display());
        Ok(Self { run_dir, interval })
    }

    /// Returns the directory of the run.
    pub fn run_dir(&self) -> &Path {
        &self.run_dir
    }

    /// Returns the directory of the checkpoint of a superstep.
    pub fn dir(&self, superstep: usize) -> PathBuf {
        self.run_dir.join(superstep.to_string())
    }

    /// Returns whether a checkpoint is due after the given (one-based)
    /// superstep.
    pub fn is_due(&self, superstep: usize) -> bool {
        superstep % self.interval == 0
    }

    /// Writes the edge set produced by a superstep and returns it as read
    /// back from disk, deleting the previous checkpoint.
    pub fn checkpoint(
        &mut self,
        superstep: usize,
        edges: EdgeSet,
        ctx: &RunContext,
    ) -> Result<EdgeSet> {
        let dir = self.dir(superstep);
        std::fs::create_dir_all(&dir)
            .with_context(|| format!("Could not create {}", dir.display()))?;
        log::debug!(
            "{ctx} Checkpointing {} edges with lineage {} in {}",
            edges.len(),
            edges.lineage(),
            dir.display()
        );
        write_edge_set(&dir, superstep, &edges)
            .with_context(|| format!("Could not write checkpoint {}", dir.display()))?;
        drop(edges);
        let edges = read_edge_set(&dir)
            .with_context(|| format!("Could not read checkpoint {}", dir.display()))?;

        if let Some(previous) = superstep.checked_sub(self.interval.get()) {
            let previous = self.dir(previous);
            if previous.exists() {
                log::debug!("{ctx} Deleting checkpoint {}", previous.display());
                std::fs::remove_dir_all(&previous)
                    .with_context(|| format!("Could not delete {}", previous.display()))?;
            }
        }

        Ok(edges)
    }

    /// Deletes the directory of the run.
    pub fn cleanup(&mut self) -> Result<()> {
        if self.run_dir.exists() {
            std::fs::remove_dir_all(&self.run_dir)
                .with_context(|| format!("Could not delete {}", self.run_dir.display()))?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_write_read() -> Result<()> {
        let dir = tempfile::tempdir()?;
        let edges = EdgeSet::from_edges(
            [(5, 7), (0, 1), (3, 1000), (0, 9), (2, 3)],
            NonZeroUsize::new(8).unwrap(),
        )
        .distinct();
        write_edge_set(dir.path(), 3, &edges)?;
        let read = read_edge_set(dir.path())?;
        assert_eq!(read.lineage(), 0);
        assert_eq!(read.table(), edges.table());
        Ok(())
    }

    #[test]
    fn test_unsorted_partitions() -> Result<()> {
        let dir = tempfile::tempdir()?;
        let edges = EdgeSet::new(Partitioned::from_parts(vec![vec![(4, 5), (1, 2)], vec![]]));
        write_edge_set(dir.path(), 1, &edges)?;
        let read = read_edge_set(dir.path())?;
        assert_eq!(read.table().parts(), &[vec![(1, 2), (4, 5)], vec![]]);
        Ok(())
    }

    #[test]
    fn test_manager() -> Result<()> {
        let base = tempfile::tempdir()?;
        let ctx = RunContext::with_id("0000000000000001");
        let mut manager = CheckpointManager::new(base.path(), NonZeroUsize::new(2).unwrap(), &ctx)?;
        assert_eq!(
            manager.run_dir(),
            base.path().join("connected-components-0000000000000001")
        );
        assert!(!manager.is_due(1));
        assert!(manager.is_due(2));

        let edges = EdgeSet::with_lineage(
            Partitioned::from_parts(vec![vec![(0, 1)], vec![(2, 3)]]),
            7,
        );
        let edges = manager.checkpoint(2, edges, &ctx)?;
        assert_eq!(edges.lineage(), 0);
        assert!(manager.dir(2).join(PROPERTIES_FILE).exists());
        manager.checkpoint(4, edges, &ctx)?;
        assert!(!manager.dir(2).exists());
        assert!(manager.dir(4).exists());

        manager.cleanup()?;
        assert!(!manager.run_dir().exists());
        Ok(())
    }
}
