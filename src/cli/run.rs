/*
 * SPDX-FileCopyrightText: 2025 Inria
 *
 * SPDX-License-Identifier: Apache-2.0 OR LGPL-2.1-or-later
 */

use super::*;
use crate::cc::{ConnectedComponents, DEFAULT_BROADCAST_THRESHOLD, DEFAULT_CHECKPOINT_INTERVAL};
use crate::graphs::Graph;
use crate::thread_pool;
use anyhow::Result;
use clap::Parser;
use dsi_progress_logger::{progress_logger, ProgressLog};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(
    about = "Computes the connected components of a graph given as a list of arcs. Each vertex is assigned the minimum identifier in its component, and a line with the vertex and its component, separated by a TAB, is written for each vertex."
)]
pub struct CliArgs {
    /// The file containing the arcs (standard input if missing).
    pub arcs: Option<PathBuf>,

    #[arg(short, long)]
    /// Where to write the components (standard output if missing).
    pub output: Option<PathBuf>,

    #[arg(long, default_value_t = DEFAULT_BROADCAST_THRESHOLD)]
    /// Vertices with degree above this threshold are joined by broadcast;
    /// zero disables broadcast joins.
    pub broadcast_threshold: u64,

    #[arg(long, default_value_t = DEFAULT_CHECKPOINT_INTERVAL, allow_negative_numbers = true)]
    /// Checkpoint the edge set every this number of supersteps; a
    /// nonpositive value disables checkpointing.
    pub checkpoint_interval: i32,

    #[arg(long)]
    /// The base directory for checkpoints (required if checkpointing is
    /// enabled).
    pub checkpoint_dir: Option<PathBuf>,

    #[arg(long, value_enum, default_value_t = PrivAlgorithm::LargeSmallStar)]
    /// The algorithm to use.
    pub algorithm: PrivAlgorithm,

    #[clap(flatten)]
    pub partitions: PartitionsArg,

    #[clap(flatten)]
    pub arcs_args: ArcsArgs,

    #[clap(flatten)]
    pub num_threads: NumThreadsArg,

    #[clap(flatten)]
    pub memory_usage: MemoryUsageArg,
}

impl CliArgs {
    fn builder(&self) -> ConnectedComponents {
        let mut cc = ConnectedComponents::new()
            .broadcast_threshold(self.broadcast_threshold)
            .checkpoint_interval(self.checkpoint_interval)
            .algorithm(self.algorithm.into())
            .memory_usage(self.memory_usage.memory_usage);
        if let Some(dir) = &self.checkpoint_dir {
            cc = cc.checkpoint_dir(dir);
        }
        if let Some(partitions) = self.partitions.partitions {
            cc = cc.num_partitions(partitions);
        }
        cc
    }
}

pub fn main(global_args: GlobalArgs, args: CliArgs) -> Result<()> {
    let mut pl = progress_logger![display_memory = true];
    if let Some(log_interval) = global_args.log_interval {
        pl.log_interval(log_interval);
    }

    let input = open_input(args.arcs.as_deref())?;
    let thread_pool = thread_pool![args.num_threads.num_threads];
    log::info!("Using {} threads", thread_pool.current_num_threads());

    let cc = args.builder();
    let mut output = create_output(args.output.as_deref())?;

    if args.arcs_args.labels {
        let arcs = read_arcs(&args.arcs_args, input, |s| Ok(s.to_owned()), &mut pl)?;
        let graph = Graph::from_labeled_arcs(arcs);
        let result = thread_pool.install(|| cc.run(&graph, &mut pl))?;
        log::info!("Writing components");
        for row in &result.rows {
            let component = usize::try_from(row.component)
                .ok()
                .and_then(|id| graph.vertices().get(id))
                .with_context(|| format!("Unknown component {}", row.component))?;
            writeln!(output, "{}\t{}", row.attr, component.1)?;
        }
    } else {
        let arcs = read_arcs(
            &args.arcs_args,
            input,
            |s| s.parse::<i64>().with_context(|| format!("Invalid vertex {s:?}")),
            &mut pl,
        )?;
        let graph = Graph::from_arcs(arcs);
        let result = thread_pool.install(|| cc.run(&graph, &mut pl))?;
        log::info!("Writing components");
        for row in &result.rows {
            writeln!(output, "{}\t{}", row.id, row.component)?;
        }
    }

    output.flush().context("Could not flush output")?;
    Ok(())
}
