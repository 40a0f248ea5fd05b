/*
 * SPDX-FileCopyrightText: 2025 Inria
 *
 * SPDX-License-Identifier: Apache-2.0 OR LGPL-2.1-or-later
 */

use super::*;
use crate::cc::normalize;
use crate::graphs::Graph;
use anyhow::Result;
use clap::Parser;
use dsi_progress_logger::{progress_logger, ProgressLog};
use std::num::NonZeroUsize;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(
    about = "Normalizes a graph given as a list of arcs, writing its canonical edge set: self-loops are removed, each edge is oriented from the smaller to the larger endpoint, and duplicates are removed. Edges are written sorted, one per line, separated by a TAB."
)]
pub struct CliArgs {
    /// The file containing the arcs (standard input if missing).
    pub arcs: Option<PathBuf>,

    #[arg(short, long)]
    /// Where to write the edges (standard output if missing).
    pub output: Option<PathBuf>,

    #[clap(flatten)]
    pub arcs_args: ArcsArgs,

    #[clap(flatten)]
    pub memory_usage: MemoryUsageArg,
}

pub fn main(global_args: GlobalArgs, args: CliArgs) -> Result<()> {
    let mut pl = progress_logger![display_memory = true];
    if let Some(log_interval) = global_args.log_interval {
        pl.log_interval(log_interval);
    }

    let input = open_input(args.arcs.as_deref())?;
    let mut output = create_output(args.output.as_deref())?;
    let memory_usage = args.memory_usage.memory_usage;

    if args.arcs_args.labels {
        let arcs = read_arcs(&args.arcs_args, input, |s| Ok(s.to_owned()), &mut pl)?;
        let graph = Graph::from_labeled_arcs(arcs);
        let normalized = normalize(&graph, NonZeroUsize::MIN, memory_usage, &mut pl)?;
        // Labels are numbered from zero, so original identifiers are indices
        for (src, dst) in normalized.original_edges() {
            writeln!(
                output,
                "{}\t{}",
                graph.vertices()[src as usize].1,
                graph.vertices()[dst as usize].1
            )?;
        }
    } else {
        let arcs = read_arcs(
            &args.arcs_args,
            input,
            |s| s.parse::<i64>().with_context(|| format!("Invalid vertex {s:?}")),
            &mut pl,
        )?;
        let graph = Graph::from_arcs(arcs);
        let normalized = normalize(&graph, NonZeroUsize::MIN, memory_usage, &mut pl)?;
        log::info!("{} edges after normalization", normalized.edges.len());
        for (src, dst) in normalized.original_edges() {
            writeln!(output, "{}\t{}", src, dst)?;
        }
    }

    output.flush().context("Could not flush output")?;
    Ok(())
}
