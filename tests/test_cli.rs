/*
 * SPDX-FileCopyrightText: 2025 Inria
 *
 * SPDX-License-Identifier: Apache-2.0 OR LGPL-2.1-or-later
 */

#![cfg(feature = "cli")]

use anyhow::Result;
use starcc::cc::CcError;
use starcc::cli::cli_main;
use std::path::Path;

fn run(args: &[&str]) -> Result<()> {
    cli_main(std::iter::once("starcc").chain(args.iter().copied()))
}

fn path(path: &Path) -> &str {
    path.to_str().unwrap()
}

#[test]
fn test_run() -> Result<()> {
    let dir = tempfile::tempdir()?;
    let arcs = dir.path().join("arcs.tsv");
    let output = dir.path().join("out").join("components.tsv");
    let checkpoints = dir.path().join("checkpoints");
    std::fs::write(&arcs, "# a comment\n1\t2\n2\t3\n4\t5\n6\t6\n")?;

    for algorithm in ["large-small-star", "union-find"] {
        run(&[
            "run",
            "--algorithm",
            algorithm,
            "--checkpoint-dir",
            path(&checkpoints),
            "--partitions",
            "2",
            "-j",
            "2",
            "-o",
            path(&output),
            path(&arcs),
        ])?;
        assert_eq!(
            std::fs::read_to_string(&output)?,
            "1\t1\n2\t1\n3\t1\n4\t4\n5\t4\n6\t6\n"
        );
    }
    Ok(())
}

#[test]
fn test_run_labels() -> Result<()> {
    let dir = tempfile::tempdir()?;
    let arcs = dir.path().join("arcs.csv");
    let output = dir.path().join("components.tsv");
    std::fs::write(&arcs, "from,to\nrome,paris\nberlin,oslo\nparis,madrid\n")?;

    run(&[
        "run",
        "--labels",
        "--separator",
        ",",
        "--lines-to-skip",
        "1",
        "--checkpoint-interval",
        "0",
        "-o",
        path(&output),
        path(&arcs),
    ])?;
    assert_eq!(
        std::fs::read_to_string(&output)?,
        "rome\trome\nparis\trome\nberlin\tberlin\noslo\tberlin\nmadrid\trome\n"
    );
    Ok(())
}

#[test]
fn test_run_missing_checkpoint_dir() -> Result<()> {
    let dir = tempfile::tempdir()?;
    let arcs = dir.path().join("arcs.tsv");
    std::fs::write(&arcs, "1\t2\n")?;
    let err = run(&["run", "--checkpoint-interval", "2", path(&arcs)]).unwrap_err();
    assert_eq!(
        err.downcast_ref::<CcError>(),
        Some(&CcError::MissingCheckpointDir { interval: 2 })
    );
    // Negative intervals disable checkpointing
    let output = dir.path().join("components.tsv");
    run(&[
        "run",
        "--checkpoint-interval",
        "-1",
        "-o",
        path(&output),
        path(&arcs),
    ])?;
    assert_eq!(std::fs::read_to_string(&output)?, "1\t1\n2\t1\n");
    Ok(())
}

#[test]
fn test_normalize() -> Result<()> {
    let dir = tempfile::tempdir()?;
    let arcs = dir.path().join("arcs.tsv");
    let output = dir.path().join("edges.tsv");
    std::fs::write(&arcs, "2\t2\n1\t2\n1\t2\n2\t1\n9\t-4\n")?;

    run(&["normalize", "-m", "2", "-o", path(&output), path(&arcs)])?;
    assert_eq!(std::fs::read_to_string(&output)?, "-4\t9\n1\t2\n");

    // Normalizing a normalized edge list is the identity
    let again = dir.path().join("again.tsv");
    run(&["normalize", "-o", path(&again), path(&output)])?;
    assert_eq!(
        std::fs::read_to_string(&again)?,
        std::fs::read_to_string(&output)?
    );
    Ok(())
}
