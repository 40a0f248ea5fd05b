/*
 * SPDX-FileCopyrightText: 2025 Inria
 *
 * SPDX-License-Identifier: Apache-2.0 OR LGPL-2.1-or-later
 */

#![doc = include_str!("../README.md")]
// for now we don't need any new feature but we might remove this in the future
#![deny(unstable_features)]
#![deny(trivial_casts)]
#![deny(unconditional_recursion)]
#![deny(clippy::empty_loop)]
#![deny(unreachable_code)]
#![deny(unreachable_pub)]
#![deny(unreachable_patterns)]
#![deny(unused_macro_rules)]
#![deny(unused_doc_comments)]

pub mod cc;
#[cfg(feature = "cli")]
pub mod cli;
pub mod dataflow;
pub mod graphs;
pub mod utils;

/// Prelude module to import everything from this crate
pub mod prelude {
    pub use crate::cc::{
        Algorithm, CcError, ComponentRow, ConnectedComponents, ConnectedComponentsOutput,
        ConvergenceSum, RunContext,
    };
    pub use crate::dataflow::Partitioned;
    pub use crate::graphs::{Edge, EdgeSet, Graph};
    pub use crate::utils::{MemoryUsage, SortPairs};
}
