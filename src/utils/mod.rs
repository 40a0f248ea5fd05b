/*
 * SPDX-FileCopyrightText: 2025 Inria
 *
 * SPDX-License-Identifier: Apache-2.0 OR LGPL-2.1-or-later
 */

//! Miscellaneous utilities.

use rand::Rng;

const ALPHABET: &[u8] = b"0123456789abcdef";

/// Returns a random string of 16 hexadecimal digits.
///
/// This is the identifier used to correlate the log lines of a run and to
/// isolate its checkpoints from those of concurrent runs.
pub fn random_id() -> String {
    let mut rnd = rand::rng();
    (0..16)
        .map(|_| ALPHABET[rnd.random_range(0..ALPHABET.len())] as char)
        .collect()
}

mod memory_usage;
pub use memory_usage::*;

mod mmap_helper;
pub use mmap_helper::*;

pub mod sort_pairs;
pub use sort_pairs::SortPairs;

/// Utility macro to create [`thread_pools`](`rayon::ThreadPool`).
///
/// There are two forms of this macro:
/// * Create a [`ThreadPool`](rayon::ThreadPool) with the default settings:
/// ```
/// # use starcc::thread_pool;
/// let t: rayon::ThreadPool = thread_pool![];
/// ```
/// * Create a [`ThreadPool`](rayon::ThreadPool) with a given number of threads:
/// ```
/// # use starcc::thread_pool;
/// let t: rayon::ThreadPool = thread_pool![7];
/// assert_eq!(t.current_num_threads(), 7);
/// ```
#[macro_export]
macro_rules! thread_pool {
    () => {
        rayon::ThreadPoolBuilder::new()
            .build()
            .expect("Cannot build a ThreadPool with default parameters")
    };
    ($num_threads:expr) => {
        rayon::ThreadPoolBuilder::new()
            .num_threads($num_threads)
            .build()
            .unwrap_or_else(|_| {
                panic!(
                    "Cannot build a ThreadPool with default parameters and {} threads",
                    $num_threads,
                )
            })
    };
}
