/*
 * SPDX-FileCopyrightText: 2025 Inria
 *
 * SPDX-License-Identifier: Apache-2.0 OR LGPL-2.1-or-later
 */

use core::fmt::Display;
use sysinfo::System;

/// How much memory external sorting may use for its batches.
///
/// The amount can be expressed either as a number of elements per batch or
/// as a number of bytes, which is turned into a batch size depending on the
/// size of the elements being sorted.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum MemoryUsage {
    /// The target overall memory usage in bytes.
    MemorySize(usize),
    /// The number of elements in a batch.
    BatchSize(usize),
}

impl Default for MemoryUsage {
    /// Returns a memory usage equal to 50% of the physical memory.
    fn default() -> Self {
        Self::from_perc(50.0)
    }
}

impl Display for MemoryUsage {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            MemoryUsage::MemorySize(size) => write!(f, "{size} bytes"),
            MemoryUsage::BatchSize(size) => write!(f, "{size} elements"),
        }
    }
}

impl MemoryUsage {
    /// Creates a new memory usage expressed as a percentage of the physical
    /// memory.
    pub fn from_perc(perc: f64) -> Self {
        let mut system = System::new();
        system.refresh_memory();
        MemoryUsage::MemorySize(
            usize::try_from((system.total_memory() as f64 * perc / 100.0) as u64)
                .unwrap_or(usize::MAX),
        )
    }

    /// Returns the batch size for elements of type `T`.
    ///
    /// The result is never zero.
    pub fn batch_size<T>(&self) -> usize {
        match &self {
            MemoryUsage::MemorySize(memory_size) => {
                (memory_size / core::mem::size_of::<T>().max(1)).max(1)
            }
            MemoryUsage::BatchSize(batch_size) => (*batch_size).max(1),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_batch_size() {
        assert_eq!(MemoryUsage::BatchSize(10).batch_size::<(usize, usize)>(), 10);
        assert_eq!(MemoryUsage::BatchSize(0).batch_size::<(usize, usize)>(), 1);
        assert_eq!(
            MemoryUsage::MemorySize(1600).batch_size::<(usize, usize)>(),
            1600 / core::mem::size_of::<(usize, usize)>()
        );
    }

    #[test]
    fn test_from_perc() {
        match MemoryUsage::from_perc(10.0) {
            MemoryUsage::MemorySize(size) => {
                let full = match MemoryUsage::from_perc(100.0) {
                    MemoryUsage::MemorySize(full) => full,
                    _ => unreachable!(),
                };
                assert!(size <= full);
            }
            _ => panic!("from_perc must return a memory size"),
        }
    }
}
