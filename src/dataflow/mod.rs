/*
 * SPDX-FileCopyrightText: 2025 Inria
 *
 * SPDX-License-Identifier: Apache-2.0 OR LGPL-2.1-or-later
 */

//! A minimal partitioned, data-parallel table.
//!
//! A [`Partitioned`] table is a list of partitions, each a vector of rows.
//! Operations work partition by partition on the current
//! [`rayon`](https://docs.rs/rayon) thread pool, and rows move between
//! partitions only through an explicit [`shuffle`](Partitioned::shuffle),
//! which routes each row to the partition selected by a hash of its key.
//!
//! Two tables shuffled with the same number of partitions and the same key
//! hash are *co-partitioned*: rows with equal keys live in partitions with
//! the same index, so they can be joined partition by partition.

use rayon::prelude::*;
use std::num::NonZeroUsize;

const FIBONACCI: u64 = 0x9E37_79B9_7F4A_7C15;

/// Hashes a node by Fibonacci hashing.
///
/// Only the high bits of the result are well distributed, which is what
/// [`partition_of`] uses.
#[inline(always)]
pub fn hash_node(node: usize) -> u64 {
    (node as u64).wrapping_mul(FIBONACCI)
}

/// Hashes a pair of nodes.
#[inline(always)]
pub fn hash_pair((src, dst): (usize, usize)) -> u64 {
    (hash_node(src).rotate_left(32) ^ dst as u64).wrapping_mul(FIBONACCI)
}

/// Returns the partition associated with a hash, using the high bits of the
/// hash (i.e., a fixed-point multiplication by the number of partitions).
#[inline(always)]
pub fn partition_of(hash: u64, num_partitions: usize) -> usize {
    ((hash as u128 * num_partitions as u128) >> 64) as usize
}

/// A table split into a fixed, positive number of partitions.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Partitioned<T> {
    parts: Vec<Vec<T>>,
}

impl<T> Partitioned<T> {
    /// Creates an empty table with the given number of partitions.
    pub fn new(num_partitions: NonZeroUsize) -> Self {
        Self {
            parts: (0..num_partitions.get()).map(|_| Vec::new()).collect(),
        }
    }

    /// Creates a table from its partitions.
    ///
    /// An empty list of partitions is turned into a single empty partition.
    pub fn from_parts(mut parts: Vec<Vec<T>>) -> Self {
        if parts.is_empty() {
            parts.push(Vec::new());
        }
        Self { parts }
    }

    /// Returns the number of partitions.
    #[inline(always)]
    pub fn num_partitions(&self) -> usize {
        self.parts.len()
    }

    /// Returns the number of rows.
    pub fn len(&self) -> usize {
        self.parts.iter().map(Vec::len).sum()
    }

    /// Returns whether there are no rows.
    pub fn is_empty(&self) -> bool {
        self.parts.iter().all(Vec::is_empty)
    }

    /// Returns the partitions.
    #[inline(always)]
    pub fn parts(&self) -> &[Vec<T>] {
        &self.parts
    }

    /// Returns a sequential iterator over all rows, partition by partition.
    pub fn iter(&self) -> impl Iterator<Item = &T> {
        self.parts.iter().flatten()
    }

    /// Appends the partitions of `other` to those of `self`, partition by
    /// partition.
    ///
    /// If the two tables have a different number of partitions, the
    /// partitions of `other` are appended as new partitions instead.
    pub fn union(mut self, other: Self) -> Self {
        if self.parts.len() == other.parts.len() {
            for (part, mut other) in self.parts.iter_mut().zip(other.parts) {
                if part.is_empty() {
                    *part = other;
                } else {
                    part.append(&mut other);
                }
            }
        } else {
            self.parts.extend(other.parts);
        }
        self
    }
}

impl<T: Send + Sync> Partitioned<T> {
    /// Distributes rows to `num_partitions` partitions by `hash`.
    pub fn from_iter_by<H>(
        rows: impl IntoIterator<Item = T>,
        num_partitions: NonZeroUsize,
        hash: H,
    ) -> Self
    where
        H: Fn(&T) -> u64,
    {
        let mut table = Self::new(num_partitions);
        let n = table.parts.len();
        for row in rows {
            table.parts[partition_of(hash(&row), n)].push(row);
        }
        table
    }

    /// Applies `f` to each partition in parallel, returning a table with the
    /// same number of partitions.
    pub fn map_partitions<U, F>(&self, f: F) -> Partitioned<U>
    where
        U: Send,
        F: Fn(&[T]) -> Vec<U> + Sync,
    {
        Partitioned {
            parts: self.parts.par_iter().map(|part| f(part)).collect(),
        }
    }

    /// Like [`map_partitions`](Self::map_partitions), but consuming the
    /// partitions.
    pub fn into_map_partitions<U, F>(self, f: F) -> Partitioned<U>
    where
        U: Send,
        F: Fn(Vec<T>) -> Vec<U> + Sync,
    {
        Partitioned {
            parts: self.parts.into_par_iter().map(|part| f(part)).collect(),
        }
    }

    /// Keeps the rows satisfying `predicate`, without moving them between
    /// partitions.
    pub fn filter<P>(self, predicate: P) -> Self
    where
        P: Fn(&T) -> bool + Sync,
    {
        self.into_map_partitions(|mut part| {
            part.retain(|row| predicate(row));
            part
        })
    }

    /// Applies `f` to pairs of partitions with the same index.
    ///
    /// # Panics
    ///
    /// If the two tables have a different number of partitions.
    pub fn zip_partitions<R, U, F>(&self, other: &Partitioned<R>, f: F) -> Partitioned<U>
    where
        R: Sync,
        U: Send,
        F: Fn(&[T], &[R]) -> Vec<U> + Sync,
    {
        assert_eq!(
            self.num_partitions(),
            other.num_partitions(),
            "Zipped tables must have the same number of partitions"
        );
        Partitioned {
            parts: self
                .parts
                .par_iter()
                .zip(other.parts.par_iter())
                .map(|(left, right)| f(left, right))
                .collect(),
        }
    }

    /// Moves every row to the partition selected by `hash` among
    /// `num_partitions` partitions.
    ///
    /// Each partition is split into buckets in parallel; buckets are then
    /// concatenated by destination.
    pub fn shuffle<H>(self, num_partitions: NonZeroUsize, hash: H) -> Self
    where
        H: Fn(&T) -> u64 + Sync,
    {
        let n = num_partitions.get();
        let buckets: Vec<Vec<Vec<T>>> = self
            .parts
            .into_par_iter()
            .map(|part| {
                let mut buckets: Vec<Vec<T>> = (0..n).map(|_| Vec::new()).collect();
                for row in part {
                    buckets[partition_of(hash(&row), n)].push(row);
                }
                buckets
            })
            .collect();

        let mut parts: Vec<Vec<T>> = (0..n).map(|_| Vec::new()).collect();
        for worker_buckets in buckets {
            for (part, mut bucket) in parts.iter_mut().zip(worker_buckets) {
                if part.is_empty() {
                    *part = bucket;
                } else {
                    part.append(&mut bucket);
                }
            }
        }
        Partitioned { parts }
    }
}

impl<T: Ord + Send + Sync> Partitioned<T> {
    /// Sorts each partition and removes duplicates within it.
    ///
    /// After a [`shuffle`](Self::shuffle) on the whole row this removes all
    /// duplicates of the table.
    pub fn sort_dedup(self) -> Self {
        self.into_map_partitions(|mut part| {
            part.sort_unstable();
            part.dedup();
            part
        })
    }

    /// Returns whether every partition is sorted.
    pub fn is_sorted(&self) -> bool {
        self.parts.par_iter().all(|part| part.is_sorted())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn four() -> NonZeroUsize {
        NonZeroUsize::new(4).unwrap()
    }

    #[test]
    fn test_partition_of() {
        for n in 1..10 {
            for hash in [0, 1, u64::MAX / 2, u64::MAX] {
                assert!(partition_of(hash, n) < n);
            }
        }
        assert_eq!(partition_of(u64::MAX, 7), 6);
    }

    #[test]
    fn test_shuffle_groups_keys() {
        let table = Partitioned::from_parts(vec![
            vec![(1, 'a'), (2, 'b'), (3, 'c')],
            vec![(1, 'd'), (3, 'e')],
            vec![(2, 'f')],
        ]);
        let shuffled = table.shuffle(four(), |&(key, _)| hash_node(key));
        assert_eq!(shuffled.num_partitions(), 4);
        assert_eq!(shuffled.len(), 6);
        for key in 1..=3 {
            let holders = shuffled
                .parts()
                .iter()
                .filter(|part| part.iter().any(|&(k, _)| k == key))
                .count();
            assert_eq!(holders, 1, "key {key} is split among partitions");
        }
    }

    #[test]
    fn test_sort_dedup() {
        let table = Partitioned::from_iter_by([5, 1, 5, 3, 1, 5], four(), |&x| hash_node(x));
        let distinct = table.sort_dedup();
        assert!(distinct.is_sorted());
        let mut rows = distinct.iter().copied().collect::<Vec<_>>();
        rows.sort();
        assert_eq!(rows, vec![1, 3, 5]);
    }

    #[test]
    fn test_filter_and_map() {
        let threshold = 3;
        let table = Partitioned::from_parts(vec![vec![1, 4, 2], vec![], vec![5, 3]]);
        let kept = table.filter(|&x| x >= threshold);
        assert_eq!(kept.parts(), &[vec![4], vec![], vec![5, 3]]);
        let doubled = kept.into_map_partitions(|part| part.into_iter().map(|x| x * 2).collect());
        assert_eq!(doubled.parts(), &[vec![8], vec![], vec![10, 6]]);
    }

    #[test]
    fn test_union() {
        let left = Partitioned::from_parts(vec![vec![1], vec![2]]);
        let right = Partitioned::from_parts(vec![vec![3], vec![]]);
        assert_eq!(left.clone().union(right).parts(), &[vec![1, 3], vec![2]]);
        let other = Partitioned::from_parts(vec![vec![4]]);
        assert_eq!(left.union(other).num_partitions(), 3);
    }

    #[test]
    fn test_zip_partitions() {
        let left = Partitioned::from_parts(vec![vec![1, 2], vec![3]]);
        let right = Partitioned::from_parts(vec![vec![10], vec![20]]);
        let sums = left.zip_partitions(&right, |l, r| l.iter().map(|x| x + r[0]).collect());
        assert_eq!(sums.parts(), &[vec![11, 12], vec![23]]);
    }

    #[test]
    fn test_empty_parts() {
        let table = Partitioned::<usize>::from_parts(vec![]);
        assert_eq!(table.num_partitions(), 1);
        assert!(table.is_empty());
    }
}
