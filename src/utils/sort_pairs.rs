/*
 * SPDX-FileCopyrightText: 2025 Inria
 *
 * SPDX-License-Identifier: Apache-2.0 OR LGPL-2.1-or-later
 */

//! Facilities to sort externally pairs of nodes.
//!
//! The same batch format is used by [checkpoints](crate::cc::checkpoint) to
//! store the partitions of an edge set, as it is compact and can be read back
//! by memory mapping.

use super::{MemoryUsage, MmapHelper};
use anyhow::{anyhow, ensure, Context, Result};
use dary_heap::PeekMut;
use dsi_bitstream::prelude::*;
use log::debug;
use mmap_rs::MmapFlags;
use rdst::*;
use std::{
    fs::File,
    io::BufWriter,
    path::{Path, PathBuf},
};

pub type BitReader = BufBitReader<NE, MemWordReader<u32, MmapHelper<u32>>>;

/// A pair of nodes, ordered lexicographically, that can be radix sorted.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord)]
struct Pair([usize; 2]);

impl RadixKey for Pair {
    const LEVELS: usize = 2 * core::mem::size_of::<usize>();

    fn get_level(&self, level: usize) -> u8 {
        const BYTES: usize = core::mem::size_of::<usize>();
        (self.0[1 - level / BYTES] >> ((level % BYTES) * 8)) as u8
    }
}

/// A struct that provides external sorting for pairs of nodes.
///
/// An instance of this structure ingests pairs of nodes, sorts them in chunks
/// of `batch_size` pairs, and dumps them to disk. Then, a call to
/// [`iter`](SortPairs::iter) returns an iterator that merges the batches on
/// disk on the fly, returning the pairs in lexicographical order.
///
/// A batch should be as large as possible, given the available memory.
/// Small batches are inefficient because they requires significantly
/// more I/O, and more effort during the merge phase.
///
/// Note that batches will be memory-mapped. If you encounter OS-level errors
/// using this class (e.g., `ENOMEM: Out of memory` under Linux), please review
/// the limitations of your OS regarding memory-mapping (e.g.,
/// `/proc/sys/vm/max_map_count` under Linux).
pub struct SortPairs {
    /// The batch size.
    batch_size: usize,
    /// Where we are going to store the batches.
    tmp_dir: PathBuf,
    /// Keeps track of how many batches we created.
    num_batches: usize,
    /// The length of the last batch, which might be smaller than [`SortPairs::batch_size`].
    last_batch_len: usize,
    /// The batch of pairs we are currently building.
    batch: Vec<Pair>,
}

impl SortPairs {
    /// Creates a new `SortPairs`.
    ///
    /// The `tmp_dir` must be empty, and in particular it must not be shared
    /// with other `SortPairs` instances.
    ///
    /// We suggest to use the [`tempfile`](https://crates.io/crates/tempfile)
    /// crate to obtain a suitable temporary directory, as it will be
    /// automatically deleted when no longer needed, but be careful to not pass
    /// the directory obtained directly, but rather its path (i.e., use
    /// `dir.path()`) because otherwise [the directory will be deleted too
    /// soon](https://github.com/Stebalien/tempfile/issues/115).
    pub fn new<P: AsRef<Path>>(memory_usage: MemoryUsage, tmp_dir: P) -> Result<Self> {
        let dir = tmp_dir.as_ref();
        let mut dir_entries =
            std::fs::read_dir(dir).with_context(|| format!("Could not list {}", dir.display()))?;
        if dir_entries.next().is_some() {
            Err(anyhow!("{} is not empty", dir.display()))
        } else {
            let batch_size = memory_usage.batch_size::<Pair>();
            Ok(SortPairs {
                batch_size,
                tmp_dir: dir.to_owned(),
                num_batches: 0,
                last_batch_len: 0,
                batch: Vec::with_capacity(batch_size.min(1 << 20)),
            })
        }
    }

    /// Adds a pair.
    pub fn push(&mut self, x: usize, y: usize) -> Result<()> {
        self.batch.push(Pair([x, y]));
        if self.batch.len() >= self.batch_size {
            self.dump()?;
        }
        Ok(())
    }

    /// Dump the current batch to disk
    fn dump(&mut self) -> Result<()> {
        // This method must be idempotent as it is called by `iter`
        if self.batch.is_empty() {
            return Ok(());
        }

        let start = std::time::Instant::now();
        self.batch.radix_sort_unstable();
        debug!("Sorted {} pairs in {:?}", self.batch.len(), start.elapsed());

        let batch_name = self.tmp_dir.join(format!("{:06x}", self.num_batches));
        write_sorted(&batch_name, self.batch.iter().map(|Pair([x, y])| (*x, *y)))?;
        self.last_batch_len = self.batch.len();
        self.batch.clear();
        self.num_batches += 1;
        Ok(())
    }

    /// Returns an iterator over the pairs, lexicographically sorted.
    pub fn iter(&mut self) -> Result<KMergeIters<BatchIterator>> {
        self.dump()?;
        let batches = (0..self.num_batches)
            .map(|batch_idx| {
                BatchIterator::new(
                    self.tmp_dir.join(format!("{batch_idx:06x}")),
                    if batch_idx == self.num_batches - 1 {
                        self.last_batch_len
                    } else {
                        self.batch_size
                    },
                )
            })
            .collect::<Result<Vec<_>>>()?;
        Ok(KMergeIters::new(batches))
    }
}

/// Writes lexicographically sorted pairs to `file_path` as gamma-coded gaps,
/// returning the number of pairs written.
pub(crate) fn write_sorted(
    file_path: impl AsRef<Path>,
    pairs: impl IntoIterator<Item = (usize, usize)>,
) -> Result<usize> {
    let file_path = file_path.as_ref();
    let file = BufWriter::with_capacity(
        1 << 16,
        File::create(file_path)
            .with_context(|| format!("Could not create batch file {}", file_path.display()))?,
    );
    let mut stream = <BufBitWriter<NE, _>>::new(<WordAdapter<usize, _>>::new(file));
    let (mut prev_src, mut prev_dst) = (0, 0);
    let mut len = 0;
    for (src, dst) in pairs {
        ensure!(
            (src, dst) >= (prev_src, prev_dst),
            "Pair ({src}, {dst}) follows ({prev_src}, {prev_dst}) in {}",
            file_path.display()
        );
        // write the source gap as gamma
        stream
            .write_gamma((src - prev_src) as _)
            .with_context(|| format!("Could not write {src} after {prev_src}"))?;
        if src != prev_src {
            // Reset prev_y
            prev_dst = 0;
        }
        // write the destination gap as gamma
        stream
            .write_gamma((dst - prev_dst) as _)
            .with_context(|| format!("Could not write {dst} after {prev_dst}"))?;
        (prev_src, prev_dst) = (src, dst);
        len += 1;
    }
    stream.flush().context("Could not flush stream")?;
    Ok(len)
}

/// An iterator that can read the batch files generated by [`SortPairs`].
pub struct BatchIterator {
    stream: BitReader,
    len: usize,
    current: usize,
    prev_src: usize,
    prev_dst: usize,
}

impl BatchIterator {
    /// Creates a new iterator over the `len` pairs previously serialized in
    /// `file_path`.
    pub fn new<P: AsRef<Path>>(file_path: P, len: usize) -> Result<Self> {
        let stream = <BufBitReader<NE, _>>::new(MemWordReader::new(
            MmapHelper::mmap(
                file_path.as_ref(),
                MmapFlags::TRANSPARENT_HUGE_PAGES | MmapFlags::SEQUENTIAL,
            )
            .with_context(|| format!("Could not mmap {}", file_path.as_ref().display()))?,
        ));
        Ok(BatchIterator {
            stream,
            len,
            current: 0,
            prev_src: 0,
            prev_dst: 0,
        })
    }
}

impl Iterator for BatchIterator {
    type Item = (usize, usize);
    fn next(&mut self) -> Option<Self::Item> {
        if self.current == self.len {
            return None;
        }
        let src = self.prev_src + self.stream.read_gamma().unwrap() as usize;
        if src != self.prev_src {
            // Reset prev_y
            self.prev_dst = 0;
        }
        let dst = self.prev_dst + self.stream.read_gamma().unwrap() as usize;
        self.prev_src = src;
        self.prev_dst = dst;
        self.current += 1;
        Some((src, dst))
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let remaining = self.len - self.current;
        (remaining, Some(remaining))
    }
}

#[derive(Clone, Debug)]
/// Private struct that orders sorted iterators by their current head, in
/// reverse, so that the maximum of the heap is the smallest pair.
struct HeadTail<I: Iterator<Item = (usize, usize)>> {
    head: (usize, usize),
    tail: I,
}

impl<I: Iterator<Item = (usize, usize)>> PartialEq for HeadTail<I> {
    #[inline(always)]
    fn eq(&self, other: &Self) -> bool {
        self.head == other.head
    }
}

impl<I: Iterator<Item = (usize, usize)>> Eq for HeadTail<I> {}

impl<I: Iterator<Item = (usize, usize)>> PartialOrd for HeadTail<I> {
    #[inline(always)]
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl<I: Iterator<Item = (usize, usize)>> Ord for HeadTail<I> {
    #[inline(always)]
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        other.head.cmp(&self.head)
    }
}

/// A structure using a [quaternary heap](dary_heap::QuaternaryHeap) to merge
/// sorted iterators of pairs.
///
/// The iterators must be sorted, and the structure will return the pairs in
/// lexicographical order. Duplicates are preserved.
///
/// ```rust
/// use starcc::utils::sort_pairs::KMergeIters;
///
/// let iters = vec![vec![(0, 0), (1, 1)], vec![(0, 1), (1, 0)]];
/// let merged = KMergeIters::new(iters.into_iter().map(Vec::into_iter));
/// assert_eq!(merged.collect::<Vec<_>>(), vec![(0, 0), (0, 1), (1, 0), (1, 1)]);
/// ```
#[derive(Clone, Debug)]
pub struct KMergeIters<I: Iterator<Item = (usize, usize)>> {
    heap: dary_heap::QuaternaryHeap<HeadTail<I>>,
}

impl<I: Iterator<Item = (usize, usize)>> KMergeIters<I> {
    pub fn new(iters: impl IntoIterator<Item = I>) -> Self {
        let iters = iters.into_iter();
        let mut heap = dary_heap::QuaternaryHeap::with_capacity(iters.size_hint().1.unwrap_or(10));
        for mut iter in iters {
            if let Some(head) = iter.next() {
                heap.push(HeadTail { head, tail: iter });
            }
        }
        KMergeIters { heap }
    }
}

impl<I: Iterator<Item = (usize, usize)>> Iterator for KMergeIters<I> {
    type Item = (usize, usize);

    fn next(&mut self) -> Option<Self::Item> {
        let mut head_tail = self.heap.peek_mut()?;

        match head_tail.tail.next() {
            None => Some(PeekMut::pop(head_tail).head),
            Some(pair) => Some(std::mem::replace(&mut head_tail.head, pair)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sort_pairs() -> Result<()> {
        use tempfile::Builder;

        let dir = Builder::new().prefix("test_sort_pairs_").tempdir()?;
        let mut sp = SortPairs::new(MemoryUsage::BatchSize(10), dir.path())?;
        let n = 25;
        for i in (0..n).rev() {
            sp.push(i, i + 1)?;
        }
        let mut iter = sp.iter()?;
        for i in 0..n {
            assert_eq!(iter.next(), Some((i, i + 1)));
        }
        assert_eq!(iter.next(), None);
        Ok(())
    }

    #[test]
    fn test_duplicates_survive_the_merge() -> Result<()> {
        let dir = tempfile::tempdir()?;
        let mut sp = SortPairs::new(MemoryUsage::BatchSize(2), dir.path())?;
        for (x, y) in [(3, 4), (1, 2), (3, 4), (0, 7), (1, 2)] {
            sp.push(x, y)?;
        }
        let sorted = sp.iter()?.collect::<Vec<_>>();
        assert_eq!(sorted, vec![(0, 7), (1, 2), (1, 2), (3, 4), (3, 4)]);
        Ok(())
    }

    #[test]
    fn test_non_empty_dir() -> Result<()> {
        let dir = tempfile::tempdir()?;
        std::fs::write(dir.path().join("garbage"), b"x")?;
        assert!(SortPairs::new(MemoryUsage::BatchSize(2), dir.path()).is_err());
        Ok(())
    }

    #[test]
    fn test_unsorted_batch_is_rejected() -> Result<()> {
        let dir = tempfile::tempdir()?;
        let path = dir.path().join("batch");
        assert!(write_sorted(&path, [(1, 2), (0, 5)]).is_err());
        Ok(())
    }

    #[test]
    fn test_large_values() -> Result<()> {
        let dir = tempfile::tempdir()?;
        let path = dir.path().join("batch");
        let pairs = [(0, usize::MAX >> 2), (1 << 40, 3), (1 << 40, 1 << 41)];
        let len = write_sorted(&path, pairs)?;
        assert_eq!(len, 3);
        let iter = BatchIterator::new(&path, len)?;
        assert_eq!(iter.collect::<Vec<_>>(), pairs.to_vec());
        Ok(())
    }
}
