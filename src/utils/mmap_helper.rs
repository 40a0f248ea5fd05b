/*
 * SPDX-FileCopyrightText: 2025 Inria
 *
 * SPDX-License-Identifier: Apache-2.0 OR LGPL-2.1-or-later
 */

use anyhow::{Context, Result};
use core::fmt::Debug;
use mmap_rs::*;
use std::{mem::size_of, path::Path};

/// Helper struct providing type-based [`AsRef`] access to a read-only
/// [`Mmap`] instance.
///
/// The parameter `W` defines the type of the slice used to access the
/// mapping. Usually, this will be an unsigned type such as `u32`.
///
/// Files whose length is not a multiple of the size of `W` are silently
/// zero-extended to the smallest length that is a multiple of the size of
/// `W`, which is what the bit readers of the batch files expect.
pub struct MmapHelper<W> {
    /// The underlying memory mapping.
    mmap: Mmap,
    /// The length of the mapping in `W`'s.
    len: usize,
    _marker: core::marker::PhantomData<W>,
}

impl<W> Debug for MmapHelper<W> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("MmapHelper")
            .field("mmap", &self.mmap.as_ptr())
            .field("len", &self.len)
            .finish()
    }
}

impl<W> MmapHelper<W> {
    /// Maps a file into memory (read-only).
    ///
    /// # Arguments
    /// - `path`: The path to the file to be memory mapped.
    /// - `flags`: The flags to be used for the mmap.
    pub fn mmap(path: impl AsRef<Path>, flags: MmapFlags) -> Result<Self> {
        let path = path.as_ref();
        let file_len: usize = path
            .metadata()
            .with_context(|| format!("Cannot stat {}", path.display()))?
            .len()
            .try_into()
            .with_context(|| "Cannot convert file length to usize")?;
        // Align to multiple of size_of::<W>
        let mmap_len = file_len.next_multiple_of(size_of::<W>());
        let file = std::fs::File::open(path)
            .with_context(|| format!("Cannot open {} for MmapHelper", path.display()))?;

        let mmap = unsafe {
            // Length must be > 0, or we get a panic.
            mmap_rs::MmapOptions::new(mmap_len.max(size_of::<W>()))
                .with_context(|| format!("Cannot initialize mmap of size {mmap_len}"))?
                .with_flags(flags)
                .with_file(&file, 0)
                .map()
                .with_context(|| format!("Cannot mmap {} (size {})", path.display(), mmap_len))?
        };

        Ok(Self {
            len: mmap_len / size_of::<W>(),
            mmap,
            _marker: core::marker::PhantomData,
        })
    }
}

impl<W> AsRef<[W]> for MmapHelper<W> {
    fn as_ref(&self) -> &[W] {
        unsafe { std::slice::from_raw_parts(self.mmap.as_ptr() as *const W, self.len) }
    }
}
