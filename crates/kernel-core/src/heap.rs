// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright (C) 2026 The Priorikern Authors

//! Bump-arena heap allocator with first-fit placement and exhaustive
//! coalescing.
//!
//! The arena itself is never touched: this module only tracks address
//! ranges and their free/allocated tag in a separate, fixed-capacity block
//! table. Nothing in this kernel ever reads or writes the bytes an
//! allocation "contains" - processes are accounting records, not running
//! code - so there is no backing buffer to keep in sync.

use kernel_abi::{ALIGNMENT, HEAP_SIZE, HEAP_START, KernelError, MAX_BLOCKS, SPLIT_THRESHOLD};

/// One contiguous range of the arena and its free/allocated tag.
///
/// The block table itself is kept sorted by `start`, so a block's successor
/// is always the next table entry; there is no separate link field to keep
/// in sync with it.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct HeapBlock {
    pub start: usize,
    pub size: usize,
    pub free: bool,
}

/// Snapshot of heap usage for the `memstats` command.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct HeapStats {
    pub total: usize,
    pub used: usize,
    pub free: usize,
    pub num_allocations: usize,
    pub num_blocks: usize,
}

/// The arena allocator.
pub struct Heap {
    blocks: [HeapBlock; MAX_BLOCKS],
    len: usize,
}

impl Heap {
    /// Create a fresh heap: a single free block covering the whole arena.
    #[must_use]
    pub const fn new() -> Self {
        let mut blocks = [HeapBlock {
            start: 0,
            size: 0,
            free: true,
        }; MAX_BLOCKS];
        blocks[0] = HeapBlock {
            start: HEAP_START,
            size: HEAP_SIZE,
            free: true,
        };
        Self { blocks, len: 1 }
    }

    /// Read-only view of the live block table, in address order.
    #[must_use]
    pub fn blocks(&self) -> &[HeapBlock] {
        &self.blocks[..self.len]
    }

    const fn round_up(size: usize) -> usize {
        (size + ALIGNMENT - 1) & !(ALIGNMENT - 1)
    }

    fn find_free(&self, size: usize) -> Option<usize> {
        self.blocks[..self.len]
            .iter()
            .position(|b| b.free && b.size >= size)
    }

    /// Split the block at `idx` if the remainder after carving out `size`
    /// bytes is worth keeping separate, and the table still has room for
    /// another entry. Otherwise the oversized block is handed out intact.
    fn split(&mut self, idx: usize, size: usize) {
        let block = self.blocks[idx];
        if block.size > size + SPLIT_THRESHOLD && self.len < MAX_BLOCKS {
            let remainder = HeapBlock {
                start: block.start + size,
                size: block.size - size,
                free: true,
            };
            self.blocks.copy_within(idx + 1..self.len, idx + 2);
            self.blocks[idx + 1] = remainder;
            self.blocks[idx].size = size;
            self.len += 1;
        }
    }

    /// Merge every pair of adjacent free blocks. Exhaustive: when this
    /// returns, no two adjacent blocks are both free.
    fn coalesce(&mut self) {
        let mut i = 0;
        while i + 1 < self.len {
            let end = self.blocks[i].start + self.blocks[i].size;
            if self.blocks[i].free && self.blocks[i + 1].free && self.blocks[i + 1].start == end {
                self.blocks[i].size += self.blocks[i + 1].size;
                self.blocks.copy_within(i + 2..self.len, i + 1);
                self.len -= 1;
            } else {
                i += 1;
            }
        }
    }

    /// First-fit allocation. Retries once after a full coalescing pass if
    /// nothing fits on the first scan.
    pub fn allocate(&mut self, size: usize) -> Result<usize, KernelError> {
        if size == 0 {
            return Err(KernelError::OutOfMemory);
        }
        let size = Self::round_up(size);

        let idx = match self.find_free(size) {
            Some(idx) => idx,
            None => {
                self.coalesce();
                self.find_free(size).ok_or(KernelError::OutOfMemory)?
            }
        };

        self.split(idx, size);
        self.blocks[idx].free = false;
        Ok(self.blocks[idx].start)
    }

    /// Free the block starting at exactly `addr`. `None` is a no-op.
    pub fn free(&mut self, addr: Option<usize>) -> Result<(), KernelError> {
        let Some(addr) = addr else {
            return Ok(());
        };

        match self.blocks[..self.len].iter().position(|b| b.start == addr) {
            None => Err(KernelError::InvalidAddress),
            Some(idx) if self.blocks[idx].free => Err(KernelError::DoubleFree),
            Some(idx) => {
                self.blocks[idx].free = true;
                self.coalesce();
                Ok(())
            }
        }
    }

    /// `None` address behaves as `allocate`; `new_size == 0` behaves as
    /// `free`; a block that already fits is returned unchanged.
    pub fn reallocate(
        &mut self,
        addr: Option<usize>,
        new_size: usize,
    ) -> Result<Option<usize>, KernelError> {
        let Some(addr) = addr else {
            return self.allocate(new_size).map(Some);
        };
        if new_size == 0 {
            self.free(Some(addr))?;
            return Ok(None);
        }

        let idx = self.blocks[..self.len]
            .iter()
            .position(|b| b.start == addr)
            .ok_or(KernelError::InvalidAddress)?;

        if self.blocks[idx].size >= Self::round_up(new_size) {
            return Ok(Some(addr));
        }

        let new_addr = self.allocate(new_size)?;
        // There is no backing store to copy bytes through; the minimum of
        // old and new size is only meaningful for a real memcpy.
        self.free(Some(addr))?;
        Ok(Some(new_addr))
    }

    /// Allocate `n * size` bytes. Zero-filling is a no-op here: the arena
    /// has no backing storage to zero.
    pub fn calloc(&mut self, n: usize, size: usize) -> Result<usize, KernelError> {
        let total = n.checked_mul(size).ok_or(KernelError::OutOfMemory)?;
        self.allocate(total)
    }

    /// Force an out-of-band coalescing pass.
    pub fn defragment(&mut self) {
        self.coalesce();
    }

    #[must_use]
    pub fn stats(&self) -> HeapStats {
        let blocks = &self.blocks[..self.len];
        let used = blocks
            .iter()
            .filter(|b| !b.free)
            .map(|b| b.size)
            .sum::<usize>();
        HeapStats {
            total: HEAP_SIZE,
            used,
            free: HEAP_SIZE - used,
            num_allocations: blocks.iter().filter(|b| !b.free).count(),
            num_blocks: blocks.len(),
        }
    }

    /// Checks the invariants every public operation must leave standing:
    /// full coverage of the arena, address ordering, and no adjacent pair
    /// of free blocks.
    #[must_use]
    pub fn check_invariants(&self) -> bool {
        let blocks = &self.blocks[..self.len];
        let Some(first) = blocks.first() else {
            return false;
        };
        if first.start != HEAP_START {
            return false;
        }

        let mut covered = 0usize;
        for (i, block) in blocks.iter().enumerate() {
            covered += block.size;
            if let Some(next) = blocks.get(i + 1) {
                if next.start != block.start + block.size {
                    return false;
                }
                if block.free && next.free {
                    return false;
                }
            }
        }
        covered == HEAP_SIZE
    }
}

impl Default for Heap {
    fn default() -> Self {
        Self::new()
    }
}


#[cfg(test)]
mod proptests {
    use super::*;
    use proptest::prelude::*;

    #[derive(Clone, Copy, Debug)]
    enum Op {
        Allocate(usize),
        Free(usize),
    }

    fn op() -> impl Strategy<Value = Op> {
        prop_oneof![
            (1usize..=8192).prop_map(Op::Allocate),
            (0usize..16).prop_map(Op::Free),
        ]
    }

    proptest! {
        /// No matter what sequence of allocations and frees a caller issues,
        /// the block table always stays a gapless, address-ordered cover of
        /// the arena with no two adjacent free blocks - the invariants from
        /// the spec's coalescing scenario, but for arbitrary traffic instead
        /// of one fixed A/B/C example.
        #[test]
        fn invariants_survive_any_allocate_free_sequence(ops in prop::collection::vec(op(), 0..200)) {
            let mut heap = Heap::new();
            let mut live: Vec<usize> = Vec::new();

            for op in ops {
                match op {
                    Op::Allocate(size) => {
                        if let Ok(addr) = heap.allocate(size) {
                            live.push(addr);
                        }
                    }
                    Op::Free(pick) => {
                        if !live.is_empty() {
                            let addr = live.swap_remove(pick % live.len());
                            heap.free(Some(addr)).unwrap();
                        }
                    }
                }
                prop_assert!(heap.check_invariants());
            }
        }

        /// Freeing every outstanding allocation, in any order, always
        /// collapses the arena back down to a single free block.
        #[test]
        fn freeing_every_allocation_collapses_to_one_block(sizes in prop::collection::vec(1usize..=8192, 0..64)) {
            let mut heap = Heap::new();
            let mut live = Vec::new();
            for size in sizes {
                if let Ok(addr) = heap.allocate(size) {
                    live.push(addr);
                }
            }
            for addr in live {
                heap.free(Some(addr)).unwrap();
            }
            prop_assert_eq!(heap.blocks().len(), 1);
            prop_assert_eq!(heap.blocks()[0].size, HEAP_SIZE);
            prop_assert_eq!(heap.blocks()[0].start, HEAP_START);
        }
    }
}
