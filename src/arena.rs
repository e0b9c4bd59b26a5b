//! Bump arena backing node headers and child arrays.
//!
//! The arena is one contiguous byte region with a monotonic write offset.
//! Allocation is O(1): align the offset, check capacity, bump. Nothing is freed
//! individually; the only ways back are a rollback to a checkpoint or a full
//! reset, both of which invalidate every pointer issued after the target
//! offset.
//!
//! Every read and write goes through checked slices, so a stale pointer can
//! observe old bytes but can never touch memory outside the buffer.

use crate::error::{CoreError, Result};
use cograph_common::limits::MAX_ARENA_CAPACITY;
use tracing::{debug, trace};

/// A byte range carved out of an [`Arena`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ArenaPtr {
    offset: u32,
    len: u32,
}

impl ArenaPtr {
    pub const fn new(offset: u32, len: u32) -> Self {
        ArenaPtr { offset, len }
    }

    /// Byte offset of the range start.
    #[inline]
    pub const fn offset(self) -> u32 {
        self.offset
    }

    /// Length of the range in bytes.
    #[inline]
    pub const fn len(self) -> u32 {
        self.len
    }

    #[inline]
    pub const fn is_empty(self) -> bool {
        self.len == 0
    }

    /// Offset one past the last byte.
    #[inline]
    pub const fn end(self) -> u32 {
        self.offset + self.len
    }
}

/// A saved write offset to roll back to.
///
/// Checkpoints nest naturally: rolling back to an outer checkpoint also
/// discards everything allocated after any inner one.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Checkpoint {
    offset: u32,
    epoch: u32,
}

impl Checkpoint {
    /// The write offset captured by this checkpoint.
    pub fn offset(self) -> u32 {
        self.offset
    }
}

/// Bump allocator over a bounded byte buffer.
///
/// The buffer grows lazily up to `capacity`; memory is only committed for
/// bytes that have actually been handed out.
#[derive(Debug)]
pub struct Arena {
    buf: Vec<u8>,
    offset: usize,
    capacity: usize,
    /// Incremented on every full reset so stale checkpoints are detectable.
    epoch: u32,
    high_water: usize,
}

impl Arena {
    /// Create an arena that may hand out at most `capacity` bytes.
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.min(MAX_ARENA_CAPACITY);
        debug!(capacity, "created arena");
        Arena {
            buf: Vec::new(),
            offset: 0,
            capacity,
            epoch: 0,
            high_water: 0,
        }
    }

    /// Allocate `size` zeroed bytes aligned to `align`.
    ///
    /// `align` must be a power of two.
    pub fn allocate(&mut self, size: usize, align: usize) -> Result<ArenaPtr> {
        if !align.is_power_of_two() {
            return Err(CoreError::invalid(format!(
                "alignment {align} is not a power of two"
            )));
        }
        let start = self.offset.next_multiple_of(align);
        let end = start
            .checked_add(size)
            .filter(|&end| end <= self.capacity)
            .ok_or(CoreError::OutOfMemory {
                requested: size,
                available: self.remaining(),
            })?;

        if self.buf.len() < end {
            self.buf.resize(end, 0);
        }
        // Bytes below the old length may hold data from before a rollback.
        self.buf[start..end].fill(0);

        self.offset = end;
        self.high_water = self.high_water.max(end);
        trace!(start, size, align, "arena allocation");
        Ok(ArenaPtr::new(start as u32, size as u32))
    }

    /// Capture the current write offset.
    pub fn checkpoint(&self) -> Checkpoint {
        Checkpoint {
            offset: self.offset as u32,
            epoch: self.epoch,
        }
    }

    /// Roll the write offset back to `checkpoint`.
    ///
    /// Pointers issued after the checkpoint become invalid; their bytes are
    /// left in place until the space is handed out again.
    pub fn reset_to(&mut self, checkpoint: Checkpoint) -> Result<()> {
        if checkpoint.epoch != self.epoch {
            return Err(CoreError::invalid(
                "checkpoint was taken before the last arena reset",
            ));
        }
        let target = checkpoint.offset as usize;
        if target > self.offset {
            return Err(CoreError::invalid(format!(
                "checkpoint offset {target} is past the current offset {}",
                self.offset
            )));
        }
        debug!(from = self.offset, to = target, "arena rollback");
        self.offset = target;
        Ok(())
    }

    /// Discard every allocation.
    pub fn reset(&mut self) {
        debug!(used = self.offset, "arena reset");
        self.offset = 0;
        self.epoch = self.epoch.wrapping_add(1);
    }

    /// Bytes handed out so far.
    #[inline]
    pub fn used(&self) -> usize {
        self.offset
    }

    /// Bytes still available.
    #[inline]
    pub fn remaining(&self) -> usize {
        self.capacity - self.offset
    }

    #[inline]
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Highest write offset ever reached, across rollbacks and resets.
    #[inline]
    pub fn high_water_mark(&self) -> usize {
        self.high_water
    }

    /// Number of full resets performed.
    #[inline]
    pub fn epoch(&self) -> u32 {
        self.epoch
    }

    /// Whether `ptr` lies entirely within the live region.
    #[inline]
    pub fn contains(&self, ptr: ArenaPtr) -> bool {
        ptr.end() as usize <= self.offset
    }

    /// Borrow the bytes of a live allocation.
    pub fn bytes(&self, ptr: ArenaPtr) -> Result<&[u8]> {
        if !self.contains(ptr) {
            return Err(self.out_of_bounds(ptr.offset as usize, ptr.len as usize));
        }
        Ok(&self.buf[ptr.offset as usize..ptr.end() as usize])
    }

    /// Mutably borrow the bytes of a live allocation.
    pub fn bytes_mut(&mut self, ptr: ArenaPtr) -> Result<&mut [u8]> {
        if !self.contains(ptr) {
            return Err(self.out_of_bounds(ptr.offset as usize, ptr.len as usize));
        }
        Ok(&mut self.buf[ptr.offset as usize..ptr.end() as usize])
    }

    /// Read a little-endian u32. Reads outside the live region yield 0.
    #[inline]
    pub fn read_u32(&self, at: usize) -> u32 {
        self.live(at, 4)
            .and_then(|b| b.try_into().ok())
            .map(u32::from_le_bytes)
            .unwrap_or(0)
    }

    /// Read a little-endian u64. Reads outside the live region yield 0.
    #[inline]
    pub fn read_u64(&self, at: usize) -> u64 {
        self.live(at, 8)
            .and_then(|b| b.try_into().ok())
            .map(u64::from_le_bytes)
            .unwrap_or(0)
    }

    /// Write a little-endian u32 into the live region.
    #[inline]
    pub fn write_u32(&mut self, at: usize, value: u32) -> Result<()> {
        self.write_bytes(at, &value.to_le_bytes())
    }

    /// Write a little-endian u64 into the live region.
    #[inline]
    pub fn write_u64(&mut self, at: usize, value: u64) -> Result<()> {
        self.write_bytes(at, &value.to_le_bytes())
    }

    /// Copy raw bytes into the live region.
    pub fn write_bytes(&mut self, at: usize, bytes: &[u8]) -> Result<()> {
        let end = at.checked_add(bytes.len()).filter(|&end| end <= self.offset);
        match end {
            Some(end) => {
                self.buf[at..end].copy_from_slice(bytes);
                Ok(())
            }
            None => Err(self.out_of_bounds(at, bytes.len())),
        }
    }

    /// Copy `len` bytes from `src` to `dst` within the live region.
    /// The ranges may overlap.
    pub fn copy_within(&mut self, src: usize, len: usize, dst: usize) -> Result<()> {
        let fits = |start: usize| start.checked_add(len).is_some_and(|end| end <= self.offset);
        if !fits(src) {
            return Err(self.out_of_bounds(src, len));
        }
        if !fits(dst) {
            return Err(self.out_of_bounds(dst, len));
        }
        self.buf.copy_within(src..src + len, dst);
        Ok(())
    }

    fn live(&self, at: usize, len: usize) -> Option<&[u8]> {
        let end = at.checked_add(len)?;
        if end > self.offset {
            return None;
        }
        self.buf.get(at..end)
    }

    fn out_of_bounds(&self, at: usize, len: usize) -> CoreError {
        CoreError::invalid(format!(
            "arena access {at}..{} outside live region 0..{}",
            at.saturating_add(len),
            self.offset
        ))
    }
}
