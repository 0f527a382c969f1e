//! Chunk planner.
//!
//! Turns a requested snap shape into the bounded list of DMA task
//! descriptors the engine is programmed with.
//!
//! # Layout
//! ```text
//!  snap:    | blk 0 | blk 1 | blk 2 | blk 3 | blk 4 |..|
//!  buffer:  | slot 0 | slot 1 | slot 2 |            (ring, buffer_size / block_size slots)
//!  blk b -> slot (b mod slots); each block split into chunks <= burst cap
//! ```
//!
//! The plan is pure data: no hardware is touched here.

use crate::config::MAX_TASKS;
use crate::error::PlanError;

/// One DMA task descriptor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Chunk {
    /// Logical block this chunk belongs to.
    pub block: u32,
    /// Destination bus address.
    pub offset: u32,
    /// Length in bytes.
    pub length: u32,
    /// Completing this chunk completes its block.
    pub last_in_block: bool,
}

/// Shape of a transfer to plan.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PlanRequest {
    /// Total bytes, platform extra bytes included.
    pub total_length: u32,
    /// Block length; 0 means the whole transfer is one block.
    pub block_length: u32,
    /// Physical capture buffer size.
    pub buffer_size: u32,
    /// DMA burst cap; 0 means one chunk per block.
    pub max_chunk_size: u32,
    /// Bus address of the capture buffer.
    pub dest_base: u32,
}

/// Immutable chunk list for one snap.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TransferPlan {
    chunks: [Chunk; MAX_TASKS],
    chunk_count: usize,
    total_length: u32,
    block_size: u32,
    last_block_size: u32,
    required_blocks: u32,
    buffer_blocks: u32,
    dest_base: u32,
}

impl TransferPlan {
    /// Plan with no chunks (idle device).
    pub const fn empty() -> Self {
        Self {
            chunks: [Chunk {
                block: 0,
                offset: 0,
                length: 0,
                last_in_block: false,
            }; MAX_TASKS],
            chunk_count: 0,
            total_length: 0,
            block_size: 0,
            last_block_size: 0,
            required_blocks: 0,
            buffer_blocks: 0,
            dest_base: 0,
        }
    }

    #[inline]
    pub fn chunks(&self) -> &[Chunk] {
        &self.chunks[..self.chunk_count]
    }

    #[inline]
    pub fn chunk(&self, index: u32) -> Option<&Chunk> {
        self.chunks().get(index as usize)
    }

    #[inline]
    pub fn required_chunks(&self) -> u32 {
        self.chunk_count as u32
    }

    #[inline]
    pub fn total_length(&self) -> u32 {
        self.total_length
    }

    #[inline]
    pub fn block_size(&self) -> u32 {
        self.block_size
    }

    #[inline]
    pub fn last_block_size(&self) -> u32 {
        self.last_block_size
    }

    #[inline]
    pub fn required_blocks(&self) -> u32 {
        self.required_blocks
    }

    /// Ring capacity of the capture buffer, in blocks.
    #[inline]
    pub fn buffer_blocks(&self) -> u32 {
        self.buffer_blocks
    }

    #[inline]
    pub fn dest_base(&self) -> u32 {
        self.dest_base
    }

    /// Ring-relative offset of block `b` in the capture buffer.
    #[inline]
    pub fn block_offset(&self, b: u32) -> u32 {
        if self.buffer_blocks == 0 {
            return 0;
        }
        self.block_size * (b % self.buffer_blocks)
    }

    /// Length of block `b` (the last block may be short).
    #[inline]
    pub fn block_length(&self, b: u32) -> u32 {
        if b + 1 == self.required_blocks {
            self.last_block_size
        } else {
            self.block_size
        }
    }

    fn push(&mut self, chunk: Chunk) {
        self.chunks[self.chunk_count] = chunk;
        self.chunk_count += 1;
    }

    /// Split `[dest, dest + len)` of block `block` into chunks of `chunk_size`.
    ///
    /// With `take_remainder` the block is cut into `len / chunk_size` pieces
    /// and the last piece absorbs the remainder; otherwise every piece is
    /// capped at `chunk_size`.
    fn push_block(&mut self, block: u32, dest: u32, len: u32, chunk_size: u32, take_remainder: bool) {
        let pieces = if take_remainder {
            (len / chunk_size).max(1)
        } else {
            len.div_ceil(chunk_size)
        };

        let mut advance = 0;
        for piece in 0..pieces {
            let last = piece + 1 == pieces;
            let length = if last { len - advance } else { chunk_size };
            self.push(Chunk {
                block,
                offset: dest + advance,
                length,
                last_in_block: last,
            });
            advance += length;
        }
    }
}

impl Default for TransferPlan {
    fn default() -> Self {
        Self::empty()
    }
}

/// Plan a snap transfer.
///
/// # Returns
/// - `Ok(plan)`: chunk list covering exactly `total_length` bytes
/// - `Err(PlanError::TooManyChunks)`: more than `MAX_TASKS` descriptors needed
/// - `Err(PlanError::ZeroLength | BufferTooSmall | AddressRange)`: bad request
pub fn plan(req: &PlanRequest) -> Result<TransferPlan, PlanError> {
    let total = req.total_length;
    if total == 0 {
        return Err(PlanError::ZeroLength);
    }

    let block_size = if req.block_length == 0 || total < req.block_length {
        total
    } else {
        req.block_length
    };

    if req.buffer_size < block_size {
        return Err(PlanError::BufferTooSmall {
            block_size,
            buffer_size: req.buffer_size,
        });
    }
    if req.dest_base.checked_add(req.buffer_size).is_none() {
        return Err(PlanError::AddressRange);
    }

    let chunk_size = if req.max_chunk_size == 0 || req.max_chunk_size > block_size {
        block_size
    } else {
        req.max_chunk_size
    };
    let chunks_per_block = block_size / chunk_size;

    let full_blocks = total / block_size;
    let remainder = total % block_size;
    let trailing_chunks = remainder.div_ceil(chunk_size);

    let required = full_blocks as u64 * chunks_per_block as u64 + trailing_chunks as u64;
    if required > MAX_TASKS as u64 {
        return Err(PlanError::TooManyChunks {
            required: required as usize,
            max: MAX_TASKS,
        });
    }

    let mut plan = TransferPlan::empty();
    plan.total_length = total;
    plan.block_size = block_size;
    plan.required_blocks = full_blocks + (remainder > 0) as u32;
    plan.last_block_size = if remainder > 0 { remainder } else { block_size };
    plan.buffer_blocks = req.buffer_size / block_size;
    plan.dest_base = req.dest_base;

    for b in 0..full_blocks {
        let dest = req.dest_base + plan.block_offset(b);
        plan.push_block(b, dest, block_size, chunk_size, true);
    }

    if remainder > 0 {
        let dest = req.dest_base + plan.block_offset(full_blocks);
        plan.push_block(full_blocks, dest, remainder, chunk_size, false);
    }

    Ok(plan)
}
