//! Transfer record for one snap.
//!
//! # State Machine
//! ```text
//!   IDLE ──plan()──> PLANNED ──start()──> RUNNING ──last chunk──> DONE
//!     ▲                 ▲                    │
//!     │                 │                    └──cutoff crossed──> CANCELED
//!     └────reset()──────┴──────plan() from any phase but RUNNING──────┘
//! ```
//!
//! The record is passive: the completion tracker and the cancellation
//! engine mutate it, the waiter path reads it.

use crate::byteorder::ByteOrder;
use crate::config::MAX_TASKS;
use crate::plan::TransferPlan;

/// Lifecycle phase of the device's transfer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SnapPhase {
    Idle,
    Planned,
    Running,
    Done,
    Canceled,
}

impl SnapPhase {
    #[inline]
    pub fn is_terminal(&self) -> bool {
        matches!(self, SnapPhase::Done | SnapPhase::Canceled)
    }
}

/// Requested cancellation cutoff.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct CancelPoint {
    pub requested: bool,
    /// Byte offset into the snap at which the cancel takes effect.
    pub on_byte: u32,
}

/// Mutable record of the in-flight (or just finished) snap.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TransferState {
    pub phase: SnapPhase,

    pub required_bytes: u32,
    pub received_bytes: u32,

    pub required_blocks: u32,
    pub received_blocks: u32,
    pub block_size: u32,
    pub last_block_size: u32,

    pub active_chunk: u32,
    pub required_chunks: u32,
    pub received_chunks: u32,

    /// Ring-relative offset of each block in the capture buffer.
    pub block_offsets: [u32; MAX_TASKS],
    /// Ring slots in the capture buffer.
    pub buffer_blocks: u32,
    /// One past the highest block any landed chunk belonged to.
    pub landed_blocks: u32,

    pub cancel: CancelPoint,
    pub overrun: bool,
    pub done: bool,
    /// Order the device packed this capture in.
    pub byte_order: ByteOrder,

    /// Hardware stop already issued for this transfer.
    pub dma_stopped: bool,
    /// Consumer is blocked in `wait_block`.
    pub waiter_blocked: bool,
    /// Bit `s` set while ring slot `s` holds byte-order corrected data.
    pub corrected: u64,
}

impl TransferState {
    pub const fn new() -> Self {
        Self {
            phase: SnapPhase::Idle,
            required_bytes: 0,
            received_bytes: 0,
            required_blocks: 0,
            received_blocks: 0,
            block_size: 0,
            last_block_size: 0,
            active_chunk: 0,
            required_chunks: 0,
            received_chunks: 0,
            block_offsets: [0; MAX_TASKS],
            buffer_blocks: 0,
            landed_blocks: 0,
            cancel: CancelPoint {
                requested: false,
                on_byte: 0,
            },
            overrun: false,
            done: false,
            byte_order: ByteOrder::native(),
            dma_stopped: false,
            waiter_blocked: false,
            corrected: 0,
        }
    }

    /// Fresh record for a newly planned snap.
    pub fn from_plan(plan: &TransferPlan, byte_order: ByteOrder) -> Self {
        let mut state = Self::new();
        state.phase = SnapPhase::Planned;
        state.required_bytes = plan.total_length();
        state.required_blocks = plan.required_blocks();
        state.block_size = plan.block_size();
        state.last_block_size = plan.last_block_size();
        state.required_chunks = plan.required_chunks();
        state.buffer_blocks = plan.buffer_blocks();
        state.byte_order = byte_order;

        for b in 0..plan.required_blocks().min(MAX_TASKS as u32) {
            state.block_offsets[b as usize] = plan.block_offset(b);
        }
        state
    }

    /// True once block `index` (0-based) has fully arrived.
    #[inline]
    pub fn block_arrived(&self, index: u32) -> bool {
        self.received_blocks > index
    }

    /// Length of block `index` (0-based).
    #[inline]
    pub fn block_length(&self, index: u32) -> u32 {
        if index + 1 == self.required_blocks {
            self.last_block_size
        } else {
            self.block_size
        }
    }

    /// Ring slot holding block `index`.
    #[inline]
    pub fn slot_of(&self, index: u32) -> u32 {
        index % self.buffer_blocks.max(1)
    }

    /// True once a later block has started landing in the slot of block
    /// `index`, so its bytes are gone.
    #[inline]
    pub fn block_overwritten(&self, index: u32) -> bool {
        self.landed_blocks as u64 > index as u64 + self.buffer_blocks.max(1) as u64
    }

    /// Record that a chunk of block `block` has landed in its slot.
    pub fn chunk_landed(&mut self, block: u32) {
        self.landed_blocks = self.landed_blocks.max(block + 1);
        let slot = self.slot_of(block);
        if slot < 64 {
            self.corrected &= !(1u64 << slot);
        }
    }

    #[inline]
    pub fn is_corrected(&self, index: u32) -> bool {
        let slot = self.slot_of(index);
        slot < 64 && self.corrected & (1u64 << slot) != 0
    }

    #[inline]
    pub fn mark_corrected(&mut self, index: u32) {
        let slot = self.slot_of(index);
        if slot < 64 {
            self.corrected |= 1u64 << slot;
        }
    }

    /// Read-only snapshot for diagnostics.
    pub fn status(&self) -> TransferStatus {
        TransferStatus {
            phase: self.phase,
            required_bytes: self.required_bytes,
            received_bytes: self.received_bytes,
            required_blocks: self.required_blocks,
            received_blocks: self.received_blocks,
            required_chunks: self.required_chunks,
            received_chunks: self.received_chunks,
            block_size: self.block_size,
            last_block_size: self.last_block_size,
            cancel: self.cancel,
            overrun: self.overrun,
            done: self.done,
            byte_order: self.byte_order,
        }
    }
}

impl Default for TransferState {
    fn default() -> Self {
        Self::new()
    }
}

/// Counter snapshot returned by `Status`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TransferStatus {
    pub phase: SnapPhase,
    pub required_bytes: u32,
    pub received_bytes: u32,
    pub required_blocks: u32,
    pub received_blocks: u32,
    pub required_chunks: u32,
    pub received_chunks: u32,
    pub block_size: u32,
    pub last_block_size: u32,
    pub cancel: CancelPoint,
    pub overrun: bool,
    pub done: bool,
    pub byte_order: ByteOrder,
}
