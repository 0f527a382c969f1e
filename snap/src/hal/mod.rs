//! Hardware collaborator seams.
//!
//! The snap core never touches registers or descriptors directly. The host
//! integration layer implements these traits on top of the real DMA engine
//! and the CGX core register window.
//!
//! # Contract
//! - `DmaEngine::stop` must be safe to call more than once.
//! - Counter queries must not block; they may be called with the transfer
//!   lock held.

pub mod regs;

use crate::plan::Chunk;

/// How the DMA engine consumes a chunk list.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DmaMode {
    /// Whole list programmed once (scatter-gather).
    ScatterGather,
    /// One chunk at a time; the next chunk is programmed from the
    /// completion interrupt.
    RearmPerChunk,
}

/// DMA collaborator errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DmaError {
    /// Descriptor list rejected by the engine.
    ProgramRejected,
}

/// DMA engine driving the snap capture port.
pub trait DmaEngine {
    /// Program the descriptors for `chunks` on `channel`.
    fn program(&mut self, chunks: &[Chunk], channel: u8) -> Result<(), DmaError>;

    /// Start (or resume after re-arm) the channel.
    fn start(&mut self, channel: u8);

    /// Stop the channel. Idempotent.
    fn stop(&mut self, channel: u8);

    /// Bytes requested of the burst currently queued on the channel.
    fn requested_count(&self, channel: u8) -> u32;

    /// Bytes of that burst not yet transferred.
    fn remaining_count(&self, channel: u8) -> u32;

    /// Descriptor consumption model of this engine.
    fn mode(&self) -> DmaMode;
}

/// Access to the CGX core register window.
pub trait CoreRegisters {
    fn read_reg(&mut self, offset: u32) -> u32;
    fn write_reg(&mut self, offset: u32, value: u32);
}

/// Soft-reset the capture core.
///
/// Asserts the reset bit, masks and acknowledges the snap interrupts, then
/// releases reset. Safe to call again on an already-idle core.
pub fn soft_reset_core<R: CoreRegisters>(window: &mut R) {
    let ctrl = window.read_reg(regs::CORE_CONTROL);
    window.write_reg(regs::CORE_CONTROL, ctrl | regs::CONTROL_SOFT_RESET);
    window.write_reg(regs::CORE_INT_MASK, 0);
    window.write_reg(regs::CORE_INT_CLEAR, regs::INT_ALL);
    window.write_reg(
        regs::CORE_CONTROL,
        ctrl & !(regs::CONTROL_SOFT_RESET | regs::CONTROL_SNAP_ENABLE),
    );
}
