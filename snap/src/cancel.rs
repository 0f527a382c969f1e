//! Cancellation engine.
//!
//! Two-phase protocol. A request only records a cutoff (bytes into the
//! snap) and never blocks; the hardware stop happens at whichever call site
//! first sees that the cutoff has been, or is about to be, crossed.
//!
//! ```text
//!  request(N) ──> on_byte = round_down(N - preroll, granularity)
//!                        │
//!  confirm ───────> received > on_byte ?                   ── yes ─┐
//!                   received + queued burst >= on_byte ?   ── yes ─┤
//!                   otherwise Pending                              ▼
//!                                                   stop DMA + core reset (once)
//! ```
//!
//! A DMA burst cannot be stopped mid-flight without tearing a block, so the
//! caller gets a bound on the excess captured after the request instead of
//! an exact stop.

use cgsnap_core::{log_debug, log_info};

use crate::config::SnapConfig;
use crate::hal::{soft_reset_core, CoreRegisters, DmaEngine};
use crate::state::{CancelPoint, SnapPhase, TransferState};

/// Result of a cancel confirmation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CancelStatus {
    /// Cutoff not reached yet; re-check on the next event.
    Pending,
    /// Transfer stopped.
    Canceled,
    /// Transfer completed before the cutoff was reached.
    AlreadyDone,
}

/// Round `value` down to a multiple of `granularity`.
#[inline]
fn round_down(value: u32, granularity: u32) -> u32 {
    if granularity.is_power_of_two() {
        value & !(granularity - 1)
    } else {
        value - value % granularity.max(1)
    }
}

/// Cutoff for a request of `on_byte_count` bytes.
///
/// A request that falls inside the pre-roll window cannot be honored later
/// than "now", so it becomes an immediate cancel.
pub fn cutoff_for(on_byte_count: u32, config: &SnapConfig) -> u32 {
    if on_byte_count > config.cancel_preroll {
        round_down(on_byte_count - config.cancel_preroll, config.cancel_granularity)
    } else {
        0
    }
}

/// Phase 1: record the cancel request.
///
/// Repeating a request never moves the cutoff later.
pub fn request(state: &mut TransferState, on_byte_count: u32, config: &SnapConfig) -> CancelPoint {
    let on_byte = cutoff_for(on_byte_count, config);

    if state.cancel.requested {
        state.cancel.on_byte = state.cancel.on_byte.min(on_byte);
    } else {
        state.cancel = CancelPoint {
            requested: true,
            on_byte,
        };
    }

    log_info!("snap: cancel cutoff", state.cancel.on_byte);
    state.cancel
}

/// Is block `block_number` (1-based) at or past the cutoff?
#[inline]
pub fn is_block_canceled(state: &TransferState, block_number: u32) -> bool {
    state.cancel.requested
        && block_number as u64 * state.block_size as u64 >= state.cancel.on_byte as u64
}

/// Stop the engine and reset the core, at most once per transfer.
pub fn stop_transfer<D: DmaEngine, R: CoreRegisters>(
    state: &mut TransferState,
    dma: &mut D,
    regs: &mut R,
    channel: u8,
) {
    if !state.dma_stopped {
        dma.stop(channel);
        soft_reset_core(regs);
        state.dma_stopped = true;
        log_info!("snap: DMA stopped at byte", state.received_bytes);
    }
}

/// Phase 2: decide whether the cutoff is (about to be) crossed and, if so,
/// stop the hardware.
pub fn is_read_canceled<D: DmaEngine, R: CoreRegisters>(
    state: &mut TransferState,
    dma: &mut D,
    regs: &mut R,
    channel: u8,
) -> CancelStatus {
    match state.phase {
        SnapPhase::Canceled => return CancelStatus::Canceled,
        SnapPhase::Done => return CancelStatus::AlreadyDone,
        _ => {}
    }
    if !state.cancel.requested {
        return CancelStatus::Pending;
    }

    let on_byte = state.cancel.on_byte;
    let crossed = if state.received_bytes > on_byte {
        true
    } else {
        let queued = dma
            .requested_count(channel)
            .saturating_sub(dma.remaining_count(channel));
        log_debug!("snap: queued burst bytes", queued);
        state.received_bytes as u64 + queued as u64 >= on_byte as u64
    };

    if !crossed {
        return CancelStatus::Pending;
    }

    stop_transfer(state, dma, regs, channel);
    state.phase = SnapPhase::Canceled;
    state.done = true;
    CancelStatus::Canceled
}

/// Whether a completed cancel must wake the consumer by itself.
///
/// True for immediate cancels and when the consumer is already blocked; in
/// both cases no further arrival event is going to wake it.
#[inline]
pub fn should_wake_waiter(state: &TransferState) -> bool {
    state.phase == SnapPhase::Canceled && (state.cancel.on_byte == 0 || state.waiter_blocked)
}
