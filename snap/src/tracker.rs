//! Completion tracker.
//!
//! Interrupt-context bookkeeping for chunk arrivals. Every function here is
//! O(1), never blocks and never allocates; what has to happen afterwards
//! (waking the consumer, re-arming the engine) is returned to the caller as
//! an [`ArrivalAction`] so it can be done after the transfer lock is dropped
//! or with the engine it already holds.

use crate::hal::DmaMode;
use crate::plan::TransferPlan;
use crate::state::{SnapPhase, TransferState};

/// Follow-up work after an arrival event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ArrivalAction {
    /// Wake the blocked consumer.
    pub signal: bool,
    /// Chunk to program next (per-chunk re-arm engines only).
    pub rearm: Option<u32>,
    /// The cancel cutoff has been reached; the caller stops the capture.
    pub cutoff_crossed: bool,
}

#[inline]
fn cutoff_reached(state: &TransferState) -> bool {
    state.cancel.requested && state.received_bytes >= state.cancel.on_byte
}

/// Account for the DMA task at `state.active_chunk` having completed.
///
/// Arrivals outside `Running` (stray interrupts after a stop, before start)
/// are ignored. Once the cancel cutoff has been reached, further arrivals
/// land in the buffer but are not counted as received.
pub fn on_chunk_arrival(
    state: &mut TransferState,
    plan: &TransferPlan,
    mode: DmaMode,
) -> ArrivalAction {
    if state.phase != SnapPhase::Running {
        return ArrivalAction::default();
    }

    if cutoff_reached(state) {
        // The bytes still land; only the accounting stops.
        if let Some(chunk) = plan.chunk(state.active_chunk) {
            state.chunk_landed(chunk.block);
        }
        return ArrivalAction {
            signal: true,
            rearm: None,
            cutoff_crossed: true,
        };
    }

    let Some(chunk) = plan.chunk(state.active_chunk) else {
        return ArrivalAction::default();
    };

    state.chunk_landed(chunk.block);
    state.received_chunks += 1;
    state.active_chunk += 1;
    state.received_bytes = state.received_bytes.saturating_add(chunk.length);

    let mut action = ArrivalAction::default();
    if chunk.last_in_block {
        state.received_blocks += 1;
        action.signal = true;
    }

    if state.received_chunks >= state.required_chunks {
        state.done = true;
        state.phase = SnapPhase::Done;
        action.signal = true;
    } else if cutoff_reached(state) {
        action.signal = true;
        action.cutoff_crossed = true;
    } else if mode == DmaMode::RearmPerChunk {
        action.rearm = Some(state.active_chunk);
    }

    action
}

/// Record a hardware overrun. Sticky until the next plan.
pub fn on_overrun(state: &mut TransferState) -> ArrivalAction {
    if state.phase == SnapPhase::Idle {
        return ArrivalAction::default();
    }
    state.overrun = true;
    ArrivalAction {
        signal: true,
        ..ArrivalAction::default()
    }
}
