//! Snap device: one driver instance.
//!
//! Owns the plan, the transfer record and both hardware collaborators behind
//! a single lock, plus the wait handle the consumer blocks on.
//!
//! # Contexts
//! - `on_chunk_complete` / `on_overrun` / `poll_core_status`: interrupt
//!   context. Each posts its event to an atomic and applies it only if the
//!   lock is free (`try_lock`); they never spin on the lock. An event posted
//!   while the lock is held is applied by whoever holds it, on release.
//! - everything else: thread context. The lock is never held across
//!   `WaitHandle::wait`.
//!
//! # Contract
//! The host integration layer must not call thread-context operations from
//! the interrupt handler.
//!
//! # Usage
//!
//! ```ignore
//! let dev = SnapDevice::new(dma, regs, CondvarWaitHandle::new(), region, SnapConfig::new());
//! dev.plan(64 * 1024, 4096, ByteOrder::O1234)?;
//! dev.start()?;
//! let block = dev.wait_block(0, 500)?;
//! let n = dev.read_block(&block, &mut out)?;
//! ```

use core::mem::ManuallyDrop;
use core::ops::{Deref, DerefMut};
use core::slice;
use core::sync::atomic::{fence, AtomicBool, AtomicU32, Ordering};

use cgsnap_core::{log_debug, log_info, log_warn};
use spin::{Mutex, MutexGuard};

use crate::byteorder::{self, ByteOrder, SwapClass};
use crate::cancel::{self, CancelStatus};
use crate::config::SnapConfig;
use crate::dma::CaptureRegion;
use crate::error::{PlanError, SnapError};
use crate::hal::{regs, CoreRegisters, DmaEngine, DmaMode};
use crate::plan::{self, PlanRequest, TransferPlan};
use crate::state::{SnapPhase, TransferState, TransferStatus};
use crate::tracker;
use crate::wait::WaitHandle;

/// Shape of a freshly planned snap.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PlanSummary {
    pub total_length: u32,
    pub block_size: u32,
    pub last_block_size: u32,
    pub required_blocks: u32,
    pub required_chunks: u32,
}

/// A received block, already in native byte order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BlockSlice {
    /// Block index (0-based).
    pub index: u32,
    /// Offset in the capture region.
    pub offset: u32,
    /// Length in bytes.
    pub length: u32,
    /// Swap applied when the block was handed out.
    pub swap: SwapClass,
}

struct SnapInner<D, R> {
    plan: TransferPlan,
    state: TransferState,
    dma: D,
    regs: R,
}

/// Interrupt events not yet applied to the transfer record.
struct PendingEvents {
    arrivals: AtomicU32,
    overrun: AtomicBool,
    core_status: AtomicBool,
}

impl PendingEvents {
    const fn new() -> Self {
        Self {
            arrivals: AtomicU32::new(0),
            overrun: AtomicBool::new(false),
            core_status: AtomicBool::new(false),
        }
    }

    #[inline]
    fn any(&self) -> bool {
        self.arrivals.load(Ordering::SeqCst) != 0
            || self.overrun.load(Ordering::SeqCst)
            || self.core_status.load(Ordering::SeqCst)
    }
}

/// Thread-context lock guard. Applies interrupt events posted while it was
/// held once the lock is released.
struct InnerGuard<'a, D: DmaEngine, R: CoreRegisters, W: WaitHandle> {
    guard: ManuallyDrop<MutexGuard<'a, SnapInner<D, R>>>,
    device: &'a SnapDevice<D, R, W>,
}

impl<D: DmaEngine, R: CoreRegisters, W: WaitHandle> Deref for InnerGuard<'_, D, R, W> {
    type Target = SnapInner<D, R>;

    fn deref(&self) -> &Self::Target {
        &self.guard
    }
}

impl<D: DmaEngine, R: CoreRegisters, W: WaitHandle> DerefMut for InnerGuard<'_, D, R, W> {
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut self.guard
    }
}

impl<D: DmaEngine, R: CoreRegisters, W: WaitHandle> Drop for InnerGuard<'_, D, R, W> {
    fn drop(&mut self) {
        // Safety: the guard is never touched again after this point.
        unsafe { ManuallyDrop::drop(&mut self.guard) };
        self.device.drain_pending();
    }
}

/// Snap transfer driver instance.
pub struct SnapDevice<D: DmaEngine, R: CoreRegisters, W: WaitHandle> {
    inner: Mutex<SnapInner<D, R>>,
    pending: PendingEvents,
    waiter: W,
    region: CaptureRegion,
    config: SnapConfig,
}

impl<D: DmaEngine, R: CoreRegisters, W: WaitHandle> SnapDevice<D, R, W> {
    pub fn new(dma: D, regs: R, waiter: W, region: CaptureRegion, config: SnapConfig) -> Self {
        if !region.is_valid() {
            log_warn!("snap: unusable capture region, size", region.size());
        }
        Self {
            inner: Mutex::new(SnapInner {
                plan: TransferPlan::empty(),
                state: TransferState::new(),
                dma,
                regs,
            }),
            pending: PendingEvents::new(),
            waiter,
            region,
            config,
        }
    }

    #[inline]
    pub fn config(&self) -> &SnapConfig {
        &self.config
    }

    #[inline]
    pub fn region(&self) -> &CaptureRegion {
        &self.region
    }

    #[inline]
    fn lock(&self) -> InnerGuard<'_, D, R, W> {
        InnerGuard {
            guard: ManuallyDrop::new(self.inner.lock()),
            device: self,
        }
    }

    // ═══════════════════════════════════════════════════════════════════════
    // THREAD CONTEXT
    // ═══════════════════════════════════════════════════════════════════════

    /// Plan a new snap. Resets all counters and flags.
    ///
    /// # Returns
    /// - `Err(SnapError::Busy)`: a transfer is running
    /// - `Err(SnapError::Plan(_))`: the shape cannot be planned
    pub fn plan(
        &self,
        total_length: u32,
        block_length: u32,
        byte_order: ByteOrder,
    ) -> Result<PlanSummary, SnapError> {
        let mut inner = self.lock();
        if inner.state.phase == SnapPhase::Running {
            return Err(SnapError::Busy);
        }

        let padded = total_length
            .checked_add(self.config.extra_bytes)
            .ok_or(PlanError::LengthOverflow)?;

        let new_plan = plan::plan(&PlanRequest {
            total_length: padded,
            block_length,
            buffer_size: self.region.size(),
            max_chunk_size: self.config.max_chunk_size,
            dest_base: self.region.bus_base(),
        })
        .map_err(|e| {
            log_warn!("snap: plan rejected, length", total_length);
            e
        })?;

        inner.plan = new_plan;
        inner.state = TransferState::from_plan(&new_plan, byte_order);
        drop(inner);

        self.waiter.clear();

        log_info!("snap: planned bytes", new_plan.total_length());
        log_debug!("snap: planned chunks", new_plan.required_chunks());

        Ok(PlanSummary {
            total_length: new_plan.total_length(),
            block_size: new_plan.block_size(),
            last_block_size: new_plan.last_block_size(),
            required_blocks: new_plan.required_blocks(),
            required_chunks: new_plan.required_chunks(),
        })
    }

    /// Hand the planned chunks to the DMA engine and start the capture.
    ///
    /// Scatter-gather engines get the whole list; per-chunk engines get the
    /// first chunk and are re-armed from the completion interrupt.
    pub fn start(&self) -> Result<(), SnapError> {
        let mut guard = self.lock();
        let inner = &mut *guard;

        match inner.state.phase {
            SnapPhase::Planned => {}
            SnapPhase::Running => return Err(SnapError::Busy),
            SnapPhase::Canceled => return Err(SnapError::Canceled),
            SnapPhase::Idle | SnapPhase::Done => return Err(SnapError::NotPlanned),
        }

        let chunks = inner.plan.chunks();
        let program = match inner.dma.mode() {
            DmaMode::ScatterGather => chunks,
            DmaMode::RearmPerChunk => &chunks[..1],
        };
        inner.dma.program(program, self.config.dma_channel)?;

        let ctrl = inner.regs.read_reg(regs::CORE_CONTROL);
        inner.regs.write_reg(regs::CORE_INT_CLEAR, regs::INT_ALL);
        inner.regs.write_reg(regs::CORE_INT_MASK, regs::INT_ALL);
        inner
            .regs
            .write_reg(regs::CORE_CONTROL, ctrl | regs::CONTROL_SNAP_ENABLE);

        inner.dma.start(self.config.dma_channel);
        inner.state.phase = SnapPhase::Running;

        log_info!("snap: started, chunks", program.len());
        Ok(())
    }

    /// Wait for block `index` (0-based) and return it in native byte order.
    ///
    /// `timeout_ms` is one budget for the whole call: wake-ups caused by
    /// other blocks do not extend it. Already-arrived blocks are returned
    /// without waiting.
    ///
    /// # Returns
    /// - `Err(SnapError::Timeout)`: the block did not arrive within `timeout_ms`
    /// - `Err(SnapError::Canceled)`: the block lies past the cancel cutoff
    /// - `Err(SnapError::Overrun)`: hardware overran the capture buffer
    /// - `Err(SnapError::Overwritten)`: the ring slot already holds a later block
    /// - `Err(SnapError::OutOfBounds)`: woken with zero blocks received
    pub fn wait_block(&self, index: u32, timeout_ms: u32) -> Result<BlockSlice, SnapError> {
        let started = self.waiter.now_ms();
        let mut woken = false;

        loop {
            {
                let mut guard = self.lock();
                let inner = &mut *guard;
                let state = &mut inner.state;

                if state.phase == SnapPhase::Idle {
                    state.waiter_blocked = false;
                    return Err(SnapError::NotPlanned);
                }
                if index >= state.required_blocks {
                    return Err(SnapError::InvalidBlock {
                        index,
                        required: state.required_blocks,
                    });
                }
                if state.overrun {
                    state.waiter_blocked = false;
                    return Err(SnapError::Overrun);
                }
                if state.block_arrived(index) {
                    state.waiter_blocked = false;
                    if state.block_overwritten(index) {
                        log_warn!("snap: block overwritten by ring wrap", index);
                        return Err(SnapError::Overwritten { index });
                    }
                    return Ok(self.correct_block(state, index));
                }
                if state.phase == SnapPhase::Canceled {
                    state.waiter_blocked = false;
                    return Err(SnapError::Canceled);
                }
                if cancel::is_block_canceled(state, index + 1) {
                    let status = cancel::is_read_canceled(
                        state,
                        &mut inner.dma,
                        &mut inner.regs,
                        self.config.dma_channel,
                    );
                    if status == CancelStatus::Canceled {
                        state.waiter_blocked = false;
                        return Err(SnapError::Canceled);
                    }
                }
                if woken && state.received_blocks == 0 {
                    state.waiter_blocked = false;
                    log_warn!("snap: woke with no blocks, waiting for", index);
                    return Err(SnapError::OutOfBounds);
                }

                state.waiter_blocked = true;
            }

            let spent = self.waiter.now_ms().saturating_sub(started);
            let left = (timeout_ms as u64).saturating_sub(spent) as u32;
            if !self.waiter.wait(left) {
                self.lock().state.waiter_blocked = false;
                return Err(SnapError::Timeout);
            }
            woken = true;
        }
    }

    /// Apply byte-order correction to block `index` once.
    fn correct_block(&self, state: &mut TransferState, index: u32) -> BlockSlice {
        let offset = state.block_offsets[index as usize];
        let length = state.block_length(index);
        let mut swap = byteorder::classify(state.byte_order, self.config.native_order);

        if swap != SwapClass::None && !state.is_corrected(index) {
            // Safety: the block has arrived, the engine has moved past its
            // ring slot, and the transfer lock serializes every consumer.
            match unsafe { self.region.slice_mut(offset, length) } {
                Some(bytes) => {
                    byteorder::apply(bytes, state.byte_order, self.config.native_order);
                    state.mark_corrected(index);
                }
                None => {
                    log_warn!("snap: block outside capture region", index);
                    swap = SwapClass::None;
                }
            }
        }

        BlockSlice {
            index,
            offset,
            length,
            swap,
        }
    }

    /// Copy a received block out of the capture region.
    ///
    /// Returns the number of bytes copied (bounded by `out.len()`).
    ///
    /// # Returns
    /// - `Err(SnapError::Overwritten)`: the ring reused the slot since the
    ///   block was handed out
    pub fn read_block(&self, block: &BlockSlice, out: &mut [u8]) -> Result<usize, SnapError> {
        let guard = self.lock();
        if guard.state.block_overwritten(block.index) {
            return Err(SnapError::Overwritten { index: block.index });
        }

        let len = block.length.min(out.len() as u32);
        // Safety: the lock keeps the consumer side serialized; the slot
        // belongs to the consumer until the ring wraps back to it.
        match unsafe { self.region.slice(block.offset, len) } {
            Some(bytes) => {
                out[..bytes.len()].copy_from_slice(bytes);
                Ok(bytes.len())
            }
            None => Ok(0),
        }
    }

    /// Request cancellation at `on_byte_count` bytes into the snap.
    ///
    /// Never blocks. If the cutoff is already (about to be) crossed the
    /// hardware is stopped here and `Canceled` is returned; otherwise the
    /// cancel stays `Pending` and completes when the cutoff is reached.
    pub fn request_cancel(&self, on_byte_count: u32) -> Result<CancelStatus, SnapError> {
        let mut guard = self.lock();
        let inner = &mut *guard;

        match inner.state.phase {
            SnapPhase::Idle => return Err(SnapError::NotPlanned),
            phase if phase.is_terminal() => {
                return Ok(cancel::is_read_canceled(
                    &mut inner.state,
                    &mut inner.dma,
                    &mut inner.regs,
                    self.config.dma_channel,
                ));
            }
            _ => {}
        }

        cancel::request(&mut inner.state, on_byte_count, &self.config);
        let status = cancel::is_read_canceled(
            &mut inner.state,
            &mut inner.dma,
            &mut inner.regs,
            self.config.dma_channel,
        );
        let wake = cancel::should_wake_waiter(&inner.state);
        drop(guard);

        if wake {
            self.waiter.notify();
        }
        Ok(status)
    }

    /// Counter snapshot.
    pub fn status(&self) -> TransferStatus {
        self.lock().state.status()
    }

    /// Full copy of the transfer record (block offsets included).
    pub fn snapshot(&self) -> TransferState {
        self.lock().state
    }

    /// Stop any running capture and return to `Idle`.
    pub fn reset(&self) {
        let mut guard = self.lock();
        let inner = &mut *guard;

        if matches!(inner.state.phase, SnapPhase::Running | SnapPhase::Planned) {
            cancel::stop_transfer(
                &mut inner.state,
                &mut inner.dma,
                &mut inner.regs,
                self.config.dma_channel,
            );
        }
        let waiter_blocked = inner.state.waiter_blocked;
        inner.plan = TransferPlan::empty();
        inner.state = TransferState::new();
        drop(guard);

        // A blocked consumer re-checks and sees NotPlanned.
        if waiter_blocked {
            self.waiter.notify();
        } else {
            self.waiter.clear();
        }
        log_info!("snap: reset");
    }

    // ═══════════════════════════════════════════════════════════════════════
    // INTERRUPT CONTEXT
    // ═══════════════════════════════════════════════════════════════════════

    /// DMA task completion interrupt.
    pub fn on_chunk_complete(&self) {
        self.pending.arrivals.fetch_add(1, Ordering::SeqCst);
        self.drain_pending();
    }

    /// Capture buffer overrun reported by the hardware.
    pub fn on_overrun(&self) {
        self.pending.overrun.store(true, Ordering::SeqCst);
        self.drain_pending();
    }

    /// Core interrupt: read and acknowledge the core status.
    pub fn poll_core_status(&self) {
        self.pending.core_status.store(true, Ordering::SeqCst);
        self.drain_pending();
    }

    /// Apply posted interrupt events if the lock is free. Never spins.
    fn drain_pending(&self) {
        loop {
            // Pairs with the lock release of a concurrent holder: either it
            // sees our event or we see the lock free.
            fence(Ordering::SeqCst);
            if !self.pending.any() {
                return;
            }
            let Some(mut guard) = self.inner.try_lock() else {
                return;
            };
            let signal = self.apply_pending(&mut guard);
            drop(guard);

            if signal {
                self.waiter.notify();
            }
        }
    }

    /// Returns whether the consumer must be woken.
    fn apply_pending(&self, inner: &mut SnapInner<D, R>) -> bool {
        let channel = self.config.dma_channel;
        let mut signal = false;

        if self.pending.core_status.swap(false, Ordering::SeqCst) {
            let status = inner.regs.read_reg(regs::CORE_STATUS);
            inner.regs.write_reg(regs::CORE_INT_CLEAR, regs::INT_ALL);
            if status & regs::STATUS_OVERRUN != 0 {
                self.pending.overrun.store(true, Ordering::SeqCst);
            }
        }

        for _ in 0..self.pending.arrivals.swap(0, Ordering::SeqCst) {
            let action = tracker::on_chunk_arrival(&mut inner.state, &inner.plan, inner.dma.mode());
            if let Some(next) = action.rearm {
                self.rearm(inner, next);
            }
            if action.cutoff_crossed {
                cancel::is_read_canceled(&mut inner.state, &mut inner.dma, &mut inner.regs, channel);
            }
            signal |= action.signal;
        }

        if self.pending.overrun.swap(false, Ordering::SeqCst) {
            let action = tracker::on_overrun(&mut inner.state);
            if action.signal {
                log_warn!("snap: capture overrun");
            }
            signal |= action.signal;
        }

        signal
    }

    fn rearm(&self, inner: &mut SnapInner<D, R>, next: u32) {
        let Some(chunk) = inner.plan.chunk(next).copied() else {
            return;
        };
        match inner
            .dma
            .program(slice::from_ref(&chunk), self.config.dma_channel)
        {
            Ok(()) => inner.dma.start(self.config.dma_channel),
            Err(_) => log_warn!("snap: re-arm rejected, chunk", next),
        }
    }
}
