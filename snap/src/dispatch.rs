//! Execute entry point.
//!
//! The host control layer (ioctl handler, RPC stub, test harness) builds a
//! [`Command`] and gets the matching [`Outcome`] back.

use crate::byteorder::ByteOrder;
use crate::cancel::CancelStatus;
use crate::device::{BlockSlice, PlanSummary, SnapDevice};
use crate::error::SnapError;
use crate::hal::{CoreRegisters, DmaEngine};
use crate::state::TransferStatus;
use crate::wait::WaitHandle;

/// Control request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    /// Plan a new snap.
    Plan {
        total_length: u32,
        block_length: u32,
        byte_order: ByteOrder,
    },
    /// Program the engine and start capturing.
    Start,
    /// Wait for a block (0-based).
    WaitBlock { block: u32, timeout_ms: u32 },
    /// Cancel at `on_byte_count` bytes into the snap (0 = now).
    RequestCancel { on_byte_count: u32 },
    /// Counter snapshot.
    Status,
    /// Stop and return to idle.
    Reset,
}

/// Result of a successful command.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    Planned(PlanSummary),
    Started,
    Block(BlockSlice),
    Cancel(CancelStatus),
    Status(TransferStatus),
    Reset,
}

/// Dispatch one command to `device`.
pub fn execute<D, R, W>(device: &SnapDevice<D, R, W>, command: Command) -> Result<Outcome, SnapError>
where
    D: DmaEngine,
    R: CoreRegisters,
    W: WaitHandle,
{
    match command {
        Command::Plan {
            total_length,
            block_length,
            byte_order,
        } => device
            .plan(total_length, block_length, byte_order)
            .map(Outcome::Planned),
        Command::Start => device.start().map(|()| Outcome::Started),
        Command::WaitBlock { block, timeout_ms } => {
            device.wait_block(block, timeout_ms).map(Outcome::Block)
        }
        Command::RequestCancel { on_byte_count } => {
            device.request_cancel(on_byte_count).map(Outcome::Cancel)
        }
        Command::Status => Ok(Outcome::Status(device.status())),
        Command::Reset => {
            device.reset();
            Ok(Outcome::Reset)
        }
    }
}

impl<D: DmaEngine, R: CoreRegisters, W: WaitHandle> SnapDevice<D, R, W> {
    /// Method form of [`execute`].
    #[inline]
    pub fn execute(&self, command: Command) -> Result<Outcome, SnapError> {
        execute(self, command)
    }
}
