//! Error types for the snap transfer core.

use core::fmt;

use crate::hal::DmaError;

// ═══════════════════════════════════════════════════════════════════════════
// PLAN ERRORS
// ═══════════════════════════════════════════════════════════════════════════

/// Chunk planning failures.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlanError {
    /// Plan needs more DMA tasks than the platform supports.
    TooManyChunks {
        /// Chunks the plan would need.
        required: usize,
        /// Platform ceiling.
        max: usize,
    },
    /// Zero-length transfer requested.
    ZeroLength,
    /// Capture buffer cannot hold a single block.
    BufferTooSmall {
        /// Block size in bytes.
        block_size: u32,
        /// Capture buffer size in bytes.
        buffer_size: u32,
    },
    /// Capture buffer does not fit the 32-bit DMA address space.
    AddressRange,
    /// Requested length plus platform extra bytes exceeds 32 bits.
    LengthOverflow,
}

impl PlanError {
    /// True for errors of the resource-exhausted kind.
    pub fn is_resource_exhausted(&self) -> bool {
        matches!(self, PlanError::TooManyChunks { .. })
    }
}

impl fmt::Display for PlanError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::TooManyChunks { required, max } => {
                write!(f, "plan needs {} DMA tasks (max {})", required, max)
            }
            Self::ZeroLength => write!(f, "zero-length transfer"),
            Self::BufferTooSmall {
                block_size,
                buffer_size,
            } => write!(
                f,
                "block of {} bytes does not fit a {} byte capture buffer",
                block_size, buffer_size
            ),
            Self::AddressRange => write!(f, "capture buffer exceeds 32-bit DMA range"),
            Self::LengthOverflow => write!(f, "transfer length overflows 32 bits"),
        }
    }
}

// ═══════════════════════════════════════════════════════════════════════════
// DRIVER ERRORS
// ═══════════════════════════════════════════════════════════════════════════

/// Errors surfaced by `SnapDevice` operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SnapError {
    /// Planning failed.
    Plan(PlanError),
    /// DMA collaborator rejected a request.
    Dma(DmaError),
    /// A transfer is running; plan/start refused.
    Busy,
    /// No transfer has been planned.
    NotPlanned,
    /// Wait exceeded its budget. State is unchanged.
    Timeout,
    /// Transfer was stopped at the caller's request.
    Canceled,
    /// Hardware reported a capture buffer overrun.
    Overrun,
    /// Waiter woke up with zero blocks received.
    OutOfBounds,
    /// The ring slot of the block already holds a later block.
    Overwritten {
        /// Requested block.
        index: u32,
    },
    /// Block index beyond the planned transfer.
    InvalidBlock {
        /// Requested block.
        index: u32,
        /// Blocks in the plan.
        required: u32,
    },
}

impl From<PlanError> for SnapError {
    fn from(e: PlanError) -> Self {
        SnapError::Plan(e)
    }
}

impl From<DmaError> for SnapError {
    fn from(e: DmaError) -> Self {
        SnapError::Dma(e)
    }
}

impl fmt::Display for SnapError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Plan(e) => write!(f, "plan error: {}", e),
            Self::Dma(e) => write!(f, "DMA error: {:?}", e),
            Self::Busy => write!(f, "transfer in progress"),
            Self::NotPlanned => write!(f, "no transfer planned"),
            Self::Timeout => write!(f, "wait timed out"),
            Self::Canceled => write!(f, "transfer canceled"),
            Self::Overrun => write!(f, "capture buffer overrun"),
            Self::OutOfBounds => write!(f, "woke with no blocks received"),
            Self::Overwritten { index } => {
                write!(f, "block {} overwritten by ring wrap", index)
            }
            Self::InvalidBlock { index, required } => {
                write!(f, "block {} outside transfer of {} blocks", index, required)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_plan_error_converts() {
        let e: SnapError = PlanError::ZeroLength.into();
        assert_eq!(e, SnapError::Plan(PlanError::ZeroLength));
    }

    #[test]
    fn test_resource_kind() {
        assert!(PlanError::TooManyChunks { required: 65, max: 64 }.is_resource_exhausted());
        assert!(!PlanError::AddressRange.is_resource_exhausted());
    }
}
