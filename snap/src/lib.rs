//! Snap-transfer DMA core for the CellGuide CGX5900 GNSS baseband IP.
//!
//! A snap is one raw-sample capture moved from the IP into host memory. This
//! crate plans the capture as a bounded list of DMA tasks, tracks task
//! completion from interrupt context, lets a consumer thread wait for
//! individual blocks, cancels cleanly at a byte cutoff, and fixes up the
//! byte order of each block before it is handed out.
//!
//! # Architecture
//!
//! ```text
//!   host control layer ──Command──> dispatch ──> SnapDevice ──> DmaEngine
//!                                                   │   ▲        CoreRegisters
//!                           consumer ◄─WaitHandle───┘   └── on_chunk_complete (IRQ)
//! ```
//!
//! The crate is `no_std` without the default `std` feature; the `std`
//! feature only adds the condvar-backed wait handle.

#![cfg_attr(not(any(test, feature = "std")), no_std)]

pub mod byteorder;
pub mod cancel;
pub mod config;
pub mod device;
pub mod dispatch;
pub mod dma;
pub mod error;
pub mod hal;
pub mod plan;
pub mod state;
pub mod tracker;
pub mod wait;

#[cfg(test)]
mod mock;

// Re-exports
pub use byteorder::{ByteOrder, SwapClass};
pub use cancel::CancelStatus;
pub use config::{SnapConfig, MAX_TASKS};
pub use device::{BlockSlice, PlanSummary, SnapDevice};
pub use dispatch::{execute, Command, Outcome};
pub use dma::CaptureRegion;
pub use error::{PlanError, SnapError};
pub use hal::{CoreRegisters, DmaEngine, DmaError, DmaMode};
pub use plan::{Chunk, PlanRequest, TransferPlan};
pub use state::{CancelPoint, SnapPhase, TransferState, TransferStatus};
pub use wait::{SpinWaitHandle, WaitHandle};

pub use cgsnap_core::{Clock, TimeoutConfig};

#[cfg(feature = "std")]
pub use wait::CondvarWaitHandle;
