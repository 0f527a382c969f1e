//! CGX core register offsets used by the snap path.
//!
//! Only the registers touched by the cancel/reset sequence are listed.

// Core control
pub const CORE_CONTROL: u32 = 0x0000;
pub const CONTROL_SNAP_ENABLE: u32 = 1 << 0;
pub const CONTROL_SOFT_RESET: u32 = 1 << 31;

// Core status
pub const CORE_STATUS: u32 = 0x0004;
pub const STATUS_OVERRUN: u32 = 1 << 4;

// Interrupts
pub const CORE_INT_MASK: u32 = 0x0010;
pub const CORE_INT_CLEAR: u32 = 0x0014;
pub const INT_SNAP_DONE: u32 = 1 << 0;
pub const INT_OVERRUN: u32 = 1 << 1;
pub const INT_ALL: u32 = INT_SNAP_DONE | INT_OVERRUN;
