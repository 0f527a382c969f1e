//! DMA memory module.
//!
//! Provides the bounds-checked capture buffer the snap IP writes into.

pub mod region;

// Re-exports
pub use region::CaptureRegion;
