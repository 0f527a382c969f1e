//! Platform calibration and driver configuration.

use crate::byteorder::ByteOrder;

// ═══════════════════════════════════════════════════════════════════════════
// CONSTANTS
// ═══════════════════════════════════════════════════════════════════════════

/// Hard ceiling on DMA task descriptors per snap.
pub const MAX_TASKS: usize = 64;

/// Cancel cutoffs are rounded down to this many bytes (1 KiB).
pub const DEFAULT_CANCEL_GRANULARITY: u32 = 1024;

/// Bytes subtracted from a requested cutoff to absorb the bursts the IP has
/// already queued when the request lands.
pub const DEFAULT_CANCEL_PREROLL: u32 = 2048;

/// DMA channel wired to the snap capture port.
pub const DEFAULT_DMA_CHANNEL: u8 = 0;

// ═══════════════════════════════════════════════════════════════════════════
// CONFIGURATION
// ═══════════════════════════════════════════════════════════════════════════

/// Snap driver configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SnapConfig {
    /// DMA burst cap in bytes. 0 means one chunk per block.
    pub max_chunk_size: u32,
    /// Platform patch added to every requested transfer length.
    pub extra_bytes: u32,
    /// Rounding granularity for cancel cutoffs (bytes).
    pub cancel_granularity: u32,
    /// Pre-roll subtracted from cancel requests (bytes).
    pub cancel_preroll: u32,
    /// DMA channel used for the capture.
    pub dma_channel: u8,
    /// Byte order of the host CPU.
    pub native_order: ByteOrder,
}

impl SnapConfig {
    /// Create configuration with default values.
    pub const fn new() -> Self {
        Self {
            max_chunk_size: 0,
            extra_bytes: 0,
            cancel_granularity: DEFAULT_CANCEL_GRANULARITY,
            cancel_preroll: DEFAULT_CANCEL_PREROLL,
            dma_channel: DEFAULT_DMA_CHANNEL,
            native_order: ByteOrder::native(),
        }
    }

    pub const fn with_max_chunk_size(mut self, bytes: u32) -> Self {
        self.max_chunk_size = bytes;
        self
    }

    pub const fn with_extra_bytes(mut self, bytes: u32) -> Self {
        self.extra_bytes = bytes;
        self
    }

    /// Override the cancel calibration (granularity 0 is treated as 1).
    pub const fn with_cancel_calibration(mut self, granularity: u32, preroll: u32) -> Self {
        self.cancel_granularity = if granularity == 0 { 1 } else { granularity };
        self.cancel_preroll = preroll;
        self
    }

    pub const fn with_dma_channel(mut self, channel: u8) -> Self {
        self.dma_channel = channel;
        self
    }

    pub const fn with_native_order(mut self, order: ByteOrder) -> Self {
        self.native_order = order;
        self
    }
}

impl Default for SnapConfig {
    fn default() -> Self {
        Self::new()
    }
}
