//! Capture buffer region.
//!
//! Physical buffer the IP writes snap data into. Blocks are addressed by
//! (offset, length) pairs relative to the region base; every access is
//! bounds-checked.

/// DMA-capable capture buffer.
///
/// Contains both CPU-accessible pointer and device-visible bus address.
/// The snap IP is a 32-bit bus master, so the bus address is 32 bits wide.
#[derive(Clone, Copy)]
pub struct CaptureRegion {
    cpu_ptr: *mut u8,
    bus_addr: u32,
    size: u32,
}

impl CaptureRegion {
    /// Create a new capture region.
    ///
    /// # Safety
    /// - `cpu_ptr` must point to `size` bytes of valid DMA-capable memory
    ///   that outlives every `SnapDevice` using this region
    /// - `bus_addr` must be the corresponding device-visible address
    pub const unsafe fn new(cpu_ptr: *mut u8, bus_addr: u32, size: u32) -> Self {
        Self {
            cpu_ptr,
            bus_addr,
            size,
        }
    }

    /// Bus base address (what the DMA engine sees).
    #[inline]
    pub const fn bus_base(&self) -> u32 {
        self.bus_addr
    }

    /// Total size in bytes.
    #[inline]
    pub const fn size(&self) -> u32 {
        self.size
    }

    /// Bus address at offset.
    #[inline]
    pub const fn bus_at(&self, offset: u32) -> u32 {
        self.bus_addr.wrapping_add(offset)
    }

    /// Offset of a bus address within the region, if it lies inside.
    pub fn offset_of(&self, bus: u32) -> Option<u32> {
        let offset = bus.checked_sub(self.bus_addr)?;
        (offset < self.size).then_some(offset)
    }

    #[inline]
    fn in_bounds(&self, offset: u32, len: u32) -> bool {
        offset.checked_add(len).map_or(false, |end| end <= self.size)
    }

    /// Bytes `[offset, offset + len)` of the region.
    ///
    /// # Safety
    /// The device must not be writing this range for the lifetime of the
    /// returned slice.
    pub unsafe fn slice(&self, offset: u32, len: u32) -> Option<&[u8]> {
        if !self.in_bounds(offset, len) || self.cpu_ptr.is_null() {
            return None;
        }
        Some(core::slice::from_raw_parts(
            self.cpu_ptr.add(offset as usize),
            len as usize,
        ))
    }

    /// Mutable bytes `[offset, offset + len)` of the region.
    ///
    /// # Safety
    /// The device must not be writing this range, and no other reference to
    /// it may exist, for the lifetime of the returned slice.
    #[allow(clippy::mut_from_ref)]
    pub unsafe fn slice_mut(&self, offset: u32, len: u32) -> Option<&mut [u8]> {
        if !self.in_bounds(offset, len) || self.cpu_ptr.is_null() {
            return None;
        }
        Some(core::slice::from_raw_parts_mut(
            self.cpu_ptr.add(offset as usize),
            len as usize,
        ))
    }

    /// Check if region is usable (non-null, non-empty, inside 32-bit space).
    pub fn is_valid(&self) -> bool {
        !self.cpu_ptr.is_null()
            && self.size > 0
            && self.bus_addr.checked_add(self.size).is_some()
    }
}

unsafe impl Send for CaptureRegion {}
unsafe impl Sync for CaptureRegion {}

impl core::fmt::Debug for CaptureRegion {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("CaptureRegion")
            .field("cpu_ptr", &self.cpu_ptr)
            .field("bus_addr", &format_args!("{:#x}", self.bus_addr))
            .field("size", &format_args!("{:#x}", self.size))
            .finish()
    }
}
