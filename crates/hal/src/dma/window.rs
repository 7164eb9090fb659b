//! The DMA-addressable memory window.
//!
//! The controller cannot see the whole data space: buffers must sit in a
//! dedicated dual-ported RAM block, and the channel registers hold offsets
//! from the block's base instead of absolute addresses.
//!
//! | Device family | Window base | Size    |
//! |---------------|-------------|---------|
//! | 256 KB parts  | 0x4000      | 8192 B  |

use crate::error::HalError;

/// Default window base address.
pub const DMA_WINDOW_BASE: u32 = 0x4000;

/// Window size in bytes.
pub const DMA_WINDOW_SIZE: u32 = 0x2000;

/// A bounded, base-relative address range visible to the DMA controller.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct DmaWindow {
    base: u32,
    size: u32,
}

impl DmaWindow {
    /// A window of `size` bytes starting at `base`.
    pub const fn new(base: u32, size: u32) -> Self {
        Self { base, size }
    }

    /// First address inside the window.
    pub const fn base(&self) -> u32 {
        self.base
    }

    /// Window length in bytes.
    pub const fn size(&self) -> u32 {
        self.size
    }

    /// Offset of a `size`-byte buffer at `address`.
    ///
    /// `None` means "this buffer slot is unused" and translates to offset 0
    /// whatever `size` is. Otherwise the buffer must start inside the window
    /// and lie entirely within it, or [`HalError::InvalidAddress`] is
    /// returned. A zero-length buffer still needs a start address inside.
    pub fn translate(&self, address: Option<u32>, size: u32) -> Result<u16, HalError> {
        let Some(address) = address else {
            return Ok(0);
        };
        let invalid = HalError::InvalidAddress { address, size };

        let offset = address.checked_sub(self.base).ok_or(invalid)?;
        let end = offset.checked_add(size).ok_or(invalid)?;
        if offset >= self.size || end > self.size {
            return Err(invalid);
        }
        u16::try_from(offset).map_err(|_| invalid)
    }

    /// [`translate`](Self::translate) for a buffer given as a pointer.
    pub fn translate_ptr<T>(&self, buffer: *const T, size: u32) -> Result<u16, HalError> {
        if buffer.is_null() {
            return self.translate(None, size);
        }
        // Addresses on the target fit in 32 bits; anything wider is out of
        // the window by construction.
        let address = u32::try_from(buffer as usize).map_err(|_| HalError::InvalidAddress {
            address: u32::MAX,
            size,
        })?;
        self.translate(Some(address), size)
    }

    /// `true` if the `size`-byte buffer at `address` fits in the window.
    pub fn contains(&self, address: u32, size: u32) -> bool {
        self.translate(Some(address), size).is_ok()
    }
}

impl Default for DmaWindow {
    fn default() -> Self {
        Self::new(DMA_WINDOW_BASE, DMA_WINDOW_SIZE)
    }
}
