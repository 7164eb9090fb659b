//! Validation errors and the process-wide error sink.
//!
//! Every failing HAL operation follows the same shape: the error is handed to
//! the registered [`ErrorSink`] together with the caller's source location,
//! then the operation returns `Err` without having touched hardware or
//! channel state. The sink only observes; it never alters control flow.

use core::panic::Location;

/// A validation failure, carrying the offending value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror_no_std::Error)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum HalError {
    /// Channel number outside `0..8`.
    #[error("invalid DMA channel {0}")]
    InvalidChannel(u8),
    /// Request source code that names no hardware event.
    #[error("invalid DMA request source {0:#04x}")]
    InvalidRequestSource(u8),
    /// Data size code outside word/byte.
    #[error("invalid DMA data size {0}")]
    InvalidDataSize(u8),
    /// Transfer direction code outside the two legal directions.
    #[error("invalid DMA transfer direction {0}")]
    InvalidTransferDirection(u8),
    /// Interrupt position code outside half/full.
    #[error("invalid DMA interrupt position {0}")]
    InvalidInterruptPosition(u8),
    /// Null-write mode code outside on/off.
    #[error("invalid DMA null write mode {0}")]
    InvalidNullWriteMode(u8),
    /// Addressing mode code outside the three legal modes.
    #[error("invalid DMA addressing mode {0}")]
    InvalidAddressingMode(u8),
    /// Operating mode code outside the four legal modes.
    #[error("invalid DMA operating mode {0}")]
    InvalidOperatingMode(u8),
    /// Buffer lies (partly) outside the DMA-addressable window.
    #[error("buffer at {address:#06x} ({size} bytes) is outside the DMA window")]
    InvalidAddress {
        /// Absolute buffer address.
        address: u32,
        /// Buffer length in bytes.
        size: u32,
    },
    /// Interrupt priority outside `1..=7`.
    #[error("invalid interrupt priority {0}")]
    InvalidPriority(u8),
    /// Transfer count of zero, or larger than the hardware counter holds.
    #[error("invalid DMA transfer count {0}")]
    InvalidTransferCount(u16),
}

/// Fieldless view of [`HalError`], for sinks that only care about the class.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ErrorKind {
    /// See [`HalError::InvalidChannel`].
    InvalidChannel,
    /// See [`HalError::InvalidRequestSource`].
    InvalidRequestSource,
    /// See [`HalError::InvalidDataSize`].
    InvalidDataSize,
    /// See [`HalError::InvalidTransferDirection`].
    InvalidTransferDirection,
    /// See [`HalError::InvalidInterruptPosition`].
    InvalidInterruptPosition,
    /// See [`HalError::InvalidNullWriteMode`].
    InvalidNullWriteMode,
    /// See [`HalError::InvalidAddressingMode`].
    InvalidAddressingMode,
    /// See [`HalError::InvalidOperatingMode`].
    InvalidOperatingMode,
    /// See [`HalError::InvalidAddress`].
    InvalidAddress,
    /// See [`HalError::InvalidPriority`].
    InvalidPriority,
    /// See [`HalError::InvalidTransferCount`].
    InvalidTransferCount,
}

impl HalError {
    /// The error class, without the offending value.
    pub const fn kind(&self) -> ErrorKind {
        match self {
            Self::InvalidChannel(_) => ErrorKind::InvalidChannel,
            Self::InvalidRequestSource(_) => ErrorKind::InvalidRequestSource,
            Self::InvalidDataSize(_) => ErrorKind::InvalidDataSize,
            Self::InvalidTransferDirection(_) => ErrorKind::InvalidTransferDirection,
            Self::InvalidInterruptPosition(_) => ErrorKind::InvalidInterruptPosition,
            Self::InvalidNullWriteMode(_) => ErrorKind::InvalidNullWriteMode,
            Self::InvalidAddressingMode(_) => ErrorKind::InvalidAddressingMode,
            Self::InvalidOperatingMode(_) => ErrorKind::InvalidOperatingMode,
            Self::InvalidAddress { .. } => ErrorKind::InvalidAddress,
            Self::InvalidPriority(_) => ErrorKind::InvalidPriority,
            Self::InvalidTransferCount(_) => ErrorKind::InvalidTransferCount,
        }
    }

    /// Short, allocation-free name for log output.
    pub const fn name(&self) -> &'static str {
        match self.kind() {
            ErrorKind::InvalidChannel => "invalid channel",
            ErrorKind::InvalidRequestSource => "invalid request source",
            ErrorKind::InvalidDataSize => "invalid data size",
            ErrorKind::InvalidTransferDirection => "invalid transfer direction",
            ErrorKind::InvalidInterruptPosition => "invalid interrupt position",
            ErrorKind::InvalidNullWriteMode => "invalid null write mode",
            ErrorKind::InvalidAddressingMode => "invalid addressing mode",
            ErrorKind::InvalidOperatingMode => "invalid operating mode",
            ErrorKind::InvalidAddress => "invalid address",
            ErrorKind::InvalidPriority => "invalid priority",
            ErrorKind::InvalidTransferCount => "invalid transfer count",
        }
    }
}

/// Receiver of every validation failure.
///
/// Registered once, when the owning manager is created. Runs synchronously in
/// the failing call's context, which may be an interrupt handler, so it must
/// not block.
pub trait ErrorSink {
    /// Observe one failure. `location` is the HAL caller's source position.
    fn report(&self, location: &'static Location<'static>, error: HalError);
}

/// Sink that discards everything. The default when no handler is registered.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopSink;

impl ErrorSink for NoopSink {
    fn report(&self, _location: &'static Location<'static>, _error: HalError) {}
}

/// Adapter for a plain function pointer handler.
#[derive(Clone, Copy)]
pub struct FnSink(pub fn(&'static Location<'static>, HalError));

impl ErrorSink for FnSink {
    fn report(&self, location: &'static Location<'static>, error: HalError) {
        (self.0)(location, error);
    }
}

impl<S: ErrorSink + ?Sized> ErrorSink for &S {
    fn report(&self, location: &'static Location<'static>, error: HalError) {
        (**self).report(location, error);
    }
}

/// Hand `error` to `sink` with the location of the outermost `#[track_caller]`
/// frame, log it, and give it back for the `Err` return.
#[track_caller]
pub(crate) fn report<S: ErrorSink + ?Sized>(sink: &S, error: HalError) -> HalError {
    let location = Location::caller();
    warn!(
        "{} at {}:{}",
        error.name(),
        location.file(),
        location.line()
    );
    sink.report(location, error);
    error
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kind_strips_payload() {
        assert_eq!(HalError::InvalidChannel(9).kind(), ErrorKind::InvalidChannel);
        assert_eq!(
            HalError::InvalidAddress { address: 0x10, size: 4 }.kind(),
            ErrorKind::InvalidAddress
        );
    }

    #[test]
    fn report_passes_error_through_unchanged() {
        let err = HalError::InvalidPriority(0);
        assert_eq!(report(&NoopSink, err), err);
    }

    #[test]
    fn fn_sink_sees_caller_location() {
        fn handler(location: &'static Location<'static>, error: HalError) {
            assert!(location.file().ends_with("error.rs"));
            assert_eq!(error, HalError::InvalidDataSize(3));
        }
        let _ = report(&FnSink(handler), HalError::InvalidDataSize(3));
    }
}
