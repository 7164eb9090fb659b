//! Channel configuration bundles.

use super::types::{
    AddressingMode, DataSize, Direction, InterruptPosition, NullWrite, OperatingMode,
    RequestSource,
};
use crate::error::HalError;

/// Largest block the 10-bit transfer counter can describe.
pub const MAX_TRANSFER_COUNT: u16 = 1024;

/// Everything `configure` programs into one channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct ChannelConfig {
    /// Event that triggers each unit transfer.
    pub request_source: RequestSource,
    /// Unit width.
    pub data_size: DataSize,
    /// Transfer direction.
    pub direction: Direction,
    /// Half- or full-block interrupt.
    pub interrupt_position: InterruptPosition,
    /// Peripheral null-write mode.
    pub null_write: NullWrite,
    /// DMA RAM addressing mode.
    pub addressing_mode: AddressingMode,
    /// Operating mode.
    pub operating_mode: OperatingMode,
    /// Absolute address of buffer A, `None` if unused.
    pub buffer_a: Option<u32>,
    /// Absolute address of buffer B, `None` if unused.
    pub buffer_b: Option<u32>,
    /// Peripheral data register address.
    pub peripheral_address: u16,
    /// Units per block, `1..=MAX_TRANSFER_COUNT`.
    pub transfer_count: u16,
}

impl ChannelConfig {
    /// Bytes covered by one buffer: `transfer_count` units of `data_size`.
    pub fn buffer_bytes(&self) -> u32 {
        u32::from(self.transfer_count).saturating_mul(self.data_size.bytes())
    }

    /// Checks that do not depend on the DMA window.
    pub fn validate(&self) -> Result<(), HalError> {
        if self.transfer_count == 0 || self.transfer_count > MAX_TRANSFER_COUNT {
            return Err(HalError::InvalidTransferCount(self.transfer_count));
        }
        Ok(())
    }
}

impl Default for ChannelConfig {
    fn default() -> Self {
        Self {
            request_source: RequestSource::Int0,
            data_size: DataSize::default(),
            direction: Direction::default(),
            interrupt_position: InterruptPosition::default(),
            null_write: NullWrite::default(),
            addressing_mode: AddressingMode::default(),
            operating_mode: OperatingMode::default(),
            buffer_a: None,
            buffer_b: None,
            peripheral_address: 0,
            transfer_count: 1,
        }
    }
}

/// Integer-coded form of [`ChannelConfig`], as it arrives from C-style
/// callers or a configuration table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct RawChannelConfig {
    /// `IRQSEL` code.
    pub request_source: u8,
    /// 0 = word, 1 = byte.
    pub data_size: u8,
    /// 0 = peripheral→memory, 1 = memory→peripheral.
    pub direction: u8,
    /// 0 = full block, 1 = half block.
    pub interrupt_position: u8,
    /// 0 = off, 1 = on.
    pub null_write: u8,
    /// `AMODE` code, 0..=2.
    pub addressing_mode: u8,
    /// `MODE` code, 0..=3.
    pub operating_mode: u8,
    /// Absolute address of buffer A, `None` if unused.
    pub buffer_a: Option<u32>,
    /// Absolute address of buffer B, `None` if unused.
    pub buffer_b: Option<u32>,
    /// Peripheral data register address.
    pub peripheral_address: u16,
    /// Units per block.
    pub transfer_count: u16,
}

impl TryFrom<RawChannelConfig> for ChannelConfig {
    type Error = HalError;

    /// Decodes the enumerated fields in register order; the first invalid one
    /// decides the error.
    fn try_from(raw: RawChannelConfig) -> Result<Self, Self::Error> {
        Ok(Self {
            request_source: RequestSource::try_from(raw.request_source)?,
            data_size: DataSize::try_from(raw.data_size)?,
            direction: Direction::try_from(raw.direction)?,
            interrupt_position: InterruptPosition::try_from(raw.interrupt_position)?,
            null_write: NullWrite::try_from(raw.null_write)?,
            addressing_mode: AddressingMode::try_from(raw.addressing_mode)?,
            operating_mode: OperatingMode::try_from(raw.operating_mode)?,
            buffer_a: raw.buffer_a,
            buffer_b: raw.buffer_b,
            peripheral_address: raw.peripheral_address,
            transfer_count: raw.transfer_count,
        })
    }
}
