//! Channel identifiers and the enumerated configuration fields.
//!
//! Each field enum maps 1:1 onto its register encoding. The `TryFrom<u8>`
//! impls are the validation step for integer-coded configuration and report
//! the field-specific [`HalError`] on failure.

use core::fmt;

use crate::error::HalError;

/// Number of DMA channels.
pub const CHANNEL_COUNT: usize = 8;

/// A validated DMA channel number, `0..8`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct ChannelId(u8);

impl ChannelId {
    /// Every channel, in order.
    pub const ALL: [ChannelId; CHANNEL_COUNT] = [
        ChannelId(0),
        ChannelId(1),
        ChannelId(2),
        ChannelId(3),
        ChannelId(4),
        ChannelId(5),
        ChannelId(6),
        ChannelId(7),
    ];

    /// `None` for numbers outside `0..8`.
    pub const fn new(number: u8) -> Option<Self> {
        if (number as usize) < CHANNEL_COUNT {
            Some(Self(number))
        } else {
            None
        }
    }

    /// The channel number.
    pub const fn number(self) -> u8 {
        self.0
    }

    /// Index into per-channel tables; always `< CHANNEL_COUNT`.
    pub const fn index(self) -> usize {
        self.0 as usize
    }
}

impl TryFrom<u8> for ChannelId {
    type Error = HalError;

    fn try_from(number: u8) -> Result<Self, Self::Error> {
        Self::new(number).ok_or(HalError::InvalidChannel(number))
    }
}

impl fmt::Display for ChannelId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "DMA{}", self.0)
    }
}

/// Hardware events that can trigger a DMA request (`IRQSEL` codes).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[repr(u8)]
pub enum RequestSource {
    /// External interrupt 0.
    Int0 = 0x00,
    /// Input capture 1.
    InputCapture1 = 0x01,
    /// Output compare 1.
    OutputCompare1 = 0x02,
    /// Input capture 2.
    InputCapture2 = 0x05,
    /// Output compare 2.
    OutputCompare2 = 0x06,
    /// Timer 2.
    Timer2 = 0x07,
    /// Timer 3.
    Timer3 = 0x08,
    /// SPI 1 transfer done.
    Spi1 = 0x0A,
    /// UART 1 receiver.
    Uart1Rx = 0x0B,
    /// UART 1 transmitter.
    Uart1Tx = 0x0C,
    /// ADC 1 conversion done.
    Adc1 = 0x0D,
    /// ADC 2 conversion done.
    Adc2 = 0x15,
    /// UART 2 receiver.
    Uart2Rx = 0x1E,
    /// UART 2 transmitter.
    Uart2Tx = 0x1F,
    /// SPI 2 transfer done.
    Spi2 = 0x21,
    /// ECAN 1 receive data ready.
    Ecan1Rx = 0x22,
    /// ECAN 2 receive data ready.
    Ecan2Rx = 0x37,
    /// Data converter interface.
    Dci = 0x3C,
    /// ECAN 1 transmit data request.
    Ecan1Tx = 0x46,
    /// ECAN 2 transmit data request.
    Ecan2Tx = 0x47,
    /// DAC 1 right channel.
    Dac1Right = 0x4E,
    /// DAC 1 left channel.
    Dac1Left = 0x4F,
}

impl RequestSource {
    /// Every legal source.
    pub const ALL: [RequestSource; 22] = [
        Self::Int0,
        Self::InputCapture1,
        Self::OutputCompare1,
        Self::InputCapture2,
        Self::OutputCompare2,
        Self::Timer2,
        Self::Timer3,
        Self::Spi1,
        Self::Uart1Rx,
        Self::Uart1Tx,
        Self::Adc1,
        Self::Adc2,
        Self::Uart2Rx,
        Self::Uart2Tx,
        Self::Spi2,
        Self::Ecan1Rx,
        Self::Ecan2Rx,
        Self::Dci,
        Self::Ecan1Tx,
        Self::Ecan2Tx,
        Self::Dac1Right,
        Self::Dac1Left,
    ];

    /// The `IRQSEL` code.
    pub const fn code(self) -> u8 {
        self as u8
    }
}

impl TryFrom<u8> for RequestSource {
    type Error = HalError;

    fn try_from(code: u8) -> Result<Self, Self::Error> {
        Self::ALL
            .into_iter()
            .find(|source| source.code() == code)
            .ok_or(HalError::InvalidRequestSource(code))
    }
}

/// Width of one transfer unit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum DataSize {
    /// 16-bit word (`SIZE = 0`).
    #[default]
    Word,
    /// 8-bit byte (`SIZE = 1`).
    Byte,
}

impl DataSize {
    /// Bytes per transfer unit.
    pub const fn bytes(self) -> u32 {
        match self {
            Self::Word => 2,
            Self::Byte => 1,
        }
    }

    pub(crate) const fn bit(self) -> bool {
        matches!(self, Self::Byte)
    }
}

impl TryFrom<u8> for DataSize {
    type Error = HalError;

    fn try_from(code: u8) -> Result<Self, Self::Error> {
        match code {
            0 => Ok(Self::Word),
            1 => Ok(Self::Byte),
            other => Err(HalError::InvalidDataSize(other)),
        }
    }
}

/// Transfer direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Direction {
    /// Read the peripheral, write DMA RAM (`DIR = 0`).
    #[default]
    PeripheralToMemory,
    /// Read DMA RAM, write the peripheral (`DIR = 1`).
    MemoryToPeripheral,
}

impl Direction {
    pub(crate) const fn bit(self) -> bool {
        matches!(self, Self::MemoryToPeripheral)
    }
}

impl TryFrom<u8> for Direction {
    type Error = HalError;

    fn try_from(code: u8) -> Result<Self, Self::Error> {
        match code {
            0 => Ok(Self::PeripheralToMemory),
            1 => Ok(Self::MemoryToPeripheral),
            other => Err(HalError::InvalidTransferDirection(other)),
        }
    }
}

/// When the block interrupt fires.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum InterruptPosition {
    /// After the whole block has moved (`HALF = 0`).
    #[default]
    Full,
    /// After half of the block has moved (`HALF = 1`).
    Half,
}

impl InterruptPosition {
    pub(crate) const fn bit(self) -> bool {
        matches!(self, Self::Half)
    }
}

impl TryFrom<u8> for InterruptPosition {
    type Error = HalError;

    fn try_from(code: u8) -> Result<Self, Self::Error> {
        match code {
            0 => Ok(Self::Full),
            1 => Ok(Self::Half),
            other => Err(HalError::InvalidInterruptPosition(other)),
        }
    }
}

/// Whether a dummy null write goes to the peripheral for each unit stored
/// to DMA RAM (used to clock SPI receptions).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum NullWrite {
    /// Normal operation (`NULLW = 0`).
    #[default]
    Off,
    /// Write a null to the peripheral alongside every RAM write (`NULLW = 1`).
    On,
}

impl NullWrite {
    pub(crate) const fn bit(self) -> bool {
        matches!(self, Self::On)
    }
}

impl TryFrom<u8> for NullWrite {
    type Error = HalError;

    fn try_from(code: u8) -> Result<Self, Self::Error> {
        match code {
            0 => Ok(Self::Off),
            1 => Ok(Self::On),
            other => Err(HalError::InvalidNullWriteMode(other)),
        }
    }
}

/// DMA RAM addressing mode (`AMODE`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum AddressingMode {
    /// Register indirect, post-increment.
    #[default]
    PostIncrement,
    /// Register indirect, no increment.
    NoIncrement,
    /// Peripheral indirect: the peripheral supplies the address.
    PeripheralIndirect,
}

impl AddressingMode {
    pub(crate) const fn bits(self) -> u16 {
        match self {
            Self::PostIncrement => 0,
            Self::NoIncrement => 1,
            Self::PeripheralIndirect => 2,
        }
    }
}

impl TryFrom<u8> for AddressingMode {
    type Error = HalError;

    fn try_from(code: u8) -> Result<Self, Self::Error> {
        match code {
            0 => Ok(Self::PostIncrement),
            1 => Ok(Self::NoIncrement),
            2 => Ok(Self::PeripheralIndirect),
            other => Err(HalError::InvalidAddressingMode(other)),
        }
    }
}

/// Channel operating mode (`MODE`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum OperatingMode {
    /// Restart on buffer A after every block.
    #[default]
    Continuous,
    /// Stop after one block.
    OneShot,
    /// Alternate A/B forever.
    ContinuousPingPong,
    /// One block from A, one from B, then stop.
    OneShotPingPong,
}

impl OperatingMode {
    pub(crate) const fn bits(self) -> u16 {
        match self {
            Self::Continuous => 0,
            Self::OneShot => 1,
            Self::ContinuousPingPong => 2,
            Self::OneShotPingPong => 3,
        }
    }

    /// One-shot modes must not run across CPU idle entry.
    pub const fn is_one_shot(self) -> bool {
        matches!(self, Self::OneShot | Self::OneShotPingPong)
    }

    /// Modes that alternate between buffers A and B.
    pub const fn is_ping_pong(self) -> bool {
        matches!(self, Self::ContinuousPingPong | Self::OneShotPingPong)
    }

    /// Name for log output.
    pub const fn name(self) -> &'static str {
        match self {
            Self::Continuous => "continuous",
            Self::OneShot => "one-shot",
            Self::ContinuousPingPong => "continuous ping-pong",
            Self::OneShotPingPong => "one-shot ping-pong",
        }
    }
}

impl TryFrom<u8> for OperatingMode {
    type Error = HalError;

    fn try_from(code: u8) -> Result<Self, Self::Error> {
        match code {
            0 => Ok(Self::Continuous),
            1 => Ok(Self::OneShot),
            2 => Ok(Self::ContinuousPingPong),
            3 => Ok(Self::OneShotPingPong),
            other => Err(HalError::InvalidOperatingMode(other)),
        }
    }
}

/// Interrupt priority level, `1..=7`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[repr(transparent)]
pub struct InterruptPriority(u8);

impl InterruptPriority {
    /// Lowest priority that still preempts mainline code.
    pub const MIN: u8 = 1;
    /// Highest priority.
    pub const MAX: u8 = 7;
    /// Hardware reset value.
    pub const RESET: InterruptPriority = InterruptPriority(4);

    /// Returns [`HalError::InvalidPriority`] outside `1..=7`.
    pub const fn new(level: u8) -> Result<Self, HalError> {
        if level >= Self::MIN && level <= Self::MAX {
            Ok(Self(level))
        } else {
            Err(HalError::InvalidPriority(level))
        }
    }

    /// The level.
    pub const fn get(self) -> u8 {
        self.0
    }
}

impl Default for InterruptPriority {
    fn default() -> Self {
        Self::RESET
    }
}

/// Which buffer the next completion belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum PingPongHalf {
    /// Buffer A completes next (initial state).
    #[default]
    A,
    /// Buffer B completes next.
    B,
}

impl PingPongHalf {
    /// The other half.
    #[must_use]
    pub const fn flipped(self) -> Self {
        match self {
            Self::A => Self::B,
            Self::B => Self::A,
        }
    }

    /// `true` for the initial half.
    pub const fn is_first(self) -> bool {
        matches!(self, Self::A)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn channel_id_bounds() {
        assert_eq!(ChannelId::new(7).map(ChannelId::number), Some(7));
        assert_eq!(ChannelId::new(8), None);
        assert_eq!(ChannelId::try_from(200), Err(HalError::InvalidChannel(200)));
    }

    #[test]
    fn request_source_codes_round_trip() {
        for source in RequestSource::ALL {
            assert_eq!(RequestSource::try_from(source.code()), Ok(source));
        }
    }

    #[test]
    fn request_source_gaps_are_rejected() {
        // 0x03/0x04 and 0x09 sit between legal codes
        for code in [0x03, 0x04, 0x09, 0x50, 0x7F, 0xFF] {
            assert_eq!(
                RequestSource::try_from(code),
                Err(HalError::InvalidRequestSource(code))
            );
        }
    }

    #[test]
    fn field_decoders_report_their_own_kind() {
        assert_eq!(DataSize::try_from(2), Err(HalError::InvalidDataSize(2)));
        assert_eq!(Direction::try_from(2), Err(HalError::InvalidTransferDirection(2)));
        assert_eq!(
            InterruptPosition::try_from(5),
            Err(HalError::InvalidInterruptPosition(5))
        );
        assert_eq!(NullWrite::try_from(2), Err(HalError::InvalidNullWriteMode(2)));
        assert_eq!(AddressingMode::try_from(3), Err(HalError::InvalidAddressingMode(3)));
        assert_eq!(OperatingMode::try_from(4), Err(HalError::InvalidOperatingMode(4)));
    }

    #[test]
    fn one_shot_classification() {
        assert!(!OperatingMode::Continuous.is_one_shot());
        assert!(OperatingMode::OneShot.is_one_shot());
        assert!(!OperatingMode::ContinuousPingPong.is_one_shot());
        assert!(OperatingMode::OneShotPingPong.is_one_shot());
    }

    #[test]
    fn priority_range() {
        assert_eq!(InterruptPriority::new(0), Err(HalError::InvalidPriority(0)));
        assert_eq!(InterruptPriority::new(8), Err(HalError::InvalidPriority(8)));
        assert_eq!(InterruptPriority::new(1).map(InterruptPriority::get), Ok(1));
        assert_eq!(InterruptPriority::new(7).map(InterruptPriority::get), Ok(7));
        assert_eq!(InterruptPriority::default().get(), 4);
    }

    #[test]
    fn ping_pong_half_alternates() {
        let half = PingPongHalf::default();
        assert!(half.is_first());
        assert!(!half.flipped().is_first());
        assert_eq!(half.flipped().flipped(), PingPongHalf::A);
    }
}
