//! Register-level view of the DMA controller.
//!
//! Each channel owns an identical six-register block and one interrupt
//! vector. Instead of one code path per channel, [`CHANNEL_BLOCKS`] maps the
//! channel number to its block base and vector number, and every register or
//! interrupt-line address is derived from that descriptor.
//!
//! ```text
//! block base + 0x0  CON   CHEN SIZE DIR HALF NULLW ... AMODE[5:4] MODE[1:0]
//! block base + 0x2  REQ   FORCE ... IRQSEL[6:0]
//! block base + 0x4  STA   buffer A offset
//! block base + 0x6  STB   buffer B offset
//! block base + 0x8  PAD   peripheral address
//! block base + 0xA  CNT   transfer count - 1
//! ```

use super::config::ChannelConfig;
use super::types::{ChannelId, InterruptPriority, RequestSource, CHANNEL_COUNT};

/// One register of a channel block.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Register {
    /// Control.
    Con,
    /// Request source / software force.
    Req,
    /// Buffer A offset.
    Sta,
    /// Buffer B offset.
    Stb,
    /// Peripheral address.
    Pad,
    /// Transfer count minus one.
    Cnt,
}

impl Register {
    /// Byte offset inside the channel block.
    pub const fn offset(self) -> usize {
        match self {
            Self::Con => 0x0,
            Self::Req => 0x2,
            Self::Sta => 0x4,
            Self::Stb => 0x6,
            Self::Pad => 0x8,
            Self::Cnt => 0xA,
        }
    }
}

/// `CON` bit positions.
pub mod con {
    /// Channel enable.
    pub const CHEN: u16 = 1 << 15;
    /// Byte-sized units.
    pub const SIZE: u16 = 1 << 14;
    /// Memory to peripheral.
    pub const DIR: u16 = 1 << 13;
    /// Half-block interrupt.
    pub const HALF: u16 = 1 << 12;
    /// Null write to peripheral.
    pub const NULLW: u16 = 1 << 11;
    /// Addressing mode field shift.
    pub const AMODE_SHIFT: u16 = 4;
    /// Operating mode field mask.
    pub const MODE_MASK: u16 = 0b11;
}

/// `REQ` bit positions.
pub mod req {
    /// Software-forced request.
    pub const FORCE: u16 = 1 << 15;
    /// Request source field mask.
    pub const IRQSEL_MASK: u16 = 0x7F;
}

/// `CON` value for `config`, with `CHEN` set iff `enabled`.
#[allow(clippy::arithmetic_side_effects)] // AMODE is at most 2, shifted into bits 5:4
pub fn control_word(config: &ChannelConfig, enabled: bool) -> u16 {
    let mut word = (config.addressing_mode.bits() << con::AMODE_SHIFT)
        | (config.operating_mode.bits() & con::MODE_MASK);
    if enabled {
        word |= con::CHEN;
    }
    if config.data_size.bit() {
        word |= con::SIZE;
    }
    if config.direction.bit() {
        word |= con::DIR;
    }
    if config.interrupt_position.bit() {
        word |= con::HALF;
    }
    if config.null_write.bit() {
        word |= con::NULLW;
    }
    word
}

/// `REQ` value selecting `source`, optionally with the force bit.
pub fn request_word(source: RequestSource, force: bool) -> u16 {
    let word = u16::from(source.code()) & req::IRQSEL_MASK;
    if force {
        word | req::FORCE
    } else {
        word
    }
}

/// Base of channel 0's register block.
pub const DMA_REGISTER_BASE: usize = 0x0380;

/// Distance between consecutive channel blocks.
pub const DMA_BLOCK_STRIDE: usize = 0x0C;

/// First interrupt flag status register (`IFS0`).
pub const IFS_BASE: usize = 0x0084;
/// First interrupt enable control register (`IEC0`).
pub const IEC_BASE: usize = 0x0094;
/// First interrupt priority control register (`IPC0`).
pub const IPC_BASE: usize = 0x00A4;

/// Static description of one channel's hardware.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct ChannelBlock {
    /// Address of the channel's `CON` register.
    pub base: usize,
    /// Interrupt vector number.
    pub irq: u8,
}

#[allow(clippy::arithmetic_side_effects)] // const-evaluated over small, fixed vector numbers
impl ChannelBlock {
    const fn for_channel(index: usize, irq: u8) -> Self {
        Self {
            base: DMA_REGISTER_BASE + index * DMA_BLOCK_STRIDE,
            irq,
        }
    }

    /// Address of `register` inside this block.
    pub const fn register(&self, register: Register) -> usize {
        self.base + register.offset()
    }

    /// `IFSx` address and bit for the pending flag.
    pub const fn flag_bit(&self) -> (usize, u16) {
        let irq = self.irq as usize;
        (IFS_BASE + (irq / 16) * 2, 1 << (irq % 16))
    }

    /// `IECx` address and bit for the interrupt enable.
    pub const fn enable_bit(&self) -> (usize, u16) {
        let irq = self.irq as usize;
        (IEC_BASE + (irq / 16) * 2, 1 << (irq % 16))
    }

    /// `IPCx` address and field shift for the 3-bit priority.
    pub const fn priority_field(&self) -> (usize, u16) {
        let irq = self.irq as usize;
        (IPC_BASE + (irq / 4) * 2, ((irq % 4) * 4) as u16)
    }
}

/// Per-channel hardware descriptors, indexed by channel number.
pub const CHANNEL_BLOCKS: [ChannelBlock; CHANNEL_COUNT] = [
    ChannelBlock::for_channel(0, 4),
    ChannelBlock::for_channel(1, 14),
    ChannelBlock::for_channel(2, 24),
    ChannelBlock::for_channel(3, 36),
    ChannelBlock::for_channel(4, 46),
    ChannelBlock::for_channel(5, 61),
    ChannelBlock::for_channel(6, 68),
    ChannelBlock::for_channel(7, 69),
];

impl ChannelId {
    /// This channel's hardware descriptor.
    #[allow(clippy::indexing_slicing)] // index() < CHANNEL_COUNT by construction
    pub const fn block(self) -> ChannelBlock {
        CHANNEL_BLOCKS[self.index()]
    }
}

/// Everything the channel manager needs from the controller.
///
/// Implementations are write-only from the manager's point of view: the
/// manager keeps its own shadow of every channel's state.
pub trait DmaHardware {
    /// Store `value` in one register of `channel`'s block.
    fn write_register(&mut self, channel: ChannelId, register: Register, value: u16);

    /// Unmask or mask the channel's completion interrupt.
    fn set_interrupt_enabled(&mut self, channel: ChannelId, enabled: bool);

    /// Clear the channel's pending-interrupt flag.
    fn clear_interrupt_flag(&mut self, channel: ChannelId);

    /// Set the channel's interrupt priority level.
    fn set_interrupt_priority(&mut self, channel: ChannelId, priority: InterruptPriority);
}

/// `current` with the bits selected by `mask` replaced by those of `bits`.
pub(crate) const fn merge_bits(current: u16, mask: u16, bits: u16) -> u16 {
    (current & !mask) | (bits & mask)
}

/// Memory-mapped access to the real controller.
pub struct MmioDma {
    _private: (),
}

impl MmioDma {
    /// # Safety
    ///
    /// The caller must be running on the target device, and must create at
    /// most one `MmioDma`. Its read-modify-write cycles on the shared
    /// interrupt control registers run inside a critical section, which
    /// keeps other software off those registers but not the hardware.
    pub unsafe fn new() -> Self {
        Self { _private: () }
    }

    fn write(address: usize, value: u16) {
        // SAFETY: every address passed here comes from CHANNEL_BLOCKS, which
        // only names SFRs of the DMA controller and interrupt controller;
        // `new` requires that we are on the device those SFRs belong to.
        unsafe { core::ptr::write_volatile(address as *mut u16, value) }
    }

    fn read(address: usize) -> u16 {
        // SAFETY: as for `write`.
        unsafe { core::ptr::read_volatile(address as *const u16) }
    }

    /// Replace the `mask` bits at `address` with `bits`.
    ///
    /// IFSx, IECx and IPCx are shared with every other peripheral, so the
    /// cycle runs with interrupts masked: no handler can rewrite the register
    /// between our read and our write. The interrupt controller itself can
    /// still latch another source's flag in IFSx in that window, and our
    /// write then clears it again. Only `clear_interrupt_flag` writes IFSx.
    fn modify(address: usize, mask: u16, bits: u16) {
        critical_section::with(|_| {
            Self::write(address, merge_bits(Self::read(address), mask, bits));
        });
    }
}

impl DmaHardware for MmioDma {
    fn write_register(&mut self, channel: ChannelId, register: Register, value: u16) {
        Self::write(channel.block().register(register), value);
    }

    fn set_interrupt_enabled(&mut self, channel: ChannelId, enabled: bool) {
        let (address, bit) = channel.block().enable_bit();
        Self::modify(address, bit, if enabled { bit } else { 0 });
    }

    fn clear_interrupt_flag(&mut self, channel: ChannelId) {
        let (address, bit) = channel.block().flag_bit();
        Self::modify(address, bit, 0);
    }

    #[allow(clippy::arithmetic_side_effects)] // shift is 0, 4, 8 or 12
    fn set_interrupt_priority(&mut self, channel: ChannelId, priority: InterruptPriority) {
        let (address, shift) = channel.block().priority_field();
        Self::modify(address, 0b111 << shift, u16::from(priority.get()) << shift);
    }
}

#[cfg(test)]
#[allow(clippy::indexing_slicing)] // fixed-size descriptor table
mod tests {
    use super::*;
    use crate::dma::types::{DataSize, Direction, OperatingMode};

    #[test]
    fn blocks_are_contiguous() {
        assert_eq!(CHANNEL_BLOCKS[0].register(Register::Con), 0x0380);
        assert_eq!(CHANNEL_BLOCKS[0].register(Register::Cnt), 0x038A);
        assert_eq!(CHANNEL_BLOCKS[1].register(Register::Con), 0x038C);
        assert_eq!(CHANNEL_BLOCKS[7].register(Register::Con), 0x03D4);
    }

    #[test]
    fn interrupt_lines_follow_vector_number() {
        // vector 24: IFS1 bit 8, IPC6 bits 2:0
        let block = CHANNEL_BLOCKS[2];
        assert_eq!(block.flag_bit(), (0x0086, 1 << 8));
        assert_eq!(block.enable_bit(), (0x0096, 1 << 8));
        assert_eq!(block.priority_field(), (0x00B0, 0));

        // vector 69: IFS4 bit 5, IPC17 bits 6:4
        let block = CHANNEL_BLOCKS[7];
        assert_eq!(block.flag_bit(), (0x008C, 1 << 5));
        assert_eq!(block.priority_field(), (0x00C6, 4));
    }

    #[test]
    fn control_word_encoding() {
        let config = ChannelConfig {
            data_size: DataSize::Byte,
            direction: Direction::MemoryToPeripheral,
            operating_mode: OperatingMode::OneShotPingPong,
            ..ChannelConfig::default()
        };
        assert_eq!(control_word(&config, false), con::SIZE | con::DIR | 0b11);
        assert_eq!(
            control_word(&config, true),
            con::CHEN | con::SIZE | con::DIR | 0b11
        );
    }

    #[test]
    fn merge_keeps_bits_outside_mask() {
        // another peripheral's enable bits survive unmasking channel 2
        assert_eq!(merge_bits(0b1010_0000_0001, 1 << 8, 1 << 8), 0b1011_0000_0001);
        // clearing a flag leaves its neighbours latched
        assert_eq!(merge_bits(0xFFFF, 1 << 5, 0), 0xFFDF);
        // bits outside the mask in `bits` are ignored
        assert_eq!(merge_bits(0x0000, 0b111 << 4, 0xFFFF), 0x0070);
        // priority field replaced, not OR-ed
        assert_eq!(merge_bits(0x4444, 0b111 << 4, 2 << 4), 0x4424);
    }

    #[test]
    fn request_word_encoding() {
        assert_eq!(request_word(RequestSource::Dac1Left, false), 0x4F);
        assert_eq!(request_word(RequestSource::Uart1Rx, true), 0x800B);
    }
}
