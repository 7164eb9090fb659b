//! DMA channel management.
//!
//! The controller has eight identical channels. Each one moves blocks of
//! words or bytes between a peripheral data register and a buffer in the
//! DMA-visible RAM window, triggered by a selectable peripheral event, and
//! interrupts on completion of a block (or half block).
//!
//! - [`types`]: channel ids and the enumerated configuration fields
//! - [`window`]: absolute address to window offset translation
//! - [`config`]: typed and integer-coded configuration bundles
//! - [`hardware`]: register encodings, the per-channel descriptor table and
//!   the [`DmaHardware`] seam
//! - [`manager`]: [`DmaManager`], the owner of all channel state
//! - [`shared`]: [`SharedDma`], for use from interrupt handlers

pub mod config;
pub mod hardware;
pub mod manager;
pub mod shared;
pub mod types;
pub mod window;

pub use config::{ChannelConfig, RawChannelConfig, MAX_TRANSFER_COUNT};
pub use hardware::{ChannelBlock, DmaHardware, MmioDma, Register, CHANNEL_BLOCKS};
pub use manager::{ChannelState, Completion, DmaClient, DmaManager};
pub use shared::SharedDma;
pub use types::{
    AddressingMode, ChannelId, DataSize, Direction, InterruptPosition, InterruptPriority,
    NullWrite, OperatingMode, PingPongHalf, RequestSource, CHANNEL_COUNT,
};
pub use window::{DmaWindow, DMA_WINDOW_BASE, DMA_WINDOW_SIZE};
