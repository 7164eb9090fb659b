//! Peripheral HAL for 16-bit DSC microcontrollers: DMA channels and idle mode
//!
//! This crate drives the eight-channel DMA controller and keeps the CPU out of
//! idle mode while a one-shot transfer could be lost to the idle-mode DMA
//! erratum. All hardware access goes through the [`DmaHardware`] trait, so
//! everything above the register layer runs and is tested on the host.
//!
//! # Architecture Layers
//!
//! ```text
//! Application / drivers (UART, ADC, DCI, ECAN, ...)
//!         ↓
//! DmaManager        ──► IdleInhibitor ◄── idle loop
//!         ↓                    ▲
//! DmaHardware (MmioDma | MockDmaHardware)
//!         ↑
//! DMA interrupt handlers ──► SharedDma::on_interrupt ──► DmaClient
//! ```
//!
//! # Modules
//!
//! - [`dma`] - channel configuration, control and completion dispatch
//! - [`idle`] - idle-mode inhibition counter
//! - [`clock`] - instruction clock figures
//! - [`error`] - validation errors and the error sink
//! - [`mocks`] - host test doubles (feature `std`)
//!
//! # Features
//!
//! - `std` (default): host builds, mocks, `std::error::Error` impls
//! - `defmt`: defmt derives and log output (hardware builds)
//! - `tracing`: log output through `tracing` (host builds)
//! - `cortex-m`: `wfi`-based idle and cycle-counted delays
//!
//! # Example
//!
//! ```
//! use mcu_hal::dma::{ChannelConfig, DmaManager, OperatingMode, RequestSource};
//! use mcu_hal::error::NoopSink;
//! use mcu_hal::idle::IdleInhibitor;
//! use mcu_hal::mocks::MockDmaHardware;
//!
//! static IDLE: IdleInhibitor = IdleInhibitor::new();
//!
//! let mut dma = DmaManager::new(MockDmaHardware::new(), &IDLE, NoopSink);
//! let config = ChannelConfig {
//!     request_source: RequestSource::Uart1Rx,
//!     operating_mode: OperatingMode::OneShot,
//!     buffer_a: Some(0x4000),
//!     transfer_count: 64,
//!     ..ChannelConfig::default()
//! };
//! dma.configure(0, config, None)?;
//! dma.enable(0)?;
//! assert!(!IDLE.may_idle());
//! dma.disable(0)?;
//! assert!(IDLE.may_idle());
//! # Ok::<(), mcu_hal::error::HalError>(())
//! ```

// ── Lint policy ─────────────────────────────────────────────────────────────
#![deny(clippy::unwrap_used)] // no .unwrap() in production code
#![deny(clippy::expect_used)] // no .expect() in production code
#![deny(clippy::panic)] // no panic!() in production code
#![deny(clippy::unreachable)] // no unreachable!() that isn't documented
#![deny(unused_must_use)]
// all Results must be handled
// ────────────────────────────────────────────────────────────────────────────
#![cfg_attr(not(test), no_std)]
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![deny(unsafe_op_in_unsafe_fn)] // unsafe fn body is not implicitly unsafe block
#![warn(clippy::print_stdout)] // prefer tracing/defmt over println! in lib code
// Pedantic lints suppressed for this hardware HAL crate:
#![allow(clippy::doc_markdown)] // register names (IFS0, IRQSEL) in doc comments
#![allow(clippy::must_use_candidate)] // hardware accessors, callers decide
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::missing_errors_doc)]

// `thiserror-no-std/std` emits `impl std::error::Error`; the path must resolve
// in no_std library builds too.
#[cfg(all(feature = "std", not(test)))]
extern crate std;

// Must come first: the logging macros are textually scoped.
mod fmt;

pub mod clock;
pub mod dma;
pub mod error;
pub mod idle;
pub mod mocks;

pub use clock::{Clock, ClockError, PllConfig};
pub use error::{ErrorKind, ErrorSink, FnSink, HalError, NoopSink};
pub use idle::{IdleControl, IdleInhibitor, IdleWait, IDLE_BASELINE, IDLE_CEILING};

// Re-export DMA types
pub use dma::{
    ChannelConfig, ChannelId, Completion, DmaClient, DmaHardware, DmaManager, DmaWindow,
    RawChannelConfig, SharedDma,
};
