//! Mock implementations for testing
//!
//! Host-side stand-ins for the DMA controller, the idle instruction, the
//! error sink and a completion client, for use in unit and integration tests.

#![cfg(any(test, feature = "std"))]
#![allow(clippy::indexing_slicing)] // mock tables are indexed by validated channel numbers

use core::cell::RefCell;
use core::panic::Location;

use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use embassy_sync::blocking_mutex::Mutex;

use crate::dma::hardware::{req, DmaHardware, Register};
use crate::dma::{ChannelId, DmaClient, InterruptPriority, CHANNEL_COUNT};
use crate::error::{ErrorKind, ErrorSink, HalError};
use crate::idle::IdleWait;

/// Recorded state of one mock channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MockChannel {
    registers: [u16; 6],
    interrupt_enabled: bool,
    pending: bool,
    priority: u8,
    forced: u32,
    writes: u32,
}

impl MockChannel {
    const fn new() -> Self {
        Self {
            registers: [0; 6],
            interrupt_enabled: false,
            pending: false,
            priority: InterruptPriority::RESET.get(),
            forced: 0,
            writes: 0,
        }
    }

    /// Last value written to `register`. `REQ` reads back without the
    /// self-clearing force bit.
    pub fn register(&self, register: Register) -> u16 {
        self.registers[register.offset() / 2]
    }

    /// `CHEN` as last written.
    pub fn enabled(&self) -> bool {
        self.register(Register::Con) & crate::dma::hardware::con::CHEN != 0
    }

    /// Interrupt line unmasked.
    pub fn interrupt_enabled(&self) -> bool {
        self.interrupt_enabled
    }

    /// Pending-interrupt flag.
    pub fn pending(&self) -> bool {
        self.pending
    }

    /// Interrupt priority level as last programmed.
    pub fn priority(&self) -> u8 {
        self.priority
    }

    /// Number of software-forced requests.
    pub fn force_count(&self) -> u32 {
        self.forced
    }

    /// Number of register writes of any kind.
    pub fn write_count(&self) -> u32 {
        self.writes
    }
}

/// Mock DMA controller
///
/// Records every register write and interrupt-line change per channel.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MockDmaHardware {
    channels: [MockChannel; CHANNEL_COUNT],
}

impl MockDmaHardware {
    /// Create a controller in its reset state
    pub const fn new() -> Self {
        Self {
            channels: [MockChannel::new(); CHANNEL_COUNT],
        }
    }

    /// Recorded state of `channel` (`0..8`).
    pub fn channel(&self, channel: u8) -> &MockChannel {
        &self.channels[usize::from(channel)]
    }

    /// Set the pending flag of `channel`, as a completed block would.
    pub fn raise(&mut self, channel: u8) {
        self.channels[usize::from(channel)].pending = true;
    }

    /// Total register writes across all channels.
    pub fn total_writes(&self) -> u32 {
        self.channels.iter().map(|c| c.writes).sum()
    }

    fn slot(&mut self, channel: ChannelId) -> &mut MockChannel {
        &mut self.channels[channel.index()]
    }
}

impl Default for MockDmaHardware {
    fn default() -> Self {
        Self::new()
    }
}

#[allow(clippy::arithmetic_side_effects)] // test counters
impl DmaHardware for MockDmaHardware {
    fn write_register(&mut self, channel: ChannelId, register: Register, value: u16) {
        let slot = self.slot(channel);
        slot.writes += 1;
        let value = if register == Register::Req && value & req::FORCE != 0 {
            slot.forced += 1;
            value & !req::FORCE
        } else {
            value
        };
        slot.registers[register.offset() / 2] = value;
    }

    fn set_interrupt_enabled(&mut self, channel: ChannelId, enabled: bool) {
        self.slot(channel).interrupt_enabled = enabled;
    }

    fn clear_interrupt_flag(&mut self, channel: ChannelId) {
        self.slot(channel).pending = false;
    }

    fn set_interrupt_priority(&mut self, channel: ChannelId, priority: InterruptPriority) {
        self.slot(channel).priority = priority.get();
    }
}

/// Mock CPU idle instruction
#[derive(Debug, Default)]
pub struct MockCpu {
    waits: u32,
}

impl MockCpu {
    /// Create new mock CPU
    pub fn new() -> Self {
        Self::default()
    }

    /// Get number of idle waits issued
    pub fn wait_count(&self) -> u32 {
        self.waits
    }
}

impl IdleWait for MockCpu {
    fn wait_for_interrupt(&mut self) {
        self.waits = self.waits.saturating_add(1);
    }
}

/// Maximum number of reports a [`RecordingSink`] keeps.
pub const SINK_CAPACITY: usize = 32;

/// Error sink that remembers what it was told
///
/// Reports past [`SINK_CAPACITY`] are dropped.
#[derive(Debug, Default)]
pub struct RecordingSink {
    reports: RefCell<heapless::Vec<(HalError, &'static Location<'static>), SINK_CAPACITY>>,
}

impl RecordingSink {
    /// Create an empty sink
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of reports received.
    pub fn count(&self) -> usize {
        self.reports.borrow().len()
    }

    /// Every reported error, oldest first.
    pub fn errors(&self) -> heapless::Vec<HalError, SINK_CAPACITY> {
        self.reports.borrow().iter().map(|(e, _)| *e).collect()
    }

    /// Every reported error kind, oldest first.
    pub fn kinds(&self) -> heapless::Vec<ErrorKind, SINK_CAPACITY> {
        self.reports.borrow().iter().map(|(e, _)| e.kind()).collect()
    }

    /// Most recent report.
    pub fn last(&self) -> Option<(HalError, &'static Location<'static>)> {
        self.reports.borrow().last().copied()
    }

    /// `true` if at least one report arrived and every report's location is
    /// in a file whose path ends with `file`.
    pub fn locations_in(&self, file: &str) -> bool {
        let reports = self.reports.borrow();
        !reports.is_empty() && reports.iter().all(|(_, l)| l.file().ends_with(file))
    }

    /// Forget everything.
    pub fn clear(&self) {
        self.reports.borrow_mut().clear();
    }
}

impl ErrorSink for RecordingSink {
    fn report(&self, location: &'static Location<'static>, error: HalError) {
        let _ = self.reports.borrow_mut().push((error, location));
    }
}

/// Maximum number of completions a [`RecordingClient`] keeps.
pub const CLIENT_CAPACITY: usize = 64;

/// Completion client that records `(channel, first_half)` pairs
///
/// `Sync`, so it can be registered from a `static` and called from an
/// interrupt handler. Completions past [`CLIENT_CAPACITY`] are dropped.
pub struct RecordingClient {
    events: Mutex<CriticalSectionRawMutex, RefCell<heapless::Vec<(u8, bool), CLIENT_CAPACITY>>>,
}

impl RecordingClient {
    /// Create an empty client
    pub const fn new() -> Self {
        Self {
            events: Mutex::new(RefCell::new(heapless::Vec::new())),
        }
    }

    /// Every `(channel number, first_half)` received, oldest first.
    pub fn events(&self) -> heapless::Vec<(u8, bool), CLIENT_CAPACITY> {
        self.events.lock(|events| events.borrow().clone())
    }

    /// The `first_half` flags alone, oldest first.
    pub fn halves(&self) -> heapless::Vec<bool, CLIENT_CAPACITY> {
        self.events
            .lock(|events| events.borrow().iter().map(|(_, first)| *first).collect())
    }

    /// Number of completions received.
    pub fn count(&self) -> usize {
        self.events.lock(|events| events.borrow().len())
    }

    /// Forget everything.
    pub fn clear(&self) {
        self.events.lock(|events| events.borrow_mut().clear());
    }
}

impl Default for RecordingClient {
    fn default() -> Self {
        Self::new()
    }
}

impl DmaClient for RecordingClient {
    fn transfer_done(&self, channel: ChannelId, first_half: bool) {
        self.events.lock(|events| {
            let _ = events.borrow_mut().push((channel.number(), first_half));
        });
    }
}
