//! The DMA channel manager.
//!
//! [`DmaManager`] owns the shadow state of all eight channels and is the only
//! writer of the controller's channel registers. One instance exists for the
//! lifetime of the program; it is passed explicitly (or wrapped in
//! [`SharedDma`](super::SharedDma) when interrupt handlers need it) rather
//! than living in a hidden global.
//!
//! # Lifecycle of a channel
//!
//! ```text
//!            configure()              enable()
//! [unconfigured] ──────► [configured, off] ──────► [running]
//!                              ▲   ▲                  │  │
//!                              │   └──── disable() ───┘  │ on_interrupt()
//!                              └──── configure() ────────┘ (callback, flip A/B)
//! ```
//!
//! Configuration never enables a channel. One-shot channels hold an idle
//! inhibition from `enable` until `disable` (or until they are reconfigured).
//!
//! # Concurrency
//!
//! Nothing here is synchronised. Mainline code must not reconfigure a
//! channel while its own completion interrupt may be running; the usual way
//! to guarantee that is to keep the manager inside [`SharedDma`](super::SharedDma).

use super::config::{ChannelConfig, RawChannelConfig};
use super::hardware::{control_word, request_word, DmaHardware, Register};
use super::types::{
    AddressingMode, ChannelId, DataSize, Direction, InterruptPosition, InterruptPriority,
    NullWrite, OperatingMode, PingPongHalf, RequestSource, CHANNEL_COUNT,
};
use super::window::DmaWindow;
use crate::error::{self, ErrorSink, HalError, NoopSink};
use crate::idle::IdleControl;

/// Receiver of a channel's completion events.
///
/// Runs in interrupt context: it must finish in bounded time and must not
/// block. Clients are shared with interrupt handlers, so the manager only
/// accepts `Sync` ones. `first_half` is `true` when the completed block was buffer A (or,
/// outside ping-pong modes, on every other completion starting with the
/// first).
pub trait DmaClient {
    /// One block (or half block) of `channel` completed.
    fn transfer_done(&self, channel: ChannelId, first_half: bool);
}

impl<F> DmaClient for F
where
    F: Fn(ChannelId, bool),
{
    fn transfer_done(&self, channel: ChannelId, first_half: bool) {
        self(channel, first_half);
    }
}

/// What [`DmaManager::on_interrupt`] delivered to the client.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Completion {
    /// The interrupting channel.
    pub channel: ChannelId,
    /// Whether the completed block was the first half.
    pub first_half: bool,
}

/// Shadow state of one channel.
#[derive(Clone, Copy)]
pub struct ChannelState<'a> {
    config: ChannelConfig,
    offsets: (u16, u16),
    client: Option<&'a (dyn DmaClient + Sync)>,
    enabled: bool,
    holds_idle: bool,
    next_half: PingPongHalf,
    priority: InterruptPriority,
}

impl<'a> ChannelState<'a> {
    const fn new() -> Self {
        Self {
            config: ChannelConfig {
                request_source: RequestSource::Int0,
                data_size: DataSize::Word,
                direction: Direction::PeripheralToMemory,
                interrupt_position: InterruptPosition::Full,
                null_write: NullWrite::Off,
                addressing_mode: AddressingMode::PostIncrement,
                operating_mode: OperatingMode::Continuous,
                buffer_a: None,
                buffer_b: None,
                peripheral_address: 0,
                transfer_count: 1,
            },
            offsets: (0, 0),
            client: None,
            enabled: false,
            holds_idle: false,
            next_half: PingPongHalf::A,
            priority: InterruptPriority::RESET,
        }
    }

    /// The configuration last applied.
    pub fn config(&self) -> &ChannelConfig {
        &self.config
    }

    /// Window offsets of buffers A and B as programmed.
    pub fn buffer_offsets(&self) -> (u16, u16) {
        self.offsets
    }

    /// Whether the channel-enable bit is set.
    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// Whether a completion client is registered (and the interrupt unmasked).
    pub fn has_client(&self) -> bool {
        self.client.is_some()
    }

    /// Whether this channel currently holds an idle inhibition.
    pub fn holds_idle_inhibit(&self) -> bool {
        self.holds_idle
    }

    /// The buffer the next completion belongs to.
    pub fn next_half(&self) -> PingPongHalf {
        self.next_half
    }

    /// Interrupt priority level.
    pub fn priority(&self) -> InterruptPriority {
        self.priority
    }
}

/// Owner of every DMA channel.
pub struct DmaManager<'a, H, S = NoopSink> {
    hardware: H,
    idle: &'a (dyn IdleControl + Sync),
    sink: S,
    window: DmaWindow,
    channels: [ChannelState<'a>; CHANNEL_COUNT],
}

impl<'a, H: DmaHardware, S: ErrorSink> DmaManager<'a, H, S> {
    /// Take ownership of the controller, using the default DMA window.
    ///
    /// `sink` receives every validation failure for the manager's lifetime.
    pub fn new(hardware: H, idle: &'a (dyn IdleControl + Sync), sink: S) -> Self {
        Self::with_window(hardware, idle, sink, DmaWindow::default())
    }

    /// As [`new`](Self::new), with an explicit DMA window.
    pub fn with_window(
        hardware: H,
        idle: &'a (dyn IdleControl + Sync),
        sink: S,
        window: DmaWindow,
    ) -> Self {
        info!(
            "DMA manager up, window {}+{}",
            window.base(),
            window.size()
        );
        Self {
            hardware,
            idle,
            sink,
            window,
            channels: [ChannelState::new(); CHANNEL_COUNT],
        }
    }

    /// The DMA window buffers are validated against.
    pub fn window(&self) -> DmaWindow {
        self.window
    }

    /// The underlying controller.
    pub fn hardware(&self) -> &H {
        &self.hardware
    }

    /// The underlying controller, mutably.
    pub fn hardware_mut(&mut self) -> &mut H {
        &mut self.hardware
    }

    /// Give the controller back.
    pub fn into_hardware(self) -> H {
        self.hardware
    }

    /// Shadow state of `channel`.
    #[track_caller]
    pub fn channel(&self, channel: u8) -> Result<&ChannelState<'a>, HalError> {
        let id = self.channel_id(channel)?;
        Ok(self.slot(id))
    }

    /// Validate `config` and program it into `channel`.
    ///
    /// The channel is stopped first and left stopped; call
    /// [`enable`](Self::enable) to run it. A `Some` client unmasks the
    /// channel's interrupt, `None` masks it. The pending flag is cleared in
    /// both cases.
    ///
    /// Every check (channel number, transfer count, both buffers against the
    /// DMA window) runs before anything is written, so a failed call leaves
    /// the channel exactly as it was.
    #[track_caller]
    pub fn configure(
        &mut self,
        channel: u8,
        config: ChannelConfig,
        client: Option<&'a (dyn DmaClient + Sync)>,
    ) -> Result<(), HalError> {
        let id = self.channel_id(channel)?;
        let offsets = match self.buffer_offsets(&config) {
            Ok(offsets) => offsets,
            Err(err) => return Err(self.fail(err)),
        };
        self.apply(id, config, offsets, client);
        Ok(())
    }

    /// [`configure`](Self::configure) from integer-coded fields.
    ///
    /// The first field that does not decode is reported with its own error
    /// kind, and nothing is written.
    #[track_caller]
    pub fn configure_raw(
        &mut self,
        channel: u8,
        raw: RawChannelConfig,
        client: Option<&'a (dyn DmaClient + Sync)>,
    ) -> Result<(), HalError> {
        let id = self.channel_id(channel)?;
        let config = match ChannelConfig::try_from(raw) {
            Ok(config) => config,
            Err(err) => return Err(self.fail(err)),
        };
        let offsets = match self.buffer_offsets(&config) {
            Ok(offsets) => offsets,
            Err(err) => return Err(self.fail(err)),
        };
        self.apply(id, config, offsets, client);
        Ok(())
    }

    /// Set the channel-enable bit.
    ///
    /// Transfers then start on hardware requests from the configured source,
    /// or on [`start_transfer`](Self::start_transfer). A one-shot channel
    /// takes an idle inhibition here; enabling an already-enabled channel
    /// takes no second one. If the counter is already at its ceiling the
    /// inhibition is not counted, and the channel does not hold one.
    #[track_caller]
    pub fn enable(&mut self, channel: u8) -> Result<(), HalError> {
        let id = self.channel_id(channel)?;
        let slot = self.slot_mut(id);
        let inhibit = slot.config.operating_mode.is_one_shot() && !slot.holds_idle;
        slot.enabled = true;
        let config = slot.config;

        self.hardware
            .write_register(id, Register::Con, control_word(&config, true));
        if inhibit && self.idle.inhibit_idle() {
            self.slot_mut(id).holds_idle = true;
        }
        debug!(
            "DMA{} enabled ({})",
            id.number(),
            config.operating_mode.name()
        );
        Ok(())
    }

    /// Clear the channel-enable bit and rewind the ping-pong indicator to A.
    ///
    /// Releases the channel's idle inhibition if it holds one. A block that
    /// was already in flight may still complete and interrupt once more.
    #[track_caller]
    pub fn disable(&mut self, channel: u8) -> Result<(), HalError> {
        let id = self.channel_id(channel)?;
        self.stop(id);
        debug!("DMA{} disabled", id.number());
        Ok(())
    }

    /// Force one request in software.
    ///
    /// Only has a visible effect for channels that are enabled; the hardware
    /// ignores the force bit otherwise.
    #[track_caller]
    pub fn start_transfer(&mut self, channel: u8) -> Result<(), HalError> {
        let id = self.channel_id(channel)?;
        let source = self.slot(id).config.request_source;
        self.hardware
            .write_register(id, Register::Req, request_word(source, true));
        trace!("DMA{} forced request", id.number());
        Ok(())
    }

    /// Set the channel's interrupt priority, `1..=7`.
    #[track_caller]
    pub fn set_priority(&mut self, channel: u8, level: u8) -> Result<(), HalError> {
        let id = self.channel_id(channel)?;
        let priority = match InterruptPriority::new(level) {
            Ok(priority) => priority,
            Err(err) => return Err(self.fail(err)),
        };
        self.slot_mut(id).priority = priority;
        self.hardware.set_interrupt_priority(id, priority);
        Ok(())
    }

    /// Completion interrupt entry point for `channel`.
    ///
    /// Call from the channel's interrupt handler (or from a test, to simulate
    /// one). Clears the pending flag, calls the client with the current
    /// half, then flips the half indicator.
    ///
    /// The returned [`Completion`] lets the handler act on the event before
    /// it returns, e.g. disable or reconfigure the channel; that takes effect
    /// for the very next block. A completion on a channel without a client is
    /// acknowledged and ignored (`Ok(None)`).
    #[track_caller]
    pub fn on_interrupt(&mut self, channel: u8) -> Result<Option<Completion>, HalError> {
        let id = self.channel_id(channel)?;
        self.hardware.clear_interrupt_flag(id);

        let slot = self.slot(id);
        let Some(client) = slot.client else {
            warn!("DMA{} interrupt without client", id.number());
            return Ok(None);
        };
        let half = slot.next_half;

        client.transfer_done(id, half.is_first());
        self.slot_mut(id).next_half = half.flipped();

        trace!("DMA{} done, first half: {}", id.number(), half.is_first());
        Ok(Some(Completion {
            channel: id,
            first_half: half.is_first(),
        }))
    }

    #[track_caller]
    fn channel_id(&self, channel: u8) -> Result<ChannelId, HalError> {
        match ChannelId::new(channel) {
            Some(id) => Ok(id),
            None => Err(self.fail(HalError::InvalidChannel(channel))),
        }
    }

    #[track_caller]
    fn fail(&self, err: HalError) -> HalError {
        error::report(&self.sink, err)
    }

    fn buffer_offsets(&self, config: &ChannelConfig) -> Result<(u16, u16), HalError> {
        config.validate()?;
        let bytes = config.buffer_bytes();
        let a = self.window.translate(config.buffer_a, bytes)?;
        let b = self.window.translate(config.buffer_b, bytes)?;
        Ok((a, b))
    }

    /// Program a fully validated configuration.
    fn apply(
        &mut self,
        id: ChannelId,
        config: ChannelConfig,
        offsets: (u16, u16),
        client: Option<&'a (dyn DmaClient + Sync)>,
    ) {
        self.stop(id);

        let hw = &mut self.hardware;
        hw.write_register(id, Register::Req, request_word(config.request_source, false));
        hw.write_register(id, Register::Con, control_word(&config, false));
        hw.write_register(id, Register::Sta, offsets.0);
        hw.write_register(id, Register::Stb, offsets.1);
        hw.write_register(id, Register::Pad, config.peripheral_address);
        hw.write_register(id, Register::Cnt, config.transfer_count.saturating_sub(1));

        hw.clear_interrupt_flag(id);
        hw.set_interrupt_enabled(id, client.is_some());

        let slot = self.slot_mut(id);
        slot.config = config;
        slot.offsets = offsets;
        slot.client = client;

        debug!(
            "DMA{} configured: {}, {} units, A@{} B@{}",
            id.number(),
            config.operating_mode.name(),
            config.transfer_count,
            offsets.0,
            offsets.1
        );
    }

    /// Clear CHEN, rewind to buffer A, give back any idle inhibition.
    fn stop(&mut self, id: ChannelId) {
        let slot = self.slot_mut(id);
        let release = slot.holds_idle;
        slot.enabled = false;
        slot.holds_idle = false;
        slot.next_half = PingPongHalf::A;
        let config = slot.config;

        self.hardware
            .write_register(id, Register::Con, control_word(&config, false));
        if release {
            self.idle.release_idle();
        }
    }

    #[allow(clippy::indexing_slicing)] // ChannelId::index() < CHANNEL_COUNT
    fn slot(&self, id: ChannelId) -> &ChannelState<'a> {
        &self.channels[id.index()]
    }

    #[allow(clippy::indexing_slicing)] // ChannelId::index() < CHANNEL_COUNT
    fn slot_mut(&mut self, id: ChannelId) -> &mut ChannelState<'a> {
        &mut self.channels[id.index()]
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use crate::idle::IdleInhibitor;
    use crate::mocks::{MockDmaHardware, RecordingClient, RecordingSink};

    const BASE: u32 = crate::dma::window::DMA_WINDOW_BASE;

    #[test]
    fn fresh_channels_are_off_at_reset_priority() {
        let idle = IdleInhibitor::new();
        let dma = DmaManager::new(MockDmaHardware::new(), &idle, NoopSink);
        for channel in 0..8 {
            let state = dma.channel(channel).unwrap();
            assert!(!state.is_enabled());
            assert!(!state.has_client());
            assert_eq!(state.priority().get(), 4);
            assert_eq!(state.next_half(), PingPongHalf::A);
        }
    }

    #[test]
    fn configure_leaves_channel_stopped() {
        let idle = IdleInhibitor::new();
        let mut dma = DmaManager::new(MockDmaHardware::new(), &idle, NoopSink);
        let config = ChannelConfig {
            buffer_a: Some(BASE),
            transfer_count: 16,
            ..ChannelConfig::default()
        };
        dma.configure(0, config, None).unwrap();
        dma.enable(0).unwrap();
        dma.configure(0, config, None).unwrap();

        assert!(!dma.channel(0).unwrap().is_enabled());
        assert!(!dma.hardware().channel(0).enabled());
    }

    #[test]
    fn reconfigure_releases_idle_inhibit() {
        let idle = IdleInhibitor::new();
        let mut dma = DmaManager::new(MockDmaHardware::new(), &idle, NoopSink);
        let one_shot = ChannelConfig {
            operating_mode: OperatingMode::OneShot,
            ..ChannelConfig::default()
        };
        dma.configure(1, one_shot, None).unwrap();
        dma.enable(1).unwrap();
        assert_eq!(idle.holders(), 1);

        dma.configure(1, ChannelConfig::default(), None).unwrap();
        assert_eq!(idle.holders(), 0);
        assert!(!dma.channel(1).unwrap().holds_idle_inhibit());
    }

    #[test]
    fn double_enable_takes_one_inhibit() {
        let idle = IdleInhibitor::new();
        let mut dma = DmaManager::new(MockDmaHardware::new(), &idle, NoopSink);
        let one_shot = ChannelConfig {
            operating_mode: OperatingMode::OneShot,
            ..ChannelConfig::default()
        };
        dma.configure(3, one_shot, None).unwrap();
        dma.enable(3).unwrap();
        dma.enable(3).unwrap();
        assert_eq!(idle.holders(), 1);

        dma.disable(3).unwrap();
        dma.disable(3).unwrap();
        assert_eq!(idle.holders(), 0);
    }

    #[test]
    fn spurious_interrupt_is_acknowledged_without_flip() {
        let idle = IdleInhibitor::new();
        let mut dma = DmaManager::new(MockDmaHardware::new(), &idle, NoopSink);
        dma.hardware_mut().raise(5);

        assert_eq!(dma.on_interrupt(5), Ok(None));
        assert!(!dma.hardware().channel(5).pending());
        assert_eq!(dma.channel(5).unwrap().next_half(), PingPongHalf::A);
    }

    #[test]
    fn failures_reach_the_sink_once() {
        let sink = RecordingSink::new();
        let idle = IdleInhibitor::new();
        let mut dma = DmaManager::new(MockDmaHardware::new(), &idle, &sink);

        assert_eq!(dma.enable(8), Err(HalError::InvalidChannel(8)));
        assert_eq!(dma.set_priority(0, 9), Err(HalError::InvalidPriority(9)));
        assert_eq!(
            sink.kinds().as_slice(),
            &[ErrorKind::InvalidChannel, ErrorKind::InvalidPriority]
        );
        assert!(sink.locations_in("manager.rs"));
    }

    #[test]
    fn client_sees_alternating_halves() {
        let client = RecordingClient::new();
        let idle = IdleInhibitor::new();
        let mut dma = DmaManager::new(MockDmaHardware::new(), &idle, NoopSink);
        let config = ChannelConfig {
            operating_mode: OperatingMode::ContinuousPingPong,
            ..ChannelConfig::default()
        };
        dma.configure(6, config, Some(&client)).unwrap();
        dma.enable(6).unwrap();
        for _ in 0..4 {
            dma.on_interrupt(6).unwrap();
        }
        assert_eq!(client.halves().as_slice(), &[true, false, true, false]);
    }
}
