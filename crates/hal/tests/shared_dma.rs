//! The manager shared through a `static`, the way firmware wires it: startup
//! code installs it, the interrupt handler dispatches through it, and the
//! client and idle counter are `static`s too.

#![allow(clippy::unwrap_used)]

use mcu_hal::dma::{ChannelConfig, DmaManager, OperatingMode, PingPongHalf, SharedDma};
use mcu_hal::error::NoopSink;
use mcu_hal::idle::{IdleInhibitor, IDLE_BASELINE};
use mcu_hal::mocks::{MockDmaHardware, RecordingClient};

static IDLE: IdleInhibitor = IdleInhibitor::new();
static CLIENT: RecordingClient = RecordingClient::new();
static DMA: SharedDma<'static, MockDmaHardware> = SharedDma::new();

/// What a DMA interrupt handler does.
fn dma_interrupt(channel: u8) {
    DMA.with(|dma| dma.hardware_mut().raise(channel));
    let done = DMA.on_interrupt(channel).unwrap();
    if let Some(done) = done {
        if !done.first_half {
            DMA.with(|dma| dma.disable(done.channel.number()))
                .unwrap()
                .unwrap();
        }
    }
}

#[test]
fn static_manager_serves_interrupts() {
    let installed = DMA.init(DmaManager::new(MockDmaHardware::new(), &IDLE, NoopSink));
    assert!(matches!(installed, Ok(None)));

    let config = ChannelConfig {
        operating_mode: OperatingMode::OneShotPingPong,
        transfer_count: 16,
        ..ChannelConfig::default()
    };
    DMA.with(|dma| {
        dma.configure(2, config, Some(&CLIENT))
            .and_then(|()| dma.enable(2))
    })
    .unwrap()
    .unwrap();
    assert!(!IDLE.may_idle());

    dma_interrupt(2);
    assert_eq!(
        DMA.with(|dma| dma.channel(2).unwrap().next_half()),
        Some(PingPongHalf::B)
    );
    dma_interrupt(2);

    assert_eq!(CLIENT.events().as_slice(), &[(2, true), (2, false)]);
    assert_eq!(IDLE.count(), IDLE_BASELINE);
    let dma = DMA.take().unwrap();
    assert_eq!(dma.channel(2).unwrap().next_half(), PingPongHalf::A);
    assert!(!dma.hardware().channel(2).enabled());
}
