//! Sharing one [`DmaManager`] between mainline code and interrupt handlers.
//!
//! The manager lives in a `static`, behind a critical-section mutex:
//!
//! ```text
//! static DMA: SharedDma<'static, MmioDma, FnSink> = SharedDma::new();
//!
//! // startup
//! DMA.init(DmaManager::new(unsafe { MmioDma::new() }, &IDLE, FnSink(on_error)));
//!
//! // DMA2 interrupt handler
//! if let Ok(Some(done)) = DMA.on_interrupt(2) { /* ... */ }
//! ```
//!
//! The slot is `Sync` whenever the manager is `Send`. That is why the manager
//! only holds `Sync` clients and idle controls: a `&'static` reference to one
//! of those may cross into interrupt context.
//!
//! CriticalSectionRawMutex masks interrupts for the duration of each closure,
//! so keep closures short: a configure call is a dozen register writes.

use core::cell::RefCell;

use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use embassy_sync::blocking_mutex::Mutex;

use super::hardware::DmaHardware;
use super::manager::{Completion, DmaManager};
use crate::error::{ErrorSink, HalError, NoopSink};

/// A [`DmaManager`] slot that can live in a `static`.
pub struct SharedDma<'a, H, S = NoopSink> {
    inner: Mutex<CriticalSectionRawMutex, RefCell<Option<DmaManager<'a, H, S>>>>,
}

impl<'a, H, S> SharedDma<'a, H, S> {
    /// An empty slot; [`init`](Self::init) fills it.
    pub const fn new() -> Self {
        Self {
            inner: Mutex::new(RefCell::new(None)),
        }
    }

    /// A slot already holding `manager`.
    pub const fn from_manager(manager: DmaManager<'a, H, S>) -> Self {
        Self {
            inner: Mutex::new(RefCell::new(Some(manager))),
        }
    }
}

impl<'a, H: DmaHardware, S: ErrorSink> SharedDma<'a, H, S> {
    /// Install `manager`, returning the one it replaces.
    ///
    /// Returns `Err(manager)` if the slot is borrowed, i.e. when called from
    /// inside [`with`](Self::with).
    pub fn init(
        &self,
        manager: DmaManager<'a, H, S>,
    ) -> Result<Option<DmaManager<'a, H, S>>, DmaManager<'a, H, S>> {
        self.inner.lock(|cell| match cell.try_borrow_mut() {
            Ok(mut slot) => Ok(slot.replace(manager)),
            Err(_) => Err(manager),
        })
    }

    /// Remove and return the manager.
    pub fn take(&self) -> Option<DmaManager<'a, H, S>> {
        self.inner
            .lock(|cell| cell.try_borrow_mut().ok().and_then(|mut slot| slot.take()))
    }

    /// Run `f` on the manager with interrupts masked.
    ///
    /// `None` if the slot is empty, or if it is already borrowed further up
    /// the stack (a nested call from inside `f`).
    pub fn with<R>(&self, f: impl FnOnce(&mut DmaManager<'a, H, S>) -> R) -> Option<R> {
        self.inner.lock(|cell| {
            let Ok(mut slot) = cell.try_borrow_mut() else {
                warn!("DMA manager re-entered");
                return None;
            };
            slot.as_mut().map(f)
        })
    }

    /// [`DmaManager::on_interrupt`] through the slot.
    ///
    /// An empty or busy slot acknowledges nothing and yields `Ok(None)`.
    pub fn on_interrupt(&self, channel: u8) -> Result<Option<Completion>, HalError> {
        self.with(|dma| dma.on_interrupt(channel))
            .unwrap_or(Ok(None))
    }
}

impl<H, S> Default for SharedDma<'_, H, S> {
    fn default() -> Self {
        Self::new()
    }
}
