//! CPU idle-mode inhibition.
//!
//! One-shot DMA operating modes are unsafe to run across CPU idle entry on
//! this device family (silicon erratum: a one-shot transfer that completes
//! while the core is in idle can be lost). Every channel running a one-shot
//! mode holds an inhibition for as long as it is enabled; the idle loop only
//! issues the low-power wait when nobody holds one.
//!
//! The counter starts at [`IDLE_BASELINE`] rather than zero so that an
//! unbalanced release is visible as a value below the baseline instead of a
//! wrap-around. Updates saturate inside
//! `IDLE_BASELINE..=IDLE_CEILING`: an `inhibit` at the ceiling or a
//! `release` at the baseline is dropped.
//!
//! Updates go through a critical-section mutex, so an inhibit racing a
//! release from an interrupt handler can no longer lose an update.

use core::cell::Cell;

use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use embassy_sync::blocking_mutex::Mutex;

/// Counter value meaning "no inhibition held".
pub const IDLE_BASELINE: u16 = 1000;

/// Highest counter value; further inhibitions are dropped.
pub const IDLE_CEILING: u16 = 2000;

/// The clock collaborator seam consumed by the DMA manager.
pub trait IdleControl {
    /// Take one inhibition. `false` if it was dropped at the ceiling and
    /// must not be released later.
    fn inhibit_idle(&self) -> bool;

    /// Drop one inhibition.
    fn release_idle(&self);
}

/// The low-power wait instruction.
pub trait IdleWait {
    /// Stop the core until the next interrupt.
    fn wait_for_interrupt(&mut self);
}

/// Process-wide idle-inhibition counter.
///
/// `new` is `const`, so the usual home for this is a `static` shared by the
/// DMA manager and the idle loop.
pub struct IdleInhibitor {
    count: Mutex<CriticalSectionRawMutex, Cell<u16>>,
}

impl IdleInhibitor {
    /// Create a counter at the baseline.
    pub const fn new() -> Self {
        Self {
            count: Mutex::new(Cell::new(IDLE_BASELINE)),
        }
    }

    /// Take one inhibition; no-op at [`IDLE_CEILING`].
    ///
    /// Returns whether the inhibition was counted.
    pub fn inhibit(&self) -> bool {
        self.count.lock(|count| {
            let value = count.get();
            if (IDLE_BASELINE..IDLE_CEILING).contains(&value) {
                count.set(value.saturating_add(1));
                true
            } else {
                warn!("idle inhibit dropped at {}", value);
                false
            }
        })
    }

    /// Drop one inhibition; no-op at [`IDLE_BASELINE`].
    pub fn release(&self) {
        self.count.lock(|count| {
            let value = count.get();
            if value > IDLE_BASELINE && value <= IDLE_CEILING {
                count.set(value.saturating_sub(1));
            } else {
                warn!("idle release dropped at {}", value);
            }
        });
    }

    /// `true` iff no inhibition is held.
    pub fn may_idle(&self) -> bool {
        self.count() == IDLE_BASELINE
    }

    /// Current raw counter value.
    pub fn count(&self) -> u16 {
        self.count.lock(Cell::get)
    }

    /// Number of inhibitions currently held.
    pub fn holders(&self) -> u16 {
        self.count().saturating_sub(IDLE_BASELINE)
    }

    /// Issue the low-power wait if allowed, otherwise return immediately.
    ///
    /// Returns whether the wait was issued.
    pub fn enter_idle_if_allowed<W: IdleWait + ?Sized>(&self, cpu: &mut W) -> bool {
        if self.may_idle() {
            cpu.wait_for_interrupt();
            true
        } else {
            false
        }
    }
}

impl Default for IdleInhibitor {
    fn default() -> Self {
        Self::new()
    }
}

impl IdleControl for IdleInhibitor {
    fn inhibit_idle(&self) -> bool {
        self.inhibit()
    }

    fn release_idle(&self) {
        self.release();
    }
}

/// `wfi`-based idle for Cortex-M builds.
#[cfg(feature = "cortex-m")]
#[derive(Debug, Default, Clone, Copy)]
pub struct Wfi;

#[cfg(feature = "cortex-m")]
impl IdleWait for Wfi {
    fn wait_for_interrupt(&mut self) {
        cortex_m::asm::wfi();
    }
}
