//! Instruction clock bookkeeping.
//!
//! The core runs at `Fcy = Fosc / 2`, where the PLL produces
//! `Fosc = Fin · M / (N1 · N2)`. This module validates PLL parameters and
//! keeps the derived figures the rest of the firmware needs (cycle frequency,
//! cycle duration, a rough MIPS estimate for busy-wait loops). It does **not**
//! program the oscillator registers.
//!
//! # Presets
//!
//! | Preset             | N1 | M   | N2 | Fin       | Fcy          | MIPS |
//! |--------------------|----|-----|----|-----------|--------------|------|
//! | `internal_rc_30()` | 8  | 130 | 2  | 7.37 MHz  | 29.940625 MHz | 30  |
//! | `internal_rc_40()` | 6  | 130 | 2  | 7.37 MHz  | 39.920833 MHz | 40  |
//!
//! # Sources
//!
//! - dsPIC33F Family Reference Manual, Section 7 (Oscillator): PLL limits
//!   N1 = PLLPRE + 2 (2..=33), M = PLLDIV + 2 (2..=513), N2 ∈ {2, 4, 8}.

/// Internal fast RC oscillator frequency.
pub const FRC_HZ: u32 = 7_370_000;

/// PLL prescaler range.
pub const N1_RANGE: core::ops::RangeInclusive<u16> = 2..=33;

/// PLL multiplier range.
pub const M_RANGE: core::ops::RangeInclusive<u16> = 2..=513;

/// Legal PLL postscaler values.
pub const N2_VALUES: [u16; 3] = [2, 4, 8];

/// PLL parameter outside what the hardware divider fields can hold.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror_no_std::Error)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ClockError {
    /// N1 outside `2..=33`.
    #[error("PLL prescaler N1={0} outside 2..=33")]
    InvalidPrescaler(u16),
    /// M outside `2..=513`.
    #[error("PLL multiplier M={0} outside 2..=513")]
    InvalidMultiplier(u16),
    /// N2 not one of 2, 4, 8.
    #[error("PLL postscaler N2={0} is not 2, 4 or 8")]
    InvalidPostscaler(u16),
}

/// PLL divider settings plus the input frequency they apply to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct PllConfig {
    /// Prescaler.
    pub n1: u16,
    /// Multiplier.
    pub m: u16,
    /// Postscaler.
    pub n2: u16,
    /// PLL input frequency in Hz.
    pub input_hz: u32,
}

impl PllConfig {
    /// PLL fed from the internal RC oscillator.
    pub const fn internal_rc(n1: u16, m: u16, n2: u16) -> Self {
        Self {
            n1,
            m,
            n2,
            input_hz: FRC_HZ,
        }
    }

    /// PLL fed from an external oscillator at `input_hz`.
    pub const fn external(n1: u16, m: u16, n2: u16, input_hz: u32) -> Self {
        Self { n1, m, n2, input_hz }
    }

    /// Check every divider against its hardware range.
    pub fn validate(&self) -> Result<(), ClockError> {
        if !N1_RANGE.contains(&self.n1) {
            return Err(ClockError::InvalidPrescaler(self.n1));
        }
        if !M_RANGE.contains(&self.m) {
            return Err(ClockError::InvalidMultiplier(self.m));
        }
        if !N2_VALUES.contains(&self.n2) {
            return Err(ClockError::InvalidPostscaler(self.n2));
        }
        Ok(())
    }

    /// Oscillator output, `Fin · M / (N1 · N2)`, saturating at `u32::MAX`.
    ///
    /// Returns 0 if either divider is 0.
    pub const fn fosc_hz(&self) -> u32 {
        let num = (self.input_hz as u64).saturating_mul(self.m as u64);
        let den = (self.n1 as u64).saturating_mul(self.n2 as u64);
        let Some(fosc) = num.checked_div(den) else {
            return 0;
        };
        if fosc > u32::MAX as u64 {
            u32::MAX
        } else {
            fosc as u32
        }
    }

    /// Instruction cycle frequency, `Fosc / 2`.
    pub const fn fcy_hz(&self) -> u32 {
        self.fosc_hz() / 2
    }
}

/// Rounded MIPS estimate for `fcy`: `(fcy + 500 000) / 1 000 000`.
pub const fn bogomips_for(fcy: u32) -> u32 {
    fcy.saturating_add(500_000) / 1_000_000
}

/// The active instruction clock.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Clock {
    fcy: u32,
    target_bogomips: u32,
}

impl Clock {
    /// 30 MIPS from the internal RC oscillator.
    pub const fn internal_rc_30() -> Self {
        Self {
            fcy: PllConfig::internal_rc(8, 130, 2).fcy_hz(),
            target_bogomips: 30,
        }
    }

    /// 40 MIPS from the internal RC oscillator.
    pub const fn internal_rc_40() -> Self {
        Self {
            fcy: PllConfig::internal_rc(6, 130, 2).fcy_hz(),
            target_bogomips: 40,
        }
    }

    /// Clock produced by `pll`, with the rounded MIPS estimate.
    pub fn from_pll(pll: &PllConfig) -> Result<Self, ClockError> {
        if let Err(err) = pll.validate() {
            warn!(
                "rejected PLL n1={} m={} n2={}",
                pll.n1,
                pll.m,
                pll.n2
            );
            return Err(err);
        }
        let fcy = pll.fcy_hz();
        info!("Fcy {} Hz", fcy);
        Ok(Self {
            fcy,
            target_bogomips: bogomips_for(fcy),
        })
    }

    /// Record a clock configured elsewhere. Touches no hardware.
    pub fn set_speed(&mut self, hz: u32, mips: u32) {
        self.fcy = hz;
        self.target_bogomips = mips;
    }

    /// Instruction cycle frequency in Hz.
    pub const fn cycle_frequency(&self) -> u32 {
        self.fcy
    }

    /// Duration of one instruction cycle in ns (truncated); 0 before the
    /// clock is known.
    pub const fn cycle_duration_ns(&self) -> u32 {
        match 1_000_000_000u32.checked_div(self.fcy) {
            Some(ns) => ns,
            None => 0,
        }
    }

    /// MIPS figure busy-wait loops should assume.
    pub const fn target_bogomips(&self) -> u32 {
        self.target_bogomips
    }

    /// Instruction cycles spanning `us` microseconds, saturating.
    pub const fn cycles_for_us(&self, us: u32) -> u32 {
        let cycles = (self.fcy as u64).saturating_mul(us as u64) / 1_000_000;
        if cycles > u32::MAX as u64 {
            u32::MAX
        } else {
            cycles as u32
        }
    }

    /// Busy-wait for at least `us` microseconds.
    ///
    /// Interrupt handlers that preempt the wait lengthen it.
    #[cfg(feature = "cortex-m")]
    pub fn delay_us(&self, us: u32) {
        cortex_m::asm::delay(self.cycles_for_us(us));
    }
}
