//! Crate-internal logging macros.
//!
//! Hardware builds log through `defmt`, host builds through `tracing`. With
//! neither feature enabled the macros expand to a borrow of their arguments so
//! call sites compile identically (and produce no unused-variable warnings).
//!
//! Arguments must be plain integers, `bool` or `&str`: both backends accept
//! `{}` for those, and the workspace lint policy keeps `{:?}` out of
//! non-test code.
#![macro_use]
#![allow(unused_macros)]

macro_rules! trace {
    ($s:literal $(, $x:expr)* $(,)?) => {
        {
            #[cfg(feature = "defmt")]
            ::defmt::trace!($s $(, $x)*);
            #[cfg(feature = "tracing")]
            ::tracing::trace!($s $(, $x)*);
            #[cfg(not(any(feature = "defmt", feature = "tracing")))]
            let _ = ($( & $x ),*);
        }
    };
}

macro_rules! debug {
    ($s:literal $(, $x:expr)* $(,)?) => {
        {
            #[cfg(feature = "defmt")]
            ::defmt::debug!($s $(, $x)*);
            #[cfg(feature = "tracing")]
            ::tracing::debug!($s $(, $x)*);
            #[cfg(not(any(feature = "defmt", feature = "tracing")))]
            let _ = ($( & $x ),*);
        }
    };
}

macro_rules! info {
    ($s:literal $(, $x:expr)* $(,)?) => {
        {
            #[cfg(feature = "defmt")]
            ::defmt::info!($s $(, $x)*);
            #[cfg(feature = "tracing")]
            ::tracing::info!($s $(, $x)*);
            #[cfg(not(any(feature = "defmt", feature = "tracing")))]
            let _ = ($( & $x ),*);
        }
    };
}

macro_rules! warn {
    ($s:literal $(, $x:expr)* $(,)?) => {
        {
            #[cfg(feature = "defmt")]
            ::defmt::warn!($s $(, $x)*);
            #[cfg(feature = "tracing")]
            ::tracing::warn!($s $(, $x)*);
            #[cfg(not(any(feature = "defmt", feature = "tracing")))]
            let _ = ($( & $x ),*);
        }
    };
}

macro_rules! error {
    ($s:literal $(, $x:expr)* $(,)?) => {
        {
            #[cfg(feature = "defmt")]
            ::defmt::error!($s $(, $x)*);
            #[cfg(feature = "tracing")]
            ::tracing::error!($s $(, $x)*);
            #[cfg(not(any(feature = "defmt", feature = "tracing")))]
            let _ = ($( & $x ),*);
        }
    };
}
