//! The library as dependents see it: built without `cfg(test)`, with the
//! default `std` feature, so its errors must be `std::error::Error`.

use std::error::Error;

use mcu_hal::clock::ClockError;
use mcu_hal::error::HalError;

fn describe(err: &dyn Error) -> String {
    err.to_string()
}

#[test]
fn hal_error_is_std_error() {
    let err = HalError::InvalidChannel(9);
    assert_eq!(describe(&err), "invalid DMA channel 9");
    assert!(err.source().is_none());
}

#[test]
fn clock_error_is_std_error() {
    assert!(describe(&ClockError::InvalidPostscaler(3)).contains("N2=3"));
}

#[test]
fn errors_box_into_dyn_error() {
    let boxed: Box<dyn Error + Send + Sync> = Box::new(HalError::InvalidPriority(0));
    assert_eq!(boxed.to_string(), "invalid interrupt priority 0");
}
