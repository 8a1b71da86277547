//! Bluetooth assigned numbers.

pub mod uuids;

pub use uuids::*;
