//! Hardware Abstraction Layer
//!
//! The engine talks to hardware through two traits:
//! - [`Transfer`]: the serial link (byte exchange, batched 16-bit transfers,
//!   chip select, clock changes)
//! - [`ControlPins`]: DC, reset, backlight and millisecond delays
//!
//! Board support code implements both. [`sim::SimPanel`] implements them
//! over an in-memory panel for tests and host tools.

pub mod pins;
#[cfg(any(test, feature = "std"))]
pub mod sim;
pub mod transfer;

pub use pins::ControlPins;
pub use transfer::{Stride, Transfer, MAX_BLOCK_UNITS};
