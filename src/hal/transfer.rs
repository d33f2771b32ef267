//! Serial transfer contract
//!
//! A display hangs off a write-mostly serial bus (SPI in practice, with an
//! optional DMA engine behind it). The engine never touches peripheral
//! registers; it asks for single byte exchanges and batched runs of 16-bit
//! pixel words.
//!
//! # Non-blocking transfers
//!
//! `transfer_block(.., blocking = false)` may return while the transfer is
//! still in flight. The engine keeps at most one such transfer outstanding
//! and drains it (poll [`Transfer::is_busy`], then
//! [`Transfer::await_transfer_complete`]) before any other bus access.
//! Non-blocking mode is only requested with [`Stride::Fixed`], so an
//! implementation only has to keep a copy of one word alive.

use crate::error::BusError;

/// Largest unit count the engine hands to a single block transfer
pub const MAX_BLOCK_UNITS: usize = 0xFFFF;

/// How a block transfer walks its source buffer
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stride {
    /// Advance one word per unit
    Increment,
    /// Repeat `words[0]` for every unit
    Fixed,
}

/// Transfer layer consumed by the engine
pub trait Transfer {
    /// Full-duplex single byte exchange.
    fn transfer_byte(&mut self, value: u8) -> Result<u8, BusError>;

    /// Emit `count` 16-bit units, most significant byte first.
    ///
    /// `count` never exceeds [`MAX_BLOCK_UNITS`]. With [`Stride::Increment`]
    /// `words` holds at least `count` entries.
    fn transfer_block(
        &mut self,
        words: &[u16],
        count: usize,
        stride: Stride,
        blocking: bool,
    ) -> Result<(), BusError>;

    /// True while a non-blocking transfer is still moving data.
    fn is_busy(&mut self) -> bool;

    /// Finish the last non-blocking transfer: wait out the final word,
    /// discard receive shadow data and return to byte framing.
    fn await_transfer_complete(&mut self) -> Result<(), BusError>;

    /// Reconfigure the bus clock.
    fn set_clock_speed(&mut self, hz: u32);

    /// Assert chip select.
    fn select(&mut self);

    /// Release chip select.
    fn deselect(&mut self);
}
