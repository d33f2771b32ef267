//! Pixel dispatch
//!
//! Everything that puts bytes on the wire lives here: command/data framing,
//! address windows, and the block pushes that the rest of the engine builds
//! on. Runs longer than [`DMA_BENEFIT_LENGTH`] words go out as block
//! transfers; solid fills are started non-blocking and drained before the
//! next bus access.

use log::trace;

use super::RenderEngine;
use crate::error::RenderResult;
use crate::hal::{ControlPins, Stride, Transfer, MAX_BLOCK_UNITS};

/// Below this many words a block transfer costs more than it saves
pub const DMA_BENEFIT_LENGTH: usize = 16;

/// Byte clocked out while reading
pub(crate) const READ_FILL: u8 = 0xAA;

/// Words staged per block when byte swapping a buffer
const SWAP_CHUNK: usize = 64;

impl<B: Transfer, P: ControlPins> RenderEngine<B, P> {
    pub(crate) fn write8(&mut self, byte: u8) -> RenderResult<()> {
        self.drain()?;
        self.bus.transfer_byte(byte)?;
        Ok(())
    }

    pub(crate) fn write16(&mut self, word: u16) -> RenderResult<()> {
        let [hi, lo] = word.to_be_bytes();
        self.write8(hi)?;
        self.write8(lo)
    }

    pub(crate) fn read8(&mut self) -> RenderResult<u8> {
        self.drain()?;
        Ok(self.bus.transfer_byte(READ_FILL)?)
    }

    /// Command byte with DC low, then leave DC high for data.
    pub(crate) fn command(&mut self, c: u8) -> RenderResult<()> {
        self.drain()?;
        self.pins.dc_command();
        self.bus.transfer_byte(c)?;
        self.pins.dc_data();
        Ok(())
    }

    /// `count` copies of `color`
    pub(crate) fn push_block(&mut self, color: u16, count: usize) -> RenderResult<()> {
        if count > DMA_BENEFIT_LENGTH {
            let mut left = count;
            while left > 0 {
                let n = left.min(MAX_BLOCK_UNITS);
                self.drain()?;
                self.bus.transfer_block(&[color], n, Stride::Fixed, false)?;
                self.pending = true;
                left -= n;
            }
            Ok(())
        } else {
            for _ in 0..count {
                self.write16(color)?;
            }
            Ok(())
        }
    }

    /// A run of distinct words, byte swapped when swap is on
    pub(crate) fn push_pixels(&mut self, words: &[u16]) -> RenderResult<()> {
        if words.len() <= DMA_BENEFIT_LENGTH {
            for &w in words {
                let w = if self.swap_bytes { w.swap_bytes() } else { w };
                self.write16(w)?;
            }
            return Ok(());
        }

        if self.swap_bytes {
            let mut staged = [0u16; SWAP_CHUNK];
            for chunk in words.chunks(SWAP_CHUNK) {
                for (dst, src) in staged.iter_mut().zip(chunk) {
                    *dst = src.swap_bytes();
                }
                self.drain()?;
                self.bus
                    .transfer_block(&staged[..chunk.len()], chunk.len(), Stride::Increment, true)?;
            }
        } else {
            for chunk in words.chunks(MAX_BLOCK_UNITS) {
                self.drain()?;
                self.bus.transfer_block(chunk, chunk.len(), Stride::Increment, true)?;
            }
        }
        Ok(())
    }

    /// Address a device-space window for writing. Caller owns the bus.
    pub fn set_window(&mut self, x0: i32, y0: i32, x1: i32, y1: i32) -> RenderResult<()> {
        let ops = self.controller.address_window();
        self.address(x0, y0, x1, y1)?;
        self.command(ops.write)
    }

    /// Address a device-space window for reading. Caller owns the bus.
    pub(crate) fn read_addr_window(&mut self, x: i32, y: i32, w: i32, h: i32) -> RenderResult<()> {
        let ops = self.controller.address_window();
        self.address(x, y, x + w - 1, y + h - 1)?;
        self.command(ops.read)
    }

    fn address(&mut self, x0: i32, y0: i32, x1: i32, y1: i32) -> RenderResult<()> {
        let ops = self.controller.address_window();
        self.addr_col = None;
        self.addr_row = None;
        let (xo, yo) = (self.col_start, self.row_start);
        trace!("window ({}, {})-({}, {}) offset ({}, {})", x0, y0, x1, y1, xo, yo);

        self.command(ops.column)?;
        self.write16((x0 + xo) as u16)?;
        self.write16((x1 + xo) as u16)?;
        self.command(ops.row)?;
        self.write16((y0 + yo) as u16)?;
        self.write16((y1 + yo) as u16)
    }

    /// Open a `w` x `h` write window at device coordinates. Pixels pushed
    /// afterwards fill it row by row.
    pub fn set_addr_window(&mut self, x: i32, y: i32, w: i32, h: i32) -> RenderResult<()> {
        self.in_write(|e| e.set_window(x, y, x + w - 1, y + h - 1))
    }

    /// One pixel, viewport clipped. Skips the column or row address when the
    /// panel already holds it.
    pub fn draw_pixel(&mut self, x: i32, y: i32, color: u16) -> RenderResult<()> {
        if self.vp.oob {
            return Ok(());
        }
        let x = x.saturating_add(self.vp.x_datum);
        let y = y.saturating_add(self.vp.y_datum);
        if x < self.vp.x || y < self.vp.y || x >= self.vp.w || y >= self.vp.h {
            return Ok(());
        }

        let ops = self.controller.address_window();
        self.in_write(|e| {
            if e.addr_col != Some(x) {
                let cx = (x + e.col_start) as u16;
                e.command(ops.column)?;
                e.write16(cx)?;
                e.write16(cx)?;
                e.addr_col = Some(x);
            }
            if e.addr_row != Some(y) {
                let ry = (y + e.row_start) as u16;
                e.command(ops.row)?;
                e.write16(ry)?;
                e.write16(ry)?;
                e.addr_row = Some(y);
            }
            e.command(ops.write)?;
            e.write16(color)
        })
    }

    /// One colour into the open window.
    pub fn push_color(&mut self, color: u16) -> RenderResult<()> {
        self.in_write(|e| e.write16(color))
    }

    /// `count` copies of a colour into the open window.
    pub fn push_color_n(&mut self, color: u16, count: usize) -> RenderResult<()> {
        self.in_write(|e| e.push_block(color, count))
    }

    /// A buffer of colours into the open window. `swap` byte swaps it on the
    /// way regardless of the engine setting.
    pub fn push_colors(&mut self, words: &[u16], swap: bool) -> RenderResult<()> {
        let saved = self.swap_bytes;
        if swap {
            self.swap_bytes = true;
        }
        let result = self.in_write(|e| e.push_pixels(words));
        self.swap_bytes = saved;
        result
    }

    /// `count` copies of a colour with the caller already holding the bus.
    pub fn write_color(&mut self, color: u16, count: usize) -> RenderResult<()> {
        self.push_block(color, count)
    }
}

#[cfg(test)]
mod tests {
    use super::super::testing::*;
    use super::*;
    use crate::color::{BLUE, GREEN, RED};
    use crate::config::PanelConfig;
    use crate::display::cmd;
    use crate::hal::sim::BusEvent;

    #[test]
    fn test_pixel_address_cache() {
        let (mut engine, panel) = ili9341();
        engine.draw_pixel(10, 20, RED).unwrap();
        engine.draw_pixel(11, 20, RED).unwrap();
        engine.draw_pixel(11, 21, RED).unwrap();
        assert_eq!(
            panel.commands(),
            vec![
                cmd::CASET, cmd::PASET, cmd::RAMWR,
                cmd::CASET, cmd::RAMWR,
                cmd::PASET, cmd::RAMWR,
            ]
        );
        assert_eq!(panel.pixel(11, 21), RED);
    }

    #[test]
    fn test_set_window_clears_address_cache() {
        let (mut engine, panel) = ili9341();
        engine.draw_pixel(3, 3, RED).unwrap();
        engine.fill_rect(0, 0, 2, 2, GREEN).unwrap();
        panel.clear_events();
        engine.draw_pixel(3, 3, BLUE).unwrap();
        assert_eq!(panel.commands(), vec![cmd::CASET, cmd::PASET, cmd::RAMWR]);
    }

    #[test]
    fn test_window_carries_cgram_offset() {
        let (mut engine, panel) = engine_for(PanelConfig::ST7735_80X160);
        engine.set_addr_window(0, 0, 4, 2).unwrap();
        assert_eq!(panel.window(), ((26, 29), (1, 2)));
        engine.draw_pixel(0, 0, RED).unwrap();
        assert_eq!(panel.pixel(26, 1), RED);
    }

    #[test]
    fn test_short_run_is_bytes_long_run_is_block() {
        let (mut engine, panel) = ili9341();
        engine.set_addr_window(0, 0, 100, 1).unwrap();
        engine.push_color_n(RED, DMA_BENEFIT_LENGTH).unwrap();
        assert_eq!(panel.stats().blocks, 0);
        engine.push_color_n(RED, DMA_BENEFIT_LENGTH + 1).unwrap();
        assert_eq!(panel.stats().blocks, 1);
        assert!(panel.events().contains(&BusEvent::Block {
            count: DMA_BENEFIT_LENGTH + 1,
            stride: Stride::Fixed,
            blocking: false,
        }));
    }

    #[test]
    fn test_fill_splits_into_block_units() {
        let (mut engine, panel) = ili9341();
        engine.set_addr_window(0, 0, 240, 320).unwrap();
        engine.push_color_n(GREEN, 240 * 320).unwrap();
        let blocks: Vec<usize> = panel
            .events()
            .iter()
            .filter_map(|e| match e {
                BusEvent::Block { count, .. } => Some(*count),
                _ => None,
            })
            .collect();
        assert_eq!(blocks, vec![MAX_BLOCK_UNITS, 240 * 320 - MAX_BLOCK_UNITS]);
        assert_eq!(panel.pixel(239, 319), GREEN);
    }

    #[test]
    fn test_push_colors_swap() {
        let (mut engine, panel) = ili9341();
        let words: Vec<u16> = (0..40).map(|i| 0x00F8 + i).collect();
        engine.set_addr_window(0, 0, 40, 1).unwrap();
        engine.push_colors(&words, true).unwrap();
        assert_eq!(panel.pixel(0, 0), 0xF800);
        assert_eq!(panel.pixel(1, 0), 0xF900);
        assert!(!engine.swap_bytes());

        engine.set_addr_window(0, 1, 4, 1).unwrap();
        engine.push_colors(&[0x1234, 0x5678, 0x9ABC, 0xDEF0], false).unwrap();
        assert_eq!(panel.region(0, 1, 4, 1), vec![0x1234, 0x5678, 0x9ABC, 0xDEF0]);
    }

    #[test]
    fn test_pixel_outside_viewport_is_dropped() {
        let (mut engine, panel) = ili9341();
        engine.draw_pixel(-1, 0, RED).unwrap();
        engine.draw_pixel(240, 0, RED).unwrap();
        engine.draw_pixel(0, 320, RED).unwrap();
        assert!(panel.events().is_empty());
    }
}
