//! Panel readback
//!
//! Reads run in their own select at the read clock (see
//! [`begin_read`](RenderEngine::begin_read)). Every memory read starts with
//! one dummy byte; after that each pixel arrives in the controller's
//! [`ReadFormat`](crate::display::ReadFormat).

use super::RenderEngine;
use crate::display::cmd;
use crate::error::{ensure_len, RenderResult};
use crate::hal::{ControlPins, Transfer};

/// Largest pixel read, in bytes
const MAX_READ_BYTES: usize = 3;

impl<B: Transfer, P: ControlPins> RenderEngine<B, P> {
    /// Read one byte of an indexed controller register through command
    /// 0xD9. Only the low nibble of `index` is used.
    pub fn read_command8(&mut self, command: u8, index: u8) -> RenderResult<u8> {
        let prior = self.begin_read()?;
        let result = self.indexed_read(command, index);
        self.end_read(prior);
        result
    }

    /// Two register bytes, first one in the high half
    pub fn read_command16(&mut self, command: u8, index: u8) -> RenderResult<u16> {
        let hi = self.read_command8(command, index)?;
        let lo = self.read_command8(command, index.wrapping_add(1))?;
        Ok(u16::from_be_bytes([hi, lo]))
    }

    /// Four register bytes, first one in the high byte
    pub fn read_command32(&mut self, command: u8, index: u8) -> RenderResult<u32> {
        let mut bytes = [0u8; 4];
        for (i, b) in bytes.iter_mut().enumerate() {
            *b = self.read_command8(command, index.wrapping_add(i as u8))?;
        }
        Ok(u32::from_be_bytes(bytes))
    }

    fn indexed_read(&mut self, command: u8, index: u8) -> RenderResult<u8> {
        self.command(cmd::RDINDEX)?;
        self.write8(0x10 + (index & 0x0F))?;
        // Some panels need the select pulsed between index and command
        self.bus.deselect();
        self.bus.select();
        self.command(command)?;
        self.read8()
    }

    /// Colour of one pixel, or 0 when it lies outside the viewport. Safe to
    /// call inside a held write.
    pub fn read_pixel(&mut self, x: i32, y: i32) -> RenderResult<u16> {
        if self.vp.oob {
            return Ok(0);
        }
        let x = x.saturating_add(self.vp.x_datum);
        let y = y.saturating_add(self.vp.y_datum);
        if x < self.vp.x || y < self.vp.y || x >= self.vp.w || y >= self.vp.h {
            return Ok(0);
        }
        self.read_device_pixel(x, y)
    }

    /// Read one pixel at device coordinates, no clipping.
    pub(crate) fn read_device_pixel(&mut self, x: i32, y: i32) -> RenderResult<u16> {
        let format = self.controller.read_format();
        let mut color = 0;
        self.read_window(x, y, 1, 1, |_, bytes| color = format.decode(bytes))?;
        Ok(color)
    }

    /// Read a `w` x `h` rectangle into `data` as native RGB565 words, one
    /// row of `w` after another. Clipped parts of `data` are left alone.
    pub fn read_rect(&mut self, x: i32, y: i32, w: i32, h: i32, data: &mut [u16]) -> RenderResult<()> {
        let Some(clip) = self.clip_image(x, y, w, h) else {
            return Ok(());
        };
        ensure_len((w * h) as usize, data.len())?;

        let format = self.controller.read_format();
        let base = (clip.dx + clip.dy * w) as usize;
        let (dw, stride) = (clip.dw as usize, w as usize);
        self.read_window(clip.x, clip.y, clip.dw, clip.dh, |i, bytes| {
            data[base + (i / dw) * stride + i % dw] = format.decode(bytes);
        })
    }

    /// Read a rectangle as 8-bit R, G, B triplets, three bytes per pixel
    /// laid out like [`read_rect`](Self::read_rect).
    pub fn read_rect_rgb(&mut self, x: i32, y: i32, w: i32, h: i32, data: &mut [u8]) -> RenderResult<()> {
        let Some(clip) = self.clip_image(x, y, w, h) else {
            return Ok(());
        };
        ensure_len(3 * (w * h) as usize, data.len())?;

        let format = self.controller.read_format();
        let base = (clip.dx + clip.dy * w) as usize;
        let (dw, stride) = (clip.dw as usize, w as usize);
        self.read_window(clip.x, clip.y, clip.dw, clip.dh, |i, bytes| {
            let at = 3 * (base + (i / dw) * stride + i % dw);
            let (r, g, b) = format.decode_rgb(bytes);
            data[at..at + 3].copy_from_slice(&[r, g, b]);
        })
    }

    /// Push a rectangle read by [`read_rect`](Self::read_rect) back
    /// unchanged, whatever the swap setting.
    pub fn push_rect(&mut self, x: i32, y: i32, w: i32, h: i32, data: &[u16]) -> RenderResult<()> {
        let swap = self.swap_bytes;
        self.swap_bytes = false;
        let result = self.push_image(x, y, w, h, data);
        self.swap_bytes = swap;
        result
    }

    /// Read a device-space window, handing each pixel's raw bytes to `sink`
    /// in row order.
    fn read_window(
        &mut self,
        x: i32,
        y: i32,
        w: i32,
        h: i32,
        mut sink: impl FnMut(usize, &[u8]),
    ) -> RenderResult<()> {
        let bpp = self.controller.read_format().bytes_per_pixel();
        let prior = self.begin_read()?;
        let result = (|| {
            self.read_addr_window(x, y, w, h)?;
            // Dummy byte
            self.read8()?;
            let mut px = [0u8; MAX_READ_BYTES];
            for i in 0..(w * h) as usize {
                for b in px[..bpp].iter_mut() {
                    *b = self.read8()?;
                }
                sink(i, &px[..bpp]);
            }
            Ok(())
        })();
        self.end_read(prior);
        result
    }
}

#[cfg(test)]
mod tests {
    use super::super::testing::*;
    use crate::color::{color565, BLACK, BLUE, GREEN, RED, WHITE};
    use crate::config::PanelConfig;
    use crate::error::Fault;

    #[test]
    fn test_read_pixel_rgb666() {
        let (mut engine, panel) = ili9341();
        panel.poke(7, 9, GREEN);
        assert_eq!(engine.read_pixel(7, 9).unwrap(), GREEN);
        assert_eq!(engine.read_pixel(-1, 0).unwrap(), 0);
        assert_eq!(engine.read_pixel(0, 320).unwrap(), 0);
    }

    #[test]
    fn test_read_pixel_shifted_format() {
        let (mut engine, panel) = engine_for(PanelConfig::ST7735_80X160);
        let c = color565(0x80, 0x40, 0x20);
        engine.draw_pixel(3, 4, c).unwrap();
        assert_eq!(engine.read_pixel(3, 4).unwrap(), c);
        assert_eq!(panel.pixel(26 + 3, 1 + 4), c);
    }

    #[test]
    fn test_read_pixel_honours_datum() {
        let (mut engine, panel) = ili9341();
        panel.poke(105, 110, RED);
        engine.set_viewport(100, 100, 20, 20, true);
        assert_eq!(engine.read_pixel(5, 10).unwrap(), RED);
        assert_eq!(engine.read_pixel(25, 10).unwrap(), 0);
    }

    #[test]
    fn test_read_rect_then_push_rect() {
        let (mut engine, panel) = ili9341();
        engine.fill_rect(0, 0, 4, 2, RED).unwrap();
        engine.fill_rect(2, 0, 2, 2, BLUE).unwrap();
        let mut buf = [0u16; 8];
        engine.read_rect(0, 0, 4, 2, &mut buf).unwrap();
        assert_eq!(buf, [RED, RED, BLUE, BLUE, RED, RED, BLUE, BLUE]);

        engine.set_swap_bytes(true);
        engine.push_rect(10, 10, 4, 2, &buf).unwrap();
        assert_eq!(panel.region(10, 10, 4, 2), buf.to_vec());
        assert!(engine.swap_bytes());
    }

    #[test]
    fn test_read_rect_clipped_keeps_layout() {
        let (mut engine, panel) = ili9341();
        panel.poke(0, 0, WHITE);
        let mut buf = [0x1111u16; 4];
        engine.read_rect(-1, -1, 2, 2, &mut buf).unwrap();
        assert_eq!(buf, [0x1111, 0x1111, 0x1111, WHITE]);

        let mut short = [0u16; 3];
        assert_eq!(
            engine.read_rect(0, 0, 2, 2, &mut short),
            Err(Fault::BufferTooSmall { needed: 4, available: 3 })
        );
    }

    #[test]
    fn test_read_rect_rgb() {
        let (mut engine, panel) = ili9341();
        panel.poke(1, 0, RED);
        let mut rgb = [0u8; 6];
        engine.read_rect_rgb(0, 0, 2, 1, &mut rgb).unwrap();
        assert_eq!(rgb, [0, 0, 0, 0xFC, 0, 0]);
        assert_eq!(panel.pixel(0, 0), BLACK);
    }

    #[test]
    fn test_read_command_indexed() {
        let (mut engine, panel) = ili9341();
        panel.set_register(0x04, &[0x00, 0x85, 0x85, 0x52]);
        assert_eq!(engine.read_command8(0x04, 1).unwrap(), 0x85);
        assert_eq!(engine.read_command16(0x04, 2).unwrap(), 0x8552);
        assert_eq!(engine.read_command32(0x04, 0).unwrap(), 0x0085_8552);
        assert_eq!(panel.clock_hz(), engine.config().read_hz);
        assert!(!panel.is_selected());
    }
}
