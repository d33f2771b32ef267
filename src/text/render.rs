//! Glyph rendering
//!
//! Every glyph kind has a fast path that opens one window over the whole
//! cell and streams it, used when the cell is opaque, unscaled and fully
//! inside the viewport. Otherwise glyphs are drawn as clipped pixels and
//! rectangles inside one bus scope.

use super::{FixedEncoding, FixedFont, FreeFont};
use crate::engine::RenderEngine;
use crate::error::RenderResult;
use crate::hal::{ControlPins, Transfer};

/// Placement of a fixed-font glyph
struct Cell {
    // Logical origin
    x: i32,
    y: i32,
    // Device origin
    xd: i32,
    yd: i32,
    width: i32,
    height: i32,
    size: i32,
    clip: bool,
}

impl<B: Transfer, P: ControlPins> RenderEngine<B, P> {
    /// Draw one character of the GLCD font, or of the selected free font,
    /// at `size` times its natural size. `bg == color` draws only the set
    /// pixels.
    pub fn draw_char(&mut self, x: i32, y: i32, c: u16, color: u16, bg: u16, size: u8) -> RenderResult<()> {
        if self.vp.oob {
            return Ok(());
        }
        let size = size.max(1) as i32;
        match self.text.free {
            Some(font) => self.draw_free_glyph(font, x, y, c, color, size),
            None => self.draw_glcd_char(x, y, c, color, bg, size),
        }
    }

    fn draw_glcd_char(&mut self, x: i32, y: i32, c: u16, color: u16, bg: u16, size: i32) -> RenderResult<()> {
        let Some(font) = self.fonts.glcd() else {
            return Ok(());
        };
        let vp = self.vp;
        let (xd, yd) = (x + vp.x_datum, y + vp.y_datum);
        if xd >= vp.w || yd >= vp.h || xd + 6 * size - 1 < vp.x || yd + 8 * size - 1 < vp.y {
            return Ok(());
        }
        if c > 255 {
            return Ok(());
        }
        let code = if !self.text.cp437 && c > 175 { c + 1 } else { c };
        let cell = font.cell(code);

        let fill_bg = bg != color;
        let clip = xd < vp.x || xd + 6 * size >= vp.w || yd < vp.y || yd + 8 * size >= vp.h;

        if size == 1 && fill_bg && !clip {
            return self.in_write(|e| {
                e.set_window(xd, yd, xd + 5, yd + 7)?;
                for row in 0..8 {
                    for col in cell {
                        e.write16(if col >> row & 1 != 0 { color } else { bg })?;
                    }
                }
                Ok(())
            });
        }

        self.composite(|e| {
            for (i, mut line) in (0i32..).zip(cell) {
                for j in 0..8 {
                    if line & 1 != 0 {
                        if size == 1 {
                            e.draw_pixel(x + i, y + j, color)?;
                        } else {
                            e.fill_rect(x + i * size, y + j * size, size, size, color)?;
                        }
                    } else if fill_bg {
                        e.fill_rect(x + i * size, y + j * size, size, size, bg)?;
                    }
                    line >>= 1;
                }
            }
            Ok(())
        })
    }

    /// Free-font glyph, set pixels only, drawn as horizontal runs
    fn draw_free_glyph(&mut self, font: &FreeFont, x: i32, y: i32, c: u16, color: u16, size: i32) -> RenderResult<()> {
        let Some(glyph) = font.glyph(c) else {
            return Ok(());
        };
        let (w, h) = (glyph.width as i32, glyph.height as i32);
        let (xo, yo) = (glyph.x_offset as i32, glyph.y_offset as i32);
        let mut bits = font.bits(glyph);

        self.composite(|e| {
            let run_out = |e: &mut Self, end: i32, row: i32, run: i32| {
                if size == 1 {
                    e.draw_fast_hline(x + xo + end - run, y + yo + row, run, color)
                } else {
                    e.fill_rect(x + (xo + end - run) * size, y + (yo + row) * size, run * size, size, color)
                }
            };
            for row in 0..h {
                let mut run = 0;
                for col in 0..w {
                    if bits.next().unwrap_or(false) {
                        run += 1;
                    } else if run > 0 {
                        run_out(e, col, row, run)?;
                        run = 0;
                    }
                }
                if run > 0 {
                    run_out(e, w, row, run)?;
                }
            }
            Ok(())
        })
    }

    /// Draw one decoded character in `font` (1 for GLCD or the free font,
    /// 2-8 for fixed fonts) with the text colours and size. Returns the
    /// advance in pixels, 0 when the font lacks the character.
    pub fn draw_char_unicode(&mut self, code: u16, x: i32, y: i32, font: u8) -> RenderResult<i32> {
        if self.vp.oob || code == 0 {
            return Ok(0);
        }
        let size = self.text.size as i32;
        let (fg, bg) = (self.text.fg, self.text.bg);

        if font == 1 {
            self.draw_char(x, y, code, fg, bg, self.text.size)?;
            return Ok(match self.text.free {
                Some(free) => free.glyph(code).map_or(0, |g| g.x_advance as i32 * size),
                None if self.fonts.glcd().is_some() => 6 * size,
                None => 0,
            });
        }

        let Some(fixed) = self.fonts.fixed(font) else {
            return Ok(0);
        };
        let Some((width, data)) = fixed.glyph(code) else {
            return Ok(0);
        };
        let (width, height) = (width as i32, fixed.height as i32);
        let advance = width * size;

        let vp = self.vp;
        let (xd, yd) = (x + vp.x_datum, y + vp.y_datum);
        if (xd + width * size < vp.x || xd >= vp.w) && (yd + height * size < vp.y || yd >= vp.h) {
            return Ok(advance);
        }

        let cell = Cell {
            x,
            y,
            xd,
            yd,
            width,
            height,
            size,
            clip: xd < vp.x || xd + width * size >= vp.w || yd < vp.y || yd + height * size >= vp.h,
        };
        match fixed.encoding {
            FixedEncoding::Bits => self.draw_bits_glyph(&cell, data)?,
            FixedEncoding::Rle => self.draw_rle_glyph(&cell, data)?,
        }
        Ok(advance)
    }

    fn draw_bits_glyph(&mut self, cell: &Cell, data: &[u8]) -> RenderResult<()> {
        let (fg, bg) = (self.text.fg, self.text.bg);
        let stride = ((cell.width + 6) / 8) as usize;
        let row = |i: i32| {
            let at = i as usize * stride;
            data.get(at..at + stride).unwrap_or(&[])
        };

        if fg != bg && cell.size == 1 && !cell.clip {
            return self.in_write(|e| {
                e.set_window(cell.xd, cell.yd, cell.xd + cell.width - 1, cell.yd + cell.height - 1)?;
                for i in 0..cell.height {
                    let mut left = cell.width;
                    for &line in row(i) {
                        let mut mask = 0x80u8;
                        while mask != 0 && left > 0 {
                            e.write16(if line & mask != 0 { fg } else { bg })?;
                            left -= 1;
                            mask >>= 1;
                        }
                    }
                    // Odd widths leave one column past the last byte
                    if left > 0 {
                        e.write16(bg)?;
                    }
                }
                Ok(())
            });
        }

        let size = cell.size;
        self.composite(|e| {
            let mut py = cell.y;
            for i in 0..cell.height {
                if fg != bg {
                    e.fill_rect(cell.x, py, cell.width * size, size, bg)?;
                }
                for (k, &line) in (0i32..).zip(row(i)) {
                    for bit in 0..8 {
                        if line & (0x80 >> bit) == 0 {
                            continue;
                        }
                        let px = cell.x + (k * 8 + bit) * size;
                        if size == 1 {
                            e.draw_pixel(px, py, fg)?;
                        } else {
                            e.fill_rect(px, py, size, size, fg)?;
                        }
                    }
                }
                py += size;
            }
            Ok(())
        })
    }

    fn draw_rle_glyph(&mut self, cell: &Cell, data: &[u8]) -> RenderResult<()> {
        let (fg, bg) = (self.text.fg, self.text.bg);
        let total = cell.width * cell.height;
        let size = cell.size;

        self.composite(|e| {
            e.begin_write();
            if fg == bg && !cell.clip {
                // Transparent: a window per set pixel
                let mut pc = 0;
                for &byte in data {
                    if pc >= total {
                        break;
                    }
                    if byte & 0x80 == 0 {
                        pc += byte as i32 + 1;
                        continue;
                    }
                    let mut px = cell.xd + size * (pc % cell.width);
                    let mut py = cell.yd + size * (pc / cell.width);
                    for _ in 0..=(byte & 0x7F) {
                        pc += 1;
                        e.set_window(px, py, px + size - 1, py + size - 1)?;
                        e.push_block(fg, (size * size) as usize)?;
                        px += size;
                        if px >= cell.xd + cell.width * size {
                            px = cell.xd;
                            py += size;
                        }
                    }
                }
            } else if size == 1 && !cell.clip {
                // Opaque: one window, runs streamed straight in
                e.set_window(cell.xd, cell.yd, cell.xd + cell.width - 1, cell.yd + cell.height - 1)?;
                let mut left = total;
                for &byte in data {
                    if left <= 0 {
                        break;
                    }
                    let run = (byte & 0x7F) as i32 + 1;
                    left -= run;
                    e.push_block(if byte & 0x80 != 0 { fg } else { bg }, run as usize)?;
                }
            } else {
                // Scaled or clipped: runs become rectangles, split at row ends
                let mut pc = 0;
                for &byte in data {
                    if pc >= total {
                        break;
                    }
                    let (color, plot) = if byte & 0x80 != 0 { (fg, true) } else { (bg, fg != bg) };
                    let run = (byte & 0x7F) as i32 + 1;
                    let mut px = pc % cell.width;
                    let mut tx = cell.x + size * px;
                    let mut ty = cell.y + size * (pc / cell.width);
                    let mut pl = 0;
                    pc += run;
                    for _ in 0..run {
                        pl += 1;
                        if px + pl >= cell.width {
                            if plot {
                                e.fill_rect(tx, ty, pl * size, size, color)?;
                            }
                            pl = 0;
                            px = 0;
                            tx = cell.x;
                            ty += size;
                        }
                    }
                    if pl > 0 && plot {
                        e.fill_rect(tx, ty, pl * size, size, color)?;
                    }
                }
            }
            Ok(())
        })
    }

    /// Register fixed font `id` (2-8). Other ids are ignored.
    pub fn load_font(&mut self, id: u8, font: &'static FixedFont) {
        if !self.fonts.set_fixed(id, Some(font)) {
            log::warn!("font id {} out of range 2-8", id);
        }
    }

    /// Replace or remove the GLCD font used as font 1.
    pub fn set_glcd_font(&mut self, font: Option<&'static super::GlcdFont>) {
        self.fonts.set_glcd(font);
    }

    /// Bit N set when font N can be drawn; bit 15 for free fonts
    pub fn fonts_loaded(&self) -> u16 {
        self.fonts.loaded()
    }
}
