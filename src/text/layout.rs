//! Text settings, measurement and string layout

use core::fmt::{self, Write as _};

use log::warn;

use super::{code_points, Align, Attribute, Datum, FixedEncoding, FreeFont, Row};
use crate::engine::RenderEngine;
use crate::error::RenderResult;
use crate::hal::{ControlPins, Transfer};

/// Largest text size multiplier
pub const MAX_TEXT_SIZE: u8 = 7;

/// Most decimal places `draw_float` prints
const MAX_DECIMALS: u8 = 7;

/// Formatted number, long enough for any i32 or `draw_float` output
struct NumText {
    bytes: [u8; 24],
    len: usize,
}

impl NumText {
    fn new() -> Self {
        Self { bytes: [0; 24], len: 0 }
    }

    fn as_str(&self) -> &str {
        core::str::from_utf8(&self.bytes[..self.len]).unwrap_or("")
    }
}

impl fmt::Write for NumText {
    fn write_str(&mut self, s: &str) -> fmt::Result {
        let end = self.len + s.len();
        self.bytes
            .get_mut(self.len..end)
            .ok_or(fmt::Error)?
            .copy_from_slice(s.as_bytes());
        self.len = end;
        Ok(())
    }
}

/// Render `value` with `dp` decimals the way `draw_float` prints it: at most
/// seven decimals, digits capped so the total stays under nine, "..." when
/// the integer part does not fit 31 bits.
fn format_float(value: f32, dp: u8) -> NumText {
    let dp = dp.min(MAX_DECIMALS);
    let mut out = NumText::new();
    let mut rounding = 0.5f32;
    for _ in 0..dp {
        rounding /= 10.0;
    }

    let mut v = value;
    let mut digits = 1;
    let negative = v < -rounding;
    if negative {
        out.bytes[0] = b'-';
        out.len = 1;
        digits = 0;
        v = -v;
    }
    v += rounding;

    // Writes below cannot overflow the buffer
    if dp == 0 {
        out.len = 0;
        let n = if negative { -v } else { v };
        let _ = write!(out, "{}", n as i32);
        return out;
    }
    if v >= 2_147_483_647.0 {
        out.len = 0;
        let _ = out.write_str("...");
        return out;
    }

    let int = v as u32;
    let _ = write!(out, "{}", int);
    digits += out.len as i32;
    let _ = out.write_char('.');

    let mut frac = v - int as f32;
    let mut decimals = 0;
    while decimals < dp && digits < 9 {
        decimals += 1;
        frac *= 10.0;
        let d = (frac as u32).min(9);
        let _ = out.write_char(char::from(b'0' + d as u8));
        digits += 1;
        frac -= d as f32;
    }
    if decimals == 0 {
        let _ = out.write_char('0');
    }
    out
}

impl<B: Transfer, P: ControlPins> RenderEngine<B, P> {
    pub fn set_cursor(&mut self, x: i32, y: i32) {
        self.text.cursor_x = x;
        self.text.cursor_y = y;
    }

    /// Move the cursor and select `font` for the print stream.
    pub fn set_cursor_font(&mut self, x: i32, y: i32, font: u8) {
        self.set_text_font(font);
        self.set_cursor(x, y);
    }

    pub fn cursor(&self) -> (i32, i32) {
        (self.text.cursor_x, self.text.cursor_y)
    }

    /// Text size multiplier, 1 to 7
    pub fn set_text_size(&mut self, size: u8) {
        self.text.size = size.clamp(1, MAX_TEXT_SIZE);
    }

    pub fn text_size(&self) -> u8 {
        self.text.size
    }

    /// Text colour with no background: only set pixels are drawn.
    pub fn set_text_color(&mut self, color: u16) {
        self.text.fg = color;
        self.text.bg = color;
    }

    pub fn set_text_color_bg(&mut self, fg: u16, bg: u16) {
        self.text.fg = fg;
        self.text.bg = bg;
    }

    pub fn text_color(&self) -> (u16, u16) {
        (self.text.fg, self.text.bg)
    }

    /// Wrap the print stream at the right edge, and back to the top once
    /// past the bottom.
    pub fn set_text_wrap(&mut self, wrap_x: bool, wrap_y: bool) {
        self.text.wrap_x = wrap_x;
        self.text.wrap_y = wrap_y;
    }

    pub fn set_text_datum(&mut self, datum: Datum) {
        self.text.datum = datum;
    }

    pub fn text_datum(&self) -> Datum {
        self.text.datum
    }

    /// Minimum width strings are blanked to when drawn with a background
    pub fn set_text_padding(&mut self, width: u16) {
        self.text.padding = width as i32;
    }

    pub fn text_padding(&self) -> u16 {
        self.text.padding as u16
    }

    /// Select font `font` for the print stream. 0 means 1. Drops any free
    /// font.
    pub fn set_text_font(&mut self, font: u8) {
        self.text.font = font.max(1);
        self.text.free = None;
    }

    pub fn text_font(&self) -> u8 {
        self.text.font
    }

    /// Select a free font as font 1, or go back to the GLCD font with
    /// `None`.
    pub fn set_free_font(&mut self, font: Option<&'static FreeFont>) {
        self.text.font = 1;
        self.text.free = font;
        (self.text.ascent, self.text.descent) = font.map_or((0, 0), FreeFont::extents);
    }

    pub fn free_font(&self) -> Option<&'static FreeFont> {
        self.text.free
    }

    pub fn set_attribute(&mut self, attribute: Attribute, on: bool) {
        match attribute {
            Attribute::Cp437 => self.text.cp437 = on,
            Attribute::Utf8 => self.text.decoder.set_enabled(on),
        }
    }

    pub fn attribute(&self, attribute: Attribute) -> bool {
        match attribute {
            Attribute::Cp437 => self.text.cp437,
            Attribute::Utf8 => self.text.decoder.enabled(),
        }
    }

    /// Width of `text` in `font` at the current size
    pub fn text_width(&self, text: &str, font: u8) -> i32 {
        self.measure(text, font, false)
    }

    /// `digits` measures the last free-font glyph by its advance so that
    /// numbers of equal length line up.
    fn measure(&self, text: &str, font: u8, digits: bool) -> i32 {
        let width: i32 = if (2..=8).contains(&font) {
            match self.fonts.fixed(font) {
                // Bytes outside the font count as spaces
                Some(fixed) => text
                    .bytes()
                    .map(|b| fixed.width(b as u16).or_else(|| fixed.width(0x20)).unwrap_or(0) as i32)
                    .sum(),
                None => 0,
            }
        } else if let Some(free) = self.text.free {
            let mut total = 0;
            let mut codes = code_points(text.as_bytes(), self.text.decoder.enabled()).peekable();
            while let Some(code) = codes.next() {
                let Some(glyph) = free.glyph(code) else {
                    continue;
                };
                if codes.peek().is_some() || digits {
                    total += glyph.x_advance as i32;
                } else {
                    // The last glyph can reach past its advance
                    total += glyph.x_offset as i32 + glyph.width as i32;
                }
            }
            total
        } else if self.fonts.glcd().is_some() {
            6 * text.len() as i32
        } else {
            0
        };
        width * self.text.size as i32
    }

    /// Line height of `font` at the current size
    pub fn font_height(&self, font: u8) -> i32 {
        let size = self.text.size as i32;
        match (font, self.text.free) {
            (1, Some(free)) => free.y_advance as i32 * size,
            (1, None) => 8 * size,
            (id, _) => self.fonts.fixed(id).map_or(0, |f| f.height as i32 * size),
        }
    }

    /// Draw `text` anchored at `(x, y)` by the text datum. Returns the
    /// width drawn.
    pub fn draw_string(&mut self, text: &str, x: i32, y: i32, font: u8) -> RenderResult<i32> {
        self.draw_text(text, x, y, font, false)
    }

    /// Draw `text` centred on `x`, whatever the datum.
    pub fn draw_centre_string(&mut self, text: &str, x: i32, y: i32, font: u8) -> RenderResult<i32> {
        self.with_datum(Datum::TopCentre, |e| e.draw_string(text, x, y, font))
    }

    /// Draw `text` ending at `x`, whatever the datum.
    pub fn draw_right_string(&mut self, text: &str, x: i32, y: i32, font: u8) -> RenderResult<i32> {
        self.with_datum(Datum::TopRight, |e| e.draw_string(text, x, y, font))
    }

    fn with_datum<T>(&mut self, datum: Datum, f: impl FnOnce(&mut Self) -> T) -> T {
        let saved = core::mem::replace(&mut self.text.datum, datum);
        let out = f(self);
        self.text.datum = saved;
        out
    }

    pub fn draw_number(&mut self, n: i32, x: i32, y: i32, font: u8) -> RenderResult<i32> {
        let mut out = NumText::new();
        let _ = write!(out, "{}", n);
        self.draw_text(out.as_str(), x, y, font, true)
    }

    /// Draw `value` with `dp` decimal places (at most 7). Values too large
    /// for 31 bits print as "...".
    pub fn draw_float(&mut self, value: f32, dp: u8, x: i32, y: i32, font: u8) -> RenderResult<i32> {
        let out = format_float(value, dp);
        self.draw_text(out.as_str(), x, y, font, true)
    }

    fn draw_text(&mut self, text: &str, x: i32, y: i32, font: u8, digits: bool) -> RenderResult<i32> {
        let size = self.text.size as i32;
        let (fg, bg) = (self.text.fg, self.text.bg);
        let datum = self.text.datum;
        let free = if font == 1 { self.text.free } else { None };
        let (ascent, descent) = (self.text.ascent * size, self.text.descent * size);

        let mut width = self.measure(text, font, digits);
        let mut height = 8 * size;
        let mut baseline = 0;
        let (mut px, mut py) = (x, y);

        if free.is_some() {
            // Free fonts draw from the baseline
            height = ascent;
            py += height;
            baseline = height;
            if datum.row() == Row::Bottom {
                height += descent;
            }
        }
        if font != 1 {
            baseline = self.fonts.fixed(font).map_or(0, |f| f.baseline as i32 * size);
            height = self.font_height(font);
        }

        let align = datum.align();
        px -= match align {
            Align::Left => 0,
            Align::Centre => width / 2,
            Align::Right => width,
        };
        py -= match datum.row() {
            Row::Top => 0,
            Row::Middle => height / 2,
            Row::Bottom => height,
            Row::Baseline => baseline,
        };

        let utf8 = self.text.decoder.enabled();
        let mut x_offset = 0;
        if let Some(free) = free.filter(|_| fg != bg) {
            height = ascent + descent;
            let first = code_points(text.as_bytes(), utf8).find(|&c| c != 0);
            if let Some(glyph) = first.and_then(|c| free.glyph(c)) {
                // Widen left for a first glyph that starts behind the cursor
                x_offset = (glyph.x_offset as i32 * size).min(0);
                width -= x_offset;
                self.fill_rect(px + x_offset, py - ascent, width, height, bg)?;
            }
        }

        let mut drawn = 0;
        for code in code_points(text.as_bytes(), utf8) {
            drawn += self.draw_char_unicode(code, px + drawn, py, font)?;
        }

        let pad = self.text.padding;
        if pad > width && fg != bg {
            let mut pad_x = px + width + x_offset;
            if free.is_some() {
                px += x_offset;
                py -= ascent;
            }
            match align {
                Align::Left => self.fill_rect(pad_x, py, pad - width, height, bg)?,
                Align::Centre => {
                    let half = (pad - width) >> 1;
                    self.fill_rect(pad_x, py, half, height, bg)?;
                    self.fill_rect(px - half, py, half, height, bg)?;
                }
                Align::Right => {
                    pad_x = pad_x.min(pad);
                    self.fill_rect(px + width - pad_x, py, pad_x - width, height, bg)?;
                }
            }
        }

        Ok(drawn)
    }

    /// Print one byte at the cursor, decoding UTF-8 when enabled. `\n`
    /// starts a new line, `\r` is ignored. Wraps at the right edge when
    /// wrapping is on.
    pub fn write_byte(&mut self, byte: u8) -> RenderResult<()> {
        if self.vp.oob {
            return Ok(());
        }
        let code = self.text.decoder.decode(byte);
        if code == 0 || byte == b'\r' {
            return Ok(());
        }
        let size = self.text.size as i32;
        match self.text.free {
            Some(free) => self.print_free(free, byte, code, size),
            None => self.print_fixed(byte, code, size),
        }
    }

    fn print_fixed(&mut self, byte: u8, code: u16, size: i32) -> RenderResult<()> {
        let font = self.text.font;
        // A newline is sized as a space
        let code = if code == b'\n' as u16 { 0x20 } else { code };

        let (width, height) = if font == 1 {
            if self.fonts.glcd().is_none() {
                return Ok(());
            }
            (6, 8)
        } else {
            let Some(fixed) = self.fonts.fixed(font) else {
                return Ok(());
            };
            let Some(w) = fixed.width(code) else {
                return Ok(());
            };
            let w = w as i32;
            let w = match fixed.encoding {
                // Drawn in whole bytes
                FixedEncoding::Bits => (w + 6) / 8 * 8,
                FixedEncoding::Rle => w,
            };
            (w, fixed.height as i32)
        };
        let height = height * size;

        if byte == b'\n' {
            self.text.cursor_y += height;
            self.text.cursor_x = 0;
            return Ok(());
        }
        if self.text.wrap_x && self.text.cursor_x + width * size > self.width() {
            self.text.cursor_y += height;
            self.text.cursor_x = 0;
        }
        if self.text.wrap_y && self.text.cursor_y >= self.height() {
            self.text.cursor_y = 0;
        }
        let (x, y) = (self.text.cursor_x, self.text.cursor_y);
        self.text.cursor_x += self.draw_char_unicode(code, x, y, font)?;
        Ok(())
    }

    fn print_free(&mut self, free: &'static FreeFont, byte: u8, code: u16, size: i32) -> RenderResult<()> {
        let line = free.y_advance as i32 * size;
        if byte == b'\n' {
            self.text.cursor_x = 0;
            self.text.cursor_y += line;
            return Ok(());
        }
        let Some(&glyph) = free.glyph(code) else {
            return Ok(());
        };
        if glyph.width > 0 && glyph.height > 0 {
            let right = glyph.x_offset as i32 + glyph.width as i32;
            if self.text.wrap_x && self.text.cursor_x + size * right > self.width() {
                self.text.cursor_x = 0;
                self.text.cursor_y += line;
            }
            if self.text.wrap_y && self.text.cursor_y >= self.height() {
                self.text.cursor_y = 0;
            }
            let (x, y) = (self.text.cursor_x, self.text.cursor_y);
            let (fg, bg) = (self.text.fg, self.text.bg);
            self.draw_char(x, y, code, fg, bg, self.text.size)?;
        }
        self.text.cursor_x += glyph.x_advance as i32 * size;
        Ok(())
    }
}

/// Print through `write!`. Bus faults surface as [`fmt::Error`].
impl<B: Transfer, P: ControlPins> fmt::Write for RenderEngine<B, P> {
    fn write_str(&mut self, s: &str) -> fmt::Result {
        for byte in s.bytes() {
            self.write_byte(byte).map_err(|err| {
                warn!("print: {}", err);
                fmt::Error
            })?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use core::fmt::Write;

    use super::super::test_fonts;
    use super::*;
    use crate::color::{BLACK, BLUE, RED, WHITE};
    use crate::engine::testing::*;
    use crate::hal::sim::SimPanel;

    /// Leftmost and rightmost x in row `y` that differ from `bg`
    fn extent(panel: &SimPanel, y: usize, bg: u16) -> Option<(usize, usize)> {
        let row = panel.region(0, y, 240, 1);
        let first = row.iter().position(|&c| c != bg)?;
        let last = row.iter().rposition(|&c| c != bg)?;
        Some((first, last))
    }

    #[test]
    fn test_format_float() {
        assert_eq!(format_float(3.14159, 2).as_str(), "3.14");
        assert_eq!(format_float(-2.5, 1).as_str(), "-2.5");
        assert_eq!(format_float(-0.004, 2).as_str(), "0.00");
        assert_eq!(format_float(-1.5, 0).as_str(), "-2");
        assert_eq!(format_float(2.5, 9).as_str(), "2.5000000");
        assert_eq!(format_float(1234567.0, 3).as_str(), "1234567.0");
        assert_eq!(format_float(3.0e9, 1).as_str(), "...");
    }

    #[test]
    fn test_right_datum_shifts_by_width() {
        let (mut engine, panel) = ili9341();
        panel.fill(BLUE);
        engine.set_text_color_bg(WHITE, RED);
        let width = engine.text_width("12", 1);
        assert_eq!(width, 12);

        engine.draw_string("12", 100, 50, 1).unwrap();
        let (tl, _) = extent(&panel, 50, BLUE).unwrap();

        panel.fill(BLUE);
        engine.set_text_datum(Datum::TopRight);
        engine.draw_string("12", 100, 50, 1).unwrap();
        let (tr, _) = extent(&panel, 50, BLUE).unwrap();
        assert_eq!(tl - tr, width as usize);
        assert_eq!((tl, tr), (100, 88));
    }

    #[test]
    fn test_middle_and_baseline_datums() {
        let (mut engine, panel) = ili9341();
        engine.load_font(4, &test_fonts::RLE);
        engine.set_text_color_bg(WHITE, RED);

        engine.set_text_datum(Datum::MiddleCentre);
        assert_eq!(engine.draw_string("00", 50, 50, 4).unwrap(), 12);
        // 12 wide, 4 high: top-left lands at (44, 48)
        assert_eq!(panel.pixel(44, 48), WHITE);
        assert_eq!(panel.pixel(43, 48), BLACK);
        assert_eq!(panel.pixel(44, 47), BLACK);

        engine.set_text_datum(Datum::LeftBaseline);
        engine.draw_string("0", 10, 10, 4).unwrap();
        // Baseline is row 3
        assert_eq!(panel.pixel(10, 7), WHITE);
        assert_eq!(panel.pixel(10, 6), BLACK);

        engine.set_text_datum(Datum::BottomLeft);
        engine.draw_string("0", 10, 30, 4).unwrap();
        assert_eq!(panel.pixel(10, 26), WHITE);
        assert_eq!(panel.pixel(10, 30), BLACK);
    }

    #[test]
    fn test_padding_left_centre_right() {
        let (mut engine, panel) = ili9341();
        panel.fill(BLUE);
        engine.set_text_color_bg(WHITE, RED);
        engine.set_text_padding(30);
        engine.draw_string("1", 10, 0, 1).unwrap();
        assert_eq!(extent(&panel, 0, BLUE), Some((10, 39)));

        panel.fill(BLUE);
        engine.set_text_datum(Datum::TopCentre);
        engine.draw_string("1", 100, 0, 1).unwrap();
        // 6 wide text at 97, 12 blanked either side
        assert_eq!(extent(&panel, 0, BLUE), Some((85, 114)));

        panel.fill(BLUE);
        engine.set_text_datum(Datum::TopRight);
        engine.draw_string("1", 100, 0, 1).unwrap();
        assert_eq!(extent(&panel, 0, BLUE), Some((70, 99)));

        // No padding without a background
        panel.fill(BLUE);
        engine.set_text_color(WHITE);
        engine.set_text_datum(Datum::TopLeft);
        engine.draw_string("1", 10, 0, 1).unwrap();
        let (_, last) = extent(&panel, 1, BLUE).unwrap();
        assert!(last < 16);
    }

    #[test]
    fn test_free_font_layout() {
        let (mut engine, panel) = ili9341();
        engine.set_free_font(Some(&test_fonts::FREE));
        assert_eq!(engine.font_height(1), 6);
        // 'A' advances 4, last 'B' measures offset + width = 1
        assert_eq!(engine.text_width("AB", 1), 5);

        panel.fill(BLUE);
        engine.set_text_color_bg(WHITE, RED);
        let drawn = engine.draw_string("AB", 20, 20, 1).unwrap();
        assert_eq!(drawn, 7);
        // Top-left datum: ascent 4 puts the baseline at y 24
        assert_eq!(panel.pixel(21, 20), WHITE);
        // Background box spans ascent + descent
        assert_eq!(panel.pixel(20, 20), RED);
        assert_eq!(panel.pixel(20, 25), RED);
        assert_eq!(panel.pixel(20, 26), BLUE);
        assert_eq!(panel.pixel(20, 19), BLUE);

        engine.set_free_font(None);
        assert_eq!(engine.font_height(1), 8);
        assert!(engine.free_font().is_none());
    }

    #[test]
    fn test_number_and_float() {
        let (mut engine, _) = ili9341();
        assert_eq!(engine.draw_number(-42, 0, 0, 1).unwrap(), 18);
        assert_eq!(engine.draw_float(3.14159, 2, 0, 10, 1).unwrap(), 24);
        assert_eq!(engine.draw_float(1.0e12, 2, 0, 20, 1).unwrap(), 18);
    }

    #[test]
    fn test_print_stream_wraps() {
        let (mut engine, _) = ili9341();
        engine.set_cursor(235, 0);
        engine.write_byte(b'A').unwrap();
        assert_eq!(engine.cursor(), (6, 8));
        engine.write_byte(b'\r').unwrap();
        assert_eq!(engine.cursor(), (6, 8));
        engine.write_byte(b'\n').unwrap();
        assert_eq!(engine.cursor(), (0, 16));

        engine.set_text_wrap(false, false);
        engine.set_cursor(235, 0);
        engine.write_byte(b'A').unwrap();
        assert_eq!(engine.cursor(), (241, 0));

        engine.set_text_wrap(true, true);
        engine.set_cursor(0, 320);
        engine.write_byte(b'A').unwrap();
        assert_eq!(engine.cursor(), (6, 0));
    }

    #[test]
    fn test_print_decodes_utf8_and_formats() {
        let (mut engine, panel) = ili9341();
        engine.set_cursor(0, 0);
        write!(engine, "é").unwrap();
        assert_eq!(engine.cursor(), (6, 0));
        write!(engine, "{}", 12).unwrap();
        assert_eq!(engine.cursor(), (18, 0));
        assert!(panel.count_not(BLACK) > 0);

        engine.set_attribute(Attribute::Utf8, false);
        assert!(!engine.attribute(Attribute::Utf8));
        write!(engine, "é").unwrap();
        assert_eq!(engine.cursor(), (30, 0));
    }

    #[test]
    fn test_print_with_free_font() {
        let (mut engine, _) = ili9341();
        engine.set_free_font(Some(&test_fonts::FREE));
        engine.set_text_size(2);
        engine.set_cursor(0, 30);
        engine.write_byte(b'A').unwrap();
        assert_eq!(engine.cursor(), (8, 30));
        // Not in the font
        engine.write_byte(b'Z').unwrap();
        assert_eq!(engine.cursor(), (8, 30));
        engine.write_byte(b'\n').unwrap();
        assert_eq!(engine.cursor(), (0, 42));
    }

    #[test]
    fn test_settings() {
        let (mut engine, _) = ili9341();
        engine.set_text_size(0);
        assert_eq!(engine.text_size(), 1);
        engine.set_text_size(9);
        assert_eq!(engine.text_size(), 7);
        engine.set_text_font(0);
        assert_eq!(engine.text_font(), 1);
        engine.set_cursor_font(3, 4, 2);
        assert_eq!((engine.cursor(), engine.text_font()), ((3, 4), 2));
        engine.set_text_padding(40);
        assert_eq!(engine.text_padding(), 40);
        engine.set_attribute(Attribute::Cp437, true);
        assert!(engine.attribute(Attribute::Cp437));

        engine.set_text_datum(Datum::BottomRight);
        engine.draw_centre_string("x", 50, 50, 1).unwrap();
        assert_eq!(engine.text_datum(), Datum::BottomRight);
        assert_eq!(engine.fonts_loaded() & 0x0002, 0x0002);
    }
}
