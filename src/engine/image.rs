//! Image blitting
//!
//! Images are row-major pixel buffers placed at a logical position and
//! cropped to the viewport. 16-bit images go out straight from the caller's
//! buffer. Packed formats are decoded a row at a time into a fixed line
//! buffer first, so the widest crop they accept is [`LINE_BUFFER_PIXELS`].
//!
//! Transparent variants split each row into runs of opaque pixels and
//! address one window per run.

use super::RenderEngine;
use crate::color::color8to16;
use crate::error::{ensure_len, RenderResult};
use crate::hal::{ControlPins, Transfer};

/// Widest crop a packed image can be decoded into
pub const LINE_BUFFER_PIXELS: usize = 320;

/// Pixel packing of an 8/4/1 bit image
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImageFormat<'a> {
    /// One byte per pixel, `RRRGGGBB`
    Rgb332,
    /// Two pixels per byte, high nibble first, looked up in a palette. Rows
    /// are padded to a whole byte.
    Indexed4(&'a [u16; 16]),
    /// One bit per pixel, MSB first, drawn in the bitmap colours. Rows are
    /// padded to a whole byte.
    Mono,
}

impl ImageFormat<'_> {
    /// Bytes in one source row of `w` pixels
    fn row_bytes(&self, w: usize) -> usize {
        match self {
            ImageFormat::Rgb332 => w,
            ImageFormat::Indexed4(_) => (w + 1) >> 1,
            ImageFormat::Mono => (w + 7) >> 3,
        }
    }

    /// Raw value of pixel `x` in `row`: the byte, the palette index or the bit
    fn raw(&self, row: &[u8], x: usize) -> u8 {
        match self {
            ImageFormat::Rgb332 => row[x],
            ImageFormat::Indexed4(_) => {
                let b = row[x >> 1];
                if x & 1 == 0 {
                    b >> 4
                } else {
                    b & 0x0F
                }
            }
            ImageFormat::Mono => (row[x >> 3] >> (7 - (x & 7))) & 1,
        }
    }

    fn color(&self, raw: u8, fg: u16, bg: u16) -> u16 {
        match self {
            ImageFormat::Rgb332 => color8to16(raw),
            ImageFormat::Indexed4(palette) => palette[raw as usize & 0x0F],
            ImageFormat::Mono if raw != 0 => fg,
            ImageFormat::Mono => bg,
        }
    }
}

impl<B: Transfer, P: ControlPins> RenderEngine<B, P> {
    /// Draw a `w` x `h` RGB565 image with its top left corner at `(x, y)`.
    /// Words are byte swapped on the way when swap is on.
    pub fn push_image(&mut self, x: i32, y: i32, w: i32, h: i32, data: &[u16]) -> RenderResult<()> {
        let Some(clip) = self.clip_image(x, y, w, h) else {
            return Ok(());
        };
        let stride = w as usize;
        ensure_len(stride * h as usize, data.len())?;

        let start = (clip.dx + clip.dy * w) as usize;
        let (dw, dh) = (clip.dw as usize, clip.dh as usize);
        self.in_write(|e| {
            e.set_window(clip.x, clip.y, clip.x + clip.dw - 1, clip.y + clip.dh - 1)?;
            if dw == stride {
                e.push_pixels(&data[start..start + dw * dh])
            } else {
                for row in data[start..].chunks(stride).take(dh) {
                    e.push_pixels(&row[..dw])?;
                }
                Ok(())
            }
        })
    }

    /// Like [`push_image`](Self::push_image), skipping pixels equal to
    /// `transparent`.
    pub fn push_image_trans(
        &mut self,
        x: i32,
        y: i32,
        w: i32,
        h: i32,
        data: &[u16],
        transparent: u16,
    ) -> RenderResult<()> {
        let Some(clip) = self.clip_image(x, y, w, h) else {
            return Ok(());
        };
        let stride = w as usize;
        ensure_len(stride * h as usize, data.len())?;

        let start = (clip.dx + clip.dy * w) as usize;
        let dw = clip.dw as usize;
        self.in_write(|e| {
            for (py, row) in (clip.y..).zip(data[start..].chunks(stride).take(clip.dh as usize)) {
                let row = &row[..dw];
                let mut i = 0;
                while i < dw {
                    if row[i] == transparent {
                        i += 1;
                        continue;
                    }
                    let run = row[i..].iter().take_while(|&&c| c != transparent).count();
                    let px = clip.x + i as i32;
                    e.set_window(px, py, px + run as i32 - 1, py)?;
                    e.push_pixels(&row[i..i + run])?;
                    i += run;
                }
            }
            Ok(())
        })
    }

    /// Draw a packed image, decoding one row at a time.
    pub fn push_image8(
        &mut self,
        x: i32,
        y: i32,
        w: i32,
        h: i32,
        data: &[u8],
        format: ImageFormat<'_>,
    ) -> RenderResult<()> {
        let Some(clip) = self.clip_image(x, y, w, h) else {
            return Ok(());
        };
        let row_bytes = format.row_bytes(w as usize);
        ensure_len(row_bytes * h as usize, data.len())?;
        let dw = clip.dw as usize;
        ensure_len(dw, LINE_BUFFER_PIXELS)?;

        let (fg, bg) = (self.bitmap_fg, self.bitmap_bg);
        let mut line = [0u16; LINE_BUFFER_PIXELS];
        self.in_write(|e| {
            // Decoded words are native RGB565
            let swap = core::mem::replace(&mut e.swap_bytes, false);
            let result = (|| {
                e.set_window(clip.x, clip.y, clip.x + clip.dw - 1, clip.y + clip.dh - 1)?;
                let rows = data.chunks(row_bytes).skip(clip.dy as usize).take(clip.dh as usize);
                for row in rows {
                    for (i, px) in line[..dw].iter_mut().enumerate() {
                        *px = format.color(format.raw(row, clip.dx as usize + i), fg, bg);
                    }
                    e.push_pixels(&line[..dw])?;
                }
                Ok(())
            })();
            e.swap_bytes = swap;
            result
        })
    }

    /// Like [`push_image8`](Self::push_image8), skipping pixels whose raw
    /// value (byte or palette index) equals `transparent`. A mono image
    /// draws only its set bits, in the bitmap foreground.
    #[allow(clippy::too_many_arguments)]
    pub fn push_image8_trans(
        &mut self,
        x: i32,
        y: i32,
        w: i32,
        h: i32,
        data: &[u8],
        transparent: u8,
        format: ImageFormat<'_>,
    ) -> RenderResult<()> {
        let Some(clip) = self.clip_image(x, y, w, h) else {
            return Ok(());
        };
        let row_bytes = format.row_bytes(w as usize);
        ensure_len(row_bytes * h as usize, data.len())?;
        let dw = clip.dw as usize;
        ensure_len(dw, LINE_BUFFER_PIXELS)?;

        let (fg, bg) = (self.bitmap_fg, self.bitmap_bg);
        let mono = format == ImageFormat::Mono;
        let opaque = |raw: u8| if mono { raw != 0 } else { raw != transparent };

        let mut line = [0u16; LINE_BUFFER_PIXELS];
        self.in_write(|e| {
            let swap = core::mem::replace(&mut e.swap_bytes, false);
            let result = (|| {
                let rows = data.chunks(row_bytes).skip(clip.dy as usize).take(clip.dh as usize);
                for (py, row) in (clip.y..).zip(rows) {
                    let mut n = 0;
                    let mut sx = clip.x;
                    for i in 0..dw {
                        let raw = format.raw(row, clip.dx as usize + i);
                        if opaque(raw) {
                            if n == 0 {
                                sx = clip.x + i as i32;
                            }
                            line[n] = format.color(raw, fg, bg);
                            n += 1;
                        } else if n > 0 {
                            e.flush_run(sx, py, &line[..n], mono)?;
                            n = 0;
                        }
                    }
                    if n > 0 {
                        e.flush_run(sx, py, &line[..n], mono)?;
                    }
                }
                Ok(())
            })();
            e.swap_bytes = swap;
            result
        })
    }

    /// One opaque run of a transparent image. A mono run is a single colour
    /// and goes out as a fill.
    fn flush_run(&mut self, x: i32, y: i32, run: &[u16], solid: bool) -> RenderResult<()> {
        self.set_window(x, y, x + run.len() as i32 - 1, y)?;
        if solid {
            self.push_block(run[0], run.len())
        } else {
            self.push_pixels(run)
        }
    }

    /// Draw the pixels of a 16-bit image whose bit in `mask` is set. Mask
    /// rows are padded to a whole byte with clear bits.
    pub fn push_masked_image(
        &mut self,
        x: i32,
        y: i32,
        w: i32,
        h: i32,
        image: &[u16],
        mask: &[u8],
    ) -> RenderResult<()> {
        if self.vp.oob || w < 1 || h < 1 {
            return Ok(());
        }
        let stride = w as usize;
        let mask_stride = (stride + 7) >> 3;
        ensure_len(stride * h as usize, image.len())?;
        ensure_len(mask_stride * h as usize, mask.len())?;

        self.composite(|e| {
            let rows = image.chunks(stride).zip(mask.chunks(mask_stride));
            for (py, (pixels, bits)) in (y..).zip(rows).take(h as usize) {
                for (start, len) in MaskRuns::new(bits) {
                    if start >= stride {
                        break;
                    }
                    let len = len.min(stride - start);
                    e.push_image(x + start as i32, py, len as i32, 1, &pixels[start..start + len])?;
                }
            }
            Ok(())
        })
    }
}

/// Runs of set bits in one mask row as `(start, len)`. Whole clear or set
/// bytes are consumed without shifting.
struct MaskRuns<'a> {
    bytes: &'a [u8],
    next: usize,
    byte: u8,
    bits: usize,
    x: usize,
}

impl<'a> MaskRuns<'a> {
    fn new(bytes: &'a [u8]) -> Self {
        let mut runs = Self { bytes, next: 0, byte: 0, bits: 0, x: 0 };
        runs.load();
        runs
    }

    fn load(&mut self) -> bool {
        match self.bytes.get(self.next) {
            Some(&b) => {
                self.byte = b;
                self.bits = 8;
                self.next += 1;
                true
            }
            None => {
                self.byte = 0;
                self.bits = 0;
                false
            }
        }
    }

    /// Consume one bit, loading the next byte when this one runs out.
    fn shift(&mut self) -> bool {
        self.byte <<= 1;
        self.x += 1;
        self.bits -= 1;
        self.bits > 0 || self.load()
    }
}

impl Iterator for MaskRuns<'_> {
    type Item = (usize, usize);

    fn next(&mut self) -> Option<Self::Item> {
        while self.byte & 0x80 == 0 {
            if self.byte == 0 {
                self.x += self.bits;
                if !self.load() {
                    return None;
                }
            } else if !self.shift() {
                return None;
            }
        }

        let start = self.x;
        while self.byte & 0x80 != 0 {
            if self.byte == 0xFF && self.bits == 8 {
                self.x += 8;
                if !self.load() {
                    break;
                }
            } else if !self.shift() {
                break;
            }
        }
        Some((start, self.x - start))
    }
}

#[cfg(test)]
mod tests {
    use super::super::testing::*;
    use super::*;
    use crate::color::{BLACK, BLUE, GREEN, RED, WHITE};
    use crate::config::PanelConfig;
    use crate::display::cmd;
    use crate::error::Fault;
    use crate::hal::sim::BusEvent;
    use crate::hal::Stride;

    fn windows(panel: &crate::hal::sim::SimPanel) -> usize {
        panel.commands().iter().filter(|&&c| c == cmd::RAMWR).count()
    }

    #[test]
    fn test_push_image_whole_is_one_block() {
        let (mut engine, panel) = ili9341();
        let img: Vec<u16> = (0..32).collect();
        engine.push_image(10, 20, 8, 4, &img).unwrap();
        assert_eq!(panel.region(10, 20, 8, 4), img);
        assert_eq!(windows(&panel), 1);
        let blocks: Vec<_> = panel
            .events()
            .into_iter()
            .filter(|e| matches!(e, BusEvent::Block { .. }))
            .collect();
        assert_eq!(blocks, vec![BusEvent::Block { count: 32, stride: Stride::Increment, blocking: true }]);
    }

    #[test]
    fn test_push_image_cropped_left_and_top() {
        let (mut engine, panel) = ili9341();
        let img: Vec<u16> = (1..=12).collect();
        engine.push_image(-1, -1, 4, 3, &img).unwrap();
        assert_eq!(panel.region(0, 0, 3, 2), vec![6, 7, 8, 10, 11, 12]);
        assert_eq!(panel.pixel(3, 0), BLACK);
    }

    #[test]
    fn test_push_image_swap_and_short_buffer() {
        let (mut engine, panel) = ili9341();
        engine.set_swap_bytes(true);
        engine.push_image(0, 0, 2, 1, &[0x00F8, 0xE007]).unwrap();
        assert_eq!(panel.region(0, 0, 2, 1), vec![RED, GREEN]);
        assert_eq!(
            engine.push_image(0, 0, 2, 2, &[0; 3]),
            Err(Fault::BufferTooSmall { needed: 4, available: 3 })
        );
    }

    #[test]
    fn test_push_image_trans_runs() {
        let (mut engine, panel) = ili9341();
        let t = 0x1234;
        let img = [RED, t, t, BLUE, BLUE, t, WHITE, WHITE];
        engine.push_image_trans(0, 0, 8, 1, &img, t).unwrap();
        assert_eq!(windows(&panel), 3);
        assert_eq!(panel.region(0, 0, 8, 1), vec![RED, BLACK, BLACK, BLUE, BLUE, BLACK, WHITE, WHITE]);
    }

    #[test]
    fn test_push_image8_rgb332() {
        let (mut engine, panel) = ili9341();
        engine.set_swap_bytes(true);
        engine.push_image8(5, 5, 3, 1, &[0xE0, 0x1C, 0x03], ImageFormat::Rgb332).unwrap();
        assert_eq!(panel.region(5, 5, 3, 1), vec![color8to16(0xE0), color8to16(0x1C), color8to16(0x03)]);
        assert!(engine.swap_bytes());
    }

    #[test]
    fn test_push_image8_indexed_odd_crop() {
        let (mut engine, panel) = ili9341();
        let mut palette = [0u16; 16];
        for (i, c) in palette.iter_mut().enumerate() {
            *c = 0x100 + i as u16;
        }
        // 3 pixels per row, padded to 2 bytes
        let data = [0x12, 0x30, 0x45, 0x60];
        engine.push_image8(-1, 0, 3, 2, &data, ImageFormat::Indexed4(&palette)).unwrap();
        assert_eq!(panel.region(0, 0, 2, 2), vec![0x102, 0x103, 0x105, 0x106]);
    }

    #[test]
    fn test_push_image8_mono_uses_bitmap_colours() {
        let (mut engine, panel) = ili9341();
        engine.set_bitmap_color(GREEN, BLUE);
        engine.push_image8(0, 0, 10, 1, &[0b1010_0000, 0b0100_0000], ImageFormat::Mono).unwrap();
        assert_eq!(
            panel.region(0, 0, 10, 1),
            vec![GREEN, BLUE, GREEN, BLUE, BLUE, BLUE, BLUE, BLUE, BLUE, GREEN]
        );
    }

    #[test]
    fn test_push_image8_trans() {
        let (mut engine, panel) = ili9341();
        engine.push_image8_trans(0, 0, 4, 1, &[0xE0, 0x00, 0x00, 0x03], 0x00, ImageFormat::Rgb332).unwrap();
        assert_eq!(windows(&panel), 2);
        assert_eq!(panel.pixel(1, 0), BLACK);
        assert_eq!(panel.pixel(3, 0), color8to16(0x03));

        panel.clear_events();
        engine.set_bitmap_color(RED, BLACK);
        engine.push_image8_trans(0, 1, 8, 1, &[0b0111_0001], 0, ImageFormat::Mono).unwrap();
        assert_eq!(windows(&panel), 2);
        assert_eq!(panel.region(0, 1, 8, 1), vec![BLACK, RED, RED, RED, BLACK, BLACK, BLACK, RED]);
    }

    #[test]
    fn test_line_buffer_limit() {
        let (mut engine, _) = engine_for(PanelConfig { width: 400, height: 20, ..PanelConfig::ILI9341_240X320 });
        let data = vec![0u8; 400];
        assert_eq!(
            engine.push_image8(0, 0, 400, 1, &data, ImageFormat::Rgb332),
            Err(Fault::BufferTooSmall { needed: 400, available: LINE_BUFFER_PIXELS })
        );
        engine.push_image8(100, 0, 400, 1, &data, ImageFormat::Rgb332).unwrap();
    }

    #[test]
    fn test_mask_runs() {
        let runs: Vec<_> = MaskRuns::new(&[0b0011_1000, 0xFF, 0x80]).collect();
        assert_eq!(runs, vec![(2, 3), (8, 9)]);
        let runs: Vec<_> = MaskRuns::new(&[0x00, 0x01]).collect();
        assert_eq!(runs, vec![(15, 1)]);
        assert_eq!(MaskRuns::new(&[0x00, 0x00]).count(), 0);
    }

    #[test]
    fn test_push_masked_image() {
        let (mut engine, panel) = ili9341();
        let img: Vec<u16> = (1..=20).collect();
        // Two rows of 10, mask 2 bytes each
        let mask = [0b1100_0000, 0b0100_0000, 0b0000_0000, 0b1100_0000];
        engine.push_masked_image(0, 0, 10, 2, &img, &mask).unwrap();
        assert_eq!(panel.region(0, 0, 10, 1), vec![1, 2, 0, 0, 0, 0, 0, 0, 0, 10]);
        assert_eq!(panel.region(0, 1, 10, 1), vec![0, 0, 0, 0, 0, 0, 0, 0, 19, 20]);
        assert_eq!(panel.stats().selects, 1);
    }
}
