//! Vector primitives
//!
//! Lines, rectangles, circles, ellipses, triangles and 1-bit bitmaps. The
//! leaves (`draw_fast_hline`, `draw_fast_vline`, `fill_rect`) clip and
//! address one window each; everything else is a composite of leaves and
//! holds the bus for its whole duration.

use bitflags::bitflags;

use super::RenderEngine;
use crate::color::alpha_blend;
use crate::error::{ensure_len, RenderResult};
use crate::hal::{ControlPins, Transfer};

bitflags! {
    /// Corner selection for the circle helpers
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct Corners: u8 {
        const TOP_LEFT = 0x01;
        const TOP_RIGHT = 0x02;
        const BOTTOM_RIGHT = 0x04;
        const BOTTOM_LEFT = 0x08;

        const TOP = Self::TOP_LEFT.bits() | Self::TOP_RIGHT.bits();
        const BOTTOM = Self::BOTTOM_LEFT.bits() | Self::BOTTOM_RIGHT.bits();
    }
}

impl<B: Transfer, P: ControlPins> RenderEngine<B, P> {
    /// Fill a device-space rectangle that is already clipped.
    pub(crate) fn fill_device(&mut self, x: i32, y: i32, w: i32, h: i32, color: u16) -> RenderResult<()> {
        self.in_write(|e| {
            e.set_window(x, y, x + w - 1, y + h - 1)?;
            e.push_block(color, (w * h) as usize)
        })
    }

    pub fn draw_fast_vline(&mut self, x: i32, y: i32, h: i32, color: u16) -> RenderResult<()> {
        let vp = self.vp;
        if vp.oob {
            return Ok(());
        }
        let (x, mut y, mut h) = (x.saturating_add(vp.x_datum), y.saturating_add(vp.y_datum), h);
        if x < vp.x || x >= vp.w || y >= vp.h {
            return Ok(());
        }
        if y < vp.y {
            h = h.saturating_sub(vp.y.saturating_sub(y));
            y = vp.y;
        }
        if h > vp.h - y {
            h = vp.h - y;
        }
        if h < 1 {
            return Ok(());
        }
        self.fill_device(x, y, 1, h, color)
    }

    pub fn draw_fast_hline(&mut self, x: i32, y: i32, w: i32, color: u16) -> RenderResult<()> {
        let vp = self.vp;
        if vp.oob {
            return Ok(());
        }
        let (mut x, y, mut w) = (x.saturating_add(vp.x_datum), y.saturating_add(vp.y_datum), w);
        if y < vp.y || x >= vp.w || y >= vp.h {
            return Ok(());
        }
        if x < vp.x {
            w = w.saturating_sub(vp.x.saturating_sub(x));
            x = vp.x;
        }
        if w > vp.w - x {
            w = vp.w - x;
        }
        if w < 1 {
            return Ok(());
        }
        self.fill_device(x, y, w, 1, color)
    }

    pub fn fill_rect(&mut self, x: i32, y: i32, w: i32, h: i32, color: u16) -> RenderResult<()> {
        match self.clip_addr_window(x, y, w, h) {
            Some((x, y, w, h)) => self.fill_device(x, y, w, h, color),
            None => Ok(()),
        }
    }

    /// Fill the whole logical surface, ignoring any viewport datum size.
    pub fn fill_screen(&mut self, color: u16) -> RenderResult<()> {
        self.fill_rect(0, 0, self.width, self.height, color)
    }

    /// Rectangle shading from `color1` at the top to `color2` at the bottom.
    pub fn fill_rect_v_gradient(
        &mut self,
        x: i32,
        y: i32,
        w: i32,
        h: i32,
        color1: u16,
        color2: u16,
    ) -> RenderResult<()> {
        let Some((x, y, w, h)) = self.clip_addr_window(x, y, w, h) else {
            return Ok(());
        };
        let delta = -255.0 / h as f32;
        self.composite(|e| {
            let mut alpha = 255.0f32;
            let mut color = color1;
            for row in 0..h {
                e.fill_device(x, y + row, w, 1, color)?;
                alpha += delta;
                color = alpha_blend(alpha as u8, color1, color2);
            }
            Ok(())
        })
    }

    /// Rectangle shading from `color1` on the left to `color2` on the right.
    pub fn fill_rect_h_gradient(
        &mut self,
        x: i32,
        y: i32,
        w: i32,
        h: i32,
        color1: u16,
        color2: u16,
    ) -> RenderResult<()> {
        let Some((x, y, w, h)) = self.clip_addr_window(x, y, w, h) else {
            return Ok(());
        };
        let delta = -255.0 / w as f32;
        self.composite(|e| {
            let mut alpha = 255.0f32;
            let mut color = color1;
            for col in 0..w {
                e.fill_device(x + col, y, 1, h, color)?;
                alpha += delta;
                color = alpha_blend(alpha as u8, color1, color2);
            }
            Ok(())
        })
    }

    /// Bresenham line, emitted as horizontal or vertical runs.
    pub fn draw_line(&mut self, x0: i32, y0: i32, x1: i32, y1: i32, color: u16) -> RenderResult<()> {
        if self.vp.oob {
            return Ok(());
        }
        let (mut x0, mut y0, mut x1, mut y1) = (x0, y0, x1, y1);
        let steep = (y1 - y0).abs() > (x1 - x0).abs();
        if steep {
            core::mem::swap(&mut x0, &mut y0);
            core::mem::swap(&mut x1, &mut y1);
        }
        if x0 > x1 {
            core::mem::swap(&mut x0, &mut x1);
            core::mem::swap(&mut y0, &mut y1);
        }

        let dx = x1 - x0;
        let dy = (y1 - y0).abs();
        let ystep = if y0 < y1 { 1 } else { -1 };

        self.composite(|e| {
            let mut err = dx >> 1;
            let mut xs = x0;
            let mut dlen = 0;
            let mut y = y0;
            // Runs are along x in the (possibly transposed) frame
            let run = |e: &mut Self, start: i32, row: i32, len: i32| -> RenderResult<()> {
                match (steep, len) {
                    (true, 1) => e.draw_pixel(row, start, color),
                    (true, _) => e.draw_fast_vline(row, start, len, color),
                    (false, 1) => e.draw_pixel(start, row, color),
                    (false, _) => e.draw_fast_hline(start, row, len, color),
                }
            };
            for x in x0..=x1 {
                dlen += 1;
                err -= dy;
                if err < 0 {
                    run(e, xs, y, dlen)?;
                    dlen = 0;
                    y += ystep;
                    xs = x + 1;
                    err += dx;
                }
            }
            if dlen > 0 {
                run(e, xs, y, dlen)?;
            }
            Ok(())
        })
    }

    pub fn draw_rect(&mut self, x: i32, y: i32, w: i32, h: i32, color: u16) -> RenderResult<()> {
        self.composite(|e| {
            e.draw_fast_hline(x, y, w, color)?;
            e.draw_fast_hline(x, y + h - 1, w, color)?;
            // Corners already drawn
            e.draw_fast_vline(x, y + 1, h - 2, color)?;
            e.draw_fast_vline(x + w - 1, y + 1, h - 2, color)
        })
    }

    /// Midpoint circle outline, octant runs emitted as lines.
    pub fn draw_circle(&mut self, x0: i32, y0: i32, r: i32, color: u16) -> RenderResult<()> {
        if r <= 0 {
            return Ok(());
        }
        self.composite(|e| {
            let mut r = r;
            let mut f = 1 - r;
            let mut ddf_y = -2 * r;
            let mut ddf_x = 1;
            let mut xs = -1;
            let mut xe = 0;
            let mut first = true;

            loop {
                while f < 0 {
                    xe += 1;
                    ddf_x += 2;
                    f += ddf_x;
                }
                ddf_y += 2;
                f += ddf_y;

                if xe - xs > 1 {
                    if first {
                        let len = 2 * (xe - xs) - 1;
                        e.draw_fast_hline(x0 - xe, y0 + r, len, color)?;
                        e.draw_fast_hline(x0 - xe, y0 - r, len, color)?;
                        e.draw_fast_vline(x0 + r, y0 - xe, len, color)?;
                        e.draw_fast_vline(x0 - r, y0 - xe, len, color)?;
                        first = false;
                    } else {
                        let len = xe - xs;
                        xs += 1;
                        e.draw_fast_hline(x0 - xe, y0 + r, len, color)?;
                        e.draw_fast_hline(x0 - xe, y0 - r, len, color)?;
                        e.draw_fast_hline(x0 + xs, y0 - r, len, color)?;
                        e.draw_fast_hline(x0 + xs, y0 + r, len, color)?;

                        e.draw_fast_vline(x0 + r, y0 + xs, len, color)?;
                        e.draw_fast_vline(x0 + r, y0 - xe, len, color)?;
                        e.draw_fast_vline(x0 - r, y0 - xe, len, color)?;
                        e.draw_fast_vline(x0 - r, y0 + xs, len, color)?;
                    }
                } else {
                    xs += 1;
                    e.draw_pixel(x0 - xe, y0 + r, color)?;
                    e.draw_pixel(x0 - xe, y0 - r, color)?;
                    e.draw_pixel(x0 + xs, y0 - r, color)?;
                    e.draw_pixel(x0 + xs, y0 + r, color)?;

                    e.draw_pixel(x0 + r, y0 + xs, color)?;
                    e.draw_pixel(x0 + r, y0 - xe, color)?;
                    e.draw_pixel(x0 - r, y0 - xe, color)?;
                    e.draw_pixel(x0 - r, y0 + xs, color)?;
                }
                xs = xe;
                r -= 1;
                if xe >= r {
                    break;
                }
            }
            Ok(())
        })
    }

    /// Quarter circle outlines for the corners in `corners`.
    pub fn draw_circle_helper(
        &mut self,
        x0: i32,
        y0: i32,
        r: i32,
        corners: Corners,
        color: u16,
    ) -> RenderResult<()> {
        if r <= 0 {
            return Ok(());
        }
        self.composite(|e| {
            let mut rr = r;
            let mut f = 1 - rr;
            let mut ddf_x = 1;
            let mut ddf_y = -2 * rr;
            let mut xe = 0;
            let mut xs = 0;

            loop {
                while f < 0 {
                    xe += 1;
                    ddf_x += 2;
                    f += ddf_x;
                }
                ddf_y += 2;
                f += ddf_y;

                if xe - xs == 1 {
                    if corners.contains(Corners::TOP_LEFT) {
                        e.draw_pixel(x0 - xe, y0 - rr, color)?;
                        e.draw_pixel(x0 - rr, y0 - xe, color)?;
                    }
                    if corners.contains(Corners::TOP_RIGHT) {
                        e.draw_pixel(x0 + rr, y0 - xe, color)?;
                        e.draw_pixel(x0 + xs + 1, y0 - rr, color)?;
                    }
                    if corners.contains(Corners::BOTTOM_RIGHT) {
                        e.draw_pixel(x0 + xs + 1, y0 + rr, color)?;
                        e.draw_pixel(x0 + rr, y0 + xs + 1, color)?;
                    }
                    if corners.contains(Corners::BOTTOM_LEFT) {
                        e.draw_pixel(x0 - rr, y0 + xs + 1, color)?;
                        e.draw_pixel(x0 - xe, y0 + rr, color)?;
                    }
                } else {
                    let len = xe - xs;
                    xs += 1;
                    if corners.contains(Corners::TOP_LEFT) {
                        e.draw_fast_hline(x0 - xe, y0 - rr, len, color)?;
                        e.draw_fast_vline(x0 - rr, y0 - xe, len, color)?;
                    }
                    if corners.contains(Corners::TOP_RIGHT) {
                        e.draw_fast_vline(x0 + rr, y0 - xe, len, color)?;
                        e.draw_fast_hline(x0 + xs, y0 - rr, len, color)?;
                    }
                    if corners.contains(Corners::BOTTOM_RIGHT) {
                        e.draw_fast_hline(x0 + xs, y0 + rr, len, color)?;
                        e.draw_fast_vline(x0 + rr, y0 + xs, len, color)?;
                    }
                    if corners.contains(Corners::BOTTOM_LEFT) {
                        e.draw_fast_vline(x0 - rr, y0 + xs, len, color)?;
                        e.draw_fast_hline(x0 - xe, y0 + rr, len, color)?;
                    }
                }
                xs = xe;
                let more = xe < rr;
                rr -= 1;
                if !more {
                    break;
                }
            }
            Ok(())
        })
    }

    /// Filled circle, one horizontal span per row.
    pub fn fill_circle(&mut self, x0: i32, y0: i32, r: i32, color: u16) -> RenderResult<()> {
        self.composite(|e| {
            let mut r = r;
            let mut x = 0;
            let mut dx = 1;
            let mut dy = r + r;
            let mut p = -(r >> 1);

            e.draw_fast_hline(x0 - r, y0, dy + 1, color)?;

            while x < r {
                if p >= 0 {
                    e.draw_fast_hline(x0 - x, y0 + r, dx, color)?;
                    e.draw_fast_hline(x0 - x, y0 - r, dx, color)?;
                    dy -= 2;
                    p -= dy;
                    r -= 1;
                }
                dx += 2;
                p += dx;
                x += 1;

                e.draw_fast_hline(x0 - r, y0 + x, dy + 1, color)?;
                e.draw_fast_hline(x0 - r, y0 - x, dy + 1, color)?;
            }
            Ok(())
        })
    }

    /// Filled half circles stretched horizontally by `delta`. Any top corner
    /// selects the upper half, any bottom corner the lower half.
    pub fn fill_circle_helper(
        &mut self,
        x0: i32,
        y0: i32,
        r: i32,
        corners: Corners,
        delta: i32,
        color: u16,
    ) -> RenderResult<()> {
        let lower = corners.intersects(Corners::BOTTOM);
        let upper = corners.intersects(Corners::TOP);
        self.composite(|e| {
            let mut r = r;
            let mut f = 1 - r;
            let mut ddf_x = 1;
            let mut ddf_y = -r - r;
            let mut y = 0;
            let delta = delta + 1;

            while y < r {
                if f >= 0 {
                    if lower {
                        e.draw_fast_hline(x0 - y, y0 + r, y + y + delta, color)?;
                    }
                    if upper {
                        e.draw_fast_hline(x0 - y, y0 - r, y + y + delta, color)?;
                    }
                    r -= 1;
                    ddf_y += 2;
                    f += ddf_y;
                }

                y += 1;
                ddf_x += 2;
                f += ddf_x;

                if lower {
                    e.draw_fast_hline(x0 - r, y0 + y, r + r + delta, color)?;
                }
                if upper {
                    e.draw_fast_hline(x0 - r, y0 - y, r + r + delta, color)?;
                }
            }
            Ok(())
        })
    }

    pub fn draw_ellipse(&mut self, x0: i32, y0: i32, rx: i32, ry: i32, color: u16) -> RenderResult<()> {
        if rx < 2 || ry < 2 {
            return Ok(());
        }
        let (rx2, ry2) = (rx * rx, ry * ry);
        let (fx2, fy2) = (4 * rx2, 4 * ry2);

        self.composite(|e| {
            // Ordered to change one axis at a time for the address cache
            let (mut x, mut y) = (0, ry);
            let mut s = 2 * ry2 + rx2 * (1 - 2 * ry);
            while ry2 * x <= rx2 * y {
                e.draw_pixel(x0 + x, y0 + y, color)?;
                e.draw_pixel(x0 - x, y0 + y, color)?;
                e.draw_pixel(x0 - x, y0 - y, color)?;
                e.draw_pixel(x0 + x, y0 - y, color)?;
                if s >= 0 {
                    s += fx2 * (1 - y);
                    y -= 1;
                }
                s += ry2 * (4 * x + 6);
                x += 1;
            }

            let (mut x, mut y) = (rx, 0);
            let mut s = 2 * rx2 + ry2 * (1 - 2 * rx);
            while rx2 * y <= ry2 * x {
                e.draw_pixel(x0 + x, y0 + y, color)?;
                e.draw_pixel(x0 - x, y0 + y, color)?;
                e.draw_pixel(x0 - x, y0 - y, color)?;
                e.draw_pixel(x0 + x, y0 - y, color)?;
                if s >= 0 {
                    s += fy2 * (1 - x);
                    x -= 1;
                }
                s += rx2 * (4 * y + 6);
                y += 1;
            }
            Ok(())
        })
    }

    pub fn fill_ellipse(&mut self, x0: i32, y0: i32, rx: i32, ry: i32, color: u16) -> RenderResult<()> {
        if rx < 2 || ry < 2 {
            return Ok(());
        }
        let (rx2, ry2) = (rx * rx, ry * ry);
        let (fx2, fy2) = (4 * rx2, 4 * ry2);

        self.composite(|e| {
            let (mut x, mut y) = (0, ry);
            let mut s = 2 * ry2 + rx2 * (1 - 2 * ry);
            while ry2 * x <= rx2 * y {
                e.draw_fast_hline(x0 - x, y0 - y, x + x + 1, color)?;
                e.draw_fast_hline(x0 - x, y0 + y, x + x + 1, color)?;
                if s >= 0 {
                    s += fx2 * (1 - y);
                    y -= 1;
                }
                s += ry2 * (4 * x + 6);
                x += 1;
            }

            let (mut x, mut y) = (rx, 0);
            let mut s = 2 * rx2 + ry2 * (1 - 2 * rx);
            while rx2 * y <= ry2 * x {
                e.draw_fast_hline(x0 - x, y0 - y, x + x + 1, color)?;
                e.draw_fast_hline(x0 - x, y0 + y, x + x + 1, color)?;
                if s >= 0 {
                    s += fy2 * (1 - x);
                    x -= 1;
                }
                s += rx2 * (4 * y + 6);
                y += 1;
            }
            Ok(())
        })
    }

    pub fn draw_round_rect(&mut self, x: i32, y: i32, w: i32, h: i32, r: i32, color: u16) -> RenderResult<()> {
        self.composite(|e| {
            e.draw_fast_hline(x + r, y, w - r - r, color)?;
            e.draw_fast_hline(x + r, y + h - 1, w - r - r, color)?;
            e.draw_fast_vline(x, y + r, h - r - r, color)?;
            e.draw_fast_vline(x + w - 1, y + r, h - r - r, color)?;

            e.draw_circle_helper(x + r, y + r, r, Corners::TOP_LEFT, color)?;
            e.draw_circle_helper(x + w - r - 1, y + r, r, Corners::TOP_RIGHT, color)?;
            e.draw_circle_helper(x + w - r - 1, y + h - r - 1, r, Corners::BOTTOM_RIGHT, color)?;
            e.draw_circle_helper(x + r, y + h - r - 1, r, Corners::BOTTOM_LEFT, color)
        })
    }

    pub fn fill_round_rect(&mut self, x: i32, y: i32, w: i32, h: i32, r: i32, color: u16) -> RenderResult<()> {
        self.composite(|e| {
            e.fill_rect(x, y + r, w, h - r - r, color)?;
            e.fill_circle_helper(x + r, y + h - r - 1, r, Corners::BOTTOM, w - r - r - 1, color)?;
            e.fill_circle_helper(x + r, y + r, r, Corners::TOP, w - r - r - 1, color)
        })
    }

    pub fn draw_triangle(
        &mut self,
        x0: i32,
        y0: i32,
        x1: i32,
        y1: i32,
        x2: i32,
        y2: i32,
        color: u16,
    ) -> RenderResult<()> {
        self.composite(|e| {
            e.draw_line(x0, y0, x1, y1, color)?;
            e.draw_line(x1, y1, x2, y2, color)?;
            e.draw_line(x2, y2, x0, y0, color)
        })
    }

    /// Scanline triangle fill: vertices sorted by y, then a flat-bottom and
    /// a flat-top phase.
    pub fn fill_triangle(
        &mut self,
        x0: i32,
        y0: i32,
        x1: i32,
        y1: i32,
        x2: i32,
        y2: i32,
        color: u16,
    ) -> RenderResult<()> {
        let (mut p0, mut p1, mut p2) = ((x0, y0), (x1, y1), (x2, y2));
        if p0.1 > p1.1 {
            core::mem::swap(&mut p0, &mut p1);
        }
        if p1.1 > p2.1 {
            core::mem::swap(&mut p2, &mut p1);
        }
        if p0.1 > p1.1 {
            core::mem::swap(&mut p0, &mut p1);
        }
        let ((x0, y0), (x1, y1), (x2, y2)) = (p0, p1, p2);

        if y0 == y2 {
            // Degenerate: all three on one row
            let a = x0.min(x1).min(x2);
            let b = x0.max(x1).max(x2);
            return self.draw_fast_hline(a, y0, b - a + 1, color);
        }

        let (dx01, dy01) = (x1 - x0, y1 - y0);
        let (dx02, dy02) = (x2 - x0, y2 - y0);
        let (dx12, dy12) = (x2 - x1, y2 - y1);

        self.composite(|e| {
            let mut sa = 0;
            let mut sb = 0;
            // Flat-bottom triangles take the y1 row here, so the second
            // phase never divides by a zero dy12
            let last = if y1 == y2 { y1 } else { y1 - 1 };

            let mut y = y0;
            while y <= last {
                let mut a = x0 + sa / dy01;
                let mut b = x0 + sb / dy02;
                sa += dx01;
                sb += dx02;
                if a > b {
                    core::mem::swap(&mut a, &mut b);
                }
                e.draw_fast_hline(a, y, b - a + 1, color)?;
                y += 1;
            }

            sa = dx12 * (y - y1);
            sb = dx02 * (y - y0);
            while y <= y2 {
                let mut a = x1 + sa / dy12;
                let mut b = x0 + sb / dy02;
                sa += dx12;
                sb += dx02;
                if a > b {
                    core::mem::swap(&mut a, &mut b);
                }
                e.draw_fast_hline(a, y, b - a + 1, color)?;
                y += 1;
            }
            Ok(())
        })
    }

    /// 1-bit bitmap, rows padded to whole bytes, MSB is the leftmost pixel.
    /// Clear bits are left untouched.
    pub fn draw_bitmap(&mut self, x: i32, y: i32, bitmap: &[u8], w: i32, h: i32, color: u16) -> RenderResult<()> {
        self.bitmap_pixels(x, y, bitmap, w, h, true, color, None)
    }

    /// As [`draw_bitmap`](Self::draw_bitmap), painting clear bits in `bg`.
    pub fn draw_bitmap_bg(
        &mut self,
        x: i32,
        y: i32,
        bitmap: &[u8],
        w: i32,
        h: i32,
        fg: u16,
        bg: u16,
    ) -> RenderResult<()> {
        self.bitmap_pixels(x, y, bitmap, w, h, true, fg, Some(bg))
    }

    /// XBM bitmap: as [`draw_bitmap`](Self::draw_bitmap) but LSB first.
    pub fn draw_xbitmap(&mut self, x: i32, y: i32, bitmap: &[u8], w: i32, h: i32, color: u16) -> RenderResult<()> {
        self.bitmap_pixels(x, y, bitmap, w, h, false, color, None)
    }

    pub fn draw_xbitmap_bg(
        &mut self,
        x: i32,
        y: i32,
        bitmap: &[u8],
        w: i32,
        h: i32,
        fg: u16,
        bg: u16,
    ) -> RenderResult<()> {
        self.bitmap_pixels(x, y, bitmap, w, h, false, fg, Some(bg))
    }

    #[allow(clippy::too_many_arguments)]
    fn bitmap_pixels(
        &mut self,
        x: i32,
        y: i32,
        bitmap: &[u8],
        w: i32,
        h: i32,
        msb_first: bool,
        fg: u16,
        bg: Option<u16>,
    ) -> RenderResult<()> {
        if w < 1 || h < 1 {
            return Ok(());
        }
        let byte_width = ((w + 7) / 8) as usize;
        ensure_len(byte_width * h as usize, bitmap.len())?;

        self.composite(|e| {
            for j in 0..h {
                let row = &bitmap[j as usize * byte_width..][..byte_width];
                for i in 0..w {
                    let mask = if msb_first { 0x80 >> (i & 7) } else { 1 << (i & 7) };
                    if row[(i / 8) as usize] & mask != 0 {
                        e.draw_pixel(x + i, y + j, fg)?;
                    } else if let Some(bg) = bg {
                        e.draw_pixel(x + i, y + j, bg)?;
                    }
                }
            }
            Ok(())
        })
    }
}
