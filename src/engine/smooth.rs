//! Anti-aliased primitives
//!
//! Arcs, circles and rounded rectangles scan one quadrant in concentric
//! bands using squared integer distances:
//!
//! ```text
//!   hyp > r^2            outer AA band    alpha = !sqrt_fraction(hyp)
//!   ir^2 <= hyp <= r^2   solid            collected into runs
//!   (ir-1)^2 < hyp       inner AA band    alpha = sqrt_fraction(hyp)
//!   hyp <= (ir-1)^2      hole             scan stops
//! ```
//!
//! Wedge lines and spots use a float distance field instead and are
//! scanned row by row inside their clipped bounding box.

use super::RenderEngine;
use crate::color::alpha_blend;
use crate::error::RenderResult;
use crate::hal::{ControlPins, Transfer};
use crate::math::{
    sin_cos_deg, sqrt_fraction, wedge_line_distance, HI_ALPHA_THRESHOLD, LO_ALPHA_THRESHOLD,
    PIXEL_ALPHA_GAIN,
};

use super::Corners;

/// Colour anti-aliased edges are blended against
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Background {
    /// A known colour
    Solid(u16),
    /// Whatever the panel currently shows, read per pixel
    ReadBack,
}

impl From<u16> for Background {
    fn from(color: u16) -> Self {
        Background::Solid(color)
    }
}

/// Below this alpha an arc edge pixel is not drawn
const ARC_MIN_ALPHA: u8 = 16;
/// Filled shapes skip edge pixels below this alpha
const FILL_MIN_ALPHA: u8 = 9;
/// Filled shapes treat edge pixels above this alpha as solid
const FILL_MAX_ALPHA: u8 = 246;
/// Keeps arc end slopes finite, at most ~0x8000_0000 in U16.16
const MIN_DIVISOR: f32 = 1.0 / 32768.0;
/// Half width of the wedge drawn across a square arc end
const SQUARE_END_RADIUS: f32 = 0.3;

impl<B: Transfer, P: ControlPins> RenderEngine<B, P> {
    /// Blend `color` over the background at `alpha`, plot it, and return the
    /// colour that was drawn.
    pub fn draw_pixel_alpha(
        &mut self,
        x: i32,
        y: i32,
        color: u16,
        alpha: u8,
        bg: Background,
    ) -> RenderResult<u16> {
        let bg = match bg {
            Background::Solid(c) => c,
            Background::ReadBack => self.read_pixel(x, y)?,
        };
        let color = alpha_blend(alpha, color, bg);
        self.draw_pixel(x, y, color)?;
        Ok(color)
    }

    /// Edge pixel of an arc: a precomputed blend for a solid background, a
    /// per-pixel read otherwise.
    fn plot_edge(
        &mut self,
        x: i32,
        y: i32,
        fg: u16,
        alpha: u8,
        bg: Background,
        solid: u16,
    ) -> RenderResult<()> {
        match bg {
            Background::Solid(_) => self.draw_pixel(x, y, solid),
            Background::ReadBack => self.draw_pixel_alpha(x, y, fg, alpha, bg).map(|_| ()),
        }
    }

    /// Arc of thickness `r - ir + 1` drawn clockwise from `start` to `end`
    /// degrees, zero at 6 o'clock. An `end` below `start` sweeps through 6
    /// o'clock. With `smooth` the sides are anti-aliased; the ends never are.
    #[allow(clippy::too_many_arguments)]
    pub fn draw_arc(
        &mut self,
        x: i32,
        y: i32,
        r: i32,
        ir: i32,
        start: u32,
        end: u32,
        fg: u16,
        bg: Background,
        smooth: bool,
    ) -> RenderResult<()> {
        let end = end.min(360);
        let mut start = start.min(360);
        if self.vp.oob || start == end {
            return Ok(());
        }
        let (mut r, mut ir) = if r < ir { (ir, r) } else { (r, ir) };
        if r <= 0 || ir < 0 {
            return Ok(());
        }

        self.composite(|e| {
            if end < start {
                if start < 360 {
                    e.draw_arc(x, y, r, ir, start, 360, fg, bg, smooth)?;
                }
                if end == 0 {
                    return Ok(());
                }
                start = 0;
            }

            let r2 = r * r;
            if smooth {
                r += 1;
            }
            let r1 = r * r;
            let w = r - ir;
            let r3 = ir * ir;
            if smooth {
                ir -= 1;
            }
            let r4 = ir * ir;

            // Quadrant index
            //   1 | 2
            //   --+--
            //   0 | 3
            // U16.16 slope limits of the arc in each quadrant
            let mut start_slope: [u32; 4] = [0, 0, u32::MAX, 0];
            let mut end_slope: [u32; 4] = [0, u32::MAX, 0, 0];

            let end_slope_of = |angle: u32| -> u32 {
                let (s, c) = sin_cos_deg(angle as f32);
                (libm::fabsf(c) / (libm::fabsf(s) + MIN_DIVISOR) * 65536.0) as u32
            };

            let slope = end_slope_of(start);
            if start <= 90 {
                start_slope[0] = slope;
            } else if start <= 180 {
                start_slope[1] = slope;
            } else if start <= 270 {
                start_slope[1] = u32::MAX;
                start_slope[2] = slope;
            } else {
                start_slope[1] = u32::MAX;
                start_slope[2] = 0;
                start_slope[3] = slope;
            }

            let slope = end_slope_of(end);
            if end <= 90 {
                end_slope[0] = slope;
                end_slope[1] = 0;
                start_slope[2] = 0;
            } else if end <= 180 {
                end_slope[1] = slope;
                start_slope[2] = 0;
            } else if end <= 270 {
                end_slope[2] = slope;
            } else {
                end_slope[3] = slope;
            }

            let in_quadrant = |q: usize, slope: u32| -> bool {
                match q {
                    0 | 2 => slope <= start_slope[q] && slope >= end_slope[q],
                    1 => slope >= start_slope[1] && slope <= end_slope[1],
                    _ => slope <= end_slope[3] && slope >= start_slope[3],
                }
            };

            let mut xs = 0;
            for cy in (1..r).rev() {
                let mut len = [0i32; 4];
                let mut xst = [-1i32; 4];
                let dy2 = (r - cy) * (r - cy);

                while (r - xs) * (r - xs) + dy2 >= r1 {
                    xs += 1;
                }

                for cx in xs..r {
                    let hyp = (r - cx) * (r - cx) + dy2;
                    let alpha = if hyp > r2 {
                        !sqrt_fraction(hyp as u32)
                    } else if hyp >= r3 {
                        let slope = (((r - cy) << 16) / (r - cx)) as u32;
                        for q in 0..4 {
                            if in_quadrant(q, slope) {
                                xst[q] = cx;
                                len[q] += 1;
                            }
                        }
                        continue;
                    } else {
                        if hyp <= r4 {
                            break;
                        }
                        sqrt_fraction(hyp as u32)
                    };

                    if alpha < ARC_MIN_ALPHA {
                        continue;
                    }

                    let solid = match bg {
                        Background::Solid(b) => alpha_blend(alpha, fg, b),
                        Background::ReadBack => fg,
                    };
                    let slope = (((r - cy) << 16) / (r - cx)) as u32;
                    if in_quadrant(0, slope) {
                        e.plot_edge(x + cx - r, y - cy + r, fg, alpha, bg, solid)?;
                    }
                    if in_quadrant(1, slope) {
                        e.plot_edge(x + cx - r, y + cy - r, fg, alpha, bg, solid)?;
                    }
                    if in_quadrant(2, slope) {
                        e.plot_edge(x - cx + r, y + cy - r, fg, alpha, bg, solid)?;
                    }
                    if in_quadrant(3, slope) {
                        e.plot_edge(x - cx + r, y - cy + r, fg, alpha, bg, solid)?;
                    }
                }

                if len[0] > 0 {
                    e.draw_fast_hline(x + xst[0] - len[0] + 1 - r, y - cy + r, len[0], fg)?;
                }
                if len[1] > 0 {
                    e.draw_fast_hline(x + xst[1] - len[1] + 1 - r, y + cy - r, len[1], fg)?;
                }
                if len[2] > 0 {
                    e.draw_fast_hline(x - xst[2] + r, y + cy - r, len[2], fg)?;
                }
                if len[3] > 0 {
                    e.draw_fast_hline(x - xst[3] + r, y - cy + r, len[3], fg)?;
                }
            }

            // Axis-aligned spokes the quadrant scan leaves out
            if start == 0 || end == 360 {
                e.draw_fast_vline(x, y + r - w, w, fg)?;
            }
            if start <= 90 && end >= 90 {
                e.draw_fast_hline(x - r + 1, y, w, fg)?;
            }
            if start <= 180 && end >= 180 {
                e.draw_fast_vline(x, y - r + 1, w, fg)?;
            }
            if start <= 270 && end >= 270 {
                e.draw_fast_hline(x + r - w, y, w, fg)?;
            }
            Ok(())
        })
    }

    /// Anti-aliased arc with anti-aliased ends, round or square. Round ends
    /// extend past the given angles.
    #[allow(clippy::too_many_arguments)]
    pub fn draw_smooth_arc(
        &mut self,
        x: i32,
        y: i32,
        r: i32,
        ir: i32,
        start: u32,
        end: u32,
        fg: u16,
        bg: Background,
        round_ends: bool,
    ) -> RenderResult<()> {
        self.composite(|e| {
            if end == start || (start == 0 && end == 360) {
                return e.draw_arc(x, y, r, ir, 0, 360, fg, bg, true);
            }

            let (ss, sc) = sin_cos_deg(start as f32);
            let (es, ec) = sin_cos_deg(end as f32);
            let (sx, sy) = (-ss, sc);
            let (ex, ey) = (-es, ec);
            let (xf, yf) = (x as f32, y as f32);

            if round_ends {
                let mid = (r + ir) as f32 / 2.0;
                let half = (r - ir) as f32 / 2.0;
                e.draw_spot(sx * mid + xf, sy * mid + yf, half, fg, bg)?;
                e.draw_spot(ex * mid + xf, ey * mid + yf, half, fg, bg)?;
            } else {
                let (irf, rf) = (ir as f32, r as f32);
                e.draw_wedge_line(
                    sx * irf + xf,
                    sy * irf + yf,
                    sx * rf + xf,
                    sy * rf + yf,
                    SQUARE_END_RADIUS,
                    SQUARE_END_RADIUS,
                    fg,
                    bg,
                )?;
                e.draw_wedge_line(
                    ex * irf + xf,
                    ey * irf + yf,
                    ex * rf + xf,
                    ey * rf + yf,
                    SQUARE_END_RADIUS,
                    SQUARE_END_RADIUS,
                    fg,
                    bg,
                )?;
            }

            e.draw_arc(x, y, r, ir, start, end, fg, bg, true)
        })
    }

    /// Three pixel wide anti-aliased circle outline.
    pub fn draw_smooth_circle(&mut self, x: i32, y: i32, r: i32, fg: u16, bg: Background) -> RenderResult<()> {
        self.draw_smooth_round_rect(x - r, y - r, r, r - 1, 0, 0, fg, bg, Corners::all())
    }

    /// Filled circle with an anti-aliased edge.
    pub fn fill_smooth_circle(&mut self, x: i32, y: i32, r: i32, color: u16, bg: Background) -> RenderResult<()> {
        if r <= 0 {
            return Ok(());
        }
        self.composite(|e| {
            e.draw_fast_hline(x - r, y, 2 * r + 1, color)?;

            let r1 = r * r;
            let r = r + 1;
            let r2 = r * r;
            let mut xs = 1;

            for cy in (1..r).rev() {
                let dy2 = (r - cy) * (r - cy);
                let mut cx = xs;
                while cx < r {
                    let hyp2 = (r - cx) * (r - cx) + dy2;
                    if hyp2 <= r1 {
                        break;
                    }
                    if hyp2 >= r2 {
                        cx += 1;
                        continue;
                    }
                    let alpha = !sqrt_fraction(hyp2 as u32);
                    if alpha > FILL_MAX_ALPHA {
                        break;
                    }
                    xs = cx;
                    if alpha < FILL_MIN_ALPHA {
                        cx += 1;
                        continue;
                    }

                    match bg {
                        Background::ReadBack => {
                            e.draw_pixel_alpha(x + cx - r, y + cy - r, color, alpha, bg)?;
                            e.draw_pixel_alpha(x - cx + r, y + cy - r, color, alpha, bg)?;
                            e.draw_pixel_alpha(x - cx + r, y - cy + r, color, alpha, bg)?;
                            e.draw_pixel_alpha(x + cx - r, y - cy + r, color, alpha, bg)?;
                        }
                        Background::Solid(_) => {
                            let pcol = e.draw_pixel_alpha(x + cx - r, y + cy - r, color, alpha, bg)?;
                            e.draw_pixel(x - cx + r, y + cy - r, pcol)?;
                            e.draw_pixel(x - cx + r, y - cy + r, pcol)?;
                            e.draw_pixel(x + cx - r, y - cy + r, pcol)?;
                        }
                    }
                    cx += 1;
                }
                e.draw_fast_hline(x + cx - r, y + cy - r, 2 * (r - cx) + 1, color)?;
                e.draw_fast_hline(x + cx - r, y - cy + r, 2 * (r - cx) + 1, color)?;
            }
            Ok(())
        })
    }

    /// Anti-aliased rounded rectangle outline inside the box `x, y, w, h`,
    /// corner radius `r` and inner radius `ir`. `quadrants` picks the corners
    /// drawn; a side is drawn when both of its corners are. A box smaller
    /// than the corners gives a circle centred on `(x + r, y + r)`.
    #[allow(clippy::too_many_arguments)]
    pub fn draw_smooth_round_rect(
        &mut self,
        x: i32,
        y: i32,
        r: i32,
        ir: i32,
        w: i32,
        h: i32,
        fg: u16,
        bg: Background,
        quadrants: Corners,
    ) -> RenderResult<()> {
        if self.vp.oob {
            return Ok(());
        }
        let (mut r, mut ir) = if r < ir { (ir, r) } else { (r, ir) };
        if r <= 0 || ir < 0 {
            return Ok(());
        }
        let w = (w - 2 * r).max(0);
        let h = (h - 2 * r).max(0);
        let x = x + r;
        let y = y + r;
        let t = r - ir + 1;

        self.composite(|e| {
            let r2 = r * r;
            r += 1;
            let r1 = r * r;
            let r3 = ir * ir;
            ir -= 1;
            let r4 = ir * ir;

            let mut xs = 0;
            for cy in (1..r).rev() {
                let mut len = 0;
                let mut rxst = 0;
                let dy2 = (r - cy) * (r - cy);

                while (r - xs) * (r - xs) + dy2 >= r1 {
                    xs += 1;
                }

                for cx in xs..r {
                    let hyp = (r - cx) * (r - cx) + dy2;
                    let alpha = if hyp > r2 {
                        !sqrt_fraction(hyp as u32)
                    } else if hyp >= r3 {
                        rxst = cx;
                        len += 1;
                        continue;
                    } else {
                        if hyp <= r4 {
                            break;
                        }
                        sqrt_fraction(hyp as u32)
                    };

                    if alpha < ARC_MIN_ALPHA {
                        continue;
                    }

                    let solid = match bg {
                        Background::Solid(b) => alpha_blend(alpha, fg, b),
                        Background::ReadBack => fg,
                    };
                    if quadrants.contains(Corners::BOTTOM_LEFT) {
                        e.plot_edge(x + cx - r, y - cy + r + h, fg, alpha, bg, solid)?;
                    }
                    if quadrants.contains(Corners::TOP_LEFT) {
                        e.plot_edge(x + cx - r, y + cy - r, fg, alpha, bg, solid)?;
                    }
                    if quadrants.contains(Corners::TOP_RIGHT) {
                        e.plot_edge(x - cx + r + w, y + cy - r, fg, alpha, bg, solid)?;
                    }
                    if quadrants.contains(Corners::BOTTOM_RIGHT) {
                        e.plot_edge(x - cx + r + w, y - cy + r + h, fg, alpha, bg, solid)?;
                    }
                }

                let lxst = rxst - len + 1;
                if quadrants.contains(Corners::BOTTOM_LEFT) {
                    e.draw_fast_hline(x + lxst - r, y - cy + r + h, len, fg)?;
                }
                if quadrants.contains(Corners::TOP_LEFT) {
                    e.draw_fast_hline(x + lxst - r, y + cy - r, len, fg)?;
                }
                if quadrants.contains(Corners::TOP_RIGHT) {
                    e.draw_fast_hline(x - rxst + r + w, y + cy - r, len, fg)?;
                }
                if quadrants.contains(Corners::BOTTOM_RIGHT) {
                    e.draw_fast_hline(x - rxst + r + w, y - cy + r + h, len, fg)?;
                }
            }

            if quadrants.contains(Corners::BOTTOM) {
                e.fill_rect(x, y + r - t + h, w + 1, t, fg)?;
            }
            if quadrants.contains(Corners::TOP_LEFT | Corners::BOTTOM_LEFT) {
                e.fill_rect(x - r + 1, y, t, h + 1, fg)?;
            }
            if quadrants.contains(Corners::TOP) {
                e.fill_rect(x, y - r + 1, w + 1, t, fg)?;
            }
            if quadrants.contains(Corners::TOP_RIGHT | Corners::BOTTOM_RIGHT) {
                e.fill_rect(x + r - t + w, y, t, h + 1, fg)?;
            }
            Ok(())
        })
    }

    /// Filled rounded rectangle with anti-aliased corners. The radius is
    /// limited to half the shorter side.
    #[allow(clippy::too_many_arguments)]
    pub fn fill_smooth_round_rect(
        &mut self,
        x: i32,
        y: i32,
        w: i32,
        h: i32,
        r: i32,
        color: u16,
        bg: Background,
    ) -> RenderResult<()> {
        let r = r.max(0).min(w / 2).min(h / 2);

        self.composite(|e| {
            let y = y + r;
            let h = h - 2 * r;
            e.fill_rect(x, y, w, h, color)?;

            let h = h - 1;
            let x = x + r;
            let w = w - (2 * r + 1);

            let r1 = r * r;
            let r = r + 1;
            let r2 = r * r;
            let mut xs = 0;

            for cy in (1..r).rev() {
                let dy2 = (r - cy) * (r - cy);
                let mut cx = xs;
                while cx < r {
                    let hyp2 = (r - cx) * (r - cx) + dy2;
                    if hyp2 <= r1 {
                        break;
                    }
                    if hyp2 >= r2 {
                        cx += 1;
                        continue;
                    }
                    let alpha = !sqrt_fraction(hyp2 as u32);
                    if alpha > FILL_MAX_ALPHA {
                        break;
                    }
                    xs = cx;
                    if alpha >= FILL_MIN_ALPHA {
                        e.draw_pixel_alpha(x + cx - r, y + cy - r, color, alpha, bg)?;
                        e.draw_pixel_alpha(x - cx + r + w, y + cy - r, color, alpha, bg)?;
                        e.draw_pixel_alpha(x - cx + r + w, y - cy + r + h, color, alpha, bg)?;
                        e.draw_pixel_alpha(x + cx - r, y - cy + r + h, color, alpha, bg)?;
                    }
                    cx += 1;
                }
                e.draw_fast_hline(x + cx - r, y + cy - r, 2 * (r - cx) + 1 + w, color)?;
                e.draw_fast_hline(x + cx - r, y - cy + r + h, 2 * (r - cx) + 1 + w, color)?;
            }
            Ok(())
        })
    }

    /// Anti-aliased filled circle at a sub-pixel position.
    pub fn draw_spot(&mut self, ax: f32, ay: f32, r: f32, fg: u16, bg: Background) -> RenderResult<()> {
        self.draw_wedge_line(ax, ay, ax, ay, r, r, fg, bg)
    }

    /// Anti-aliased line of width `wd` with round ends.
    #[allow(clippy::too_many_arguments)]
    pub fn draw_wide_line(
        &mut self,
        ax: f32,
        ay: f32,
        bx: f32,
        by: f32,
        wd: f32,
        fg: u16,
        bg: Background,
    ) -> RenderResult<()> {
        self.draw_wedge_line(ax, ay, bx, by, wd / 2.0, wd / 2.0, fg, bg)
    }

    /// Anti-aliased line with round ends of radius `ar` at `a` and `br` at `b`.
    ///
    /// Rows are scanned outward from the row of the leftmost end. Within a
    /// row, consecutive covered pixels share one address window.
    #[allow(clippy::too_many_arguments)]
    pub fn draw_wedge_line(
        &mut self,
        ax: f32,
        ay: f32,
        bx: f32,
        by: f32,
        ar: f32,
        br: f32,
        fg: u16,
        bg: Background,
    ) -> RenderResult<()> {
        if ar < 0.0 || br < 0.0 {
            return Ok(());
        }
        let mut bx = bx;
        if libm::fabsf(ax - bx) < 0.01 && libm::fabsf(ay - by) < 0.01 {
            // Zero length segment
            bx += 0.01;
        }

        let x0 = libm::floorf((ax - ar).min(bx - br)) as i32;
        let x1 = libm::ceilf((ax + ar).max(bx + br)) as i32;
        let y0 = libm::floorf((ay - ar).min(by - br)) as i32;
        let y1 = libm::ceilf((ay + ar).max(by + br)) as i32;
        let Some((x0, y0, x1, y1)) = self.clip_window(x0, y0, x1, y1) else {
            return Ok(());
        };

        // From here on everything is in device space
        let (xd, yd) = (self.vp.x_datum, self.vp.y_datum);
        let (ax, ay) = (ax + xd as f32, ay + yd as f32);
        let (bx, by) = (bx + xd as f32, by + yd as f32);

        let ys = if ax - ar > bx - br { by as i32 } else { ay as i32 };
        let ys = ys.clamp(y0, y1 + 1);

        let rdt = ar - br;
        let ar = ar + 0.5;
        let (bax, bay) = (bx - ax, by - ay);

        let wedge = Wedge { ax, ay, bax, bay, ar, rdt, x1, fg, bg };
        self.composite(|e| {
            e.begin_write();
            let mut alpha = 1.0f32;

            let mut xs = x0;
            for yp in ys..=y1 {
                e.wedge_row(&wedge, yp, &mut xs, &mut alpha)?;
            }
            let mut xs = x0;
            for yp in (y0..ys).rev() {
                e.wedge_row(&wedge, yp, &mut xs, &mut alpha)?;
            }
            Ok(())
        })
    }

    /// One row of a wedge line, starting at `xs`. Leaves `xs` on the first
    /// covered pixel so the next row can start there.
    fn wedge_row(&mut self, w: &Wedge, yp: i32, xs: &mut i32, alpha: &mut f32) -> RenderResult<()> {
        let mut swin = true;
        let mut edge = false;
        let ypay = yp as f32 - w.ay;
        for xp in *xs..=w.x1 {
            if edge && *alpha <= LO_ALPHA_THRESHOLD {
                break;
            }
            *alpha = w.ar - wedge_line_distance(xp as f32 - w.ax, ypay, w.bax, w.bay, w.rdt);
            if *alpha <= LO_ALPHA_THRESHOLD {
                continue;
            }
            if !edge {
                edge = true;
                *xs = xp;
            }

            let color = if *alpha > HI_ALPHA_THRESHOLD {
                w.fg
            } else {
                let bg = match w.bg {
                    Background::Solid(c) => c,
                    Background::ReadBack => {
                        // The read closes the write window
                        swin = true;
                        self.read_device_pixel(xp, yp)?
                    }
                };
                alpha_blend((*alpha * PIXEL_ALPHA_GAIN) as u8, w.fg, bg)
            };

            if swin {
                self.set_window(xp, yp, w.x1, yp)?;
                swin = false;
            }
            self.write16(color)?;
        }
        Ok(())
    }
}

/// Device-space geometry of a wedge line
struct Wedge {
    ax: f32,
    ay: f32,
    bax: f32,
    bay: f32,
    /// End radius at `a` plus half a pixel
    ar: f32,
    /// Radius difference `ar - br`
    rdt: f32,
    x1: i32,
    fg: u16,
    bg: Background,
}

#[cfg(test)]
mod tests {
    use super::super::testing::*;
    use super::*;
    use crate::color::{BLACK, BLUE, RED, WHITE};

    #[test]
    fn test_pixel_alpha_endpoints() {
        let (mut engine, panel) = ili9341();
        assert_eq!(engine.draw_pixel_alpha(0, 0, RED, 255, BLUE.into()).unwrap(), RED);
        assert_eq!(engine.draw_pixel_alpha(1, 0, RED, 0, BLUE.into()).unwrap(), BLUE);
        assert_eq!(panel.region(0, 0, 2, 1), vec![RED, BLUE]);
    }

    #[test]
    fn test_pixel_alpha_reads_background() {
        let (mut engine, panel) = ili9341();
        panel.poke(4, 4, BLUE);
        let c = engine.draw_pixel_alpha(4, 4, RED, 128, Background::ReadBack).unwrap();
        assert_eq!(c, alpha_blend(128, RED, BLUE));
        assert_eq!(panel.pixel(4, 4), c);
    }

    #[test]
    fn test_fill_smooth_circle_symmetric() {
        let (mut engine, panel) = ili9341();
        let (cx, cy, r) = (60, 60, 12);
        engine.fill_smooth_circle(cx, cy, r, WHITE, BLACK.into()).unwrap();
        assert_eq!(panel.pixel(cx as usize, cy as usize), WHITE);
        assert_eq!(panel.pixel((cx + r - 1) as usize, cy as usize), WHITE);
        assert_eq!(panel.pixel((cx + r + 2) as usize, cy as usize), BLACK);
        for dy in -r - 1..=r + 1 {
            for dx in 0..=r + 1 {
                let right = panel.pixel((cx + dx) as usize, (cy + dy) as usize);
                let left = panel.pixel((cx - dx) as usize, (cy + dy) as usize);
                let below = panel.pixel((cx + dx) as usize, (cy - dy) as usize);
                assert_eq!(right, left, "x mirror at ({dx}, {dy})");
                assert_eq!(right, below, "y mirror at ({dx}, {dy})");
            }
        }
        assert_eq!(panel.stats().selects, 1);
    }

    #[test]
    fn test_fill_smooth_circle_zero_radius() {
        let (mut engine, panel) = ili9341();
        engine.fill_smooth_circle(10, 10, 0, WHITE, BLACK.into()).unwrap();
        assert!(panel.events().is_empty());
    }

    #[test]
    fn test_smooth_circle_is_a_ring() {
        let (mut engine, panel) = ili9341();
        engine.draw_smooth_circle(100, 100, 20, WHITE, BLACK.into()).unwrap();
        assert_eq!(panel.pixel(100, 80), WHITE);
        assert_eq!(panel.pixel(80, 100), WHITE);
        assert_eq!(panel.pixel(120, 100), WHITE);
        assert_eq!(panel.pixel(100, 120), WHITE);
        assert_eq!(panel.pixel(100, 100), BLACK);
        assert_eq!(panel.pixel(100, 90), BLACK);
    }

    #[test]
    fn test_quarter_arc_stays_in_its_quadrant() {
        let (mut engine, panel) = ili9341();
        let (x, y, r) = (100, 100, 30);
        // 0 is 6 o'clock, 90 is 9 o'clock
        engine.draw_arc(x, y, r, r - 5, 0, 90, RED, BLACK.into(), false).unwrap();
        assert_eq!(panel.pixel(x as usize, (y + r - 1) as usize), RED);
        assert_eq!(panel.pixel((x - r + 1) as usize, y as usize), RED);
        let top_right = panel.region((x + 1) as usize, (y - r - 1) as usize, (r + 2) as usize, r as usize);
        assert!(top_right.iter().all(|&c| c == BLACK));
        let bottom_left = panel.region((x - r - 1) as usize, (y + 1) as usize, r as usize, (r + 1) as usize);
        assert!(bottom_left.iter().any(|&c| c == RED));
    }

    #[test]
    fn test_arc_wraps_through_six_oclock() {
        let (mut engine, panel) = ili9341();
        let (x, y, r) = (100, 100, 30);
        engine.draw_arc(x, y, r, r - 4, 270, 90, RED, BLACK.into(), true).unwrap();
        assert_eq!(panel.pixel(x as usize, (y + r - 1) as usize), RED);
        assert_eq!(panel.pixel((x - r + 1) as usize, y as usize), RED);
        assert_eq!(panel.pixel((x + r - 1) as usize, y as usize), RED);
        assert_eq!(panel.pixel(x as usize, (y - r + 1) as usize), BLACK);
        assert_eq!(panel.stats().selects, 1);
    }

    #[test]
    fn test_degenerate_arcs_draw_nothing() {
        let (mut engine, panel) = ili9341();
        engine.draw_arc(50, 50, 20, 10, 45, 45, RED, BLACK.into(), true).unwrap();
        engine.draw_arc(50, 50, 0, 0, 0, 90, RED, BLACK.into(), true).unwrap();
        engine.draw_arc(50, 50, 10, -1, 0, 90, RED, BLACK.into(), true).unwrap();
        assert!(panel.events().is_empty());
    }

    #[test]
    fn test_smooth_arc_round_ends() {
        let (mut engine, panel) = ili9341();
        engine.draw_smooth_arc(120, 160, 40, 30, 30, 330, WHITE, BLACK.into(), true).unwrap();
        assert!(panel.count_not(BLACK) > 0);
        assert_eq!(panel.pixel(120, 160), BLACK);
        // Bottom of the dial between the ends stays clear
        assert_eq!(panel.pixel(120, 195), BLACK);
        assert_eq!(panel.pixel(120, 125), WHITE);
    }

    #[test]
    fn test_wide_line_width() {
        let (mut engine, panel) = ili9341();
        engine.draw_wide_line(10.0, 10.0, 30.0, 10.0, 5.0, WHITE, BLACK.into()).unwrap();
        assert_eq!(panel.pixel(20, 10), WHITE);
        assert_eq!(panel.pixel(20, 12), WHITE);
        assert_eq!(panel.pixel(20, 8), WHITE);
        assert_eq!(panel.pixel(20, 14), BLACK);
        assert_eq!(panel.pixel(20, 6), BLACK);
    }

    #[test]
    fn test_spot_blends_with_panel() {
        let (mut engine, panel) = ili9341();
        engine.fill_rect(40, 40, 20, 20, BLUE).unwrap();
        engine.draw_spot(50.0, 50.0, 3.0, RED, Background::ReadBack).unwrap();
        assert_eq!(panel.pixel(50, 50), RED);
        let edge = panel.pixel(53, 50);
        assert!(edge != RED && edge != BLUE && edge != BLACK, "edge {edge:#06x}");
        assert_eq!(panel.pixel(55, 50), BLUE);
        assert_eq!(engine.bus_state(), crate::engine::BusState::Idle);
        assert!(!panel.is_selected());
    }

    #[test]
    fn test_wedge_line_clipped_to_viewport() {
        let (mut engine, panel) = ili9341();
        engine.set_viewport(0, 0, 20, 20, true);
        engine.draw_wedge_line(5.0, 5.0, 60.0, 5.0, 3.0, 1.0, WHITE, BLACK.into()).unwrap();
        assert_eq!(panel.pixel(10, 5), WHITE);
        assert_eq!(panel.region(20, 0, 40, 20).iter().filter(|&&c| c != BLACK).count(), 0);
    }

    #[test]
    fn test_smooth_round_rect_quadrants() {
        let (mut engine, panel) = ili9341();
        engine
            .draw_smooth_round_rect(20, 20, 8, 6, 60, 40, RED, BLACK.into(), Corners::TOP)
            .unwrap();
        // Top edge is drawn, bottom edge and sides are not
        assert_eq!(panel.pixel(50, 20), RED);
        assert_eq!(panel.pixel(50, 59), BLACK);
        assert_eq!(panel.pixel(20, 40), BLACK);
    }

    #[test]
    fn test_fill_smooth_round_rect() {
        let (mut engine, panel) = ili9341();
        engine.fill_smooth_round_rect(10, 10, 40, 30, 8, WHITE, BLACK.into()).unwrap();
        assert_eq!(panel.pixel(30, 10), WHITE);
        assert_eq!(panel.pixel(30, 39), WHITE);
        assert_eq!(panel.pixel(10, 25), WHITE);
        assert_eq!(panel.pixel(49, 25), WHITE);
        assert_eq!(panel.pixel(50, 25), BLACK);
        assert_eq!(panel.pixel(30, 40), BLACK);
        // Corner is rounded away
        assert_eq!(panel.pixel(10, 10), BLACK);
    }
}
