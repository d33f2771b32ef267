//! Viewport and clipping
//!
//! The viewport is a rectangle of the rotated screen that every primitive is
//! clipped to. Its datum (the logical origin) is either the screen corner or
//! the viewport corner. Clipping always happens in device space: callers
//! pass logical coordinates, the datum is added once, then the result is
//! cropped against `[x, w) x [y, h)`.

use log::debug;

use super::RenderEngine;
use crate::error::RenderResult;
use crate::hal::{ControlPins, Transfer};

/// Clip region and logical origin
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Viewport {
    /// Left edge, device space
    pub x: i32,
    /// Top edge, device space
    pub y: i32,
    /// Right edge + 1, device space
    pub w: i32,
    /// Bottom edge + 1, device space
    pub h: i32,
    /// Added to every logical x
    pub x_datum: i32,
    /// Added to every logical y
    pub y_datum: i32,
    /// Logical width reported while the datum is active
    pub x_width: i32,
    /// Logical height reported while the datum is active
    pub y_height: i32,
    /// Logical origin is the viewport corner
    pub datum: bool,
    /// Viewport lies off screen: nothing draws
    pub oob: bool,
}

impl Viewport {
    /// Whole-screen viewport, origin at the corner
    pub const fn full(width: i32, height: i32) -> Self {
        Self {
            x: 0,
            y: 0,
            w: width,
            h: height,
            x_datum: 0,
            y_datum: 0,
            x_width: width,
            y_height: height,
            datum: false,
            oob: false,
        }
    }
}

/// Result of cropping an image rectangle to the viewport
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct ImageClip {
    /// Device-space corner of the visible part
    pub x: i32,
    pub y: i32,
    /// Offset of the visible part inside the source
    pub dx: i32,
    pub dy: i32,
    /// Visible size
    pub dw: i32,
    pub dh: i32,
}

impl<B: Transfer, P: ControlPins> RenderEngine<B, P> {
    /// Restrict drawing to a rectangle of the screen. With `datum` set,
    /// coordinates become relative to its top left corner.
    ///
    /// The rectangle is cropped to the screen. If nothing remains the
    /// viewport is flagged out of bounds and every draw call is dropped.
    pub fn set_viewport(&mut self, x: i32, y: i32, w: i32, h: i32, datum: bool) {
        let (sw, sh) = (self.width, self.height);
        let mut vp = Viewport {
            x_datum: x,
            y_datum: y,
            x_width: w,
            y_height: h,
            ..Viewport::full(sw, sh)
        };

        let (mut x, mut y, mut w, mut h) = (x, y, w, h);
        if x < 0 {
            w = w.saturating_add(x);
            x = 0;
        }
        if y < 0 {
            h = h.saturating_add(y);
            y = 0;
        }
        if x >= sw || y >= sh {
            w = 0;
        } else {
            w = w.min(sw - x);
            h = h.min(sh - y);
        }

        if w < 1 || h < 1 {
            debug!(
                "viewport ({}, {}) {}x{} is off screen, drawing disabled",
                vp.x_datum, vp.y_datum, vp.x_width, vp.y_height
            );
            self.vp = Viewport { oob: true, ..Viewport::full(sw, sh) };
            return;
        }

        if !datum {
            vp.x_datum = 0;
            vp.y_datum = 0;
            vp.x_width = sw;
            vp.y_height = sh;
        }
        vp.x = x;
        vp.y = y;
        vp.w = x + w;
        vp.h = y + h;
        vp.datum = datum;
        self.vp = vp;
    }

    /// Back to the whole screen with the origin at its corner.
    pub fn reset_viewport(&mut self) {
        self.vp = Viewport::full(self.width, self.height);
    }

    /// Any part of the logical rectangle would be drawn
    pub fn check_viewport(&self, x: i32, y: i32, w: i32, h: i32) -> bool {
        self.clip_addr_window(x, y, w, h).is_some()
    }

    /// Crop a logical `x, y, w, h` rectangle. Returns it in device space, or
    /// `None` when nothing is visible.
    pub fn clip_addr_window(&self, x: i32, y: i32, w: i32, h: i32) -> Option<(i32, i32, i32, i32)> {
        let vp = &self.vp;
        if vp.oob {
            return None;
        }
        let (mut x, mut y) = (x.saturating_add(vp.x_datum), y.saturating_add(vp.y_datum));
        let (mut w, mut h) = (w, h);
        if x >= vp.w || y >= vp.h {
            return None;
        }
        if x < vp.x {
            w = w.saturating_sub(vp.x.saturating_sub(x));
            x = vp.x;
        }
        if y < vp.y {
            h = h.saturating_sub(vp.y.saturating_sub(y));
            y = vp.y;
        }
        // x and y now lie inside the viewport, so these differences cannot overflow
        if w > vp.w - x {
            w = vp.w - x;
        }
        if h > vp.h - y {
            h = vp.h - y;
        }
        if w < 1 || h < 1 {
            return None;
        }
        Some((x, y, w, h))
    }

    /// Crop a logical inclusive-corner window. Returns device-space
    /// `(xs, ys, xe, ye)` or `None` when nothing is visible.
    pub fn clip_window(&self, xs: i32, ys: i32, xe: i32, ye: i32) -> Option<(i32, i32, i32, i32)> {
        let vp = &self.vp;
        if vp.oob {
            return None;
        }
        let (xs, ys) = (xs.saturating_add(vp.x_datum), ys.saturating_add(vp.y_datum));
        let (xe, ye) = (xe.saturating_add(vp.x_datum), ye.saturating_add(vp.y_datum));
        if xs >= vp.w || ys >= vp.h || xe < vp.x || ye < vp.y {
            return None;
        }
        Some((xs.max(vp.x), ys.max(vp.y), xe.min(vp.w - 1), ye.min(vp.h - 1)))
    }

    /// Crop an image placed at logical `(x, y)`, keeping track of where the
    /// visible part starts inside the source.
    pub(crate) fn clip_image(&self, x: i32, y: i32, w: i32, h: i32) -> Option<ImageClip> {
        let vp = &self.vp;
        if vp.oob {
            return None;
        }
        let (mut x, mut y) = (x.saturating_add(vp.x_datum), y.saturating_add(vp.y_datum));
        if x >= vp.w || y >= vp.h {
            return None;
        }
        let (mut dx, mut dy, mut dw, mut dh) = (0, 0, w, h);
        if x < vp.x {
            dx = vp.x.saturating_sub(x);
            dw = dw.saturating_sub(dx);
            x = vp.x;
        }
        if y < vp.y {
            dy = vp.y.saturating_sub(y);
            dh = dh.saturating_sub(dy);
            y = vp.y;
        }
        if dw > vp.w - x {
            dw = vp.w - x;
        }
        if dh > vp.h - y {
            dh = vp.h - y;
        }
        if dw < 1 || dh < 1 {
            return None;
        }
        Some(ImageClip { x, y, dx, dy, dw, dh })
    }

    /// Draw a frame of width `w` just inside the viewport, or for negative
    /// `w` just outside it. A large `w` clears the inside or the outside.
    pub fn frame_viewport(&mut self, color: u16, w: i32) -> RenderResult<()> {
        let saved = self.vp;
        let result = if w > 0 {
            // Logical corner of the viewport under either datum mode
            let ox = saved.x - saved.x_datum;
            let oy = saved.y - saved.y_datum;
            let vw = saved.w - saved.x;
            let vh = saved.h - saved.y;
            self.composite(|e| {
                e.fill_rect(ox, oy, vw, w, color)?;
                e.fill_rect(ox, oy + w, w, vh - w - w, color)?;
                e.fill_rect(ox + vw - w, oy + w, w, vh - w - w, color)?;
                e.fill_rect(ox, oy + vh - w, vw, w, color)
            })
        } else {
            let w = -w;
            let (xt, yt, wt, ht) = (saved.x, saved.y, saved.w, saved.h);
            let (xd, yd) = (saved.x_datum, saved.y_datum);
            self.vp = Viewport {
                x: 0,
                y: 0,
                w: self.width,
                h: self.height,
                datum: false,
                ..saved
            };
            self.composite(|e| {
                e.fill_rect(xt - w - xd, yt - w - yd, wt - xt + w + w, w, color)?;
                e.fill_rect(xt - w - xd, yt - yd, w, ht - yt, color)?;
                e.fill_rect(wt - xd, yt - yd, w, ht - yt, color)?;
                e.fill_rect(xt - w - xd, ht - yd, wt - xt + w + w, w, color)
            })
        };
        self.vp = saved;
        result
    }

    /// Move the logical origin without changing the clip region.
    pub fn set_origin(&mut self, x: i32, y: i32) {
        self.vp.x_datum = x;
        self.vp.y_datum = y;
    }

    pub fn origin(&self) -> (i32, i32) {
        (self.vp.x_datum, self.vp.y_datum)
    }

    /// X of the viewport datum
    pub fn viewport_x(&self) -> i32 {
        self.vp.x_datum
    }

    /// Y of the viewport datum
    pub fn viewport_y(&self) -> i32 {
        self.vp.y_datum
    }

    pub fn viewport_width(&self) -> i32 {
        self.vp.x_width
    }

    pub fn viewport_height(&self) -> i32 {
        self.vp.y_height
    }

    pub fn viewport_datum(&self) -> bool {
        self.vp.datum
    }

    pub fn viewport(&self) -> &Viewport {
        &self.vp
    }
}

#[cfg(test)]
mod tests {
    use super::super::testing::*;
    use crate::color::{BLACK, RED, WHITE};

    #[test]
    fn test_viewport_clips_to_screen() {
        let (mut engine, _) = ili9341();
        engine.set_viewport(-10, 300, 50, 50, true);
        let vp = *engine.viewport();
        assert_eq!((vp.x, vp.y, vp.w, vp.h), (0, 300, 40, 320));
        assert_eq!((engine.viewport_x(), engine.viewport_y()), (-10, 300));
        assert_eq!((engine.width(), engine.height()), (50, 50));
        assert!(!vp.oob);
    }

    #[test]
    fn test_offscreen_viewport_draws_nothing() {
        let (mut engine, panel) = ili9341();
        engine.set_viewport(500, 0, 20, 20, true);
        assert!(engine.viewport().oob);
        assert!(!engine.check_viewport(0, 0, 10, 10));
        engine.fill_rect(0, 0, 240, 320, RED).unwrap();
        engine.draw_pixel(0, 0, RED).unwrap();
        assert_eq!(panel.count_not(BLACK), 0);
        assert!(panel.events().is_empty());
    }

    #[test]
    fn test_reset_viewport_restores_full_screen() {
        let (mut engine, panel) = ili9341();
        let before = *engine.viewport();
        let size = (engine.width(), engine.height());

        engine.set_viewport(10, 20, 30, 40, true);
        assert_eq!((engine.width(), engine.height()), (30, 40));
        assert_eq!(engine.origin(), (10, 20));
        engine.reset_viewport();
        assert_eq!(*engine.viewport(), before);
        assert_eq!((engine.width(), engine.height()), size);
        assert_eq!(engine.origin(), (0, 0));

        engine.set_viewport(500, 500, 10, 10, false);
        assert!(engine.viewport().oob);
        engine.fill_rect(0, 0, 10, 10, RED).unwrap();
        assert!(panel.events().is_empty());
        engine.reset_viewport();
        assert_eq!(*engine.viewport(), before);
        assert_eq!((engine.width(), engine.height()), size);
        engine.fill_rect(0, 0, 10, 10, RED).unwrap();
        assert_eq!(panel.count_not(BLACK), 100);
        assert_eq!(panel.pixel(239, 319), BLACK);
    }

    #[test]
    fn test_huge_viewport_clips_to_screen() {
        let (mut engine, _) = ili9341();
        engine.set_viewport(10, 20, i32::MAX, i32::MAX, false);
        let vp = *engine.viewport();
        assert_eq!((vp.x, vp.y, vp.w, vp.h), (10, 20, 240, 320));
        assert!(!vp.oob);

        engine.set_viewport(i32::MIN, i32::MIN, i32::MAX, i32::MAX, false);
        assert!(engine.viewport().oob);
        engine.set_viewport(i32::MAX, 0, i32::MAX, 10, false);
        assert!(engine.viewport().oob);

        engine.reset_viewport();
        assert_eq!(engine.clip_addr_window(100, 100, i32::MAX, i32::MAX), Some((100, 100, 140, 220)));
        assert_eq!(engine.clip_addr_window(i32::MAX, 0, 10, 10), None);
        assert_eq!(engine.clip_window(i32::MIN, 0, i32::MAX, 5), Some((0, 0, 239, 5)));
    }

    #[test]
    fn test_datum_shifts_drawing() {
        let (mut engine, panel) = ili9341();
        engine.set_viewport(100, 100, 20, 20, true);
        engine.draw_pixel(0, 0, RED).unwrap();
        engine.draw_pixel(20, 0, RED).unwrap();
        assert_eq!(panel.pixel(100, 100), RED);
        assert_eq!(panel.count_not(BLACK), 1);

        engine.set_viewport(100, 100, 20, 20, false);
        engine.draw_pixel(105, 105, WHITE).unwrap();
        engine.draw_pixel(5, 5, WHITE).unwrap();
        assert_eq!(panel.pixel(105, 105), WHITE);
        assert_eq!(panel.pixel(5, 5), BLACK);
    }

    #[test]
    fn test_clip_window_keeps_inclusive_edge() {
        let (mut engine, _) = ili9341();
        engine.set_viewport(10, 10, 20, 20, false);
        assert_eq!(engine.clip_window(0, 0, 100, 100), Some((10, 10, 29, 29)));
        // Exactly one past the edge still lands on the last column
        assert_eq!(engine.clip_window(15, 15, 30, 30), Some((15, 15, 29, 29)));
        assert_eq!(engine.clip_window(30, 0, 40, 5), None);
    }

    #[test]
    fn test_clip_addr_window() {
        let (mut engine, _) = ili9341();
        engine.set_viewport(10, 10, 20, 20, true);
        assert_eq!(engine.clip_addr_window(-5, -5, 10, 10), Some((10, 10, 5, 5)));
        assert_eq!(engine.clip_addr_window(15, 15, 10, 10), Some((25, 25, 5, 5)));
        assert_eq!(engine.clip_addr_window(20, 0, 5, 5), None);
        assert!(engine.check_viewport(19, 19, 1, 1));
    }

    #[test]
    fn test_frame_inside_and_outside() {
        let (mut engine, panel) = ili9341();
        engine.set_viewport(50, 50, 40, 30, false);
        engine.frame_viewport(RED, 2).unwrap();
        assert_eq!(panel.pixel(50, 50), RED);
        assert_eq!(panel.pixel(89, 79), RED);
        assert_eq!(panel.pixel(52, 52), BLACK);
        assert_eq!(panel.count_not(BLACK) as i32, 40 * 30 - 36 * 26);

        engine.frame_viewport(WHITE, -3).unwrap();
        assert_eq!(panel.pixel(47, 47), WHITE);
        assert_eq!(panel.pixel(92, 82), WHITE);
        assert_eq!(panel.pixel(46, 46), BLACK);
        assert_eq!(panel.pixel(50, 50), RED);
        // Viewport restored
        assert_eq!(engine.viewport().x, 50);
    }

    #[test]
    fn test_origin_moves_datum() {
        let (mut engine, panel) = ili9341();
        engine.set_origin(30, 40);
        assert_eq!(engine.origin(), (30, 40));
        engine.draw_pixel(1, 1, RED).unwrap();
        assert_eq!(panel.pixel(31, 41), RED);
    }
}
