//! Test scenes
//!
//! Each scene exercises one area of the engine and scales itself to the
//! panel, so the same scene works on an 80x160 and a 320x240 screen.

use clap::ValueEnum;
use log::{debug, info};
use tft_render::color::{self, DEFAULT_4BIT_PALETTE, TRANSPARENT};
use tft_render::hal::sim::{BusStats, SimPanel};
use tft_render::{
    Background, Corners, Datum, ImageFormat, PanelConfig, RenderEngine, RenderResult,
};

pub type SimEngine = RenderEngine<SimPanel, SimPanel>;

/// Scene selector
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum Scene {
    /// Lines, rectangles, circles, ellipses, triangles, gradients
    Primitives,
    /// Anti-aliased arcs, circles, round rectangles and wide lines
    Smooth,
    /// RGB565, 8, 4 and 1 bit images, transparency and masks
    Images,
    /// GLCD text, datums, padding, numbers and the print stream
    Text,
}

impl Scene {
    pub const ALL: [Scene; 4] = [Scene::Primitives, Scene::Smooth, Scene::Images, Scene::Text];

    pub fn name(self) -> &'static str {
        match self {
            Scene::Primitives => "primitives",
            Scene::Smooth => "smooth",
            Scene::Images => "images",
            Scene::Text => "text",
        }
    }

    /// Draw the scene over the whole screen
    pub fn draw(self, tft: &mut SimEngine) -> RenderResult<()> {
        debug!("scene {} on {}x{}", self.name(), tft.width(), tft.height());
        match self {
            Scene::Primitives => primitives(tft),
            Scene::Smooth => smooth(tft),
            Scene::Images => images(tft),
            Scene::Text => text(tft),
        }
    }
}

/// What a scene left on the panel, cropped to the visible area
pub struct Snapshot {
    pub width: usize,
    pub height: usize,
    pub pixels: Vec<u16>,
    /// Bus totals for the scene alone, init excluded
    pub stats: BusStats,
    pub panel: SimPanel,
}

/// Bring up a simulated panel for `config`, draw `scene`, and capture
/// the visible frame memory.
pub fn run(config: &PanelConfig, scene: Scene) -> RenderResult<Snapshot> {
    let panel = SimPanel::for_config(config);
    let mut tft = RenderEngine::new(panel.clone(), panel.clone(), *config);
    tft.init()?;
    panel.clear_events();

    scene.draw(&mut tft)?;
    let stats = panel.stats();

    // The simulator ignores MADCTL, so frame memory is already in screen
    // orientation once the CGRAM offset is removed
    let setup = tft
        .controller()
        .rotation_command(tft.rotation(), config.color_order);
    let (width, height) = (tft.width() as usize, tft.height() as usize);
    let pixels = panel.region(setup.col_start as usize, setup.row_start as usize, width, height);
    info!(
        "{}: {}x{} rotation {}, {} pixels written",
        scene.name(),
        width,
        height,
        tft.rotation(),
        stats.pixels_written
    );

    Ok(Snapshot { width, height, pixels, stats, panel })
}

fn primitives(tft: &mut SimEngine) -> RenderResult<()> {
    let (w, h) = (tft.width(), tft.height());
    let band = h / 4;
    let r = w.min(h) / 8;

    tft.fill_screen(color::BLACK)?;
    tft.fill_rect_v_gradient(0, 0, w, band, color::NAVY, color::DARKCYAN)?;
    tft.fill_rect_h_gradient(0, band, w, band / 4, color::RED, color::YELLOW)?;
    tft.draw_rect(2, 2, w - 4, band - 4, color::WHITE)?;

    let cy = band + band / 4 + r + 4;
    tft.fill_circle(w / 4, cy, r, color::RED)?;
    tft.draw_circle(w / 4, cy, r + 2, color::YELLOW)?;
    tft.fill_ellipse(3 * w / 4, cy, r, r / 2, color::GREEN)?;
    tft.draw_ellipse(3 * w / 4, cy, r + 2, r / 2 + 2, color::WHITE)?;

    let ty = cy + r + 6;
    tft.fill_triangle(w / 2, ty, w / 4, ty + 2 * r, 3 * w / 4, ty + 2 * r, color::MAGENTA)?;
    tft.draw_triangle(w / 2, ty, w / 4, ty + 2 * r, 3 * w / 4, ty + 2 * r, color::WHITE)?;

    let ry = ty + 2 * r + 6;
    tft.fill_round_rect(4, ry, w / 2 - 6, r, r / 3, color::ORANGE)?;
    tft.draw_round_rect(w / 2 + 2, ry, w / 2 - 6, r, r / 3, color::SKYBLUE)?;

    // Fan of lines from the bottom left corner
    let fy = ry + r + 4;
    for i in 0..8 {
        let shade = color::color565(255 - i as u8 * 30, 64, i as u8 * 30);
        tft.draw_line(0, h - 1, (w - 1) * i / 7, fy, shade)?;
    }
    tft.draw_fast_hline(0, h - 1, w, color::WHITE)?;
    tft.draw_fast_vline(w - 1, fy, h - fy, color::WHITE)
}

fn smooth(tft: &mut SimEngine) -> RenderResult<()> {
    let (w, h) = (tft.width(), tft.height());
    let bg = Background::Solid(color::DARKGREY);
    let r = w.min(h) / 4 - 2;

    tft.fill_screen(color::DARKGREY)?;

    // Gauge: thick arc with a thinner full ring inside
    let (cx, cy) = (w / 2, r + 4);
    tft.draw_smooth_arc(cx, cy, r, r - r / 4, 30, 330, color::ORANGE, bg, true)?;
    tft.draw_arc(cx, cy, r / 2, r / 2 - 3, 0, 360, color::SKYBLUE, bg, true)?;
    tft.draw_spot(cx as f32, cy as f32, 3.0, color::WHITE, bg)?;

    let sy = 2 * r + 12;
    let sr = r / 2;
    tft.fill_smooth_circle(w / 4, sy + sr, sr, color::RED, bg)?;
    tft.draw_smooth_circle(3 * w / 4, sy + sr, sr, color::WHITE, bg)?;

    let ry = sy + 2 * sr + 6;
    tft.fill_smooth_round_rect(4, ry, w - 8, sr, sr / 3, color::GREEN, bg)?;
    tft.draw_smooth_round_rect(4, ry + sr + 4, 6, 4, w - 8, sr, color::YELLOW, bg, Corners::all())?;

    let ly = (ry + 2 * sr + 12) as f32;
    let (left, right) = (4.0, (w - 5) as f32);
    tft.draw_wide_line(left, ly, right, (h - 6) as f32, 3.0, color::YELLOW, bg)?;
    // Blended against whatever is already on screen
    tft.draw_wedge_line(left, (h - 6) as f32, right, ly, 1.0, 4.0, color::CYAN, Background::ReadBack)
}

fn images(tft: &mut SimEngine) -> RenderResult<()> {
    let (w, h) = (tft.width(), tft.height());
    let iw = w - 8;
    let ih = (h / 6).max(8);
    let (x, mut y) = (4, 4);

    tft.fill_screen(color::BLACK)?;

    // RGB565 gradient
    let ramp: Vec<u16> = (0..iw * ih)
        .map(|i| {
            let (px, py) = (i % iw, i / iw);
            color::color565((px * 255 / iw) as u8, (py * 255 / ih) as u8, 128)
        })
        .collect();
    tft.push_image(x, y, iw, ih, &ramp)?;
    y += ih + 4;

    // RGB332 stripes
    let rgb332: Vec<u8> = (0..iw * ih).map(|i| ((i % iw) * 256 / iw) as u8).collect();
    tft.push_image8(x, y, iw, ih, &rgb332, ImageFormat::Rgb332)?;
    y += ih + 4;

    // 16 palette bars, two pixels per byte
    let row_bytes = (iw as usize + 1) / 2;
    let indexed: Vec<u8> = (0..ih as usize)
        .flat_map(|_| {
            (0..row_bytes).map(move |b| {
                let hi = (b * 2 * 16 / iw as usize) as u8 & 0x0F;
                let lo = ((b * 2 + 1) * 16 / iw as usize) as u8 & 0x0F;
                (hi << 4) | lo
            })
        })
        .collect();
    tft.push_image8(x, y, iw, ih, &indexed, ImageFormat::Indexed4(&DEFAULT_4BIT_PALETTE))?;
    y += ih + 4;

    // 1-bit checkerboard in the bitmap colours
    let mono_bytes = (iw as usize + 7) / 8;
    let mono: Vec<u8> = (0..ih as usize)
        .flat_map(|row| (0..mono_bytes).map(move |_| if (row / 4) % 2 == 0 { 0xF0 } else { 0x0F }))
        .collect();
    tft.set_bitmap_color(color::WHITE, color::NAVY);
    tft.push_image8(x, y, iw, ih, &mono, ImageFormat::Mono)?;
    y += ih + 4;

    // Sprite with a transparent key over the gradient, then a masked copy
    let side = ih.min(iw / 3);
    let sprite: Vec<u16> = (0..side * side)
        .map(|i| {
            let (px, py) = (i % side - side / 2, i / side - side / 2);
            if px * px + py * py <= (side / 2) * (side / 2) {
                color::GOLD
            } else {
                TRANSPARENT
            }
        })
        .collect();
    tft.push_image_trans(x + iw / 2 - side / 2, 4 + (ih - side) / 2, side, side, &sprite, TRANSPARENT)?;

    let mask_bytes = (side as usize + 7) / 8;
    let mask: Vec<u8> = sprite
        .chunks(side as usize)
        .flat_map(|row| {
            let mut bits = vec![0u8; mask_bytes];
            for (i, &c) in row.iter().enumerate() {
                if c != TRANSPARENT {
                    bits[i / 8] |= 0x80 >> (i % 8);
                }
            }
            bits
        })
        .collect();
    tft.push_masked_image(x, y.min(h - side), side, side, &sprite, &mask)
}

fn text(tft: &mut SimEngine) -> RenderResult<()> {
    let (w, h) = (tft.width(), tft.height());

    tft.fill_screen(color::BLACK)?;
    tft.set_text_color_bg(color::WHITE, color::BLACK);
    tft.set_text_datum(Datum::TopLeft);
    tft.draw_string("tft-sim", 2, 2, 1)?;

    tft.set_text_size(2);
    tft.set_text_color_bg(color::YELLOW, color::NAVY);
    tft.set_text_datum(Datum::MiddleCentre);
    tft.draw_string("Hi!", w / 2, h / 6, 1)?;

    // Right aligned, padded so shorter numbers erase longer ones
    tft.set_text_size(1);
    tft.set_text_color_bg(color::GREEN, color::BLACK);
    tft.set_text_datum(Datum::TopRight);
    tft.set_text_padding(tft.text_width("-88888", 1) as u16);
    let mut ny = h / 4;
    for n in [12345, -42, 7] {
        tft.draw_number(n, w - 2, ny, 1)?;
        ny += tft.font_height(1) + 2;
    }
    tft.draw_float(12.345, 2, w - 2, ny, 1)?;
    tft.set_text_padding(0);

    tft.set_text_datum(Datum::BottomCentre);
    tft.set_text_color(color::CYAN);
    tft.draw_centre_string("centre", w / 2, h / 2 + 8, 1)?;

    // Print stream with wrapping
    tft.set_text_datum(Datum::TopLeft);
    tft.set_text_color_bg(color::WHITE, color::DARKGREY);
    tft.set_text_wrap(true, false);
    tft.set_cursor(0, h / 2 + 12);
    for b in "The print stream wraps at the right edge of the screen.\n".bytes() {
        tft.write_byte(b)?;
    }
    for b in "0x20..0x7E: !\"#$%&'()*+,-./:;<=>?@[\\]^_`{|}~".bytes() {
        tft.write_byte(b)?;
    }
    Ok(())
}
