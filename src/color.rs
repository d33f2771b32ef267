//! RGB565 colour handling
//!
//! Panels in this crate are driven in 16-bit RGB565 (5 red, 6 green, 5 blue).
//! Colours travel through the engine as plain `u16` words; [`Rgb565`] wraps
//! one for callers that prefer a typed value.

/// RGB565 color (16-bit: 5 red, 6 green, 5 blue)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Rgb565(pub u16);

impl Rgb565 {
    pub const BLACK: Self = Self(BLACK);
    pub const WHITE: Self = Self(WHITE);
    pub const RED: Self = Self(RED);
    pub const GREEN: Self = Self(GREEN);
    pub const BLUE: Self = Self(BLUE);

    /// Create RGB565 from RGB888 components
    pub const fn from_rgb(r: u8, g: u8, b: u8) -> Self {
        Self(color565(r, g, b))
    }

    /// Expand to 0xRRGGBB
    pub const fn to_rgb888(self) -> u32 {
        color16to24(self.0)
    }
}

impl From<u16> for Rgb565 {
    fn from(raw: u16) -> Self {
        Self(raw)
    }
}

impl From<Rgb565> for u16 {
    fn from(color: Rgb565) -> Self {
        color.0
    }
}

// Named colours
pub const BLACK: u16 = 0x0000;
pub const NAVY: u16 = 0x000F;
pub const DARKGREEN: u16 = 0x03E0;
pub const DARKCYAN: u16 = 0x03EF;
pub const MAROON: u16 = 0x7800;
pub const PURPLE: u16 = 0x780F;
pub const OLIVE: u16 = 0x7BE0;
pub const LIGHTGREY: u16 = 0xD69A;
pub const DARKGREY: u16 = 0x7BEF;
pub const BLUE: u16 = 0x001F;
pub const GREEN: u16 = 0x07E0;
pub const CYAN: u16 = 0x07FF;
pub const RED: u16 = 0xF800;
pub const MAGENTA: u16 = 0xF81F;
pub const YELLOW: u16 = 0xFFE0;
pub const WHITE: u16 = 0xFFFF;
pub const ORANGE: u16 = 0xFDA0;
pub const GREENYELLOW: u16 = 0xB7E0;
pub const PINK: u16 = 0xFE19;
pub const BROWN: u16 = 0x9A60;
pub const GOLD: u16 = 0xFEA0;
pub const SILVER: u16 = 0xC618;
pub const SKYBLUE: u16 = 0x867D;
pub const VIOLET: u16 = 0x915C;

/// Sentinel a caller may pass as "no colour" to transparent image pushes
pub const TRANSPARENT: u16 = 0x0120;

/// Palette used for 4 bpp images when the caller supplies none
pub const DEFAULT_4BIT_PALETTE: [u16; 16] = [
    BLACK, BROWN, RED, ORANGE, YELLOW, GREEN, BLUE, PURPLE,
    DARKGREY, WHITE, CYAN, MAGENTA, MAROON, DARKGREEN, NAVY, PINK,
];

/// Pack 8-bit components into RGB565.
pub const fn color565(r: u8, g: u8, b: u8) -> u16 {
    ((r as u16 & 0xF8) << 8) | ((g as u16 & 0xFC) << 3) | (b as u16 >> 3)
}

/// Reduce RGB565 to RGB332.
pub const fn color16to8(c: u16) -> u8 {
    (((c & 0xE000) >> 8) | ((c & 0x0700) >> 6) | ((c & 0x0018) >> 3)) as u8
}

/// Expand RGB332 to RGB565.
pub const fn color8to16(c: u8) -> u16 {
    // 2-bit blue to 5-bit blue
    const BLUE: [u16; 4] = [0, 11, 21, 31];
    let c = c as u16;
    ((c & 0x1C) << 6) | ((c & 0xC0) << 5) | ((c & 0xE0) << 8) | ((c & 0x1C) << 3) | BLUE[(c & 0x03) as usize]
}

/// Expand RGB565 to 0xRRGGBB, replicating high bits into the low ones.
pub const fn color16to24(c: u16) -> u32 {
    let mut r = ((c >> 8) & 0xF8) as u32;
    r |= r >> 5;
    let mut g = ((c >> 3) & 0xFC) as u32;
    g |= g >> 6;
    let mut b = ((c << 3) & 0xF8) as u32;
    b |= b >> 5;
    (r << 16) | (g << 8) | b
}

/// Reduce 0xRRGGBB to RGB565.
pub const fn color24to16(c: u32) -> u16 {
    (((c >> 8) & 0xF800) | ((c >> 5) & 0x07E0) | ((c >> 3) & 0x001F)) as u16
}

/// Stretch 0..=255 onto 0..=256 so full alpha multiplies by exactly one.
#[inline]
const fn alpha_scale(alpha: u8) -> u32 {
    alpha as u32 + (alpha as u32 >> 7)
}

/// Blend `fg` over `bg`. Alpha 255 yields `fg`, alpha 0 yields `bg`.
///
/// Red and blue are blended together in one packed word with 6-bit alpha,
/// green separately with 8-bit alpha. Negative channel deltas rely on
/// wrapping arithmetic; the stray carry bits are masked off on recombine.
#[inline]
pub fn alpha_blend(alpha: u8, fg: u16, bg: u16) -> u16 {
    let a = alpha_scale(alpha);

    let rxb0 = bg as u32 & 0xF81F;
    let rxb = rxb0.wrapping_add(
        (fg as u32 & 0xF81F).wrapping_sub(rxb0).wrapping_mul(a >> 2) >> 6,
    );

    let xgx0 = bg as u32 & 0x07E0;
    let xgx = xgx0.wrapping_add((fg as u32 & 0x07E0).wrapping_sub(xgx0).wrapping_mul(a) >> 8);

    ((rxb & 0xF81F) | (xgx & 0x07E0)) as u16
}

/// Jitter `alpha` by up to `dither` before blending.
///
/// `random(n)` must return a value in `0..n`.
pub fn alpha_blend_dither<R>(alpha: u8, fg: u16, bg: u16, dither: u8, mut random: R) -> u16
where
    R: FnMut(u32) -> u32,
{
    let alpha = dither_alpha(alpha, dither, &mut random);
    alpha_blend(alpha, fg, bg)
}

/// Blend two 0xRRGGBB colours per channel, with optional dither.
pub fn alpha_blend24<R>(alpha: u8, fg: u32, bg: u32, dither: u8, mut random: R) -> u32
where
    R: FnMut(u32) -> u32,
{
    let a = alpha_scale(dither_alpha(alpha, dither, &mut random));

    let blend = |mask: u32| -> u32 {
        let b = bg & mask;
        b.wrapping_add((fg & mask).wrapping_sub(b).wrapping_mul(a) >> 8) & mask
    };

    blend(0xFF0000) | blend(0x00FF00) | blend(0x0000FF)
}

fn dither_alpha<R: FnMut(u32) -> u32>(alpha: u8, dither: u8, random: &mut R) -> u8 {
    if dither == 0 {
        return alpha;
    }
    let jitter = random(2 * dither as u32 + 1) as i32;
    (alpha as i32 - dither as i32 + jitter).clamp(0, 255) as u8
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_color565_primaries() {
        assert_eq!(color565(255, 0, 0), RED);
        assert_eq!(color565(0, 255, 0), GREEN);
        assert_eq!(color565(0, 0, 255), BLUE);
        assert_eq!(color565(255, 255, 255), WHITE);
        assert_eq!(Rgb565::from_rgb(0, 0, 0), Rgb565::BLACK);
    }

    #[test]
    fn test_color8to16_white_and_black() {
        assert_eq!(color8to16(0xFF), 0xFFFF);
        assert_eq!(color8to16(0x00), 0x0000);
        assert_eq!(color16to8(0xFFFF), 0xFF);
    }

    #[test]
    fn test_color16to24_replicates_low_bits() {
        assert_eq!(color16to24(WHITE), 0xFFFFFF);
        assert_eq!(color16to24(RED), 0xFF0000);
        assert_eq!(color16to24(GREEN), 0x00FF00);
        assert_eq!(color24to16(0xFF0000), RED);
    }

    #[test]
    fn test_color16_survives_24bit_round_trip() {
        for c in 0..=u16::MAX {
            assert_eq!(color24to16(color16to24(c)), c, "{c:04x}");
        }
    }

    #[test]
    fn test_alpha_blend_endpoints() {
        let pairs = [(RED, BLUE), (WHITE, BLACK), (BLACK, WHITE), (ORANGE, SKYBLUE), (PINK, OLIVE)];
        for (fg, bg) in pairs {
            assert_eq!(alpha_blend(255, fg, bg), fg, "alpha 255 {fg:04x} over {bg:04x}");
            assert_eq!(alpha_blend(0, fg, bg), bg, "alpha 0 {fg:04x} over {bg:04x}");
        }
    }

    #[test]
    fn test_alpha_blend_midpoint() {
        let mid = alpha_blend(128, WHITE, BLACK);
        let r = mid >> 11;
        let g = (mid >> 5) & 0x3F;
        let b = mid & 0x1F;
        assert!((14..=17).contains(&r), "red {r}");
        assert!((30..=33).contains(&g), "green {g}");
        assert!((14..=17).contains(&b), "blue {b}");
    }

    #[test]
    fn test_alpha_blend_dither_without_jitter() {
        let plain = alpha_blend(100, RED, GREEN);
        assert_eq!(alpha_blend_dither(100, RED, GREEN, 0, |_| 0), plain);
        // random returns the midpoint, so the jitter cancels out
        assert_eq!(alpha_blend_dither(100, RED, GREEN, 4, |n| n / 2), plain);
    }

    #[test]
    fn test_alpha_blend24_endpoints() {
        assert_eq!(alpha_blend24(255, 0x123456, 0xABCDEF, 0, |_| 0), 0x123456);
        assert_eq!(alpha_blend24(0, 0x123456, 0xABCDEF, 0, |_| 0), 0xABCDEF);
    }

    #[test]
    fn test_default_palette_order() {
        assert_eq!(DEFAULT_4BIT_PALETTE[0], BLACK);
        assert_eq!(DEFAULT_4BIT_PALETTE[9], WHITE);
        assert_eq!(DEFAULT_4BIT_PALETTE[15], PINK);
    }
}
