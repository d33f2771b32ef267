//! Font assets
//!
//! Fonts are plain `'static` tables. Lookups are bounds checked: a
//! character the tables do not cover behaves as a zero-width glyph rather
//! than reading past the data.

/// Classic 5x8 font stored as columns, least significant bit at the top.
/// Each glyph is drawn in a 6x8 cell with a blank sixth column.
#[derive(Debug)]
pub struct GlcdFont {
    /// Code of the first glyph in `columns`
    pub first: u16,
    /// Five bytes per glyph
    pub columns: &'static [u8],
}

impl GlcdFont {
    /// Columns of `code` plus the blank spacer column. Codes the table does
    /// not cover come back blank.
    pub fn cell(&self, code: u16) -> [u8; 6] {
        let mut cell = [0u8; 6];
        if let Some(index) = code.checked_sub(self.first) {
            let at = index as usize * 5;
            if let Some(cols) = self.columns.get(at..at + 5) {
                cell[..5].copy_from_slice(cols);
            }
        }
        cell
    }
}

/// How a fixed font packs its glyphs
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FixedEncoding {
    /// One bit per pixel, most significant first. Rows take
    /// `(width + 6) / 8` bytes.
    Bits,
    /// Runs: a byte with bit 7 set is `(b & 0x7F) + 1` foreground pixels,
    /// otherwise `b + 1` background pixels. Runs continue across rows.
    Rle,
}

/// Font with one height and a width per character, covering ' ' to 0x7F
#[derive(Debug)]
pub struct FixedFont {
    pub encoding: FixedEncoding,
    pub height: u8,
    /// Rows from the top of the cell to the baseline
    pub baseline: u8,
    /// Width of each character, starting at ' '
    pub widths: &'static [u8],
    /// Glyph data of each character, starting at ' '
    pub glyphs: &'static [&'static [u8]],
}

impl FixedFont {
    pub const FIRST: u16 = 0x20;
    pub const LAST: u16 = 0x7F;

    fn index(code: u16) -> Option<usize> {
        (Self::FIRST..=Self::LAST)
            .contains(&code)
            .then(|| (code - Self::FIRST) as usize)
    }

    /// Advance of `code`, if the font has it
    pub fn width(&self, code: u16) -> Option<u8> {
        Self::index(code).and_then(|i| self.widths.get(i).copied())
    }

    /// Width and encoded data of `code`
    pub fn glyph(&self, code: u16) -> Option<(u8, &'static [u8])> {
        let i = Self::index(code)?;
        Some((*self.widths.get(i)?, *self.glyphs.get(i)?))
    }
}

/// One glyph of a [`FreeFont`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Glyph {
    /// Start of the glyph's bits in [`FreeFont::bitmap`]
    pub bitmap_offset: u16,
    pub width: u8,
    pub height: u8,
    /// Cursor advance after the glyph
    pub x_advance: u8,
    /// Left edge relative to the cursor
    pub x_offset: i8,
    /// Top edge relative to the baseline, negative above it
    pub y_offset: i8,
}

/// Proportional font drawn from a baseline. Glyph bitmaps are one
/// continuous MSB-first bit stream per glyph, rows not padded.
#[derive(Debug)]
pub struct FreeFont {
    pub bitmap: &'static [u8],
    /// One entry per code from `first` to `last`
    pub glyphs: &'static [Glyph],
    pub first: u16,
    pub last: u16,
    /// Line height
    pub y_advance: u8,
}

impl FreeFont {
    pub fn glyph(&self, code: u16) -> Option<&Glyph> {
        if code < self.first || code > self.last {
            return None;
        }
        self.glyphs.get((code - self.first) as usize)
    }

    /// Bits of `glyph` in drawing order. Runs dry as zeros if the bitmap is
    /// shorter than the glyph claims.
    pub fn bits<'a>(&'a self, glyph: &Glyph) -> impl Iterator<Item = bool> + 'a {
        self.bitmap
            .get(glyph.bitmap_offset as usize..)
            .unwrap_or(&[])
            .iter()
            .flat_map(|&byte| (0..8).rev().map(move |bit| byte >> bit & 1 != 0))
            .chain(core::iter::repeat(false))
    }

    /// Largest extent above and below the baseline over all glyphs
    pub fn extents(&self) -> (i32, i32) {
        self.glyphs.iter().fold((0, 0), |(ascent, descent), g| {
            let above = -(g.y_offset as i32);
            let below = g.height as i32 - above;
            (ascent.max(above), descent.max(below))
        })
    }
}

/// Fonts available to an engine
#[derive(Debug, Clone, Copy)]
pub struct FontSet {
    glcd: Option<&'static GlcdFont>,
    fixed: [Option<&'static FixedFont>; 7],
}

impl Default for FontSet {
    fn default() -> Self {
        Self {
            glcd: Some(&super::GLCD_ASCII),
            fixed: [None; 7],
        }
    }
}

/// Set in [`FontSet::loaded`] when free fonts can be selected
pub const FREE_FONTS_LOADED: u16 = 0x8000;

impl FontSet {
    /// No fonts at all
    pub const fn empty() -> Self {
        Self { glcd: None, fixed: [None; 7] }
    }

    pub fn glcd(&self) -> Option<&'static GlcdFont> {
        self.glcd
    }

    pub fn set_glcd(&mut self, font: Option<&'static GlcdFont>) {
        self.glcd = font;
    }

    /// Fixed font `id` (2-8)
    pub fn fixed(&self, id: u8) -> Option<&'static FixedFont> {
        let slot = (id as usize).checked_sub(2)?;
        self.fixed.get(slot).copied().flatten()
    }

    /// Register `font` as font `id`. Returns false when `id` is not 2-8.
    pub fn set_fixed(&mut self, id: u8, font: Option<&'static FixedFont>) -> bool {
        match (id as usize).checked_sub(2).and_then(|slot| self.fixed.get_mut(slot)) {
            Some(entry) => {
                *entry = font;
                true
            }
            None => false,
        }
    }

    /// Bit N set when font N is present; bit 15 for free fonts
    pub fn loaded(&self) -> u16 {
        let mut bits = FREE_FONTS_LOADED;
        if self.glcd.is_some() {
            bits |= 1 << 1;
        }
        for (slot, font) in self.fixed.iter().enumerate() {
            if font.is_some() {
                bits |= 1 << (slot + 2);
            }
        }
        bits
    }
}

#[cfg(test)]
mod tests {
    use super::super::test_fonts;
    use super::*;

    #[test]
    fn test_glcd_cell_has_spacer_and_blank_outside() {
        let font = &super::super::GLCD_ASCII;
        assert_eq!(font.cell(b'!' as u16), [0x00, 0x00, 0x5F, 0x00, 0x00, 0x00]);
        assert_eq!(font.cell(0x10), [0; 6]);
        assert_eq!(font.cell(0x200), [0; 6]);
    }

    #[test]
    fn test_fixed_lookup_range() {
        let font = &test_fonts::RLE;
        assert_eq!(font.width(b'0' as u16), Some(6));
        assert_eq!(font.width(0x1F), None);
        // Inside the range but past the table
        assert_eq!(font.width(b'A' as u16), None);
        assert!(font.glyph(b' ' as u16).is_some());
    }

    #[test]
    fn test_free_font_extents_and_bits() {
        let font = &test_fonts::FREE;
        assert_eq!(font.extents(), (4, 2));
        assert!(font.glyph(0x40).is_none());
        let a = font.glyph(0x41).unwrap();
        let bits: Vec<bool> = font.bits(a).take(6).collect();
        assert_eq!(bits, [false, true, false, true, false, true]);
    }

    #[test]
    fn test_font_set_registration() {
        let mut fonts = FontSet::default();
        assert_eq!(fonts.loaded(), FREE_FONTS_LOADED | 0x0002);
        assert!(fonts.set_fixed(4, Some(&test_fonts::RLE)));
        assert!(fonts.set_fixed(2, Some(&test_fonts::BITS)));
        assert!(!fonts.set_fixed(9, Some(&test_fonts::RLE)));
        assert!(!fonts.set_fixed(1, Some(&test_fonts::RLE)));
        assert_eq!(fonts.loaded(), FREE_FONTS_LOADED | 0x0016);
        assert!(fonts.fixed(4).is_some());
        assert!(fonts.fixed(3).is_none());
        assert!(fonts.fixed(0).is_none());

        assert_eq!(FontSet::empty().loaded(), FREE_FONTS_LOADED);
    }
}
