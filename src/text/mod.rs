//! Text engine
//!
//! Three kinds of font can be active:
//!
//! - the GLCD font (font 1): 5x8 glyphs stored as columns in 6x8 cells
//! - fixed fonts 2-8: one height, a width per character, glyphs either
//!   bit packed or run-length encoded
//! - a free font: per-glyph size, offsets and advance, drawn from a
//!   baseline. Selecting one replaces the GLCD font as font 1.
//!
//! Strings are laid out against a [`Datum`] and optionally padded so that a
//! shorter string erases what a longer one left behind.

mod font;
mod glcd;
mod layout;
mod render;
mod utf8;

pub use font::{FixedEncoding, FixedFont, FontSet, FreeFont, GlcdFont, Glyph, FREE_FONTS_LOADED};
pub use glcd::GLCD_ASCII;
pub use utf8::{code_points, CodePoints, Utf8Decoder};

use crate::color::{BLACK, WHITE};

/// Anchor point a string is positioned by
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[repr(u8)]
pub enum Datum {
    #[default]
    TopLeft = 0,
    TopCentre = 1,
    TopRight = 2,
    MiddleLeft = 3,
    MiddleCentre = 4,
    MiddleRight = 5,
    BottomLeft = 6,
    BottomCentre = 7,
    BottomRight = 8,
    /// Left end of the line the glyphs sit on
    LeftBaseline = 9,
    CentreBaseline = 10,
    RightBaseline = 11,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Align {
    Left,
    Centre,
    Right,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Row {
    Top,
    Middle,
    Bottom,
    Baseline,
}

impl Datum {
    pub(crate) fn align(self) -> Align {
        match self as u8 % 3 {
            0 => Align::Left,
            1 => Align::Centre,
            _ => Align::Right,
        }
    }

    pub(crate) fn row(self) -> Row {
        match self as u8 / 3 {
            0 => Row::Top,
            1 => Row::Middle,
            2 => Row::Bottom,
            _ => Row::Baseline,
        }
    }
}

/// Text rendering switches
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Attribute {
    /// Index the GLCD font as true code page 437. Off reproduces the
    /// classic table, which skips one glyph above 175.
    Cp437,
    /// Decode UTF-8 in strings and the print stream. Off treats every byte
    /// as one character.
    Utf8,
}

/// Cursor, colours and layout settings for text
#[derive(Debug, Clone, Copy)]
pub struct TextState {
    pub(crate) cursor_x: i32,
    pub(crate) cursor_y: i32,
    pub(crate) size: u8,
    pub(crate) fg: u16,
    pub(crate) bg: u16,
    pub(crate) datum: Datum,
    pub(crate) padding: i32,
    pub(crate) wrap_x: bool,
    pub(crate) wrap_y: bool,
    pub(crate) font: u8,
    pub(crate) free: Option<&'static FreeFont>,
    // Free font extent above and below the baseline
    pub(crate) ascent: i32,
    pub(crate) descent: i32,
    pub(crate) cp437: bool,
    pub(crate) decoder: Utf8Decoder,
}

impl Default for TextState {
    fn default() -> Self {
        Self {
            cursor_x: 0,
            cursor_y: 0,
            size: 1,
            fg: WHITE,
            bg: BLACK,
            datum: Datum::TopLeft,
            padding: 0,
            wrap_x: true,
            wrap_y: false,
            font: 1,
            free: None,
            ascent: 0,
            descent: 0,
            cp437: false,
            decoder: Utf8Decoder::default(),
        }
    }
}


#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_datum_splits_into_align_and_row() {
        assert_eq!(Datum::TopRight.align(), Align::Right);
        assert_eq!(Datum::TopRight.row(), Row::Top);
        assert_eq!(Datum::MiddleCentre.align(), Align::Centre);
        assert_eq!(Datum::MiddleCentre.row(), Row::Middle);
        assert_eq!(Datum::BottomLeft.row(), Row::Bottom);
        assert_eq!(Datum::CentreBaseline.align(), Align::Centre);
        assert_eq!(Datum::CentreBaseline.row(), Row::Baseline);
    }
}
