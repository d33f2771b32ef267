//! ST7735 LCD Controller
//!
//! Configured for the 0.96" 80x160 "green tab" glass. The visible area sits
//! inside the controller's 132x162 frame memory, so every address carries a
//! CGRAM offset that depends on rotation.

use super::{cmd, madctl, DisplayController, ReadFormat, RotationSetup, INIT_DELAY};
use crate::config::ColorOrder;

/// ST7735 specific commands
#[allow(dead_code)]
mod reg {
    pub const FRMCTR1: u8 = 0xB1;
    pub const FRMCTR2: u8 = 0xB2;
    pub const FRMCTR3: u8 = 0xB3;
    pub const INVCTR: u8 = 0xB4;
    pub const PWCTR1: u8 = 0xC0;
    pub const PWCTR2: u8 = 0xC1;
    pub const PWCTR3: u8 = 0xC2;
    pub const PWCTR4: u8 = 0xC3;
    pub const PWCTR5: u8 = 0xC4;
    pub const VMCTR1: u8 = 0xC5;
    pub const GMCTRP1: u8 = 0xE0;
    pub const GMCTRN1: u8 = 0xE1;
}

/// Native panel size (portrait)
pub const WIDTH: u16 = 80;
pub const HEIGHT: u16 = 160;

/// Offset of the glass inside frame memory, portrait
const COL_START: i32 = 26;
const ROW_START: i32 = 1;

#[rustfmt::skip]
static INIT: &[u8] = &[
    21,
    cmd::SWRESET, INIT_DELAY, 150,
    cmd::SLPOUT, INIT_DELAY, 255,
    reg::FRMCTR1, 3, 0x01, 0x2C, 0x2D,
    reg::FRMCTR2, 3, 0x01, 0x2C, 0x2D,
    reg::FRMCTR3, 6, 0x01, 0x2C, 0x2D, 0x01, 0x2C, 0x2D,
    reg::INVCTR, 1, 0x07,
    reg::PWCTR1, 3, 0xA2, 0x02, 0x84,
    reg::PWCTR2, 1, 0xC5,
    reg::PWCTR3, 2, 0x0A, 0x00,
    reg::PWCTR4, 2, 0x8A, 0x2A,
    reg::PWCTR5, 2, 0x8A, 0xEE,
    reg::VMCTR1, 1, 0x0E,
    cmd::INVOFF, 0,
    cmd::MADCTL, 1, madctl::MX | madctl::MY | madctl::BGR,
    cmd::COLMOD, 1, 0x05,
    // 80x160 window
    cmd::CASET, 4, 0x00, 0x00, 0x00, 0x4F,
    cmd::PASET, 4, 0x00, 0x00, 0x00, 0x9F,
    reg::GMCTRP1, 16,
        0x02, 0x1C, 0x07, 0x12, 0x37, 0x32, 0x29, 0x2D,
        0x29, 0x25, 0x2B, 0x39, 0x00, 0x01, 0x03, 0x10,
    reg::GMCTRN1, 16,
        0x03, 0x1D, 0x07, 0x06, 0x2E, 0x2C, 0x29, 0x2D,
        0x2E, 0x2E, 0x37, 0x3F, 0x00, 0x00, 0x02, 0x10,
    cmd::NORON, INIT_DELAY, 10,
    cmd::DISPON, INIT_DELAY, 100,
];

/// ST7735 driver description
pub struct St7735;

impl DisplayController for St7735 {
    fn name(&self) -> &'static str {
        "ST7735"
    }

    fn rotation_command(&self, rotation: u8, order: ColorOrder) -> RotationSetup {
        let (bits, swap_axes) = match rotation & 3 {
            0 => (madctl::MX | madctl::MY, false),
            1 => (madctl::MY | madctl::MV, true),
            2 => (0, false),
            _ => (madctl::MX | madctl::MV, true),
        };
        let (col_start, row_start) = if swap_axes {
            (ROW_START, COL_START)
        } else {
            (COL_START, ROW_START)
        };
        RotationSetup {
            madctl: bits | order.madctl_bit(),
            swap_axes,
            col_start,
            row_start,
        }
    }

    fn init_sequence(&self) -> &'static [u8] {
        INIT
    }

    fn read_format(&self) -> ReadFormat {
        ReadFormat::Rgb666Shifted
    }
}
