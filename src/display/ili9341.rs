//! ILI9341 LCD Controller
//!
//! 240x320 TFT controller found on most 2.2" to 3.2" SPI modules.
//! Memory reads come back as RGB666, three bytes per pixel.

use super::{cmd, madctl, DisplayController, ReadFormat, RotationSetup, INIT_DELAY};
use crate::config::ColorOrder;

/// ILI9341 specific commands
#[allow(dead_code)]
mod reg {
    pub const FRMCTR1: u8 = 0xB1;  // Frame rate control (normal mode)
    pub const DFUNCTR: u8 = 0xB6;  // Display function control
    pub const PWCTR1: u8 = 0xC0;
    pub const PWCTR2: u8 = 0xC1;
    pub const VMCTR1: u8 = 0xC5;
    pub const VMCTR2: u8 = 0xC7;
    pub const PWCTRA: u8 = 0xCB;
    pub const PWCTRB: u8 = 0xCF;
    pub const GMCTRP1: u8 = 0xE0;  // Positive gamma
    pub const GMCTRN1: u8 = 0xE1;  // Negative gamma
    pub const DTCA: u8 = 0xE8;     // Driver timing control A
    pub const DTCB: u8 = 0xEA;     // Driver timing control B
    pub const PONSEQ: u8 = 0xED;   // Power on sequence control
    pub const UNDOC_EF: u8 = 0xEF;
    pub const EN3G: u8 = 0xF2;     // Enable 3 gamma
    pub const PUMPRC: u8 = 0xF7;   // Pump ratio control
    pub const GAMSET: u8 = 0x26;
}

/// Native panel size (portrait)
pub const WIDTH: u16 = 240;
pub const HEIGHT: u16 = 320;

#[rustfmt::skip]
static INIT: &[u8] = &[
    21,
    reg::UNDOC_EF, 3, 0x03, 0x80, 0x02,
    reg::PWCTRB, 3, 0x00, 0xC1, 0x30,
    reg::PONSEQ, 4, 0x64, 0x03, 0x12, 0x81,
    reg::DTCA, 3, 0x85, 0x00, 0x78,
    reg::PWCTRA, 5, 0x39, 0x2C, 0x00, 0x34, 0x02,
    reg::PUMPRC, 1, 0x20,
    reg::DTCB, 2, 0x00, 0x00,
    reg::PWCTR1, 1, 0x23,
    reg::PWCTR2, 1, 0x10,
    reg::VMCTR1, 2, 0x3E, 0x28,
    reg::VMCTR2, 1, 0x86,
    cmd::MADCTL, 1, madctl::MX | madctl::BGR,
    cmd::COLMOD, 1, 0x55,
    reg::FRMCTR1, 2, 0x00, 0x13,
    reg::DFUNCTR, 3, 0x08, 0x82, 0x27,
    reg::EN3G, 1, 0x00,
    reg::GAMSET, 1, 0x01,
    reg::GMCTRP1, 15,
        0x0F, 0x31, 0x2B, 0x0C, 0x0E, 0x08, 0x4E, 0xF1,
        0x37, 0x07, 0x10, 0x03, 0x0E, 0x09, 0x00,
    reg::GMCTRN1, 15,
        0x00, 0x0E, 0x14, 0x03, 0x11, 0x07, 0x31, 0xC1,
        0x48, 0x08, 0x0F, 0x0C, 0x31, 0x36, 0x0F,
    cmd::SLPOUT, INIT_DELAY, 120,
    cmd::DISPON, INIT_DELAY, 20,
];

/// ILI9341 driver description
pub struct Ili9341;

impl DisplayController for Ili9341 {
    fn name(&self) -> &'static str {
        "ILI9341"
    }

    fn rotation_command(&self, rotation: u8, order: ColorOrder) -> RotationSetup {
        let (bits, swap_axes) = match rotation & 3 {
            0 => (madctl::MX, false),
            1 => (madctl::MV, true),
            2 => (madctl::MY, false),
            _ => (madctl::MX | madctl::MY | madctl::MV, true),
        };
        RotationSetup {
            madctl: bits | order.madctl_bit(),
            swap_axes,
            col_start: 0,
            row_start: 0,
        }
    }

    fn init_sequence(&self) -> &'static [u8] {
        INIT
    }

    fn read_format(&self) -> ReadFormat {
        ReadFormat::Rgb666
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rotation_madctl_bgr() {
        let expected = [0x48, 0x28, 0x88, 0xE8];
        for (rot, want) in expected.into_iter().enumerate() {
            let setup = Ili9341.rotation_command(rot as u8, ColorOrder::Bgr);
            assert_eq!(setup.madctl, want, "rotation {rot}");
            assert_eq!(setup.swap_axes, rot & 1 == 1);
        }
    }

    #[test]
    fn test_rotation_rgb_clears_bgr_bit() {
        assert_eq!(Ili9341.rotation_command(0, ColorOrder::Rgb).madctl, 0x40);
    }
}
