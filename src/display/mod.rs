//! Display controllers
//!
//! Each panel family answers a handful of questions the engine asks at run
//! time: which commands address the frame memory, what MADCTL value and
//! CGRAM offset a rotation needs, how to bring the chip out of reset, and
//! how pixels come back on a read. [`ControllerKind`] picks one from a
//! [`PanelConfig`](crate::config::PanelConfig).

pub mod ili9341;
pub mod st7735;

use serde::{Deserialize, Serialize};

use crate::config::ColorOrder;
use crate::error::{Fault, RenderResult};

pub use ili9341::Ili9341;
pub use st7735::St7735;

/// MIPI DCS commands shared by the supported controllers
#[allow(dead_code)]
pub mod cmd {
    pub const NOP: u8 = 0x00;
    pub const SWRESET: u8 = 0x01;
    pub const SLPOUT: u8 = 0x11;
    pub const NORON: u8 = 0x13;
    pub const INVOFF: u8 = 0x20;
    pub const INVON: u8 = 0x21;
    pub const DISPOFF: u8 = 0x28;
    pub const DISPON: u8 = 0x29;
    pub const CASET: u8 = 0x2A;    // Column address set
    pub const PASET: u8 = 0x2B;    // Page address set
    pub const RAMWR: u8 = 0x2C;    // Memory write
    pub const RAMRD: u8 = 0x2E;    // Memory read
    pub const MADCTL: u8 = 0x36;   // Memory access control
    pub const COLMOD: u8 = 0x3A;   // Pixel format
    pub const RDINDEX: u8 = 0xD9;  // Indexed register read (SPI interface II)
}

/// MADCTL bits
pub mod madctl {
    pub const MY: u8 = 0x80;
    pub const MX: u8 = 0x40;
    pub const MV: u8 = 0x20;
    pub const ML: u8 = 0x10;
    pub const BGR: u8 = 0x08;
    pub const MH: u8 = 0x04;
}

/// Arg-count flag in an init sequence: a delay byte follows the arguments
pub const INIT_DELAY: u8 = 0x80;

/// Commands that address and access frame memory
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AddressCommands {
    pub column: u8,
    pub row: u8,
    pub write: u8,
    pub read: u8,
}

impl AddressCommands {
    /// CASET / PASET / RAMWR / RAMRD
    pub const DCS: Self = Self {
        column: cmd::CASET,
        row: cmd::PASET,
        write: cmd::RAMWR,
        read: cmd::RAMRD,
    };
}

/// What the engine needs to apply one rotation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RotationSetup {
    /// Value for the MADCTL register
    pub madctl: u8,
    /// Width and height trade places
    pub swap_axes: bool,
    /// CGRAM column offset
    pub col_start: i32,
    /// CGRAM row offset
    pub row_start: i32,
}

/// Pixel format returned by a memory read
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReadFormat {
    /// Three bytes, 6 significant bits each, left aligned
    Rgb666,
    /// Three bytes, value held one bit low
    Rgb666Shifted,
    /// Two bytes, RGB565 big endian
    Rgb565,
}

impl ReadFormat {
    /// Bytes clocked in per pixel
    pub const fn bytes_per_pixel(self) -> usize {
        match self {
            ReadFormat::Rgb666 | ReadFormat::Rgb666Shifted => 3,
            ReadFormat::Rgb565 => 2,
        }
    }

    /// Decode one pixel worth of bytes into 8-bit components.
    pub fn decode_rgb(self, bytes: &[u8]) -> (u8, u8, u8) {
        match self {
            ReadFormat::Rgb666 => (bytes[0], bytes[1], bytes[2]),
            ReadFormat::Rgb666Shifted => (bytes[0] << 1, bytes[1] << 1, bytes[2] << 1),
            ReadFormat::Rgb565 => {
                let c = u16::from_be_bytes([bytes[0], bytes[1]]);
                let rgb = crate::color::color16to24(c);
                ((rgb >> 16) as u8, (rgb >> 8) as u8, rgb as u8)
            }
        }
    }

    /// Decode one pixel worth of bytes into RGB565.
    pub fn decode(self, bytes: &[u8]) -> u16 {
        match self {
            ReadFormat::Rgb565 => u16::from_be_bytes([bytes[0], bytes[1]]),
            _ => {
                let (r, g, b) = self.decode_rgb(bytes);
                crate::color::color565(r, g, b)
            }
        }
    }
}

/// Capabilities of one panel controller family
pub trait DisplayController: Sync {
    /// Short name for logs
    fn name(&self) -> &'static str;

    /// Frame memory addressing commands
    fn address_window(&self) -> AddressCommands {
        AddressCommands::DCS
    }

    /// MADCTL value and offsets for `rotation` (0-3)
    fn rotation_command(&self, rotation: u8, order: ColorOrder) -> RotationSetup;

    /// Pixel format command and its argument (16 bpp)
    fn pixel_format_command(&self) -> (u8, u8) {
        (cmd::COLMOD, 0x55)
    }

    /// Power-up command list: count, then `cmd, nargs[|INIT_DELAY], args.., [ms]`
    fn init_sequence(&self) -> &'static [u8];

    /// How the chip returns pixels on RAMRD
    fn read_format(&self) -> ReadFormat;
}

/// Controller family named in a panel profile
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ControllerKind {
    Ili9341,
    St7735,
}

impl ControllerKind {
    /// The controller implementation for this family
    pub fn controller(self) -> &'static dyn DisplayController {
        match self {
            ControllerKind::Ili9341 => &Ili9341,
            ControllerKind::St7735 => &St7735,
        }
    }
}

/// One command from an init sequence
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InitCommand<'a> {
    pub command: u8,
    pub args: &'a [u8],
    pub delay_ms: Option<u32>,
}

/// Walks a command list, checking every length against the slice.
pub struct InitCommands<'a> {
    data: &'a [u8],
    pos: usize,
    remaining: u8,
}

impl<'a> InitCommands<'a> {
    pub fn new(data: &'a [u8]) -> RenderResult<Self> {
        let (&count, _) = data.split_first().ok_or(Fault::InvalidInitSequence)?;
        Ok(Self { data, pos: 1, remaining: count })
    }

    fn take(&mut self, n: usize) -> RenderResult<&'a [u8]> {
        let end = self.pos + n;
        let bytes = self.data.get(self.pos..end).ok_or(Fault::InvalidInitSequence)?;
        self.pos = end;
        Ok(bytes)
    }
}

impl<'a> Iterator for InitCommands<'a> {
    type Item = RenderResult<InitCommand<'a>>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.remaining == 0 {
            return None;
        }
        self.remaining -= 1;

        let parsed = (|| {
            let head = self.take(2)?;
            let (command, nargs) = (head[0], head[1]);
            let args = self.take((nargs & !INIT_DELAY) as usize)?;
            let delay_ms = if nargs & INIT_DELAY != 0 {
                let ms = self.take(1)?[0];
                Some(if ms == 255 { 500 } else { ms as u32 })
            } else {
                None
            };
            Ok(InitCommand { command, args, delay_ms })
        })();

        if parsed.is_err() {
            // Stop after the first malformed entry
            self.remaining = 0;
        }
        Some(parsed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_init_commands_parse() {
        let seq = [2, cmd::SWRESET, INIT_DELAY, 150, cmd::MADCTL, 1, 0x48];
        let cmds: Vec<_> = InitCommands::new(&seq).unwrap().collect::<Result<_, _>>().unwrap();
        assert_eq!(cmds.len(), 2);
        assert_eq!(cmds[0], InitCommand { command: cmd::SWRESET, args: &[], delay_ms: Some(150) });
        assert_eq!(cmds[1], InitCommand { command: cmd::MADCTL, args: &[0x48], delay_ms: None });
    }

    #[test]
    fn test_init_delay_255_means_500() {
        let seq = [1, cmd::SLPOUT, INIT_DELAY, 255];
        let first = InitCommands::new(&seq).unwrap().next().unwrap().unwrap();
        assert_eq!(first.delay_ms, Some(500));
    }

    #[test]
    fn test_init_commands_truncated() {
        let seq = [2, cmd::MADCTL, 3, 0x48];
        let mut it = InitCommands::new(&seq).unwrap();
        assert_eq!(it.next(), Some(Err(Fault::InvalidInitSequence)));
        assert_eq!(it.next(), None);
        assert!(InitCommands::new(&[]).is_err());
    }

    #[test]
    fn test_builtin_sequences_are_well_formed() {
        for kind in [ControllerKind::Ili9341, ControllerKind::St7735] {
            let seq = kind.controller().init_sequence();
            let parsed: Result<Vec<_>, _> = InitCommands::new(seq).unwrap().collect();
            let parsed = parsed.unwrap();
            assert_eq!(parsed.len(), seq[0] as usize);
        }
    }

    #[test]
    fn test_read_format_decode() {
        assert_eq!(ReadFormat::Rgb666.decode(&[0xFC, 0x00, 0x00]), 0xF800);
        assert_eq!(ReadFormat::Rgb666Shifted.decode(&[0x7E, 0x7E, 0x7E]), 0xFFFF);
        assert_eq!(ReadFormat::Rgb565.decode(&[0x12, 0x34]), 0x1234);
        assert_eq!(ReadFormat::Rgb666.bytes_per_pixel(), 3);
    }
}
