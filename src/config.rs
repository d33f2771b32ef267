//! Panel configuration
//!
//! Board-level facts the engine needs at construction: controller family,
//! native size, colour order, inversion, bus clocks and the start-up
//! rotation. Presets cover the panels the crate ships controllers for.
//! With the `std` feature a profile can also be read from TOML:
//!
//! ```toml
//! controller = "st7735"
//! width = 80
//! height = 160
//! color_order = "bgr"
//! inversion = true
//! write_hz = 27000000
//! read_hz = 16000000
//! ```

use serde::{Deserialize, Serialize};

use crate::display::{ili9341, madctl, st7735, ControllerKind};

/// Sub-pixel order of the glass
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ColorOrder {
    Rgb,
    #[default]
    Bgr,
}

impl ColorOrder {
    /// MADCTL colour order bit
    pub const fn madctl_bit(self) -> u8 {
        match self {
            ColorOrder::Rgb => 0,
            ColorOrder::Bgr => madctl::BGR,
        }
    }
}

/// Board configuration for one panel
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PanelConfig {
    pub controller: ControllerKind,
    /// Native width in rotation 0
    pub width: u16,
    /// Native height in rotation 0
    pub height: u16,
    pub color_order: ColorOrder,
    /// `Some(true)` sends INVON after init, `Some(false)` INVOFF, `None` neither
    pub inversion: Option<bool>,
    /// Bus clock for writes
    pub write_hz: u32,
    /// Bus clock for reads
    pub read_hz: u32,
    /// Rotation applied by `init()`
    pub rotation: u8,
    /// Busy polls before a pending transfer is reported as stuck
    pub busy_poll_limit: u32,
}

/// Default bound on busy polling
pub const DEFAULT_BUSY_POLL_LIMIT: u32 = 1_000_000;

impl PanelConfig {
    /// 0.96" ST7735 80x160 green tab
    pub const ST7735_80X160: Self = Self {
        controller: ControllerKind::St7735,
        width: st7735::WIDTH,
        height: st7735::HEIGHT,
        color_order: ColorOrder::Bgr,
        inversion: Some(true),
        write_hz: 27_000_000,
        read_hz: 16_000_000,
        rotation: 0,
        busy_poll_limit: DEFAULT_BUSY_POLL_LIMIT,
    };

    /// 2.8" ILI9341 240x320
    pub const ILI9341_240X320: Self = Self {
        controller: ControllerKind::Ili9341,
        width: ili9341::WIDTH,
        height: ili9341::HEIGHT,
        color_order: ColorOrder::Bgr,
        inversion: None,
        write_hz: 40_000_000,
        read_hz: 16_000_000,
        rotation: 0,
        busy_poll_limit: DEFAULT_BUSY_POLL_LIMIT,
    };

    /// Names accepted by [`PanelConfig::preset`]
    pub const PRESET_NAMES: &'static [&'static str] = &["st7735-80x160", "ili9341-240x320"];

    /// Look up a built-in preset. Bare controller names are accepted too.
    pub fn preset(name: &str) -> Option<Self> {
        match name {
            "st7735-80x160" | "st7735" => Some(Self::ST7735_80X160),
            "ili9341-240x320" | "ili9341" => Some(Self::ILI9341_240X320),
            _ => None,
        }
    }

    /// Parse a TOML profile. Missing keys take the ILI9341 defaults.
    #[cfg(feature = "std")]
    pub fn from_toml_str(text: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(text)
    }
}

impl Default for PanelConfig {
    fn default() -> Self {
        Self::ILI9341_240X320
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_preset_lookup() {
        assert_eq!(PanelConfig::preset("st7735"), Some(PanelConfig::ST7735_80X160));
        assert_eq!(PanelConfig::preset("ili9341-240x320"), Some(PanelConfig::ILI9341_240X320));
        assert_eq!(PanelConfig::preset("ssd1306"), None);
        for name in PanelConfig::PRESET_NAMES {
            assert!(PanelConfig::preset(name).is_some(), "{name}");
        }
    }

    #[test]
    fn test_st7735_preset_matches_board() {
        let cfg = PanelConfig::ST7735_80X160;
        assert_eq!((cfg.width, cfg.height), (80, 160));
        assert_eq!(cfg.inversion, Some(true));
        assert_eq!(cfg.write_hz, 27_000_000);
        assert_eq!(cfg.read_hz, 16_000_000);
    }

    #[test]
    fn test_color_order_bit() {
        assert_eq!(ColorOrder::Bgr.madctl_bit(), 0x08);
        assert_eq!(ColorOrder::Rgb.madctl_bit(), 0x00);
    }

    #[cfg(feature = "std")]
    #[test]
    fn test_from_toml_partial_profile() {
        let cfg = PanelConfig::from_toml_str(
            r#"
            controller = "st7735"
            width = 80
            height = 160
            inversion = true
            rotation = 1
            "#,
        )
        .unwrap();
        assert_eq!(cfg.controller, ControllerKind::St7735);
        assert_eq!(cfg.rotation, 1);
        assert_eq!(cfg.inversion, Some(true));
        // Unset keys fall back to the default profile
        assert_eq!(cfg.write_hz, 40_000_000);
    }
}
