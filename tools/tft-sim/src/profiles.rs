//! Panel profiles
//!
//! Built-in profiles wrap the engine's presets with a name and description.
//! Custom profiles are TOML files with the same keys as
//! [`PanelConfig`], plus optional `name` and `description`.

use std::collections::HashMap;
use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use tft_render::PanelConfig;

/// A named panel configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PanelProfile {
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(flatten)]
    pub config: PanelConfig,
}

impl PanelProfile {
    fn builtin(name: &str, description: &str, config: PanelConfig) -> Self {
        Self {
            name: name.to_string(),
            description: description.to_string(),
            config,
        }
    }

    /// Parse a profile file's contents. `fallback_name` is used when the
    /// file has no `name` key.
    pub fn parse(text: &str, fallback_name: &str) -> Result<Self> {
        #[derive(Deserialize)]
        struct ProfileFile {
            name: Option<String>,
            #[serde(default)]
            description: String,
            #[serde(flatten)]
            config: PanelConfig,
        }

        let file: ProfileFile = toml::from_str(text)?;
        Ok(Self {
            name: file.name.unwrap_or_else(|| fallback_name.to_string()),
            description: file.description,
            config: file.config,
        })
    }

    /// Load a profile from a TOML file
    pub fn load(path: &Path) -> Result<Self> {
        let text = fs::read_to_string(path)
            .with_context(|| format!("Failed to read profile {}", path.display()))?;
        let stem = path
            .file_stem()
            .and_then(|s| s.to_str())
            .unwrap_or("custom");
        Self::parse(&text, stem).with_context(|| format!("Invalid profile {}", path.display()))
    }

    /// The profile as TOML, in the format `load` accepts
    pub fn to_toml(&self) -> Result<String> {
        Ok(toml::to_string_pretty(self)?)
    }
}

/// Registry of built-in panel profiles, keyed by name and alias
pub static PANEL_PROFILES: Lazy<HashMap<&'static str, PanelProfile>> = Lazy::new(|| {
    let st7735 = PanelProfile::builtin(
        "st7735-80x160",
        "0.96\" ST7735 IPS, 80x160, green tab offsets",
        PanelConfig::ST7735_80X160,
    );
    let ili9341 = PanelProfile::builtin(
        "ili9341-240x320",
        "2.8\" ILI9341 TFT, 240x320",
        PanelConfig::ILI9341_240X320,
    );

    let mut m = HashMap::new();
    m.insert("st7735", st7735.clone());
    m.insert("st7735-80x160", st7735);
    m.insert("ili9341", ili9341.clone());
    m.insert("ili9341-240x320", ili9341);
    m
});

/// Look up a built-in profile by name or alias
pub fn get_profile(name: &str) -> Option<&'static PanelProfile> {
    PANEL_PROFILES.get(name.to_lowercase().as_str())
}

/// Canonical profile names, without aliases
pub fn profile_names() -> &'static [&'static str] {
    PanelConfig::PRESET_NAMES
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tft_render::{ColorOrder, ControllerKind};

    #[test]
    fn test_every_name_resolves() {
        for name in profile_names() {
            let profile = get_profile(name).unwrap();
            assert_eq!(profile.name, *name);
        }
        assert_eq!(get_profile("ST7735").unwrap().config, PanelConfig::ST7735_80X160);
        assert!(get_profile("ssd1306").is_none());
    }

    #[test]
    fn test_parse_profile_with_name() {
        let profile = PanelProfile::parse(
            r#"
            name = "bench-panel"
            description = "ST7735 on the bench rig"
            controller = "st7735"
            width = 80
            height = 160
            color_order = "rgb"
            rotation = 3
            "#,
            "unused",
        )
        .unwrap();
        assert_eq!(profile.name, "bench-panel");
        assert_eq!(profile.config.controller, ControllerKind::St7735);
        assert_eq!(profile.config.color_order, ColorOrder::Rgb);
        assert_eq!(profile.config.rotation, 3);
    }

    #[test]
    fn test_load_uses_file_stem_as_name() {
        let mut file = tempfile::Builder::new().prefix("wide").suffix(".toml").tempfile().unwrap();
        writeln!(file, "controller = \"ili9341\"").unwrap();
        writeln!(file, "rotation = 1").unwrap();

        let profile = PanelProfile::load(file.path()).unwrap();
        assert!(profile.name.starts_with("wide"));
        assert_eq!(profile.config.rotation, 1);
        assert_eq!(profile.config.width, 240);
    }

    #[test]
    fn test_load_missing_file_names_path() {
        let err = PanelProfile::load(Path::new("/nonexistent/panel.toml")).unwrap_err();
        assert!(format!("{err:#}").contains("/nonexistent/panel.toml"));
    }

    #[test]
    fn test_toml_dump_reloads() {
        let profile = get_profile("st7735").unwrap();
        let text = profile.to_toml().unwrap();
        let again = PanelProfile::parse(&text, "x").unwrap();
        assert_eq!(again.name, profile.name);
        assert_eq!(again.config, profile.config);
    }
}
