//! TFT Simulator
//!
//! Drives the tft-render engine against a simulated panel on the host, so
//! scenes can be checked without hardware.
//!
//! # Usage
//!
//! ```bash
//! # List built-in panel profiles
//! tft-sim panels list
//!
//! # Show a profile, or dump it as a TOML starting point
//! tft-sim panels show st7735
//! tft-sim panels show ili9341 --toml > my-panel.toml
//!
//! # Render a scene to a PPM image
//! tft-sim render --panel ili9341 --scene smooth --rotation 1 -o smooth.ppm
//! tft-sim render --config my-panel.toml --scene text -o text.ppm
//!
//! # Bus statistics for every scene
//! tft-sim trace --panel st7735
//! ```

mod ppm;
mod profiles;
mod scenes;

use std::collections::BTreeMap;
use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use clap::{Args, Parser, Subcommand};
use colored::Colorize;
use tft_render::hal::sim::BusEvent;

use profiles::{get_profile, profile_names, PanelProfile};
use scenes::Scene;

/// TFT Simulator
///
/// Renders test scenes on a simulated SPI panel
#[derive(Parser)]
#[command(name = "tft-sim")]
#[command(version = "0.1.0")]
#[command(about = "Render tft-render scenes on a simulated SPI panel")]
#[command(propagate_version = true)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable debug logging
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Panel profile operations
    #[command(subcommand)]
    Panels(PanelCommands),

    /// Draw a scene and write the screen as a PPM image
    Render {
        #[command(flatten)]
        target: Target,

        /// Scene to draw
        #[arg(short, long, value_enum)]
        scene: Scene,

        /// Output path
        #[arg(short, long)]
        output: PathBuf,
    },

    /// Draw scenes and print what went over the bus
    Trace {
        #[command(flatten)]
        target: Target,

        /// Scene to trace (default: all)
        #[arg(short, long, value_enum)]
        scene: Option<Scene>,

        /// Also print a per-command histogram
        #[arg(long)]
        commands: bool,
    },
}

#[derive(Subcommand)]
enum PanelCommands {
    /// List built-in panel profiles
    List,

    /// Show a panel profile
    Show {
        /// Profile name (e.g., st7735, ili9341-240x320)
        panel: String,

        /// Print as TOML instead of a summary
        #[arg(long)]
        toml: bool,
    },
}

/// Which panel to simulate
#[derive(Args)]
struct Target {
    /// Built-in profile name
    #[arg(short, long, conflicts_with = "config", default_value = "ili9341")]
    panel: String,

    /// Profile TOML file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Rotation 0-3 (overrides the profile)
    #[arg(short, long)]
    rotation: Option<u8>,
}

impl Target {
    fn resolve(&self) -> Result<PanelProfile> {
        let mut profile = match &self.config {
            Some(path) => PanelProfile::load(path)?,
            None => get_profile(&self.panel).cloned().with_context(|| {
                format!(
                    "Unknown panel profile: {}. Use 'tft-sim panels list' to see available profiles.",
                    self.panel
                )
            })?,
        };
        if let Some(rotation) = self.rotation {
            if rotation > 3 {
                bail!("Rotation must be 0-3, got {}", rotation);
            }
            profile.config.rotation = rotation;
        }
        Ok(profile)
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let level = if cli.verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level)).init();

    match cli.command {
        Commands::Panels(cmd) => handle_panels(cmd),
        Commands::Render { target, scene, output } => handle_render(&target, scene, output),
        Commands::Trace { target, scene, commands } => handle_trace(&target, scene, commands),
    }
}

fn handle_panels(cmd: PanelCommands) -> Result<()> {
    match cmd {
        PanelCommands::List => {
            println!("{}", "=".repeat(60));
            println!("{}", "Built-in Panel Profiles".cyan().bold());
            println!("{}", "=".repeat(60));

            for name in profile_names() {
                if let Some(profile) = get_profile(name) {
                    println!("\n  {}: {}", name.white().bold(), profile.description);
                    println!("    Controller: {:?}", profile.config.controller);
                    println!("    Size: {}x{}", profile.config.width, profile.config.height);
                }
            }

            println!("\n{}", "=".repeat(60));
            println!(
                "Use {} to see detailed profile information",
                "tft-sim panels show <panel>".cyan()
            );
        }

        PanelCommands::Show { panel, toml } => {
            let profile = get_profile(&panel).with_context(|| {
                format!(
                    "Unknown panel profile: {}. Use 'tft-sim panels list' to see available profiles.",
                    panel
                )
            })?;
            if toml {
                print!("{}", profile.to_toml()?);
            } else {
                print_profile(profile);
            }
        }
    }

    Ok(())
}

fn print_profile(profile: &PanelProfile) {
    let cfg = &profile.config;
    println!("{}", "=".repeat(70));
    println!("{}", format!("Panel Profile: {}", profile.name).cyan().bold());
    println!("{}", "=".repeat(70));

    println!("\n{}", "Panel:".white().bold());
    println!("  Description: {}", profile.description);
    println!("  Controller: {}", cfg.controller.controller().name());
    println!("  Native size: {}x{}", cfg.width, cfg.height);
    println!("  Colour order: {:?}", cfg.color_order);
    let inversion = match cfg.inversion {
        Some(true) => "on",
        Some(false) => "off",
        None => "controller default",
    };
    println!("  Inversion: {}", inversion);
    println!("  Start-up rotation: {}", cfg.rotation);

    println!("\n{}", "Bus:".white().bold());
    println!("  Write clock: {:.1} MHz", cfg.write_hz as f64 / 1e6);
    println!("  Read clock: {:.1} MHz", cfg.read_hz as f64 / 1e6);
    println!("  Busy poll limit: {}", cfg.busy_poll_limit);

    println!("\n{}", "Rotations:".white().bold());
    let controller = cfg.controller.controller();
    for rotation in 0..4 {
        let setup = controller.rotation_command(rotation, cfg.color_order);
        println!(
            "  {}: MADCTL 0x{:02X}, offset ({}, {}){}",
            rotation,
            setup.madctl,
            setup.col_start,
            setup.row_start,
            if setup.swap_axes { ", axes swapped".dimmed().to_string() } else { String::new() }
        );
    }

    println!("\n{}", "=".repeat(70));
}

fn handle_render(target: &Target, scene: Scene, output: PathBuf) -> Result<()> {
    let profile = target.resolve()?;
    let snap = scenes::run(&profile.config, scene)
        .with_context(|| format!("Scene {} failed on {}", scene.name(), profile.name))?;
    ppm::save(&output, snap.width, snap.height, &snap.pixels)?;

    println!(
        "{} {} on {} ({}x{}) -> {}",
        "[OK]".green().bold(),
        scene.name(),
        profile.name,
        snap.width,
        snap.height,
        output.display()
    );
    Ok(())
}

fn handle_trace(target: &Target, scene: Option<Scene>, commands: bool) -> Result<()> {
    let profile = target.resolve()?;
    let selected = match scene {
        Some(scene) => vec![scene],
        None => Scene::ALL.to_vec(),
    };

    println!("{}", "=".repeat(70));
    println!(
        "{}",
        format!("Bus Trace: {} rotation {}", profile.name, profile.config.rotation)
            .cyan()
            .bold()
    );
    println!("{}", "=".repeat(70));

    for scene in selected {
        let snap = scenes::run(&profile.config, scene)
            .with_context(|| format!("Scene {} failed on {}", scene.name(), profile.name))?;
        let s = snap.stats;

        println!("\n{}", scene.name().white().bold());
        println!("  Selects / deselects: {} / {}", s.selects, s.deselects);
        println!("  Commands: {}", s.commands);
        println!("  Data bytes: {}", s.data_bytes);
        println!("  Blocks: {} ({} words)", s.blocks, s.block_words);
        println!("  Pixels written: {}", s.pixels_written);
        let overlaps = snap.panel.overlap_errors();
        if overlaps > 0 {
            println!("  {} {} accesses during a pending transfer", "[WARN]".yellow().bold(), overlaps);
        }

        if commands {
            let mut histogram: BTreeMap<u8, usize> = BTreeMap::new();
            for event in snap.panel.events() {
                if let BusEvent::Command(c) = event {
                    *histogram.entry(c).or_default() += 1;
                }
            }
            for (c, n) in histogram {
                println!("    0x{:02X}: {}", c, n.to_string().dimmed());
            }
        }
    }

    println!("\n{}", "=".repeat(70));
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn target(panel: &str, rotation: Option<u8>) -> Target {
        Target { panel: panel.to_string(), config: None, rotation }
    }

    #[test]
    fn test_cli_parses_render() {
        let cli = Cli::try_parse_from([
            "tft-sim", "render", "--panel", "st7735", "--scene", "smooth", "-r", "2", "-o", "out.ppm",
        ])
        .unwrap();
        match cli.command {
            Commands::Render { target, scene, output } => {
                assert_eq!(target.panel, "st7735");
                assert_eq!(target.rotation, Some(2));
                assert_eq!(scene, Scene::Smooth);
                assert_eq!(output, PathBuf::from("out.ppm"));
            }
            _ => panic!("expected render"),
        }
    }

    #[test]
    fn test_panel_and_config_conflict() {
        let parsed = Cli::try_parse_from([
            "tft-sim", "trace", "--panel", "st7735", "--config", "x.toml",
        ]);
        assert!(parsed.is_err());
    }

    #[test]
    fn test_resolve_applies_rotation() {
        let profile = target("ili9341", Some(3)).resolve().unwrap();
        assert_eq!(profile.config.rotation, 3);
        assert!(target("ili9341", Some(4)).resolve().is_err());
        assert!(target("nope", None).resolve().is_err());
    }

    #[test]
    fn test_render_writes_ppm() {
        let dir = tempfile::tempdir().unwrap();
        let output = dir.path().join("primitives.ppm");
        handle_render(&target("st7735", Some(1)), Scene::Primitives, output.clone()).unwrap();

        let bytes = std::fs::read(&output).unwrap();
        let header = b"P6\n160 80\n255\n";
        assert_eq!(&bytes[..header.len()], header);
        assert_eq!(bytes.len(), header.len() + 160 * 80 * 3);
    }
}
