//! Frame-buffer-less rendering for SPI TFT panels
//!
//! Small serial displays hold their own frame memory, so this crate never
//! keeps a copy of the screen. Every drawing call is turned straight into
//! address-window commands and pixel streams for the panel controller.
//!
//! # Architecture
//!
//! ```text
//! Application
//!     │
//!     ▼
//! ┌──────────────────────────────┐
//! │         RenderEngine         │
//! │  text · smooth · primitives  │
//! │  images · readback           │
//! │  viewport · dispatch · bus   │
//! └──────────────┬───────────────┘
//!                │
//!        ┌───────┴────────┐
//!        ▼                ▼
//! ┌─────────────┐  ┌─────────────┐
//! │ Controller  │  │     HAL     │
//! │ ILI9341 /   │  │  Transfer + │
//! │ ST7735      │  │ ControlPins │
//! └─────────────┘  └──────┬──────┘
//!                         ▼
//!                   SPI + GPIO (board)
//! ```
//!
//! # Example
//!
//! ```ignore
//! let mut tft = RenderEngine::new(spi, pins, PanelConfig::ILI9341_240X320);
//! tft.init()?;
//! tft.fill_screen(color::BLACK)?;
//! tft.set_text_datum(Datum::MiddleCentre);
//! tft.draw_string("Hello", 120, 160, 1)?;
//! tft.fill_smooth_circle(120, 240, 30, color::RED, color::BLACK.into())?;
//! ```
//!
//! The crate is `no_std`. The `std` feature adds the simulated panel in
//! [`hal::sim`] and TOML panel profiles.

#![cfg_attr(not(any(test, feature = "std")), no_std)]

pub mod color;
pub mod config;
pub mod display;
pub mod engine;
pub mod error;
pub mod hal;
pub mod math;
pub mod text;

pub use config::{ColorOrder, PanelConfig};
pub use display::{ControllerKind, DisplayController};
pub use engine::{Background, BusState, Corners, ImageFormat, RenderEngine, Viewport};
pub use error::{BusError, Fault, RenderResult};
pub use text::{Attribute, Datum, FixedFont, FreeFont, GlcdFont, Glyph};
