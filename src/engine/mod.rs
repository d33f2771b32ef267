//! Rendering engine
//!
//! [`RenderEngine`] owns everything that used to be process-wide state in a
//! frame-buffer-less TFT driver: the bus handles, the controller, the
//! rotation-dependent surface size, the viewport, the bus transaction state
//! and the text settings. Every drawing call goes through it.
//!
//! ```text
//!   text / smooth / primitives / image        (what to draw)
//!                  │
//!                  ▼
//!             viewport clip                   (where it may land)
//!                  │
//!                  ▼
//!       dispatch: set_window + push_*         (how it reaches the wire)
//!                  │
//!                  ▼
//!         transaction: select / deselect      (when the bus is held)
//!                  │
//!                  ▼
//!        Transfer + ControlPins (board)
//! ```

pub mod dispatch;
mod image;
pub mod primitives;
mod readback;
pub mod smooth;
pub mod transaction;
pub mod viewport;

use log::debug;

use crate::config::PanelConfig;
use crate::display::{cmd, DisplayController, InitCommands};
use crate::error::{Fault, RenderResult};
use crate::hal::{ControlPins, Transfer};
use crate::text::{FontSet, TextState};

pub use dispatch::DMA_BENEFIT_LENGTH;
pub use image::{ImageFormat, LINE_BUFFER_PIXELS};
pub use primitives::Corners;
pub use smooth::Background;
pub use transaction::BusState;
pub use viewport::Viewport;

/// Frame-buffer-less renderer for one panel
pub struct RenderEngine<B: Transfer, P: ControlPins> {
    pub(crate) bus: B,
    pub(crate) pins: P,
    pub(crate) controller: &'static dyn DisplayController,
    pub(crate) config: PanelConfig,

    // Surface, per rotation
    pub(crate) width: i32,
    pub(crate) height: i32,
    pub(crate) rotation: u8,
    pub(crate) col_start: i32,
    pub(crate) row_start: i32,
    // Last column/row sent by draw_pixel, None after any set_window
    pub(crate) addr_col: Option<i32>,
    pub(crate) addr_row: Option<i32>,

    pub(crate) vp: Viewport,

    pub(crate) bus_state: BusState,
    pub(crate) scope_depth: u32,
    pub(crate) pending: bool,

    pub(crate) swap_bytes: bool,
    pub(crate) bitmap_fg: u16,
    pub(crate) bitmap_bg: u16,
    pub(crate) pivot: (i32, i32),

    pub(crate) text: TextState,
    pub(crate) fonts: FontSet,
}

impl<B: Transfer, P: ControlPins> RenderEngine<B, P> {
    /// Engine for the controller named in `config`.
    pub fn new(bus: B, pins: P, config: PanelConfig) -> Self {
        Self::with_controller(bus, pins, config.controller.controller(), config)
    }

    /// Engine with an explicit controller implementation.
    pub fn with_controller(
        bus: B,
        pins: P,
        controller: &'static dyn DisplayController,
        config: PanelConfig,
    ) -> Self {
        let width = config.width as i32;
        let height = config.height as i32;
        Self {
            bus,
            pins,
            controller,
            config,
            width,
            height,
            rotation: 0,
            col_start: 0,
            row_start: 0,
            addr_col: None,
            addr_row: None,
            vp: Viewport::full(width, height),
            bus_state: BusState::Idle,
            scope_depth: 0,
            pending: false,
            swap_bytes: false,
            bitmap_fg: crate::color::WHITE,
            bitmap_bg: crate::color::BLACK,
            pivot: (0, 0),
            text: TextState::default(),
            fonts: FontSet::default(),
        }
    }

    /// Reset the panel, replay the controller init sequence and apply the
    /// configured inversion and rotation.
    pub fn init(&mut self) -> RenderResult<()> {
        debug!(
            "{}: init {}x{} rotation {}",
            self.controller.name(),
            self.config.width,
            self.config.height,
            self.config.rotation
        );

        self.bus_state = BusState::Idle;
        self.scope_depth = 0;
        self.pending = false;
        self.addr_col = None;
        self.addr_row = None;

        // Known bus state for panels with CS tied low
        self.write_command(cmd::NOP)?;

        self.pins.reset_deassert();
        self.pins.delay_ms(5);
        self.pins.reset_assert();
        self.pins.delay_ms(20);
        self.pins.reset_deassert();
        self.pins.delay_ms(150);

        self.in_write(|e| {
            for entry in InitCommands::new(e.controller.init_sequence())? {
                let entry = entry?;
                e.command(entry.command)?;
                for &arg in entry.args {
                    e.write8(arg)?;
                }
                if let Some(ms) = entry.delay_ms {
                    e.pins.delay_ms(ms);
                }
            }

            let (colmod, format) = e.controller.pixel_format_command();
            e.command(colmod)?;
            e.write8(format)?;

            match e.config.inversion {
                Some(true) => e.command(cmd::INVON),
                Some(false) => e.command(cmd::INVOFF),
                None => Ok(()),
            }
        })?;

        self.set_rotation(self.config.rotation)?;
        self.pins.backlight_on();
        Ok(())
    }

    /// Set the panel orientation (0-3, quarter turns clockwise).
    ///
    /// Resets the viewport and the address cache.
    pub fn set_rotation(&mut self, rotation: u8) -> RenderResult<()> {
        if rotation > 3 {
            return Err(Fault::InvalidRotation(rotation));
        }

        let setup = self.controller.rotation_command(rotation, self.config.color_order);
        self.in_write(|e| {
            e.command(cmd::MADCTL)?;
            e.write8(setup.madctl)?;
            e.pins.delay_ms(10);
            Ok(())
        })?;

        let (w, h) = (self.config.width as i32, self.config.height as i32);
        (self.width, self.height) = if setup.swap_axes { (h, w) } else { (w, h) };
        self.rotation = rotation;
        self.col_start = setup.col_start;
        self.row_start = setup.row_start;
        self.addr_col = None;
        self.addr_row = None;
        self.reset_viewport();

        debug!(
            "{}: rotation {} madctl {:#04x} {}x{}",
            self.controller.name(),
            rotation,
            setup.madctl,
            self.width,
            self.height
        );
        Ok(())
    }

    pub fn rotation(&self) -> u8 {
        self.rotation
    }

    /// Drawable width: the viewport's when its datum is active, else the panel's
    pub fn width(&self) -> i32 {
        if self.vp.datum {
            self.vp.x_width
        } else {
            self.width
        }
    }

    /// Drawable height: the viewport's when its datum is active, else the panel's
    pub fn height(&self) -> i32 {
        if self.vp.datum {
            self.vp.y_height
        } else {
            self.height
        }
    }

    /// Invert panel colours. The command is sent twice; some panels miss one.
    pub fn invert_display(&mut self, invert: bool) -> RenderResult<()> {
        let c = if invert { cmd::INVON } else { cmd::INVOFF };
        self.in_write(|e| {
            e.command(c)?;
            e.command(c)
        })
    }

    /// Send a bare command byte.
    pub fn write_command(&mut self, c: u8) -> RenderResult<()> {
        self.in_write(|e| e.command(c))
    }

    /// Send one data byte.
    pub fn write_data(&mut self, d: u8) -> RenderResult<()> {
        self.in_write(|e| {
            e.pins.dc_data();
            e.write8(d)
        })
    }

    pub fn controller(&self) -> &'static dyn DisplayController {
        self.controller
    }

    pub fn config(&self) -> &PanelConfig {
        &self.config
    }

    /// Byte-swap buffer words on their way to the panel.
    pub fn set_swap_bytes(&mut self, swap: bool) {
        self.swap_bytes = swap;
    }

    pub fn swap_bytes(&self) -> bool {
        self.swap_bytes
    }

    /// Colours for 1 bpp images. Equal colours would hide the image, so the
    /// background becomes the foreground's complement.
    pub fn set_bitmap_color(&mut self, fg: u16, bg: u16) {
        let bg = if fg == bg { !fg } else { bg };
        self.bitmap_fg = fg;
        self.bitmap_bg = bg;
    }

    pub fn bitmap_color(&self) -> (u16, u16) {
        (self.bitmap_fg, self.bitmap_bg)
    }

    /// Store a pivot point for callers that rotate content about it.
    pub fn set_pivot(&mut self, x: i32, y: i32) {
        self.pivot = (x, y);
    }

    pub fn pivot(&self) -> (i32, i32) {
        self.pivot
    }

    /// Hand back the bus and pins.
    pub fn release(self) -> (B, P) {
        (self.bus, self.pins)
    }
}

#[cfg(test)]
pub(crate) mod testing {
    use super::*;
    use crate::hal::sim::SimPanel;

    pub(crate) type SimEngine = RenderEngine<SimPanel, SimPanel>;

    /// Initialised ILI9341 engine on a simulated panel, event log cleared
    pub(crate) fn ili9341() -> (SimEngine, SimPanel) {
        engine_for(PanelConfig::ILI9341_240X320)
    }

    pub(crate) fn engine_for(config: PanelConfig) -> (SimEngine, SimPanel) {
        let panel = SimPanel::for_config(&config);
        let mut engine = RenderEngine::new(panel.clone(), panel.clone(), config);
        engine.init().unwrap();
        panel.clear_events();
        (engine, panel)
    }
}

#[cfg(test)]
mod tests {
    use super::testing::*;
    use super::*;
    use crate::hal::sim::{BusEvent, SimPanel};

    #[test]
    fn test_init_replays_sequence_and_releases_bus() {
        let config = PanelConfig::ST7735_80X160;
        let panel = SimPanel::for_config(&config);
        let mut engine = RenderEngine::new(panel.clone(), panel.clone(), config);
        engine.init().unwrap();

        let commands = panel.commands();
        assert_eq!(commands[0], cmd::NOP);
        assert!(commands.contains(&cmd::SWRESET));
        assert!(commands.contains(&cmd::COLMOD));
        assert_eq!(*commands.last().unwrap(), cmd::MADCTL);
        assert!(panel.inverted());
        assert_eq!(panel.madctl(), 0xC8);
        assert!(!panel.is_selected());
        assert_eq!(engine.bus_state(), BusState::Idle);

        let events = panel.events();
        let reset_pulse: Vec<_> = events
            .iter()
            .filter(|e| matches!(e, BusEvent::Reset(_)))
            .collect();
        assert_eq!(reset_pulse, [&BusEvent::Reset(false), &BusEvent::Reset(true), &BusEvent::Reset(false)]);
        // 5 + 20 + 150 reset, 150 + 500 + 10 + 100 init, 10 rotation
        assert_eq!(panel.elapsed_ms(), 945);
    }

    #[test]
    fn test_rotation_swaps_size_and_resets_viewport() {
        let (mut engine, panel) = ili9341();
        assert_eq!((engine.width(), engine.height()), (240, 320));

        engine.set_viewport(10, 10, 50, 50, true);
        engine.set_rotation(1).unwrap();
        assert_eq!((engine.width(), engine.height()), (320, 240));
        assert_eq!(engine.viewport_width(), 320);
        assert_eq!(panel.madctl(), 0x28);
        assert_eq!(engine.rotation(), 1);

        assert_eq!(engine.set_rotation(4), Err(Fault::InvalidRotation(4)));
    }

    #[test]
    fn test_invert_display_sends_twice() {
        let (mut engine, panel) = ili9341();
        engine.invert_display(true).unwrap();
        assert_eq!(panel.commands(), vec![cmd::INVON, cmd::INVON]);
        assert!(panel.inverted());
    }

    #[test]
    fn test_bitmap_color_never_equal() {
        let (mut engine, _) = ili9341();
        engine.set_bitmap_color(0x1234, 0x1234);
        assert_eq!(engine.bitmap_color(), (0x1234, !0x1234));
    }
}
