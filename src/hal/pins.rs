//! Display control lines
//!
//! | Line | Function                      |
//! |------|-------------------------------|
//! | DC   | low = command, high = data    |
//! | RST  | active low reset              |
//! | BL   | backlight enable              |

/// Board control lines and timing
pub trait ControlPins {
    /// Set DC for command mode (low)
    fn dc_command(&mut self);

    /// Set DC for data mode (high)
    fn dc_data(&mut self);

    /// Assert reset (active low)
    fn reset_assert(&mut self);

    /// Deassert reset
    fn reset_deassert(&mut self);

    /// Busy-wait `ms` milliseconds
    fn delay_ms(&mut self, ms: u32);

    /// Turn backlight on. Boards without a backlight line ignore it.
    fn backlight_on(&mut self) {}

    /// Turn backlight off
    fn backlight_off(&mut self) {}
}
