//! Bus transactions
//!
//! Chip select is asserted lazily and released as soon as no caller needs
//! it. Three things can hold the bus open:
//!
//! - an in-flight primitive (`in_write`)
//! - a composite primitive made of other primitives (`composite`)
//! - the caller, between [`RenderEngine::start_write`] and
//!   [`RenderEngine::end_write`]
//!
//! A read always runs at the read clock inside its own select, and restores
//! whatever write state was in force before it.

use log::warn;

use super::RenderEngine;
use crate::error::{Fault, RenderResult};
use crate::hal::{ControlPins, Transfer};

/// Chip-select ownership
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BusState {
    /// Deselected
    Idle,
    /// Selected for the current primitive only
    Open,
    /// Selected and held by the caller until `end_write`
    OpenHeld,
}

impl<B: Transfer, P: ControlPins> RenderEngine<B, P> {
    /// Hold the bus open across several draw calls.
    pub fn start_write(&mut self) {
        self.begin_write();
        self.bus_state = BusState::OpenHeld;
    }

    /// Release a bus held by [`start_write`](Self::start_write). Waits for any
    /// pending transfer first.
    pub fn end_write(&mut self) -> RenderResult<()> {
        if self.bus_state == BusState::OpenHeld {
            self.bus_state = BusState::Open;
        }
        self.end_write_inner()
    }

    pub fn bus_state(&self) -> BusState {
        self.bus_state
    }

    /// A non-blocking transfer may still be running
    pub fn transfer_pending(&self) -> bool {
        self.pending
    }

    /// Wait for the last non-blocking transfer to finish.
    pub fn wait_transfer(&mut self) -> RenderResult<()> {
        self.drain()
    }

    pub(crate) fn begin_write(&mut self) {
        if self.bus_state == BusState::Idle {
            self.bus.set_clock_speed(self.config.write_hz);
            self.bus.select();
            self.bus_state = BusState::Open;
        }
    }

    pub(crate) fn end_write_inner(&mut self) -> RenderResult<()> {
        if self.bus_state != BusState::Open || self.scope_depth > 0 {
            return Ok(());
        }
        let drained = self.drain();
        self.bus.deselect();
        self.bus_state = BusState::Idle;
        drained
    }

    /// Run `f` with the bus selected, releasing it afterwards unless a scope
    /// or the caller holds it.
    pub(crate) fn in_write<T>(
        &mut self,
        f: impl FnOnce(&mut Self) -> RenderResult<T>,
    ) -> RenderResult<T> {
        self.begin_write();
        let result = f(self);
        let end = self.end_write_inner();
        let value = result?;
        end.map(|()| value)
    }

    /// Run a primitive built from other primitives. Inner primitives do not
    /// release the bus; the outermost scope does.
    pub(crate) fn composite<T>(
        &mut self,
        f: impl FnOnce(&mut Self) -> RenderResult<T>,
    ) -> RenderResult<T> {
        self.scope_depth += 1;
        let result = f(self);
        self.scope_depth -= 1;
        let end = if self.scope_depth == 0 {
            self.end_write_inner()
        } else {
            Ok(())
        };
        let value = result?;
        end.map(|()| value)
    }

    /// Block until the last non-blocking transfer has completed.
    pub(crate) fn drain(&mut self) -> RenderResult<()> {
        if !self.pending {
            return Ok(());
        }
        let mut polls = 0u32;
        while self.bus.is_busy() {
            polls += 1;
            if polls >= self.config.busy_poll_limit {
                warn!("transfer still busy after {} polls", polls);
                return Err(Fault::BusTimeout);
            }
        }
        self.bus.await_transfer_complete()?;
        self.pending = false;
        Ok(())
    }

    /// Switch to the read clock in a fresh select. Returns the state to hand
    /// back to [`end_read`](Self::end_read).
    pub(crate) fn begin_read(&mut self) -> RenderResult<BusState> {
        let prior = self.bus_state;
        if prior != BusState::Idle {
            let drained = self.drain();
            self.bus.deselect();
            drained?;
        }
        self.bus.set_clock_speed(self.config.read_hz);
        self.bus.select();
        self.bus_state = BusState::Open;
        Ok(prior)
    }

    pub(crate) fn end_read(&mut self, prior: BusState) {
        self.bus.deselect();
        self.bus_state = BusState::Idle;
        if prior != BusState::Idle {
            self.begin_write();
            self.bus_state = prior;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::super::testing::*;
    use super::*;
    use crate::color::{RED, WHITE};

    #[test]
    fn test_held_write_selects_once() {
        let (mut engine, panel) = ili9341();
        engine.start_write();
        for x in 0..10 {
            engine.draw_pixel(x, 0, RED).unwrap();
        }
        engine.fill_rect(0, 10, 5, 5, WHITE).unwrap();
        engine.end_write().unwrap();

        let stats = panel.stats();
        assert_eq!(stats.selects, 1);
        assert_eq!(stats.deselects, 1);
        assert!(!panel.is_selected());
        assert_eq!(engine.bus_state(), BusState::Idle);
    }

    #[test]
    fn test_unheld_primitives_release_bus() {
        let (mut engine, panel) = ili9341();
        engine.draw_pixel(1, 1, RED).unwrap();
        engine.draw_pixel(2, 1, RED).unwrap();
        let stats = panel.stats();
        assert_eq!(stats.selects, 2);
        assert_eq!(stats.deselects, 2);
        assert!(!panel.is_selected());
    }

    #[test]
    fn test_composite_selects_once() {
        let (mut engine, panel) = ili9341();
        engine.draw_rect(10, 10, 30, 20, RED).unwrap();
        assert_eq!(panel.stats().selects, 1);
        assert_eq!(panel.stats().deselects, 1);
        assert!(!panel.is_selected());
    }

    #[test]
    fn test_read_inside_held_write_restores_state() {
        let (mut engine, panel) = ili9341();
        engine.start_write();
        engine.draw_pixel(5, 5, RED).unwrap();
        let c = engine.read_pixel(5, 5).unwrap();
        assert_eq!(c, RED);
        assert_eq!(engine.bus_state(), BusState::OpenHeld);
        assert!(panel.is_selected());
        assert_eq!(panel.clock_hz(), engine.config().write_hz);
        engine.end_write().unwrap();

        let stats = panel.stats();
        assert_eq!(stats.selects, 3);
        assert_eq!(stats.deselects, 3);
    }

    #[test]
    fn test_read_runs_at_read_clock() {
        let (mut engine, panel) = ili9341();
        let mut clocks = Vec::new();
        engine.read_pixel(0, 0).unwrap();
        for e in panel.events() {
            if let crate::hal::sim::BusEvent::Clock(hz) = e {
                clocks.push(hz);
            }
        }
        assert_eq!(clocks, vec![engine.config().read_hz]);
    }

    #[test]
    fn test_no_overlap_with_non_blocking_fill() {
        let (mut engine, panel) = ili9341();
        panel.set_busy_latency(3);
        engine.fill_rect(0, 0, 100, 100, RED).unwrap();
        engine.draw_pixel(200, 200, WHITE).unwrap();
        assert_eq!(panel.overlap_errors(), 0);
        assert!(!engine.transfer_pending());
        assert_eq!(panel.pixel(50, 50), RED);
    }

    #[test]
    fn test_stuck_bus_times_out() {
        let (mut engine, panel) = engine_for(crate::config::PanelConfig {
            busy_poll_limit: 8,
            ..crate::config::PanelConfig::ILI9341_240X320
        });
        panel.set_stuck(true);
        assert_eq!(engine.fill_rect(0, 0, 50, 50, RED), Err(Fault::BusTimeout));
        // Bus released even after the fault
        assert!(!panel.is_selected());
        assert_eq!(engine.bus_state(), BusState::Idle);
        panel.set_stuck(false);
    }
}
