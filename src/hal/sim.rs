//! Simulated panel
//!
//! An in-memory stand-in for a serial display: it decodes the DCS command
//! stream the engine emits, keeps a 16-bit frame memory, answers memory and
//! register reads, and records every bus event so tests can check what went
//! over the wire.
//!
//! [`SimPanel`] is a cheap handle; clones share one panel. Hand one clone
//! to the engine as its [`Transfer`], one as its [`ControlPins`], and keep
//! a third to inspect the result.

use std::cell::RefCell;
use std::collections::{HashMap, VecDeque};
use std::rc::Rc;

use super::{ControlPins, Stride, Transfer};
use crate::config::PanelConfig;
use crate::display::{cmd, ReadFormat};
use crate::error::BusError;

/// One observable bus event
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BusEvent {
    Select,
    Deselect,
    Clock(u32),
    Command(u8),
    Data(u8),
    Block { count: usize, stride: Stride, blocking: bool },
    Reset(bool),
    Delay(u32),
}

/// Running totals, kept even when event recording is off
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BusStats {
    pub selects: usize,
    pub deselects: usize,
    pub commands: usize,
    pub data_bytes: usize,
    pub blocks: usize,
    pub block_words: usize,
    pub pixels_written: usize,
}

struct SimState {
    width: usize,
    height: usize,
    gram: Vec<u16>,
    read_format: ReadFormat,

    selected: bool,
    dc_data: bool,
    command: Option<u8>,
    params: Vec<u8>,
    col: (u16, u16),
    row: (u16, u16),
    cursor: (u16, u16),
    pixel_hi: Option<u8>,
    read_queue: VecDeque<u8>,

    madctl: u8,
    inverted: bool,
    clock_hz: u32,
    reg_index: u8,
    registers: HashMap<u8, [u8; 16]>,

    busy_latency: u32,
    busy_polls: u32,
    stuck: bool,
    pending: bool,
    overlap_errors: usize,

    recording: bool,
    events: Vec<BusEvent>,
    stats: BusStats,
    elapsed_ms: u64,
}

impl SimState {
    fn log(&mut self, event: BusEvent) {
        if self.recording {
            self.events.push(event);
        }
    }

    fn check_idle(&mut self) {
        if self.pending {
            self.overlap_errors += 1;
        }
    }

    fn begin_command(&mut self, c: u8) {
        self.stats.commands += 1;
        self.command = Some(c);
        self.params.clear();
        self.pixel_hi = None;
        match c {
            cmd::RAMWR => self.cursor = (self.col.0, self.row.0),
            cmd::RAMRD => {
                self.cursor = (self.col.0, self.row.0);
                self.read_queue.clear();
                // First byte clocked out of a memory read is a dummy
                self.read_queue.push_back(0x00);
            }
            cmd::INVON => self.inverted = true,
            cmd::INVOFF => self.inverted = false,
            cmd::SWRESET => self.reset_registers(),
            _ => {}
        }
    }

    fn data_byte(&mut self, value: u8) -> u8 {
        self.stats.data_bytes += 1;
        let command = self.command;
        match command {
            Some(cmd::CASET) | Some(cmd::PASET) => {
                self.params.push(value);
                if self.params.len() == 4 {
                    let start = u16::from_be_bytes([self.params[0], self.params[1]]);
                    let end = u16::from_be_bytes([self.params[2], self.params[3]]);
                    if command == Some(cmd::CASET) {
                        self.col = (start, end);
                    } else {
                        self.row = (start, end);
                    }
                }
                0
            }
            Some(cmd::MADCTL) => {
                self.madctl = value;
                0
            }
            Some(cmd::RDINDEX) => {
                self.reg_index = value & 0x0F;
                0
            }
            Some(cmd::RAMWR) => {
                match self.pixel_hi.take() {
                    None => self.pixel_hi = Some(value),
                    Some(hi) => self.write_pixel(u16::from_be_bytes([hi, value])),
                }
                0
            }
            Some(cmd::RAMRD) => self.read_byte(),
            Some(other) => self
                .registers
                .get(&other)
                .map(|bytes| bytes[self.reg_index as usize])
                .unwrap_or(0),
            None => 0,
        }
    }

    fn write_pixel(&mut self, color: u16) {
        let (x, y) = self.cursor;
        if (x as usize) < self.width && (y as usize) < self.height {
            self.gram[y as usize * self.width + x as usize] = color;
        }
        self.stats.pixels_written += 1;
        self.advance_cursor();
    }

    fn advance_cursor(&mut self) {
        let (mut x, mut y) = self.cursor;
        if x >= self.col.1 {
            x = self.col.0;
            y = if y >= self.row.1 { self.row.0 } else { y + 1 };
        } else {
            x += 1;
        }
        self.cursor = (x, y);
    }

    fn read_byte(&mut self) -> u8 {
        if self.read_queue.is_empty() {
            let (x, y) = self.cursor;
            let color = if (x as usize) < self.width && (y as usize) < self.height {
                self.gram[y as usize * self.width + x as usize]
            } else {
                0
            };
            self.advance_cursor();
            let rgb = crate::color::color16to24(color);
            let (r, g, b) = ((rgb >> 16) as u8, (rgb >> 8) as u8, rgb as u8);
            match self.read_format {
                ReadFormat::Rgb666 => self.read_queue.extend([r & 0xFC, g & 0xFC, b & 0xFC]),
                ReadFormat::Rgb666Shifted => self.read_queue.extend([r >> 1, g >> 1, b >> 1]),
                ReadFormat::Rgb565 => self.read_queue.extend(color.to_be_bytes()),
            }
        }
        self.read_queue.pop_front().unwrap_or(0)
    }

    fn reset_registers(&mut self) {
        self.madctl = 0;
        self.inverted = false;
        self.command = None;
        self.col = (0, self.width.saturating_sub(1) as u16);
        self.row = (0, self.height.saturating_sub(1) as u16);
    }
}

/// Shared handle to a simulated panel
#[derive(Clone)]
pub struct SimPanel {
    state: Rc<RefCell<SimState>>,
}

impl SimPanel {
    /// Panel with a `width` x `height` frame memory, cleared to black
    pub fn new(width: usize, height: usize, read_format: ReadFormat) -> Self {
        let mut state = SimState {
            width,
            height,
            gram: vec![0; width * height],
            read_format,
            selected: false,
            dc_data: true,
            command: None,
            params: Vec::with_capacity(4),
            col: (0, 0),
            row: (0, 0),
            cursor: (0, 0),
            pixel_hi: None,
            read_queue: VecDeque::new(),
            madctl: 0,
            inverted: false,
            clock_hz: 0,
            reg_index: 0,
            registers: HashMap::new(),
            busy_latency: 0,
            busy_polls: 0,
            stuck: false,
            pending: false,
            overlap_errors: 0,
            recording: true,
            events: Vec::new(),
            stats: BusStats::default(),
            elapsed_ms: 0,
        };
        state.reset_registers();
        Self { state: Rc::new(RefCell::new(state)) }
    }

    /// Frame memory large enough for every rotation of `config`,
    /// CGRAM offsets included
    pub fn for_config(config: &PanelConfig) -> Self {
        let side = config.width.max(config.height) as usize + 32;
        Self::new(side, side, config.controller.controller().read_format())
    }

    pub fn width(&self) -> usize {
        self.state.borrow().width
    }

    pub fn height(&self) -> usize {
        self.state.borrow().height
    }

    /// Colour at frame memory address `(x, y)`
    pub fn pixel(&self, x: usize, y: usize) -> u16 {
        let s = self.state.borrow();
        s.gram[y * s.width + x]
    }

    /// Row-major copy of a frame memory rectangle
    pub fn region(&self, x: usize, y: usize, w: usize, h: usize) -> Vec<u16> {
        let s = self.state.borrow();
        let mut out = Vec::with_capacity(w * h);
        for row in y..y + h {
            for col in x..x + w {
                let inside = col < s.width && row < s.height;
                out.push(if inside { s.gram[row * s.width + col] } else { 0 });
            }
        }
        out
    }

    /// Overwrite all of frame memory without touching the bus
    pub fn fill(&self, color: u16) {
        self.state.borrow_mut().gram.fill(color);
    }

    /// Overwrite one address without touching the bus
    pub fn poke(&self, x: usize, y: usize, color: u16) {
        let mut s = self.state.borrow_mut();
        let width = s.width;
        s.gram[y * width + x] = color;
    }

    /// Pixels that differ from `background`
    pub fn count_not(&self, background: u16) -> usize {
        self.state.borrow().gram.iter().filter(|&&c| c != background).count()
    }

    pub fn events(&self) -> Vec<BusEvent> {
        self.state.borrow().events.clone()
    }

    pub fn clear_events(&self) {
        let mut s = self.state.borrow_mut();
        s.events.clear();
        s.stats = BusStats::default();
    }

    /// Stop or resume the event log (totals keep counting)
    pub fn set_recording(&self, on: bool) {
        self.state.borrow_mut().recording = on;
    }

    pub fn stats(&self) -> BusStats {
        self.state.borrow().stats
    }

    /// Command bytes in the event log, in order
    pub fn commands(&self) -> Vec<u8> {
        self.state
            .borrow()
            .events
            .iter()
            .filter_map(|e| match e {
                BusEvent::Command(c) => Some(*c),
                _ => None,
            })
            .collect()
    }

    pub fn is_selected(&self) -> bool {
        self.state.borrow().selected
    }

    pub fn madctl(&self) -> u8 {
        self.state.borrow().madctl
    }

    pub fn inverted(&self) -> bool {
        self.state.borrow().inverted
    }

    pub fn clock_hz(&self) -> u32 {
        self.state.borrow().clock_hz
    }

    /// Current CASET and PASET ranges
    pub fn window(&self) -> ((u16, u16), (u16, u16)) {
        let s = self.state.borrow();
        (s.col, s.row)
    }

    pub fn elapsed_ms(&self) -> u64 {
        self.state.borrow().elapsed_ms
    }

    /// Polls a non-blocking transfer reports busy before it completes
    pub fn set_busy_latency(&self, polls: u32) {
        self.state.borrow_mut().busy_latency = polls;
    }

    /// A stuck bus reports busy forever
    pub fn set_stuck(&self, stuck: bool) {
        self.state.borrow_mut().stuck = stuck;
    }

    /// Bus accesses made while a non-blocking transfer was still pending
    pub fn overlap_errors(&self) -> usize {
        self.state.borrow().overlap_errors
    }

    /// Value returned by an indexed read of register `command`
    pub fn set_register(&self, command: u8, bytes: &[u8]) {
        let mut reg = [0u8; 16];
        let n = bytes.len().min(16);
        reg[..n].copy_from_slice(&bytes[..n]);
        self.state.borrow_mut().registers.insert(command, reg);
    }
}

impl Transfer for SimPanel {
    fn transfer_byte(&mut self, value: u8) -> Result<u8, BusError> {
        let mut s = self.state.borrow_mut();
        s.check_idle();
        if !s.selected {
            return Ok(0xFF);
        }
        if s.dc_data {
            s.log(BusEvent::Data(value));
            Ok(s.data_byte(value))
        } else {
            s.log(BusEvent::Command(value));
            s.begin_command(value);
            Ok(0)
        }
    }

    fn transfer_block(
        &mut self,
        words: &[u16],
        count: usize,
        stride: Stride,
        blocking: bool,
    ) -> Result<(), BusError> {
        let mut s = self.state.borrow_mut();
        s.check_idle();
        if stride == Stride::Increment && words.len() < count {
            return Err(BusError::LengthMismatch);
        }
        if stride == Stride::Fixed && words.is_empty() {
            return Err(BusError::LengthMismatch);
        }
        s.log(BusEvent::Block { count, stride, blocking });
        s.stats.blocks += 1;
        s.stats.block_words += count;

        if s.selected && s.dc_data && s.command == Some(cmd::RAMWR) {
            s.pixel_hi = None;
            for i in 0..count {
                let word = match stride {
                    Stride::Increment => words[i],
                    Stride::Fixed => words[0],
                };
                s.write_pixel(word);
            }
        }

        if !blocking {
            s.pending = true;
            s.busy_polls = s.busy_latency;
        }
        Ok(())
    }

    fn is_busy(&mut self) -> bool {
        let mut s = self.state.borrow_mut();
        if s.stuck {
            return true;
        }
        if s.busy_polls > 0 {
            s.busy_polls -= 1;
            return true;
        }
        false
    }

    fn await_transfer_complete(&mut self) -> Result<(), BusError> {
        let mut s = self.state.borrow_mut();
        if s.stuck {
            return Err(BusError::Timeout);
        }
        s.pending = false;
        s.busy_polls = 0;
        Ok(())
    }

    fn set_clock_speed(&mut self, hz: u32) {
        let mut s = self.state.borrow_mut();
        s.check_idle();
        s.clock_hz = hz;
        s.log(BusEvent::Clock(hz));
    }

    fn select(&mut self) {
        let mut s = self.state.borrow_mut();
        s.check_idle();
        s.selected = true;
        s.stats.selects += 1;
        s.log(BusEvent::Select);
    }

    fn deselect(&mut self) {
        let mut s = self.state.borrow_mut();
        s.check_idle();
        s.selected = false;
        s.pixel_hi = None;
        s.stats.deselects += 1;
        s.log(BusEvent::Deselect);
    }
}

impl ControlPins for SimPanel {
    fn dc_command(&mut self) {
        self.state.borrow_mut().dc_data = false;
    }

    fn dc_data(&mut self) {
        self.state.borrow_mut().dc_data = true;
    }

    fn reset_assert(&mut self) {
        let mut s = self.state.borrow_mut();
        s.log(BusEvent::Reset(true));
        s.reset_registers();
    }

    fn reset_deassert(&mut self) {
        self.state.borrow_mut().log(BusEvent::Reset(false));
    }

    fn delay_ms(&mut self, ms: u32) {
        let mut s = self.state.borrow_mut();
        s.elapsed_ms += ms as u64;
        s.log(BusEvent::Delay(ms));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn send(panel: &mut SimPanel, command: u8, data: &[u8]) {
        panel.dc_command();
        panel.transfer_byte(command).unwrap();
        panel.dc_data();
        for &b in data {
            panel.transfer_byte(b).unwrap();
        }
    }

    #[test]
    fn test_ramwr_fills_window() {
        let mut panel = SimPanel::new(8, 8, ReadFormat::Rgb565);
        panel.select();
        send(&mut panel, cmd::CASET, &[0, 2, 0, 3]);
        send(&mut panel, cmd::PASET, &[0, 5, 0, 6]);
        send(&mut panel, cmd::RAMWR, &[]);
        panel.transfer_block(&[0xABCD], 4, Stride::Fixed, true).unwrap();
        panel.deselect();

        assert_eq!(panel.pixel(2, 5), 0xABCD);
        assert_eq!(panel.pixel(3, 6), 0xABCD);
        assert_eq!(panel.pixel(1, 5), 0);
        assert_eq!(panel.count_not(0), 4);
    }

    #[test]
    fn test_bytes_ignored_when_deselected() {
        let mut panel = SimPanel::new(4, 4, ReadFormat::Rgb565);
        send(&mut panel, cmd::RAMWR, &[0xFF, 0xFF]);
        assert_eq!(panel.count_not(0), 0);
        assert!(panel.commands().is_empty());
    }

    #[test]
    fn test_ramrd_returns_dummy_then_rgb666() {
        let mut panel = SimPanel::new(4, 4, ReadFormat::Rgb666);
        panel.poke(1, 1, 0xF800);
        panel.select();
        send(&mut panel, cmd::CASET, &[0, 1, 0, 1]);
        send(&mut panel, cmd::PASET, &[0, 1, 0, 1]);
        send(&mut panel, cmd::RAMRD, &[]);
        let bytes: Vec<u8> = (0..4).map(|_| panel.transfer_byte(0).unwrap()).collect();
        assert_eq!(bytes, vec![0x00, 0xFC, 0x00, 0x00]);
    }

    #[test]
    fn test_non_blocking_overlap_is_counted() {
        let mut panel = SimPanel::new(4, 4, ReadFormat::Rgb565);
        panel.set_busy_latency(2);
        panel.select();
        panel.transfer_block(&[1], 3, Stride::Fixed, false).unwrap();
        assert!(panel.is_busy());
        panel.transfer_byte(0).unwrap();
        assert_eq!(panel.overlap_errors(), 1);
        assert!(panel.is_busy());
        assert!(!panel.is_busy());
        panel.await_transfer_complete().unwrap();
        panel.transfer_byte(0).unwrap();
        assert_eq!(panel.overlap_errors(), 1);
    }
}
