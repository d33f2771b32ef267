//! UTF-8 decoding with fallback to extended ASCII
//!
//! Sequences of up to three bytes are assembled (code points to U+FFFF).
//! Anything else, including a lead byte without enough bytes after it,
//! comes through as the raw byte value so it can still index an 8-bit
//! glyph table.

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Expect {
    Lead,
    One,
    Two,
}

/// Byte-at-a-time decoder for the print stream
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Utf8Decoder {
    enabled: bool,
    expect: Expect,
    acc: u16,
}

impl Default for Utf8Decoder {
    fn default() -> Self {
        Self::new(true)
    }
}

impl Utf8Decoder {
    pub const fn new(enabled: bool) -> Self {
        Self { enabled, expect: Expect::Lead, acc: 0 }
    }

    pub fn enabled(&self) -> bool {
        self.enabled
    }

    /// Switch decoding on or off, dropping any partial sequence.
    pub fn set_enabled(&mut self, enabled: bool) {
        self.enabled = enabled;
        self.expect = Expect::Lead;
    }

    /// Feed one byte. Returns 0 while a sequence is still incomplete.
    pub fn decode(&mut self, byte: u8) -> u16 {
        let c = byte as u16;
        if !self.enabled {
            return c;
        }
        if byte & 0x80 == 0 {
            self.expect = Expect::Lead;
            return c;
        }

        match self.expect {
            Expect::Lead => {
                if byte & 0xE0 == 0xC0 {
                    self.acc = (c & 0x1F) << 6;
                    self.expect = Expect::One;
                    return 0;
                }
                if byte & 0xF0 == 0xE0 {
                    self.acc = (c & 0x0F) << 12;
                    self.expect = Expect::Two;
                    return 0;
                }
            }
            Expect::Two => {
                self.acc |= (c & 0x3F) << 6;
                self.expect = Expect::One;
                return 0;
            }
            Expect::One => {
                self.expect = Expect::Lead;
                return self.acc | (c & 0x3F);
            }
        }

        c
    }
}

/// Code points of a byte string, see [`code_points`]
#[derive(Debug, Clone)]
pub struct CodePoints<'a> {
    bytes: &'a [u8],
    utf8: bool,
}

/// Decode `bytes` as a whole. With `utf8` off every byte is one code point.
pub fn code_points(bytes: &[u8], utf8: bool) -> CodePoints<'_> {
    CodePoints { bytes, utf8 }
}

impl Iterator for CodePoints<'_> {
    type Item = u16;

    fn next(&mut self) -> Option<u16> {
        let (&lead, rest) = self.bytes.split_first()?;
        self.bytes = rest;
        let c = lead as u16;
        if !self.utf8 || lead & 0x80 == 0 {
            return Some(c);
        }

        if lead & 0xE0 == 0xC0 {
            if let [b1, rest @ ..] = rest {
                self.bytes = rest;
                return Some(((c & 0x1F) << 6) | (*b1 as u16 & 0x3F));
            }
        } else if lead & 0xF0 == 0xE0 {
            if let [b1, b2, rest @ ..] = rest {
                self.bytes = rest;
                return Some(((c & 0x0F) << 12) | ((*b1 as u16 & 0x3F) << 6) | (*b2 as u16 & 0x3F));
            }
        }
        Some(c)
    }
}
