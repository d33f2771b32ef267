//! Binary PPM (P6) output of simulated frame memory

use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::Path;

use anyhow::{Context, Result};
use tft_render::color::color16to24;

/// Write `w` x `h` RGB565 pixels, row major, as a P6 image.
pub fn write_ppm<W: Write>(out: &mut W, w: usize, h: usize, pixels: &[u16]) -> io::Result<()> {
    if pixels.len() < w * h {
        return Err(io::Error::new(
            io::ErrorKind::InvalidInput,
            format!("{} pixels for a {}x{} image", pixels.len(), w, h),
        ));
    }
    write!(out, "P6\n{} {}\n255\n", w, h)?;
    for &c in &pixels[..w * h] {
        let rgb = color16to24(c);
        out.write_all(&[(rgb >> 16) as u8, (rgb >> 8) as u8, rgb as u8])?;
    }
    Ok(())
}

/// Write a P6 image to `path`, replacing any existing file.
pub fn save(path: &Path, w: usize, h: usize, pixels: &[u16]) -> Result<()> {
    let file = File::create(path).with_context(|| format!("Failed to create {}", path.display()))?;
    let mut out = BufWriter::new(file);
    write_ppm(&mut out, w, h, pixels).with_context(|| format!("Failed to write {}", path.display()))?;
    out.flush()?;
    Ok(())
}
