//! Fixed-point square root for edge coverage
//!
//! Exact to within one LSB of the 8-bit fraction for every argument up to
//! `0x4000_0000`. Used where a squared pixel distance has to become an
//! alpha without a float square root.

/// Fractional part of `sqrt(num)` scaled to 0..=255.
///
/// Bit-by-bit integer square root carried 8 bits past the binary point.
/// Arguments above `0x4000_0000` return 0.
pub fn sqrt_fraction(num: u32) -> u8 {
    if num > 0x4000_0000 {
        return 0;
    }

    let mut num = num;
    let mut bsh: u32 = 0x0000_4000;
    let mut fpr: u32 = 0;
    let mut osh: u32 = 0;

    // Auto adjust from U8:8 up to U15:16
    while num > bsh {
        bsh <<= 2;
        osh += 1;
    }

    loop {
        let bod = bsh + fpr;
        if num >= bod {
            num -= bod;
            fpr = bsh + bod;
        }
        num <<= 1;
        bsh >>= 1;
        if bsh == 0 {
            break;
        }
    }

    (fpr >> osh) as u8
}
