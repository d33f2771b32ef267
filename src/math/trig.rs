//! Float geometry for arcs and wedge lines
//!
//! Single precision through `libm`. Coverage derived here is quantised to
//! 8-bit alpha, so errors below 1/256 of a pixel are invisible.

/// Degrees to radians
pub const DEG2RAD: f32 = core::f32::consts::PI / 180.0;

/// Coverage at or below this is treated as empty
pub(crate) const LO_ALPHA_THRESHOLD: f32 = 1.0 / 32.0;
/// Coverage above this is treated as solid
pub(crate) const HI_ALPHA_THRESHOLD: f32 = 1.0 - LO_ALPHA_THRESHOLD;
/// Coverage to 8-bit alpha
pub(crate) const PIXEL_ALPHA_GAIN: f32 = 255.0;

/// Distance from a point to a segment whose radius tapers along its length.
///
/// `(xpax, ypay)` is the point relative to the segment start, `(bax, bay)`
/// the segment vector and `dr` the radius difference start minus end. The
/// result is the Euclidean distance to the nearest point on the segment
/// plus the taper at that point.
#[inline]
pub fn wedge_line_distance(xpax: f32, ypay: f32, bax: f32, bay: f32, dr: f32) -> f32 {
    let h = ((xpax * bax + ypay * bay) / (bax * bax + bay * bay)).clamp(0.0, 1.0);
    let dx = xpax - bax * h;
    let dy = ypay - bay * h;
    libm::sqrtf(dx * dx + dy * dy) + h * dr
}

/// Sine and cosine of an angle in degrees.
#[inline]
pub(crate) fn sin_cos_deg(deg: f32) -> (f32, f32) {
    let rad = deg * DEG2RAD;
    (libm::sinf(rad), libm::cosf(rad))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_wedge_distance_perpendicular() {
        // Segment from origin along +x, point 3 above its middle
        let d = wedge_line_distance(5.0, 3.0, 10.0, 0.0, 0.0);
        assert!((d - 3.0).abs() < 1e-5);
    }

    #[test]
    fn test_wedge_distance_clamps_to_endpoints() {
        // Point beyond the far end measures to the end point
        let d = wedge_line_distance(13.0, 4.0, 10.0, 0.0, 0.0);
        assert!((d - 5.0).abs() < 1e-5);
        // Taper is added in full at the far end
        let d = wedge_line_distance(13.0, 4.0, 10.0, 0.0, 2.0);
        assert!((d - 7.0).abs() < 1e-5);
    }

    #[test]
    fn test_sin_cos_quadrants() {
        let (s, c) = sin_cos_deg(90.0);
        assert!((s - 1.0).abs() < 1e-6 && c.abs() < 1e-6);
        let (s, c) = sin_cos_deg(180.0);
        assert!(s.abs() < 1e-6 && (c + 1.0).abs() < 1e-6);
    }
}
