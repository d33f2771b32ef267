//! Numeric helpers for the anti-aliased primitives
//!
//! Integer coverage lives in [`fixed_sqrt`], float geometry in [`trig`].
//! The two are kept apart so a primitive states which precision it uses.

pub mod fixed_sqrt;
pub mod trig;

pub use fixed_sqrt::sqrt_fraction;
pub(crate) use trig::{sin_cos_deg, HI_ALPHA_THRESHOLD, LO_ALPHA_THRESHOLD, PIXEL_ALPHA_GAIN};
pub use trig::{wedge_line_distance, DEG2RAD};
