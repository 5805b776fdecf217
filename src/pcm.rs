//! Conversion between 16-bit PCM samples and normalized floats.
//!
//! Every float-to-sample conversion in the crate goes through [`f64_to_s16`] or [`f32_to_s16`]:
//! scale by 32768, saturate to the `i16` range, then round half away from zero.

const SCALE: f64 = 32768.0;

/// Converts a sample to a float in `[-1.0, 1.0)`.
#[inline(always)]
pub fn s16_to_f32(sample: i16) -> f32 {
    sample as f32 / SCALE as f32
}

/// Converts a sample to a float in `[-1.0, 1.0)`.
#[inline(always)]
pub fn s16_to_f64(sample: i16) -> f64 {
    sample as f64 / SCALE
}

/// Converts a normalized float back to a sample, saturating out of range values.
///
/// `NaN` maps to silence.
#[inline(always)]
pub fn f64_to_s16(value: f64) -> i16 {
    let scaled = (value * SCALE).clamp(-SCALE, SCALE - 1.0);
    // The cast truncates toward zero, so the signed half turns it into round half away from zero.
    (scaled + 0.5f64.copysign(value)) as i16
}

/// Converts a normalized float back to a sample, saturating out of range values.
#[inline(always)]
pub fn f32_to_s16(value: f32) -> i16 {
    f64_to_s16(value as f64)
}
