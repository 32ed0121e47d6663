//! Mathematical utility functions for DSP.
//!
//! Small, allocation-free helpers shared by the oscillators, filter,
//! envelopes and effects. All functions are suitable for `no_std`.
//!
//! # Saturation
//!
//! - [`cubic_clip`] - Soft cubic saturation used inside the filter loop
//!
//! # Utilities
//!
//! - [`one_pole_coeff`] - Coefficient for an exponential approach
//! - [`lerp`] / [`hermite4`] - Interpolation
//! - [`wet_dry_mix`] - Crossfade
//! - [`flush_denormal`] - Subnormal guard for feedback paths

use libm::expf;

/// Soft cubic saturation with a configurable ceiling.
///
/// Inside `±threshold` the curve is `t·(x/t − (x/t)³/3)`, which is smooth
/// and monotonic. Outside, the output is pinned at `±threshold·0.66667`,
/// the value the cubic reaches at the threshold.
///
/// # Example
/// ```rust
/// use subsnake_core::cubic_clip;
///
/// assert!((cubic_clip(0.0, 1.0)).abs() < 1e-9);
/// assert!((cubic_clip(5.0, 1.5) - 1.0).abs() < 1e-3);
/// ```
#[inline]
pub fn cubic_clip(x: f32, threshold: f32) -> f32 {
    if x > threshold {
        threshold * 0.66667
    } else if x < -threshold {
        -threshold * 0.66667
    } else {
        let n = x / threshold;
        (n - n * n * n * 0.33333) * threshold
    }
}

/// One-pole approach coefficient for a time constant given in samples.
///
/// Returns `1 − exp(−1/samples)`, with `samples` floored at 1 so a zero or
/// negative time jumps straight to the target instead of dividing by zero.
#[inline]
pub fn one_pole_coeff(samples: f32) -> f32 {
    1.0 - expf(-1.0 / samples.max(1.0))
}

/// Linear interpolation between `a` and `b`.
#[inline]
pub fn lerp(a: f32, b: f32, t: f32) -> f32 {
    a + (b - a) * t
}

/// 4-point, 3rd-order Hermite interpolation.
///
/// `y0..y3` are consecutive samples; `t` in \[0, 1) is the position between
/// `y1` and `y2`.
#[inline]
pub fn hermite4(y0: f32, y1: f32, y2: f32, y3: f32, t: f32) -> f32 {
    let c0 = y1;
    let c1 = 0.5 * (y2 - y0);
    let c2 = y0 - 2.5 * y1 + 2.0 * y2 - 0.5 * y3;
    let c3 = 0.5 * (y3 - y0) + 1.5 * (y1 - y2);
    ((c3 * t + c2) * t + c1) * t + c0
}

/// Crossfade between dry and wet signals.
///
/// `mix` = 0.0 is all dry, 1.0 is all wet.
#[inline]
pub fn wet_dry_mix(dry: f32, wet: f32, mix: f32) -> f32 {
    (1.0 - mix) * dry + mix * wet
}

/// Flush subnormal values to zero.
///
/// Recursive integrators decay toward zero forever; values below 1e-20 are
/// replaced with exact zero before they reach the subnormal range.
#[allow(clippy::inline_always)]
#[inline(always)]
pub fn flush_denormal(x: f32) -> f32 {
    if x.abs() < 1e-20 { 0.0 } else { x }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cubic_clip_passthrough_region() {
        // Small signals are nearly linear
        let y = cubic_clip(0.01, 8.0);
        assert!((y - 0.01).abs() < 1e-5, "got {}", y);
    }

    #[test]
    fn test_cubic_clip_is_continuous_at_threshold() {
        let t = 2.0;
        let inside = cubic_clip(t - 1e-4, t);
        let outside = cubic_clip(t + 1e-4, t);
        assert!(
            (inside - outside).abs() < 1e-3,
            "discontinuity at threshold: {} vs {}",
            inside,
            outside
        );
    }

    #[test]
    fn test_cubic_clip_bounded() {
        for i in -1000..1000 {
            let x = i as f32 * 0.1;
            let y = cubic_clip(x, 1.5);
            assert!(y.abs() <= 1.0 + 1e-4, "cubic_clip({}) = {}", x, y);
        }
    }

    #[test]
    fn test_cubic_clip_odd_symmetry() {
        for &x in &[0.1, 0.5, 1.2, 3.0] {
            assert!((cubic_clip(x, 1.0) + cubic_clip(-x, 1.0)).abs() < 1e-6);
        }
    }

    #[test]
    fn test_one_pole_coeff_floor() {
        // Anything at or below one sample jumps most of the way at once
        let c = one_pole_coeff(0.0);
        assert!((c - (1.0 - expf(-1.0))).abs() < 1e-6);
        assert_eq!(one_pole_coeff(-5.0), c);
    }

    #[test]
    fn test_one_pole_coeff_time_constant() {
        // After `n` steps toward 1.0 the level is 1 - e^-1
        let n = 441.0;
        let c = one_pole_coeff(n);
        let mut level = 0.0f32;
        for _ in 0..441 {
            level += c * (1.0 - level);
        }
        assert!((level - 0.632).abs() < 0.002, "level = {}", level);
    }

    #[test]
    fn test_hermite_hits_knots() {
        assert!((hermite4(0.0, 1.0, 2.0, 3.0, 0.0) - 1.0).abs() < 1e-6);
        assert!((hermite4(0.0, 1.0, 2.0, 3.0, 0.5) - 1.5).abs() < 1e-6);
    }

    #[test]
    fn test_wet_dry_mix_endpoints() {
        assert_eq!(wet_dry_mix(1.0, -1.0, 0.0), 1.0);
        assert_eq!(wet_dry_mix(1.0, -1.0, 1.0), -1.0);
    }

    #[test]
    fn test_flush_denormal() {
        assert_eq!(flush_denormal(1e-25), 0.0);
        assert_eq!(flush_denormal(0.5), 0.5);
    }
}
