//! Math backend and small numeric helpers shared by the waveform primitives.
//!
//! Design goals:
//! - `no_std` ready (guarded by the crate feature `no-std`)
//! - Math backend selection that works in both `std` and `no_std` contexts
//! - Phase math in `f64` so long runs do not drift; samples leave as `f32`
//!
//! Conventions:
//! - Phase is measured in **turns** (one period == 1.0), not radians.
//! - All functions are `#[inline]` where useful to help the optimizer.

use core::f64::consts::PI;

use cfg_if::cfg_if;

// ----------------------------- Math backend selection -----------------------------

cfg_if! {
    // libm (C math) in no_std
    if #[cfg(feature = "no-std")] {
        #[inline] pub(crate) fn m_sin(x: f64) -> f64 { libm::sin(x) }
        #[inline] pub(crate) fn m_floor(x: f64) -> f64 { libm::floor(x) }
        #[inline] pub(crate) fn m_round(x: f64) -> f64 { libm::round(x) }
        #[inline] pub(crate) fn m_abs(x: f64) -> f64 { libm::fabs(x) }
    // std backend
    } else {
        #[inline] pub(crate) fn m_sin(x: f64) -> f64 { x.sin() }
        #[inline] pub(crate) fn m_floor(x: f64) -> f64 { x.floor() }
        #[inline] pub(crate) fn m_round(x: f64) -> f64 { x.round() }
        #[inline] pub(crate) fn m_abs(x: f64) -> f64 { x.abs() }
    }
}

// --------------------------------- Constants -------------------------------------

/// 2π, for turning phase in turns into radians.
pub const TAU: f64 = 2.0 * PI;

// --------------------------------- Utilities -------------------------------------

/// Wrap phase (in turns) into [0, 1). Works for negative inputs too, so a
/// negative frequency simply runs the waveform backwards.
#[inline]
pub fn wrap01(p: f64) -> f64 {
    let w = p - m_floor(p);
    // `p - floor(p)` can land exactly on 1.0 for tiny negative `p`.
    if w >= 1.0 { 0.0 } else { w }
}

/// Sine of a phase given in turns.
#[inline]
pub fn sin_turns(phase01: f64) -> f64 {
    m_sin(TAU * phase01)
}

/// Per-sample phase increment (in turns) for `freq_hz` at `sample_rate` Hz.
/// Returns 0 for a non-positive sample rate rather than dividing by it.
#[inline]
pub fn delta_phase(freq_hz: f64, sample_rate: f64) -> f64 {
    if sample_rate > 0.0 { freq_hz / sample_rate } else { 0.0 }
}

// --------------------------------- Tests (std only) ------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn wrap_keeps_unit_interval() {
        for p in [-2.75, -1.0, -0.25, -1e-18, 0.0, 0.5, 0.999_999, 1.0, 3.25] {
            let w = wrap01(p);
            assert!((0.0..1.0).contains(&w), "p={p} w={w}");
        }
        assert!((wrap01(-0.25) - 0.75).abs() < 1e-12);
        assert!((wrap01(3.25) - 0.25).abs() < 1e-12);
    }

    #[test]
    fn sin_turns_hits_quadrants() {
        assert!(sin_turns(0.0).abs() < 1e-12);
        assert!((sin_turns(0.25) - 1.0).abs() < 1e-12);
        assert!((sin_turns(0.75) + 1.0).abs() < 1e-12);
    }

    #[test]
    fn delta_phase_guards_zero_rate() {
        assert_eq!(delta_phase(1000.0, 0.0), 0.0);
        assert!((delta_phase(1000.0, 5000.0) - 0.2).abs() < 1e-15);
    }
}
