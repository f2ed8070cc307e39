//! Phase accumulator shared by every periodic shape.
//!
//! The clock owns a phase in turns (`[0,1)`) and a per-sample increment. The
//! increment is recomputed when frequency or sample rate change; the phase
//! value itself is only ever advanced or explicitly reset, so a live retune
//! never introduces a discontinuity.

use crate::dsp::{delta_phase, wrap01};

/// Continuously advancing phase accumulator.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct PhaseClock {
    phase: f64, // [0,1)
    delta: f64, // turns per sample
}

impl Default for PhaseClock {
    fn default() -> Self { Self { phase: 0.0, delta: 0.0 } }
}

impl PhaseClock {
    /// A clock at phase 0 stepping `freq_hz / sample_rate` turns per sample.
    #[inline]
    pub fn new(freq_hz: f64, sample_rate: f64) -> Self {
        Self { phase: 0.0, delta: delta_phase(freq_hz, sample_rate) }
    }

    /// Recompute the increment. Phase is left untouched.
    #[inline]
    pub fn retune(&mut self, freq_hz: f64, sample_rate: f64) {
        self.delta = delta_phase(freq_hz, sample_rate);
    }

    #[inline] pub fn phase(&self) -> f64 { self.phase }
    #[inline] pub fn delta(&self) -> f64 { self.delta }

    /// Hard-set phase; any value is wrapped into [0,1).
    #[inline] pub fn set_phase(&mut self, p: f64) { self.phase = wrap01(p); }

    /// Back to phase 0 (stop/restart only).
    #[inline] pub fn reset(&mut self) { self.phase = 0.0; }

    /// Step one sample: `φ ← (φ + Δφ) mod 1`.
    #[inline]
    pub fn advance(&mut self) {
        self.phase = wrap01(self.phase + self.delta);
    }

    /// Return the current phase, then advance.
    #[inline]
    pub fn tick(&mut self) -> f64 {
        let p = self.phase;
        self.advance();
        p
    }
}
