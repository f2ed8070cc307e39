//! Per-sample waveform synthesis.
//!
//! [`Synthesizer`] owns the two pieces of state that must survive
//! reconfiguration: the [`PhaseClock`] for periodic shapes and the
//! [`SequenceRegister`] for `Lrs`. The caller passes shape and magnitude on
//! every call, so switching either mid-stream is just a different argument on
//! the next sample.
//!
//! Rules per shape (`φ` = phase in turns, `m` = magnitude):
//! - `Constant` : `m`, phase untouched
//! - `Sine`     : `m·sin(2πφ)`
//! - `Square`   : `m` for `φ < 0.5`, else `−m`
//! - `Sawtooth` : `m·(2φ − 1)`
//! - `Triangle` : `m·(1 − 4|φ − 0.5|)`
//! - `Pulse`    : `m` on the first sample of a block, 0 elsewhere
//! - `Lrs`      : `±m` from the register LSB, register steps once
//!
//! Periodic shapes sample first, then advance the phase.

use crate::lrs::SequenceRegister;
use crate::phase::PhaseClock;
use crate::shape::Shape;

#[derive(Copy, Clone, Debug, Default, PartialEq)]
pub struct Synthesizer {
    clock: PhaseClock,
    register: SequenceRegister,
}

impl Synthesizer {
    #[inline]
    pub fn new(freq_hz: f64, sample_rate: f64) -> Self {
        Self { clock: PhaseClock::new(freq_hz, sample_rate), register: SequenceRegister::default() }
    }

    /// Use a non-default register (custom seed or taps).
    #[inline]
    pub fn with_register(mut self, register: SequenceRegister) -> Self {
        self.register = register;
        self
    }

    /// New frequency and/or sample rate. Phase and register are preserved.
    #[inline] pub fn retune(&mut self, freq_hz: f64, sample_rate: f64) { self.clock.retune(freq_hz, sample_rate); }

    #[inline] pub fn clock(&self) -> &PhaseClock { &self.clock }
    #[inline] pub fn register(&self) -> &SequenceRegister { &self.register }

    /// Phase back to 0 and register back to its seed (stop/restart only).
    #[inline]
    pub fn reset(&mut self) {
        self.clock.reset();
        self.register.reset();
    }

    /// One sample. `index` is the position inside the current block and only
    /// matters for `Pulse`.
    #[inline]
    pub fn next_sample(&mut self, shape: Shape, magnitude: f64, index: usize) -> f32 {
        let v = match shape {
            Shape::Constant => magnitude,
            Shape::Pulse    => if index == 0 { magnitude } else { 0.0 },
            Shape::Lrs      => self.register.next_bipolar(magnitude),
            periodic        => magnitude * periodic.eval(self.clock.tick()),
        };
        v as f32
    }

    /// Fill a whole block; `out[0]` is treated as the block start.
    pub fn fill(&mut self, shape: Shape, magnitude: f64, out: &mut [f32]) {
        for (i, y) in out.iter_mut().enumerate() {
            *y = self.next_sample(shape, magnitude, i);
        }
    }
}
