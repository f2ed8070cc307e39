#![cfg_attr(not(feature = "std"), no_std)]
//! SigGen Core: no_std-ready waveform primitives for the SigGen signal generator.
//!
//! Features
//! - `std`      : (default) use the Rust standard library
//! - `no-std`   : build with `#![no_std]` and use `libm` for math
//! - `serde`    : serde derives on [`Shape`](shape::Shape)
//!
//! Modules
//! - [`dsp`]     : math backend, phase helpers
//! - [`phase`]   : `PhaseClock` phase accumulator
//! - [`lrs`]     : `SequenceRegister` (linear recursive sequence)
//! - [`shape`]   : `Shape` selector and closed forms
//! - [`synth`]   : `Synthesizer`, one sample at a time
//! - [`convert`] : float → saturated fixed-point
//!
//! Design
//! - No heap allocations; block functions write into caller-provided slices
//! - State that must survive reconfiguration (phase, register) lives in
//!   [`Synthesizer`](synth::Synthesizer), parameters are passed per call

pub mod convert;
pub mod dsp;
pub mod lrs;
pub mod phase;
pub mod shape;
pub mod synth;

/// Commonly used types/functions for convenience:
pub mod prelude {
    pub use crate::convert::{quantize, to_fixed, to_fixed_into};
    pub use crate::dsp::{delta_phase, wrap01, TAU};
    pub use crate::lrs::{SequenceRegister, DEFAULT_SEED, DEFAULT_TAPS};
    pub use crate::phase::PhaseClock;
    pub use crate::shape::{ParseShapeError, Shape};
    pub use crate::synth::Synthesizer;
}
