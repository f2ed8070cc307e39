//! Linear recursive sequence (LRS) register.
//!
//! A 32-bit Galois LFSR. Each step shifts the register right by one and, when
//! the bit shifted out was set, XORs the feedback taps back in. With the
//! default taps (x^32 + x^22 + x^2 + x + 1) every non-zero seed walks the full
//! 2^32 − 1 cycle.
//!
//! The sequence is fully determined by `(seed, taps)`, so an independent
//! re-implementation started from the same pair must agree bit for bit.

/// Feedback mask for the maximal-length polynomial x^32 + x^22 + x^2 + x + 1.
pub const DEFAULT_TAPS: u32 = 0x8020_0003;

/// Seed the generator starts from (and returns to on `reset`).
pub const DEFAULT_SEED: u32 = 123_456;

/// Shift register plus tap mask.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct SequenceRegister {
    state: u32,
    seed: u32,
    taps: u32,
}

impl Default for SequenceRegister {
    fn default() -> Self { Self { state: DEFAULT_SEED, seed: DEFAULT_SEED, taps: DEFAULT_TAPS } }
}

impl SequenceRegister {
    /// Register with a custom seed and tap mask. An all-zero seed would lock
    /// the register at zero forever and an all-zero mask never feeds back, so
    /// both are rejected.
    #[inline]
    pub fn new(seed: u32, taps: u32) -> Option<Self> {
        if seed == 0 || taps == 0 {
            return None;
        }
        Some(Self { state: seed, seed, taps })
    }

    #[inline] pub fn state(&self) -> u32 { self.state }
    #[inline] pub fn seed(&self) -> u32 { self.seed }
    #[inline] pub fn taps(&self) -> u32 { self.taps }

    /// Output bit for the current state (the LSB).
    #[inline] pub fn bit(&self) -> bool { self.state & 1 == 1 }

    /// Back to the seed.
    #[inline] pub fn reset(&mut self) { self.state = self.seed; }

    /// Advance one step.
    #[inline]
    pub fn step(&mut self) {
        let out = self.state & 1;
        self.state >>= 1;
        if out != 0 {
            self.state ^= self.taps;
        }
    }

    /// Return the current output bit, then step.
    #[inline]
    pub fn next_bit(&mut self) -> bool {
        let b = self.bit();
        self.step();
        b
    }

    /// Bipolar sample for the current bit: `+amp` for 1, `-amp` for 0. Steps once.
    #[inline]
    pub fn next_bipolar(&mut self, amp: f64) -> f64 {
        if self.next_bit() { amp } else { -amp }
    }
}
