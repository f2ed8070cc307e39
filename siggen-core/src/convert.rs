//! Float → fixed-point conversion for the integer output twin.
//!
//! Round to nearest, then saturate to the target range before narrowing.
//! Out-of-range inputs pin to the rails instead of wrapping; NaN maps to 0.

use num_traits::{Bounded, NumCast, ToPrimitive};

use crate::dsp::m_round;

/// Quantize one float to any primitive integer type `T`.
#[inline]
pub fn quantize<T>(x: f32) -> T
where
    T: Bounded + NumCast + ToPrimitive + Copy + Default,
{
    if x.is_nan() {
        return T::default();
    }
    let lo = T::min_value().to_f64().unwrap_or(f64::MIN);
    let hi = T::max_value().to_f64().unwrap_or(f64::MAX);
    let r = m_round(<f64 as From<f32>>::from(x));
    if r <= lo {
        T::min_value()
    } else if r >= hi {
        T::max_value()
    } else {
        // in range by construction
        <T as NumCast>::from(r).unwrap_or_default()
    }
}

/// The shipped fixed-point twin: `f32 → i16`.
#[inline]
pub fn to_fixed(x: f32) -> i16 {
    quantize::<i16>(x)
}

/// Convert a whole block, appending to `out`.
pub fn to_fixed_into(src: &[f32], out: &mut impl Extend<i16>) {
    out.extend(src.iter().map(|&x| to_fixed(x)));
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn saturates_instead_of_wrapping() {
        assert_eq!(to_fixed(1e9), i16::MAX);
        assert_eq!(to_fixed(-1e9), i16::MIN);
        assert_eq!(to_fixed(f32::INFINITY), i16::MAX);
        assert_eq!(to_fixed(f32::NEG_INFINITY), i16::MIN);
        assert_eq!(to_fixed(32767.4), 32767);
        assert_eq!(to_fixed(-32768.4), -32768);
    }

    #[test]
    fn rounds_to_nearest() {
        assert_eq!(to_fixed(100.0), 100);
        assert_eq!(to_fixed(58.78), 59);
        assert_eq!(to_fixed(-58.78), -59);
        assert_eq!(to_fixed(0.49), 0);
        assert_eq!(to_fixed(2.5), 3);
        assert_eq!(to_fixed(-2.5), -3);
    }

    #[test]
    fn nan_is_zero() {
        assert_eq!(to_fixed(f32::NAN), 0);
    }

    #[test]
    fn fractional_inputs_near_the_rails() {
        assert_eq!(to_fixed(32766.6), i16::MAX);
        assert_eq!(to_fixed(-32767.5), i16::MIN);
        assert_eq!(to_fixed(-0.5), -1);
        assert_eq!(quantize::<u16>(65535.2), u16::MAX);
    }

    #[test]
    fn generic_targets() {
        assert_eq!(quantize::<i8>(300.0), i8::MAX);
        assert_eq!(quantize::<u8>(-4.0), 0);
        assert_eq!(quantize::<i32>(1e12), i32::MAX);
    }

    #[test]
    fn block_conversion() {
        let mut out = Vec::new();
        to_fixed_into(&[0.4, 1e9, -7.6], &mut out);
        assert_eq!(out, [0, i16::MAX, -8]);
    }
}
