//! The fixed set of waveform shapes and their closed forms.

use core::fmt;
use core::str::FromStr;

use crate::dsp::{m_abs, sin_turns};

/// Waveform selector.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "lowercase"))]
pub enum Shape {
    Constant,
    #[default]
    Sine,
    Square,
    Sawtooth,
    Triangle,
    Pulse,
    Lrs,
}

impl Shape {
    /// Every shape, in declaration order.
    pub const ALL: [Shape; 7] = [
        Shape::Constant,
        Shape::Sine,
        Shape::Square,
        Shape::Sawtooth,
        Shape::Triangle,
        Shape::Pulse,
        Shape::Lrs,
    ];

    /// Lower-case name used in config files and on the command line.
    pub const fn name(self) -> &'static str {
        match self {
            Shape::Constant => "constant",
            Shape::Sine     => "sine",
            Shape::Square   => "square",
            Shape::Sawtooth => "sawtooth",
            Shape::Triangle => "triangle",
            Shape::Pulse    => "pulse",
            Shape::Lrs      => "lrs",
        }
    }

    /// Shapes driven by the phase clock. Only these advance it.
    #[inline]
    pub const fn is_periodic(self) -> bool {
        matches!(self, Shape::Sine | Shape::Square | Shape::Sawtooth | Shape::Triangle)
    }

    /// Closed form at `phase01`, normalized to peak ±1.
    ///
    /// Non-periodic shapes have no closed form in phase; `Constant` is 1,
    /// `Pulse` and `Lrs` return 0 here and are produced by the synthesizer.
    #[inline]
    pub fn eval(self, phase01: f64) -> f64 {
        match self {
            Shape::Constant => 1.0,
            Shape::Sine     => sin_turns(phase01),
            Shape::Square   => if phase01 < 0.5 { 1.0 } else { -1.0 },
            Shape::Sawtooth => 2.0 * phase01 - 1.0,
            Shape::Triangle => 1.0 - 4.0 * m_abs(phase01 - 0.5),
            Shape::Pulse | Shape::Lrs => 0.0,
        }
    }
}

impl fmt::Display for Shape {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Returned when a string names no known shape.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ParseShapeError;

impl fmt::Display for ParseShapeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("unknown waveform shape (expected one of: constant, sine, square, sawtooth, triangle, pulse, lrs)")
    }
}

#[cfg(feature = "std")]
impl std::error::Error for ParseShapeError {}

impl FromStr for Shape {
    type Err = ParseShapeError;

    /// Case-insensitive; surrounding whitespace is ignored.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        Shape::ALL
            .into_iter()
            .find(|shape| shape.name().eq_ignore_ascii_case(s))
            .ok_or(ParseShapeError)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_any_case() {
        assert_eq!("LRS".parse::<Shape>(), Ok(Shape::Lrs));
        assert_eq!(" Sawtooth ".parse::<Shape>(), Ok(Shape::Sawtooth));
        assert_eq!("whitenoise".parse::<Shape>(), Err(ParseShapeError));
        for s in Shape::ALL {
            assert_eq!(s.to_string().parse::<Shape>(), Ok(s));
        }
    }

    #[test]
    fn closed_forms_at_landmarks() {
        assert_eq!(Shape::Square.eval(0.49), 1.0);
        assert_eq!(Shape::Square.eval(0.5), -1.0);
        assert_eq!(Shape::Sawtooth.eval(0.0), -1.0);
        assert_eq!(Shape::Sawtooth.eval(0.5), 0.0);
        assert_eq!(Shape::Triangle.eval(0.0), -1.0);
        assert_eq!(Shape::Triangle.eval(0.5), 1.0);
        assert_eq!(Shape::Triangle.eval(0.25), 0.0);
    }

    #[test]
    fn periodic_set() {
        let periodic: Vec<Shape> = Shape::ALL.into_iter().filter(|s| s.is_periodic()).collect();
        assert_eq!(periodic, [Shape::Sine, Shape::Square, Shape::Sawtooth, Shape::Triangle]);
    }
}
