use serde::{Deserialize, Serialize};
use strum::FromRepr;

use crate::{FRACTION_BITS, FRACTION_MASK, ROUND_BIAS, WORD_BITS, overflowed};

/// Configuration rejection reasons
#[derive(
    Copy, Clone, Debug, PartialEq, Eq, Ord, PartialOrd, Serialize, Deserialize, thiserror::Error,
)]
#[non_exhaustive]
pub enum ConfigError {
    /// The sample period differs from the variant's reference period
    #[error("sample period differs from the reference period")]
    UnsupportedPeriod,
    /// The corner frequency is not in the variant's supported set
    #[error("corner frequency outside the supported set")]
    UnsupportedFrequency,
}

/// Per-pole lag parametrization
///
/// One engine, two parametrizations: [`Coeff`] multiplies the stage delta by
/// a general Q16 coefficient, [`Shift`] replaces the multiply by an
/// arithmetic right shift for the configurations where that is valid.
/// The variant is a type parameter of [`crate::Lowpass`], resolved at
/// compile time.
pub trait Lag: Copy {
    /// Derive the lag parameter for a corner frequency/sample period pair.
    ///
    /// # Args
    /// * `corner_freq`: Corner frequency in Hz.
    /// * `sample_period`: Sample period in µs.
    ///
    /// # Return
    /// The derived parameter, or the reason the pair is unsupported.
    fn derive(corner_freq: u32, sample_period: u32) -> Result<Self, ConfigError>;

    /// Compute the per-stage lag term from the input-minus-pole delta.
    ///
    /// Both delta and term are Q16.16. `None` signals arithmetic overflow;
    /// the caller aborts the cascade and restarts.
    fn apply(&self, diff: i32) -> Option<i32>;
}

/// `2π` scaled for Hz times µs, Q32: `round(2π·1e-6·2^32)`.
const PI_OMEGA: u64 = 26986;

/// Rounding bias for the Q64 coefficient product.
const ROUND_BIAS_64: u64 = 1 << (2 * WORD_BITS - FRACTION_BITS - 1);

/// General lag coefficient, Q16 in `[0, 1)`.
///
/// Second-order fixed-point approximation of the continuous-time pole:
/// with `x = 2π·fc·T`, the per-tick gain `1 - exp(-x)` is taken as
/// `x·(1 - x)`. No division, no floating point.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[repr(transparent)]
#[serde(transparent)]
pub struct Coeff(i32);

impl Coeff {
    /// Wrap an externally supplied Q16 coefficient.
    pub const fn new(coeff: i32) -> Self {
        Self(coeff)
    }

    /// The Q16 coefficient value.
    pub const fn get(&self) -> i32 {
        self.0
    }
}

impl Lag for Coeff {
    fn derive(corner_freq: u32, sample_period: u32) -> Result<Self, ConfigError> {
        // x = 2π·fc·T in Q32
        let accum = PI_OMEGA * corner_freq as u64 * sample_period as u64;
        debug_assert!(accum < 1 << WORD_BITS);
        // (1 - x) in Q32
        let complement = (1u64 << WORD_BITS).wrapping_sub(accum);
        // x·(1 - x): Q64 product renormalized to Q16
        let coeff = accum
            .wrapping_mul(complement)
            .wrapping_add(ROUND_BIAS_64)
            >> (WORD_BITS + (WORD_BITS - FRACTION_BITS));
        Ok(Self(coeff as i32))
    }

    fn apply(&self, diff: i32) -> Option<i32> {
        let int_term = (diff >> FRACTION_BITS).wrapping_mul(self.0);
        let frac_term = (diff & FRACTION_MASK)
            .wrapping_mul(self.0)
            .wrapping_add(ROUND_BIAS)
            >> (WORD_BITS - FRACTION_BITS);
        let lag = int_term.wrapping_add(frac_term);
        (!overflowed(int_term, frac_term, lag)).then_some(lag)
    }
}

/// Sample period the shift approximation is derived for, in µs.
pub const REFERENCE_PERIOD: u32 = 50;

/// Corner frequencies supported by the shift approximation, in Hz.
///
/// The discriminants are the frequencies; [`ShiftFreq::from_repr`] is the
/// validity lookup.
#[derive(
    Copy, Clone, Debug, PartialEq, Eq, Ord, PartialOrd, Serialize, Deserialize, FromRepr,
    strum::EnumIter,
)]
#[repr(u32)]
pub enum ShiftFreq {
    /// 100 Hz, the baseline: lag coefficient ≈ 2⁻⁵
    Hz100 = 100,
    /// 50 Hz
    Hz50 = 50,
    /// 25 Hz
    Hz25 = 25,
    /// 10 Hz
    Hz10 = 10,
    /// 5 Hz
    Hz5 = 5,
    /// 1 Hz
    Hz1 = 1,
}

impl ShiftFreq {
    /// Right shift of the stage delta at the reference period.
    ///
    /// `round(-log2(x·(1-x)))` with `x = 2π·fc·50e-6`, anchored at 5 for
    /// 100 Hz and increasing monotonically toward lower corner frequencies
    /// (longer time constant, smaller per-tick increment).
    pub const fn shift(self) -> u32 {
        match self {
            Self::Hz100 => 5,
            Self::Hz50 => 6,
            Self::Hz25 => 7,
            Self::Hz10 => 8,
            Self::Hz5 => 9,
            Self::Hz1 => 12,
        }
    }
}

/// Shift-approximated lag for the 50 µs reference period.
///
/// Valid only for the [`ShiftFreq`] corner frequencies; anything else is
/// rejected at derivation and never reaches the cascade.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Ord, PartialOrd, Serialize, Deserialize)]
#[repr(transparent)]
#[serde(transparent)]
pub struct Shift(u32);

impl Shift {
    /// The delta right-shift amount.
    pub const fn get(&self) -> u32 {
        self.0
    }
}

impl Default for Shift {
    fn default() -> Self {
        Self(ShiftFreq::Hz100.shift())
    }
}

impl From<ShiftFreq> for Shift {
    fn from(value: ShiftFreq) -> Self {
        Self(value.shift())
    }
}

impl Lag for Shift {
    fn derive(corner_freq: u32, sample_period: u32) -> Result<Self, ConfigError> {
        if sample_period != REFERENCE_PERIOD {
            return Err(ConfigError::UnsupportedPeriod);
        }
        ShiftFreq::from_repr(corner_freq)
            .map(Self::from)
            .ok_or(ConfigError::UnsupportedFrequency)
    }

    fn apply(&self, diff: i32) -> Option<i32> {
        // Arithmetic shift, sign preserving; cannot overflow.
        Some(diff >> self.0)
    }
}

#[cfg(test)]
mod test {
    use strum::IntoEnumIterator;

    use super::*;
    use crate::testing::isclose;

    fn model(corner_freq: u32, sample_period: u32) -> f64 {
        let x = core::f64::consts::TAU * corner_freq as f64 * sample_period as f64 * 1e-6;
        x * (1. - x)
    }

    #[test]
    fn coeff_matches_model() {
        for (f, t) in [(100, 50), (50, 50), (25, 50), (10, 50), (5, 50), (1, 50), (200, 100)] {
            let c = Coeff::derive(f, t).unwrap().get() as f64 / (1i64 << FRACTION_BITS) as f64;
            log::debug!("f={f} t={t}: {c} vs {}", model(f, t));
            assert!(isclose(c, model(f, t), 1e-3, 2e-5));
        }
    }

    #[test]
    fn coeff_reference_values() {
        // 100 Hz at 50 µs: x = 0.0314159, x·(1-x) = 0.0304289, Q16 = 1994
        assert_eq!(Coeff::derive(100, 50).unwrap().get(), 1994);
        // 50 Hz at 50 µs
        assert_eq!(Coeff::derive(50, 50).unwrap().get(), 1013);
    }

    #[test]
    fn coeff_monotonic_in_frequency() {
        let mut last = i32::MAX;
        for f in [100, 50, 25, 10, 5, 1] {
            let c = Coeff::derive(f, 50).unwrap().get();
            assert!(c < last);
            assert!(c > 0);
            last = c;
        }
    }

    #[test]
    fn shift_tracks_coeff() {
        for f in ShiftFreq::iter() {
            let c = Coeff::derive(f as u32, REFERENCE_PERIOD).unwrap().get() as f64
                / (1i64 << FRACTION_BITS) as f64;
            assert_eq!(f.shift(), (-c.log2()).round() as u32);
        }
    }

    #[test]
    fn shift_monotonic() {
        let mut last = 0;
        for f in ShiftFreq::iter() {
            assert!(f.shift() > last);
            last = f.shift();
        }
    }

    #[test]
    fn shift_rejects() {
        assert_eq!(
            Shift::derive(30, REFERENCE_PERIOD),
            Err(ConfigError::UnsupportedFrequency)
        );
        assert_eq!(Shift::derive(100, 100), Err(ConfigError::UnsupportedPeriod));
        assert_eq!(Shift::derive(0, REFERENCE_PERIOD), Err(ConfigError::UnsupportedFrequency));
        assert_eq!(Shift::derive(100, REFERENCE_PERIOD).unwrap().get(), 5);
    }

    #[test]
    fn coeff_apply_rounds() {
        let c = Coeff::new(1 << (FRACTION_BITS - 1)); // 0.5
        assert_eq!(c.apply(2 << FRACTION_BITS).unwrap(), 1 << FRACTION_BITS);
        assert_eq!(c.apply(-(2 << FRACTION_BITS)).unwrap(), -(1 << FRACTION_BITS));
        // fractional path rounds half up
        assert_eq!(c.apply(1).unwrap(), 1);
    }

    #[test]
    fn shift_apply_signed() {
        let s = Shift::from(ShiftFreq::Hz100);
        assert_eq!(s.apply(1 << FRACTION_BITS).unwrap(), 1 << (FRACTION_BITS - 5));
        assert_eq!(s.apply(-(1 << FRACTION_BITS)).unwrap(), -(1 << (FRACTION_BITS - 5)));
    }
}
