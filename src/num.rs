//! Register format and overflow arithmetic.
//!
//! All filter state lives in Q16.16 `i32` registers. The constants here are
//! the single source of truth for the format; the lag coefficient, the pole
//! registers and the rounding mask all share [`FRACTION_BITS`].

/// Total bits in a filter register.
pub const WORD_BITS: u32 = i32::BITS;

/// Fractional bits in a filter register.
pub const FRACTION_BITS: u32 = 16;

/// Round-half-up bias for the fractional product in the cascade.
pub const ROUND_BIAS: i32 = 1 << (FRACTION_BITS - 1);

/// Mask selecting the fractional part of a register.
pub const FRACTION_MASK: i32 = (ROUND_BIAS - 1) | ROUND_BIAS;

/// Scale a raw ADC reading to the register format.
///
/// The scaled value is the filter's pass-through output when no filtering
/// takes place.
#[inline]
pub const fn scale(raw: i32) -> i32 {
    raw << FRACTION_BITS
}

/// Sign-bit overflow test for two's-complement add/subtract.
///
/// If both operands carry the same sign bit and the result's sign bit
/// differs, the result has wrapped. The predicate does not distinguish
/// addition from subtraction: `result` must have been formed from exactly
/// the two operands passed, with a subtraction `a - b` passed as the
/// addition `a + b.wrapping_neg()`. `i32::MIN` has no negation and must not
/// appear as a negated subtrahend.
///
/// ```
/// use adclp::overflowed;
/// assert!(overflowed(i32::MAX, 1, i32::MAX.wrapping_add(1)));
/// assert!(!overflowed(1, -1, 0));
/// ```
#[inline]
pub const fn overflowed(a: i32, b: i32, result: i32) -> bool {
    (a ^ b) >= 0 && (a ^ result) < 0
}

#[cfg(test)]
mod test {
    use quickcheck_macros::quickcheck;

    use super::*;

    #[quickcheck]
    fn add_matches_checked(a: i32, b: i32) -> bool {
        overflowed(a, b, a.wrapping_add(b)) == a.checked_add(b).is_none()
    }

    #[quickcheck]
    fn sub_matches_checked(a: i32, b: i32) -> bool {
        if b == i32::MIN {
            return true;
        }
        overflowed(a, b.wrapping_neg(), a.wrapping_sub(b)) == a.checked_sub(b).is_none()
    }

    #[test]
    fn format_consistent() {
        assert_eq!(FRACTION_MASK, (1 << FRACTION_BITS) - 1);
        assert_eq!(ROUND_BIAS, 1 << (FRACTION_BITS - 1));
        assert_eq!(scale(2048), 2048 << 16);
        assert_eq!(scale(-1), -65536);
    }
}
