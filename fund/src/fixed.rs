//! # Fixed-Point Conversion
//!
//! Pure arithmetic for moving values between the engine's three decimal
//! domains: claim-token units, fiat units, and stablecoin units, each with
//! independent precision. No state, no side effects.
//!
//! Every multiply-then-divide is computed in `u128`. Inputs are `u64`, so
//! the full product always fits before the division — an intermediate
//! overflow is impossible by construction, which is the single most
//! safety-critical property of the whole engine. Narrowing back to `u64`
//! and decimal up-shifts are checked and surface as
//! [`FundError::AmountOverflow`].
//!
//! Truncation (floor division) is the rounding policy everywhere. Callers
//! that care about the lost remainder (pro-rata allocation) account for it
//! explicitly; nothing in this module rounds up or half-even.

use crate::error::{FundError, FundResult};

/// `10^exp` in the wide domain. `u128` holds every power of ten up to
/// `10^38`, which is far beyond any decimal precision a ledger reports.
fn pow10(exp: u32) -> FundResult<u128> {
    10u128.checked_pow(exp).ok_or(FundError::AmountOverflow)
}

/// Narrows a wide intermediate back into the 64-bit money domain.
fn narrow(value: u128) -> FundResult<u64> {
    u64::try_from(value).map_err(|_| FundError::AmountOverflow)
}

/// Re-expresses `value` from `from_decimals` precision to `to_decimals`
/// precision.
///
/// Up-shifts multiply by a power of ten and are checked; down-shifts
/// divide with truncation, deliberately discarding sub-unit precision.
///
/// # Errors
///
/// Returns [`FundError::AmountOverflow`] if the up-shifted value no longer
/// fits in `u64`.
pub fn align_decimals(value: u64, from_decimals: u32, to_decimals: u32) -> FundResult<u64> {
    if from_decimals == to_decimals {
        return Ok(value);
    }
    if to_decimals > from_decimals {
        let factor = pow10(to_decimals - from_decimals)?;
        narrow((value as u128) * factor)
    } else {
        let divisor = pow10(from_decimals - to_decimals)?;
        narrow(value as u128 / divisor)
    }
}

/// Converts a quote-denominated `value` into base units using a price
/// feed that reports "units of quote currency per unit of base currency,
/// shifted by `rate_decimals`".
///
/// Computes `value * 10^rate_decimals / rate`, widened to `u128` so the
/// product cannot overflow before the division. The result keeps the
/// decimal scale of `value`.
///
/// # Errors
///
/// Returns [`FundError::InvalidAmount`] for a zero rate and
/// [`FundError::AmountOverflow`] if the result exceeds `u64`.
pub fn convert(value: u64, rate: u64, rate_decimals: u32) -> FundResult<u64> {
    if rate == 0 {
        return Err(FundError::InvalidAmount("conversion rate is zero".into()));
    }
    let shifted = (value as u128)
        .checked_mul(pow10(rate_decimals)?)
        .ok_or(FundError::AmountOverflow)?;
    narrow(shifted / rate as u128)
}

/// `value * numerator / denominator` with the product widened to `u128`,
/// truncated. The shared primitive behind NAV computation, purchase
/// quoting, and pro-rata allocation.
///
/// # Errors
///
/// Returns [`FundError::InvalidAmount`] for a zero denominator and
/// [`FundError::AmountOverflow`] if the quotient exceeds `u64`.
pub fn mul_div(value: u64, numerator: u64, denominator: u64) -> FundResult<u64> {
    if denominator == 0 {
        return Err(FundError::InvalidAmount("division by zero".into()));
    }
    let product = (value as u128) * (numerator as u128);
    narrow(product / denominator as u128)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn align_same_precision_is_identity() {
        assert_eq!(align_decimals(123_456, 6, 6).unwrap(), 123_456);
    }

    #[test]
    fn align_up_shifts_by_power_of_ten() {
        // 1.23 at 2 decimals -> 1.230000 at 6 decimals.
        assert_eq!(align_decimals(123, 2, 6).unwrap(), 1_230_000);
    }

    #[test]
    fn align_down_truncates() {
        // 1.234567 at 6 decimals -> 1.23 at 2 decimals, remainder dropped.
        assert_eq!(align_decimals(1_234_567, 6, 2).unwrap(), 123);
    }

    #[test]
    fn align_up_overflow_is_checked() {
        let result = align_decimals(u64::MAX, 0, 6);
        assert!(matches!(result, Err(FundError::AmountOverflow)));
    }

    #[test]
    fn align_extreme_down_shift_goes_to_zero() {
        // Divisor larger than u64::MAX must not panic; the value floors away.
        assert_eq!(align_decimals(u64::MAX, 38, 0).unwrap(), 0);
    }

    #[test]
    fn convert_at_par_is_identity() {
        // Rate 1.000000 at 6 decimals.
        assert_eq!(convert(500_000_000, 1_000_000, 6).unwrap(), 500_000_000);
    }

    #[test]
    fn convert_divides_by_the_price() {
        // 2.000000 quote per base: 10 quote units buy 5 base units.
        assert_eq!(convert(10_000_000, 2_000_000, 6).unwrap(), 5_000_000);
    }

    #[test]
    fn convert_zero_rate_rejected() {
        assert!(matches!(
            convert(1_000_000, 0, 6),
            Err(FundError::InvalidAmount(_))
        ));
    }

    #[test]
    fn convert_full_width_product_does_not_overflow() {
        // value near u64::MAX with an 18-decimal shift exceeds u64 in the
        // intermediate but stays exact in u128; the narrow fails only if
        // the *final* quotient does not fit.
        let value = u64::MAX;
        let rate = 10u64.pow(18);
        assert_eq!(convert(value, rate, 18).unwrap(), u64::MAX);
    }

    #[test]
    fn mul_div_floors() {
        assert_eq!(mul_div(7, 1, 2).unwrap(), 3);
        assert_eq!(mul_div(999, 999, 1_000).unwrap(), 998);
    }

    #[test]
    fn mul_div_widens_the_product() {
        // u64::MAX * 3 overflows u64 but not u128.
        assert_eq!(mul_div(u64::MAX, 3, 3).unwrap(), u64::MAX);
    }

    #[test]
    fn mul_div_zero_denominator_rejected() {
        assert!(matches!(
            mul_div(1, 1, 0),
            Err(FundError::InvalidAmount(_))
        ));
    }

    #[test]
    fn mul_div_overflowing_quotient_is_checked() {
        assert!(matches!(
            mul_div(u64::MAX, 2, 1),
            Err(FundError::AmountOverflow)
        ));
    }
}
