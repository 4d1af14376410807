//! Fixed-point token amounts at one shared internal precision.
//!
//! Tokens disagree about decimal conventions, so every principal amount in the
//! pipeline is carried as an integer scaled to [`PRECISION`] decimals together
//! with the token's own decimal count. Construction refuses values that do not
//! sit exactly on the token's grid; precision is never dropped silently.

use std::fmt::{self, Debug, Display};

use alloy::primitives::U256;
use eyre::{bail, Result};

/// The internal decimal precision all amounts are normalized to.
pub const PRECISION: u8 = 18;

/// An immutable token amount: an integer at [`PRECISION`] decimals plus the
/// native decimal count it must stay representable in.
///
/// Invariant: `absolute % 10^(PRECISION - decimals) == 0`.
#[derive(Clone, Eq, PartialEq, Hash)]
pub struct TokenAmount {
    /// The amount scaled to [`PRECISION`] decimals
    absolute: U256,
    /// The token's native decimal count, at most [`PRECISION`]
    decimals: u8,
}

impl TokenAmount {
    /// Builds an amount from an integer already at [`PRECISION`] decimals.
    ///
    /// # Errors
    ///
    /// Fails when `decimals` exceeds [`PRECISION`], or when `absolute` is not
    /// a multiple of `10^(PRECISION - decimals)` and representing it at
    /// `decimals` would lose precision.
    pub fn from_absolute(absolute: U256, decimals: u8) -> Result<Self> {
        let step = scale(decimals)?;
        let remainder = absolute % step;
        if !remainder.is_zero() {
            bail!(
                "Precision loss representing {absolute} at {decimals} decimals (remainder {remainder})"
            );
        }
        Ok(Self { absolute, decimals })
    }

    /// Builds an amount from an integer in the token's native decimals.
    ///
    /// # Errors
    ///
    /// Fails when `decimals` exceeds [`PRECISION`] or the scaled value
    /// overflows 256 bits.
    pub fn from_units(units: U256, decimals: u8) -> Result<Self> {
        let step = scale(decimals)?;
        let Some(absolute) = units.checked_mul(step) else {
            bail!("Amount {units} at {decimals} decimals overflows the internal precision");
        };
        Ok(Self { absolute, decimals })
    }

    /// The amount at [`PRECISION`] decimals.
    #[must_use]
    pub const fn absolute(&self) -> U256 {
        self.absolute
    }

    /// The token's native decimal count.
    #[must_use]
    pub const fn decimals(&self) -> u8 {
        self.decimals
    }

    /// The amount in the token's native decimals.
    #[must_use]
    pub fn units(&self) -> U256 {
        // The construction invariant keeps decimals <= PRECISION and the
        // division exact.
        self.absolute / pow10(u32::from(PRECISION - self.decimals))
    }

    /// Whole-token value as an `f64`, for ratio and dollar math only.
    /// Principal arithmetic stays on the integer form.
    #[must_use]
    pub fn to_f64(&self) -> f64 {
        f64::from(self.absolute) / 1e18
    }
}

impl Display for TokenAmount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let whole = self.absolute / pow10(u32::from(PRECISION));
        let frac = self.absolute % pow10(u32::from(PRECISION));
        if frac.is_zero() {
            write!(f, "{whole}")
        } else {
            let digits = format!("{frac:0>18}");
            write!(f, "{whole}.{}", digits.trim_end_matches('0'))
        }
    }
}

impl Debug for TokenAmount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "TokenAmount({} @{}d)", self.absolute, self.decimals)
    }
}

/// `10^exp` as a `U256`.
fn pow10(exp: u32) -> U256 {
    U256::from(10).pow(U256::from(exp))
}

/// The grid step `10^(PRECISION - decimals)` separating representable values.
fn scale(decimals: u8) -> Result<U256> {
    if decimals > PRECISION {
        bail!("Token decimals {decimals} exceed the internal precision {PRECISION}");
    }
    Ok(pow10(u32::from(PRECISION - decimals)))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_round_trip_law() {
        for decimals in 0..=PRECISION {
            let step = pow10(u32::from(PRECISION - decimals));
            let absolute = U256::from(7) * step;
            let amount = TokenAmount::from_absolute(absolute, decimals).unwrap();
            assert_eq!(amount.units() * step, absolute);
            assert_eq!(amount.decimals(), decimals);
        }
    }

    #[test]
    fn test_off_grid_construction_fails() {
        for decimals in 0..PRECISION {
            let step = pow10(u32::from(PRECISION - decimals));
            let absolute = U256::from(7) * step + U256::from(1);
            let amount = TokenAmount::from_absolute(absolute, decimals);
            assert_eq!(
                amount.err().unwrap().to_string(),
                format!("Precision loss representing {absolute} at {decimals} decimals (remainder 1)")
            );
        }
    }

    #[test]
    fn test_from_units_scales_up() {
        // 5 USDC in native 6-decimals units
        let amount = TokenAmount::from_units(U256::from(5_000_000u64), 6).unwrap();
        assert_eq!(
            amount.absolute(),
            U256::from(5_000_000_000_000_000_000u128)
        );
        assert_eq!(amount.units(), U256::from(5_000_000u64));
    }

    #[test]
    fn test_decimals_above_precision_fail() {
        for build in [
            TokenAmount::from_absolute(U256::from(1), 19),
            TokenAmount::from_units(U256::from(1), 19),
        ] {
            assert_eq!(
                build.err().unwrap().to_string(),
                "Token decimals 19 exceed the internal precision 18"
            );
        }
    }

    #[test]
    fn test_display_trims_trailing_zeros() {
        for (absolute, expected) in &[
            (2_000_000_000_000_000_000u128, "2"),
            (1_500_000_000_000_000_000u128, "1.5"),
            (1u128, "0.000000000000000001"),
            (1_002_030_000_000_000_000u128, "1.00203"),
        ] {
            let amount = TokenAmount::from_absolute(U256::from(*absolute), PRECISION).unwrap();
            assert_eq!(amount.to_string(), *expected);
        }
    }

    #[test]
    fn test_to_f64() {
        let amount = TokenAmount::from_units(U256::from(25u64), 1).unwrap();
        assert_eq!(amount.to_f64(), 2.5);
    }
}
