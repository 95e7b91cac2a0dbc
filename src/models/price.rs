use std::fmt;
use std::str::FromStr;

use rust_decimal::Decimal;
use serde::{Serialize, Serializer};
use thiserror::Error;

/// Total number of significant digits a price may carry.
pub const MAX_DIGITS: u32 = 5;
/// Digits after the decimal point.
pub const DECIMAL_PLACES: u32 = 2;

/// Fixed-point product price, held as whole cents.
///
/// Only values that fit `MAX_DIGITS`/`DECIMAL_PLACES` can be constructed, so
/// the range is -999.99 ..= 999.99. Rendered on the wire as a decimal string
/// with exactly two fractional digits.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Price(i64);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum PriceError {
    #[error("A valid number is required.")]
    Invalid,
    #[error("Ensure that there are no more than 5 digits in total.")]
    TooManyDigits,
    #[error("Ensure that there are no more than 2 decimal places.")]
    TooManyDecimalPlaces,
    #[error("Ensure that there are no more than 3 digits before the decimal point.")]
    TooManyWholeDigits,
}

impl Price {
    pub const MAX_CENTS: i64 = 99_999;

    /// Build a price from a stored cent count, rejecting values outside the digit budget.
    pub fn from_cents(cents: i64) -> Result<Self, PriceError> {
        if cents.abs() > Self::MAX_CENTS {
            return Err(PriceError::TooManyDigits);
        }
        Ok(Self(cents))
    }

    pub fn cents(&self) -> i64 {
        self.0
    }

    pub fn as_decimal(&self) -> Decimal {
        Decimal::new(self.0, DECIMAL_PLACES)
    }
}

fn digit_count(n: u128) -> u32 {
    if n == 0 {
        1
    } else {
        n.ilog10() + 1
    }
}

impl TryFrom<Decimal> for Price {
    type Error = PriceError;

    fn try_from(value: Decimal) -> Result<Self, Self::Error> {
        // Digits are counted as written, trailing fractional zeros included.
        let decimal_places = value.scale();
        let total_digits = digit_count(value.mantissa().unsigned_abs()).max(decimal_places);
        let whole_digits = total_digits - decimal_places;

        if total_digits > MAX_DIGITS {
            return Err(PriceError::TooManyDigits);
        }
        if decimal_places > DECIMAL_PLACES {
            return Err(PriceError::TooManyDecimalPlaces);
        }
        if whole_digits > MAX_DIGITS - DECIMAL_PLACES {
            return Err(PriceError::TooManyWholeDigits);
        }

        let cents = value.mantissa() * 10_i128.pow(DECIMAL_PLACES - decimal_places);
        let cents = i64::try_from(cents).map_err(|_| PriceError::TooManyDigits)?;
        Self::from_cents(cents)
    }
}

impl FromStr for Price {
    type Err = PriceError;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        let raw = raw.trim();
        if raw.is_empty() || raw.contains('_') {
            return Err(PriceError::Invalid);
        }
        let value = Decimal::from_str(raw)
            .or_else(|_| Decimal::from_scientific(raw))
            .map_err(|_| PriceError::Invalid)?;
        Self::try_from(value)
    }
}

impl fmt::Display for Price {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.as_decimal(), f)
    }
}

impl Serialize for Price {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}
