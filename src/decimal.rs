//! # Exact Decimal Quantities
//!
//! Timing values in a chart are plain decimal literals such as `120`, `132.5`
//! or `0.250`. They are held here as a scaled integer (`mantissa`, `precision`)
//! so that rescaling never goes through binary floating point.
//!
//! ## Grammar
//! A decimal quantity is one or more ASCII digits, optionally followed by `.`
//! and one or more digits. No sign, no exponent, no leading or trailing `.`.
//! The number of digits after `.` is the quantity's **precision**.
//!
//! ## Rescaling
//! `value × multiplier` is computed exactly with [`num_rational`] and then
//! rounded half away from zero back to the original precision, so
//! `rescale(x, 1) == x` for every well-formed `x`.
//!
//! ```rust
//! use chart_speed::{rescale, Multiplier};
//!
//! assert_eq!(rescale("120.000", Multiplier::from_steps(2)).unwrap(), "132.000");
//! assert_eq!(rescale("90", Multiplier::from_steps(-1)).unwrap(), "86");
//! ```

use std::fmt;
use std::str::FromStr;

use num_rational::Ratio;

use crate::speed::Multiplier;

/// Why a string could not be used as a decimal quantity.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DecimalError {
    /// Not a decimal quantity at all.
    Malformed,
    /// Well-formed, but the value (or its rescaled value) exceeds 128-bit range.
    TooLarge,
}

/// An exact decimal number: `mantissa / 10^precision`.
///
/// `int_width` is the number of integer digits as written, so a literal with
/// leading zeros (`007.5`) renders back with the same layout.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct DecimalQuantity {
    mantissa: i128,
    precision: u32,
    int_width: u32,
}

impl DecimalQuantity {
    pub const fn new(mantissa: i128, precision: u32) -> Self {
        Self {
            mantissa,
            precision,
            int_width: 1,
        }
    }

    pub fn mantissa(&self) -> i128 {
        self.mantissa
    }

    /// Digits after the decimal point.
    pub fn precision(&self) -> u32 {
        self.precision
    }

    /// Multiply by `multiplier`, keeping this quantity's precision.
    ///
    /// The product is rounded half away from zero.
    pub fn rescale(&self, multiplier: Multiplier) -> Result<Self, DecimalError> {
        let ratio = multiplier.as_ratio();
        let product = self
            .mantissa
            .checked_mul(*ratio.numer())
            .ok_or(DecimalError::TooLarge)?;
        let rounded = Ratio::new(product, *ratio.denom()).round().to_integer();
        Ok(Self {
            mantissa: rounded,
            ..*self
        })
    }

    /// The same value expressed with `precision` fractional digits.
    ///
    /// Adding digits is exact; dropping digits rounds half away from zero.
    pub fn with_precision(&self, precision: u32) -> Result<Self, DecimalError> {
        if precision >= self.precision {
            let factor = pow10(precision - self.precision)?;
            let mantissa = self
                .mantissa
                .checked_mul(factor)
                .ok_or(DecimalError::TooLarge)?;
            Ok(Self {
                mantissa,
                precision,
                ..*self
            })
        } else {
            let factor = pow10(self.precision - precision)?;
            let rounded = Ratio::new(self.mantissa, factor).round().to_integer();
            Ok(Self {
                mantissa: rounded,
                precision,
                ..*self
            })
        }
    }
}

pub(crate) fn pow10(exp: u32) -> Result<i128, DecimalError> {
    10i128.checked_pow(exp).ok_or(DecimalError::TooLarge)
}

impl FromStr for DecimalQuantity {
    type Err = DecimalError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (int_part, frac_part) = match s.split_once('.') {
            Some((int_part, frac_part)) => (int_part, Some(frac_part)),
            None => (s, None),
        };

        if int_part.is_empty() || !int_part.bytes().all(|b| b.is_ascii_digit()) {
            return Err(DecimalError::Malformed);
        }
        if let Some(frac) = frac_part {
            if frac.is_empty() || !frac.bytes().all(|b| b.is_ascii_digit()) {
                return Err(DecimalError::Malformed);
            }
        }

        let mut mantissa: i128 = 0;
        for b in int_part.bytes().chain(frac_part.unwrap_or("").bytes()) {
            mantissa = mantissa
                .checked_mul(10)
                .and_then(|m| m.checked_add(i128::from(b - b'0')))
                .ok_or(DecimalError::TooLarge)?;
        }

        let precision = frac_part.map_or(0, str::len);
        let precision = u32::try_from(precision).map_err(|_| DecimalError::TooLarge)?;
        let int_width = u32::try_from(int_part.len()).map_err(|_| DecimalError::TooLarge)?;
        Ok(Self {
            mantissa,
            precision,
            int_width,
        })
    }
}

impl fmt::Display for DecimalQuantity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.mantissa < 0 {
            f.write_str("-")?;
        }
        let digits = self.mantissa.unsigned_abs().to_string();
        let precision = self.precision as usize;
        let width = precision + self.int_width.max(1) as usize;
        let padded = format!("{:0>width$}", digits, width = width);
        if precision == 0 {
            return f.write_str(&padded);
        }
        let (int_part, frac_part) = padded.split_at(padded.len() - precision);
        write!(f, "{}.{}", int_part, frac_part)
    }
}

/// Rescale a decimal literal, preserving its number of fractional digits.
pub fn rescale(original: &str, multiplier: Multiplier) -> Result<String, DecimalError> {
    let quantity: DecimalQuantity = original.parse()?;
    Ok(quantity.rescale(multiplier)?.to_string())
}
