//! Accrue Num -- mantissa/exponent big numbers for incremental games.
//!
//! [`BigNum`] stores a signed `f64` mantissa normalized to `1 <= |m| < 10`
//! and an integral `f64` exponent, so magnitudes reach roughly
//! `10^(1.8e308)` instead of overflowing at `1.8e308`. Values are `Copy` and
//! immutable: every operation returns a new value.
//!
//! Undefined results (log of a non-positive number, division by zero, even
//! roots of negatives, ...) do not panic. They produce the [`BigNum::NAN`]
//! sentinel, which callers are expected to guard with [`BigNum::is_nan`] or
//! [`BigNum::nan_or_zero`].
//!
//! # Quick Start
//!
//! ```
//! use accrue_num::BigNum;
//!
//! let base = BigNum::from(10_000);
//! let gain = (base / 10.0).cbrt().floor();
//! assert_eq!(gain, BigNum::from(10));
//!
//! let huge = BigNum::from_parts(1.5, 1e12);
//! assert!(huge > BigNum::from(f64::MAX));
//! assert_eq!(huge.to_string().parse::<BigNum>().unwrap(), huge);
//!
//! assert!(BigNum::ZERO.log10().is_nan());
//! assert_eq!((BigNum::from(5) / BigNum::INFINITY), BigNum::ZERO);
//! ```

#![deny(unsafe_code)]

mod arith;
mod cmp;
pub mod format;
mod power;

use std::sync::OnceLock;

// ---------------------------------------------------------------------------
// Error types
// ---------------------------------------------------------------------------

/// Errors produced when parsing a [`BigNum`] from text.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ParseBigNumError {
    /// The input was empty or whitespace only.
    #[error("cannot parse a big number from an empty string")]
    Empty,

    /// The mantissa or exponent part was not a valid number.
    #[error("invalid big number literal '{input}'")]
    Invalid {
        input: String,
    },
}

// ---------------------------------------------------------------------------
// BigNum
// ---------------------------------------------------------------------------

/// An immutable arbitrary-magnitude number.
///
/// Layout: `mantissa * 10^exponent`.
///
/// - Zero is `0e0`.
/// - NaN and the infinities keep their marker in the mantissa with a zero
///   exponent.
/// - Every other value has `1 <= |mantissa| < 10` and an integral exponent.
#[derive(Clone, Copy)]
pub struct BigNum {
    mantissa: f64,
    exponent: f64,
}

/// Largest exponent difference at which the smaller addend still affects a
/// sum.
pub(crate) const MAX_SIGNIFICANT_DIGITS: f64 = 17.0;

/// Exponents below this cannot be represented as a normal `f64`.
const F64_MIN_EXP: f64 = -324.0;
/// Exponents above this overflow an `f64`.
const F64_MAX_EXP: f64 = 308.0;

impl BigNum {
    /// `0`.
    pub const ZERO: BigNum = BigNum {
        mantissa: 0.0,
        exponent: 0.0,
    };
    /// `1`.
    pub const ONE: BigNum = BigNum {
        mantissa: 1.0,
        exponent: 0.0,
    };
    /// `2`.
    pub const TWO: BigNum = BigNum {
        mantissa: 2.0,
        exponent: 0.0,
    };
    /// `10`.
    pub const TEN: BigNum = BigNum {
        mantissa: 1.0,
        exponent: 1.0,
    };
    /// The "undefined" sentinel. Never equal to anything, itself included.
    pub const NAN: BigNum = BigNum {
        mantissa: f64::NAN,
        exponent: 0.0,
    };
    /// Positive infinity. Greater than every finite value.
    pub const INFINITY: BigNum = BigNum {
        mantissa: f64::INFINITY,
        exponent: 0.0,
    };
    /// Negative infinity.
    pub const NEG_INFINITY: BigNum = BigNum {
        mantissa: f64::NEG_INFINITY,
        exponent: 0.0,
    };

    // -- construction -------------------------------------------------------

    /// Build a value from an arbitrary mantissa and exponent, normalizing the
    /// result.
    ///
    /// A fractional exponent is folded into the mantissa.
    pub fn from_parts(mantissa: f64, exponent: f64) -> Self {
        if exponent.is_finite() && exponent.fract() != 0.0 {
            let whole = exponent.floor();
            return Self::normalize(mantissa * 10f64.powf(exponent - whole), whole);
        }
        Self::normalize(mantissa, exponent)
    }

    /// Build `10^log10` from a base-10 logarithm.
    pub fn from_log10(log10: f64) -> Self {
        if log10.is_nan() {
            return Self::NAN;
        }
        if log10 == f64::INFINITY {
            return Self::INFINITY;
        }
        if log10 == f64::NEG_INFINITY {
            return Self::ZERO;
        }
        let exponent = log10.floor();
        Self::normalize(10f64.powf(log10 - exponent), exponent)
    }

    /// Bring `(mantissa, exponent)` into canonical form.
    pub(crate) fn normalize(mantissa: f64, exponent: f64) -> Self {
        if mantissa.is_nan() || exponent.is_nan() {
            return Self::NAN;
        }
        if mantissa == 0.0 || exponent == f64::NEG_INFINITY {
            return Self::ZERO;
        }
        if mantissa.is_infinite() || exponent == f64::INFINITY {
            return if mantissa > 0.0 {
                Self::INFINITY
            } else {
                Self::NEG_INFINITY
            };
        }

        let mut m = mantissa;
        let mut e = exponent;
        // Lift subnormal mantissas so the power-of-ten table stays in range.
        if m.abs() < 1e-300 {
            m *= 1e300;
            e -= 300.0;
        }
        let shift = m.abs().log10().floor();
        if shift > 0.0 {
            m /= pow10(shift);
            e += shift;
        } else if shift < 0.0 {
            m *= pow10(-shift);
            e += shift;
        }
        // log10 can be off by one ulp around exact powers of ten.
        if m.abs() >= 10.0 {
            m /= 10.0;
            e += 1.0;
        } else if m.abs() < 1.0 {
            m *= 10.0;
            e -= 1.0;
        }

        if e.is_infinite() {
            return if e > 0.0 {
                if m > 0.0 {
                    Self::INFINITY
                } else {
                    Self::NEG_INFINITY
                }
            } else {
                Self::ZERO
            };
        }
        Self {
            mantissa: m,
            exponent: e,
        }
    }

    // -- accessors ----------------------------------------------------------

    /// The normalized mantissa (`1 <= |m| < 10` for finite non-zero values).
    #[inline]
    pub fn mantissa(self) -> f64 {
        self.mantissa
    }

    /// The integral exponent.
    #[inline]
    pub fn exponent(self) -> f64 {
        self.exponent
    }

    /// `true` for the undefined sentinel.
    #[inline]
    pub fn is_nan(self) -> bool {
        self.mantissa.is_nan()
    }

    /// `true` for either infinity.
    #[inline]
    pub fn is_infinite(self) -> bool {
        self.mantissa.is_infinite()
    }

    /// `true` for every value that is neither NaN nor infinite.
    #[inline]
    pub fn is_finite(self) -> bool {
        self.mantissa.is_finite()
    }

    #[inline]
    pub fn is_zero(self) -> bool {
        self.mantissa == 0.0
    }

    #[inline]
    pub fn is_positive(self) -> bool {
        self.mantissa > 0.0
    }

    #[inline]
    pub fn is_negative(self) -> bool {
        self.mantissa < 0.0
    }

    /// `-1`, `0` or `1`. NaN reports `0`.
    pub fn signum(self) -> i8 {
        if self.mantissa > 0.0 {
            1
        } else if self.mantissa < 0.0 {
            -1
        } else {
            0
        }
    }

    /// Substitute zero for the undefined sentinel.
    ///
    /// This is the standard guard before a value reaches display or a
    /// purchase decision.
    #[inline]
    pub fn nan_or_zero(self) -> Self {
        if self.is_nan() {
            Self::ZERO
        } else {
            self
        }
    }

    /// Substitute zero for NaN and for negative values.
    pub fn clamp_non_negative(self) -> Self {
        if self.is_nan() || self.is_negative() {
            Self::ZERO
        } else {
            self
        }
    }

    // -- conversion ---------------------------------------------------------

    /// Convert to the nearest `f64`, saturating to the infinities and zero.
    ///
    /// Results within `1e-10` of an integer (for non-negative exponents) are
    /// snapped to that integer so whole amounts survive the round trip.
    pub fn to_f64(self) -> f64 {
        if !self.is_finite() {
            return self.mantissa;
        }
        if self.is_zero() {
            return 0.0;
        }
        if self.exponent > F64_MAX_EXP {
            return if self.mantissa > 0.0 {
                f64::INFINITY
            } else {
                f64::NEG_INFINITY
            };
        }
        if self.exponent < F64_MIN_EXP {
            return 0.0;
        }
        let value = if self.exponent < -300.0 {
            self.mantissa * pow10(self.exponent + 300.0) * 1e-300
        } else {
            self.mantissa * pow10(self.exponent)
        };
        if !value.is_finite() || self.exponent < 0.0 {
            return value;
        }
        let rounded = value.round();
        if (rounded - value).abs() < 1e-10 {
            rounded
        } else {
            value
        }
    }
}

impl Default for BigNum {
    fn default() -> Self {
        Self::ZERO
    }
}

impl std::fmt::Debug for BigNum {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.is_finite() && !self.is_zero() {
            write!(f, "BigNum({}e{})", self.mantissa, self.exponent)
        } else {
            write!(f, "BigNum({})", self.mantissa)
        }
    }
}

// ---------------------------------------------------------------------------
// Primitive conversions
// ---------------------------------------------------------------------------

impl From<f64> for BigNum {
    fn from(value: f64) -> Self {
        Self::normalize(value, 0.0)
    }
}

impl From<f32> for BigNum {
    fn from(value: f32) -> Self {
        Self::normalize(value as f64, 0.0)
    }
}

macro_rules! from_integer {
    ($($t:ty),*) => {
        $(
            impl From<$t> for BigNum {
                fn from(value: $t) -> Self {
                    Self::normalize(value as f64, 0.0)
                }
            }
        )*
    };
}

from_integer!(i8, i16, i32, i64, isize, u8, u16, u32, u64, usize);

// ---------------------------------------------------------------------------
// Powers of ten
// ---------------------------------------------------------------------------

/// Exact `10^n` for integral `n` in the `f64` range.
///
/// Parsed from decimal literals once so every entry is the correctly rounded
/// power, which `powi` does not guarantee.
pub(crate) fn pow10(n: f64) -> f64 {
    static TABLE: OnceLock<Vec<f64>> = OnceLock::new();
    if n > F64_MAX_EXP {
        return f64::INFINITY;
    }
    if n < F64_MIN_EXP {
        return 0.0;
    }
    let table = TABLE.get_or_init(|| {
        (F64_MIN_EXP as i32..=F64_MAX_EXP as i32)
            .map(|i| format!("1e{i}").parse::<f64>().unwrap_or(0.0))
            .collect()
    });
    table[(n - F64_MIN_EXP) as usize]
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
