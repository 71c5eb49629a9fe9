//! Field arithmetic, rounding and operator overloads for [`BigNum`].

use std::iter::{Product, Sum};
use std::ops::{Add, AddAssign, Div, DivAssign, Mul, MulAssign, Neg, Sub, SubAssign};

use crate::{pow10, BigNum, MAX_SIGNIFICANT_DIGITS};

/// Digits the aligned mantissas are scaled by before rounding a sum.
const SUM_PRECISION: f64 = 14.0;

impl BigNum {
    /// `self + rhs`.
    ///
    /// When the exponents differ by more than 17 the smaller addend cannot
    /// change the result and the larger one is returned unchanged. Otherwise
    /// the aligned mantissas are rounded to 14 significant digits, which keeps
    /// sums of whole numbers whole.
    pub fn plus(self, rhs: BigNum) -> BigNum {
        if self.is_nan() || rhs.is_nan() {
            return BigNum::NAN;
        }
        if self.is_infinite() || rhs.is_infinite() {
            if self.is_infinite() && rhs.is_infinite() && self.signum() != rhs.signum() {
                return BigNum::NAN;
            }
            return if self.is_infinite() { self } else { rhs };
        }
        if self.is_zero() {
            return rhs;
        }
        if rhs.is_zero() {
            return self;
        }

        let (big, small) = if self.exponent >= rhs.exponent {
            (self, rhs)
        } else {
            (rhs, self)
        };
        if big.exponent - small.exponent > MAX_SIGNIFICANT_DIGITS {
            return big;
        }
        let scale = pow10(SUM_PRECISION);
        let mantissa = (scale * big.mantissa
            + scale * small.mantissa * pow10(small.exponent - big.exponent))
        .round();
        BigNum::normalize(mantissa, big.exponent - SUM_PRECISION)
    }

    /// `self - rhs`.
    pub fn minus(self, rhs: BigNum) -> BigNum {
        self.plus(-rhs)
    }

    /// `self * rhs`. `0 * inf` is NaN.
    pub fn times(self, rhs: BigNum) -> BigNum {
        if self.is_nan() || rhs.is_nan() {
            return BigNum::NAN;
        }
        if self.is_infinite() || rhs.is_infinite() {
            if self.is_zero() || rhs.is_zero() {
                return BigNum::NAN;
            }
            return if self.signum() == rhs.signum() {
                BigNum::INFINITY
            } else {
                BigNum::NEG_INFINITY
            };
        }
        if self.is_zero() || rhs.is_zero() {
            return BigNum::ZERO;
        }
        BigNum::normalize(self.mantissa * rhs.mantissa, self.exponent + rhs.exponent)
    }

    /// `self / rhs`.
    ///
    /// Division by zero is NaN, a finite value over an infinity is zero, and
    /// `inf / inf` is NaN.
    pub fn divided_by(self, rhs: BigNum) -> BigNum {
        if self.is_nan() || rhs.is_nan() || rhs.is_zero() {
            return BigNum::NAN;
        }
        if rhs.is_infinite() {
            return if self.is_infinite() {
                BigNum::NAN
            } else {
                BigNum::ZERO
            };
        }
        if self.is_infinite() {
            return if self.signum() == rhs.signum() {
                BigNum::INFINITY
            } else {
                BigNum::NEG_INFINITY
            };
        }
        if self.is_zero() {
            return BigNum::ZERO;
        }
        BigNum::normalize(self.mantissa / rhs.mantissa, self.exponent - rhs.exponent)
    }

    /// `1 / self`.
    pub fn recip(self) -> BigNum {
        BigNum::ONE.divided_by(self)
    }

    /// `|self|`.
    pub fn abs(self) -> BigNum {
        if self.mantissa < 0.0 {
            -self
        } else {
            self
        }
    }

    // -- rounding -----------------------------------------------------------

    /// Largest whole number `<= self`.
    pub fn floor(self) -> BigNum {
        if !self.is_finite() || self.exponent >= MAX_SIGNIFICANT_DIGITS - 1.0 {
            return self;
        }
        if self.exponent < 0.0 {
            return if self.is_negative() {
                -BigNum::ONE
            } else {
                BigNum::ZERO
            };
        }
        BigNum::from(self.to_f64().floor())
    }

    /// Smallest whole number `>= self`.
    pub fn ceil(self) -> BigNum {
        if !self.is_finite() || self.exponent >= MAX_SIGNIFICANT_DIGITS - 1.0 {
            return self;
        }
        if self.exponent < 0.0 {
            return if self.is_positive() {
                BigNum::ONE
            } else {
                BigNum::ZERO
            };
        }
        BigNum::from(self.to_f64().ceil())
    }

    /// Nearest whole number, halves away from zero.
    pub fn round(self) -> BigNum {
        if !self.is_finite() || self.exponent >= MAX_SIGNIFICANT_DIGITS - 1.0 {
            return self;
        }
        if self.exponent < -1.0 {
            return BigNum::ZERO;
        }
        BigNum::from(self.to_f64().round())
    }

    /// Whole part, rounding toward zero.
    pub fn trunc(self) -> BigNum {
        if !self.is_finite() || self.exponent >= MAX_SIGNIFICANT_DIGITS - 1.0 {
            return self;
        }
        if self.exponent < 0.0 {
            return BigNum::ZERO;
        }
        BigNum::from(self.to_f64().trunc())
    }
}

// ---------------------------------------------------------------------------
// Operator overloads
// ---------------------------------------------------------------------------

impl Neg for BigNum {
    type Output = BigNum;

    fn neg(self) -> BigNum {
        if self.is_zero() {
            return BigNum::ZERO;
        }
        BigNum {
            mantissa: -self.mantissa,
            exponent: self.exponent,
        }
    }
}

macro_rules! binary_op {
    ($trait:ident, $method:ident, $assign_trait:ident, $assign_method:ident, $imp:ident) => {
        impl $trait<BigNum> for BigNum {
            type Output = BigNum;

            #[inline]
            fn $method(self, rhs: BigNum) -> BigNum {
                self.$imp(rhs)
            }
        }

        impl $trait<f64> for BigNum {
            type Output = BigNum;

            #[inline]
            fn $method(self, rhs: f64) -> BigNum {
                self.$imp(BigNum::from(rhs))
            }
        }

        impl $trait<BigNum> for f64 {
            type Output = BigNum;

            #[inline]
            fn $method(self, rhs: BigNum) -> BigNum {
                BigNum::from(self).$imp(rhs)
            }
        }

        impl $assign_trait<BigNum> for BigNum {
            #[inline]
            fn $assign_method(&mut self, rhs: BigNum) {
                *self = self.$imp(rhs);
            }
        }

        impl $assign_trait<f64> for BigNum {
            #[inline]
            fn $assign_method(&mut self, rhs: f64) {
                *self = self.$imp(BigNum::from(rhs));
            }
        }
    };
}

binary_op!(Add, add, AddAssign, add_assign, plus);
binary_op!(Sub, sub, SubAssign, sub_assign, minus);
binary_op!(Mul, mul, MulAssign, mul_assign, times);
binary_op!(Div, div, DivAssign, div_assign, divided_by);

impl Sum for BigNum {
    fn sum<I: Iterator<Item = BigNum>>(iter: I) -> BigNum {
        iter.fold(BigNum::ZERO, BigNum::plus)
    }
}

impl<'a> Sum<&'a BigNum> for BigNum {
    fn sum<I: Iterator<Item = &'a BigNum>>(iter: I) -> BigNum {
        iter.copied().sum()
    }
}

impl Product for BigNum {
    fn product<I: Iterator<Item = BigNum>>(iter: I) -> BigNum {
        iter.fold(BigNum::ONE, BigNum::times)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
