//! Powers, roots, logarithms and exponentials.
//!
//! Results that fit an `f64` are computed natively; everything else goes
//! through the base-10 log domain.

use crate::BigNum;

/// Integral powers up to this magnitude are computed by repeated squaring.
const MAX_SQUARING_POWER: f64 = 1024.0;

impl BigNum {
    /// `self^power`.
    ///
    /// - `x^0` is one for every `x`, NaN excepted.
    /// - `0^p` is zero for positive `p` and NaN for negative `p`.
    /// - A negative base needs an integral power; the sign follows its
    ///   parity. Any other negative base is NaN.
    pub fn pow(self, power: impl Into<BigNum>) -> BigNum {
        let power = power.into();
        if self.is_nan() || power.is_nan() {
            return BigNum::NAN;
        }
        if power.is_zero() {
            return BigNum::ONE;
        }
        if self.is_zero() {
            return if power.is_positive() {
                BigNum::ZERO
            } else {
                BigNum::NAN
            };
        }
        if self == BigNum::ONE {
            return BigNum::ONE;
        }

        let p = power.to_f64();
        if self.is_negative() {
            if !is_integral(p) {
                return BigNum::NAN;
            }
            let magnitude = (-self).pow(power);
            return if is_odd(p) { -magnitude } else { magnitude };
        }
        if self.is_infinite() {
            return if p > 0.0 {
                BigNum::INFINITY
            } else {
                BigNum::ZERO
            };
        }
        if p.is_infinite() {
            let grows = (self > BigNum::ONE) == (p > 0.0);
            return if grows {
                BigNum::INFINITY
            } else {
                BigNum::ZERO
            };
        }

        if let Some(native) = self.native_pow(p) {
            return native;
        }
        if is_integral(p) && p.abs() <= MAX_SQUARING_POWER {
            let magnitude = pow_by_squaring(self, p.abs() as u32);
            return if p < 0.0 { magnitude.recip() } else { magnitude };
        }
        BigNum::from_log10(p * self.log10_f64())
    }

    /// `base^self`.
    pub fn pow_base(self, base: impl Into<BigNum>) -> BigNum {
        base.into().pow(self)
    }

    /// `e^self`.
    pub fn exp(self) -> BigNum {
        if self.is_nan() {
            return BigNum::NAN;
        }
        let x = self.to_f64();
        let native = x.exp();
        if native.is_finite() && native != 0.0 {
            return BigNum::from(native);
        }
        BigNum::from_log10(x * std::f64::consts::LOG10_E)
    }

    /// `10^self`.
    pub fn pow10(self) -> BigNum {
        BigNum::from_log10(self.to_f64())
    }

    /// The `n`th root. Odd roots of negative values are allowed; even roots
    /// of negatives and the zeroth root are NaN.
    pub fn root(self, n: impl Into<BigNum>) -> BigNum {
        let n = n.into();
        if self.is_nan() || n.is_nan() || n.is_zero() {
            return BigNum::NAN;
        }
        if self.is_negative() {
            let degree = n.to_f64();
            if is_integral(degree) && is_odd(degree) {
                return -(-self).root(n);
            }
            return BigNum::NAN;
        }
        self.pow(n.recip())
    }

    /// Square root; NaN for negative values.
    pub fn sqrt(self) -> BigNum {
        if self.is_nan() || self.is_negative() {
            return BigNum::NAN;
        }
        if self.is_zero() || self.is_infinite() {
            return self;
        }
        let native = self.to_f64();
        if native.is_normal() {
            return BigNum::from(native.sqrt());
        }
        let whole = self.exponent.rem_euclid(2.0) == 0.0;
        if whole {
            BigNum::normalize(self.mantissa.sqrt(), self.exponent / 2.0)
        } else {
            BigNum::normalize((self.mantissa * 10.0).sqrt(), (self.exponent - 1.0) / 2.0)
        }
    }

    /// Cube root; defined for negative values.
    pub fn cbrt(self) -> BigNum {
        if !self.is_finite() || self.is_zero() {
            return self;
        }
        let native = self.to_f64();
        if native.is_normal() {
            return BigNum::from(native.cbrt());
        }
        let rem = self.exponent.rem_euclid(3.0);
        BigNum::normalize(
            (self.mantissa * 10f64.powf(rem)).cbrt(),
            (self.exponent - rem) / 3.0,
        )
    }

    // -- logarithms ---------------------------------------------------------

    /// Base-10 logarithm as an `f64`. NaN for values `<= 0`.
    pub fn log10_f64(self) -> f64 {
        if self.is_nan() || self.mantissa <= 0.0 {
            return f64::NAN;
        }
        if self.is_infinite() {
            return f64::INFINITY;
        }
        self.exponent + self.mantissa.log10()
    }

    /// Base-10 logarithm.
    pub fn log10(self) -> BigNum {
        BigNum::from(self.log10_f64())
    }

    /// Natural logarithm.
    pub fn ln(self) -> BigNum {
        BigNum::from(self.log10_f64() * std::f64::consts::LN_10)
    }

    /// Base-2 logarithm.
    pub fn log2(self) -> BigNum {
        BigNum::from(self.log10_f64() / std::f64::consts::LOG10_2)
    }

    /// Logarithm in an arbitrary base. NaN when the base is `<= 0` or one.
    pub fn log(self, base: impl Into<BigNum>) -> BigNum {
        let base = base.into();
        if base.is_nan() || base.mantissa <= 0.0 || base == BigNum::ONE {
            return BigNum::NAN;
        }
        BigNum::from(self.log10_f64() / base.log10_f64())
    }

    /// `self^p` computed in `f64` when both the input and the output fit.
    fn native_pow(self, p: f64) -> Option<BigNum> {
        let x = self.to_f64();
        if !x.is_finite() || x == 0.0 {
            return None;
        }
        let result = if is_integral(p) && p.abs() <= i32::MAX as f64 {
            x.powi(p as i32)
        } else {
            x.powf(p)
        };
        if result.is_normal() {
            Some(BigNum::from(result))
        } else {
            None
        }
    }
}

fn is_integral(value: f64) -> bool {
    value.is_finite() && value.fract() == 0.0
}

fn is_odd(value: f64) -> bool {
    // Past 2^53 every f64 is even.
    value.abs() < 9_007_199_254_740_992.0 && (value as i64) % 2 != 0
}

fn pow_by_squaring(base: BigNum, mut power: u32) -> BigNum {
    let mut result = BigNum::ONE;
    let mut square = base;
    while power > 0 {
        if power & 1 == 1 {
            result = result * square;
        }
        power >>= 1;
        if power > 0 {
            square = square * square;
        }
    }
    result
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
