//! Equality and ordering.
//!
//! NaN is unordered under `PartialOrd` and never equal to anything, matching
//! `f64`. [`BigNum::cmp_total`] gives a total order for sorting and for
//! property tests.

use std::cmp::Ordering;

use crate::BigNum;

impl BigNum {
    /// Total order: `NaN < -inf < negative < 0 < positive < inf`.
    pub fn cmp_total(&self, other: &BigNum) -> Ordering {
        match (self.is_nan(), other.is_nan()) {
            (true, true) => return Ordering::Equal,
            (true, false) => return Ordering::Less,
            (false, true) => return Ordering::Greater,
            (false, false) => {}
        }

        let (sa, sb) = (self.signum(), other.signum());
        if sa != sb {
            return sa.cmp(&sb);
        }
        if sa == 0 {
            return Ordering::Equal;
        }

        let magnitude = match (self.is_infinite(), other.is_infinite()) {
            (true, true) => Ordering::Equal,
            (true, false) => Ordering::Greater,
            (false, true) => Ordering::Less,
            (false, false) => self
                .exponent
                .total_cmp(&other.exponent)
                .then(self.mantissa.abs().total_cmp(&other.mantissa.abs())),
        };
        if sa > 0 {
            magnitude
        } else {
            magnitude.reverse()
        }
    }

    /// The smaller value. NaN if either side is NaN.
    pub fn min(self, other: BigNum) -> BigNum {
        if self.is_nan() || other.is_nan() {
            return BigNum::NAN;
        }
        if self.cmp_total(&other) == Ordering::Greater {
            other
        } else {
            self
        }
    }

    /// The larger value. NaN if either side is NaN.
    pub fn max(self, other: BigNum) -> BigNum {
        if self.is_nan() || other.is_nan() {
            return BigNum::NAN;
        }
        if self.cmp_total(&other) == Ordering::Less {
            other
        } else {
            self
        }
    }

    /// Restrict to `[lo, hi]`.
    pub fn clamp(self, lo: BigNum, hi: BigNum) -> BigNum {
        self.max(lo).min(hi)
    }

    /// `true` when the values differ by at most `rel_tol` of the larger
    /// magnitude. Equal infinities compare equal; NaN never does.
    pub fn approx_eq(self, other: BigNum, rel_tol: f64) -> bool {
        if self.is_nan() || other.is_nan() {
            return false;
        }
        if self == other {
            return true;
        }
        if self.is_infinite() || other.is_infinite() {
            return false;
        }
        let diff = (self - other).abs();
        let scale = self.abs().max(other.abs());
        diff <= scale * rel_tol
    }
}

impl PartialEq for BigNum {
    fn eq(&self, other: &BigNum) -> bool {
        !self.is_nan()
            && !other.is_nan()
            && self.mantissa == other.mantissa
            && self.exponent == other.exponent
    }
}

impl PartialOrd for BigNum {
    fn partial_cmp(&self, other: &BigNum) -> Option<Ordering> {
        if self.is_nan() || other.is_nan() {
            None
        } else {
            Some(self.cmp_total(other))
        }
    }
}

impl PartialEq<f64> for BigNum {
    fn eq(&self, other: &f64) -> bool {
        *self == BigNum::from(*other)
    }
}

impl PartialOrd<f64> for BigNum {
    fn partial_cmp(&self, other: &f64) -> Option<Ordering> {
        self.partial_cmp(&BigNum::from(*other))
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
