//! Cost/gain curves for conversions.
//!
//! A [`Scaling`] maps an amount of base resource to the (continuous) total
//! amount of gain resource it is worth, and back. Conversions floor the
//! gain, apply their modifier, and settle the result against
//! [`Scaling::cost`] so that thresholds and gains agree exactly.
//!
//! Every parameter is reactive: a [`Computable`] resolved once at
//! construction, read again on each evaluation.
//!
//! Domain violations (the log of a non-positive amount, a negative base)
//! produce NaN here; conversions clamp them to zero gain.

use accrue_num::BigNum;
use accrue_reactive::prelude::*;

/// An invertible base-to-gain curve.
pub trait Scaling {
    /// Total gain attainable with `base`, before flooring.
    fn gain(&self, base: BigNum) -> BigNum;

    /// Base required for a total gain of `amount`.
    fn cost(&self, amount: BigNum) -> BigNum;
}

// ---------------------------------------------------------------------------
// Polynomial
// ---------------------------------------------------------------------------

/// `gain = (base / base_requirement)^exponent`, so
/// `cost(n) = n^(1 / exponent) * base_requirement`.
#[derive(Debug, Clone)]
pub struct Polynomial {
    base_requirement: Derived<BigNum>,
    exponent: Derived<BigNum>,
}

impl Polynomial {
    pub fn new(
        rt: &Runtime,
        base_requirement: impl Into<Computable<BigNum>>,
        exponent: impl Into<Computable<BigNum>>,
    ) -> Self {
        Self {
            base_requirement: rt.resolve("polynomial.base_requirement", base_requirement.into()),
            exponent: rt.resolve("polynomial.exponent", exponent.into()),
        }
    }
}

impl Scaling for Polynomial {
    fn gain(&self, base: BigNum) -> BigNum {
        (base / self.base_requirement.get()).pow(self.exponent.get())
    }

    fn cost(&self, amount: BigNum) -> BigNum {
        amount.root(self.exponent.get()) * self.base_requirement.get()
    }
}

// ---------------------------------------------------------------------------
// Exponential
// ---------------------------------------------------------------------------

/// `gain = root(log_base(b / factor), exponent)`, so
/// `cost(n) = base^(n^exponent) * factor`.
///
/// Bases below `factor` give a negative logarithm and therefore no gain.
#[derive(Debug, Clone)]
pub struct Exponential {
    factor: Derived<BigNum>,
    base: Derived<BigNum>,
    exponent: Derived<BigNum>,
}

impl Exponential {
    pub fn new(
        rt: &Runtime,
        factor: impl Into<Computable<BigNum>>,
        base: impl Into<Computable<BigNum>>,
        exponent: impl Into<Computable<BigNum>>,
    ) -> Self {
        Self {
            factor: rt.resolve("exponential.factor", factor.into()),
            base: rt.resolve("exponential.base", base.into()),
            exponent: rt.resolve("exponential.exponent", exponent.into()),
        }
    }
}

impl Scaling for Exponential {
    fn gain(&self, base: BigNum) -> BigNum {
        let levels = (base / self.factor.get()).log(self.base.get());
        if levels.is_negative() {
            return BigNum::ZERO;
        }
        levels.root(self.exponent.get())
    }

    fn cost(&self, amount: BigNum) -> BigNum {
        let amount = amount.clamp_non_negative();
        self.base.get().pow(amount.pow(self.exponent.get())) * self.factor.get()
    }
}

// ---------------------------------------------------------------------------
// Table
// ---------------------------------------------------------------------------

/// Discrete thresholds: unit `n` (1-based) costs `thresholds[n - 1]`.
///
/// Thresholds must be ascending. Past the end of the table the cost is
/// infinite.
#[derive(Debug, Clone)]
pub struct Table {
    thresholds: Derived<Vec<BigNum>>,
}

impl Table {
    pub fn new(rt: &Runtime, thresholds: Computable<Vec<BigNum>>) -> Self {
        Self {
            thresholds: rt.resolve("table.thresholds", thresholds),
        }
    }

    /// A table with fixed thresholds.
    pub fn constant(rt: &Runtime, thresholds: impl IntoIterator<Item = impl Into<BigNum>>) -> Self {
        let thresholds = thresholds.into_iter().map(Into::into).collect();
        Self::new(rt, Computable::constant(thresholds))
    }
}

impl Scaling for Table {
    fn gain(&self, base: BigNum) -> BigNum {
        let reached = self
            .thresholds
            .get()
            .iter()
            .take_while(|threshold| **threshold <= base)
            .count();
        BigNum::from(reached as f64)
    }

    fn cost(&self, amount: BigNum) -> BigNum {
        if amount.is_nan() {
            return BigNum::NAN;
        }
        if !amount.is_positive() {
            return BigNum::ZERO;
        }
        let unit = amount.ceil().to_f64();
        if unit > usize::MAX as f64 {
            return BigNum::INFINITY;
        }
        self.thresholds
            .get()
            .get(unit as usize - 1)
            .copied()
            .unwrap_or(BigNum::INFINITY)
    }
}

// ---------------------------------------------------------------------------
// Softcapped
// ---------------------------------------------------------------------------

/// Wraps another curve; gain above `start` is raised to `power`
/// (`g^power * start^(1 - power)`, continuous at `start`).
pub struct Softcapped<S> {
    inner: S,
    start: Derived<BigNum>,
    power: Derived<BigNum>,
}

impl<S: Scaling> Softcapped<S> {
    pub fn new(
        rt: &Runtime,
        inner: S,
        start: impl Into<Computable<BigNum>>,
        power: impl Into<Computable<BigNum>>,
    ) -> Self {
        Self {
            inner,
            start: rt.resolve("softcap.start", start.into()),
            power: rt.resolve("softcap.power", power.into()),
        }
    }
}

impl<S: Scaling> Scaling for Softcapped<S> {
    fn gain(&self, base: BigNum) -> BigNum {
        let gain = self.inner.gain(base);
        let start = self.start.get();
        if gain <= start {
            return gain;
        }
        let power = self.power.get();
        gain.pow(power) * start.pow(BigNum::ONE - power)
    }

    fn cost(&self, amount: BigNum) -> BigNum {
        let start = self.start.get();
        if amount <= start {
            return self.inner.cost(amount);
        }
        let power = self.power.get();
        let uncapped = (amount / start.pow(BigNum::ONE - power)).root(power);
        self.inner.cost(uncapped)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn polynomial_cube_relation_is_exact() {
        let rt = Runtime::new();
        let scaling = Polynomial::new(&rt, 10, BigNum::ONE / 3.0);
        assert_eq!(scaling.cost(BigNum::from(10)).round(), BigNum::from(10_000));
        assert_eq!(scaling.gain(BigNum::from(10_000)).round(), BigNum::from(10));
    }

    #[test]
    fn polynomial_parameters_are_reactive() {
        let rt = Runtime::new();
        let requirement = rt.signal("req", BigNum::from(10));
        let scaling = Polynomial::new(&rt, &requirement, 1);
        assert_eq!(scaling.gain(BigNum::from(100)), BigNum::from(10));
        requirement.set(BigNum::from(5));
        assert_eq!(scaling.gain(BigNum::from(100)), BigNum::from(20));
    }

    #[test]
    fn exponential_inverts() {
        let rt = Runtime::new();
        let scaling = Exponential::new(&rt, 10, 2, 1);
        // 2^3 * 10
        assert_eq!(scaling.cost(BigNum::from(3)), BigNum::from(80));
        assert!(scaling.gain(BigNum::from(80)).approx_eq(BigNum::from(3), 1e-12));
    }

    #[test]
    fn exponential_below_factor_gains_nothing() {
        let rt = Runtime::new();
        let scaling = Exponential::new(&rt, 10, 2, 1);
        assert_eq!(scaling.gain(BigNum::from(5)), BigNum::ZERO);
        assert!(scaling.gain(BigNum::ZERO).is_nan() || scaling.gain(BigNum::ZERO).is_zero());
    }

    #[test]
    fn table_counts_reached_thresholds() {
        let rt = Runtime::new();
        let table = Table::constant(&rt, [125.0, 1_000.0]);
        assert_eq!(table.gain(BigNum::from(100)), BigNum::ZERO);
        assert_eq!(table.gain(BigNum::from(125)), BigNum::ONE);
        assert_eq!(table.gain(BigNum::from(5_000)), BigNum::TWO);

        assert_eq!(table.cost(BigNum::ZERO), BigNum::ZERO);
        assert_eq!(table.cost(BigNum::ONE), BigNum::from(125));
        assert_eq!(table.cost(BigNum::TWO), BigNum::from(1_000));
        assert_eq!(table.cost(BigNum::from(3)), BigNum::INFINITY);
    }

    #[test]
    fn softcap_is_continuous_and_invertible() {
        let rt = Runtime::new();
        let scaling = Softcapped::new(&rt, Polynomial::new(&rt, 1, 1), 100, 0.5);

        assert_eq!(scaling.gain(BigNum::from(50)), BigNum::from(50));
        assert_eq!(scaling.gain(BigNum::from(100)), BigNum::from(100));
        // 400^0.5 * 100^0.5
        assert!(scaling.gain(BigNum::from(400)).approx_eq(BigNum::from(200), 1e-12));
        assert!(scaling.cost(BigNum::from(200)).approx_eq(BigNum::from(400), 1e-12));
    }
}
