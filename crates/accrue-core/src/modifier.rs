//! Invertible, toggleable adjustment chains.
//!
//! A [`Modifier`] is one step (`+x`, `*x` or `^x`) with a reactive operand
//! and a reactive enabled flag. A [`SequentialModifier`] folds its steps in
//! declaration order for [`apply`](SequentialModifier::apply) and in
//! reverse order with the inverse operators for
//! [`revert`](SequentialModifier::revert), skipping disabled steps both
//! ways. While no enabled flag changes between the two calls,
//! `revert(apply(x)) == x` up to floating point error.
//!
//! Conversions use `revert` to translate a desired gain back into the
//! unmodified amount whose cost is then looked up.
//!
//! # Example
//!
//! ```
//! use accrue_core::prelude::*;
//!
//! let rt = Runtime::new();
//! let chain = SequentialModifier::new(vec![
//!     Modifier::additive(&rt, 5, "base bonus", true),
//!     Modifier::multiplicative(&rt, 3, "tripler", true),
//! ]);
//!
//! let applied = chain.apply(BigNum::from(10));
//! assert_eq!(applied, BigNum::from(45));
//! assert_eq!(chain.revert(applied), BigNum::from(10));
//! ```

use std::fmt;

use accrue_num::BigNum;
use accrue_reactive::prelude::*;

/// The operator a [`Modifier`] applies.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ModifierKind {
    Additive,
    Multiplicative,
    Exponential,
}

/// One reactive adjustment step.
#[derive(Clone)]
pub struct Modifier {
    kind: ModifierKind,
    operand: Derived<BigNum>,
    description: String,
    enabled: Derived<bool>,
    low_numbers: bool,
}

impl Modifier {
    pub fn new(
        rt: &Runtime,
        kind: ModifierKind,
        operand: impl Into<Computable<BigNum>>,
        description: impl Into<String>,
        enabled: impl Into<Computable<bool>>,
    ) -> Self {
        let description = description.into();
        let operand = rt.resolve(format!("modifier.{description}.operand"), operand.into());
        let enabled = rt.resolve(format!("modifier.{description}.enabled"), enabled.into());
        Self {
            kind,
            operand,
            description,
            enabled,
            low_numbers: false,
        }
    }

    /// `x + operand`
    pub fn additive(
        rt: &Runtime,
        operand: impl Into<Computable<BigNum>>,
        description: impl Into<String>,
        enabled: impl Into<Computable<bool>>,
    ) -> Self {
        Self::new(rt, ModifierKind::Additive, operand, description, enabled)
    }

    /// `x * operand`
    pub fn multiplicative(
        rt: &Runtime,
        operand: impl Into<Computable<BigNum>>,
        description: impl Into<String>,
        enabled: impl Into<Computable<bool>>,
    ) -> Self {
        Self::new(rt, ModifierKind::Multiplicative, operand, description, enabled)
    }

    /// `x ^ operand`
    pub fn exponential(
        rt: &Runtime,
        operand: impl Into<Computable<BigNum>>,
        description: impl Into<String>,
        enabled: impl Into<Computable<bool>>,
    ) -> Self {
        Self::new(rt, ModifierKind::Exponential, operand, description, enabled)
    }

    /// Exponential steps only: raise `x + 1` and subtract one afterwards, so
    /// amounts below one still grow.
    pub fn with_low_number_support(mut self) -> Self {
        self.low_numbers = true;
        self
    }

    pub fn kind(&self) -> ModifierKind {
        self.kind
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    pub fn operand(&self) -> BigNum {
        self.operand.get()
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled.get()
    }

    pub fn apply(&self, value: BigNum) -> BigNum {
        if !self.is_enabled() {
            return value;
        }
        let operand = self.operand();
        match self.kind {
            ModifierKind::Additive => value + operand,
            ModifierKind::Multiplicative => value * operand,
            ModifierKind::Exponential if self.low_numbers => (value + 1.0).pow(operand) - 1.0,
            ModifierKind::Exponential => value.pow(operand),
        }
    }

    /// The inverse of [`apply`](Self::apply).
    ///
    /// Undoing a multiplication or exponentiation by zero is undefined and
    /// yields NaN.
    pub fn revert(&self, value: BigNum) -> BigNum {
        if !self.is_enabled() {
            return value;
        }
        let operand = self.operand();
        if operand.is_zero() && self.kind != ModifierKind::Additive {
            tracing::debug!(
                modifier = %self.description,
                kind = ?self.kind,
                "revert through a zero operand is undefined"
            );
            return BigNum::NAN;
        }
        match self.kind {
            ModifierKind::Additive => value - operand,
            ModifierKind::Multiplicative => value / operand,
            ModifierKind::Exponential if self.low_numbers => (value + 1.0).root(operand) - 1.0,
            ModifierKind::Exponential => value.root(operand),
        }
    }
}

impl fmt::Debug for Modifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Modifier")
            .field("kind", &self.kind)
            .field("description", &self.description)
            .field("low_numbers", &self.low_numbers)
            .finish()
    }
}

// ---------------------------------------------------------------------------
// SequentialModifier
// ---------------------------------------------------------------------------

/// An ordered chain of [`Modifier`]s.
#[derive(Debug, Clone, Default)]
pub struct SequentialModifier {
    steps: Vec<Modifier>,
}

impl SequentialModifier {
    pub fn new(steps: Vec<Modifier>) -> Self {
        Self { steps }
    }

    pub fn push(&mut self, step: Modifier) {
        self.steps.push(step);
    }

    pub fn steps(&self) -> &[Modifier] {
        &self.steps
    }

    /// Fold every enabled step in declaration order.
    pub fn apply(&self, value: BigNum) -> BigNum {
        self.steps.iter().fold(value, |acc, step| step.apply(acc))
    }

    /// Fold every enabled step in reverse order with inverse operators.
    pub fn revert(&self, value: BigNum) -> BigNum {
        self.steps.iter().rev().fold(value, |acc, step| step.revert(acc))
    }

    /// `true` when at least one step is enabled.
    pub fn enabled(&self) -> bool {
        self.steps.iter().any(Modifier::is_enabled)
    }

    /// One line per enabled step, with the running value after the step.
    pub fn breakdown(&self, base: BigNum) -> Vec<ModifierLine> {
        let mut value = base;
        let mut lines = Vec::new();
        for step in &self.steps {
            if !step.is_enabled() {
                continue;
            }
            value = step.apply(value);
            lines.push(ModifierLine {
                description: step.description.clone(),
                kind: step.kind,
                operand: step.operand(),
                result: value,
            });
        }
        lines
    }
}

/// A row of a modifier breakdown.
#[derive(Debug, Clone, PartialEq)]
pub struct ModifierLine {
    pub description: String,
    pub kind: ModifierKind,
    pub operand: BigNum,
    /// Value after this step was applied.
    pub result: BigNum,
}

impl fmt::Display for ModifierLine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let symbol = match self.kind {
            ModifierKind::Additive => "+",
            ModifierKind::Multiplicative => "x",
            ModifierKind::Exponential => "^",
        };
        write!(f, "{}: {symbol}{}", self.description, self.operand.format(2))
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn steps_fold_in_order() {
        let rt = Runtime::new();
        let chain = SequentialModifier::new(vec![
            Modifier::multiplicative(&rt, 2, "double", true),
            Modifier::additive(&rt, 1, "plus one", true),
            Modifier::exponential(&rt, 2, "square", true),
        ]);
        // ((3 * 2) + 1)^2
        assert_eq!(chain.apply(BigNum::from(3)), BigNum::from(49));
        assert_eq!(chain.revert(BigNum::from(49)), BigNum::from(3));
    }

    #[test]
    fn disabled_steps_are_skipped_both_ways() {
        let rt = Runtime::new();
        let flag = rt.signal("flag", false);
        let chain = SequentialModifier::new(vec![
            Modifier::multiplicative(&rt, 10, "gated", &flag),
            Modifier::additive(&rt, 2, "always", true),
        ]);
        assert!(chain.enabled());
        assert_eq!(chain.apply(BigNum::from(1)), BigNum::from(3));
        assert_eq!(chain.revert(BigNum::from(3)), BigNum::from(1));

        flag.set(true);
        assert_eq!(chain.apply(BigNum::from(1)), BigNum::from(12));
        assert_eq!(chain.revert(BigNum::from(12)), BigNum::from(1));
    }

    #[test]
    fn enabled_is_any_step() {
        let rt = Runtime::new();
        let chain = SequentialModifier::new(vec![
            Modifier::additive(&rt, 1, "a", false),
            Modifier::additive(&rt, 1, "b", false),
        ]);
        assert!(!chain.enabled());
        assert!(!SequentialModifier::default().enabled());
    }

    #[test]
    fn operand_is_reactive() {
        let rt = Runtime::new();
        let level = rt.signal("level", BigNum::from(2));
        let step = {
            let level = level.clone();
            Modifier::multiplicative(
                &rt,
                Computable::function(move || level.get() + 1.0),
                "level bonus",
                true,
            )
        };
        assert_eq!(step.apply(BigNum::from(5)), BigNum::from(15));
        level.set(BigNum::from(4));
        assert_eq!(step.apply(BigNum::from(5)), BigNum::from(25));
    }

    #[test]
    fn revert_through_zero_is_nan() {
        let rt = Runtime::new();
        let times_zero = Modifier::multiplicative(&rt, 0, "nothing", true);
        let pow_zero = Modifier::exponential(&rt, 0, "flat", true);
        assert!(times_zero.revert(BigNum::from(5)).is_nan());
        assert!(pow_zero.revert(BigNum::from(5)).is_nan());
    }

    #[test]
    fn low_number_support_grows_fractions() {
        let rt = Runtime::new();
        let plain = Modifier::exponential(&rt, 2, "plain", true);
        let low = Modifier::exponential(&rt, 2, "low", true).with_low_number_support();

        let half = BigNum::from(0.5);
        assert!(plain.apply(half) < half);
        // (0.5 + 1)^2 - 1
        assert!(low.apply(half).approx_eq(BigNum::from(1.25), 1e-12));
        assert!(low.revert(low.apply(half)).approx_eq(half, 1e-12));
    }

    #[test]
    fn breakdown_lists_enabled_steps() {
        let rt = Runtime::new();
        let chain = SequentialModifier::new(vec![
            Modifier::additive(&rt, 4, "Hot Start", true),
            Modifier::multiplicative(&rt, 3, "hidden", false),
            Modifier::multiplicative(&rt, 2, "The Source", true),
        ]);
        let lines = chain.breakdown(BigNum::from(1));
        assert_eq!(lines.len(), 2);
        assert_eq!(lines[0].result, BigNum::from(5));
        assert_eq!(lines[1].result, BigNum::from(10));
        assert_eq!(lines[0].to_string(), "Hot Start: +4.00");
        assert_eq!(lines[1].to_string(), "The Source: x2.00");
    }
}
