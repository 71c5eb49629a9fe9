//! The conversion engine: spend a base resource, gain another.
//!
//! A [`Conversion`] owns a handful of deriveds over its base and gain
//! resources:
//!
//! | derived        | meaning                                                   |
//! |----------------|-----------------------------------------------------------|
//! | `raw_gain`     | scaling output before the modifier (display only)         |
//! | `current_gain` | whole units affordable right now, never NaN or negative   |
//! | `actual_gain`  | what [`Conversion::purchase`] grants                       |
//! | `current_at`   | base threshold for the amount being purchased             |
//! | `next_at`      | base threshold for one more unit                          |
//!
//! Thresholds are `cost(revert(n))`: the modifier is undone first, then the
//! scaling curve is inverted. `current_gain` is settled against those
//! thresholds, so with the base at exactly `current_at` the gain is exactly
//! the purchased amount, whatever the floating point error of the curve.
//!
//! # Kinds
//!
//! - [`ConversionKind::Independent`]: the curve gives the total amount the
//!   base is worth, and the gain is what is missing from the amount already
//!   held (marginal units).
//! - [`ConversionKind::Cumulative`]: the whole curve output is gained on
//!   every purchase (prestige style).

use std::fmt;
use std::rc::Rc;

use accrue_num::BigNum;
use accrue_reactive::prelude::*;

use crate::modifier::SequentialModifier;
use crate::resource::Resource;
use crate::scaling::Scaling;
use crate::BuildError;

/// Relative distance under which a cost is snapped to the nearest integer.
const SNAP_TOLERANCE: f64 = 1e-10;

/// Maximum correction steps when settling a floored gain against its
/// thresholds.
const SETTLE_STEPS: usize = 2;

// ---------------------------------------------------------------------------
// Options
// ---------------------------------------------------------------------------

/// How the gain relates to the amount already held.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ConversionKind {
    #[default]
    Independent,
    Cumulative,
}

/// What a purchase takes from the base resource.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Spend {
    /// Deduct exactly `current_at`.
    #[default]
    Threshold,
    /// Set the base to zero.
    All,
    /// Leave the base untouched (required for read-only bases).
    Keep,
}

/// Construction options for a [`Conversion`].
///
/// Defaults: independent, spends the threshold, rounds costs up, buys max,
/// no modifier.
pub struct ConversionOptions {
    pub base: Resource,
    pub gain: Resource,
    pub scaling: Rc<dyn Scaling>,
    pub gain_modifier: Option<SequentialModifier>,
    pub round_up_cost: Computable<bool>,
    pub buy_max: Computable<bool>,
    pub kind: ConversionKind,
    pub spend: Spend,
}

impl ConversionOptions {
    pub fn new(base: Resource, gain: Resource, scaling: impl Scaling + 'static) -> Self {
        Self {
            base,
            gain,
            scaling: Rc::new(scaling),
            gain_modifier: None,
            round_up_cost: Computable::constant(true),
            buy_max: Computable::constant(true),
            kind: ConversionKind::Independent,
            spend: Spend::Threshold,
        }
    }

    pub fn gain_modifier(mut self, modifier: SequentialModifier) -> Self {
        self.gain_modifier = Some(modifier);
        self
    }

    pub fn round_up_cost(mut self, round_up: impl Into<Computable<bool>>) -> Self {
        self.round_up_cost = round_up.into();
        self
    }

    pub fn buy_max(mut self, buy_max: impl Into<Computable<bool>>) -> Self {
        self.buy_max = buy_max.into();
        self
    }

    pub fn kind(mut self, kind: ConversionKind) -> Self {
        self.kind = kind;
        self
    }

    pub fn spend(mut self, spend: Spend) -> Self {
        self.spend = spend;
        self
    }
}

// ---------------------------------------------------------------------------
// Thresholds
// ---------------------------------------------------------------------------

/// The curve, the modifier and the rounding policy, shared by the deriveds.
struct Curve {
    scaling: Rc<dyn Scaling>,
    modifier: Option<SequentialModifier>,
    round_up: Derived<bool>,
}

impl Curve {
    /// Modified, unfloored gain for `base`.
    fn modified_gain(&self, base: BigNum) -> BigNum {
        let raw = self.scaling.gain(base);
        match &self.modifier {
            Some(modifier) => modifier.apply(raw),
            None => raw,
        }
    }

    /// Base needed for a total (modified) amount of `amount`.
    fn threshold(&self, amount: BigNum) -> BigNum {
        let unmodified = match &self.modifier {
            Some(modifier) => modifier.revert(amount),
            None => amount,
        };
        let cost = snap(self.scaling.cost(unmodified));
        if self.round_up.get() {
            cost.ceil()
        } else {
            cost
        }
    }

    /// Whole units `base` is worth: the largest `n` with
    /// `threshold(n) <= base`, starting from the floored curve output.
    fn affordable(&self, base: BigNum) -> BigNum {
        let mut total = self.modified_gain(base).floor().clamp_non_negative();
        if total.is_infinite() {
            return total;
        }
        for _ in 0..SETTLE_STEPS {
            if total.is_positive() && self.threshold(total) > base {
                total = total - 1.0;
            } else {
                break;
            }
        }
        for _ in 0..SETTLE_STEPS {
            let next = total + 1.0;
            if self.threshold(next) <= base {
                total = next;
            } else {
                break;
            }
        }
        total
    }
}

fn snap(cost: BigNum) -> BigNum {
    let whole = cost.round();
    if !whole.is_zero() && cost.approx_eq(whole, SNAP_TOLERANCE) {
        whole
    } else {
        cost
    }
}

// ---------------------------------------------------------------------------
// Conversion
// ---------------------------------------------------------------------------

/// A base-to-gain exchange along a scaling curve.
#[derive(Clone)]
pub struct Conversion {
    label: String,
    base: Resource,
    gain: Resource,
    kind: ConversionKind,
    spend: Spend,
    buy_max: Derived<bool>,
    raw_gain: Derived<BigNum>,
    current_gain: Derived<BigNum>,
    actual_gain: Derived<BigNum>,
    current_at: Derived<BigNum>,
    next_at: Derived<BigNum>,
}

impl Conversion {
    /// Build the conversion and its deriveds.
    ///
    /// # Errors
    ///
    /// [`BuildError::ReadOnlyBase`] when the base is read-only but the
    /// spend policy would write to it.
    pub fn new(
        rt: &Runtime,
        label: impl Into<String>,
        options: ConversionOptions,
    ) -> Result<Self, BuildError> {
        let label = label.into();
        let ConversionOptions {
            base,
            gain,
            scaling,
            gain_modifier,
            round_up_cost,
            buy_max,
            kind,
            spend,
        } = options;

        if base.is_read_only() && spend != Spend::Keep {
            return Err(BuildError::ReadOnlyBase {
                label,
                base: base.name().to_string(),
            });
        }

        let curve = Rc::new(Curve {
            scaling,
            modifier: gain_modifier,
            round_up: rt.resolve(format!("{label}.round_up_cost"), round_up_cost),
        });
        let buy_max = rt.resolve(format!("{label}.buy_max"), buy_max);

        let raw_gain = {
            let curve = Rc::clone(&curve);
            let base = base.clone();
            rt.derived(format!("{label}.raw_gain"), move || {
                curve.scaling.gain(base.value()).clamp_non_negative()
            })
        };

        // Amount the thresholds are offset by: the held amount for
        // independent conversions, nothing for cumulative ones.
        let offset = {
            let gain = gain.clone();
            move || match kind {
                ConversionKind::Independent => gain.value(),
                ConversionKind::Cumulative => BigNum::ZERO,
            }
        };
        let offset = Rc::new(offset);

        let current_gain = {
            let curve = Rc::clone(&curve);
            let base = base.clone();
            let offset = Rc::clone(&offset);
            rt.derived(format!("{label}.current_gain"), move || {
                let total = curve.affordable(base.value());
                (total - offset()).clamp_non_negative()
            })
        };

        let actual_gain = {
            let current_gain = current_gain.clone();
            let buy_max = buy_max.clone();
            rt.derived(format!("{label}.actual_gain"), move || {
                let gain = current_gain.get();
                if buy_max.get() {
                    gain
                } else {
                    gain.min(BigNum::ONE)
                }
            })
        };

        // Past ~1e14 units a single unit is below BigNum resolution and the
        // settled threshold can land a rounding step above the base; a
        // purchase never costs more than the base holds.
        let current_at = {
            let curve = Rc::clone(&curve);
            let actual_gain = actual_gain.clone();
            let offset = Rc::clone(&offset);
            let base = base.clone();
            rt.derived(format!("{label}.current_at"), move || {
                let amount = actual_gain.get();
                let threshold = curve.threshold(offset() + amount);
                if amount.is_positive() {
                    threshold.min(base.value())
                } else {
                    threshold
                }
            })
        };

        let next_at = {
            let curve = Rc::clone(&curve);
            let current_gain = current_gain.clone();
            let offset = Rc::clone(&offset);
            rt.derived(format!("{label}.next_at"), move || {
                curve.threshold(offset() + current_gain.get() + 1.0)
            })
        };

        Ok(Self {
            label,
            base,
            gain,
            kind,
            spend,
            buy_max,
            raw_gain,
            current_gain,
            actual_gain,
            current_at,
            next_at,
        })
    }

    // -- accessors ----------------------------------------------------------

    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn base(&self) -> &Resource {
        &self.base
    }

    pub fn gain(&self) -> &Resource {
        &self.gain
    }

    pub fn kind(&self) -> ConversionKind {
        self.kind
    }

    pub fn spend(&self) -> Spend {
        self.spend
    }

    pub fn buy_max(&self) -> bool {
        self.buy_max.get()
    }

    pub fn raw_gain(&self) -> BigNum {
        self.raw_gain.get()
    }

    pub fn current_gain(&self) -> BigNum {
        self.current_gain.get()
    }

    pub fn actual_gain(&self) -> BigNum {
        self.actual_gain.get()
    }

    pub fn current_at(&self) -> BigNum {
        self.current_at.get()
    }

    pub fn next_at(&self) -> BigNum {
        self.next_at.get()
    }

    /// Derived handle for `current_gain`, for use in other computations.
    pub fn current_gain_derived(&self) -> &Derived<BigNum> {
        &self.current_gain
    }

    pub fn can_purchase(&self) -> bool {
        self.actual_gain().is_positive()
    }

    // -- actions ------------------------------------------------------------

    /// Spend the base and grant [`actual_gain`](Self::actual_gain).
    ///
    /// With [`Spend::Threshold`] the deduction is `current_at`, the threshold
    /// of the new total (held + granted for independent conversions), not
    /// the marginal cost of the granted units.
    ///
    /// Returns the granted amount; zero (and no effect) when nothing is
    /// affordable.
    pub fn purchase(&self) -> BigNum {
        let amount = self.actual_gain();
        if !amount.is_positive() {
            return BigNum::ZERO;
        }
        // Thresholds depend on the held amount; read before mutating.
        let cost = self.current_at();

        match self.spend {
            Spend::Threshold => self.base.sub(cost),
            Spend::All => self.base.set(BigNum::ZERO),
            Spend::Keep => {}
        }
        self.gain.add(amount);

        tracing::debug!(
            conversion = %self.label,
            granted = %amount,
            cost = %cost,
            spend = ?self.spend,
            "conversion purchased"
        );
        amount
    }

    /// Passive generation: add `actual_gain * rate * delta` to the gain
    /// resource without spending anything.
    pub fn passive_generation(&self, rate: impl Into<BigNum>, delta: f64) {
        let amount = self.actual_gain() * rate.into() * delta;
        if amount.is_positive() {
            self.gain.add(amount);
        }
    }
}

impl fmt::Debug for Conversion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Conversion")
            .field("label", &self.label)
            .field("base", &self.base.name())
            .field("gain", &self.gain.name())
            .field("kind", &self.kind)
            .field("spend", &self.spend)
            .finish()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::modifier::Modifier;
    use crate::scaling::{Polynomial, Table};

    struct Fixture {
        rt: Runtime,
        base: Resource,
        gain: Resource,
    }

    fn fixture(base: f64, held: f64) -> Fixture {
        let rt = Runtime::new();
        let base = Resource::new(rt.signal("particles", BigNum::from(base)), "particles");
        let gain = Resource::new(rt.signal("flame", BigNum::from(held)), "flame");
        Fixture { rt, base, gain }
    }

    /// cost(n) = 10 * n^3
    fn cube(rt: &Runtime) -> Polynomial {
        Polynomial::new(rt, 10, BigNum::ONE / 3.0)
    }

    fn build(f: &Fixture, options: impl FnOnce(ConversionOptions) -> ConversionOptions) -> Conversion {
        let options = options(ConversionOptions::new(
            f.base.clone(),
            f.gain.clone(),
            cube(&f.rt),
        ));
        Conversion::new(&f.rt, "flame.conversion", options).unwrap()
    }

    // -- 1. Gains and thresholds ---------------------------------------------

    #[test]
    fn exact_cube_boundary() {
        let f = fixture(10_000.0, 0.0);
        let conversion = build(&f, |o| o);
        assert_eq!(conversion.current_gain(), BigNum::from(10));
        assert_eq!(conversion.current_at(), BigNum::from(10_000));
        assert_eq!(conversion.next_at(), BigNum::from(13_310));
    }

    #[test]
    fn gain_at_threshold_is_exact_for_every_unit() {
        let f = fixture(0.0, 0.0);
        let conversion = build(&f, |o| o.round_up_cost(false));
        for n in 1..=30 {
            let threshold = BigNum::from(10 * n * n * n);
            f.base.set(threshold);
            assert_eq!(conversion.current_gain(), BigNum::from(n), "at {threshold}");
            f.base.set(threshold - 0.5);
            assert_eq!(conversion.current_gain(), BigNum::from(n - 1));
        }
    }

    #[test]
    fn below_first_unit_is_exactly_zero() {
        let f = fixture(9.0, 0.0);
        let conversion = build(&f, |o| o);
        assert_eq!(conversion.current_gain(), BigNum::ZERO);
        assert!(!conversion.can_purchase());
        assert_eq!(conversion.purchase(), BigNum::ZERO);
        assert_eq!(f.base.value(), BigNum::from(9));
    }

    #[test]
    fn negative_base_clamps_to_zero() {
        let f = fixture(-50.0, 0.0);
        let conversion = build(&f, |o| o);
        assert_eq!(conversion.raw_gain(), BigNum::ZERO);
        assert_eq!(conversion.current_gain(), BigNum::ZERO);
    }

    #[test]
    fn independent_gain_is_marginal() {
        let f = fixture(10_000.0, 4.0);
        let conversion = build(&f, |o| o);
        assert_eq!(conversion.current_gain(), BigNum::from(6));
        // Threshold of the total after purchase.
        assert_eq!(conversion.current_at(), BigNum::from(10_000));

        let g = fixture(10_000.0, 4.0);
        let bought = build(&g, |o| o);
        assert_eq!(bought.purchase(), BigNum::from(6));
        // The whole threshold of 10 units is spent, not the marginal 10_000 - 640.
        assert_eq!(g.base.value(), BigNum::ZERO);
        assert_eq!(g.gain.value(), BigNum::from(10));

        f.gain.set(BigNum::from(12));
        assert_eq!(conversion.current_gain(), BigNum::ZERO);
    }

    #[test]
    fn cumulative_gain_ignores_held_amount() {
        let f = fixture(10_000.0, 4.0);
        let conversion = build(&f, |o| o.kind(ConversionKind::Cumulative));
        assert_eq!(conversion.current_gain(), BigNum::from(10));
        f.gain.set(BigNum::from(1_000));
        assert_eq!(conversion.current_gain(), BigNum::from(10));
    }

    #[test]
    fn round_up_cost_ceils_thresholds() {
        let f = fixture(0.0, 0.0);
        let rt = &f.rt;
        let options = ConversionOptions::new(f.base.clone(), f.gain.clone(), Polynomial::new(rt, 2.5, 0.5));
        let conversion = Conversion::new(rt, "c", options).unwrap();
        // cost(1) = 1^2 * 2.5
        assert_eq!(conversion.next_at(), BigNum::from(3));
    }

    // -- 2. Modifier ----------------------------------------------------------

    #[test]
    fn modifier_scales_gain_and_thresholds() {
        let f = fixture(10_000.0, 0.0);
        let multiplier = f.rt.signal("mult", BigNum::from(2));
        let modifier = SequentialModifier::new(vec![Modifier::multiplicative(
            &f.rt,
            &multiplier,
            "mode C",
            true,
        )]);
        let conversion = build(&f, |o| o.gain_modifier(modifier).kind(ConversionKind::Cumulative));

        assert_eq!(conversion.current_gain(), BigNum::from(20));
        // 20 modified units are 10 raw units.
        assert_eq!(conversion.current_at(), BigNum::from(10_000));

        multiplier.set(BigNum::ONE);
        assert_eq!(conversion.current_gain(), BigNum::from(10));
    }

    // -- 3. Purchases ---------------------------------------------------------

    #[test]
    fn buy_max_deducts_exact_threshold() {
        let f = fixture(12_000.0, 0.0);
        let conversion = build(&f, |o| o);
        assert_eq!(conversion.purchase(), BigNum::from(10));
        assert_eq!(f.gain.value(), BigNum::from(10));
        assert_eq!(f.base.value(), BigNum::from(2_000));
        assert_eq!(conversion.current_gain(), BigNum::ZERO);
    }

    #[test]
    fn huge_purchases_never_cost_more_than_the_base() {
        for (mantissa, exponent) in [(2.5, 40.0), (1.0, 15.0), (7.3, 121.0), (1.0, 300.0)] {
            let f = fixture(0.0, 0.0);
            let options = ConversionOptions::new(f.base.clone(), f.gain.clone(), Polynomial::new(&f.rt, 10, 0.5));
            let conversion = Conversion::new(&f.rt, "c", options).unwrap();
            let base_value = BigNum::from_parts(mantissa, exponent);
            f.base.set(base_value);

            let cost = conversion.current_at();
            assert!(cost <= base_value, "base={base_value} current_at={cost}");
            let granted = conversion.purchase();
            assert!(granted.is_positive());
            assert_eq!(f.base.value(), base_value - cost);
            assert!(!f.base.value().is_negative());
        }
    }

    #[test]
    fn single_purchase_without_buy_max() {
        let f = fixture(10_000.0, 0.0);
        let conversion = build(&f, |o| o.buy_max(false));
        assert_eq!(conversion.current_gain(), BigNum::from(10));
        assert_eq!(conversion.actual_gain(), BigNum::ONE);
        assert_eq!(conversion.current_at(), BigNum::from(10));
        assert_eq!(conversion.purchase(), BigNum::ONE);
        assert_eq!(f.base.value(), BigNum::from(9_990));
        assert_eq!(f.gain.value(), BigNum::ONE);
    }

    #[test]
    fn spend_all_and_keep() {
        let f = fixture(12_000.0, 0.0);
        let all = build(&f, |o| o.kind(ConversionKind::Cumulative).spend(Spend::All));
        all.purchase();
        assert_eq!(f.base.value(), BigNum::ZERO);

        let g = fixture(12_000.0, 0.0);
        let keep = build(&g, |o| o.spend(Spend::Keep));
        keep.purchase();
        assert_eq!(g.base.value(), BigNum::from(12_000));
        assert_eq!(g.gain.value(), BigNum::from(10));
    }

    #[test]
    fn read_only_base_must_keep() {
        let rt = Runtime::new();
        let rate = rt.derived("rate", || BigNum::from(200));
        let base = Resource::read_only(rate, "particles/s");
        let gain = Resource::new(rt.signal("adv", BigNum::ZERO), "advancements");

        let spending = ConversionOptions::new(base.clone(), gain.clone(), Table::constant(&rt, [125.0]));
        assert_eq!(
            Conversion::new(&rt, "adv.conversion", spending).unwrap_err(),
            BuildError::ReadOnlyBase {
                label: "adv.conversion".into(),
                base: "particles/s".into(),
            }
        );

        let keeping = ConversionOptions::new(base, gain.clone(), Table::constant(&rt, [125.0]))
            .spend(Spend::Keep)
            .buy_max(false);
        let conversion = Conversion::new(&rt, "adv.conversion", keeping).unwrap();
        assert_eq!(conversion.current_at(), BigNum::from(125));
        assert_eq!(conversion.purchase(), BigNum::ONE);
        assert_eq!(gain.value(), BigNum::ONE);
        assert_eq!(conversion.current_gain(), BigNum::ZERO);
        assert_eq!(conversion.next_at(), BigNum::INFINITY);
    }

    #[test]
    fn passive_generation_scales_with_delta() {
        let f = fixture(10_000.0, 0.0);
        let conversion = build(&f, |o| o.kind(ConversionKind::Cumulative));
        conversion.passive_generation(0.5, 2.0);
        assert_eq!(f.gain.value(), BigNum::from(10));
        assert_eq!(f.base.value(), BigNum::from(10_000));
    }

    #[test]
    fn deriveds_memoize_between_writes() {
        let f = fixture(10_000.0, 0.0);
        let conversion = build(&f, |o| o);
        conversion.current_gain();
        let evaluations = conversion.current_gain_derived().evaluations();
        conversion.current_gain();
        conversion.next_at();
        assert_eq!(conversion.current_gain_derived().evaluations(), evaluations);
    }
}
