//! Named amounts with optional best/total trackers.
//!
//! A [`Resource`] wraps the signal holding an amount. Every write goes
//! through [`Resource::set`], which keeps the trackers consistent:
//!
//! - `best` is the running maximum, so `best >= value` always holds.
//! - `total` accumulates positive deltas and never decreases between
//!   resets.
//!
//! A resource may also be a read-only view over a derived (a production
//! rate, for example). Such a resource can be the base of a conversion that
//! does not spend it.

use std::fmt;

use accrue_num::BigNum;
use accrue_reactive::prelude::*;

/// Decimal places used by [`Resource::display`] unless overridden.
pub const DEFAULT_PRECISION: usize = 2;

#[derive(Clone)]
enum Source {
    Signal(Signal<BigNum>),
    ReadOnly(Derived<BigNum>),
}

/// A displayable amount of something.
#[derive(Clone)]
pub struct Resource {
    name: String,
    precision: usize,
    source: Source,
    best: Option<Signal<BigNum>>,
    total: Option<Signal<BigNum>>,
}

impl Resource {
    /// A writable resource backed by `value`.
    pub fn new(value: Signal<BigNum>, name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            precision: DEFAULT_PRECISION,
            source: Source::Signal(value),
            best: None,
            total: None,
        }
    }

    /// A read-only resource whose amount is computed by `value`.
    pub fn read_only(value: Derived<BigNum>, name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            precision: DEFAULT_PRECISION,
            source: Source::ReadOnly(value),
            best: None,
            total: None,
        }
    }

    pub fn with_precision(mut self, precision: usize) -> Self {
        self.precision = precision;
        self
    }

    /// Track the running maximum in `best`.
    pub fn with_best(mut self, best: Signal<BigNum>) -> Self {
        self.best = Some(best);
        self
    }

    /// Track the sum of positive deltas in `total`.
    pub fn with_total(mut self, total: Signal<BigNum>) -> Self {
        self.total = Some(total);
        self
    }

    // -- accessors ----------------------------------------------------------

    /// Display name, e.g. `"Flame Particles"`.
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn precision(&self) -> usize {
        self.precision
    }

    pub fn is_read_only(&self) -> bool {
        matches!(self.source, Source::ReadOnly(_))
    }

    /// The backing signal, `None` for a read-only resource.
    pub fn signal(&self) -> Option<&Signal<BigNum>> {
        match &self.source {
            Source::Signal(signal) => Some(signal),
            Source::ReadOnly(_) => None,
        }
    }

    /// Current amount. Registers a dependency inside a derived computation.
    pub fn value(&self) -> BigNum {
        match &self.source {
            Source::Signal(signal) => signal.get(),
            Source::ReadOnly(derived) => derived.get(),
        }
    }

    pub fn value_untracked(&self) -> BigNum {
        match &self.source {
            Source::Signal(signal) => signal.get_untracked(),
            Source::ReadOnly(derived) => derived.get_untracked(),
        }
    }

    /// Highest amount seen, when tracked.
    pub fn best(&self) -> Option<BigNum> {
        self.best.as_ref().map(Signal::get)
    }

    /// Sum of every increase, when tracked.
    pub fn total(&self) -> Option<BigNum> {
        self.total.as_ref().map(Signal::get)
    }

    /// The amount formatted with this resource's precision.
    pub fn display(&self) -> String {
        self.value().format(self.precision)
    }

    // -- writes -------------------------------------------------------------

    /// Overwrite the amount.
    ///
    /// NaN is clamped to zero; writes to a read-only resource are ignored.
    /// Both cases are logged at `warn`.
    pub fn set(&self, value: BigNum) {
        let Source::Signal(signal) = &self.source else {
            tracing::warn!(resource = %self.name, "write to read-only resource -- ignoring");
            return;
        };
        let value = if value.is_nan() {
            tracing::warn!(resource = %self.name, "NaN written to resource -- clamping to zero");
            BigNum::ZERO
        } else {
            value
        };

        let previous = signal.get_untracked();
        signal.set(value);

        if let Some(best) = &self.best {
            if value > best.get_untracked() {
                best.set(value);
            }
        }
        if let Some(total) = &self.total {
            let delta = value - previous;
            if delta.is_positive() {
                total.set(total.get_untracked() + delta);
            }
        }
    }

    pub fn add(&self, amount: BigNum) {
        self.set(self.value_untracked() + amount);
    }

    pub fn sub(&self, amount: BigNum) {
        self.set(self.value_untracked() - amount);
    }

    /// Set `best` and `total` to the current amount, as after a reset that
    /// leaves the amount at a non-initial value.
    pub fn reset_trackers(&self) {
        let value = self.value_untracked();
        if let Some(best) = &self.best {
            best.set(value);
        }
        if let Some(total) = &self.total {
            total.set(value);
        }
    }
}

impl fmt::Debug for Resource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Resource")
            .field("name", &self.name)
            .field("value", &self.value_untracked())
            .field("read_only", &self.is_read_only())
            .finish()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
