//! Construction-time polymorphic inputs.
//!
//! Feature options accept a [`Computable`] wherever a value may be a
//! constant, a signal, another derived, or an ad-hoc closure. Each is
//! resolved once, when the feature is built, into a uniform [`Derived`]
//! handle.

use std::fmt;
use std::rc::Rc;

use accrue_num::BigNum;

use crate::derived::Derived;
use crate::runtime::Runtime;
use crate::signal::Signal;

/// A value that is either fixed or reactive.
pub enum Computable<T> {
    Constant(T),
    Signal(Signal<T>),
    Derived(Derived<T>),
    Function(Rc<dyn Fn() -> T>),
}

impl<T> Computable<T> {
    pub fn constant(value: T) -> Self {
        Computable::Constant(value)
    }

    pub fn function(f: impl Fn() -> T + 'static) -> Self {
        Computable::Function(Rc::new(f))
    }
}

impl<T: Clone> Clone for Computable<T> {
    fn clone(&self) -> Self {
        match self {
            Computable::Constant(v) => Computable::Constant(v.clone()),
            Computable::Signal(s) => Computable::Signal(s.clone()),
            Computable::Derived(d) => Computable::Derived(d.clone()),
            Computable::Function(f) => Computable::Function(Rc::clone(f)),
        }
    }
}

impl<T: fmt::Debug> fmt::Debug for Computable<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Computable::Constant(v) => f.debug_tuple("Constant").field(v).finish(),
            Computable::Signal(s) => f.debug_tuple("Signal").field(&s.id()).finish(),
            Computable::Derived(d) => f.debug_tuple("Derived").field(&d.id()).finish(),
            Computable::Function(_) => f.write_str("Function(..)"),
        }
    }
}

impl<T> From<Signal<T>> for Computable<T> {
    fn from(signal: Signal<T>) -> Self {
        Computable::Signal(signal)
    }
}

impl<T> From<&Signal<T>> for Computable<T> {
    fn from(signal: &Signal<T>) -> Self {
        Computable::Signal(signal.clone())
    }
}

impl<T> From<Derived<T>> for Computable<T> {
    fn from(derived: Derived<T>) -> Self {
        Computable::Derived(derived)
    }
}

impl<T> From<&Derived<T>> for Computable<T> {
    fn from(derived: &Derived<T>) -> Self {
        Computable::Derived(derived.clone())
    }
}

macro_rules! constant_from {
    ($($t:ty),*) => {
        $(
            impl From<$t> for Computable<$t> {
                fn from(value: $t) -> Self {
                    Computable::Constant(value)
                }
            }
        )*
    };
}

constant_from!(bool, f64, u32, u64, i64, usize, String, BigNum);

impl From<f64> for Computable<BigNum> {
    fn from(value: f64) -> Self {
        Computable::Constant(BigNum::from(value))
    }
}

impl From<i32> for Computable<BigNum> {
    fn from(value: i32) -> Self {
        Computable::Constant(BigNum::from(value))
    }
}

impl From<&str> for Computable<String> {
    fn from(value: &str) -> Self {
        Computable::Constant(value.to_string())
    }
}

impl Runtime {
    /// Resolve a [`Computable`] into a derived handle.
    ///
    /// A `Derived` input is returned as is; the other variants get a new
    /// node labelled `label`.
    pub fn resolve<T>(&self, label: impl Into<String>, computable: Computable<T>) -> Derived<T>
    where
        T: Clone + PartialEq + 'static,
    {
        match computable {
            Computable::Constant(value) => self.derived(label, move || value.clone()),
            Computable::Signal(signal) => self.derived(label, move || signal.get()),
            Computable::Derived(derived) => derived,
            Computable::Function(f) => self.derived(label, move || f()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_variant_resolves_to_a_derived() {
        let rt = Runtime::new();
        let s = rt.signal("s", 2.0_f64);
        let d = {
            let s = s.clone();
            rt.derived("d", move || s.get() * 10.0)
        };

        let constant = rt.resolve("c", Computable::constant(7.0_f64));
        let from_signal = rt.resolve("fs", Computable::from(&s));
        let from_derived = rt.resolve("fd", Computable::from(&d));
        let from_fn = {
            let s = s.clone();
            rt.resolve("ff", Computable::function(move || s.get() + 0.5))
        };

        assert_eq!(constant.get(), 7.0);
        assert_eq!(from_signal.get(), 2.0);
        assert_eq!(from_derived, d);
        assert_eq!(from_fn.get(), 2.5);

        s.set(3.0);
        assert_eq!(from_signal.get(), 3.0);
        assert_eq!(from_derived.get(), 30.0);
        assert_eq!(from_fn.get(), 3.5);
    }

    #[test]
    fn bignum_constants_from_plain_numbers() {
        let rt = Runtime::new();
        let c: Computable<BigNum> = 10.into();
        assert_eq!(rt.resolve("ten", c).get(), BigNum::from(10));
    }
}
