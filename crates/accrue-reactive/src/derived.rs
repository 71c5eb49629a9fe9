//! Memoized read-only computations.

use std::cell::RefCell;
use std::fmt;
use std::marker::PhantomData;
use std::rc::Weak;

use crate::node::NodeId;
use crate::runtime::{erase, Graph, HandleMarker, Runtime};
use crate::signal::raise;
use crate::ReactiveError;

/// A memoized computation over signals and other deriveds.
///
/// The computation runs lazily on the first read after one of its sources
/// changed and is cached otherwise. It must be pure: writing a signal while
/// it runs is rejected.
pub struct Derived<T> {
    id: NodeId,
    graph: Weak<RefCell<Graph>>,
    _marker: HandleMarker<T>,
}

impl<T> Clone for Derived<T> {
    fn clone(&self) -> Self {
        Self {
            id: self.id,
            graph: self.graph.clone(),
            _marker: PhantomData,
        }
    }
}

impl<T> Derived<T> {
    pub(crate) fn from_parts(id: NodeId, graph: Weak<RefCell<Graph>>) -> Self {
        Self {
            id,
            graph,
            _marker: PhantomData,
        }
    }

    pub fn id(&self) -> NodeId {
        self.id
    }

    pub fn label(&self) -> String {
        Runtime::upgrade(&self.graph)
            .ok()
            .and_then(|rt| rt.label(self.id))
            .unwrap_or_default()
    }

    /// How many times the computation has run to completion.
    pub fn evaluations(&self) -> u64 {
        Runtime::upgrade(&self.graph)
            .map(|rt| rt.evaluations(self.id))
            .unwrap_or(0)
    }

    /// `false` for a declared derived whose computation is still missing.
    pub fn is_defined(&self) -> bool {
        Runtime::upgrade(&self.graph)
            .map(|rt| rt.has_compute(self.id))
            .unwrap_or(false)
    }
}

impl<T: Clone + PartialEq + 'static> Derived<T> {
    /// Read the (possibly recomputed) value, registering a dependency when
    /// called inside another derived computation.
    ///
    /// # Panics
    ///
    /// Panics on a dependency cycle, an undefined derived, or an
    /// uninitialized signal reached by the computation.
    pub fn get(&self) -> T {
        match self.try_get() {
            Ok(value) => value,
            Err(err) => raise(&self.graph, err),
        }
    }

    /// Fallible form of [`Derived::get`].
    pub fn try_get(&self) -> Result<T, ReactiveError> {
        let rt = Runtime::upgrade(&self.graph)?;
        rt.catching(|| rt.read_derived(self.id))
    }

    /// Read without registering a dependency.
    pub fn get_untracked(&self) -> T {
        match Runtime::upgrade(&self.graph) {
            Ok(rt) => rt.untracked(|| self.get()),
            Err(err) => raise(&self.graph, err),
        }
    }

    /// Attach the computation to a declared derived.
    pub fn define<F>(&self, compute: F) -> Result<(), ReactiveError>
    where
        F: Fn() -> T + 'static,
    {
        Runtime::upgrade(&self.graph)?.define_derived(self.id, erase(compute))
    }
}

impl<T> fmt::Debug for Derived<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Derived")
            .field("id", &self.id)
            .field("label", &self.label())
            .finish()
    }
}

impl<T> PartialEq for Derived<T> {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id && self.graph.ptr_eq(&other.graph)
    }
}
