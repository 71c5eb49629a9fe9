//! Mutable source cells.

use std::cell::RefCell;
use std::fmt;
use std::marker::PhantomData;
use std::rc::Weak;

use crate::node::NodeId;
use crate::runtime::{Graph, HandleMarker, Runtime};
use crate::ReactiveError;

/// A named mutable value in the graph.
///
/// Reading a signal inside a derived computation makes that derived depend
/// on it. Writing marks every transitive dependent dirty. The signal
/// remembers its initial value so [`Signal::reset`] can restore it.
pub struct Signal<T> {
    id: NodeId,
    graph: Weak<RefCell<Graph>>,
    _marker: HandleMarker<T>,
}

impl<T> Clone for Signal<T> {
    fn clone(&self) -> Self {
        Self {
            id: self.id,
            graph: self.graph.clone(),
            _marker: PhantomData,
        }
    }
}

impl<T> Signal<T> {
    pub(crate) fn from_parts(id: NodeId, graph: Weak<RefCell<Graph>>) -> Self {
        Self {
            id,
            graph,
            _marker: PhantomData,
        }
    }

    /// The node id of this signal.
    pub fn id(&self) -> NodeId {
        self.id
    }

    /// The debug label given at creation.
    pub fn label(&self) -> String {
        Runtime::upgrade(&self.graph)
            .ok()
            .and_then(|rt| rt.label(self.id))
            .unwrap_or_default()
    }

    fn runtime(&self) -> Result<Runtime, ReactiveError> {
        Runtime::upgrade(&self.graph)
    }
}

impl<T: Clone + PartialEq + 'static> Signal<T> {
    /// Read the value, registering a dependency when called inside a
    /// derived computation.
    ///
    /// # Panics
    ///
    /// Panics if the signal was declared but never initialized.
    pub fn get(&self) -> T {
        match self.try_get() {
            Ok(value) => value,
            Err(err) => raise(&self.graph, err),
        }
    }

    /// Fallible form of [`Signal::get`].
    pub fn try_get(&self) -> Result<T, ReactiveError> {
        self.runtime()?.read_signal(self.id)
    }

    /// Read the value without registering a dependency.
    pub fn get_untracked(&self) -> T {
        match self.runtime() {
            Ok(rt) => rt.untracked(|| self.get()),
            Err(err) => raise(&self.graph, err),
        }
    }

    /// Store a new value. A value equal to the current one changes nothing.
    ///
    /// # Panics
    ///
    /// Panics when called during a derived evaluation or on an
    /// uninitialized signal.
    pub fn set(&self, value: T) {
        if let Err(err) = self.try_set(value) {
            raise(&self.graph, err);
        }
    }

    /// Fallible form of [`Signal::set`]. Returns whether the value changed.
    pub fn try_set(&self, value: T) -> Result<bool, ReactiveError> {
        let rt = self.runtime()?;
        let changed = rt.graph().borrow_mut().write(self.id, Box::new(value))?;
        Ok(changed)
    }

    /// Replace the value with `f(current)`. The read is untracked.
    pub fn update(&self, f: impl FnOnce(&T) -> T) {
        let next = f(&self.get_untracked());
        self.set(next);
    }

    /// Restore the initial value.
    pub fn reset(&self) {
        let result = self
            .runtime()
            .and_then(|rt| rt.graph().borrow_mut().reset_node(self.id));
        if let Err(err) = result {
            raise(&self.graph, err);
        }
    }

    /// Give a declared signal its first (and initial) value.
    pub fn init(&self, value: T) -> Result<(), ReactiveError> {
        self.runtime()?.init_signal(self.id, Box::new(value))
    }

    /// `false` for a declared signal that has not been initialized yet.
    pub fn is_initialized(&self) -> bool {
        self.runtime()
            .map(|rt| rt.has_value(self.id))
            .unwrap_or(false)
    }

    /// The value [`Signal::reset`] restores.
    pub fn initial(&self) -> Option<T> {
        let rt = self.runtime().ok()?;
        let graph = rt.graph().borrow();
        let node = graph.node(self.id).ok()?;
        node.initial.as_ref()?.downcast_ref::<T>().cloned()
    }
}

impl<T> fmt::Debug for Signal<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Signal")
            .field("id", &self.id)
            .field("label", &self.label())
            .finish()
    }
}

impl<T> PartialEq for Signal<T> {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id && self.graph.ptr_eq(&other.graph)
    }
}

pub(crate) fn raise(graph: &Weak<RefCell<Graph>>, err: ReactiveError) -> ! {
    match Runtime::upgrade(graph) {
        Ok(rt) => rt.raise(err),
        Err(_) => panic!("{err}"),
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
