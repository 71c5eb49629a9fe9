//! The graph runtime: node storage, dependency tracking and the
//! push-dirty / pull-verify evaluation algorithm.
//!
//! # Evaluation
//!
//! Each node carries two revision stamps. `changed_at` is the revision at
//! which its value last actually changed; `verified_at` (deriveds only) is
//! the revision at which it was last known to be up to date.
//!
//! 1. Writing a signal bumps the global revision, stamps the signal's
//!    `changed_at`, and marks every transitive dependent dirty.
//! 2. Reading a dirty derived first refreshes its recorded sources in order.
//!    If none of them changed after the derived's `verified_at`, the cached
//!    value is kept and the computation does not run.
//! 3. Otherwise the computation re-runs under a tracking frame, its
//!    dependency edges are replaced by the reads it made, and `changed_at` is
//!    only bumped when the new value differs from the cached one.
//!
//! A derived whose evaluation reaches itself again is reported as
//! [`ReactiveError::Cycle`] through the `computing` flag.
//!
//! # Borrowing
//!
//! The graph lives in a `RefCell`. No borrow is ever held while user code
//! (a derived computation) runs, so computations may freely read other
//! nodes.

use std::any::Any;
use std::cell::RefCell;
use std::fmt;
use std::marker::PhantomData;
use std::panic::{self, AssertUnwindSafe};
use std::rc::{Rc, Weak};

use crate::derived::Derived;
use crate::node::{NodeAllocator, NodeId};
use crate::persist::PersistRegistry;
use crate::signal::Signal;
use crate::ReactiveError;

// ---------------------------------------------------------------------------
// Type-erased values
// ---------------------------------------------------------------------------

pub(crate) type ComputeFn = Rc<dyn Fn() -> Box<dyn Any>>;

/// Per-type operations on a type-erased node value.
#[derive(Clone, Copy)]
pub(crate) struct ValueOps {
    pub(crate) same: fn(&dyn Any, &dyn Any) -> bool,
    pub(crate) clone: fn(&dyn Any) -> Option<Box<dyn Any>>,
}

impl ValueOps {
    pub(crate) fn of<T: Clone + PartialEq + 'static>() -> Self {
        Self {
            same: same_value::<T>,
            clone: clone_value::<T>,
        }
    }
}

fn same_value<T: PartialEq + 'static>(a: &dyn Any, b: &dyn Any) -> bool {
    match (a.downcast_ref::<T>(), b.downcast_ref::<T>()) {
        (Some(a), Some(b)) => a == b,
        _ => false,
    }
}

fn clone_value<T: Clone + 'static>(value: &dyn Any) -> Option<Box<dyn Any>> {
    value
        .downcast_ref::<T>()
        .map(|v| Box::new(v.clone()) as Box<dyn Any>)
}

// ---------------------------------------------------------------------------
// Node
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum NodeKind {
    Signal,
    Derived,
}

pub(crate) struct Node {
    pub(crate) label: String,
    pub(crate) kind: NodeKind,
    pub(crate) ops: ValueOps,
    pub(crate) value: Option<Box<dyn Any>>,
    /// Value a signal returns to on reset.
    pub(crate) initial: Option<Box<dyn Any>>,
    pub(crate) compute: Option<ComputeFn>,
    pub(crate) sources: Vec<NodeId>,
    pub(crate) observers: Vec<NodeId>,
    pub(crate) dirty: bool,
    pub(crate) computing: bool,
    pub(crate) changed_at: u64,
    pub(crate) verified_at: u64,
    pub(crate) evaluations: u64,
}

impl Node {
    fn new(label: String, kind: NodeKind, ops: ValueOps) -> Self {
        Self {
            label,
            kind,
            ops,
            value: None,
            initial: None,
            compute: None,
            sources: Vec::new(),
            observers: Vec::new(),
            dirty: false,
            computing: false,
            changed_at: 0,
            verified_at: 0,
            evaluations: 0,
        }
    }
}

// ---------------------------------------------------------------------------
// Graph
// ---------------------------------------------------------------------------

/// The shared state behind a [`Runtime`].
#[derive(Default)]
pub(crate) struct Graph {
    allocator: NodeAllocator,
    slots: Vec<Option<Node>>,
    revision: u64,
    /// Tracking frames. `Some` collects reads for the derived being
    /// evaluated; `None` suppresses tracking.
    frames: Vec<Option<Vec<NodeId>>>,
    /// Number of derived computations currently on the stack.
    evaluating: usize,
    pub(crate) persist: PersistRegistry,
}

impl Graph {
    pub(crate) fn node(&self, id: NodeId) -> Result<&Node, ReactiveError> {
        if !self.allocator.is_alive(id) {
            return Err(ReactiveError::StaleHandle { id });
        }
        self.slots
            .get(id.index() as usize)
            .and_then(Option::as_ref)
            .ok_or(ReactiveError::StaleHandle { id })
    }

    pub(crate) fn node_mut(&mut self, id: NodeId) -> Result<&mut Node, ReactiveError> {
        if !self.allocator.is_alive(id) {
            return Err(ReactiveError::StaleHandle { id });
        }
        self.slots
            .get_mut(id.index() as usize)
            .and_then(Option::as_mut)
            .ok_or(ReactiveError::StaleHandle { id })
    }

    fn insert(&mut self, node: Node) -> NodeId {
        let id = self.allocator.allocate();
        let idx = id.index() as usize;
        if idx >= self.slots.len() {
            self.slots.resize_with(idx + 1, || None);
        }
        self.slots[idx] = Some(node);
        id
    }

    fn record_read(&mut self, id: NodeId) {
        if let Some(Some(frame)) = self.frames.last_mut() {
            if !frame.contains(&id) {
                frame.push(id);
            }
        }
    }

    fn mark_observers_dirty(&mut self, id: NodeId) {
        let mut stack: Vec<NodeId> = match self.node(id) {
            Ok(node) => node.observers.clone(),
            Err(_) => return,
        };
        while let Some(next) = stack.pop() {
            if let Ok(node) = self.node_mut(next) {
                if !node.dirty {
                    node.dirty = true;
                    stack.extend(node.observers.iter().copied());
                }
            }
        }
    }

    /// Replace the dependency edges of `id` with `sources`.
    fn rewire(&mut self, id: NodeId, sources: Vec<NodeId>) {
        let old = match self.node_mut(id) {
            Ok(node) => std::mem::take(&mut node.sources),
            Err(_) => return,
        };
        for source in old.iter().filter(|s| !sources.contains(s)) {
            if let Ok(node) = self.node_mut(*source) {
                node.observers.retain(|o| *o != id);
            }
        }
        for source in sources.iter().filter(|s| !old.contains(s)) {
            if let Ok(node) = self.node_mut(*source) {
                node.observers.push(id);
            }
        }
        if let Ok(node) = self.node_mut(id) {
            node.sources = sources;
        }
    }

    /// Store `value` into a signal. Returns `false` when it equals the
    /// current value and nothing changed.
    pub(crate) fn write(&mut self, id: NodeId, value: Box<dyn Any>) -> Result<bool, ReactiveError> {
        let evaluating = self.evaluating > 0;
        let next_revision = self.revision + 1;
        let node = self.node_mut(id)?;
        if evaluating {
            return Err(ReactiveError::WriteDuringEvaluation {
                label: node.label.clone(),
            });
        }
        let Some(current) = node.value.as_ref() else {
            return Err(ReactiveError::Uninitialized {
                label: node.label.clone(),
            });
        };
        if (node.ops.same)(current.as_ref(), value.as_ref()) {
            return Ok(false);
        }
        node.value = Some(value);
        node.changed_at = next_revision;
        self.revision = next_revision;
        self.mark_observers_dirty(id);
        Ok(true)
    }

    /// Write a signal's remembered initial value back into it.
    pub(crate) fn reset_node(&mut self, id: NodeId) -> Result<bool, ReactiveError> {
        let node = self.node(id)?;
        let initial = node
            .initial
            .as_ref()
            .and_then(|init| (node.ops.clone)(init.as_ref()))
            .ok_or_else(|| ReactiveError::Uninitialized {
                label: node.label.clone(),
            })?;
        self.write(id, initial)
    }
}

// ---------------------------------------------------------------------------
// Guards
// ---------------------------------------------------------------------------

/// Pops the tracking frame of an in-flight evaluation, also when the
/// computation unwinds.
struct EvalGuard<'a> {
    graph: &'a RefCell<Graph>,
    id: NodeId,
    armed: bool,
}

impl EvalGuard<'_> {
    fn finish(mut self) -> Vec<NodeId> {
        self.armed = false;
        let mut graph = self.graph.borrow_mut();
        graph.evaluating -= 1;
        if let Ok(node) = graph.node_mut(self.id) {
            node.computing = false;
        }
        graph.frames.pop().flatten().unwrap_or_default()
    }
}

impl Drop for EvalGuard<'_> {
    fn drop(&mut self) {
        if !self.armed {
            return;
        }
        let mut graph = self.graph.borrow_mut();
        graph.frames.pop();
        graph.evaluating -= 1;
        if let Ok(node) = graph.node_mut(self.id) {
            node.computing = false;
        }
    }
}

struct UntrackedGuard<'a> {
    graph: &'a RefCell<Graph>,
}

impl Drop for UntrackedGuard<'_> {
    fn drop(&mut self) {
        self.graph.borrow_mut().frames.pop();
    }
}

// ---------------------------------------------------------------------------
// Runtime
// ---------------------------------------------------------------------------

/// Explicit context owning every node of one game.
///
/// Cloning a `Runtime` clones the handle, not the graph.
#[derive(Clone, Default)]
pub struct Runtime {
    inner: Rc<RefCell<Graph>>,
}

impl Runtime {
    /// Create an empty runtime.
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn downgrade(&self) -> Weak<RefCell<Graph>> {
        Rc::downgrade(&self.inner)
    }

    pub(crate) fn upgrade(weak: &Weak<RefCell<Graph>>) -> Result<Runtime, ReactiveError> {
        weak.upgrade()
            .map(|inner| Runtime { inner })
            .ok_or(ReactiveError::RuntimeDropped)
    }

    pub(crate) fn graph(&self) -> &RefCell<Graph> {
        &self.inner
    }

    // -- node creation ------------------------------------------------------

    /// Create an initialized signal.
    pub fn signal<T>(&self, label: impl Into<String>, initial: T) -> Signal<T>
    where
        T: Clone + PartialEq + 'static,
    {
        let mut node = Node::new(label.into(), NodeKind::Signal, ValueOps::of::<T>());
        node.initial = Some(Box::new(initial.clone()));
        node.value = Some(Box::new(initial));
        let id = self.inner.borrow_mut().insert(node);
        Signal::from_parts(id, self.downgrade())
    }

    /// Create a signal shell that must be [`Signal::init`]ialized before it
    /// is read.
    pub fn declare_signal<T>(&self, label: impl Into<String>) -> Signal<T>
    where
        T: Clone + PartialEq + 'static,
    {
        let node = Node::new(label.into(), NodeKind::Signal, ValueOps::of::<T>());
        let id = self.inner.borrow_mut().insert(node);
        Signal::from_parts(id, self.downgrade())
    }

    /// Create a memoized derived value.
    pub fn derived<T, F>(&self, label: impl Into<String>, compute: F) -> Derived<T>
    where
        T: Clone + PartialEq + 'static,
        F: Fn() -> T + 'static,
    {
        let mut node = Node::new(label.into(), NodeKind::Derived, ValueOps::of::<T>());
        node.compute = Some(erase(compute));
        let id = self.inner.borrow_mut().insert(node);
        Derived::from_parts(id, self.downgrade())
    }

    /// Create a derived shell with a stable handle, to be
    /// [`Derived::define`]d later.
    pub fn declare_derived<T>(&self, label: impl Into<String>) -> Derived<T>
    where
        T: Clone + PartialEq + 'static,
    {
        let node = Node::new(label.into(), NodeKind::Derived, ValueOps::of::<T>());
        let id = self.inner.borrow_mut().insert(node);
        Derived::from_parts(id, self.downgrade())
    }

    /// Run `f` without registering any reads as dependencies of the derived
    /// currently being evaluated.
    pub fn untracked<R>(&self, f: impl FnOnce() -> R) -> R {
        self.inner.borrow_mut().frames.push(None);
        let _guard = UntrackedGuard { graph: &self.inner };
        f()
    }

    /// Remove a node that nothing depends on.
    ///
    /// Returns `false` (and keeps the node) when it is unknown, still has
    /// dependents, or backs a persistent field. Handles to a disposed node
    /// report [`ReactiveError::StaleHandle`].
    #[cfg(test)]
    pub(crate) fn dispose(&self, id: NodeId) -> bool {
        let mut graph = self.inner.borrow_mut();
        let sources = match graph.node(id) {
            Ok(node) if node.observers.is_empty() && !node.computing => node.sources.clone(),
            _ => return false,
        };
        if graph.persist.contains_node(id) {
            return false;
        }
        for source in sources {
            if let Ok(node) = graph.node_mut(source) {
                node.observers.retain(|o| *o != id);
            }
        }
        graph.slots[id.index() as usize] = None;
        graph.allocator.deallocate(id)
    }

    // -- diagnostics --------------------------------------------------------

    /// Number of live nodes.
    pub fn node_count(&self) -> usize {
        self.inner.borrow().allocator.alive_count()
    }

    /// The global write revision. Bumped once per effective signal write.
    pub fn revision(&self) -> u64 {
        self.inner.borrow().revision
    }

    /// Label of a live node.
    pub fn label(&self, id: NodeId) -> Option<String> {
        self.inner.borrow().node(id).ok().map(|n| n.label.clone())
    }

    /// Ids of the nodes `id` read during its last evaluation.
    pub fn sources(&self, id: NodeId) -> Vec<NodeId> {
        self.inner
            .borrow()
            .node(id)
            .map(|n| n.sources.clone())
            .unwrap_or_default()
    }

    /// `true` while a derived computation is running.
    pub fn is_evaluating(&self) -> bool {
        self.inner.borrow().evaluating > 0
    }

    // -- typed access used by the handles ------------------------------------

    pub(crate) fn read_signal<T: Clone + 'static>(&self, id: NodeId) -> Result<T, ReactiveError> {
        let mut graph = self.inner.borrow_mut();
        let value = {
            let node = graph.node(id)?;
            let Some(value) = node.value.as_ref() else {
                return Err(ReactiveError::Uninitialized {
                    label: node.label.clone(),
                });
            };
            value
                .downcast_ref::<T>()
                .cloned()
                .ok_or(ReactiveError::StaleHandle { id })?
        };
        graph.record_read(id);
        Ok(value)
    }

    pub(crate) fn read_derived<T: Clone + 'static>(&self, id: NodeId) -> Result<T, ReactiveError> {
        self.refresh(id)?;
        let mut graph = self.inner.borrow_mut();
        let value = {
            let node = graph.node(id)?;
            node.value
                .as_ref()
                .and_then(|v| v.downcast_ref::<T>())
                .cloned()
                .ok_or_else(|| ReactiveError::Undefined {
                    label: node.label.clone(),
                })?
        };
        graph.record_read(id);
        Ok(value)
    }

    pub(crate) fn init_signal(&self, id: NodeId, value: Box<dyn Any>) -> Result<(), ReactiveError> {
        let mut graph = self.inner.borrow_mut();
        let next_revision = graph.revision + 1;
        let node = graph.node_mut(id)?;
        if node.value.is_some() {
            return Err(ReactiveError::AlreadyDefined {
                label: node.label.clone(),
            });
        }
        node.initial = (node.ops.clone)(value.as_ref());
        node.value = Some(value);
        node.changed_at = next_revision;
        graph.revision = next_revision;
        Ok(())
    }

    pub(crate) fn define_derived(&self, id: NodeId, compute: ComputeFn) -> Result<(), ReactiveError> {
        let mut graph = self.inner.borrow_mut();
        let node = graph.node_mut(id)?;
        if node.compute.is_some() {
            return Err(ReactiveError::AlreadyDefined {
                label: node.label.clone(),
            });
        }
        node.compute = Some(compute);
        Ok(())
    }

    /// Run `f`, turning a [`ReactiveError`] raised by a nested `get` into an
    /// `Err`. Any other panic keeps unwinding.
    pub(crate) fn catching<R>(
        &self,
        f: impl FnOnce() -> Result<R, ReactiveError>,
    ) -> Result<R, ReactiveError> {
        match panic::catch_unwind(AssertUnwindSafe(f)) {
            Ok(result) => result,
            Err(payload) => match payload.downcast::<ReactiveError>() {
                Ok(err) => Err(*err),
                Err(other) => panic::resume_unwind(other),
            },
        }
    }

    /// Panic with `err`.
    ///
    /// Inside a derived computation the error itself is the payload so the
    /// outermost `try_get` can recover it; elsewhere the panic carries the
    /// error message.
    pub(crate) fn raise(&self, err: ReactiveError) -> ! {
        if self.is_evaluating() {
            panic::panic_any(err)
        }
        panic!("{err}")
    }

    // -- evaluation ---------------------------------------------------------

    /// Bring a derived node up to date.
    fn refresh(&self, id: NodeId) -> Result<(), ReactiveError> {
        let (has_value, verified_at, sources) = {
            let graph = self.inner.borrow();
            let node = graph.node(id)?;
            if node.compute.is_none() {
                return Err(ReactiveError::Undefined {
                    label: node.label.clone(),
                });
            }
            if node.computing {
                return Err(ReactiveError::Cycle {
                    label: node.label.clone(),
                });
            }
            if node.value.is_some() && !node.dirty {
                return Ok(());
            }
            (node.value.is_some(), node.verified_at, node.sources.clone())
        };

        if has_value && !self.any_source_changed(&sources, verified_at)? {
            let mut graph = self.inner.borrow_mut();
            let revision = graph.revision;
            let node = graph.node_mut(id)?;
            node.dirty = false;
            node.verified_at = revision;
            return Ok(());
        }
        self.recompute(id)
    }

    fn any_source_changed(&self, sources: &[NodeId], since: u64) -> Result<bool, ReactiveError> {
        for &source in sources {
            let kind = match self.inner.borrow().node(source) {
                Ok(node) => node.kind,
                Err(_) => return Ok(true),
            };
            if kind == NodeKind::Derived {
                self.refresh(source)?;
            }
            let changed_at = match self.inner.borrow().node(source) {
                Ok(node) => node.changed_at,
                Err(_) => return Ok(true),
            };
            if changed_at > since {
                return Ok(true);
            }
        }
        Ok(false)
    }

    fn recompute(&self, id: NodeId) -> Result<(), ReactiveError> {
        let compute = {
            let mut graph = self.inner.borrow_mut();
            let compute = {
                let node = graph.node_mut(id)?;
                let compute = node.compute.clone().ok_or_else(|| ReactiveError::Undefined {
                    label: node.label.clone(),
                })?;
                node.computing = true;
                compute
            };
            graph.frames.push(Some(Vec::new()));
            graph.evaluating += 1;
            compute
        };

        let guard = EvalGuard {
            graph: &self.inner,
            id,
            armed: true,
        };
        let value = compute();
        let sources = guard.finish();

        let mut graph = self.inner.borrow_mut();
        graph.rewire(id, sources);
        let revision = graph.revision;
        let node = graph.node_mut(id)?;
        let changed = match node.value.as_ref() {
            Some(old) => !(node.ops.same)(old.as_ref(), value.as_ref()),
            None => true,
        };
        if changed {
            node.value = Some(value);
            node.changed_at = revision;
        }
        node.dirty = false;
        node.verified_at = revision;
        node.evaluations += 1;
        tracing::trace!(node = %id, label = %node.label, changed, "derived recomputed");
        Ok(())
    }

    pub(crate) fn evaluations(&self, id: NodeId) -> u64 {
        self.inner
            .borrow()
            .node(id)
            .map(|n| n.evaluations)
            .unwrap_or(0)
    }

    pub(crate) fn has_value(&self, id: NodeId) -> bool {
        self.inner
            .borrow()
            .node(id)
            .map(|n| n.value.is_some())
            .unwrap_or(false)
    }

    pub(crate) fn has_compute(&self, id: NodeId) -> bool {
        self.inner
            .borrow()
            .node(id)
            .map(|n| n.compute.is_some())
            .unwrap_or(false)
    }
}

impl fmt::Debug for Runtime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.inner.try_borrow() {
            Ok(graph) => f
                .debug_struct("Runtime")
                .field("nodes", &graph.allocator.alive_count())
                .field("revision", &graph.revision)
                .finish(),
            Err(_) => f.write_str("Runtime { <borrowed> }"),
        }
    }
}

/// Box a typed computation into the erased form stored on a node.
pub(crate) fn erase<T, F>(compute: F) -> ComputeFn
where
    T: 'static,
    F: Fn() -> T + 'static,
{
    Rc::new(move || Box::new(compute()) as Box<dyn Any>)
}

/// Marker used by handles so they are neither `Send` nor `Sync` and do not
/// own a `T`.
pub(crate) type HandleMarker<T> = PhantomData<*const T>;

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
