//! Accrue Reactive -- a memoized signal/derived value graph.
//!
//! Every resource amount, upgrade effect and unlock condition in an
//! incremental game is either a mutable [`Signal`] or a pure [`Derived`]
//! computation over other nodes. Reads inside a derived computation register
//! dependency edges automatically; writes mark the transitive dependents
//! dirty, and dirty deriveds re-validate their sources before deciding to
//! re-run (push-dirty, pull-verify).
//!
//! All state lives in an explicit [`Runtime`]; handles are cheap to clone and
//! hold only a weak reference back to it. The runtime is single-threaded
//! (`!Send`).
//!
//! # Quick Start
//!
//! ```
//! use accrue_reactive::prelude::*;
//!
//! let rt = Runtime::new();
//! let points = rt.signal("points", 10.0_f64);
//! let doubled = {
//!     let points = points.clone();
//!     rt.derived("doubled", move || points.get() * 2.0)
//! };
//!
//! assert_eq!(doubled.get(), 20.0);
//! points.set(21.0);
//! assert_eq!(doubled.get(), 42.0);
//! assert_eq!(doubled.evaluations(), 2);
//! ```
//!
//! # Persistent fields
//!
//! Signals created with [`Runtime::persistent`] are registered under an
//! owner (a layer id) and a field path. They can be reset per owner and
//! captured into a serializable [`GraphSnapshot`].
//!
//! ```
//! use accrue_reactive::prelude::*;
//!
//! let rt = Runtime::new();
//! let level = rt.persistent("flame", "level", 0_u32).unwrap();
//! level.set(4);
//!
//! let snapshot = rt.capture_snapshot();
//! rt.reset_owner("flame").unwrap();
//! assert_eq!(level.get(), 0);
//!
//! rt.restore_snapshot(&snapshot).unwrap();
//! assert_eq!(level.get(), 4);
//! ```

#![deny(unsafe_code)]

pub mod computable;
pub mod derived;
pub mod node;
pub mod persist;
pub mod runtime;
pub mod signal;

// ---------------------------------------------------------------------------
// Error types
// ---------------------------------------------------------------------------

/// Errors produced by graph operations.
///
/// `try_get` style accessors return these; the panicking accessors (`get`,
/// `set`) panic with their message.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ReactiveError {
    /// A derived read itself, directly or transitively.
    #[error("cycle detected while evaluating derived '{label}'")]
    Cycle {
        label: String,
    },

    /// A declared signal was read before `init`.
    #[error("signal '{label}' was read before it was initialized")]
    Uninitialized {
        label: String,
    },

    /// A declared derived was read before `define`.
    #[error("derived '{label}' was read before it was defined")]
    Undefined {
        label: String,
    },

    /// `init` or `define` was called on a node that already has a value or
    /// a computation.
    #[error("node '{label}' is already defined")]
    AlreadyDefined {
        label: String,
    },

    /// A signal was written while a derived computation was running.
    #[error("signal '{label}' was written during a derived evaluation")]
    WriteDuringEvaluation {
        label: String,
    },

    /// The handle refers to a node that has been disposed.
    #[error("node {id} does not exist (disposed or stale)")]
    StaleHandle {
        id: node::NodeId,
    },

    /// The handle outlived its runtime.
    #[error("the runtime owning this node has been dropped")]
    RuntimeDropped,

    /// Two persistent fields were registered under the same key.
    #[error("persistent field '{owner}.{path}' is already registered")]
    DuplicateField {
        owner: String,
        path: String,
    },

    /// A snapshot referenced a field that is not registered.
    #[error("persistent field '{owner}.{path}' is not registered")]
    UnknownField {
        owner: String,
        path: String,
    },

    /// A snapshot value failed to deserialize into its field's type.
    #[error("failed to deserialize persistent field '{owner}.{path}': {details}")]
    Deserialize {
        owner: String,
        path: String,
        details: String,
    },
}

// ---------------------------------------------------------------------------
// Prelude
// ---------------------------------------------------------------------------

/// Convenience re-exports for common usage.
pub mod prelude {
    pub use crate::computable::Computable;
    pub use crate::derived::Derived;
    pub use crate::node::NodeId;
    pub use crate::persist::GraphSnapshot;
    pub use crate::runtime::Runtime;
    pub use crate::signal::Signal;
    pub use crate::ReactiveError;
}
