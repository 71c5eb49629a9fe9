//! Accrue Core -- the game-side building blocks of an incremental game.
//!
//! Everything here is composed from the reactive primitives in
//! [`accrue_reactive`] and the [`BigNum`](accrue_num::BigNum) type:
//!
//! - [`Resource`](resource::Resource): a named amount with optional best and
//!   total trackers.
//! - [`Conversion`](conversion::Conversion): spending one resource to gain
//!   another along a [`Scaling`](scaling::Scaling) curve.
//! - [`SequentialModifier`](modifier::SequentialModifier): an ordered,
//!   toggleable and invertible chain of adjustments.
//! - [`Tree`](tree::Tree): the unlock tree and its reset propagation.
//! - [`features`]: upgrades, buyables, milestones, challenges, clickables,
//!   resets and reset buttons.
//! - [`Game`](game::Game): the layer registry and the tick driver, with
//!   BLAKE3-hashed save snapshots.
//!
//! # Quick Start
//!
//! ```
//! use accrue_core::prelude::*;
//!
//! let mut game = Game::new(GameConfig::default());
//! let main = game.declare_layer("main", "Tree").unwrap();
//! let prestige = game.declare_layer("p", "Prestige").unwrap();
//!
//! let points = main.resource("points", "points", 10).unwrap();
//! let prestige_points = prestige.resource("points", "prestige points", 0).unwrap();
//!
//! // cost(n) = 10 * n^2
//! let scaling = Polynomial::new(game.runtime(), 10, 0.5);
//! let conversion = Conversion::new(
//!     game.runtime(),
//!     "p.conversion",
//!     ConversionOptions::new(points.clone(), prestige_points.clone(), scaling),
//! )
//! .unwrap();
//!
//! {
//!     let points = points.clone();
//!     game.add_tick_handler("points", move |dt| points.add(BigNum::from(dt)));
//! }
//! game.update(90.0).unwrap();
//! assert_eq!(points.value(), BigNum::from(100));
//!
//! assert_eq!(conversion.current_gain(), BigNum::from(3));
//! assert_eq!(conversion.purchase(), BigNum::from(3));
//! assert_eq!(prestige_points.value(), BigNum::from(3));
//! assert_eq!(points.value(), BigNum::from(10));
//! ```

#![deny(unsafe_code)]

pub mod conversion;
pub mod features;
pub mod game;
pub mod layer;
pub mod modifier;
pub mod resource;
pub mod scaling;
pub mod snapshot;
pub mod tree;

/// Re-export the number crate for convenience.
pub use accrue_num;

/// Re-export the reactive crate for convenience.
pub use accrue_reactive;

use accrue_reactive::ReactiveError;

// ---------------------------------------------------------------------------
// Error types
// ---------------------------------------------------------------------------

/// Configuration errors detected while a layer is being built.
///
/// These are programmer errors: the host is expected to abort startup.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum BuildError {
    /// Two layers were declared with the same id.
    #[error("duplicate layer id: {id:?}")]
    DuplicateLayer { id: String },

    /// A conversion would spend from a resource that cannot be written.
    #[error("conversion '{label}' spends from read-only base resource '{base}'")]
    ReadOnlyBase { label: String, base: String },

    /// A buyable has no way to decide whether it can be purchased.
    #[error("'{label}' has neither a cost nor a can_purchase condition")]
    MissingCost { label: String },

    /// A challenge has no way to decide whether it can be completed.
    #[error("challenge '{label}' has neither a goal nor a can_complete condition")]
    MissingGoal { label: String },

    /// A tree branch names a node that is not part of the tree.
    #[error("tree branch references unknown node '{node}'")]
    UnknownTreeNode { node: String },

    /// A tree node was placed twice.
    #[error("tree node '{node}' appears more than once")]
    DuplicateTreeNode { node: String },

    /// Registering a persistent field failed.
    #[error(transparent)]
    Reactive(#[from] ReactiveError),
}

/// Errors returned by the tick driver and save handling.
#[derive(Debug, thiserror::Error)]
pub enum GameError {
    /// `update` was called with a negative or non-finite delta.
    #[error("invalid tick delta {delta}: must be finite and non-negative")]
    InvalidDelta { delta: f64 },

    /// A save snapshot does not match its recorded hash.
    #[error(
        "snapshot hash mismatch: recorded {recorded} but recomputed {recomputed}. \
         The save may be corrupted or tampered with."
    )]
    HashMismatch {
        recorded: String,
        recomputed: String,
    },

    /// A save could not be (de)serialized.
    #[error("save JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// The graph rejected the snapshot contents.
    #[error(transparent)]
    Reactive(#[from] ReactiveError),
}

// ---------------------------------------------------------------------------
// Prelude
// ---------------------------------------------------------------------------

/// Convenience re-exports for building layers.
pub mod prelude {
    pub use accrue_num::BigNum;
    pub use accrue_reactive::prelude::*;

    pub use crate::conversion::{Conversion, ConversionKind, ConversionOptions, Spend};
    pub use crate::features::buyable::{Buyable, BuyableOptions, CostFn};
    pub use crate::features::challenge::{Challenge, ChallengeOptions};
    pub use crate::features::clickable::{Clickable, ClickableOptions};
    pub use crate::features::milestone::{Milestone, MilestoneOptions};
    pub use crate::features::multi_buyable::{CostSet, MultiBuyable, MultiBuyableOptions};
    pub use crate::features::reset::{Reset, ResetButton, ResetOptions};
    pub use crate::features::upgrade::{Upgrade, UpgradeOptions};
    pub use crate::game::{Game, GameConfig, TickDiagnostics, TickReport};
    pub use crate::layer::Layer;
    pub use crate::modifier::{Modifier, ModifierKind, ModifierLine, SequentialModifier};
    pub use crate::resource::Resource;
    pub use crate::scaling::{Exponential, Polynomial, Scaling, Softcapped, Table};
    pub use crate::snapshot::SaveSnapshot;
    pub use crate::tree::{
        Branch, ResetPropagation, Tree, TreeNode, TreeNodeOptions, TreeOptions, Visibility,
    };
    pub use crate::{BuildError, GameError};
}
