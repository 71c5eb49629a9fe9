//! Purchasable and earnable game features.
//!
//! Each feature is a small state machine over persistent signals created
//! through its [`Layer`](crate::layer::Layer), plus deriveds for its costs and
//! conditions. Actions (`purchase`, `toggle`, `click`) are guarded by the
//! matching condition and report `false` when they had no effect.

pub mod buyable;
pub mod challenge;
pub mod clickable;
pub mod milestone;
pub mod multi_buyable;
pub mod reset;
pub mod upgrade;
