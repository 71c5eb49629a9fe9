//! Challenges: opt-in runs under a handicap, completed by reaching a goal.
//!
//! Starting a challenge resets its target layers first; leaving it completes
//! it when the goal is met, then resets again. Completion counts are capped by
//! `completion_limit`.

use std::fmt;

use accrue_num::BigNum;
use accrue_reactive::prelude::*;

use crate::features::reset::Reset;
use crate::layer::Layer;
use crate::resource::Resource;
use crate::tree::Visibility;
use crate::BuildError;

/// Construction options for a [`Challenge`].
///
/// Completion is decided by `can_complete` when set, otherwise by
/// `resource >= goal`.
pub struct ChallengeOptions {
    pub goal: Option<Computable<BigNum>>,
    pub resource: Option<Resource>,
    pub can_complete: Option<Computable<bool>>,
    /// Defaults to 1.
    pub completion_limit: Computable<BigNum>,
    /// Defaults to `true`.
    pub can_start: Computable<bool>,
    /// Runs on both entering and leaving the challenge.
    pub reset: Option<Reset>,
    pub visibility: Computable<Visibility>,
}

impl Default for ChallengeOptions {
    fn default() -> Self {
        Self {
            goal: None,
            resource: None,
            can_complete: None,
            completion_limit: Computable::constant(BigNum::ONE),
            can_start: Computable::constant(true),
            reset: None,
            visibility: Computable::constant(Visibility::Visible),
        }
    }
}

impl ChallengeOptions {
    pub fn new(goal: impl Into<Computable<BigNum>>, resource: Resource) -> Self {
        Self {
            goal: Some(goal.into()),
            resource: Some(resource),
            ..Default::default()
        }
    }

    pub fn completion_limit(mut self, limit: impl Into<Computable<BigNum>>) -> Self {
        self.completion_limit = limit.into();
        self
    }

    pub fn can_start(mut self, can_start: impl Into<Computable<bool>>) -> Self {
        self.can_start = can_start.into();
        self
    }

    pub fn reset(mut self, reset: Reset) -> Self {
        self.reset = Some(reset);
        self
    }

    pub fn visibility(mut self, visibility: impl Into<Computable<Visibility>>) -> Self {
        self.visibility = visibility.into();
        self
    }
}

/// A challenge with persisted `challenges.{id}.active` and
/// `challenges.{id}.completions`.
#[derive(Clone)]
pub struct Challenge {
    id: String,
    active: Signal<bool>,
    completions: Signal<BigNum>,
    completion_limit: Derived<BigNum>,
    can_start: Derived<bool>,
    can_complete: Derived<bool>,
    maxed: Derived<bool>,
    visibility: Derived<Visibility>,
    reset: Option<Reset>,
}

impl Challenge {
    /// # Errors
    ///
    /// [`BuildError::MissingGoal`] without a goal and resource or a custom
    /// `can_complete`.
    pub fn new(layer: &Layer, id: &str, options: ChallengeOptions) -> Result<Self, BuildError> {
        let label = format!("{}.{id}", layer.id());
        let can_complete = match (options.can_complete, options.goal, options.resource) {
            (Some(custom), _, _) => {
                layer.resolve(&format!("challenges.{id}.can_complete"), custom)
            }
            (None, Some(goal), Some(resource)) => {
                let goal = layer.resolve(&format!("challenges.{id}.goal"), goal);
                layer.derived(&format!("challenges.{id}.can_complete"), move || {
                    resource.value() >= goal.get()
                })
            }
            _ => return Err(BuildError::MissingGoal { label }),
        };

        let active = layer.persistent(&format!("challenges.{id}.active"), false)?;
        let completions = layer.persistent(&format!("challenges.{id}.completions"), BigNum::ZERO)?;
        let completion_limit =
            layer.resolve(&format!("challenges.{id}.limit"), options.completion_limit);
        let maxed = {
            let completions = completions.clone();
            let limit = completion_limit.clone();
            layer.derived(&format!("challenges.{id}.maxed"), move || {
                completions.get() >= limit.get()
            })
        };

        Ok(Self {
            id: label,
            active,
            completions,
            completion_limit,
            can_start: layer.resolve(&format!("challenges.{id}.can_start"), options.can_start),
            can_complete,
            maxed,
            visibility: layer.resolve(&format!("challenges.{id}.visibility"), options.visibility),
            reset: options.reset,
        })
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn active(&self) -> bool {
        self.active.get()
    }

    /// The persisted flag, for handicaps read inside other deriveds.
    pub fn active_signal(&self) -> &Signal<bool> {
        &self.active
    }

    pub fn completions(&self) -> BigNum {
        self.completions.get()
    }

    pub fn completion_limit(&self) -> BigNum {
        self.completion_limit.get()
    }

    pub fn can_complete(&self) -> bool {
        self.can_complete.get()
    }

    pub fn maxed(&self) -> bool {
        self.maxed.get()
    }

    pub fn visibility(&self) -> Visibility {
        self.visibility.get()
    }

    /// Whether [`Challenge::toggle`] would start the challenge.
    pub fn can_start(&self) -> bool {
        !self.active.get()
            && self.visibility.get().is_shown()
            && !self.maxed.get()
            && self.can_start.get()
    }

    /// Leave the challenge if active, completing it when possible; otherwise
    /// start it if allowed.
    ///
    /// Returns whether the state changed.
    pub fn toggle(&self) -> bool {
        if self.active.get_untracked() {
            let completed = self.complete_if_possible();
            self.active.set(false);
            self.run_reset();
            tracing::debug!(challenge = %self.id, completed, "challenge left");
            true
        } else if self.can_start() {
            self.run_reset();
            self.active.set(true);
            tracing::debug!(challenge = %self.id, "challenge started");
            true
        } else {
            false
        }
    }

    /// Add a completion when active, not maxed and the goal is met.
    ///
    /// The challenge stays active.
    pub fn complete_if_possible(&self) -> bool {
        if !self.active.get_untracked() || self.maxed.get() || !self.can_complete.get() {
            return false;
        }
        let completions = self.completions.get_untracked() + 1.0;
        let limit = self.completion_limit.get();
        self.completions.set(completions.min(limit));
        tracing::info!(challenge = %self.id, completions = %completions, "challenge completed");
        true
    }

    fn run_reset(&self) {
        if let Some(reset) = &self.reset {
            reset.reset();
        }
    }
}

impl fmt::Debug for Challenge {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Challenge")
            .field("id", &self.id)
            .field("active", &self.active.get_untracked())
            .field("completions", &self.completions.get_untracked())
            .finish()
    }
}
