//! Milestones: one-way flags earned when a requirement first holds.

use std::fmt;
use std::rc::Rc;

use accrue_reactive::prelude::*;

use crate::layer::Layer;
use crate::tree::Visibility;
use crate::BuildError;

/// Construction options for a [`Milestone`].
pub struct MilestoneOptions {
    pub requirement: Computable<bool>,
    pub visibility: Computable<Visibility>,
    /// Runs once, when the milestone is earned.
    pub on_complete: Option<Rc<dyn Fn()>>,
}

impl MilestoneOptions {
    pub fn new(requirement: impl Into<Computable<bool>>) -> Self {
        Self {
            requirement: requirement.into(),
            visibility: Computable::constant(Visibility::Visible),
            on_complete: None,
        }
    }

    pub fn visibility(mut self, visibility: impl Into<Computable<Visibility>>) -> Self {
        self.visibility = visibility.into();
        self
    }

    pub fn on_complete(mut self, hook: impl Fn() + 'static) -> Self {
        self.on_complete = Some(Rc::new(hook));
        self
    }
}

/// Earned at most once; the flag only clears through a layer reset.
///
/// The game evaluates registered milestones after every sub-tick; see
/// [`Game::add_milestone`](crate::game::Game::add_milestone).
#[derive(Clone)]
pub struct Milestone {
    id: String,
    earned: Signal<bool>,
    requirement: Derived<bool>,
    visibility: Derived<Visibility>,
    on_complete: Option<Rc<dyn Fn()>>,
}

impl Milestone {
    pub fn new(layer: &Layer, id: &str, options: MilestoneOptions) -> Result<Self, BuildError> {
        let earned = layer.persistent(&format!("milestones.{id}.earned"), false)?;
        Ok(Self {
            id: format!("{}.{id}", layer.id()),
            earned,
            requirement: layer.resolve(&format!("milestones.{id}.requirement"), options.requirement),
            visibility: layer.resolve(&format!("milestones.{id}.visibility"), options.visibility),
            on_complete: options.on_complete,
        })
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn earned(&self) -> bool {
        self.earned.get()
    }

    pub fn earned_signal(&self) -> &Signal<bool> {
        &self.earned
    }

    pub fn requirement_met(&self) -> bool {
        self.requirement.get()
    }

    pub fn visibility(&self) -> Visibility {
        self.visibility.get()
    }

    /// Earn the milestone if it is shown and its requirement holds.
    ///
    /// Returns `true` only on the call that earned it.
    pub fn update(&self) -> bool {
        if self.earned.get_untracked() {
            return false;
        }
        if !self.visibility.get().is_shown() || !self.requirement.get() {
            return false;
        }
        self.earned.set(true);
        tracing::info!(milestone = %self.id, "milestone earned");
        if let Some(hook) = &self.on_complete {
            hook();
        }
        true
    }
}

impl fmt::Debug for Milestone {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Milestone")
            .field("id", &self.id)
            .field("earned", &self.earned.get_untracked())
            .finish()
    }
}
