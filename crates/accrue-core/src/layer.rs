//! Layers: named owners of persistent state.
//!
//! A [`Layer`] is a cheap handle (id, display name, runtime) returned by
//! [`Game::declare_layer`](crate::game::Game::declare_layer). Declaring every
//! layer before building any layer body gives each body stable handles to
//! read from, including layers declared later.
//!
//! Every field created through a layer is registered as persistent under the
//! layer id, so [`Layer::reset`] and save snapshots see it.

use std::fmt;

use accrue_num::BigNum;
use accrue_reactive::prelude::*;
use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::resource::Resource;
use crate::BuildError;

/// Handle to one game section.
#[derive(Clone)]
pub struct Layer {
    id: String,
    name: String,
    rt: Runtime,
}

impl Layer {
    pub(crate) fn new(rt: Runtime, id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            rt,
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn runtime(&self) -> &Runtime {
        &self.rt
    }

    /// A persistent signal at `path` under this layer.
    ///
    /// # Errors
    ///
    /// Fails when `path` is already registered for this layer.
    pub fn persistent<T>(&self, path: &str, initial: T) -> Result<Signal<T>, BuildError>
    where
        T: Clone + PartialEq + Serialize + DeserializeOwned + 'static,
    {
        Ok(self.rt.persistent(&self.id, path, initial)?)
    }

    /// A writable resource persisted at `path`.
    pub fn resource(
        &self,
        path: &str,
        display_name: impl Into<String>,
        initial: impl Into<BigNum>,
    ) -> Result<Resource, BuildError> {
        let value = self.persistent(path, initial.into())?;
        Ok(Resource::new(value, display_name))
    }

    /// Like [`Layer::resource`], with best and total trackers persisted at
    /// `{path}.best` and `{path}.total`.
    pub fn tracked_resource(
        &self,
        path: &str,
        display_name: impl Into<String>,
        initial: impl Into<BigNum>,
    ) -> Result<Resource, BuildError> {
        let initial = initial.into();
        let best = self.persistent(&format!("{path}.best"), initial)?;
        let total = self.persistent(&format!("{path}.total"), initial)?;
        Ok(self
            .resource(path, display_name, initial)?
            .with_best(best)
            .with_total(total))
    }

    /// A derived labelled `{layer}.{label}`.
    pub fn derived<T, F>(&self, label: &str, compute: F) -> Derived<T>
    where
        T: Clone + PartialEq + 'static,
        F: Fn() -> T + 'static,
    {
        self.rt.derived(format!("{}.{label}", self.id), compute)
    }

    /// Resolve a [`Computable`] under a `{layer}.{label}` label.
    pub fn resolve<T>(&self, label: &str, computable: Computable<T>) -> Derived<T>
    where
        T: Clone + PartialEq + 'static,
    {
        self.rt.resolve(format!("{}.{label}", self.id), computable)
    }

    /// Restore every persistent field of this layer to its initial value.
    ///
    /// Returns how many fields changed.
    pub fn reset(&self) -> Result<usize, ReactiveError> {
        self.rt.reset_owner(&self.id)
    }

    /// Paths of the persistent fields registered so far.
    pub fn persistent_paths(&self) -> Vec<String> {
        self.rt.persistent_paths(&self.id)
    }
}

impl fmt::Debug for Layer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Layer")
            .field("id", &self.id)
            .field("name", &self.name)
            .finish()
    }
}
