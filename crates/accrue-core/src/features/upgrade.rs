//! One-time purchases.

use std::fmt;

use accrue_num::BigNum;
use accrue_reactive::prelude::*;

use crate::layer::Layer;
use crate::resource::Resource;
use crate::tree::Visibility;
use crate::BuildError;

/// Construction options for an [`Upgrade`].
pub struct UpgradeOptions {
    pub cost: Computable<BigNum>,
    pub resource: Resource,
    pub visibility: Computable<Visibility>,
}

impl UpgradeOptions {
    /// Always visible.
    pub fn new(cost: impl Into<Computable<BigNum>>, resource: Resource) -> Self {
        Self {
            cost: cost.into(),
            resource,
            visibility: Computable::constant(Visibility::Visible),
        }
    }

    pub fn visibility(mut self, visibility: impl Into<Computable<Visibility>>) -> Self {
        self.visibility = visibility.into();
        self
    }
}

/// A purchase that can be made once; `bought` is persisted at
/// `upgrades.{id}.bought`.
#[derive(Clone)]
pub struct Upgrade {
    id: String,
    bought: Signal<bool>,
    cost: Derived<BigNum>,
    resource: Resource,
    visibility: Derived<Visibility>,
    can_purchase: Derived<bool>,
}

impl Upgrade {
    pub fn new(layer: &Layer, id: &str, options: UpgradeOptions) -> Result<Self, BuildError> {
        let bought = layer.persistent(&format!("upgrades.{id}.bought"), false)?;
        let cost = layer.resolve(&format!("upgrades.{id}.cost"), options.cost);
        let visibility = layer.resolve(&format!("upgrades.{id}.visibility"), options.visibility);
        let resource = options.resource;

        let can_purchase = {
            let bought = bought.clone();
            let cost = cost.clone();
            let resource = resource.clone();
            let visibility = visibility.clone();
            layer.derived(&format!("upgrades.{id}.can_purchase"), move || {
                visibility.get() == Visibility::Visible
                    && !bought.get()
                    && resource.value() >= cost.get()
            })
        };

        Ok(Self {
            id: format!("{}.{id}", layer.id()),
            bought,
            cost,
            resource,
            visibility,
            can_purchase,
        })
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn bought(&self) -> bool {
        self.bought.get()
    }

    /// The persisted flag, for reading inside deriveds of other layers.
    pub fn bought_signal(&self) -> &Signal<bool> {
        &self.bought
    }

    pub fn cost(&self) -> BigNum {
        self.cost.get()
    }

    pub fn visibility(&self) -> Visibility {
        self.visibility.get()
    }

    pub fn can_purchase(&self) -> bool {
        self.can_purchase.get()
    }

    /// Spend the cost and mark the upgrade bought.
    pub fn purchase(&self) -> bool {
        if !self.can_purchase() {
            return false;
        }
        let cost = self.cost();
        self.resource.sub(cost);
        self.bought.set(true);
        tracing::debug!(upgrade = %self.id, cost = %cost, "upgrade purchased");
        true
    }
}

impl fmt::Debug for Upgrade {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Upgrade")
            .field("id", &self.id)
            .field("bought", &self.bought.get_untracked())
            .finish()
    }
}
