//! Repeatable purchases paid in several resources at once.

use std::fmt;
use std::rc::Rc;

use accrue_num::BigNum;
use accrue_reactive::prelude::*;

use crate::features::buyable::CostFn;
use crate::layer::Layer;
use crate::resource::Resource;
use crate::tree::Visibility;
use crate::BuildError;

/// One cost component: `cost(amount)` paid in `resource`.
#[derive(Clone)]
pub struct CostSet {
    pub cost: CostFn,
    pub resource: Resource,
}

impl CostSet {
    pub fn new(resource: Resource, cost: impl Fn(BigNum) -> BigNum + 'static) -> Self {
        Self {
            cost: Rc::new(cost),
            resource,
        }
    }
}

impl fmt::Debug for CostSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CostSet")
            .field("resource", &self.resource.name())
            .finish_non_exhaustive()
    }
}

/// Construction options for a [`MultiBuyable`].
pub struct MultiBuyableOptions {
    pub cost_sets: Vec<CostSet>,
    /// Replaces the affordability check when set.
    pub can_purchase: Option<Computable<bool>>,
    /// Defaults to infinity.
    pub purchase_limit: Computable<BigNum>,
    /// Purchases leave the resources untouched.
    pub keep_resources: bool,
    pub visibility: Computable<Visibility>,
}

impl Default for MultiBuyableOptions {
    fn default() -> Self {
        Self {
            cost_sets: Vec::new(),
            can_purchase: None,
            purchase_limit: Computable::constant(BigNum::INFINITY),
            keep_resources: false,
            visibility: Computable::constant(Visibility::Visible),
        }
    }
}

impl MultiBuyableOptions {
    pub fn new(cost_sets: Vec<CostSet>) -> Self {
        Self {
            cost_sets,
            ..Default::default()
        }
    }

    pub fn purchase_limit(mut self, limit: impl Into<Computable<BigNum>>) -> Self {
        self.purchase_limit = limit.into();
        self
    }

    pub fn keep_resources(mut self, keep: bool) -> Self {
        self.keep_resources = keep;
        self
    }

    pub fn visibility(mut self, visibility: impl Into<Computable<Visibility>>) -> Self {
        self.visibility = visibility.into();
        self
    }
}

/// A buyable whose every purchase costs each of its [`CostSet`]s.
#[derive(Clone)]
pub struct MultiBuyable {
    id: String,
    amount: Signal<BigNum>,
    costs: Vec<(Derived<BigNum>, Resource)>,
    keep_resources: bool,
    maxed: Derived<bool>,
    can_afford: Derived<bool>,
    can_purchase: Derived<bool>,
}

impl MultiBuyable {
    /// # Errors
    ///
    /// [`BuildError::MissingCost`] with no cost sets and no custom
    /// `can_purchase`.
    pub fn new(layer: &Layer, id: &str, options: MultiBuyableOptions) -> Result<Self, BuildError> {
        let label = format!("{}.{id}", layer.id());
        if options.cost_sets.is_empty() && options.can_purchase.is_none() {
            return Err(BuildError::MissingCost { label });
        }

        let amount = layer.persistent(&format!("buyables.{id}.amount"), BigNum::ZERO)?;
        let costs: Vec<(Derived<BigNum>, Resource)> = options
            .cost_sets
            .into_iter()
            .enumerate()
            .map(|(i, set)| {
                let amount = amount.clone();
                let cost = set.cost;
                let derived =
                    layer.derived(&format!("buyables.{id}.cost.{i}"), move || cost(amount.get()));
                (derived, set.resource)
            })
            .collect();

        let purchase_limit = layer.resolve(&format!("buyables.{id}.limit"), options.purchase_limit);
        let visibility = layer.resolve(&format!("buyables.{id}.visibility"), options.visibility);

        let maxed = {
            let amount = amount.clone();
            layer.derived(&format!("buyables.{id}.maxed"), move || {
                amount.get() >= purchase_limit.get()
            })
        };
        let can_afford = {
            let costs = costs.clone();
            layer.derived(&format!("buyables.{id}.can_afford"), move || {
                costs
                    .iter()
                    .all(|(cost, resource)| resource.value() >= cost.get())
            })
        };
        let can_purchase = {
            let custom = options
                .can_purchase
                .map(|c| layer.resolve(&format!("buyables.{id}.custom_can_purchase"), c));
            let maxed = maxed.clone();
            let can_afford = can_afford.clone();
            layer.derived(&format!("buyables.{id}.can_purchase"), move || {
                let allowed = custom.as_ref().map_or_else(|| can_afford.get(), Derived::get);
                visibility.get().is_shown() && !maxed.get() && allowed
            })
        };

        Ok(Self {
            id: label,
            amount,
            costs,
            keep_resources: options.keep_resources,
            maxed,
            can_afford,
            can_purchase,
        })
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn amount(&self) -> BigNum {
        self.amount.get()
    }

    /// Current cost per resource, in cost-set order.
    pub fn costs(&self) -> Vec<(String, BigNum)> {
        self.costs
            .iter()
            .map(|(cost, resource)| (resource.name().to_string(), cost.get()))
            .collect()
    }

    pub fn maxed(&self) -> bool {
        self.maxed.get()
    }

    pub fn can_afford(&self) -> bool {
        self.can_afford.get()
    }

    pub fn can_purchase(&self) -> bool {
        self.can_purchase.get()
    }

    pub fn purchase(&self) -> bool {
        if !self.can_purchase() {
            return false;
        }
        if !self.keep_resources {
            // Read every cost before spending; a cost may depend on a resource.
            let due: Vec<BigNum> = self.costs.iter().map(|(cost, _)| cost.get()).collect();
            for ((_, resource), amount) in self.costs.iter().zip(due) {
                resource.sub(amount);
            }
        }
        self.amount.set(self.amount.get_untracked() + 1.0);
        tracing::debug!(
            buyable = %self.id,
            amount = %self.amount.get_untracked(),
            kept = self.keep_resources,
            "multi-cost buyable purchased"
        );
        true
    }
}

impl fmt::Debug for MultiBuyable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MultiBuyable")
            .field("id", &self.id)
            .field("amount", &self.amount.get_untracked())
            .field("cost_sets", &self.costs.len())
            .finish()
    }
}
