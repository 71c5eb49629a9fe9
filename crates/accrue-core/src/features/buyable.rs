//! Repeatable purchases with an amount-dependent cost.

use std::fmt;
use std::rc::Rc;

use accrue_num::BigNum;
use accrue_reactive::prelude::*;

use crate::layer::Layer;
use crate::resource::Resource;
use crate::tree::Visibility;
use crate::BuildError;

/// Cost of the next purchase as a function of the amount already bought.
///
/// Runs inside a derived computation, so reactive reads in it are tracked.
pub type CostFn = Rc<dyn Fn(BigNum) -> BigNum>;

/// Construction options for a [`Buyable`].
///
/// A buyable needs either `cost` together with `resource`, or a custom
/// `can_purchase` condition.
pub struct BuyableOptions {
    pub cost: Option<CostFn>,
    pub resource: Option<Resource>,
    /// Replaces the affordability check when set.
    pub can_purchase: Option<Computable<bool>>,
    /// Defaults to infinity.
    pub purchase_limit: Computable<BigNum>,
    pub visibility: Computable<Visibility>,
}

impl Default for BuyableOptions {
    fn default() -> Self {
        Self {
            cost: None,
            resource: None,
            can_purchase: None,
            purchase_limit: Computable::constant(BigNum::INFINITY),
            visibility: Computable::constant(Visibility::Visible),
        }
    }
}

impl BuyableOptions {
    pub fn new(resource: Resource, cost: impl Fn(BigNum) -> BigNum + 'static) -> Self {
        Self {
            cost: Some(Rc::new(cost)),
            resource: Some(resource),
            ..Default::default()
        }
    }

    pub fn purchase_limit(mut self, limit: impl Into<Computable<BigNum>>) -> Self {
        self.purchase_limit = limit.into();
        self
    }

    pub fn visibility(mut self, visibility: impl Into<Computable<Visibility>>) -> Self {
        self.visibility = visibility.into();
        self
    }
}

/// A purchase that can be repeated up to a limit; `amount` is persisted at
/// `buyables.{id}.amount`.
#[derive(Clone)]
pub struct Buyable {
    id: String,
    amount: Signal<BigNum>,
    cost: Option<Derived<BigNum>>,
    resource: Option<Resource>,
    purchase_limit: Derived<BigNum>,
    visibility: Derived<Visibility>,
    maxed: Derived<bool>,
    can_afford: Derived<bool>,
    can_purchase: Derived<bool>,
}

impl Buyable {
    /// # Errors
    ///
    /// [`BuildError::MissingCost`] without a cost and resource or a custom
    /// `can_purchase`.
    pub fn new(layer: &Layer, id: &str, options: BuyableOptions) -> Result<Self, BuildError> {
        let label = format!("{}.{id}", layer.id());
        let has_cost = options.cost.is_some() && options.resource.is_some();
        if !has_cost && options.can_purchase.is_none() {
            return Err(BuildError::MissingCost { label });
        }

        let amount = layer.persistent(&format!("buyables.{id}.amount"), BigNum::ZERO)?;
        let cost = options.cost.map(|cost| {
            let amount = amount.clone();
            layer.derived(&format!("buyables.{id}.cost"), move || cost(amount.get()))
        });
        let purchase_limit = layer.resolve(&format!("buyables.{id}.limit"), options.purchase_limit);
        let visibility = layer.resolve(&format!("buyables.{id}.visibility"), options.visibility);
        let resource = options.resource;

        let maxed = {
            let amount = amount.clone();
            let limit = purchase_limit.clone();
            layer.derived(&format!("buyables.{id}.maxed"), move || amount.get() >= limit.get())
        };
        let can_afford = {
            let cost = cost.clone();
            let resource = resource.clone();
            layer.derived(&format!("buyables.{id}.can_afford"), move || {
                match (&cost, &resource) {
                    (Some(cost), Some(resource)) => resource.value() >= cost.get(),
                    _ => true,
                }
            })
        };
        let can_purchase = {
            let custom = options
                .can_purchase
                .map(|c| layer.resolve(&format!("buyables.{id}.custom_can_purchase"), c));
            let visibility = visibility.clone();
            let maxed = maxed.clone();
            let can_afford = can_afford.clone();
            layer.derived(&format!("buyables.{id}.can_purchase"), move || {
                let allowed = match &custom {
                    Some(custom) => custom.get(),
                    None => can_afford.get(),
                };
                visibility.get().is_shown() && !maxed.get() && allowed
            })
        };

        Ok(Self {
            id: label,
            amount,
            cost,
            resource,
            purchase_limit,
            visibility,
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

    pub fn amount_signal(&self) -> &Signal<BigNum> {
        &self.amount
    }

    /// Cost of the next purchase, `None` for cost-less buyables.
    pub fn cost(&self) -> Option<BigNum> {
        self.cost.as_ref().map(Derived::get)
    }

    pub fn purchase_limit(&self) -> BigNum {
        self.purchase_limit.get()
    }

    pub fn visibility(&self) -> Visibility {
        self.visibility.get()
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

    /// Spend the current cost and add one to the amount.
    pub fn purchase(&self) -> bool {
        if !self.can_purchase() {
            return false;
        }
        let cost = self.cost();
        if let (Some(cost), Some(resource)) = (cost, &self.resource) {
            resource.sub(cost);
        }
        self.amount.set(self.amount.get_untracked() + 1.0);
        tracing::debug!(
            buyable = %self.id,
            amount = %self.amount.get_untracked(),
            "buyable purchased"
        );
        true
    }
}

impl fmt::Debug for Buyable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Buyable")
            .field("id", &self.id)
            .field("amount", &self.amount.get_untracked())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::game::{Game, GameConfig};

    fn life_layer() -> (Game, Layer, Resource) {
        let mut game = Game::new(GameConfig::default());
        let layer = game.declare_layer("l", "Life").unwrap();
        let life = layer.resource("points", "Life Particles", 0).unwrap();
        (game, layer, life)
    }

    #[test]
    fn cost_grows_with_amount() {
        let (_game, layer, life) = life_layer();
        let regen = Buyable::new(
            &layer,
            "regeneration",
            BuyableOptions::new(life.clone(), |amount| BigNum::from(3).pow(amount)),
        )
        .unwrap();

        life.set(BigNum::from(5));
        assert_eq!(regen.cost(), Some(BigNum::ONE));
        assert!(regen.purchase());
        assert_eq!(regen.cost(), Some(BigNum::from(3)));
        assert!(regen.purchase());
        assert_eq!(life.value(), BigNum::from(1));
        assert_eq!(regen.amount(), BigNum::TWO);
        assert!(!regen.can_afford());
        assert!(!regen.purchase());
    }

    #[test]
    fn purchase_limit_maxes_out() {
        let (_game, layer, life) = life_layer();
        let capped = Buyable::new(
            &layer,
            "capped",
            BuyableOptions::new(life.clone(), |_| BigNum::ONE).purchase_limit(2),
        )
        .unwrap();
        life.set(BigNum::from(10));
        assert!(capped.purchase());
        assert!(capped.purchase());
        assert!(capped.maxed());
        assert!(!capped.purchase());
        assert_eq!(life.value(), BigNum::from(8));
    }

    #[test]
    fn custom_can_purchase_without_cost() {
        let (_game, layer, _life) = life_layer();
        let allowed = layer.persistent("allowed", true).unwrap();
        let free = Buyable::new(
            &layer,
            "free",
            BuyableOptions {
                can_purchase: Some((&allowed).into()),
                ..Default::default()
            },
        )
        .unwrap();
        assert_eq!(free.cost(), None);
        assert!(free.purchase());
        allowed.set(false);
        assert!(!free.purchase());
        assert_eq!(free.amount(), BigNum::ONE);
    }

    #[test]
    fn missing_cost_is_a_build_error() {
        let (_game, layer, _life) = life_layer();
        let err = Buyable::new(&layer, "broken", BuyableOptions::default()).unwrap_err();
        assert_eq!(err, BuildError::MissingCost { label: "l.broken".into() });
    }
}
