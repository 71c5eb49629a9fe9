//! Life: a first-row layer built around five buyables.

use accrue_core::prelude::*;

use crate::best_of;
use crate::layers::advancements::Advancements;
use crate::layers::lightning::Lightning;
use crate::layers::main::Main;
use crate::layers::{element_gain_steps, element_tick};

pub struct Life {
    pub layer: Layer,
    pub points: Resource,
    /// Seconds spent in the current Life run.
    pub time: Signal<f64>,
    pub conversion: Conversion,
    pub buyables: Vec<Buyable>,
    /// Effect of each buyable:
    ///
    /// 0. `+amount` flat particle gain
    /// 1. `x2^amount` particle gain
    /// 2. `+2*amount` to the Flame upgrade "A Hot Start"
    /// 3. `x1.15^amount` Life gain
    /// 4. `x2.25^amount` bubble speed
    pub buyable_effects: [Derived<BigNum>; 5],
    pub tree_node: TreeNode,
}

impl Life {
    pub(crate) fn build(
        game: &mut Game,
        layer: Layer,
        main: &Main,
        advancements: &Advancements,
        lightning: &Lightning,
    ) -> Result<Self, BuildError> {
        let rt = layer.runtime().clone();
        let points = layer.tracked_resource("points", "Life Particles", 0)?;
        let time = layer.persistent("time", 0.0)?;

        let first = {
            let tracked = points.clone();
            buyable(&layer, 0, &points, |amt| BigNum::from(3).pow(amt), move || {
                best_of(&tracked).is_positive()
            })?
        };
        let second = {
            let prev = first.amount_signal().clone();
            buyable(
                &layer,
                1,
                &points,
                |amt| BigNum::from(4).pow(amt.pow(1.2)) * 10.0,
                move || prev.get().is_positive(),
            )?
        };
        let third = {
            let prev = second.amount_signal().clone();
            buyable(
                &layer,
                2,
                &points,
                |amt| BigNum::from(2.5).pow(amt.pow(1.4)) * 50.0,
                move || prev.get().is_positive(),
            )?
        };
        let fourth = {
            let unlocked = advancements.more_life_buyables.earned_signal().clone();
            buyable(
                &layer,
                3,
                &points,
                |amt| BigNum::TWO.pow(amt.pow(1.6)) * 200.0,
                move || unlocked.get(),
            )?
        };
        let fifth = {
            let prev = fourth.amount_signal().clone();
            buyable(
                &layer,
                4,
                &points,
                |amt| BigNum::from(1.5).pow(amt.pow(1.8)) * 1e4,
                move || prev.get().is_positive(),
            )?
        };
        let buyables = vec![first, second, third, fourth, fifth];

        let buyable_effects = {
            let amount = |i: usize| buyables[i].amount_signal().clone();
            let a = amount(0);
            let flat = layer.derived("buyables.0.effect", move || a.get());
            let a = amount(1);
            let doubler = layer.derived("buyables.1.effect", move || BigNum::TWO.pow(a.get()));
            let a = amount(2);
            let hot_start = layer.derived("buyables.2.effect", move || a.get() * 2.0);
            let a = amount(3);
            let life_gain = layer.derived("buyables.3.effect", move || BigNum::from(1.15).pow(a.get()));
            let a = amount(4);
            let bubble_speed = layer.derived("buyables.4.effect", move || BigNum::from(2.25).pow(a.get()));
            [flat, doubler, hot_start, life_gain, bubble_speed]
        };

        let mut steps = element_gain_steps(&layer, &time, lightning, advancements);
        steps.push(Modifier::multiplicative(
            &rt,
            &buyable_effects[3],
            "l: fourth buyable",
            true,
        ));
        let conversion = Conversion::new(
            &rt,
            "l.conversion",
            ConversionOptions::new(
                main.particles.clone(),
                points.clone(),
                Polynomial::new(&rt, 10, 1.0 / 3.0),
            )
            .gain_modifier(SequentialModifier::new(steps))
            .kind(ConversionKind::Cumulative)
            .spend(Spend::All),
        )?;

        {
            let conversion = conversion.clone();
            let time = time.clone();
            let passive = advancements.passive_generation.earned_signal().clone();
            game.add_tick_handler("l.generation", move |dt| {
                element_tick(&conversion, &time, &passive, dt);
            });
        }

        let reset = Reset::new(&rt, "l.reset", ResetOptions::targets(["l"]));
        let tree_node = TreeNode::new(
            &rt,
            "l",
            TreeNodeOptions {
                reset: Some(reset),
                ..Default::default()
            },
        );

        Ok(Self {
            layer,
            points,
            time,
            conversion,
            buyables,
            buyable_effects,
            tree_node,
        })
    }
}

fn buyable(
    layer: &Layer,
    index: usize,
    points: &Resource,
    cost: impl Fn(BigNum) -> BigNum + 'static,
    shown: impl Fn() -> bool + 'static,
) -> Result<Buyable, BuildError> {
    let options = BuyableOptions::new(points.clone(), cost)
        .visibility(Computable::function(move || Visibility::when(shown())));
    Buyable::new(layer, &index.to_string(), options)
}

impl std::fmt::Debug for Life {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Life")
            .field("points", &self.points.value_untracked())
            .field("buyables", &self.buyables)
            .finish_non_exhaustive()
    }
}
