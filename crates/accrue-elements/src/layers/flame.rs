//! Flame: a first-row layer with a chain of three upgrades.

use accrue_core::prelude::*;

use crate::best_of;
use crate::layers::advancements::Advancements;
use crate::layers::life::Life;
use crate::layers::lightning::Lightning;
use crate::layers::main::Main;
use crate::layers::{element_gain_steps, element_tick};

/// Upgrade ids and costs, in Flame Particles.
pub const UPGRADES: [(&str, u32); 3] = [("hot_start", 1), ("heat_speed", 5), ("liquid_fire", 30)];

pub struct Flame {
    pub layer: Layer,
    pub points: Resource,
    /// Seconds spent in the current Flame run.
    pub time: Signal<f64>,
    pub conversion: Conversion,
    /// `hot_start` ("A Hot Start"), `heat_speed` ("Heat = Speed") and
    /// `liquid_fire` ("Liquid Fire"); each is shown once the previous one is
    /// bought.
    pub upgrades: Vec<Upgrade>,
    /// Effect of each upgrade:
    ///
    /// 0. flat particle gain, boosted by the third Life buyable
    /// 1. particle gain multiplier, `log20(flame + 1) + 1`
    /// 2. bubble speed multiplier, `log5(flame + 1) + 1`
    pub upgrade_effects: [Derived<BigNum>; 3],
    pub tree_node: TreeNode,
}

impl Flame {
    pub(crate) fn build(
        game: &mut Game,
        layer: Layer,
        main: &Main,
        advancements: &Advancements,
        life: &Life,
        lightning: &Lightning,
    ) -> Result<Self, BuildError> {
        let rt = layer.runtime().clone();
        let points = layer.tracked_resource("points", "Flame Particles", 0)?;
        let time = layer.persistent("time", 0.0)?;

        let mut upgrades: Vec<Upgrade> = Vec::with_capacity(UPGRADES.len());
        for (id, cost) in UPGRADES {
            let visibility = match upgrades.last() {
                None => {
                    let points = points.clone();
                    Computable::function(move || Visibility::when(best_of(&points).is_positive()))
                }
                Some(previous) => {
                    let bought = previous.bought_signal().clone();
                    Computable::function(move || Visibility::when(bought.get()))
                }
            };
            let options = UpgradeOptions::new(BigNum::from(cost), points.clone()).visibility(visibility);
            upgrades.push(Upgrade::new(&layer, id, options)?);
        }

        let upgrade_effects = {
            let hot_start = life.buyable_effects[2].clone();
            let flat = layer.derived("upgrades.hot_start.effect", move || hot_start.get() + 1.0);
            let f = points.clone();
            let heat_speed = layer.derived("upgrades.heat_speed.effect", move || (f.value() + 1.0).log(20) + 1.0);
            let f = points.clone();
            let liquid_fire = layer.derived("upgrades.liquid_fire.effect", move || (f.value() + 1.0).log(5) + 1.0);
            [flat, heat_speed, liquid_fire]
        };

        let steps = element_gain_steps(&layer, &time, lightning, advancements);
        let conversion = Conversion::new(
            &rt,
            "f.conversion",
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
            game.add_tick_handler("f.generation", move |dt| {
                element_tick(&conversion, &time, &passive, dt);
            });
        }

        let reset = Reset::new(&rt, "f.reset", ResetOptions::targets(["f"]));
        let tree_node = TreeNode::new(
            &rt,
            "f",
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
            upgrades,
            upgrade_effects,
            tree_node,
        })
    }
}

impl std::fmt::Debug for Flame {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Flame")
            .field("points", &self.points.value_untracked())
            .field("upgrades", &self.upgrades)
            .finish_non_exhaustive()
    }
}
