//! Advancements: a side layer paid for in particle gain.
//!
//! Each advancement is granted by reaching the next particles-per-second
//! threshold; the base is read-only, so prestiging here spends nothing.
//! Advancement counts unlock milestones that the other layers read.

use accrue_core::prelude::*;

use crate::layers::main::Main;

/// Particles per second needed for each advancement.
pub const REQUIREMENTS: [f64; 6] = [125.0, 700.0, 2e3, 5e3, 2.5e4, 3.6e4];

/// Length of the early-run boost, in seconds of the boosted layer's run.
pub const EARLY_BOOST_SECONDS: f64 = 120.0;

pub struct Advancements {
    pub layer: Layer,
    pub points: Resource,
    pub conversion: Conversion,
    pub tree_node: TreeNode,
    /// 1: the Lightning node appears.
    pub unlock_lightning: Milestone,
    /// 4: Flame, Life and Aqua generate 100% of their reset gain per second.
    pub passive_generation: Milestone,
    /// 5: Flame, Life and Aqua gain x3 during the first two minutes of a run.
    pub early_boost: Milestone,
    /// 6: the fourth Life buyable appears.
    pub more_life_buyables: Milestone,
}

impl Advancements {
    pub(crate) fn build(game: &mut Game, layer: Layer, main: &Main) -> Result<Self, BuildError> {
        let rt = layer.runtime().clone();
        let points = layer.resource("points", "Advancements", 0)?;
        let base = Resource::read_only(main.particle_gain.clone(), "particles/s");

        let conversion = Conversion::new(
            &rt,
            "adv.conversion",
            ConversionOptions::new(base, points.clone(), Table::constant(&rt, REQUIREMENTS))
                .buy_max(false)
                .spend(Spend::Keep),
        )?;

        let reset = Reset::new(&rt, "adv.reset", ResetOptions::targets(["adv"]));
        let tree_node = TreeNode::new(
            &rt,
            "adv",
            TreeNodeOptions {
                reset: Some(reset),
                ..Default::default()
            },
        );

        let unlock_lightning = advancement(&layer, "unlock_lightning", &points, 1)?;
        let passive_generation = advancement(&layer, "passive_generation", &points, 4)?;
        let early_boost = advancement(&layer, "early_boost", &points, 5)?;
        let more_life_buyables = advancement(&layer, "more_life_buyables", &points, 6)?;
        for milestone in [
            &unlock_lightning,
            &passive_generation,
            &early_boost,
            &more_life_buyables,
        ] {
            game.add_milestone(milestone.clone());
        }

        Ok(Self {
            layer,
            points,
            conversion,
            tree_node,
            unlock_lightning,
            passive_generation,
            early_boost,
            more_life_buyables,
        })
    }
}

/// A milestone shown and earned once `count` advancements are held.
fn advancement(layer: &Layer, id: &str, points: &Resource, count: u32) -> Result<Milestone, BuildError> {
    let reached = {
        let points = points.clone();
        move || points.value() >= f64::from(count)
    };
    let visibility = {
        let reached = reached.clone();
        Computable::function(move || Visibility::when(reached()))
    };
    Milestone::new(
        layer,
        id,
        MilestoneOptions::new(Computable::function(reached)).visibility(visibility),
    )
}
